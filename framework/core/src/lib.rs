mod client;
mod clock;
mod shutdown;

pub mod prelude {
    pub use crate::client::{ClientFactory, JobStatistics, QueryClient, QueryJob, QueryJobConfig};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
