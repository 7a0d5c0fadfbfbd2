mod api;
mod client;
mod config;
mod error;
mod labels;

pub mod prelude {
    pub use crate::client::{BigQueryClient, BigQueryClientFactory, BigQueryJob};
    pub use crate::config::{BigQueryConfig, DEFAULT_API_ENDPOINT, DEFAULT_POLL_TIMEOUT};
    pub use crate::error::BigQueryError;
    pub use crate::labels::{sanitize_label_key, sanitize_label_value};
}
