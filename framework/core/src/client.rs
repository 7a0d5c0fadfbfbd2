use std::collections::BTreeMap;

use futures::future::BoxFuture;

use crate::clock::{Clock, SystemClock};

/// Per-execution settings handed to the remote engine along with the SQL text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryJobConfig {
    /// Allow the engine to answer from its result cache.
    pub use_cache: bool,
    /// Fail the job instead of billing more than this many bytes.
    pub maximum_bytes_billed: Option<u64>,
    /// Labels attached to the job on the remote side.
    pub labels: BTreeMap<String, String>,
}

/// Resource usage reported by the engine for a completed job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStatistics {
    pub bytes_processed: u64,
    pub bytes_billed: u64,
    pub slot_millis: u64,
}

impl JobStatistics {
    pub fn mbytes_processed(&self) -> f64 {
        self.bytes_processed as f64 / 1024.0 / 1024.0
    }

    pub fn mbytes_billed(&self) -> f64 {
        self.bytes_billed as f64 / 1024.0 / 1024.0
    }
}

/// Handle to a query job that has been submitted and may still be running.
pub trait QueryJob: Send {
    /// Wait for the job to finish and return its statistics. A job that finished with an error
    /// resolves to `Err`.
    fn wait(&mut self) -> BoxFuture<'_, anyhow::Result<JobStatistics>>;
}

/// A connection to the remote query engine, owned by exactly one worker.
pub trait QueryClient: Send {
    type Job: QueryJob;

    /// Submit `sql` for execution without waiting for it to complete.
    fn submit<'a>(
        &'a mut self,
        sql: &'a str,
        config: &'a QueryJobConfig,
    ) -> BoxFuture<'a, anyhow::Result<Self::Job>>;

    /// The clock executions against this client are timed with.
    fn clock(&self) -> &dyn Clock {
        &SystemClock
    }
}

/// Creates a fresh [QueryClient] for each worker.
///
/// Clients are never shared between workers, so this is called once per worker, from that
/// worker's thread.
pub trait ClientFactory: Send + Sync {
    type Client: QueryClient;

    fn connect(&self, worker_id: usize) -> anyhow::Result<Self::Client>;
}
