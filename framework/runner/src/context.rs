use std::sync::Arc;

use query_bench_core::prelude::ShutdownHandle;
use query_bench_instruments::Reporter;

use crate::executor::Executor;

/// Shared by every scenario and worker of a run.
#[derive(Debug)]
pub struct RunnerContext {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    run_id: String,
}

impl RunnerContext {
    pub fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            run_id: run_id.into(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    /// Identifier of this run, also attached to every job as a label.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}
