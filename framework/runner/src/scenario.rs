use std::any::Any;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use query_bench_core::prelude::{ClientFactory, ShutdownSignalError};
use query_bench_instruments::{report_operation, OperationRecord};

use crate::context::RunnerContext;
use crate::executor::Executor;
use crate::progress::ExperimentProgress;
use crate::query::{GlobalOptions, QuerySet};
use crate::selection::QuerySelector;
use crate::statistic;
use crate::trial::{Trial, TrialOutcome, TrialTimeoutError};
use crate::types::QueryBenchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioConfig {
    /// Number of workers started, each running one trial.
    pub concurrency: NonZeroUsize,
    /// Executions per trial.
    pub samples: NonZeroUsize,
    /// `None` lets a trial run for as long as it takes.
    pub trial_timeout: Option<Duration>,
}

/// What a worker hands back to the scenario when it is done. Exactly one is sent per worker.
#[derive(Debug)]
pub enum WorkerOutcome {
    Success(TrialOutcome),
    Failure {
        query_name: String,
        reason: anyhow::Error,
    },
}

#[derive(Debug)]
struct WorkerReport {
    worker_id: usize,
    outcome: WorkerOutcome,
}

/// Every successful trial of one query within a scenario, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTrials {
    pub query_name: String,
    pub trials: Vec<TrialOutcome>,
}

impl QueryTrials {
    /// Number of workers that ran this query to completion.
    pub fn worker_count(&self) -> usize {
        self.trials.len()
    }

    pub fn total_samples(&self) -> usize {
        self.trials.iter().map(|t| t.latency_secs.len()).sum()
    }

    /// The latency samples of every trial, flattened in completion order.
    pub fn pooled_latencies(&self) -> Vec<f64> {
        self.trials
            .iter()
            .flat_map(|t| t.latency_secs.iter().copied())
            .collect()
    }

    /// Latency samples grouped per trial.
    pub fn latencies(&self) -> Vec<Vec<f64>> {
        self.trials.iter().map(|t| t.latency_secs.clone()).collect()
    }

    pub fn aggregate(&self) -> QueryAggregate {
        let pooled = self.pooled_latencies();
        QueryAggregate {
            query_name: self.query_name.clone(),
            num_threads: self.worker_count(),
            num_samples: pooled.len(),
            mean: statistic::mean(&pooled).unwrap_or(f64::NAN),
            min: statistic::min(&pooled).unwrap_or(f64::NAN),
            max: statistic::max(&pooled).unwrap_or(f64::NAN),
            std_dev: statistic::std_dev(&pooled).unwrap_or(f64::NAN),
        }
    }
}

/// Console summary of one query across every successful worker of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAggregate {
    pub query_name: String,
    pub num_threads: usize,
    pub num_samples: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl Display for QueryAggregate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Query {:?}, threads = {}, samples = {}, mean = {:.2}s, min = {:.2}s, max = {:.2}s, \
             std. deviation = {:.3}",
            self.query_name,
            self.num_threads,
            self.num_samples,
            self.mean,
            self.min,
            self.max,
            self.std_dev
        )
    }
}

/// Outcome of one scenario. Queries are ordered by their first successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub concurrency: usize,
    pub queries: Vec<QueryTrials>,
    /// Workers that failed and contributed no samples.
    pub lost_workers: usize,
}

impl ScenarioResult {
    fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            queries: Vec::new(),
            lost_workers: 0,
        }
    }

    pub fn get(&self, query_name: &str) -> Option<&QueryTrials> {
        self.queries.iter().find(|q| q.query_name == query_name)
    }

    fn record(&mut self, outcome: TrialOutcome) {
        match self
            .queries
            .iter_mut()
            .find(|q| q.query_name == outcome.query_name)
        {
            Some(entry) => entry.trials.push(outcome),
            None => self.queries.push(QueryTrials {
                query_name: outcome.query_name.clone(),
                trials: vec![outcome],
            }),
        }
    }
}

/// Runs one trial per worker, all at the same time, and collects their samples.
#[derive(Debug)]
pub struct Scenario<'a> {
    config: ScenarioConfig,
    query_set: &'a QuerySet,
    options: &'a GlobalOptions,
}

impl<'a> Scenario<'a> {
    pub fn new(config: ScenarioConfig, query_set: &'a QuerySet, options: &'a GlobalOptions) -> Self {
        Self {
            config,
            query_set,
            options,
        }
    }

    /// Start every worker, wait for all of them, and merge their outcomes.
    ///
    /// Each worker connects its own client and runs its trial on its own thread. A failed or
    /// panicking worker is logged and dropped, it never stops the others.
    pub fn run<F: ClientFactory>(
        &self,
        context: &RunnerContext,
        factory: &F,
        selector: &mut dyn QuerySelector,
        progress: &ExperimentProgress,
    ) -> QueryBenchResult<ScenarioResult> {
        let concurrency = self.config.concurrency.get();
        log::info!(
            "Starting scenario with threads = {}, samples = {}, use_query_cache = {}",
            concurrency,
            self.config.samples,
            self.options.use_cache
        );
        progress.start_scenario(concurrency);

        let trials = (0..concurrency)
            .map(|_| {
                selector
                    .select(self.query_set.queries())
                    .map(|query| {
                        Trial::new(query, query.job_config(self.options), self.config.samples)
                    })
                    .context("No query available to assign to worker")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let executor = context.executor().as_ref();
        let trial_timeout = self.config.trial_timeout;

        let result = std::thread::scope(|scope| {
            let (sender, receiver) = mpsc::channel::<WorkerReport>();

            for (worker_id, trial) in trials.iter().enumerate() {
                let worker_sender = sender.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("worker-{worker_id}"))
                    .spawn_scoped(scope, move || {
                        let record = OperationRecord::new("trial")
                            .with_attr("query", trial.query_name())
                            .with_attr("concurrency", concurrency);
                        let result = panic::catch_unwind(AssertUnwindSafe(|| {
                            run_worker(worker_id, trial, factory, executor, trial_timeout)
                        }))
                        .unwrap_or_else(|payload| {
                            Err(anyhow::anyhow!("Worker panicked: {}", panic_message(payload.as_ref())))
                        });
                        report_operation(context.reporter(), record, &result);

                        let outcome = match result {
                            Ok(outcome) => WorkerOutcome::Success(outcome),
                            Err(reason) => WorkerOutcome::Failure {
                                query_name: trial.query_name().to_string(),
                                reason,
                            },
                        };
                        if worker_sender.send(WorkerReport { worker_id, outcome }).is_err() {
                            log::error!("Scenario stopped listening before worker {worker_id} finished");
                        }
                    });

                if let Err(e) = spawned {
                    let outcome = WorkerOutcome::Failure {
                        query_name: trial.query_name().to_string(),
                        reason: anyhow::Error::new(e).context("Failed to spawn worker thread"),
                    };
                    // The receiver is alive until the scope ends.
                    let _ = sender.send(WorkerReport { worker_id, outcome });
                }
            }
            drop(sender);

            let mut result = ScenarioResult::new(concurrency);
            for report in receiver.iter() {
                match report.outcome {
                    WorkerOutcome::Success(outcome) => result.record(outcome),
                    WorkerOutcome::Failure { query_name, reason } => {
                        result.lost_workers += 1;
                        if reason.is::<ShutdownSignalError>() {
                            log::warn!(
                                "Worker {} running query {:?} was stopped by shutdown",
                                report.worker_id,
                                query_name
                            );
                        } else {
                            log::error!(
                                "Query {:?} on worker {} generated an error: {:?}",
                                query_name,
                                report.worker_id,
                                reason
                            );
                        }
                    }
                }
                progress.worker_finished();
            }

            result
        });

        for query in &result.queries {
            log::info!("{}", query.aggregate());
        }
        if result.lost_workers > 0 {
            log::warn!(
                "{} of {} workers failed and contributed no samples",
                result.lost_workers,
                concurrency
            );
        }

        Ok(result)
    }
}

fn run_worker<F: ClientFactory>(
    worker_id: usize,
    trial: &Trial<'_>,
    factory: &F,
    executor: &Executor,
    trial_timeout: Option<Duration>,
) -> anyhow::Result<TrialOutcome> {
    let mut client = factory
        .connect(worker_id)
        .with_context(|| format!("Failed to connect client for worker {worker_id}"))?;

    executor.execute_in_place(async {
        match trial_timeout {
            Some(timeout) => tokio::time::timeout(timeout, trial.run(&mut client))
                .await
                .map_err(|_| anyhow::Error::new(TrialTimeoutError { timeout }))?,
            None => trial.run(&mut client).await,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
