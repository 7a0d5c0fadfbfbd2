#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use query_bench_instruments::Reporter;
use query_bench_runner::prelude::*;

/// A clock that only moves when a fake job completes.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

pub const BYTES_PER_JOB: u64 = 2 * 1024 * 1024;
pub const SLOT_MILLIS_PER_JOB: u64 = 250;

/// Builds fake clients whose behaviour is set per worker or per SQL text.
#[derive(Debug, Default)]
pub struct FakeClientFactory {
    latency: Duration,
    latency_by_sql: HashMap<String, Duration>,
    delay_by_sql: HashMap<String, Duration>,
    fail_on_sample: HashMap<usize, usize>,
    fail_connect: HashSet<usize>,
    panic_workers: HashSet<usize>,
    hang_workers: HashSet<usize>,
    connects: Arc<AtomicUsize>,
    submitted: Arc<Mutex<Vec<(usize, String, QueryJobConfig)>>>,
}

impl FakeClientFactory {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn with_latency_for(mut self, sql: &str, latency: Duration) -> Self {
        self.latency_by_sql.insert(sql.to_string(), latency);
        self
    }

    /// Jobs for `sql` take `delay` of real time to complete, on top of their reported latency.
    pub fn with_delay_for(mut self, sql: &str, delay: Duration) -> Self {
        self.delay_by_sql.insert(sql.to_string(), delay);
        self
    }

    /// Fail the `sample`th (1 based) submission made by `worker_id`.
    pub fn failing_on_sample(mut self, worker_id: usize, sample: usize) -> Self {
        self.fail_on_sample.insert(worker_id, sample);
        self
    }

    pub fn failing_to_connect(mut self, worker_id: usize) -> Self {
        self.fail_connect.insert(worker_id);
        self
    }

    pub fn panicking(mut self, worker_id: usize) -> Self {
        self.panic_workers.insert(worker_id);
        self
    }

    /// Jobs submitted by `worker_id` never complete.
    pub fn hanging(mut self, worker_id: usize) -> Self {
        self.hang_workers.insert(worker_id);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<(usize, String, QueryJobConfig)> {
        self.submitted.lock().clone()
    }
}

impl ClientFactory for FakeClientFactory {
    type Client = FakeClient;

    fn connect(&self, worker_id: usize) -> anyhow::Result<Self::Client> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.contains(&worker_id) {
            anyhow::bail!("Connection refused for worker {worker_id}");
        }

        Ok(FakeClient {
            worker_id,
            clock: Arc::new(ManualClock::new()),
            latency: self.latency,
            latency_by_sql: self.latency_by_sql.clone(),
            delay_by_sql: self.delay_by_sql.clone(),
            fail_on_sample: self.fail_on_sample.get(&worker_id).copied(),
            panic: self.panic_workers.contains(&worker_id),
            hang: self.hang_workers.contains(&worker_id),
            samples_submitted: 0,
            submitted: self.submitted.clone(),
        })
    }
}

#[derive(Debug)]
pub struct FakeClient {
    worker_id: usize,
    clock: Arc<ManualClock>,
    latency: Duration,
    latency_by_sql: HashMap<String, Duration>,
    delay_by_sql: HashMap<String, Duration>,
    fail_on_sample: Option<usize>,
    panic: bool,
    hang: bool,
    samples_submitted: usize,
    submitted: Arc<Mutex<Vec<(usize, String, QueryJobConfig)>>>,
}

impl QueryClient for FakeClient {
    type Job = FakeJob;

    fn submit<'a>(
        &'a mut self,
        sql: &'a str,
        config: &'a QueryJobConfig,
    ) -> BoxFuture<'a, anyhow::Result<Self::Job>> {
        async move {
            self.samples_submitted += 1;
            if self.panic {
                panic!("fake client panicked on worker {}", self.worker_id);
            }
            if self.fail_on_sample == Some(self.samples_submitted) {
                anyhow::bail!("Syntax error on sample {}", self.samples_submitted);
            }

            self.submitted
                .lock()
                .push((self.worker_id, sql.to_string(), config.clone()));

            Ok(FakeJob {
                clock: self.clock.clone(),
                latency: self.latency_by_sql.get(sql).copied().unwrap_or(self.latency),
                delay: self.delay_by_sql.get(sql).copied(),
                hang: self.hang,
            })
        }
        .boxed()
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

pub struct FakeJob {
    clock: Arc<ManualClock>,
    latency: Duration,
    delay: Option<Duration>,
    hang: bool,
}

impl QueryJob for FakeJob {
    fn wait(&mut self) -> BoxFuture<'_, anyhow::Result<JobStatistics>> {
        async move {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.clock.advance(self.latency);
            Ok(JobStatistics {
                bytes_processed: BYTES_PER_JOB,
                bytes_billed: BYTES_PER_JOB,
                slot_millis: SLOT_MILLIS_PER_JOB,
            })
        }
        .boxed()
    }
}

/// Report sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryReport {
    pub header: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub finished: bool,
}

impl Report for InMemoryReport {
    type Error = Infallible;

    fn header(&mut self, columns: &[String]) -> Result<(), Self::Error> {
        self.header = columns.to_vec();
        Ok(())
    }

    fn report(&mut self, row: &ReportRow) -> Result<(), Self::Error> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.finished = true;
        Ok(())
    }
}

pub fn test_context() -> RunnerContext {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let shutdown_handle = ShutdownHandle::new();

    RunnerContext::new(
        Arc::new(Executor::new(runtime, shutdown_handle.clone())),
        Arc::new(Reporter::noop()),
        shutdown_handle,
        "test-run",
    )
}

pub fn query_set(names: &[&str]) -> QuerySet {
    QuerySet::new(
        "test",
        names
            .iter()
            .map(|name| QueryDefinition::new(*name, format!("SELECT '{name}'")))
            .collect(),
    )
    .unwrap()
}

pub fn scenario_config(concurrency: usize, samples: usize) -> ScenarioConfig {
    ScenarioConfig {
        concurrency: concurrency.try_into().unwrap(),
        samples: samples.try_into().unwrap(),
        trial_timeout: Some(Duration::from_secs(30)),
    }
}
