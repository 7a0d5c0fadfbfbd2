use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::Context;
use query_bench_core::prelude::{QueryClient, QueryJob, QueryJobConfig};

use crate::query::QueryDefinition;
use crate::statistic;

/// On-demand price of a megabyte billed, $5 per TiB.
pub const COST_PER_MB: f64 = 5.0 / (1024.0 * 1024.0);

/// Raw samples produced by a trial that ran every one of its executions successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub query_name: String,
    /// Wall time of each execution in seconds, in execution order.
    pub latency_secs: Vec<f64>,
    pub slot_millis: Vec<u64>,
}

/// Returned when a trial is still running once its timeout has elapsed.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("Trial did not complete within {timeout:?}")]
pub struct TrialTimeoutError {
    pub timeout: Duration,
}

/// Runs a single query a fixed number of times, one execution after another, against one client.
#[derive(Debug)]
pub struct Trial<'a> {
    query: &'a QueryDefinition,
    job_config: QueryJobConfig,
    samples: NonZeroUsize,
}

impl<'a> Trial<'a> {
    pub fn new(query: &'a QueryDefinition, job_config: QueryJobConfig, samples: NonZeroUsize) -> Self {
        Self {
            query,
            job_config,
            samples,
        }
    }

    pub fn query_name(&self) -> &str {
        &self.query.name
    }

    /// Execute every sample. Any failed execution fails the whole trial and its samples are lost.
    pub async fn run<C: QueryClient>(&self, client: &mut C) -> anyhow::Result<TrialOutcome> {
        let samples = self.samples.get();
        let mut latency_secs = Vec::with_capacity(samples);
        let mut slot_millis = Vec::with_capacity(samples);
        let mut mbytes_processed = Vec::with_capacity(samples);
        let mut mbytes_billed = Vec::with_capacity(samples);

        for sample in 0..samples {
            let start = client.clock().now();

            let mut job = self
                .query
                .execute(client, &self.job_config)
                .await
                .with_context(|| format!("Failed to submit sample {} of {}", sample + 1, samples))?;
            let statistics = job
                .wait()
                .await
                .with_context(|| format!("Sample {} of {} failed", sample + 1, samples))?;

            let end = client.clock().now();

            latency_secs.push(end.saturating_duration_since(start).as_secs_f64());
            slot_millis.push(statistics.slot_millis);
            mbytes_processed.push(statistics.mbytes_processed());
            mbytes_billed.push(statistics.mbytes_billed());
        }

        let summary = TrialSummary {
            query_name: self.query_name(),
            latency_secs: &latency_secs,
            mean_slot_millis: mean_or_zero(&slot_millis.iter().map(|s| *s as f64).collect::<Vec<_>>()),
            mean_mbytes_processed: mean_or_zero(&mbytes_processed),
            mean_mbytes_billed: mean_or_zero(&mbytes_billed),
        };
        log::info!("{summary}");

        Ok(TrialOutcome {
            query_name: self.query.name.clone(),
            latency_secs,
            slot_millis,
        })
    }
}

fn mean_or_zero(data: &[f64]) -> f64 {
    statistic::mean(data).unwrap_or_default()
}

struct TrialSummary<'a> {
    query_name: &'a str,
    latency_secs: &'a [f64],
    mean_slot_millis: f64,
    mean_mbytes_processed: f64,
    mean_mbytes_billed: f64,
}

impl Display for TrialSummary<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let stat = |r: statistic::Reduction| r.unwrap_or(f64::NAN);
        write!(
            f,
            "Query: {:?}, mean = {:.2}s, min/max = {:.2}/{:.2}s, std = {:.3}, slot time = {:.2}ms, \
             MB processed = {:.2}, MB billed = {:.2}, cost = ${:.5}",
            self.query_name,
            stat(statistic::mean(self.latency_secs)),
            stat(statistic::min(self.latency_secs)),
            stat(statistic::max(self.latency_secs)),
            stat(statistic::std_dev(self.latency_secs)),
            self.mean_slot_millis,
            self.mean_mbytes_processed,
            self.mean_mbytes_billed,
            self.mean_mbytes_billed * COST_PER_MB,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_five_dollars_per_tebibyte() {
        let tebibyte_in_mb = 1024.0 * 1024.0;
        assert_eq!(5.0, tebibyte_in_mb * COST_PER_MB);
    }

    #[test]
    fn summary_line() {
        let summary = TrialSummary {
            query_name: "Q1",
            latency_secs: &[1.0, 3.0],
            mean_slot_millis: 1500.0,
            mean_mbytes_processed: 2.0,
            mean_mbytes_billed: 1024.0,
        };

        assert_eq!(
            "Query: \"Q1\", mean = 2.00s, min/max = 1.00/3.00s, std = 1.000, slot time = 1500.00ms, \
             MB processed = 2.00, MB billed = 1024.00, cost = $0.00488",
            summary.to_string()
        );
    }

    #[test]
    fn timeout_error_message() {
        let err = TrialTimeoutError {
            timeout: Duration::from_secs(5),
        };
        assert_eq!("Trial did not complete within 5s", err.to_string());
    }
}
