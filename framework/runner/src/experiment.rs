use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::Context;
use query_bench_core::prelude::{ClientFactory, ShutdownSignalError};

use crate::context::RunnerContext;
use crate::progress::ExperimentProgress;
use crate::query::{GlobalOptions, QuerySet};
use crate::plan::ScenarioPlan;
use crate::report::{self, Report, ReportRow};
use crate::scenario::{Scenario, ScenarioConfig};
use crate::selection::QuerySelector;
use crate::statistic::StatisticSet;
use crate::types::QueryBenchResult;

pub const DEFAULT_TRIAL_TIMEOUT: Duration = Duration::from_secs(600);

/// Runs one scenario per level of the plan, one after another, and reports a row per query of
/// each scenario.
pub struct Experiment {
    query_set: QuerySet,
    options: GlobalOptions,
    plan: ScenarioPlan,
    samples: NonZeroUsize,
    statistics: StatisticSet,
    selector: Box<dyn QuerySelector>,
    trial_timeout: Option<Duration>,
    progress: ExperimentProgress,
}

impl Experiment {
    pub fn new(
        query_set: QuerySet,
        options: GlobalOptions,
        plan: ScenarioPlan,
        samples: NonZeroUsize,
        statistics: StatisticSet,
        selector: Box<dyn QuerySelector>,
    ) -> Self {
        Self {
            query_set,
            options,
            plan,
            samples,
            statistics,
            selector,
            trial_timeout: Some(DEFAULT_TRIAL_TIMEOUT),
            progress: ExperimentProgress::hidden(),
        }
    }

    /// `None` disables the timeout.
    pub fn with_trial_timeout(mut self, trial_timeout: Option<Duration>) -> Self {
        self.trial_timeout = trial_timeout;
        self
    }

    pub fn with_progress(mut self, progress: ExperimentProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn header(&self) -> Vec<String> {
        report::header(&self.statistics)
    }

    /// Run every scenario of the plan and write its rows to `report` as soon as the scenario
    /// completes.
    ///
    /// Returns every row written. If a shutdown is requested, no further scenario starts, the
    /// rows of the scenario in progress are still written and an error is returned.
    pub fn run<F, R>(
        &mut self,
        context: &RunnerContext,
        factory: &F,
        report: &mut R,
    ) -> QueryBenchResult<Vec<ReportRow>>
    where
        F: ClientFactory,
        R: Report,
        R::Error: std::error::Error + Send + Sync + 'static,
    {
        report
            .header(&self.header())
            .context("Failed to write report header")?;

        log::info!(
            "Starting experiment with scenarios = {}, samples = {}, use_query_cache = {}, queries = {}",
            self.plan,
            self.samples,
            self.options.use_cache,
            self.query_set
        );

        let mut rows = Vec::new();
        for &concurrency in self.plan.levels() {
            if context.shutdown_handle().is_shutdown() {
                break;
            }

            log::info!("Scenario = {} concurrent threads", concurrency);
            let scenario = Scenario::new(
                ScenarioConfig {
                    concurrency,
                    samples: self.samples,
                    trial_timeout: self.trial_timeout,
                },
                &self.query_set,
                &self.options,
            );
            let result = scenario.run(
                context,
                factory,
                self.selector.as_mut(),
                &self.progress,
            )?;

            for trials in &result.queries {
                let row = ReportRow::new(trials, &self.statistics);
                report
                    .report(&row)
                    .with_context(|| format!("Failed to write report row for {}", row.query_name))?;
                rows.push(row);
            }
        }

        self.progress.finish();
        report.finish().context("Failed to finish report")?;

        if context.shutdown_handle().is_shutdown() {
            return Err(anyhow::Error::new(ShutdownSignalError::default())).context(format!(
                "Experiment stopped early, {} rows were written",
                rows.len()
            ));
        }

        Ok(rows)
    }
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("query_set", &self.query_set)
            .field("options", &self.options)
            .field("plan", &self.plan)
            .field("samples", &self.samples)
            .field("statistics", &self.statistics.names())
            .field("trial_timeout", &self.trial_timeout)
            .finish()
    }
}
