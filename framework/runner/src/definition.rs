use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{QueryBenchCli, ReporterOpt};
use crate::error::ConfigError;
use crate::experiment::Experiment;
use crate::plan::ScenarioPlan;
use crate::query::{GlobalOptions, QuerySet};
use crate::selection::selector_for;
use crate::statistic::StatisticSet;

/// Label applied to every job with the ID of the run that submitted it.
pub const RUN_ID_LABEL: &str = "query_bench_run_id";

const RUN_ID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// A fully validated experiment, ready to be passed to [crate::run::run].
#[derive(Debug, Clone)]
pub struct ExperimentDefinition {
    pub query_set: QuerySet,
    pub options: GlobalOptions,
    pub plan: ScenarioPlan,
    pub samples: NonZeroUsize,
    pub statistics: StatisticSet,
    pub seed: Option<u64>,
    pub trial_timeout: Option<Duration>,
    pub output_file: PathBuf,
    pub no_progress: bool,
    pub reporter: ReporterOpt,
    pub run_id: String,
}

impl ExperimentDefinition {
    /// Load and validate everything the command line refers to. No query runs until the
    /// definition has been built.
    pub fn from_cli(cli: QueryBenchCli) -> Result<Self, ConfigError> {
        let query_set = match &cli.query_file {
            Some(path) => QuerySet::from_file(path)?,
            None => QuerySet::default_set(),
        };

        let plan = match (&cli.scenarios, cli.threads) {
            (Some(scenarios), _) => scenarios.parse::<ScenarioPlan>()?,
            (None, Some(threads)) => ScenarioPlan::single(threads),
            (None, None) => {
                return Err(ConfigError::InvalidScenarioPlan {
                    plan: String::new(),
                    reason: "either scenarios or threads must be given".to_string(),
                })
            }
        };

        let samples = NonZeroUsize::new(cli.samples).ok_or(ConfigError::ZeroSamples)?;

        let statistics = if cli.stats.is_empty() {
            StatisticSet::standard()
        } else {
            StatisticSet::select(&cli.stats)?
        };

        let run_id = cli.run_id.unwrap_or_else(|| nanoid::nanoid!(10, &RUN_ID_ALPHABET));

        let mut labels = cli.labels.into_iter().collect::<std::collections::BTreeMap<_, _>>();
        labels.insert(RUN_ID_LABEL.to_string(), run_id.clone());

        let options = GlobalOptions {
            use_cache: cli.use_cache,
            format: cli.format,
            maximum_bytes_billed: cli.maximum_bytes_billed,
            labels,
        };

        for query in query_set.queries() {
            log::debug!("Loaded query {:?}: {}", query.name, query.sql);
        }

        Ok(Self {
            query_set,
            options,
            plan,
            samples,
            statistics,
            seed: cli.seed,
            trial_timeout: (cli.trial_timeout > 0).then(|| Duration::from_secs(cli.trial_timeout)),
            output_file: cli.output_file,
            no_progress: cli.no_progress,
            reporter: cli.reporter,
            run_id,
        })
    }

    pub(crate) fn into_experiment(self) -> Result<Experiment, ConfigError> {
        let selector = selector_for(&self.query_set, self.seed)?;

        Ok(Experiment::new(
            self.query_set,
            self.options,
            self.plan,
            self.samples,
            self.statistics,
            selector,
        )
        .with_trial_timeout(self.trial_timeout))
    }
}
