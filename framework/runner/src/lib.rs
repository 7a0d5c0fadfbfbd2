mod cli;
mod context;
mod definition;
mod error;
mod executor;
mod experiment;
mod init;
mod monitor;
mod plan;
mod progress;
mod query;
mod report;
mod run;
mod scenario;
mod selection;
mod shutdown;
mod statistic;
mod trial;
mod types;

pub use cli::parse_label;
pub use statistic::{max, mean, median, median_trim, min, percentile, std_dev, std_trim};

pub mod prelude {
    pub use crate::cli::{QueryBenchCli, ReporterOpt};
    pub use crate::context::RunnerContext;
    pub use crate::definition::{ExperimentDefinition, RUN_ID_LABEL};
    pub use crate::error::{ConfigError, OutputError};
    pub use crate::executor::Executor;
    pub use crate::experiment::{Experiment, DEFAULT_TRIAL_TIMEOUT};
    pub use crate::init::init;
    pub use crate::plan::ScenarioPlan;
    pub use crate::progress::ExperimentProgress;
    pub use crate::query::{
        GlobalOptions, OutputFormat, QueryDefinition, QueryOptions, QuerySet, QUERY_NAME_LABEL,
    };
    pub use crate::report::{header, CsvReport, Report, ReportRow, MISSING_VALUE};
    pub use crate::run::run;
    pub use crate::scenario::{
        QueryAggregate, QueryTrials, Scenario, ScenarioConfig, ScenarioResult, WorkerOutcome,
    };
    pub use crate::selection::{selector_for, QuerySelector, UniformSelector, WeightedSelector};
    pub use crate::statistic::{
        Reduction, ReductionError, Statistic, StatisticSet, DEFAULT_TRIM_M,
    };
    pub use crate::trial::{Trial, TrialOutcome, TrialTimeoutError, COST_PER_MB};
    pub use crate::types::QueryBenchResult;

    // Re-export of the core types so that bindings and binaries only need this prelude
    pub use query_bench_core::prelude::*;
}
