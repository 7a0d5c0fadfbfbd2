use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Args;

use crate::query::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReporterOpt {
    /// Keep operation timings in memory and print a summary table at the end of the run.
    InMemory,
    /// Discard operation timings.
    Noop,
}

/// Command line options common to every query benchmark.
///
/// Flatten this into the binary's own parser next to the options of the client binding.
#[derive(Debug, Clone, Args)]
pub struct QueryBenchCli {
    /// JSON or YAML file containing the queries to execute.
    ///
    /// If not set, a single built in query is used.
    #[arg(long, short = 'f')]
    pub query_file: Option<PathBuf>,

    /// Comma separated list of concurrency scenarios to run, i.e. `10,20,30,40`.
    ///
    /// Each entry is either a number of concurrent threads or an inclusive range with an optional
    /// step, such as `10..40:10`.
    #[arg(long, conflicts_with = "threads", required_unless_present = "threads")]
    pub scenarios: Option<String>,

    /// Number of concurrent threads for a single, ad-hoc scenario.
    #[arg(long)]
    pub threads: Option<NonZeroUsize>,

    /// Number of samples to take for each thread.
    #[arg(long, default_value_t = 3)]
    pub samples: usize,

    /// File to write the results to.
    #[arg(long, short = 'O')]
    pub output_file: PathBuf,

    /// Format of the results file.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Allow results to be served from the query cache.
    #[arg(long, short = 'C', default_value = "false")]
    pub use_cache: bool,

    /// Fail any query that would bill more than this many bytes.
    #[arg(long)]
    pub maximum_bytes_billed: Option<u64>,

    /// Attach a label to every query job in the format `key=value`. May be given more than once.
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    /// Comma separated list of the statistics to report, in order.
    ///
    /// Defaults to every statistic.
    #[arg(long, value_delimiter = ',')]
    pub stats: Vec<String>,

    /// Seed for the random choice of query per thread, for repeatable experiments.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Seconds a trial may run before it is counted as failed. `0` disables the timeout.
    #[arg(long, default_value_t = 600)]
    pub trial_timeout: u64,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[arg(long, default_value = "false")]
    pub no_progress: bool,

    /// The reporter to use for operation timings.
    #[arg(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Set the ID of this run
    ///
    /// If not set, a random ID is used.
    #[arg(long)]
    pub run_id: Option<String>,
}

pub fn parse_label(s: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Label {s:?} must be in the format key=value"))?;

    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Label {s:?} has an empty key");
    }

    Ok((key.to_string(), value.trim().to_string()))
}
