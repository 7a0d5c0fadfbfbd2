use std::time::Duration;

use bigquery_client_instrumented::prelude::*;
use clap::{Args, Parser};
use query_bench_runner::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Utility to launch parallel BigQuery queries and return average response time", long_about = None)]
struct BqParallelCli {
    #[command(flatten)]
    bench: QueryBenchCli,

    #[command(flatten)]
    bigquery: BigQueryArgs,
}

#[derive(Debug, Args)]
struct BigQueryArgs {
    /// Project to run and bill the query jobs in.
    #[arg(long, env = "BQ_PROJECT")]
    project: String,

    /// OAuth2 access token, for example from `gcloud auth print-access-token`.
    #[arg(long, env = "BQ_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Location to run the query jobs in, such as `US` or `europe-west2`.
    #[arg(long)]
    location: Option<String>,

    /// Base URL of the BigQuery REST API.
    #[arg(long, default_value = DEFAULT_API_ENDPOINT)]
    api_endpoint: String,

    /// Maximum time in milliseconds that each poll for query completion waits on the server.
    #[arg(long, default_value_t = 10_000)]
    poll_timeout_ms: u64,
}

impl From<BigQueryArgs> for BigQueryConfig {
    fn from(args: BigQueryArgs) -> Self {
        Self {
            api_endpoint: args.api_endpoint,
            project_id: args.project,
            access_token: args.access_token,
            location: args.location,
            poll_timeout: Duration::from_millis(args.poll_timeout_ms),
        }
    }
}

fn main() -> QueryBenchResult<()> {
    let cli = init::<BqParallelCli>();

    let definition = ExperimentDefinition::from_cli(cli.bench)?;
    let config = BigQueryConfig::from(cli.bigquery);
    if config.access_token.is_none() {
        log::warn!("No access token given, requests to {} will be unauthenticated", config.api_endpoint);
    }

    run(definition, |context| {
        Ok(BigQueryClientFactory::new(config, context.reporter().clone()))
    })?;

    Ok(())
}
