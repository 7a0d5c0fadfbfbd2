use std::sync::Arc;

use anyhow::Context;
use query_bench_core::prelude::ClientFactory;
use query_bench_instruments::ReportConfig;

use crate::cli::ReporterOpt;
use crate::context::RunnerContext;
use crate::definition::ExperimentDefinition;
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::ExperimentProgress;
use crate::query::OutputFormat;
use crate::report::{CsvReport, ReportRow};
use crate::shutdown::start_shutdown_listener;
use crate::types::QueryBenchResult;

/// Run an experiment from start to finish.
///
/// `connect` is called once, after the runtime and reporter are ready, to build the factory that
/// each worker creates its client from. The results file is opened before the first scenario
/// starts. Returns every row that was written.
pub fn run<F, S>(definition: ExperimentDefinition, connect: S) -> QueryBenchResult<Vec<ReportRow>>
where
    F: ClientFactory,
    S: FnOnce(&RunnerContext) -> QueryBenchResult<F>,
{
    log::info!(
        "Running experiment {} with {} over scenarios {}",
        definition.run_id,
        definition.query_set,
        definition.plan
    );

    let output_file = definition.output_file.clone();
    let format = definition.options.format;
    let total_workers = definition.plan.total_workers();
    let progress = if definition.no_progress {
        ExperimentProgress::hidden()
    } else {
        ExperimentProgress::new(total_workers)
    };
    let reporter = match definition.reporter {
        ReporterOpt::InMemory => ReportConfig::default().enable_in_memory().init(),
        ReporterOpt::Noop => ReportConfig::default().init(),
    };
    let run_id = definition.run_id.clone();

    let mut experiment = definition.into_experiment()?.with_progress(progress);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));
    let context = RunnerContext::new(
        executor,
        Arc::new(reporter),
        shutdown_handle.clone(),
        run_id,
    );

    let factory = connect(&context).context("Failed to create client factory")?;

    let mut report = match format {
        OutputFormat::Csv => CsvReport::from_path(&output_file)?,
    };

    // High harness CPU inflates measured latencies.
    start_monitor(shutdown_handle.new_listener());

    let result = experiment.run(&context, &factory, &mut report);

    context.reporter().finalize();
    // Stops the monitor thread.
    shutdown_handle.shutdown();

    let rows = result?;
    log::info!(
        "Wrote {} rows to {}",
        rows.len(),
        output_file.display()
    );

    Ok(rows)
}
