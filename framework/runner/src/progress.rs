use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar over every worker of every scenario in the plan.
#[derive(Debug, Clone)]
pub struct ExperimentProgress {
    bar: ProgressBar,
}

impl ExperimentProgress {
    pub fn new(total_workers: usize) -> Self {
        let bar = ProgressBar::new(total_workers as u64);
        match ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} workers {msg}",
        ) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("Using default progress style: {e}"),
        }

        Self { bar }
    }

    /// A progress tracker that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden()),
        }
    }

    pub(crate) fn start_scenario(&self, concurrency: usize) {
        self.bar
            .set_message(format!("(scenario with {concurrency} threads)"));
    }

    pub(crate) fn worker_finished(&self) {
        self.bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        log::trace!("Progress finished at {} workers", self.bar.position());
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}
