mod in_memory_reporter;

use parking_lot::Mutex;

use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;

pub trait ReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    /// Called once at the end of the run, after every operation has been added.
    fn finalize(&self);
}

/// Fans each operation out to the configured collectors.
///
/// Shared between every worker of every scenario, so collectors are individually locked.
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>>,
}

impl Reporter {
    pub fn new(collectors: Vec<Box<dyn ReportCollector + Send>>) -> Self {
        Self {
            collectors: collectors.into_iter().map(Mutex::new).collect(),
        }
    }

    /// A reporter that discards everything.
    pub fn noop() -> Self {
        Self::new(Vec::new())
    }

    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(operation_record);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

#[derive(Default)]
pub struct ReportConfig {
    enable_in_memory: bool,
}

impl ReportConfig {
    pub fn enable_in_memory(mut self) -> Self {
        self.enable_in_memory = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector + Send>> = Vec::new();
        if self.enable_in_memory {
            collectors.push(Box::new(InMemoryReporter::new()));
        }

        Reporter::new(collectors)
    }
}
