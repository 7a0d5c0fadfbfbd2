mod report;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use report::{InMemoryReporter, ReportCollector, ReportConfig, Reporter};

/// Timing record for a single call to a remote service.
///
/// Create the record immediately before making the call and pass it to [report_operation] with
/// the call's result once it returns.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    started: Instant,
    pub elapsed: Option<Duration>,
    pub is_error: bool,
    pub attr: BTreeMap<String, String>,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
            attr: BTreeMap::new(),
        }
    }

    /// Attach an attribute, such as the worker or query that made the call.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attr.insert(key.into(), value.to_string());
        self
    }

    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    fn finish(mut self, is_error: bool) -> Self {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = is_error;
        self
    }
}

/// Complete the record using the outcome of the call and hand it to the reporter.
pub fn report_operation<T, E>(
    reporter: &Reporter,
    operation_record: OperationRecord,
    response: &Result<T, E>,
) {
    let record = operation_record.finish(response.is_err());
    log::trace!(
        "Operation {} took {:?}, failed? {}",
        record.operation_id,
        record.elapsed,
        record.is_error
    );
    reporter.add_operation(&record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct CapturingCollector {
        records: Arc<Mutex<Vec<OperationRecord>>>,
    }

    impl ReportCollector for CapturingCollector {
        fn add_operation(&mut self, operation_record: &OperationRecord) {
            self.records.lock().push(operation_record.clone());
        }

        fn finalize(&self) {}
    }

    #[test]
    fn report_operation_records_elapsed_and_error_flag() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let reporter = Reporter::new(vec![Box::new(CapturingCollector {
            records: records.clone(),
        })]);

        report_operation(
            &reporter,
            OperationRecord::new("submit").with_attr("worker", 3),
            &Ok::<_, ()>(()),
        );
        report_operation(&reporter, OperationRecord::new("wait"), &Err::<(), _>("boom"));

        let records = records.lock();
        assert_eq!(2, records.len());

        assert_eq!("submit", records[0].operation_id);
        assert!(!records[0].is_error);
        assert!(records[0].elapsed.is_some());
        assert_eq!(Some(&"3".to_string()), records[0].attr.get("worker"));

        assert_eq!("wait", records[1].operation_id);
        assert!(records[1].is_error);
    }
}
