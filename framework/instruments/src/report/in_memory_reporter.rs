mod operations_table;

use std::collections::BTreeMap;
use std::time::Duration;

use tabled::settings::Style;
use tabled::Table;

use crate::report::in_memory_reporter::operations_table::OperationRow;
use crate::report::ReportCollector;
use crate::OperationRecord;

/// Keeps every operation in memory and prints a summary table of them at the end of the run.
#[derive(Default)]
pub struct InMemoryReporter {
    operation_records: Vec<OperationRecord>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn summarise(&self) -> Vec<OperationRow> {
        self.operation_records
            .iter()
            .fold(
                BTreeMap::<&str, Vec<&OperationRecord>>::new(),
                |mut acc, record| {
                    acc.entry(record.operation_id.as_str())
                        .or_default()
                        .push(record);
                    acc
                },
            )
            .into_iter()
            .map(|(operation_id, operations)| {
                let total_operations = operations.len();
                let total_duration_micro = operations
                    .iter()
                    .filter_map(|record| record.duration())
                    .map(|d| d.as_micros())
                    .sum::<u128>();

                let successful = || {
                    operations
                        .iter()
                        .filter(|op| !op.is_error)
                        .filter_map(|op| op.duration())
                };

                OperationRow {
                    operation_id: operation_id.to_string(),
                    total_operations,
                    errors: operations.iter().filter(|op| op.is_error).count(),
                    avg_time_ms: (total_duration_micro as f64 / total_operations as f64) / 1000.0,
                    min_time_ms: successful().min().map(as_millis),
                    max_time_ms: successful().max().map(as_millis),
                    total_duration_ms: total_duration_micro as f64 / 1000.0,
                }
            })
            .collect()
    }

    fn print_summary_of_operations(&self) {
        if self.operation_records.is_empty() {
            log::debug!("No operations recorded");
            return;
        }

        println!("\nSummary of operations");
        let mut table = Table::new(self.summarise());
        table.with(Style::modern());

        println!("{table}");
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        self.operation_records.push(operation_record.clone());
    }

    fn finalize(&self) {
        self.print_summary_of_operations();
    }
}
