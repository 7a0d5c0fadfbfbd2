use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::OutputError;
use crate::scenario::QueryTrials;
use crate::statistic::{Reduction, StatisticSet};

/// Written to a cell whose statistic could not be computed.
pub const MISSING_VALUE: &str = "NaN";

/// One line of the experiment results: a query within one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub query_name: String,
    /// Workers that ran the query to completion.
    pub num_threads: usize,
    pub num_samples: usize,
    /// One value per statistic, in the order of the statistic set.
    pub values: Vec<Reduction>,
}

impl ReportRow {
    pub fn new(trials: &QueryTrials, statistics: &StatisticSet) -> Self {
        let values = statistics.apply(&trials.pooled_latencies());
        for (name, value) in statistics.names().iter().zip(&values) {
            if let Err(e) = value {
                log::warn!(
                    "Statistic {} for query {:?} could not be computed: {}",
                    name,
                    trials.query_name,
                    e
                );
            }
        }

        Self {
            query_name: trials.query_name.clone(),
            num_threads: trials.worker_count(),
            num_samples: trials.total_samples(),
            values,
        }
    }

    pub fn cells(&self) -> Vec<String> {
        [
            self.query_name.clone(),
            self.num_threads.to_string(),
            self.num_samples.to_string(),
        ]
        .into_iter()
        .chain(self.values.iter().map(|value| match value {
            Ok(value) => format!("{value:?}"),
            Err(_) => MISSING_VALUE.to_string(),
        }))
        .collect()
    }
}

/// The column names of every report, followed by one per statistic.
pub fn header(statistics: &StatisticSet) -> Vec<String> {
    ["query_name", "num_threads", "num_samples"]
        .into_iter()
        .chain(statistics.names())
        .map(str::to_string)
        .collect()
}

/// A sink for experiment results.
pub trait Report {
    type Error;

    /// Called once, before any row.
    fn header(&mut self, columns: &[String]) -> Result<(), Self::Error>;

    fn report(&mut self, row: &ReportRow) -> Result<(), Self::Error>;

    /// Called once after the last row, including when the experiment stops early.
    fn finish(&mut self) -> Result<(), Self::Error>;
}

/// Writes the results as CSV. Every row is flushed as soon as it is written.
pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvReport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W, OutputError> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Flush(e.into_error()))
    }
}

impl CsvReport<File> {
    /// Create or truncate the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, OutputError> {
        let path = path.as_ref();
        let writer = csv::Writer::from_path(path).map_err(|source| OutputError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self { writer })
    }
}

impl<W: Write> Report for CsvReport<W> {
    type Error = OutputError;

    fn header(&mut self, columns: &[String]) -> Result<(), Self::Error> {
        self.writer.write_record(columns)?;
        self.writer.flush()?;
        Ok(())
    }

    fn report(&mut self, row: &ReportRow) -> Result<(), Self::Error> {
        log::debug!("Writing report row for query {:?}", row.query_name);
        self.writer.write_record(row.cells())?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.writer.flush()?;
        Ok(())
    }
}
