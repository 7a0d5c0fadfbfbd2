use std::path::PathBuf;

/// Problems with the inputs to an experiment. These are fatal and surface before any scenario
/// has started.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported query file extension for {path}, expected .json, .yaml or .yml")]
    UnsupportedExtension { path: PathBuf },
    #[error("Unable to open query file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in query file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed YAML in query file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Query set {0:?} contains no queries")]
    NoQueries(String),
    #[error("Query name {0:?} is used by more than one query")]
    DuplicateQueryName(String),
    #[error("Invalid query weights: {0}")]
    InvalidWeights(String),
    #[error("Invalid scenario plan {plan:?}: {reason}")]
    InvalidScenarioPlan { plan: String, reason: String },
    #[error("The number of samples must be at least 1")]
    ZeroSamples,
    #[error("Unknown statistic {name:?}, expected one of: {known}")]
    UnknownStatistic { name: String, known: String },
    #[error("Statistic {0:?} is configured more than once")]
    DuplicateStatistic(String),
}

/// Failure to open or write the report sink. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Unable to open report file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Unable to write report: {0}")]
    Write(#[from] csv::Error),
    #[error("Unable to flush report: {0}")]
    Flush(#[from] std::io::Error),
}
