#[derive(Debug, thiserror::Error)]
pub enum BigQueryError {
    #[error("HTTP request to BigQuery failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("BigQuery returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("BigQuery job {job_id} failed ({reason}): {message}")]
    Job {
        job_id: String,
        reason: String,
        message: String,
    },
    #[error("BigQuery response is missing {0}")]
    MalformedResponse(&'static str),
}
