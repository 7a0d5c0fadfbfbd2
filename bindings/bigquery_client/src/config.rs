use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// How long each `getQueryResults` call is allowed to wait on the server for the job to finish.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub api_endpoint: String,
    /// Project that jobs are created in and billed to.
    pub project_id: String,
    /// OAuth2 bearer token. Requests are sent unauthenticated without one, which is only useful
    /// against an emulator.
    pub access_token: Option<String>,
    pub location: Option<String>,
    pub poll_timeout: Duration,
}

impl BigQueryConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            project_id: project_id.into(),
            access_token: None,
            location: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub(crate) fn jobs_url(&self) -> String {
        format!(
            "{}/projects/{}/jobs",
            self.api_endpoint.trim_end_matches('/'),
            self.project_id
        )
    }

    pub(crate) fn job_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.jobs_url(), job_id)
    }

    pub(crate) fn query_results_url(&self, job_id: &str) -> String {
        format!(
            "{}/projects/{}/queries/{}",
            self.api_endpoint.trim_end_matches('/'),
            self.project_id,
            job_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn urls() {
        let config = BigQueryConfig {
            api_endpoint: "http://localhost:9050/bigquery/v2/".to_string(),
            ..BigQueryConfig::new("bench")
        };

        assert_eq!("http://localhost:9050/bigquery/v2/projects/bench/jobs", config.jobs_url());
        assert_eq!(
            "http://localhost:9050/bigquery/v2/projects/bench/jobs/job_1",
            config.job_url("job_1")
        );
        assert_eq!(
            "http://localhost:9050/bigquery/v2/projects/bench/queries/job_1",
            config.query_results_url("job_1")
        );
    }
}
