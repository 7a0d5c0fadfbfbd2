use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use query_bench_core::prelude::{ClientFactory, JobStatistics, QueryClient, QueryJob, QueryJobConfig};
use query_bench_instruments::{report_operation, OperationRecord, Reporter};
use serde::de::DeserializeOwned;

use crate::api::{
    ApiErrorResponse, GetQueryResultsResponse, InsertJobRequest, Job, JobConfiguration,
    JobReference, NewJobReference, QueryConfiguration,
};
use crate::config::BigQueryConfig;
use crate::error::BigQueryError;
use crate::labels::{sanitize_label_key, sanitize_label_value};

/// Creates a [BigQueryClient] with its own HTTP connection pool for every worker.
#[derive(Debug, Clone)]
pub struct BigQueryClientFactory {
    config: Arc<BigQueryConfig>,
    reporter: Arc<Reporter>,
}

impl BigQueryClientFactory {
    pub fn new(config: BigQueryConfig, reporter: Arc<Reporter>) -> Self {
        Self {
            config: Arc::new(config),
            reporter,
        }
    }
}

impl ClientFactory for BigQueryClientFactory {
    type Client = BigQueryClient;

    fn connect(&self, worker_id: usize) -> anyhow::Result<Self::Client> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("query-bench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BigQueryError::from)?;

        log::debug!("Created BigQuery client for worker {worker_id}");

        Ok(BigQueryClient {
            connection: Connection {
                http,
                config: self.config.clone(),
                reporter: self.reporter.clone(),
                worker_id,
            },
        })
    }
}

#[derive(Debug, Clone)]
struct Connection {
    http: reqwest::Client,
    config: Arc<BigQueryConfig>,
    reporter: Arc<Reporter>,
    worker_id: usize,
}

impl Connection {
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send the request and record its timing as `operation_id`.
    async fn call<T: DeserializeOwned>(
        &self,
        operation_id: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BigQueryError> {
        let record = OperationRecord::new(operation_id).with_attr("worker", self.worker_id);
        let result = send(self.authorize(request)).await;
        report_operation(&self.reporter, record, &result);
        result
    }

    fn location_query(&self, location: Option<&str>) -> Vec<(&'static str, String)> {
        location
            .or(self.config.location.as_deref())
            .map(|location| vec![("location", location.to_string())])
            .unwrap_or_default()
    }
}

async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, BigQueryError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BigQueryError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(error) if !error.error.message.is_empty() => error.error.message,
        _ if body.is_empty() => "no response body".to_string(),
        _ => body.to_string(),
    }
}

fn job_labels(config: &QueryJobConfig) -> BTreeMap<String, String> {
    config
        .labels
        .iter()
        .map(|(key, value)| (sanitize_label_key(key), sanitize_label_value(value)))
        .collect()
}

/// A connection to the BigQuery REST API, owned by one worker.
#[derive(Debug)]
pub struct BigQueryClient {
    connection: Connection,
}

impl QueryClient for BigQueryClient {
    type Job = BigQueryJob;

    fn submit<'a>(
        &'a mut self,
        sql: &'a str,
        config: &'a QueryJobConfig,
    ) -> BoxFuture<'a, anyhow::Result<Self::Job>> {
        async move {
            let connection = &self.connection;
            let body = InsertJobRequest {
                configuration: JobConfiguration {
                    query: QueryConfiguration {
                        query: sql,
                        use_legacy_sql: false,
                        use_query_cache: config.use_cache,
                        maximum_bytes_billed: config.maximum_bytes_billed.map(|b| b.to_string()),
                    },
                    labels: job_labels(config),
                },
                job_reference: connection.config.location.as_deref().map(|location| {
                    NewJobReference {
                        project_id: &connection.config.project_id,
                        location,
                    }
                }),
            };

            let job: Job = connection
                .call(
                    "bigquery_insert_job",
                    connection.http.post(connection.config.jobs_url()).json(&body),
                )
                .await?;
            let job_reference = job
                .job_reference
                .ok_or(BigQueryError::MalformedResponse("jobReference"))?;

            log::debug!(
                "Worker {} submitted job {}",
                connection.worker_id,
                job_reference.job_id
            );

            Ok(BigQueryJob {
                connection: connection.clone(),
                job_reference,
            })
        }
        .boxed()
    }
}

/// A submitted query job.
#[derive(Debug)]
pub struct BigQueryJob {
    connection: Connection,
    job_reference: JobReference,
}

impl BigQueryJob {
    pub fn job_id(&self) -> &str {
        &self.job_reference.job_id
    }

    async fn wait_for_completion(&self) -> Result<JobStatistics, BigQueryError> {
        let connection = &self.connection;
        let job_id = self.job_id();
        let location = self.job_reference.location.as_deref();

        loop {
            let mut query = connection.location_query(location);
            query.push(("maxResults", "0".to_string()));
            query.push((
                "timeoutMs",
                connection.config.poll_timeout.as_millis().to_string(),
            ));

            let results: GetQueryResultsResponse = connection
                .call(
                    "bigquery_get_query_results",
                    connection
                        .http
                        .get(connection.config.query_results_url(job_id))
                        .query(&query),
                )
                .await?;

            if results.job_complete {
                break;
            }
            log::trace!("Job {job_id} is still running");
        }

        let job: Job = connection
            .call(
                "bigquery_get_job",
                connection
                    .http
                    .get(connection.config.job_url(job_id))
                    .query(&connection.location_query(location)),
            )
            .await?;

        log::trace!("Job {job_id} finished in state {:?}", job.status.state);
        if let Some(error) = job.status.error_result {
            return Err(BigQueryError::Job {
                job_id: job_id.to_string(),
                reason: error.reason,
                message: error.message,
            });
        }

        Ok(JobStatistics {
            bytes_processed: job.bytes_processed(),
            bytes_billed: job.bytes_billed(),
            slot_millis: job.slot_millis(),
        })
    }
}

impl QueryJob for BigQueryJob {
    fn wait(&mut self) -> BoxFuture<'_, anyhow::Result<JobStatistics>> {
        async move { Ok(self.wait_for_completion().await?) }.boxed()
    }
}
