//! Subset of the BigQuery REST v2 resources used to run a query job and read its statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertJobRequest<'a> {
    pub configuration: JobConfiguration<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_reference: Option<NewJobReference<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewJobReference<'a> {
    pub project_id: &'a str,
    pub location: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobConfiguration<'a> {
    pub query: QueryConfiguration<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryConfiguration<'a> {
    pub query: &'a str,
    pub use_legacy_sql: bool,
    pub use_query_cache: bool,
    /// int64 values are encoded as strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_bytes_billed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Job {
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub statistics: JobStatisticsResource,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error_result: Option<ErrorProto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobStatisticsResource {
    #[serde(default, deserialize_with = "int64")]
    pub total_bytes_processed: Option<u64>,
    #[serde(default)]
    pub query: Option<QueryStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryStatistics {
    #[serde(default, deserialize_with = "int64")]
    pub total_bytes_processed: Option<u64>,
    #[serde(default, deserialize_with = "int64")]
    pub total_bytes_billed: Option<u64>,
    #[serde(default, deserialize_with = "int64")]
    pub total_slot_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetQueryResultsResponse {
    #[serde(default)]
    pub job_complete: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

/// BigQuery encodes int64 fields as JSON strings, but emulators sometimes send numbers.
fn int64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        String(String),
        Number(u64),
    }

    match Option::<Int64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int64::Number(n)) => Ok(Some(n)),
        Some(Int64::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl Job {
    pub fn bytes_processed(&self) -> u64 {
        self.statistics
            .total_bytes_processed
            .or_else(|| {
                self.statistics
                    .query
                    .as_ref()
                    .and_then(|q| q.total_bytes_processed)
            })
            .unwrap_or_default()
    }

    pub fn bytes_billed(&self) -> u64 {
        self.statistics
            .query
            .as_ref()
            .and_then(|q| q.total_bytes_billed)
            .unwrap_or_default()
    }

    pub fn slot_millis(&self) -> u64 {
        self.statistics
            .query
            .as_ref()
            .and_then(|q| q.total_slot_ms)
            .unwrap_or_default()
    }
}
