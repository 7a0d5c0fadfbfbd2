use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use futures::future::BoxFuture;
use query_bench_core::prelude::{QueryClient, QueryJobConfig};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Label applied to every job with the (sanitised by the binding) name of the query it runs.
pub const QUERY_NAME_LABEL: &str = "query_bench_query";

const DEFAULT_SET_NAME: &str = "Default";
const DEFAULT_QUERY_SQL: &str = "SELECT name FROM `bigquery-public-data.usa_names.usa_1910_2013` \
                                 WHERE state = \"TX\" LIMIT 100";

/// Format of the final results file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
}

/// Options that apply to every query of an experiment unless the query overrides them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub use_cache: bool,
    pub format: OutputFormat,
    pub maximum_bytes_billed: Option<u64>,
    pub labels: BTreeMap<String, String>,
}

/// Per-query overrides, as they appear in a query file.
///
/// Option keys that the runner does not know are kept in `ignored` so they can be reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub use_cache: Option<bool>,
    #[serde(default)]
    pub maximum_bytes_billed: Option<u64>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(flatten)]
    pub ignored: BTreeMap<String, serde_json::Value>,
}

impl QueryOptions {
    /// Merge these overrides onto the global options. Values set on the query win, labels are
    /// merged key by key.
    pub fn resolve(&self, global: &GlobalOptions) -> QueryJobConfig {
        let mut labels = global.labels.clone();
        labels.extend(self.labels.iter().map(|(k, v)| (k.clone(), v.clone())));

        QueryJobConfig {
            use_cache: self.use_cache.unwrap_or(global.use_cache),
            maximum_bytes_billed: self.maximum_bytes_billed.or(global.maximum_bytes_billed),
            labels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    pub sql: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: QueryOptions,
    #[serde(default)]
    pub weight: Option<u32>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl QueryDefinition {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            options: QueryOptions::default(),
            weight: None,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// The job configuration this query runs with under the given global options.
    pub fn job_config(&self, global: &GlobalOptions) -> QueryJobConfig {
        let mut config = self.options.resolve(global);
        config
            .labels
            .insert(QUERY_NAME_LABEL.to_string(), self.name.clone());
        config
    }

    /// Submit this query without waiting for it to complete.
    pub fn execute<'a, C: QueryClient>(
        &'a self,
        client: &'a mut C,
        config: &'a QueryJobConfig,
    ) -> BoxFuture<'a, anyhow::Result<C::Job>> {
        client.submit(&self.sql, config)
    }
}

/// A named, validated, ordered collection of queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    name: String,
    queries: Vec<QueryDefinition>,
}

#[derive(Deserialize)]
struct QueryFile {
    name: String,
    queries: Vec<QueryDefinition>,
}

impl QuerySet {
    pub fn new(
        name: impl Into<String>,
        queries: Vec<QueryDefinition>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if queries.is_empty() {
            return Err(ConfigError::NoQueries(name));
        }

        let mut seen = HashSet::new();
        for query in &queries {
            if !seen.insert(query.name.as_str()) {
                return Err(ConfigError::DuplicateQueryName(query.name.clone()));
            }
        }

        if queries.iter().any(|q| q.weight.is_some()) {
            let total: u64 = queries
                .iter()
                .map(|q| u64::from(q.weight.unwrap_or(1)))
                .sum();
            if total == 0 {
                return Err(ConfigError::InvalidWeights(
                    "the weights of all queries sum to zero".to_string(),
                ));
            }
        }

        Ok(Self { name, queries })
    }

    /// The set used when no query file is given.
    pub fn default_set() -> Self {
        Self {
            name: DEFAULT_SET_NAME.to_string(),
            queries: vec![QueryDefinition::new(DEFAULT_SET_NAME, DEFAULT_QUERY_SQL).with_weight(1)],
        }
    }

    /// Load a query set from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let is_json = match extension.as_deref() {
            Some("json") => true,
            Some("yaml") | Some("yml") => false,
            _ => {
                return Err(ConfigError::UnsupportedExtension {
                    path: path.to_path_buf(),
                })
            }
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: QueryFile = if is_json {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        for query in &file.queries {
            if !query.options.ignored.is_empty() {
                log::warn!(
                    "Ignoring unsupported options {:?} of query {:?}",
                    query.options.ignored.keys().collect::<Vec<_>>(),
                    query.name
                );
            }
        }

        log::debug!(
            "Loaded query set {} with {} queries from {}",
            file.name,
            file.queries.len(),
            path.display()
        );

        Self::new(file.name, file.queries)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queries(&self) -> &[QueryDefinition] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub(crate) fn is_weighted(&self) -> bool {
        self.queries.iter().any(|q| q.weight.is_some())
    }
}

impl std::fmt::Display for QuerySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QuerySet(name = {}, queries = {})", self.name, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn query_options_override_global_options() {
        let global = GlobalOptions {
            use_cache: true,
            maximum_bytes_billed: Some(100),
            labels: BTreeMap::from([
                ("team".to_string(), "data".to_string()),
                ("env".to_string(), "dev".to_string()),
            ]),
            ..Default::default()
        };
        let options = QueryOptions {
            use_cache: Some(false),
            maximum_bytes_billed: None,
            labels: BTreeMap::from([("env".to_string(), "prod".to_string())]),
            ..Default::default()
        };

        let config = options.resolve(&global);

        assert_eq!(
            QueryJobConfig {
                use_cache: false,
                maximum_bytes_billed: Some(100),
                labels: BTreeMap::from([
                    ("env".to_string(), "prod".to_string()),
                    ("team".to_string(), "data".to_string()),
                ]),
            },
            config
        );
    }

    #[test]
    fn job_config_is_labelled_with_query_name() {
        let query = QueryDefinition::new("Q1", "SELECT 1");
        let config = query.job_config(&GlobalOptions::default());
        assert_eq!(Some(&"Q1".to_string()), config.labels.get(QUERY_NAME_LABEL));
    }

    #[test]
    fn load_json_with_null_options() {
        let file = write_file(
            ".json",
            r#"{"name": "set", "queries": [
                {"name": "a", "sql": "SELECT 1", "options": null},
                {"name": "b", "sql": "SELECT 2", "options": {"use_cache": true}, "weight": 3}
            ]}"#,
        );

        let set = QuerySet::from_file(file.path()).unwrap();

        assert_eq!("set", set.name());
        assert_eq!(2, set.len());
        assert_eq!(QueryOptions::default(), set.queries()[0].options);
        assert_eq!(Some(true), set.queries()[1].options.use_cache);
        assert_eq!(Some(3), set.queries()[1].weight);
        assert!(set.is_weighted());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let file = write_file(
            ".json",
            r#"{"name": "set", "queries": [
                {"name": "a", "sql": "SELECT 1", "description": "first",
                 "options": {"use_cache": true, "dry_run": false}}
            ]}"#,
        );

        let set = QuerySet::from_file(file.path()).unwrap();

        let options = &set.queries()[0].options;
        assert_eq!(Some(true), options.use_cache);
        assert_eq!(
            vec!["dry_run"],
            options.ignored.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert_eq!(
            QueryOptions {
                use_cache: Some(true),
                ..Default::default()
            }
            .resolve(&GlobalOptions::default()),
            options.resolve(&GlobalOptions::default())
        );
    }

    #[test]
    fn load_yaml() {
        let file = write_file(
            ".yml",
            "name: yaml set\nqueries:\n  - name: a\n    sql: SELECT 1\n  - name: b\n    sql: SELECT 2\n",
        );

        let set = QuerySet::from_file(file.path()).unwrap();

        assert_eq!("yaml set", set.name());
        assert_eq!(vec!["a", "b"], set.queries().iter().map(|q| q.name.as_str()).collect::<Vec<_>>());
        assert!(!set.is_weighted());
    }

    #[test]
    fn reject_unsupported_extension() {
        let file = write_file(".txt", "");
        let err = QuerySet::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedExtension { .. }));
    }

    #[test]
    fn reject_missing_file() {
        let err = QuerySet::from_file("/does/not/exist.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn reject_missing_sql() {
        let file = write_file(".json", r#"{"name": "set", "queries": [{"name": "a"}]}"#);
        let err = QuerySet::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn reject_malformed_yaml() {
        let file = write_file(".yaml", "name: [unclosed\n");
        let err = QuerySet::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn reject_empty_and_duplicate_sets() {
        assert!(matches!(
            QuerySet::new("empty", vec![]),
            Err(ConfigError::NoQueries(_))
        ));
        assert!(matches!(
            QuerySet::new(
                "dup",
                vec![QueryDefinition::new("a", "x"), QueryDefinition::new("a", "y")]
            ),
            Err(ConfigError::DuplicateQueryName(name)) if name == "a"
        ));
    }

    #[test]
    fn reject_zero_total_weight() {
        let err = QuerySet::new(
            "zero",
            vec![
                QueryDefinition::new("a", "x").with_weight(0),
                QueryDefinition::new("b", "y").with_weight(0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWeights(_)));

        QuerySet::new(
            "large",
            vec![
                QueryDefinition::new("a", "x").with_weight(u32::MAX),
                QueryDefinition::new("b", "y").with_weight(u32::MAX),
            ],
        )
        .unwrap();

        // Unset weights count as 1 once any weight is given
        QuerySet::new(
            "partial",
            vec![
                QueryDefinition::new("a", "x").with_weight(0),
                QueryDefinition::new("b", "y"),
            ],
        )
        .unwrap();
    }

    #[test]
    fn default_set_has_one_query() {
        let set = QuerySet::default_set();
        assert_eq!("Default", set.name());
        assert_eq!(1, set.len());
        assert!(set.queries()[0].sql.contains("usa_names"));
    }
}
