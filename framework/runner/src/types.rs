/// Recommended error type for a benchmark `main` function and for client factory hooks passed to
/// [crate::run::run]. Typed errors such as [crate::error::ConfigError] convert into it with `?`.
pub type QueryBenchResult<T> = anyhow::Result<T>;
