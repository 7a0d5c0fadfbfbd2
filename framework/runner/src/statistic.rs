use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use itertools::Itertools;

use crate::error::ConfigError;

/// Number of deviations a sample may be from the centre before trimming drops it.
pub const DEFAULT_TRIM_M: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReductionError {
    #[error("no samples to reduce")]
    Empty,
    #[error("every sample was trimmed as an outlier")]
    AllTrimmed,
}

pub type Reduction = Result<f64, ReductionError>;

pub fn mean(data: &[f64]) -> Reduction {
    if data.is_empty() {
        return Err(ReductionError::Empty);
    }

    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Reduction {
    let mean = mean(data)?;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64;
    Ok(variance.sqrt())
}

pub fn min(data: &[f64]) -> Reduction {
    data.iter()
        .copied()
        .reduce(f64::min)
        .ok_or(ReductionError::Empty)
}

pub fn max(data: &[f64]) -> Reduction {
    data.iter()
        .copied()
        .reduce(f64::max)
        .ok_or(ReductionError::Empty)
}

pub fn median(data: &[f64]) -> Reduction {
    percentile(data, 50.0)
}

/// The `p`th percentile, interpolating linearly between the closest ranks.
pub fn percentile(data: &[f64], p: f64) -> Reduction {
    if data.is_empty() {
        return Err(ReductionError::Empty);
    }

    let sorted = data.iter().copied().sorted_by(f64::total_cmp).collect::<Vec<_>>();
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64))
}

/// Keep the samples within `m` population standard deviations of the mean.
pub fn std_trim(data: &[f64], m: f64) -> Result<Vec<f64>, ReductionError> {
    let mean = mean(data)?;
    let limit = m * std_dev(data)?;

    survivors(data.iter().copied().filter(|x| (x - mean).abs() <= limit))
}

/// Keep the samples whose distance from the median, scaled by the median of those distances, is
/// at most `m`. A zero median distance scales by 1.
pub fn median_trim(data: &[f64], m: f64) -> Result<Vec<f64>, ReductionError> {
    let median = median(data)?;
    let distances = data.iter().map(|x| (x - median).abs()).collect::<Vec<_>>();
    let mdev = percentile(&distances, 50.0)?;
    let scale = if mdev == 0.0 { 1.0 } else { mdev };

    survivors(
        data.iter()
            .zip(distances)
            .filter(|(_, distance)| distance / scale <= m)
            .map(|(x, _)| *x),
    )
}

fn survivors(kept: impl Iterator<Item = f64>) -> Result<Vec<f64>, ReductionError> {
    let kept = kept.collect::<Vec<_>>();
    if kept.is_empty() {
        Err(ReductionError::AllTrimmed)
    } else {
        Ok(kept)
    }
}

/// A named reduction of a collection of samples to a single value.
#[derive(Clone)]
pub struct Statistic {
    name: String,
    reducer: Arc<dyn Fn(&[f64]) -> Reduction + Send + Sync>,
}

impl Statistic {
    pub fn new(
        name: impl Into<String>,
        reducer: impl Fn(&[f64]) -> Reduction + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reducer: Arc::new(reducer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, data: &[f64]) -> Reduction {
        (self.reducer)(data)
    }
}

impl Debug for Statistic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statistic")
            .field("name", &self.name)
            .finish()
    }
}

/// The ordered statistics computed for every report row.
#[derive(Debug, Clone)]
pub struct StatisticSet {
    statistics: Vec<Statistic>,
}

impl StatisticSet {
    pub fn new(statistics: Vec<Statistic>) -> Result<Self, ConfigError> {
        if let Some(duplicate) = statistics.iter().map(Statistic::name).duplicates().next() {
            return Err(ConfigError::DuplicateStatistic(duplicate.to_string()));
        }

        Ok(Self { statistics })
    }

    /// Every built in statistic, in report order.
    pub fn standard() -> Self {
        Self {
            statistics: vec![
                Statistic::new("mean", mean),
                Statistic::new("std_dev", std_dev),
                Statistic::new("min", min),
                Statistic::new("min_median_trim", |x| min(&median_trim(x, DEFAULT_TRIM_M)?)),
                Statistic::new("min_std_trim", |x| min(&std_trim(x, DEFAULT_TRIM_M)?)),
                Statistic::new("max", max),
                Statistic::new("max_median_trim", |x| max(&median_trim(x, DEFAULT_TRIM_M)?)),
                Statistic::new("max_std_trim", |x| max(&std_trim(x, DEFAULT_TRIM_M)?)),
                Statistic::new("95th_percentile", |x| percentile(x, 95.0)),
                Statistic::new("5th_percentile", |x| percentile(x, 5.0)),
            ],
        }
    }

    /// A subset of the built in statistics, in the order named.
    pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let standard = Self::standard();
        let statistics = names
            .iter()
            .map(|name| {
                let name = name.as_ref().trim();
                standard
                    .statistics
                    .iter()
                    .find(|s| s.name == name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownStatistic {
                        name: name.to_string(),
                        known: standard.names().join(", "),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(statistics)
    }

    pub fn names(&self) -> Vec<&str> {
        self.statistics.iter().map(Statistic::name).collect()
    }

    pub fn len(&self) -> usize {
        self.statistics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }

    /// Apply every statistic to `data`, in order.
    pub fn apply(&self, data: &[f64]) -> Vec<Reduction> {
        self.statistics.iter().map(|s| s.apply(data)).collect()
    }
}

impl Default for StatisticSet {
    fn default() -> Self {
        Self::standard()
    }
}
