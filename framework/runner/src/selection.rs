use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;
use crate::query::{QueryDefinition, QuerySet};

/// Chooses the query each worker of a scenario runs.
///
/// Called once per worker, from the thread that dispatches the workers, so the sequence of
/// choices is reproducible for a seeded selector.
pub trait QuerySelector: Send {
    fn select<'a>(&mut self, queries: &'a [QueryDefinition]) -> Option<&'a QueryDefinition>;
}

/// Every query is equally likely.
#[derive(Debug)]
pub struct UniformSelector {
    rng: StdRng,
}

impl UniformSelector {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl QuerySelector for UniformSelector {
    fn select<'a>(&mut self, queries: &'a [QueryDefinition]) -> Option<&'a QueryDefinition> {
        if queries.is_empty() {
            return None;
        }

        queries.get(self.rng.gen_range(0..queries.len()))
    }
}

/// Queries are picked with probability proportional to their weight. Queries without a weight
/// count as weight 1.
#[derive(Debug)]
pub struct WeightedSelector {
    rng: StdRng,
    index: WeightedIndex<u64>,
}

impl WeightedSelector {
    pub fn new(queries: &[QueryDefinition], rng: StdRng) -> Result<Self, ConfigError> {
        let index = WeightedIndex::new(queries.iter().map(|q| u64::from(q.weight.unwrap_or(1))))
            .map_err(|e| ConfigError::InvalidWeights(e.to_string()))?;

        Ok(Self { rng, index })
    }
}

impl QuerySelector for WeightedSelector {
    fn select<'a>(&mut self, queries: &'a [QueryDefinition]) -> Option<&'a QueryDefinition> {
        queries.get(self.index.sample(&mut self.rng))
    }
}

/// The selector for a query set: weighted when any query has a weight, uniform otherwise.
///
/// With a seed the choices are deterministic, otherwise the generator is seeded from the OS.
pub fn selector_for(
    query_set: &QuerySet,
    seed: Option<u64>,
) -> Result<Box<dyn QuerySelector>, ConfigError> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if query_set.is_weighted() {
        Ok(Box::new(WeightedSelector::new(query_set.queries(), rng)?))
    } else {
        Ok(Box::new(UniformSelector::new(rng)))
    }
}
