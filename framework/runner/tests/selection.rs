use std::collections::HashMap;

use query_bench_runner::prelude::*;

const DRAWS: usize = 40_000;

fn counts(set: &QuerySet, seed: u64) -> HashMap<String, usize> {
    let mut selector = selector_for(set, Some(seed)).unwrap();
    let mut counts = HashMap::new();
    for _ in 0..DRAWS {
        let query = selector.select(set.queries()).unwrap();
        *counts.entry(query.name.clone()).or_insert(0) += 1;
    }
    counts
}

fn chi_square(observed: &HashMap<String, usize>, expected: &HashMap<String, f64>) -> f64 {
    expected
        .iter()
        .map(|(name, expected)| {
            let observed = observed.get(name).copied().unwrap_or_default() as f64;
            (observed - expected).powi(2) / expected
        })
        .sum()
}

#[test]
fn unweighted_selection_is_uniform() {
    let set = QuerySet::new(
        "uniform",
        ["a", "b", "c", "d"]
            .iter()
            .map(|name| QueryDefinition::new(*name, "SELECT 1"))
            .collect(),
    )
    .unwrap();

    for seed in [1, 2, 3] {
        let observed = counts(&set, seed);
        let expected = set
            .queries()
            .iter()
            .map(|q| (q.name.clone(), DRAWS as f64 / 4.0))
            .collect();

        // Critical value for 3 degrees of freedom at p = 0.001
        let statistic = chi_square(&observed, &expected);
        assert!(statistic < 16.27, "chi-square {statistic} for seed {seed}");
    }
}

#[test]
fn weighted_selection_follows_weights() {
    let set = QuerySet::new(
        "weighted",
        vec![
            QueryDefinition::new("light", "SELECT 1"),
            QueryDefinition::new("heavy", "SELECT 2").with_weight(3),
        ],
    )
    .unwrap();

    let observed = counts(&set, 8);
    let expected = HashMap::from([
        ("light".to_string(), DRAWS as f64 / 4.0),
        ("heavy".to_string(), DRAWS as f64 * 3.0 / 4.0),
    ]);

    // Critical value for 1 degree of freedom at p = 0.001
    let statistic = chi_square(&observed, &expected);
    assert!(statistic < 10.83, "chi-square {statistic}");
}
