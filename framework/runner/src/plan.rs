use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::ConfigError;

/// Upper bound on the number of scenarios a single plan may expand to.
pub const MAX_PLAN_LEVELS: usize = 10_000;

/// The ordered concurrency levels of an experiment, one scenario per level.
///
/// Parsed from a comma separated list where each entry is either a single level `N` or an
/// inclusive range `A..B`, optionally with a step `A..B:STEP`. For example `1,2,4..16:4` is the
/// plan `1,2,4,8,12,16`. Levels may repeat and are run in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlan(Vec<NonZeroUsize>);

impl ScenarioPlan {
    /// A plan with a single scenario, as used by `--threads`.
    pub fn single(concurrency: NonZeroUsize) -> Self {
        Self(vec![concurrency])
    }

    pub fn levels(&self) -> &[NonZeroUsize] {
        &self.0
    }

    /// Total number of workers started across every scenario of the plan.
    pub fn total_workers(&self) -> usize {
        self.0.iter().map(|level| level.get()).sum()
    }
}

impl FromStr for ScenarioPlan {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidScenarioPlan {
            plan: s.to_string(),
            reason,
        };

        let too_long =
            || invalid(format!("plan expands to more than {MAX_PLAN_LEVELS} scenarios"));

        let mut levels = Vec::new();
        for token in s.split(',').map(str::trim) {
            if token.is_empty() {
                return Err(invalid("empty entry".to_string()));
            }

            match token.split_once("..") {
                None => {
                    if levels.len() == MAX_PLAN_LEVELS {
                        return Err(too_long());
                    }
                    levels.push(parse_level(token).map_err(invalid)?);
                }
                Some((start, rest)) => {
                    let (end, step) = match rest.split_once(':') {
                        Some((end, step)) => (end, parse_level(step).map_err(invalid)?),
                        None => (rest, NonZeroUsize::MIN),
                    };
                    let start = parse_level(start).map_err(invalid)?;
                    let end = parse_level(end).map_err(invalid)?;
                    if end < start {
                        return Err(invalid(format!("range {token} is descending")));
                    }

                    let count = (end.get() - start.get()) / step.get() + 1;
                    if count > MAX_PLAN_LEVELS - levels.len() {
                        return Err(too_long());
                    }

                    levels.extend(
                        (start.get()..=end.get())
                            .step_by(step.get())
                            .filter_map(NonZeroUsize::new),
                    );
                }
            }
        }

        Ok(Self(levels))
    }
}

fn parse_level(value: &str) -> Result<NonZeroUsize, String> {
    let value = value.trim();
    value
        .parse::<NonZeroUsize>()
        .map_err(|_| format!("{value:?} is not a positive integer"))
}

impl Display for ScenarioPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn levels(plan: &str) -> Vec<usize> {
        plan.parse::<ScenarioPlan>()
            .unwrap()
            .levels()
            .iter()
            .map(|l| l.get())
            .collect()
    }

    #[test]
    fn parse_list() {
        assert_eq!(vec![10, 20, 30, 40], levels("10,20,30,40"));
        assert_eq!(vec![1, 2], levels(" 1, 2 "));
        assert_eq!(vec![4, 4], levels("4,4"));
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(vec![1, 2, 3], levels("1..3"));
        assert_eq!(vec![1, 4, 8, 12, 16], levels("1,4..16:4"));
        assert_eq!(vec![2, 5], levels("2..6:3"));
        assert_eq!(vec![5], levels("5..5"));
    }

    #[test]
    fn reject_invalid_plans() {
        for plan in ["", "1,,2", "0", "-1", "a", "3..1", "1..4:0", "1..", "..4"] {
            let result = plan.parse::<ScenarioPlan>();
            assert!(
                matches!(result, Err(ConfigError::InvalidScenarioPlan { .. })),
                "expected {plan:?} to be rejected"
            );
        }
    }

    #[test]
    fn reject_plans_with_too_many_levels() {
        for plan in [
            "1..1000000000".to_string(),
            format!("1..{}", MAX_PLAN_LEVELS + 1),
            format!("1..{MAX_PLAN_LEVELS},1"),
        ] {
            assert!(
                matches!(
                    plan.parse::<ScenarioPlan>(),
                    Err(ConfigError::InvalidScenarioPlan { .. })
                ),
                "expected {plan:?} to be rejected"
            );
        }

        assert_eq!(MAX_PLAN_LEVELS, levels(&format!("1..{MAX_PLAN_LEVELS}")).len());
        assert_eq!(4, levels("1..1000000000:250000000").len());
    }

    #[test]
    fn display_and_totals() {
        let plan: ScenarioPlan = "1..3,10".parse().unwrap();
        assert_eq!("1,2,3,10", plan.to_string());
        assert_eq!(16, plan.total_workers());
        assert_eq!(1, ScenarioPlan::single(NonZeroUsize::MIN).total_workers());
    }
}
