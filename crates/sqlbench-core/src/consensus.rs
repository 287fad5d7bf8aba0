//! Majority reducers for judge and run verdicts.
//!
//! Nesting is explicit in the signatures: `majority_consensus` takes one
//! rule set per judge, `majority_consensus_runs` takes one list of judge
//! sets per run and reduces judges within a run before reducing runs.

use crate::errors::EvalError;
use crate::model::{EvaluationType, FinalVerdict, RuleId, RuleSet, RunOutcome};
use std::collections::BTreeMap;

/// `ceil(n / 2)`
pub fn majority_threshold(n: usize) -> usize {
    n.div_ceil(2)
}

/// True iff `count(true) >= count(false)`. Ties go to `true`.
/// Returns `None` for empty input.
pub fn majority_bool(results: &[bool]) -> Option<bool> {
    if results.is_empty() {
        return None;
    }
    let yes = results.iter().filter(|&&v| v).count();
    Some(yes >= results.len() - yes)
}

/// Keeps every rule id named by at least `ceil(n/2)` of the `n` judges.
///
/// An empty set is a judge that matched nothing: it counts towards `n` but
/// casts no vote.
pub fn majority_consensus(judges: &[RuleSet]) -> RuleSet {
    if judges.is_empty() {
        return RuleSet::new();
    }
    keep_majority(judges.iter(), majority_threshold(judges.len()))
}

/// Two-level reduction: each run's judge sets are reduced first, then the
/// per-run consensus sets are reduced with a threshold over runs.
///
/// Runs whose consensus is empty contribute no votes and are not counted.
pub fn majority_consensus_runs(runs: &[Vec<RuleSet>]) -> RuleSet {
    let per_run: Vec<RuleSet> = runs
        .iter()
        .map(|judges| majority_consensus(judges))
        .filter(|s| !s.is_empty())
        .collect();

    if per_run.is_empty() {
        return RuleSet::new();
    }
    keep_majority(per_run.iter(), majority_threshold(per_run.len()))
}

fn keep_majority<'a>(sets: impl Iterator<Item = &'a RuleSet>, threshold: usize) -> RuleSet {
    let mut counts: BTreeMap<&RuleId, usize> = BTreeMap::new();
    for set in sets {
        for id in set {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n >= threshold)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Case-level reduction of the non-failed run outcomes.
///
/// Objective and Hybrid reduce booleans; Subjective reduces judges within
/// each run, then runs.
pub fn reduce_runs(
    kind: EvaluationType,
    case_id: &str,
    outcomes: &[RunOutcome],
) -> Result<FinalVerdict, EvalError> {
    if outcomes.is_empty() {
        return Err(EvalError::AllRunsFailed {
            case_id: case_id.to_string(),
            runs: 0,
        });
    }

    match kind {
        EvaluationType::Objective | EvaluationType::Hybrid => {
            let bools: Vec<bool> = outcomes
                .iter()
                .filter_map(|o| match o {
                    RunOutcome::Bool(b) => Some(*b),
                    RunOutcome::JudgeRules(_) => None,
                })
                .collect();
            majority_bool(&bools)
                .map(FinalVerdict::Bool)
                .ok_or_else(|| EvalError::AllRunsFailed {
                    case_id: case_id.to_string(),
                    runs: outcomes.len() as u32,
                })
        }
        EvaluationType::Subjective => {
            let runs: Vec<Vec<RuleSet>> = outcomes
                .iter()
                .filter_map(|o| match o {
                    RunOutcome::JudgeRules(sets) => Some(sets.clone()),
                    RunOutcome::Bool(_) => None,
                })
                .collect();
            if runs.is_empty() {
                return Err(EvalError::AllRunsFailed {
                    case_id: case_id.to_string(),
                    runs: outcomes.len() as u32,
                });
            }
            Ok(FinalVerdict::Rules(majority_consensus_runs(&runs)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rule_set;

    #[test]
    fn test_majority_bool_ties_to_true() {
        assert_eq!(majority_bool(&[true, false]), Some(true));
        assert_eq!(majority_bool(&[false, false, true]), Some(false));
        assert_eq!(majority_bool(&[true]), Some(true));
        assert_eq!(majority_bool(&[false]), Some(false));
        assert_eq!(majority_bool(&[]), None);
    }

    #[test]
    fn test_majority_bool_monotonic() {
        let mut votes = vec![false, false, false];
        let mut last = majority_bool(&votes).unwrap();
        for _ in 0..4 {
            votes.push(true);
            let now = majority_bool(&votes).unwrap();
            assert!(now >= last, "adding a true vote flipped result to false");
            last = now;
        }
        assert!(last);
    }

    #[test]
    fn test_single_level_consensus() {
        let got = majority_consensus(&[
            rule_set(["1", "2"]),
            rule_set(["1", "3"]),
            rule_set(["1"]),
        ]);
        assert_eq!(got, rule_set(["1"]));

        let none = majority_consensus(&[rule_set(["1"]), rule_set(["2"]), rule_set(["3"])]);
        assert!(none.is_empty());

        let split = majority_consensus(&[
            rule_set(["1"]),
            rule_set(["1"]),
            rule_set(["2"]),
            rule_set(["2"]),
        ]);
        assert_eq!(split, rule_set(["1", "2"]));
    }

    #[test]
    fn test_empty_judge_counts_in_denominator() {
        // 3 judges, threshold 2: a single vote for "1" is not enough.
        let got = majority_consensus(&[rule_set(["1"]), RuleSet::new(), RuleSet::new()]);
        assert!(got.is_empty());
        assert!(majority_consensus(&[]).is_empty());
    }

    #[test]
    fn test_numeric_and_string_ids_are_one_vote_space() {
        let a: RuleSet = [RuleId::from_value(&serde_json::json!(1)).unwrap()]
            .into_iter()
            .collect();
        let b = rule_set(["1"]);
        assert_eq!(majority_consensus(&[a, b, rule_set(["2"])]), rule_set(["1"]));
    }

    #[test]
    fn test_two_level_differs_from_flattening() {
        let runs = vec![
            vec![rule_set(["1", "2"]), rule_set(["1", "3"])],
            vec![rule_set(["1", "2"]), rule_set(["1"])],
        ];

        let manual: Vec<RuleSet> = runs.iter().map(|r| majority_consensus(r)).collect();
        let expected = majority_consensus(&manual);
        let two_level = majority_consensus_runs(&runs);
        assert_eq!(two_level, expected);
        assert_eq!(two_level, rule_set(["1", "2", "3"]));

        let flat: Vec<RuleSet> = runs.into_iter().flatten().collect();
        assert_eq!(majority_consensus(&flat), rule_set(["1", "2"]));
        assert_ne!(majority_consensus(&flat), two_level);
    }

    #[test]
    fn test_two_level_threshold_over_runs() {
        let runs = vec![
            vec![rule_set(["1"]), rule_set(["2"])],
            vec![rule_set(["1"]), rule_set(["2"])],
            vec![rule_set(["1"]), rule_set(["3"])],
        ];
        assert_eq!(majority_consensus_runs(&runs), rule_set(["1", "2"]));
    }

    #[test]
    fn test_two_level_skips_runs_without_consensus() {
        let runs = vec![
            vec![rule_set(["1"]), RuleSet::new(), RuleSet::new()],
            vec![rule_set(["4"])],
        ];
        // First run reduces to nothing and is not counted; only run two votes.
        assert_eq!(majority_consensus_runs(&runs), rule_set(["4"]));
        assert!(majority_consensus_runs(&[]).is_empty());
    }

    #[test]
    fn test_reduce_runs_by_kind() {
        let bools = [RunOutcome::Bool(true), RunOutcome::Bool(false)];
        assert_eq!(
            reduce_runs(EvaluationType::Hybrid, "c", &bools).unwrap(),
            FinalVerdict::Bool(true)
        );

        // Two judges: threshold 1, so "b" survives run one and the run vote.
        let rules = [
            RunOutcome::JudgeRules(vec![rule_set(["a"]), rule_set(["a", "b"])]),
            RunOutcome::JudgeRules(vec![rule_set(["a"])]),
        ];
        assert_eq!(
            reduce_runs(EvaluationType::Subjective, "c", &rules).unwrap(),
            FinalVerdict::Rules(rule_set(["a", "b"]))
        );

        let rules = [
            RunOutcome::JudgeRules(vec![rule_set(["a"]), rule_set(["a", "b"]), rule_set(["a"])]),
            RunOutcome::JudgeRules(vec![rule_set(["a"])]),
        ];
        assert_eq!(
            reduce_runs(EvaluationType::Subjective, "c", &rules).unwrap(),
            FinalVerdict::Rules(rule_set(["a"]))
        );
    }

    #[test]
    fn test_reduce_runs_empty_is_all_runs_failed() {
        let err = reduce_runs(EvaluationType::Objective, "c9", &[]).unwrap_err();
        assert!(matches!(err, EvalError::AllRunsFailed { .. }));
    }
}
