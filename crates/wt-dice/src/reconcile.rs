//! Reconciliation of physical die results with the notation that
//! requested them.
//!
//! The oracle hands back a flat pool of `(die, value)` pairs. Each dice
//! group in the notation drains matching-type values from that pool
//! (first found, not positional), applies its keep modifier, and is
//! replaced in the arithmetic string by its subtotal. The fully
//! substituted string is then evaluated and rendered into the breakdown
//! contract:
//!
//! ```text
//! 2d20kh1 + 3 = [18, r4] + 3 = 21
//! ```
//!
//! Discarded (non-kept) values are prefixed `r`. The returned numeric
//! total is floored while the breakdown tail shows the unfloored value;
//! that asymmetry is part of the persisted-record contract and is kept.

use std::collections::HashMap;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::die::Die;
use crate::eval::evaluate;
use crate::notation::{Keep, KeepMode, scan};

/// The resolved face value of a single physical die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalResult {
    /// The die that was rolled.
    pub die: Die,
    /// The face value, in `[1, die.sides()]`.
    pub value: u32,
}

/// One reconciled dice group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    /// The die type of the group.
    pub die: Die,
    /// All rolled values, in drain order.
    pub rolls: Vec<u32>,
    /// Which of `rolls` count toward the subtotal.
    pub kept: Vec<bool>,
    /// Sum of the kept values.
    pub subtotal: i64,
}

/// The final outcome of a roll.
#[derive(Debug, Clone, PartialEq)]
pub struct RollOutcome {
    /// Floored numeric total.
    pub total: i64,
    /// `<notation> = <groups as [v1, r v2, ...]> = <unfloored total>`.
    pub breakdown: String,
    /// Per-group detail, in order of appearance.
    pub groups: Vec<GroupResult>,
}

/// Decide which rolled values a keep modifier retains.
///
/// The sorted copy (descending for `kh`, ascending for `kl`) contributes
/// its first `keep.count` values as a multiset, so duplicates are kept
/// exactly as many times as they appear among the winners.
fn select_kept(rolls: &[u32], keep: Option<Keep>) -> Vec<bool> {
    let Some(keep) = keep else {
        return vec![true; rolls.len()];
    };
    let mut sorted = rolls.to_vec();
    match keep.mode {
        KeepMode::High => sorted.sort_unstable_by(|a, b| b.cmp(a)),
        KeepMode::Low => sorted.sort_unstable(),
    }
    let mut budget: HashMap<u32, u32> = HashMap::new();
    for &value in sorted.iter().take(keep.count as usize) {
        *budget.entry(value).or_insert(0) += 1;
    }
    rolls
        .iter()
        .map(|value| match budget.get_mut(value) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        })
        .collect()
}

/// Render a group as `[18, r4]` — kept values bare, discarded prefixed `r`.
fn render_fragment(rolls: &[u32], kept: &[bool]) -> String {
    let parts: Vec<String> = rolls
        .iter()
        .zip(kept)
        .map(|(value, keep)| {
            if *keep {
                value.to_string()
            } else {
                format!("r{value}")
            }
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

/// Reconcile a notation with the pool of resolved die values.
///
/// Every requested die is guaranteed a value: if the pool runs out
/// (which indicates a requester/oracle desync and should not happen in
/// practice), the shortfall is synthesized from `rng` and logged loudly.
/// The input pool is not consumed, so reconciling twice with the same
/// pool yields identical output.
pub fn reconcile(notation: &str, results: &[PhysicalResult], rng: &mut StdRng) -> RollOutcome {
    let groups = scan(notation);
    let mut available = vec![true; results.len()];
    let mut reconciled = Vec::with_capacity(groups.len());
    let mut arithmetic = String::with_capacity(notation.len());
    let mut display = String::with_capacity(notation.len());
    let mut cursor = 0;

    for group in &groups {
        let mut rolls = Vec::with_capacity(group.count as usize);
        for _ in 0..group.count {
            let slot = (0..results.len()).find(|&i| available[i] && results[i].die == group.die);
            match slot {
                Some(i) => {
                    available[i] = false;
                    rolls.push(results[i].value);
                }
                None => {
                    tracing::warn!(
                        die = %group.die,
                        requested = group.count,
                        "result pool exhausted, synthesizing missing die value"
                    );
                    rolls.push(rng.random_range(1..=group.die.sides()));
                }
            }
        }

        let kept = select_kept(&rolls, group.keep);
        let subtotal: i64 = rolls
            .iter()
            .zip(&kept)
            .filter(|&(_, &keep)| keep)
            .map(|(&value, _)| i64::from(value))
            .sum();

        arithmetic.push_str(&notation[cursor..group.span.start]);
        display.push_str(&notation[cursor..group.span.start]);
        arithmetic.push_str(&subtotal.to_string());
        display.push_str(&render_fragment(&rolls, &kept));
        cursor = group.span.end;

        reconciled.push(GroupResult {
            die: group.die,
            rolls,
            kept,
            subtotal,
        });
    }
    arithmetic.push_str(&notation[cursor..]);
    display.push_str(&notation[cursor..]);

    let value = match evaluate(&arithmetic) {
        Ok(v) if v.is_finite() => v,
        Ok(v) => {
            tracing::error!(expression = %arithmetic, value = v, "non-finite roll total, defaulting to 0");
            0.0
        }
        Err(e) => {
            tracing::error!(expression = %arithmetic, error = %e, "expression evaluation failed, defaulting to 0");
            0.0
        }
    };

    RollOutcome {
        total: value.floor() as i64,
        breakdown: format!("{notation} = {display} = {value}"),
        groups: reconciled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn pool(entries: &[(Die, u32)]) -> Vec<PhysicalResult> {
        entries
            .iter()
            .map(|&(die, value)| PhysicalResult { die, value })
            .collect()
    }

    #[test]
    fn single_d20() {
        let outcome = reconcile("1d20", &pool(&[(Die::D20, 15)]), &mut rng());
        assert_eq!(outcome.total, 15);
        assert_eq!(outcome.breakdown, "1d20 = [15] = 15");
    }

    #[test]
    fn sum_with_flat_bonus() {
        let outcome = reconcile("2d6 + 3", &pool(&[(Die::D6, 2), (Die::D6, 5)]), &mut rng());
        assert_eq!(outcome.total, 10);
        assert_eq!(outcome.breakdown, "2d6 + 3 = [2, 5] + 3 = 10");
    }

    #[test]
    fn keep_high_discards_in_place() {
        let outcome = reconcile(
            "2d20kh1",
            &pool(&[(Die::D20, 18), (Die::D20, 4)]),
            &mut rng(),
        );
        assert_eq!(outcome.total, 18);
        assert_eq!(outcome.breakdown, "2d20kh1 = [18, r4] = 18");
    }

    #[test]
    fn keep_high_preserves_roll_order() {
        // Low value first: discard marker follows the rolled position.
        let outcome = reconcile(
            "2d20kh1",
            &pool(&[(Die::D20, 4), (Die::D20, 18)]),
            &mut rng(),
        );
        assert_eq!(outcome.breakdown, "2d20kh1 = [r4, 18] = 18");
    }

    #[test]
    fn keep_low() {
        let outcome = reconcile(
            "3d6kl2",
            &pool(&[(Die::D6, 5), (Die::D6, 1), (Die::D6, 3)]),
            &mut rng(),
        );
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.breakdown, "3d6kl2 = [r5, 1, 3] = 4");
    }

    #[test]
    fn keep_with_duplicates_keeps_multiset() {
        let outcome = reconcile(
            "3d6kh2",
            &pool(&[(Die::D6, 4), (Die::D6, 4), (Die::D6, 4)]),
            &mut rng(),
        );
        assert_eq!(outcome.total, 8);
        assert_eq!(outcome.breakdown, "3d6kh2 = [4, 4, r4] = 8");
    }

    #[test]
    fn keep_count_larger_than_pool_keeps_all() {
        let outcome = reconcile(
            "2d6kh5",
            &pool(&[(Die::D6, 2), (Die::D6, 3)]),
            &mut rng(),
        );
        assert_eq!(outcome.total, 5);
    }

    #[test]
    fn draining_is_first_match_by_type() {
        let results = pool(&[(Die::D6, 2), (Die::D20, 17), (Die::D6, 5)]);
        let outcome = reconcile("1d20 + 2d6", &results, &mut rng());
        assert_eq!(outcome.total, 24);
        assert_eq!(outcome.breakdown, "1d20 + 2d6 = [17] + [2, 5] = 24");
    }

    #[test]
    fn separate_groups_drain_separately() {
        let results = pool(&[(Die::D6, 3), (Die::D6, 6)]);
        let outcome = reconcile("1d6 + 1d6", &results, &mut rng());
        assert_eq!(outcome.total, 9);
        assert_eq!(outcome.breakdown, "1d6 + 1d6 = [3] + [6] = 9");
    }

    #[test]
    fn pool_exhaustion_synthesizes_in_range() {
        let outcome = reconcile("2d6", &pool(&[(Die::D6, 4)]), &mut rng());
        assert_eq!(outcome.groups[0].rolls.len(), 2);
        assert_eq!(outcome.groups[0].rolls[0], 4);
        assert!((1..=6).contains(&outcome.groups[0].rolls[1]));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let results = pool(&[(Die::D20, 18), (Die::D20, 4), (Die::D6, 3)]);
        let first = reconcile("2d20kh1 + 1d6", &results, &mut rng());
        let second = reconcile("2d20kh1 + 1d6", &results, &mut rng());
        assert_eq!(first, second);
    }

    #[test]
    fn pure_arithmetic_floor_vs_display() {
        let outcome = reconcile("7 / 2", &[], &mut rng());
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.breakdown, "7 / 2 = 7 / 2 = 3.5");
    }

    #[test]
    fn integer_totals_render_bare() {
        let outcome = reconcile("2 + 2", &[], &mut rng());
        assert_eq!(outcome.breakdown, "2 + 2 = 2 + 2 = 4");
    }

    #[test]
    fn malformed_notation_totals_zero() {
        let outcome = reconcile("1d20+++", &pool(&[(Die::D20, 15)]), &mut rng());
        assert_eq!(outcome.total, 0);
        assert!(outcome.breakdown.starts_with("1d20+++ = [15]+++ = "));
    }

    #[test]
    fn division_by_zero_totals_zero() {
        let outcome = reconcile("1d6 / 0", &pool(&[(Die::D6, 4)]), &mut rng());
        assert_eq!(outcome.total, 0);
    }

    #[test]
    fn whitespace_preserved_verbatim() {
        let outcome = reconcile("1d6  +  2", &pool(&[(Die::D6, 3)]), &mut rng());
        assert_eq!(outcome.breakdown, "1d6  +  2 = [3]  +  2 = 5");
    }

    proptest! {
        #[test]
        fn plain_group_total_is_sum_of_values(
            values in proptest::collection::vec(1u32..=6, 1..6)
        ) {
            let notation = format!("{}d6", values.len());
            let results: Vec<PhysicalResult> = values
                .iter()
                .map(|&value| PhysicalResult { die: Die::D6, value })
                .collect();
            let outcome = reconcile(&notation, &results, &mut rng());
            let expected: u32 = values.iter().sum();
            prop_assert_eq!(outcome.total, i64::from(expected));
        }

        #[test]
        fn keep_high_keeps_the_k_largest(
            values in proptest::collection::vec(1u32..=20, 2..6),
            k in 1u32..3,
        ) {
            let k = k.min(values.len() as u32);
            let notation = format!("{}d20kh{}", values.len(), k);
            let results: Vec<PhysicalResult> = values
                .iter()
                .map(|&value| PhysicalResult { die: Die::D20, value })
                .collect();
            let outcome = reconcile(&notation, &results, &mut rng());
            let mut sorted = values.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            let expected: u32 = sorted.iter().take(k as usize).sum();
            prop_assert_eq!(outcome.total, i64::from(expected));
            let kept_count = outcome.groups[0].kept.iter().filter(|&&keep| keep).count();
            prop_assert_eq!(kept_count, k as usize);
        }
    }
}
