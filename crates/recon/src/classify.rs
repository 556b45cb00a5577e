use rust_decimal::Decimal;

use crate::config::{AmountMissingPolicy, MatchOptions};
use crate::model::{
    Aggregate, AmountDiff, MatchedGroup, OneSidedGroup, PairMatchOutput, ReconBucket,
    ReconBuckets, ReconRow,
};
use crate::value::round_half_up;

/// Compare two amount vectors slot by slot.
///
/// `|left - right| <= tolerance` is equal. Under `ForceMismatch` a missing
/// amount on either side makes the slot incomparable (never within
/// tolerance); under `TreatAsZero` it counts as `0`.
pub fn compare_amounts(
    left: &[Option<Decimal>],
    right: &[Option<Decimal>],
    opts: &MatchOptions,
) -> Vec<AmountDiff> {
    let slots = left.len().max(right.len());
    (0..slots)
        .map(|slot| {
            let l = left.get(slot).copied().flatten();
            let r = right.get(slot).copied().flatten();

            let (lv, rv) = match opts.missing_policy {
                AmountMissingPolicy::TreatAsZero => {
                    (Some(l.unwrap_or(Decimal::ZERO)), Some(r.unwrap_or(Decimal::ZERO)))
                }
                AmountMissingPolicy::ForceMismatch => (l, r),
            };

            let delta = match (lv, rv) {
                (Some(a), Some(b)) => round_half_up(a.checked_sub(b), opts.decimals),
                _ => None,
            };
            let difference = delta.map(|d| d.abs());
            let within_tolerance = difference.is_some_and(|d| d <= opts.tolerance);

            AmountDiff {
                slot,
                left: l,
                right: r,
                delta,
                difference,
                within_tolerance,
            }
        })
        .collect()
}

/// Classify joined keys into the four buckets.
///
/// A matched key yields one row per left/right combination (exactly one
/// when duplicates were aggregated) and is `matched_same` only when every
/// combination is within tolerance on every slot. Input groups arrive in
/// key order, so every bucket comes out sorted by key.
pub fn classify(output: PairMatchOutput, opts: &MatchOptions) -> ReconBuckets {
    let mut buckets = ReconBuckets::default();

    for group in output.matched {
        let (bucket, rows) = classify_matched(group, opts);
        buckets.rows_mut(bucket).extend(rows);
    }

    for group in output.left_only {
        buckets
            .only_left
            .extend(one_sided_rows(group, ReconBucket::OnlyLeft));
    }

    for group in output.right_only {
        buckets
            .only_right
            .extend(one_sided_rows(group, ReconBucket::OnlyRight));
    }

    buckets
}

fn classify_matched(group: MatchedGroup, opts: &MatchOptions) -> (ReconBucket, Vec<ReconRow>) {
    let mut pairs: Vec<(&Aggregate, &Aggregate, Vec<AmountDiff>)> = Vec::new();
    for l in &group.left {
        for r in &group.right {
            pairs.push((l, r, compare_amounts(&l.amounts, &r.amounts, opts)));
        }
    }

    let all_within = pairs
        .iter()
        .all(|(_, _, diffs)| diffs.iter().all(|d| d.within_tolerance));
    let bucket = if all_within {
        ReconBucket::MatchedSame
    } else {
        ReconBucket::MatchedDifferent
    };

    let rows = pairs
        .into_iter()
        .map(|(l, r, diffs)| ReconRow {
            bucket,
            key: group.key.clone(),
            left: Some(l.clone()),
            right: Some(r.clone()),
            diffs,
        })
        .collect();

    (bucket, rows)
}

fn one_sided_rows(group: OneSidedGroup, bucket: ReconBucket) -> Vec<ReconRow> {
    let OneSidedGroup { key, entries } = group;
    entries
        .into_iter()
        .map(|entry| {
            let (left, right) = match bucket {
                ReconBucket::OnlyRight => (None, Some(entry)),
                _ => (Some(entry), None),
            };
            ReconRow {
                bucket,
                key: key.clone(),
                left,
                right,
                diffs: Vec::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatchKey, Side};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn amounts(list: &[Option<&str>]) -> Vec<Option<Decimal>> {
        list.iter().map(|a| a.map(d)).collect()
    }

    fn tolerance(t: &str) -> MatchOptions {
        MatchOptions {
            tolerance: d(t),
            ..MatchOptions::default()
        }
    }

    fn entry(side: Side, id: &str, amount: &str, row: usize) -> Aggregate {
        Aggregate {
            side,
            order_id: id.into(),
            order_date: None,
            amounts: vec![Some(d(amount))],
            record_count: 1,
            source_rows: vec![row],
        }
    }

    fn key(id: &str) -> MatchKey {
        MatchKey {
            order_date: None,
            order_id: id.into(),
        }
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let opts = tolerance("0.05");
        let at = compare_amounts(&amounts(&[Some("10.00")]), &amounts(&[Some("10.05")]), &opts);
        assert!(at[0].within_tolerance);
        let past = compare_amounts(&amounts(&[Some("10.00")]), &amounts(&[Some("10.06")]), &opts);
        assert!(!past[0].within_tolerance);
        assert_eq!(past[0].delta, Some(d("-0.06")));
        assert_eq!(past[0].difference, Some(d("0.06")));
    }

    #[test]
    fn missing_amount_forces_mismatch_by_default() {
        let diffs = compare_amounts(&amounts(&[None]), &amounts(&[None]), &MatchOptions::default());
        assert!(!diffs[0].within_tolerance);
        assert_eq!(diffs[0].delta, None);
    }

    #[test]
    fn missing_amount_as_zero() {
        let opts = MatchOptions {
            missing_policy: AmountMissingPolicy::TreatAsZero,
            ..MatchOptions::default()
        };
        let both_missing = compare_amounts(&amounts(&[None]), &amounts(&[None]), &opts);
        assert!(both_missing[0].within_tolerance);
        let one_missing = compare_amounts(&amounts(&[Some("3.00")]), &amounts(&[None]), &opts);
        assert_eq!(one_missing[0].delta, Some(d("3.00")));
        assert_eq!(one_missing[0].left, Some(d("3.00")));
        assert_eq!(one_missing[0].right, None);
    }

    #[test]
    fn every_slot_must_agree() {
        let opts = MatchOptions::default();
        let diffs = compare_amounts(
            &amounts(&[Some("1.00"), Some("2.00")]),
            &amounts(&[Some("1.00"), Some("2.01")]),
            &opts,
        );
        assert!(diffs[0].within_tolerance);
        assert!(!diffs[1].within_tolerance);
    }

    #[test]
    fn cartesian_rows_classified_once_per_key() {
        let output = PairMatchOutput {
            matched: vec![MatchedGroup {
                key: key("1"),
                left: vec![entry(Side::Left, "1", "5.00", 0), entry(Side::Left, "1", "6.00", 1)],
                right: vec![entry(Side::Right, "1", "5.00", 0)],
            }],
            left_only: vec![],
            right_only: vec![],
        };
        let buckets = classify(output, &MatchOptions::default());
        assert!(buckets.matched_same.is_empty());
        assert_eq!(buckets.matched_different.len(), 2);
        assert_eq!(buckets.key_count(ReconBucket::MatchedDifferent), 1);
        assert!(buckets.matched_different[0].diffs[0].within_tolerance);
        assert!(!buckets.matched_different[1].diffs[0].within_tolerance);
    }

    #[test]
    fn one_sided_rows_keep_their_side() {
        let output = PairMatchOutput {
            matched: vec![],
            left_only: vec![OneSidedGroup {
                key: key("1"),
                entries: vec![entry(Side::Left, "1", "1.00", 0)],
            }],
            right_only: vec![OneSidedGroup {
                key: key("2"),
                entries: vec![entry(Side::Right, "2", "1.00", 0)],
            }],
        };
        let buckets = classify(output, &MatchOptions::default());
        assert!(buckets.only_left[0].left.is_some() && buckets.only_left[0].right.is_none());
        assert!(buckets.only_right[0].right.is_some() && buckets.only_right[0].left.is_none());
        assert_eq!(buckets.only_right[0].bucket, ReconBucket::OnlyRight);
    }
}
