use rust_decimal::Decimal;

use crate::model::{CanonicalTable, ReconBucket, ReconBuckets, ReconSummary, SlotTotals};

/// Compute summary statistics from classified results.
pub fn compute_summary(
    left: &CanonicalTable,
    right: &CanonicalTable,
    buckets: &ReconBuckets,
) -> ReconSummary {
    let only_left = buckets.key_count(ReconBucket::OnlyLeft);
    let only_right = buckets.key_count(ReconBucket::OnlyRight);
    let matched_different = buckets.key_count(ReconBucket::MatchedDifferent);
    let matched_same = buckets.key_count(ReconBucket::MatchedSame);

    let slots = left.slots.max(right.slots);
    let totals = (0..slots)
        .map(|slot| {
            let l = slot_total(left, slot);
            let r = slot_total(right, slot);
            SlotTotals {
                slot,
                left: l,
                right: r,
                delta: l.zip(r).and_then(|(l, r)| l.checked_sub(r)),
            }
        })
        .collect();

    ReconSummary {
        left_records: left.records.len(),
        right_records: right.records.len(),
        total_keys: only_left + only_right + matched_different + matched_same,
        only_left,
        only_right,
        matched_different,
        matched_same,
        total_rows: buckets.iter().count(),
        totals,
    }
}

/// Sum of one amount slot over every record of a side; missing amounts add
/// nothing. `None` on overflow.
fn slot_total(table: &CanonicalTable, slot: usize) -> Option<Decimal> {
    table
        .records
        .iter()
        .filter_map(|r| r.amounts.get(slot).copied().flatten())
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}
