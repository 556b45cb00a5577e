use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source row after normalization. `order_id` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    /// One slot per configured amount column, already rounded.
    pub amounts: Vec<Option<Decimal>>,
    /// 0-based data row index in the source table.
    pub source_row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    pub side: Side,
    /// Number of amount slots every record carries.
    pub slots: usize,
    pub records: Vec<CanonicalRecord>,
}

// ---------------------------------------------------------------------------
// Keys + aggregation
// ---------------------------------------------------------------------------

/// Join key. `order_date` is `None` for every key when dates are not part
/// of matching. Field order gives the `(date, id)` sort with `None` first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatchKey {
    pub order_date: Option<NaiveDate>,
    pub order_id: String,
}

/// One record, or several records sharing a key combined into one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub side: Side,
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    pub amounts: Vec<Option<Decimal>>,
    pub record_count: usize,
    pub source_rows: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Key matching
// ---------------------------------------------------------------------------

/// A key present on both sides with every entry each side holds for it.
#[derive(Debug, Clone)]
pub struct MatchedGroup {
    pub key: MatchKey,
    pub left: Vec<Aggregate>,
    pub right: Vec<Aggregate>,
}

#[derive(Debug, Clone)]
pub struct OneSidedGroup {
    pub key: MatchKey,
    pub entries: Vec<Aggregate>,
}

#[derive(Debug)]
pub struct PairMatchOutput {
    pub matched: Vec<MatchedGroup>,
    pub left_only: Vec<OneSidedGroup>,
    pub right_only: Vec<OneSidedGroup>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconBucket {
    OnlyLeft,
    OnlyRight,
    MatchedDifferent,
    MatchedSame,
}

impl fmt::Display for ReconBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlyLeft => write!(f, "only_left"),
            Self::OnlyRight => write!(f, "only_right"),
            Self::MatchedDifferent => write!(f, "matched_different"),
            Self::MatchedSame => write!(f, "matched_same"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountDiff {
    pub slot: usize,
    pub left: Option<Decimal>,
    pub right: Option<Decimal>,
    /// `left - right`, after the missing-amount policy; `None` when incomparable.
    pub delta: Option<Decimal>,
    /// `|left - right|`.
    pub difference: Option<Decimal>,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconRow {
    pub bucket: ReconBucket,
    pub key: MatchKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Aggregate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Aggregate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<AmountDiff>,
}

/// The four disjoint partitions, each sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconBuckets {
    pub only_left: Vec<ReconRow>,
    pub only_right: Vec<ReconRow>,
    pub matched_different: Vec<ReconRow>,
    pub matched_same: Vec<ReconRow>,
}

impl ReconBuckets {
    pub fn rows(&self, bucket: ReconBucket) -> &[ReconRow] {
        match bucket {
            ReconBucket::OnlyLeft => &self.only_left,
            ReconBucket::OnlyRight => &self.only_right,
            ReconBucket::MatchedDifferent => &self.matched_different,
            ReconBucket::MatchedSame => &self.matched_same,
        }
    }

    pub(crate) fn rows_mut(&mut self, bucket: ReconBucket) -> &mut Vec<ReconRow> {
        match bucket {
            ReconBucket::OnlyLeft => &mut self.only_left,
            ReconBucket::OnlyRight => &mut self.only_right,
            ReconBucket::MatchedDifferent => &mut self.matched_different,
            ReconBucket::MatchedSame => &mut self.matched_same,
        }
    }

    /// Number of distinct keys in a bucket. Rows outnumber keys only when
    /// duplicates were joined without aggregation.
    pub fn key_count(&self, bucket: ReconBucket) -> usize {
        let rows = self.rows(bucket);
        // Rows are sorted by key, so duplicates are adjacent.
        rows.iter()
            .enumerate()
            .filter(|(i, r)| *i == 0 || rows[i - 1].key != r.key)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReconRow> {
        self.only_left
            .iter()
            .chain(&self.only_right)
            .chain(&self.matched_different)
            .chain(&self.matched_same)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Per amount slot, the total of each side and their difference.
///
/// Sums use checked arithmetic like aggregation does: a total that would
/// overflow is `None`, and so is a delta with a `None` operand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotTotals {
    pub slot: usize,
    pub left: Option<Decimal>,
    pub right: Option<Decimal>,
    pub delta: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub left_records: usize,
    pub right_records: usize,
    pub total_keys: usize,
    pub only_left: usize,
    pub only_right: usize,
    pub matched_different: usize,
    pub matched_same: usize,
    pub total_rows: usize,
    pub totals: Vec<SlotTotals>,
}

impl ReconSummary {
    /// Any key outside `matched_same`.
    pub fn has_differences(&self) -> bool {
        self.only_left + self.only_right + self.matched_different > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub left_label: String,
    pub right_label: String,
    pub engine_version: String,
    pub use_date_in_key: bool,
    pub decimals: u32,
    pub tolerance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    #[serde(flatten)]
    pub buckets: ReconBuckets,
}
