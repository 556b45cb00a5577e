use std::collections::BTreeMap;

use crate::model::{Aggregate, MatchKey, MatchedGroup, OneSidedGroup, PairMatchOutput};

/// Full outer join of two key-grouped sides. Every key lands in exactly one
/// of `matched`, `left_only`, `right_only`, each in key order.
pub fn match_exact_key(
    left: BTreeMap<MatchKey, Vec<Aggregate>>,
    mut right: BTreeMap<MatchKey, Vec<Aggregate>>,
) -> PairMatchOutput {
    let mut matched = Vec::new();
    let mut left_only = Vec::new();

    for (key, left_entries) in left {
        match right.remove(&key) {
            Some(right_entries) => matched.push(MatchedGroup {
                key,
                left: left_entries,
                right: right_entries,
            }),
            None => left_only.push(OneSidedGroup {
                key,
                entries: left_entries,
            }),
        }
    }

    let right_only = right
        .into_iter()
        .map(|(key, entries)| OneSidedGroup { key, entries })
        .collect();

    PairMatchOutput {
        matched,
        left_only,
        right_only,
    }
}
