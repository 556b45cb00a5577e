use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::config::{AggregateMode, AmountMissingPolicy, MatchOptions};
use crate::model::{Aggregate, CanonicalRecord, CanonicalTable, MatchKey};
use crate::value::round_half_up;

pub fn match_key(record: &CanonicalRecord, use_date_in_key: bool) -> MatchKey {
    MatchKey {
        order_date: if use_date_in_key { record.order_date } else { None },
        order_id: record.order_id.clone(),
    }
}

/// Group records by key. With `aggregate_duplicates` every key holds exactly
/// one combined entry; otherwise one entry per record, in source order.
pub fn group_records(
    table: &CanonicalTable,
    opts: &MatchOptions,
) -> BTreeMap<MatchKey, Vec<Aggregate>> {
    let mut groups: BTreeMap<MatchKey, Vec<Aggregate>> = BTreeMap::new();

    for record in &table.records {
        groups
            .entry(match_key(record, opts.use_date_in_key))
            .or_default()
            .push(Aggregate {
                side: table.side,
                order_id: record.order_id.clone(),
                order_date: record.order_date,
                amounts: record.amounts.clone(),
                record_count: 1,
                source_rows: vec![record.source_row],
            });
    }

    let repeated = groups.values().filter(|g| g.len() > 1).count();
    if repeated == 0 {
        return groups;
    }

    if opts.aggregate_duplicates {
        log::debug!(
            "{} table: combining {repeated} repeated key(s) by {:?}",
            table.side,
            opts.aggregate_mode
        );
        for entries in groups.values_mut() {
            if entries.len() > 1 {
                let combined = combine(entries, opts);
                *entries = vec![combined];
            }
        }
    } else {
        log::warn!(
            "{} table: {repeated} key(s) repeat; every left/right combination is compared",
            table.side
        );
    }

    groups
}

/// Combine entries sharing a key: amounts per slot by `aggregate_mode`, the
/// earliest date, all source rows.
///
/// A slot no entry has a value for stays `None`. Otherwise a missing member
/// follows `missing_policy`: under `ForceMismatch` the whole slot becomes
/// `None`, under `TreatAsZero` it counts as `0` in the sum and the average.
/// Overflow also leaves the slot `None`.
pub fn combine(entries: &[Aggregate], opts: &MatchOptions) -> Aggregate {
    let first = &entries[0];
    let slots = entries.iter().map(|e| e.amounts.len()).max().unwrap_or(0);

    let amounts = (0..slots)
        .map(|slot| {
            let values: Vec<Decimal> = entries
                .iter()
                .filter_map(|e| e.amounts.get(slot).copied().flatten())
                .collect();
            if values.is_empty() {
                return None;
            }
            let partial = values.len() < entries.len();
            if partial && opts.missing_policy == AmountMissingPolicy::ForceMismatch {
                return None;
            }
            let total = values
                .iter()
                .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
            match opts.aggregate_mode {
                AggregateMode::Sum => Some(total),
                AggregateMode::Average => round_half_up(
                    total.checked_div(Decimal::from(entries.len())),
                    opts.decimals,
                ),
            }
        })
        .collect();

    Aggregate {
        side: first.side,
        order_id: first.order_id.clone(),
        order_date: entries.iter().filter_map(|e| e.order_date).min(),
        amounts,
        record_count: entries.iter().map(|e| e.record_count).sum(),
        source_rows: entries.iter().flat_map(|e| e.source_rows.iter().copied()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Side;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rec(id: &str, date: Option<&str>, amounts: &[Option<&str>], row: usize) -> CanonicalRecord {
        CanonicalRecord {
            order_id: id.into(),
            order_date: date.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()),
            amounts: amounts.iter().map(|a| a.map(d)).collect(),
            source_row: row,
        }
    }

    fn table(records: Vec<CanonicalRecord>) -> CanonicalTable {
        CanonicalTable {
            side: Side::Left,
            slots: records.first().map_or(0, |r| r.amounts.len()),
            records,
        }
    }

    fn aggregating(mode: AggregateMode) -> MatchOptions {
        MatchOptions {
            aggregate_duplicates: true,
            aggregate_mode: mode,
            ..MatchOptions::default()
        }
    }

    #[test]
    fn sums_repeated_keys() {
        let t = table(vec![
            rec("1", Some("2024-01-05"), &[Some("10.00")], 0),
            rec("1", Some("2024-01-05"), &[Some("2.50")], 1),
            rec("2", Some("2024-01-05"), &[Some("1.00")], 2),
        ]);
        let groups = group_records(&t, &aggregating(AggregateMode::Sum));
        assert_eq!(groups.len(), 2);
        let first = &groups.values().next().unwrap()[0];
        assert_eq!(first.amounts, vec![Some(d("12.50"))]);
        assert_eq!(first.record_count, 2);
        assert_eq!(first.source_rows, vec![0, 1]);
    }

    #[test]
    fn averages_round_to_decimals() {
        let t = table(vec![
            rec("1", None, &[Some("1.00")], 0),
            rec("1", None, &[Some("1.00")], 1),
            rec("1", None, &[Some("2.00")], 2),
        ]);
        let groups = group_records(&t, &aggregating(AggregateMode::Average));
        let only = &groups.values().next().unwrap()[0];
        assert_eq!(only.amounts, vec![Some(d("1.33"))]);
    }

    fn partial_entries() -> Vec<Aggregate> {
        [Some("4.00"), None]
            .iter()
            .enumerate()
            .map(|(i, a)| Aggregate {
                side: Side::Right,
                order_id: "9".into(),
                order_date: None,
                amounts: vec![a.map(d), None],
                record_count: 1,
                source_rows: vec![i],
            })
            .collect()
    }

    #[test]
    fn missing_member_forces_missing_slot() {
        let combined = combine(&partial_entries(), &aggregating(AggregateMode::Sum));
        assert_eq!(combined.amounts, vec![None, None]);
        assert_eq!(combined.side, Side::Right);
        assert_eq!(combined.record_count, 2);
    }

    #[test]
    fn missing_member_counts_as_zero_when_allowed() {
        let sum = MatchOptions {
            missing_policy: AmountMissingPolicy::TreatAsZero,
            ..aggregating(AggregateMode::Sum)
        };
        let combined = combine(&partial_entries(), &sum);
        assert_eq!(combined.amounts, vec![Some(d("4.00")), None]);

        let average = MatchOptions {
            aggregate_mode: AggregateMode::Average,
            ..sum
        };
        let combined = combine(&partial_entries(), &average);
        assert_eq!(combined.amounts, vec![Some(d("2.00")), None]);
    }

    #[test]
    fn keeps_duplicates_without_aggregation() {
        let t = table(vec![
            rec("1", Some("2024-01-05"), &[Some("10.00")], 0),
            rec("1", Some("2024-01-05"), &[Some("2.50")], 1),
        ]);
        let groups = group_records(&t, &MatchOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.values().next().unwrap().len(), 2);
    }

    #[test]
    fn date_only_in_key_when_requested() {
        let t = table(vec![
            rec("1", Some("2024-01-05"), &[Some("1.00")], 0),
            rec("1", Some("2024-01-06"), &[Some("1.00")], 1),
        ]);
        let dated = group_records(&t, &MatchOptions::default());
        assert_eq!(dated.len(), 2);

        let opts = MatchOptions {
            use_date_in_key: false,
            ..aggregating(AggregateMode::Sum)
        };
        let undated = group_records(&t, &opts);
        assert_eq!(undated.len(), 1);
        let entry = &undated.values().next().unwrap()[0];
        assert_eq!(entry.order_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(entry.amounts, vec![Some(d("2.00"))]);
    }
}
