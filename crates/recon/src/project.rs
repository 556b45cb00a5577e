use crate::config::ProjectOptions;
use crate::ident::normalize_id;
use crate::model::{CanonicalRecord, CanonicalTable, Side};
use crate::table::RawTable;
use crate::value::{parse_cell_date, parse_cell_decimal, round_half_up};

/// Resolved column positions for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub order_id: usize,
    pub date: Option<usize>,
    pub amounts: Vec<usize>,
}

/// What happened to the rows of one table during projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    pub rows_read: usize,
    pub kept: usize,
    pub dropped_empty_id: usize,
    pub dropped_bad_date: usize,
    pub dropped_bad_amount: usize,
    /// Non-blank amount cells that did not parse.
    pub unparsable_amounts: usize,
}

/// Turn a raw table into canonical records.
pub fn project(
    table: &RawTable,
    side: Side,
    columns: &ColumnSelection,
    opts: &ProjectOptions,
) -> CanonicalTable {
    project_with_stats(table, side, columns, opts).0
}

/// [`project`], also reporting how many rows were dropped and why.
///
/// Rows with an empty id are dropped. Rows with an unparsable date are
/// dropped when `require_date` is set and a date column is selected. An
/// unparsable amount leaves a `None` slot, or drops the row under
/// `strict_amounts`.
pub fn project_with_stats(
    table: &RawTable,
    side: Side,
    columns: &ColumnSelection,
    opts: &ProjectOptions,
) -> (CanonicalTable, ProjectionStats) {
    let mut stats = ProjectionStats {
        rows_read: table.rows.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let order_id = normalize_id(&table.cell(row, columns.order_id).as_text(), &opts.id);
        if order_id.is_empty() {
            stats.dropped_empty_id += 1;
            continue;
        }

        let order_date = columns
            .date
            .and_then(|col| parse_cell_date(table.cell(row, col), opts.day_first));
        if opts.require_date && columns.date.is_some() && order_date.is_none() {
            stats.dropped_bad_date += 1;
            continue;
        }

        let mut amounts = Vec::with_capacity(columns.amounts.len());
        for &col in &columns.amounts {
            let cell = table.cell(row, col);
            let amount = round_half_up(parse_cell_decimal(cell), opts.decimals);
            if amount.is_none() && !cell.is_blank() {
                stats.unparsable_amounts += 1;
            }
            amounts.push(amount);
        }
        if opts.strict_amounts && amounts.iter().any(Option::is_none) {
            stats.dropped_bad_amount += 1;
            continue;
        }

        records.push(CanonicalRecord {
            order_id,
            order_date,
            amounts,
            source_row: row,
        });
    }

    stats.kept = records.len();
    let dropped = stats.rows_read - stats.kept;
    if dropped > 0 {
        log::warn!(
            "{side} table: dropped {dropped} of {} row(s) (empty id {}, bad date {}, bad amount {})",
            stats.rows_read,
            stats.dropped_empty_id,
            stats.dropped_bad_date,
            stats.dropped_bad_amount
        );
    }
    log::debug!("{side} table: projection {stats:?}");

    let table = CanonicalTable {
        side,
        slots: columns.amounts.len(),
        records,
    };
    (table, stats)
}
