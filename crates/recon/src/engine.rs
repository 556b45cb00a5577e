use rust_decimal::Decimal;

use crate::aggregate::group_records;
use crate::classify::classify;
use crate::columns::{assign_roles, column_letter_to_index, normalize_header, Role, Synonyms};
use crate::config::{ColumnMapping, ColumnSpec, MatchOptions, ReconConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::matcher::match_exact_key;
use crate::model::{CanonicalTable, ReconBuckets, ReconMeta, ReconResult, Side};
use crate::project::{project_with_stats, ColumnSelection};
use crate::table::RawTable;

/// Run a reconciliation per config over two loaded tables.
pub fn run(
    config: &ReconConfig,
    left: &RawTable,
    right: &RawTable,
) -> Result<ReconResult, ReconError> {
    config.validate()?;

    let opts = &config.options;
    let left_table = canonical_side(config, Side::Left, left)?;
    let right_table = canonical_side(config, Side::Right, right)?;

    let match_opts = opts.match_options();
    let buckets = reconcile(&left_table, &right_table, &match_opts)?;
    let summary = compute_summary(&left_table, &right_table, &buckets);

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            left_label: config.label(Side::Left).to_string(),
            right_label: config.label(Side::Right).to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            use_date_in_key: opts.use_date_in_key,
            decimals: opts.decimals,
            tolerance: opts.tolerance,
        },
        summary,
        buckets,
    })
}

fn canonical_side(
    config: &ReconConfig,
    side: Side,
    table: &RawTable,
) -> Result<CanonicalTable, ReconError> {
    let selection = resolve_columns(
        table,
        side,
        &config.side(side).columns,
        &config.synonyms,
        config.options.use_date_in_key,
    )?;
    let (projected, stats) =
        project_with_stats(table, side, &selection, &config.options.project_options());
    log::debug!("{side} table ({}): {stats:?}", config.label(side));
    Ok(projected)
}

/// Join two canonical tables and classify every key.
pub fn reconcile(
    left: &CanonicalTable,
    right: &CanonicalTable,
    opts: &MatchOptions,
) -> Result<ReconBuckets, ReconError> {
    if opts.tolerance < Decimal::ZERO {
        return Err(ReconError::InvalidConfiguration(format!(
            "tolerance must not be negative, got {}",
            opts.tolerance
        )));
    }
    if left.slots != right.slots {
        return Err(ReconError::InvalidConfiguration(format!(
            "left table has {} amount slot(s), right table has {}",
            left.slots, right.slots
        )));
    }
    if left.slots == 0 {
        return Err(ReconError::InvalidConfiguration(
            "no amount columns to compare".into(),
        ));
    }

    let left_groups = group_records(left, opts);
    let right_groups = group_records(right, opts);
    let output = match_exact_key(left_groups, right_groups);
    Ok(classify(output, opts))
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Column positions per role before required roles are enforced. `None`
/// means neither an explicit spec nor a synonym picked a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleColumns {
    pub order_id: Option<usize>,
    pub date: Option<usize>,
    pub amounts: Vec<Option<usize>>,
}

/// Apply explicit specs, then resolve every remaining role in one pass over
/// the columns nobody claimed yet. Only a broken explicit spec is an error.
pub fn assign_columns(
    table: &RawTable,
    side: Side,
    mapping: &ColumnMapping,
    synonyms: &Synonyms,
) -> Result<RoleColumns, ReconError> {
    let mut claimed: Vec<usize> = Vec::new();

    let order_id = explicit(table, side, Role::OrderId, mapping.order_id.as_ref())?;
    claimed.extend(order_id);
    let date = explicit(table, side, Role::Date, mapping.date.as_ref())?;
    claimed.extend(date);

    let mut amounts: Vec<Option<usize>> = Vec::new();
    for spec in &mapping.amounts {
        let col = explicit(table, side, Role::Amount, Some(spec))?;
        claimed.extend(col);
        amounts.push(col);
    }
    if amounts.is_empty() {
        amounts.push(None);
    }

    let mut roles = Vec::new();
    if order_id.is_none() {
        roles.push(Role::OrderId);
    }
    if date.is_none() {
        roles.push(Role::Date);
    }
    let open_slots: Vec<usize> = (0..amounts.len()).filter(|&i| amounts[i].is_none()).collect();
    roles.extend(open_slots.iter().map(|_| Role::Amount));

    // Parallel to `roles`: order id, date, then each open amount slot.
    let mut found = assign_roles(&table.headers, &roles, synonyms, &claimed).into_iter();
    let order_id = order_id.or_else(|| found.next().flatten());
    let date = date.or_else(|| found.next().flatten());
    for slot in open_slots {
        amounts[slot] = found.next().flatten();
    }

    Ok(RoleColumns {
        order_id,
        date,
        amounts,
    })
}

/// Turn a side's column mapping into concrete positions.
///
/// See [`assign_columns`]; every role must end up with a column, except the
/// date when `date_required` is unset.
pub fn resolve_columns(
    table: &RawTable,
    side: Side,
    mapping: &ColumnMapping,
    synonyms: &Synonyms,
    date_required: bool,
) -> Result<ColumnSelection, ReconError> {
    let cols = assign_columns(table, side, mapping, synonyms)?;

    let order_id = cols
        .order_id
        .ok_or_else(|| missing(table, side, Role::OrderId))?;
    let date = match cols.date {
        None if date_required => return Err(missing(table, side, Role::Date)),
        date => date,
    };
    let amounts = cols
        .amounts
        .into_iter()
        .map(|col| col.ok_or_else(|| missing(table, side, Role::Amount)))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "{side} table: order id={order_id}, date={date:?}, amounts={amounts:?}"
    );
    Ok(ColumnSelection {
        order_id,
        date,
        amounts,
    })
}

/// Apply one explicit spec. `Ok(None)` hands the role to auto-resolution:
/// either no spec was given or a letter spec was malformed.
fn explicit(
    table: &RawTable,
    side: Side,
    role: Role,
    spec: Option<&ColumnSpec>,
) -> Result<Option<usize>, ReconError> {
    let width = table.width();
    match spec {
        None => Ok(None),
        Some(ColumnSpec::Name(name)) => {
            let exact = table.headers.iter().position(|h| h == name);
            let wanted = normalize_header(name);
            exact
                .or_else(|| {
                    table
                        .headers
                        .iter()
                        .position(|h| normalize_header(h) == wanted)
                })
                .map(Some)
                .ok_or_else(|| missing(table, side, role))
        }
        Some(ColumnSpec::Letter(letter)) => {
            let idx = column_letter_to_index(letter, usize::MAX);
            if idx == usize::MAX {
                log::warn!("{side} table: bad column letter '{letter}' for {role}, resolving by name");
                return Ok(None);
            }
            in_range(side, role, idx, width).map(Some)
        }
        Some(ColumnSpec::Index(idx)) => in_range(side, role, *idx, width).map(Some),
    }
}

fn in_range(side: Side, role: Role, index: usize, width: usize) -> Result<usize, ReconError> {
    if index < width {
        Ok(index)
    } else {
        Err(ReconError::ColumnOutOfRange {
            side,
            role,
            index,
            width,
        })
    }
}

fn missing(table: &RawTable, side: Side, role: Role) -> ReconError {
    ReconError::MissingColumn {
        side,
        role,
        available: table.headers.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
