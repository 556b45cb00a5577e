//! `pricecheck run | validate | columns`: config-driven price reconciliation.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use pricecheck_recon::columns::{index_to_column_letter, Role};
use pricecheck_recon::engine::assign_columns;
use pricecheck_recon::model::{ReconBucket, ReconResult, ReconRow};
use pricecheck_recon::{ReconConfig, Side};

use crate::exit_codes::{
    recon_exit_code, EXIT_DIFFERENCES, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_USAGE,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile the two feeds described by a TOML config file
    #[command(after_help = "\
Examples:
  pricecheck run march.recon.toml
  pricecheck run march.recon.toml --json
  pricecheck run march.recon.toml --left fornitore.xlsx --right logistica.csv
  pricecheck run march.recon.toml --output result.json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Supplier file (overrides [left].file)
        #[arg(long)]
        left: Option<PathBuf>,

        /// Logistics file (overrides [right].file)
        #[arg(long)]
        right: Option<PathBuf>,

        /// Output JSON to stdout instead of the text report
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  pricecheck validate march.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// List the columns of a file and the roles they resolve to
    #[command(after_help = "\
Examples:
  pricecheck columns fornitore.xlsx --sheet Ordini
  pricecheck columns logistica.csv --header-label \"order id\"
  pricecheck columns logistica.csv --config march.recon.toml --side right")]
    Columns {
        /// CSV, TSV or Excel file
        file: PathBuf,

        /// Workbook sheet (first sheet when omitted)
        #[arg(long)]
        sheet: Option<String>,

        /// Label the header row must contain (repeatable)
        #[arg(long = "header-label")]
        header_labels: Vec<String>,

        /// Resolve with this config's synonyms and the side's column mapping,
        /// sheet and header labels
        #[arg(long)]
        config: Option<PathBuf>,

        /// Which side of the config the file stands for
        #[arg(long, value_enum, default_value = "left")]
        side: SideArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            config,
            left,
            right,
            json,
            output,
        } => cmd_recon_run(config, left, right, json, output),
        ReconCommands::Validate { config } => cmd_recon_validate(config),
        ReconCommands::Columns {
            file,
            sheet,
            header_labels,
            config,
            side,
        } => cmd_columns(file, sheet, header_labels, config, side.into()),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError {
        code,
        message: msg.into(),
        hint: None,
    }
}

fn engine_err(err: pricecheck_recon::ReconError) -> CliError {
    let cli_err = recon_err(recon_exit_code(&err), err.to_string());
    match err {
        pricecheck_recon::ReconError::MissingColumn { side, .. }
        | pricecheck_recon::ReconError::ColumnOutOfRange { side, .. } => cli_err.with_hint(format!(
            "run `pricecheck columns <file> --config <config> --side {side}` to see how \
             the {side} headers resolve, or map the column in [{side}.columns]"
        )),
        _ => cli_err,
    }
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    ReconConfig::from_toml(&config_str).map_err(engine_err)
}

/// CLI override first, then the config's file relative to the config's directory.
fn side_path(
    config: &ReconConfig,
    config_path: &Path,
    side: Side,
    cli: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli {
        return Ok(path);
    }
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    match &config.side(side).file {
        Some(file) => Ok(base_dir.join(file)),
        None => Err(recon_err(
            EXIT_USAGE,
            format!("no {side} file: set [{side}].file in the config or pass --{side}"),
        )),
    }
}

fn cmd_recon_run(
    config_path: PathBuf,
    left: Option<PathBuf>,
    right: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    let mut tables = Vec::with_capacity(2);
    for (side, cli_path) in [(Side::Left, left), (Side::Right, right)] {
        let path = side_path(&config, &config_path, side, cli_path)?;
        let side_config = config.side(side);
        let table = pricecheck_io::load_table(
            &path,
            side,
            side_config.sheet.as_deref(),
            &side_config.header_labels,
        )
        .map_err(engine_err)?;
        log::debug!(
            "{side} ({}): {} with {} row(s)",
            config.label(side),
            path.display(),
            table.rows.len()
        );
        tables.push(table);
    }

    // Run engine
    let result = pricecheck_recon::run(&config, &tables[0], &tables[1]).map_err(engine_err)?;

    // Output
    if json_output || output_file.is_some() {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = output_file {
            std::fs::write(path, &json_str)
                .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }

        if json_output {
            println!("{json_str}");
        }
    }

    if !json_output {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_report(&mut handle, &result)
            .map_err(|e| recon_err(EXIT_RUNTIME, format!("cannot write report: {e}")))?;
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} vs {}: {} key(s), {} same, {} different, {} only in {}, {} only in {}",
        result.meta.left_label,
        result.meta.right_label,
        s.total_keys,
        s.matched_same,
        s.matched_different,
        s.only_left,
        result.meta.left_label,
        s.only_right,
        result.meta.right_label,
    );

    if s.has_differences() {
        return Err(recon_err(EXIT_DIFFERENCES, ""));
    }
    Ok(())
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let amounts = config.left.columns.amounts.len().max(1);
    eprintln!(
        "valid: '{}' ({} vs {}), {} amount column(s), date in key: {}",
        config.name,
        config.label(Side::Left),
        config.label(Side::Right),
        amounts,
        config.options.use_date_in_key,
    );
    Ok(())
}

fn cmd_columns(
    file: PathBuf,
    sheet: Option<String>,
    header_labels: Vec<String>,
    config_path: Option<PathBuf>,
    side: Side,
) -> Result<(), CliError> {
    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => ReconConfig::default(),
    };
    let side_config = config.side(side);
    let sheet = sheet.or_else(|| side_config.sheet.clone());
    let header_labels = if header_labels.is_empty() {
        side_config.header_labels.clone()
    } else {
        header_labels
    };

    let table = pricecheck_io::load_table(&file, side, sheet.as_deref(), &header_labels)
        .map_err(|e| match e {
            pricecheck_recon::ReconError::HeaderRowNotFound { labels, .. } => recon_err(
                EXIT_INVALID_CONFIG,
                format!("{}: no header row contains all of {labels:?}", file.display()),
            ),
            other => engine_err(other),
        })?;

    // Same resolution `run` applies, before required roles are enforced.
    let cols = assign_columns(&table, side, &side_config.columns, &config.synonyms)
        .map_err(engine_err)?;
    let mut roles: Vec<(String, Option<usize>)> = vec![
        (Role::OrderId.to_string(), cols.order_id),
        (Role::Date.to_string(), cols.date),
    ];
    let slots = cols.amounts.len();
    for (slot, col) in cols.amounts.iter().enumerate() {
        let name = if slots > 1 {
            format!("{} {}", Role::Amount, slot + 1)
        } else {
            Role::Amount.to_string()
        };
        roles.push((name, *col));
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let write = |handle: &mut io::StdoutLock<'_>| -> io::Result<()> {
        for (idx, header) in table.headers.iter().enumerate() {
            let tags: Vec<String> = roles
                .iter()
                .filter(|(_, col)| *col == Some(idx))
                .map(|(role, _)| role.clone())
                .collect();
            let tag = if tags.is_empty() {
                String::new()
            } else {
                format!("  <- {}", tags.join(", "))
            };
            writeln!(handle, "{:>4}  {:<3} {}{}", idx, index_to_column_letter(idx), header, tag)?;
        }
        for (role, col) in &roles {
            if col.is_none() {
                writeln!(handle, "no column resolves to {role}")?;
            }
        }
        Ok(())
    };
    write(&mut handle).map_err(|e| recon_err(EXIT_RUNTIME, e.to_string()))?;

    eprintln!(
        "{}: {} column(s), {} data row(s)",
        file.display(),
        table.headers.len(),
        table.rows.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

pub fn write_report(out: &mut impl Write, result: &ReconResult) -> io::Result<()> {
    let left = &result.meta.left_label;
    let right = &result.meta.right_label;

    let sections = [
        (ReconBucket::OnlyLeft, format!("Only in {left}")),
        (ReconBucket::OnlyRight, format!("Only in {right}")),
        (ReconBucket::MatchedDifferent, "Price differences".to_string()),
    ];

    for (bucket, title) in sections {
        let rows = result.buckets.rows(bucket);
        writeln!(out, "{title} ({})", result.buckets.key_count(bucket))?;
        if rows.is_empty() {
            writeln!(out, "  none")?;
        }
        for row in rows {
            writeln!(out, "  {}", report_line(row, left, right))?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "Matching ({})",
        result.buckets.key_count(ReconBucket::MatchedSame)
    )?;
    for t in &result.summary.totals {
        writeln!(
            out,
            "Total amount {}: {left} {} / {right} {} / delta {}",
            t.slot + 1,
            total_text(t.left),
            total_text(t.right),
            total_text(t.delta)
        )?;
    }
    Ok(())
}

fn total_text(value: Option<impl std::fmt::Display>) -> String {
    value.map_or_else(|| "overflow".to_string(), |v| v.to_string())
}

fn report_line(row: &ReconRow, left: &str, right: &str) -> String {
    let date = row
        .key
        .order_date
        .or_else(|| row.left.as_ref().and_then(|a| a.order_date))
        .or_else(|| row.right.as_ref().and_then(|a| a.order_date))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());

    let amounts = |agg: Option<&pricecheck_recon::model::Aggregate>| -> String {
        match agg {
            Some(a) => a
                .amounts
                .iter()
                .map(|v| v.map_or_else(|| "-".to_string(), |d| d.to_string()))
                .collect::<Vec<_>>()
                .join(" | "),
            None => "-".to_string(),
        }
    };

    let mut line = format!("{}  {}", date, row.key.order_id);
    match row.bucket {
        ReconBucket::OnlyLeft => line.push_str(&format!("  {left} {}", amounts(row.left.as_ref()))),
        ReconBucket::OnlyRight => {
            line.push_str(&format!("  {right} {}", amounts(row.right.as_ref())))
        }
        ReconBucket::MatchedDifferent | ReconBucket::MatchedSame => {
            line.push_str(&format!(
                "  {left} {}  {right} {}",
                amounts(row.left.as_ref()),
                amounts(row.right.as_ref())
            ));
            let diffs: Vec<String> = row
                .diffs
                .iter()
                .filter(|d| !d.within_tolerance)
                .map(|d| match d.difference {
                    Some(diff) => diff.to_string(),
                    None => "missing".to_string(),
                })
                .collect();
            if !diffs.is_empty() {
                line.push_str(&format!("  diff {}", diffs.join(" | ")));
            }
        }
    }
    line
}
