// File loading: CSV/TSV and Excel workbooks into engine tables

pub mod csv;
pub mod xlsx;

use std::path::Path;

use pricecheck_recon::error::ReconError;
use pricecheck_recon::model::Side;
use pricecheck_recon::table::{RawCell, RawTable};

/// Source formats recognized by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Excel,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Read a whole sheet (or delimited file) without interpreting any row.
pub fn load_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<RawCell>>, ReconError> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        ReconError::Io(format!(
            "{}: unsupported file type (expected csv, tsv, xlsx, xls, xlsb or ods)",
            path.display()
        ))
    })?;

    if sheet.is_some() && format != SourceFormat::Excel {
        log::warn!("{}: sheet name ignored for delimited files", path.display());
    }

    let grid = match format {
        SourceFormat::Csv => crate::csv::import(path),
        SourceFormat::Tsv => crate::csv::import_tsv(path),
        SourceFormat::Excel => xlsx::import(path, sheet),
    }
    .map_err(ReconError::Io)?;

    log::debug!("{}: {} row(s) read", path.display(), grid.len());
    Ok(grid)
}

/// Load one side's table. With `header_labels` the header row is located
/// by label; otherwise the first row is the header.
pub fn load_table(
    path: &Path,
    side: Side,
    sheet: Option<&str>,
    header_labels: &[String],
) -> Result<RawTable, ReconError> {
    let grid = load_grid(path, sheet)?;
    table_from_grid(grid, side, header_labels)
}

pub fn table_from_grid(
    grid: Vec<Vec<RawCell>>,
    side: Side,
    header_labels: &[String],
) -> Result<RawTable, ReconError> {
    if header_labels.is_empty() {
        return Ok(RawTable::from_first_row(grid));
    }
    RawTable::from_grid(grid, header_labels).ok_or_else(|| ReconError::HeaderRowNotFound {
        side,
        labels: header_labels.to_vec(),
    })
}
