// Excel file import (xlsx, xlsm, xls, xlsb, ods) into a raw cell grid
//
// One sheet is read per call. Positions are absolute: a used range that does
// not begin at A1 is padded so column letters keep their spreadsheet meaning.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use pricecheck_recon::table::RawCell;

/// Import one sheet (the first when `sheet` is `None`).
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<RawCell>>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file {}: {}", path.display(), e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = select_sheet(&sheet_names, sheet)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let (height, width) = range.get_size();
    log::debug!(
        "{}: sheet '{}' is {}x{}",
        path.display(),
        sheet_name,
        height,
        width
    );
    if height == 0 || width == 0 {
        return Ok(Vec::new());
    }

    // Range start offset (data may not begin at A1)
    let (data_start_row, data_start_col) = range.start().unwrap_or((0, 0));

    let mut grid: Vec<Vec<RawCell>> = vec![Vec::new(); data_start_row as usize];
    for row in range.rows() {
        let mut cells = vec![RawCell::Empty; data_start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        grid.push(cells);
    }
    Ok(grid)
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file {}: {}", path.display(), e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Exact name first, then a trimmed case-insensitive match.
fn select_sheet(sheet_names: &[String], wanted: Option<&str>) -> Result<String, String> {
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let Some(wanted) = wanted else {
        return Ok(sheet_names[0].clone());
    };

    sheet_names
        .iter()
        .find(|n| n.as_str() == wanted)
        .or_else(|| {
            sheet_names
                .iter()
                .find(|n| n.trim().eq_ignore_ascii_case(wanted.trim()))
        })
        .cloned()
        .ok_or_else(|| {
            format!(
                "sheet '{}' not found (available: {})",
                wanted,
                sheet_names.join(", ")
            )
        })
}

fn convert_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::text(s.as_str()),
        Data::Float(n) => RawCell::Number(*n),
        Data::Int(n) => RawCell::Number(*n as f64),
        // Store as TRUE/FALSE text; never a valid id, date or amount
        Data::Bool(b) => RawCell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => RawCell::text(format!("#{:?}", e)),
        // Note: assumes the 1900 date system (most common)
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => RawCell::text(s.as_str()),
        Data::DurationIso(s) => RawCell::text(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_first_sheet_by_default() {
        let sheets = names(&["Ordini", "Note"]);
        assert_eq!(select_sheet(&sheets, None).unwrap(), "Ordini");
    }

    #[test]
    fn test_select_sheet_case_insensitive() {
        let sheets = names(&["Ordini", "Note"]);
        assert_eq!(select_sheet(&sheets, Some(" note ")).unwrap(), "Note");
    }

    #[test]
    fn test_unknown_sheet_lists_available() {
        let sheets = names(&["Ordini", "Note"]);
        let err = select_sheet(&sheets, Some("Marzo")).unwrap_err();
        assert!(err.contains("'Marzo'"));
        assert!(err.contains("Ordini, Note"));
    }

    #[test]
    fn test_convert_cells() {
        assert_eq!(convert_cell(&Data::Int(1001)), RawCell::Number(1001.0));
        assert_eq!(convert_cell(&Data::String(String::new())), RawCell::Empty);
        assert_eq!(
            convert_cell(&Data::Bool(true)),
            RawCell::Text("TRUE".into())
        );
    }

    #[test]
    fn test_import_named_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fornitore.xlsx");

        let mut workbook = Workbook::new();
        let cover = workbook.add_worksheet();
        cover.set_name("Copertina").unwrap();
        cover.write_string(0, 0, "Fornitore Rossi").unwrap();

        let orders = workbook.add_worksheet();
        orders.set_name("Ordini").unwrap();
        orders.write_string(0, 0, "Numero Ordine").unwrap();
        orders.write_string(0, 1, "Prezzo").unwrap();
        orders.write_number(1, 0, 1001.0).unwrap();
        orders.write_number(1, 1, 10.5).unwrap();
        workbook.save(&path).unwrap();

        assert_eq!(sheet_names(&path).unwrap(), vec!["Copertina", "Ordini"]);

        let grid = import(&path, Some("Ordini")).unwrap();
        assert_eq!(grid[0][0], RawCell::Text("Numero Ordine".into()));
        assert_eq!(grid[1][0], RawCell::Number(1001.0));
        assert_eq!(grid[1][1], RawCell::Number(10.5));

        let first = import(&path, None).unwrap();
        assert_eq!(first[0][0], RawCell::Text("Fornitore Rossi".into()));
    }

    #[test]
    fn test_offset_range_keeps_absolute_positions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(2, 1, "Ordine").unwrap();
        sheet.write_string(3, 1, "A1").unwrap();
        workbook.save(&path).unwrap();

        let grid = import(&path, None).unwrap();
        assert_eq!(grid.len(), 4);
        assert!(grid[0].is_empty());
        assert_eq!(grid[2][0], RawCell::Empty);
        assert_eq!(grid[2][1], RawCell::Text("Ordine".into()));
    }
}
