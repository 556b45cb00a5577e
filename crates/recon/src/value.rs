//! Locale-tolerant parsing of amounts and dates.
//!
//! Feeds mix Italian (`1.234,56`) and plain (`1234.56`) notations, and
//! day-first or month-first dates. Every parser here is total: bad input
//! becomes `None`, never an error.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::table::RawCell;

/// Largest excel serial that still maps to a real date (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d-%b-%Y",
    "%d/%b/%Y",
    "%d-%b-%y",
];

// ---------------------------------------------------------------------------
// Decimals
// ---------------------------------------------------------------------------

/// Parse a free-form amount into an exact decimal.
///
/// Whitespace and apostrophes (`'`, `’`) are thousands separators. With both
/// `,` and `.` present, `.` groups thousands and `,` is the decimal mark;
/// a lone `,` is the decimal mark.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '\u{2019}')
        .collect();
    if s.is_empty() {
        return None;
    }

    if s.contains(',') && s.contains('.') {
        s = s.replace('.', "").replace(',', ".");
    } else if s.contains(',') {
        s = s.replace(',', ".");
    }

    parse_plain_decimal(&s)
}

fn parse_plain_decimal(s: &str) -> Option<Decimal> {
    match Decimal::from_str(s) {
        Ok(d) => Some(d),
        Err(_) if s.contains(|c| c == 'e' || c == 'E') => Decimal::from_scientific(s).ok(),
        Err(_) => None,
    }
}

/// [`parse_decimal`] over a raw cell. Numeric cells go through their
/// shortest decimal representation so `10.5f64` reads as `10.5`.
pub fn parse_cell_decimal(cell: &RawCell) -> Option<Decimal> {
    match cell {
        RawCell::Empty => None,
        RawCell::Text(s) => parse_decimal(s),
        RawCell::Number(n) if n.is_finite() => parse_plain_decimal(&n.to_string()),
        RawCell::Number(_) => None,
    }
}

/// Quantize to `decimals` places, rounding midpoints away from zero.
///
/// The result always carries exactly `decimals` fractional digits, so
/// `10.5` at 2 places displays as `10.50`.
pub fn round_half_up(value: Option<Decimal>, decimals: u32) -> Option<Decimal> {
    value.map(|d| {
        let mut rounded = d.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(decimals);
        rounded
    })
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a free-form calendar date. Time-of-day components are discarded.
///
/// Year-first numeric dates are always year-month-day. Otherwise the
/// preferred order is tried first and the swapped order only when the
/// preferred one is not a real date (`13/01/2024` under month-first).
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date_part = strip_time(trimmed);
    parse_numeric_date(&date_part, day_first).or_else(|| parse_named_month(&date_part))
}

/// [`parse_date`] over a raw cell. Numeric cells are excel serial dates
/// (1900 system), except eight-digit integers which read as `YYYYMMDD`.
pub fn parse_cell_date(cell: &RawCell, day_first: bool) -> Option<NaiveDate> {
    match cell {
        RawCell::Empty => None,
        RawCell::Text(s) => parse_date(s, day_first),
        RawCell::Number(n) if n.fract() == 0.0 && (10_000_101.0..=99_991_231.0).contains(n) => {
            parse_date(&format!("{}", *n as i64), day_first)
        }
        RawCell::Number(n) => excel_serial_to_date(*n),
    }
}

/// Convert an excel serial (possibly with a time fraction) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    // 1899-12-30 absorbs the phantom 1900-02-29 for every date after March 1900.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

fn strip_time(s: &str) -> String {
    // ISO `2024-01-05T10:00:00`: cut at a `T` sitting between digits.
    let bytes = s.as_bytes();
    let iso_cut = (1..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i] == b'T' && bytes[i - 1].is_ascii_digit() && bytes[i + 1].is_ascii_digit()
    });
    let s = match iso_cut {
        Some(i) => &s[..i],
        None => s,
    };

    s.split_whitespace()
        .take_while(|tok| !tok.contains(':'))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_numeric_date(s: &str, day_first: bool) -> Option<NaiveDate> {
    let parts: Vec<&str> = s
        .split(|c: char| c == '-' || c == '/' || c == '.' || c == ' ')
        .filter(|p| !p.is_empty())
        .collect();

    if !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    match parts.as_slice() {
        [compact] if compact.len() == 8 => {
            let (y, rest) = compact.split_at(4);
            let (m, d) = rest.split_at(2);
            ymd(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
        }
        [y, m, d] if y.len() == 4 => ymd(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?),
        [a, b, y] if y.len() == 4 || y.len() == 2 => {
            let year = expand_year(y)?;
            let a: u32 = a.parse().ok()?;
            let b: u32 = b.parse().ok()?;
            let (first, second) = if day_first { ((b, a), (a, b)) } else { ((a, b), (b, a)) };
            ymd(year, first.0, first.1).or_else(|| ymd(year, second.0, second.1))
        }
        _ => None,
    }
}

fn parse_named_month(s: &str) -> Option<NaiveDate> {
    NAMED_MONTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn expand_year(y: &str) -> Option<i32> {
    let n: i32 = y.parse().ok()?;
    Some(match y.len() {
        2 if n < 70 => 2000 + n,
        2 => 1900 + n,
        _ => n,
    })
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn european_thousands_and_decimal_comma() {
        assert_eq!(parse_decimal("1.234,56"), Some(d("1234.56")));
        assert_eq!(parse_decimal("1234,5"), Some(d("1234.5")));
        assert_eq!(parse_decimal("12.345.678,9"), Some(d("12345678.9")));
    }

    #[test]
    fn plain_and_grouped_notation() {
        assert_eq!(parse_decimal("1234.56"), Some(d("1234.56")));
        assert_eq!(parse_decimal(" 1 234,50 "), Some(d("1234.50")));
        assert_eq!(parse_decimal("1'234.5"), Some(d("1234.5")));
        assert_eq!(parse_decimal("1\u{2019}234,75"), Some(d("1234.75")));
        assert_eq!(parse_decimal("-7,20"), Some(d("-7.20")));
    }

    #[test]
    fn garbage_and_empty_become_none() {
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("1,234,56"), None);
        assert_eq!(parse_decimal("€ 10"), None);
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(parse_decimal("1.5e3"), Some(d("1500")));
    }

    #[test]
    fn reparse_of_canonical_form_is_stable() {
        for raw in ["1.234,56", "0,005", "-12", "99999.999", "1'000"] {
            let first = parse_decimal(raw).unwrap();
            assert_eq!(parse_decimal(&first.to_string()), Some(first), "input {raw}");
        }
    }

    #[test]
    fn cells() {
        assert_eq!(parse_cell_decimal(&RawCell::Number(10.5)), Some(d("10.5")));
        assert_eq!(parse_cell_decimal(&RawCell::Text("10,50".into())), Some(d("10.50")));
        assert_eq!(parse_cell_decimal(&RawCell::Empty), None);
        assert_eq!(parse_cell_decimal(&RawCell::Number(f64::NAN)), None);
    }

    #[test]
    fn half_up_not_bankers() {
        assert_eq!(round_half_up(Some(d("1.005")), 2), Some(d("1.01")));
        assert_eq!(round_half_up(Some(d("2.5")), 0), Some(d("3")));
        assert_eq!(round_half_up(Some(d("-2.5")), 0), Some(d("-3")));
        assert_eq!(round_half_up(Some(d("1.004")), 2), Some(d("1.00")));
        assert_eq!(round_half_up(None, 2), None);
    }

    #[test]
    fn rounding_pads_scale() {
        assert_eq!(round_half_up(Some(d("10.5")), 2).unwrap().to_string(), "10.50");
        assert_eq!(round_half_up(Some(d("3")), 4).unwrap().to_string(), "3.0000");
    }

    #[test]
    fn day_first_and_month_first() {
        assert_eq!(parse_date("05/01/2024", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024", false), Some(date(2024, 5, 1)));
        assert_eq!(parse_date("5.1.24", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05-01-1999", true), Some(date(1999, 1, 5)));
    }

    #[test]
    fn swapped_order_when_preferred_is_impossible() {
        assert_eq!(parse_date("13/01/2024", false), Some(date(2024, 1, 13)));
        assert_eq!(parse_date("01/13/2024", true), Some(date(2024, 1, 13)));
        assert_eq!(parse_date("31/31/2024", true), None);
    }

    #[test]
    fn year_first_ignores_convention() {
        assert_eq!(parse_date("2024-01-05", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024/1/5", false), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("20240105", true), Some(date(2024, 1, 5)));
    }

    #[test]
    fn time_components_are_discarded() {
        assert_eq!(parse_date("2024-01-05 00:00:00", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T23:59:59Z", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024 10:30", true), Some(date(2024, 1, 5)));
    }

    #[test]
    fn named_months() {
        assert_eq!(parse_date("5 Jan 2024", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("January 5, 2024", true), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("05-Feb-2024", false), Some(date(2024, 2, 5)));
    }

    #[test]
    fn unparsable_dates() {
        assert_eq!(parse_date("", true), None);
        assert_eq!(parse_date("not a date", true), None);
        assert_eq!(parse_date("2024-02-30", true), None);
    }

    #[test]
    fn excel_serials() {
        assert_eq!(excel_serial_to_date(45296.0), Some(date(2024, 1, 5)));
        assert_eq!(excel_serial_to_date(45296.75), Some(date(2024, 1, 5)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(parse_cell_date(&RawCell::Number(45296.0), true), Some(date(2024, 1, 5)));
        assert_eq!(parse_cell_date(&RawCell::Number(20240105.0), true), Some(date(2024, 1, 5)));
    }
}
