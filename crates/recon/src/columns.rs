//! Column discovery: which header carries the order id, the date, the amount.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::table::RawCell;

/// Rows scanned by [`find_header_row`] before giving up.
pub const HEADER_SCAN_LIMIT: usize = 300;

const ORDER_ID_SYNONYMS: &[&str] = &[
    "numero ordine",
    "n ordine",
    "nr ordine",
    "id ordine",
    "codice ordine",
    "order id",
    "order number",
    "order no",
    "ordine",
    "order",
];

const DATE_SYNONYMS: &[&str] = &[
    "data ordine",
    "order date",
    "date",
    "data",
    "data operazione",
    "data documento",
];

const AMOUNT_SYNONYMS: &[&str] = &[
    "prezzo",
    "price",
    "amount",
    "importo",
    "totale",
    "total",
    "valore",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    OrderId,
    Date,
    Amount,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderId => write!(f, "order id"),
            Self::Date => write!(f, "date"),
            Self::Amount => write!(f, "amount"),
        }
    }
}

// ---------------------------------------------------------------------------
// Synonym dictionaries
// ---------------------------------------------------------------------------

/// Keyword dictionaries per role, highest priority first.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Synonyms {
    pub order_id: Vec<String>,
    pub date: Vec<String>,
    pub amount: Vec<String>,
}

impl Default for Synonyms {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            order_id: owned(ORDER_ID_SYNONYMS),
            date: owned(DATE_SYNONYMS),
            amount: owned(AMOUNT_SYNONYMS),
        }
    }
}

impl Synonyms {
    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::OrderId => &self.order_id,
            Role::Date => &self.date,
            Role::Amount => &self.amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Name scoring
// ---------------------------------------------------------------------------

/// Lowercase, fold accents to ASCII and collapse runs of whitespace and
/// `-` `_` `.` `°` `º` to a single space: `"  Data_Ordine "` and
/// `"data-ordine"` both become `"data ordine"`, `"N° Ordine"` becomes
/// `"n ordine"`, `"Quantità"` becomes `"quantita"`.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for c in folded.chars() {
        if c.is_whitespace() || matches!(c, '-' | '_' | '.' | '°' | 'º') {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// How well a header matches a role. Orders exact matches above every
/// substring match, then earlier synonyms above later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeaderScore {
    exact: bool,
    rank: usize,
}

/// Score of one normalized header against normalized synonyms; `None`
/// means unrelated.
fn score(header: &str, synonyms: &[String]) -> Option<HeaderScore> {
    let n = synonyms.len();
    synonyms
        .iter()
        .enumerate()
        .filter_map(|(i, syn)| {
            if syn.is_empty() || header.is_empty() {
                None
            } else if header == syn {
                Some(HeaderScore { exact: true, rank: n - i })
            } else if header.contains(syn.as_str()) {
                Some(HeaderScore { exact: false, rank: n - i })
            } else {
                None
            }
        })
        .max()
}

fn normalized_synonyms(synonyms: &[String]) -> Vec<String> {
    synonyms.iter().map(|s| normalize_header(s)).collect()
}

/// Best-matching column for `role`, or `None` when nothing scores above zero.
/// Ties go to the leftmost column.
pub fn resolve<S: AsRef<str>>(headers: &[S], role: Role, synonyms: &[String]) -> Option<usize> {
    resolve_excluding(headers, role, synonyms, &[])
}

/// Like [`resolve`] but never returns a column listed in `claimed`.
pub fn resolve_excluding<S: AsRef<str>>(
    headers: &[S],
    role: Role,
    synonyms: &[String],
    claimed: &[usize],
) -> Option<usize> {
    let synonyms = normalized_synonyms(synonyms);

    let mut best: Option<(usize, HeaderScore)> = None;
    for (idx, header) in headers.iter().enumerate() {
        if claimed.contains(&idx) {
            continue;
        }
        let Some(s) = score(&normalize_header(header.as_ref()), &synonyms) else {
            continue;
        };
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((idx, s));
        }
    }

    if let Some((idx, s)) = best {
        log::debug!("resolved {role} column to '{}' ({s:?})", headers[idx].as_ref());
    }
    best.map(|(idx, _)| idx)
}

/// Resolve several roles against one header row, strongest pair first.
///
/// Every open (role, column) pair is scored and the best one is fixed
/// before the next is chosen, so a column that is an exact match for one
/// role is never taken through another role's substring hit. Ties go to the
/// earlier entry of `roles`, then to the leftmost column. A role listed
/// twice gets two distinct columns. The result is parallel to `roles`.
pub fn assign_roles<S: AsRef<str>>(
    headers: &[S],
    roles: &[Role],
    synonyms: &Synonyms,
    claimed: &[usize],
) -> Vec<Option<usize>> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
    let role_synonyms: Vec<Vec<String>> = roles
        .iter()
        .map(|role| normalized_synonyms(synonyms.for_role(*role)))
        .collect();

    let mut claimed = claimed.to_vec();
    let mut assigned = vec![None; roles.len()];
    let mut open: Vec<usize> = (0..roles.len()).collect();

    while !open.is_empty() {
        let mut best: Option<(HeaderScore, usize, usize)> = None;
        for (pos, &r) in open.iter().enumerate() {
            for (col, header) in normalized.iter().enumerate() {
                if claimed.contains(&col) {
                    continue;
                }
                let Some(s) = score(header, &role_synonyms[r]) else {
                    continue;
                };
                if best.map_or(true, |(top, _, _)| s > top) {
                    best = Some((s, pos, col));
                }
            }
        }

        let Some((s, pos, col)) = best else {
            break;
        };
        let r = open.remove(pos);
        log::debug!("resolved {} column to '{}' ({s:?})", roles[r], headers[col].as_ref());
        assigned[r] = Some(col);
        claimed.push(col);
    }
    assigned
}

// ---------------------------------------------------------------------------
// Header row discovery
// ---------------------------------------------------------------------------

/// First row within `max_scan` rows whose normalized cells contain every
/// label in `required_labels`.
pub fn find_header_row(
    rows: &[Vec<RawCell>],
    required_labels: &[String],
    max_scan: usize,
) -> Option<usize> {
    let labels: Vec<String> = required_labels.iter().map(|l| normalize_header(l)).collect();

    rows.iter().take(max_scan).position(|row| {
        let cells: HashSet<String> = row
            .iter()
            .map(|c| normalize_header(&c.as_text()))
            .filter(|c| !c.is_empty())
            .collect();
        labels.iter().all(|l| cells.contains(l))
    })
}

// ---------------------------------------------------------------------------
// Spreadsheet letters
// ---------------------------------------------------------------------------

/// `"A"` → 0, `"Z"` → 25, `"AA"` → 26. Case-insensitive; anything that is
/// not a run of ASCII letters yields `default`.
pub fn column_letter_to_index(letter: &str, default: usize) -> usize {
    let letter = letter.trim();
    if letter.is_empty() || !letter.bytes().all(|b| b.is_ascii_alphabetic()) {
        return default;
    }

    let mut n: usize = 0;
    for b in letter.bytes() {
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        n = match n.checked_mul(26).and_then(|v| v.checked_add(digit)) {
            Some(v) => v,
            None => return default,
        };
    }
    n - 1
}

/// Inverse of [`column_letter_to_index`].
pub fn index_to_column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn defaults(role: Role) -> Vec<String> {
        Synonyms::default().for_role(role).to_vec()
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("  Data_Ordine "), "data ordine");
        assert_eq!(normalize_header("data--ordine"), "data ordine");
        assert_eq!(normalize_header("Quantità"), "quantita");
        assert_eq!(normalize_header("N° Ordine"), "n ordine");
        assert_eq!(normalize_header("N. Ordine"), "n ordine");
        assert_eq!(normalize_header("Nº ordine"), "n ordine");
        assert_eq!(normalize_header("ORDER\tID"), "order id");
    }

    #[test]
    fn exact_match_beats_substring() {
        let h = headers(&["Order Reference", "Order"]);
        assert_eq!(resolve(&h, Role::OrderId, &defaults(Role::OrderId)), Some(1));
    }

    #[test]
    fn earlier_synonym_wins_among_exact_matches() {
        let h = headers(&["Data", "Data Ordine"]);
        assert_eq!(resolve(&h, Role::Date, &defaults(Role::Date)), Some(1));
    }

    #[test]
    fn ties_go_leftmost() {
        let h = headers(&["Totale Riga", "Totale Documento"]);
        assert_eq!(resolve(&h, Role::Amount, &defaults(Role::Amount)), Some(0));
    }

    #[test]
    fn accent_and_separator_folding_in_resolution() {
        let h = headers(&["cliente", "IMPORTO_€", "Prézzo"]);
        assert_eq!(resolve(&h, Role::Amount, &defaults(Role::Amount)), Some(2));
    }

    #[test]
    fn unrelated_headers_resolve_to_none() {
        let h = headers(&["cliente", "note", "qty"]);
        assert_eq!(resolve(&h, Role::Amount, &defaults(Role::Amount)), None);
        assert_eq!(resolve(&h, Role::OrderId, &[]), None);
    }

    #[test]
    fn claimed_columns_are_skipped() {
        let h = headers(&["Order", "Order Date"]);
        let id = resolve(&h, Role::OrderId, &defaults(Role::OrderId)).unwrap();
        assert_eq!(id, 0);
        let date = resolve_excluding(&h, Role::Date, &defaults(Role::Date), &[id]);
        assert_eq!(date, Some(1));
        let again = resolve_excluding(&h, Role::OrderId, &defaults(Role::OrderId), &[0, 1]);
        assert_eq!(again, None);
    }

    #[test]
    fn abbreviated_number_headers_match_exactly() {
        let h = headers(&["Data Ordine", "N. Ordine", "Prezzo"]);
        assert_eq!(resolve(&h, Role::OrderId, &defaults(Role::OrderId)), Some(1));
    }

    #[test]
    fn exact_match_for_one_role_outranks_substring_of_another() {
        // "ordine" is a substring of "Data Ordine", which is an exact date.
        let h = headers(&["Data Ordine", "Rif Ordine", "Prezzo"]);
        let roles = [Role::OrderId, Role::Date, Role::Amount];
        let got = assign_roles(&h, &roles, &Synonyms::default(), &[]);
        assert_eq!(got, vec![Some(1), Some(0), Some(2)]);
    }

    #[test]
    fn assignment_respects_claimed_and_repeated_roles() {
        let h = headers(&["Importo", "Ordine", "Totale", "Prezzo"]);
        let roles = [Role::Amount, Role::Amount, Role::OrderId];
        let got = assign_roles(&h, &roles, &Synonyms::default(), &[3]);
        assert_eq!(got, vec![Some(0), Some(2), Some(1)]);
    }

    #[test]
    fn unmatched_roles_stay_open() {
        let h = headers(&["Ordine", "Note"]);
        let roles = [Role::OrderId, Role::Date];
        let got = assign_roles(&h, &roles, &Synonyms::default(), &[]);
        assert_eq!(got, vec![Some(0), None]);
    }

    #[test]
    fn header_row_discovery() {
        let rows = vec![
            vec![RawCell::from("Estratto conto")],
            vec![RawCell::from("Numero Ordine"), RawCell::from("Prezzo")],
            vec![RawCell::from("Numero_Ordine"), RawCell::from("Data Ordine")],
        ];
        let labels = headers(&["numero ordine", "data ordine"]);
        assert_eq!(find_header_row(&rows, &labels, HEADER_SCAN_LIMIT), Some(2));
        assert_eq!(find_header_row(&rows, &labels, 2), None);
    }

    #[test]
    fn letters_to_index() {
        assert_eq!(column_letter_to_index("A", 9), 0);
        assert_eq!(column_letter_to_index("z", 9), 25);
        assert_eq!(column_letter_to_index("AA", 9), 26);
        assert_eq!(column_letter_to_index(" ab ", 9), 27);
        assert_eq!(column_letter_to_index("A1", 9), 9);
        assert_eq!(column_letter_to_index("", 9), 9);
        assert_eq!(column_letter_to_index("ZZZZZZZZZZZZZZZZZZZZ", 4), 4);
    }

    #[test]
    fn index_to_letters() {
        assert_eq!(index_to_column_letter(0), "A");
        assert_eq!(index_to_column_letter(25), "Z");
        assert_eq!(index_to_column_letter(26), "AA");
        assert_eq!(index_to_column_letter(701), "ZZ");
        assert_eq!(index_to_column_letter(702), "AAA");
    }
}
