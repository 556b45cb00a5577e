//! Order identifier canonicalization.

/// How raw order ids are canonicalized before keys are built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdOptions {
    /// Carrier/system prefixes removed from the front (case-insensitive).
    pub strip_prefixes: Vec<String>,
    pub strip_leading_zeros: bool,
    /// Keep only the trailing run of digits, when there is one.
    pub numeric_suffix_only: bool,
}

/// Canonical form of a raw order id. Pure and total.
///
/// `"BLL0001230"` with prefix `BLL` and zero stripping becomes `"1230"`.
/// A non-empty input never yields an empty id.
pub fn normalize_id(raw: &str, opts: &IdOptions) -> String {
    let mut id = strip_prefix(raw.trim(), &opts.strip_prefixes);

    if opts.numeric_suffix_only {
        let digits = trailing_digits(id);
        if !digits.is_empty() {
            id = digits;
        }
    }

    if opts.strip_leading_zeros && !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        let stripped = id.trim_start_matches('0');
        return if stripped.is_empty() { "0".into() } else { stripped.into() };
    }

    id.to_string()
}

/// Remove the longest matching prefix. A prefix equal to the whole id is
/// left in place.
fn strip_prefix<'a>(id: &'a str, prefixes: &[String]) -> &'a str {
    let best = prefixes
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty() && p.len() < id.len())
        .filter(|p| {
            id.get(..p.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(p))
        })
        .max_by_key(|p| p.len());

    match best {
        Some(p) => {
            let rest = id[p.len()..].trim();
            if rest.is_empty() {
                id
            } else {
                rest
            }
        }
        None => id,
    }
}

fn trailing_digits(id: &str) -> &str {
    let start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(id.len(), |(i, _)| i);
    &id[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(prefixes: &[&str], zeros: bool, suffix: bool) -> IdOptions {
        IdOptions {
            strip_prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            strip_leading_zeros: zeros,
            numeric_suffix_only: suffix,
        }
    }

    #[test]
    fn prefix_and_leading_zeros() {
        assert_eq!(normalize_id("BLL0001230", &opts(&["BLL"], true, false)), "1230");
        assert_eq!(normalize_id("  bll0001230 ", &opts(&["BLL"], true, false)), "1230");
    }

    #[test]
    fn trims_only_by_default() {
        assert_eq!(normalize_id("  00123 ", &IdOptions::default()), "00123");
        assert_eq!(normalize_id("", &IdOptions::default()), "");
    }

    #[test]
    fn longest_prefix_wins() {
        let o = opts(&["BL", "BLL"], false, false);
        assert_eq!(normalize_id("BLL42", &o), "42");
    }

    #[test]
    fn prefix_equal_to_id_is_kept() {
        assert_eq!(normalize_id("BLL", &opts(&["BLL"], false, false)), "BLL");
        assert_eq!(normalize_id("BLL  ", &opts(&["BLL"], false, false)), "BLL");
    }

    #[test]
    fn all_zero_maps_to_zero() {
        assert_eq!(normalize_id("0000", &opts(&[], true, false)), "0");
    }

    #[test]
    fn zeros_kept_for_mixed_ids() {
        assert_eq!(normalize_id("00A12", &opts(&[], true, false)), "00A12");
    }

    #[test]
    fn numeric_suffix_extraction() {
        assert_eq!(normalize_id("ORD-2024/00077", &opts(&[], false, true)), "00077");
        assert_eq!(normalize_id("ORD-2024/00077", &opts(&[], true, true)), "77");
        assert_eq!(normalize_id("ABC", &opts(&[], true, true)), "ABC");
        assert_eq!(normalize_id("1234", &opts(&[], false, true)), "1234");
    }

    #[test]
    fn non_ascii_input_is_total() {
        assert_eq!(normalize_id("ordine-é42", &opts(&["ordine"], true, true)), "42");
        assert_eq!(normalize_id("éé", &opts(&["é"], false, false)), "é");
    }
}
