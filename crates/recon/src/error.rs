use std::fmt;

use crate::columns::Role;
use crate::model::Side;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error (includes unknown enum values).
    ConfigParse(String),
    /// Option values that cannot drive a run (negative tolerance, etc.).
    InvalidConfiguration(String),
    /// A column role could not be resolved on one of the tables.
    MissingColumn {
        side: Side,
        role: Role,
        available: Vec<String>,
    },
    /// A positional column spec points past the table width.
    ColumnOutOfRange {
        side: Side,
        role: Role,
        index: usize,
        width: usize,
    },
    /// No row in the scanned prefix carries all of the header labels.
    HeaderRowNotFound { side: Side, labels: Vec<String> },
    /// IO error (file read, sheet lookup, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Self::MissingColumn { side, role, available } => {
                write!(
                    f,
                    "{side} table: cannot resolve {role} column (available: {})",
                    quote_all(available)
                )
            }
            Self::ColumnOutOfRange { side, role, index, width } => {
                write!(
                    f,
                    "{side} table: {role} column index {index} out of range (table has {width} column(s))"
                )
            }
            Self::HeaderRowNotFound { side, labels } => {
                write!(
                    f,
                    "{side} table: no header row contains all of {}",
                    quote_all(labels)
                )
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

fn quote_all(items: &[String]) -> String {
    if items.is_empty() {
        return "none".into();
    }
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
