use rust_decimal::Decimal;
use serde::Deserialize;

use crate::columns::Synonyms;
use crate::error::ReconError;
use crate::ident::IdOptions;
use crate::model::Side;

/// Largest scale `rust_decimal` can represent.
pub const MAX_DECIMALS: u32 = 28;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub options: ReconOptions,
    #[serde(default)]
    pub left: SideConfig,
    #[serde(default)]
    pub right: SideConfig,
    #[serde(default)]
    pub synonyms: Synonyms,
}

fn default_name() -> String {
    "price check".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            options: ReconOptions::default(),
            left: SideConfig::default(),
            right: SideConfig::default(),
            synonyms: Synonyms::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMode {
    #[default]
    Sum,
    Average,
}

/// What a missing amount means when the other side has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountMissingPolicy {
    /// Missing counts as `0`.
    TreatAsZero,
    /// Missing makes the slot incomparable, so the key is `matched_different`.
    #[default]
    ForceMismatch,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconOptions {
    pub day_first: bool,
    pub use_date_in_key: bool,
    pub aggregate_duplicates: bool,
    pub aggregate_mode: AggregateMode,
    pub tolerance: Decimal,
    pub decimals: u32,
    pub strip_leading_zeros: bool,
    pub numeric_suffix_only: bool,
    pub id_prefixes_to_strip: Vec<String>,
    pub amount_missing_policy: AmountMissingPolicy,
    /// Drop rows with an unparsable amount instead of keeping a `None` slot.
    pub strict_amounts: bool,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            day_first: true,
            use_date_in_key: true,
            aggregate_duplicates: false,
            aggregate_mode: AggregateMode::Sum,
            tolerance: Decimal::ZERO,
            decimals: 2,
            strip_leading_zeros: false,
            numeric_suffix_only: false,
            id_prefixes_to_strip: Vec::new(),
            amount_missing_policy: AmountMissingPolicy::ForceMismatch,
            strict_amounts: false,
        }
    }
}

impl ReconOptions {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.tolerance < Decimal::ZERO {
            return Err(ReconError::InvalidConfiguration(format!(
                "tolerance must not be negative, got {}",
                self.tolerance
            )));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ReconError::InvalidConfiguration(format!(
                "decimals must be at most {MAX_DECIMALS}, got {}",
                self.decimals
            )));
        }
        Ok(())
    }

    pub fn id_options(&self) -> IdOptions {
        IdOptions {
            strip_prefixes: self.id_prefixes_to_strip.clone(),
            strip_leading_zeros: self.strip_leading_zeros,
            numeric_suffix_only: self.numeric_suffix_only,
        }
    }

    pub fn project_options(&self) -> ProjectOptions {
        ProjectOptions {
            day_first: self.day_first,
            decimals: self.decimals,
            id: self.id_options(),
            require_date: self.use_date_in_key,
            strict_amounts: self.strict_amounts,
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            use_date_in_key: self.use_date_in_key,
            aggregate_duplicates: self.aggregate_duplicates,
            aggregate_mode: self.aggregate_mode,
            tolerance: self.tolerance,
            decimals: self.decimals,
            missing_policy: self.amount_missing_policy,
        }
    }
}

/// Row normalization settings for one table.
#[derive(Debug, Clone)]
pub struct ProjectOptions {
    pub day_first: bool,
    pub decimals: u32,
    pub id: IdOptions,
    /// Drop rows whose date does not parse.
    pub require_date: bool,
    pub strict_amounts: bool,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        ReconOptions::default().project_options()
    }
}

/// Join and comparison settings.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub use_date_in_key: bool,
    pub aggregate_duplicates: bool,
    pub aggregate_mode: AggregateMode,
    pub tolerance: Decimal,
    pub decimals: u32,
    pub missing_policy: AmountMissingPolicy,
}

impl Default for MatchOptions {
    fn default() -> Self {
        ReconOptions::default().match_options()
    }
}

// ---------------------------------------------------------------------------
// Sides + column specs
// ---------------------------------------------------------------------------

/// How one role's column is picked. Absent means name-based resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSpec {
    /// Exact header text, falling back to normalized comparison.
    Name(String),
    /// Spreadsheet letter (`"C"`, `"AA"`).
    Letter(String),
    /// 0-based position.
    Index(usize),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub order_id: Option<ColumnSpec>,
    pub date: Option<ColumnSpec>,
    /// One spec per amount slot. Empty means a single resolved amount column.
    pub amounts: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SideConfig {
    /// Display name; `supplier` / `logistics` when absent.
    pub label: Option<String>,
    /// Source file, resolved relative to the config file by the loader.
    pub file: Option<String>,
    /// Workbook sheet; first sheet when absent.
    pub sheet: Option<String>,
    /// Labels identifying the header row when it is not the first row.
    pub header_labels: Vec<String>,
    pub columns: ColumnMapping,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.options.validate()?;

        let (l, r) = (&self.left.columns.amounts, &self.right.columns.amounts);
        if l.len().max(1) != r.len().max(1) {
            return Err(ReconError::InvalidConfiguration(format!(
                "left maps {} amount column(s), right maps {}",
                l.len().max(1),
                r.len().max(1)
            )));
        }

        for side in [Side::Left, Side::Right] {
            if self.side(side).label.as_deref().is_some_and(|l| l.trim().is_empty()) {
                return Err(ReconError::InvalidConfiguration(format!(
                    "{side} label must not be empty"
                )));
            }
        }

        Ok(())
    }

    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn label(&self, side: Side) -> &str {
        match (self.side(side).label.as_deref(), side) {
            (Some(label), _) => label,
            (None, Side::Left) => "supplier",
            (None, Side::Right) => "logistics",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
