//! Search session configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigParseError, SearchError};
use crate::ranking::SortDirection;
use crate::search_type::{DirectionSetting, SearchVariant, StructuralFilter};

/// Default engine memory ceiling: 8 GiB.
pub const DEFAULT_MEMORY_CEILING_BYTES: u64 = 8 * 1024 * 1024 * 1024;

/// How a start or reference model is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelSpec {
    /// The saturated model.
    Top,
    /// The independence model.
    Bottom,
    /// Top for downward searches, bottom otherwise.
    #[default]
    Default,
    /// A model given by name, checked against the declared variables.
    Named(String),
}

impl ModelSpec {
    /// `""` means `default`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "top" => Self::Top,
            "bottom" => Self::Bottom,
            "default" | "" => Self::Default,
            name => Self::Named(name.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Default => "default",
            Self::Named(name) => name,
        }
    }
}

impl From<String> for ModelSpec {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ModelSpec> for String {
    fn from(spec: ModelSpec) -> Self {
        spec.as_str().to_string()
    }
}

/// Configuration for one search session. Immutable once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfigV1 {
    /// Beam width: models retained per level.
    pub width: u32,
    /// Level budget.
    pub levels: u32,
    pub direction: DirectionSetting,
    pub filter: StructuralFilter,
    pub variant: SearchVariant,
    /// Ranking attribute name.
    pub sort_attribute: String,
    pub sort_direction: SortDirection,
    /// Report ordering attribute; falls back to `sort_attribute`.
    pub report_sort_attribute: Option<String>,
    /// Report ordering direction; falls back to `sort_direction`.
    pub report_sort_direction: Option<SortDirection>,
    pub reference_model: ModelSpec,
    pub start_model: ModelSpec,
    /// Engine memory usage above this stops the search at the next level boundary.
    pub memory_ceiling_bytes: u64,
    pub incremental_alpha: bool,
    pub bp_statistics: bool,
    pub percent_correct: bool,
    /// Skip likelihood/dependent statistics on retained models.
    pub no_ipf: bool,
}

impl Default for SearchConfigV1 {
    fn default() -> Self {
        Self {
            width: 3,
            levels: 7,
            direction: DirectionSetting::Default,
            filter: StructuralFilter::Loopless,
            variant: SearchVariant::Variable,
            sort_attribute: "ddf".into(),
            sort_direction: SortDirection::Ascending,
            report_sort_attribute: None,
            report_sort_direction: None,
            reference_model: ModelSpec::Default,
            start_model: ModelSpec::Default,
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
            incremental_alpha: false,
            bp_statistics: false,
            percent_correct: false,
            no_ipf: false,
        }
    }
}

impl SearchConfigV1 {
    /// Validate value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if `width` is zero or the
    /// ranking attribute is empty.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.width == 0 {
            return Err(SearchError::InvalidConfig {
                detail: "width must be at least 1".into(),
            });
        }
        if self.sort_attribute.is_empty() {
            return Err(SearchError::InvalidConfig {
                detail: "sort attribute must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Attribute the report is sorted by after the search.
    #[must_use]
    pub fn report_attribute(&self) -> &str {
        self.report_sort_attribute
            .as_deref()
            .unwrap_or(&self.sort_attribute)
    }

    /// Direction the report is sorted in after the search.
    #[must_use]
    pub fn report_direction(&self) -> SortDirection {
        self.report_sort_direction.unwrap_or(self.sort_direction)
    }

    /// Load from a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] on malformed JSON or unknown fields.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Build from engine option strings. Unrecognized keys are ignored;
    /// absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigParseError`] naming the first option that fails to parse.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self, ConfigParseError> {
        let mut config = Self::default();
        for (key, value) in options {
            let v = value.trim();
            match key.as_str() {
                "optimize-search-width" => {
                    let width = parse_rounded(key, v)?;
                    if width <= 0 {
                        return Err(parse_error(key, value, "width must be positive"));
                    }
                    config.width = clamp_u32(width);
                }
                "search-levels" => config.levels = clamp_u32(parse_rounded(key, v)?.max(0)),
                "search-direction" => {
                    config.direction = DirectionSetting::parse(v)
                        .ok_or_else(|| parse_error(key, value, "expected up, down or default"))?;
                }
                "search-filter" => {
                    config.filter = StructuralFilter::parse(v).ok_or_else(|| {
                        parse_error(key, value, "expected all, loopless, disjoint or chain")
                    })?;
                }
                "search-variant" => {
                    config.variant = match v {
                        "variable" | "" => SearchVariant::Variable,
                        "state" => SearchVariant::State,
                        _ => return Err(parse_error(key, value, "expected variable or state")),
                    };
                }
                "search-sort-by" => config.sort_attribute = v.to_string(),
                "search-sort-dir" => config.sort_direction = parse_direction(key, v)?,
                "report-sort-by" => {
                    config.report_sort_attribute = (!v.is_empty()).then(|| v.to_string());
                }
                "report-sort-dir" => {
                    config.report_sort_direction = Some(parse_direction(key, v)?);
                }
                "reference-model" => config.reference_model = ModelSpec::parse(v),
                "short-model" => config.start_model = ModelSpec::parse(v),
                "memory-ceiling" => {
                    config.memory_ceiling_bytes = v
                        .parse()
                        .map_err(|_| parse_error(key, value, "expected a byte count"))?;
                }
                "incremental-alpha" => config.incremental_alpha = parse_flag(key, v)?,
                "bp-statistics" => config.bp_statistics = parse_flag(key, v)?,
                "percent-correct" => config.percent_correct = parse_flag(key, v)?,
                "no-ipf" => config.no_ipf = parse_flag(key, v)?,
                _ => {}
            }
        }
        Ok(config)
    }

    /// Configuration echo for the search log.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "bp_statistics": self.bp_statistics,
            "direction": direction_setting_str(self.direction),
            "filter": self.filter.as_str(),
            "incremental_alpha": self.incremental_alpha,
            "levels": self.levels,
            "memory_ceiling_bytes": self.memory_ceiling_bytes,
            "no_ipf": self.no_ipf,
            "percent_correct": self.percent_correct,
            "reference_model": self.reference_model.as_str(),
            "report_sort_attribute": self.report_attribute(),
            "report_sort_direction": self.report_direction().as_str(),
            "sort_attribute": self.sort_attribute,
            "sort_direction": self.sort_direction.as_str(),
            "start_model": self.start_model.as_str(),
            "variant": variant_str(self.variant),
            "width": self.width,
        })
    }
}

fn direction_setting_str(d: DirectionSetting) -> &'static str {
    match d {
        DirectionSetting::Up => "up",
        DirectionSetting::Down => "down",
        DirectionSetting::Default => "default",
    }
}

fn variant_str(v: SearchVariant) -> &'static str {
    match v {
        SearchVariant::Variable => "variable",
        SearchVariant::State => "state",
    }
}

fn parse_error(key: &str, value: &str, detail: &str) -> ConfigParseError {
    ConfigParseError {
        key: key.into(),
        value: value.into(),
        detail: detail.into(),
    }
}

/// Numeric options accept fractional input and round to the nearest integer.
#[allow(clippy::cast_possible_truncation)]
fn parse_rounded(key: &str, v: &str) -> Result<i64, ConfigParseError> {
    let n: f64 = v
        .parse()
        .map_err(|_| parse_error(key, v, "expected a number"))?;
    if !n.is_finite() {
        return Err(parse_error(key, v, "expected a finite number"));
    }
    Ok(n.round() as i64)
}

fn clamp_u32(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn parse_direction(key: &str, v: &str) -> Result<SortDirection, ConfigParseError> {
    SortDirection::parse(v).ok_or_else(|| parse_error(key, v, "expected ascending or descending"))
}

fn parse_flag(key: &str, v: &str) -> Result<bool, ConfigParseError> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Ok(true),
        "0" | "false" | "n" | "no" | "" => Ok(false),
        _ => Err(parse_error(key, v, "expected a boolean flag")),
    }
}
