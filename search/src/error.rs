//! Typed search errors.
//!
//! `SearchError` represents pre-flight failures (configuration and search-type
//! resolution) plus engine failures that would corrupt ranking. Runtime
//! terminations (level budget, empty frontier, chain single level, memory
//! ceiling) are not errors: they are expressed via
//! [`crate::log::TerminationReasonV1`] and always produce a
//! [`crate::log::SearchLogV1`] audit trail.

use crate::model_name::ModelNameError;
use crate::search_type::{SearchDirection, StructuralFilter};

/// Typed failure reported by a modeling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine has no model under this name.
    UnknownModel { name: String },
    /// The engine does not implement the requested search type.
    UnrecognizedSearchType { name: String },
    /// An attribute was read before the statistics producing it were computed.
    AttributeUnavailable { model: String, attribute: String },
    /// A statistic computation failed for a model.
    StatisticFailed { model: String, detail: String },
    /// The engine could not parse a model name.
    MalformedModelName { name: String, detail: String },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownModel { name } => write!(f, "unknown model: {name}"),
            Self::UnrecognizedSearchType { name } => {
                write!(f, "unrecognized search type: {name}")
            }
            Self::AttributeUnavailable { model, attribute } => {
                write!(f, "attribute {attribute} not computed for model {model}")
            }
            Self::StatisticFailed { model, detail } => {
                write!(f, "statistic computation failed for {model}: {detail}")
            }
            Self::MalformedModelName { name, detail } => {
                write!(f, "malformed model name {name}: {detail}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Typed failure for search setup and execution.
///
/// Configuration and resolution errors are returned before any
/// `search_one_level` call is made, so no partial report exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// A configuration value is out of range (e.g. `width == 0`).
    InvalidConfig { detail: String },
    /// The direction × filter combination is not supported.
    UnsupportedCombination {
        direction: SearchDirection,
        filter: StructuralFilter,
        directed: bool,
    },
    /// A named start or reference model does not fit the declared variables.
    InvalidModelName { name: String, error: ModelNameError },
    /// The engine rejected the resolved search-type name.
    UnrecognizedSearchType { name: String },
    /// The engine failed while the search was running.
    Engine(EngineError),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig { detail } => write!(f, "invalid search configuration: {detail}"),
            Self::UnsupportedCombination {
                direction,
                filter,
                directed,
            } => {
                let system = if *directed { "directed" } else { "neutral" };
                write!(
                    f,
                    "{system} {} {} search is not implemented",
                    direction.as_str(),
                    filter.as_str()
                )
            }
            Self::InvalidModelName { name, error } => {
                write!(f, "invalid model name '{name}': {error}")
            }
            Self::UnrecognizedSearchType { name } => write!(f, "undefined search type {name}"),
            Self::Engine(e) => write!(f, "engine error: {e}"),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) => Some(e),
            Self::InvalidModelName { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<EngineError> for SearchError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

/// A configuration option string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParseError {
    pub key: String,
    pub value: String,
    pub detail: String,
}

impl std::fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid value '{}' for option {}: {}",
            self.value, self.key, self.detail
        )
    }
}

impl std::error::Error for ConfigParseError {}
