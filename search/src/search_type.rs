//! Search-type resolution: direction × structural filter × variant.
//!
//! Resolution happens once, during session setup. Unsupported combinations
//! are a configuration error; whether the engine actually implements the
//! resolved name is checked separately by `ModelingEngineV1::set_search_type`.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Configured search direction, before defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionSetting {
    Up,
    Down,
    #[default]
    Default,
}

impl DirectionSetting {
    /// `default` searches upward.
    #[must_use]
    pub fn resolve(self) -> SearchDirection {
        match self {
            Self::Down => SearchDirection::Down,
            Self::Up | Self::Default => SearchDirection::Up,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "default" | "" => Some(Self::Default),
            _ => None,
        }
    }
}

/// Resolved search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// From the independence model toward the saturated model.
    Up,
    /// From the saturated model toward the independence model.
    Down,
}

impl SearchDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Constraint on which lattice neighbors are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralFilter {
    All,
    #[default]
    Loopless,
    Disjoint,
    /// Degenerate one-step search.
    Chain,
}

impl StructuralFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Loopless => "loopless",
            Self::Disjoint => "disjoint",
            Self::Chain => "chain",
        }
    }

    /// Prefix used in engine search-type names (`all` is spelled `full`).
    fn type_stem(self) -> &'static str {
        match self {
            Self::All => "full",
            other => other.as_str(),
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" | "full" => Some(Self::All),
            "loopless" => Some(Self::Loopless),
            "disjoint" => Some(Self::Disjoint),
            "chain" => Some(Self::Chain),
            _ => None,
        }
    }
}

/// Variable-based or state-based lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchVariant {
    #[default]
    Variable,
    State,
}

/// A supported, fully resolved search type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTypeV1 {
    pub variant: SearchVariant,
    pub direction: SearchDirection,
    pub filter: StructuralFilter,
}

impl SearchTypeV1 {
    /// Engine-facing name, e.g. `loopless-up` or `sb-full-down`.
    #[must_use]
    pub fn name(&self) -> String {
        let prefix = match self.variant {
            SearchVariant::Variable => "",
            SearchVariant::State => "sb-",
        };
        format!(
            "{prefix}{}-{}",
            self.filter.type_stem(),
            self.direction.as_str()
        )
    }
}

/// Resolve direction × filter against the supported combination table.
///
/// Downward chain search is not defined for either directed or neutral
/// systems; every other combination resolves. `default` resolves to up
/// before the table is consulted, so `default` + `chain` is an upward chain.
///
/// # Errors
///
/// Returns [`SearchError::UnsupportedCombination`] for `down` + `chain`.
pub fn resolve_search_type(
    direction: DirectionSetting,
    filter: StructuralFilter,
    variant: SearchVariant,
    directed: bool,
) -> Result<SearchTypeV1, SearchError> {
    let direction = direction.resolve();
    if direction == SearchDirection::Down && filter == StructuralFilter::Chain {
        return Err(SearchError::UnsupportedCombination {
            direction,
            filter,
            directed,
        });
    }
    Ok(SearchTypeV1 {
        variant,
        direction,
        filter,
    })
}
