//! Ranking: which statistic to compute for a candidate, and how to order it.

use serde::{Deserialize, Serialize};

use crate::contract::{ModelHandle, ModelingEngineV1, StatisticGroup};
use crate::error::SearchError;
use crate::model::RankKey;

/// Preferred direction of the ranking attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Lower values rank first.
    #[default]
    Ascending,
    /// Higher values rank first.
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }

    /// Empty input means descending, matching the option-string surface.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ascending" => Some(Self::Ascending),
            "descending" | "" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Ranking attribute → minimal statistic groups needed to produce it.
///
/// Attributes not listed fall back to [`FALLBACK_STATISTICS`].
const SORT_STATISTICS: &[(&[&str], &[StatisticGroup])] = &[
    (
        &["h", "information", "unexplained", "alg_t"],
        &[StatisticGroup::Information],
    ),
    (&["df", "ddf"], &[StatisticGroup::DegreesOfFreedom]),
    (
        &["bp_t", "bp_information", "bp_alpha"],
        &[StatisticGroup::BackPropagation],
    ),
    (&["pct_correct_data"], &[StatisticGroup::PercentCorrect]),
];

/// Everything we might need when the attribute is not in the table.
const FALLBACK_STATISTICS: &[StatisticGroup] =
    &[StatisticGroup::Likelihood, StatisticGroup::Dependent];

/// Statistic groups the engine must compute before `attribute` can be read.
#[must_use]
pub fn statistics_for(attribute: &str) -> &'static [StatisticGroup] {
    SORT_STATISTICS
        .iter()
        .find(|(names, _)| names.contains(&attribute))
        .map_or(FALLBACK_STATISTICS, |(_, groups)| groups)
}

/// The configured ranking attribute and its preferred direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingV1 {
    pub attribute: String,
    pub direction: SortDirection,
}

impl RankingV1 {
    #[must_use]
    pub fn new(attribute: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            attribute: attribute.into(),
            direction,
        }
    }

    /// Compute only the statistics the ranking attribute needs, then build
    /// the candidate's ordering key.
    ///
    /// # Errors
    ///
    /// Propagates engine failures; a missing ranking value would corrupt the order.
    pub fn stage_key(
        &self,
        engine: &mut dyn ModelingEngineV1,
        model: &ModelHandle,
    ) -> Result<RankKey, SearchError> {
        for &group in statistics_for(&self.attribute) {
            engine.compute_statistics(model, group)?;
        }
        let value = engine.attribute(model, &self.attribute)?;
        Ok(RankKey::new(value, self.direction, model.name()))
    }
}
