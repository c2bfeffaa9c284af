//! Modeling engine and report accumulator contracts.
//!
//! The search driver never computes statistics or lattice neighbors itself.
//! Everything numeric happens behind [`ModelingEngineV1`]; retained models are
//! handed to a [`ReportSinkV1`] for later sorting and output.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::ranking::SortDirection;

/// Opaque handle to a model owned by the engine.
///
/// `key` identifies the engine-side object; `name` encodes the model's
/// lattice position (components joined by `:`). Two handles with different
/// keys may still be equivalent under [`ModelingEngineV1::is_equivalent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelHandle {
    key: u64,
    name: String,
}

impl ModelHandle {
    #[must_use]
    pub fn new(key: u64, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }

    /// Engine-side identity of the model object.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A group of statistics the engine computes in one call.
///
/// Ranking requests only the group that produces the ranking attribute;
/// retained models later receive the full pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatisticGroup {
    /// Information, transmission, unexplained information.
    Information,
    /// Degrees of freedom and delta-DF.
    DegreesOfFreedom,
    /// Likelihood-ratio statistics (requires fitting).
    Likelihood,
    /// Dependent-variable statistics (dH, %dH, ...).
    Dependent,
    /// Backward-propagation statistics.
    BackPropagation,
    /// Percent correct on the data (directed systems).
    PercentCorrect,
    /// Incremental alpha relative to the best progenitor.
    IncrementalAlpha,
}

impl StatisticGroup {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::DegreesOfFreedom => "dfs",
            Self::Likelihood => "l2",
            Self::Dependent => "dependent",
            Self::BackPropagation => "bp",
            Self::PercentCorrect => "percent_correct",
            Self::IncrementalAlpha => "incremental_alpha",
        }
    }
}

/// The declared variables of the system, as seen by model-name checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableListV1 {
    /// Variable abbreviations (each starts with an uppercase letter).
    pub abbrevs: Vec<String>,
    /// Dependent variable abbreviation, present for directed systems.
    pub dependent: Option<String>,
}

/// Capability interface of the external modeling engine.
///
/// # Contract
///
/// - All calls are synchronous; the driver never calls the engine concurrently.
/// - `search_one_level` must be deterministic for a fixed search type and
///   cache state: same model → same neighbors in the same order.
/// - `attribute` returns [`EngineError::AttributeUnavailable`] if the
///   statistic group producing it has not been computed for the model.
/// - `delete_from_cache` is only called for models excluded from the current
///   and all future frontiers.
pub trait ModelingEngineV1 {
    /// Identifier recorded in the search log metadata.
    fn engine_id(&self) -> &str;

    /// Whether the variable system has a dependent variable.
    fn is_directed(&self) -> bool;

    /// The declared variable list.
    fn variable_list(&self) -> VariableListV1;

    /// Select the neighbor generator by search-type name (e.g. `loopless-up`).
    fn set_search_type(&mut self, name: &str) -> Result<(), EngineError>;

    /// Set the reference model used by relative statistics.
    fn set_reference_model(&mut self, model: &ModelHandle) -> Result<(), EngineError>;

    /// Build (or fetch from cache) the model with the given name.
    fn make_model(&mut self, name: &str) -> Result<ModelHandle, EngineError>;

    /// The saturated model.
    fn top_ref_model(&mut self) -> ModelHandle;

    /// The independence model.
    fn bottom_ref_model(&mut self) -> ModelHandle;

    /// One-step lattice neighbors of `model` under the current search type.
    fn search_one_level(&mut self, model: &ModelHandle) -> Result<Vec<ModelHandle>, EngineError>;

    /// Compute one statistic group for `model`. Idempotent.
    fn compute_statistics(
        &mut self,
        model: &ModelHandle,
        group: StatisticGroup,
    ) -> Result<(), EngineError>;

    /// Read a computed attribute.
    fn attribute(&self, model: &ModelHandle, name: &str) -> Result<f64, EngineError>;

    /// Snapshot of every attribute computed so far for `model`.
    fn attributes(&self, model: &ModelHandle) -> BTreeMap<String, f64>;

    /// Record the model that first generated `model`.
    fn set_progenitor(&mut self, model: &ModelHandle, progenitor: &ModelHandle);

    /// Compare `model`'s recorded progenitor against `candidate`, keep the
    /// better one by the engine's own criterion, and return it.
    fn compare_progenitors(&mut self, model: &ModelHandle, candidate: &ModelHandle) -> ModelHandle;

    /// Engine-defined structural equivalence.
    fn is_equivalent(&self, a: &ModelHandle, b: &ModelHandle) -> bool;

    /// Current memory usage in bytes.
    fn mem_usage(&self) -> u64;

    /// Evict a model from the engine's cache. Returns `false` if it was not cached.
    fn delete_from_cache(&mut self, model: &ModelHandle) -> bool;
}

/// A retained model as handed to the report accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntryV1 {
    pub name: String,
    pub id: u64,
    pub level: u32,
    /// Name of the progenitor (the start model is its own progenitor).
    pub progenitor: String,
    /// Id of the progenitor, if it was retained.
    pub progenitor_id: Option<u64>,
    /// Attribute snapshot taken after the full statistics pass.
    pub attributes: BTreeMap<String, f64>,
}

/// Report accumulator contract: add, sort, emit.
pub trait ReportSinkV1 {
    /// Add a retained model. Called in strictly increasing `id` order.
    fn add_model(&mut self, entry: ReportEntryV1);

    /// Sort the accumulated entries by an attribute.
    fn sort(&mut self, attribute: &str, direction: SortDirection);

    /// Write the report to a destination.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by `out`.
    fn emit(&self, out: &mut dyn std::io::Write) -> std::io::Result<()>;
}
