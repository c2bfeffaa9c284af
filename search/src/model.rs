//! Driver-side decorations for engine models: ranking key, candidate,
//! retained record, and the per-session processed ledger.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::contract::ModelHandle;
use crate::ranking::SortDirection;

/// Candidate ordering key: `(ranking value under direction, name)`.
///
/// The comparator applies the configured direction explicitly, so "better"
/// always compares as `Less`. Ties on the value are broken by name ascending,
/// which makes selection independent of engine iteration order. Values are
/// compared with `f64::total_cmp`, so NaN sorts after every finite value
/// when ascending.
#[derive(Debug, Clone)]
pub struct RankKey {
    value: f64,
    direction: SortDirection,
    name: String,
}

impl RankKey {
    #[must_use]
    pub fn new(value: f64, direction: SortDirection, name: impl Into<String>) -> Self {
        Self {
            value,
            direction,
            name: name.into(),
        }
    }

    /// Raw attribute value as reported by the engine.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Sign-adjusted value: lower is better regardless of direction.
    #[must_use]
    pub fn sort_key(&self) -> f64 {
        match self.direction {
            SortDirection::Ascending => self.value,
            SortDirection::Descending => -self.value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_value = match self.direction {
            SortDirection::Ascending => self.value.total_cmp(&other.value),
            SortDirection::Descending => other.value.total_cmp(&self.value),
        };
        by_value.then_with(|| self.name.cmp(&other.name))
    }
}

/// A staged neighbor awaiting selection.
#[derive(Debug, Clone)]
pub struct CandidateV1 {
    pub handle: ModelHandle,
    /// `parent.level + 1`.
    pub level: u32,
    /// Name of the frontier model that first generated this candidate.
    pub parent: String,
    pub key: RankKey,
}

/// A retained model with its driver-assigned id.
#[derive(Debug, Clone)]
pub struct ModelRecordV1 {
    pub handle: ModelHandle,
    pub level: u32,
    /// Strictly increasing in retention order; the start model is 1.
    pub id: u64,
    /// Progenitor name at retention time.
    pub progenitor: String,
    /// Sign-adjusted ranking value.
    pub sort_key: f64,
}

impl ModelRecordV1 {
    #[must_use]
    pub fn name(&self) -> &str {
        self.handle.name()
    }
}

/// Per-session record of which model names have been processed, and by
/// which progenitor.
///
/// A name enters the ledger at most once; later sightings only update the
/// progenitor (incremental-alpha bookkeeping). Evicted models stay in the
/// ledger, so a model regenerated after eviction is never staged twice.
#[derive(Debug, Default)]
pub struct ModelLedger {
    progenitors: BTreeMap<String, String>,
}

impl ModelLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` processed with its first progenitor.
    ///
    /// Returns `false` if it was already processed (ledger unchanged).
    pub fn mark_processed(&mut self, name: &str, progenitor: &str) -> bool {
        if self.progenitors.contains_key(name) {
            return false;
        }
        self.progenitors
            .insert(name.to_string(), progenitor.to_string());
        true
    }

    #[must_use]
    pub fn is_processed(&self, name: &str) -> bool {
        self.progenitors.contains_key(name)
    }

    /// Replace the recorded progenitor of an already-processed model.
    pub fn update_progenitor(&mut self, name: &str, progenitor: &str) {
        if let Some(p) = self.progenitors.get_mut(name) {
            progenitor.clone_into(p);
        }
    }

    #[must_use]
    pub fn progenitor_of(&self, name: &str) -> Option<&str> {
        self.progenitors.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.progenitors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.progenitors.is_empty()
    }
}
