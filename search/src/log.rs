//! `SearchLogV1`: per-level audit trail of a search session.
//!
//! The normative decision surface is the ordered list of `LevelEventV1`
//! entries: for each level, every staged candidate in selection order with
//! its outcome. Metadata binds the log to the configuration, the engine and
//! the resolved search type.

use crate::config::SearchConfigV1;

/// Domain prefix for search log content hashing.
pub const DOMAIN_SEARCH_LOG: &[u8] = b"RECON::SEARCH_LOG::V1\0";

/// The complete search audit trail.
#[derive(Debug, Clone)]
pub struct SearchLogV1 {
    /// One event per completed level, in level order.
    pub levels: Vec<LevelEventV1>,
    pub metadata: SearchLogMetadata,
}

/// One completed level: expand, select, reclaim.
#[derive(Debug, Clone)]
pub struct LevelEventV1 {
    pub level: u32,
    /// Names of the frontier models expanded at this level.
    pub frontier: Vec<String>,
    /// Engine memory sample taken before expansion.
    pub mem_used_bytes: u64,
    /// Staged candidates in selection (rank) order.
    pub candidates: Vec<CandidateRecordV1>,
    pub generated: u64,
    pub retained: u64,
    /// Already-processed neighbors reached again through another parent.
    pub progenitor_revisits: u64,
    /// Names passed to `delete_from_cache` after selection.
    pub evicted: Vec<String>,
}

/// A staged candidate with its selection outcome.
#[derive(Debug, Clone)]
pub struct CandidateRecordV1 {
    /// Position in selection order.
    pub index: u64,
    pub name: String,
    /// Frontier model that first generated this candidate.
    pub parent: String,
    /// Sign-adjusted ranking value.
    pub sort_key: f64,
    pub outcome: CandidateOutcomeV1,
}

/// What the Top-K selector decided for a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcomeV1 {
    /// Retained and assigned an id.
    Retained { id: u64 },
    /// Equivalent to an already retained model.
    EquivalentTo { name: String },
    /// Width already reached.
    BeyondWidth,
}

/// Aggregate metadata with configuration bindings.
#[derive(Debug, Clone)]
pub struct SearchLogMetadata {
    // Bindings
    pub engine_id: String,
    pub search_type: String,
    pub start_model: String,
    pub reference_model: String,
    pub config: SearchConfigV1,

    // Counters
    pub levels_completed: u32,
    pub total_generated: u64,
    pub total_retained: u64,
    pub termination_reason: TerminationReasonV1,
}

/// Why the level loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReasonV1 {
    /// Every configured level ran.
    LevelBudgetExhausted,
    /// A level retained no models.
    FrontierExhausted { level: u32 },
    /// Chain search runs exactly one level.
    ChainSingleLevel,
    /// Engine memory exceeded the ceiling at the start of `level`.
    MemoryCeilingExceeded {
        level: u32,
        used_bytes: u64,
        ceiling_bytes: u64,
    },
}

impl TerminationReasonV1 {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelBudgetExhausted => "level_budget_exhausted",
            Self::FrontierExhausted { .. } => "frontier_exhausted",
            Self::ChainSingleLevel => "chain_single_level",
            Self::MemoryCeilingExceeded { .. } => "memory_ceiling_exceeded",
        }
    }
}

// ---------------------------------------------------------------------------
// JSON serialization
// ---------------------------------------------------------------------------

impl SearchLogV1 {
    /// Serialize to compact JSON bytes with sorted object keys.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_json_value())
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "levels": self.levels.iter().map(level_event_to_json).collect::<Vec<_>>(),
            "metadata": metadata_to_json(&self.metadata),
        })
    }

    /// Names retained across all levels, in id order (start model excluded).
    #[must_use]
    pub fn retained_names(&self) -> Vec<&str> {
        self.levels
            .iter()
            .flat_map(|l| l.candidates.iter())
            .filter(|c| matches!(c.outcome, CandidateOutcomeV1::Retained { .. }))
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn level_event_to_json(e: &LevelEventV1) -> serde_json::Value {
    serde_json::json!({
        "candidates": e.candidates.iter().map(candidate_record_to_json).collect::<Vec<_>>(),
        "evicted": e.evicted,
        "frontier": e.frontier,
        "generated": e.generated,
        "level": e.level,
        "mem_used_bytes": e.mem_used_bytes,
        "progenitor_revisits": e.progenitor_revisits,
        "retained": e.retained,
    })
}

fn candidate_record_to_json(r: &CandidateRecordV1) -> serde_json::Value {
    serde_json::json!({
        "index": r.index,
        "name": r.name,
        "outcome": outcome_to_json(&r.outcome),
        "parent": r.parent,
        "sort_key": r.sort_key,
    })
}

fn outcome_to_json(o: &CandidateOutcomeV1) -> serde_json::Value {
    match o {
        CandidateOutcomeV1::Retained { id } => {
            serde_json::json!({"id": id, "type": "retained"})
        }
        CandidateOutcomeV1::EquivalentTo { name } => {
            serde_json::json!({"name": name, "type": "equivalent_to"})
        }
        CandidateOutcomeV1::BeyondWidth => serde_json::json!({"type": "beyond_width"}),
    }
}

fn metadata_to_json(m: &SearchLogMetadata) -> serde_json::Value {
    serde_json::json!({
        "config": m.config.to_json_value(),
        "engine_id": m.engine_id,
        "levels_completed": m.levels_completed,
        "reference_model": m.reference_model,
        "search_type": m.search_type,
        "start_model": m.start_model,
        "termination_reason": termination_reason_to_json(&m.termination_reason),
        "total_generated": m.total_generated,
        "total_retained": m.total_retained,
    })
}

fn termination_reason_to_json(r: &TerminationReasonV1) -> serde_json::Value {
    match r {
        TerminationReasonV1::LevelBudgetExhausted | TerminationReasonV1::ChainSingleLevel => {
            serde_json::json!({"type": r.as_str()})
        }
        TerminationReasonV1::FrontierExhausted { level } => {
            serde_json::json!({"level": level, "type": r.as_str()})
        }
        TerminationReasonV1::MemoryCeilingExceeded {
            level,
            used_bytes,
            ceiling_bytes,
        } => serde_json::json!({
            "ceiling_bytes": ceiling_bytes,
            "level": level,
            "type": r.as_str(),
            "used_bytes": used_bytes,
        }),
    }
}
