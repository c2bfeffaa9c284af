//! Top-K selector: reduce a staged pool to at most `width` models.

use crate::contract::ModelHandle;
use crate::model::CandidateV1;
use crate::pool::CandidatePool;

/// Why a candidate was or was not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictV1 {
    Retained,
    /// Equivalent (engine-defined) to an already retained model.
    EquivalentTo { name: String },
    /// Popped after `width` models were already retained.
    BeyondWidth,
}

/// A popped candidate with its verdict.
#[derive(Debug, Clone)]
pub struct SelectionDecisionV1 {
    pub candidate: CandidateV1,
    pub verdict: VerdictV1,
}

/// Every staged candidate, in ranked pop order, with its verdict.
#[derive(Debug, Default)]
pub struct SelectionV1 {
    pub decisions: Vec<SelectionDecisionV1>,
}

impl SelectionV1 {
    /// Retained candidates in rank order.
    pub fn retained(&self) -> impl Iterator<Item = &CandidateV1> {
        self.decisions
            .iter()
            .filter(|d| d.verdict == VerdictV1::Retained)
            .map(|d| &d.candidate)
    }

    /// Candidates not retained, in rank order.
    pub fn discarded(&self) -> impl Iterator<Item = &CandidateV1> {
        self.decisions
            .iter()
            .filter(|d| d.verdict != VerdictV1::Retained)
            .map(|d| &d.candidate)
    }

    #[must_use]
    pub fn retained_count(&self) -> usize {
        self.retained().count()
    }
}

/// Pop candidates in ranked order (lowest sort key, ties by name) and
/// retain each one not equivalent to a model already retained, until
/// `width` are retained. The rest of the pool is drained as `BeyondWidth`.
///
/// The equivalence scan is linear in the retained count; `width` is small.
pub fn select_top_k(
    mut pool: CandidatePool,
    width: usize,
    is_equivalent: impl Fn(&ModelHandle, &ModelHandle) -> bool,
) -> SelectionV1 {
    let mut decisions = Vec::with_capacity(pool.len());
    let mut retained: Vec<ModelHandle> = Vec::with_capacity(width.min(pool.len()));

    while let Some(candidate) = pool.pop() {
        let verdict = if retained.len() >= width {
            VerdictV1::BeyondWidth
        } else if let Some(existing) = retained
            .iter()
            .find(|kept| is_equivalent(kept, &candidate.handle))
        {
            VerdictV1::EquivalentTo {
                name: existing.name().to_string(),
            }
        } else {
            retained.push(candidate.handle.clone());
            VerdictV1::Retained
        };
        decisions.push(SelectionDecisionV1 { candidate, verdict });
    }

    SelectionV1 { decisions }
}
