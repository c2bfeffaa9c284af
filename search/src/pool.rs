//! Staged candidate pool: a min-heap over [`RankKey`].

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::model::{CandidateV1, RankKey};

/// A pool entry wrapping a candidate with its ordering key.
///
/// `BinaryHeap` is a max-heap, so we use `Reverse<RankKey>` to pop the
/// best-ranked candidate first.
#[derive(Debug)]
struct PoolEntry {
    key: Reverse<RankKey>,
    candidate: CandidateV1,
}

impl PartialEq for PoolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PoolEntry {}

impl PartialOrd for PoolEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Candidates staged by the level expander for one level.
#[derive(Debug, Default)]
pub struct CandidatePool {
    heap: BinaryHeap<PoolEntry>,
}

impl CandidatePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a candidate.
    pub fn push(&mut self, candidate: CandidateV1) {
        self.heap.push(PoolEntry {
            key: Reverse(candidate.key.clone()),
            candidate,
        });
    }

    /// Pop the best-ranked candidate (lowest sort key, then lowest name).
    #[must_use]
    pub fn pop(&mut self) -> Option<CandidateV1> {
        self.heap.pop().map(|e| e.candidate)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
