//! Level expander: turn a frontier into a staged candidate pool.

use tracing::debug;

use crate::contract::ModelingEngineV1;
use crate::error::SearchError;
use crate::model::{CandidateV1, ModelLedger, ModelRecordV1};
use crate::pool::CandidatePool;
use crate::ranking::RankingV1;

/// Result of expanding one level.
#[derive(Debug)]
pub struct LevelExpansionV1 {
    /// Newly staged candidates.
    pub pool: CandidatePool,
    /// Number of neighbors staged for the first time.
    pub generated: u64,
    /// Number of already-processed neighbors reached again via another parent.
    pub revisits: u64,
}

/// Expand every frontier model by one lattice step.
///
/// A neighbor seen for the first time in this session is marked processed,
/// gets `level` and its progenitor, has only its ranking statistics computed,
/// and is staged. A neighbor already processed is not staged again; with
/// `incremental_alpha` the engine is asked whether the new parent is a
/// better progenitor.
///
/// # Errors
///
/// Propagates any engine failure.
pub fn expand_level(
    engine: &mut dyn ModelingEngineV1,
    frontier: &[ModelRecordV1],
    level: u32,
    ledger: &mut ModelLedger,
    ranking: &RankingV1,
    incremental_alpha: bool,
) -> Result<LevelExpansionV1, SearchError> {
    let mut pool = CandidatePool::new();
    let mut generated = 0u64;
    let mut revisits = 0u64;

    for parent in frontier {
        let neighbors = engine.search_one_level(&parent.handle)?;
        for neighbor in neighbors {
            if ledger.mark_processed(neighbor.name(), parent.name()) {
                engine.set_progenitor(&neighbor, &parent.handle);
                let key = ranking.stage_key(engine, &neighbor)?;
                pool.push(CandidateV1 {
                    handle: neighbor,
                    level,
                    parent: parent.name().to_string(),
                    key,
                });
                generated += 1;
            } else {
                revisits += 1;
                if incremental_alpha {
                    let best = engine.compare_progenitors(&neighbor, &parent.handle);
                    debug!(
                        model = neighbor.name(),
                        candidate = parent.name(),
                        kept = best.name(),
                        "compared progenitors"
                    );
                    ledger.update_progenitor(neighbor.name(), best.name());
                }
            }
        }
    }

    Ok(LevelExpansionV1 {
        pool,
        generated,
        revisits,
    })
}
