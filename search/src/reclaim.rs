//! Cache reclaimer: evict candidates that will never be expanded.

use tracing::debug;

use crate::contract::ModelingEngineV1;
use crate::select::SelectionV1;

/// Evict every candidate the selector did not retain.
///
/// Nothing is evicted on the final level, since the report may still need
/// those models. A discarded handle that shares its engine key with a
/// retained one is never evicted. Returns the names asked to be evicted,
/// in rank order.
pub fn reclaim(
    engine: &mut dyn ModelingEngineV1,
    selection: &SelectionV1,
    final_level: bool,
) -> Vec<String> {
    if final_level {
        return Vec::new();
    }

    let retained_keys: Vec<u64> = selection.retained().map(|c| c.handle.key()).collect();
    let mut evicted = Vec::new();
    for candidate in selection.discarded() {
        if retained_keys.contains(&candidate.handle.key()) {
            continue;
        }
        let was_cached = engine.delete_from_cache(&candidate.handle);
        debug!(model = candidate.handle.name(), was_cached, "evicted");
        evicted.push(candidate.handle.name().to_string());
    }
    evicted
}
