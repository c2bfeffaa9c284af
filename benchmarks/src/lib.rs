//! Shared helpers for recon benchmark suites.

use recon_harness::worlds::partition_lattice::{PartitionLatticeConfig, PartitionLatticeEngine};
use recon_search::contract::ModelHandle;
use recon_search::model::{CandidateV1, RankKey};
use recon_search::pool::CandidatePool;
use recon_search::search_type::{DirectionSetting, StructuralFilter};
use recon_search::{SearchConfigV1, SearchOutcomeV1, SearchSession, SortDirection};

/// Variables for the benchmark lattices. Six variables give 203 partitions.
pub const VARIABLES: &[&str] = &["A", "B", "C", "D", "E", "F"];

/// A named search configuration over the partition lattice.
pub struct Regime {
    pub name: &'static str,
    pub config: SearchConfigV1,
}

impl Regime {
    /// A fresh engine; each run must start with an empty model cache.
    #[must_use]
    pub fn engine(&self) -> PartitionLatticeEngine {
        PartitionLatticeEngine::new(PartitionLatticeConfig::neutral(VARIABLES))
    }
}

fn disjoint(width: u32, direction: DirectionSetting, attribute: &str) -> SearchConfigV1 {
    SearchConfigV1 {
        width,
        levels: 7,
        direction,
        filter: StructuralFilter::Disjoint,
        sort_attribute: attribute.into(),
        sort_direction: SortDirection::Descending,
        ..SearchConfigV1::default()
    }
}

/// Narrow upward beam ranked by a cheap statistic.
#[must_use]
pub fn regime_narrow_up() -> Regime {
    Regime {
        name: "narrow_up",
        config: disjoint(2, DirectionSetting::Up, "information"),
    }
}

/// Wide upward beam; selection and eviction dominate.
#[must_use]
pub fn regime_wide_up() -> Regime {
    Regime {
        name: "wide_up",
        config: disjoint(12, DirectionSetting::Up, "information"),
    }
}

/// Downward beam ranked by a likelihood statistic, so every candidate is fitted.
#[must_use]
pub fn regime_fitted_down() -> Regime {
    Regime {
        name: "fitted_down",
        config: disjoint(6, DirectionSetting::Down, "bic"),
    }
}

#[must_use]
pub fn all_regimes() -> Vec<Regime> {
    vec![regime_narrow_up(), regime_wide_up(), regime_fitted_down()]
}

/// Run a session only (no report sort, no bundling).
///
/// # Panics
///
/// Panics if the search fails. Benchmark runs are expected to succeed.
#[must_use]
pub fn run_session_only(regime: &Regime) -> SearchOutcomeV1 {
    let mut engine = regime.engine();
    let mut sink = NullSink;
    SearchSession::new(regime.config.clone())
        .and_then(|session| session.run(&mut engine, &mut sink))
        .expect("search should succeed in benchmarks")
}

/// A pool of `n` candidates with many tied keys, so name tie-breaks are exercised.
#[must_use]
pub fn tied_pool(n: u64) -> CandidatePool {
    let mut pool = CandidatePool::new();
    for i in 0..n {
        let name = format!("M{i:05}");
        #[allow(clippy::cast_precision_loss)]
        let value = (i % 7) as f64;
        pool.push(CandidateV1 {
            handle: ModelHandle::new(i, name.clone()),
            level: 1,
            parent: "P".into(),
            key: RankKey::new(value, SortDirection::Ascending, name),
        });
    }
    pool
}

/// Report sink that drops everything.
struct NullSink;

impl recon_search::ReportSinkV1 for NullSink {
    fn add_model(&mut self, _entry: recon_search::ReportEntryV1) {}

    fn sort(&mut self, _attribute: &str, _direction: SortDirection) {}

    fn emit(&self, _out: &mut dyn std::io::Write) -> std::io::Result<()> {
        Ok(())
    }
}
