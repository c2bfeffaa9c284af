//! Harness runner: executes one search and packages an artifact bundle.
//!
//! The runner owns orchestration only. Search semantics live in
//! `recon_search`; statistics and lattice neighbors live in the engine.
//!
//! # Pipeline
//!
//! ```text
//! SearchSession::new(config) → run(engine, report)
//!   → report.sort(report attribute, report direction)
//!   → search_config.json + search_log.json
//!   → search_report.json (binds the log digest)
//!   → build_bundle()
//! ```

use recon_search::contract::{ModelingEngineV1, ReportEntryV1, ReportSinkV1};
use recon_search::error::SearchError;
use recon_search::{SearchConfigV1, SearchOutcomeV1, SearchSession};
use tracing::info;

use crate::bundle::{
    build_bundle, BundleBuildError, SearchBundleV1, CONFIG_ARTIFACT, LOG_ARTIFACT, REPORT_ARTIFACT,
};
use crate::digest::{canonical_hash, canonical_json_bytes, HashDomain};
use crate::report::ModelReport;

/// Error during a harness search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRunError {
    /// Configuration, resolution, or engine failure from the search.
    SearchFailed(SearchError),
    /// JSON serialization failed.
    CanonFailed { detail: String },
    /// Bundle assembly failed.
    BundleFailed(BundleBuildError),
}

impl std::fmt::Display for SearchRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SearchFailed(e) => write!(f, "search failed: {e}"),
            Self::CanonFailed { detail } => write!(f, "canonical JSON error: {detail}"),
            Self::BundleFailed(e) => write!(f, "bundle assembly failed: {e}"),
        }
    }
}

impl std::error::Error for SearchRunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SearchFailed(e) => Some(e),
            Self::BundleFailed(e) => Some(e),
            Self::CanonFailed { .. } => None,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct SearchRunV1 {
    pub outcome: SearchOutcomeV1,
    /// Sorted by the report attribute and direction.
    pub report: ModelReport,
    pub bundle: SearchBundleV1,
}

/// Run the search, sort the report, and package the bundle.
///
/// Produces a [`SearchBundleV1`] containing (all normative):
/// - `search_config.json`: the configuration echo
/// - `search_log.json`: the per-level audit trail
/// - `search_report.json`: sorted report rows plus `search_log_digest`
///
/// # Errors
///
/// Returns [`SearchRunError::SearchFailed`] for setup or engine failures;
/// nothing is packaged in that case.
pub fn run_search(
    engine: &mut dyn ModelingEngineV1,
    config: SearchConfigV1,
) -> Result<SearchRunV1, SearchRunError> {
    let (outcome, report) = search_and_sort(engine, config)?;

    let config_json = serde_json::json!({
        "config": outcome.log.metadata.config.to_json_value(),
        "engine_id": outcome.log.metadata.engine_id,
        "schema_version": "search_config.v1",
    });
    let config_bytes = canon(&config_json, CONFIG_ARTIFACT)?;

    let log_bytes = outcome
        .log
        .to_json_bytes()
        .map_err(|e| SearchRunError::CanonFailed {
            detail: format!("{LOG_ARTIFACT}: {e}"),
        })?;
    let log_digest = canonical_hash(HashDomain::SearchLog, &log_bytes);

    let mut report_json = report.to_json_value();
    report_json["best_model"] = serde_json::json!(report.best_model().map(|e| e.name.as_str()));
    report_json["schema_version"] = serde_json::json!("search_report.v1");
    report_json["search_log_digest"] = serde_json::json!(log_digest.as_str());
    report_json["termination_reason"] =
        serde_json::json!(outcome.termination_reason().as_str());
    let report_bytes = canon(&report_json, REPORT_ARTIFACT)?;

    let bundle = build_bundle(vec![
        (CONFIG_ARTIFACT.into(), config_bytes, true),
        (LOG_ARTIFACT.into(), log_bytes, true),
        (REPORT_ARTIFACT.into(), report_bytes, true),
    ])
    .map_err(SearchRunError::BundleFailed)?;

    info!(
        digest = bundle.digest.as_str(),
        models = report.rows().len(),
        "search bundle built"
    );

    Ok(SearchRunV1 {
        outcome,
        report,
        bundle,
    })
}

/// Run a search without packaging and return the best report row.
///
/// "Best" is the first row after sorting by the report attribute in the
/// report direction. `None` only if the report is empty, which a
/// successful search never produces.
///
/// # Errors
///
/// Returns [`SearchRunError::SearchFailed`] for setup or engine failures.
pub fn find_best_model(
    engine: &mut dyn ModelingEngineV1,
    config: SearchConfigV1,
) -> Result<Option<ReportEntryV1>, SearchRunError> {
    let (_, report) = search_and_sort(engine, config)?;
    Ok(report.best_model().cloned())
}

fn search_and_sort(
    engine: &mut dyn ModelingEngineV1,
    config: SearchConfigV1,
) -> Result<(SearchOutcomeV1, ModelReport), SearchRunError> {
    let report_attribute = config.report_attribute().to_string();
    let report_direction = config.report_direction();

    let mut report = ModelReport::new();
    let outcome = SearchSession::new(config)
        .and_then(|session| session.run(engine, &mut report))
        .map_err(SearchRunError::SearchFailed)?;
    report.sort(&report_attribute, report_direction);
    Ok((outcome, report))
}

fn canon(value: &serde_json::Value, artifact: &str) -> Result<Vec<u8>, SearchRunError> {
    canonical_json_bytes(value).map_err(|e| SearchRunError::CanonFailed {
        detail: format!("{artifact}: {e}"),
    })
}
