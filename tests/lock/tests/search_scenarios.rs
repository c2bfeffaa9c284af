//! Scripted search scenarios: tie-break, chain termination, memory cutoff,
//! eviction, and ranking-statistic dispatch.
//!
//! Every scenario runs a real `SearchSession` against `ScriptedEngine`, so
//! the engine journal records exactly what the driver asked for.

use recon_harness::report::ModelReport;
use recon_harness::worlds::scripted::ScriptedEngine;
use recon_search::contract::{ReportSinkV1, StatisticGroup};
use recon_search::log::CandidateOutcomeV1;
use recon_search::search_type::StructuralFilter;
use recon_search::{ModelSpec, SearchConfigV1, SearchOutcomeV1, SearchSession, TerminationReasonV1};
use tracing_test::traced_test;

fn run(engine: &mut ScriptedEngine, config: SearchConfigV1) -> (SearchOutcomeV1, ModelReport) {
    let mut report = ModelReport::new();
    let outcome = SearchSession::new(config)
        .unwrap()
        .run(engine, &mut report)
        .unwrap();
    (outcome, report)
}

fn row_names(report: &ModelReport) -> Vec<&str> {
    report.rows().iter().map(|e| e.name.as_str()).collect()
}

/// Bottom `A:B:C:D:E` with five level-1 candidates keyed E=5 C=3 B=3 D=1 A=0.
fn five_candidate_engine() -> ScriptedEngine {
    ScriptedEngine::new(&["A", "B", "C", "D", "E"])
        .with_model("A:B:C:D:E", &[("ddf", 9.0)])
        .with_model("E", &[("ddf", 5.0)])
        .with_model("C", &[("ddf", 3.0)])
        .with_model("B", &[("ddf", 3.0)])
        .with_model("D", &[("ddf", 1.0)])
        .with_model("A", &[("ddf", 0.0)])
        .with_neighbors("A:B:C:D:E", &["E", "C", "B", "D", "A"])
}

/// Bottom `A:B:C` → {`AB:C`, `A:BC`, `AC:B`} → `ABC`.
fn three_level_engine() -> ScriptedEngine {
    ScriptedEngine::new(&["A", "B", "C"])
        .with_model("A:B:C", &[("ddf", 0.0), ("bic", 0.0)])
        .with_model("AB:C", &[("ddf", 1.0), ("bic", 3.0)])
        .with_model("A:BC", &[("ddf", 2.0), ("bic", 1.0)])
        .with_model("AC:B", &[("ddf", 3.0), ("bic", 2.0)])
        .with_model("ABC", &[("ddf", 4.0), ("bic", 5.0)])
        .with_neighbors("A:B:C", &["AB:C", "A:BC", "AC:B"])
        .with_neighbors("AB:C", &["ABC"])
        .with_neighbors("A:BC", &["ABC"])
        .with_neighbors("AC:B", &["ABC"])
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: tie-break: keys [5,3,3,1,0], width 3, ascending → A, D, B
// ---------------------------------------------------------------------------

#[test]
fn tie_break_scenario_retains_lowest_keys_with_name_order() {
    let mut engine = five_candidate_engine();
    let config = SearchConfigV1 {
        width: 3,
        levels: 1,
        ..SearchConfigV1::default()
    };
    let (outcome, report) = run(&mut engine, config);

    assert_eq!(row_names(&report), vec!["A:B:C:D:E", "A", "D", "B"]);
    let ids: Vec<u64> = report.rows().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let level = &outcome.log.levels[0];
    let order: Vec<&str> = level.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(order, vec!["A", "D", "B", "C", "E"]);
    assert_eq!(level.candidates[3].outcome, CandidateOutcomeV1::BeyondWidth);
    assert_eq!(level.candidates[4].outcome, CandidateOutcomeV1::BeyondWidth);
}

#[test]
fn tie_break_is_independent_of_engine_neighbor_order() {
    let mut forward = five_candidate_engine();
    let mut reversed =
        five_candidate_engine().with_neighbors("A:B:C:D:E", &["A", "D", "B", "C", "E"]);
    let config = SearchConfigV1 {
        width: 3,
        levels: 1,
        ..SearchConfigV1::default()
    };
    let (_, a) = run(&mut forward, config.clone());
    let (_, b) = run(&mut reversed, config);
    assert_eq!(row_names(&a), row_names(&b));
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: chain filter runs exactly one level regardless of budget
// ---------------------------------------------------------------------------

#[test]
fn chain_filter_executes_exactly_one_level() {
    let mut engine = three_level_engine();
    let config = SearchConfigV1 {
        filter: StructuralFilter::Chain,
        levels: 10,
        ..SearchConfigV1::default()
    };
    let (outcome, report) = run(&mut engine, config);

    assert_eq!(engine.journal().searched, vec!["A:B:C"]);
    assert_eq!(engine.journal().search_type.as_deref(), Some("chain-up"));
    assert_eq!(outcome.log.levels.len(), 1);
    assert_eq!(outcome.log.metadata.levels_completed, 1);
    assert_eq!(*outcome.termination_reason(), TerminationReasonV1::ChainSingleLevel);
    assert_eq!(report.rows().len(), 4);
}

#[test]
fn chain_filter_ignores_configured_start_model() {
    let mut engine = three_level_engine();
    let config = SearchConfigV1 {
        filter: StructuralFilter::Chain,
        start_model: ModelSpec::Top,
        ..SearchConfigV1::default()
    };
    let (outcome, _) = run(&mut engine, config);
    assert_eq!(outcome.log.metadata.start_model, "A:B:C");
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: memory cutoff: below ceiling for levels 1–2, above at level 3
// ---------------------------------------------------------------------------

#[test]
#[traced_test]
fn memory_cutoff_keeps_everything_through_level_two() {
    let mut engine = three_level_engine().with_mem_samples(&[100, 200, 5000]);
    let config = SearchConfigV1 {
        memory_ceiling_bytes: 1000,
        ..SearchConfigV1::default()
    };
    let (outcome, report) = run(&mut engine, config);

    assert_eq!(
        *outcome.termination_reason(),
        TerminationReasonV1::MemoryCeilingExceeded {
            level: 3,
            used_bytes: 5000,
            ceiling_bytes: 1000,
        }
    );
    assert_eq!(outcome.log.metadata.levels_completed, 2);
    assert_eq!(
        row_names(&report),
        vec!["A:B:C", "AB:C", "A:BC", "AC:B", "ABC"]
    );
    // Level 3 never expanded the frontier.
    assert!(!engine.journal().searched.contains(&"ABC".to_string()));
    assert!(logs_contain("memory ceiling exceeded"));
}

#[test]
fn memory_at_ceiling_is_not_exceeded() {
    let mut engine = three_level_engine().with_mem_samples(&[1000]);
    let config = SearchConfigV1 {
        memory_ceiling_bytes: 1000,
        ..SearchConfigV1::default()
    };
    let (outcome, _) = run(&mut engine, config);
    assert_eq!(
        *outcome.termination_reason(),
        TerminationReasonV1::FrontierExhausted { level: 3 }
    );
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: eviction: width 2, five candidates → three evicted
// ---------------------------------------------------------------------------

#[test]
fn eviction_scenario_evicts_exactly_the_non_retained() {
    let mut engine = five_candidate_engine();
    let config = SearchConfigV1 {
        width: 2,
        levels: 3,
        ..SearchConfigV1::default()
    };
    let (outcome, report) = run(&mut engine, config);

    assert_eq!(row_names(&report), vec!["A:B:C:D:E", "A", "D"]);
    assert_eq!(engine.journal().evicted, vec!["B", "C", "E"]);
    assert_eq!(outcome.log.levels[0].evicted, vec!["B", "C", "E"]);
    for kept in ["A", "D"] {
        assert!(engine.is_cached(kept), "{kept} was evicted");
    }
}

#[test]
fn final_level_evicts_nothing() {
    let mut engine = five_candidate_engine();
    let config = SearchConfigV1 {
        width: 2,
        levels: 1,
        ..SearchConfigV1::default()
    };
    run(&mut engine, config);
    assert!(engine.journal().evicted.is_empty());
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: ranking computes only the statistics its attribute needs
// ---------------------------------------------------------------------------

#[test]
fn discarded_candidates_only_get_ranking_statistics() {
    let mut engine = five_candidate_engine();
    let config = SearchConfigV1 {
        width: 2,
        levels: 1,
        ..SearchConfigV1::default()
    };
    run(&mut engine, config);

    let journal = engine.journal();
    for discarded in ["B", "C", "E"] {
        assert_eq!(
            journal.groups_for(discarded),
            vec![StatisticGroup::DegreesOfFreedom],
            "{discarded}"
        );
    }
    assert_eq!(
        journal.groups_for("A"),
        vec![
            StatisticGroup::DegreesOfFreedom,
            StatisticGroup::Likelihood,
            StatisticGroup::Dependent,
        ]
    );
}

#[test]
fn likelihood_ranking_fits_every_candidate() {
    let mut engine = three_level_engine();
    let config = SearchConfigV1 {
        width: 1,
        levels: 1,
        sort_attribute: "bic".into(),
        ..SearchConfigV1::default()
    };
    let (_, report) = run(&mut engine, config);
    for name in ["AB:C", "A:BC", "AC:B"] {
        assert_eq!(
            engine.journal().groups_for(name)[..2],
            [StatisticGroup::Likelihood, StatisticGroup::Dependent],
            "{name}"
        );
    }
    assert_eq!(row_names(&report), vec!["A:B:C", "A:BC"]);
}

#[test]
fn report_can_be_resorted_after_the_search() {
    let mut engine = three_level_engine();
    let (_, mut report) = run(&mut engine, SearchConfigV1::default());
    report.sort("bic", recon_search::SortDirection::Descending);
    assert_eq!(report.best_model().map(|e| e.name.as_str()), Some("ABC"));
}
