//! Search invariants over a real lattice: width bound, no equivalent
//! models in a frontier, monotonic ids, level bookkeeping, counters, and
//! in-process determinism.

use std::collections::BTreeMap;

use recon_harness::report::ModelReport;
use recon_harness::worlds::partition_lattice::{PartitionLatticeConfig, PartitionLatticeEngine};
use recon_harness::worlds::scripted::ScriptedEngine;
use recon_search::contract::ModelingEngineV1;
use recon_search::log::CandidateOutcomeV1;
use recon_search::search_type::{DirectionSetting, StructuralFilter};
use recon_search::{SearchConfigV1, SearchOutcomeV1, SearchSession, SortDirection};

fn lattice(vars: &[&str]) -> PartitionLatticeEngine {
    PartitionLatticeEngine::new(PartitionLatticeConfig::neutral(vars))
}

fn config(width: u32, direction: DirectionSetting, attribute: &str) -> SearchConfigV1 {
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

fn run(
    engine: &mut dyn ModelingEngineV1,
    config: SearchConfigV1,
) -> (SearchOutcomeV1, ModelReport) {
    let mut report = ModelReport::new();
    let outcome = SearchSession::new(config)
        .unwrap()
        .run(engine, &mut report)
        .unwrap();
    (outcome, report)
}

/// Every (width, direction, ranking) combination exercised below.
fn grid() -> Vec<SearchConfigV1> {
    let mut out = Vec::new();
    for width in 1..=4 {
        for direction in [DirectionSetting::Up, DirectionSetting::Down] {
            for attribute in ["information", "bic"] {
                out.push(config(width, direction, attribute));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: width bound: every retained frontier has at most W models
// ---------------------------------------------------------------------------

#[test]
fn retained_frontier_never_exceeds_width() {
    for config in grid() {
        let width = u64::from(config.width);
        let (outcome, _) = run(&mut lattice(&["A", "B", "C", "D", "E"]), config.clone());
        for level in &outcome.log.levels {
            assert!(
                level.retained <= width,
                "level {} retained {} > {width} for {config:?}",
                level.level,
                level.retained
            );
            let retained = level
                .candidates
                .iter()
                .filter(|c| matches!(c.outcome, CandidateOutcomeV1::Retained { .. }))
                .count() as u64;
            assert_eq!(retained, level.retained);
        }
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: no two models in one frontier are engine-equivalent
// ---------------------------------------------------------------------------

#[test]
fn frontier_holds_no_equivalent_pair() {
    for config in grid() {
        let mut engine = lattice(&["A", "B", "C", "D"]);
        let (outcome, _) = run(&mut engine, config);
        let mut by_level: BTreeMap<u32, Vec<_>> = BTreeMap::new();
        for record in &outcome.retained {
            by_level.entry(record.level).or_default().push(&record.handle);
        }
        for (level, handles) in by_level {
            for (i, a) in handles.iter().enumerate() {
                for b in &handles[i + 1..] {
                    assert!(
                        !engine.is_equivalent(a, b),
                        "level {level}: {} ~ {}",
                        a.name(),
                        b.name()
                    );
                }
            }
        }
    }
}

#[test]
fn differently_named_equivalents_are_collapsed() {
    let mut engine = ScriptedEngine::new(&["A", "B", "C"])
        .with_model("A:B:C", &[("ddf", 0.0)])
        .with_model("AB:C", &[("ddf", 1.0)])
        .with_model("C:AB", &[("ddf", 1.0)])
        .with_model("A:BC", &[("ddf", 2.0)])
        .with_neighbors("A:B:C", &["C:AB", "AB:C", "A:BC"])
        .with_equivalent("AB:C", "C:AB");
    let config = SearchConfigV1 {
        width: 3,
        levels: 1,
        ..SearchConfigV1::default()
    };
    let (outcome, report) = run(&mut engine, config);

    let names: Vec<&str> = report.rows().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["A:B:C", "AB:C", "A:BC"]);
    let dup = outcome.log.levels[0]
        .candidates
        .iter()
        .find(|c| c.name == "C:AB")
        .unwrap();
    assert_eq!(
        dup.outcome,
        CandidateOutcomeV1::EquivalentTo {
            name: "AB:C".into()
        }
    );
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: ids strictly increase in retention order
// ---------------------------------------------------------------------------

#[test]
fn ids_strictly_increase_in_retention_order() {
    for config in grid() {
        let (outcome, report) = run(&mut lattice(&["A", "B", "C", "D", "E"]), config);
        let report_ids: Vec<u64> = report.rows().iter().map(|e| e.id).collect();
        let outcome_ids: Vec<u64> = outcome.retained.iter().map(|m| m.id).collect();
        assert_eq!(report_ids, outcome_ids);
        assert_eq!(report_ids[0], 1);
        assert!(report_ids.windows(2).all(|w| w[0] < w[1]), "{report_ids:?}");
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: level(child) = level(parent) + 1
// ---------------------------------------------------------------------------

#[test]
fn children_sit_one_level_below_their_parent() {
    for config in grid() {
        let (outcome, report) = run(&mut lattice(&["A", "B", "C", "D"]), config);
        let levels: BTreeMap<&str, u32> = report
            .rows()
            .iter()
            .map(|e| (e.name.as_str(), e.level))
            .collect();
        for event in &outcome.log.levels {
            for candidate in &event.candidates {
                assert_eq!(levels[candidate.parent.as_str()] + 1, event.level);
            }
        }
        for row in report.rows().iter().skip(1) {
            assert_eq!(levels[row.progenitor.as_str()] + 1, row.level, "{}", row.name);
        }
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: counters match the per-level log
// ---------------------------------------------------------------------------

#[test]
fn totals_match_level_events() {
    for config in grid() {
        let (outcome, report) = run(&mut lattice(&["A", "B", "C", "D", "E"]), config);
        let generated: u64 = outcome.log.levels.iter().map(|l| l.generated).sum();
        let retained: u64 = outcome.log.levels.iter().map(|l| l.retained).sum();
        assert_eq!(outcome.total_generated(), generated);
        assert_eq!(outcome.total_retained(), retained);
        assert_eq!(report.rows().len() as u64, retained + 1);
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: determinism: same engine, same config, same everything
// ---------------------------------------------------------------------------

#[test]
fn two_runs_are_identical() {
    for config in grid() {
        let (a, ra) = run(&mut lattice(&["A", "B", "C", "D", "E"]), config.clone());
        let (b, rb) = run(&mut lattice(&["A", "B", "C", "D", "E"]), config);
        assert_eq!(a.log.to_json_bytes().unwrap(), b.log.to_json_bytes().unwrap());
        assert_eq!(a.total_generated(), b.total_generated());
        assert_eq!(a.total_retained(), b.total_retained());
        assert_eq!(ra.rows(), rb.rows());
    }
}

#[test]
fn downward_search_starts_at_top_and_reaches_bottom() {
    let (outcome, report) = run(
        &mut lattice(&["A", "B", "C"]),
        config(3, DirectionSetting::Down, "information"),
    );
    assert_eq!(outcome.log.metadata.search_type, "disjoint-down");
    assert_eq!(outcome.log.metadata.start_model, "ABC");
    assert_eq!(outcome.log.metadata.reference_model, "ABC");
    assert!(report.rows().iter().any(|e| e.name == "A:B:C"));
}
