//! Session setup: configuration errors, search-type resolution, model-name
//! checking, reference/start resolution, and option-string configuration.
//!
//! Every setup failure must surface before the engine is asked for a single
//! neighbor or statistic, and must leave the report empty.

use std::collections::BTreeMap;

use recon_harness::report::ModelReport;
use recon_harness::worlds::scripted::ScriptedEngine;
use recon_search::model_name::{ModelNameError, ShorthandHint};
use recon_search::search_type::{DirectionSetting, SearchVariant, StructuralFilter};
use recon_search::{ModelSpec, SearchConfigV1, SearchError, SearchSession};

fn engine() -> ScriptedEngine {
    ScriptedEngine::new(&["A", "B", "C"])
        .with_model("A:B:C", &[("ddf", 0.0)])
        .with_model("AB:C", &[("ddf", 1.0)])
        .with_model("ABC", &[("ddf", 4.0)])
        .with_neighbors("A:B:C", &["AB:C"])
        .with_neighbors("AB:C", &["ABC"])
}

/// Run and assert that nothing reached the engine's lattice or the report.
fn setup_error(engine: &mut ScriptedEngine, config: SearchConfigV1) -> SearchError {
    let mut report = ModelReport::new();
    let err = SearchSession::new(config)
        .and_then(|s| s.run(engine, &mut report))
        .unwrap_err();
    assert!(engine.journal().searched.is_empty(), "engine searched: {err}");
    assert!(engine.journal().computed.is_empty(), "engine computed: {err}");
    assert!(report.rows().is_empty(), "report not empty: {err}");
    err
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: configuration errors abort before any engine search call
// ---------------------------------------------------------------------------

#[test]
fn zero_width_is_rejected() {
    let err = setup_error(
        &mut engine(),
        SearchConfigV1 {
            width: 0,
            ..SearchConfigV1::default()
        },
    );
    assert!(matches!(err, SearchError::InvalidConfig { .. }), "{err:?}");
}

#[test]
fn downward_chain_is_unsupported_for_both_system_kinds() {
    for directed in [false, true] {
        let mut e = if directed {
            engine().with_dependent("C")
        } else {
            engine()
        };
        let err = setup_error(
            &mut e,
            SearchConfigV1 {
                direction: DirectionSetting::Down,
                filter: StructuralFilter::Chain,
                ..SearchConfigV1::default()
            },
        );
        assert!(
            matches!(err, SearchError::UnsupportedCombination { directed: d, .. } if d == directed),
            "{err:?}"
        );
        assert!(e.journal().search_type.is_none());
    }
}

#[test]
fn malformed_start_model_names_the_missing_variable() {
    let err = setup_error(
        &mut engine(),
        SearchConfigV1 {
            start_model: ModelSpec::Named("AB".into()),
            ..SearchConfigV1::default()
        },
    );
    assert_eq!(
        err,
        SearchError::InvalidModelName {
            name: "AB".into(),
            error: ModelNameError::MissingVariables {
                missing: vec!["C".into()],
                hint: ShorthandHint::Missing { expected: "IVI" },
            },
        }
    );
}

#[test]
fn undeclared_variable_in_reference_model_is_rejected() {
    let err = setup_error(
        &mut engine(),
        SearchConfigV1 {
            reference_model: ModelSpec::Named("AB:CZ".into()),
            ..SearchConfigV1::default()
        },
    );
    assert!(
        matches!(
            err,
            SearchError::InvalidModelName {
                error: ModelNameError::UndeclaredVariables { ref undeclared, .. },
                ..
            } if undeclared == &["Z".to_string()]
        ),
        "{err:?}"
    );
}

#[test]
fn directed_component_without_dependent_is_rejected() {
    let err = setup_error(
        &mut engine().with_dependent("C"),
        SearchConfigV1 {
            start_model: ModelSpec::Named("IV:AB".into()),
            ..SearchConfigV1::default()
        },
    );
    assert!(
        matches!(
            err,
            SearchError::InvalidModelName {
                error: ModelNameError::MissingDependent { .. },
                ..
            }
        ),
        "{err:?}"
    );
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: resolution errors abort before expansion
// ---------------------------------------------------------------------------

#[test]
fn unrecognized_search_type_is_a_resolution_error() {
    let err = setup_error(
        &mut engine(),
        SearchConfigV1 {
            filter: StructuralFilter::Disjoint,
            ..SearchConfigV1::default()
        },
    );
    assert_eq!(
        err,
        SearchError::UnrecognizedSearchType {
            name: "disjoint-up".into()
        }
    );
}

#[test]
fn state_based_variant_prefixes_the_type_name() {
    let mut e = engine().with_search_types(&["sb-loopless-up"]);
    let mut report = ModelReport::new();
    let config = SearchConfigV1 {
        variant: SearchVariant::State,
        levels: 1,
        ..SearchConfigV1::default()
    };
    let outcome = SearchSession::new(config)
        .unwrap()
        .run(&mut e, &mut report)
        .unwrap();
    assert_eq!(outcome.log.metadata.search_type, "sb-loopless-up");
    assert_eq!(e.journal().search_type.as_deref(), Some("sb-loopless-up"));
}

// ---------------------------------------------------------------------------
// Reference and start model resolution
// ---------------------------------------------------------------------------

#[test]
fn default_reference_follows_direction() {
    for (direction, expected) in [
        (DirectionSetting::Default, "A:B:C"),
        (DirectionSetting::Up, "A:B:C"),
        (DirectionSetting::Down, "ABC"),
    ] {
        let mut e = engine();
        let mut report = ModelReport::new();
        let config = SearchConfigV1 {
            direction,
            levels: 0,
            ..SearchConfigV1::default()
        };
        let outcome = SearchSession::new(config)
            .unwrap()
            .run(&mut e, &mut report)
            .unwrap();
        assert_eq!(e.journal().reference.as_deref(), Some(expected));
        assert_eq!(outcome.log.metadata.start_model, expected);
    }
}

#[test]
fn named_start_model_is_used_verbatim() {
    let mut e = engine();
    let mut report = ModelReport::new();
    let config = SearchConfigV1 {
        start_model: ModelSpec::Named("AB:C".into()),
        reference_model: ModelSpec::Top,
        ..SearchConfigV1::default()
    };
    let outcome = SearchSession::new(config)
        .unwrap()
        .run(&mut e, &mut report)
        .unwrap();
    assert_eq!(outcome.log.metadata.start_model, "AB:C");
    assert_eq!(e.journal().reference.as_deref(), Some("ABC"));
    assert_eq!(e.journal().searched[0], "AB:C");
    assert_eq!(report.rows()[0].name, "AB:C");
}

// ---------------------------------------------------------------------------
// Option-string configuration
// ---------------------------------------------------------------------------

fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn option_strings_drive_a_search() {
    let config = SearchConfigV1::from_options(&options(&[
        ("optimize-search-width", "1.4"),
        ("search-levels", "2"),
        ("search-filter", "loopless"),
        ("search-sort-by", "ddf"),
        ("search-sort-dir", "ascending"),
        ("short-model", ""),
        ("unrelated-option", "ignored"),
    ]))
    .unwrap();
    assert_eq!((config.width, config.levels), (1, 2));
    assert_eq!(config.start_model, ModelSpec::Default);

    let mut e = engine();
    let mut report = ModelReport::new();
    let outcome = SearchSession::new(config)
        .unwrap()
        .run(&mut e, &mut report)
        .unwrap();
    assert_eq!(outcome.log.metadata.levels_completed, 2);
    let names: Vec<&str> = report.rows().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A:B:C", "AB:C", "ABC"]);
}

#[test]
fn non_positive_width_option_is_rejected() {
    let err = SearchConfigV1::from_options(&options(&[("optimize-search-width", "0")]))
        .unwrap_err();
    assert_eq!(err.key, "optimize-search-width");
}

#[test]
fn config_loads_from_json() {
    let config = SearchConfigV1::from_json_slice(
        br#"{"width":2,"levels":3,"filter":"disjoint","sort_direction":"descending","start_model":"top"}"#,
    )
    .unwrap();
    assert_eq!(config.width, 2);
    assert_eq!(config.filter, StructuralFilter::Disjoint);
    assert_eq!(config.start_model, ModelSpec::Top);
    assert!(SearchConfigV1::from_json_slice(br#"{"beam":2}"#).is_err());
}
