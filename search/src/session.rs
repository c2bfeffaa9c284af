//! Search session: configuration, setup, and the level loop.
//!
//! # Lifecycle
//!
//! `Init` resolves the search type, checks named models, builds the start
//! and reference models and completes the start model's statistics. Each
//! level then runs `MemoryCheck → Expand → Rank → Report → Advance`. Setup
//! failures are returned as [`SearchError`] before any lattice expansion;
//! every way the level loop stops is recorded as a
//! [`TerminationReasonV1`] in the returned log.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::{ModelSpec, SearchConfigV1};
use crate::contract::{ModelHandle, ModelingEngineV1, ReportEntryV1, ReportSinkV1, StatisticGroup};
use crate::error::{EngineError, SearchError};
use crate::expand::expand_level;
use crate::log::{
    CandidateOutcomeV1, CandidateRecordV1, LevelEventV1, SearchLogMetadata, SearchLogV1,
    TerminationReasonV1,
};
use crate::model::{CandidateV1, ModelLedger, ModelRecordV1};
use crate::model_name::check_model_name;
use crate::ranking::RankingV1;
use crate::reclaim::reclaim;
use crate::search_type::{resolve_search_type, SearchDirection, StructuralFilter};
use crate::select::{select_top_k, VerdictV1};

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcomeV1 {
    /// Every retained model in id order, start model first.
    pub retained: Vec<ModelRecordV1>,
    pub log: SearchLogV1,
}

impl SearchOutcomeV1 {
    #[must_use]
    pub fn termination_reason(&self) -> &TerminationReasonV1 {
        &self.log.metadata.termination_reason
    }

    #[must_use]
    pub fn total_generated(&self) -> u64 {
        self.log.metadata.total_generated
    }

    /// Models retained by the level loop (the start model is not counted).
    #[must_use]
    pub fn total_retained(&self) -> u64 {
        self.log.metadata.total_retained
    }
}

/// One search invocation. Counters and the processed ledger live here and
/// are never shared between invocations.
#[derive(Debug)]
pub struct SearchSession {
    config: SearchConfigV1,
    ranking: RankingV1,
    ledger: ModelLedger,
    total_generated: u64,
    total_retained: u64,
    next_id: u64,
    ids: BTreeMap<String, u64>,
}

impl SearchSession {
    /// Validate the configuration and create a session.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if the configuration is out of range.
    pub fn new(config: SearchConfigV1) -> Result<Self, SearchError> {
        config.validate()?;
        let ranking = RankingV1::new(config.sort_attribute.clone(), config.sort_direction);
        Ok(Self {
            config,
            ranking,
            ledger: ModelLedger::new(),
            total_generated: 0,
            total_retained: 0,
            next_id: 0,
            ids: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfigV1 {
        &self.config
    }

    /// Run the search to termination, handing retained models to `report`.
    ///
    /// # Errors
    ///
    /// Returns a configuration or resolution error before any lattice
    /// expansion, or an engine error if statistics fail mid-search.
    pub fn run(
        mut self,
        engine: &mut dyn ModelingEngineV1,
        report: &mut dyn ReportSinkV1,
    ) -> Result<SearchOutcomeV1, SearchError> {
        let directed = engine.is_directed();
        let variables = engine.variable_list();
        let chain = self.config.filter == StructuralFilter::Chain;

        // Chain search always starts from the default start model.
        let start_spec = if chain {
            ModelSpec::Default
        } else {
            self.config.start_model.clone()
        };
        for spec in [&start_spec, &self.config.reference_model] {
            if let ModelSpec::Named(name) = spec {
                check_model_name(name, &variables, directed).map_err(|error| {
                    SearchError::InvalidModelName {
                        name: name.clone(),
                        error,
                    }
                })?;
            }
        }

        let search_type = resolve_search_type(
            self.config.direction,
            self.config.filter,
            self.config.variant,
            directed,
        )?;
        let type_name = search_type.name();
        engine.set_search_type(&type_name).map_err(|e| match e {
            EngineError::UnrecognizedSearchType { name } => {
                SearchError::UnrecognizedSearchType { name }
            }
            other => SearchError::Engine(other),
        })?;

        let reference = materialize(engine, &self.config.reference_model, search_type.direction)?;
        engine.set_reference_model(&reference)?;
        let start = materialize(engine, &start_spec, search_type.direction)?;

        let start_record = self.retain_start(engine, report, &start, directed)?;
        let mut retained_all = vec![start_record.clone()];
        let mut frontier = vec![start_record];

        let mut levels = Vec::new();
        let mut levels_completed = 0u32;
        let mut termination = TerminationReasonV1::LevelBudgetExhausted;
        let width = usize::try_from(self.config.width).unwrap_or(usize::MAX);

        for level in 1..=self.config.levels {
            let mem_used_bytes = engine.mem_usage();
            if mem_used_bytes > self.config.memory_ceiling_bytes {
                warn!(
                    level,
                    used_bytes = mem_used_bytes,
                    ceiling_bytes = self.config.memory_ceiling_bytes,
                    "memory ceiling exceeded, stopping search"
                );
                termination = TerminationReasonV1::MemoryCeilingExceeded {
                    level,
                    used_bytes: mem_used_bytes,
                    ceiling_bytes: self.config.memory_ceiling_bytes,
                };
                break;
            }

            let expansion = expand_level(
                engine,
                &frontier,
                level,
                &mut self.ledger,
                &self.ranking,
                self.config.incremental_alpha,
            )?;

            let selection = {
                let eng: &dyn ModelingEngineV1 = &*engine;
                select_top_k(expansion.pool, width, |a, b| eng.is_equivalent(a, b))
            };

            let mut candidates = Vec::with_capacity(selection.decisions.len());
            let mut next_frontier = Vec::new();
            for (index, decision) in selection.decisions.iter().enumerate() {
                let c = &decision.candidate;
                let outcome = match &decision.verdict {
                    VerdictV1::Retained => {
                        let record = self.retain(engine, report, c, directed)?;
                        let id = record.id;
                        next_frontier.push(record);
                        CandidateOutcomeV1::Retained { id }
                    }
                    VerdictV1::EquivalentTo { name } => {
                        CandidateOutcomeV1::EquivalentTo { name: name.clone() }
                    }
                    VerdictV1::BeyondWidth => CandidateOutcomeV1::BeyondWidth,
                };
                candidates.push(CandidateRecordV1 {
                    index: index as u64,
                    name: c.handle.name().to_string(),
                    parent: c.parent.clone(),
                    sort_key: c.key.sort_key(),
                    outcome,
                });
            }

            let final_level = level == self.config.levels;
            let evicted = reclaim(engine, &selection, final_level);

            let retained = next_frontier.len() as u64;
            self.total_generated += expansion.generated;
            self.total_retained += retained;
            levels_completed = level;

            info!(
                level,
                generated = expansion.generated,
                retained,
                total_generated = self.total_generated,
                total_retained = self.total_retained,
                mem_used_bytes,
                "level complete"
            );

            levels.push(LevelEventV1 {
                level,
                frontier: frontier.iter().map(|m| m.name().to_string()).collect(),
                mem_used_bytes,
                candidates,
                generated: expansion.generated,
                retained,
                progenitor_revisits: expansion.revisits,
                evicted,
            });

            retained_all.extend(next_frontier.iter().cloned());
            frontier = next_frontier;

            if frontier.is_empty() {
                termination = TerminationReasonV1::FrontierExhausted { level };
                break;
            }
            if chain {
                termination = TerminationReasonV1::ChainSingleLevel;
                break;
            }
        }

        let log = SearchLogV1 {
            levels,
            metadata: SearchLogMetadata {
                engine_id: engine.engine_id().to_string(),
                search_type: type_name,
                start_model: start.name().to_string(),
                reference_model: reference.name().to_string(),
                config: self.config,
                levels_completed,
                total_generated: self.total_generated,
                total_retained: self.total_retained,
                termination_reason: termination,
            },
        };

        Ok(SearchOutcomeV1 {
            retained: retained_all,
            log,
        })
    }

    /// Level 0, id 1, its own progenitor, first entry in the report.
    fn retain_start(
        &mut self,
        engine: &mut dyn ModelingEngineV1,
        report: &mut dyn ReportSinkV1,
        start: &ModelHandle,
        directed: bool,
    ) -> Result<ModelRecordV1, SearchError> {
        let key = self.ranking.stage_key(engine, start)?;
        engine.compute_statistics(start, StatisticGroup::Likelihood)?;
        engine.compute_statistics(start, StatisticGroup::Dependent)?;
        self.optional_statistics(engine, start, directed)?;

        engine.set_progenitor(start, start);
        self.ledger.mark_processed(start.name(), start.name());
        self.next_id = 1;
        self.ids.insert(start.name().to_string(), 1);

        report.add_model(ReportEntryV1 {
            name: start.name().to_string(),
            id: 1,
            level: 0,
            progenitor: start.name().to_string(),
            progenitor_id: Some(1),
            attributes: engine.attributes(start),
        });

        Ok(ModelRecordV1 {
            handle: start.clone(),
            level: 0,
            id: 1,
            progenitor: start.name().to_string(),
            sort_key: key.sort_key(),
        })
    }

    /// Complete a retained candidate's statistics, assign its id and report it.
    fn retain(
        &mut self,
        engine: &mut dyn ModelingEngineV1,
        report: &mut dyn ReportSinkV1,
        candidate: &CandidateV1,
        directed: bool,
    ) -> Result<ModelRecordV1, SearchError> {
        let handle = &candidate.handle;
        if !self.config.no_ipf {
            engine.compute_statistics(handle, StatisticGroup::Likelihood)?;
            engine.compute_statistics(handle, StatisticGroup::Dependent)?;
        }
        self.optional_statistics(engine, handle, directed)?;

        self.next_id += 1;
        let id = self.next_id;
        self.ids.insert(handle.name().to_string(), id);

        let progenitor = self
            .ledger
            .progenitor_of(handle.name())
            .unwrap_or(candidate.parent.as_str())
            .to_string();
        let progenitor_id = self.ids.get(&progenitor).copied();

        report.add_model(ReportEntryV1 {
            name: handle.name().to_string(),
            id,
            level: candidate.level,
            progenitor: progenitor.clone(),
            progenitor_id,
            attributes: engine.attributes(handle),
        });

        Ok(ModelRecordV1 {
            handle: handle.clone(),
            level: candidate.level,
            id,
            progenitor,
            sort_key: candidate.key.sort_key(),
        })
    }

    fn optional_statistics(
        &self,
        engine: &mut dyn ModelingEngineV1,
        model: &ModelHandle,
        directed: bool,
    ) -> Result<(), SearchError> {
        if self.config.bp_statistics {
            engine.compute_statistics(model, StatisticGroup::BackPropagation)?;
        }
        if self.config.percent_correct && directed {
            engine.compute_statistics(model, StatisticGroup::PercentCorrect)?;
        }
        if self.config.incremental_alpha {
            engine.compute_statistics(model, StatisticGroup::IncrementalAlpha)?;
        }
        Ok(())
    }
}

/// Build the model a spec names; `Default` is top for downward searches,
/// bottom otherwise.
fn materialize(
    engine: &mut dyn ModelingEngineV1,
    spec: &ModelSpec,
    direction: SearchDirection,
) -> Result<ModelHandle, SearchError> {
    Ok(match (spec, direction) {
        (ModelSpec::Top, _) | (ModelSpec::Default, SearchDirection::Down) => engine.top_ref_model(),
        (ModelSpec::Bottom, _) | (ModelSpec::Default, SearchDirection::Up) => {
            engine.bottom_ref_model()
        }
        (ModelSpec::Named(name), _) => engine.make_model(name)?,
    })
}
