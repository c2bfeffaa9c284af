//! `ScriptedEngine`: table-driven engine with a call journal.
//!
//! Neighbors, attribute values, equivalences, and memory samples are all
//! scripted up front, so acceptance tests can state exact expectations
//! about what the driver asked for. An attribute is readable only after
//! every statistic group that produces it (per
//! [`recon_search::ranking::statistics_for`]) has been computed for the model.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use recon_search::contract::{ModelHandle, ModelingEngineV1, StatisticGroup, VariableListV1};
use recon_search::error::EngineError;
use recon_search::ranking::statistics_for;

/// Everything the driver asked of the engine, in call order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EngineJournal {
    pub search_type: Option<String>,
    pub reference: Option<String>,
    pub searched: Vec<String>,
    pub computed: Vec<(String, StatisticGroup)>,
    pub compared: Vec<(String, String)>,
    pub evicted: Vec<String>,
}

impl EngineJournal {
    /// Statistic groups computed for `model`, in call order.
    #[must_use]
    pub fn groups_for(&self, model: &str) -> Vec<StatisticGroup> {
        self.computed
            .iter()
            .filter(|(m, _)| m == model)
            .map(|(_, g)| *g)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    variables: Vec<String>,
    dependent: Option<String>,
    top: String,
    bottom: String,
    attributes: BTreeMap<String, BTreeMap<String, f64>>,
    neighbors: BTreeMap<String, Vec<String>>,
    equivalent: Vec<(String, String)>,
    recognized: Vec<String>,
    mem_samples: Vec<u64>,
    mem_calls: Cell<usize>,
    keys: BTreeMap<String, u64>,
    computed: BTreeSet<(String, StatisticGroup)>,
    progenitors: BTreeMap<String, String>,
    cached: BTreeSet<String>,
    journal: EngineJournal,
}

impl ScriptedEngine {
    /// An engine over `variables` whose top and bottom are the saturated
    /// and independence names built from them.
    #[must_use]
    pub fn new(variables: &[&str]) -> Self {
        Self {
            variables: variables.iter().map(|v| (*v).to_string()).collect(),
            dependent: None,
            top: variables.concat(),
            bottom: variables.join(":"),
            attributes: BTreeMap::new(),
            neighbors: BTreeMap::new(),
            equivalent: Vec::new(),
            recognized: ["loopless-up", "loopless-down", "full-up", "full-down", "chain-up"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            mem_samples: vec![0],
            mem_calls: Cell::new(0),
            keys: BTreeMap::new(),
            computed: BTreeSet::new(),
            progenitors: BTreeMap::new(),
            cached: BTreeSet::new(),
            journal: EngineJournal::default(),
        }
    }

    /// Declare a model with its attribute values.
    #[must_use]
    pub fn with_model(mut self, name: &str, attributes: &[(&str, f64)]) -> Self {
        self.attributes.insert(
            name.to_string(),
            attributes
                .iter()
                .map(|(a, v)| ((*a).to_string(), *v))
                .collect(),
        );
        self
    }

    #[must_use]
    pub fn with_neighbors(mut self, name: &str, neighbors: &[&str]) -> Self {
        self.neighbors.insert(
            name.to_string(),
            neighbors.iter().map(|n| (*n).to_string()).collect(),
        );
        self
    }

    /// Declare two distinct names structurally equivalent.
    #[must_use]
    pub fn with_equivalent(mut self, a: &str, b: &str) -> Self {
        self.equivalent.push((a.to_string(), b.to_string()));
        self
    }

    /// One sample is consumed per `mem_usage` call; the last one repeats.
    #[must_use]
    pub fn with_mem_samples(mut self, samples: &[u64]) -> Self {
        self.mem_samples = samples.to_vec();
        self
    }

    #[must_use]
    pub fn with_dependent(mut self, dv: &str) -> Self {
        self.dependent = Some(dv.to_string());
        self
    }

    /// Replace the recognized search-type names.
    #[must_use]
    pub fn with_search_types(mut self, names: &[&str]) -> Self {
        self.recognized = names.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn journal(&self) -> &EngineJournal {
        &self.journal
    }

    /// The progenitor the engine currently holds for `model`.
    #[must_use]
    pub fn progenitor(&self, model: &str) -> Option<&str> {
        self.progenitors.get(model).map(String::as_str)
    }

    #[must_use]
    pub fn is_cached(&self, model: &str) -> bool {
        self.cached.contains(model)
    }

    fn handle(&mut self, name: &str) -> ModelHandle {
        let next = self.keys.len() as u64;
        let key = *self.keys.entry(name.to_string()).or_insert(next);
        self.cached.insert(name.to_string());
        ModelHandle::new(key, name)
    }

    fn declared(&self, name: &str) -> Result<(), EngineError> {
        if self.attributes.contains_key(name) {
            Ok(())
        } else {
            Err(EngineError::UnknownModel { name: name.into() })
        }
    }
}

impl ModelingEngineV1 for ScriptedEngine {
    fn engine_id(&self) -> &str {
        "scripted:v1"
    }

    fn is_directed(&self) -> bool {
        self.dependent.is_some()
    }

    fn variable_list(&self) -> VariableListV1 {
        VariableListV1 {
            abbrevs: self.variables.clone(),
            dependent: self.dependent.clone(),
        }
    }

    fn set_search_type(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.recognized.iter().any(|r| r == name) {
            return Err(EngineError::UnrecognizedSearchType { name: name.into() });
        }
        self.journal.search_type = Some(name.to_string());
        Ok(())
    }

    fn set_reference_model(&mut self, model: &ModelHandle) -> Result<(), EngineError> {
        self.journal.reference = Some(model.name().to_string());
        Ok(())
    }

    fn make_model(&mut self, name: &str) -> Result<ModelHandle, EngineError> {
        self.declared(name)?;
        Ok(self.handle(name))
    }

    fn top_ref_model(&mut self) -> ModelHandle {
        let top = self.top.clone();
        self.handle(&top)
    }

    fn bottom_ref_model(&mut self) -> ModelHandle {
        let bottom = self.bottom.clone();
        self.handle(&bottom)
    }

    fn search_one_level(&mut self, model: &ModelHandle) -> Result<Vec<ModelHandle>, EngineError> {
        self.journal.searched.push(model.name().to_string());
        let names = self.neighbors.get(model.name()).cloned().unwrap_or_default();
        names
            .iter()
            .map(|n| {
                self.declared(n)?;
                Ok(self.handle(n))
            })
            .collect()
    }

    fn compute_statistics(
        &mut self,
        model: &ModelHandle,
        group: StatisticGroup,
    ) -> Result<(), EngineError> {
        self.declared(model.name())?;
        self.journal
            .computed
            .push((model.name().to_string(), group));
        self.computed.insert((model.name().to_string(), group));
        Ok(())
    }

    fn attribute(&self, model: &ModelHandle, name: &str) -> Result<f64, EngineError> {
        let unavailable = || EngineError::AttributeUnavailable {
            model: model.name().into(),
            attribute: name.into(),
        };
        let ready = statistics_for(name)
            .iter()
            .all(|g| self.computed.contains(&(model.name().to_string(), *g)));
        if !ready {
            return Err(unavailable());
        }
        self.attributes
            .get(model.name())
            .and_then(|attrs| attrs.get(name))
            .copied()
            .ok_or_else(unavailable)
    }

    fn attributes(&self, model: &ModelHandle) -> BTreeMap<String, f64> {
        let Some(attrs) = self.attributes.get(model.name()) else {
            return BTreeMap::new();
        };
        attrs
            .iter()
            .filter(|(name, _)| {
                statistics_for(name)
                    .iter()
                    .all(|g| self.computed.contains(&(model.name().to_string(), *g)))
            })
            .map(|(name, v)| (name.clone(), *v))
            .collect()
    }

    fn set_progenitor(&mut self, model: &ModelHandle, progenitor: &ModelHandle) {
        self.progenitors
            .insert(model.name().into(), progenitor.name().into());
    }

    fn compare_progenitors(&mut self, model: &ModelHandle, candidate: &ModelHandle) -> ModelHandle {
        self.journal
            .compared
            .push((model.name().into(), candidate.name().into()));
        let current = self
            .progenitors
            .get(model.name())
            .cloned()
            .unwrap_or_else(|| candidate.name().to_string());
        // Lexicographically smaller progenitor wins.
        let best = if candidate.name() < current.as_str() {
            candidate.name().to_string()
        } else {
            current
        };
        self.progenitors.insert(model.name().into(), best.clone());
        self.handle(&best)
    }

    fn is_equivalent(&self, a: &ModelHandle, b: &ModelHandle) -> bool {
        a.name() == b.name()
            || self.equivalent.iter().any(|(x, y)| {
                (x == a.name() && y == b.name()) || (x == b.name() && y == a.name())
            })
    }

    fn mem_usage(&self) -> u64 {
        let i = self.mem_calls.get();
        self.mem_calls.set(i + 1);
        self.mem_samples
            .get(i)
            .or_else(|| self.mem_samples.last())
            .copied()
            .unwrap_or(0)
    }

    fn delete_from_cache(&mut self, model: &ModelHandle) -> bool {
        self.journal.evicted.push(model.name().to_string());
        self.cached.remove(model.name())
    }
}
