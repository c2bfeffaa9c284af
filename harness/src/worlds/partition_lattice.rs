//! `PartitionLatticeEngine`: a real lattice of disjoint models.
//!
//! A model is a partition of the declared variables into blocks, named by
//! joining each block's abbreviations with `:` (`AB:C`). Names are
//! canonical: variables inside a block and blocks themselves follow
//! declaration order, so `C:BA` and `AB:C` resolve to the same model.
//!
//! `disjoint-up` merges two blocks; `disjoint-down` splits one block in
//! two. Statistics are synthetic but deterministic: every pair of
//! variables carries a fixed association weight, and a model "captures"
//! the weight of the pairs that share a block. Each [`StatisticGroup`]
//! writes only its own attributes, so reading an attribute before its
//! group was computed is [`EngineError::AttributeUnavailable`].

use std::collections::{BTreeMap, BTreeSet};

use recon_search::contract::{ModelHandle, ModelingEngineV1, StatisticGroup, VariableListV1};
use recon_search::error::EngineError;
use recon_search::model_name::split_model;

/// Blocks of variable indices, each sorted, blocks sorted.
type Partition = Vec<Vec<usize>>;

/// Configuration for a partition lattice instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLatticeConfig {
    /// Variable abbreviations in declaration order.
    pub variables: Vec<String>,
    /// Dependent variable, making the system directed.
    pub dependent: Option<String>,
    /// Sample size used by the likelihood statistics.
    pub sample_size: u32,
    /// Bytes charged per cached model by `mem_usage`.
    pub footprint_bytes: u64,
}

impl PartitionLatticeConfig {
    /// A neutral system over `variables` with a 1000-case sample.
    #[must_use]
    pub fn neutral(variables: &[&str]) -> Self {
        Self {
            variables: variables.iter().map(|v| (*v).to_string()).collect(),
            dependent: None,
            sample_size: 1000,
            footprint_bytes: 1024,
        }
    }

    /// A directed system; `dependent` must be one of `variables`.
    #[must_use]
    pub fn directed(variables: &[&str], dependent: &str) -> Self {
        Self {
            dependent: Some(dependent.to_string()),
            ..Self::neutral(variables)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generator {
    Merge,
    Split,
}

pub struct PartitionLatticeEngine {
    config: PartitionLatticeConfig,
    engine_id: String,
    dependent: Option<usize>,
    generator: Option<Generator>,
    reference: Partition,
    keys: BTreeMap<String, u64>,
    cache: BTreeMap<String, Partition>,
    stats: BTreeMap<String, BTreeMap<String, f64>>,
    progenitors: BTreeMap<String, String>,
}

impl PartitionLatticeEngine {
    /// # Panics
    ///
    /// Panics if there are no variables, more than 26, duplicate or
    /// non-capitalized abbreviations, or a dependent variable that is not
    /// declared.
    #[must_use]
    pub fn new(config: PartitionLatticeConfig) -> Self {
        let n = config.variables.len();
        assert!((1..=26).contains(&n), "variable count {n} not in 1..=26");
        let distinct: BTreeSet<&String> = config.variables.iter().collect();
        assert_eq!(distinct.len(), n, "duplicate variable abbreviation");
        for v in &config.variables {
            assert!(
                v.starts_with(|c: char| c.is_ascii_uppercase())
                    && !v[1..].contains(|c: char| c.is_ascii_uppercase()),
                "abbreviation {v:?} must be one capital followed by non-capitals"
            );
        }
        let dependent = config.dependent.as_ref().map(|dv| {
            config
                .variables
                .iter()
                .position(|v| v == dv)
                .unwrap_or_else(|| panic!("dependent variable {dv:?} is not declared"))
        });
        let engine_id = format!(
            "partition_lattice:v1:n{n}:dv_{}",
            config.dependent.as_deref().unwrap_or("none")
        );
        let bottom = (0..n).map(|i| vec![i]).collect();
        Self {
            config,
            engine_id,
            dependent,
            generator: None,
            reference: bottom,
            keys: BTreeMap::new(),
            cache: BTreeMap::new(),
            stats: BTreeMap::new(),
            progenitors: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PartitionLatticeConfig {
        &self.config
    }

    /// Number of models currently held in the cache.
    #[must_use]
    pub fn cached_models(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    fn name_of(&self, partition: &Partition) -> String {
        partition
            .iter()
            .map(|block| {
                block
                    .iter()
                    .map(|&i| self.config.variables[i].as_str())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Parse any spelling of a partition into canonical form.
    fn parse(&self, name: &str) -> Option<Partition> {
        let mut seen = BTreeSet::new();
        let mut partition = Vec::new();
        for component in split_model(name, false) {
            let mut block = Vec::new();
            for abbrev in component {
                let i = self.config.variables.iter().position(|v| *v == abbrev)?;
                if !seen.insert(i) {
                    return None;
                }
                block.push(i);
            }
            if block.is_empty() {
                return None;
            }
            block.sort_unstable();
            partition.push(block);
        }
        if seen.len() != self.config.variables.len() {
            return None;
        }
        partition.sort();
        Some(partition)
    }

    fn intern(&mut self, partition: Partition) -> ModelHandle {
        let name = self.name_of(&partition);
        let next = self.keys.len() as u64;
        let key = *self.keys.entry(name.clone()).or_insert(next);
        self.cache.entry(name.clone()).or_insert(partition);
        ModelHandle::new(key, name)
    }

    fn partition_of(&self, model: &ModelHandle) -> Result<Partition, EngineError> {
        self.cache
            .get(model.name())
            .cloned()
            .or_else(|| self.parse(model.name()))
            .ok_or_else(|| EngineError::UnknownModel {
                name: model.name().into(),
            })
    }

    /// Association weight of the pair `i < j`, in `0.1..=0.7`.
    fn weight(i: usize, j: usize) -> f64 {
        f64::from(u32::try_from(1 + (3 * i + 5 * j) % 7).unwrap_or(1)) / 10.0
    }

    fn cardinality(i: usize) -> u64 {
        2 + (i % 2) as u64
    }

    fn captured(partition: &Partition) -> f64 {
        partition
            .iter()
            .flat_map(|block| {
                block
                    .iter()
                    .enumerate()
                    .flat_map(move |(a, &i)| block[a + 1..].iter().map(move |&j| Self::weight(i, j)))
            })
            .sum()
    }

    fn total_weight(&self) -> f64 {
        let top: Partition = vec![(0..self.config.variables.len()).collect()];
        Self::captured(&top)
    }

    fn information(&self, partition: &Partition) -> f64 {
        let total = self.total_weight();
        if total > 0.0 {
            Self::captured(partition) / total
        } else {
            0.0
        }
    }

    fn df(partition: &Partition) -> f64 {
        partition
            .iter()
            .map(|block| block.iter().map(|&i| Self::cardinality(i)).product::<u64>() - 1)
            .sum::<u64>() as f64
    }

    fn l2(&self, partition: &Partition) -> f64 {
        let delta = (Self::captured(partition) - Self::captured(&self.reference)).abs();
        2.0 * f64::from(self.config.sample_size) * delta / 100.0
    }

    fn alpha(&self, partition: &Partition) -> f64 {
        let ddf = (Self::df(partition) - Self::df(&self.reference)).abs();
        (-self.l2(partition) / (2.0 * (ddf + 1.0))).exp()
    }

    /// Weight captured between the dependent variable and the rest, as a
    /// fraction of all weight incident to it.
    fn dependent_share(&self, partition: &Partition, dv: usize) -> f64 {
        let incident: f64 = (0..self.config.variables.len())
            .filter(|&j| j != dv)
            .map(|j| Self::weight(dv.min(j), dv.max(j)))
            .sum();
        if incident == 0.0 {
            return 0.0;
        }
        let captured: f64 = partition
            .iter()
            .filter(|block| block.contains(&dv))
            .flat_map(|block| block.iter().filter(|&&j| j != dv))
            .map(|&j| Self::weight(dv.min(j), dv.max(j)))
            .sum();
        captured / incident
    }

    fn group_attributes(
        &self,
        name: &str,
        partition: &Partition,
        group: StatisticGroup,
    ) -> Vec<(&'static str, f64)> {
        let entropy: f64 = (0..self.config.variables.len())
            .map(|i| (Self::cardinality(i) as f64).ln())
            .sum();
        match group {
            StatisticGroup::Information => {
                let information = self.information(partition);
                vec![
                    ("h", entropy - Self::captured(partition)),
                    ("information", information),
                    ("unexplained", 1.0 - information),
                    ("alg_t", Self::captured(partition)),
                ]
            }
            StatisticGroup::DegreesOfFreedom => {
                let df = Self::df(partition);
                vec![("df", df), ("ddf", (df - Self::df(&self.reference)).abs())]
            }
            StatisticGroup::Likelihood => {
                let l2 = self.l2(partition);
                let ddf = (Self::df(partition) - Self::df(&self.reference)).abs();
                let n = f64::from(self.config.sample_size);
                vec![
                    ("l2", l2),
                    ("alpha", self.alpha(partition)),
                    ("aic", l2 - 2.0 * ddf),
                    ("bic", l2 - ddf * n.ln()),
                ]
            }
            StatisticGroup::Dependent => match self.dependent {
                Some(dv) => {
                    let share = self.dependent_share(partition, dv);
                    vec![("dh", share * entropy), ("pct_dh", 100.0 * share)]
                }
                None => Vec::new(),
            },
            StatisticGroup::BackPropagation => {
                let information = self.information(partition);
                vec![
                    ("bp_t", 0.9 * Self::captured(partition)),
                    ("bp_information", 0.9 * information),
                    ("bp_alpha", self.alpha(partition).sqrt()),
                ]
            }
            StatisticGroup::PercentCorrect => match self.dependent {
                Some(dv) => vec![(
                    "pct_correct_data",
                    50.0 + 50.0 * self.dependent_share(partition, dv),
                )],
                None => Vec::new(),
            },
            StatisticGroup::IncrementalAlpha => {
                let progenitor = self
                    .progenitors
                    .get(name)
                    .and_then(|p| self.parse(p))
                    .unwrap_or_else(|| partition.clone());
                vec![(
                    "inc_alpha",
                    (self.alpha(partition) - self.alpha(&progenitor)).abs(),
                )]
            }
        }
    }

    fn merges(partition: &Partition) -> Vec<Partition> {
        let mut out = Vec::new();
        for a in 0..partition.len() {
            for b in a + 1..partition.len() {
                let mut merged: Vec<usize> =
                    partition[a].iter().chain(&partition[b]).copied().collect();
                merged.sort_unstable();
                let mut next: Partition = partition
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != a && *k != b)
                    .map(|(_, block)| block.clone())
                    .collect();
                next.push(merged);
                next.sort();
                out.push(next);
            }
        }
        out
    }

    fn splits(partition: &Partition) -> Vec<Partition> {
        let mut out = Vec::new();
        for (k, block) in partition.iter().enumerate() {
            if block.len() < 2 {
                continue;
            }
            // The first element stays on the left; each mask picks a
            // non-empty right side from the remaining elements.
            let rest = &block[1..];
            for mask in 1u32..(1u32 << rest.len()) {
                let mut left = vec![block[0]];
                let mut right = Vec::new();
                for (bit, &v) in rest.iter().enumerate() {
                    if mask & (1 << bit) == 0 {
                        left.push(v);
                    } else {
                        right.push(v);
                    }
                }
                let mut next: Partition = partition
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != k)
                    .map(|(_, b)| b.clone())
                    .collect();
                next.push(left);
                next.push(right);
                next.sort();
                out.push(next);
            }
        }
        out
    }
}

impl ModelingEngineV1 for PartitionLatticeEngine {
    fn engine_id(&self) -> &str {
        &self.engine_id
    }

    fn is_directed(&self) -> bool {
        self.dependent.is_some()
    }

    fn variable_list(&self) -> VariableListV1 {
        VariableListV1 {
            abbrevs: self.config.variables.clone(),
            dependent: self.config.dependent.clone(),
        }
    }

    fn set_search_type(&mut self, name: &str) -> Result<(), EngineError> {
        self.generator = Some(match name {
            "disjoint-up" => Generator::Merge,
            "disjoint-down" => Generator::Split,
            _ => return Err(EngineError::UnrecognizedSearchType { name: name.into() }),
        });
        Ok(())
    }

    fn set_reference_model(&mut self, model: &ModelHandle) -> Result<(), EngineError> {
        self.reference = self.partition_of(model)?;
        Ok(())
    }

    fn make_model(&mut self, name: &str) -> Result<ModelHandle, EngineError> {
        let partition = self
            .parse(name)
            .ok_or_else(|| EngineError::UnknownModel { name: name.into() })?;
        Ok(self.intern(partition))
    }

    fn top_ref_model(&mut self) -> ModelHandle {
        self.intern(vec![(0..self.config.variables.len()).collect()])
    }

    fn bottom_ref_model(&mut self) -> ModelHandle {
        self.intern((0..self.config.variables.len()).map(|i| vec![i]).collect())
    }

    fn search_one_level(&mut self, model: &ModelHandle) -> Result<Vec<ModelHandle>, EngineError> {
        let generator = self.generator.ok_or_else(|| EngineError::UnrecognizedSearchType {
            name: String::new(),
        })?;
        let partition = self.partition_of(model)?;
        let neighbors = match generator {
            Generator::Merge => Self::merges(&partition),
            Generator::Split => Self::splits(&partition),
        };
        Ok(neighbors.into_iter().map(|p| self.intern(p)).collect())
    }

    fn compute_statistics(
        &mut self,
        model: &ModelHandle,
        group: StatisticGroup,
    ) -> Result<(), EngineError> {
        let partition = self.partition_of(model)?;
        let attrs = self.group_attributes(model.name(), &partition, group);
        if attrs.iter().any(|(_, v)| !v.is_finite()) {
            return Err(EngineError::StatisticFailed {
                model: model.name().into(),
                detail: format!("{} produced a non-finite value", group.as_str()),
            });
        }
        let entry = self.stats.entry(model.name().to_string()).or_default();
        for (attr, value) in attrs {
            entry.insert(attr.to_string(), value);
        }
        Ok(())
    }

    fn attribute(&self, model: &ModelHandle, name: &str) -> Result<f64, EngineError> {
        self.stats
            .get(model.name())
            .and_then(|attrs| attrs.get(name))
            .copied()
            .ok_or_else(|| EngineError::AttributeUnavailable {
                model: model.name().into(),
                attribute: name.into(),
            })
    }

    fn attributes(&self, model: &ModelHandle) -> BTreeMap<String, f64> {
        self.stats.get(model.name()).cloned().unwrap_or_default()
    }

    fn set_progenitor(&mut self, model: &ModelHandle, progenitor: &ModelHandle) {
        self.progenitors
            .insert(model.name().into(), progenitor.name().into());
    }

    /// The progenitor with more captured information wins; ties go to the
    /// lexicographically smaller name.
    fn compare_progenitors(&mut self, model: &ModelHandle, candidate: &ModelHandle) -> ModelHandle {
        let current = self
            .progenitors
            .get(model.name())
            .cloned()
            .unwrap_or_else(|| candidate.name().to_string());
        let score = |name: &str| self.parse(name).map_or(f64::NEG_INFINITY, |p| self.information(&p));
        let (cur, cand) = (score(&current), score(candidate.name()));
        let best = if cand > cur || (cand == cur && candidate.name() < current.as_str()) {
            candidate.name().to_string()
        } else {
            current
        };
        self.progenitors.insert(model.name().into(), best.clone());
        let key = self.keys.get(&best).copied().unwrap_or(candidate.key());
        ModelHandle::new(key, best)
    }

    fn is_equivalent(&self, a: &ModelHandle, b: &ModelHandle) -> bool {
        match (self.parse(a.name()), self.parse(b.name())) {
            (Some(pa), Some(pb)) => pa == pb,
            _ => a.name() == b.name(),
        }
    }

    fn mem_usage(&self) -> u64 {
        self.cache.len() as u64 * self.config.footprint_bytes
    }

    fn delete_from_cache(&mut self, model: &ModelHandle) -> bool {
        self.stats.remove(model.name());
        self.cache.remove(model.name()).is_some()
    }
}
