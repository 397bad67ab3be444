pub mod normalize;

use crate::error::LciaError;
use crate::model::FlowableId;
use normalize::normalize_term;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How to reconcile a new term set that matches more than one flowable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Merge every matched flowable into the first match.
    #[default]
    Merge,
    /// Attach unknown terms to the first match; leave the others alone.
    Prune,
}

/// A canonical substance identity.
#[derive(Debug, Clone, Serialize)]
pub struct Flowable {
    pub name: String,
    pub synonyms: BTreeSet<String>,
    #[serde(skip)]
    merged_into: Option<FlowableId>,
}

/// Synonym dictionary mapping terms to canonical flowables.
#[derive(Debug, Clone, Default)]
pub struct FlowableManager {
    flowables: Vec<Flowable>,
    index: HashMap<String, FlowableId>,
}

impl FlowableManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a flowable by any of its synonyms.
    pub fn get(&self, term: &str) -> Option<FlowableId> {
        self.index
            .get(&normalize_term(term))
            .map(|&id| self.canonical(id))
    }

    /// Follow merge records to the surviving flowable.
    pub fn canonical(&self, id: FlowableId) -> FlowableId {
        let mut current = id;
        while let Some(next) = self.flowables.get(current.0).and_then(|f| f.merged_into) {
            current = next;
        }
        current
    }

    pub fn flowable(&self, id: FlowableId) -> Option<&Flowable> {
        self.flowables.get(self.canonical(id).0)
    }

    pub fn name(&self, id: FlowableId) -> Option<&str> {
        self.flowable(id).map(|f| f.name.as_str())
    }

    /// Canonical (unmerged) flowables.
    pub fn iter(&self) -> impl Iterator<Item = (FlowableId, &Flowable)> {
        self.flowables
            .iter()
            .enumerate()
            .filter(|(_, f)| f.merged_into.is_none())
            .map(|(i, f)| (FlowableId(i), f))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a set of synonymous terms.
    ///
    /// Unknown terms create a new flowable named after the first term. Terms
    /// that already belong to flowables attach the rest of the set to the
    /// first match; further matches are merged or left alone depending on
    /// `strategy`. Returns `None` for an empty (or all-blank) term set.
    pub fn add_terms(&mut self, terms: &[String], strategy: MergeStrategy) -> Option<FlowableId> {
        let terms: Vec<&String> = terms
            .iter()
            .filter(|t| !normalize_term(t).is_empty())
            .collect();
        let first = terms.first()?;

        let mut matches: Vec<FlowableId> = Vec::new();
        for term in &terms {
            if let Some(id) = self.get(term) {
                if !matches.contains(&id) {
                    matches.push(id);
                }
            }
        }

        let target = match matches.first() {
            Some(&id) => id,
            None => {
                let id = FlowableId(self.flowables.len());
                self.flowables.push(Flowable {
                    name: first.trim().to_string(),
                    synonyms: BTreeSet::new(),
                    merged_into: None,
                });
                id
            }
        };

        if strategy == MergeStrategy::Merge {
            for &other in matches.iter().skip(1) {
                // both ids came from the index, so the merge cannot fail
                if let Err(e) = self.merge(target, other) {
                    tracing::warn!("flowable merge skipped: {e}");
                }
            }
        }

        for term in terms {
            if self.get(term).is_none() {
                self.insert_term(target, term);
            }
        }
        Some(target)
    }

    /// Add a single synonym to an existing flowable. Terms already owned by a
    /// different flowable are left where they are.
    pub fn add_term(&mut self, id: FlowableId, term: &str) -> Result<FlowableId, LciaError> {
        let id = self.checked(id)?;
        match self.get(term) {
            Some(existing) => Ok(existing),
            None => {
                self.insert_term(id, term);
                Ok(id)
            }
        }
    }

    /// Merge `other` into `dominant`: union the synonym sets and re-point
    /// every synonym of `other`. Both flowables are validated before anything
    /// is changed.
    pub fn merge(&mut self, dominant: FlowableId, other: FlowableId) -> Result<FlowableId, LciaError> {
        let dominant = self.checked(dominant)?;
        let other = self.checked(other)?;
        if dominant == other {
            return Ok(dominant);
        }

        let absorbed = std::mem::take(&mut self.flowables[other.0].synonyms);
        for term in &absorbed {
            self.index.insert(normalize_term(term), dominant);
        }
        let absorbed_name = self.flowables[other.0].name.clone();
        self.index.insert(normalize_term(&absorbed_name), dominant);

        let target = &mut self.flowables[dominant.0];
        target.synonyms.extend(absorbed);
        target.synonyms.insert(absorbed_name);
        self.flowables[other.0].merged_into = Some(dominant);
        Ok(dominant)
    }

    pub fn synonyms(&self, id: FlowableId) -> impl Iterator<Item = &str> {
        self.flowable(id)
            .into_iter()
            .flat_map(|f| f.synonyms.iter().map(|s| s.as_str()))
    }

    fn checked(&self, id: FlowableId) -> Result<FlowableId, LciaError> {
        if id.0 >= self.flowables.len() {
            return Err(LciaError::EntityNotFound(format!("flowable #{}", id.0)));
        }
        Ok(self.canonical(id))
    }

    fn insert_term(&mut self, id: FlowableId, term: &str) {
        let key = normalize_term(term);
        if key.is_empty() {
            return;
        }
        self.index.insert(key, id);
        self.flowables[id.0].synonyms.insert(term.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_flowable_from_terms() {
        let mut fm = FlowableManager::new();
        let id = fm
            .add_terms(&terms(&["Water", "7732-18-5", "H2O"]), MergeStrategy::Merge)
            .unwrap();
        assert_eq!(fm.get("water"), Some(id));
        assert_eq!(fm.get("7732185"), Some(id));
        assert_eq!(fm.get("h2o"), Some(id));
        assert_eq!(fm.name(id), Some("Water"));
    }

    #[test]
    fn test_known_term_extends_flowable() {
        let mut fm = FlowableManager::new();
        let id = fm.add_terms(&terms(&["methane"]), MergeStrategy::Merge).unwrap();
        let again = fm
            .add_terms(&terms(&["CH4", "Methane"]), MergeStrategy::Merge)
            .unwrap();
        assert_eq!(id, again);
        assert_eq!(fm.get("ch4"), Some(id));
        assert_eq!(fm.len(), 1);
    }

    #[test]
    fn test_merge_strategy_merges_matches() {
        let mut fm = FlowableManager::new();
        let a = fm.add_terms(&terms(&["carbon dioxide"]), MergeStrategy::Merge).unwrap();
        let b = fm.add_terms(&terms(&["124-38-9"]), MergeStrategy::Merge).unwrap();
        assert_ne!(a, b);

        let merged = fm
            .add_terms(&terms(&["CO2", "carbon dioxide", "124-38-9"]), MergeStrategy::Merge)
            .unwrap();
        assert_eq!(merged, a);
        assert_eq!(fm.get("124-38-9"), Some(a));
        assert_eq!(fm.get("co2"), Some(a));
        assert_eq!(fm.len(), 1);
    }

    #[test]
    fn test_prune_strategy_keeps_distinct() {
        let mut fm = FlowableManager::new();
        let a = fm.add_terms(&terms(&["nitrogen oxides"]), MergeStrategy::Prune).unwrap();
        let b = fm.add_terms(&terms(&["nitrogen dioxide"]), MergeStrategy::Prune).unwrap();
        let r = fm
            .add_terms(&terms(&["nitrogen oxides", "nitrogen dioxide", "NOx"]), MergeStrategy::Prune)
            .unwrap();
        assert_eq!(r, a);
        assert_eq!(fm.get("nitrogen dioxide"), Some(b));
        assert_eq!(fm.get("nox"), Some(a));
        assert_eq!(fm.len(), 2);
    }

    #[test]
    fn test_merge_unions_synonyms() {
        let mut fm = FlowableManager::new();
        let a = fm.add_terms(&terms(&["phosphine", "ph3"]), MergeStrategy::Merge).unwrap();
        let b = fm.add_terms(&terms(&["phosphane", "7803-51-2"]), MergeStrategy::Merge).unwrap();
        fm.merge(a, b).unwrap();
        let syns: Vec<&str> = fm.synonyms(a).collect();
        assert!(syns.contains(&"phosphane"));
        assert!(syns.contains(&"7803-51-2"));
        assert!(syns.contains(&"ph3"));
        assert_eq!(fm.get("phosphane"), Some(a));
        assert_eq!(fm.canonical(b), a);
    }

    #[test]
    fn test_merge_unknown_id_is_atomic() {
        let mut fm = FlowableManager::new();
        let a = fm.add_terms(&terms(&["ammonia"]), MergeStrategy::Merge).unwrap();
        assert!(fm.merge(a, FlowableId(42)).is_err());
        assert_eq!(fm.get("ammonia"), Some(a));
        assert_eq!(fm.synonyms(a).count(), 1);
    }

    #[test]
    fn test_empty_terms() {
        let mut fm = FlowableManager::new();
        assert!(fm.add_terms(&terms(&["", "  "]), MergeStrategy::Merge).is_none());
        assert!(fm.is_empty());
    }
}
