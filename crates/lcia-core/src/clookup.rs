use crate::characterization::Characterization;
use crate::context::ContextManager;
use crate::error::LciaError;
use crate::model::{ContextId, QuantityId};
use std::collections::{BTreeMap, HashSet};

/// Why a characterization was refused by a [`CLookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store already holds factors for a different query quantity.
    QuantityMismatch {
        current: QuantityId,
        inbound: QuantityId,
    },
    /// Strict stores only: a factor in the same context with the same
    /// reference quantity already has a different value at a shared locale.
    /// An agreeing factor is absorbed into the existing record.
    FactorCollision {
        context: ContextId,
        existing: f64,
        value: f64,
    },
}

/// Characterization factors for one flowable and one query quantity, keyed
/// by context.
#[derive(Debug, Clone, Default)]
pub struct CLookup {
    entries: BTreeMap<ContextId, Vec<Characterization>>,
    quantity: Option<QuantityId>,
    strict: bool,
}

impl CLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses conflicting factors within a context.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Query quantity bound by the first characterization added.
    pub fn quantity(&self) -> Option<QuantityId> {
        self.quantity
    }

    pub fn add(&mut self, cf: Characterization) -> Result<(), StoreError> {
        match self.quantity {
            Some(q) if q != cf.query_quantity => {
                return Err(StoreError::QuantityMismatch {
                    current: q,
                    inbound: cf.query_quantity,
                })
            }
            _ => {}
        }

        let slot = self.entries.entry(cf.context).or_default();
        if slot.contains(&cf) {
            return Ok(());
        }
        if self.strict {
            for existing in slot.iter().filter(|c| c.ref_quantity == cf.ref_quantity) {
                for (locale, value) in cf.values() {
                    if let Some(prior) = existing.value_at(locale) {
                        if prior != value {
                            return Err(StoreError::FactorCollision {
                                context: cf.context,
                                existing: prior,
                                value,
                            });
                        }
                    }
                }
            }
            // one record per ref quantity; agreeing factors from another
            // origin only contribute locales the record lacks
            if let Some(existing) = slot.iter_mut().find(|c| c.ref_quantity == cf.ref_quantity) {
                for (locale, value) in cf.values() {
                    if existing.value_at(locale).is_none() {
                        existing.set_value(locale, value);
                    }
                }
                return Ok(());
            }
        }

        self.quantity = Some(cf.query_quantity);
        slot.push(cf);
        Ok(())
    }

    /// Characterizations stored exactly at `cx`.
    pub fn get(&self, cx: ContextId) -> &[Characterization] {
        self.entries.get(&cx).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn get_mut(&mut self, cx: ContextId) -> Option<&mut Vec<Characterization>> {
        self.entries.get_mut(&cx)
    }

    /// Search outward from `cx`.
    ///
    /// - dist 0: `cx` only
    /// - dist 1: plus every subcompartment, depth-first
    /// - dist 2: plus the immediate parent (NULL for a root)
    /// - dist 3: plus every ancestor up to the root, then NULL
    ///
    /// With `return_first`, stops at the first level that yields anything.
    pub fn find(
        &self,
        contexts: &ContextManager,
        cx: ContextId,
        dist: u8,
        return_first: bool,
        origin: Option<&str>,
    ) -> Result<Vec<&Characterization>, LciaError> {
        let mut results = self.matching(cx, origin);
        if return_first && !results.is_empty() {
            return Ok(results);
        }

        if dist > 0 && !cx.is_null() {
            for sub in contexts.self_and_subcompartments(cx)?.into_iter().skip(1) {
                results.extend(self.matching(sub, origin));
                if return_first && !results.is_empty() {
                    return Ok(results);
                }
            }
        }

        if dist > 1 {
            let mut visited = HashSet::from([cx]);
            let mut current = cx;
            while let Some(parent) = parent_or_null(contexts, current) {
                if !visited.insert(parent) {
                    return Err(LciaError::ContextCycle(contexts.name(parent).to_string()));
                }
                results.extend(self.matching(parent, origin));
                if (return_first && !results.is_empty()) || dist < 3 {
                    break;
                }
                current = parent;
            }
        }

        Ok(results)
    }

    fn matching(&self, cx: ContextId, origin: Option<&str>) -> Vec<&Characterization> {
        self.get(cx)
            .iter()
            .filter(|cf| origin.map(|o| cf.origin == o).unwrap_or(true))
            .collect()
    }

    pub fn cfs(&self) -> impl Iterator<Item = &Characterization> {
        self.entries.values().flatten()
    }

    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(cx, _)| *cx)
    }

    /// Drop a characterization. Returns whether anything was removed.
    pub fn remove(&mut self, cf: &Characterization) -> bool {
        let Some(slot) = self.entries.get_mut(&cf.context) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|c| c != cf);
        before != slot.len()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The NULL context has no parent; a root's parent is NULL.
fn parent_or_null(contexts: &ContextManager, cx: ContextId) -> Option<ContextId> {
    if cx.is_null() {
        return None;
    }
    Some(contexts.parent(cx).unwrap_or(ContextId::NULL))
}
