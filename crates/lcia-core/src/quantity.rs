use crate::error::LciaError;
use crate::model::{Quantity, QuantityId};
use crate::terms::normalize::normalize_term;
use std::collections::HashMap;

/// Registry of canonical quantities.
///
/// Several data sources describe "the same" quantity (mass, volume, a GWP
/// indicator). The first one registered becomes canonical; later ones that
/// share a term and have a compatible unit are kept as children, and every
/// lookup of a child resolves to the canonical entry.
#[derive(Debug, Clone, Default)]
pub struct QuantityManager {
    quantities: Vec<Quantity>,
    parents: Vec<Option<QuantityId>>,
    index: HashMap<String, QuantityId>,
}

impl QuantityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a quantity and return its canonical handle.
    ///
    /// Adding a quantity whose link is already known is a no-op.
    pub fn add_quantity(&mut self, q: Quantity) -> QuantityId {
        if let Some(&existing) = self.index.get(&normalize_term(&q.link())) {
            return self.canonical(existing);
        }

        let parent = q
            .terms()
            .iter()
            .filter_map(|t| self.index.get(&normalize_term(t)))
            .map(|&id| self.canonical(id))
            .find(|&id| self.compatible(&self.quantities[id.0], &q));

        let id = QuantityId(self.quantities.len());
        let terms = q.terms();
        self.quantities.push(q);
        self.parents.push(parent);

        for term in terms {
            let key = normalize_term(&term);
            if key.is_empty() {
                continue;
            }
            // terms already claimed stay with their first owner
            self.index.entry(key).or_insert(id);
        }

        match parent {
            Some(p) => {
                tracing::debug!(
                    "quantity {} registered as child of {}",
                    self.quantities[id.0].link(),
                    self.quantities[p.0].link()
                );
                let child_terms = self.quantities[id.0].terms();
                let canonical = &mut self.quantities[p.0];
                for term in child_terms {
                    if !canonical.terms().contains(&term) {
                        canonical.synonyms.push(term);
                    }
                }
                p
            }
            None => id,
        }
    }

    fn compatible(&self, canonical: &Quantity, q: &Quantity) -> bool {
        if canonical.is_lcia_method != q.is_lcia_method {
            return false;
        }
        canonical.reference_unit == q.reference_unit
            || canonical.knows_unit(&q.reference_unit)
            || q.knows_unit(&canonical.reference_unit)
    }

    /// Resolve any term (link, external ref, name, synonym) to the canonical
    /// quantity.
    pub fn get_canonical(&self, term: &str) -> Result<QuantityId, LciaError> {
        self.index
            .get(&normalize_term(term))
            .map(|&id| self.canonical(id))
            .ok_or_else(|| LciaError::EntityNotFound(format!("quantity '{}'", term)))
    }

    pub fn canonical(&self, id: QuantityId) -> QuantityId {
        self.parents.get(id.0).copied().flatten().unwrap_or(id)
    }

    pub fn is_canonical(&self, id: QuantityId) -> bool {
        self.canonical(id) == id
    }

    /// The quantity record stored under `id` (not resolved to canonical).
    pub fn get(&self, id: QuantityId) -> Option<&Quantity> {
        self.quantities.get(id.0)
    }

    /// Link of the quantity, or a placeholder for a stale handle.
    pub fn describe(&self, id: QuantityId) -> String {
        self.get(id)
            .map(|q| q.link())
            .unwrap_or_else(|| format!("quantity #{}", id.0))
    }

    pub fn unit(&self, id: QuantityId) -> &str {
        self.get(id).map(|q| q.reference_unit.as_str()).unwrap_or("")
    }

    pub fn is_lcia_method(&self, id: QuantityId) -> bool {
        self.get(id).map(|q| q.is_lcia_method).unwrap_or(false)
    }

    pub fn children(&self, id: QuantityId) -> Vec<QuantityId> {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == Some(id))
            .map(|(i, _)| QuantityId(i))
            .collect()
    }

    /// Canonical quantities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (QuantityId, &Quantity)> {
        self.quantities
            .iter()
            .enumerate()
            .filter(|(i, _)| self.parents[*i].is_none())
            .map(|(i, q)| (QuantityId(i), q))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
