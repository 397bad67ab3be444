use crate::error::LciaError;
use crate::model::ContextId;
use crate::terms::normalize::{is_null_term, normalize_term};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Direction of a compartment relative to the technosphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// Resources are drawn from it.
    Source,
    /// Emissions are released into it.
    Sink,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Source => write!(f, "Source"),
            Sense::Sink => write!(f, "Sink"),
        }
    }
}

/// A node in the compartment hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct Context {
    pub name: String,
    pub parent: Option<ContextId>,
    pub sense: Option<Sense>,
    /// Marked elementary itself; see [`ContextManager::is_elementary`] for
    /// the inherited value.
    pub elementary: bool,
    pub children: Vec<ContextId>,
    pub synonyms: BTreeSet<String>,
}

impl Context {
    fn new(name: &str, parent: Option<ContextId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            sense: None,
            elementary: false,
            children: Vec::new(),
            synonyms: BTreeSet::new(),
        }
    }
}

/// Arena of contexts plus a term index.
#[derive(Debug, Clone)]
pub struct ContextManager {
    contexts: Vec<Context>,
    index: HashMap<String, ContextId>,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self {
            contexts: vec![Context::new("none", None)],
            index: HashMap::new(),
        }
    }
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(id.0)
    }

    pub fn name(&self, id: ContextId) -> &str {
        self.contexts
            .get(id.0)
            .map(|c| c.name.as_str())
            .unwrap_or("none")
    }

    /// All contexts except the null context, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ContextId, &Context)> {
        self.contexts
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| (ContextId(i), c))
    }

    pub fn len(&self) -> usize {
        self.contexts.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-level contexts (no parent).
    pub fn roots(&self) -> Vec<ContextId> {
        self.iter()
            .filter(|(_, c)| c.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Return the context called `name`, creating it under `parent` if it
    /// does not exist yet. The parent of an existing context is never changed.
    pub fn get_or_create(&mut self, name: &str, parent: Option<ContextId>) -> ContextId {
        if is_null_term(name) {
            return ContextId::NULL;
        }
        if let Some(&id) = self.index.get(&normalize_term(name)) {
            return id;
        }

        let parent = parent.filter(|p| !p.is_null() && p.0 < self.contexts.len());
        let id = ContextId(self.contexts.len());
        self.contexts.push(Context::new(name.trim(), parent));
        self.index.insert(normalize_term(name), id);
        if let Some(p) = parent {
            self.contexts[p.0].children.push(id);
        }
        id
    }

    /// Create (or find) a chain of contexts, each the parent of the next.
    /// Returns the innermost context.
    pub fn add_path<S: AsRef<str>>(&mut self, path: &[S]) -> ContextId {
        let mut current: Option<ContextId> = None;
        for segment in path {
            let segment = segment.as_ref();
            if is_null_term(segment) {
                continue;
            }
            current = Some(self.get_or_create(segment, current));
        }
        current.unwrap_or(ContextId::NULL)
    }

    pub fn add_synonym(&mut self, id: ContextId, term: &str) {
        if id.is_null() || id.0 >= self.contexts.len() {
            return;
        }
        let key = normalize_term(term);
        if key.is_empty() || self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key, id);
        self.contexts[id.0].synonyms.insert(term.trim().to_string());
    }

    pub fn set_sense(&mut self, id: ContextId, sense: Sense) {
        if id.is_null() {
            return;
        }
        if let Some(c) = self.contexts.get_mut(id.0) {
            c.sense = Some(sense);
        }
    }

    pub fn set_elementary(&mut self, id: ContextId, elementary: bool) {
        if id.is_null() {
            return;
        }
        if let Some(c) = self.contexts.get_mut(id.0) {
            c.elementary = elementary;
        }
    }

    /// Resolve a term to a context. Null terms resolve to the null context;
    /// path-like terms ("emissions/to air") fall back to their last
    /// recognized segment. Unknown terms give `None`.
    pub fn get(&self, term: &str) -> Option<ContextId> {
        if is_null_term(term) {
            return Some(ContextId::NULL);
        }
        if let Some(&id) = self.index.get(&normalize_term(term)) {
            return Some(id);
        }
        term.split(['/', ';'])
            .rev()
            .filter(|s| !s.trim().is_empty())
            .find_map(|s| self.index.get(&normalize_term(s)).copied())
    }

    /// Resolve a compartment path, innermost segment first.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<ContextId> {
        if path.iter().all(|s| is_null_term(s.as_ref())) {
            return Some(ContextId::NULL);
        }
        path.iter()
            .rev()
            .find_map(|s| self.index.get(&normalize_term(s.as_ref())).copied())
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.contexts.get(id.0).and_then(|c| c.parent)
    }

    /// The context, its parent, its parent's parent, ... up to the root.
    pub fn parent_chain(&self, id: ContextId) -> Result<Vec<ContextId>, LciaError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(cx) = current {
            if !seen.insert(cx) {
                return Err(LciaError::ContextCycle(self.name(cx).to_string()));
            }
            chain.push(cx);
            current = self.parent(cx);
        }
        Ok(chain)
    }

    /// Depth-first traversal of the context and all of its descendants,
    /// starting with the context itself.
    pub fn self_and_subcompartments(&self, id: ContextId) -> Result<Vec<ContextId>, LciaError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(cx) = stack.pop() {
            if !seen.insert(cx) {
                return Err(LciaError::ContextCycle(self.name(cx).to_string()));
            }
            out.push(cx);
            if let Some(c) = self.contexts.get(cx.0) {
                // reversed so the first child is visited first
                stack.extend(c.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Own sense, else the nearest ancestor's.
    pub fn sense(&self, id: ContextId) -> Option<Sense> {
        let chain = self.parent_chain(id).ok()?;
        chain
            .iter()
            .find_map(|cx| self.contexts.get(cx.0).and_then(|c| c.sense))
    }

    /// Elementary if the context or any ancestor is marked elementary.
    pub fn is_elementary(&self, id: ContextId) -> bool {
        if id.is_null() {
            return false;
        }
        match self.parent_chain(id) {
            Ok(chain) => chain
                .iter()
                .any(|cx| self.contexts.get(cx.0).map(|c| c.elementary).unwrap_or(false)),
            Err(_) => false,
        }
    }

    /// Path from the root down to the context.
    pub fn path(&self, id: ContextId) -> Vec<String> {
        let mut chain = self.parent_chain(id).unwrap_or_default();
        chain.reverse();
        chain
            .into_iter()
            .filter(|cx| !cx.is_null())
            .map(|cx| self.name(cx).to_string())
            .collect()
    }
}
