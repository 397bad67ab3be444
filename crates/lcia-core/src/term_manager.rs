use crate::characterization::{Characterization, QrResult};
use crate::clookup::{CLookup, StoreError};
use crate::config::EngineConfig;
use crate::context::{ContextManager, Sense};
use crate::dataset::builtin;
use crate::engine::conversion::QuantityConversion;
use crate::error::LciaError;
use crate::model::{ContextId, Flow, FlowableId, Quantity, QuantityId};
use crate::provider::EntityProvider;
use crate::quantity::QuantityManager;
use crate::terms::normalize::normalize_term;
use crate::terms::FlowableManager;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Counts of what a [`TermManager::load`] call registered, plus the records
/// it had to skip.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub origin: String,
    pub contexts: usize,
    pub quantities: usize,
    pub flowables: usize,
    pub flows: usize,
    pub characterizations: usize,
    pub failures: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owner of every registry the engine reads: quantities, contexts,
/// flowables, flows and the characterization stores.
///
/// Loading mutates it; after [`TermManager::seal`] it is read-only. Clone a
/// sealed manager to layer more data on top.
#[derive(Debug, Clone)]
pub struct TermManager {
    config: EngineConfig,
    quantities: QuantityManager,
    contexts: ContextManager,
    flowables: FlowableManager,
    flows: HashMap<String, Flow>,
    lookups: BTreeMap<(FlowableId, QuantityId), CLookup>,
    sealed: bool,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TermManager {
    /// An empty manager. Most callers want [`TermManager::bootstrap`].
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            quantities: QuantityManager::new(),
            contexts: ContextManager::new(),
            flowables: FlowableManager::new(),
            flows: HashMap::new(),
            lookups: BTreeMap::new(),
            sealed: false,
        }
    }

    /// A manager pre-loaded with the built-in reference quantities and
    /// compartments.
    pub fn bootstrap(config: EngineConfig) -> Result<Self, LciaError> {
        let mut tm = Self::new(config);
        let report = tm.load(&builtin::base_dataset()?)?;
        tracing::debug!(
            "bootstrapped {} quantities and {} contexts",
            report.quantities,
            report.contexts
        );
        Ok(tm)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// A mutable copy of a (possibly sealed) manager.
    pub fn layer(&self) -> Self {
        Self {
            sealed: false,
            ..self.clone()
        }
    }

    fn check_open(&self) -> Result<(), LciaError> {
        if self.sealed {
            return Err(LciaError::Sealed);
        }
        Ok(())
    }

    pub fn quantities(&self) -> &QuantityManager {
        &self.quantities
    }

    pub fn contexts(&self) -> &ContextManager {
        &self.contexts
    }

    pub fn flowables(&self) -> &FlowableManager {
        &self.flowables
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub fn add_quantity(&mut self, q: Quantity) -> Result<QuantityId, LciaError> {
        self.check_open()?;
        Ok(self.quantities.add_quantity(q))
    }

    /// Register a compartment path; `sense` and `elementary` apply to the
    /// innermost compartment.
    pub fn add_context<S: AsRef<str>>(
        &mut self,
        path: &[S],
        sense: Option<Sense>,
        elementary: bool,
    ) -> Result<ContextId, LciaError> {
        self.check_open()?;
        let id = self.contexts.add_path(path);
        if let Some(sense) = sense {
            self.contexts.set_sense(id, sense);
        }
        if elementary {
            self.contexts.set_elementary(id, true);
        }
        Ok(id)
    }

    pub fn add_context_synonym(&mut self, id: ContextId, term: &str) -> Result<(), LciaError> {
        self.check_open()?;
        self.contexts.add_synonym(id, term);
        Ok(())
    }

    /// Register a set of synonymous substance names.
    pub fn add_flowable(&mut self, terms: &[String]) -> Result<Option<FlowableId>, LciaError> {
        self.check_open()?;
        let id = self.flowables.add_terms(terms, self.config.merge_strategy);
        self.rehome_lookups();
        Ok(id.map(|id| self.flowables.canonical(id)))
    }

    /// Register a flow: its terms become one flowable and its compartment
    /// path is created if needed.
    pub fn add_flow(&mut self, flow: Flow) -> Result<FlowableId, LciaError> {
        self.check_open()?;
        let id = self
            .flowables
            .add_terms(&flow.flowable_terms(), self.config.merge_strategy)
            .ok_or_else(|| LciaError::EntityNotFound(format!("flow '{}' has no usable terms", flow.link())))?;
        self.rehome_lookups();
        self.contexts.add_path(&flow.context);
        self.flows.insert(normalize_term(&flow.link()), flow);
        Ok(self.flowables.canonical(id))
    }

    /// Move factors filed under flowables that have since been merged away.
    fn rehome_lookups(&mut self) {
        let stale: Vec<(FlowableId, QuantityId)> = self
            .lookups
            .keys()
            .filter(|(f, _)| self.flowables.canonical(*f) != *f)
            .copied()
            .collect();
        for key in stale {
            let Some(lookup) = self.lookups.remove(&key) else {
                continue;
            };
            let target = (self.flowables.canonical(key.0), key.1);
            let strict = self.config.strict_clookup;
            let dest = self
                .lookups
                .entry(target)
                .or_insert_with(|| new_lookup(strict));
            for cf in lookup.cfs() {
                let mut moved = cf.clone();
                moved.flowable = target.0;
                if let Err(e) = dest.add(moved) {
                    tracing::warn!("dropping characterization while merging flowables: {e:?}");
                }
            }
        }
    }

    /// Store a characterization factor and return it resolved at `locale`.
    ///
    /// A different value from the same origin at the same locale is refused
    /// unless `overwrite` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn add_characterization(
        &mut self,
        flowable: &str,
        ref_quantity: QuantityId,
        query_quantity: QuantityId,
        value: f64,
        context: ContextId,
        locale: &str,
        origin: &str,
        overwrite: bool,
    ) -> Result<QrResult, LciaError> {
        self.check_open()?;
        if !value.is_finite() {
            return Err(LciaError::DatasetInvalid(format!(
                "non-finite factor for '{flowable}'"
            )));
        }
        let fid = match self.flowables.get(flowable) {
            Some(id) => id,
            None => self
                .flowables
                .add_terms(&[flowable.to_string()], self.config.merge_strategy)
                .ok_or_else(|| LciaError::EntityNotFound(format!("flowable '{flowable}'")))?,
        };
        let rq = self.quantities.canonical(ref_quantity);
        let qq = self.quantities.canonical(query_quantity);
        let name = self.flowables.name(fid).unwrap_or(flowable).to_string();

        let quantities = &self.quantities;
        let contexts = &self.contexts;
        let strict = self.config.strict_clookup;
        let lookup = self.lookups.entry((fid, qq)).or_insert_with(|| new_lookup(strict));

        let slot = lookup.get(context);
        let existing = slot
            .iter()
            .position(|c| c.ref_quantity == rq && c.origin == origin);

        let cf = match existing {
            Some(i) => {
                if let Some(prior) = slot[i].value_at(locale) {
                    if prior != value && !overwrite {
                        return Err(LciaError::DuplicateCharacterization {
                            flowable: name,
                            locale: locale.to_string(),
                            existing: prior,
                            value,
                        });
                    }
                }
                if strict {
                    let collision = slot
                        .iter()
                        .enumerate()
                        .filter(|(j, c)| *j != i && c.ref_quantity == rq)
                        .find_map(|(_, c)| c.value_at(locale).filter(|v| *v != value));
                    if let Some(prior) = collision {
                        return Err(LciaError::FactorCollision {
                            context: contexts.name(context).to_string(),
                            existing: prior,
                            value,
                        });
                    }
                }
                let Some(slot) = lookup.get_mut(context) else {
                    return Err(LciaError::EntityNotFound(format!(
                        "context '{}'",
                        contexts.name(context)
                    )));
                };
                slot[i].set_value(locale, value);
                slot[i].clone()
            }
            None => {
                let cf = Characterization::new(fid, rq, qq, context, origin).with_value(locale, value);
                lookup.add(cf.clone()).map_err(|e| match e {
                    StoreError::QuantityMismatch { current, inbound } => LciaError::QuantityMismatch {
                        current: quantities.describe(current),
                        inbound: quantities.describe(inbound),
                    },
                    StoreError::FactorCollision {
                        context,
                        existing,
                        value,
                    } => LciaError::FactorCollision {
                        context: contexts.name(context).to_string(),
                        existing,
                        value,
                    },
                })?;
                cf
            }
        };

        cf.query(&name, locale).map_err(|e| LciaError::EntityNotFound(e.to_string()))
    }

    /// Term-based convenience over [`TermManager::add_characterization`].
    ///
    /// Unknown compartments are created; a '/'-separated term is read as a
    /// path from the root.
    pub fn characterize(
        &mut self,
        flowable: &str,
        ref_quantity: &str,
        query_quantity: &str,
        value: f64,
        context: &str,
        locale: &str,
    ) -> Result<QrResult, LciaError> {
        self.check_open()?;
        let rq = self.get_canonical(ref_quantity)?;
        let qq = self.get_canonical(query_quantity)?;
        let cx = self.context_or_create(context);
        let origin = self.config.origin.clone();
        self.add_characterization(flowable, rq, qq, value, cx, locale, &origin, false)
    }

    fn context_or_create(&mut self, term: &str) -> ContextId {
        if term.contains('/') {
            let path: Vec<&str> = term.split('/').collect();
            return self.contexts.add_path(&path);
        }
        match self.contexts.get(term) {
            Some(id) => id,
            None => self.contexts.get_or_create(term, None),
        }
    }

    /// Bulk-load reference data. Records that fail are skipped, logged and
    /// listed in the report; only a sealed manager aborts the load.
    pub fn load(&mut self, provider: &dyn EntityProvider) -> Result<LoadReport, LciaError> {
        self.check_open()?;
        let origin = provider.origin().to_string();
        let mut report = LoadReport {
            origin: origin.clone(),
            ..LoadReport::default()
        };

        for def in provider.contexts() {
            let id = self.add_context(&def.path, def.sense, def.elementary)?;
            for syn in &def.synonyms {
                self.contexts.add_synonym(id, syn);
            }
            report.contexts += 1;
        }

        for q in provider.quantities() {
            let mut q = q.clone();
            if q.origin.is_empty() {
                q.origin = origin.clone();
            }
            self.quantities.add_quantity(q);
            report.quantities += 1;
        }

        for def in provider.flowables() {
            match self.add_flowable(&def.terms()) {
                Ok(Some(_)) => report.flowables += 1,
                Ok(None) => report
                    .failures
                    .push(format!("flowable '{}' has no usable terms", def.name)),
                Err(e) => report.failures.push(e.to_string()),
            }
        }

        for flow in provider.flows() {
            let mut flow = flow.clone();
            if flow.origin.is_empty() {
                flow.origin = origin.clone();
            }
            match self.add_flow(flow) {
                Ok(_) => report.flows += 1,
                Err(e) => report.failures.push(e.to_string()),
            }
        }

        for def in provider.characterizations() {
            let resolved = self.get_canonical(&def.ref_quantity).and_then(|rq| {
                self.get_canonical(&def.query_quantity)
                    .map(|qq| (rq, qq))
            });
            let (rq, qq) = match resolved {
                Ok(pair) => pair,
                Err(e) => {
                    report
                        .failures
                        .push(format!("characterization of '{}': {}", def.flowable, e));
                    continue;
                }
            };
            let cx = self.contexts.add_path(&def.context);
            let cf_origin = def.origin.as_deref().unwrap_or(&origin);
            match self.add_characterization(
                &def.flowable,
                rq,
                qq,
                def.value,
                cx,
                &def.locale,
                cf_origin,
                def.overwrite,
            ) {
                Ok(_) => report.characterizations += 1,
                Err(e) => report
                    .failures
                    .push(format!("characterization of '{}': {}", def.flowable, e)),
            }
        }

        for failure in &report.failures {
            tracing::warn!("{}: {}", origin, failure);
        }
        tracing::info!(
            "loaded {} quantities, {} flows, {} characterizations from {}",
            report.quantities,
            report.flows,
            report.characterizations,
            origin
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn get_canonical(&self, term: &str) -> Result<QuantityId, LciaError> {
        self.quantities.get_canonical(term)
    }

    pub fn get_context(&self, term: &str) -> Option<ContextId> {
        self.contexts.get(term)
    }

    pub fn get_flowable(&self, term: &str) -> Option<FlowableId> {
        self.flowables.get(term)
    }

    /// A registered flow by link.
    pub fn get_flow(&self, link: &str) -> Option<&Flow> {
        self.flows.get(&normalize_term(link))
    }

    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    /// Factors for one flowable, optionally restricted to a query quantity
    /// and searched outward from a context. Without a context every factor
    /// is returned.
    pub fn factors_for_flowable(
        &self,
        flowable: FlowableId,
        quantity: Option<QuantityId>,
        context: Option<ContextId>,
        dist: u8,
    ) -> Result<Vec<&Characterization>, LciaError> {
        let fid = self.flowables.canonical(flowable);
        let quantity = quantity.map(|q| self.quantities.canonical(q));
        let mut out = Vec::new();
        for ((_, qq), lookup) in self
            .lookups
            .range((fid, QuantityId(0))..=(fid, QuantityId(usize::MAX)))
        {
            if quantity.is_some_and(|q| q != *qq) {
                continue;
            }
            match context {
                Some(cx) => out.extend(lookup.find(&self.contexts, cx, dist, true, None)?),
                None => out.extend(lookup.cfs()),
            }
        }
        Ok(out)
    }

    /// Factors for one query quantity across flowables.
    pub fn factors_for_quantity(
        &self,
        quantity: QuantityId,
        flowable: Option<FlowableId>,
        context: Option<ContextId>,
        dist: u8,
    ) -> Result<Vec<&Characterization>, LciaError> {
        let qq = self.quantities.canonical(quantity);
        let flowable = flowable.map(|f| self.flowables.canonical(f));
        let mut out = Vec::new();
        for ((fid, q), lookup) in &self.lookups {
            if *q != qq || flowable.is_some_and(|f| f != *fid) {
                continue;
            }
            match context {
                Some(cx) => out.extend(lookup.find(&self.contexts, cx, dist, true, None)?),
                None => out.extend(lookup.cfs()),
            }
        }
        Ok(out)
    }

    /// One-line rendering of a conversion chain, e.g.
    /// `methane; to air: 29.8 kg CO2 eq/kg [GLO] (ipcc.2021)`.
    pub fn describe_conversion(&self, conv: &QuantityConversion) -> String {
        let unit = |q: Option<QuantityId>| q.map(|q| self.quantities.unit(q)).unwrap_or("");
        format!(
            "{}; {}: {} {}/{} [{}] ({})",
            conv.flowable().unwrap_or("-"),
            self.contexts.name(conv.context()),
            conv.value(),
            unit(conv.query()),
            unit(conv.ref_quantity()),
            conv.locale(),
            conv.origin()
        )
    }
}

fn new_lookup(strict: bool) -> CLookup {
    if strict {
        CLookup::strict()
    } else {
        CLookup::new()
    }
}
