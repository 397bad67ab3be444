pub mod conversion;

use crate::characterization::{Characterization, QrResult};
use crate::config::{QueryOptions, Strategy};
use crate::error::LciaError;
use crate::model::{ContextId, Flow, FlowRef, FlowableId, QuantityId};
use crate::term_manager::TermManager;
use conversion::{ConversionError, Conversions, QuantityConversion, QuantityConversionError};
use std::collections::BTreeSet;

fn hierarchy_error(e: LciaError) -> ConversionError {
    match e {
        LciaError::ContextCycle(name) => ConversionError::Hierarchy(name),
        other => ConversionError::Hierarchy(other.to_string()),
    }
}

/// A flow argument after resolution against the term manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFlow {
    pub flowable: String,
    pub flowable_id: Option<FlowableId>,
    pub ref_quantity: QuantityId,
    /// `None` when neither the caller nor the flow names a context; such a
    /// flow matches factors in every context.
    pub context: Option<ContextId>,
}

impl ResolvedFlow {
    /// Context recorded on results built for this flow.
    pub fn context_id(&self) -> ContextId {
        self.context.unwrap_or(ContextId::NULL)
    }

    /// Query context for a chain starting at `cf`: the flow's own, or the
    /// factor's when the flow has none.
    fn query_context(&self, cf: &Characterization) -> ContextId {
        self.context.unwrap_or(cf.context)
    }
}

/// Outcome of a factor lookup for one exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum CfLookup {
    Found(QuantityConversion),
    /// A factor exists but could not be carried to the flow's reference
    /// quantity.
    Mismatch(QuantityConversionError),
    /// Biogenic CO2 under a method that counts it as zero.
    QuelledCo2,
    NotFound,
}

enum Selection {
    Best(QuantityConversion),
    Mismatch(QuantityConversionError),
    Nothing,
}

/// Finds chains of characterization factors and unit conversions linking a
/// flow's reference quantity to a query quantity.
pub struct QuantityEngine<'a> {
    tm: &'a TermManager,
}

impl<'a> QuantityEngine<'a> {
    pub fn new(tm: &'a TermManager) -> Self {
        Self { tm }
    }

    pub fn term_manager(&self) -> &'a TermManager {
        self.tm
    }

    /// Resolve a flow argument once, at the boundary.
    ///
    /// An explicit `ref_quantity` or `context` overrides the flow's own. A
    /// context term that cannot be resolved becomes the null context; no
    /// context at all leaves it unset.
    pub fn resolve_flow(
        &self,
        flow: FlowRef<'_>,
        ref_quantity: Option<&str>,
        context: Option<&str>,
    ) -> Result<ResolvedFlow, LciaError> {
        let flow = match flow {
            FlowRef::Link(link) => match self.tm.get_flow(link) {
                Some(f) => FlowRef::Flow(f),
                None => FlowRef::Flowable(link),
            },
            other => other,
        };

        let (flowable, flowable_id, ref_term, own_context) = match flow {
            FlowRef::Flow(f) => (
                f.name.clone(),
                self.flowable_of(f),
                Some(ref_quantity.unwrap_or(&f.reference_quantity)),
                (!f.context.is_empty())
                    .then(|| self.tm.contexts().get_path(&f.context).unwrap_or(ContextId::NULL)),
            ),
            FlowRef::Flowable(term) | FlowRef::Link(term) => (
                term.to_string(),
                self.tm.get_flowable(term),
                ref_quantity,
                None,
            ),
        };

        let ref_term = ref_term.ok_or_else(|| LciaError::RefQuantityRequired(flowable.clone()))?;
        let ref_quantity = self.tm.get_canonical(ref_term)?;
        let context = match context {
            Some(term) => Some(self.tm.get_context(term).unwrap_or(ContextId::NULL)),
            None => own_context,
        };

        Ok(ResolvedFlow {
            flowable,
            flowable_id,
            ref_quantity,
            context,
        })
    }

    fn flowable_of(&self, flow: &Flow) -> Option<FlowableId> {
        self.tm
            .get_flowable(&flow.link())
            .or_else(|| flow.flowable_terms().iter().find_map(|t| self.tm.get_flowable(t)))
    }

    // ------------------------------------------------------------------
    // Reference quantity search
    // ------------------------------------------------------------------

    /// Direct unit conversion between two non-LCIA quantities. The result
    /// gives the amount of `found` per unit of `target`.
    fn try_convert(
        &self,
        flowable: &str,
        target: QuantityId,
        found: QuantityId,
        cx: ContextId,
        locale: &str,
    ) -> Option<QrResult> {
        let quantities = self.tm.quantities();
        let q_found = quantities.get(found)?;
        let q_target = quantities.get(target)?;
        if q_found.is_lcia_method || q_target.is_lcia_method {
            return None;
        }

        let (value, origin) = match q_found.convert(Some(&q_target.reference_unit), None) {
            Some(v) => (v, &q_found.origin),
            None => (
                q_target.convert(None, Some(&q_found.reference_unit))?,
                &q_target.origin,
            ),
        };
        Some(QrResult {
            flowable: flowable.to_string(),
            ref_quantity: target,
            query_quantity: found,
            context: cx,
            locale: locale.to_string(),
            origin: origin.clone(),
            value,
        })
    }

    /// Extend `conv` until its ref quantity is `target`.
    ///
    /// Tries, in order: nothing to do, a direct unit conversion, forward
    /// factors (depth-first, first success wins), then a single reverse
    /// search whose result is inverted and spliced on.
    #[allow(clippy::too_many_arguments)]
    pub fn ref_qty_conversion(
        &self,
        target: QuantityId,
        flowable: &str,
        flowable_id: Option<FlowableId>,
        cx: Option<ContextId>,
        conv: QuantityConversion,
        locale: &str,
        allow_reverse: bool,
    ) -> Result<QuantityConversion, ConversionError> {
        let found = conv.ref_quantity().ok_or_else(|| {
            ConversionError::ReferenceMismatch(format!("empty conversion for '{flowable}'"))
        })?;
        if found == target {
            return Ok(conv);
        }

        let cx_id = cx.unwrap_or(ContextId::NULL);
        if let Some(qrr) = self.try_convert(flowable, target, found, cx_id, locale) {
            let mut next = conv;
            next.push(qrr)?;
            return Ok(next);
        }

        let mut locales: BTreeSet<String> = BTreeSet::new();

        if let Some(fid) = flowable_id {
            let cfs = self
                .tm
                .factors_for_flowable(fid, Some(found), cx, 3)
                .map_err(hierarchy_error)?;
            for cf in cfs.into_iter().filter(|cf| !conv.seen(cf.ref_quantity)) {
                match cf.query(flowable, locale) {
                    Ok(qrr) => {
                        let mut next = conv.clone();
                        if next.push(qrr).is_err() {
                            continue;
                        }
                        tracing::debug!(
                            "{}: trying {} -> {}",
                            flowable,
                            self.tm.quantities().describe(found),
                            self.tm.quantities().describe(cf.ref_quantity)
                        );
                        match self.ref_qty_conversion(target, flowable, flowable_id, cx, next, locale, allow_reverse) {
                            Ok(done) => return Ok(done),
                            Err(ConversionError::LocaleMismatch(l)) => locales.extend(l),
                            Err(ConversionError::Hierarchy(e)) => return Err(ConversionError::Hierarchy(e)),
                            Err(ConversionError::ReferenceMismatch(_)) => {}
                        }
                    }
                    Err(ConversionError::LocaleMismatch(l)) => locales.extend(l),
                    Err(_) => {}
                }
            }
        }

        if allow_reverse {
            let stub = QuantityConversion::new(target, cx_id);
            match self.ref_qty_conversion(found, flowable, flowable_id, cx, stub, locale, false) {
                Ok(reverse) => match reverse.invert() {
                    Some(inverse) => {
                        let mut next = conv.clone();
                        let spliced = inverse
                            .results()
                            .iter()
                            .try_for_each(|r| next.push(r.clone()));
                        if spliced.is_ok() && next.ref_quantity() == Some(target) {
                            tracing::debug!("{}: reverse conversion found", flowable);
                            return Ok(next);
                        }
                    }
                    None => tracing::debug!("{}: reverse route crosses a zero factor", flowable),
                },
                Err(ConversionError::LocaleMismatch(l)) => locales.extend(l),
                Err(ConversionError::Hierarchy(e)) => return Err(ConversionError::Hierarchy(e)),
                Err(ConversionError::ReferenceMismatch(_)) => {}
            }
        }

        if !locales.is_empty() {
            return Err(ConversionError::LocaleMismatch(locales.into_iter().collect()));
        }
        Err(ConversionError::ReferenceMismatch(format!(
            "{}: no path from {} to {}",
            flowable,
            self.tm.quantities().describe(found),
            self.tm.quantities().describe(target)
        )))
    }

    // ------------------------------------------------------------------
    // Query quantity search
    // ------------------------------------------------------------------

    fn identity(&self, rf: &ResolvedFlow, qq: QuantityId, locale: &str) -> QuantityConversion {
        let origin = self
            .tm
            .quantities()
            .get(qq)
            .map(|q| q.origin.clone())
            .unwrap_or_default();
        QuantityConversion::from_result(
            QrResult {
                flowable: rf.flowable.clone(),
                ref_quantity: qq,
                query_quantity: qq,
                context: rf.context_id(),
                locale: locale.to_string(),
                origin,
                value: 1.0,
            },
            rf.context_id(),
        )
    }

    fn null_result(&self, rf: &ResolvedFlow, qq: QuantityId, locale: &str) -> QuantityConversion {
        QuantityConversion::null(
            QrResult {
                flowable: rf.flowable.clone(),
                ref_quantity: rf.ref_quantity,
                query_quantity: qq,
                context: rf.context_id(),
                locale: locale.to_string(),
                origin: self.tm.config().origin.clone(),
                value: 0.0,
            },
            rf.context_id(),
        )
    }

    /// Run a reference search and file the outcome into `out`.
    fn complete(
        &self,
        rf: &ResolvedFlow,
        start: QuantityConversion,
        locale: &str,
        out: &mut Conversions,
    ) -> Result<(), LciaError> {
        let search = |conv: QuantityConversion, locale: &str| {
            self.ref_qty_conversion(
                rf.ref_quantity,
                &rf.flowable,
                rf.flowable_id,
                rf.context,
                conv,
                locale,
                true,
            )
        };
        match search(start.clone(), locale) {
            Ok(conv) => out.valid.push(conv),
            Err(ConversionError::ReferenceMismatch(_)) => out
                .mismatched
                .push(QuantityConversionError::new(start, rf.ref_quantity)),
            Err(ConversionError::LocaleMismatch(locales)) => {
                for loc in locales {
                    if let Ok(conv) = search(start.clone(), &loc) {
                        out.geographic_proxy.push(conv);
                    }
                }
            }
            Err(ConversionError::Hierarchy(e)) => return Err(LciaError::ContextCycle(e)),
        }
        Ok(())
    }

    /// Every conversion from the flow's reference quantity to `qq`. Fails
    /// with `NoFactorsFound` when nothing at all turns up.
    fn quantity_engine(
        &self,
        rf: &ResolvedFlow,
        qq: QuantityId,
        options: &QueryOptions,
    ) -> Result<Conversions, LciaError> {
        let locale = options.locale.as_str();
        let mut out = Conversions::default();

        if !self.tm.quantities().is_lcia_method(qq) {
            let stub = QuantityConversion::new(qq, rf.context_id());
            self.complete(rf, stub, locale, &mut out)?;
            if let Some(last) = out.mismatched.last_mut() {
                // an empty stub carries no flowable; record the query itself
                last.conversion = self.identity(rf, qq, locale);
            }
        } else if let Some(fid) = rf.flowable_id {
            let cfs = self
                .tm
                .factors_for_flowable(fid, Some(qq), rf.context, options.dist)?;
            for cf in cfs {
                match cf.query(&rf.flowable, locale) {
                    Ok(qrr) => {
                        let start = QuantityConversion::from_result(qrr, rf.query_context(cf));
                        self.complete(rf, start, locale, &mut out)?;
                    }
                    Err(ConversionError::LocaleMismatch(locales)) => {
                        for loc in locales {
                            let Ok(qrr) = cf.query(&rf.flowable, &loc) else {
                                continue;
                            };
                            let start = QuantityConversion::from_result(qrr, rf.query_context(cf));
                            let mut proxy = Conversions::default();
                            self.complete(rf, start, &loc, &mut proxy)?;
                            out.geographic_proxy.extend(proxy.valid);
                            out.geographic_proxy.extend(proxy.geographic_proxy);
                        }
                    }
                    Err(_) => {}
                }
            }
        }

        if out.is_empty() {
            return Err(LciaError::NoFactorsFound {
                flowable: rf.flowable.clone(),
                quantity: self.tm.quantities().describe(qq),
            });
        }

        if out.valid.len() > 1 {
            let (exact, other): (Vec<_>, Vec<_>) = out.valid.into_iter().partition(|c| {
                c.results()
                    .first()
                    .map(|r| r.locale == locale)
                    .unwrap_or(true)
            });
            out.valid = exact;
            out.geographic_proxy.extend(other);
        }
        Ok(out)
    }

    /// All conversions of `flow` into `query_quantity`, sorted into valid,
    /// proxy and mismatched results.
    ///
    /// When nothing is found the valid list holds a single null placeholder.
    pub fn quantity_conversions(
        &self,
        flow: FlowRef<'_>,
        query_quantity: &str,
        ref_quantity: Option<&str>,
        context: Option<&str>,
        options: &QueryOptions,
    ) -> Result<Conversions, LciaError> {
        let rf = self.resolve_flow(flow, ref_quantity, context)?;
        let qq = self.tm.get_canonical(query_quantity)?;
        if qq == rf.ref_quantity {
            return Ok(Conversions {
                valid: vec![self.identity(&rf, qq, &options.locale)],
                ..Conversions::default()
            });
        }
        match self.quantity_engine(&rf, qq, options) {
            Ok(c) => Ok(c),
            Err(LciaError::NoFactorsFound { .. }) => Ok(Conversions {
                valid: vec![self.null_result(&rf, qq, &options.locale)],
                ..Conversions::default()
            }),
            Err(e) => Err(e),
        }
    }

    fn select(&self, found: Conversions, options: &QueryOptions) -> Selection {
        let mut valid = found.valid;
        if valid.is_empty() && !found.geographic_proxy.is_empty() {
            if options.allow_proxy {
                valid = found.geographic_proxy;
            } else {
                let locales: BTreeSet<String> =
                    found.geographic_proxy.iter().map(|c| c.locale()).collect();
                tracing::info!(
                    "no factors at {}; proxies available for {}",
                    options.locale,
                    locales.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
        }

        let best = match options.strategy {
            Strategy::First => valid.into_iter().next(),
            // ties keep the earliest candidate
            Strategy::Highest => valid
                .into_iter()
                .reduce(|best, c| if c.value() > best.value() { c } else { best }),
            Strategy::Lowest => valid
                .into_iter()
                .reduce(|best, c| if c.value() < best.value() { c } else { best }),
        };
        match best {
            Some(conv) => Selection::Best(conv),
            None => match found.mismatched.into_iter().next() {
                Some(err) => Selection::Mismatch(err),
                None => Selection::Nothing,
            },
        }
    }

    /// The single conversion of `flow` into `query_quantity` picked by
    /// `options.strategy`.
    pub fn quantity_relation(
        &self,
        flow: FlowRef<'_>,
        ref_quantity: Option<&str>,
        query_quantity: &str,
        context: Option<&str>,
        options: &QueryOptions,
    ) -> Result<QuantityConversion, LciaError> {
        let rf = self.resolve_flow(flow, ref_quantity, context)?;
        let qq = self.tm.get_canonical(query_quantity)?;
        if qq == rf.ref_quantity {
            return Ok(self.identity(&rf, qq, &options.locale));
        }
        let found = match self.quantity_engine(&rf, qq, options) {
            Ok(c) => c,
            Err(LciaError::NoFactorsFound { .. }) => Conversions::default(),
            Err(e) => return Err(e),
        };
        match self.select(found, options) {
            Selection::Best(conv) => Ok(conv),
            Selection::Mismatch(err) => Err(LciaError::ConversionReferenceMismatch {
                flowable: rf.flowable,
                from: self
                    .tm
                    .quantities()
                    .describe(err.reached().unwrap_or(qq)),
                to: self.tm.quantities().describe(rf.ref_quantity),
            }),
            Selection::Nothing => Err(LciaError::NoFactorsFound {
                flowable: rf.flowable,
                quantity: self.tm.quantities().describe(qq),
            }),
        }
    }

    /// The factor value alone. Missing data and unreachable reference
    /// quantities both give 0.0.
    pub fn cf(
        &self,
        flow: FlowRef<'_>,
        query_quantity: &str,
        ref_quantity: Option<&str>,
        context: Option<&str>,
        options: &QueryOptions,
    ) -> Result<f64, LciaError> {
        match self.quantity_relation(flow, ref_quantity, query_quantity, context, options) {
            Ok(conv) => Ok(conv.value()),
            Err(LciaError::ConversionReferenceMismatch { .. } | LciaError::NoFactorsFound { .. }) => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    /// Factor lookup for one inventory flow. Never fails; unresolvable flows
    /// come back as `NotFound`.
    pub fn lookup_cf(
        &self,
        flow: &Flow,
        quantity: QuantityId,
        context: Option<&str>,
        options: &QueryOptions,
    ) -> CfLookup {
        let qq = self.tm.quantities().canonical(quantity);
        let quells = self
            .tm
            .quantities()
            .get(qq)
            .map(|q| q.quell_biogenic_co2)
            .unwrap_or(false);
        if quells && flow.is_biogenic_co2() {
            return CfLookup::QuelledCo2;
        }

        let rf = match self.resolve_flow(FlowRef::Flow(flow), None, context) {
            Ok(rf) => rf,
            Err(e) => {
                tracing::debug!("{}: {}", flow.link(), e);
                return CfLookup::NotFound;
            }
        };
        if qq == rf.ref_quantity {
            return CfLookup::Found(self.identity(&rf, qq, &options.locale));
        }
        let found = match self.quantity_engine(&rf, qq, options) {
            Ok(c) => c,
            Err(LciaError::NoFactorsFound { .. }) => return CfLookup::NotFound,
            Err(e) => {
                tracing::warn!("{}: {}", flow.link(), e);
                return CfLookup::NotFound;
            }
        };
        match self.select(found, options) {
            Selection::Best(conv) => CfLookup::Found(conv),
            Selection::Mismatch(err) => CfLookup::Mismatch(err),
            Selection::Nothing => CfLookup::NotFound,
        }
    }

    /// Every factor known for a flow in its context, each carried to the
    /// flow's reference quantity where possible.
    pub fn profile(
        &self,
        flow: FlowRef<'_>,
        ref_quantity: Option<&str>,
        context: Option<&str>,
        options: &QueryOptions,
    ) -> Result<Vec<QuantityConversion>, LciaError> {
        let rf = self.resolve_flow(flow, ref_quantity, context)?;
        let Some(fid) = rf.flowable_id else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for cf in self
            .tm
            .factors_for_flowable(fid, None, rf.context, options.dist)?
        {
            let Ok(qrr) = cf.query(&rf.flowable, &options.locale) else {
                continue;
            };
            let start = QuantityConversion::from_result(qrr, rf.query_context(cf));
            match self.ref_qty_conversion(
                rf.ref_quantity,
                &rf.flowable,
                rf.flowable_id,
                rf.context,
                start,
                &options.locale,
                true,
            ) {
                Ok(conv) => out.push(conv),
                Err(ConversionError::Hierarchy(e)) => return Err(LciaError::ContextCycle(e)),
                Err(_) => {}
            }
        }
        Ok(out)
    }

    /// Normalisation factor of `quantity` for `region`; see [`Quantity::norm`].
    ///
    /// [`Quantity::norm`]: crate::model::Quantity::norm
    pub fn norm(&self, quantity: &str, region: Option<&str>) -> Result<f64, LciaError> {
        let qq = self.tm.get_canonical(quantity)?;
        Ok(self
            .tm
            .quantities()
            .get(qq)
            .map(|q| q.norm(region))
            .unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dataset::builtin::load_preset;
    use crate::model::Quantity;
    use approx::assert_relative_eq;

    fn tm() -> TermManager {
        let mut tm = TermManager::bootstrap(EngineConfig::default()).unwrap();
        tm.add_quantity(Quantity::new("test", "gwp", "Global warming", "kg CO2 eq").lcia_method("cc"))
            .unwrap();
        tm
    }

    fn opts() -> QueryOptions {
        QueryOptions::default()
    }

    #[test]
    fn test_identity_without_lookup() {
        let tm = tm();
        let engine = QuantityEngine::new(&tm);
        let conv = engine
            .quantity_relation(FlowRef::Flowable("unobtainium"), Some("mass"), "Mass", None, &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 1.0);
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_unit_conversion_between_quantities() {
        let mut tm = tm();
        tm.add_quantity(Quantity::new("test", "energy", "Electric energy", "kWh"))
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        // one kWh of electricity is 3.6 MJ of net calorific value
        let conv = engine
            .quantity_relation(
                FlowRef::Flowable("electricity"),
                Some("energy"),
                "ncv",
                None,
                &opts(),
            )
            .unwrap();
        assert_relative_eq!(conv.value(), 3.6, max_relative = 1e-9);
    }

    #[test]
    fn test_ref_quantity_required() {
        let tm = tm();
        let engine = QuantityEngine::new(&tm);
        assert!(matches!(
            engine.quantity_relation(FlowRef::Flowable("water"), None, "mass", None, &opts()),
            Err(LciaError::RefQuantityRequired(_))
        ));
    }

    #[test]
    fn test_forward_chain_through_density() {
        let mut tm = tm();
        tm.characterize("diesel", "mass", "volume", 0.00119, "none", "GLO")
            .unwrap();
        tm.characterize("diesel", "volume", "ncv", 36000.0, "none", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        // per kg of diesel: 0.00119 m3, times 36000 MJ/m3
        let conv = engine
            .quantity_relation(FlowRef::Flowable("diesel"), Some("mass"), "ncv", None, &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 42.84, max_relative = 1e-9);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.results()[0].ref_quantity, conv.results()[1].query_quantity);
    }

    #[test]
    fn test_reverse_search() {
        let mut tm = tm();
        // factor stated as kg per m3; asking for m3 per kg needs the inverse
        tm.characterize("water", "volume", "mass", 1000.0, "none", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let conv = engine
            .quantity_relation(FlowRef::Flowable("water"), Some("mass"), "volume", None, &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 0.001);
        for pair in conv.results().windows(2) {
            assert_eq!(pair[0].ref_quantity, pair[1].query_quantity);
        }
    }

    #[test]
    fn test_mismatch_collapses_to_zero() {
        let mut tm = tm();
        tm.characterize("methane", "volume", "gwp", 20.0, "to air", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let err = engine
            .quantity_relation(FlowRef::Flowable("methane"), Some("items"), "gwp", Some("to air"), &opts())
            .unwrap_err();
        assert!(matches!(err, LciaError::ConversionReferenceMismatch { .. }));
        let v = engine
            .cf(FlowRef::Flowable("methane"), "gwp", Some("items"), Some("to air"), &opts())
            .unwrap();
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_no_factors() {
        let tm = tm();
        let engine = QuantityEngine::new(&tm);
        let err = engine
            .quantity_relation(FlowRef::Flowable("argon"), Some("mass"), "gwp", None, &opts())
            .unwrap_err();
        assert!(matches!(err, LciaError::NoFactorsFound { .. }));

        let all = engine
            .quantity_conversions(FlowRef::Flowable("argon"), "gwp", Some("mass"), None, &opts())
            .unwrap();
        assert_eq!(all.valid.len(), 1);
        assert!(all.valid[0].is_null());
        assert_eq!(all.valid[0].value(), 0.0);
    }

    #[test]
    fn test_strategies() {
        let config = EngineConfig {
            strict_clookup: false,
            ..EngineConfig::default()
        };
        let mut tm = TermManager::bootstrap(config).unwrap();
        let gwp = tm
            .add_quantity(Quantity::new("test", "gwp", "Global warming", "kg CO2 eq").lcia_method("cc"))
            .unwrap();
        let mass = tm.get_canonical("mass").unwrap();
        let air = tm.get_context("to air").unwrap();
        tm.add_characterization("methane", mass, gwp, 28.0, air, "GLO", "a", false)
            .unwrap();
        tm.add_characterization("methane", mass, gwp, 34.0, air, "GLO", "b", false)
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("methane");

        let high = engine
            .quantity_relation(flow, Some("mass"), "gwp", Some("to air"), &opts())
            .unwrap();
        assert_relative_eq!(high.value(), 34.0);

        let low = opts().with_strategy(Strategy::Lowest);
        let low = engine
            .quantity_relation(flow, Some("mass"), "gwp", Some("to air"), &low)
            .unwrap();
        assert_relative_eq!(low.value(), 28.0);

        let first = opts().with_strategy(Strategy::First);
        let first = engine
            .quantity_relation(flow, Some("mass"), "gwp", Some("to air"), &first)
            .unwrap();
        assert_relative_eq!(first.value(), 28.0);
    }

    #[test]
    fn test_locale_proxy() {
        let mut tm = tm();
        tm.characterize("methane", "mass", "gwp", 30.0, "to air", "US")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("methane");

        let all = engine
            .quantity_conversions(flow, "gwp", Some("mass"), Some("to air"), &opts())
            .unwrap();
        assert!(all.valid.is_empty());
        assert_eq!(all.geographic_proxy.len(), 1);
        assert_eq!(all.geographic_proxy[0].locale(), "US");

        let conv = engine
            .quantity_relation(flow, Some("mass"), "gwp", Some("to air"), &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 30.0);

        let strict = QueryOptions {
            allow_proxy: false,
            ..opts()
        };
        assert!(matches!(
            engine.quantity_relation(flow, Some("mass"), "gwp", Some("to air"), &strict),
            Err(LciaError::NoFactorsFound { .. })
        ));
    }

    #[test]
    fn test_other_locales_demoted() {
        let mut tm = tm();
        let gwp = tm.get_canonical("gwp").unwrap();
        let mass = tm.get_canonical("mass").unwrap();
        let air = tm.get_context("to air").unwrap();
        tm.add_characterization("methane", mass, gwp, 32.0, air, "US", "a", false)
            .unwrap();
        tm.add_characterization("methane", mass, gwp, 28.0, air, "GLO", "b", false)
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let us = opts().with_locale("US");
        let all = engine
            .quantity_conversions(FlowRef::Flowable("methane"), "gwp", Some("mass"), Some("to air"), &us)
            .unwrap();
        assert_eq!(all.valid.len(), 1);
        assert_relative_eq!(all.valid[0].value(), 32.0);
        assert_eq!(all.geographic_proxy.len(), 1);
        assert_eq!(all.geographic_proxy[0].locale(), "GLO");
    }

    #[test]
    fn test_closest_context_wins() {
        let mut tm = tm();
        tm.characterize("methane", "mass", "gwp", 28.0, "to air", "GLO")
            .unwrap();
        tm.characterize("methane", "mass", "gwp", 32.0, "urban air close to ground", "US")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let us = opts().with_locale("US").with_dist(1);
        let all = engine
            .quantity_conversions(FlowRef::Flowable("methane"), "gwp", Some("mass"), Some("to air"), &us)
            .unwrap();
        assert_eq!(all.valid.len(), 1);
        assert_eq!(all.valid[0].locale(), "GLO");
        assert!(all.geographic_proxy.is_empty());
    }

    #[test]
    fn test_profile() {
        let mut tm = tm();
        tm.characterize("methane", "mass", "gwp", 28.0, "to air", "GLO")
            .unwrap();
        tm.characterize("methane", "mass", "volume", 1.5, "to air", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let profile = engine
            .profile(FlowRef::Flowable("methane"), Some("mass"), Some("to air"), &opts())
            .unwrap();
        assert_eq!(profile.len(), 2);
    }

    #[test]
    fn test_no_context_matches_any_context() {
        let mut tm = TermManager::bootstrap(EngineConfig::default()).unwrap();
        tm.load(&load_preset("gwp100").unwrap()).unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("methane");

        let v = engine.cf(flow, "gwp100", Some("mass"), None, &opts()).unwrap();
        assert_relative_eq!(v, 29.8, max_relative = 1e-9);

        let conv = engine
            .quantity_relation(flow, Some("mass"), "gwp100", None, &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 29.8, max_relative = 1e-9);
        assert_eq!(Some(conv.query_context()), tm.get_context("to air"));

        // a named context that does not resolve only matches the null context
        let v = engine
            .cf(flow, "gwp100", Some("mass"), Some("nowhere in particular"), &opts())
            .unwrap();
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_zero_factor_has_no_inverse() {
        let mut tm = tm();
        tm.characterize("water", "volume", "mass", 0.0, "none", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("water");
        assert!(matches!(
            engine.quantity_relation(flow, Some("mass"), "volume", None, &opts()),
            Err(LciaError::ConversionReferenceMismatch { .. })
        ));
        assert_eq!(engine.cf(flow, "volume", Some("mass"), None, &opts()).unwrap(), 0.0);

        // read forward the zero factor is an ordinary result
        let conv = engine
            .quantity_relation(flow, Some("volume"), "mass", None, &opts())
            .unwrap();
        assert_eq!(conv.value(), 0.0);
    }

    #[test]
    fn test_locale_proxy_in_reference_chain() {
        let mut tm = tm();
        tm.characterize("diesel", "volume", "gwp", 20.0, "none", "GLO")
            .unwrap();
        tm.characterize("diesel", "mass", "volume", 0.00119, "none", "US")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("diesel");

        let all = engine
            .quantity_conversions(flow, "gwp", Some("mass"), None, &opts())
            .unwrap();
        assert!(all.valid.is_empty());
        assert!(all.mismatched.is_empty());
        assert_eq!(all.geographic_proxy.len(), 1);
        assert_relative_eq!(all.geographic_proxy[0].value(), 0.0238, max_relative = 1e-9);
        assert_eq!(all.geographic_proxy[0].locale(), "GLO/US");

        let conv = engine
            .quantity_relation(flow, Some("mass"), "gwp", None, &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 0.0238, max_relative = 1e-9);

        let strict = QueryOptions {
            allow_proxy: false,
            ..opts()
        };
        assert!(matches!(
            engine.quantity_relation(flow, Some("mass"), "gwp", None, &strict),
            Err(LciaError::NoFactorsFound { .. })
        ));
    }

    #[test]
    fn test_reverse_search_is_one_level() {
        let mut tm = tm();
        // both factors are stated per unit of volume
        tm.characterize("diesel", "ncv", "volume", 2.8e-5, "none", "GLO")
            .unwrap();
        tm.characterize("diesel", "mass", "volume", 0.00119, "none", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("diesel");

        // one inversion
        let conv = engine
            .quantity_relation(flow, Some("volume"), "ncv", None, &opts())
            .unwrap();
        assert_relative_eq!(conv.value(), 1.0 / 2.8e-5, max_relative = 1e-9);

        // mass -> volume -> ncv would need the reverse pass to reverse again
        assert!(matches!(
            engine.quantity_relation(flow, Some("mass"), "ncv", None, &opts()),
            Err(LciaError::ConversionReferenceMismatch { .. })
        ));
        assert_eq!(engine.cf(flow, "ncv", Some("mass"), None, &opts()).unwrap(), 0.0);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let config = EngineConfig {
            strict_clookup: false,
            ..EngineConfig::default()
        };
        let mut tm = TermManager::bootstrap(config).unwrap();
        let gwp = tm
            .add_quantity(Quantity::new("test", "gwp", "Global warming", "kg CO2 eq").lcia_method("cc"))
            .unwrap();
        let mass = tm.get_canonical("mass").unwrap();
        let air = tm.get_context("to air").unwrap();
        tm.add_characterization("methane", mass, gwp, 28.0, air, "GLO", "a", false)
            .unwrap();
        tm.add_characterization("methane", mass, gwp, 28.0, air, "GLO", "b", false)
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let flow = FlowRef::Flowable("methane");

        for strategy in [Strategy::Highest, Strategy::Lowest, Strategy::First] {
            let conv = engine
                .quantity_relation(flow, Some("mass"), "gwp", Some("to air"), &opts().with_strategy(strategy))
                .unwrap();
            assert_eq!(conv.origin(), "a");
        }
    }

    #[test]
    fn test_norm_by_region() {
        let mut tm = tm();
        tm.add_quantity(
            Quantity::new("test", "acid", "Acidification", "mol H+ eq")
                .lcia_method("ac")
                .with_norm("EU27", 0.018)
                .with_norm("World", 0.0182),
        )
        .unwrap();
        let engine = QuantityEngine::new(&tm);
        assert_eq!(engine.norm("Acidification", Some("World")).unwrap(), 0.0182);
        assert_eq!(engine.norm("acid", None).unwrap(), 0.018);
        assert_eq!(engine.norm("gwp", None).unwrap(), 0.0);
        assert!(matches!(
            engine.norm("eutrophication", None),
            Err(LciaError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_link_falls_back_to_flowable() {
        let mut tm = tm();
        tm.characterize("methane", "mass", "gwp", 28.0, "to air", "GLO")
            .unwrap();
        let engine = QuantityEngine::new(&tm);
        let v = engine
            .cf(FlowRef::Link("methane"), "gwp", Some("mass"), Some("to air"), &opts())
            .unwrap();
        assert_relative_eq!(v, 28.0);
    }
}
