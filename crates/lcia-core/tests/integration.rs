//! End-to-end tests: load reference data through an `EntityProvider`, then
//! query conversions and run `do_lcia` over small inventories.
//!
//! Uses a MockProvider holding records in memory, so no dataset files are
//! needed.

use approx::assert_relative_eq;
use lcia_core::context::Sense;
use lcia_core::dataset::schema::{CharacterizationDef, ContextDef, FlowableDef};
use lcia_core::engine::CfLookup;
use lcia_core::lcia::by_process;
use lcia_core::model::{Direction, Exchange, Flow, Quantity, Termination};
use lcia_core::provider::EntityProvider;
use lcia_core::{do_lcia, EngineConfig, FlowRef, LciaError, QuantityEngine, QueryOptions, TermManager};

struct MockProvider {
    origin: String,
    contexts: Vec<ContextDef>,
    quantities: Vec<Quantity>,
    flowables: Vec<FlowableDef>,
    flows: Vec<Flow>,
    characterizations: Vec<CharacterizationDef>,
}

impl MockProvider {
    fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            contexts: Vec::new(),
            quantities: Vec::new(),
            flowables: Vec::new(),
            flows: Vec::new(),
            characterizations: Vec::new(),
        }
    }

    fn cf(mut self, flowable: &str, ref_q: &str, query_q: &str, context: &[&str], value: f64) -> Self {
        self.characterizations.push(CharacterizationDef {
            flowable: flowable.to_string(),
            ref_quantity: ref_q.to_string(),
            query_quantity: query_q.to_string(),
            context: context.iter().map(|s| s.to_string()).collect(),
            locale: "GLO".to_string(),
            value,
            origin: None,
            overwrite: false,
        });
        self
    }
}

impl EntityProvider for MockProvider {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn contexts(&self) -> &[ContextDef] {
        &self.contexts
    }

    fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }

    fn flowables(&self) -> &[FlowableDef] {
        &self.flowables
    }

    fn flows(&self) -> &[Flow] {
        &self.flows
    }

    fn characterizations(&self) -> &[CharacterizationDef] {
        &self.characterizations
    }
}

fn gwp() -> Quantity {
    Quantity::new("mock.lcia", "gwp", "Climate change", "kg CO2 eq").lcia_method("climate change")
}

fn loaded(provider: &MockProvider) -> TermManager {
    let mut tm = TermManager::bootstrap(EngineConfig::default()).unwrap();
    let report = tm.load(provider).unwrap();
    assert!(report.is_clean(), "load failures: {:?}", report.failures);
    tm.seal();
    tm
}

// ---------------------------------------------------------------------------
// Test 1: density-like factor, forward and inverse
// ---------------------------------------------------------------------------
#[test]
fn water_mass_volume_round_trip() {
    let provider = MockProvider::new("mock").cf("water", "mass", "volume", &[], 0.001);
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);
    let opts = QueryOptions::default();

    let fwd = engine
        .quantity_relation(FlowRef::Flowable("water"), Some("mass"), "volume", None, &opts)
        .unwrap();
    assert_relative_eq!(fwd.value(), 0.001);

    let inv = engine
        .quantity_relation(FlowRef::Flowable("water"), Some("volume"), "mass", None, &opts)
        .unwrap();
    assert_relative_eq!(inv.value(), 1000.0, max_relative = 1e-12);
}

// ---------------------------------------------------------------------------
// Test 2: the same quantity from two sources resolves to one canonical entry
// ---------------------------------------------------------------------------
#[test]
fn quantity_from_second_source_becomes_child() {
    let mut provider = MockProvider::new("ecoinvent");
    provider
        .quantities
        .push(Quantity::new("", "mass-ei", "Mass", "kg").with_unit("g", 1000.0));
    let tm = loaded(&provider);

    let canonical = tm.get_canonical("local.qdb/mass").unwrap();
    assert_eq!(tm.get_canonical("ecoinvent/mass-ei").unwrap(), canonical);
    assert_eq!(tm.get_canonical("mass-ei").unwrap(), canonical);
    assert_eq!(tm.quantities().children(canonical).len(), 1);
}

// ---------------------------------------------------------------------------
// Test 3: reference, cutoff and scored exchanges land in the right buckets
// ---------------------------------------------------------------------------
#[test]
fn lcia_buckets() {
    let mut provider = MockProvider::new("mock").cf("methane", "mass", "gwp", &["emissions", "to air"], 28.0);
    provider.quantities.push(gwp());
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);

    let product = Flow::new("inv", "widget", "widget", "items");
    let coal = Flow::new("inv", "coal", "hard coal", "mass");
    let methane = Flow::new("inv", "ch4", "methane", "mass").with_context(&["emissions", "to air"]);
    let inventory = vec![
        Exchange::new("widget production", product, Direction::Output, 1.0).reference(),
        Exchange::new("widget production", coal, Direction::Input, 3.0),
        Exchange::new("widget production", methane, Direction::Output, 0.5)
            .terminated(Termination::Context("to air".into())),
    ];

    let result = do_lcia(&engine, "gwp", &inventory, &QueryOptions::default(), by_process).unwrap();
    assert_eq!(result.cutoffs().len(), 2);
    assert!(result.cutoffs().iter().any(|x| x.is_reference));
    assert!(result.cutoffs().iter().any(|x| x.flow.name == "hard coal"));
    let component = result.component("widget production").unwrap();
    assert_eq!(component.details.len(), 1);
    assert_relative_eq!(component.cumulative_result(), 14.0);
    assert_eq!(result.item_count(), inventory.len());
}

// ---------------------------------------------------------------------------
// Test 4: dist=1 finds a factor on a child without looking at the parent
// ---------------------------------------------------------------------------
#[test]
fn dist_one_searches_children_only() {
    let mut provider = MockProvider::new("mock")
        .cf("ammonia", "mass", "gwp", &["emissions", "to soil", "agricultural"], 3.0)
        .cf("ammonia", "mass", "gwp", &["emissions"], 99.0);
    provider.quantities.push(gwp());
    let tm = loaded(&provider);

    let fid = tm.get_flowable("ammonia").unwrap();
    let gwp = tm.get_canonical("gwp").unwrap();
    let soil = tm.get_context("to soil").unwrap();
    let found = tm.factors_for_flowable(fid, Some(gwp), Some(soil), 1).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value_at("GLO"), Some(3.0));
    assert!(tm.factors_for_flowable(fid, Some(gwp), Some(soil), 0).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test 5: no path between quantities
// ---------------------------------------------------------------------------
#[test]
fn no_conversion_path() {
    let mut provider = MockProvider::new("mock").cf("methane", "volume", "gwp", &[], 20.0);
    provider.quantities.push(gwp());
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);
    let opts = QueryOptions::default();

    let err = engine
        .quantity_relation(FlowRef::Flowable("methane"), Some("area"), "gwp", None, &opts)
        .unwrap_err();
    assert!(matches!(err, LciaError::ConversionReferenceMismatch { .. }));

    let v = engine
        .cf(FlowRef::Flowable("methane"), "gwp", Some("area"), None, &opts)
        .unwrap();
    assert_eq!(v, 0.0);
}

// ---------------------------------------------------------------------------
// Test 6: a mismatched exchange goes to the error bucket
// ---------------------------------------------------------------------------
#[test]
fn mismatch_goes_to_error_bucket() {
    let mut provider = MockProvider::new("mock").cf("methane", "volume", "gwp", &[], 20.0);
    provider.quantities.push(gwp());
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);

    let flow = Flow::new("inv", "ch4", "methane", "area");
    let gwp = tm.get_canonical("gwp").unwrap();
    assert!(matches!(
        engine.lookup_cf(&flow, gwp, None, &QueryOptions::default()),
        CfLookup::Mismatch(_)
    ));

    let inventory = vec![Exchange::new("p", flow, Direction::Output, 1.0)];
    let result = do_lcia(&engine, "gwp", &inventory, &QueryOptions::default(), by_process).unwrap();
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.total(), 0.0);
}

// ---------------------------------------------------------------------------
// Test 7: flows registered through the provider merge flowable synonyms
// ---------------------------------------------------------------------------
#[test]
fn flows_link_synonyms_to_factors() {
    let mut provider = MockProvider::new("mock").cf("74-82-8", "mass", "gwp", &["emissions", "to air"], 28.0);
    provider.quantities.push(gwp());
    provider.flowables.push(FlowableDef {
        name: "methane".into(),
        cas_number: Some("74-82-8".into()),
        synonyms: vec!["CH4".into()],
    });
    provider.flows.push(
        Flow::new("", "f-ch4", "Methane, fossil", "mass")
            .with_cas("000074-82-8")
            .with_context(&["emissions", "to air"]),
    );
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);

    let v = engine
        .cf(FlowRef::Link("mock/f-ch4"), "gwp", None, None, &QueryOptions::default())
        .unwrap();
    assert_relative_eq!(v, 28.0);
    let v = engine
        .cf(FlowRef::Flowable("ch4"), "gwp", Some("mass"), Some("air"), &QueryOptions::default())
        .unwrap();
    assert_relative_eq!(v, 28.0);
}

// ---------------------------------------------------------------------------
// Test 8: provider contexts carry sense into scoring
// ---------------------------------------------------------------------------
#[test]
fn resource_uptake_from_source_context() {
    let mut provider = MockProvider::new("mock")
        .cf("carbon dioxide", "mass", "gwp", &["resources", "from air"], -1.0)
        .cf("carbon dioxide", "mass", "gwp", &["emissions", "to air"], 1.0);
    provider.quantities.push(gwp());
    provider.contexts.push(ContextDef {
        path: vec!["resources".into(), "from air".into(), "photosynthesis".into()],
        sense: Some(Sense::Source),
        elementary: true,
        synonyms: Vec::new(),
    });
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);

    let co2 = Flow::new("inv", "co2", "carbon dioxide", "mass");
    let inventory = vec![
        Exchange::new("forest", co2.clone(), Direction::Input, 10.0)
            .terminated(Termination::Context("photosynthesis".into())),
        Exchange::new("forest", co2, Direction::Output, 4.0)
            .terminated(Termination::Context("to air".into())),
    ];
    let result = do_lcia(&engine, "gwp", &inventory, &QueryOptions::default(), by_process).unwrap();
    // uptake: 10 x -1 from a source; emission: 4 x 1 into a sink
    assert_relative_eq!(result.total(), -6.0);
}

// ---------------------------------------------------------------------------
// Test 9: a sealed manager is read-only, a layer is not
// ---------------------------------------------------------------------------
#[test]
fn sealed_manager_layers() {
    let provider = MockProvider::new("mock").cf("water", "mass", "volume", &[], 0.001);
    let tm = loaded(&provider);
    let mut again = tm.clone();
    assert!(matches!(again.load(&provider), Err(LciaError::Sealed)));

    let mut layer = tm.layer();
    layer
        .characterize("ethanol", "mass", "volume", 0.00127, "none", "GLO")
        .unwrap();
    let engine = QuantityEngine::new(&layer);
    let v = engine
        .cf(FlowRef::Flowable("ethanol"), "volume", Some("mass"), None, &QueryOptions::default())
        .unwrap();
    assert_relative_eq!(v, 0.00127);
    assert!(tm.get_flowable("ethanol").is_none());
}

// ---------------------------------------------------------------------------
// Test 10: open_term_manager loads presets and seals the result
// ---------------------------------------------------------------------------
#[test]
fn open_term_manager_from_presets() {
    use lcia_core::dataset::builtin::load_preset;

    let tm = lcia_core::open_term_manager(&[load_preset("gwp100").unwrap()], EngineConfig::default()).unwrap();
    assert!(tm.is_sealed());
    assert_eq!(tm.get_flowable("CH4"), tm.get_flowable("74-82-8"));

    let engine = QuantityEngine::new(&tm);
    let v = engine
        .cf(FlowRef::Flowable("methane"), "gwp100", Some("mass"), Some("to air"), &QueryOptions::default())
        .unwrap();
    assert_relative_eq!(v, 29.8);

    let conv = engine
        .quantity_relation(FlowRef::Flowable("methane"), Some("mass"), "gwp100", Some("to air"), &QueryOptions::default())
        .unwrap();
    assert_eq!(conv.origin(), "ipcc.2021");
    assert_eq!(tm.describe_conversion(&conv), "methane; to air: 29.8 kg CO2 eq/kg [GLO] (ipcc.2021)");
}

// ---------------------------------------------------------------------------
// Test 11: an exchange with no context matches factors in any context
// ---------------------------------------------------------------------------
#[test]
fn exchange_without_context() {
    let mut provider = MockProvider::new("mock").cf("methane", "mass", "gwp", &["emissions", "to air"], 28.0);
    provider.quantities.push(gwp());
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);

    let ch4 = Flow::new("inv", "ch4", "methane", "mass");
    let gwp = tm.get_canonical("gwp").unwrap();
    assert!(matches!(
        engine.lookup_cf(&ch4, gwp, None, &QueryOptions::default()),
        CfLookup::Found(_)
    ));

    let inventory = vec![
        Exchange::new("p", ch4.clone(), Direction::Output, 1.0),
        Exchange::new("p", ch4, Direction::Output, 1.0).terminated(Termination::Node("flare".into())),
    ];
    let result = do_lcia(&engine, "gwp", &inventory, &QueryOptions::default(), by_process).unwrap();
    assert!(result.cutoffs().is_empty());
    assert_relative_eq!(result.total(), 56.0);
}

// ---------------------------------------------------------------------------
// Test 12: normalisation factors arrive with the quantity
// ---------------------------------------------------------------------------
#[test]
fn normalisation_factors_from_provider() {
    let mut provider = MockProvider::new("mock");
    provider
        .quantities
        .push(gwp().with_norm("EU27", 1.15e-4).with_norm("World", 1.31e-4));
    let tm = loaded(&provider);
    let engine = QuantityEngine::new(&tm);

    assert_eq!(engine.norm("climate change", Some("World")).unwrap(), 1.31e-4);
    assert_eq!(engine.norm("mock.lcia/gwp", None).unwrap(), 1.15e-4);
    assert_eq!(engine.norm("mass", None).unwrap(), 0.0);
}
