use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle into the quantity table of a [`crate::quantity::QuantityManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuantityId(pub(crate) usize);

/// Handle into the context table of a [`crate::context::ContextManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(pub(crate) usize);

impl ContextId {
    /// The "no context" context. Slot 0 of every context table.
    pub const NULL: ContextId = ContextId(0);

    pub fn is_null(&self) -> bool {
        *self == ContextId::NULL
    }
}

/// Handle into the flowable table of a [`crate::terms::FlowableManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowableId(pub(crate) usize);

pub const GLOBAL_LOCALE: &str = "GLO";

/// A physical quantity or LCIA indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(default)]
    pub origin: String,
    pub external_ref: String,
    pub name: String,
    pub reference_unit: String,
    /// Unit -> number of that unit equal to one reference unit.
    #[serde(default)]
    pub unit_conversion: BTreeMap<String, f64>,
    #[serde(default)]
    pub is_lcia_method: bool,
    #[serde(default)]
    pub indicator: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// LCIA methods that count biogenic CO2 as zero.
    #[serde(default)]
    pub quell_biogenic_co2: bool,
    /// Normalisation factors, parallel to `norm_sets`.
    #[serde(default)]
    pub normalisation_factors: Vec<f64>,
    /// Region or reference set each normalisation factor applies to.
    #[serde(default)]
    pub norm_sets: Vec<String>,
}

impl Quantity {
    pub fn new(origin: &str, external_ref: &str, name: &str, reference_unit: &str) -> Self {
        Self {
            origin: origin.to_string(),
            external_ref: external_ref.to_string(),
            name: name.to_string(),
            reference_unit: reference_unit.to_string(),
            unit_conversion: BTreeMap::new(),
            is_lcia_method: false,
            indicator: None,
            synonyms: Vec::new(),
            quell_biogenic_co2: false,
            normalisation_factors: Vec::new(),
            norm_sets: Vec::new(),
        }
    }

    /// Builder-style: mark as an LCIA indicator.
    pub fn lcia_method(mut self, indicator: &str) -> Self {
        self.is_lcia_method = true;
        self.indicator = Some(indicator.to_string());
        self
    }

    pub fn with_unit(mut self, unit: &str, per_reference: f64) -> Self {
        self.unit_conversion.insert(unit.to_string(), per_reference);
        self
    }

    pub fn with_norm(mut self, set: &str, factor: f64) -> Self {
        self.norm_sets.push(set.to_string());
        self.normalisation_factors.push(factor);
        self
    }

    /// Normalisation factor for `region`. An unknown or absent region gets
    /// the first factor; a quantity without factors gives 0.0.
    pub fn norm(&self, region: Option<&str>) -> f64 {
        let ix = region
            .and_then(|r| self.norm_sets.iter().position(|s| s == r))
            .unwrap_or(0);
        self.normalisation_factors.get(ix).copied().unwrap_or(0.0)
    }

    pub fn with_synonym(mut self, term: &str) -> Self {
        self.synonyms.push(term.to_string());
        self
    }

    /// Globally unique `origin/external_ref` identifier.
    pub fn link(&self) -> String {
        format!("{}/{}", self.origin, self.external_ref)
    }

    /// Number of units of `unit` equal to one reference unit, if known.
    pub fn unit_factor(&self, unit: &str) -> Option<f64> {
        if unit == self.reference_unit {
            return Some(1.0);
        }
        self.unit_conversion.get(unit).copied()
    }

    pub fn knows_unit(&self, unit: &str) -> bool {
        self.unit_factor(unit).is_some()
    }

    /// Convert an amount expressed in `from` into `to` (both default to the
    /// reference unit). Returns the multiplier, or `None` if either unit is
    /// unknown to this quantity.
    pub fn convert(&self, from: Option<&str>, to: Option<&str>) -> Option<f64> {
        let inbound = self.unit_factor(from.unwrap_or(&self.reference_unit))?;
        let outbound = self.unit_factor(to.unwrap_or(&self.reference_unit))?;
        if inbound == 0.0 {
            return None;
        }
        Some(outbound / inbound)
    }

    /// Every string this quantity may be looked up by.
    pub fn terms(&self) -> Vec<String> {
        let mut terms = vec![self.link(), self.external_ref.clone(), self.name.clone()];
        terms.extend(self.synonyms.iter().cloned());
        terms
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.reference_unit)
    }
}

/// A flow record as produced by an upstream loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub origin: String,
    pub external_ref: String,
    pub name: String,
    /// Term naming the flow's reference quantity.
    pub reference_quantity: String,
    #[serde(default)]
    pub cas_number: Option<String>,
    /// Compartment path, outermost first (e.g. `["emissions", "to air"]`).
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl Flow {
    pub fn new(origin: &str, external_ref: &str, name: &str, reference_quantity: &str) -> Self {
        Self {
            origin: origin.to_string(),
            external_ref: external_ref.to_string(),
            name: name.to_string(),
            reference_quantity: reference_quantity.to_string(),
            cas_number: None,
            context: Vec::new(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_context(mut self, path: &[&str]) -> Self {
        self.context = path.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_cas(mut self, cas: &str) -> Self {
        self.cas_number = Some(cas.to_string());
        self
    }

    pub fn link(&self) -> String {
        format!("{}/{}", self.origin, self.external_ref)
    }

    /// Terms identifying the flow's substance.
    pub fn flowable_terms(&self) -> Vec<String> {
        let mut terms = vec![self.name.clone()];
        if let Some(ref cas) = self.cas_number {
            if !cas.trim().is_empty() {
                terms.push(cas.clone());
            }
        }
        terms.extend(self.synonyms.iter().cloned());
        terms.push(self.link());
        terms
    }

    /// Carbon dioxide of biogenic origin.
    pub fn is_biogenic_co2(&self) -> bool {
        let name = self.name.to_lowercase();
        if !name.contains("carbon dioxide") {
            return false;
        }
        name.contains("biogenic") || name.contains("non-fossil") || name.contains("in air")
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cas_number.as_deref() {
            Some(cas) if !cas.is_empty() => write!(f, "{} (CAS {})", self.name, cas)?,
            _ => write!(f, "{}", self.name)?,
        }
        write!(f, " [{}]", self.context.join(";"))
    }
}

/// A flow argument at the API boundary.
#[derive(Debug, Clone, Copy)]
pub enum FlowRef<'a> {
    /// A string synonymous with a known flowable.
    Flowable(&'a str),
    /// A flow record.
    Flow(&'a Flow),
    /// The link of a flow registered with the term manager.
    Link(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "Input"),
            Direction::Output => write!(f, "Output"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "target")]
pub enum Termination {
    #[default]
    None,
    Context(String),
    Node(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeType {
    Reference,
    Cutoff,
    Context,
    SelfTerminated,
    Node,
}

/// An inventory entry: a process's exchange of a flow in a direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// External ref of the owning process.
    pub process: String,
    pub flow: Flow,
    pub direction: Direction,
    pub value: f64,
    #[serde(default)]
    pub termination: Termination,
    #[serde(default)]
    pub is_reference: bool,
}

impl Exchange {
    pub fn new(process: &str, flow: Flow, direction: Direction, value: f64) -> Self {
        Self {
            process: process.to_string(),
            flow,
            direction,
            value,
            termination: Termination::None,
            is_reference: false,
        }
    }

    pub fn terminated(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    pub fn exchange_type(&self) -> ExchangeType {
        if self.is_reference {
            return ExchangeType::Reference;
        }
        match &self.termination {
            Termination::None => ExchangeType::Cutoff,
            Termination::Context(_) => ExchangeType::Context,
            Termination::Node(node) if *node == self.process => ExchangeType::SelfTerminated,
            Termination::Node(_) => ExchangeType::Node,
        }
    }
}
