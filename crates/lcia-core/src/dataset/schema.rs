use crate::context::Sense;
use crate::model::{Flow, Quantity, GLOBAL_LOCALE};
use serde::{Deserialize, Serialize};

/// A bundle of reference data: quantities, compartments, flowables, flows
/// and characterization factors from one origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    /// Origin assigned to records that do not name their own.
    pub origin: String,
    #[serde(default)]
    pub contexts: Vec<ContextDef>,
    #[serde(default)]
    pub quantities: Vec<Quantity>,
    #[serde(default)]
    pub flowables: Vec<FlowableDef>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub characterizations: Vec<CharacterizationDef>,
}

/// A compartment, given by its full path from the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDef {
    pub path: Vec<String>,
    /// Applied to the innermost compartment of the path.
    #[serde(default)]
    pub sense: Option<Sense>,
    #[serde(default)]
    pub elementary: bool,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// A substance and the names it goes by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowableDef {
    pub name: String,
    #[serde(default)]
    pub cas_number: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl FlowableDef {
    pub fn terms(&self) -> Vec<String> {
        let mut terms = vec![self.name.clone()];
        terms.extend(self.cas_number.iter().cloned());
        terms.extend(self.synonyms.iter().cloned());
        terms
    }
}

/// One characterization factor: `value` units of `query_quantity` per unit
/// of `ref_quantity` for the flowable in the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterizationDef {
    pub flowable: String,
    pub ref_quantity: String,
    pub query_quantity: String,
    /// Compartment path, outermost first. Empty means no context.
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    pub value: f64,
    #[serde(default)]
    pub origin: Option<String>,
    /// Replace an existing value from the same origin instead of failing.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_locale() -> String {
    GLOBAL_LOCALE.to_string()
}
