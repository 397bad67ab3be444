use crate::dataset::schema::{CharacterizationDef, ContextDef, DatasetDef, FlowableDef};
use crate::model::{Flow, Quantity};

/// A source of reference data for [`crate::term_manager::TermManager::load`].
///
/// Only quantities and characterizations are required; the other record
/// kinds default to empty.
pub trait EntityProvider {
    /// Origin assigned to records that do not name their own.
    fn origin(&self) -> &str;

    fn contexts(&self) -> &[ContextDef] {
        &[]
    }

    fn quantities(&self) -> &[Quantity];

    fn flowables(&self) -> &[FlowableDef] {
        &[]
    }

    fn flows(&self) -> &[Flow] {
        &[]
    }

    fn characterizations(&self) -> &[CharacterizationDef];
}

impl EntityProvider for DatasetDef {
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
