use crate::engine::conversion::{QuantityConversion, QuantityConversionError};
use crate::model::{Exchange, QuantityId};
use serde::Serialize;
use std::collections::BTreeMap;

/// One scored exchange.
#[derive(Debug, Clone, Serialize)]
pub struct LciaDetail {
    /// The inventory exchange.
    pub exchange: Exchange,
    /// Factor chain applied to the exchange.
    pub conversion: QuantityConversion,
    /// -1.0 when the exchange direction opposes the compartment's sense.
    pub sign: f64,
    /// Exchange value x factor x sign x scale.
    pub result: f64,
}

/// Scored exchanges sharing a group key.
#[derive(Debug, Clone, Serialize)]
pub struct LciaComponent {
    pub key: String,
    pub details: Vec<LciaDetail>,
}

impl LciaComponent {
    pub fn cumulative_result(&self) -> f64 {
        self.details.iter().map(|d| d.result).sum()
    }
}

/// An exchange whose factor could not be carried to its reference quantity.
#[derive(Debug, Clone, Serialize)]
pub struct LciaFailure {
    pub exchange: Exchange,
    pub mismatch: QuantityConversionError,
}

/// Result of characterizing an inventory against one quantity.
///
/// Every inventory item lands in exactly one bucket.
#[derive(Debug, Clone, Serialize)]
pub struct LciaResult {
    /// Canonical query quantity.
    pub quantity: QuantityId,
    pub quantity_name: String,
    /// Reference unit of the query quantity.
    pub unit: String,
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Scored exchanges by group key.
    components: BTreeMap<String, LciaComponent>,
    /// Reference flows and exchanges without a factor.
    cutoffs: Vec<Exchange>,
    /// Exchanges whose factor is zero.
    zeros: Vec<Exchange>,
    errors: Vec<LciaFailure>,
    /// Self-terminated exchanges.
    excluded: Vec<Exchange>,
}

impl LciaResult {
    pub fn new(quantity: QuantityId, quantity_name: &str, unit: &str) -> Self {
        Self {
            quantity,
            quantity_name: quantity_name.to_string(),
            unit: unit.to_string(),
            scale: 1.0,
            scenario: None,
            components: BTreeMap::new(),
            cutoffs: Vec::new(),
            zeros: Vec::new(),
            errors: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn with_scenario(mut self, scenario: &str) -> Self {
        self.scenario = Some(scenario.to_string());
        self
    }

    /// Multiply every score by `factor`.
    pub fn scale_by(&mut self, factor: f64) {
        self.scale *= factor;
        for d in self.components.values_mut().flat_map(|c| c.details.iter_mut()) {
            d.result *= factor;
        }
    }

    pub fn add_score(&mut self, key: String, exchange: Exchange, conversion: QuantityConversion, sign: f64) {
        let result = exchange.value * conversion.value() * sign * self.scale;
        self.components
            .entry(key.clone())
            .or_insert_with(|| LciaComponent {
                key,
                details: Vec::new(),
            })
            .details
            .push(LciaDetail {
                exchange,
                conversion,
                sign,
                result,
            });
    }

    pub fn add_cutoff(&mut self, exchange: Exchange) {
        self.cutoffs.push(exchange);
    }

    pub fn add_zero(&mut self, exchange: Exchange) {
        self.zeros.push(exchange);
    }

    pub fn add_error(&mut self, exchange: Exchange, mismatch: QuantityConversionError) {
        self.errors.push(LciaFailure { exchange, mismatch });
    }

    pub fn add_excluded(&mut self, exchange: Exchange) {
        self.excluded.push(exchange);
    }

    pub fn components(&self) -> impl Iterator<Item = &LciaComponent> {
        self.components.values()
    }

    pub fn component(&self, key: &str) -> Option<&LciaComponent> {
        self.components.get(key)
    }

    pub fn cutoffs(&self) -> &[Exchange] {
        &self.cutoffs
    }

    pub fn zeros(&self) -> &[Exchange] {
        &self.zeros
    }

    pub fn errors(&self) -> &[LciaFailure] {
        &self.errors
    }

    pub fn excluded(&self) -> &[Exchange] {
        &self.excluded
    }

    pub fn total(&self) -> f64 {
        self.components().map(LciaComponent::cumulative_result).sum()
    }

    /// Number of inventory items across all buckets.
    pub fn item_count(&self) -> usize {
        self.components().map(|c| c.details.len()).sum::<usize>()
            + self.cutoffs.len()
            + self.zeros.len()
            + self.errors.len()
            + self.excluded.len()
    }
}
