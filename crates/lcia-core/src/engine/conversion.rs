use crate::characterization::QrResult;
use crate::model::{ContextId, QuantityId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Why a conversion search gave up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// No chain of factors connects the two quantities.
    #[error("reference mismatch: {0}")]
    ReferenceMismatch(String),
    /// Factors exist, but only for other locales.
    #[error("factors only available for locales {}", .0.join(", "))]
    LocaleMismatch(Vec<String>),
    /// The context hierarchy could not be walked.
    #[error("context hierarchy contains a cycle at '{0}'")]
    Hierarchy(String),
}

/// An ordered chain of characterization results.
///
/// Each element's `ref_quantity` is the next element's `query_quantity`, so
/// the chain converts from its last element's ref to its first element's
/// query. A chain with no elements is a stub carrying only the query
/// quantity and context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityConversion {
    query: Option<QuantityId>,
    context: ContextId,
    results: Vec<QrResult>,
    null: bool,
}

impl QuantityConversion {
    /// An empty chain ending at `query`.
    pub fn new(query: QuantityId, context: ContextId) -> Self {
        Self {
            query: Some(query),
            context,
            results: Vec::new(),
            null: false,
        }
    }

    pub fn from_result(result: QrResult, context: ContextId) -> Self {
        Self {
            query: Some(result.query_quantity),
            context,
            results: vec![result],
            null: false,
        }
    }

    /// Placeholder for "no data": a single zero-valued element.
    pub fn null(result: QrResult, context: ContextId) -> Self {
        let zero = QrResult { value: 0.0, ..result };
        Self {
            null: true,
            ..Self::from_result(zero, context)
        }
    }

    /// Append a result. Its query quantity must match the current ref.
    pub fn push(&mut self, result: QrResult) -> Result<(), ConversionError> {
        match self.ref_quantity() {
            Some(current) if current != result.query_quantity => {
                Err(ConversionError::ReferenceMismatch(format!(
                    "chain ends at quantity #{}, next factor starts at #{}",
                    current.0, result.query_quantity.0
                )))
            }
            _ => {
                self.results.push(result);
                Ok(())
            }
        }
    }

    pub fn results(&self) -> &[QrResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn query(&self) -> Option<QuantityId> {
        self.query
            .or_else(|| self.results.first().map(|r| r.query_quantity))
    }

    pub fn ref_quantity(&self) -> Option<QuantityId> {
        self.results
            .last()
            .map(|r| r.ref_quantity)
            .or(self.query)
    }

    /// Product of the element values. An empty chain is the identity.
    pub fn value(&self) -> f64 {
        self.results.iter().map(|r| r.value).product()
    }

    pub fn flowable(&self) -> Option<&str> {
        self.results.first().map(|r| r.flowable.as_str())
    }

    /// Context of the last element with a non-null context, else the context
    /// the chain was started in.
    pub fn context(&self) -> ContextId {
        self.results
            .iter()
            .rev()
            .map(|r| r.context)
            .find(|cx| !cx.is_null())
            .unwrap_or(self.context)
    }

    /// Context the chain was requested for.
    pub fn query_context(&self) -> ContextId {
        self.context
    }

    /// Distinct locales of the elements, in order, joined by '/'.
    pub fn locale(&self) -> String {
        let mut seen = BTreeSet::new();
        let mut out: Vec<&str> = Vec::new();
        for r in &self.results {
            if seen.insert(r.locale.as_str()) {
                out.push(&r.locale);
            }
        }
        out.join("/")
    }

    pub fn origin(&self) -> &str {
        self.results.first().map(|r| r.origin.as_str()).unwrap_or("")
    }

    /// True when `quantity` already appears as a ref (or as the query the
    /// chain started from).
    pub fn seen(&self, quantity: QuantityId) -> bool {
        self.query == Some(quantity) || self.results.iter().any(|r| r.ref_quantity == quantity)
    }

    /// The chain read backwards: every element inverted, order reversed.
    /// `None` if any step is a zero factor.
    pub fn invert(&self) -> Option<Self> {
        Some(Self {
            query: self.ref_quantity(),
            context: self.context,
            results: self
                .results
                .iter()
                .rev()
                .map(QrResult::invert)
                .collect::<Option<Vec<_>>>()?,
            null: self.null,
        })
    }

    /// Collapse the chain into a single result carrying the chain value.
    pub fn flatten(&self, origin: Option<&str>) -> Option<QrResult> {
        let first = self.results.first()?;
        let last = self.results.last()?;
        Some(QrResult {
            flowable: first.flowable.clone(),
            ref_quantity: last.ref_quantity,
            query_quantity: first.query_quantity,
            context: self.context(),
            locale: self.locale(),
            origin: origin.unwrap_or(&first.origin).to_string(),
            value: self.value(),
        })
    }
}

/// A chain that starts at the requested query quantity but could not be
/// carried through to the flow's reference quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityConversionError {
    pub conversion: QuantityConversion,
    /// The reference quantity the chain failed to reach.
    pub target: QuantityId,
}

impl QuantityConversionError {
    pub fn new(conversion: QuantityConversion, target: QuantityId) -> Self {
        Self { conversion, target }
    }

    pub fn query(&self) -> Option<QuantityId> {
        self.conversion.query()
    }

    /// Where the chain stopped.
    pub fn reached(&self) -> Option<QuantityId> {
        self.conversion.ref_quantity()
    }

    pub fn flowable(&self) -> Option<&str> {
        self.conversion.flowable()
    }
}

/// Everything a conversion search produced, sorted by quality.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversions {
    /// Complete chains at the requested locale.
    pub valid: Vec<QuantityConversion>,
    /// Complete chains that used factors from other locales.
    pub geographic_proxy: Vec<QuantityConversion>,
    /// Chains that could not reach the flow's reference quantity.
    pub mismatched: Vec<QuantityConversionError>,
}

impl Conversions {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty() && self.geographic_proxy.is_empty() && self.mismatched.is_empty()
    }
}
