use crate::engine::conversion::ConversionError;
use crate::model::{ContextId, FlowableId, QuantityId, GLOBAL_LOCALE};
use serde::Serialize;
use std::collections::BTreeMap;

/// A characterization factor resolved for one locale.
///
/// `value` is the amount of `query_quantity` equivalent to one unit of
/// `ref_quantity` for the flowable in the given context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrResult {
    pub flowable: String,
    pub ref_quantity: QuantityId,
    pub query_quantity: QuantityId,
    pub context: ContextId,
    pub locale: String,
    pub origin: String,
    pub value: f64,
}

impl QrResult {
    /// Swap ref and query and take the reciprocal value. A zero factor has
    /// no inverse.
    pub fn invert(&self) -> Option<Self> {
        if self.value == 0.0 {
            return None;
        }
        Some(Self {
            flowable: self.flowable.clone(),
            ref_quantity: self.query_quantity,
            query_quantity: self.ref_quantity,
            context: self.context,
            locale: self.locale.clone(),
            origin: self.origin.clone(),
            value: 1.0 / self.value,
        })
    }
}

/// Factor values for one (flowable, ref quantity, query quantity, context,
/// origin), keyed by locale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Characterization {
    pub flowable: FlowableId,
    pub ref_quantity: QuantityId,
    pub query_quantity: QuantityId,
    pub context: ContextId,
    pub origin: String,
    values: BTreeMap<String, f64>,
}

impl Characterization {
    pub fn new(
        flowable: FlowableId,
        ref_quantity: QuantityId,
        query_quantity: QuantityId,
        context: ContextId,
        origin: &str,
    ) -> Self {
        Self {
            flowable,
            ref_quantity,
            query_quantity,
            context,
            origin: origin.to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, locale: &str, value: f64) -> Self {
        self.set_value(locale, value);
        self
    }

    pub fn set_value(&mut self, locale: &str, value: f64) {
        self.values.insert(locale_key(locale), value);
    }

    pub fn value_at(&self, locale: &str) -> Option<f64> {
        self.values.get(&locale_key(locale)).copied()
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True if the two records describe the same flowable, quantities,
    /// context and origin.
    pub fn same_key(&self, other: &Characterization) -> bool {
        self.flowable == other.flowable
            && self.ref_quantity == other.ref_quantity
            && self.query_quantity == other.query_quantity
            && self.context == other.context
            && self.origin == other.origin
    }

    /// Resolve the factor at `locale`, falling back to the global value.
    pub fn query(&self, flowable: &str, locale: &str) -> Result<QrResult, ConversionError> {
        let key = locale_key(locale);
        let (locale, value) = match self.values.get_key_value(&key) {
            Some((k, v)) => (k.clone(), *v),
            None => match self.values.get(GLOBAL_LOCALE) {
                Some(v) => (GLOBAL_LOCALE.to_string(), *v),
                None => {
                    return Err(ConversionError::LocaleMismatch(
                        self.values.keys().cloned().collect(),
                    ))
                }
            },
        };
        Ok(QrResult {
            flowable: flowable.to_string(),
            ref_quantity: self.ref_quantity,
            query_quantity: self.query_quantity,
            context: self.context,
            locale,
            origin: self.origin.clone(),
            value,
        })
    }
}

fn locale_key(locale: &str) -> String {
    let trimmed = locale.trim();
    if trimmed.is_empty() {
        GLOBAL_LOCALE.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cf() -> Characterization {
        Characterization::new(FlowableId(0), QuantityId(0), QuantityId(1), ContextId::NULL, "test")
    }

    #[test]
    fn test_exact_locale() {
        let c = cf().with_value("GLO", 1.0).with_value("US", 2.0);
        let r = c.query("methane", "US").unwrap();
        assert_eq!(r.locale, "US");
        assert_eq!(r.value, 2.0);
    }

    #[test]
    fn test_global_fallback() {
        let c = cf().with_value("GLO", 1.0);
        let r = c.query("methane", "CA").unwrap();
        assert_eq!(r.locale, "GLO");
        assert_eq!(r.value, 1.0);
    }

    #[test]
    fn test_locale_mismatch() {
        let c = cf().with_value("US", 2.0).with_value("CA", 3.0);
        match c.query("methane", "GLO") {
            Err(ConversionError::LocaleMismatch(locales)) => {
                assert_eq!(locales, vec!["CA".to_string(), "US".to_string()])
            }
            other => panic!("expected locale mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_locale_is_global() {
        let c = cf().with_value("", 4.0);
        assert_eq!(c.value_at("GLO"), Some(4.0));
    }

    #[test]
    fn test_invert() {
        let r = cf().with_value("GLO", 4.0).query("x", "GLO").unwrap();
        let inv = r.invert().unwrap();
        assert_eq!(inv.ref_quantity, QuantityId(1));
        assert_eq!(inv.query_quantity, QuantityId(0));
        assert_eq!(inv.value, 0.25);
    }

    #[test]
    fn test_zero_does_not_invert() {
        let r = cf().with_value("GLO", 0.0).query("x", "GLO").unwrap();
        assert_eq!(r.value, 0.0);
        assert!(r.invert().is_none());
    }
}
