pub mod builtin;
pub mod schema;

use crate::error::LciaError;
use crate::terms::normalize::normalize_term;
use schema::DatasetDef;
use std::collections::HashSet;
use std::path::Path;

/// Load a dataset from a JSON file.
pub fn load_dataset(path: &Path) -> Result<DatasetDef, LciaError> {
    let content = std::fs::read_to_string(path).map_err(|e| LciaError::DatasetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_dataset(&content, path)
}

/// Parse a dataset from a JSON string.
pub fn parse_dataset(json: &str, source: &Path) -> Result<DatasetDef, LciaError> {
    let dataset: DatasetDef = serde_json::from_str(json).map_err(|e| LciaError::DatasetLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_dataset(&dataset)?;
    Ok(dataset)
}

/// Parse a dataset from a JSON string (no file path context).
pub fn parse_dataset_str(json: &str) -> Result<DatasetDef, LciaError> {
    let dataset: DatasetDef = serde_json::from_str(json).map_err(LciaError::Json)?;
    validate_dataset(&dataset)?;
    Ok(dataset)
}

/// Validate that a dataset is well-formed.
///
/// Quantity terms used by flows and characterizations must resolve within
/// the dataset itself or the built-in base dataset.
pub fn validate_dataset(dataset: &DatasetDef) -> Result<(), LciaError> {
    if dataset.name.trim().is_empty() {
        return Err(LciaError::DatasetInvalid("name must not be empty".into()));
    }
    if dataset.origin.trim().is_empty() {
        return Err(LciaError::DatasetInvalid("origin must not be empty".into()));
    }

    let mut known: HashSet<String> = HashSet::new();
    for q in &dataset.quantities {
        if q.external_ref.trim().is_empty() {
            return Err(LciaError::DatasetInvalid(format!(
                "quantity '{}' has no external_ref",
                q.name
            )));
        }
        if q.reference_unit.trim().is_empty() {
            return Err(LciaError::DatasetInvalid(format!(
                "quantity '{}' has no reference unit",
                q.external_ref
            )));
        }
        for (unit, factor) in &q.unit_conversion {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(LciaError::DatasetInvalid(format!(
                    "quantity '{}' has invalid factor {} for unit '{}'",
                    q.external_ref, factor, unit
                )));
            }
        }
        known.extend(q.terms().iter().map(|t| normalize_term(t)));
        if q.origin.is_empty() {
            known.insert(normalize_term(&format!("{}/{}", dataset.origin, q.external_ref)));
        }
    }

    // the base set is always loaded first
    for q in &builtin::base_dataset()?.quantities {
        known.extend(q.terms().iter().map(|t| normalize_term(t)));
    }

    for ctx in &dataset.contexts {
        if ctx.path.iter().all(|s| s.trim().is_empty()) {
            return Err(LciaError::DatasetInvalid("context path must not be empty".into()));
        }
    }

    for flowable in &dataset.flowables {
        if flowable.name.trim().is_empty() {
            return Err(LciaError::DatasetInvalid(
                "flowable name must not be empty".into(),
            ));
        }
    }

    for flow in &dataset.flows {
        if flow.name.trim().is_empty() || flow.external_ref.trim().is_empty() {
            return Err(LciaError::DatasetInvalid(
                "flow name and external_ref must not be empty".into(),
            ));
        }
        if !known.contains(&normalize_term(&flow.reference_quantity)) {
            return Err(LciaError::DatasetInvalid(format!(
                "flow '{}' references unknown quantity '{}'",
                flow.name, flow.reference_quantity
            )));
        }
    }

    for cf in &dataset.characterizations {
        if cf.flowable.trim().is_empty() {
            return Err(LciaError::DatasetInvalid(
                "characterization flowable must not be empty".into(),
            ));
        }
        if !cf.value.is_finite() {
            return Err(LciaError::DatasetInvalid(format!(
                "characterization of '{}' has non-finite value",
                cf.flowable
            )));
        }
        for term in [&cf.ref_quantity, &cf.query_quantity] {
            if !known.contains(&normalize_term(term)) {
                return Err(LciaError::DatasetInvalid(format!(
                    "characterization of '{}' references unknown quantity '{}'",
                    cf.flowable, term
                )));
            }
        }
    }

    Ok(())
}
