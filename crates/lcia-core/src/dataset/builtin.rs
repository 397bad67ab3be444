use crate::dataset::schema::DatasetDef;
use crate::error::LciaError;

const BASE_DATASET_JSON: &str = include_str!("../../../../data/base-dataset.json");
const GWP100_JSON: &str = include_str!("../../../../data/ipcc-gwp100.json");

/// Available predefined datasets.
pub const PRESETS: &[&str] = &["base", "gwp100"];

/// Reference quantities and compartments every term manager starts from.
pub fn base_dataset() -> Result<DatasetDef, LciaError> {
    let dataset: DatasetDef = serde_json::from_str(BASE_DATASET_JSON)?;
    Ok(dataset)
}

/// Load a predefined dataset by name.
pub fn load_preset(name: &str) -> Result<DatasetDef, LciaError> {
    match name {
        "base" => base_dataset(),
        "gwp100" => {
            let dataset: DatasetDef = serde_json::from_str(GWP100_JSON)?;
            Ok(dataset)
        }
        _ => Err(LciaError::DatasetInvalid(format!(
            "unknown preset '{}'. Available: {}",
            name,
            PRESETS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::validate_dataset;

    #[test]
    fn test_base_dataset() {
        let ds = base_dataset().unwrap();
        assert_eq!(ds.origin, "local.qdb");
        assert!(ds.quantities.iter().any(|q| q.external_ref == "mass"));
        assert!(ds.contexts.iter().any(|c| c.path == ["emissions"]));
        validate_dataset(&ds).unwrap();
    }

    #[test]
    fn test_all_presets_valid() {
        for name in PRESETS {
            let ds = load_preset(name).unwrap();
            validate_dataset(&ds).unwrap();
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(load_preset("xyz").is_err());
    }
}
