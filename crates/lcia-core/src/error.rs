use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LciaError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("conversion reference mismatch for '{flowable}': cannot convert {from} to {to}")]
    ConversionReferenceMismatch {
        flowable: String,
        from: String,
        to: String,
    },

    #[error("reference quantity required to characterize '{0}'")]
    RefQuantityRequired(String),

    #[error("no characterization factors found for '{flowable}' in {quantity}")]
    NoFactorsFound { flowable: String, quantity: String },

    #[error("quantity mismatch: store holds {current}, inbound factor is for {inbound}")]
    QuantityMismatch { current: String, inbound: String },

    #[error("factor collision in context '{context}': existing value {existing}, new value {value}")]
    FactorCollision {
        context: String,
        existing: f64,
        value: f64,
    },

    #[error("duplicate characterization for '{flowable}' at locale {locale}: existing value {existing}, new value {value}")]
    DuplicateCharacterization {
        flowable: String,
        locale: String,
        existing: f64,
        value: f64,
    },

    #[error("unknown selection strategy '{0}'. Available: first, highest, lowest")]
    UnknownStrategy(String),

    #[error("context hierarchy contains a cycle at '{0}'")]
    ContextCycle(String),

    #[error("term manager is sealed; no further data can be loaded")]
    Sealed,

    #[error("failed to load dataset from {path}: {reason}")]
    DatasetLoad { path: PathBuf, reason: String },

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid dataset: {0}")]
    DatasetInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
