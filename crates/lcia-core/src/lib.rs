pub mod characterization;
pub mod clookup;
pub mod config;
pub mod context;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod lcia;
pub mod model;
pub mod provider;
pub mod quantity;
pub mod term_manager;
pub mod terms;

pub use config::{EngineConfig, QueryOptions, Strategy};
pub use engine::QuantityEngine;
pub use error::LciaError;
pub use lcia::do_lcia;
pub use model::FlowRef;
pub use term_manager::TermManager;

use dataset::schema::DatasetDef;

/// Main API entry point: a sealed term manager holding the built-in base
/// data plus each dataset in order.
///
/// A dataset that fails to load entirely is an error; individual records
/// that fail are logged and skipped.
pub fn open_term_manager(
    datasets: &[DatasetDef],
    config: EngineConfig,
) -> Result<TermManager, LciaError> {
    let mut tm = TermManager::bootstrap(config)?;
    for ds in datasets {
        let report = tm.load(ds)?;
        if !report.is_clean() {
            tracing::warn!(
                "{}: {} records skipped",
                ds.name,
                report.failures.len()
            );
        }
    }
    tm.seal();
    Ok(tm)
}
