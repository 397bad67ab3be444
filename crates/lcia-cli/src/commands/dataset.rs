use lcia_core::dataset::builtin;
use lcia_core::error::LciaError;
use lcia_core::{EngineConfig, TermManager};
use std::path::Path;

pub fn list() -> Result<(), LciaError> {
    println!("Available predefined datasets:\n");
    for name in builtin::PRESETS {
        let ds = builtin::load_preset(name)?;
        println!("  {:<8} {} (v{}) [{}]", name, ds.name, ds.version, ds.origin);
        if let Some(ref desc) = ds.description {
            println!("           {}", desc);
        }
        println!(
            "           {} quantities, {} contexts, {} flowables, {} factors",
            ds.quantities.len(),
            ds.contexts.len(),
            ds.flowables.len(),
            ds.characterizations.len()
        );
        println!();
    }
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), LciaError> {
    let ds = lcia_core::dataset::load_dataset(file)?;

    println!("Dataset '{}' (v{}) is valid.", ds.name, ds.version);
    println!("  Origin: {}", ds.origin);
    println!(
        "  {} quantities, {} contexts, {} flowables, {} flows, {} factors",
        ds.quantities.len(),
        ds.contexts.len(),
        ds.flowables.len(),
        ds.flows.len(),
        ds.characterizations.len()
    );

    // A structurally valid file can still have records the term manager
    // refuses, e.g. two values for the same factor.
    let mut tm = TermManager::bootstrap(EngineConfig::default())?;
    let report = tm.load(&ds)?;

    let mut warnings = report.failures.clone();
    for q in &ds.quantities {
        if q.is_lcia_method && q.indicator.is_none() {
            warnings.push(format!("indicator '{}' has no indicator name", q.external_ref));
        }
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}
