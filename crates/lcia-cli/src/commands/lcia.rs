use lcia_core::error::LciaError;
use lcia_core::lcia::{by_flow, by_process};
use lcia_core::model::Exchange;
use lcia_core::{do_lcia, QuantityEngine};
use std::path::PathBuf;

use super::{QueryArgs, Sources};
use crate::output;

#[allow(clippy::too_many_arguments)]
pub fn run(
    sources: &Sources,
    inventory_file: PathBuf,
    quantity: &str,
    group: &str,
    scale: Option<f64>,
    scenario: Option<&str>,
    query_args: &QueryArgs,
    output_format: &str,
    details: bool,
) -> Result<(), LciaError> {
    let json_bytes = std::fs::read(&inventory_file)?;
    let inventory: Vec<Exchange> = serde_json::from_slice(&json_bytes)?;
    tracing::info!(
        "{}: {} exchanges",
        inventory_file.display(),
        inventory.len()
    );

    let tm = sources.open()?;
    let options = query_args.apply(&tm.config().query)?;
    let engine = QuantityEngine::new(&tm);

    let group_by: fn(&Exchange) -> String = match group {
        "flow" => by_flow,
        _ => by_process,
    };
    let mut result = do_lcia(&engine, quantity, &inventory, &options, group_by)?;
    if let Some(factor) = scale {
        result.scale_by(factor);
    }
    if let Some(label) = scenario {
        result = result.with_scenario(label);
    }

    match output_format {
        "json" => output::json::print(&result)?,
        _ => output::table::print_lcia(&tm, &result, details),
    }
    Ok(())
}
