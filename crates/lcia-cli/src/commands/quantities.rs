use lcia_core::error::LciaError;
use lcia_core::model::Quantity;

use super::Sources;
use crate::output;

pub fn run(sources: &Sources, output_format: &str) -> Result<(), LciaError> {
    let tm = sources.open()?;
    let quantities: Vec<&Quantity> = tm.quantities().iter().map(|(_, q)| q).collect();

    match output_format {
        "json" => output::json::print(&quantities)?,
        _ => output::table::print_quantities(&tm),
    }
    Ok(())
}
