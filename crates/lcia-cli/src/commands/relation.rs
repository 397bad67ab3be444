use lcia_core::error::LciaError;
use lcia_core::{FlowRef, QuantityEngine};

use super::{QueryArgs, Sources};
use crate::output;

pub fn relation(
    sources: &Sources,
    flowable: &str,
    ref_quantity: Option<&str>,
    query_quantity: &str,
    context: Option<&str>,
    query_args: &QueryArgs,
    output_format: &str,
) -> Result<(), LciaError> {
    let tm = sources.open()?;
    let options = query_args.apply(&tm.config().query)?;
    let engine = QuantityEngine::new(&tm);

    // a link that is not registered is read as a flowable term
    let conv = engine.quantity_relation(
        FlowRef::Link(flowable),
        ref_quantity,
        query_quantity,
        context,
        &options,
    )?;

    match output_format {
        "json" => output::json::print(&conv)?,
        _ => output::table::print_conversion(&tm, &conv),
    }
    Ok(())
}

pub fn conversions(
    sources: &Sources,
    flowable: &str,
    ref_quantity: Option<&str>,
    query_quantity: &str,
    context: Option<&str>,
    query_args: &QueryArgs,
    output_format: &str,
) -> Result<(), LciaError> {
    let tm = sources.open()?;
    let options = query_args.apply(&tm.config().query)?;
    let engine = QuantityEngine::new(&tm);

    let found = engine.quantity_conversions(
        FlowRef::Link(flowable),
        query_quantity,
        ref_quantity,
        context,
        &options,
    )?;

    match output_format {
        "json" => output::json::print(&found)?,
        _ => output::table::print_conversions(&tm, &found),
    }
    Ok(())
}

pub fn profile(
    sources: &Sources,
    flowable: &str,
    ref_quantity: Option<&str>,
    context: Option<&str>,
    query_args: &QueryArgs,
    output_format: &str,
) -> Result<(), LciaError> {
    let tm = sources.open()?;
    let options = query_args.apply(&tm.config().query)?;
    let engine = QuantityEngine::new(&tm);

    let profile = engine.profile(FlowRef::Link(flowable), ref_quantity, context, &options)?;

    match output_format {
        "json" => output::json::print(&profile)?,
        _ => {
            if profile.is_empty() {
                println!("No factors known for '{flowable}'.");
            }
            for conv in &profile {
                output::table::print_conversion(&tm, conv);
            }
        }
    }
    Ok(())
}
