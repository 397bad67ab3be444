use lcia_core::context::Sense;
use lcia_core::error::LciaError;
use serde::Serialize;

use super::Sources;
use crate::output;

#[derive(Serialize)]
struct ContextRow {
    path: Vec<String>,
    sense: Option<Sense>,
    elementary: bool,
    synonyms: Vec<String>,
}

pub fn run(sources: &Sources, output_format: &str) -> Result<(), LciaError> {
    let tm = sources.open()?;

    match output_format {
        "json" => {
            let contexts = tm.contexts();
            let rows: Vec<ContextRow> = contexts
                .iter()
                .map(|(id, cx)| ContextRow {
                    path: contexts.path(id),
                    sense: contexts.sense(id),
                    elementary: contexts.is_elementary(id),
                    synonyms: cx.synonyms.iter().cloned().collect(),
                })
                .collect();
            output::json::print(&rows)?;
        }
        _ => output::table::print_contexts(&tm),
    }
    Ok(())
}
