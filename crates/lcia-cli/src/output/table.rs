use lcia_core::engine::conversion::{Conversions, QuantityConversion};
use lcia_core::lcia::result::LciaResult;
use lcia_core::model::{ContextId, Exchange};
use lcia_core::TermManager;

pub fn print_quantities(tm: &TermManager) {
    let quantities = tm.quantities();
    let rows: Vec<_> = quantities.iter().collect();
    let max_name = rows.iter().map(|(_, q)| q.name.len()).max().unwrap_or(10);
    let max_unit = rows
        .iter()
        .map(|(_, q)| q.reference_unit.len())
        .max()
        .unwrap_or(4);

    for (id, q) in &rows {
        let kind = if q.is_lcia_method { "LCIA" } else { "" };
        println!(
            "  {:<name_w$}  {:<unit_w$}  {:<4}  {}",
            q.name,
            q.reference_unit,
            kind,
            q.link(),
            name_w = max_name,
            unit_w = max_unit
        );
        for child in quantities.children(*id) {
            if let Some(c) = quantities.get(child) {
                println!("  {:<name_w$}    also {}", "", c.link(), name_w = max_name);
            }
        }
        if !q.unit_conversion.is_empty() {
            let units: Vec<String> = q
                .unit_conversion
                .iter()
                .map(|(unit, factor)| format!("{unit} ({factor})"))
                .collect();
            println!("  {:<name_w$}    units: {}", "", units.join(", "), name_w = max_name);
        }
        if !q.normalisation_factors.is_empty() {
            let norms: Vec<String> = q
                .norm_sets
                .iter()
                .zip(&q.normalisation_factors)
                .map(|(set, factor)| format!("{set} ({factor})"))
                .collect();
            println!("  {:<name_w$}    norm: {}", "", norms.join(", "), name_w = max_name);
        }
    }
}

pub fn print_contexts(tm: &TermManager) {
    for root in tm.contexts().roots() {
        print_context_tree(tm, root, 1);
    }
}

fn print_context_tree(tm: &TermManager, id: ContextId, depth: usize) {
    let contexts = tm.contexts();
    let Some(cx) = contexts.context(id) else {
        return;
    };

    let mut line = format!("{}{}", "  ".repeat(depth), cx.name);
    if let Some(sense) = cx.sense {
        line.push_str(&format!(" [{sense}]"));
    }
    if cx.elementary {
        line.push_str(" (elementary)");
    }
    if !cx.synonyms.is_empty() {
        let synonyms: Vec<&str> = cx.synonyms.iter().map(String::as_str).collect();
        line.push_str(&format!("  aka {}", synonyms.join(", ")));
    }
    println!("{line}");

    for child in &cx.children {
        print_context_tree(tm, *child, depth + 1);
    }
}

pub fn print_conversion(tm: &TermManager, conv: &QuantityConversion) {
    println!("  {}", tm.describe_conversion(conv));
    if conv.len() > 1 {
        for step in conv.results() {
            println!(
                "    {} {} per {} ({}, {}) [{}]",
                step.value,
                tm.quantities().unit(step.query_quantity),
                tm.quantities().unit(step.ref_quantity),
                tm.contexts().name(step.context),
                step.locale,
                step.origin
            );
        }
    }
}

pub fn print_conversions(tm: &TermManager, found: &Conversions) {
    if found.valid.len() == 1 && found.valid[0].is_null() {
        println!("No factors found.");
        return;
    }

    println!("Valid ({}):", found.valid.len());
    for conv in &found.valid {
        print_conversion(tm, conv);
    }

    if !found.geographic_proxy.is_empty() {
        println!("\nGeographic proxies ({}):", found.geographic_proxy.len());
        for conv in &found.geographic_proxy {
            print_conversion(tm, conv);
        }
    }

    if !found.mismatched.is_empty() {
        println!("\nReference mismatches ({}):", found.mismatched.len());
        for err in &found.mismatched {
            let reached = err
                .reached()
                .map(|q| tm.quantities().describe(q))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}: stopped at {}, needed {}",
                err.flowable().unwrap_or("-"),
                reached,
                tm.quantities().describe(err.target)
            );
        }
    }
}

fn exchange_line(x: &Exchange) -> String {
    format!("{} {} {} ({})", x.direction, x.value, x.flow, x.process)
}

pub fn print_lcia(tm: &TermManager, result: &LciaResult, details: bool) {
    let mut title = result.quantity_name.clone();
    if let Some(ref scenario) = result.scenario {
        title.push_str(&format!(" - {scenario}"));
    }
    println!("=== {} ===\n", title);
    println!("  Total: {} {}\n", result.total(), result.unit);

    let components: Vec<_> = result.components().collect();
    if !components.is_empty() {
        let max_key = components.iter().map(|c| c.key.len()).max().unwrap_or(10);
        for c in &components {
            println!(
                "  {:<width$}  {} {}",
                c.key,
                c.cumulative_result(),
                result.unit,
                width = max_key
            );
            if details {
                for d in &c.details {
                    let sign = if d.sign < 0.0 { " (negated)" } else { "" };
                    println!(
                        "    {} x {} = {}{}",
                        exchange_line(&d.exchange),
                        d.conversion.value(),
                        d.result,
                        sign
                    );
                }
            }
        }
        println!();
    }

    println!(
        "  {} cutoff, {} zero, {} excluded, {} mismatched",
        result.cutoffs().len(),
        result.zeros().len(),
        result.excluded().len(),
        result.errors().len()
    );

    if !result.errors().is_empty() {
        println!("\n  Exchanges whose reference quantity could not be reached:");
        for e in result.errors() {
            println!(
                "    {} (needed {})",
                exchange_line(&e.exchange),
                tm.quantities().describe(e.mismatch.target)
            );
        }
    }

    if details {
        if !result.cutoffs().is_empty() {
            println!("\n  Cutoff:");
            for x in result.cutoffs() {
                let marker = if x.is_reference { " [reference]" } else { "" };
                println!("    {}{}", exchange_line(x), marker);
            }
        }
        if !result.zeros().is_empty() {
            println!("\n  Zero:");
            for x in result.zeros() {
                println!("    {}", exchange_line(x));
            }
        }
        if !result.excluded().is_empty() {
            println!("\n  Excluded:");
            for x in result.excluded() {
                println!("    {}", exchange_line(x));
            }
        }
    }
}
