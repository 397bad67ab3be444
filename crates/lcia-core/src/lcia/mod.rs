pub mod result;

use crate::config::QueryOptions;
use crate::context::Sense;
use crate::engine::{CfLookup, QuantityEngine};
use crate::error::LciaError;
use crate::model::{Direction, Exchange, ExchangeType, Termination};
use result::LciaResult;

/// Group key: the owning process.
pub fn by_process(x: &Exchange) -> String {
    x.process.clone()
}

/// Group key: the flow name.
pub fn by_flow(x: &Exchange) -> String {
    x.flow.name.clone()
}

/// Characterize an inventory against `quantity`.
///
/// Reference exchanges and exchanges without a factor are cut off,
/// self-terminated exchanges are excluded, and everything else is scored
/// under `group(exchange)`. Missing data never fails the run; only an
/// unknown `quantity` does.
pub fn do_lcia<F>(
    engine: &QuantityEngine<'_>,
    quantity: &str,
    inventory: &[Exchange],
    options: &QueryOptions,
    group: F,
) -> Result<LciaResult, LciaError>
where
    F: Fn(&Exchange) -> String,
{
    let tm = engine.term_manager();
    let qq = tm.get_canonical(quantity)?;
    let (name, unit) = tm
        .quantities()
        .get(qq)
        .map(|q| (q.name.clone(), q.reference_unit.clone()))
        .unwrap_or_default();
    let mut result = LciaResult::new(qq, &name, &unit);

    for x in inventory {
        match x.exchange_type() {
            ExchangeType::Reference => result.add_cutoff(x.clone()),
            ExchangeType::SelfTerminated => result.add_excluded(x.clone()),
            ExchangeType::Context | ExchangeType::Cutoff | ExchangeType::Node => {
                let context = match &x.termination {
                    Termination::Context(term) => Some(term.as_str()),
                    _ => None,
                };
                match engine.lookup_cf(&x.flow, qq, context, options) {
                    CfLookup::Found(conv) if conv.value() == 0.0 => result.add_zero(x.clone()),
                    CfLookup::Found(conv) => {
                        let sign = match (tm.contexts().sense(conv.query_context()), x.direction) {
                            (Some(Sense::Source), Direction::Output) | (Some(Sense::Sink), Direction::Input) => -1.0,
                            _ => 1.0,
                        };
                        result.add_score(group(x), x.clone(), conv, sign);
                    }
                    CfLookup::Mismatch(err) => result.add_error(x.clone(), err),
                    CfLookup::QuelledCo2 => result.add_zero(x.clone()),
                    CfLookup::NotFound => result.add_cutoff(x.clone()),
                }
            }
        }
    }

    if !result.errors().is_empty() {
        tracing::warn!(
            "{}: {} exchanges could not be characterized (reference mismatch)",
            name,
            result.errors().len()
        );
    }
    tracing::debug!(
        "{}: {} scored, {} cutoff, {} zero, {} excluded",
        name,
        result.components().map(|c| c.details.len()).sum::<usize>(),
        result.cutoffs().len(),
        result.zeros().len(),
        result.excluded().len()
    );
    Ok(result)
}
