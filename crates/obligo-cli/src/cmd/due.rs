use crate::cmd::parse_datetime;
use crate::engine;
use crate::output::print_json;
use anyhow::Context;
use obligo_core::due_date::{current_period_due_date, next_occurrence};
use obligo_core::period::period;
use obligo_core::registry::Registry;
use obligo_core::ObligoError;
use std::path::Path;

pub fn run(
    root: &Path,
    obligation_id: &str,
    sub: Option<&str>,
    from: Option<&str>,
    current: bool,
    json: bool,
) -> anyhow::Result<()> {
    engine::load_config(root)?;
    let obligation = Registry::new(root)
        .load_obligation(obligation_id)
        .with_context(|| format!("obligation '{obligation_id}' not found"))?;

    let units = obligation.units();
    let unit = match sub {
        Some(id) => units
            .iter()
            .find(|u| u.sub_obligation_id == Some(id))
            .ok_or_else(|| ObligoError::SubObligationNotFound(format!("{obligation_id}/{id}")))?,
        None if units.len() == 1 => &units[0],
        None => anyhow::bail!(
            "'{obligation_id}' has {} sub-obligations; pick one with --sub",
            units.len()
        ),
    };

    let from = match from {
        Some(s) => parse_datetime(s)?,
        None => engine::local_now(root)?,
    };
    let config = unit.frequency()?;
    let due = if current {
        current_period_due_date(&config, from)?
    } else {
        next_occurrence(&config, from)?
    };

    if json {
        print_json(&serde_json::json!({
            "obligation_id": obligation.id,
            "sub_obligation_id": unit.sub_obligation_id,
            "cadence": unit.cadence,
            "from": from,
            "period": period(from, unit.cadence),
            "due_date": due,
        }))?;
    } else {
        println!("{}", due.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}
