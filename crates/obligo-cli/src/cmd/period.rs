use crate::cmd::parse_datetime;
use crate::engine;
use crate::output::print_json;
use obligo_core::period::{period, FinancialYear};
use obligo_core::types::Cadence;
use std::path::Path;

pub fn run(root: &Path, cadence: Cadence, at: Option<&str>, json: bool) -> anyhow::Result<()> {
    let at = match at {
        Some(s) => parse_datetime(s)?,
        None => engine::local_now(root)?,
    };
    let id = period(at, cadence);

    if json {
        print_json(&serde_json::json!({
            "cadence": cadence,
            "at": at,
            "period": id,
            "financial_year": FinancialYear::containing(at.date()).to_string(),
        }))?;
    } else {
        println!("{id}");
    }
    Ok(())
}
