use crate::engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use obligo_core::batch::RunSummary;
use obligo_core::types::Cadence;
use std::path::Path;

pub fn run(root: &Path, cadence: Option<Cadence>, all: bool, json: bool) -> anyhow::Result<()> {
    let engine = engine::open(root)?;

    let summary = if all {
        engine.processor.run_all()
    } else {
        let cadence = cadence.context("either --cadence or --all is required")?;
        let result = engine
            .processor
            .run(cadence)
            .with_context(|| format!("{cadence} run failed"))?;
        let mut summary = RunSummary::default();
        summary.push(result);
        summary
    };

    if json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }

    if !summary.errors.is_empty() {
        anyhow::bail!("{} cadence run(s) aborted", summary.errors.len());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let rows: Vec<Vec<String>> = summary
        .results
        .iter()
        .map(|r| {
            vec![
                r.cadence.to_string(),
                r.processed.to_string(),
                r.created.to_string(),
                r.failures.len().to_string(),
                format!("{}ms", r.duration_ms),
            ]
        })
        .collect();
    print_table(&["CADENCE", "PROCESSED", "CREATED", "FAILED", "DURATION"], &rows);

    if summary.results.len() > 1 {
        println!(
            "\nTotal: processed {}, created {}, failed {}",
            summary.processed, summary.created, summary.failed
        );
    }

    for f in &summary.failures {
        eprintln!("failed: {f}: {}", f.error);
    }
    for e in &summary.errors {
        eprintln!("aborted: {} after {}ms: {}", e.cadence, e.duration_ms, e.error);
    }
}
