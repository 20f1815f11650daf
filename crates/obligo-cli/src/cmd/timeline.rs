use crate::engine;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use obligo_core::period::Period;
use obligo_core::store::{TimelineKey, TimelineRecord, TimelineStore};
use obligo_core::types::TimelineStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum TimelineSubcommand {
    /// List timelines, ordered by due date
    List {
        /// Only this client's timelines
        #[arg(long)]
        client: Option<String>,
    },
    /// Set the status of one timeline
    Status {
        client: String,
        obligation: String,
        period: String,
        /// pending | ongoing | delayed | completed
        status: TimelineStatus,
        /// Sub-obligation id
        #[arg(long)]
        sub: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: TimelineSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TimelineSubcommand::List { client } => list(root, client.as_deref(), json),
        TimelineSubcommand::Status {
            client,
            obligation,
            period,
            status,
            sub,
        } => {
            let key = TimelineKey::new(client, obligation, sub.as_deref(), Period::from(period));
            set_status(root, &key, status, json)
        }
    }
}

fn list(root: &Path, client: Option<&str>, json: bool) -> anyhow::Result<()> {
    let engine = engine::open(root)?;
    let mut timelines = match client {
        Some(id) => engine.db.list_for_client(id),
        None => engine.db.list_all(),
    }
    .context("failed to read timelines")?;
    timelines.sort_by(|a, b| a.due_date.cmp(&b.due_date));

    if json {
        print_json(&timelines)?;
        return Ok(());
    }

    if timelines.is_empty() {
        println!("No timelines.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = timelines.iter().map(row).collect();
    print_table(
        &["CLIENT", "OBLIGATION", "SUB", "PERIOD", "DUE", "STATUS"],
        &rows,
    );
    Ok(())
}

fn row(t: &TimelineRecord) -> Vec<String> {
    vec![
        t.key.client_id.clone(),
        t.key.obligation_id.clone(),
        or_dash(t.key.sub_obligation_id.as_deref()),
        t.key.period.to_string(),
        t.due_date.format("%Y-%m-%d %H:%M").to_string(),
        t.status.to_string(),
    ]
}

fn set_status(
    root: &Path,
    key: &TimelineKey,
    status: TimelineStatus,
    json: bool,
) -> anyhow::Result<()> {
    let engine = engine::open(root)?;
    let record = engine
        .db
        .set_status(key, status)
        .with_context(|| format!("failed to update timeline {key}"))?;

    if json {
        print_json(&record)?;
    } else {
        println!("{key}: {}", record.status);
    }
    Ok(())
}
