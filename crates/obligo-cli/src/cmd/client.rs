use crate::engine;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use obligo_core::registry::{ActiveStatus, Client, Registry};
use obligo_core::ObligoError;
use std::path::Path;

#[derive(Subcommand)]
pub enum ClientSubcommand {
    /// Register a client and its obligation assignments
    Add {
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Branch the client's timelines belong to
        #[arg(long)]
        branch: Option<String>,
        /// Obligation to assign, optionally pinned: gst or gst/gstr-3b (repeatable)
        #[arg(long = "assign", value_name = "OBLIGATION[/SUB]")]
        assignments: Vec<String>,
        /// Register the client as inactive
        #[arg(long)]
        inactive: bool,
        /// Replace an existing client with the same id
        #[arg(long)]
        replace: bool,
    },
    /// List clients
    List,
}

pub fn run(root: &Path, subcmd: ClientSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ClientSubcommand::Add {
            id,
            name,
            branch,
            assignments,
            inactive,
            replace,
        } => {
            let mut client = Client::new(id, name);
            client.branch_id = branch;
            if inactive {
                client.status = ActiveStatus::Inactive;
            }
            for entry in &assignments {
                client = match entry.split_once('/') {
                    Some((obligation, sub)) => client.assign(obligation, Some(sub)),
                    None => client.assign(entry.as_str(), None),
                };
            }
            add(root, &client, replace, json)
        }
        ClientSubcommand::List => list(root, json),
    }
}

fn add(root: &Path, client: &Client, replace: bool, json: bool) -> anyhow::Result<()> {
    engine::load_config(root)?;
    let registry = Registry::new(root);
    if !replace && registry.load_client(&client.id).is_ok() {
        return Err(ObligoError::ClientExists(client.id.clone()).into());
    }
    registry
        .save_client(client)
        .with_context(|| format!("failed to store client '{}'", client.id))?;

    if json {
        print_json(client)?;
    } else {
        println!(
            "Saved client '{}' with {} assignment(s).",
            client.id,
            client.assignments.len()
        );
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    engine::load_config(root)?;
    let clients = Registry::new(root)
        .list_clients()
        .context("failed to list clients")?;

    if json {
        print_json(&clients)?;
        return Ok(());
    }

    if clients.is_empty() {
        println!("No clients.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = clients
        .iter()
        .map(|c| {
            let assigned: Vec<String> = c
                .active_assignments()
                .map(|a| match &a.sub_obligation_id {
                    Some(sub) => format!("{}/{sub}", a.obligation_id),
                    None => a.obligation_id.clone(),
                })
                .collect();
            vec![
                c.id.clone(),
                c.name.clone(),
                or_dash(c.branch_id.as_deref()),
                match c.status {
                    ActiveStatus::Active => "active".to_string(),
                    ActiveStatus::Inactive => "inactive".to_string(),
                },
                assigned.join(", "),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "BRANCH", "STATUS", "ASSIGNMENTS"], &rows);
    Ok(())
}
