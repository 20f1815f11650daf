use crate::engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use obligo_core::registry::{Obligation, Registry};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ObligationSubcommand {
    /// Validate, normalize and store a definition from a YAML file
    Add {
        file: PathBuf,
        /// Replace an existing definition with the same id
        #[arg(long)]
        replace: bool,
    },
    /// Validate a definition file and print its normalized form without storing it
    Validate { file: PathBuf },
    /// List stored definitions
    List,
    /// Show one definition
    Show { id: String },
}

pub fn run(root: &Path, subcmd: ObligationSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ObligationSubcommand::Add { file, replace } => add(root, &file, replace, json),
        ObligationSubcommand::Validate { file } => validate(&file, json),
        ObligationSubcommand::List => list(root, json),
        ObligationSubcommand::Show { id } => show(root, &id, json),
    }
}

fn read_definition(file: &Path) -> anyhow::Result<Obligation> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("failed to parse {}", file.display()))
}

fn add(root: &Path, file: &Path, replace: bool, json: bool) -> anyhow::Result<()> {
    engine::load_config(root)?;
    let registry = Registry::new(root);
    let mut obligation = read_definition(file)?;

    let stored = if replace {
        registry.save_obligation(&mut obligation)
    } else {
        registry.create_obligation(&mut obligation)
    };
    stored.with_context(|| format!("failed to store obligation '{}'", obligation.id))?;

    if json {
        print_json(&obligation)?;
    } else {
        let verb = if replace { "Saved" } else { "Created" };
        println!("{verb} obligation '{}' ({}).", obligation.id, obligation.name);
        for unit in obligation.units() {
            println!(
                "  {:<16} {}",
                unit.sub_obligation_id.unwrap_or("(self)"),
                unit.cadence
            );
        }
    }
    Ok(())
}

fn validate(file: &Path, json: bool) -> anyhow::Result<()> {
    let mut obligation = read_definition(file)?;
    obligation
        .validate_and_normalize()
        .with_context(|| format!("'{}' is invalid", obligation.id))?;

    if json {
        print_json(&obligation)?;
    } else {
        print!("{}", serde_yaml::to_string(&obligation)?);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    engine::load_config(root)?;
    let obligations = Registry::new(root)
        .list_obligations()
        .context("failed to list obligations")?;

    if json {
        let items: Vec<serde_json::Value> = obligations
            .iter()
            .map(|o| {
                serde_json::json!({
                    "id": o.id,
                    "name": o.name,
                    "sub_obligations": o.sub_obligations.len(),
                    "cadences": cadences(o),
                })
            })
            .collect();
        print_json(&items)?;
        return Ok(());
    }

    if obligations.is_empty() {
        println!("No obligations.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = obligations
        .iter()
        .map(|o| {
            vec![
                o.id.clone(),
                o.name.clone(),
                o.sub_obligations.len().to_string(),
                cadences(o).join(", "),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "SUBS", "CADENCES"], &rows);
    Ok(())
}

/// Distinct cadences across an obligation's schedule units.
fn cadences(obligation: &Obligation) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for unit in obligation.units() {
        let c = unit.cadence.to_string();
        if !seen.contains(&c) {
            seen.push(c);
        }
    }
    seen
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    engine::load_config(root)?;
    let obligation = Registry::new(root)
        .load_obligation(id)
        .with_context(|| format!("obligation '{id}' not found"))?;

    if json {
        print_json(&obligation)?;
    } else {
        print!("{}", serde_yaml::to_string(&obligation)?);
    }
    Ok(())
}
