//! Obligation definitions and client assignments.
//!
//! These are owned by the practice's CRUD flows; the engine only reads them
//! through [`Directory`]. [`Registry`] is the file-backed implementation:
//! one YAML document per obligation under `.obligo/obligations/` and one per
//! client under `.obligo/clients/`. Saving an obligation is the create/update
//! path, so it validates and normalizes every frequency config first and
//! returns the validation error to the caller.

use crate::error::{ObligoError, Result};
use crate::frequency::{self, FrequencyConfig, RawFrequencyConfig};
use crate::io::YamlEntry;
use crate::paths;
use crate::types::Cadence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Obligation definitions
// ---------------------------------------------------------------------------

/// A blank field copied onto every timeline of the obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTemplate {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubObligation {
    pub id: String,
    pub name: String,
    pub cadence: Cadence,
    #[serde(default, skip_serializing_if = "RawFrequencyConfig::is_empty")]
    pub frequency_config: RawFrequencyConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub name: String,
    /// Only read when the obligation has no sub-obligations.
    #[serde(default = "default_cadence")]
    pub cadence: Cadence,
    #[serde(default, skip_serializing_if = "RawFrequencyConfig::is_empty")]
    pub frequency_config: RawFrequencyConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldTemplate>,
    #[serde(default)]
    pub sub_obligations: Vec<SubObligation>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_cadence() -> Cadence {
    Cadence::None
}

/// One materializable schedule: a sub-obligation, or an obligation that has
/// none and carries its own cadence.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleUnit<'a> {
    pub sub_obligation_id: Option<&'a str>,
    pub name: &'a str,
    pub cadence: Cadence,
    pub frequency_config: &'a RawFrequencyConfig,
    pub fields: &'a [FieldTemplate],
}

impl ScheduleUnit<'_> {
    pub fn frequency(&self) -> Result<FrequencyConfig> {
        frequency::validate(self.cadence, self.frequency_config)
    }
}

impl Obligation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cadence: Cadence::None,
            frequency_config: RawFrequencyConfig::default(),
            fields: Vec::new(),
            sub_obligations: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn sub_obligation(&self, id: &str) -> Option<&SubObligation> {
        self.sub_obligations.iter().find(|s| s.id == id)
    }

    pub fn units(&self) -> Vec<ScheduleUnit<'_>> {
        if self.sub_obligations.is_empty() {
            return vec![ScheduleUnit {
                sub_obligation_id: None,
                name: &self.name,
                cadence: self.cadence,
                frequency_config: &self.frequency_config,
                fields: &self.fields,
            }];
        }
        self.sub_obligations
            .iter()
            .map(|s| ScheduleUnit {
                sub_obligation_id: Some(s.id.as_str()),
                name: &s.name,
                cadence: s.cadence,
                frequency_config: &s.frequency_config,
                fields: if s.fields.is_empty() {
                    &self.fields
                } else {
                    &s.fields
                },
            })
            .collect()
    }

    /// Change the cadence of the obligation itself (`sub = None`) or of one
    /// sub-obligation. Fields left over from the old cadence are dropped.
    pub fn set_frequency(
        &mut self,
        sub: Option<&str>,
        cadence: Cadence,
        raw: &RawFrequencyConfig,
    ) -> Result<()> {
        frequency::validate(cadence, raw)?;
        let normalized = frequency::normalize(cadence, raw);
        match sub {
            None => {
                self.cadence = cadence;
                self.frequency_config = normalized;
            }
            Some(id) => {
                let s = self
                    .sub_obligations
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or_else(|| ObligoError::SubObligationNotFound(id.to_string()))?;
                s.cadence = cadence;
                s.frequency_config = normalized;
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Validate ids and every frequency config, normalizing them in place.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        paths::validate_id(&self.id)?;
        if self.sub_obligations.is_empty() {
            frequency::validate(self.cadence, &self.frequency_config)?;
            self.frequency_config = frequency::normalize(self.cadence, &self.frequency_config);
        } else {
            // The obligation's own config is dead weight once it has subs.
            self.frequency_config = RawFrequencyConfig::default();
        }
        for sub in &mut self.sub_obligations {
            paths::validate_id(&sub.id)?;
            frequency::validate(sub.cadence, &sub.frequency_config)?;
            sub.frequency_config = frequency::normalize(sub.cadence, &sub.frequency_config);
        }
        let mut seen: Vec<&str> = Vec::new();
        for sub in &self.sub_obligations {
            if seen.contains(&sub.id.as_str()) {
                return Err(ObligoError::ObligationExists(format!("{}/{}", self.id, sub.id)));
            }
            seen.push(&sub.id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveStatus {
    #[default]
    Active,
    Inactive,
}

/// A client's link to an obligation, optionally pinned to one sub-obligation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub obligation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_obligation_id: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        self.status == ActiveStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Client {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            branch_id: None,
            status: ActiveStatus::Active,
            assignments: Vec::new(),
        }
    }

    pub fn assign(mut self, obligation_id: impl Into<String>, sub_obligation_id: Option<&str>) -> Self {
        self.assignments.push(Assignment {
            obligation_id: obligation_id.into(),
            sub_obligation_id: sub_obligation_id.map(str::to_string),
            status: ActiveStatus::Active,
        });
        self
    }

    pub fn active_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter().filter(|a| a.is_active())
    }

    /// Active and holding at least one active assignment.
    pub fn is_schedulable(&self) -> bool {
        self.status == ActiveStatus::Active && self.active_assignments().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Read-only view of definitions and clients consumed by the batch.
pub trait Directory: Send + Sync {
    /// Every client document, in a stable order. A document that cannot be
    /// read is returned as an entry carrying its error.
    fn clients(&self) -> Result<Vec<YamlEntry<Client>>>;

    fn obligation(&self, id: &str) -> Result<Obligation>;
}

/// File-backed definitions under `<root>/.obligo/`.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
}

impl Registry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn list_obligations(&self) -> Result<Vec<Obligation>> {
        crate::io::read_yaml_dir(&paths::obligations_dir(&self.root))
    }

    pub fn load_obligation(&self, id: &str) -> Result<Obligation> {
        let path = paths::obligation_path(&self.root, id);
        if !path.exists() {
            return Err(ObligoError::ObligationNotFound(id.to_string()));
        }
        crate::io::read_yaml(&path)
    }

    /// Create or replace an obligation definition.
    ///
    /// Validation errors are returned before anything is written.
    pub fn save_obligation(&self, obligation: &mut Obligation) -> Result<()> {
        obligation.validate_and_normalize()?;
        obligation.updated_at = Utc::now();
        let data = serde_yaml::to_string(obligation)?;
        crate::io::atomic_write(&paths::obligation_path(&self.root, &obligation.id), data.as_bytes())
    }

    /// Like [`save_obligation`](Self::save_obligation) but refuses to replace.
    pub fn create_obligation(&self, obligation: &mut Obligation) -> Result<()> {
        if paths::obligation_path(&self.root, &obligation.id).exists() {
            return Err(ObligoError::ObligationExists(obligation.id.clone()));
        }
        self.save_obligation(obligation)
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        crate::io::read_yaml_dir(&paths::clients_dir(&self.root))
    }

    pub fn load_client(&self, id: &str) -> Result<Client> {
        let path = paths::client_path(&self.root, id);
        if !path.exists() {
            return Err(ObligoError::ClientNotFound(id.to_string()));
        }
        crate::io::read_yaml(&path)
    }

    /// Create or replace a client. Assignments must reference existing
    /// obligations and, when pinned, existing sub-obligations.
    pub fn save_client(&self, client: &Client) -> Result<()> {
        paths::validate_id(&client.id)?;
        for assignment in &client.assignments {
            let obligation = self.load_obligation(&assignment.obligation_id)?;
            if let Some(sub) = &assignment.sub_obligation_id {
                if obligation.sub_obligation(sub).is_none() {
                    return Err(ObligoError::SubObligationNotFound(format!(
                        "{}/{sub}",
                        obligation.id
                    )));
                }
            }
        }
        let data = serde_yaml::to_string(client)?;
        crate::io::atomic_write(&paths::client_path(&self.root, &client.id), data.as_bytes())
    }
}

impl Directory for Registry {
    fn clients(&self) -> Result<Vec<YamlEntry<Client>>> {
        crate::io::read_yaml_entries(&paths::clients_dir(&self.root))
    }

    fn obligation(&self, id: &str) -> Result<Obligation> {
        self.load_obligation(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
