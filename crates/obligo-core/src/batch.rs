//! One materialization pass for one cadence.
//!
//! [`BatchProcessor::run`] walks every schedulable client, every active
//! assignment, and every schedule unit of the assigned obligation whose
//! cadence matches, and asks the [`Materializer`] for the current period's
//! timeline. It has no notion of triggers: the scheduler and the manual
//! run-all entry point call it the same way.
//!
//! A failing item (bad config, impossible date, missing definition, store
//! error) is logged, recorded in [`JobRunResult::failures`], and skipped; the
//! rest of the run continues. Only failing to enumerate clients aborts a run.

use crate::clock::Clock;
use crate::due_date::current_period_due_date;
use crate::error::{ObligoError, Result};
use crate::materializer::{Materializer, TimelineMetadata};
use crate::period::{period, FinancialYear};
use crate::registry::{Assignment, Client, Directory, Obligation, ScheduleUnit};
use crate::store::{FieldValue, TimelineKey, TimelineStore};
use crate::types::Cadence;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One client/obligation/sub-obligation that could not be materialized.
///
/// `obligation_id` is `None` when the client document itself could not be
/// read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ItemFailure {
    pub client_id: String,
    pub obligation_id: Option<String>,
    pub sub_obligation_id: Option<String>,
    pub error: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.client_id)?;
        if let Some(obligation) = &self.obligation_id {
            write!(f, "/{obligation}")?;
        }
        if let Some(sub) = &self.sub_obligation_id {
            write!(f, "/{sub}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRunResult {
    pub cadence: Cadence,
    /// Matching units attempted, including failed ones.
    pub processed: u64,
    /// Units for which a new timeline was written.
    pub created: u64,
    pub failures: Vec<ItemFailure>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl JobRunResult {
    fn new(cadence: Cadence, started_at: DateTime<Utc>) -> Self {
        Self {
            cadence,
            processed: 0,
            created: 0,
            failures: Vec::new(),
            started_at,
            duration_ms: 0,
        }
    }
}

/// A cadence whose run could not start or was cut short.
#[derive(Debug, Clone, Serialize)]
pub struct CadenceError {
    pub cadence: Cadence,
    pub error: String,
    pub duration_ms: u64,
}

/// Combined outcome of running several cadences back to back.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub processed: u64,
    pub created: u64,
    /// Distinct failures across all results.
    pub failed: u64,
    pub results: Vec<JobRunResult>,
    /// Failures in first-seen order. A problem that is not tied to one
    /// cadence (an unreadable client, a stale pin) appears once even though
    /// every cadence run hits it.
    pub failures: Vec<ItemFailure>,
    pub errors: Vec<CadenceError>,
}

impl RunSummary {
    pub fn push(&mut self, result: JobRunResult) {
        self.processed += result.processed;
        self.created += result.created;
        for failure in &result.failures {
            if !self.failures.contains(failure) {
                self.failures.push(failure.clone());
            }
        }
        self.failed = self.failures.len() as u64;
        self.results.push(result);
    }

    pub fn push_error(&mut self, cadence: Cadence, error: &ObligoError, duration: Duration) {
        self.errors.push(CadenceError {
            cadence,
            error: error.to_string(),
            duration_ms: duration.as_millis() as u64,
        });
    }
}

// ---------------------------------------------------------------------------
// BatchProcessor
// ---------------------------------------------------------------------------

pub struct BatchProcessor {
    directory: Arc<dyn Directory>,
    materializer: Materializer,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl BatchProcessor {
    /// `tz` is the civil calendar periods and due dates are computed in.
    pub fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn TimelineStore>,
        clock: Arc<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            directory,
            materializer: Materializer::new(store),
            clock,
            tz,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Materialize the current period of every unit with `cadence`.
    pub fn run(&self, cadence: Cadence) -> Result<JobRunResult> {
        let started = Instant::now();
        let started_at = self.clock.now();
        let mut result = JobRunResult::new(cadence, started_at);
        let now = started_at.with_timezone(&self.tz).naive_local();
        let fy = FinancialYear::current(started_at, &self.tz);

        info!("{cadence} run started at {now} (financial year {fy})");

        let entries = self.directory.clients()?;
        // Load errors are cached as text so each obligation is read once per run.
        let mut obligations: HashMap<String, std::result::Result<Obligation, String>> =
            HashMap::new();

        for entry in entries {
            let client = match entry.doc {
                Ok(client) => client,
                Err(e) => {
                    warn!("{cadence} skipping client '{}': {e}", entry.id);
                    result.failures.push(ItemFailure {
                        client_id: entry.id,
                        obligation_id: None,
                        sub_obligation_id: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if !client.is_schedulable() {
                continue;
            }
            for assignment in client.active_assignments() {
                let obligation = obligations
                    .entry(assignment.obligation_id.clone())
                    .or_insert_with(|| self.load_obligation(&assignment.obligation_id));
                match obligation {
                    Ok(obligation) => self.run_assignment(
                        cadence, &client, assignment, obligation, now, fy, &mut result,
                    ),
                    Err(e) => result.failures.push(failure(
                        &client,
                        Some(&assignment.obligation_id),
                        None,
                        e.clone(),
                    )),
                }
            }
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "{cadence} run finished in {}ms: processed={} created={} failed={}",
            result.duration_ms,
            result.processed,
            result.created,
            result.failures.len()
        );
        Ok(result)
    }

    /// Run the four scheduled cadences one after another.
    pub fn run_all(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for cadence in Cadence::scheduled() {
            let started = Instant::now();
            match self.run(*cadence) {
                Ok(result) => summary.push(result),
                Err(e) => {
                    let elapsed = started.elapsed();
                    tracing::error!("{cadence} run aborted after {}ms: {e}", elapsed.as_millis());
                    summary.push_error(*cadence, &e, elapsed);
                }
            }
        }
        summary
    }

    fn load_obligation(&self, id: &str) -> std::result::Result<Obligation, String> {
        self.directory.obligation(id).map_err(|e| {
            warn!("cannot load obligation '{id}': {e}");
            e.to_string()
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_assignment(
        &self,
        cadence: Cadence,
        client: &Client,
        assignment: &Assignment,
        obligation: &Obligation,
        now: NaiveDateTime,
        fy: FinancialYear,
        result: &mut JobRunResult,
    ) {
        let units = obligation.units();
        // A stale pin matches no unit, so nothing is processed for it.
        if let Some(pin) = assignment.sub_obligation_id.as_deref() {
            if !units.iter().any(|u| u.sub_obligation_id == Some(pin)) {
                let e = ObligoError::SubObligationNotFound(format!("{}/{pin}", obligation.id));
                warn!("{cadence} assignment {}/{}: {e}", client.id, obligation.id);
                result
                    .failures
                    .push(failure(client, Some(&obligation.id), Some(pin), e.to_string()));
                return;
            }
        }

        for unit in units {
            if unit.cadence != cadence {
                continue;
            }
            // A pinned assignment only ever covers its own sub-obligation.
            if let Some(pin) = assignment.sub_obligation_id.as_deref() {
                if unit.sub_obligation_id != Some(pin) {
                    continue;
                }
            }

            result.processed += 1;
            match self.materialize(client, obligation, &unit, now, fy) {
                Ok(true) => result.created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "{cadence} item {}/{}/{} failed: {e}",
                        client.id,
                        obligation.id,
                        unit.sub_obligation_id.unwrap_or("-")
                    );
                    result.failures.push(failure(
                        client,
                        Some(&obligation.id),
                        unit.sub_obligation_id,
                        e.to_string(),
                    ));
                }
            }
        }
    }

    fn materialize(
        &self,
        client: &Client,
        obligation: &Obligation,
        unit: &ScheduleUnit<'_>,
        now: NaiveDateTime,
        fy: FinancialYear,
    ) -> Result<bool> {
        let config = unit.frequency()?;
        let key = TimelineKey::new(
            &client.id,
            &obligation.id,
            unit.sub_obligation_id,
            period(now, unit.cadence),
        );
        let due_date = current_period_due_date(&config, now)?;
        let metadata = TimelineMetadata {
            cadence: unit.cadence,
            frequency_config: config.to_raw(),
            financial_year: fy,
            obligation_name: obligation.name.clone(),
            sub_obligation_name: unit.sub_obligation_id.map(|_| unit.name.to_string()),
            branch_id: client.branch_id.clone(),
            fields: unit
                .fields
                .iter()
                .map(|f| FieldValue {
                    name: f.name.clone(),
                    required: f.required,
                    value: None,
                })
                .collect(),
        };

        let upsert = self.materializer.upsert(key, due_date, metadata)?;
        if upsert.created {
            info!(
                "created timeline {} due {} for {}",
                upsert.record.key, upsert.record.due_date, client.name
            );
        }
        Ok(upsert.created)
    }
}

fn failure(
    client: &Client,
    obligation_id: Option<&str>,
    sub_obligation_id: Option<&str>,
    error: String,
) -> ItemFailure {
    ItemFailure {
        client_id: client.id.clone(),
        obligation_id: obligation_id.map(str::to_string),
        sub_obligation_id: sub_obligation_id.map(str::to_string),
        error,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
