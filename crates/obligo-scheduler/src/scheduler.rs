use crate::error::Result;
use crate::trigger::{next_fire, Trigger, DEFAULT_TRIGGERS};
use chrono::{DateTime, Utc};
use cron::Schedule;
use obligo_core::batch::{BatchProcessor, JobRunResult, RunSummary};
use obligo_core::types::Cadence;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct ArmedTrigger {
    cadence: Cadence,
    handle: JoinHandle<()>,
}

/// Handle owning the armed triggers.
///
/// Inactive until [`Scheduler::start`]; every trigger then runs as its own
/// tokio task until [`Scheduler::stop`] aborts it. Runs already handed to the
/// blocking pool are not cancelled by `stop`.
pub struct Scheduler {
    processor: Arc<BatchProcessor>,
    triggers: Vec<Trigger>,
    armed: Mutex<Vec<ArmedTrigger>>,
}

impl Scheduler {
    pub fn new(processor: Arc<BatchProcessor>) -> Self {
        Self::with_triggers(processor, DEFAULT_TRIGGERS.to_vec())
    }

    pub fn with_triggers(processor: Arc<BatchProcessor>, triggers: Vec<Trigger>) -> Self {
        Self {
            processor,
            triggers,
            armed: Mutex::new(Vec::new()),
        }
    }

    fn armed(&self) -> MutexGuard<'_, Vec<ArmedTrigger>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm every trigger. Returns `false` without doing anything when the
    /// scheduler is already active.
    ///
    /// Must be called from inside a tokio runtime. Every expression is parsed
    /// before any trigger is armed, so a bad one leaves the scheduler inactive.
    pub fn start(&self) -> Result<bool> {
        let mut armed = self.armed();
        if !armed.is_empty() {
            warn!("scheduler already active with {} triggers", armed.len());
            return Ok(false);
        }

        let schedules = self
            .triggers
            .iter()
            .map(|t| t.schedule().map(|s| (*t, s)))
            .collect::<Result<Vec<_>>>()?;

        for (trigger, schedule) in schedules {
            let processor = Arc::clone(&self.processor);
            let handle = tokio::spawn(trigger_loop(trigger, schedule, processor));
            armed.push(ArmedTrigger {
                cadence: trigger.cadence,
                handle,
            });
        }
        info!("scheduler started with {} triggers", armed.len());
        Ok(true)
    }

    /// Disarm every trigger. Returns how many were active.
    pub fn stop(&self) -> usize {
        let mut armed = self.armed();
        let count = armed.len();
        for trigger in armed.drain(..) {
            trigger.handle.abort();
            info!("{} trigger stopped", trigger.cadence);
        }
        count
    }

    pub fn restart(&self) -> Result<bool> {
        self.stop();
        self.start()
    }

    pub fn is_active(&self) -> bool {
        !self.armed().is_empty()
    }

    pub fn active_triggers(&self) -> usize {
        self.armed().iter().filter(|t| !t.handle.is_finished()).count()
    }

    /// Next fire instant of every configured trigger, from the engine clock.
    pub fn upcoming(&self) -> Result<Vec<(Trigger, Option<DateTime<Utc>>)>> {
        let now = self.processor.clock().now();
        self.triggers
            .iter()
            .map(|t| Ok((*t, t.next_fire(now)?)))
            .collect()
    }

    /// Run one cadence now on the blocking pool, outside the trigger schedule.
    pub async fn run(&self, cadence: Cadence) -> Result<JobRunResult> {
        let processor = Arc::clone(&self.processor);
        let result = tokio::task::spawn_blocking(move || processor.run(cadence)).await??;
        Ok(result)
    }

    /// Run the four scheduled cadences one after another, whether or not the
    /// triggers are armed.
    pub async fn run_all(&self) -> Result<RunSummary> {
        let processor = Arc::clone(&self.processor);
        let summary = tokio::task::spawn_blocking(move || processor.run_all()).await?;
        info!(
            "manual run finished: processed={} created={} failed={}",
            summary.processed, summary.created, summary.failed
        );
        Ok(summary)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Trigger loop
// ---------------------------------------------------------------------------

async fn trigger_loop(trigger: Trigger, schedule: Schedule, processor: Arc<BatchProcessor>) {
    let cadence = trigger.cadence;
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        let now = processor.clock().now();
        // Never fire the same instant twice, even if the clock lags the sleep.
        let from = last_fire.map_or(now, |last| last.max(now));
        let Some(fire_at) = next_fire(&schedule, trigger.timezone, from) else {
            warn!("{cadence} trigger has no upcoming fire time; disarming");
            return;
        };
        info!("{cadence} trigger armed for {fire_at}");

        let wait = (fire_at - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        last_fire = Some(fire_at);

        let processor = Arc::clone(&processor);
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            match processor.run(cadence) {
                Ok(result) => {
                    for failure in &result.failures {
                        warn!("{cadence} {failure}: {}", failure.error);
                    }
                }
                Err(e) => error!(
                    "{cadence} run aborted after {}ms: {e}",
                    started.elapsed().as_millis()
                ),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use obligo_core::clock::FixedClock;
    use obligo_core::frequency::RawFrequencyConfig;
    use obligo_core::registry::{Client, Obligation, Registry, SubObligation};
    use obligo_core::store::TimelineDb;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Arc<TimelineDb>, Arc<BatchProcessor>) {
        let dir = TempDir::new().unwrap();
        let registry = Registry::new(dir.path());

        let mut ob = Obligation::new("tds", "TDS");
        ob.sub_obligations.push(SubObligation {
            id: "deposit".into(),
            name: "TDS Deposit".into(),
            cadence: Cadence::Monthly,
            frequency_config: RawFrequencyConfig {
                monthly_day: Some(7),
                monthly_time: Some("11:00 AM".into()),
                ..Default::default()
            },
            fields: Vec::new(),
        });
        registry.create_obligation(&mut ob).unwrap();
        registry
            .save_client(&Client::new("acme", "Acme").assign("tds", None))
            .unwrap();

        let db = Arc::new(TimelineDb::open(&dir.path().join("t.db")).unwrap());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 7, 3, 4, 30, 0).unwrap(),
        ));
        let processor = Arc::new(BatchProcessor::new(
            Arc::new(registry),
            db.clone(),
            clock,
            Tz::Asia__Kolkata,
        ));
        (dir, db, processor)
    }

    #[tokio::test]
    async fn lifecycle() {
        let (_dir, _db, processor) = fixture();
        let scheduler = Scheduler::new(processor);

        assert!(!scheduler.is_active());
        assert_eq!(scheduler.active_triggers(), 0);

        assert!(scheduler.start().unwrap());
        assert!(scheduler.is_active());
        assert_eq!(scheduler.active_triggers(), 4);

        assert!(!scheduler.start().unwrap());
        assert_eq!(scheduler.active_triggers(), 4);

        assert_eq!(scheduler.stop(), 4);
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.active_triggers(), 0);

        assert!(scheduler.restart().unwrap());
        assert_eq!(scheduler.active_triggers(), 4);
        assert!(scheduler.restart().unwrap());
        assert_eq!(scheduler.active_triggers(), 4);
        scheduler.stop();
    }

    #[tokio::test]
    async fn invalid_trigger_leaves_scheduler_inactive() {
        let (_dir, _db, processor) = fixture();
        let mut triggers = DEFAULT_TRIGGERS.to_vec();
        triggers[2].expression = "not cron";
        let scheduler = Scheduler::with_triggers(processor, triggers);

        assert!(scheduler.start().is_err());
        assert!(!scheduler.is_active());
    }

    #[tokio::test]
    async fn run_all_works_while_inactive() {
        let (_dir, db, processor) = fixture();
        let scheduler = Scheduler::new(processor);

        let summary = scheduler.run_all().await.unwrap();
        assert_eq!(summary.results.len(), 4);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(db.count().unwrap(), 1);

        let again = scheduler.run_all().await.unwrap();
        assert_eq!(again.created, 0);
        assert!(!scheduler.is_active());
    }

    #[tokio::test]
    async fn single_cadence_run() {
        let (_dir, _db, processor) = fixture();
        let scheduler = Scheduler::new(processor);
        let result = scheduler.run(Cadence::Monthly).await.unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(scheduler.run(Cadence::Daily).await.unwrap().processed, 0);
    }

    #[tokio::test]
    async fn upcoming_lists_every_trigger() {
        let (_dir, _db, processor) = fixture();
        let scheduler = Scheduler::new(processor);
        let upcoming = scheduler.upcoming().unwrap();
        assert_eq!(upcoming.len(), 4);
        assert!(upcoming.iter().all(|(_, next)| next.is_some()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn armed_trigger_runs_its_cadence() {
        let (_dir, db, processor) = fixture();
        let every_second = Trigger {
            cadence: Cadence::Monthly,
            expression: "* * * * * *",
            timezone: Tz::Asia__Kolkata,
        };
        let scheduler = Scheduler::with_triggers(processor, vec![every_second]);
        assert!(scheduler.start().unwrap());

        let mut created = 0;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            created = db.count().unwrap();
            if created > 0 {
                break;
            }
        }
        scheduler.stop();
        assert_eq!(created, 1);
    }
}
