//! `obligo-scheduler`: timed triggers for the obligo materialization engine.
//!
//! Four triggers, one per scheduled cadence, each sleep until the next fire
//! instant of a cron expression evaluated in a fixed timezone and then hand
//! [`obligo_core::batch::BatchProcessor::run`] to the blocking pool for their
//! own cadence only.
//!
//! ```text
//! Scheduler::start()
//!     │
//!     ├── Daily      "0 0 1 * * *"         ─┐
//!     ├── Monthly    "0 0 2 1 * *"          ├─ sleep → spawn_blocking(run(cadence))
//!     ├── Quarterly  "0 0 3 1 1,4,7,10 *"   │
//!     └── Yearly     "0 0 4 1 4 *"         ─┘
//! ```
//!
//! The batch logic itself stays plain and synchronous, so `run_all` and the
//! CLI call it exactly the way the triggers do.

pub mod error;
pub mod scheduler;
pub mod trigger;

pub use error::{Result, SchedulerError};
pub use scheduler::Scheduler;
pub use trigger::{Trigger, DEFAULT_TRIGGERS};
