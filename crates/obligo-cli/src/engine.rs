use anyhow::Context;
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use obligo_core::{
    batch::BatchProcessor,
    clock::{Clock, SystemClock},
    config::{Config, WarnLevel},
    registry::Registry,
    store::TimelineDb,
};
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs to materialize or inspect timelines.
pub struct Engine {
    pub config: Config,
    pub db: Arc<TimelineDb>,
    pub processor: Arc<BatchProcessor>,
}

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root).context("failed to load .obligo/config.yaml")?;
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Error => anyhow::bail!("config: {}", warning.message),
            WarnLevel::Warning => tracing::warn!("config: {}", warning.message),
        }
    }
    Ok(config)
}

pub fn open(root: &Path) -> anyhow::Result<Engine> {
    let config = load_config(root)?;
    let tz = config.tz()?;
    let db_path = config.database_path(root);
    let db = Arc::new(
        TimelineDb::open(&db_path)
            .with_context(|| format!("failed to open timeline store {}", db_path.display()))?,
    );
    let processor = Arc::new(BatchProcessor::new(
        Arc::new(Registry::new(root)),
        db.clone(),
        Arc::new(SystemClock),
        tz,
    ));
    Ok(Engine {
        config,
        db,
        processor,
    })
}

/// Civil "now" in the project's timezone, or in the default one before init.
pub fn local_now(root: &Path) -> anyhow::Result<NaiveDateTime> {
    let tz: Tz = match Config::load(root) {
        Ok(config) => config.tz()?,
        Err(_) => Config::default().tz()?,
    };
    Ok(SystemClock.now().with_timezone(&tz).naive_local())
}
