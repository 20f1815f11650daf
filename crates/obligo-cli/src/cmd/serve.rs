use crate::engine;
use anyhow::Context;
use obligo_scheduler::Scheduler;
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let engine = engine::open(root)?;
    let run_on_start = engine.config.run_on_start;
    let scheduler = Scheduler::new(engine.processor);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        if run_on_start {
            let summary = scheduler.run_all().await.context("startup run failed")?;
            println!(
                "Startup run: processed {}, created {}, failed {}",
                summary.processed, summary.created, summary.failed
            );
        }

        scheduler.start().context("failed to arm triggers")?;
        for (trigger, next) in scheduler.upcoming()? {
            match next {
                Some(at) => println!("  {trigger}: next {}", at.with_timezone(&trigger.timezone)),
                None => println!("  {trigger}: never"),
            }
        }
        println!("obligo scheduler running ({} triggers). Ctrl-C to stop.", scheduler.active_triggers());

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        let stopped = scheduler.stop();
        println!("Stopped {stopped} triggers.");
        Ok::<(), anyhow::Error>(())
    })
}
