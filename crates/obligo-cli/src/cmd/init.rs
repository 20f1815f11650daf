use anyhow::Context;
use obligo_core::{config::Config, io, paths, store::TimelineDb};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing obligo in: {}", root.display());

    for dir in [paths::OBLIGO_DIR, paths::OBLIGATIONS_DIR, paths::CLIENTS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config = if paths::config_path(root).exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to read config.yaml")?
    } else {
        let config = Config::default();
        config.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        config
    };

    let db_path = config.database_path(root);
    let existed = db_path.exists();
    TimelineDb::open(&db_path)
        .with_context(|| format!("failed to create timeline store {}", db_path.display()))?;
    let shown = db_path.strip_prefix(root).unwrap_or(&db_path).display();
    if existed {
        println!("  exists:  {shown}");
    } else {
        println!("  created: {shown}");
    }

    println!("\nNext: obligo obligation add <file.yaml>");
    Ok(())
}
