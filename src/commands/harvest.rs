use anyhow::{Context, Result};

use homily::config::Config;
use homily::pipeline::{harvest_now, Replenisher};
use homily::storage::{ContentSource, FsContentSource, RegistryStore};
use homily::utils::clock::SystemClock;

pub async fn harvest(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let mut replenisher = Replenisher::from_config(&config)
        .context("No harvest source configured (set harvest.source_path)")?;
    let store = RegistryStore::new(&config.registry.path);
    let content = FsContentSource::new(&config.content);

    println!("Harvesting Backlog");
    println!("==================");
    println!("Pending before: {}", content.pending_count()?);

    let report = harvest_now(&store, &content, &mut replenisher, &SystemClock)
        .await
        .context("Harvest failed")?;

    println!("\nHarvest Summary");
    println!("===============");
    println!("Session: {}", report.session_id);
    println!("Steps: {}", report.steps);
    println!("Accepted: {}", report.accepted_count());
    for id in &report.stored_ids {
        println!("  + {id}");
    }
    println!("Already used: {}", report.already_used);
    println!("Duplicates in session: {}", report.session_duplicates);
    println!("Ignored: {}", report.ignored);
    println!("Stopped: {}", report.stop_reason);

    Ok(())
}
