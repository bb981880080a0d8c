use anyhow::{Context, Result};

use homily::config::Config;
use homily::storage::RegistryStore;
use homily::utils::truncate_text;

pub fn stats(config: Config, json: bool) -> Result<()> {
    let store = RegistryStore::new(&config.registry.path);
    let state = store.load().context("Failed to load registry")?;
    let summary = state.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Publication Statistics");
    println!("======================");
    println!("Registry: {}", store.path().display());
    println!("Total cycles: {}", summary.total_cycles);
    println!("Successes: {}", summary.successes);
    println!("Failures: {}", summary.failures);
    println!("Success rate: {:.1}%", summary.success_rate * 100.0);
    println!("Mean attempts: {:.2}", summary.mean_attempts);
    println!("Mean duration: {:.0} ms", summary.mean_duration_ms);
    println!("Primary published: {}", summary.primary_published);
    println!("Secondary published: {}", summary.secondary_published);
    if let Some((id, count)) = &summary.most_published {
        println!("Most published: {id} ({count} times)");
    }
    if let Some(at) = summary.last_success_at {
        println!("Last success: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(category) = summary.last_category {
        println!("Last category: {category}");
    }

    println!("\nRotation");
    println!("--------");
    println!("Mode: {}", config.rotation.mode);
    println!("Recent window: [{}]", summary.recent_window.join(", "));

    println!("\nHarvest");
    println!("-------");
    println!("Total harvested: {}", summary.total_harvested);
    println!("Used references: {}", summary.used_references);
    println!("Next number: {}", summary.next_number);
    if summary.pending_moves > 0 {
        println!("Pending moves: {}", summary.pending_moves);
    }

    Ok(())
}

pub fn history(config: Config, limit: usize) -> Result<()> {
    let store = RegistryStore::new(&config.registry.path);
    let state = store.load().context("Failed to load registry")?;

    println!("Recent Publications");
    println!("===================");

    if state.history.is_empty() {
        println!("No publications yet");
        return Ok(());
    }

    for record in state.history.iter().rev().take(limit) {
        println!(
            "{} [{}] {} {} ({} attempt(s), {} ms)",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.outcome,
            record.category,
            record.item_id,
            record.attempts,
            record.duration_ms
        );
        println!("    {}", truncate_text(&record.preview, 60));
        if let Some(error) = &record.error {
            println!("    error: {error}");
        }
    }

    Ok(())
}
