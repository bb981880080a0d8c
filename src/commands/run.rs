use anyhow::{Context, Result};

use homily::config::Config;
use homily::pipeline::{CycleReport, PublishCycle};
use homily::utils::format_seconds;

pub async fn run(config: Config, force: bool) -> Result<()> {
    let mut cycle = PublishCycle::from_config(config).context("Invalid configuration")?;

    println!("Publish Cycle");
    println!("=============");
    if force {
        println!("Manual override requested");
    }

    let report = cycle.run_cycle(force).await?;

    match &report {
        CycleReport::Published {
            item_id,
            category,
            attempts,
            forced,
            harvested,
        } => {
            println!("Published: {item_id} ({category})");
            println!("Attempts: {attempts}");
            if *forced {
                println!("Minimum interval overridden");
            }
            if let Some(n) = harvested {
                println!("Harvested: {n} new item(s)");
            }
        }
        CycleReport::Failed {
            item_id,
            attempts,
            error,
            ..
        } => {
            println!("Failed: {item_id} after {attempts} attempt(s)");
            if let Some(e) = error {
                println!("Last error: {e}");
            }
        }
        CycleReport::RateLimited {
            remaining,
            explanation,
        } => {
            println!("Rate limited: {explanation}");
            println!(
                "Next publication in: {}",
                format_seconds(remaining.num_seconds())
            );
        }
        CycleReport::NothingToPublish { category } => {
            println!("Nothing to publish in category {category}");
        }
        CycleReport::Skipped { category, reason } => {
            println!("Skipped ({category}): {reason}");
        }
    }

    Ok(())
}
