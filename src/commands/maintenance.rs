use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};

use homily::config::Config;
use homily::storage::{RegistryStore, ResetScope};

pub fn reset(config: Config, scope: ResetScope, yes: bool) -> Result<()> {
    let store = RegistryStore::new(&config.registry.path);

    println!("Registry Reset");
    println!("==============");
    println!("Registry: {}", store.path().display());
    println!("Scope: {scope} ({})", scope.description());

    if !yes && !confirm()? {
        bail!("Reset aborted");
    }

    let state = store.reset(scope).context("Reset failed")?;
    tracing::info!(scope = %scope, "Registry reset");

    println!("Done. History records kept: {}", state.history.len());
    Ok(())
}

fn confirm() -> Result<bool> {
    print!("Type YES to continue: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "YES")
}
