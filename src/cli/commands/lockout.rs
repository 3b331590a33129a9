use std::net::IpAddr;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, LockoutBackend};
use crate::db::Store;
use crate::services::{DatabaseLockoutTracker, LockoutTracker, covering_retention};
use crate::state::SharedState;

pub async fn cmd_lockout_prune(config: &Config) -> anyhow::Result<()> {
    if config.lockout.backend == LockoutBackend::Memory {
        println!("Note: the memory backend lives inside the serving process; pruning the database tables only.");
    }

    let store = Store::new(&config.general.database_path).await?;
    let retention = covering_retention(
        &store,
        Duration::from_secs(config.lockout.attempt_retention_seconds),
    )
    .await?;
    let tracker = DatabaseLockoutTracker::new(store);

    let removed = tracker.prune(SystemClock.now(), retention).await?;
    println!("✓ Removed {removed} stale lockout records");
    Ok(())
}

pub async fn cmd_lockout_unlock_ip(config: &Config, ip: IpAddr) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    state.auth.unlock_ip(ip).await?;

    println!("✓ Cleared lockout for {ip}");
    Ok(())
}
