use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Store;
use crate::models::KeyStatus;

pub async fn cmd_app_key_create(
    config: &Config,
    application: &str,
    status: KeyStatus,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let key = store
        .create_app_key(application, status, SystemClock.unix())
        .await?;

    println!("Application key created for '{}'", key.application);
    println!("  Key:    {}", key.key);
    println!("  Status: {}", key.status);
    Ok(())
}

pub async fn cmd_app_key_list(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let keys = store.list_app_keys().await?;

    if keys.is_empty() {
        println!("No application keys. Create one with 'gatekeeper app-key create <application>'");
        return Ok(());
    }

    println!("{:<5} {:<24} {:<10} {}", "ID", "APPLICATION", "STATUS", "KEY");
    println!("{:-<110}", "");
    for key in keys {
        let accepted = if key.status.is_accepted() { "" } else { " (rejected)" };
        println!(
            "{:<5} {:<24} {:<10} {}{}",
            key.id, key.application, key.status, key.key, accepted
        );
    }
    Ok(())
}

pub async fn cmd_app_key_set_status(
    config: &Config,
    key: &str,
    status: KeyStatus,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if !store.set_app_key_status(key, status).await? {
        anyhow::bail!("Application key not found");
    }

    println!("✓ Application key is now {status}");
    Ok(())
}
