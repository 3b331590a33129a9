use crate::config::{Config, LockoutBackend};
use crate::models::{AccountStatus, PrincipalKind};
use crate::services::NewPrincipalRequest;
use crate::state::SharedState;

pub async fn cmd_principal_create(
    config: &Config,
    request: NewPrincipalRequest,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let principal = state.auth.create_principal(&request).await?;

    println!("✓ Created {} '{}'", principal.kind, principal.username);
    println!("  ID:     {}", principal.id);
    println!("  Email:  {}", principal.email);
    println!("  Status: {}", principal.status);
    Ok(())
}

pub async fn cmd_principal_unlock(
    config: &Config,
    kind: PrincipalKind,
    identifier: &str,
) -> anyhow::Result<()> {
    if config.lockout.backend == LockoutBackend::Memory {
        println!("Note: the memory backend lives inside the serving process; restart it to clear in-memory locks.");
    }

    let state = SharedState::new(config.clone()).await?;
    let principal = state.auth.unlock_principal(kind, identifier).await?;

    println!("✓ Cleared lockout for {} '{}'", principal.kind, principal.username);
    Ok(())
}

pub async fn cmd_principal_set_status(
    config: &Config,
    kind: PrincipalKind,
    identifier: &str,
    status: AccountStatus,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let (principal, _) = state
        .store
        .find_principal(kind, identifier)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{kind} '{identifier}' not found"))?;

    state
        .store
        .set_principal_status(principal.id, status, state.clock.unix())
        .await?;
    println!("✓ {} '{}' is now {status}", principal.kind, principal.username);
    Ok(())
}
