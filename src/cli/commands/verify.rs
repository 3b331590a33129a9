use crate::config::Config;
use crate::services::LoginRequest;
use crate::state::SharedState;

pub async fn cmd_verify(config: &Config, request: LoginRequest) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    match state.auth.authenticate(&request).await {
        Ok(authorized) => {
            println!(
                "✓ Authorized {} '{}' (ID: {})",
                authorized.principal.kind, authorized.principal.username, authorized.principal.id
            );
            if authorized.password_expired {
                println!("  Password has expired and must be changed");
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("Denied: {e}"),
    }
}
