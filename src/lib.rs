pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use tracing_subscriber::EnvFilter;

use cli::{
    AppKeyCommands, Cli, Commands, LockoutCommands, PrincipalCommands, RoleCommands,
    cmd_app_key_create, cmd_app_key_list, cmd_app_key_set_status, cmd_lockout_prune,
    cmd_lockout_unlock_ip, cmd_migrate, cmd_principal_create, cmd_principal_set_status,
    cmd_principal_unlock, cmd_role_list, cmd_verify,
};
pub use config::{Config, LogFormat};
pub use state::SharedState;

use services::{LoginRequest, NewPrincipalRequest};

/// Install the global tracing subscriber. `RUST_LOG` wins over
/// `general.log_level`.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.general.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    config.validate()?;
    init_tracing(&config);

    match cli.command {
        Commands::Migrate => cmd_migrate(&config).await,

        Commands::Principal { command } => match command {
            PrincipalCommands::Create {
                username,
                email,
                kind,
                password,
                roles,
                status,
            } => {
                let request = NewPrincipalRequest {
                    kind,
                    username,
                    email,
                    password,
                    status,
                    roles,
                };
                cmd_principal_create(&config, request).await
            }
            PrincipalCommands::Unlock { identifier, kind } => {
                cmd_principal_unlock(&config, kind, &identifier).await
            }
            PrincipalCommands::SetStatus {
                identifier,
                status,
                kind,
            } => cmd_principal_set_status(&config, kind, &identifier, status).await,
        },

        Commands::AppKey { command } => match command {
            AppKeyCommands::Create {
                application,
                status,
            } => cmd_app_key_create(&config, &application, status).await,
            AppKeyCommands::List => cmd_app_key_list(&config).await,
            AppKeyCommands::SetStatus { key, status } => {
                cmd_app_key_set_status(&config, &key, status).await
            }
        },

        Commands::Role { command } => match command {
            RoleCommands::List => cmd_role_list(&config).await,
        },

        Commands::Lockout { command } => match command {
            LockoutCommands::Prune => cmd_lockout_prune(&config).await,
            LockoutCommands::UnlockIp { ip } => cmd_lockout_unlock_ip(&config, ip).await,
        },

        Commands::Verify {
            identifier,
            kind,
            app_key,
            password,
            ip,
        } => {
            let request = LoginRequest {
                app_key,
                kind,
                identifier,
                password,
                ip,
            };
            cmd_verify(&config, request).await
        }
    }
}
