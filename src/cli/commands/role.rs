use crate::config::Config;
use crate::db::Store;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

pub async fn cmd_role_list(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let roles = store.list_roles().await?;

    println!("Roles:");
    println!("{:-<70}", "");

    for role in roles {
        let policy = &role.policy;
        println!("• {} (ID: {})", role.name, role.id);
        println!(
            "  Lockout: {} | Max attempts: {} | Window: {}s | Ban: {}s | By IP: {}",
            yes_no(policy.login_lockout_policy),
            policy.login_max_attempts,
            policy.login_timeframe,
            policy.login_ban_time,
            yes_no(policy.login_ban_by_ip),
        );
        println!(
            "  Reuse check: {} | History: {} | Max age: {}",
            yes_no(policy.password_policy),
            policy.password_reuse_history,
            if policy.password_reset_days == 0 {
                "never expires".to_string()
            } else {
                format!("{} days", policy.password_reset_days)
            }
        );
    }

    Ok(())
}
