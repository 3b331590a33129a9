mod app_key;
mod lockout;
mod migrate;
mod principal;
mod role;
mod verify;

pub use app_key::{cmd_app_key_create, cmd_app_key_list, cmd_app_key_set_status};
pub use lockout::{cmd_lockout_prune, cmd_lockout_unlock_ip};
pub use migrate::cmd_migrate;
pub use principal::{cmd_principal_create, cmd_principal_set_status, cmd_principal_unlock};
pub use role::cmd_role_list;
pub use verify::cmd_verify;
