pub mod app_keys;
pub mod login_attempts;
pub mod login_locks;
pub mod password_history;
pub mod password_reset_codes;
pub mod principal_roles;
pub mod principals;
pub mod roles;
