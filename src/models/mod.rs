pub mod app_key;
pub mod policy;
pub mod principal;

pub use app_key::{AppKey, KeyStatus};
pub use policy::{Policy, Role};
pub use principal::{AccountStatus, Principal, PrincipalKind, normalize_identifier};
