pub mod app_key;
pub mod login_attempt;
pub mod password_history;
pub mod principal;
pub mod reset_code;
pub mod role;

/// Clock readings arrive as Unix seconds; text timestamp columns hold RFC 3339.
pub(crate) fn rfc3339(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339()
}
