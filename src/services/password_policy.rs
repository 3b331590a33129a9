//! Password complexity, confirmation and reuse rules.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::hasher::HashPool;
use crate::constants::messages;
use crate::db::Store;
use crate::models::Policy;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 40;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{}", messages::WEAK_PASSWORD)]
    Weak,

    #[error("{}", messages::PASSWORD_REUSED)]
    Reused,

    #[error("{}", messages::PASSWORD_MISMATCH)]
    Mismatch,

    #[error("Password history lookup failed: {0}")]
    Store(#[from] anyhow::Error),
}

struct CharClasses {
    lower: Regex,
    upper: Regex,
    digit: Regex,
    symbol: Regex,
}

fn char_classes() -> &'static CharClasses {
    static CLASSES: OnceLock<CharClasses> = OnceLock::new();
    CLASSES.get_or_init(|| CharClasses {
        lower: Regex::new("[a-z]").expect("Invalid regex"),
        upper: Regex::new("[A-Z]").expect("Invalid regex"),
        digit: Regex::new("[0-9]").expect("Invalid regex"),
        symbol: Regex::new("[^A-Za-z0-9]").expect("Invalid regex"),
    })
}

/// Length 8 to 40, and either a lowercase letter plus two of
/// {uppercase, digit, symbol}, or uppercase, digit and symbol together.
pub fn validate_complexity(candidate: &str) -> Result<(), PolicyError> {
    let len = candidate.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err(PolicyError::Weak);
    }

    let classes = char_classes();
    let lower = classes.lower.is_match(candidate);
    let upper = classes.upper.is_match(candidate);
    let digit = classes.digit.is_match(candidate);
    let symbol = classes.symbol.is_match(candidate);

    let others = [upper, digit, symbol].into_iter().filter(|&c| c).count();
    if (lower && others >= 2) || (upper && digit && symbol) {
        Ok(())
    } else {
        Err(PolicyError::Weak)
    }
}

pub fn validate_confirmation(candidate: &str, confirmation: &str) -> Result<(), PolicyError> {
    if candidate == confirmation {
        Ok(())
    } else {
        Err(PolicyError::Mismatch)
    }
}

/// Reject `candidate` if it matches one of the principal's last
/// `password_reuse_history` passwords. Each stored hash costs a full
/// verification, run one at a time newest first.
pub async fn validate_reuse(
    store: &Store,
    hashes: &HashPool,
    principal_id: i32,
    candidate: &str,
    policy: &Policy,
) -> Result<(), PolicyError> {
    if !policy.reuse_check_enabled() {
        return Ok(());
    }

    let recent = store
        .recent_password_hashes(principal_id, policy.password_reuse_history)
        .await?;

    if hashes.matches_any(candidate, recent).await? {
        return Err(PolicyError::Reused);
    }

    Ok(())
}
