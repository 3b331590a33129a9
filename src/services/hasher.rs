//! Password hashing.
//!
//! Hashers are synchronous and deliberately slow; [`HashPool`] moves every
//! call onto the blocking pool and bounds how many run at once.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tokio::task;

use crate::config::{HashAlgorithm, SecurityConfig};

pub trait CredentialHasher: Send + Sync {
    fn algorithm(&self) -> HashAlgorithm;

    fn hash(&self, plain: &str) -> Result<String>;

    /// Constant-time comparison of `plain` against a stored hash.
    fn verify(&self, plain: &str, hash: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl CredentialHasher for BcryptHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Bcrypt
    }

    fn hash(&self, plain: &str) -> Result<String> {
        bcrypt::hash(plain, self.cost).context("Failed to hash password")
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool> {
        if is_argon2(hash) {
            return verify_argon2(&Argon2::default(), plain, hash);
        }
        bcrypt::verify(plain, hash).context("Invalid bcrypt hash")
    }
}

#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(memory_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_cost_kib, time_cost, parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Argon2
    }

    fn hash(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool> {
        if !is_argon2(hash) {
            return bcrypt::verify(plain, hash).context("Invalid bcrypt hash");
        }
        verify_argon2(&self.argon2(), plain, hash)
    }
}

// Hashes written under a previous `hash_algorithm` stay verifiable; Argon2
// parameters travel inside the PHC string.
fn is_argon2(hash: &str) -> bool {
    hash.starts_with("$argon2")
}

fn verify_argon2(argon2: &Argon2<'_>, plain: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;
    Ok(argon2.verify_password(plain.as_bytes(), &parsed).is_ok())
}

/// Build the hasher selected by `security.hash_algorithm`.
pub fn hasher_for(config: &SecurityConfig) -> Result<Arc<dyn CredentialHasher>> {
    Ok(match config.hash_algorithm {
        HashAlgorithm::Bcrypt => Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        HashAlgorithm::Argon2 => Arc::new(Argon2Hasher::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
        )?),
    })
}

/// Runs hash jobs on the blocking pool, at most `workers` at a time.
#[derive(Clone)]
pub struct HashPool {
    hasher: Arc<dyn CredentialHasher>,
    permits: Arc<Semaphore>,
    dummy: Arc<OnceCell<String>>,
}

impl HashPool {
    #[must_use]
    pub fn new(hasher: Arc<dyn CredentialHasher>, workers: usize) -> Self {
        Self {
            hasher,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            dummy: Arc::new(OnceCell::new()),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CredentialHasher) -> Result<T> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("Hash pool closed")?;
        let hasher = self.hasher.clone();

        task::spawn_blocking(move || {
            let _permit = permit;
            job(hasher.as_ref())
        })
        .await
        .context("Password hashing task panicked")?
    }

    pub async fn hash(&self, plain: &str) -> Result<String> {
        let plain = plain.to_string();
        self.run(move |h| h.hash(&plain)).await
    }

    pub async fn verify(&self, plain: &str, hash: &str) -> Result<bool> {
        let plain = plain.to_string();
        let hash = hash.to_string();
        self.run(move |h| h.verify(&plain, &hash)).await
    }

    /// Whether `plain` matches any of `hashes`, checked one after another in
    /// the given order. Stops at the first match.
    pub async fn matches_any(&self, plain: &str, hashes: Vec<String>) -> Result<bool> {
        for hash in hashes {
            if self.verify(plain, &hash).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Spend one verification on a throwaway hash so unknown accounts take as
    /// long to reject as a wrong password.
    pub async fn verify_dummy(&self, plain: &str) -> Result<()> {
        let dummy = self
            .dummy
            .get_or_try_init(|| self.hash("gatekeeper-placeholder"))
            .await?;
        self.verify(plain, dummy).await?;
        Ok(())
    }
}
