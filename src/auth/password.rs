use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::{sync::Arc, time::Duration};

use anyhow::Context;
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tokio::sync::Semaphore;
use tracing::error;

// Argon2id, 19 MiB, t=2, p=1.
const MEMORY_KIB: u32 = 19 * 1024;
const ITERATIONS: u32 = 2;
const LANES: u32 = 1;

lazy_static! {
    /// Verified against when the email is unknown so both login failures cost the same.
    static ref DUMMY_HASH: Option<String> = hash_password("guestlist-timing-equalizer").ok();
}

fn hasher() -> anyhow::Result<Argon2<'static>> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, LANES, None)
        .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    // Parameters come from the PHC string, so older hashes keep verifying.
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Builds the dummy hash up front so the first unknown-email login does not
/// pay for an extra hash.
pub fn prepare_dummy_hash() {
    lazy_static::initialize(&DUMMY_HASH);
}

/// Burns one verification so unknown emails take as long as wrong passwords.
pub fn verify_dummy(plain: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
}

/// Caps how many Argon2 runs hold their 19 MiB at once.
///
/// Work runs on the blocking pool with an owned permit, so a dropped request
/// keeps its slot until the hash finishes.
#[derive(Clone)]
pub struct HashLimiter {
    permits: Arc<Semaphore>,
    wait: Duration,
}

impl HashLimiter {
    pub fn new(max_concurrent: usize, wait: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.min(Semaphore::MAX_PERMITS))),
            wait,
        }
    }

    pub(crate) async fn run<T, F>(&self, work: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = tokio::time::timeout(self.wait, self.permits.clone().acquire_owned())
            .await
            .context("timed out waiting for a password hashing slot")?
            .context("password hashing limiter closed")?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await?
    }

    pub async fn hash(&self, plain: String) -> anyhow::Result<String> {
        self.run(move || hash_password(&plain)).await
    }

    /// `hash: None` (unknown user) still costs one verification and yields `false`.
    pub async fn verify(&self, plain: String, hash: Option<String>) -> anyhow::Result<bool> {
        self.run(move || match hash {
            Some(hash) => verify_password(&plain, &hash),
            None => {
                verify_dummy(&plain);
                Ok(false)
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "secret123";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(!verify_password("correct-horse-battery-stapler", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        let a = hash_password("secret123").unwrap();
        let b = hash_password("secret123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }

    fn limiter(max: usize) -> HashLimiter {
        HashLimiter::new(max, Duration::from_secs(5))
    }

    #[test]
    fn dummy_hash_is_ready_after_prepare() {
        prepare_dummy_hash();
        let hash = DUMMY_HASH.as_deref().expect("dummy hash");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn unknown_user_never_verifies() {
        let ok = limiter(1).verify("secret123".into(), None).await.unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn limiter_hash_and_verify_agree_with_sync_versions() {
        let hashing = limiter(2);
        let hash = hashing.hash("secret123".into()).await.unwrap();
        assert!(hashing
            .verify("secret123".into(), Some(hash.clone()))
            .await
            .unwrap());
        assert!(!hashing.verify("secret124".into(), Some(hash)).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn permits_cap_concurrent_work() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hashing = limiter(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let hashing = hashing.clone();
            let running = running.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                hashing
                    .run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(30));
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn waiting_past_the_deadline_is_an_error() {
        let hashing = HashLimiter::new(1, Duration::from_millis(20));
        let busy = hashing.clone();
        let holder = tokio::spawn(async move {
            busy.run(|| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = hashing.run(|| Ok(())).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        holder.await.unwrap().unwrap();
    }
}
