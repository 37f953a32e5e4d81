//! Mutual exclusion built from ordinary storage operations.
//!
//! [`StorageLock`] persists a lock proposal inside the storage it protects,
//! so any backend gets locking without an external lock service, and locks
//! are visible across processes sharing the backend. Proposals live under
//! the reserved `.locks` namespace: a lock on key `a/b` writes
//! `.locks/a/b/<uuid>`. Storing data under a key whose first segment is
//! `.locks` is undefined behavior.
//!
//! A proposal body is either empty (the lock never expires) or an RFC 3339
//! instant after which the proposal counts as abandoned and any later
//! acquirer may supersede it. Expiry is observed, not enforced: nothing
//! deletes an expired proposal until another acquirer reclaims the lock.

use std::io;
use std::str;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Future;
use uuid::Uuid;

use crate::content::Content;
use crate::error::{Error, Result};
use crate::key::Key;
use crate::storage::Storage;

/// First segment of every lock proposal key.
const LOCKS_SEGMENT: &str = ".locks";

/// A lock that can be acquired and released.
#[async_trait]
pub trait Lock: Send + Sync {
    /// Acquire the lock, failing with [`Error::Locked`] on contention.
    async fn acquire(&self) -> Result<()>;

    /// Release the lock.
    async fn release(&self) -> Result<()>;
}

/// A lock on a key, persisted in the storage it protects.
///
/// Acquisition follows the proposal algorithm: save an own proposal under
/// the reserved namespace for the target key, then list the sibling
/// proposals. If any *other* unexpired proposal exists, acquisition fails
/// and the own proposal is withdrawn; otherwise the lock is held. Release
/// deletes the own proposal.
///
/// Locks are exact-key-only: proposals for `a` and `a/b` live in disjoint
/// namespaces and never conflict.
pub struct StorageLock<'a, S: Storage + ?Sized> {
    storage: &'a S,
    target: Key,
    uuid: String,
    expiration: Option<DateTime<Utc>>,
}

impl<'a, S: Storage + ?Sized> StorageLock<'a, S> {
    /// Create a lock on `target` with no expiration.
    pub fn new(storage: &'a S, target: Key) -> Self {
        StorageLock {
            storage,
            target,
            uuid: Uuid::new_v4().to_string(),
            expiration: None,
        }
    }

    /// Create a lock on `target` that other acquirers may supersede after
    /// `expiration`.
    ///
    /// The expiration is the safety net against a holder that crashes
    /// without releasing.
    pub fn with_expiration(storage: &'a S, target: Key, expiration: DateTime<Utc>) -> Self {
        StorageLock {
            storage,
            target,
            uuid: Uuid::new_v4().to_string(),
            expiration: Some(expiration),
        }
    }

    /// The namespace holding every proposal for the target key.
    fn proposals_root(&self) -> Key {
        Key::from_parts(vec![LOCKS_SEGMENT.to_owned()]).join(&self.target)
    }

    /// The key of this instance's own proposal.
    fn proposal_key(&self) -> Key {
        let mut segments = self.proposals_root().segments().to_vec();
        segments.push(self.uuid.clone());
        Key::from_parts(segments)
    }

    /// Fail unless this instance's proposal is the only live one.
    async fn check_single(&self) -> Result<()> {
        let now = Utc::now();
        let own = self.proposal_key();
        let proposals = self.storage.list(&self.proposals_root()).await?;
        for proposal in &proposals {
            if *proposal == own {
                continue;
            }
            let content = match self.storage.value(proposal).await {
                Ok(content) => content,
                // Withdrawn between list and read; no longer competes.
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            let body = content.bytes().await?;
            if !is_expired(&body, now)? {
                return Err(Error::Locked {
                    key: self.target.clone(),
                    reason: format!(
                        "unexpired proposal `{proposal}` (own `{own}`, all: {})",
                        proposals
                            .iter()
                            .map(|key| format!("`{key}`"))
                            .collect::<Vec<_>>()
                            .join(", "),
                    ),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage + ?Sized> Lock for StorageLock<'_, S> {
    async fn acquire(&self) -> Result<()> {
        let proposal = self.proposal_key();
        let body = match self.expiration {
            Some(instant) => instant.to_rfc3339().into_bytes(),
            None => Vec::new(),
        };
        self.storage.save(&proposal, Content::from(body)).await?;
        match self.check_single().await {
            Ok(()) => {
                tracing::debug!(key = %self.target, uuid = %self.uuid, "lock acquired");
                Ok(())
            }
            Err(err) => {
                if let Err(cleanup) = self.storage.delete(&proposal).await {
                    tracing::warn!(
                        proposal = %proposal,
                        error = %cleanup,
                        "failed to withdraw losing lock proposal",
                    );
                }
                Err(err)
            }
        }
    }

    async fn release(&self) -> Result<()> {
        self.storage.delete(&self.proposal_key()).await?;
        tracing::debug!(key = %self.target, uuid = %self.uuid, "lock released");
        Ok(())
    }
}

/// A lock decorator that retries acquisition with a fixed delay.
///
/// Retries happen only on contention ([`Error::Locked`]); any other failure
/// surfaces immediately. When every attempt fails, the last contention error
/// is returned, which is the timeout signal for callers.
pub struct RetryLock<L> {
    origin: L,
    attempts: usize,
    delay: Duration,
}

impl<L: Lock> RetryLock<L> {
    /// Decorate `origin` with the default policy of 10 attempts 100 ms
    /// apart.
    pub fn new(origin: L) -> Self {
        RetryLock::with_policy(origin, 10, Duration::from_millis(100))
    }

    /// Decorate `origin` with an explicit attempt count and delay.
    ///
    /// At least one attempt is always made.
    pub fn with_policy(origin: L, attempts: usize, delay: Duration) -> Self {
        RetryLock {
            origin,
            attempts: attempts.max(1),
            delay,
        }
    }
}

#[async_trait]
impl<L: Lock> Lock for RetryLock<L> {
    async fn acquire(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.origin.acquire().await {
                Ok(()) => return Ok(()),
                Err(err @ Error::Locked { .. }) => {
                    if attempt >= self.attempts {
                        return Err(err);
                    }
                    tracing::debug!(attempt, error = %err, "lock contended, retrying");
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn release(&self) -> Result<()> {
        self.origin.release().await
    }
}

/// Run `operation` while holding `lock`, releasing on both paths.
///
/// The operation's error takes precedence over a release error; a release
/// failure after a failed operation is logged and dropped, since the expiry
/// window remains the safety net.
pub(crate) async fn under_lock<T, L, F, Fut>(lock: &L, operation: F) -> Result<T>
where
    L: Lock + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    lock.acquire().await?;
    let result = operation().await;
    let released = lock.release().await;
    match result {
        Ok(value) => {
            released?;
            Ok(value)
        }
        Err(err) => {
            if let Err(release_err) = released {
                tracing::warn!(error = %release_err, "failed to release lock after failed operation");
            }
            Err(err)
        }
    }
}

/// Parse a proposal body and decide whether it has expired at `now`.
///
/// An empty body never expires.
fn is_expired(body: &[u8], now: DateTime<Utc>) -> Result<bool> {
    if body.is_empty() {
        return Ok(false);
    }
    let text = str::from_utf8(body).map_err(|err| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed lock proposal: {err}"),
        ))
    })?;
    let instant = DateTime::parse_from_rfc3339(text).map_err(|err| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed lock proposal instant `{text}`: {err}"),
        ))
    })?;
    Ok(instant.with_timezone(&Utc) <= now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_never_expires() {
        assert!(!is_expired(b"", Utc::now()).unwrap());
    }

    #[test]
    fn past_instant_is_expired() {
        let now = Utc::now();
        let body = (now - chrono::Duration::seconds(1)).to_rfc3339();
        assert!(is_expired(body.as_bytes(), now).unwrap());
    }

    #[test]
    fn future_instant_is_not_expired() {
        let now = Utc::now();
        let body = (now + chrono::Duration::hours(1)).to_rfc3339();
        assert!(!is_expired(body.as_bytes(), now).unwrap());
    }

    #[test]
    fn garbage_body_is_an_error() {
        assert!(is_expired(b"not-a-timestamp", Utc::now()).is_err());
    }
}
