//! Hands out currently valid tokens.
//!
//! Lookup is tiered: memory, then the disk mirror, then the identity service.
//! All three tiers are consulted inside one critical section of the
//! [`TokenStore`], so concurrent callers in one process never authenticate
//! more than once per expiry cycle. A refresh stalls other callers for the
//! duration of the identity call; the transport's own timeout bounds that.

use crate::auth::{AuthError, Authenticator};
use crate::token::{Clock, ExpiryPolicy, SystemClock, TokenRecord};
use crate::token_store::{TokenStore, TokenStoreGuard};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[source] AuthError),
}

/// Where an inspected record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Memory,
    Disk,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Memory => write!(f, "memory"),
            TokenSource::Disk => write!(f, "disk"),
        }
    }
}

/// A cached record and the policy's verdict on it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInspection {
    pub record: TokenRecord,
    pub source: TokenSource,
    pub valid: bool,
    /// Instant after which the record is treated as expired; `None` if `expires_at` is unusable.
    pub deadline: Option<DateTime<Utc>>,
}

pub struct CredentialSupervisor<A: Authenticator> {
    store: TokenStore,
    authenticator: A,
    policy: ExpiryPolicy,
    clock: Arc<dyn Clock>,
}

impl<A: Authenticator> CredentialSupervisor<A> {
    pub fn new(store: TokenStore, authenticator: A, policy: ExpiryPolicy) -> Self {
        Self {
            store,
            authenticator,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Current time as seen by the policy checks.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Return a token that passes the expiry policy, authenticating only when
    /// neither memory nor disk holds one.
    pub async fn get_valid_token(&self) -> Result<TokenRecord, CredentialError> {
        let mut guard = self.store.acquire().await;

        match guard.get_current() {
            Some(record) if self.policy.is_valid(&record, self.clock.now()) => {
                debug!("Found token on memory cache");
                return Ok(record);
            }
            Some(_) => debug!("Token on memory cache has expired"),
            None => debug!("There is no token on memory cache"),
        }

        match guard.load_from_disk() {
            Some(record) if self.policy.is_valid(&record, self.clock.now()) => {
                debug!("Found token on disk cache {:?}", self.store.path());
                guard.set_current(record.clone());
                return Ok(record);
            }
            Some(_) => debug!("There is no available token on disk cache"),
            None => (),
        }

        let record = self.fetch(&mut guard).await?;
        guard.release();
        Ok(record)
    }

    /// Authenticate even if a valid token is cached.
    ///
    /// The cached record is replaced only when the identity service issues a
    /// token that passes the policy; on failure memory and disk are untouched.
    pub async fn refresh(&self) -> Result<TokenRecord, CredentialError> {
        let mut guard = self.store.acquire().await;
        self.fetch(&mut guard).await
    }

    async fn fetch(&self, guard: &mut TokenStoreGuard<'_>) -> Result<TokenRecord, CredentialError> {
        info!("Requesting a new token from the identity service");
        let record = self.authenticator.authenticate().await.map_err(|e| {
            warn!("Authentication failed: {}", e);
            CredentialError::AuthenticationFailed(e)
        })?;

        if !self.policy.is_valid(&record, self.clock.now()) {
            warn!(
                "Identity service issued a token that fails the expiry policy (expires_at: {:?})",
                record.expires_at
            );
            return Err(CredentialError::AuthenticationFailed(AuthError::AuthFailed(
                format!(
                    "issued token is already expired or has no usable expiry (expires_at: {})",
                    record.expires_at.as_deref().unwrap_or("<missing>")
                ),
            )));
        }

        guard.set_current(record.clone());
        Ok(record)
    }

    /// Report the cached record, if any, without ever contacting the identity service.
    pub async fn inspect(&self) -> Option<TokenInspection> {
        let guard = self.store.acquire().await;

        let (record, source) = match guard.get_current() {
            Some(record) => (record, TokenSource::Memory),
            None => (guard.load_from_disk()?, TokenSource::Disk),
        };

        Some(TokenInspection {
            valid: self.policy.is_valid(&record, self.clock.now()),
            deadline: self.policy.deadline(&record),
            record,
            source,
        })
    }

    /// Drop the cached record from memory and disk.
    pub async fn invalidate(&self) {
        let mut guard = self.store.acquire().await;
        guard.clear();
        info!("Token cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TokenFile;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    struct StubAuthenticator {
        calls: AtomicUsize,
        response: Option<TokenRecord>,
    }

    #[async_trait]
    impl Authenticator for StubAuthenticator {
        async fn authenticate(&self) -> Result<TokenRecord, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .ok_or_else(|| AuthError::AuthFailed("HTTP 401 Unauthorized".to_string()))
        }
    }

    fn supervisor(
        dir: &TempDir,
        response: Option<TokenRecord>,
    ) -> CredentialSupervisor<StubAuthenticator> {
        let store = TokenStore::new(TokenFile::new(dir.path().join("token.bin")));
        let authenticator = StubAuthenticator {
            calls: AtomicUsize::new(0),
            response,
        };
        CredentialSupervisor::new(store, authenticator, ExpiryPolicy::default())
            .with_clock(Arc::new(FixedClock(t0())))
    }

    fn calls(supervisor: &CredentialSupervisor<StubAuthenticator>) -> usize {
        supervisor.authenticator.calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_fresh_token_is_issued_then_reused_from_memory() {
        let dir = TempDir::new().unwrap();
        let issued = TokenRecord::with_validity("tok1", t0(), t0() + Duration::hours(1));
        let supervisor = supervisor(&dir, Some(issued.clone()));

        assert_eq!(supervisor.get_valid_token().await.unwrap(), issued);
        assert_eq!(supervisor.get_valid_token().await.unwrap(), issued);
        assert_eq!(calls(&supervisor), 1);
    }

    #[tokio::test]
    async fn test_issued_token_without_expiry_is_rejected_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let issued = TokenRecord::new("tok1".to_string(), None, None);
        let supervisor = supervisor(&dir, Some(issued));

        assert!(matches!(
            supervisor.get_valid_token().await,
            Err(CredentialError::AuthenticationFailed(_))
        ));
        assert!(supervisor.inspect().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_memory_token_triggers_refresh() {
        let dir = TempDir::new().unwrap();
        let issued = TokenRecord::with_validity("new", t0(), t0() + Duration::hours(1));
        let supervisor = supervisor(&dir, Some(issued.clone()));

        let stale = TokenRecord::with_validity("old", t0() - Duration::hours(2), t0());
        supervisor.store().acquire().await.set_current(stale);

        assert_eq!(supervisor.get_valid_token().await.unwrap(), issued);
        assert_eq!(calls(&supervisor), 1);
    }

    #[tokio::test]
    async fn test_inspect_never_authenticates() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, None);

        assert!(supervisor.inspect().await.is_none());

        let cached = TokenRecord::with_validity("disk", t0(), t0() + Duration::minutes(2));
        supervisor.store().save_to_disk(&cached);

        let inspection = supervisor.inspect().await.unwrap();
        assert_eq!(inspection.record, cached);
        assert_eq!(inspection.source, TokenSource::Disk);
        assert!(!inspection.valid);
        assert_eq!(inspection.deadline, Some(t0() - Duration::minutes(1)));
        assert_eq!(calls(&supervisor), 0);
    }

    #[tokio::test]
    async fn test_invalidate_clears_memory_and_disk() {
        let dir = TempDir::new().unwrap();
        let issued = TokenRecord::with_validity("tok1", t0(), t0() + Duration::hours(1));
        let supervisor = supervisor(&dir, Some(issued));

        supervisor.get_valid_token().await.unwrap();
        supervisor.invalidate().await;

        assert!(supervisor.inspect().await.is_none());
        supervisor.get_valid_token().await.unwrap();
        assert_eq!(calls(&supervisor), 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_a_valid_token() {
        let dir = TempDir::new().unwrap();
        let issued = TokenRecord::with_validity("new", t0(), t0() + Duration::hours(1));
        let supervisor = supervisor(&dir, Some(issued.clone()));

        let cached = TokenRecord::with_validity("old", t0(), t0() + Duration::hours(2));
        supervisor.store().save_to_disk(&cached);

        assert_eq!(supervisor.refresh().await.unwrap(), issued);
        assert_eq!(supervisor.store().load_from_disk(), Some(issued));
        assert_eq!(calls(&supervisor), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_the_cached_token() {
        let dir = TempDir::new().unwrap();
        let supervisor = supervisor(&dir, None);

        let cached = TokenRecord::with_validity("old", t0(), t0() + Duration::hours(2));
        supervisor.store().acquire().await.set_current(cached.clone());

        assert!(matches!(
            supervisor.refresh().await,
            Err(CredentialError::AuthenticationFailed(_))
        ));
        assert_eq!(supervisor.store().load_from_disk(), Some(cached.clone()));
        assert_eq!(supervisor.get_valid_token().await.unwrap(), cached);
        assert_eq!(calls(&supervisor), 1);
    }

    #[tokio::test]
    async fn test_now_follows_the_injected_clock() {
        let dir = TempDir::new().unwrap();
        assert_eq!(supervisor(&dir, None).now(), t0());
    }
}
