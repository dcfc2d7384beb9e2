use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use k5c::auth::{AuthError, Authenticator};
use k5c::cache::TokenFile;
use k5c::token::{Clock, ExpiryPolicy, TokenRecord};
use k5c::token_store::TokenStore;
use k5c::token_supervisor::{CredentialError, CredentialSupervisor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
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

/// Identity service double that counts calls and answers with a fixed outcome.
struct FakeOrigin {
    calls: AtomicUsize,
    issued: Option<TokenRecord>,
    latency: std::time::Duration,
}

impl FakeOrigin {
    fn issuing(record: TokenRecord) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            issued: Some(record),
            latency: std::time::Duration::ZERO,
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            issued: None,
            latency: std::time::Duration::ZERO,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeOrigin {
    async fn authenticate(&self) -> Result<TokenRecord, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.issued
            .clone()
            .ok_or_else(|| AuthError::AuthFailed("simulated network error".to_string()))
    }
}

fn tok1() -> TokenRecord {
    TokenRecord::with_validity("tok1", t0(), t0() + Duration::seconds(3600))
}

fn cache_file(dir: &TempDir) -> TokenFile {
    TokenFile::new(dir.path().join("cache").join(".k5-token.bin"))
}

fn supervisor(dir: &TempDir, origin: Arc<FakeOrigin>) -> CredentialSupervisor<Arc<FakeOrigin>> {
    CredentialSupervisor::new(
        TokenStore::new(cache_file(dir)),
        origin,
        ExpiryPolicy::default(),
    )
    .with_clock(Arc::new(FixedClock(t0())))
}

#[tokio::test]
async fn test_empty_cache_fetches_and_persists() {
    let dir = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = supervisor(&dir, origin.clone());

    let record = supervisor.get_valid_token().await.unwrap();

    assert_eq!(record, tok1());
    assert_eq!(origin.calls(), 1);
    assert_eq!(cache_file(&dir).read().unwrap(), Some(tok1()));
}

#[tokio::test]
async fn test_idempotent_within_validity() {
    let dir = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = supervisor(&dir, origin.clone());

    let first = supervisor.get_valid_token().await.unwrap();
    let second = supervisor.get_valid_token().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_disk_record_outside_margin_is_accepted() {
    let dir = TempDir::new().unwrap();
    let on_disk = TokenRecord::with_validity("disk", t0(), t0() + Duration::minutes(10));
    cache_file(&dir).write(&on_disk).unwrap();

    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = supervisor(&dir, origin.clone());

    assert_eq!(supervisor.get_valid_token().await.unwrap(), on_disk);
    assert_eq!(origin.calls(), 0);

    // now served from memory
    assert_eq!(supervisor.get_valid_token().await.unwrap(), on_disk);
    assert_eq!(origin.calls(), 0);
}

#[tokio::test]
async fn test_disk_record_inside_margin_is_refreshed() {
    let dir = TempDir::new().unwrap();
    let on_disk = TokenRecord::with_validity("disk", t0(), t0() + Duration::minutes(2));
    cache_file(&dir).write(&on_disk).unwrap();

    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = supervisor(&dir, origin.clone());

    assert_eq!(supervisor.get_valid_token().await.unwrap(), tok1());
    assert_eq!(origin.calls(), 1);
    assert_eq!(cache_file(&dir).read().unwrap(), Some(tok1()));
}

#[tokio::test]
async fn test_failed_fetch_leaves_state_unchanged() {
    let dir = TempDir::new().unwrap();
    let stale = TokenRecord::with_validity("stale", t0() - Duration::hours(1), t0());
    cache_file(&dir).write(&stale).unwrap();

    let origin = Arc::new(FakeOrigin::failing());
    let supervisor = supervisor(&dir, origin.clone());
    supervisor.store().acquire().await.set_current(stale.clone());

    let result = supervisor.get_valid_token().await;

    assert!(matches!(
        result,
        Err(CredentialError::AuthenticationFailed(AuthError::AuthFailed(_)))
    ));
    assert_eq!(origin.calls(), 1);
    assert_eq!(supervisor.store().acquire().await.get_current(), Some(stale.clone()));
    assert_eq!(cache_file(&dir).read().unwrap(), Some(stale));
}

#[tokio::test]
async fn test_malformed_expiry_on_disk_is_never_returned() {
    let dir = TempDir::new().unwrap();
    let malformed = TokenRecord::new(
        "bad".to_string(),
        Some("yesterday".to_string()),
        Some("not a timestamp".to_string()),
    );
    cache_file(&dir).write(&malformed).unwrap();

    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = supervisor(&dir, origin.clone());

    assert_eq!(supervisor.get_valid_token().await.unwrap(), tok1());
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_corrupt_cache_file_is_a_miss_and_gets_overwritten() {
    let dir = TempDir::new().unwrap();
    let file = cache_file(&dir);
    std::fs::create_dir_all(file.path().parent().unwrap()).unwrap();
    std::fs::write(file.path(), b"\x00\x01 definitely not bincode").unwrap();

    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = supervisor(&dir, origin.clone());

    assert_eq!(supervisor.get_valid_token().await.unwrap(), tok1());
    assert_eq!(file.read().unwrap(), Some(tok1()));
}

#[tokio::test]
async fn test_unwritable_cache_still_serves_fresh_token() {
    let dir = TempDir::new().unwrap();
    // a regular file where the cache directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();

    let origin = Arc::new(FakeOrigin::issuing(tok1()));
    let supervisor = CredentialSupervisor::new(
        TokenStore::new(TokenFile::new(blocker.join(".k5-token.bin"))),
        origin.clone(),
        ExpiryPolicy::default(),
    )
    .with_clock(Arc::new(FixedClock(t0())));

    assert_eq!(supervisor.get_valid_token().await.unwrap(), tok1());
    assert_eq!(supervisor.get_valid_token().await.unwrap(), tok1());
    assert_eq!(origin.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_fetch() {
    let dir = TempDir::new().unwrap();
    let origin = Arc::new(FakeOrigin {
        calls: AtomicUsize::new(0),
        issued: Some(tok1()),
        latency: std::time::Duration::from_millis(50),
    });
    let supervisor = Arc::new(supervisor(&dir, origin.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { supervisor.get_valid_token().await })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;

    assert_eq!(origin.calls(), 1);
    for result in results {
        assert_eq!(result.unwrap().unwrap(), tok1());
    }
}

#[tokio::test]
async fn test_separate_supervisors_share_the_disk_file() {
    let dir = TempDir::new().unwrap();
    let first_origin = Arc::new(FakeOrigin::issuing(tok1()));
    supervisor(&dir, first_origin.clone())
        .get_valid_token()
        .await
        .unwrap();

    let second_origin = Arc::new(FakeOrigin::failing());
    let second = supervisor(&dir, second_origin.clone());

    assert_eq!(second.get_valid_token().await.unwrap(), tok1());
    assert_eq!(second_origin.calls(), 0);
}
