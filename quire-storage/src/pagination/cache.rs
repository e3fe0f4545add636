//! Ephemeral cache collaborator and clocks.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use quire_core::QuireResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Short-lived key/value store used only for pagination tokens.
///
/// Entries become unreadable once their TTL elapses. Writes always target
/// fresh keys, so implementations need no compare-and-set.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    async fn write(&self, key: &str, value: String, ttl: Duration) -> QuireResult<()>;

    /// `None` when the key was never written or has expired.
    async fn read(&self, key: &str) -> QuireResult<Option<String>>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.load(Ordering::SeqCst))
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory cache with TTL expiry driven by an injected clock.
///
/// Uses tokio::sync::RwLock for safe async access. Expired entries are
/// dropped lazily on the next write.
#[derive(Debug)]
pub struct InMemoryEphemeralCache<C: Clock = SystemClock> {
    entries: RwLock<HashMap<String, Entry>>,
    clock: C,
}

impl Default for InMemoryEphemeralCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEphemeralCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> InMemoryEphemeralCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Entries not yet expired.
    pub async fn live_entries(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

#[async_trait]
impl<C: Clock> EphemeralCache for InMemoryEphemeralCache<C> {
    async fn write(&self, key: &str, value: String, ttl: Duration) -> QuireResult<()> {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn read(&self, key: &str) -> QuireResult<Option<String>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let cache = InMemoryEphemeralCache::new();
        cache
            .write("a", "1".to_string(), Duration::from_secs(60))
            .await
            .expect("write");
        assert_eq!(cache.read("a").await.expect("read"), Some("1".to_string()));
        assert_eq!(cache.read("b").await.expect("read"), None);
    }

    #[tokio::test]
    async fn test_entries_expire_with_clock() {
        let clock = Arc::new(ManualClock::default());
        let cache = InMemoryEphemeralCache::with_clock(clock.clone());
        cache
            .write("a", "1".to_string(), Duration::from_secs(60))
            .await
            .expect("write");

        clock.advance(Duration::from_secs(59));
        assert!(cache.read("a").await.expect("read").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.read("a").await.expect("read").is_none());
        assert_eq!(cache.live_entries().await, 0);
    }

    #[tokio::test]
    async fn test_expired_entries_pruned_on_write() {
        let clock = Arc::new(ManualClock::default());
        let cache = InMemoryEphemeralCache::with_clock(clock.clone());
        cache
            .write("old", "1".to_string(), Duration::from_secs(1))
            .await
            .expect("write");
        clock.advance(Duration::from_secs(5));
        cache
            .write("new", "2".to_string(), Duration::from_secs(1))
            .await
            .expect("write");
        assert_eq!(cache.entries.read().await.len(), 1);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::default();
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single().expect("valid date");
        clock.set(at);
        assert_eq!(clock.now(), at);
    }
}
