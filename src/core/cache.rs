use async_trait::async_trait;
use std::hash::Hash;
use std::time::Duration;

/// Key-value store with optional per-entry time-to-live.
///
/// Implementations must treat an expired entry as absent and must let a `put`
/// fully replace any previous entry for the same key.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key`. `None` means the entry never expires.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
}
