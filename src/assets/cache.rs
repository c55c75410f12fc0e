//! Asset cache module
//!
//! Read-through cache in front of the backing store. Misses populate the
//! table; a background sweep evicts entries whose absolute expiry has
//! passed. Hits are served without a freshness check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Bytes;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::store::AssetStore;
use super::{path, AssetError};
use crate::http::{etag, mime};
use crate::logger;

/// One cached file.
///
/// Immutable once constructed. The table stores entries behind `Arc` and
/// replaces them wholesale, so an in-flight reader keeps a valid asset even
/// if the sweep removes the entry underneath it.
#[derive(Debug)]
pub struct Asset {
    /// Sanitized logical path, identical to the table key
    pub name: String,
    /// Raw file content
    pub content: Bytes,
    /// MIME type, computed once at creation
    pub content_type: &'static str,
    /// Entity tag, computed once at creation
    pub etag: String,
    /// Absolute instant after which the entry is eligible for eviction
    pub expires_at: Instant,
}

/// Expiry policy for cached assets.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// How long an entry stays after population
    pub ttl: Duration,
    /// How often the background sweep scans the table
    pub sweep_interval: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 60 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Read-through cache over a read-only asset store.
pub struct AssetCache {
    store: Arc<dyn AssetStore>,
    policy: CachePolicy,
    entries: RwLock<HashMap<String, Arc<Asset>>>,
}

impl AssetCache {
    pub fn new(store: Arc<dyn AssetStore>, policy: CachePolicy) -> Self {
        Self {
            store,
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up an asset, populating the table from the store on a miss.
    ///
    /// Two concurrent misses for the same name may both read the store; the
    /// last insert wins and both callers receive an equivalent asset.
    pub async fn get(&self, name: &str) -> Result<Arc<Asset>, AssetError> {
        let name = path::sanitize(name)?;

        if let Some(asset) = self.entries.read().await.get(name) {
            return Ok(Arc::clone(asset));
        }

        let content = self
            .store
            .read(name)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;

        let asset = Arc::new(Asset {
            name: name.to_string(),
            content_type: mime::content_type(name),
            etag: etag::generate_etag(&content),
            expires_at: Instant::now() + self.policy.ttl,
            content,
        });

        self.entries
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&asset));

        Ok(asset)
    }

    /// Remove every entry whose expiry has passed.
    ///
    /// Returns the number of evicted entries.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, asset| asset.expires_at > now);
        before - entries.len()
    }

    /// Spawn the periodic eviction sweep.
    ///
    /// Runs until the shutdown signal fires. The flag is also checked on
    /// every tick, so a notification sent while a sweep is in progress is
    /// picked up no later than the next interval.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        shutdown: Arc<Notify>,
        shutdown_requested: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(cache.policy.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if shutdown_requested.load(Ordering::SeqCst) {
                            break;
                        }
                        let evicted = cache.sweep().await;
                        if evicted > 0 {
                            logger::log_cache_sweep(evicted);
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FakeStore {
        files: HashMap<String, Bytes>,
        reads: AtomicUsize,
    }

    impl FakeStore {
        fn new(files: &[(&str, &[u8])]) -> Arc<Self> {
            Arc::new(Self {
                files: files
                    .iter()
                    .map(|(name, content)| ((*name).to_string(), Bytes::copy_from_slice(content)))
                    .collect(),
                reads: AtomicUsize::new(0),
            })
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl AssetStore for FakeStore {
        fn read(&self, name: &str) -> Option<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files.get(name).cloned()
        }
    }

    fn test_policy() -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(90),
            sweep_interval: Duration::from_secs(60),
        }
    }

    async fn table_len(cache: &AssetCache) -> usize {
        cache.entries.read().await.len()
    }

    async fn table_contains(cache: &AssetCache, name: &str) -> bool {
        cache.entries.read().await.contains_key(name)
    }

    #[tokio::test]
    async fn miss_then_hit_returns_store_bytes() {
        let store = FakeStore::new(&[("index.html", b"<html>hi</html>")]);
        let cache = AssetCache::new(store.clone(), test_policy());

        let asset = cache.get("/index.html").await.unwrap();
        assert_eq!(asset.content.as_ref(), b"<html>hi</html>");
        assert_eq!(asset.content_type, "text/html");
        assert_eq!(asset.name, "index.html");
        assert_eq!(store.reads(), 1);

        // Second call is served from the table, not the store
        let again = cache.get("/index.html").await.unwrap();
        assert_eq!(again.content, asset.content);
        assert_eq!(again.content_type, asset.content_type);
        assert_eq!(store.reads(), 1);
        assert_eq!(table_len(&cache).await, 1);
    }

    #[tokio::test]
    async fn traversal_is_rejected_before_the_store() {
        let store = FakeStore::new(&[("secret", b"s")]);
        let cache = AssetCache::new(store.clone(), test_policy());

        let err = cache.get("../secret").await.unwrap_err();
        assert!(matches!(err, AssetError::InvalidPath(_)));
        assert_eq!(store.reads(), 0);
        assert_eq!(table_len(&cache).await, 0);
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let store = FakeStore::new(&[]);
        let cache = AssetCache::new(store, test_policy());

        assert_eq!(
            cache.get("nope.js").await.unwrap_err(),
            AssetError::NotFound("nope.js".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_only_expired_entries() {
        let store = FakeStore::new(&[("a.css", b"a"), ("b.css", b"b")]);
        let cache = AssetCache::new(store, test_policy());

        cache.get("a.css").await.unwrap();
        // Cross a minute boundary before the second entry appears
        tokio::time::advance(Duration::from_secs(61)).await;
        cache.get("b.css").await.unwrap();

        assert_eq!(cache.sweep().await, 0);
        assert!(table_contains(&cache, "a.css").await);

        // a.css is now 96s old (past its 90s ttl), b.css only 35s
        tokio::time::advance(Duration::from_secs(35)).await;
        assert_eq!(cache.sweep().await, 1);
        assert!(!table_contains(&cache, "a.css").await);
        assert!(table_contains(&cache, "b.css").await);

        // An evicted entry repopulates on the next lookup
        cache.get("a.css").await.unwrap();
        assert!(table_contains(&cache, "a.css").await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_evicts_and_stops_on_shutdown() {
        let store = FakeStore::new(&[("x.js", b"x")]);
        let cache = Arc::new(AssetCache::new(
            store,
            CachePolicy {
                ttl: Duration::from_secs(30),
                sweep_interval: Duration::from_secs(60),
            },
        ));
        let shutdown = Arc::new(Notify::new());
        let shutdown_requested = Arc::new(AtomicBool::new(false));
        let sweeper = cache.spawn_sweeper(Arc::clone(&shutdown), Arc::clone(&shutdown_requested));

        cache.get("x.js").await.unwrap();
        assert!(table_contains(&cache, "x.js").await);

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(!table_contains(&cache, "x.js").await);

        shutdown_requested.store(true, Ordering::SeqCst);
        shutdown.notify_waiters();
        sweeper.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_converge_to_one_entry() {
        let store = FakeStore::new(&[("app.js", b"console.log(1);")]);
        let cache = Arc::new(AssetCache::new(store, test_policy()));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move { cache.get("app.js").await }));
        }
        for task in tasks {
            let asset = task.await.unwrap().unwrap();
            assert_eq!(asset.content.as_ref(), b"console.log(1);");
            assert_eq!(asset.content_type, "application/javascript");
        }
        assert_eq!(table_len(&cache).await, 1);
    }
}
