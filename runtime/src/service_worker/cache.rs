//! Cache Storage
//!
//! Named namespaces of request → response pairs, shared by every worker
//! instance and tab of the origin. The only mutations are an idempotent
//! overwriting `put` and a `delete` that is a no-op for absent names; no
//! read-modify-write sequence runs against cache contents.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use spin::RwLock;

use crate::error::CacheOpError;
use crate::net::Response;
use crate::version::BuildInfo;

/// Default quota (bytes)
const DEFAULT_QUOTA: usize = 50 * 1024 * 1024;

/// Name of a cache namespace: `<prefix>-v<version>-<build_timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheNamespace(String);

impl CacheNamespace {
    pub fn for_build(prefix: &str, build: &BuildInfo) -> Self {
        Self(format!(
            "{}-v{}-{}",
            prefix, build.version, build.build_timestamp
        ))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache repository seam.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Names of every existing namespace.
    async fn list_namespaces(&self) -> Result<Vec<String>, CacheOpError>;

    /// Create the namespace if absent.
    async fn open(&self, name: &str) -> Result<(), CacheOpError>;

    /// Delete a namespace. Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, CacheOpError>;

    /// Store `response` under `key`, creating the namespace if needed and
    /// replacing any previous entry.
    async fn put(&self, name: &str, key: &str, response: Response) -> Result<(), CacheOpError>;

    /// Store `response` only if the namespace still exists. Returns `false`
    /// without writing when it has been deleted.
    async fn put_existing(
        &self,
        name: &str,
        key: &str,
        response: Response,
    ) -> Result<bool, CacheOpError>;

    async fn match_entry(&self, name: &str, key: &str) -> Result<Option<Response>, CacheOpError>;
}

/// A single namespace
#[derive(Debug, Default)]
struct Namespace {
    entries: BTreeMap<String, Response>,
    size: usize,
}

/// In-memory cache storage with a byte quota.
pub struct MemoryCacheStorage {
    namespaces: RwLock<BTreeMap<String, Namespace>>,
    quota: usize,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            namespaces: RwLock::new(BTreeMap::new()),
            quota,
        }
    }

    /// Total bytes across all namespaces
    pub fn usage(&self) -> usize {
        self.namespaces.read().values().map(|ns| ns.size).sum()
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn has(&self, name: &str) -> bool {
        self.namespaces.read().contains_key(name)
    }

    /// Number of entries in a namespace (0 if absent).
    pub fn len(&self, name: &str) -> usize {
        self.namespaces
            .read()
            .get(name)
            .map(|ns| ns.entries.len())
            .unwrap_or(0)
    }

    pub fn names(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }
}

impl MemoryCacheStorage {
    fn store(
        &self,
        name: &str,
        key: &str,
        response: Response,
        create: bool,
    ) -> Result<bool, CacheOpError> {
        let size = key.len() + response.size();
        let mut namespaces = self.namespaces.write();
        if !create && !namespaces.contains_key(name) {
            return Ok(false);
        }

        let usage: usize = namespaces.values().map(|ns| ns.size).sum();
        let replaced = namespaces
            .get(name)
            .and_then(|ns| ns.entries.get(key))
            .map(|old| key.len() + old.size())
            .unwrap_or(0);
        if usage - replaced + size > self.quota {
            return Err(CacheOpError::QuotaExceeded {
                namespace: name.to_string(),
            });
        }

        let ns = namespaces.entry(name.to_string()).or_default();
        ns.entries.insert(key.to_string(), response);
        ns.size = ns.size - replaced + size;
        Ok(true)
    }
}

impl Default for MemoryCacheStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheRepository for MemoryCacheStorage {
    async fn list_namespaces(&self) -> Result<Vec<String>, CacheOpError> {
        Ok(self.names())
    }

    async fn open(&self, name: &str) -> Result<(), CacheOpError> {
        self.namespaces
            .write()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheOpError> {
        Ok(self.namespaces.write().remove(name).is_some())
    }

    async fn put(&self, name: &str, key: &str, response: Response) -> Result<(), CacheOpError> {
        self.store(name, key, response, true).map(|_| ())
    }

    async fn put_existing(
        &self,
        name: &str,
        key: &str,
        response: Response,
    ) -> Result<bool, CacheOpError> {
        self.store(name, key, response, false)
    }

    async fn match_entry(&self, name: &str, key: &str) -> Result<Option<Response>, CacheOpError> {
        Ok(self
            .namespaces
            .read()
            .get(name)
            .and_then(|ns| ns.entries.get(key))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_name_embeds_build() {
        let ns = CacheNamespace::for_build("app-shell", &BuildInfo::new("2.1.0", 1718000000000));
        assert_eq!(ns.name(), "app-shell-v2.1.0-1718000000000");
        assert_eq!(ns.to_string(), ns.name());
    }

    #[tokio::test]
    async fn put_and_match() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("ns", "GET:/a", Response::new(200).with_body("a"))
            .await
            .unwrap();
        let hit = storage.match_entry("ns", "GET:/a").await.unwrap();
        assert_eq!(hit.map(|r| r.body), Some(b"a".to_vec()));
        assert!(storage.match_entry("ns", "GET:/b").await.unwrap().is_none());
        assert!(storage.match_entry("other", "GET:/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_and_tracks_size() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("ns", "k", Response::new(200).with_body(vec![0u8; 100]))
            .await
            .unwrap();
        storage
            .put("ns", "k", Response::new(200).with_body(vec![0u8; 10]))
            .await
            .unwrap();
        assert_eq!(storage.len("ns"), 1);
        assert_eq!(storage.usage(), 1 + 10);
    }

    #[tokio::test]
    async fn put_existing_never_recreates() {
        let storage = MemoryCacheStorage::new();
        let stored = storage
            .put_existing("gone", "k", Response::new(200).with_body("x"))
            .await
            .unwrap();
        assert!(!stored);
        assert!(!storage.has("gone"));

        storage.open("ns").await.unwrap();
        assert!(storage
            .put_existing("ns", "k", Response::new(200).with_body("x"))
            .await
            .unwrap());
        assert_eq!(storage.len("ns"), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = MemoryCacheStorage::new();
        storage.open("ns").await.unwrap();
        assert!(storage.delete("ns").await.unwrap());
        assert!(!storage.delete("ns").await.unwrap());
        assert!(!storage.delete("never-existed").await.unwrap());
    }

    #[tokio::test]
    async fn quota_exceeded() {
        let storage = MemoryCacheStorage::with_quota(64);
        let err = storage
            .put("ns", "k", Response::new(200).with_body(vec![0u8; 128]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CacheOpError::QuotaExceeded {
                namespace: "ns".to_string()
            }
        );
        assert_eq!(storage.usage(), 0);
    }

    #[tokio::test]
    async fn list_namespaces_sorted() {
        let storage = MemoryCacheStorage::new();
        storage.open("b").await.unwrap();
        storage.open("a").await.unwrap();
        assert_eq!(storage.list_namespaces().await.unwrap(), vec!["a", "b"]);
    }
}
