//! Fetch Event Handling
//!
//! Cache-first with network fallback. Hits are served without touching
//! the network; successful same-origin GET misses are copied into the
//! current namespace on the way back.

use crate::net::{is_same_origin, url_path, Method, Request, Response};

use super::CacheWorker;

/// Indicates where a fetch response originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// From the current cache namespace.
    Cache,
    /// From the network.
    Network,
    /// Cached offline fallback for a failed navigation.
    OfflineFallback,
    /// Network failed and nothing cached could stand in.
    Unavailable,
}

/// Response produced by the worker for an intercepted request.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub response: Response,
    pub source: FetchSource,
}

impl CacheWorker {
    /// Handle a fetch event.
    ///
    /// Only an activated worker reads or populates the cache; during
    /// install/activation every request goes straight to the network.
    pub async fn fetch(&self, request: &Request) -> Fetched {
        if !self.is_active() || !self.is_cacheable(request) {
            return self.network_only(request).await;
        }

        let ns = self.namespace.name();
        let key = request.cache_key();
        match self.caches.match_entry(ns, &key).await {
            Ok(Some(response)) => {
                log::trace!("[SW {}] cache hit {}", self.id.raw(), request.url);
                return Fetched {
                    response,
                    source: FetchSource::Cache,
                };
            }
            Ok(None) => {}
            Err(e) => log::warn!("[SW Cache] lookup in {} failed: {}", ns, e),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let final_url = if response.url.is_empty() {
                    &request.url
                } else {
                    &response.url
                };
                if response.ok() && is_same_origin(final_url, &self.config.origin) {
                    // A successor may already have swept this namespace.
                    match self.caches.put_existing(ns, &key, response.clone()).await {
                        Ok(true) => {}
                        Ok(false) => log::debug!(
                            "[SW {}] {} evicted, not storing {}",
                            self.id.raw(),
                            ns,
                            request.url
                        ),
                        Err(e) => log::warn!("[SW Cache] could not store {}: {}", request.url, e),
                    }
                }
                Fetched {
                    response,
                    source: FetchSource::Network,
                }
            }
            Err(e) => {
                log::debug!("[SW {}] network failed for {}: {}", self.id.raw(), request.url, e);
                self.offline_fallback(request).await
            }
        }
    }

    /// Requests the cache never answers: non-GET, version checks and
    /// anything explicitly marked `no-store`.
    fn is_cacheable(&self, request: &Request) -> bool {
        if request.method != Method::Get {
            return false;
        }
        let path = url_path(&request.url);
        if self.config.bypass_paths.iter().any(|p| p == path) {
            return false;
        }
        !request
            .headers
            .iter()
            .any(|(name, value)| name.eq_ignore_ascii_case("cache-control") && value.contains("no-store"))
    }

    async fn network_only(&self, request: &Request) -> Fetched {
        match self.network.fetch(request).await {
            Ok(response) => Fetched {
                response,
                source: FetchSource::Network,
            },
            Err(e) => {
                log::debug!("[SW {}] passthrough failed for {}: {}", self.id.raw(), request.url, e);
                Fetched {
                    response: Response::error(),
                    source: FetchSource::Unavailable,
                }
            }
        }
    }

    async fn offline_fallback(&self, request: &Request) -> Fetched {
        if request.is_navigation() {
            if let Some(path) = &self.config.offline_fallback {
                let key = Request::get(self.config.absolute_url(path)).cache_key();
                if let Ok(Some(response)) = self.caches.match_entry(self.namespace.name(), &key).await {
                    return Fetched {
                        response,
                        source: FetchSource::OfflineFallback,
                    };
                }
            }
        }
        Fetched {
            response: Response::error(),
            source: FetchSource::Unavailable,
        }
    }
}
