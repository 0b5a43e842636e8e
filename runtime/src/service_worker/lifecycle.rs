//! Install / activate lifecycle.
//!
//! - install precaches the whole app shell or nothing
//! - activate evicts every foreign namespace before the worker is allowed
//!   to serve from its own

use crate::error::{CacheOpError, WorkerError};
use crate::net::Request;
use crate::router::ClientMessage;

use super::{CacheWorker, WorkerState};

impl CacheWorker {
    /// Handle the install event.
    ///
    /// Fetches every app-shell URL first and only writes once all of them
    /// succeeded. On failure the worker stays `Installing` and the platform
    /// may retry. Returns the number of precached entries.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        let state = self.state();
        if state != WorkerState::Installing {
            return Err(WorkerError::InvalidStateTransition {
                from: state,
                to: WorkerState::Installed,
            });
        }

        let mut fetched = Vec::with_capacity(self.config.app_shell.len());
        for path in &self.config.app_shell {
            let url = self.config.absolute_url(path);
            let request = Request::get(url.clone());
            let reason = match self.network.fetch(&request).await {
                Ok(response) if response.ok() => {
                    fetched.push((request.cache_key(), response));
                    continue;
                }
                Ok(response) => format!("status {}", response.status),
                Err(e) => e.to_string(),
            };
            log::warn!("[SW {}] install failed on {}: {}", self.id.raw(), url, reason);
            return Err(WorkerError::InstallFailed { url, reason });
        }

        let count = fetched.len();
        let ns = self.namespace.name();
        for (key, response) in fetched {
            if let Err(e) = self.caches.put(ns, &key, response).await {
                // Leave nothing half-populated behind.
                if let Err(cleanup) = self.caches.delete(ns).await {
                    log::warn!("[SW Cache] cleanup of {} failed: {}", ns, cleanup);
                }
                return Err(e.into());
            }
        }

        self.transition(WorkerState::Installed)?;
        log::debug!("[SW {}] precached {} entries into {}", self.id.raw(), count, ns);
        Ok(count)
    }

    /// Handle the activate event.
    ///
    /// Evicts every namespace other than this worker's own. The sweep is
    /// retried `activation_retries` times; if it still fails the worker
    /// stays `Activating` and does not serve from the cache, and calling
    /// `activate` again resumes the sweep. On success all open tabs are
    /// claimed and told the new version is active. Returns the number of
    /// evicted namespaces.
    pub async fn activate(&self) -> Result<usize, WorkerError> {
        match self.state() {
            WorkerState::Installed => {
                self.transition(WorkerState::Activating)?;
            }
            WorkerState::Activating => {
                log::debug!("[SW {}] resuming activation sweep", self.id.raw());
            }
            WorkerState::Activated => return Ok(0),
            other => {
                return Err(WorkerError::InvalidStateTransition {
                    from: other,
                    to: WorkerState::Activating,
                })
            }
        }

        let attempts = self.config.activation_retries + 1;
        let mut attempt = 0;
        let evicted = loop {
            attempt += 1;
            match self.sweep().await {
                Ok(evicted) => break evicted,
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "[SW Cache] eviction sweep attempt {}/{} failed: {}",
                        attempt,
                        attempts,
                        e
                    );
                }
                Err(e) => {
                    log::warn!(
                        "[SW Cache] eviction sweep gave up after {} attempts: {}",
                        attempts,
                        e
                    );
                    return Err(e.into());
                }
            }
        };

        self.transition(WorkerState::Activated)?;
        self.clients.claim().await;

        let message = ClientMessage::update_ready(&self.build);
        for client in self.clients.match_all().await {
            if let Err(e) = self.clients.post_message(&client.id, message.clone()).await {
                log::debug!("[SW {}] could not notify {}: {}", self.id.raw(), client.id, e);
            }
        }
        Ok(evicted)
    }

    /// Activate a waiting worker without waiting for old tabs to close.
    pub async fn skip_waiting(&self) -> Result<usize, WorkerError> {
        if !self.is_waiting() {
            return Err(WorkerError::InvalidStateTransition {
                from: self.state(),
                to: WorkerState::Activating,
            });
        }
        self.activate().await
    }

    /// Delete every namespace, the current one included. Idempotent.
    pub async fn clear_caches(&self) -> Result<usize, CacheOpError> {
        let mut removed = 0;
        for name in self.caches.list_namespaces().await? {
            if self.caches.delete(&name).await? {
                removed += 1;
            }
        }
        log::info!("[SW Cache] cleared {} namespaces", removed);
        Ok(removed)
    }

    async fn sweep(&self) -> Result<usize, CacheOpError> {
        let current = self.namespace.name();
        let mut evicted = 0;
        for name in self.caches.list_namespaces().await? {
            if name != current && self.caches.delete(&name).await? {
                log::debug!("[SW Cache] evicted {}", name);
                evicted += 1;
            }
        }
        self.caches.open(current).await?;
        Ok(evicted)
    }
}
