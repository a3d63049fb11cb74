//! Durable local backend: one JSON document on disk, poll-based watches.
//!
//! The document keeps the layout the dashboard tooling expects:
//! `{ "pending": [...], "processed": [...], "lastUpdated": epoch-ms }`.
//! Every mutation rewrites the whole file; records survive a process
//! restart but are local to this machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use rgate_core::error::CoreError;
use rgate_core::lifecycle::STATUS_PENDING;
use rgate_core::types::Timestamp;

use crate::record::{sort_for_operator, AccessRequest, NewRequest, StatusChange};
use crate::store::{ListCallback, RequestStore};
use crate::subscription::WatchGuard;

/// Default interval between poll deliveries for subscribers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// On-disk document shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalDocument {
    pending: Vec<AccessRequest>,
    processed: Vec<AccessRequest>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_updated: Timestamp,
}

impl LocalDocument {
    fn empty() -> Self {
        Self {
            pending: Vec::new(),
            processed: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &AccessRequest> {
        self.pending.iter().chain(self.processed.iter())
    }

    fn contains(&self, id: &str) -> bool {
        self.iter().any(|r| r.id == id)
    }

    /// Extract a record by id from whichever section holds it.
    fn take(&mut self, id: &str) -> Option<AccessRequest> {
        if let Some(pos) = self.pending.iter().position(|r| r.id == id) {
            return Some(self.pending.remove(pos));
        }
        if let Some(pos) = self.processed.iter().position(|r| r.id == id) {
            return Some(self.processed.remove(pos));
        }
        None
    }

    /// Insert a record into the section matching its status.
    fn put(&mut self, request: AccessRequest) {
        if request.status == STATUS_PENDING {
            self.pending.push(request);
        } else {
            self.processed.push(request);
        }
    }
}

struct Inner {
    path: PathBuf,
    doc: RwLock<LocalDocument>,
    poll_interval: Duration,
}

impl Inner {
    /// Serialize the document to disk. Called with the write lock held so
    /// file contents always match the in-memory state.
    async fn persist(&self, doc: &LocalDocument) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(|e| {
            CoreError::TransportUnavailable(format!("local document serialization failed: {e}"))
        })?;
        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            CoreError::TransportUnavailable(format!(
                "local document write failed ({}): {e}",
                self.path.display()
            ))
        })
    }

    async fn operator_list(&self) -> Vec<AccessRequest> {
        let now = Utc::now();
        let doc = self.doc.read().await;
        let mut list: Vec<AccessRequest> = doc
            .iter()
            .filter(|r| r.visible_to_operator(now))
            .cloned()
            .collect();
        sort_for_operator(&mut list);
        list
    }
}

/// The local variant: session-durable storage in a single JSON file.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

impl LocalStore {
    /// Open (or create) the document at `path`.
    ///
    /// A file that fails to parse is treated as absent and replaced with an
    /// empty document on the next write, mirroring how the dashboard
    /// recovers from corrupted local data.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        Self::open_with_interval(path, DEFAULT_POLL_INTERVAL).await
    }

    /// Open with a custom poll interval for subscribers.
    pub async fn open_with_interval(
        path: impl AsRef<Path>,
        poll_interval: Duration,
    ) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();

        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<LocalDocument>(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Local document unreadable, starting fresh"
                    );
                    LocalDocument::empty()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LocalDocument::empty(),
            Err(e) => {
                return Err(CoreError::TransportUnavailable(format!(
                    "local document read failed ({}): {e}",
                    path.display()
                )))
            }
        };

        let inner = Inner {
            path,
            doc: RwLock::new(doc),
            poll_interval,
        };
        // Write the initial document so the file exists from the start.
        {
            let doc = inner.doc.read().await;
            inner.persist(&doc).await?;
        }

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

#[async_trait]
impl RequestStore for LocalStore {
    async fn create(&self, new: NewRequest) -> Result<AccessRequest, CoreError> {
        let request = new.into_request();
        let mut doc = self.inner.doc.write().await;
        if doc.contains(&request.id) {
            return Err(CoreError::DuplicateId {
                id: request.id.clone(),
            });
        }
        doc.pending.push(request.clone());
        doc.last_updated = Utc::now();
        self.inner.persist(&doc).await?;
        Ok(request)
    }

    async fn get(&self, id: &str) -> Result<AccessRequest, CoreError> {
        self.inner
            .doc
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }

    async fn list_for_operator(&self) -> Result<Vec<AccessRequest>, CoreError> {
        Ok(self.inner.operator_list().await)
    }

    async fn update(&self, id: &str, change: StatusChange) -> Result<AccessRequest, CoreError> {
        let mut doc = self.inner.doc.write().await;
        let mut request = doc
            .take(id)
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;

        if let Err(e) = change.apply_to(&mut request, Utc::now()) {
            // Put the untouched record back before reporting the failure.
            doc.put(request);
            return Err(e);
        }

        doc.put(request.clone());
        doc.last_updated = Utc::now();
        self.inner.persist(&doc).await?;
        Ok(request)
    }

    async fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let mut doc = self.inner.doc.write().await;
        let removed = doc.take(id).is_some();
        if removed {
            doc.last_updated = Utc::now();
            self.inner.persist(&doc).await?;
        }
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<(), CoreError> {
        let mut doc = self.inner.doc.write().await;
        *doc = LocalDocument::empty();
        self.inner.persist(&doc).await
    }

    fn subscribe(&self, callback: ListCallback) -> WatchGuard {
        let active = WatchGuard::active_flag();
        let flag = Arc::clone(&active);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.poll_interval);
            loop {
                interval.tick().await;
                let list = inner.operator_list().await;
                if !flag.load(std::sync::atomic::Ordering::SeqCst) {
                    break;
                }
                callback(list);
            }
        });

        WatchGuard::new(active).with_task(task)
    }
}
