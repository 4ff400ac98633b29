//! The worker registry — a process-wide map from model name to the ordered
//! list of worker clients willing to answer that model, plus a background
//! health monitor that owns each worker's `Down`/`Available` transitions.

mod health;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;
use tokio::sync::RwLock;

pub use health::{HEALTH_CHECK_INTERVAL, spawn_health_monitor};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model {0} not supported")]
    ModelNotSupported(String),
    #[error("already registered")]
    AlreadyRegistered,
}

/// A worker's liveness/busy state. Read without locking by the selection
/// loop; written by the health monitor (`Down`<->`Available`) and by the
/// dispatcher for the duration of an in-flight call (`Busy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Down,
    Available,
    Busy,
}

impl WorkerStatus {
    fn to_u8(self) -> u8 {
        match self {
            WorkerStatus::Down => 0,
            WorkerStatus::Available => 1,
            WorkerStatus::Busy => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerStatus::Available,
            2 => WorkerStatus::Busy,
            _ => WorkerStatus::Down,
        }
    }
}

/// A registered self-hosted worker endpoint. Shared (`Arc`) between the
/// registry, the health monitor task, and any in-flight dispatch attempt.
#[derive(Debug)]
pub struct WorkerHandle {
    pub url: String,
    pub model_name: String,
    status: AtomicU8,
}

impl WorkerHandle {
    fn new(url: String, model_name: String) -> Arc<Self> {
        Arc::new(Self {
            url,
            model_name,
            status: AtomicU8::new(WorkerStatus::Down.to_u8()),
        })
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    pub fn set_status(&self, status: WorkerStatus) {
        self.status.store(status.to_u8(), Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    buckets: HashMap<String, Vec<Arc<WorkerHandle>>>,
    urls: HashSet<String>,
}

/// Mapping: model name -> ordered worker clients, plus the URL dedup set.
/// Guarded by a single readers-writer lock so the two invariants (§3:
/// "every worker appears under exactly one model name"; "the URL set
/// equals the union of URLs across all model buckets") never tear.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    inner: RwLock<RegistryInner>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a model name as supported without registering any worker
    /// under it yet (used at startup from configuration).
    pub async fn declare_model(&self, model: impl Into<String>) {
        let mut inner = self.inner.write().await;
        inner.buckets.entry(model.into()).or_default();
    }

    pub async fn register(&self, model: &str, url: &str) -> Result<Arc<WorkerHandle>, RegistryError> {
        let mut inner = self.inner.write().await;
        if !inner.buckets.contains_key(model) {
            return Err(RegistryError::ModelNotSupported(model.to_string()));
        }
        if inner.urls.contains(url) {
            return Err(RegistryError::AlreadyRegistered);
        }
        let handle = WorkerHandle::new(url.to_string(), model.to_string());
        inner.urls.insert(url.to_string());
        inner.buckets.get_mut(model).expect("checked above").push(handle.clone());
        Ok(handle)
    }

    /// Multi-model registration: for every listed model, append a worker
    /// under that model unless `url` is already known under any model.
    /// Rejects the whole request if any listed model is unsupported.
    pub async fn register_worker(
        &self,
        url: &str,
        model_names: &[String],
    ) -> Result<Vec<Arc<WorkerHandle>>, RegistryError> {
        let mut inner = self.inner.write().await;
        for model in model_names {
            if !inner.buckets.contains_key(model) {
                return Err(RegistryError::ModelNotSupported(model.clone()));
            }
        }
        if inner.urls.contains(url) {
            return Ok(Vec::new());
        }
        inner.urls.insert(url.to_string());
        let mut handles = Vec::with_capacity(model_names.len());
        for model in model_names {
            let handle = WorkerHandle::new(url.to_string(), model.clone());
            inner.buckets.get_mut(model).expect("checked above").push(handle.clone());
            handles.push(handle);
        }
        Ok(handles)
    }

    pub async fn lookup(&self, model: &str) -> Vec<Arc<WorkerHandle>> {
        let inner = self.inner.read().await;
        inner.buckets.get(model).cloned().unwrap_or_default()
    }

    pub async fn heartbeat_known(&self, url: &str) -> bool {
        let inner = self.inner.read().await;
        inner.urls.contains(url)
    }

    pub async fn list_models(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.buckets.keys().cloned().collect()
    }

    pub async fn is_known_model(&self, model: &str) -> bool {
        let inner = self.inner.read().await;
        inner.buckets.contains_key(model)
    }

    /// First `Available` worker's URL for `model`, or empty string.
    pub async fn first_available_address(&self, model: &str) -> String {
        let inner = self.inner.read().await;
        inner
            .buckets
            .get(model)
            .into_iter()
            .flatten()
            .find(|w| w.status() == WorkerStatus::Available)
            .map(|w| w.url.clone())
            .unwrap_or_default()
    }
}
