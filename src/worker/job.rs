//! Jobs and their handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of background work: a type tag plus an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
}

impl Job {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            payload,
        }
    }
}

/// Processing logic for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job);
}

/// Maps job type tags to handlers.
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    pub fn handler(&self, kind: &str) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Handler that only logs the job; used for side effects with no local work.
#[derive(Debug, Default)]
pub struct LogHandler;

#[async_trait]
impl JobHandler for LogHandler {
    async fn handle(&self, job: &Job) {
        tracing::info!(job_id = %job.id, kind = %job.kind, payload = %job.payload, "Processing job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = JobRegistry::new()
            .register("entry_created", Arc::new(LogHandler))
            .register("entry_deleted", Arc::new(LogHandler));

        assert!(registry.handler("entry_created").is_some());
        assert!(registry.handler("unknown").is_none());

        let mut kinds: Vec<_> = registry.kinds().collect();
        kinds.sort();
        assert_eq!(kinds, vec!["entry_created", "entry_deleted"]);
    }

    #[test]
    fn test_job_ids_unique() {
        let a = Job::new("x", serde_json::json!({"id": 1}));
        let b = Job::new("x", serde_json::json!({"id": 1}));
        assert_ne!(a.id, b.id);
    }
}
