//! Remote objects created by the current run.

use crate::core::StageId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named object held by the prompt service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// The object name.
    pub name: String,
    /// The stage that created it.
    pub producer: StageId,
}

/// Thread-safe record of the objects a run has created.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: Arc<RwLock<Vec<RemoteObject>>>,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an object; recording the same name twice keeps one entry.
    pub fn record(&self, name: impl Into<String>, producer: StageId) {
        let name = name.into();
        let mut objects = self.objects.write();
        if !objects.iter().any(|o| o.name == name) {
            objects.push(RemoteObject { name, producer });
        }
    }

    /// Whether `name` was created in this run.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.objects.read().iter().any(|o| o.name == name)
    }

    /// Recorded objects in creation order.
    #[must_use]
    pub fn objects(&self) -> Vec<RemoteObject> {
        self.objects.read().clone()
    }

    /// Number of recorded objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Forgets every object.
    pub fn clear(&self) {
        self.objects.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_clear() {
        let registry = ObjectRegistry::new();
        registry.record("support_tickets", StageId::Ingestion);
        registry.record("support_tickets", StageId::Ingestion);
        registry.record("sentiment_analysis", StageId::Sentiment);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("sentiment_analysis"));
        assert_eq!(registry.objects()[1].producer, StageId::Sentiment);

        let shared = registry.clone();
        shared.clear();
        assert!(registry.is_empty());
    }
}
