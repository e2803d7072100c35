//! Append-only artifact store shared by the agents of one run.
//!
//! Writes are a single check-and-set under the write lock, so the first
//! producer of a name wins and any later write is reported as an
//! [`ArtifactConflict`]. Agents never see the store itself; they get an
//! immutable [`ArtifactView`] snapshot taken at dispatch time.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;

/// A stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub producer: String,
    pub value: Value,
    /// Declared in the producer's `provides` list.
    pub declared: bool,
    /// False when the declared producer failed before writing it.
    pub available: bool,
}

/// A rejected second write for an artifact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactConflict {
    pub artifact: String,
    pub existing_producer: String,
    pub attempted_by: String,
}

#[derive(Debug, Default)]
pub struct ArtifactStore {
    inner: RwLock<BTreeMap<String, Artifact>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name` unless the name is already taken.
    pub fn try_insert(
        &self,
        name: &str,
        producer: &str,
        value: Value,
        declared: bool,
    ) -> Result<(), ArtifactConflict> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(name) {
            return Err(ArtifactConflict {
                artifact: name.to_string(),
                existing_producer: existing.producer.clone(),
                attempted_by: producer.to_string(),
            });
        }
        map.insert(
            name.to_string(),
            Artifact {
                name: name.to_string(),
                producer: producer.to_string(),
                value,
                declared,
                available: true,
            },
        );
        Ok(())
    }

    /// Record that `producer` will never deliver `name`.
    ///
    /// No-op when the name already holds a value.
    pub fn mark_unavailable(&self, name: &str, producer: &str) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(name.to_string()).or_insert_with(|| Artifact {
            name: name.to_string(),
            producer: producer.to_string(),
            value: Value::Null,
            declared: true,
            available: false,
        });
    }

    pub fn get(&self, name: &str) -> Option<Artifact> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immutable snapshot of the current contents.
    pub fn view(&self) -> ArtifactView {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        ArtifactView {
            artifacts: Arc::new(map.clone()),
        }
    }

    /// Consume the store, returning every entry.
    pub fn into_inner(self) -> BTreeMap<String, Artifact> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only snapshot of an [`ArtifactStore`].
#[derive(Debug, Clone, Default)]
pub struct ArtifactView {
    artifacts: Arc<BTreeMap<String, Artifact>>,
}

impl ArtifactView {
    /// Value of an available artifact.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.artifacts
            .get(name)
            .filter(|a| a.available)
            .map(|a| &a.value)
    }

    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn is_unavailable(&self, name: &str) -> bool {
        self.artifacts.get(name).is_some_and(|a| !a.available)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
