// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! In-memory object store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;
use warden_core::{Error, ListResult, MetadataUpdate, ObjectMetadata, Result, StoragePath};

use crate::backend::{list_children, new_metadata, updated_metadata, ObjectStore, PutOptions};

#[derive(Debug, Clone)]
struct StoredObject {
    metadata: ObjectMetadata,
    data: Bytes,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    generation: u64,
}

/// Object store that keeps everything in memory.
///
/// This is the default backend: state lives as long as the process, which
/// is what a test environment wants.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        path: &StoragePath,
        data: Bytes,
        options: PutOptions,
    ) -> Result<ObjectMetadata> {
        let mut state = self.state.write();
        state.generation += 1;
        let generation = state.generation;

        let previous = state.objects.get(path.as_str()).map(|o| &o.metadata);
        let metadata = new_metadata(path, &data, options, generation, previous);
        state
            .objects
            .insert(path.as_str().to_string(), StoredObject { metadata: metadata.clone(), data });

        debug!(path = %path, size = metadata.size, generation, "stored object");
        Ok(metadata)
    }

    async fn head_object(&self, path: &StoragePath) -> Result<Option<ObjectMetadata>> {
        Ok(self.state.read().objects.get(path.as_str()).map(|o| o.metadata.clone()))
    }

    async fn get_object(&self, path: &StoragePath) -> Result<(ObjectMetadata, Bytes)> {
        self.state
            .read()
            .objects
            .get(path.as_str())
            .map(|o| (o.metadata.clone(), o.data.clone()))
            .ok_or_else(|| Error::not_found(path.as_str()))
    }

    async fn list(&self, prefix: Option<&StoragePath>) -> Result<ListResult> {
        let state = self.state.read();
        Ok(list_children(state.objects.keys().map(String::as_str), prefix))
    }

    async fn update_metadata(
        &self,
        path: &StoragePath,
        update: &MetadataUpdate,
    ) -> Result<ObjectMetadata> {
        let mut state = self.state.write();
        let object =
            state.objects.get_mut(path.as_str()).ok_or_else(|| Error::not_found(path.as_str()))?;
        object.metadata = updated_metadata(&object.metadata, update);
        Ok(object.metadata.clone())
    }

    async fn delete_object(&self, path: &StoragePath) -> Result<()> {
        match self.state.write().objects.remove(path.as_str()) {
            Some(_) => {
                debug!(path = %path, "deleted object");
                Ok(())
            }
            None => Err(Error::not_found(path.as_str())),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write();
        let removed = state.objects.len();
        state.objects.clear();
        debug!(removed, "cleared store");
        Ok(())
    }
}
