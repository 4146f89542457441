// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Local filesystem storage implementation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::{Error, ListResult, MetadataUpdate, ObjectMetadata, Result, StoragePath};

use crate::backend::{list_children, new_metadata, updated_metadata, ObjectStore, PutOptions};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    blob: Uuid,
    metadata: ObjectMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    generation: u64,
    objects: BTreeMap<String, IndexEntry>,
}

/// Local filesystem storage backend.
///
/// Object bytes are written to `blobs/<uuid>` under the data
/// directory and the path-to-blob mapping lives in `index.json`. Both are
/// written to `tmp/` first and renamed into place.
pub struct LocalStore {
    data_dir: PathBuf,
    temp_dir: PathBuf,
    index: Mutex<Index>,
}

impl LocalStore {
    /// Opens (or creates) a store rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or an existing
    /// index cannot be read.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let temp_dir = data_dir.join("tmp");
        fs::create_dir_all(data_dir.join("blobs")).await?;
        fs::create_dir_all(&temp_dir).await?;

        let index_path = data_dir.join(INDEX_FILE);
        let index = match fs::read(&index_path).await {
            Ok(raw) => serde_json::from_slice::<Index>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Index::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            data_dir = %data_dir.display(),
            objects = index.objects.len(),
            "opened local store"
        );

        Ok(Self { data_dir, temp_dir, index: Mutex::new(index) })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn blob_path(&self, blob: &Uuid) -> PathBuf {
        self.data_dir.join("blobs").join(blob.to_string())
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.temp_dir.join(format!("{name}.tmp"))
    }

    async fn write_atomic(&self, temp: &Path, target: &Path, data: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp, target).await?;
        Ok(())
    }

    async fn persist_index(&self, index: &Index) -> Result<()> {
        let raw = serde_json::to_vec_pretty(index)?;
        let temp = self.temp_path(&format!("index-{}", Uuid::new_v4()));
        self.write_atomic(&temp, &self.data_dir.join(INDEX_FILE), &raw).await
    }

    async fn remove_blob(&self, blob: &Uuid) {
        if let Err(e) = fs::remove_file(self.blob_path(blob)).await {
            warn!(%blob, error = %e, "failed to remove blob");
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put_object(
        &self,
        path: &StoragePath,
        data: Bytes,
        options: PutOptions,
    ) -> Result<ObjectMetadata> {
        let blob = Uuid::new_v4();
        let blob_path = self.blob_path(&blob);
        self.write_atomic(&self.temp_path(&blob.to_string()), &blob_path, &data).await?;

        let mut index = self.index.lock().await;
        index.generation += 1;
        let generation = index.generation;
        let previous = index.objects.get(path.as_str()).cloned();
        let metadata =
            new_metadata(path, &data, options, generation, previous.as_ref().map(|e| &e.metadata));

        index
            .objects
            .insert(path.as_str().to_string(), IndexEntry { blob, metadata: metadata.clone() });
        if let Err(e) = self.persist_index(&index).await {
            // Roll back so the in-memory index matches disk.
            match previous.clone() {
                Some(entry) => index.objects.insert(path.as_str().to_string(), entry),
                None => index.objects.remove(path.as_str()),
            };
            drop(index);
            self.remove_blob(&blob).await;
            return Err(e);
        }
        drop(index);

        if let Some(old) = previous {
            self.remove_blob(&old.blob).await;
        }

        debug!(path = %path, size = metadata.size, generation, "stored object");
        Ok(metadata)
    }

    async fn head_object(&self, path: &StoragePath) -> Result<Option<ObjectMetadata>> {
        Ok(self.index.lock().await.objects.get(path.as_str()).map(|e| e.metadata.clone()))
    }

    async fn get_object(&self, path: &StoragePath) -> Result<(ObjectMetadata, Bytes)> {
        // Held across the read so an overwrite cannot remove the blob underneath us.
        let index = self.index.lock().await;
        let entry =
            index.objects.get(path.as_str()).ok_or_else(|| Error::not_found(path.as_str()))?;
        let data = fs::read(self.blob_path(&entry.blob)).await?;
        Ok((entry.metadata.clone(), Bytes::from(data)))
    }

    async fn list(&self, prefix: Option<&StoragePath>) -> Result<ListResult> {
        let index = self.index.lock().await;
        Ok(list_children(index.objects.keys().map(String::as_str), prefix))
    }

    async fn update_metadata(
        &self,
        path: &StoragePath,
        update: &MetadataUpdate,
    ) -> Result<ObjectMetadata> {
        let mut index = self.index.lock().await;
        let entry =
            index.objects.get(path.as_str()).ok_or_else(|| Error::not_found(path.as_str()))?;
        let previous = entry.metadata.clone();
        let next = updated_metadata(&previous, update);

        if let Some(entry) = index.objects.get_mut(path.as_str()) {
            entry.metadata = next.clone();
        }
        if let Err(e) = self.persist_index(&index).await {
            if let Some(entry) = index.objects.get_mut(path.as_str()) {
                entry.metadata = previous;
            }
            return Err(e);
        }
        Ok(next)
    }

    async fn delete_object(&self, path: &StoragePath) -> Result<()> {
        let mut index = self.index.lock().await;
        let entry =
            index.objects.remove(path.as_str()).ok_or_else(|| Error::not_found(path.as_str()))?;
        if let Err(e) = self.persist_index(&index).await {
            index.objects.insert(path.as_str().to_string(), entry);
            return Err(e);
        }
        drop(index);

        self.remove_blob(&entry.blob).await;
        debug!(path = %path, "deleted object");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut index = self.index.lock().await;
        let removed = std::mem::take(&mut index.objects);
        self.persist_index(&index).await?;
        drop(index);

        for entry in removed.values() {
            self.remove_blob(&entry.blob).await;
        }
        debug!(removed = removed.len(), "cleared store");
        Ok(())
    }
}
