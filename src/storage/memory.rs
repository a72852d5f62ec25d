//! In-process [`ObjectStore`] used by tests and `--dry-run`.
//!
//! Besides plain bookkeeping it can simulate the listing lag of an eventually
//! consistent backend: with [`MemoryStore::with_listing_lag`] every freshly
//! uploaded object stays invisible to the next `n` listings of its bucket,
//! even though it exists and still blocks bucket deletion.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::storage::{
    delete_listed, object_name_for, DeleteSummary, ObjectStore, StorageError,
};

#[derive(Debug)]
struct StoredObject {
    bytes: Vec<u8>,
    /// Listings that will still miss this object.
    hidden_listings: usize,
}

/// Bucket name → object name → object.
type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Thread-safe in-memory bucket store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    listing_lag: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide each uploaded object from the next `lag` listings of its bucket.
    pub fn with_listing_lag(lag: usize) -> Self {
        Self {
            listing_lag: lag,
            ..Self::default()
        }
    }

    /// Names of all existing buckets.
    pub fn bucket_names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Every object in `bucket`, including ones a listing would still miss.
    pub fn stored_objects(&self, bucket: &str) -> Option<Vec<String>> {
        self.lock()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
    }

    /// Size in bytes of a stored object.
    pub fn object_len(&self, bucket: &str, object: &str) -> Option<usize> {
        self.lock()
            .get(bucket)
            .and_then(|objects| objects.get(object))
            .map(|o| o.bytes.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buckets> {
        // A panicking test thread must not wedge every later call.
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove_object(&self, bucket: &str, object: &str) -> Result<(), StorageError> {
        let mut buckets = self.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::NotFound(format!("bucket {bucket}")))?;
        objects
            .remove(object)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("object {bucket}/{object}")))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut buckets = self.lock();
        if buckets.contains_key(bucket) {
            return Err(StorageError::Conflict(format!("bucket {bucket}")));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn upload(&self, bucket: &str, local: &Path) -> Result<String, StorageError> {
        let object = object_name_for(local)?;
        let bytes = tokio::fs::read(local).await.map_err(|e| StorageError::Io {
            path: local.display().to_string(),
            message: e.to_string(),
        })?;

        let mut buckets = self.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::NotFound(format!("bucket {bucket}")))?;
        objects.insert(
            object.clone(),
            StoredObject {
                bytes,
                hidden_listings: self.listing_lag,
            },
        );
        Ok(object)
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let mut buckets = self.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::NotFound(format!("bucket {bucket}")))?;

        let mut visible = Vec::new();
        for (name, object) in objects.iter_mut() {
            if object.hidden_listings > 0 {
                object.hidden_listings -= 1;
            } else {
                visible.push(name.clone());
            }
        }
        Ok(visible)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        force: bool,
    ) -> Result<DeleteSummary, StorageError> {
        let names = self.list_objects(bucket).await?;
        delete_listed(names, force, |name| async move { self.remove_object(bucket, &name) })
            .await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let mut buckets = self.lock();
        match buckets.get(bucket) {
            None => Err(StorageError::NotFound(format!("bucket {bucket}"))),
            Some(objects) if !objects.is_empty() => {
                Err(StorageError::BucketNotEmpty(bucket.to_string()))
            }
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }
}
