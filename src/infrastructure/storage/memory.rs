//! In-memory blob store used by tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::BlobStore;
use crate::domain::{DomainError, DomainResult};

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    /// When set, every save fails; exercises upload rollback paths.
    pub fail_saves: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            fail_saves: true,
        }
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().expect("blob lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(
        &self,
        _filename_hint: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> DomainResult<String> {
        if self.fail_saves {
            return Err(DomainError::internal("blob store unavailable"));
        }
        let name = Uuid::new_v4().to_string();
        self.blobs
            .lock()
            .expect("blob lock poisoned")
            .insert(name.clone(), bytes.to_vec());
        Ok(name)
    }

    async fn delete(&self, relative_path: &str) -> DomainResult<()> {
        self.blobs
            .lock()
            .expect("blob lock poisoned")
            .remove(relative_path);
        Ok(())
    }
}
