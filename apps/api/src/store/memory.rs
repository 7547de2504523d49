use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{decode_table, encode_table, StoreError, TableStore, VersionedTable};
use crate::models::contact::ContactTable;

struct StoredFile {
    bytes: Vec<u8>,
    version: String,
}

/// In-process store for tests. Files are kept as encoded CSV so reads go through
/// the same codec as the remote store, and writes are version-checked the same way.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, StoredFile>>,
    messages: Mutex<Vec<String>>,
    reads: AtomicUsize,
    revisions: AtomicUsize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn next_version(&self) -> String {
        format!("rev-{}", self.revisions.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replaces the file as an outside writer would, giving it a new version.
    pub async fn seed(&self, path: &str, table: &ContactTable) {
        let file = StoredFile {
            bytes: encode_table(table).unwrap(),
            version: self.next_version(),
        };
        self.files.lock().await.insert(path.to_string(), file);
    }

    pub async fn stored(&self, path: &str) -> Option<ContactTable> {
        let files = self.files.lock().await;
        files.get(path).map(|file| decode_table(&file.bytes).unwrap())
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn file_exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.files.lock().await.contains_key(path))
    }

    async fn read_table(&self, path: &str) -> Result<VersionedTable, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let files = self.files.lock().await;
        let file = files.get(path).ok_or_else(|| StoreError::Api {
            status: 404,
            message: format!("{path} not found"),
        })?;
        Ok(VersionedTable {
            table: decode_table(&file.bytes)?,
            version: file.version.clone(),
        })
    }

    async fn write_table(
        &self,
        path: &str,
        table: &ContactTable,
        expected: Option<&str>,
        message: &str,
    ) -> Result<String, StoreError> {
        if self.fail_writes {
            return Err(StoreError::Api {
                status: 500,
                message: "write rejected".to_string(),
            });
        }

        let mut files = self.files.lock().await;
        let current = files.get(path).map(|file| file.version.as_str());
        if current != expected {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        let version = self.next_version();
        let file = StoredFile {
            bytes: encode_table(table)?,
            version: version.clone(),
        };
        files.insert(path.to_string(), file);
        self.messages.lock().await.push(message.to_string());
        Ok(version)
    }
}
