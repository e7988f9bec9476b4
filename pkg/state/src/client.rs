use crate::error::StoreError;
use crate::events::{CommitKind, CommitLog};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::path::Path;
use slatedb::{Db, WriteBatch};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Version envelope wrapped around every persisted record.
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u64,
    record: serde_json::Value,
}

enum Op {
    Put {
        key: String,
        expected: u64,
        record: serde_json::Value,
    },
    Delete {
        key: String,
        expected: u64,
    },
}

/// One atomic unit of guarded writes against the store.
///
/// Every write names the version the caller read (`0` = the key must not
/// exist yet); `expect` adds a read-only guard on a key that is checked
/// but not written.
#[derive(Default)]
pub struct Transaction {
    preconditions: Vec<(String, u64)>,
    ops: Vec<Op>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard on a key without writing it.
    pub fn expect(mut self, key: impl Into<String>, version: u64) -> Self {
        self.preconditions.push((key.into(), version));
        self
    }

    /// Write `record` at `key`, guarded by `expected` (0 = create).
    pub fn put<T: Serialize>(
        mut self,
        key: impl Into<String>,
        expected: u64,
        record: &T,
    ) -> Result<Self, StoreError> {
        self.ops.push(Op::Put {
            key: key.into(),
            expected,
            record: serde_json::to_value(record)?,
        });
        Ok(self)
    }

    /// Delete `key`, guarded by `expected`.
    pub fn delete(mut self, key: impl Into<String>, expected: u64) -> Self {
        self.ops.push(Op::Delete {
            key: key.into(),
            expected,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Persistent state store backed by SlateDB on a local filesystem.
/// In production this would use S3/R2/MinIO via the `object_store` crate.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Db>,
    commit_lock: Arc<Mutex<()>>,
    pub events: CommitLog,
}

impl StateStore {
    /// Open (or create) a state store rooted at `path` on the local filesystem.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        info!("Opening SlateDB state store at {}", path);

        // Ensure the data directory exists before opening the object store
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory {}: {}", path, e))?;

        let object_store = Arc::new(
            LocalFileSystem::new_with_prefix(path)
                .map_err(|e| anyhow::anyhow!("Failed to create local object store: {}", e))?,
        );
        let db = Db::open(Path::from("/"), object_store)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open SlateDB: {}", e))?;
        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
            events: CommitLog::new(),
        })
    }

    async fn load_envelope(&self, key: &str) -> Result<Option<Envelope>, StoreError> {
        let bytes = match self.db.get(key.as_bytes()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => return Err(anyhow::anyhow!("SlateDB get failed: {}", e).into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Load the record at `key`, returning its version alongside it.
    pub async fn load<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<(u64, T)>, StoreError> {
        match self.load_envelope(key).await? {
            Some(envelope) => {
                let record = serde_json::from_value(envelope.record)?;
                Ok(Some((envelope.version, record)))
            }
            None => Ok(None),
        }
    }

    /// List all records whose keys start with `prefix`, with their versions.
    pub async fn list_prefix<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, u64, T)>, StoreError> {
        let mut results = Vec::new();
        let mut iter = self
            .db
            .scan_prefix(prefix.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB scan_prefix failed: {}", e))?;

        // A mid-scan failure must not surface as a truncated listing:
        // callers use these results for emptiness checks.
        loop {
            match iter.next().await {
                Ok(Some(kv)) => {
                    let key = String::from_utf8_lossy(&kv.key).to_string();
                    let envelope: Envelope = serde_json::from_slice(&kv.value)?;
                    let record = serde_json::from_value(envelope.record)?;
                    results.push((key, envelope.version, record));
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(anyhow::anyhow!("SlateDB scan failed: {}", e).into());
                }
            }
        }
        Ok(results)
    }

    /// Apply a guarded transaction: verify every version guard, then land
    /// all writes in one SlateDB batch. A failed guard fails the whole
    /// transaction with `StoreError::Conflict` and writes nothing.
    pub async fn commit(&self, txn: Transaction) -> Result<(), StoreError> {
        let _guard = self.commit_lock.lock().await;

        for (key, expected) in &txn.preconditions {
            self.check_version(key, *expected).await?;
        }

        let mut batch = WriteBatch::new();
        let mut changes = Vec::with_capacity(txn.ops.len());
        for op in &txn.ops {
            match op {
                Op::Put {
                    key,
                    expected,
                    record,
                } => {
                    self.check_version(key, *expected).await?;
                    let envelope = Envelope {
                        version: expected + 1,
                        record: record.clone(),
                    };
                    batch.put(key.as_bytes(), &serde_json::to_vec(&envelope)?);
                    changes.push((CommitKind::Put, key.clone()));
                }
                Op::Delete { key, expected } => {
                    self.check_version(key, *expected).await?;
                    batch.delete(key.as_bytes());
                    changes.push((CommitKind::Delete, key.clone()));
                }
            }
        }

        self.db
            .write(batch)
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB write failed: {}", e))?;

        for (kind, key) in changes {
            self.events.emit(kind, key);
        }
        Ok(())
    }

    async fn check_version(&self, key: &str, expected: u64) -> Result<(), StoreError> {
        let found = self
            .load_envelope(key)
            .await?
            .map(|e| e.version)
            .unwrap_or(0);
        if found != expected {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Gracefully close the state store.
    pub async fn close(self) -> Result<(), StoreError> {
        info!("Closing SlateDB state store");
        self.db
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB close failed: {}", e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: i64,
    }

    async fn open_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn create_read_update_delete() {
        let (_dir, store) = open_store().await;

        let txn = Transaction::new()
            .put("/registry/test/a", 0, &Counter { value: 1 })
            .unwrap();
        store.commit(txn).await.unwrap();

        let (version, record): (u64, Counter) =
            store.load("/registry/test/a").await.unwrap().unwrap();
        assert_eq!(version, 1);
        assert_eq!(record, Counter { value: 1 });

        let txn = Transaction::new()
            .put("/registry/test/a", 1, &Counter { value: 2 })
            .unwrap();
        store.commit(txn).await.unwrap();
        let (version, record): (u64, Counter) =
            store.load("/registry/test/a").await.unwrap().unwrap();
        assert_eq!(version, 2);
        assert_eq!(record.value, 2);

        store
            .commit(Transaction::new().delete("/registry/test/a", 2))
            .await
            .unwrap();
        assert!(
            store
                .load::<Counter>("/registry/test/a")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn stale_version_guard_conflicts() {
        let (_dir, store) = open_store().await;

        let txn = Transaction::new()
            .put("/registry/test/a", 0, &Counter { value: 1 })
            .unwrap();
        store.commit(txn).await.unwrap();

        // Writer A read version 1, writer B commits first.
        let txn = Transaction::new()
            .put("/registry/test/a", 1, &Counter { value: 10 })
            .unwrap();
        store.commit(txn).await.unwrap();

        let stale = Transaction::new()
            .put("/registry/test/a", 1, &Counter { value: 20 })
            .unwrap();
        let err = store.commit(stale).await.unwrap_err();
        assert!(err.is_conflict());

        // The winner's write is intact.
        let (_, record): (u64, Counter) =
            store.load("/registry/test/a").await.unwrap().unwrap();
        assert_eq!(record.value, 10);
    }

    #[tokio::test]
    async fn failed_guard_rolls_back_whole_batch() {
        let (_dir, store) = open_store().await;

        let txn = Transaction::new()
            .put("/registry/test/a", 0, &Counter { value: 1 })
            .unwrap();
        store.commit(txn).await.unwrap();

        // Second op's guard is stale; the first op must not land either.
        let txn = Transaction::new()
            .put("/registry/test/b", 0, &Counter { value: 5 })
            .unwrap()
            .put("/registry/test/a", 7, &Counter { value: 5 })
            .unwrap();
        assert!(store.commit(txn).await.unwrap_err().is_conflict());

        assert!(
            store
                .load::<Counter>("/registry/test/b")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn readonly_precondition_is_enforced() {
        let (_dir, store) = open_store().await;

        let txn = Transaction::new()
            .put("/registry/test/a", 0, &Counter { value: 1 })
            .unwrap();
        store.commit(txn).await.unwrap();

        let txn = Transaction::new()
            .expect("/registry/test/a", 2)
            .put("/registry/test/b", 0, &Counter { value: 1 })
            .unwrap();
        assert!(store.commit(txn).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn commits_are_announced_on_the_event_log() {
        let (_dir, store) = open_store().await;
        let mut rx = store.events.subscribe();

        let txn = Transaction::new()
            .put("/registry/test/a", 0, &Counter { value: 1 })
            .unwrap()
            .delete("/registry/test/gone", 0);
        store.commit(txn).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, CommitKind::Put);
        assert_eq!(first.key, "/registry/test/a");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, CommitKind::Delete);
        assert_eq!(second.key, "/registry/test/gone");
    }

    #[tokio::test]
    async fn list_prefix_returns_versions() {
        let (_dir, store) = open_store().await;
        for (i, key) in ["/registry/test/a", "/registry/test/b"].iter().enumerate() {
            let txn = Transaction::new()
                .put(*key, 0, &Counter { value: i as i64 })
                .unwrap();
            store.commit(txn).await.unwrap();
        }

        let rows: Vec<(String, u64, Counter)> =
            store.list_prefix("/registry/test/").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(_, version, _)| *version == 1));
    }
}
