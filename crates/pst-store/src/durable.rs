use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard};

use pst_types::AccountName;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::Tables;
use crate::records::{ChunkRecord, ObjectRecord, WriteBatch};
use crate::traits::TableStore;
use crate::wal::{WalConfig, WriteAheadLog};

/// File name of the log inside a data directory.
pub const WAL_FILE_NAME: &str = "pstore.wal";

/// Table store that survives restarts.
///
/// Tables are held in memory and rebuilt at open by replaying the
/// write-ahead log. A commit appends the batch to the log before applying it
/// to memory, with the table write lock held across both steps.
pub struct DurableTableStore {
    tables: RwLock<Tables>,
    wal: WriteAheadLog,
}

impl DurableTableStore {
    /// Open the store in `dir`, creating it if needed.
    pub fn open(dir: &Path, config: WalConfig) -> StoreResult<Self> {
        let wal = WriteAheadLog::open(&dir.join(WAL_FILE_NAME), config)?;
        let recovery = wal.recover()?;

        let mut tables = Tables::default();
        for batch in &recovery.batches {
            tables.apply(batch);
        }
        if recovery.discarded_bytes > 0 {
            warn!(
                discarded = recovery.discarded_bytes,
                "dropping incomplete tail of the write-ahead log"
            );
            wal.truncate_to(recovery.valid_len)?;
        }
        info!(
            path = %wal.path().display(),
            batches = recovery.batches.len(),
            objects = tables.objects().len(),
            "opened durable store"
        );

        Ok(Self {
            tables: RwLock::new(tables),
            wal,
        })
    }

    /// Rewrite the log as one batch per live object.
    ///
    /// Superseded chunk versions and deleted objects stop taking space.
    pub fn compact(&self) -> StoreResult<CompactionStats> {
        let tables = self
            .tables
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let before = self.wal.offset()?;
        let batches = tables.to_batches();
        self.wal.rewrite(&batches)?;
        let stats = CompactionStats {
            bytes_before: before,
            bytes_after: self.wal.offset()?,
            batches: batches.len(),
        };
        info!(
            before = stats.bytes_before,
            after = stats.bytes_after,
            "compacted write-ahead log"
        );
        Ok(stats)
    }

    /// Total payload bytes across every chunk.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self.read_tables()?.chunk_bytes())
    }

    /// Path of the underlying log file.
    pub fn log_path(&self) -> &Path {
        self.wal.path()
    }

    fn read_tables(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

/// Log sizes around a compaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactionStats {
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub batches: usize,
}

impl TableStore for DurableTableStore {
    fn read_object(&self, scope: &AccountName) -> StoreResult<Option<ObjectRecord>> {
        Ok(self.read_tables()?.object(scope))
    }

    fn read_chunk(&self, scope: &AccountName, index: u64) -> StoreResult<Option<ChunkRecord>> {
        Ok(self.read_tables()?.chunk(scope, index))
    }

    fn read_chunks(&self, scope: &AccountName) -> StoreResult<Vec<ChunkRecord>> {
        Ok(self.read_tables()?.chunks(scope))
    }

    fn list_objects(&self) -> StoreResult<Vec<(AccountName, ObjectRecord)>> {
        Ok(self.read_tables()?.objects())
    }

    fn commit(&self, batch: &WriteBatch) -> StoreResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        self.wal.append(batch)?;
        tables.apply(batch);
        Ok(())
    }

    fn chunk_indices(&self, scope: &AccountName) -> StoreResult<Vec<u64>> {
        Ok(self.read_tables()?.chunk_indices(scope))
    }
}

impl std::fmt::Debug for DurableTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableTableStore")
            .field("log", &self.wal.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Holder, Mutation};
    use std::fs::OpenOptions;

    fn name(s: &str) -> AccountName {
        AccountName::parse(s).unwrap()
    }

    fn claim(scope: &str) -> WriteBatch {
        WriteBatch::new(
            name(scope),
            vec![Mutation::PutObject(ObjectRecord::claimed_by(name("alice")))],
        )
    }

    fn append(scope: &str, index: u64, data: &[u8]) -> WriteBatch {
        WriteBatch::new(
            name(scope),
            vec![
                Mutation::PutObject(ObjectRecord {
                    chunk_count: index + 1,
                    ..ObjectRecord::claimed_by(name("alice"))
                }),
                Mutation::PutChunk(ChunkRecord::new(index, data.to_vec())),
            ],
        )
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
            store.commit(&claim("files")).unwrap();
            store.commit(&append("files", 0, b"hello")).unwrap();
            store.commit(&append("files", 1, b"world")).unwrap();
        }

        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        let record = store.read_object(&name("files")).unwrap().unwrap();
        assert_eq!(record.chunk_count, 2);
        assert_eq!(record.holder, Holder::Owner(name("alice")));
        assert_eq!(store.read_chunk(&name("files"), 1).unwrap().unwrap().data, b"world");
        assert_eq!(store.total_bytes().unwrap(), 10);
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let good_len;
        {
            let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
            store.commit(&claim("files")).unwrap();
            good_len = store.wal.offset().unwrap();
            store.commit(&append("files", 0, b"lost")).unwrap();
        }
        let log = dir.path().join(WAL_FILE_NAME);
        let full_len = std::fs::metadata(&log).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&log)
            .unwrap()
            .set_len(full_len - 3)
            .unwrap();

        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        let record = store.read_object(&name("files")).unwrap().unwrap();
        assert_eq!(record.chunk_count, 0);
        assert!(store.read_chunks(&name("files")).unwrap().is_empty());
        assert_eq!(std::fs::metadata(&log).unwrap().len(), good_len);

        // New commits land right after the intact prefix.
        store.commit(&append("files", 0, b"kept")).unwrap();
        drop(store);
        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        assert_eq!(store.read_chunk(&name("files"), 0).unwrap().unwrap().data, b"kept");
    }

    #[test]
    fn failed_commit_is_not_replayed_after_later_commits() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
            store.commit(&claim("files")).unwrap();

            // Half an entry reached the file, the rest was still buffered.
            let lost = bincode::serialize(&append("files", 0, &[0xab; 4096])).unwrap();
            assert!(store.wal.interrupt_append(&lost[..20], &lost[20..]).is_err());

            store.commit(&claim("other")).unwrap();
        }

        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        assert!(store.read_chunks(&name("files")).unwrap().is_empty());
        assert_eq!(store.read_object(&name("files")).unwrap().unwrap().chunk_count, 0);
        assert!(store.read_object(&name("other")).unwrap().is_some());
        assert_eq!(
            std::fs::metadata(dir.path().join(WAL_FILE_NAME)).unwrap().len(),
            store.wal.offset().unwrap()
        );
    }

    #[test]
    fn compact_preserves_state_and_shrinks_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        store.commit(&claim("files")).unwrap();
        for round in 0..10u8 {
            store.commit(&append("files", 0, &[round; 64])).unwrap();
        }
        store.commit(&claim("gone")).unwrap();
        store
            .commit(&WriteBatch::new(name("gone"), vec![Mutation::DeleteObject]))
            .unwrap();

        let stats = store.compact().unwrap();
        assert!(stats.bytes_after < stats.bytes_before);
        assert_eq!(stats.batches, 1);

        drop(store);
        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        assert!(store.read_object(&name("gone")).unwrap().is_none());
        assert_eq!(
            store.read_chunk(&name("files"), 0).unwrap().unwrap().data,
            vec![9u8; 64]
        );
    }

    #[test]
    fn list_objects_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
            store.commit(&claim("beta")).unwrap();
            store.commit(&claim("alpha")).unwrap();
        }
        let store = DurableTableStore::open(dir.path(), WalConfig::default()).unwrap();
        let names: Vec<String> = store
            .list_objects()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }
}
