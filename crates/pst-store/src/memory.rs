use std::collections::BTreeMap;
use std::sync::RwLock;

use pst_types::AccountName;

use crate::error::{StoreError, StoreResult};
use crate::records::{ChunkRecord, Mutation, ObjectRecord, WriteBatch};
use crate::traits::TableStore;

/// Ordered in-memory tables shared by the in-memory and durable stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tables {
    objects: BTreeMap<AccountName, ObjectRecord>,
    chunks: BTreeMap<AccountName, BTreeMap<u64, Vec<u8>>>,
}

impl Tables {
    /// Apply a batch. Infallible, so a batch is never half-applied.
    pub(crate) fn apply(&mut self, batch: &WriteBatch) {
        let scope = batch.scope;
        for mutation in &batch.mutations {
            match mutation {
                Mutation::PutObject(record) => {
                    self.objects.insert(scope, *record);
                }
                Mutation::DeleteObject => {
                    self.objects.remove(&scope);
                }
                Mutation::PutChunk(chunk) => {
                    self.chunks
                        .entry(scope)
                        .or_default()
                        .insert(chunk.index, chunk.data.clone());
                }
                Mutation::DeleteChunk(index) => {
                    if let Some(run) = self.chunks.get_mut(&scope) {
                        run.remove(index);
                        if run.is_empty() {
                            self.chunks.remove(&scope);
                        }
                    }
                }
                Mutation::ClearChunks => {
                    self.chunks.remove(&scope);
                }
            }
        }
    }

    pub(crate) fn object(&self, scope: &AccountName) -> Option<ObjectRecord> {
        self.objects.get(scope).copied()
    }

    pub(crate) fn chunk(&self, scope: &AccountName, index: u64) -> Option<ChunkRecord> {
        self.chunks
            .get(scope)
            .and_then(|run| run.get(&index))
            .map(|data| ChunkRecord::new(index, data.clone()))
    }

    pub(crate) fn chunks(&self, scope: &AccountName) -> Vec<ChunkRecord> {
        self.chunks
            .get(scope)
            .map(|run| {
                run.iter()
                    .map(|(index, data)| ChunkRecord::new(*index, data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn chunk_indices(&self, scope: &AccountName) -> Vec<u64> {
        self.chunks
            .get(scope)
            .map(|run| run.keys().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn objects(&self) -> Vec<(AccountName, ObjectRecord)> {
        self.objects
            .iter()
            .map(|(name, record)| (*name, *record))
            .collect()
    }

    /// One batch per live scope that rebuilds these tables from empty.
    pub(crate) fn to_batches(&self) -> Vec<WriteBatch> {
        let mut scopes: Vec<AccountName> = self.objects.keys().copied().collect();
        scopes.extend(self.chunks.keys().copied());
        scopes.sort();
        scopes.dedup();

        scopes
            .into_iter()
            .map(|scope| {
                let mut mutations = Vec::new();
                if let Some(record) = self.object(&scope) {
                    mutations.push(Mutation::PutObject(record));
                }
                mutations.extend(self.chunks(&scope).into_iter().map(Mutation::PutChunk));
                WriteBatch::new(scope, mutations)
            })
            .collect()
    }

    pub(crate) fn chunk_bytes(&self) -> u64 {
        self.chunks
            .values()
            .flat_map(|run| run.values())
            .map(|data| data.len() as u64)
            .sum()
    }
}

/// In-memory, `BTreeMap`-based table store.
///
/// Intended for tests and embedding. Tables live behind a `RwLock`; a commit
/// holds the write lock for the whole batch, so readers see either none or
/// all of it.
pub struct InMemoryTableStore {
    tables: RwLock<Tables>,
}

impl InMemoryTableStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of object records currently stored.
    pub fn object_count(&self) -> StoreResult<usize> {
        Ok(self.read_tables()?.objects.len())
    }

    /// Total payload bytes across every chunk.
    pub fn total_bytes(&self) -> StoreResult<u64> {
        Ok(self.read_tables()?.chunk_bytes())
    }

    fn read_tables(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore for InMemoryTableStore {
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
        tables.apply(batch);
        Ok(())
    }

    fn chunk_indices(&self, scope: &AccountName) -> StoreResult<Vec<u64>> {
        Ok(self.read_tables()?.chunk_indices(scope))
    }
}

impl std::fmt::Debug for InMemoryTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.object_count().unwrap_or_default();
        f.debug_struct("InMemoryTableStore")
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Holder;

    fn name(s: &str) -> AccountName {
        AccountName::parse(s).unwrap()
    }

    fn put_object(scope: &str, chunk_count: u64) -> WriteBatch {
        let mut record = ObjectRecord::claimed_by(name("alice"));
        record.chunk_count = chunk_count;
        WriteBatch::new(name(scope), vec![Mutation::PutObject(record)])
    }

    fn put_chunk(scope: &str, index: u64, data: &[u8]) -> WriteBatch {
        WriteBatch::new(
            name(scope),
            vec![Mutation::PutChunk(ChunkRecord::new(index, data.to_vec()))],
        )
    }

    // -----------------------------------------------------------------------
    // Object records
    // -----------------------------------------------------------------------

    #[test]
    fn read_missing_object_returns_none() {
        let store = InMemoryTableStore::new();
        assert!(store.read_object(&name("nothing")).unwrap().is_none());
    }

    #[test]
    fn put_and_read_object() {
        let store = InMemoryTableStore::new();
        store.commit(&put_object("files", 0)).unwrap();

        let record = store.read_object(&name("files")).unwrap().unwrap();
        assert_eq!(record.holder, Holder::Owner(name("alice")));
        assert_eq!(store.object_count().unwrap(), 1);
    }

    #[test]
    fn delete_object() {
        let store = InMemoryTableStore::new();
        store.commit(&put_object("files", 0)).unwrap();
        store
            .commit(&WriteBatch::new(name("files"), vec![Mutation::DeleteObject]))
            .unwrap();
        assert!(store.read_object(&name("files")).unwrap().is_none());
    }

    #[test]
    fn list_objects_is_ordered() {
        let store = InMemoryTableStore::new();
        store.commit(&put_object("zeta", 0)).unwrap();
        store.commit(&put_object("alpha", 0)).unwrap();
        store.commit(&put_object("mid", 0)).unwrap();

        let names: Vec<String> = store
            .list_objects()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    // -----------------------------------------------------------------------
    // Chunks
    // -----------------------------------------------------------------------

    #[test]
    fn put_chunk_upserts() {
        let store = InMemoryTableStore::new();
        store.commit(&put_chunk("files", 0, b"one")).unwrap();
        store.commit(&put_chunk("files", 0, b"uno")).unwrap();

        let chunk = store.read_chunk(&name("files"), 0).unwrap().unwrap();
        assert_eq!(chunk.data, b"uno");
        assert_eq!(store.chunk_indices(&name("files")).unwrap(), vec![0]);
    }

    #[test]
    fn chunks_are_scoped_by_name() {
        let store = InMemoryTableStore::new();
        store.commit(&put_chunk("left", 0, b"l")).unwrap();
        store.commit(&put_chunk("right", 0, b"r")).unwrap();

        assert_eq!(store.read_chunks(&name("left")).unwrap()[0].data, b"l");
        assert_eq!(store.read_chunks(&name("right")).unwrap()[0].data, b"r");
    }

    #[test]
    fn read_chunks_in_index_order() {
        let store = InMemoryTableStore::new();
        for index in [2, 0, 1] {
            store.commit(&put_chunk("files", index, b"x")).unwrap();
        }
        assert_eq!(store.chunk_indices(&name("files")).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn delete_chunk_removes_only_that_index() {
        let store = InMemoryTableStore::new();
        store.commit(&put_chunk("files", 0, b"a")).unwrap();
        store.commit(&put_chunk("files", 1, b"b")).unwrap();
        store
            .commit(&WriteBatch::new(name("files"), vec![Mutation::DeleteChunk(1)]))
            .unwrap();

        assert_eq!(store.chunk_indices(&name("files")).unwrap(), vec![0]);
        assert!(store.read_chunk(&name("files"), 1).unwrap().is_none());
    }

    #[test]
    fn clear_chunks_empties_scope() {
        let store = InMemoryTableStore::new();
        store.commit(&put_chunk("files", 0, b"a")).unwrap();
        store.commit(&put_chunk("files", 1, b"b")).unwrap();
        store.commit(&put_chunk("other", 0, b"c")).unwrap();
        store
            .commit(&WriteBatch::new(name("files"), vec![Mutation::ClearChunks]))
            .unwrap();

        assert!(store.read_chunks(&name("files")).unwrap().is_empty());
        assert_eq!(store.read_chunks(&name("other")).unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[test]
    fn batch_applies_in_order() {
        let store = InMemoryTableStore::new();
        let batch = WriteBatch::new(
            name("files"),
            vec![
                Mutation::PutChunk(ChunkRecord::new(0, b"first".to_vec())),
                Mutation::ClearChunks,
                Mutation::PutChunk(ChunkRecord::new(0, b"second".to_vec())),
            ],
        );
        store.commit(&batch).unwrap();

        let chunks = store.read_chunks(&name("files")).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].data, b"second");
    }

    #[test]
    fn to_batches_rebuilds_tables() {
        let mut tables = Tables::default();
        tables.apply(&put_object("files", 2));
        tables.apply(&put_chunk("files", 0, b"a"));
        tables.apply(&put_chunk("files", 1, b"b"));
        tables.apply(&put_object("empty", 0));

        let mut rebuilt = Tables::default();
        for batch in tables.to_batches() {
            rebuilt.apply(&batch);
        }
        assert_eq!(rebuilt, tables);
    }

    #[test]
    fn total_bytes_counts_payloads() {
        let store = InMemoryTableStore::new();
        store.commit(&put_chunk("files", 0, b"12345")).unwrap();
        store.commit(&put_chunk("files", 1, b"123456789")).unwrap();
        assert_eq!(store.total_bytes().unwrap(), 14);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryTableStore::new());
        store.commit(&put_object("shared", 1)).unwrap();
        store.commit(&put_chunk("shared", 0, b"data")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let record = store.read_object(&name("shared")).unwrap().unwrap();
                    assert_eq!(record.chunk_count, 1);
                    assert_eq!(store.read_chunks(&name("shared")).unwrap().len(), 1);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryTableStore::new();
        store.commit(&put_object("files", 0)).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryTableStore"));
        assert!(debug.contains("object_count"));
    }
}
