use pst_types::AccountName;

use crate::error::StoreResult;
use crate::records::{ChunkRecord, ObjectRecord, WriteBatch};

/// Keyed-table storage for object scopes.
///
/// All implementations must satisfy these invariants:
/// - `commit` applies every mutation of a batch or none of them.
/// - A committed batch is visible to every subsequent read.
/// - Reads never observe a partially applied batch.
/// - The store never interprets records; lifecycle rules live in the engine.
pub trait TableStore: Send + Sync {
    /// Read the object record of a scope.
    ///
    /// Returns `Ok(None)` if the name is unclaimed.
    fn read_object(&self, scope: &AccountName) -> StoreResult<Option<ObjectRecord>>;

    /// Read one chunk of a scope.
    fn read_chunk(&self, scope: &AccountName, index: u64) -> StoreResult<Option<ChunkRecord>>;

    /// Read every chunk of a scope in index order.
    fn read_chunks(&self, scope: &AccountName) -> StoreResult<Vec<ChunkRecord>>;

    /// List every object record in name order.
    fn list_objects(&self) -> StoreResult<Vec<(AccountName, ObjectRecord)>>;

    /// Apply a write batch atomically.
    fn commit(&self, batch: &WriteBatch) -> StoreResult<()>;

    /// Indices of the stored chunks of a scope, ascending.
    ///
    /// Default implementation reads every chunk. Backends may override to
    /// avoid copying payloads.
    fn chunk_indices(&self, scope: &AccountName) -> StoreResult<Vec<u64>> {
        Ok(self
            .read_chunks(scope)?
            .into_iter()
            .map(|chunk| chunk.index)
            .collect())
    }
}
