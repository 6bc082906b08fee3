//! Persisted record types and the write batches that mutate them.
//!
//! Each object name is its own scope holding one [`ObjectRecord`] and an
//! ordered run of [`ChunkRecord`]s. Every successful call produces exactly
//! one [`WriteBatch`], which the store applies all-or-nothing.

use serde::{Deserialize, Serialize};
use pst_types::AccountName;

/// Who controls an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    /// The account that claimed the object and may mutate it.
    Owner(AccountName),
    /// Terminal: no account can ever mutate the object again.
    Frozen,
}

impl Holder {
    /// The owning account, or `None` once frozen.
    pub fn owner(&self) -> Option<AccountName> {
        match self {
            Holder::Owner(account) => Some(*account),
            Holder::Frozen => None,
        }
    }

    /// Returns `true` if `account` currently controls the object.
    pub fn is_owned_by(&self, account: &AccountName) -> bool {
        self.owner().as_ref() == Some(account)
    }

    /// Returns `true` for the terminal frozen state.
    pub fn is_frozen(&self) -> bool {
        matches!(self, Holder::Frozen)
    }
}

impl std::fmt::Display for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Holder::Owner(account) => write!(f, "{account}"),
            Holder::Frozen => write!(f, "(frozen)"),
        }
    }
}

/// The singleton record of an object scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Current controller of the object.
    pub holder: Holder,
    /// Number of contiguous chunks; also the next unused chunk index.
    pub chunk_count: u64,
    /// Whether the current content is a stable, complete checkpoint.
    pub published: bool,
}

impl ObjectRecord {
    /// A freshly claimed, empty, unpublished object.
    pub fn claimed_by(owner: AccountName) -> Self {
        Self {
            holder: Holder::Owner(owner),
            chunk_count: 0,
            published: false,
        }
    }

    /// Index of the highest stored chunk, if any.
    pub fn top_index(&self) -> Option<u64> {
        self.chunk_count.checked_sub(1)
    }

    pub fn is_frozen(&self) -> bool {
        self.holder.is_frozen()
    }
}

/// One binary segment of an object, addressed by its position.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: u64,
    pub data: Vec<u8>,
}

impl ChunkRecord {
    pub fn new(index: u64, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// BLAKE3 hash of the payload.
    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(&self.data).as_bytes()
    }

    /// Hex-encoded payload digest.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl std::fmt::Debug for ChunkRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRecord")
            .field("index", &self.index)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A single record mutation within one object scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert or replace the object record.
    PutObject(ObjectRecord),
    /// Remove the object record.
    DeleteObject,
    /// Insert or replace the chunk at `ChunkRecord::index`.
    PutChunk(ChunkRecord),
    /// Remove the chunk at the given index.
    DeleteChunk(u64),
    /// Remove every chunk in the scope.
    ClearChunks,
}

/// All mutations produced by one call, applied atomically to one scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub scope: AccountName,
    pub mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new(scope: AccountName, mutations: Vec<Mutation>) -> Self {
        Self { scope, mutations }
    }
}
