//! Keyed-table storage for PermaStore.
//!
//! Every claimed name is an independent scope holding one
//! [`ObjectRecord`] and an ordered run of [`ChunkRecord`]s. The store is the
//! ledger's storage substrate: it applies [`WriteBatch`]es atomically and
//! answers reads, and it never interprets the records it holds.
//!
//! # Storage Backends
//!
//! All backends implement the [`TableStore`] trait:
//!
//! - [`InMemoryTableStore`] -- `BTreeMap` tables for tests and embedding
//! - [`DurableTableStore`] -- in-memory tables rebuilt from a
//!   [`WriteAheadLog`] at open
//!
//! # Design Rules
//!
//! 1. One call, one batch: a batch is applied whole or not at all.
//! 2. Log-then-apply: the durable store appends to the log before memory
//!    changes.
//! 3. Recovery replays the intact prefix of the log and drops a torn tail.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod durable;
pub mod error;
pub mod memory;
pub mod records;
pub mod traits;
pub mod wal;

pub use durable::{CompactionStats, DurableTableStore, WAL_FILE_NAME};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryTableStore;
pub use records::{ChunkRecord, Holder, Mutation, ObjectRecord, WriteBatch};
pub use traits::TableStore;
pub use wal::{Recovery, SyncMode, WalConfig, WriteAheadLog};
