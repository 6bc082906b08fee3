use pst_store::{ObjectRecord, TableStore};
use pst_types::AccountName;

use crate::error::EngineResult;

/// Result of checking a store's objects against the record invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub objects_checked: u64,
    pub chunks_checked: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub name: AccountName,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// An index below `chunk_count` has no chunk.
    MissingChunk,
    /// A chunk is stored at or above `chunk_count`.
    ChunkPastTop,
    /// A stored chunk has no payload.
    EmptyChunk,
    /// A frozen object is not published.
    FrozenUnpublished,
}

/// Store integrity validator.
pub struct StoreValidator;

impl StoreValidator {
    /// Validate every object in the store.
    pub fn validate_store<S: TableStore + ?Sized>(store: &S) -> EngineResult<ValidationReport> {
        let mut report = ValidationReport {
            objects_checked: 0,
            chunks_checked: 0,
            violations: Vec::new(),
        };
        for (name, record) in store.list_objects()? {
            let chunks = Self::validate_object(store, &name, &record, &mut report.violations)?;
            report.objects_checked += 1;
            report.chunks_checked += chunks;
        }
        Ok(report)
    }

    /// Validate one object, appending what is wrong with it to
    /// `violations`. Returns the number of chunks examined.
    pub fn validate_object<S: TableStore + ?Sized>(
        store: &S,
        name: &AccountName,
        record: &ObjectRecord,
        violations: &mut Vec<Violation>,
    ) -> EngineResult<u64> {
        let mut report = |kind, description: String| {
            violations.push(Violation {
                name: *name,
                kind,
                description,
            })
        };

        if record.is_frozen() && !record.published {
            report(
                ViolationKind::FrozenUnpublished,
                "frozen object is not published".into(),
            );
        }

        let chunks = store.read_chunks(name)?;
        let mut expected = 0u64;
        for chunk in &chunks {
            if chunk.index >= record.chunk_count {
                report(
                    ViolationKind::ChunkPastTop,
                    format!(
                        "chunk {} stored past chunk count {}",
                        chunk.index, record.chunk_count
                    ),
                );
                continue;
            }
            if chunk.index > expected {
                report(
                    ViolationKind::MissingChunk,
                    format!("chunks {expected}..{} are missing", chunk.index),
                );
            }
            if chunk.is_empty() {
                report(
                    ViolationKind::EmptyChunk,
                    format!("chunk {} has no payload", chunk.index),
                );
            }
            expected = chunk.index + 1;
        }
        if expected < record.chunk_count {
            report(
                ViolationKind::MissingChunk,
                format!("chunks {expected}..{} are missing", record.chunk_count),
            );
        }

        Ok(chunks.len() as u64)
    }
}
