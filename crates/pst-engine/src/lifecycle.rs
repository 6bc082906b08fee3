//! Object state transitions.
//!
//! [`plan`] maps the current record and an action to the record that
//! results and the mutations that produce it. It reads nothing and writes
//! nothing; the engine commits the mutations as one batch.
//!
//! ```text
//! Absent --create--> Open <--set_published--> Published --freeze--> Frozen
//!
//! write_chunk, pop_chunk and reset return a Published object to Open.
//! delete returns Open or Published to Absent. Frozen is terminal.
//! ```

use pst_store::{ChunkRecord, Holder, Mutation, ObjectRecord};
use pst_types::AccountName;

use crate::action::Action;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// The outcome of a permitted action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// The object record after the action, `None` once deleted.
    pub record: Option<ObjectRecord>,
    /// Mutations that take the stored state from before to after.
    pub mutations: Vec<Mutation>,
}

impl Transition {
    fn put(record: ObjectRecord, mut extra: Vec<Mutation>) -> Self {
        let mut mutations = vec![Mutation::PutObject(record)];
        mutations.append(&mut extra);
        Self {
            record: Some(record),
            mutations,
        }
    }
}

/// Reject chunk payloads that can never be written, regardless of state.
pub fn validate_payload(action: &Action, config: &EngineConfig) -> EngineResult<()> {
    let Action::WriteChunk { data, .. } = action else {
        return Ok(());
    };
    if data.is_empty() {
        return Err(EngineError::EmptyChunk);
    }
    match config.max_chunk_bytes {
        Some(max) if data.len() > max => Err(EngineError::ChunkTooLarge {
            size: data.len(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Compute the transition `action` makes from `current`.
///
/// Authentication and namespace arbitration are the caller's concern; this
/// checks existence, ownership and the chunk and publication rules.
pub fn plan(
    current: Option<ObjectRecord>,
    action: &Action,
    config: &EngineConfig,
) -> EngineResult<Transition> {
    validate_payload(action, config)?;

    let name = action.object();
    match action {
        Action::Create { owner, .. } => match current {
            Some(_) => Err(EngineError::AlreadyExists { name }),
            None => Ok(Transition::put(ObjectRecord::claimed_by(*owner), vec![])),
        },
        _ => {
            let record = owned(current, &name, &action.actor())?;
            apply(record, action)
        }
    }
}

fn apply(mut record: ObjectRecord, action: &Action) -> EngineResult<Transition> {
    let name = action.object();
    let transition = match action {
        Action::Create { .. } => return Err(EngineError::AlreadyExists { name }),
        Action::Reset { .. } => {
            record.chunk_count = 0;
            record.published = false;
            Transition::put(record, vec![Mutation::ClearChunks])
        }
        Action::Delete { .. } => Transition {
            record: None,
            mutations: vec![Mutation::DeleteObject, Mutation::ClearChunks],
        },
        Action::SetPublished { published, .. } => {
            record.published = *published;
            Transition::put(record, vec![])
        }
        Action::Freeze { .. } => {
            if !record.published {
                return Err(EngineError::NotPublished { name });
            }
            record.holder = Holder::Frozen;
            Transition::put(record, vec![])
        }
        Action::WriteChunk { index, data, .. } => {
            let index = *index;
            let past_top = EngineError::IndexPastTop {
                name,
                index,
                top: record.chunk_count,
            };
            if index > record.chunk_count {
                return Err(past_top);
            }
            if index == record.chunk_count {
                record.chunk_count = record.chunk_count.checked_add(1).ok_or(past_top)?;
            }
            record.published = false;
            Transition::put(
                record,
                vec![Mutation::PutChunk(ChunkRecord::new(index, data.clone()))],
            )
        }
        Action::PopChunk { .. } => {
            let top = record
                .top_index()
                .ok_or(EngineError::EmptyObject { name })?;
            record.chunk_count = top;
            record.published = false;
            Transition::put(record, vec![Mutation::DeleteChunk(top)])
        }
    };
    Ok(transition)
}

/// The record, provided it exists and `caller` owns it.
///
/// A frozen record has no owner, so every caller is refused.
fn owned(
    current: Option<ObjectRecord>,
    name: &AccountName,
    caller: &AccountName,
) -> EngineResult<ObjectRecord> {
    let record = current.ok_or(EngineError::NotFound { name: *name })?;
    if !record.holder.is_owned_by(caller) {
        return Err(EngineError::NotOwner {
            name: *name,
            caller: *caller,
        });
    }
    Ok(record)
}
