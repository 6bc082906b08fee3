//! Calls a host can submit to the engine.

use pst_types::AccountName;
use serde::{Deserialize, Serialize};

/// One store operation, named by the account acting and the object acted on.
///
/// Actions are plain data so a host can carry them over any encoding. In
/// JSON, chunk payloads are hex strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Claim an unused name.
    Create { owner: AccountName, name: AccountName },
    /// Drop every chunk and clear the published flag.
    Reset { owner: AccountName, name: AccountName },
    /// Remove the object and its chunks.
    Delete { owner: AccountName, name: AccountName },
    /// Set or clear the published flag.
    SetPublished {
        owner: AccountName,
        name: AccountName,
        published: bool,
    },
    /// Make a published object permanently immutable.
    Freeze { owner: AccountName, name: AccountName },
    /// Overwrite the chunk at `index`, or append when `index` is the top.
    WriteChunk {
        owner: AccountName,
        name: AccountName,
        index: u64,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
    /// Remove the highest chunk.
    PopChunk { owner: AccountName, name: AccountName },
}

impl Action {
    /// The account the call claims to act as.
    pub fn actor(&self) -> AccountName {
        match self {
            Action::Create { owner, .. }
            | Action::Reset { owner, .. }
            | Action::Delete { owner, .. }
            | Action::SetPublished { owner, .. }
            | Action::Freeze { owner, .. }
            | Action::WriteChunk { owner, .. }
            | Action::PopChunk { owner, .. } => *owner,
        }
    }

    /// The object the call targets.
    pub fn object(&self) -> AccountName {
        match self {
            Action::Create { name, .. }
            | Action::Reset { name, .. }
            | Action::Delete { name, .. }
            | Action::SetPublished { name, .. }
            | Action::Freeze { name, .. }
            | Action::WriteChunk { name, .. }
            | Action::PopChunk { name, .. } => *name,
        }
    }

    /// Short operation name for logs and output.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Reset { .. } => "reset",
            Action::Delete { .. } => "delete",
            Action::SetPublished { .. } => "set_published",
            Action::Freeze { .. } => "freeze",
            Action::WriteChunk { .. } => "write_chunk",
            Action::PopChunk { .. } => "pop_chunk",
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
