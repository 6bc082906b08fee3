use pst_arbiter::{ArbitrationError, ClaimDenial, RegistryError};
use pst_store::StoreError;
use pst_types::AccountName;

/// Errors produced by object lifecycle operations.
///
/// Every error aborts the whole call: nothing it would have written is
/// committed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("missing authority of {account}")]
    MissingAuthority { account: AccountName },

    #[error("object {name} already exists")]
    AlreadyExists { name: AccountName },

    #[error("{claimant} may not claim {name}: {denial}")]
    NamespaceNotAuthorized {
        name: AccountName,
        claimant: AccountName,
        denial: ClaimDenial,
    },

    #[error("object {name} does not exist")]
    NotFound { name: AccountName },

    #[error("{caller} is not the owner of {name}")]
    NotOwner {
        name: AccountName,
        caller: AccountName,
    },

    #[error("chunk data is empty")]
    EmptyChunk,

    #[error("chunk of {size} bytes exceeds the {max}-byte limit")]
    ChunkTooLarge { size: usize, max: usize },

    #[error("chunk index {index} is past the top of {name} ({top})")]
    IndexPastTop {
        name: AccountName,
        index: u64,
        top: u64,
    },

    #[error("object {name} is not published")]
    NotPublished { name: AccountName },

    #[error("object {name} has no chunks")]
    EmptyObject { name: AccountName },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Flat failure category of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingAuthority,
    AlreadyExists,
    NamespaceNotAuthorized,
    NotFound,
    NotOwner,
    EmptyChunk,
    ChunkTooLarge,
    IndexPastTop,
    NotPublished,
    EmptyObject,
    Store,
    Registry,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAuthority { .. } => ErrorKind::MissingAuthority,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NamespaceNotAuthorized { .. } => ErrorKind::NamespaceNotAuthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotOwner { .. } => ErrorKind::NotOwner,
            Self::EmptyChunk => ErrorKind::EmptyChunk,
            Self::ChunkTooLarge { .. } => ErrorKind::ChunkTooLarge,
            Self::IndexPastTop { .. } => ErrorKind::IndexPastTop,
            Self::NotPublished { .. } => ErrorKind::NotPublished,
            Self::EmptyObject { .. } => ErrorKind::EmptyObject,
            Self::Store(_) => ErrorKind::Store,
            Self::Registry(_) => ErrorKind::Registry,
        }
    }

    /// Returns `true` for rejections caused by the call itself, as opposed
    /// to a failing collaborator.
    pub fn is_rejection(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Store | ErrorKind::Registry)
    }
}

impl From<ArbitrationError> for EngineError {
    fn from(err: ArbitrationError) -> Self {
        match err {
            ArbitrationError::Denied {
                name,
                claimant,
                denial,
            } => Self::NamespaceNotAuthorized {
                name,
                claimant,
                denial,
            },
            ArbitrationError::Registry(e) => Self::Registry(e),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
