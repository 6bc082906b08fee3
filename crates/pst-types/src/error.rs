use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid character {character:?} in name {name:?}")]
    InvalidNameCharacter { name: String, character: char },

    #[error("name {name:?} is longer than {max} symbols")]
    NameTooLong { name: String, max: usize },

    #[error("13th symbol {character:?} of name {name:?} must be one of .12345abcdefghij")]
    InvalidThirteenthSymbol { name: String, character: char },

    #[error("name {name:?} is not normalized (expected {normalized:?})")]
    NameNotNormalized { name: String, normalized: String },
}
