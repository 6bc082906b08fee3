//! Error types for namespace arbitration.

use pst_types::AccountName;
use thiserror::Error;

/// Failures of the reservation registry itself.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// I/O error while reading or writing a registry file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry contents could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding the registry was poisoned by a panic.
    #[error("registry lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Why a claim was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClaimDenial {
    /// The suffix is still under auction.
    #[error("suffix {suffix} is still under auction")]
    AuctionOpen { suffix: AccountName },

    /// The auction closed and someone else won it.
    #[error("suffix {suffix} is owned by {high_bidder}")]
    NotHighBidder {
        suffix: AccountName,
        high_bidder: AccountName,
    },

    /// The suffix was never auctioned; only the same-named account may use it.
    #[error("only {suffix} may claim names ending in .{suffix}")]
    NotSuffixAccount { suffix: AccountName },
}

/// Errors from a claim decision.
#[derive(Debug, Error)]
pub enum ArbitrationError {
    /// The claimant may not claim the name.
    #[error("{claimant} may not claim {name}: {denial}")]
    Denied {
        name: AccountName,
        claimant: AccountName,
        denial: ClaimDenial,
    },

    /// The registry could not be consulted.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Convenience alias for registry reads.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Convenience alias for claim decisions.
pub type Result<T> = std::result::Result<T, ArbitrationError>;
