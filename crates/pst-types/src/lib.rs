//! Foundation types for PermaStore.
//!
//! Every other PermaStore crate depends on `pst-types`. The only shared
//! vocabulary is the ledger's 64-bit name: accounts that sign calls and the
//! objects they claim are both [`AccountName`]s, drawn from one global
//! namespace.

pub mod error;
pub mod name;

pub use error::TypeError;
pub use name::{AccountName, MAX_NAME_LEN};
