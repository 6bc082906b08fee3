//! Namespace arbitration for PermaStore.
//!
//! Decides, once per claim, whether an account may take a name. Names with
//! a visible delimiter defer to the reservation registry's record of who
//! owns their suffix; all other names are first-come, first-served.
//!
//! The arbiter is stateless and read-only: [`check_claim`] is a pure
//! function of the name, the claimant, and a [`ReservationRegistry`] lookup.
//!
//! # Modules
//!
//! - [`error`] -- [`ArbitrationError`], [`ClaimDenial`], [`RegistryError`]
//! - [`registry`] -- the [`ReservationRegistry`] boundary and
//!   [`InMemoryRegistry`]
//! - [`arbiter`] -- [`claim_rule`] and [`check_claim`]

pub mod arbiter;
pub mod error;
pub mod registry;

pub use arbiter::{check_claim, claim_rule, ClaimRule};
pub use error::{ArbitrationError, ClaimDenial, RegistryError, RegistryResult, Result};
pub use registry::{InMemoryRegistry, NameBid, ReservationRegistry};
