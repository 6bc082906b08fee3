//! Object lifecycle engine for PermaStore.
//!
//! [`PermaStore`] owns every claimed name's [`ObjectRecord`] and chunk run.
//! Each call is authenticated, checked against the current record, planned
//! as a pure [`Transition`] and committed to the table store as one batch.
//!
//! # Lifecycle
//!
//! - `create` claims an absent name, subject to namespace arbitration
//! - `write_chunk` overwrites a chunk or appends at the top
//! - `pop_chunk` removes the top chunk
//! - `set_published` marks the content complete; any content change clears it
//! - `freeze` makes a published object permanent
//! - `reset` and `delete` drop the chunks, and `delete` frees the name
//!
//! Only the owner may mutate an object. A frozen object has no owner.
//!
//! [`ObjectRecord`]: pst_store::ObjectRecord

pub mod action;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod validation;

pub use action::Action;
pub use auth::{Authenticator, Signers, TrustAll};
pub use config::EngineConfig;
pub use engine::PermaStore;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use lifecycle::{plan, Transition};
pub use validation::{StoreValidator, ValidationReport, Violation, ViolationKind};
