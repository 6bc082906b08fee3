use std::sync::Mutex;

use pst_arbiter::{check_claim, ReservationRegistry};
use pst_store::{ChunkRecord, ObjectRecord, StoreError, TableStore, WriteBatch};
use pst_types::AccountName;
use tracing::{debug, info};

use crate::action::Action;
use crate::auth::Authenticator;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::{plan, validate_payload};

/// The object store: lifecycle rules over a table store, with names
/// arbitrated against a reservation registry.
///
/// Calls are serialized so that reading the current record, planning the
/// transition and committing it never interleave with another call.
pub struct PermaStore<S, R> {
    store: S,
    registry: R,
    config: EngineConfig,
    txn: Mutex<()>,
}

impl<S: TableStore, R: ReservationRegistry> PermaStore<S, R> {
    pub fn new(store: S, registry: R) -> Self {
        Self::with_config(store, registry, EngineConfig::default())
    }

    pub fn with_config(store: S, registry: R, config: EngineConfig) -> Self {
        Self {
            store,
            registry,
            config,
            txn: Mutex::new(()),
        }
    }

    /// Run one action on behalf of the call authorized by `auth`.
    ///
    /// Returns the object record after the action, `None` after a delete.
    /// On error nothing is written.
    pub fn execute(
        &self,
        auth: &dyn Authenticator,
        action: Action,
    ) -> EngineResult<Option<ObjectRecord>> {
        let result = self.execute_inner(auth, &action);
        if let Err(err) = &result {
            debug!(
                action = action.label(),
                name = %action.object(),
                actor = %action.actor(),
                error = %err,
                "action rejected"
            );
        }
        result
    }

    fn execute_inner(
        &self,
        auth: &dyn Authenticator,
        action: &Action,
    ) -> EngineResult<Option<ObjectRecord>> {
        validate_payload(action, &self.config)?;
        auth.require_auth(&action.actor())?;

        let _txn = self
            .txn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        let name = action.object();
        let current = self.store.read_object(&name)?;
        if let Action::Create { owner, .. } = action {
            if current.is_some() {
                return Err(EngineError::AlreadyExists { name });
            }
            check_claim(&name, owner, &self.registry)?;
        }

        let transition = plan(current, action, &self.config)?;
        self.store
            .commit(&WriteBatch::new(name, transition.mutations))?;

        match &transition.record {
            Some(record) => info!(
                action = action.label(),
                %name,
                holder = %record.holder,
                chunks = record.chunk_count,
                published = record.published,
                "action committed"
            ),
            None => info!(action = action.label(), %name, "action committed"),
        }
        Ok(transition.record)
    }

    pub fn create(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
    ) -> EngineResult<ObjectRecord> {
        self.execute_expecting_record(auth, Action::Create { owner, name })
    }

    pub fn reset(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
    ) -> EngineResult<ObjectRecord> {
        self.execute_expecting_record(auth, Action::Reset { owner, name })
    }

    pub fn delete(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
    ) -> EngineResult<()> {
        self.execute(auth, Action::Delete { owner, name }).map(|_| ())
    }

    pub fn set_published(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
        published: bool,
    ) -> EngineResult<ObjectRecord> {
        self.execute_expecting_record(
            auth,
            Action::SetPublished {
                owner,
                name,
                published,
            },
        )
    }

    pub fn freeze(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
    ) -> EngineResult<ObjectRecord> {
        self.execute_expecting_record(auth, Action::Freeze { owner, name })
    }

    pub fn write_chunk(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
        index: u64,
        data: Vec<u8>,
    ) -> EngineResult<ObjectRecord> {
        self.execute_expecting_record(
            auth,
            Action::WriteChunk {
                owner,
                name,
                index,
                data,
            },
        )
    }

    pub fn pop_chunk(
        &self,
        auth: &dyn Authenticator,
        owner: AccountName,
        name: AccountName,
    ) -> EngineResult<ObjectRecord> {
        self.execute_expecting_record(auth, Action::PopChunk { owner, name })
    }

    fn execute_expecting_record(
        &self,
        auth: &dyn Authenticator,
        action: Action,
    ) -> EngineResult<ObjectRecord> {
        let name = action.object();
        self.execute(auth, action)?
            .ok_or(EngineError::NotFound { name })
    }

    // -- Queries --------------------------------------------------------------

    pub fn object(&self, name: &AccountName) -> EngineResult<Option<ObjectRecord>> {
        Ok(self.store.read_object(name)?)
    }

    pub fn chunk(&self, name: &AccountName, index: u64) -> EngineResult<Option<ChunkRecord>> {
        Ok(self.store.read_chunk(name, index)?)
    }

    /// All chunks of `name` in index order.
    pub fn chunks(&self, name: &AccountName) -> EngineResult<Vec<ChunkRecord>> {
        Ok(self.store.read_chunks(name)?)
    }

    /// Every object in name order.
    pub fn objects(&self) -> EngineResult<Vec<(AccountName, ObjectRecord)>> {
        Ok(self.store.list_objects()?)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
