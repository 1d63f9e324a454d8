//! # In-Memory Object Store
//!
//! Volatile store used for tests and metamodel-only deployments. Rows live
//! in a `BTreeMap`; recognition is by instance address, exactly like the
//! unit of work's identity map.

use crate::class_model::{DomainObject, SharedObject};
use crate::loader::SpecificationLoader;
use crate::managed::{ManagedObject, ManagedObjectState};
use crate::oid::Oid;
use crate::ports::PersistenceBridge;
use crate::storage::{ObjectStore, persistent_oid_of};
use crate::types::{MetamodelError, PropertyMap, SpecId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

fn instance_key(pojo: &dyn DomainObject) -> usize {
    std::ptr::from_ref(pojo).cast::<()>() as usize
}

#[derive(Debug, Default)]
struct MemState {
    /// (spec id, identifier) -> instance snapshot.
    rows: BTreeMap<(String, String), PropertyMap>,
    /// Destroyed identifiers; kept so their state reports `Removed`.
    tombstones: BTreeSet<(String, String)>,
    /// Instance address -> assigned identifier.
    recognized: BTreeMap<usize, (String, String)>,
    /// Monotonic identifier source.
    next_identifier: u64,
}

/// In-memory object store.
#[derive(Debug)]
pub struct MemStore {
    loader: Arc<SpecificationLoader>,
    state: Mutex<MemState>,
}

impl MemStore {
    /// Create an empty store resolving classes through the given loader.
    #[must_use]
    pub fn new(loader: Arc<SpecificationLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(MemState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistenceBridge for MemStore {
    fn is_recognized(&self, pojo: &dyn DomainObject) -> bool {
        self.lock().recognized.contains_key(&instance_key(pojo))
    }

    fn identifier_for(&self, pojo: &dyn DomainObject) -> Option<String> {
        self.lock()
            .recognized
            .get(&instance_key(pojo))
            .map(|(_, identifier)| identifier.clone())
    }

    fn fetch_by_oid(&self, oid: &Oid) -> Result<Option<SharedObject>, MetamodelError> {
        let Some(identifier) = oid.identifier() else {
            return Ok(None); // transient identities name nothing in storage
        };
        let key = (oid.spec_id().as_str().to_string(), identifier.to_string());

        let snapshot = {
            let state = self.lock();
            match state.rows.get(&key) {
                Some(snapshot) => snapshot.clone(),
                None => return Ok(None),
            }
        };

        let model = self
            .loader
            .registry()
            .get(oid.spec_id())
            .ok_or_else(|| MetamodelError::UnknownClass(oid.spec_id().clone()))?;
        let restore = model
            .restore_hook()
            .ok_or_else(|| MetamodelError::NotRestorable(oid.spec_id().clone()))?;

        let pojo = restore(&snapshot);
        self.lock()
            .recognized
            .insert(instance_key(pojo.as_ref()), key);
        Ok(Some(pojo))
    }

    fn state_of(&self, pojo: &dyn DomainObject) -> ManagedObjectState {
        let state = self.lock();
        match state.recognized.get(&instance_key(pojo)) {
            Some(key) if state.tombstones.contains(key) => ManagedObjectState::Removed,
            Some(_) => ManagedObjectState::Persistent,
            None => ManagedObjectState::Transient,
        }
    }
}

impl ObjectStore for MemStore {
    fn make_persistent(&self, managed: &ManagedObject) -> Result<Oid, MetamodelError> {
        if !managed
            .state()
            .can_transition_to(ManagedObjectState::Persistent)
        {
            return Err(MetamodelError::IllegalTransition {
                from: managed.state(),
                to: ManagedObjectState::Persistent,
            });
        }

        let spec_id: SpecId = managed.specification().spec_id().clone();
        let pojo = managed.pojo();

        let identifier = {
            let mut state = self.lock();
            state.next_identifier += 1;
            let identifier = state.next_identifier.to_string();
            let key = (spec_id.as_str().to_string(), identifier.clone());
            state.rows.insert(key.clone(), pojo.snapshot());
            state.recognized.insert(instance_key(pojo.as_ref()), key);
            identifier
        };

        managed.mark_persistent(identifier)
    }

    fn destroy(&self, managed: &ManagedObject) -> Result<(), MetamodelError> {
        let oid = persistent_oid_of(managed)?;
        let key = (
            oid.spec_id().as_str().to_string(),
            oid.identifier().unwrap_or_default().to_string(),
        );

        managed.mark_removed()?;

        let mut state = self.lock();
        state.rows.remove(&key);
        state.tombstones.insert(key);
        Ok(())
    }

    fn count(&self) -> Result<usize, MetamodelError> {
        Ok(self.lock().rows.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
