//! # Object Stores
//!
//! Persistence plugins for the identity layer. A store implements the
//! [`PersistenceBridge`] port plus the write-side operations the lifecycle
//! needs: make-persistent, destroy and counting.
//!
//! Two backends ship:
//! - [`MemStore`]: in-memory rows (fast, volatile)
//! - [`RedbObjectStore`]: disk-backed ACID rows using redb
//!
//! Stores hold property-map snapshots, never domain instances: rehydration
//! goes through the class model's restore hook, so the store stays ignorant
//! of concrete domain types.

mod mem_store;
mod redb_store;

pub use mem_store::MemStore;
pub use redb_store::RedbObjectStore;

use crate::managed::ManagedObject;
use crate::oid::Oid;
use crate::ports::PersistenceBridge;
use crate::types::MetamodelError;

/// Write-side contract of a persistence plugin.
///
/// The store drives the managed object's lifecycle transitions: a
/// successful `make_persistent` moves the adapter `Transient -> Persistent`
/// and a successful `destroy` moves it `Persistent -> Removed`. Illegal
/// transitions are rejected before anything is written.
pub trait ObjectStore: PersistenceBridge {
    /// Persist a transient managed object: allocate an identifier, write
    /// the instance snapshot, and move the adapter to `Persistent`.
    /// Returns the assigned Oid.
    fn make_persistent(&self, managed: &ManagedObject) -> Result<Oid, MetamodelError>;

    /// Destroy a persistent managed object: drop its row, tombstone its
    /// identifier, and move the adapter to `Removed`.
    fn destroy(&self, managed: &ManagedObject) -> Result<(), MetamodelError>;

    /// Number of live (non-destroyed) stored instances.
    fn count(&self) -> Result<usize, MetamodelError>;
}

/// Fetch the Oid a store needs before it may destroy an instance.
///
/// Shared by both backends: destroying requires a persistent identity.
pub(crate) fn persistent_oid_of(managed: &ManagedObject) -> Result<Oid, MetamodelError> {
    match managed.oid() {
        Some(oid) if !oid.is_transient() => Ok(oid),
        _ => Err(MetamodelError::IdentityResolution(
            managed.specification().spec_id().clone(),
        )),
    }
}
