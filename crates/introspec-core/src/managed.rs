//! # Managed Objects
//!
//! A managed object associates one live domain instance with its
//! Specification, its Oid and its lifecycle state. It is the unit the rest
//! of the system — persistence, auditing, external mapping — operates on.
//!
//! State and Oid sit behind an `RwLock` purely as the interior-mutability
//! mechanism: by design the core provides no ownership lock, and mutating
//! one managed object from two threads at once is a caller error. The
//! legal-transition relation is enforced here regardless of who calls.

use crate::class_model::SharedObject;
use crate::facet::{FacetKind, FacetPayload};
use crate::oid::Oid;
use crate::spec::Specification;
use crate::types::MetamodelError;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// LIFECYCLE STATE
// =============================================================================

/// Lifecycle state of a managed object.
///
/// Legal transitions: `Transient -> Persistent` (on successful
/// make-persistent) and `Persistent -> Removed` (on destroy). Nothing
/// leaves `Removed`. `ValueOrViewmodel` is terminal and orthogonal to the
/// transient/persistent axis: such instances have a Specification but no
/// storage-backed identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ManagedObjectState {
    /// Not yet known to storage.
    Transient,
    /// Storage-backed.
    Persistent,
    /// Destroyed; no further transitions.
    Removed,
    /// Value or viewmodel; never storage-backed.
    ValueOrViewmodel,
}

impl ManagedObjectState {
    /// Whether the lifecycle permits moving from `self` to `to`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Transient, Self::Persistent) | (Self::Persistent, Self::Removed)
        )
    }
}

// =============================================================================
// MANAGED OBJECT
// =============================================================================

#[derive(Debug, Clone)]
struct Identity {
    oid: Option<Oid>,
    state: ManagedObjectState,
}

/// One live domain instance paired with its Specification, Oid and state.
///
/// Managed objects are created by the adapter provider on first reference
/// to an instance within a unit of work, and are not valid beyond that
/// unit of work. The Specification is shared (the loader outlives every
/// adapter); the pojo-to-Oid association is owned here.
pub struct ManagedObject {
    pojo: SharedObject,
    spec: Arc<Specification>,
    identity: RwLock<Identity>,
}

impl std::fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identity = self
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ManagedObject")
            .field("spec", self.spec.spec_id())
            .field("oid", &identity.oid)
            .field("state", &identity.state)
            .finish_non_exhaustive()
    }
}

impl ManagedObject {
    /// Associate an instance with its descriptor and identity.
    ///
    /// `oid` is `None` only for pure values. Callers other than the adapter
    /// provider and object stores should not construct adapters directly.
    #[must_use]
    pub fn new(
        pojo: SharedObject,
        spec: Arc<Specification>,
        oid: Option<Oid>,
        state: ManagedObjectState,
    ) -> Self {
        Self {
            pojo,
            spec,
            identity: RwLock::new(Identity { oid, state }),
        }
    }

    /// The wrapped domain instance.
    #[must_use]
    pub fn pojo(&self) -> SharedObject {
        self.pojo.clone()
    }

    /// The shared descriptor for the instance's class.
    #[must_use]
    pub fn specification(&self) -> &Arc<Specification> {
        &self.spec
    }

    /// Current identity, if any.
    #[must_use]
    pub fn oid(&self) -> Option<Oid> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .oid
            .clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ManagedObjectState {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Record a successful make-persistent: assigns the persistent Oid
    /// carrying the given identifier and moves to `Persistent`.
    ///
    /// Rejected unless the current state is `Transient`; in particular a
    /// `Removed` adapter can never be revived.
    pub fn mark_persistent(&self, identifier: impl Into<String>) -> Result<Oid, MetamodelError> {
        let mut identity = self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !identity.state.can_transition_to(ManagedObjectState::Persistent) {
            return Err(MetamodelError::IllegalTransition {
                from: identity.state,
                to: ManagedObjectState::Persistent,
            });
        }
        let oid = Oid::persistent(self.spec.spec_id().clone(), identifier);
        identity.oid = Some(oid.clone());
        identity.state = ManagedObjectState::Persistent;
        Ok(oid)
    }

    /// Record a destroy: moves to `Removed`. The Oid is kept — the rest of
    /// the system may still need to name what was destroyed.
    pub fn mark_removed(&self) -> Result<(), MetamodelError> {
        let mut identity = self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !identity.state.can_transition_to(ManagedObjectState::Removed) {
            return Err(MetamodelError::IllegalTransition {
                from: identity.state,
                to: ManagedObjectState::Removed,
            });
        }
        identity.state = ManagedObjectState::Removed;
        Ok(())
    }

    // =========================================================================
    // FACET-DRIVEN ACCESS
    // =========================================================================

    /// Resolve the instance's title through the composed `Title` facet.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        match self.spec.facet(FacetKind::Title)?.payload {
            FacetPayload::Title { accessor } => self.pojo.title(&accessor),
            _ => None,
        }
    }

    /// Resolve the instance's navigational parent through the composed
    /// `NavigableParent` facet.
    #[must_use]
    pub fn navigable_parent(&self) -> Option<SharedObject> {
        match self.spec.facet(FacetKind::NavigableParent)?.payload {
            FacetPayload::NavigableParent { accessor } => self.pojo.reference(&accessor),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
