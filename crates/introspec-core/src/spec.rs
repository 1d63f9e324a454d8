//! # Specification
//!
//! The composed descriptor for one domain class: its own facet holder plus
//! one member holder per declared property, collection and action.
//!
//! Exactly one `Specification` exists per class for the lifetime of its
//! owning `SpecificationLoader` (singleton-per-key caching). The loader
//! registers an empty Specification in its cache *before* the factory
//! pipeline runs, so a self-referential class can observe its own
//! in-progress descriptor; once the loader marks the slot ready the
//! Specification is treated as frozen.

use crate::class_model::{ClassModel, MemberKind, MemberModel};
use crate::facet::{Facet, FacetHolder, FacetKind, FacetOwner};
use crate::types::{ClassKind, MemberId, SpecId};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// OBJECT MEMBER
// =============================================================================

/// The descriptor for one member of a class: its identity, kind and facets.
#[derive(Debug)]
pub struct ObjectMember {
    id: MemberId,
    kind: MemberKind,
    facets: FacetHolder,
}

impl ObjectMember {
    /// Create an empty member holder for the given declared member.
    #[must_use]
    pub fn new(spec: &SpecId, model: &MemberModel) -> Self {
        Self {
            id: model.id.clone(),
            kind: model.kind,
            facets: FacetHolder::new(FacetOwner::member(spec.clone(), model.id.clone())),
        }
    }

    /// The member identifier.
    #[must_use]
    pub fn id(&self) -> &MemberId {
        &self.id
    }

    /// Property, collection or action.
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// This member's facet holder.
    #[must_use]
    pub fn facets(&self) -> &FacetHolder {
        &self.facets
    }

    /// Shortcut: look up a facet by kind.
    #[must_use]
    pub fn facet(&self, kind: FacetKind) -> Option<Facet> {
        self.facets.facet(kind)
    }
}

// =============================================================================
// SPECIFICATION
// =============================================================================

/// The full descriptor for one class.
#[derive(Debug)]
pub struct Specification {
    spec_id: SpecId,
    class_name: String,
    class_kind: ClassKind,
    facets: FacetHolder,
    members: RwLock<BTreeMap<MemberId, Arc<ObjectMember>>>,
}

impl Specification {
    /// Create the empty descriptor for a class, before composition.
    #[must_use]
    pub fn empty(model: &ClassModel) -> Self {
        let spec_id = model.spec_id();
        Self {
            class_name: model.name().to_string(),
            class_kind: model.kind(),
            facets: FacetHolder::new(FacetOwner::class(spec_id.clone())),
            members: RwLock::new(BTreeMap::new()),
            spec_id,
        }
    }

    /// The stable identifier derived from the class.
    #[must_use]
    pub fn spec_id(&self) -> &SpecId {
        &self.spec_id
    }

    /// The corresponding class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The class sort.
    #[must_use]
    pub fn class_kind(&self) -> ClassKind {
        self.class_kind
    }

    /// The class-level facet holder.
    #[must_use]
    pub fn facets(&self) -> &FacetHolder {
        &self.facets
    }

    /// Shortcut: look up a class-level facet by kind.
    #[must_use]
    pub fn facet(&self, kind: FacetKind) -> Option<Facet> {
        self.facets.facet(kind)
    }

    /// Register a member holder. Composition-phase only.
    pub fn add_member(&self, member: ObjectMember) -> Arc<ObjectMember> {
        let member = Arc::new(member);
        self.members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(member.id().clone(), member.clone());
        member
    }

    /// Look up a member holder by id.
    #[must_use]
    pub fn member(&self, id: &MemberId) -> Option<Arc<ObjectMember>> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All member holders, in member-id order.
    #[must_use]
    pub fn members(&self) -> Vec<Arc<ObjectMember>> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Member holders of one kind, in member-id order.
    #[must_use]
    pub fn members_of(&self, kind: MemberKind) -> Vec<Arc<ObjectMember>> {
        self.members()
            .into_iter()
            .filter(|m| m.kind() == kind)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
