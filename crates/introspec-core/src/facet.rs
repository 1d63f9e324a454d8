//! # Facet Model
//!
//! Facets are the atomic capability units of the metamodel. Every class-level
//! or member-level descriptor is a facet holder: a deterministic map from
//! facet kind to at most one facet.
//!
//! The model is a closed tagged union (`FacetKind` + `FacetPayload`), so
//! consumption sites match exhaustively instead of probing with downcasts.
//!
//! ## Invariants
//!
//! - A holder carries at most one facet per kind; a later contribution of the
//!   same kind replaces the earlier one (last-writer-wins, pipeline order is
//!   the tie-break).
//! - Facets are immutable once attached.
//! - A lookup never returns a facet stamped with another holder's owner.

use crate::types::{MemberId, SpecId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

// =============================================================================
// FACET KIND
// =============================================================================

/// Enumerates every capability the composition pipeline can discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FacetKind {
    /// The class has a resolvable navigational parent accessor.
    NavigableParent,
    /// The class has a resolvable title accessor.
    Title,
    /// Changes to instances of this class are recorded by auditing.
    Auditable,
    /// Whether instances are eligible for persistence.
    Persistable,
    /// The class declares an on-created lifecycle callback.
    LifecycleCreated,
    /// A member declares a default value literal.
    Defaulted,
    /// A member declares a choices provider.
    Choices,
    /// A member declares an explicit ordering hint.
    MemberOrder,
}

// =============================================================================
// FACET PAYLOAD
// =============================================================================

/// Lifecycle callbacks a class model can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CallbackKind {
    /// Invoked once, after default initialization of a new transient instance.
    Created,
}

/// Capability-specific data carried by a facet.
///
/// Payloads are plain data: accessors are recorded by name and resolved
/// against the class model at invocation time, which keeps composed facet
/// sets value-comparable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetPayload {
    /// Presence-only capability (e.g. auditable).
    Marker,
    /// Accessor yielding the logical navigational parent.
    NavigableParent {
        /// Name of the winning accessor method.
        accessor: String,
    },
    /// Accessor yielding the object's title.
    Title {
        /// Name of the winning accessor method.
        accessor: String,
    },
    /// Persistence eligibility derived from the class sort.
    Persistable {
        /// True for storage-backed entities.
        eligible: bool,
    },
    /// A declared lifecycle callback.
    Lifecycle {
        /// Which callback the class declares.
        callback: CallbackKind,
    },
    /// Default value for a member.
    Defaulted {
        /// The declared default literal.
        literal: String,
    },
    /// Choices provider for a member.
    Choices {
        /// Name of the provider method.
        provider: String,
    },
    /// Explicit member ordering.
    MemberOrder {
        /// Position within the owning class's member listing.
        sequence: u32,
    },
}

// =============================================================================
// FACET
// =============================================================================

/// Identifies the holder a facet belongs to.
///
/// This is the non-owning back-reference from facet to holder: holders are
/// reached through the Specification, never through the facet itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacetOwner {
    /// The owning class.
    pub spec: SpecId,
    /// The owning member, if the holder is member-level.
    pub member: Option<MemberId>,
}

impl FacetOwner {
    /// Owner reference for a class-level holder.
    #[must_use]
    pub fn class(spec: SpecId) -> Self {
        Self { spec, member: None }
    }

    /// Owner reference for a member-level holder.
    #[must_use]
    pub fn member(spec: SpecId, member: MemberId) -> Self {
        Self {
            spec,
            member: Some(member),
        }
    }
}

/// One atomic, typed unit of behavior or metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    /// The capability this facet represents.
    pub kind: FacetKind,
    /// Capability-specific data.
    pub payload: FacetPayload,
    /// Back-reference to the holder that carries this facet.
    pub owner: FacetOwner,
}

// =============================================================================
// FACET HOLDER
// =============================================================================

/// Anything that can carry facets: a Specification or one of its members.
///
/// Lookup by kind is O(log n) over a `BTreeMap` and never yields a facet
/// stamped for another holder, because facets are constructed by the holder
/// itself in [`FacetHolder::contribute`].
///
/// The interior `RwLock` exists for the composition phase, during which the
/// owning Specification is already registered (and thus shared) to resolve
/// self-referential classes. After the loader marks composition complete the
/// map is only read.
#[derive(Debug)]
pub struct FacetHolder {
    owner: FacetOwner,
    facets: RwLock<BTreeMap<FacetKind, Facet>>,
}

impl FacetHolder {
    /// Create an empty holder owned by the given descriptor.
    #[must_use]
    pub fn new(owner: FacetOwner) -> Self {
        Self {
            owner,
            facets: RwLock::new(BTreeMap::new()),
        }
    }

    /// The descriptor this holder belongs to.
    #[must_use]
    pub fn owner(&self) -> &FacetOwner {
        &self.owner
    }

    /// Attach a facet of the given kind, replacing any earlier facet of the
    /// same kind (last-writer-wins).
    ///
    /// Returns the facet that was displaced, if any.
    pub fn contribute(&self, kind: FacetKind, payload: FacetPayload) -> Option<Facet> {
        let facet = Facet {
            kind,
            payload,
            owner: self.owner.clone(),
        };
        self.facets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, facet)
    }

    /// Look up the facet of the given kind.
    #[must_use]
    pub fn facet(&self, kind: FacetKind) -> Option<Facet> {
        self.facets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    /// Whether a facet of the given kind is attached.
    #[must_use]
    pub fn contains(&self, kind: FacetKind) -> bool {
        self.facets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// Number of attached facets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the holder carries no facets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value snapshot of the attached facets, in kind order.
    ///
    /// Used for determinism comparisons and metamodel export.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<FacetKind, Facet> {
        self.facets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn holder() -> FacetHolder {
        FacetHolder::new(FacetOwner::class(SpecId::new("Invoice")))
    }

    #[test]
    fn contribute_then_lookup() {
        let holder = holder();
        holder.contribute(FacetKind::Auditable, FacetPayload::Marker);

        let facet = holder.facet(FacetKind::Auditable).expect("facet");
        assert_eq!(facet.kind, FacetKind::Auditable);
        assert_eq!(facet.owner.spec.as_str(), "Invoice");
    }

    #[test]
    fn at_most_one_facet_per_kind_last_writer_wins() {
        let holder = holder();
        holder.contribute(
            FacetKind::Title,
            FacetPayload::Title {
                accessor: "title_a".into(),
            },
        );
        let displaced = holder.contribute(
            FacetKind::Title,
            FacetPayload::Title {
                accessor: "title_b".into(),
            },
        );

        assert!(displaced.is_some());
        assert_eq!(holder.len(), 1);
        let facet = holder.facet(FacetKind::Title).expect("facet");
        assert_eq!(
            facet.payload,
            FacetPayload::Title {
                accessor: "title_b".into()
            }
        );
    }

    #[test]
    fn lookup_of_absent_kind_is_none() {
        let holder = holder();
        assert!(holder.facet(FacetKind::NavigableParent).is_none());
        assert!(holder.is_empty());
    }

    #[test]
    fn member_owner_carries_member_id() {
        let owner = FacetOwner::member(SpecId::new("Invoice"), MemberId::new("lines"));
        let holder = FacetHolder::new(owner);
        holder.contribute(
            FacetKind::MemberOrder,
            FacetPayload::MemberOrder { sequence: 1 },
        );

        let facet = holder.facet(FacetKind::MemberOrder).expect("facet");
        assert_eq!(facet.owner.member.as_ref().map(MemberId::as_str), Some("lines"));
    }

    #[test]
    fn snapshot_is_kind_ordered() {
        let holder = holder();
        holder.contribute(
            FacetKind::Persistable,
            FacetPayload::Persistable { eligible: true },
        );
        holder.contribute(FacetKind::Auditable, FacetPayload::Marker);

        let kinds: Vec<_> = holder.snapshot().into_keys().collect();
        assert_eq!(kinds, vec![FacetKind::Auditable, FacetKind::Persistable]);
    }
}
