//! # Core Type Definitions
//!
//! This module contains the foundation types for the Introspec metamodel:
//! - Class and member identifiers (`SpecId`, `MemberId`)
//! - Class sorts (`ClassKind`)
//! - Instance snapshots (`PropertyMap`)
//! - Error types (`MetamodelError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry no interior mutability and no floating-point data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// CLASS & MEMBER IDENTIFIERS
// =============================================================================

/// Stable identifier for a domain class, derived from the class name.
///
/// A `SpecId` names exactly one `Specification` for the lifetime of a
/// `SpecificationLoader`. It is the class-side half of every `Oid`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecId(pub String);

impl SpecId {
    /// Create a spec id from a class name.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one member (property, collection or action) of a class.
///
/// Member ids are unique within their owning class, not globally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl MemberId {
    /// Create a member id.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLASS KIND
// =============================================================================

/// The sort of a domain class.
///
/// Entities are storage-backed and carry persistent identity. Values and
/// viewmodels have Specifications like any other class but no storage-backed
/// identity of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    /// Storage-backed domain entity.
    Entity,
    /// Immutable value type (no identity at all).
    Value,
    /// State reconstructible from a memento string.
    Viewmodel,
}

impl ClassKind {
    /// Whether instances of this kind are eligible for persistence.
    #[must_use]
    pub const fn is_persistable(self) -> bool {
        matches!(self, Self::Entity)
    }
}

// =============================================================================
// PROPERTY MAP
// =============================================================================

/// Flat snapshot of a domain instance's state.
///
/// Object stores serialize this map rather than the instance itself, so the
/// core never needs to know a concrete domain type. `BTreeMap` keeps the
/// encoded form canonical.
pub type PropertyMap = BTreeMap<String, String>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Introspec core.
///
/// - No silent failures
/// - Use `Result<T, MetamodelError>` for fallible operations
/// - The core should never panic; all errors must be recoverable
///
/// Composition ambiguities are deliberately NOT errors: they are recorded
/// as validation failures and composition always completes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetamodelError {
    /// No class model is registered under the given spec id.
    #[error("Unknown class: {0}")]
    UnknownClass(SpecId),

    /// No member with the given id exists on the class.
    #[error("Unknown member '{member}' on class {spec}")]
    UnknownMember {
        /// The owning class.
        spec: SpecId,
        /// The missing member.
        member: MemberId,
    },

    /// The persistence collaborator recognized an instance but could not
    /// produce an identifier for it. Identity is a precondition the rest of
    /// the system cannot proceed without, so this surfaces to the caller.
    #[error("Identity resolution failed for recognized instance of {0}")]
    IdentityResolution(SpecId),

    /// A state transition not permitted by the managed-object lifecycle.
    #[error("Illegal state transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// State before the rejected transition.
        from: crate::managed::ManagedObjectState,
        /// Requested target state.
        to: crate::managed::ManagedObjectState,
    },

    /// The class model declares no constructor hook, so a new transient
    /// instance cannot be created.
    #[error("Class {0} is not instantiable (no constructor hook registered)")]
    NotInstantiable(SpecId),

    /// The class model declares no restore hook, so a stored snapshot
    /// cannot be rehydrated.
    #[error("Class {0} is not restorable (no restore hook registered)")]
    NotRestorable(SpecId),

    /// An externally supplied object reference could not be parsed.
    #[error("Malformed external reference: {0}")]
    MalformedReference(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage-backend error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
