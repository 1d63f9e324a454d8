//! # Object Identifiers
//!
//! An `Oid` identifies a potential or actual persistent instance: the spec
//! id of its class plus either "transient" (no stable identifier yet) or a
//! persistent identifier string.
//!
//! Oids cross process boundaries — they are embedded into externally
//! visible references — so equality and hashing are structural, and a
//! persistent Oid round-trips byte-for-byte through its
//! `specId:identifier` string form. The core exposes the two components as
//! opaque strings; any richer encoding scheme belongs to the collaborator
//! that builds the external reference.

use crate::types::{MetamodelError, SpecId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the spec id and the identifier in the external form.
const EXTERNAL_SEPARATOR: char = ':';

/// Identity of a potential (transient) or actual (persistent) instance.
///
/// Immutable after construction. Two Oids are equal iff same variant, same
/// spec id and — for persistent ones — the same identifier string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Oid {
    /// An instance with no stable identifier yet.
    Transient {
        /// The class of the would-be persistent instance.
        spec_id: SpecId,
    },
    /// A storage-backed instance.
    Persistent {
        /// The class of the instance.
        spec_id: SpecId,
        /// The collaborator-assigned identifier, opaque to the core.
        identifier: String,
    },
}

impl Oid {
    /// Identity for a not-yet-persisted instance of a class.
    #[must_use]
    pub fn transient(spec_id: SpecId) -> Self {
        Self::Transient { spec_id }
    }

    /// Identity for a persistent instance.
    #[must_use]
    pub fn persistent(spec_id: SpecId, identifier: impl Into<String>) -> Self {
        Self::Persistent {
            spec_id,
            identifier: identifier.into(),
        }
    }

    /// The class-side component.
    #[must_use]
    pub fn spec_id(&self) -> &SpecId {
        match self {
            Self::Transient { spec_id } | Self::Persistent { spec_id, .. } => spec_id,
        }
    }

    /// The identifier component; `None` while transient.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Transient { .. } => None,
            Self::Persistent { identifier, .. } => Some(identifier),
        }
    }

    /// Whether this identity is still transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The `specId:identifier` string form of a persistent Oid.
    ///
    /// Returns `None` for transient Oids — they have no stable external
    /// form by definition.
    #[must_use]
    pub fn to_external(&self) -> Option<String> {
        match self {
            Self::Transient { .. } => None,
            Self::Persistent {
                spec_id,
                identifier,
            } => Some(format!("{}{}{}", spec_id, EXTERNAL_SEPARATOR, identifier)),
        }
    }

    /// Reconstruct a persistent Oid from its `specId:identifier` form.
    ///
    /// The identifier component is everything after the first separator, so
    /// identifiers containing the separator survive the round trip.
    pub fn parse_external(external: &str) -> Result<Self, MetamodelError> {
        match external.split_once(EXTERNAL_SEPARATOR) {
            Some((spec, identifier)) if !spec.is_empty() => {
                Ok(Self::persistent(SpecId::new(spec), identifier))
            }
            _ => Err(MetamodelError::MalformedReference(external.to_string())),
        }
    }

    /// Reconstruct a persistent Oid from its two components, as handed back
    /// by an identifier-encoding collaborator.
    #[must_use]
    pub fn from_parts(spec_id: SpecId, identifier: impl Into<String>) -> Self {
        Self::persistent(spec_id, identifier)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient { spec_id } => write!(f, "{}{}(transient)", spec_id, EXTERNAL_SEPARATOR),
            Self::Persistent {
                spec_id,
                identifier,
            } => write!(f, "{}{}{}", spec_id, EXTERNAL_SEPARATOR, identifier),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_survive_construction() {
        let oid = Oid::persistent(SpecId::new("Invoice"), "42");
        assert_eq!(oid.spec_id().as_str(), "Invoice");
        assert_eq!(oid.identifier(), Some("42"));
        assert!(!oid.is_transient());
    }

    #[test]
    fn transient_and_persistent_never_compare_equal() {
        let spec = SpecId::new("Invoice");
        let transient = Oid::transient(spec.clone());
        assert!(transient.is_transient());
        assert_eq!(transient.identifier(), None);

        for identifier in ["", "42", "transient"] {
            assert_ne!(transient, Oid::persistent(spec.clone(), identifier));
        }
    }

    #[test]
    fn equality_is_structural_across_construction_paths() {
        let direct = Oid::persistent(SpecId::new("Invoice"), "42");
        let from_parts = Oid::from_parts(SpecId::new("Invoice"), "42");
        let parsed = Oid::parse_external("Invoice:42").expect("parse");

        assert_eq!(direct, from_parts);
        assert_eq!(direct, parsed);
    }

    #[test]
    fn external_form_round_trips_byte_for_byte() {
        let oid = Oid::persistent(SpecId::new("Invoice"), "L-0001:child/7");
        let external = oid.to_external().expect("external");
        assert_eq!(external, "Invoice:L-0001:child/7");
        assert_eq!(Oid::parse_external(&external).expect("parse"), oid);
    }

    #[test]
    fn transient_has_no_external_form() {
        assert!(Oid::transient(SpecId::new("Invoice")).to_external().is_none());
    }

    #[test]
    fn malformed_references_are_rejected() {
        assert!(Oid::parse_external("no-separator").is_err());
        assert!(Oid::parse_external(":identifier-only").is_err());
    }
}
