//! # Collaborator Ports
//!
//! The core never accesses storage directly. It resolves Oids and lifecycle
//! states through this bridge, and persistence plugins implement it. The
//! reverse direction — translating raw fetched instances back into managed
//! objects — goes through `SpecificationLoader::lookup_by_spec_id` and
//! `UnitOfWork::adapter_for`.

use crate::class_model::{DomainObject, SharedObject};
use crate::managed::ManagedObjectState;
use crate::oid::Oid;
use crate::types::MetamodelError;

/// What the identity layer asks of a persistence collaborator.
pub trait PersistenceBridge: Send + Sync {
    /// Whether storage already tracks this instance.
    fn is_recognized(&self, pojo: &dyn DomainObject) -> bool;

    /// The external identifier of a recognized instance.
    ///
    /// Returning `None` for a recognized instance is an identity-resolution
    /// failure and surfaces as a hard error from the adapter provider.
    fn identifier_for(&self, pojo: &dyn DomainObject) -> Option<String>;

    /// Fetch the instance a persistent Oid names, if it exists.
    fn fetch_by_oid(&self, oid: &Oid) -> Result<Option<SharedObject>, MetamodelError>;

    /// The lifecycle state storage attributes to this instance.
    fn state_of(&self, pojo: &dyn DomainObject) -> ManagedObjectState;
}

/// A bridge that recognizes nothing.
///
/// The default for metamodel-only use: every entity instance stays
/// transient until a real store is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBridge;

impl PersistenceBridge for NullBridge {
    fn is_recognized(&self, _pojo: &dyn DomainObject) -> bool {
        false
    }

    fn identifier_for(&self, _pojo: &dyn DomainObject) -> Option<String> {
        None
    }

    fn fetch_by_oid(&self, _oid: &Oid) -> Result<Option<SharedObject>, MetamodelError> {
        Ok(None)
    }

    fn state_of(&self, _pojo: &dyn DomainObject) -> ManagedObjectState {
        ManagedObjectState::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpecId;

    #[derive(Debug)]
    struct Anything;

    impl DomainObject for Anything {
        fn class_name(&self) -> &str {
            "Anything"
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn null_bridge_recognizes_nothing() {
        let bridge = NullBridge;
        let pojo = Anything;
        assert!(!bridge.is_recognized(&pojo));
        assert!(bridge.identifier_for(&pojo).is_none());
        assert_eq!(bridge.state_of(&pojo), ManagedObjectState::Transient);
        assert!(
            bridge
                .fetch_by_oid(&Oid::persistent(SpecId::new("Anything"), "1"))
                .expect("fetch")
                .is_none()
        );
    }
}
