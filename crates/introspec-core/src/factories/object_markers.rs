//! # Class-Level Marker Facets
//!
//! Small class-level rules with no ambiguity condition: auditability,
//! persistence eligibility and declared lifecycle callbacks.

use crate::class_model::MarkerKind;
use crate::facet::{CallbackKind, FacetKind, FacetPayload};
use crate::factory::{ClassContext, FacetFactory, FactoryTarget};
use crate::types::MetamodelError;

// =============================================================================
// AUDITABLE
// =============================================================================

/// Attaches the `Auditable` marker facet when any hierarchy level declares
/// the auditable marker. Auditability is inherited: marking a base class
/// marks every subclass.
pub struct AuditableFacetFactory;

impl FacetFactory for AuditableFacetFactory {
    fn name(&self) -> &'static str {
        "auditable"
    }

    fn targets(&self) -> FactoryTarget {
        FactoryTarget::Classes
    }

    fn process_class(&self, ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
        let declared = ctx
            .registry
            .hierarchy(&ctx.model.spec_id())
            .iter()
            .any(|level| !level.markers_of(MarkerKind::Auditable).is_empty());
        if declared {
            ctx.holder
                .contribute(FacetKind::Auditable, FacetPayload::Marker);
        }
        Ok(())
    }
}

// =============================================================================
// PERSISTABLE
// =============================================================================

/// Derives persistence eligibility from the class sort: entities are
/// eligible, values and viewmodels are not.
pub struct PersistableFacetFactory;

impl FacetFactory for PersistableFacetFactory {
    fn name(&self) -> &'static str {
        "persistable"
    }

    fn targets(&self) -> FactoryTarget {
        FactoryTarget::Classes
    }

    fn process_class(&self, ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
        ctx.holder.contribute(
            FacetKind::Persistable,
            FacetPayload::Persistable {
                eligible: ctx.model.kind().is_persistable(),
            },
        );
        Ok(())
    }
}

// =============================================================================
// LIFECYCLE CALLBACKS
// =============================================================================

/// Records declared lifecycle callbacks as facets, so the adapter provider
/// can discover them without touching the class model.
pub struct LifecycleCallbackFacetFactory;

impl FacetFactory for LifecycleCallbackFacetFactory {
    fn name(&self) -> &'static str {
        "lifecycle-callbacks"
    }

    fn targets(&self) -> FactoryTarget {
        FactoryTarget::Classes
    }

    fn process_class(&self, ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
        if ctx.model.callback(CallbackKind::Created).is_some() {
            ctx.holder.contribute(
                FacetKind::LifecycleCreated,
                FacetPayload::Lifecycle {
                    callback: CallbackKind::Created,
                },
            );
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::{ClassModel, ClassRegistry, DomainObject, SharedObject};
    use crate::facet::{FacetHolder, FacetOwner};
    use crate::types::ClassKind;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Noop;

    impl DomainObject for Noop {
        fn class_name(&self) -> &str {
            "Noop"
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn make_noop() -> SharedObject {
        Arc::new(Noop)
    }

    fn on_created(_pojo: &dyn DomainObject) {}

    fn process<F: FacetFactory>(factory: &F, registry: &ClassRegistry, name: &str) -> FacetHolder {
        let model = registry.by_name(name).expect("registered");
        let holder = FacetHolder::new(FacetOwner::class(model.spec_id()));
        let ctx = ClassContext {
            model: &model,
            registry,
            holder: &holder,
        };
        factory.process_class(&ctx).expect("process");
        holder
    }

    #[test]
    fn auditable_marker_is_inherited() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Base", ClassKind::Entity).with_class_marker(MarkerKind::Auditable),
        );
        registry.register(ClassModel::new("Leaf", ClassKind::Entity).with_superclass("Base"));

        let holder = process(&AuditableFacetFactory, &registry, "Leaf");
        assert!(holder.contains(FacetKind::Auditable));
    }

    #[test]
    fn unmarked_class_is_not_auditable() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassModel::new("Plain", ClassKind::Entity));

        let holder = process(&AuditableFacetFactory, &registry, "Plain");
        assert!(!holder.contains(FacetKind::Auditable));
    }

    #[test]
    fn persistable_follows_class_kind() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassModel::new("Entity", ClassKind::Entity));
        registry.register(ClassModel::new("Money", ClassKind::Value));

        let entity = process(&PersistableFacetFactory, &registry, "Entity");
        assert_eq!(
            entity.facet(FacetKind::Persistable).map(|f| f.payload),
            Some(FacetPayload::Persistable { eligible: true })
        );

        let value = process(&PersistableFacetFactory, &registry, "Money");
        assert_eq!(
            value.facet(FacetKind::Persistable).map(|f| f.payload),
            Some(FacetPayload::Persistable { eligible: false })
        );
    }

    #[test]
    fn created_callback_is_surfaced_as_a_facet() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Invoice", ClassKind::Entity)
                .with_instantiate(make_noop)
                .with_created_callback(on_created),
        );
        registry.register(ClassModel::new("Plain", ClassKind::Entity));

        let with_callback = process(&LifecycleCallbackFacetFactory, &registry, "Invoice");
        assert!(with_callback.contains(FacetKind::LifecycleCreated));

        let without = process(&LifecycleCallbackFacetFactory, &registry, "Plain");
        assert!(!without.contains(FacetKind::LifecycleCreated));
    }
}
