//! # Composition Tier Tests (T0-T3)
//!
//! If ANY tier fails, the metamodel is INVALID.
//!
//! ## Tiers
//! - T0: Facet Holder Integrity
//! - T1: Deterministic Composition
//! - T2: Hierarchy Resolution
//! - T3: Identity & Adapters

use introspec_core::{
    ClassKind, ClassModel, ClassRegistry, DomainObject, FacetKind, FacetPayload, MarkerKind,
    MemberId, MemberModel, MetamodelError, NullBridge, Oid, SharedObject, SpecId,
    SpecificationLoader, UnitOfWork,
};
use std::sync::Arc;

fn make_invoice() -> SharedObject {
    Arc::new(Invoice)
}

#[derive(Debug)]
struct Invoice;

impl DomainObject for Invoice {
    fn class_name(&self) -> &str {
        "Invoice"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// =============================================================================
// TIER T0: FACET HOLDER INTEGRITY
// =============================================================================

mod t0_facet_holder_integrity {
    use super::*;
    use introspec_core::{FacetHolder, FacetOwner};

    /// T0.1: A holder carries at most one facet per kind.
    #[test]
    fn one_facet_per_kind() {
        let holder = FacetHolder::new(FacetOwner::class(SpecId::new("Invoice")));
        holder.contribute(FacetKind::Auditable, FacetPayload::Marker);
        holder.contribute(FacetKind::Auditable, FacetPayload::Marker);

        assert_eq!(holder.len(), 1);
    }

    /// T0.2: Later contributions of the same kind win.
    #[test]
    fn last_writer_wins() {
        let holder = FacetHolder::new(FacetOwner::class(SpecId::new("Invoice")));
        holder.contribute(
            FacetKind::Title,
            FacetPayload::Title {
                accessor: "first".into(),
            },
        );
        holder.contribute(
            FacetKind::Title,
            FacetPayload::Title {
                accessor: "second".into(),
            },
        );

        let facet = holder.facet(FacetKind::Title).expect("facet");
        assert_eq!(
            facet.payload,
            FacetPayload::Title {
                accessor: "second".into()
            }
        );
    }

    /// T0.3: A lookup never yields a facet belonging to another holder.
    #[test]
    fn lookup_is_holder_local() {
        let invoice = FacetHolder::new(FacetOwner::class(SpecId::new("Invoice")));
        let order = FacetHolder::new(FacetOwner::class(SpecId::new("Order")));
        invoice.contribute(FacetKind::Auditable, FacetPayload::Marker);

        assert!(order.facet(FacetKind::Auditable).is_none());
        let facet = invoice.facet(FacetKind::Auditable).expect("facet");
        assert_eq!(facet.owner.spec, SpecId::new("Invoice"));
    }
}

// =============================================================================
// TIER T1: DETERMINISTIC COMPOSITION
// =============================================================================

mod t1_deterministic_composition {
    use super::*;
    use introspec_core::{
        FacetFactory, FactoryPipeline, FactoryTarget, ValidatorComposite,
        factory::ClassContext,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Invoice", ClassKind::Entity)
                .with_marker_method(MarkerKind::NavigableParent, "customer")
                .with_marker_method(MarkerKind::Title, "number")
                .with_member(MemberModel::property("number").with_default("draft"))
                .with_member(MemberModel::collection("lines").with_order(3)),
        );
        registry
    }

    /// T1.1: The same class composed by two loaders yields identical
    /// facet sets, class-level and member-level.
    #[test]
    fn identical_input_produces_identical_facets() {
        let first = SpecificationLoader::new(registry());
        let second = SpecificationLoader::new(registry());

        let spec_a = first
            .specification_for(&SpecId::new("Invoice"))
            .expect("spec");
        let spec_b = second
            .specification_for(&SpecId::new("Invoice"))
            .expect("spec");

        assert_eq!(spec_a.facets().snapshot(), spec_b.facets().snapshot());
        for (member_a, member_b) in spec_a.members().iter().zip(spec_b.members().iter()) {
            assert_eq!(member_a.id(), member_b.id());
            assert_eq!(member_a.facets().snapshot(), member_b.facets().snapshot());
        }
    }

    /// T1.2: Requesting the same Specification twice returns
    /// reference-identical results.
    #[test]
    fn specification_is_singleton_per_class() {
        let loader = SpecificationLoader::new(registry());
        let first = loader
            .specification_for(&SpecId::new("Invoice"))
            .expect("spec");
        let second = loader
            .specification_for(&SpecId::new("Invoice"))
            .expect("spec");
        assert!(Arc::ptr_eq(&first, &second));
    }

    struct CountingFactory {
        runs: Arc<AtomicUsize>,
    }

    impl FacetFactory for CountingFactory {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn targets(&self) -> FactoryTarget {
            FactoryTarget::Classes
        }

        fn process_class(&self, _ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// T1.3: The pipeline never runs twice for one class within one
    /// load cycle.
    #[test]
    fn pipeline_runs_once_per_class() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut pipeline = FactoryPipeline::new();
        pipeline.add(Box::new(CountingFactory { runs: runs.clone() }));

        let loader = SpecificationLoader::with_pipeline(
            registry(),
            pipeline,
            ValidatorComposite::new(),
        );
        for _ in 0..5 {
            loader
                .specification_for(&SpecId::new("Invoice"))
                .expect("spec");
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}

// =============================================================================
// TIER T2: HIERARCHY RESOLUTION
// =============================================================================

mod t2_hierarchy_resolution {
    use super::*;

    /// T2.1: A subclass declaring nothing inherits the parent accessor
    /// from the nearest declaring level.
    #[test]
    fn credit_invoice_inherits_customer_accessor() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Invoice", ClassKind::Entity)
                .with_marker_method(MarkerKind::NavigableParent, "customer"),
        );
        registry.register(
            ClassModel::new("CreditInvoice", ClassKind::Entity).with_superclass("Invoice"),
        );

        let loader = SpecificationLoader::new(registry);
        let spec = loader
            .specification_for(&SpecId::new("CreditInvoice"))
            .expect("spec");

        let facet = spec.facet(FacetKind::NavigableParent).expect("facet");
        assert_eq!(
            facet.payload,
            FacetPayload::NavigableParent {
                accessor: "customer".into()
            }
        );
    }

    /// T2.2: The nearest declaring level wins over deeper ones.
    #[test]
    fn base_source_resolves_for_deep_leaf() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Base", ClassKind::Entity)
                .with_marker_method(MarkerKind::NavigableParent, "owner"),
        );
        registry.register(ClassModel::new("Mid", ClassKind::Entity).with_superclass("Base"));
        registry.register(ClassModel::new("Leaf", ClassKind::Entity).with_superclass("Mid"));

        let loader = SpecificationLoader::new(registry);
        let spec = loader
            .specification_for(&SpecId::new("Leaf"))
            .expect("spec");
        let facet = spec.facet(FacetKind::NavigableParent).expect("facet");
        assert_eq!(
            facet.payload,
            FacetPayload::NavigableParent {
                accessor: "owner".into()
            }
        );
    }

    /// T2.3: An ambiguous declaring level yields no facet for the leaf
    /// and exactly one validation failure naming the declaring level.
    #[test]
    fn ambiguity_is_reported_once_against_the_declaring_level() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Base", ClassKind::Entity)
                .with_marker_method(MarkerKind::NavigableParent, "owner")
                .with_marker_method(MarkerKind::NavigableParent, "container"),
        );
        registry.register(ClassModel::new("Mid", ClassKind::Entity).with_superclass("Base"));
        registry.register(ClassModel::new("Leaf", ClassKind::Entity).with_superclass("Mid"));

        let loader = SpecificationLoader::new(registry);
        loader.compose_all().expect("compose");

        let leaf = loader
            .specification_for(&SpecId::new("Leaf"))
            .expect("spec");
        assert!(leaf.facet(FacetKind::NavigableParent).is_none());

        let failures = loader.run_validation();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures.entries()[0].spec, SpecId::new("Base"));
    }

    /// T2.4: A hierarchy with no declaring level produces no facet and no
    /// failure — absence of a parent is valid.
    #[test]
    fn absent_parent_is_valid() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassModel::new("Standalone", ClassKind::Entity));

        let loader = SpecificationLoader::new(registry);
        let spec = loader
            .specification_for(&SpecId::new("Standalone"))
            .expect("spec");

        assert!(spec.facet(FacetKind::NavigableParent).is_none());
        assert!(loader.run_validation().is_empty());
    }
}

// =============================================================================
// TIER T3: IDENTITY & ADAPTERS
// =============================================================================

mod t3_identity_and_adapters {
    use super::*;
    use introspec_core::ManagedObjectState;

    fn loader() -> Arc<SpecificationLoader> {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Invoice", ClassKind::Entity)
                .with_member(MemberModel::collection("lines"))
                .with_instantiate(make_invoice),
        );
        Arc::new(SpecificationLoader::new(registry))
    }

    /// T3.1: Oid components round-trip for every construction path.
    #[test]
    fn oid_round_trip() {
        let spec = SpecId::new("Invoice");
        let oid = Oid::persistent(spec.clone(), "42");

        assert_eq!(oid.spec_id(), &spec);
        assert_eq!(oid.identifier(), Some("42"));
        assert_ne!(Oid::transient(spec.clone()), oid);

        let external = oid.to_external().expect("external");
        assert_eq!(Oid::parse_external(&external).expect("parse"), oid);
    }

    /// T3.2: The identity map is reference-based, not value-based.
    #[test]
    fn adapter_identity_is_reference_based() {
        let mut uow = UnitOfWork::new(loader(), Arc::new(NullBridge));

        let pojo = make_invoice();
        let first = uow
            .adapter_for(Some(pojo.clone()))
            .expect("adapter")
            .expect("some");
        let again = uow
            .adapter_for(Some(pojo))
            .expect("adapter")
            .expect("some");
        let other = uow
            .adapter_for(Some(make_invoice()))
            .expect("adapter")
            .expect("some");

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    /// T3.3: A brand-new instance is transient before any persistence call.
    #[test]
    fn new_transient_instance_is_transient() {
        let loader = loader();
        let spec = loader
            .specification_for(&SpecId::new("Invoice"))
            .expect("spec");
        let mut uow = UnitOfWork::new(loader, Arc::new(NullBridge));

        let adapter = uow.new_transient_instance(&spec).expect("instance");
        assert!(adapter.oid().expect("oid").is_transient());
        assert_eq!(adapter.state(), ManagedObjectState::Transient);
    }

    /// T3.4: A removed adapter rejects any move back to persistent.
    #[test]
    fn removed_is_terminal() {
        let loader = loader();
        let spec = loader
            .specification_for(&SpecId::new("Invoice"))
            .expect("spec");
        let mut uow = UnitOfWork::new(loader, Arc::new(NullBridge));

        let adapter = uow.new_transient_instance(&spec).expect("instance");
        adapter.mark_persistent("9").expect("persist");
        adapter.mark_removed().expect("remove");

        let err = adapter.mark_persistent("10").expect_err("rejected");
        assert!(matches!(err, MetamodelError::IllegalTransition { .. }));
    }

    /// T3.5: Collection elements without independent identity anchor to
    /// their parent Oid.
    #[test]
    fn collection_identity_anchors_to_parent() {
        let mut uow = UnitOfWork::new(loader(), Arc::new(NullBridge));
        let parent = Oid::persistent(SpecId::new("Invoice"), "7");

        let adapter = uow
            .adapter_for_collection(make_invoice(), &parent, &MemberId::new("lines"))
            .expect("adapter");
        assert_eq!(
            adapter.oid().expect("oid").identifier(),
            Some("Invoice:7~lines")
        );
    }
}
