//! # introspec-core
//!
//! The metamodel composition engine for Introspec - THE LOGIC.
//!
//! This crate turns registered domain-class models into live, introspectable
//! descriptors: for each class it discovers structural and behavioral
//! capabilities (properties, collections, actions, navigation, persistence
//! eligibility) as facets, composes them into a cached Specification,
//! validates the result, and bridges live domain instances to their
//! descriptors through identity-tracked managed objects.
//!
//! ## Pipeline
//!
//! class model → `SpecificationLoader` → (facet factories fill a
//! `Specification`) → validators check it → cached `Specification`.
//! Instance → `UnitOfWork` → `ManagedObject` (spec + `Oid` + state) →
//! consumed by persistence, auditing and mapping collaborators.
//!
//! ## Architectural Constraints
//!
//! - Is the ONLY place where metamodel state exists (the loader cache)
//! - Composition rules are injected at construction, never at runtime
//! - Composition always completes; conflicts surface as validation
//!   failures, never as composition errors
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod class_model;
pub mod export;
pub mod facet;
pub mod factories;
pub mod factory;
pub mod loader;
pub mod managed;
pub mod oid;
pub mod ports;
pub mod provider;
pub mod spec;
pub mod storage;
pub mod types;
pub mod validator;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ClassKind, MemberId, MetamodelError, PropertyMap, SpecId};

// =============================================================================
// RE-EXPORTS: Metamodel
// =============================================================================

pub use class_model::{
    ClassModel, ClassRegistry, DomainObject, MarkerKind, MemberKind, MemberModel, SharedObject,
};
pub use facet::{CallbackKind, Facet, FacetHolder, FacetKind, FacetOwner, FacetPayload};
pub use factory::{FacetFactory, FactoryPipeline, FactoryTarget, PipelineConfig};
pub use loader::SpecificationLoader;
pub use spec::{ObjectMember, Specification};
pub use validator::{LoadCycle, MetamodelValidator, ValidationFailure, ValidationFailures, ValidatorComposite};

// =============================================================================
// RE-EXPORTS: Identity & Adapters
// =============================================================================

pub use managed::{ManagedObject, ManagedObjectState};
pub use oid::Oid;
pub use ports::{NullBridge, PersistenceBridge};
pub use provider::UnitOfWork;

// =============================================================================
// RE-EXPORTS: Object Stores
// =============================================================================

pub use storage::{MemStore, ObjectStore, RedbObjectStore};

// =============================================================================
// RE-EXPORTS: Export (metamodel snapshots)
// =============================================================================

pub use export::{MetamodelExport, SpecExport, export_metamodel, export_specification};
