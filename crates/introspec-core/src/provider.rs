//! # Object Adapter Provider
//!
//! A `UnitOfWork` obtains or creates managed objects for the instances it
//! encounters and guarantees identity-map semantics while it lives: the same
//! instance (by reference, not by value) always resolves to the same
//! adapter.
//!
//! The identity map belongs to exactly one unit of work and is never shared
//! across concurrent ones, so the API takes `&mut self` and needs no
//! internal synchronization. Dropping the unit of work ends the validity of
//! every adapter it handed out.

use crate::class_model::{ClassModel, SharedObject};
use crate::facet::{CallbackKind, FacetKind};
use crate::loader::SpecificationLoader;
use crate::managed::{ManagedObject, ManagedObjectState};
use crate::oid::Oid;
use crate::ports::PersistenceBridge;
use crate::spec::Specification;
use crate::types::{ClassKind, MemberId, MetamodelError, SpecId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identity-map key: the address of the shared allocation. Two handles to
/// the same instance agree; two equal-by-value instances do not.
fn pojo_key(pojo: &SharedObject) -> usize {
    Arc::as_ptr(pojo).cast::<()>() as usize
}

/// The adapter provider for one unit of work.
pub struct UnitOfWork {
    loader: Arc<SpecificationLoader>,
    bridge: Arc<dyn PersistenceBridge>,
    identity_map: BTreeMap<usize, Arc<ManagedObject>>,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("adapters", &self.identity_map.len())
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Open a unit of work over the given loader and persistence bridge.
    #[must_use]
    pub fn new(loader: Arc<SpecificationLoader>, bridge: Arc<dyn PersistenceBridge>) -> Self {
        Self {
            loader,
            bridge,
            identity_map: BTreeMap::new(),
        }
    }

    /// Number of adapters currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identity_map.len()
    }

    /// Whether no adapters are tracked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identity_map.is_empty()
    }

    /// The adapter for an instance.
    ///
    /// Identity-map hit by reference; otherwise resolves the Specification,
    /// determines the Oid and initial state through the persistence bridge,
    /// and tracks the fresh adapter. `None` in, `None` out: a null domain
    /// object propagates and is not an error.
    pub fn adapter_for(
        &mut self,
        pojo: Option<SharedObject>,
    ) -> Result<Option<Arc<ManagedObject>>, MetamodelError> {
        let Some(pojo) = pojo else {
            return Ok(None);
        };

        if let Some(existing) = self.identity_map.get(&pojo_key(&pojo)) {
            return Ok(Some(existing.clone()));
        }

        let (model, spec) = self.resolve_spec(&pojo)?;
        let (oid, state) = match model.kind() {
            ClassKind::Value | ClassKind::Viewmodel => (None, ManagedObjectState::ValueOrViewmodel),
            ClassKind::Entity => {
                let (oid, state) = self.entity_identity(&pojo, &model)?;
                (Some(oid), state)
            }
        };

        Ok(Some(self.track(pojo, spec, oid, state)))
    }

    /// The adapter for an element reachable only through a named collection
    /// of a parent.
    ///
    /// Elements storage already recognizes resolve exactly like roots.
    /// Otherwise the parent's Oid anchors the element's identity: the
    /// derived identifier embeds the parent reference and the collection
    /// member, since such elements have no independent identifier outside
    /// that containment.
    pub fn adapter_for_collection(
        &mut self,
        pojo: SharedObject,
        parent_oid: &Oid,
        collection: &MemberId,
    ) -> Result<Arc<ManagedObject>, MetamodelError> {
        if let Some(existing) = self.identity_map.get(&pojo_key(&pojo)) {
            return Ok(existing.clone());
        }

        let parent_spec = self.loader.specification_for(parent_oid.spec_id())?;
        if parent_spec.member(collection).is_none() {
            return Err(MetamodelError::UnknownMember {
                spec: parent_oid.spec_id().clone(),
                member: collection.clone(),
            });
        }

        let (model, spec) = self.resolve_spec(&pojo)?;
        let (oid, state) = if model.kind() != ClassKind::Entity {
            (None, ManagedObjectState::ValueOrViewmodel)
        } else if self.bridge.is_recognized(pojo.as_ref()) {
            let (oid, state) = self.entity_identity(&pojo, &model)?;
            (Some(oid), state)
        } else {
            let identifier = format!("{}~{}", parent_oid, collection);
            (
                Some(Oid::persistent(model.spec_id(), identifier)),
                ManagedObjectState::Transient,
            )
        };

        Ok(self.track(pojo, spec, oid, state))
    }

    /// A brand-new, default-initialized transient instance of the given
    /// Specification's class.
    ///
    /// The instance is built by the class model's constructor hook, has its
    /// on-created lifecycle callback invoked if the composed metamodel
    /// declares one, and is returned wrapped with a fresh transient Oid.
    pub fn new_transient_instance(
        &mut self,
        spec: &Arc<Specification>,
    ) -> Result<Arc<ManagedObject>, MetamodelError> {
        let model = self
            .loader
            .registry()
            .get(spec.spec_id())
            .ok_or_else(|| MetamodelError::UnknownClass(spec.spec_id().clone()))?;
        let instantiate = model
            .instantiate_hook()
            .ok_or_else(|| MetamodelError::NotInstantiable(spec.spec_id().clone()))?;

        let pojo = instantiate();
        if spec.facet(FacetKind::LifecycleCreated).is_some() {
            if let Some(callback) = model.callback(CallbackKind::Created) {
                callback(pojo.as_ref());
            }
        }

        let oid = Oid::transient(spec.spec_id().clone());
        Ok(self.track(pojo, spec.clone(), Some(oid), ManagedObjectState::Transient))
    }

    /// The adapter for a viewmodel whose entire state is reconstructible
    /// from the given memento string. The memento is carried as the Oid's
    /// identifier; the state is always `ValueOrViewmodel`.
    pub fn adapter_for_viewmodel(
        &mut self,
        pojo: SharedObject,
        memento: &str,
    ) -> Result<Arc<ManagedObject>, MetamodelError> {
        if let Some(existing) = self.identity_map.get(&pojo_key(&pojo)) {
            return Ok(existing.clone());
        }

        let (model, spec) = self.resolve_spec(&pojo)?;
        let oid = Oid::persistent(model.spec_id(), memento);
        Ok(self.track(pojo, spec, Some(oid), ManagedObjectState::ValueOrViewmodel))
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn resolve_spec(
        &self,
        pojo: &SharedObject,
    ) -> Result<(Arc<ClassModel>, Arc<Specification>), MetamodelError> {
        let model = self
            .loader
            .registry()
            .class_of(pojo.as_ref())
            .ok_or_else(|| MetamodelError::UnknownClass(SpecId::new(pojo.class_name())))?;
        let spec = self.loader.specification_for(&model.spec_id())?;
        Ok((model, spec))
    }

    /// Oid and initial state for an entity instance, per the bridge.
    fn entity_identity(
        &self,
        pojo: &SharedObject,
        model: &Arc<ClassModel>,
    ) -> Result<(Oid, ManagedObjectState), MetamodelError> {
        if self.bridge.is_recognized(pojo.as_ref()) {
            let identifier = self
                .bridge
                .identifier_for(pojo.as_ref())
                .ok_or_else(|| MetamodelError::IdentityResolution(model.spec_id()))?;
            Ok((
                Oid::persistent(model.spec_id(), identifier),
                self.bridge.state_of(pojo.as_ref()),
            ))
        } else {
            Ok((
                Oid::transient(model.spec_id()),
                ManagedObjectState::Transient,
            ))
        }
    }

    fn track(
        &mut self,
        pojo: SharedObject,
        spec: Arc<Specification>,
        oid: Option<Oid>,
        state: ManagedObjectState,
    ) -> Arc<ManagedObject> {
        let key = pojo_key(&pojo);
        let adapter = Arc::new(ManagedObject::new(pojo, spec, oid, state));
        self.identity_map.insert(key, adapter.clone());
        adapter
    }
}

// =============================================================================
// TESTS
// =============================================================================
