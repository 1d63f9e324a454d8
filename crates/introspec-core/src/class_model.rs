//! # Class Model Registry
//!
//! The registered introspection substitute: instead of runtime reflection,
//! every domain class is described once, at startup, by an explicit
//! [`ClassModel`] listing its sort, superclass, members, marker sources,
//! invocable accessors and constructor hooks. The composition pipeline reads
//! these models; it never inspects a live instance.
//!
//! The class hierarchy is represented explicitly: [`ClassRegistry`] resolves
//! each class's ancestor chain (most-derived first) once and caches it, so
//! "first hierarchy level declaring a source" searches are plain linear
//! scans over that chain.

use crate::facet::CallbackKind;
use crate::types::{ClassKind, MemberId, PropertyMap, SpecId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// DOMAIN OBJECT SURFACE
// =============================================================================

/// The instance surface the core sees.
///
/// Domain objects stay plain; the core only needs a class name to resolve a
/// Specification, name-keyed access for the accessors its facets record, and
/// a flat snapshot for object stores. Implementors that hold mutable state
/// use interior mutability — managed objects are shared within a unit of
/// work.
pub trait DomainObject: std::fmt::Debug + Send + Sync + 'static {
    /// The registered class name of this instance.
    fn class_name(&self) -> &str;

    /// Downcast support for collaborators that know the concrete type
    /// (lifecycle callbacks, object stores).
    fn as_any(&self) -> &dyn std::any::Any;

    /// Invoke a reference-typed accessor by name (e.g. a navigational
    /// parent accessor). Returns `None` for unknown accessors or absent
    /// references.
    fn reference(&self, accessor: &str) -> Option<SharedObject> {
        let _ = accessor;
        None
    }

    /// Invoke a title accessor by name.
    fn title(&self, accessor: &str) -> Option<String> {
        let _ = accessor;
        None
    }

    /// Flat snapshot of this instance's state, for object stores.
    fn snapshot(&self) -> PropertyMap {
        PropertyMap::new()
    }
}

/// Shared handle to a live domain instance.
///
/// Adapter identity is reference-based: two handles are "the same pojo" iff
/// they point at the same allocation.
pub type SharedObject = Arc<dyn DomainObject>;

/// Constructor hook: build a new, default-initialized instance.
pub type InstantiateFn = fn() -> SharedObject;

/// Restore hook: rehydrate an instance from a stored snapshot.
pub type RestoreFn = fn(&PropertyMap) -> SharedObject;

/// Lifecycle callback hook, invoked with the affected instance.
pub type CallbackFn = fn(&dyn DomainObject);

// =============================================================================
// MEMBERS
// =============================================================================

/// The kind of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberKind {
    /// Single-valued association or value field.
    Property,
    /// Multi-valued association.
    Collection,
    /// Invocable behavior.
    Action,
}

/// Declared description of one member of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberModel {
    /// Member identifier, unique within the class.
    pub id: MemberId,
    /// Property, collection or action.
    pub kind: MemberKind,
    /// Declared default value literal, if any.
    pub default_literal: Option<String>,
    /// Declared choices-provider method name, if any.
    pub choices_provider: Option<String>,
    /// Explicit ordering hint, if any.
    pub order: Option<u32>,
}

impl MemberModel {
    /// Describe a property.
    #[must_use]
    pub fn property(id: impl Into<String>) -> Self {
        Self::new(id, MemberKind::Property)
    }

    /// Describe a collection.
    #[must_use]
    pub fn collection(id: impl Into<String>) -> Self {
        Self::new(id, MemberKind::Collection)
    }

    /// Describe an action.
    #[must_use]
    pub fn action(id: impl Into<String>) -> Self {
        Self::new(id, MemberKind::Action)
    }

    fn new(id: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            id: MemberId::new(id),
            kind,
            default_literal: None,
            choices_provider: None,
            order: None,
        }
    }

    /// Declare a default value literal.
    #[must_use]
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_literal = Some(literal.into());
        self
    }

    /// Declare a choices-provider method.
    #[must_use]
    pub fn with_choices(mut self, provider: impl Into<String>) -> Self {
        self.choices_provider = Some(provider.into());
        self
    }

    /// Declare an explicit ordering position.
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

// =============================================================================
// MARKER SOURCES
// =============================================================================

/// Capability markers a class can declare.
///
/// These stand in for the source-level annotations of the original domain
/// classes; the registry records where each marker was declared so hierarchy
/// scans can find the first declaring level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Marks the accessor yielding the navigational parent.
    NavigableParent,
    /// Marks the accessor yielding the title.
    Title,
    /// Marks the whole class as auditable.
    Auditable,
}

/// Where a marker is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTarget {
    /// Declared on a method; the method is the accessor.
    Method(String),
    /// Declared on a field; the accessor must be derived from the field name
    /// and may not exist.
    Field(String),
    /// Declared on the class itself; no accessor is involved.
    Class,
}

/// One declared marker on one class level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSource {
    /// Which capability the marker declares.
    pub kind: MarkerKind,
    /// The declaration site.
    pub target: SourceTarget,
}

// =============================================================================
// CLASS MODEL
// =============================================================================

/// Declared description of one domain class.
///
/// This is pure data plus constructor hooks; it carries no composed facets.
/// The Specification Loader turns it into a Specification.
pub struct ClassModel {
    name: String,
    kind: ClassKind,
    superclass: Option<SpecId>,
    members: Vec<MemberModel>,
    markers: Vec<MarkerSource>,
    accessors: BTreeSet<String>,
    instantiate: Option<InstantiateFn>,
    restore: Option<RestoreFn>,
    created: Option<CallbackFn>,
}

impl std::fmt::Debug for ClassModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassModel")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("members", &self.members.len())
            .field("markers", &self.markers.len())
            .finish_non_exhaustive()
    }
}

impl ClassModel {
    /// Describe a class of the given sort.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            members: Vec::new(),
            markers: Vec::new(),
            accessors: BTreeSet::new(),
            instantiate: None,
            restore: None,
            created: None,
        }
    }

    /// Declare the immediate superclass.
    #[must_use]
    pub fn with_superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(SpecId::new(name));
        self
    }

    /// Declare a member.
    #[must_use]
    pub fn with_member(mut self, member: MemberModel) -> Self {
        self.members.push(member);
        self
    }

    /// Declare a marker on a method.
    #[must_use]
    pub fn with_marker_method(mut self, kind: MarkerKind, method: impl Into<String>) -> Self {
        let method = method.into();
        self.accessors.insert(method.clone());
        self.markers.push(MarkerSource {
            kind,
            target: SourceTarget::Method(method),
        });
        self
    }

    /// Declare a marker on a field. The accessor is derived from the field
    /// name and only resolves if the class also declares that accessor.
    #[must_use]
    pub fn with_marker_field(mut self, kind: MarkerKind, field: impl Into<String>) -> Self {
        self.markers.push(MarkerSource {
            kind,
            target: SourceTarget::Field(field.into()),
        });
        self
    }

    /// Declare a class-level marker (no accessor involved).
    #[must_use]
    pub fn with_class_marker(mut self, kind: MarkerKind) -> Self {
        self.markers.push(MarkerSource {
            kind,
            target: SourceTarget::Class,
        });
        self
    }

    /// Declare an invocable accessor name.
    #[must_use]
    pub fn with_accessor(mut self, name: impl Into<String>) -> Self {
        self.accessors.insert(name.into());
        self
    }

    /// Register the constructor hook for new transient instances.
    #[must_use]
    pub fn with_instantiate(mut self, f: InstantiateFn) -> Self {
        self.instantiate = Some(f);
        self
    }

    /// Register the restore hook for stored snapshots.
    #[must_use]
    pub fn with_restore(mut self, f: RestoreFn) -> Self {
        self.restore = Some(f);
        self
    }

    /// Register the on-created lifecycle callback.
    #[must_use]
    pub fn with_created_callback(mut self, f: CallbackFn) -> Self {
        self.created = Some(f);
        self
    }

    /// The class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The spec id, derived from the class name.
    #[must_use]
    pub fn spec_id(&self) -> SpecId {
        SpecId::new(&self.name)
    }

    /// The class sort.
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// The declared immediate superclass, if any.
    #[must_use]
    pub fn superclass(&self) -> Option<&SpecId> {
        self.superclass.as_ref()
    }

    /// The declared members.
    #[must_use]
    pub fn members(&self) -> &[MemberModel] {
        &self.members
    }

    /// Markers of the given kind declared directly on this class level.
    #[must_use]
    pub fn markers_of(&self, kind: MarkerKind) -> Vec<&MarkerSource> {
        self.markers.iter().filter(|m| m.kind == kind).collect()
    }

    /// Resolve a marker source to an invocable accessor name.
    ///
    /// Method sources resolve to themselves. Field sources resolve to the
    /// accessor derived from the field name, but only if the class declares
    /// that accessor; otherwise the capability is simply absent.
    #[must_use]
    pub fn resolve_accessor(&self, source: &MarkerSource) -> Option<String> {
        match &source.target {
            SourceTarget::Method(name) => Some(name.clone()),
            SourceTarget::Field(field) => self.accessors.contains(field).then(|| field.clone()),
            SourceTarget::Class => None,
        }
    }

    /// The constructor hook, if registered.
    #[must_use]
    pub fn instantiate_hook(&self) -> Option<InstantiateFn> {
        self.instantiate
    }

    /// The restore hook, if registered.
    #[must_use]
    pub fn restore_hook(&self) -> Option<RestoreFn> {
        self.restore
    }

    /// The callback registered for the given lifecycle event, if any.
    #[must_use]
    pub fn callback(&self, kind: CallbackKind) -> Option<CallbackFn> {
        match kind {
            CallbackKind::Created => self.created,
        }
    }
}

// =============================================================================
// CLASS REGISTRY
// =============================================================================

/// All registered class models, keyed by spec id.
///
/// The registry is filled at startup and read-only afterwards. Ancestor
/// chains are resolved on first use and cached; recomputation is idempotent,
/// so the cache needs no claim protocol.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<SpecId, Arc<ClassModel>>,
    chains: RwLock<BTreeMap<SpecId, Arc<Vec<SpecId>>>>,
}

impl ClassRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class model. Re-registering a name replaces the earlier
    /// model and drops all cached chains.
    pub fn register(&mut self, model: ClassModel) -> SpecId {
        let id = model.spec_id();
        self.classes.insert(id.clone(), Arc::new(model));
        self.chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        id
    }

    /// Look up a class model by spec id.
    #[must_use]
    pub fn get(&self, id: &SpecId) -> Option<Arc<ClassModel>> {
        self.classes.get(id).cloned()
    }

    /// Look up a class model by class name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Arc<ClassModel>> {
        self.get(&SpecId::new(name))
    }

    /// The model describing a live instance's class.
    #[must_use]
    pub fn class_of(&self, pojo: &dyn DomainObject) -> Option<Arc<ClassModel>> {
        self.by_name(pojo.class_name())
    }

    /// All registered spec ids, in deterministic order.
    #[must_use]
    pub fn spec_ids(&self) -> Vec<SpecId> {
        self.classes.keys().cloned().collect()
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The ancestor chain of a class: itself first, then each superclass in
    /// order. Unregistered superclasses end the chain; a cyclic declaration
    /// is cut at the first repeated id.
    #[must_use]
    pub fn ancestor_chain(&self, id: &SpecId) -> Arc<Vec<SpecId>> {
        if let Some(chain) = self
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return chain.clone();
        }

        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            if !seen.insert(current.clone()) {
                break;
            }
            let Some(model) = self.classes.get(&current) else {
                break;
            };
            chain.push(current);
            cursor = model.superclass().cloned();
        }

        let chain = Arc::new(chain);
        self.chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), chain.clone());
        chain
    }

    /// Walk the ancestor chain, most-derived first, yielding the models.
    #[must_use]
    pub fn hierarchy(&self, id: &SpecId) -> Vec<Arc<ClassModel>> {
        self.ancestor_chain(id)
            .iter()
            .filter_map(|ancestor| self.get(ancestor))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
