//! # Shipped Composition Rules
//!
//! The factories that make up the standard pipeline, in their standard
//! order. Rules with an ambiguity condition (navigable parent, title)
//! carry the dual check: the factory silently omits the facet, and its
//! paired validator re-runs the same search and reports the conflict.

mod members;
mod navigable_parent;
mod object_markers;
mod title;

pub use members::MemberMetadataFacetFactory;
pub use navigable_parent::{NavigableParentAmbiguityValidator, NavigableParentFacetFactory};
pub use object_markers::{
    AuditableFacetFactory, LifecycleCallbackFacetFactory, PersistableFacetFactory,
};
pub use title::{TitleAmbiguityValidator, TitleFacetFactory};

use crate::class_model::{ClassModel, ClassRegistry, MarkerKind, MarkerSource};
use crate::factory::FacetFactory;
use crate::types::SpecId;
use std::sync::Arc;

/// The standard pipeline contents, in execution order.
#[must_use]
pub fn standard_factories() -> Vec<Box<dyn FacetFactory>> {
    vec![
        Box::new(NavigableParentFacetFactory),
        Box::new(TitleFacetFactory),
        Box::new(AuditableFacetFactory),
        Box::new(PersistableFacetFactory),
        Box::new(LifecycleCallbackFacetFactory),
        Box::new(MemberMetadataFacetFactory),
    ]
}

/// Find the first hierarchy level (most-derived first) that declares at
/// least one source of the given marker kind.
///
/// Returns that level's model together with its declared sources. Levels
/// are concrete superclass-chain entries only; there is no interface/trait
/// scan. Returns `None` when no level declares a source — the capability is
/// simply absent.
#[must_use]
pub(crate) fn first_declaring_level(
    registry: &ClassRegistry,
    id: &SpecId,
    kind: MarkerKind,
) -> Option<(Arc<ClassModel>, Vec<MarkerSource>)> {
    for level in registry.hierarchy(id) {
        let sources: Vec<MarkerSource> =
            level.markers_of(kind).into_iter().cloned().collect();
        if !sources.is_empty() {
            return Some((level, sources));
        }
    }
    None
}
