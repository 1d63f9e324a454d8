//! # Navigable-Parent Resolution
//!
//! Finds the single accessor that yields a class's logical navigational
//! parent. The search walks the ancestor chain most-derived first and stops
//! at the first level declaring at least one parent marker:
//!
//! - exactly one source at that level: a `NavigableParent` facet is attached,
//!   bound to the resolved accessor;
//! - more than one source: no facet — the conflict is reported by the paired
//!   validator, never raised during composition;
//! - a field source with no derivable accessor: treated as "no parent
//!   resolvable", not an error.

use crate::class_model::{ClassRegistry, MarkerKind};
use crate::facet::{FacetKind, FacetPayload};
use crate::factories::first_declaring_level;
use crate::factory::{ClassContext, FacetFactory, FactoryTarget};
use crate::spec::Specification;
use crate::types::MetamodelError;
use crate::validator::{MetamodelValidator, ValidationFailures, ValidatorComposite};

// =============================================================================
// FACTORY
// =============================================================================

/// Attaches the `NavigableParent` facet.
pub struct NavigableParentFacetFactory;

impl FacetFactory for NavigableParentFacetFactory {
    fn name(&self) -> &'static str {
        "navigable-parent"
    }

    fn targets(&self) -> FactoryTarget {
        FactoryTarget::Classes
    }

    fn process_class(&self, ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
        let Some((level, sources)) = first_declaring_level(
            ctx.registry,
            &ctx.model.spec_id(),
            MarkerKind::NavigableParent,
        ) else {
            return Ok(()); // no parent resolvable
        };

        if sources.len() > 1 {
            // Deferred to metamodel validation; attaching either candidate
            // would silently pick a winner.
            return Ok(());
        }

        let Some(accessor) = level.resolve_accessor(&sources[0]) else {
            return Ok(()); // no accessor derivable: no parent resolvable
        };

        ctx.holder.contribute(
            FacetKind::NavigableParent,
            FacetPayload::NavigableParent { accessor },
        );
        Ok(())
    }

    fn refine_validators(&self, composite: &mut ValidatorComposite) {
        composite.add(Box::new(NavigableParentAmbiguityValidator));
    }
}

// =============================================================================
// PAIRED VALIDATOR
// =============================================================================

/// Re-runs the factory's "first declaring level" search and reports levels
/// that declare more than one parent marker.
///
/// The failure is recorded against the declaring level (the class that
/// actually carries the conflicting markers), and only once per level, no
/// matter how many of its subclasses were composed.
pub struct NavigableParentAmbiguityValidator;

impl MetamodelValidator for NavigableParentAmbiguityValidator {
    fn name(&self) -> &'static str {
        "navigable-parent-ambiguity"
    }

    fn visit(
        &self,
        spec: &Specification,
        registry: &ClassRegistry,
        failures: &mut ValidationFailures,
    ) -> bool {
        let Some((level, sources)) =
            first_declaring_level(registry, spec.spec_id(), MarkerKind::NavigableParent)
        else {
            return true; // no conflict
        };

        if sources.len() > 1 {
            let level_id = level.spec_id();
            let message = format!(
                "{}: conflict for determining a strategy for retrieval of the navigable \
                 parent; {} marker sources declared on one hierarchy level, while at most \
                 one is allowed",
                level.name(),
                sources.len()
            );
            let already_recorded = failures
                .for_spec(&level_id)
                .iter()
                .any(|f| f.message == message);
            if !already_recorded {
                failures.add(&level_id, message);
            }
        }

        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
