//! # Title Resolution
//!
//! Finds the accessor that yields an object's title, with the same
//! first-declaring-level search and the same dual ambiguity check as
//! navigable-parent resolution: the factory omits the facet on conflict and
//! the paired validator reports it.

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

/// Attaches the `Title` facet.
pub struct TitleFacetFactory;

impl FacetFactory for TitleFacetFactory {
    fn name(&self) -> &'static str {
        "title"
    }

    fn targets(&self) -> FactoryTarget {
        FactoryTarget::Classes
    }

    fn process_class(&self, ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
        let Some((level, sources)) =
            first_declaring_level(ctx.registry, &ctx.model.spec_id(), MarkerKind::Title)
        else {
            return Ok(()); // untitled classes are valid
        };

        if sources.len() > 1 {
            return Ok(()); // deferred to metamodel validation
        }

        let Some(accessor) = level.resolve_accessor(&sources[0]) else {
            return Ok(());
        };

        ctx.holder
            .contribute(FacetKind::Title, FacetPayload::Title { accessor });
        Ok(())
    }

    fn refine_validators(&self, composite: &mut ValidatorComposite) {
        composite.add(Box::new(TitleAmbiguityValidator));
    }
}

// =============================================================================
// PAIRED VALIDATOR
// =============================================================================

/// Reports hierarchy levels declaring more than one title marker.
pub struct TitleAmbiguityValidator;

impl MetamodelValidator for TitleAmbiguityValidator {
    fn name(&self) -> &'static str {
        "title-ambiguity"
    }

    fn visit(
        &self,
        spec: &Specification,
        registry: &ClassRegistry,
        failures: &mut ValidationFailures,
    ) -> bool {
        let Some((level, sources)) =
            first_declaring_level(registry, spec.spec_id(), MarkerKind::Title)
        else {
            return true;
        };

        if sources.len() > 1 {
            let level_id = level.spec_id();
            let message = format!(
                "{}: conflict for determining a strategy for retrieval of the title; \
                 {} marker sources declared on one hierarchy level, while at most one \
                 is allowed",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::{ClassModel, ClassRegistry};
    use crate::facet::{FacetHolder, FacetOwner};
    use crate::types::ClassKind;

    fn process(registry: &ClassRegistry, name: &str) -> FacetHolder {
        let model = registry.by_name(name).expect("registered");
        let holder = FacetHolder::new(FacetOwner::class(model.spec_id()));
        let ctx = ClassContext {
            model: &model,
            registry,
            holder: &holder,
        };
        TitleFacetFactory.process_class(&ctx).expect("process");
        holder
    }

    #[test]
    fn single_title_marker_binds_the_accessor() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Customer", ClassKind::Entity)
                .with_marker_method(MarkerKind::Title, "display_name"),
        );

        let holder = process(&registry, "Customer");
        let facet = holder.facet(FacetKind::Title).expect("facet");
        assert_eq!(
            facet.payload,
            FacetPayload::Title {
                accessor: "display_name".into()
            }
        );
    }

    #[test]
    fn ambiguous_titles_omit_the_facet_and_fail_validation() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Customer", ClassKind::Entity)
                .with_marker_method(MarkerKind::Title, "display_name")
                .with_marker_method(MarkerKind::Title, "short_name"),
        );

        let holder = process(&registry, "Customer");
        assert!(holder.facet(FacetKind::Title).is_none());

        let spec = Specification::empty(&registry.by_name("Customer").expect("registered"));
        let mut failures = ValidationFailures::new();
        TitleAmbiguityValidator.visit(&spec, &registry, &mut failures);
        assert_eq!(failures.len(), 1);
    }
}
