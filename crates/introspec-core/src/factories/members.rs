//! # Member Metadata Facets
//!
//! Member-level rule turning declared member metadata (default literals,
//! choices providers, ordering hints) into facets on the member holder.

use crate::facet::{FacetKind, FacetPayload};
use crate::factory::{FacetFactory, FactoryTarget, MemberContext};
use crate::types::MetamodelError;

/// Attaches `Defaulted`, `Choices` and `MemberOrder` facets.
pub struct MemberMetadataFacetFactory;

impl FacetFactory for MemberMetadataFacetFactory {
    fn name(&self) -> &'static str {
        "member-metadata"
    }

    fn targets(&self) -> FactoryTarget {
        FactoryTarget::Members
    }

    fn process_member(&self, ctx: &MemberContext<'_>) -> Result<(), MetamodelError> {
        if let Some(literal) = &ctx.member.default_literal {
            ctx.holder.contribute(
                FacetKind::Defaulted,
                FacetPayload::Defaulted {
                    literal: literal.clone(),
                },
            );
        }

        if let Some(provider) = &ctx.member.choices_provider {
            ctx.holder.contribute(
                FacetKind::Choices,
                FacetPayload::Choices {
                    provider: provider.clone(),
                },
            );
        }

        if let Some(sequence) = ctx.member.order {
            ctx.holder.contribute(
                FacetKind::MemberOrder,
                FacetPayload::MemberOrder { sequence },
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
    use crate::class_model::{ClassModel, ClassRegistry, MemberModel};
    use crate::facet::{FacetHolder, FacetOwner};
    use crate::types::ClassKind;

    #[test]
    fn declared_metadata_becomes_facets() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Invoice", ClassKind::Entity).with_member(
                MemberModel::property("status")
                    .with_default("draft")
                    .with_choices("status_choices")
                    .with_order(2),
            ),
        );

        let model = registry.by_name("Invoice").expect("registered");
        let member = &model.members()[0];
        let holder = FacetHolder::new(FacetOwner::member(model.spec_id(), member.id.clone()));
        let ctx = MemberContext {
            model: &model,
            member,
            registry: &registry,
            holder: &holder,
        };
        MemberMetadataFacetFactory
            .process_member(&ctx)
            .expect("process");

        assert_eq!(holder.len(), 3);
        assert_eq!(
            holder.facet(FacetKind::Defaulted).map(|f| f.payload),
            Some(FacetPayload::Defaulted {
                literal: "draft".into()
            })
        );
        assert_eq!(
            holder.facet(FacetKind::MemberOrder).map(|f| f.payload),
            Some(FacetPayload::MemberOrder { sequence: 2 })
        );
    }

    #[test]
    fn bare_member_gets_no_facets() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Invoice", ClassKind::Entity)
                .with_member(MemberModel::action("approve")),
        );

        let model = registry.by_name("Invoice").expect("registered");
        let member = &model.members()[0];
        let holder = FacetHolder::new(FacetOwner::member(model.spec_id(), member.id.clone()));
        let ctx = MemberContext {
            model: &model,
            member,
            registry: &registry,
            holder: &holder,
        };
        MemberMetadataFacetFactory
            .process_member(&ctx)
            .expect("process");

        assert!(holder.is_empty());
    }
}
