//! # Facet Factory Pipeline
//!
//! A facet factory is one composition rule: it inspects a class model (or
//! one of its members) and contributes facets to the holder it is given.
//! Factories are independent, side-effect-free except for those
//! contributions, and run in a fixed, total order — the same class processed
//! twice with the same pipeline yields identical facet sets.
//!
//! Factories whose rule has an ambiguity condition also register a paired
//! visiting validator through [`FacetFactory::refine_validators`], so a
//! factory-time ambiguity (which silently omits the facet) is always
//! re-detected and reported at validation time.

use crate::class_model::{ClassModel, ClassRegistry, MemberModel};
use crate::facet::FacetHolder;
use crate::types::MetamodelError;
use crate::validator::ValidatorComposite;
use serde::Deserialize;
use std::sync::Arc;

// =============================================================================
// PROCESS CONTEXTS
// =============================================================================

/// What a factory applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryTarget {
    /// Class-level holders only.
    Classes,
    /// Member-level holders only.
    Members,
    /// Both levels.
    Both,
}

/// Context handed to a factory while processing a class-level holder.
pub struct ClassContext<'a> {
    /// The class model under composition.
    pub model: &'a Arc<ClassModel>,
    /// The full registry, for hierarchy scans.
    pub registry: &'a ClassRegistry,
    /// The class-level holder to contribute to.
    pub holder: &'a FacetHolder,
}

/// Context handed to a factory while processing a member-level holder.
pub struct MemberContext<'a> {
    /// The class model owning the member.
    pub model: &'a Arc<ClassModel>,
    /// The member model under composition.
    pub member: &'a MemberModel,
    /// The full registry, for hierarchy scans.
    pub registry: &'a ClassRegistry,
    /// The member-level holder to contribute to.
    pub holder: &'a FacetHolder,
}

// =============================================================================
// FACET FACTORY
// =============================================================================

/// One composition rule.
///
/// `process_*` returns `Err` only for internal failures; the loader logs
/// and skips the contribution, and composition continues. Ambiguity in the
/// rule itself is NOT an error: the factory omits the facet and leaves the
/// report to its paired validator.
pub trait FacetFactory: Send + Sync {
    /// Stable name, used in logs and pipeline configuration.
    fn name(&self) -> &'static str;

    /// Which holder levels this factory applies to.
    fn targets(&self) -> FactoryTarget;

    /// Contribute facets to a class-level holder.
    fn process_class(&self, ctx: &ClassContext<'_>) -> Result<(), MetamodelError> {
        let _ = ctx;
        Ok(())
    }

    /// Contribute facets to a member-level holder.
    fn process_member(&self, ctx: &MemberContext<'_>) -> Result<(), MetamodelError> {
        let _ = ctx;
        Ok(())
    }

    /// Register this factory's paired validators, if it has any.
    fn refine_validators(&self, composite: &mut ValidatorComposite) {
        let _ = composite;
    }
}

// =============================================================================
// PIPELINE CONFIGURATION
// =============================================================================

/// Configuration read once at loader construction; there is no runtime
/// reconfiguration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Names of factories to leave out of the pipeline.
    #[serde(default)]
    pub disabled_factories: Vec<String>,
}

// =============================================================================
// FACTORY PIPELINE
// =============================================================================

/// The ordered list of factories for one loader.
///
/// Order of addition is execution order and is fixed for the loader's
/// lifetime.
#[derive(Default)]
pub struct FactoryPipeline {
    factories: Vec<Box<dyn FacetFactory>>,
}

impl std::fmt::Debug for FactoryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryPipeline")
            .field("factories", &self.names())
            .finish()
    }
}

impl FactoryPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped pipeline, in its standard order.
    #[must_use]
    pub fn standard() -> Self {
        Self::configured(&PipelineConfig::default())
    }

    /// The shipped pipeline with configured factories left out.
    #[must_use]
    pub fn configured(config: &PipelineConfig) -> Self {
        let mut pipeline = Self::new();
        for factory in crate::factories::standard_factories() {
            let enabled = !config
                .disabled_factories
                .iter()
                .any(|name| name == factory.name());
            if enabled {
                pipeline.add(factory);
            }
        }
        pipeline
    }

    /// Append a factory. Order of addition is execution order.
    pub fn add(&mut self, factory: Box<dyn FacetFactory>) {
        self.factories.push(factory);
    }

    /// The factories, in execution order.
    #[must_use]
    pub fn factories(&self) -> &[Box<dyn FacetFactory>] {
        &self.factories
    }

    /// Names of the factories, in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Number of factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the pipeline is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Let every factory register its paired validators, in pipeline order.
    pub fn refine_validators(&self, composite: &mut ValidatorComposite) {
        for factory in &self.factories {
            factory.refine_validators(composite);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_order_is_stable() {
        let a = FactoryPipeline::standard();
        let b = FactoryPipeline::standard();
        assert_eq!(a.names(), b.names());
        assert!(!a.is_empty());
    }

    #[test]
    fn configured_pipeline_drops_disabled_factories() {
        let standard = FactoryPipeline::standard();
        let disabled = standard.names()[0].to_string();

        let config = PipelineConfig {
            disabled_factories: vec![disabled.clone()],
        };
        let pipeline = FactoryPipeline::configured(&config);

        assert_eq!(pipeline.len(), standard.len() - 1);
        assert!(!pipeline.names().contains(&disabled.as_str()));
    }

    #[test]
    fn unknown_disabled_names_are_ignored() {
        let config = PipelineConfig {
            disabled_factories: vec!["no-such-factory".into()],
        };
        let pipeline = FactoryPipeline::configured(&config);
        assert_eq!(pipeline.len(), FactoryPipeline::standard().len());
    }
}
