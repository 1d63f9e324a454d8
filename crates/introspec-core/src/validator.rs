//! # Metamodel Validation
//!
//! Validators run after composition, once per load cycle, and record
//! conflicts instead of raising them: composition always completes, and a
//! caller driving startup decides what accumulated failures mean.
//!
//! A load cycle moves `Composing -> Validating -> Validated`. `Validated`
//! is terminal for that cycle; a hot reload starts a fresh cycle with a
//! fresh failure collection.

use crate::class_model::ClassRegistry;
use crate::spec::Specification;
use crate::types::SpecId;
use serde::Serialize;
use std::sync::Arc;

// =============================================================================
// LOAD CYCLE
// =============================================================================

/// Phase of one metamodel load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadCycle {
    /// Specifications may be registered and facets attached; no validator runs.
    Composing,
    /// Every composed Specification is being visited by every validator.
    Validating,
    /// Terminal for this cycle; failures are ready to be read.
    Validated,
}

// =============================================================================
// VALIDATION FAILURES
// =============================================================================

/// One recorded metamodel conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// The offending class.
    pub spec: SpecId,
    /// Human-readable description of the conflict.
    pub message: String,
}

/// Append-only collection of validation failures for one load cycle.
///
/// Failures are appended, never overwritten, and batch-reported at cycle
/// end rather than streamed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationFailures {
    entries: Vec<ValidationFailure>,
}

impl ValidationFailures {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure against a class.
    pub fn add(&mut self, spec: &SpecId, message: impl Into<String>) {
        self.entries.push(ValidationFailure {
            spec: spec.clone(),
            message: message.into(),
        });
    }

    /// All recorded failures, in recording order.
    #[must_use]
    pub fn entries(&self) -> &[ValidationFailure] {
        &self.entries
    }

    /// Failures recorded against one class.
    #[must_use]
    pub fn for_spec(&self, spec: &SpecId) -> Vec<&ValidationFailure> {
        self.entries.iter().filter(|f| &f.spec == spec).collect()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// VALIDATOR
// =============================================================================

/// A post-composition check over one Specification.
///
/// Validators never abort the load: they append failures and report whether
/// scanning should continue across the remaining Specifications.
pub trait MetamodelValidator: Send + Sync {
    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Visit one Specification. Returns `false` to stop this validator's
    /// scan over the remaining Specifications.
    fn visit(
        &self,
        spec: &Specification,
        registry: &ClassRegistry,
        failures: &mut ValidationFailures,
    ) -> bool;
}

// =============================================================================
// VALIDATOR COMPOSITE
// =============================================================================

/// The ordered set of validators for one loader.
///
/// Execution order is registration order and is fixed for the loader's
/// lifetime.
#[derive(Default)]
pub struct ValidatorComposite {
    validators: Vec<Box<dyn MetamodelValidator>>,
}

impl std::fmt::Debug for ValidatorComposite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorComposite")
            .field("validators", &self.names())
            .finish()
    }
}

impl ValidatorComposite {
    /// Create an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator. Order of addition is execution order.
    pub fn add(&mut self, validator: Box<dyn MetamodelValidator>) {
        self.validators.push(validator);
    }

    /// Names of the registered validators, in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no validators are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Visit every Specification with every validator, in validator
    /// registration order, appending failures. Each Specification is
    /// visited exactly once per validator.
    pub fn validate_all(
        &self,
        specs: &[Arc<Specification>],
        registry: &ClassRegistry,
        failures: &mut ValidationFailures,
    ) {
        for validator in &self.validators {
            for spec in specs {
                if !validator.visit(spec, registry, failures) {
                    break;
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::ClassModel;
    use crate::types::ClassKind;

    struct FlagEveryClass;

    impl MetamodelValidator for FlagEveryClass {
        fn name(&self) -> &'static str {
            "flag-every-class"
        }

        fn visit(
            &self,
            spec: &Specification,
            _registry: &ClassRegistry,
            failures: &mut ValidationFailures,
        ) -> bool {
            failures.add(spec.spec_id(), "flagged");
            true
        }
    }

    struct StopAfterFirst;

    impl MetamodelValidator for StopAfterFirst {
        fn name(&self) -> &'static str {
            "stop-after-first"
        }

        fn visit(
            &self,
            spec: &Specification,
            _registry: &ClassRegistry,
            failures: &mut ValidationFailures,
        ) -> bool {
            failures.add(spec.spec_id(), "visited");
            false
        }
    }

    fn two_specs() -> Vec<Arc<Specification>> {
        vec![
            Arc::new(Specification::empty(&ClassModel::new(
                "Alpha",
                ClassKind::Entity,
            ))),
            Arc::new(Specification::empty(&ClassModel::new(
                "Beta",
                ClassKind::Entity,
            ))),
        ]
    }

    #[test]
    fn failures_append_and_key_by_spec() {
        let registry = ClassRegistry::new();
        let specs = two_specs();
        let mut failures = ValidationFailures::new();

        let mut composite = ValidatorComposite::new();
        composite.add(Box::new(FlagEveryClass));
        composite.validate_all(&specs, &registry, &mut failures);

        assert_eq!(failures.len(), 2);
        assert_eq!(failures.for_spec(&SpecId::new("Alpha")).len(), 1);
    }

    #[test]
    fn returning_false_stops_that_validators_scan() {
        let registry = ClassRegistry::new();
        let specs = two_specs();
        let mut failures = ValidationFailures::new();

        let mut composite = ValidatorComposite::new();
        composite.add(Box::new(StopAfterFirst));
        composite.validate_all(&specs, &registry, &mut failures);

        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn validator_order_is_registration_order() {
        let mut composite = ValidatorComposite::new();
        composite.add(Box::new(StopAfterFirst));
        composite.add(Box::new(FlagEveryClass));
        assert_eq!(composite.names(), vec!["stop-after-first", "flag-every-class"]);
    }
}
