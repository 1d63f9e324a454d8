//! # Specification Loader
//!
//! Builds and caches one Specification per class on first request. The cache
//! is shared process-wide, write-once-per-key, read-many:
//!
//! - the slot for a class is claimed atomically *before* the factory
//!   pipeline runs, so composition of a self-referential class can observe
//!   its own in-progress descriptor;
//! - concurrent first-requests for the same class never produce two
//!   Specification instances — losers block until the winner marks the slot
//!   ready;
//! - a re-entrant lookup from the composing thread itself returns the
//!   in-progress instance instead of deadlocking.
//!
//! Composition always completes: a factory that fails internally is logged
//! and skipped, leaving a partial but usable Specification. Conflicts are
//! recorded by validators at the end of the load cycle, never raised during
//! composition.

use crate::class_model::{ClassRegistry, MemberModel};
use crate::factory::{ClassContext, FactoryPipeline, FactoryTarget, MemberContext};
use crate::spec::{ObjectMember, Specification};
use crate::types::{MemberId, MetamodelError, SpecId};
use crate::validator::{LoadCycle, ValidationFailures, ValidatorComposite};
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

// =============================================================================
// ERROR LOGGING HELPER
// =============================================================================

/// Log a skipped factory contribution.
///
/// The core avoids a logging dependency to stay minimal; warnings go to
/// stderr in a structured format. The app layer should redirect stderr to
/// its tracing setup if needed.
fn log_factory_skip(factory: &str, spec: &SpecId, member: Option<&MemberId>, err: &MetamodelError) {
    let at = match member {
        Some(member) => format!("{}#{}", spec, member),
        None => spec.to_string(),
    };
    eprintln!(
        "{{\"level\":\"warn\",\"target\":\"introspec_core::loader\",\"message\":\"facet factory '{}' skipped for {}: {}\"}}",
        factory, at, err
    );
}

// =============================================================================
// CACHE SLOTS
// =============================================================================

/// Phase of one cache slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlotPhase {
    /// Claimed; the recorded thread is running the pipeline.
    Composing(ThreadId),
    /// Composition finished; the Specification is frozen.
    Ready,
}

#[derive(Debug, Clone)]
struct Slot {
    spec: Arc<Specification>,
    phase: SlotPhase,
}

// =============================================================================
// SPECIFICATION LOADER
// =============================================================================

/// Owns the factory pipeline, the validator composite and the Specification
/// cache for one application lifecycle.
///
/// Construct one loader per process (dependency-injected, torn down with the
/// application); there is no ambient global instance.
#[derive(Debug)]
pub struct SpecificationLoader {
    registry: ClassRegistry,
    pipeline: FactoryPipeline,
    validators: ValidatorComposite,
    cache: Mutex<BTreeMap<SpecId, Slot>>,
    ready: Condvar,
    cycle: Mutex<LoadCycle>,
    failures: Mutex<ValidationFailures>,
}

impl SpecificationLoader {
    /// Create a loader over the given registry with the standard pipeline
    /// and no explicitly registered validators.
    #[must_use]
    pub fn new(registry: ClassRegistry) -> Self {
        Self::with_pipeline(registry, FactoryPipeline::standard(), ValidatorComposite::new())
    }

    /// Create a loader with an explicit pipeline and validator composite.
    ///
    /// Factories contribute their paired validators here, after the
    /// explicitly registered ones; both orders are fixed for the loader's
    /// lifetime.
    #[must_use]
    pub fn with_pipeline(
        registry: ClassRegistry,
        pipeline: FactoryPipeline,
        mut validators: ValidatorComposite,
    ) -> Self {
        pipeline.refine_validators(&mut validators);
        Self {
            registry,
            pipeline,
            validators,
            cache: Mutex::new(BTreeMap::new()),
            ready: Condvar::new(),
            cycle: Mutex::new(LoadCycle::Composing),
            failures: Mutex::new(ValidationFailures::new()),
        }
    }

    /// The class registry this loader composes from.
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Names of the pipeline's factories, in execution order.
    #[must_use]
    pub fn factory_names(&self) -> Vec<&'static str> {
        self.pipeline.names()
    }

    /// The Specification for a class, composing it on first request.
    ///
    /// Requesting the same class twice — sequentially or from concurrent
    /// threads — returns reference-identical results.
    pub fn specification_for(&self, id: &SpecId) -> Result<Arc<Specification>, MetamodelError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match cache.get(id).cloned() {
                Some(Slot {
                    spec,
                    phase: SlotPhase::Ready,
                }) => return Ok(spec),
                Some(Slot {
                    spec,
                    phase: SlotPhase::Composing(composer),
                }) => {
                    if composer == thread::current().id() {
                        // Re-entrant lookup during composition of a
                        // self-referential class: hand out the in-progress
                        // instance.
                        return Ok(spec);
                    }
                    // Another thread is composing; wait for it to finish and
                    // re-inspect. The winner's composition is never cancelled.
                    cache = self
                        .ready
                        .wait(cache)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    let model = self
                        .registry
                        .get(id)
                        .ok_or_else(|| MetamodelError::UnknownClass(id.clone()))?;

                    // Claim the slot before any factory runs.
                    let spec = Arc::new(Specification::empty(&model));
                    cache.insert(
                        id.clone(),
                        Slot {
                            spec: spec.clone(),
                            phase: SlotPhase::Composing(thread::current().id()),
                        },
                    );
                    drop(cache);

                    self.compose(&spec);

                    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Some(slot) = cache.get_mut(id) {
                        slot.phase = SlotPhase::Ready;
                    }
                    drop(cache);
                    self.ready.notify_all();
                    return Ok(spec);
                }
            }
        }
    }

    /// Resolve a Specification by its id.
    ///
    /// Composes on miss, exactly like [`Self::specification_for`]; this is
    /// the entry point persistence collaborators use to translate raw
    /// fetched instances back into the metamodel.
    pub fn lookup_by_spec_id(&self, id: &SpecId) -> Result<Arc<Specification>, MetamodelError> {
        self.specification_for(id)
    }

    /// Compose every registered class. Returns the number of Specifications
    /// now cached.
    pub fn compose_all(&self) -> Result<usize, MetamodelError> {
        for id in self.registry.spec_ids() {
            self.specification_for(&id)?;
        }
        Ok(self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len())
    }

    /// Run the factory pipeline against a freshly claimed Specification.
    ///
    /// Class-level factories first, in pipeline order; then the member set
    /// is enumerated (declared members plus inherited ones, most-derived
    /// declaration winning on id conflicts) and the member-level factories
    /// run for each.
    fn compose(&self, spec: &Arc<Specification>) {
        let Some(model) = self.registry.get(spec.spec_id()) else {
            return;
        };

        for factory in self.pipeline.factories() {
            if matches!(factory.targets(), FactoryTarget::Classes | FactoryTarget::Both) {
                let ctx = ClassContext {
                    model: &model,
                    registry: &self.registry,
                    holder: spec.facets(),
                };
                if let Err(err) = factory.process_class(&ctx) {
                    log_factory_skip(factory.name(), spec.spec_id(), None, &err);
                }
            }
        }

        for member_model in self.effective_members(spec.spec_id()).values() {
            let member = spec.add_member(ObjectMember::new(spec.spec_id(), member_model));
            for factory in self.pipeline.factories() {
                if matches!(factory.targets(), FactoryTarget::Members | FactoryTarget::Both) {
                    let ctx = MemberContext {
                        model: &model,
                        member: member_model,
                        registry: &self.registry,
                        holder: member.facets(),
                    };
                    if let Err(err) = factory.process_member(&ctx) {
                        log_factory_skip(factory.name(), spec.spec_id(), Some(member.id()), &err);
                    }
                }
            }
        }
    }

    /// The member set for a class: declared members plus inherited ones.
    fn effective_members(&self, id: &SpecId) -> BTreeMap<MemberId, MemberModel> {
        let mut members = BTreeMap::new();
        for level in self.registry.hierarchy(id) {
            for member in level.members() {
                // Most-derived declaration wins; the chain is walked
                // most-derived first.
                members
                    .entry(member.id.clone())
                    .or_insert_with(|| member.clone());
            }
        }
        members
    }

    // =========================================================================
    // VALIDATION CYCLE
    // =========================================================================

    /// The current load-cycle phase.
    #[must_use]
    pub fn cycle(&self) -> LoadCycle {
        *self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Visit every composed Specification with every registered validator,
    /// in validator-registration order, and return the accumulated failures.
    ///
    /// Failures are batch-reported: nothing is surfaced until this runs, and
    /// the returned snapshot is the whole cycle's collection. The caller
    /// driving startup decides whether failures abort or merely warn.
    pub fn run_validation(&self) -> ValidationFailures {
        {
            let mut cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
            *cycle = LoadCycle::Validating;
        }

        let specs: Vec<Arc<Specification>> = {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache
                .values()
                .filter(|slot| slot.phase == SlotPhase::Ready)
                .map(|slot| slot.spec.clone())
                .collect()
        };

        let snapshot = {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            self.validators
                .validate_all(&specs, &self.registry, &mut failures);
            failures.clone()
        };

        {
            let mut cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
            *cycle = LoadCycle::Validated;
        }
        snapshot
    }

    /// Snapshot of the failures accumulated so far in this cycle.
    #[must_use]
    pub fn failures(&self) -> ValidationFailures {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a fresh load cycle: drop every cached Specification and the
    /// failure collection, and return to `Composing`. For hot-reload
    /// scenarios; ordinary applications never call this.
    pub fn restart_cycle(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.clear();
        drop(cache);
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        *failures = ValidationFailures::new();
        drop(failures);
        let mut cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
        *cycle = LoadCycle::Composing;
    }
}

// =============================================================================
// TESTS
// =============================================================================
