//! # Metamodel Export
//!
//! Canonical, serializable snapshot of a composed metamodel, consumed by
//! inspection tooling. Determinism falls out of the descriptor model
//! itself: spec ids, member ids and facet kinds all iterate in `BTreeMap`
//! order, so exporting the same metamodel twice yields identical output.

use crate::class_model::MemberKind;
use crate::facet::{Facet, FacetKind, FacetPayload};
use crate::loader::SpecificationLoader;
use crate::spec::Specification;
use crate::types::{ClassKind, MetamodelError};
use serde::Serialize;

/// Export format version.
pub const EXPORT_VERSION: u32 = 1;

/// One exported facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetExport {
    /// The capability kind.
    pub kind: FacetKind,
    /// The capability payload.
    pub payload: FacetPayload,
}

impl From<Facet> for FacetExport {
    fn from(facet: Facet) -> Self {
        Self {
            kind: facet.kind,
            payload: facet.payload,
        }
    }
}

/// One exported member descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberExport {
    /// The member id.
    pub id: String,
    /// Property, collection or action.
    pub kind: MemberKind,
    /// The member's facets, in kind order.
    pub facets: Vec<FacetExport>,
}

/// One exported class descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecExport {
    /// The spec id.
    pub spec_id: String,
    /// The corresponding class name.
    pub class_name: String,
    /// The class sort.
    pub class_kind: ClassKind,
    /// Class-level facets, in kind order.
    pub facets: Vec<FacetExport>,
    /// Member descriptors, in member-id order.
    pub members: Vec<MemberExport>,
}

/// The whole composed metamodel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetamodelExport {
    /// Export format version.
    pub version: u32,
    /// One entry per composed class, in spec-id order.
    pub specs: Vec<SpecExport>,
}

/// Export one Specification.
#[must_use]
pub fn export_specification(spec: &Specification) -> SpecExport {
    SpecExport {
        spec_id: spec.spec_id().as_str().to_string(),
        class_name: spec.class_name().to_string(),
        class_kind: spec.class_kind(),
        facets: spec
            .facets()
            .snapshot()
            .into_values()
            .map(FacetExport::from)
            .collect(),
        members: spec
            .members()
            .iter()
            .map(|member| MemberExport {
                id: member.id().as_str().to_string(),
                kind: member.kind(),
                facets: member
                    .facets()
                    .snapshot()
                    .into_values()
                    .map(FacetExport::from)
                    .collect(),
            })
            .collect(),
    }
}

/// Compose every registered class and export the resulting metamodel.
pub fn export_metamodel(loader: &SpecificationLoader) -> Result<MetamodelExport, MetamodelError> {
    let mut specs = Vec::new();
    for id in loader.registry().spec_ids() {
        let spec = loader.specification_for(&id)?;
        specs.push(export_specification(&spec));
    }
    Ok(MetamodelExport {
        version: EXPORT_VERSION,
        specs,
    })
}

// =============================================================================
// TESTS
// =============================================================================
