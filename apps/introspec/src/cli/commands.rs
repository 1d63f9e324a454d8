//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::demo::{self, Customer};
use introspec_core::{
    FactoryPipeline, MemStore, MetamodelError, ObjectStore, PersistenceBridge, PipelineConfig,
    RedbObjectStore, SpecId, SpecificationLoader, UnitOfWork, ValidatorComposite, export_metamodel,
    export_specification,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Validate an input file path.
///
/// Canonicalizes the path to resolve symlinks and "..", ensures it exists
/// and is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MetamodelError> {
    let canonical = path.canonicalize().map_err(|e| {
        MetamodelError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MetamodelError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, MetamodelError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        MetamodelError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    let filename = path
        .file_name()
        .ok_or_else(|| MetamodelError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// LOADER CONSTRUCTION
// =============================================================================

/// Build the loader over the demo domain, honoring an optional pipeline
/// configuration file. Configuration is read exactly once, here.
pub fn build_loader(config: Option<&Path>) -> Result<Arc<SpecificationLoader>, MetamodelError> {
    let pipeline = match config {
        Some(path) => {
            let path = validate_file_path(path)?;
            let text = std::fs::read_to_string(&path)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            let config: PipelineConfig = toml::from_str(&text)
                .map_err(|e| MetamodelError::SerializationError(e.to_string()))?;
            tracing::info!(
                disabled = config.disabled_factories.len(),
                "pipeline configuration loaded"
            );
            FactoryPipeline::configured(&config)
        }
        None => FactoryPipeline::standard(),
    };

    Ok(Arc::new(SpecificationLoader::with_pipeline(
        demo::demo_registry(),
        pipeline,
        ValidatorComposite::new(),
    )))
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Compose the whole metamodel, run the validation cycle and report
/// failures. Returns the number of recorded failures.
pub fn cmd_validate(
    loader: &SpecificationLoader,
    json_mode: bool,
) -> Result<usize, MetamodelError> {
    let composed = loader.compose_all()?;
    let failures = loader.run_validation();

    if json_mode {
        let report = serde_json::json!({
            "composed": composed,
            "failures": failures.entries(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| MetamodelError::SerializationError(e.to_string()))?
        );
        return Ok(failures.len());
    }

    println!("Composed {} specifications.", composed);
    if failures.is_empty() {
        println!("Metamodel valid: no failures recorded.");
    } else {
        println!("Validation failures ({}):", failures.len());
        for failure in failures.entries() {
            println!("  {}: {}", failure.spec, failure.message);
        }
    }
    Ok(failures.len())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Print the composed Specification for one class.
pub fn cmd_inspect(
    loader: &SpecificationLoader,
    class: &str,
    json_mode: bool,
) -> Result<(), MetamodelError> {
    let spec = loader.specification_for(&SpecId::new(class))?;
    let export = export_specification(&spec);

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&export)
                .map_err(|e| MetamodelError::SerializationError(e.to_string()))?
        );
        return Ok(());
    }

    println!("{} ({:?})", export.class_name, export.class_kind);
    println!("  facets:");
    for facet in &export.facets {
        println!("    {:?}", facet.payload);
    }
    println!("  members:");
    for member in &export.members {
        println!("    {} ({:?}), {} facet(s)", member.id, member.kind, member.facets.len());
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the whole composed metamodel as JSON, to a file or stdout.
pub fn cmd_export(
    loader: &SpecificationLoader,
    output: Option<&Path>,
) -> Result<(), MetamodelError> {
    let export = export_metamodel(loader)?;
    let json = serde_json::to_string_pretty(&export)
        .map_err(|e| MetamodelError::SerializationError(e.to_string()))?;

    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, json).map_err(|e| MetamodelError::IoError(e.to_string()))?;
            println!(
                "Exported {} specifications to {}",
                export.specs.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

// =============================================================================
// DEMO COMMAND
// =============================================================================

/// Walk an invoice through its identity lifecycle: new transient instance,
/// make-persistent, fetch back by Oid, destroy.
pub fn cmd_demo(
    loader: &Arc<SpecificationLoader>,
    database: Option<&Path>,
) -> Result<(), MetamodelError> {
    let store: Arc<dyn ObjectStore> = match database {
        Some(path) => {
            println!("Using redb object store at {}", path.display());
            Arc::new(RedbObjectStore::open(path, loader.clone())?)
        }
        None => {
            println!("Using in-memory object store");
            Arc::new(MemStore::new(loader.clone()))
        }
    };
    let bridge: Arc<dyn PersistenceBridge> = store.clone();
    let mut uow = UnitOfWork::new(loader.clone(), bridge);

    // A customer, persisted first so the invoice has a navigable parent.
    let customer = Customer::named("ACME Corp");
    let customer_adapter = uow
        .adapter_for(Some(customer.clone()))?
        .ok_or_else(|| MetamodelError::UnknownClass(SpecId::new("Customer")))?;
    println!(
        "customer: state={:?} title={:?}",
        customer_adapter.state(),
        customer_adapter.title()
    );
    let customer_oid = store.make_persistent(&customer_adapter)?;
    println!("customer persisted as {}", customer_oid);

    // A brand-new invoice via the metamodel's constructor hook.
    let invoice_spec = loader.specification_for(&SpecId::new("Invoice"))?;
    let invoice_adapter = uow.new_transient_instance(&invoice_spec)?;
    println!(
        "invoice created: state={:?} oid={:?}",
        invoice_adapter.state(),
        invoice_adapter.oid()
    );

    let invoice_pojo = invoice_adapter.pojo();
    if let Some(invoice) = invoice_pojo.as_any().downcast_ref::<demo::Invoice>() {
        *invoice
            .number
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = "INV-0001".to_string();
        *invoice
            .customer
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(customer);
    }

    let invoice_oid = store.make_persistent(&invoice_adapter)?;
    println!(
        "invoice persisted as {} (title={:?})",
        invoice_oid,
        invoice_adapter.title()
    );
    if let Some(parent) = invoice_adapter.navigable_parent() {
        println!(
            "invoice navigates to parent {:?}",
            parent.title("display_name")
        );
    }

    // Round-trip through the store.
    let fetched = store
        .fetch_by_oid(&invoice_oid)?
        .ok_or_else(|| MetamodelError::IoError("stored invoice vanished".to_string()))?;
    let fetched_adapter = uow
        .adapter_for(Some(fetched))?
        .ok_or_else(|| MetamodelError::UnknownClass(SpecId::new("Invoice")))?;
    println!(
        "fetched by oid: state={:?} title={:?}",
        fetched_adapter.state(),
        fetched_adapter.title()
    );

    // And destroy the original.
    store.destroy(&invoice_adapter)?;
    println!("invoice destroyed: state={:?}", invoice_adapter.state());

    println!("live stored instances: {}", store.count()?);
    Ok(())
}
