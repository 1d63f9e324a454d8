//! # redb-backed Object Store
//!
//! A disk-backed object store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! Rows are postcard-encoded property-map snapshots keyed by
//! `(spec id, identifier)`. Recognition of live instances is by address and
//! necessarily in-memory; tombstones and the identifier counter are
//! persisted alongside the rows.

use crate::class_model::{DomainObject, SharedObject};
use crate::loader::SpecificationLoader;
use crate::managed::{ManagedObject, ManagedObjectState};
use crate::oid::Oid;
use crate::ports::PersistenceBridge;
use crate::storage::{ObjectStore, persistent_oid_of};
use crate::types::{MetamodelError, PropertyMap};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Table for instance snapshots: (spec id, identifier) -> postcard bytes.
const OBJECTS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("objects");

/// Table for destroyed identifiers: (spec id, identifier) -> marker.
const TOMBSTONES: TableDefinition<(&str, &str), u8> = TableDefinition::new("tombstones");

/// Table for metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn instance_key(pojo: &dyn DomainObject) -> usize {
    std::ptr::from_ref(pojo).cast::<()>() as usize
}

#[derive(Debug, Default)]
struct Recognition {
    /// Instance address -> (spec id, identifier).
    recognized: BTreeMap<usize, (String, String)>,
    /// Cache of the persisted tombstone set.
    tombstones: BTreeSet<(String, String)>,
    /// Next identifier to hand out.
    next_identifier: u64,
}

/// Disk-backed object store.
pub struct RedbObjectStore {
    db: Database,
    loader: Arc<SpecificationLoader>,
    recognition: Mutex<Recognition>,
}

impl std::fmt::Debug for RedbObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let recognition = self
            .recognition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RedbObjectStore")
            .field("recognized", &recognition.recognized.len())
            .field("next_identifier", &recognition.next_identifier)
            .finish_non_exhaustive()
    }
}

impl RedbObjectStore {
    /// Open or create an object database at the given path.
    pub fn open(
        path: impl AsRef<Path>,
        loader: Arc<SpecificationLoader>,
    ) -> Result<Self, MetamodelError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(OBJECTS)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TOMBSTONES)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        }

        // Load metadata and the tombstone cache
        let read_txn = db
            .begin_read()
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;

        let next_identifier = {
            let table = read_txn
                .open_table(METADATA)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            table
                .get("next_identifier")
                .map_err(|e| MetamodelError::IoError(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        let tombstones = {
            let table = read_txn
                .open_table(TOMBSTONES)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            let mut cache = BTreeSet::new();
            for entry in table
                .iter()
                .map_err(|e| MetamodelError::IoError(e.to_string()))?
            {
                let (key, _) = entry.map_err(|e| MetamodelError::IoError(e.to_string()))?;
                let (spec, identifier) = key.value();
                cache.insert((spec.to_string(), identifier.to_string()));
            }
            cache
        };

        Ok(Self {
            db,
            loader,
            recognition: Mutex::new(Recognition {
                recognized: BTreeMap::new(),
                tombstones,
                next_identifier,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recognition> {
        self.recognition
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write one snapshot row and persist the identifier counter.
    fn write_row(
        &self,
        spec: &str,
        identifier: &str,
        snapshot: &PropertyMap,
        next_identifier: u64,
    ) -> Result<(), MetamodelError> {
        let bytes = postcard::to_allocvec(snapshot)
            .map_err(|e| MetamodelError::SerializationError(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        {
            let mut objects = write_txn
                .open_table(OBJECTS)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            objects
                .insert((spec, identifier), bytes.as_slice())
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;

            let mut metadata = write_txn
                .open_table(METADATA)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            metadata
                .insert("next_identifier", next_identifier)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MetamodelError::IoError(e.to_string()))
    }

    /// Remove one row and tombstone its identifier.
    fn remove_row(&self, spec: &str, identifier: &str) -> Result<(), MetamodelError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        {
            let mut objects = write_txn
                .open_table(OBJECTS)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            objects
                .remove((spec, identifier))
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;

            let mut tombstones = write_txn
                .open_table(TOMBSTONES)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
            tombstones
                .insert((spec, identifier), 1u8)
                .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MetamodelError::IoError(e.to_string()))
    }

    fn read_row(&self, spec: &str, identifier: &str) -> Result<Option<PropertyMap>, MetamodelError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(OBJECTS)
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        let Some(bytes) = table
            .get((spec, identifier))
            .map_err(|e| MetamodelError::IoError(e.to_string()))?
        else {
            return Ok(None);
        };
        let snapshot = postcard::from_bytes(bytes.value())
            .map_err(|e| MetamodelError::SerializationError(e.to_string()))?;
        Ok(Some(snapshot))
    }
}

impl PersistenceBridge for RedbObjectStore {
    fn is_recognized(&self, pojo: &dyn DomainObject) -> bool {
        self.lock().recognized.contains_key(&instance_key(pojo))
    }

    fn identifier_for(&self, pojo: &dyn DomainObject) -> Option<String> {
        self.lock()
            .recognized
            .get(&instance_key(pojo))
            .map(|(_, identifier)| identifier.clone())
    }

    fn fetch_by_oid(&self, oid: &Oid) -> Result<Option<SharedObject>, MetamodelError> {
        let Some(identifier) = oid.identifier() else {
            return Ok(None);
        };
        let Some(snapshot) = self.read_row(oid.spec_id().as_str(), identifier)? else {
            return Ok(None);
        };

        let model = self
            .loader
            .registry()
            .get(oid.spec_id())
            .ok_or_else(|| MetamodelError::UnknownClass(oid.spec_id().clone()))?;
        let restore = model
            .restore_hook()
            .ok_or_else(|| MetamodelError::NotRestorable(oid.spec_id().clone()))?;

        let pojo = restore(&snapshot);
        self.lock().recognized.insert(
            instance_key(pojo.as_ref()),
            (
                oid.spec_id().as_str().to_string(),
                identifier.to_string(),
            ),
        );
        Ok(Some(pojo))
    }

    fn state_of(&self, pojo: &dyn DomainObject) -> ManagedObjectState {
        let recognition = self.lock();
        match recognition.recognized.get(&instance_key(pojo)) {
            Some(key) if recognition.tombstones.contains(key) => ManagedObjectState::Removed,
            Some(_) => ManagedObjectState::Persistent,
            None => ManagedObjectState::Transient,
        }
    }
}

impl ObjectStore for RedbObjectStore {
    fn make_persistent(&self, managed: &ManagedObject) -> Result<Oid, MetamodelError> {
        if !managed
            .state()
            .can_transition_to(ManagedObjectState::Persistent)
        {
            return Err(MetamodelError::IllegalTransition {
                from: managed.state(),
                to: ManagedObjectState::Persistent,
            });
        }

        let spec = managed.specification().spec_id().as_str().to_string();
        let pojo = managed.pojo();

        let (identifier, next_identifier) = {
            let mut recognition = self.lock();
            recognition.next_identifier += 1;
            (
                recognition.next_identifier.to_string(),
                recognition.next_identifier,
            )
        };

        self.write_row(&spec, &identifier, &pojo.snapshot(), next_identifier)?;

        self.lock().recognized.insert(
            instance_key(pojo.as_ref()),
            (spec, identifier.clone()),
        );
        managed.mark_persistent(identifier)
    }

    fn destroy(&self, managed: &ManagedObject) -> Result<(), MetamodelError> {
        let oid = persistent_oid_of(managed)?;
        if !managed
            .state()
            .can_transition_to(ManagedObjectState::Removed)
        {
            return Err(MetamodelError::IllegalTransition {
                from: managed.state(),
                to: ManagedObjectState::Removed,
            });
        }

        let spec = oid.spec_id().as_str().to_string();
        let identifier = oid.identifier().unwrap_or_default().to_string();

        self.remove_row(&spec, &identifier)?;
        self.lock().tombstones.insert((spec, identifier));
        managed.mark_removed()
    }

    fn count(&self) -> Result<usize, MetamodelError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(OBJECTS)
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        let len = table
            .len()
            .map_err(|e| MetamodelError::IoError(e.to_string()))?;
        Ok(usize::try_from(len).unwrap_or(usize::MAX))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_model::{ClassModel, ClassRegistry};
    use crate::provider::UnitOfWork;
    use crate::types::ClassKind;
    use std::sync::RwLock;

    #[derive(Debug, Default)]
    struct Product {
        sku: RwLock<String>,
    }

    impl DomainObject for Product {
        fn class_name(&self) -> &str {
            "Product"
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn snapshot(&self) -> PropertyMap {
            PropertyMap::from([(
                "sku".to_string(),
                self.sku.read().unwrap_or_else(PoisonError::into_inner).clone(),
            )])
        }
    }

    fn make_product() -> SharedObject {
        Arc::new(Product::default())
    }

    fn restore_product(snapshot: &PropertyMap) -> SharedObject {
        Arc::new(Product {
            sku: RwLock::new(snapshot.get("sku").cloned().unwrap_or_default()),
        })
    }

    fn loader() -> Arc<SpecificationLoader> {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassModel::new("Product", ClassKind::Entity)
                .with_instantiate(make_product)
                .with_restore(restore_product),
        );
        Arc::new(SpecificationLoader::new(registry))
    }

    #[test]
    fn snapshots_survive_reopening_the_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("objects.redb");
        let loader = loader();

        let oid = {
            let store = Arc::new(RedbObjectStore::open(&path, loader.clone()).expect("open"));
            let mut uow = UnitOfWork::new(loader.clone(), store.clone());
            let pojo = Arc::new(Product {
                sku: RwLock::new("SKU-7".into()),
            });
            let adapter = uow
                .adapter_for(Some(pojo))
                .expect("adapter")
                .expect("some");
            store.make_persistent(&adapter).expect("persist")
        };

        let reopened = RedbObjectStore::open(&path, loader).expect("reopen");
        let fetched = reopened
            .fetch_by_oid(&oid)
            .expect("fetch")
            .expect("stored row");
        assert_eq!(
            fetched.snapshot().get("sku").map(String::as_str),
            Some("SKU-7")
        );
        assert_eq!(reopened.count().expect("count"), 1);
    }

    #[test]
    fn identifier_counter_survives_reopening() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("objects.redb");
        let loader = loader();

        {
            let store = Arc::new(RedbObjectStore::open(&path, loader.clone()).expect("open"));
            let mut uow = UnitOfWork::new(loader.clone(), store.clone());
            let adapter = uow
                .adapter_for(Some(make_product()))
                .expect("adapter")
                .expect("some");
            let oid = store.make_persistent(&adapter).expect("persist");
            assert_eq!(oid.identifier(), Some("1"));
        }

        let store = Arc::new(RedbObjectStore::open(&path, loader.clone()).expect("reopen"));
        let mut uow = UnitOfWork::new(loader, store.clone());
        let adapter = uow
            .adapter_for(Some(make_product()))
            .expect("adapter")
            .expect("some");
        let oid = store.make_persistent(&adapter).expect("persist");
        assert_eq!(oid.identifier(), Some("2"));
    }

    #[test]
    fn destroy_is_durable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("objects.redb");
        let loader = loader();

        let oid = {
            let store = Arc::new(RedbObjectStore::open(&path, loader.clone()).expect("open"));
            let mut uow = UnitOfWork::new(loader.clone(), store.clone());
            let adapter = uow
                .adapter_for(Some(make_product()))
                .expect("adapter")
                .expect("some");
            let oid = store.make_persistent(&adapter).expect("persist");
            store.destroy(&adapter).expect("destroy");
            assert_eq!(adapter.state(), ManagedObjectState::Removed);
            oid
        };

        let reopened = RedbObjectStore::open(&path, loader).expect("reopen");
        assert!(reopened.fetch_by_oid(&oid).expect("fetch").is_none());
        assert_eq!(reopened.count().expect("count"), 0);
    }
}
