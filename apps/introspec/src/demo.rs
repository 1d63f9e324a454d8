//! # Demo Domain Model
//!
//! A small invoicing domain wired into the metamodel engine. It exists so
//! the binary has something real to compose, validate and persist:
//!
//! - `Customer` — titled entity, parent of its invoices
//! - `Invoice` — navigable parent marker on `customer`, defaulted status
//! - `CreditInvoice` — declares nothing; inherits Invoice's capabilities
//! - `Receipt` — deliberately declares TWO parent markers, so the shipped
//!   metamodel demonstrates a validation failure
//! - `Money` — value type, `AccountSummary` — viewmodel

use introspec_core::{
    ClassKind, ClassModel, ClassRegistry, DomainObject, MarkerKind, MemberModel, PropertyMap,
    SharedObject,
};
use std::sync::{Arc, PoisonError, RwLock};

fn read<T: Clone>(cell: &RwLock<T>) -> T {
    cell.read().unwrap_or_else(PoisonError::into_inner).clone()
}

// =============================================================================
// CUSTOMER
// =============================================================================

/// A customer; the navigational parent of its invoices.
#[derive(Debug, Default)]
pub struct Customer {
    /// Display name.
    pub name: RwLock<String>,
}

impl Customer {
    /// A named customer instance.
    #[must_use]
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: RwLock::new(name.to_string()),
        })
    }
}

impl DomainObject for Customer {
    fn class_name(&self) -> &str {
        "Customer"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn title(&self, accessor: &str) -> Option<String> {
        (accessor == "display_name").then(|| read(&self.name))
    }

    fn snapshot(&self) -> PropertyMap {
        PropertyMap::from([("name".to_string(), read(&self.name))])
    }
}

fn make_customer() -> SharedObject {
    Arc::new(Customer::default())
}

fn restore_customer(snapshot: &PropertyMap) -> SharedObject {
    Arc::new(Customer {
        name: RwLock::new(snapshot.get("name").cloned().unwrap_or_default()),
    })
}

// =============================================================================
// INVOICE
// =============================================================================

/// An invoice raised against a customer.
#[derive(Debug, Default)]
pub struct Invoice {
    /// Invoice number.
    pub number: RwLock<String>,
    /// Workflow status.
    pub status: RwLock<String>,
    /// The owning customer, if assigned.
    pub customer: RwLock<Option<SharedObject>>,
}

impl Invoice {
    /// An invoice already assigned to a customer.
    #[must_use]
    pub fn for_customer(number: &str, customer: SharedObject) -> Arc<Self> {
        Arc::new(Self {
            number: RwLock::new(number.to_string()),
            status: RwLock::new("new".to_string()),
            customer: RwLock::new(Some(customer)),
        })
    }
}

impl DomainObject for Invoice {
    fn class_name(&self) -> &str {
        "Invoice"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn reference(&self, accessor: &str) -> Option<SharedObject> {
        match accessor {
            "customer" => read(&self.customer),
            _ => None,
        }
    }

    fn title(&self, accessor: &str) -> Option<String> {
        (accessor == "number").then(|| read(&self.number))
    }

    fn snapshot(&self) -> PropertyMap {
        PropertyMap::from([
            ("number".to_string(), read(&self.number)),
            ("status".to_string(), read(&self.status)),
        ])
    }
}

fn make_invoice() -> SharedObject {
    Arc::new(Invoice::default())
}

fn restore_invoice(snapshot: &PropertyMap) -> SharedObject {
    Arc::new(Invoice {
        number: RwLock::new(snapshot.get("number").cloned().unwrap_or_default()),
        status: RwLock::new(snapshot.get("status").cloned().unwrap_or_default()),
        customer: RwLock::new(None),
    })
}

/// On-created lifecycle callback: stamp the initial workflow status.
fn invoice_created(pojo: &dyn DomainObject) {
    if let Some(invoice) = pojo.as_any().downcast_ref::<Invoice>() {
        *invoice
            .status
            .write()
            .unwrap_or_else(PoisonError::into_inner) = "new".to_string();
    }
}

// =============================================================================
// CREDIT INVOICE
// =============================================================================

/// A credit note. Declares no markers of its own; everything navigational
/// comes from the `Invoice` level of the hierarchy.
#[derive(Debug, Default)]
pub struct CreditInvoice {
    /// Underlying invoice state.
    pub base: Invoice,
    /// Why the credit was raised.
    pub reason: RwLock<String>,
}

impl DomainObject for CreditInvoice {
    fn class_name(&self) -> &str {
        "CreditInvoice"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn reference(&self, accessor: &str) -> Option<SharedObject> {
        self.base.reference(accessor)
    }

    fn title(&self, accessor: &str) -> Option<String> {
        self.base.title(accessor)
    }

    fn snapshot(&self) -> PropertyMap {
        let mut snapshot = self.base.snapshot();
        snapshot.insert("reason".to_string(), read(&self.reason));
        snapshot
    }
}

fn make_credit_invoice() -> SharedObject {
    Arc::new(CreditInvoice::default())
}

fn restore_credit_invoice(snapshot: &PropertyMap) -> SharedObject {
    Arc::new(CreditInvoice {
        base: Invoice {
            number: RwLock::new(snapshot.get("number").cloned().unwrap_or_default()),
            status: RwLock::new(snapshot.get("status").cloned().unwrap_or_default()),
            customer: RwLock::new(None),
        },
        reason: RwLock::new(snapshot.get("reason").cloned().unwrap_or_default()),
    })
}

// =============================================================================
// RECEIPT (DELIBERATELY AMBIGUOUS)
// =============================================================================

/// Declares parent markers on both `customer` and `invoice`, which the
/// validator reports as a conflict. Kept in the demo model so `validate`
/// has a failure to show.
#[derive(Debug, Default)]
pub struct Receipt {
    /// The paying customer.
    pub customer: RwLock<Option<SharedObject>>,
    /// The settled invoice.
    pub invoice: RwLock<Option<SharedObject>>,
}

impl DomainObject for Receipt {
    fn class_name(&self) -> &str {
        "Receipt"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn reference(&self, accessor: &str) -> Option<SharedObject> {
        match accessor {
            "customer" => read(&self.customer),
            "invoice" => read(&self.invoice),
            _ => None,
        }
    }
}

fn make_receipt() -> SharedObject {
    Arc::new(Receipt::default())
}

// =============================================================================
// VALUE & VIEWMODEL
// =============================================================================

/// Plain value type; carries no identity at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Money {
    /// Amount in minor units.
    pub cents: i64,
}

impl DomainObject for Money {
    fn class_name(&self) -> &str {
        "Money"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Viewmodel whose whole state fits in a memento string.
#[derive(Debug, Default)]
pub struct AccountSummary {
    /// Rendered summary line.
    pub line: RwLock<String>,
}

impl AccountSummary {
    /// Rebuild a summary from its memento.
    #[must_use]
    pub fn from_memento(memento: &str) -> Arc<Self> {
        Arc::new(Self {
            line: RwLock::new(memento.to_string()),
        })
    }
}

impl DomainObject for AccountSummary {
    fn class_name(&self) -> &str {
        "AccountSummary"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// =============================================================================
// REGISTRY WIRING
// =============================================================================

/// The registered demo domain.
#[must_use]
pub fn demo_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();

    registry.register(
        ClassModel::new("Customer", ClassKind::Entity)
            .with_marker_method(MarkerKind::Title, "display_name")
            .with_class_marker(MarkerKind::Auditable)
            .with_member(MemberModel::property("name").with_order(1))
            .with_member(MemberModel::collection("invoices").with_order(2))
            .with_instantiate(make_customer)
            .with_restore(restore_customer),
    );

    registry.register(
        ClassModel::new("Invoice", ClassKind::Entity)
            .with_marker_method(MarkerKind::NavigableParent, "customer")
            .with_marker_method(MarkerKind::Title, "number")
            .with_member(MemberModel::property("number").with_order(1))
            .with_member(
                MemberModel::property("status")
                    .with_default("new")
                    .with_choices("status_choices")
                    .with_order(2),
            )
            .with_member(MemberModel::collection("lines").with_order(3))
            .with_member(MemberModel::action("approve"))
            .with_instantiate(make_invoice)
            .with_restore(restore_invoice)
            .with_created_callback(invoice_created),
    );

    registry.register(
        ClassModel::new("CreditInvoice", ClassKind::Entity)
            .with_superclass("Invoice")
            .with_member(MemberModel::property("reason").with_order(4))
            .with_instantiate(make_credit_invoice)
            .with_restore(restore_credit_invoice),
    );

    registry.register(
        ClassModel::new("Receipt", ClassKind::Entity)
            .with_marker_method(MarkerKind::NavigableParent, "customer")
            .with_marker_method(MarkerKind::NavigableParent, "invoice")
            .with_member(MemberModel::property("amount"))
            .with_instantiate(make_receipt),
    );

    registry.register(ClassModel::new("Money", ClassKind::Value));

    registry.register(
        ClassModel::new("AccountSummary", ClassKind::Viewmodel)
            .with_member(MemberModel::property("line")),
    );

    registry
}

// =============================================================================
// TESTS
// =============================================================================
