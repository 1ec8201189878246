//! Record Store
//!
//! The single in-memory source of truth for products and ledger entries.
//! All writes go through the mutator methods on [`RecordStore`]; every
//! successful mutation is announced synchronously to subscribed views.

use log::{debug, info};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{demo_products, demo_transactions, Product, Transaction, TransactionType};

/// Description given to point-of-sale entries recorded without one
pub const POS_SALE_DESCRIPTION: &str = "Direct POS sale";

/// Errors returned by store mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} with id '{id}' already exists")]
    DuplicateId { kind: RecordKind, id: String },
}

/// Which collection a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Product,
    Transaction,
}

impl RecordKind {
    /// Question asked before a record of this kind is deleted
    pub fn delete_prompt(&self) -> &'static str {
        match self {
            RecordKind::Product => {
                "Are you sure you want to delete this product? This cannot be undone."
            }
            RecordKind::Transaction => {
                "Are you sure you want to delete this transaction? Deleted data cannot be recovered."
            }
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Product => write!(f, "Product"),
            RecordKind::Transaction => write!(f, "Transaction"),
        }
    }
}

/// How fresh ids are minted for a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStyle {
    /// Nine random lowercase base-36 characters
    ShortCode,
    /// `<prefix>-NNN` from a per-collection counter
    Sequence { prefix: &'static str },
}

/// A partial update for a record type
pub trait RecordPatch {
    type Target;

    /// True when the patch carries no fields
    fn is_empty(&self) -> bool;

    /// Overwrite the fields present in the patch
    fn apply_to(&self, target: &mut Self::Target);
}

/// An entity held by the store
pub trait Record: Clone + fmt::Debug {
    type Patch: RecordPatch<Target = Self>;
    const KIND: RecordKind;
    const ID_STYLE: IdStyle;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

/// Routes a record type to its collection inside the store
pub trait Stored: Record + Sized {
    fn collection(store: &RecordStore) -> &Collection<Self>;
    fn collection_mut(store: &mut RecordStore) -> &mut Collection<Self>;
}

impl Stored for Product {
    fn collection(store: &RecordStore) -> &Collection<Self> {
        &store.products
    }

    fn collection_mut(store: &mut RecordStore) -> &mut Collection<Self> {
        &mut store.products
    }
}

impl Stored for Transaction {
    fn collection(store: &RecordStore) -> &Collection<Self> {
        &store.transactions
    }

    fn collection_mut(store: &mut RecordStore) -> &mut Collection<Self> {
        &mut store.transactions
    }
}

/// A blocking yes/no prompt shown before destructive actions
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Ordered collection of one record type
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    next_number: u32,
}

impl<T: Record> Collection<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            next_number: 1,
        }
    }

    /// Records in insertion order
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|r| r.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|r| r.id() == id)
    }

    /// Mint an id that no record in the collection currently uses
    fn generate_id(&mut self) -> String {
        loop {
            let candidate = match T::ID_STYLE {
                IdStyle::ShortCode => short_code(),
                IdStyle::Sequence { prefix } => {
                    let id = format!("{}-{:03}", prefix, self.next_number);
                    self.next_number += 1;
                    id
                }
            };
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Nine base-36 characters drawn from a random UUID
fn short_code() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(9);
    for _ in 0..9 {
        code.push(std::char::from_digit((n % 36) as u32, 36).unwrap_or('0'));
        n /= 36;
    }
    code
}

/// What changed in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created { kind: RecordKind, id: String },
    Updated { kind: RecordKind, id: String },
    Deleted { kind: RecordKind, id: String },
    Imported { kind: RecordKind, count: usize },
}

impl StoreEvent {
    pub fn kind(&self) -> RecordKind {
        match self {
            StoreEvent::Created { kind, .. }
            | StoreEvent::Updated { kind, .. }
            | StoreEvent::Deleted { kind, .. }
            | StoreEvent::Imported { kind, .. } => *kind,
        }
    }
}

/// Handle returned by [`RecordStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Ids of the appended records, in file order
    pub imported: Vec<String>,
    /// Rows whose explicit id was already taken: (id in file, id assigned)
    pub rekeyed: Vec<(String, String)>,
}

impl ImportReport {
    pub fn count(&self) -> usize {
        self.imported.len()
    }
}

/// In-memory store for all products and ledger entries
pub struct RecordStore {
    products: Collection<Product>,
    transactions: Collection<Transaction>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl RecordStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            products: Collection::new(),
            transactions: Collection::new(),
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Creates a store seeded with the demo inventory and ledger
    pub fn with_demo_data() -> Self {
        let mut store = Self::new();
        store.products.items = demo_products();
        store.transactions.items = demo_transactions();
        store
    }

    pub fn products(&self) -> &[Product] {
        self.products.as_slice()
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    /// Only the SALE entries, as listed in the sales history
    pub fn sales(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.items.iter().filter(|t| t.is_sale())
    }

    /// Record a completed sale rung up at the point of sale
    pub fn record_sale(
        &mut self,
        amount: f64,
        description: impl Into<String>,
    ) -> Result<String, StoreError> {
        let description = description.into();
        let description = if description.trim().is_empty() {
            POS_SALE_DESCRIPTION.to_string()
        } else {
            description
        };
        self.create(Transaction::new(TransactionType::Sale, amount, description))
    }

    /// All records of one type in insertion order
    pub fn list<T: Stored>(&self) -> &[T] {
        T::collection(self).as_slice()
    }

    pub fn get<T: Stored>(&self, id: &str) -> Option<&T> {
        T::collection(self).get(id)
    }

    /// Register a view to be told about every mutation
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(sub, _)| *sub != id);
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Append a record, assigning a fresh id when it has none
    ///
    /// Returns the id the record is stored under.
    pub fn create<T: Stored>(&mut self, mut record: T) -> Result<String, StoreError> {
        let collection = T::collection_mut(self);
        if record.id().is_empty() {
            let id = collection.generate_id();
            record.set_id(id);
        } else if collection.contains(record.id()) {
            return Err(StoreError::DuplicateId {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }

        let id = record.id().to_string();
        collection.items.push(record);
        debug!("Created {} {}", T::KIND, id);

        self.notify(StoreEvent::Created {
            kind: T::KIND,
            id: id.clone(),
        });
        Ok(id)
    }

    /// Overwrite the patched fields of the record with the given id
    ///
    /// Unknown ids are ignored. Returns whether a record was found.
    pub fn update<T, P>(&mut self, id: &str, patch: &P) -> bool
    where
        T: Stored<Patch = P>,
        P: RecordPatch<Target = T>,
    {
        let Some(record) = T::collection_mut(self).get_mut(id) else {
            debug!("Update skipped, no {} {}", T::KIND, id);
            return false;
        };
        if patch.is_empty() {
            return true;
        }

        patch.apply_to(record);
        debug!("Updated {} {}", T::KIND, id);
        self.notify(StoreEvent::Updated {
            kind: T::KIND,
            id: id.to_string(),
        });
        true
    }

    /// Remove the record with the given id once the user confirms
    ///
    /// The prompt is only shown for ids that exist. Returns the removed
    /// record, or `None` when nothing was deleted.
    pub fn delete<T: Stored>(&mut self, id: &str, confirm: &mut impl Confirm) -> Option<T> {
        let position = T::collection(self)
            .items
            .iter()
            .position(|r| r.id() == id)?;

        if !confirm.confirm(T::KIND.delete_prompt()) {
            debug!("Deletion of {} {} cancelled", T::KIND, id);
            return None;
        }

        let removed = T::collection_mut(self).items.remove(position);
        debug!("Deleted {} {}", T::KIND, id);
        self.notify(StoreEvent::Deleted {
            kind: T::KIND,
            id: id.to_string(),
        });
        Some(removed)
    }

    /// Append parsed rows to the collection
    ///
    /// Rows without an id get a fresh one; rows whose id is already taken
    /// are re-keyed rather than dropped.
    pub fn import<T: Stored>(&mut self, rows: Vec<T>) -> ImportReport {
        let mut report = ImportReport::default();
        if rows.is_empty() {
            return report;
        }

        let collection = T::collection_mut(self);
        for mut row in rows {
            if row.id().is_empty() {
                let id = collection.generate_id();
                row.set_id(id);
            } else if collection.contains(row.id()) {
                let original = row.id().to_string();
                let id = collection.generate_id();
                row.set_id(id.clone());
                report.rekeyed.push((original, id));
            }
            report.imported.push(row.id().to_string());
            collection.items.push(row);
        }

        info!(
            "Imported {} {} record(s), {} re-keyed",
            report.count(),
            T::KIND,
            report.rekeyed.len()
        );
        self.notify(StoreEvent::Imported {
            kind: T::KIND,
            count: report.count(),
        });
        report
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("products", &self.products.len())
            .field("transactions", &self.transactions.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
