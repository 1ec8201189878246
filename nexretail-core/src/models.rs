use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{IdStyle, Record, RecordKind, RecordPatch};

/// Image shown for products that were created or imported without one
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1598327105666-5b89351aff23?auto=format&fit=crop&w=200&h=200";

/// Serial prefix used when none is supplied
pub const DEFAULT_SERIAL_PREFIX: &str = "SN";

/// Name given to imported products that have no name column
pub const UNNAMED_PRODUCT: &str = "Unnamed product";

/// Today's date in the `YYYY-MM-DD` form used by the ledger
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Product category
///
/// Values outside the known set are kept verbatim in `Other` so that an
/// imported file round-trips without losing what the user typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ProductCategory {
    Smartphone,
    Laptop,
    Tablet,
    Accessory,
    Other(String),
}

impl ProductCategory {
    /// Parse a category from its display spelling (case-insensitive)
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "smartphone" => ProductCategory::Smartphone,
            "laptop" => ProductCategory::Laptop,
            "tablet" => ProductCategory::Tablet,
            "accessory" => ProductCategory::Accessory,
            _ => ProductCategory::Other(s.to_string()),
        }
    }

    /// The categories offered by the product form
    pub fn known() -> [ProductCategory; 4] {
        [
            ProductCategory::Smartphone,
            ProductCategory::Laptop,
            ProductCategory::Tablet,
            ProductCategory::Accessory,
        ]
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ProductCategory::Other(_))
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductCategory::Smartphone => write!(f, "Smartphone"),
            ProductCategory::Laptop => write!(f, "Laptop"),
            ProductCategory::Tablet => write!(f, "Tablet"),
            ProductCategory::Accessory => write!(f, "Accessory"),
            ProductCategory::Other(name) => write!(f, "{}", name),
        }
    }
}

impl From<String> for ProductCategory {
    fn from(s: String) -> Self {
        ProductCategory::from_str(&s)
    }
}

impl From<ProductCategory> for String {
    fn from(category: ProductCategory) -> Self {
        category.to_string()
    }
}

/// Kind of ledger entry. The amount carries no sign; direction comes from the type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Sale,
    Purchase,
    Refund,
    Expense,
    Other(String),
}

impl TransactionType {
    /// Parse a transaction type from its wire spelling (case-insensitive)
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SALE" => TransactionType::Sale,
            "PURCHASE" => TransactionType::Purchase,
            "REFUND" => TransactionType::Refund,
            "EXPENSE" => TransactionType::Expense,
            _ => TransactionType::Other(s.to_string()),
        }
    }

    pub fn known() -> [TransactionType; 4] {
        [
            TransactionType::Sale,
            TransactionType::Purchase,
            TransactionType::Refund,
            TransactionType::Expense,
        ]
    }

    /// Money leaving the business (drawn red in the ledger chart)
    pub fn is_outflow(&self) -> bool {
        matches!(self, TransactionType::Expense | TransactionType::Refund)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Sale => write!(f, "SALE"),
            TransactionType::Purchase => write!(f, "PURCHASE"),
            TransactionType::Refund => write!(f, "REFUND"),
            TransactionType::Expense => write!(f, "EXPENSE"),
            TransactionType::Other(name) => write!(f, "{}", name),
        }
    }
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        TransactionType::from_str(&s)
    }
}

impl From<TransactionType> for String {
    fn from(tx_type: TransactionType) -> Self {
        tx_type.to_string()
    }
}

/// Settlement status of a ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Flagged,
    Other(String),
}

impl TransactionStatus {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "COMPLETED" => TransactionStatus::Completed,
            "PENDING" => TransactionStatus::Pending,
            "FLAGGED" => TransactionStatus::Flagged,
            _ => TransactionStatus::Other(s.to_string()),
        }
    }

    pub fn known() -> [TransactionStatus; 3] {
        [
            TransactionStatus::Completed,
            TransactionStatus::Pending,
            TransactionStatus::Flagged,
        ]
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Completed => write!(f, "COMPLETED"),
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Flagged => write!(f, "FLAGGED"),
            TransactionStatus::Other(name) => write!(f, "{}", name),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        TransactionStatus::from_str(&s)
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        status.to_string()
    }
}

/// A stocked item in the inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Opaque identifier; empty until the store assigns one
    pub id: String,

    pub name: String,

    pub category: ProductCategory,

    /// Stock-keeping-unit code
    pub sku: String,

    pub stock_level: u32,

    /// Stock at or below this level counts as low
    pub reorder_point: u32,

    pub price: f64,

    pub cost: f64,

    pub image_url: String,

    /// Prefix used when displaying serial numbers (e.g. "SN-GP9")
    pub serial_prefix: String,
}

impl Product {
    /// Creates a product with the given name and the "Add new" form defaults
    pub fn new(name: impl Into<String>, category: ProductCategory) -> Self {
        Self {
            name: name.into(),
            category,
            ..Self::draft()
        }
    }

    /// Empty form draft used by the "Add new" action
    pub fn draft() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            category: ProductCategory::Smartphone,
            sku: String::new(),
            stock_level: 0,
            reorder_point: 5,
            price: 0.0,
            cost: 0.0,
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            serial_prefix: DEFAULT_SERIAL_PREFIX.to_string(),
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_level <= self.reorder_point
    }

    /// Gross margin per unit
    pub fn margin(&self) -> f64 {
        self.price - self.cost
    }
}

/// An entry in the financial ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Identifier, conventionally "TX-<digits>" but not validated
    pub id: String,

    /// Calendar date string, normally `YYYY-MM-DD`
    pub date: String,

    #[serde(rename = "type")]
    pub tx_type: TransactionType,

    /// Non-negative magnitude
    pub amount: f64,

    pub status: TransactionStatus,

    pub description: String,
}

impl Transaction {
    pub fn new(tx_type: TransactionType, amount: f64, description: impl Into<String>) -> Self {
        Self {
            tx_type,
            amount,
            description: description.into(),
            ..Self::draft()
        }
    }

    /// Empty form draft used by the "New transaction" action
    pub fn draft() -> Self {
        Self {
            id: String::new(),
            date: today(),
            tx_type: TransactionType::Sale,
            amount: 0.0,
            status: TransactionStatus::Completed,
            description: String::new(),
        }
    }

    pub fn is_sale(&self) -> bool {
        self.tx_type == TransactionType::Sale
    }
}

/// Partial update for a product; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub sku: Option<String>,
    pub stock_level: Option<u32>,
    pub reorder_point: Option<u32>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    pub image_url: Option<String>,
    pub serial_prefix: Option<String>,
}

impl RecordPatch for ProductPatch {
    type Target = Product;

    fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }

    fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(sku) = &self.sku {
            product.sku = sku.clone();
        }
        if let Some(stock_level) = self.stock_level {
            product.stock_level = stock_level;
        }
        if let Some(reorder_point) = self.reorder_point {
            product.reorder_point = reorder_point;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(cost) = self.cost {
            product.cost = cost;
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = image_url.clone();
        }
        if let Some(serial_prefix) = &self.serial_prefix {
            product.serial_prefix = serial_prefix.clone();
        }
    }
}

/// Partial update for a ledger entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub date: Option<String>,
    pub tx_type: Option<TransactionType>,
    pub amount: Option<f64>,
    pub status: Option<TransactionStatus>,
    pub description: Option<String>,
}

impl RecordPatch for TransactionPatch {
    type Target = Transaction;

    fn is_empty(&self) -> bool {
        *self == TransactionPatch::default()
    }

    fn apply_to(&self, tx: &mut Transaction) {
        if let Some(date) = &self.date {
            tx.date = date.clone();
        }
        if let Some(tx_type) = &self.tx_type {
            tx.tx_type = tx_type.clone();
        }
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(status) = &self.status {
            tx.status = status.clone();
        }
        if let Some(description) = &self.description {
            tx.description = description.clone();
        }
    }
}

impl Record for Product {
    type Patch = ProductPatch;
    const KIND: RecordKind = RecordKind::Product;
    const ID_STYLE: IdStyle = IdStyle::ShortCode;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Record for Transaction {
    type Patch = TransactionPatch;
    const KIND: RecordKind = RecordKind::Transaction;
    const ID_STYLE: IdStyle = IdStyle::Sequence { prefix: "TX" };

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// The screens of the dashboard; the active one is reported to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Dashboard,
    Inventory,
    Financials,
    Sales,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Dashboard => write!(f, "dashboard"),
            View::Inventory => write!(f, "inventory"),
            View::Financials => write!(f, "financials"),
            View::Sales => write!(f, "sales"),
        }
    }
}

/// Products the dashboard starts with
pub fn demo_products() -> Vec<Product> {
    let product = |id: &str,
                   name: &str,
                   category: ProductCategory,
                   sku: &str,
                   stock_level: u32,
                   reorder_point: u32,
                   price: f64,
                   cost: f64,
                   serial_prefix: &str| Product {
        id: id.to_string(),
        name: name.to_string(),
        category,
        sku: sku.to_string(),
        stock_level,
        reorder_point,
        price,
        cost,
        image_url: PLACEHOLDER_IMAGE_URL.to_string(),
        serial_prefix: serial_prefix.to_string(),
    };

    vec![
        product(
            "1",
            "Pixel 9 Pro",
            ProductCategory::Smartphone,
            "GP-9P-128",
            12,
            20,
            16_000_000.0,
            13_500_000.0,
            "SN-GP9",
        ),
        product(
            "2",
            "MacBook Air M3",
            ProductCategory::Laptop,
            "AP-MBA-M3",
            45,
            10,
            21_000_000.0,
            18_000_000.0,
            "SN-MBA",
        ),
        product(
            "3",
            "Galaxy Tab S9",
            ProductCategory::Tablet,
            "SM-TS9-256",
            5,
            15,
            12_500_000.0,
            10_000_000.0,
            "SN-GTS",
        ),
        product(
            "4",
            "USB-C Dock Pro",
            ProductCategory::Accessory,
            "ACC-DOCK-01",
            120,
            50,
            1_500_000.0,
            900_000.0,
            "SN-ACC",
        ),
    ]
}

/// Ledger entries the dashboard starts with
pub fn demo_transactions() -> Vec<Transaction> {
    let tx = |id: &str,
              date: &str,
              tx_type: TransactionType,
              amount: f64,
              status: TransactionStatus,
              description: &str| Transaction {
        id: id.to_string(),
        date: date.to_string(),
        tx_type,
        amount,
        status,
        description: description.to_string(),
    };

    vec![
        tx(
            "TX-001",
            "2023-10-01",
            TransactionType::Sale,
            21_000_000.0,
            TransactionStatus::Completed,
            "MacBook Air Sale",
        ),
        tx(
            "TX-002",
            "2023-10-01",
            TransactionType::Sale,
            16_000_000.0,
            TransactionStatus::Completed,
            "Pixel 9 Pro Sale",
        ),
        tx(
            "TX-003",
            "2023-10-02",
            TransactionType::Refund,
            16_000_000.0,
            TransactionStatus::Pending,
            "Return: Pixel 9 Pro",
        ),
        tx(
            "TX-004",
            "2023-10-02",
            TransactionType::Expense,
            15_000_000.0,
            TransactionStatus::Completed,
            "Monthly store rent",
        ),
        tx(
            "TX-005",
            "2023-10-03",
            TransactionType::Sale,
            250_000_000.0,
            TransactionStatus::Completed,
            "Wholesale order: 20x Tablet",
        ),
        tx(
            "TX-006",
            "2023-10-03",
            TransactionType::Expense,
            750_000.0,
            TransactionStatus::Completed,
            "Office supplies",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!(ProductCategory::from_str("Laptop"), ProductCategory::Laptop);
        assert_eq!(ProductCategory::from_str("tablet"), ProductCategory::Tablet);
        assert_eq!(
            ProductCategory::from_str("Drone"),
            ProductCategory::Other("Drone".to_string())
        );
    }

    #[test]
    fn test_unknown_values_keep_their_text() {
        let category = ProductCategory::from_str("Smart Watch");
        assert!(!category.is_known());
        assert_eq!(category.to_string(), "Smart Watch");

        let tx_type = TransactionType::from_str("TRANSFER");
        assert_eq!(tx_type.to_string(), "TRANSFER");
    }

    #[test]
    fn test_transaction_wire_spelling() {
        let json = serde_json::to_value(&demo_transactions()[2]).unwrap();
        assert_eq!(json["type"], "REFUND");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["amount"], 16_000_000.0);
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let json = serde_json::to_value(&demo_products()[0]).unwrap();
        assert_eq!(json["stockLevel"], 12);
        assert_eq!(json["reorderPoint"], 20);
        assert_eq!(json["serialPrefix"], "SN-GP9");
        assert_eq!(json["category"], "Smartphone");
    }

    #[test]
    fn test_low_stock_boundary_is_inclusive() {
        let mut product = Product::new("Cable", ProductCategory::Accessory);
        product.stock_level = 5;
        product.reorder_point = 5;
        assert!(product.is_low_stock());

        product.stock_level = 6;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_drafts_use_form_defaults() {
        let product = Product::draft();
        assert!(product.id.is_empty());
        assert_eq!(product.reorder_point, 5);
        assert_eq!(product.category, ProductCategory::Smartphone);

        let tx = Transaction::draft();
        assert_eq!(tx.tx_type, TransactionType::Sale);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.date, today());
    }

    #[test]
    fn test_empty_patch_leaves_product_unchanged() {
        let original = demo_products().remove(0);
        let mut product = original.clone();
        let patch = ProductPatch::default();

        assert!(patch.is_empty());
        patch.apply_to(&mut product);
        assert_eq!(product, original);
    }

    #[test]
    fn test_patch_replaces_only_given_fields() {
        let mut tx = demo_transactions().remove(0);
        let patch = TransactionPatch {
            status: Some(TransactionStatus::Flagged),
            ..Default::default()
        };
        patch.apply_to(&mut tx);

        assert_eq!(tx.status, TransactionStatus::Flagged);
        assert_eq!(tx.amount, 21_000_000.0);
        assert_eq!(tx.description, "MacBook Air Sale");
    }
}
