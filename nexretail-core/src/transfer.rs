//! Bulk Import/Export
//!
//! Moves products and ledger entries in and out of CSV files. The header
//! row carries the field names; import maps columns by header and coerces
//! every value, so a malformed row still becomes a record.

use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::models::{
    today, Product, ProductCategory, Transaction, TransactionStatus, TransactionType,
    DEFAULT_SERIAL_PREFIX, PLACEHOLDER_IMAGE_URL, UNNAMED_PRODUCT,
};

/// Default download name for the inventory export
pub const INVENTORY_EXPORT_FILE: &str = "inventory_data.csv";

/// Default download name for the ledger export
pub const LEDGER_EXPORT_FILE: &str = "financial_ledger.csv";

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8")]
    Encoding,
}

/// Write records as CSV with a header row of field names
fn write_records<W: Write, T: serde::Serialize>(
    records: &[T],
    headers: &[&str],
    writer: W,
) -> Result<(), TransferError> {
    let mut csv_writer = Writer::from_writer(writer);
    if records.is_empty() {
        // Serializing nothing would emit no header at all
        csv_writer.write_record(headers)?;
    }
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn to_csv_string<T: serde::Serialize>(
    records: &[T],
    headers: &[&str],
) -> Result<String, TransferError> {
    let mut buf = Vec::new();
    write_records(records, headers, &mut buf)?;
    String::from_utf8(buf).map_err(|_| TransferError::Encoding)
}

const PRODUCT_HEADERS: [&str; 10] = [
    "id",
    "name",
    "category",
    "sku",
    "stockLevel",
    "reorderPoint",
    "price",
    "cost",
    "imageUrl",
    "serialPrefix",
];

const TRANSACTION_HEADERS: [&str; 6] = ["id", "date", "type", "amount", "status", "description"];

/// Export products to CSV text
pub fn products_to_csv(products: &[Product]) -> Result<String, TransferError> {
    to_csv_string(products, &PRODUCT_HEADERS)
}

/// Export ledger entries to CSV text
pub fn transactions_to_csv(transactions: &[Transaction]) -> Result<String, TransferError> {
    to_csv_string(transactions, &TRANSACTION_HEADERS)
}

/// Export products to a CSV file
pub fn export_products(products: &[Product], output_path: &Path) -> Result<(), TransferError> {
    write_records(products, &PRODUCT_HEADERS, File::create(output_path)?)?;
    info!(
        "Exported {} product(s) to {}",
        products.len(),
        output_path.display()
    );
    Ok(())
}

/// Export ledger entries to a CSV file
pub fn export_transactions(
    transactions: &[Transaction],
    output_path: &Path,
) -> Result<(), TransferError> {
    write_records(transactions, &TRANSACTION_HEADERS, File::create(output_path)?)?;
    info!(
        "Exported {} transaction(s) to {}",
        transactions.len(),
        output_path.display()
    );
    Ok(())
}

/// A CSV row before coercion; every column is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    stock_level: Option<String>,
    #[serde(default)]
    reorder_point: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    cost: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    serial_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, rename = "type")]
    tx_type: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Header row of the file being imported
struct Columns(StringRecord);

impl Columns {
    fn has(&self, name: &str) -> bool {
        self.0.iter().any(|h| h == name)
    }

    /// Text of a cell, kept verbatim
    ///
    /// A blank cell in a column the file has is an empty string; `None`
    /// means the file has no such column, so the caller's default applies.
    fn text(&self, name: &str, cell: Option<String>) -> Option<String> {
        match cell {
            Some(value) => Some(value),
            None if self.has(name) => Some(String::new()),
            None => None,
        }
    }
}

/// Turns a deserialized row into a record
trait ImportRow: for<'de> Deserialize<'de> {
    type Record;

    fn into_record(self, columns: &Columns) -> Self::Record;
}

/// Non-empty trimmed value of a numeric cell
fn number_text(cell: Option<String>) -> Option<String> {
    cell.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Whole number from a cell; fractional input is truncated, anything else is 0
fn coerce_count(cell: Option<String>) -> u32 {
    let Some(value) = number_text(cell) else {
        return 0;
    };
    if let Ok(n) = value.parse::<u32>() {
        return n;
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 => f.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Non-negative amount from a cell, 0 when unparsable
fn coerce_amount(cell: Option<String>) -> f64 {
    number_text(cell)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|f| f.is_finite() && *f >= 0.0)
        .unwrap_or(0.0)
}

/// Enum cell, parsed only when it has content
fn enum_cell<T>(cell: Option<String>, parse: fn(&str) -> T, default: T) -> T {
    cell.filter(|v| !v.is_empty())
        .map(|v| parse(&v))
        .unwrap_or(default)
}

impl ImportRow for ProductRow {
    type Record = Product;

    fn into_record(self, columns: &Columns) -> Product {
        Product {
            // Empty id means "assign one when stored"
            id: self.id.unwrap_or_default(),
            name: columns
                .text("name", self.name)
                .unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
            category: enum_cell(
                self.category,
                ProductCategory::from_str,
                ProductCategory::Smartphone,
            ),
            sku: columns.text("sku", self.sku).unwrap_or_default(),
            stock_level: coerce_count(self.stock_level),
            reorder_point: coerce_count(self.reorder_point),
            price: coerce_amount(self.price),
            cost: coerce_amount(self.cost),
            image_url: columns
                .text("imageUrl", self.image_url)
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            serial_prefix: columns
                .text("serialPrefix", self.serial_prefix)
                .unwrap_or_else(|| DEFAULT_SERIAL_PREFIX.to_string()),
        }
    }
}

impl ImportRow for TransactionRow {
    type Record = Transaction;

    fn into_record(self, columns: &Columns) -> Transaction {
        Transaction {
            id: self.id.unwrap_or_default(),
            date: columns.text("date", self.date).unwrap_or_else(today),
            tx_type: enum_cell(self.tx_type, TransactionType::from_str, TransactionType::Sale),
            amount: coerce_amount(self.amount),
            status: enum_cell(
                self.status,
                TransactionStatus::from_str,
                TransactionStatus::Completed,
            ),
            description: self.description.unwrap_or_default(),
        }
    }
}

fn read_rows<R: Read, Row: ImportRow>(reader: R) -> Result<Vec<Row::Record>, TransferError> {
    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let columns = Columns(csv_reader.headers()?.clone());

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<Row>() {
        records.push(row?.into_record(&columns));
    }
    Ok(records)
}

/// Parse products from CSV; rows without an id come back with an empty id
pub fn parse_products<R: Read>(reader: R) -> Result<Vec<Product>, TransferError> {
    read_rows::<R, ProductRow>(reader)
}

/// Parse ledger entries from CSV; rows without an id come back with an empty id
pub fn parse_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>, TransferError> {
    read_rows::<R, TransactionRow>(reader)
}

pub fn import_products_file(path: &Path) -> Result<Vec<Product>, TransferError> {
    parse_products(File::open(path)?)
}

pub fn import_transactions_file(path: &Path) -> Result<Vec<Transaction>, TransferError> {
    parse_transactions(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{demo_products, demo_transactions};
    use crate::store::RecordStore;
    use tempfile::tempdir;

    #[test]
    fn test_export_header_uses_field_names() {
        let csv = products_to_csv(&demo_products()).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, PRODUCT_HEADERS.join(","));

        let csv = transactions_to_csv(&demo_transactions()).unwrap();
        assert!(csv.starts_with("id,date,type,amount,status,description\n"));
        assert_eq!(csv.lines().count(), 7);
    }

    #[test]
    fn test_export_empty_collection_still_has_header() {
        let csv = transactions_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), TRANSACTION_HEADERS.join(","));
        assert!(parse_transactions(csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_into_empty_store() {
        let source = RecordStore::with_demo_data();
        let products_csv = products_to_csv(source.products()).unwrap();
        let ledger_csv = transactions_to_csv(source.transactions()).unwrap();

        let mut target = RecordStore::new();
        target.import(parse_products(products_csv.as_bytes()).unwrap());
        target.import(parse_transactions(ledger_csv.as_bytes()).unwrap());

        assert_eq!(target.products(), source.products());
        assert_eq!(target.transactions(), source.transactions());
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let csv = "name,stockLevel,price\nTravel Adapter,,abc\n,7.9,-5\n";
        let products = parse_products(csv.as_bytes()).unwrap();

        assert_eq!(products.len(), 2);
        let first = &products[0];
        assert!(first.id.is_empty());
        assert_eq!(first.name, "Travel Adapter");
        assert_eq!(first.stock_level, 0);
        assert_eq!(first.price, 0.0);
        assert_eq!(first.serial_prefix, DEFAULT_SERIAL_PREFIX);
        assert_eq!(first.image_url, PLACEHOLDER_IMAGE_URL);
        assert_eq!(first.category, ProductCategory::Smartphone);

        let second = &products[1];
        assert_eq!(second.name, "");
        assert_eq!(second.stock_level, 7);
        assert_eq!(second.price, 0.0);
    }

    #[test]
    fn test_placeholders_only_for_absent_columns() {
        let csv = "sku,stockLevel\nCB-1,3\n";
        let products = parse_products(csv.as_bytes()).unwrap();

        assert_eq!(products[0].name, UNNAMED_PRODUCT);
        assert_eq!(products[0].image_url, PLACEHOLDER_IMAGE_URL);
        assert_eq!(products[0].serial_prefix, DEFAULT_SERIAL_PREFIX);

        let csv = "name,imageUrl,serialPrefix\n,,\n";
        let products = parse_products(csv.as_bytes()).unwrap();
        assert_eq!(products[0].name, "");
        assert_eq!(products[0].image_url, "");
        assert_eq!(products[0].serial_prefix, "");
    }

    #[test]
    fn test_edge_records_survive_round_trip() {
        let mut source = RecordStore::new();
        let blank = Product {
            image_url: String::new(),
            price: 0.1,
            ..Product::new("", ProductCategory::Smartphone)
        };
        let padded = Product {
            serial_prefix: " SN-1".to_string(),
            sku: " PAD ".to_string(),
            ..Product::new(" X ", ProductCategory::Other("Drone".to_string()))
        };
        source.create(blank).unwrap();
        source.create(padded).unwrap();

        let mut undated = Transaction::new(
            TransactionType::Other("TRANSFER".to_string()),
            42.5,
            "Moved \"petty\" cash, back office",
        );
        undated.date = String::new();
        undated.status = TransactionStatus::Other(" on hold".to_string());
        source.create(undated).unwrap();

        let products_csv = products_to_csv(source.products()).unwrap();
        let ledger_csv = transactions_to_csv(source.transactions()).unwrap();

        let mut target = RecordStore::new();
        target.import(parse_products(products_csv.as_bytes()).unwrap());
        target.import(parse_transactions(ledger_csv.as_bytes()).unwrap());

        assert_eq!(target.products(), source.products());
        assert_eq!(target.transactions(), source.transactions());
    }

    #[test]
    fn test_transaction_defaults_and_passthrough() {
        let csv = "id,type,amount,status,description\n\
                   ,TRANSFER,1500,,Moved cash\n\
                   TX-9,SALE,12.5,FLAGGED,\n";
        let transactions = parse_transactions(csv.as_bytes()).unwrap();

        let first = &transactions[0];
        assert!(first.id.is_empty());
        assert_eq!(first.date, today());
        assert_eq!(first.tx_type, TransactionType::Other("TRANSFER".to_string()));
        assert_eq!(first.status, TransactionStatus::Completed);
        assert_eq!(first.amount, 1500.0);

        let second = &transactions[1];
        assert_eq!(second.id, "TX-9");
        assert_eq!(second.status, TransactionStatus::Flagged);
        assert_eq!(second.description, "");
    }

    #[test]
    fn test_short_rows_and_blank_lines() {
        let csv = "id,name,category,sku,stockLevel\np1,Pen,Accessory\n\np2,Pad,Tablet,PD-1,4\n";
        let products = parse_products(csv.as_bytes()).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].sku, "");
        assert_eq!(products[0].stock_level, 0);
        assert_eq!(products[1].stock_level, 4);
    }

    #[test]
    fn test_import_assigns_fresh_ids() {
        let mut store = RecordStore::with_demo_data();
        let csv = "name,category\nStylus,Accessory\nStylus,Accessory\n";
        let report = store.import(parse_products(csv.as_bytes()).unwrap());

        assert_eq!(report.count(), 2);
        assert_ne!(report.imported[0], report.imported[1]);
        assert_eq!(store.products().len(), 6);
    }

    #[test]
    fn test_file_export_and_import() -> Result<(), TransferError> {
        let dir = tempdir()?;
        let path = dir.path().join(LEDGER_EXPORT_FILE);

        export_transactions(&demo_transactions(), &path)?;
        let loaded = import_transactions_file(&path)?;
        assert_eq!(loaded, demo_transactions());

        let path = dir.path().join(INVENTORY_EXPORT_FILE);
        export_products(&demo_products(), &path)?;
        assert_eq!(import_products_file(&path)?, demo_products());
        Ok(())
    }
}
