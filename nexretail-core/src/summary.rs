//! Context Summarizer
//!
//! Builds the compact digest of store state that accompanies every
//! assistant query. Summarizing is a read-only projection of the store.

use serde::Serialize;
use std::fmt;

use crate::models::{Product, Transaction, View};
use crate::store::RecordStore;

/// Descriptions longer than this are cut in the digest
const MAX_DESCRIPTION_CHARS: usize = 80;

/// Limits applied while summarizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    /// How many of the latest ledger entries to include
    pub recent_transactions: usize,
    /// Maximum number of products listed by name
    pub product_listing: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            recent_transactions: 5,
            product_listing: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductLine {
    pub name: String,
    pub stock_level: u32,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionLine {
    pub tx_type: String,
    pub amount: f64,
    pub description: String,
}

/// Snapshot of the figures the assistant is allowed to quote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextDigest {
    pub active_view: String,
    pub total_revenue: f64,
    pub low_stock_count: usize,
    pub products: Vec<ProductLine>,
    /// Products left out of `products` because of the listing limit
    pub omitted_products: usize,
    pub recent_transactions: Vec<TransactionLine>,
}

/// Sum of every SALE amount, whatever its status
pub fn total_revenue(transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .filter(|t| t.is_sale())
        .map(|t| t.amount)
        .sum()
}

/// Number of products at or below their reorder point
pub fn low_stock_count(products: &[Product]) -> usize {
    products.iter().filter(|p| p.is_low_stock()).count()
}

/// The last `limit` entries in collection order
pub fn recent_transactions(transactions: &[Transaction], limit: usize) -> &[Transaction] {
    let start = transactions.len().saturating_sub(limit);
    &transactions[start..]
}

/// Snapshot the store for an assistant request
pub fn summarize(
    store: &RecordStore,
    active_view: View,
    options: &SummaryOptions,
) -> ContextDigest {
    let products = store.products();
    let transactions = store.transactions();

    let listed: Vec<ProductLine> = products
        .iter()
        .take(options.product_listing)
        .map(|p| ProductLine {
            name: p.name.clone(),
            stock_level: p.stock_level,
            price: p.price,
        })
        .collect();

    let recent = recent_transactions(transactions, options.recent_transactions)
        .iter()
        .map(|t| TransactionLine {
            tx_type: t.tx_type.to_string(),
            amount: t.amount,
            description: truncate(&t.description, MAX_DESCRIPTION_CHARS),
        })
        .collect();

    ContextDigest {
        active_view: active_view.to_string(),
        total_revenue: total_revenue(transactions),
        low_stock_count: low_stock_count(products),
        omitted_products: products.len() - listed.len(),
        products: listed,
        recent_transactions: recent,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Render a currency amount without a fractional part when it has none
pub fn format_amount(amount: f64) -> String {
    format!("{}", amount)
}

impl fmt::Display for ContextDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Active view: {}.", self.active_view)?;
        writeln!(f, "Current application data summary:")?;
        writeln!(
            f,
            "1. Total recorded revenue: Rp {}.",
            format_amount(self.total_revenue)
        )?;
        writeln!(
            f,
            "2. Products low on stock: {} product(s).",
            self.low_stock_count
        )?;

        let products: Vec<String> = self
            .products
            .iter()
            .map(|p| {
                format!(
                    "{} (stock: {}, price: {})",
                    p.name,
                    p.stock_level,
                    format_amount(p.price)
                )
            })
            .collect();
        if products.is_empty() {
            writeln!(f, "3. Product details: none.")?;
        } else if self.omitted_products > 0 {
            writeln!(
                f,
                "3. Product details: {}, and {} more.",
                products.join(", "),
                self.omitted_products
            )?;
        } else {
            writeln!(f, "3. Product details: {}.", products.join(", "))?;
        }

        let transactions: Vec<String> = self
            .recent_transactions
            .iter()
            .map(|t| {
                format!(
                    "{} Rp{} note: {}",
                    t.tx_type,
                    format_amount(t.amount),
                    t.description
                )
            })
            .collect();
        if transactions.is_empty() {
            write!(f, "4. Latest transactions: none.")
        } else {
            write!(f, "4. Latest transactions: {}.", transactions.join(", "))
        }
    }
}
