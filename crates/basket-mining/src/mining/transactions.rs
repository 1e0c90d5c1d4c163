//! Building invoice transactions from the cleaned dataset.

use super::Item;
use crate::error::{MiningError, Result};
use crate::types::{INVOICE, INVOICE_DATE, LabelKind, STOCK_CODE, TemporalLabel};
use crate::utils::{date_values, has_column, require_columns, string_values};
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// The items bought on one invoice plus its temporal label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub invoice: String,
    pub items: Vec<Item>,
}

impl Transaction {
    pub fn new(invoice: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            invoice: invoice.into(),
            items,
        }
    }

    /// Number of temporal labels carried.
    pub fn temporal_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_temporal()).count()
    }
}

impl AsRef<[Item]> for Transaction {
    fn as_ref(&self) -> &[Item] {
        &self.items
    }
}

/// Group the cleaned rows into one transaction per invoice.
///
/// Rows repeating an (Invoice, StockCode) pair are ignored after the first.
/// Each transaction holds its distinct stock codes in row order followed by
/// exactly one temporal label, taken from the first row of the invoice.
/// When the label column is missing it is derived from `InvoiceDate`.
pub fn build_transactions(df: &DataFrame, label: LabelKind) -> Result<Vec<Transaction>> {
    require_columns(df, &[INVOICE, STOCK_CODE])?;

    let labels = row_labels(df, label)?;
    let invoices = string_values(df, INVOICE)?;
    let codes = string_values(df, STOCK_CODE)?;

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut grouped: BTreeMap<&str, (Vec<Item>, &LabelCell)> = BTreeMap::new();
    let mut duplicates = 0;

    for ((invoice, code), cell) in invoices.iter().zip(&codes).zip(&labels) {
        let (Some(invoice), Some(code)) = (invoice.as_deref(), code.as_deref()) else {
            continue;
        };
        if !seen.insert((invoice, code)) {
            duplicates += 1;
            continue;
        }
        grouped
            .entry(invoice)
            .or_insert_with(|| (Vec::new(), cell))
            .0
            .push(Item::Product(code.to_string()));
    }

    if duplicates > 0 {
        debug!("Ignored {} repeated (Invoice, StockCode) rows", duplicates);
    }

    grouped
        .into_iter()
        .map(|(invoice, (mut items, cell))| {
            items.push(Item::Temporal(cell.resolve(label)?));
            Ok(Transaction::new(invoice, items))
        })
        .collect()
}

/// The raw label of a row, resolved only for the first row of an invoice.
enum LabelCell {
    Stored(Option<String>),
    Derived(Option<TemporalLabel>),
}

impl LabelCell {
    fn resolve(&self, kind: LabelKind) -> Result<TemporalLabel> {
        match self {
            LabelCell::Stored(Some(value)) => kind.parse(value),
            LabelCell::Stored(None) => Err(MiningError::InvalidValue {
                column: kind.column().to_string(),
                value: String::new(),
            }),
            LabelCell::Derived(Some(label)) => Ok(*label),
            LabelCell::Derived(None) => Err(MiningError::InvalidValue {
                column: INVOICE_DATE.to_string(),
                value: String::new(),
            }),
        }
    }
}

fn row_labels(df: &DataFrame, kind: LabelKind) -> Result<Vec<LabelCell>> {
    if has_column(df, kind.column()) {
        return Ok(string_values(df, kind.column())?
            .into_iter()
            .map(LabelCell::Stored)
            .collect());
    }

    if has_column(df, INVOICE_DATE) {
        debug!("Deriving {} from {}", kind.column(), INVOICE_DATE);
        return Ok(date_values(df, INVOICE_DATE)?
            .into_iter()
            .map(|date| LabelCell::Derived(date.map(|d| kind.derive(&d))))
            .collect());
    }

    Err(MiningError::ColumnNotFound(kind.column().to_string()))
}
