//! Imputation module for handling missing values.
//!
//! Prices are the only imputed column: every other missing field either has
//! a placeholder default or removes the row during cleaning.

mod price;

pub use price::{ImputationStats, PriceImputer};
