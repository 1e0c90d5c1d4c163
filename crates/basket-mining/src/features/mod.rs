//! Derived columns added to the cleaned dataset.
//!
//! - [`temporal`]: time-of-day and day-of-week labels from `InvoiceDate`
//! - [`binning`]: tertile categories for `Price` and `Quantity`

pub mod binning;
pub mod temporal;

pub use binning::{TertileBinner, bin_column};
pub use temporal::derive_temporal_columns;
