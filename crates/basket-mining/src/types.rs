use crate::error::MiningError;
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Column names
// ============================================================================

pub const INVOICE: &str = "Invoice";
pub const STOCK_CODE: &str = "StockCode";
pub const DESCRIPTION: &str = "Description";
pub const QUANTITY: &str = "Quantity";
pub const INVOICE_DATE: &str = "InvoiceDate";
pub const PRICE: &str = "Price";
pub const CUSTOMER_ID: &str = "Customer ID";
pub const COUNTRY: &str = "Country";

pub const TIME_CATEGORY: &str = "TimeCategory";
pub const DAY_OF_WEEK: &str = "DayOfWeek";
pub const PRICE_CATEGORY: &str = "PriceCategory";
pub const QUANTITY_CATEGORY: &str = "QuantityCategory";

/// Columns every raw input file must carry.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    INVOICE,
    STOCK_CODE,
    DESCRIPTION,
    QUANTITY,
    INVOICE_DATE,
    PRICE,
    CUSTOMER_ID,
    COUNTRY,
];

/// Marker for rows whose value could not be placed in any bin.
pub const UNBINNED: &str = "Unbinned";

// ============================================================================
// Temporal categories
// ============================================================================

/// Time-of-day bucket derived from the invoice hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeCategory {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeCategory {
    pub const ALL: [TimeCategory; 4] = [
        TimeCategory::Morning,
        TimeCategory::Afternoon,
        TimeCategory::Evening,
        TimeCategory::Night,
    ];

    /// Bucket an hour: [6,12) Morning, [12,18) Afternoon, [18,24) Evening,
    /// everything else Night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeCategory::Morning,
            12..=17 => TimeCategory::Afternoon,
            18..=23 => TimeCategory::Evening,
            _ => TimeCategory::Night,
        }
    }

    pub fn from_datetime(timestamp: &NaiveDateTime) -> Self {
        Self::from_hour(timestamp.hour())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeCategory::Morning => "Morning",
            TimeCategory::Afternoon => "Afternoon",
            TimeCategory::Evening => "Evening",
            TimeCategory::Night => "Night",
        }
    }
}

impl fmt::Display for TimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeCategory {
    type Err = MiningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| MiningError::InvalidValue {
                column: TIME_CATEGORY.to_string(),
                value: s.to_string(),
            })
    }
}

/// Canonical day-of-week label.
///
/// The `Display` spelling is the only one ever written to disk, and parsing
/// goes through this type, so the labelling step and the temporal filter can
/// never disagree on capitalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn from_datetime(timestamp: &NaiveDateTime) -> Self {
        timestamp.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = MiningError;

    /// Accepts full names in any case and three-letter abbreviations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|day| {
                let name = day.as_str();
                name.eq_ignore_ascii_case(trimmed)
                    || (trimmed.len() == 3 && name[..3].eq_ignore_ascii_case(trimmed))
            })
            .ok_or_else(|| MiningError::InvalidValue {
                column: DAY_OF_WEEK.to_string(),
                value: s.to_string(),
            })
    }
}

/// A label that places a transaction in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemporalLabel {
    Day(DayOfWeek),
    Time(TimeCategory),
}

impl fmt::Display for TemporalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalLabel::Day(day) => fmt::Display::fmt(day, f),
            TemporalLabel::Time(time) => fmt::Display::fmt(time, f),
        }
    }
}

/// Which temporal label is appended to each transaction during mining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LabelKind {
    #[default]
    DayOfWeek,
    TimeOfDay,
}

impl LabelKind {
    /// Column of the cleaned dataset that carries this label.
    pub fn column(&self) -> &'static str {
        match self {
            LabelKind::DayOfWeek => DAY_OF_WEEK,
            LabelKind::TimeOfDay => TIME_CATEGORY,
        }
    }

    /// Parse a stored label of this kind.
    pub fn parse(&self, value: &str) -> Result<TemporalLabel, MiningError> {
        match self {
            LabelKind::DayOfWeek => value.parse().map(TemporalLabel::Day),
            LabelKind::TimeOfDay => value.parse().map(TemporalLabel::Time),
        }
    }

    /// Derive the label straight from a timestamp.
    pub fn derive(&self, timestamp: &NaiveDateTime) -> TemporalLabel {
        match self {
            LabelKind::DayOfWeek => TemporalLabel::Day(DayOfWeek::from_datetime(timestamp)),
            LabelKind::TimeOfDay => TemporalLabel::Time(TimeCategory::from_datetime(timestamp)),
        }
    }
}

// ============================================================================
// Bin labels
// ============================================================================

/// Tertile label set for unit prices.
pub const PRICE_LABELS: [&str; 3] = ["Cheap", "Mid-Range", "Expensive"];

/// Tertile label set for quantities.
pub const QUANTITY_LABELS: [&str; 3] = ["Small", "Medium", "Large"];

// ============================================================================
// Preprocessing Summary
// ============================================================================

/// Row accounting for one preprocessing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DroppedRows {
    /// Rows with a negative quantity (returns).
    pub negative_quantity: usize,
    /// Rows with a negative unit price (adjustments).
    pub negative_price: usize,
    /// Rows missing an invoice or stock code.
    pub missing_keys: usize,
    /// Rows whose price could not be imputed and were dropped.
    pub unresolved_price: usize,
    /// Rows outside the pruning window.
    pub pruned: usize,
}

impl DroppedRows {
    pub fn total(&self) -> usize {
        self.negative_quantity
            + self.negative_price
            + self.missing_keys
            + self.unresolved_price
            + self.pruned
    }
}

/// Human-readable summary of what the preprocessor did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Number of rows loaded.
    pub rows_before: usize,
    /// Number of rows written.
    pub rows_after: usize,
    /// Breakdown of removed rows.
    pub dropped: DroppedRows,

    /// Missing prices filled from the same product's median.
    pub prices_imputed: usize,
    /// Missing prices filled from the global median.
    pub prices_defaulted: usize,
    /// Prices left empty under the `Unbinned` policy.
    pub prices_unresolved: usize,

    /// Description of the pruning window, if any.
    pub pruning: Option<String>,

    /// Bin edges actually used for price.
    pub price_edges: Vec<f64>,
    /// Bin edges actually used for quantity.
    pub quantity_edges: Vec<f64>,

    /// Warnings raised during processing.
    pub warnings: Vec<String>,
}

impl PreprocessSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Percentage of loaded rows that did not survive.
    pub fn rows_removed_percentage(&self) -> f64 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_before.saturating_sub(self.rows_after) as f64 / self.rows_before as f64)
                * 100.0
        }
    }
}
