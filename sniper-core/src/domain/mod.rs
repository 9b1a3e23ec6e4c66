//! Domain types for the screener

pub mod bar;
pub mod fundamentals;

pub use bar::{validate_history, Bar, BarError};
pub use fundamentals::FundamentalSnapshot;

use serde::{Deserialize, Serialize};

/// Symbol type alias
pub type Symbol = String;

/// One row of the uploaded universe file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseRow {
    pub symbol: Symbol,
    pub last_price: f64,
    pub volume: u64,
}
