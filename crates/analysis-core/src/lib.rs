pub mod error;
pub mod stats;
pub mod types;

pub use error::*;
pub use types::*;

/// Guard for every possibly-zero denominator in the workspace.
pub const EPSILON: f64 = 1e-10;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
