//! Linear multi-factor scoring and position signals.
//!
//! A [`StrategyProfile`] (Core or Satellite) turns an [`IndicatorSet`] into a
//! 0-100 composite score per bar; a [`HysteresisMachine`] turns scores into
//! positions and [`lag_positions`] delays them one bar so that a decision
//! formed on bar `i` only earns bar `i + 1`'s return.

pub mod indicator_set;
pub mod profile;
pub mod scoring;
pub mod signal;

#[cfg(test)]
mod tests;

pub use indicator_set::*;
pub use profile::*;
pub use scoring::*;
pub use signal::*;
