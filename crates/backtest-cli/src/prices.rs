//! CSV price history loading.
//!
//! Expected header: `date,close` plus any of `open,high,low,volume`.
//! Dates are `YYYY-MM-DD` and must be strictly increasing.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use analysis_core::{PriceBar, PriceSeries};

pub fn load_prices(path: &Path, symbol: &str) -> Result<PriceSeries> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open price file {}", path.display()))?;
    parse_prices(file, symbol).with_context(|| format!("failed to load {}", path.display()))
}

pub fn parse_prices<R: Read>(reader: R, symbol: &str) -> Result<PriceSeries> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut bars = Vec::new();
    for (line, row) in rdr.deserialize::<PriceBar>().enumerate() {
        // +2: header line and 1-based numbering
        let bar = row.with_context(|| format!("bad price row at line {}", line + 2))?;
        bars.push(bar);
    }

    Ok(PriceSeries::new(symbol, bars)?)
}
