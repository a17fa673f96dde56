//! Data access port trait.
//!
//! Bar data arrives pre-materialized from an external loader; the engine
//! itself performs no file or network I/O.

use crate::domain::bar::Bar;
use crate::domain::error::HistsimError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Ordered bar series for one symbol, clipped to `[start, end]`.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, HistsimError>;

    fn list_symbols(&self) -> Result<Vec<String>, HistsimError>;
}
