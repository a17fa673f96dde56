//! Report adapters: in-memory collection and CSV output.

use crate::domain::engine::NavRecord;
use crate::domain::error::HistsimError;
use crate::domain::execution::{Fill, RejectedOrder};
use crate::ports::report_port::ReportPort;
use std::path::Path;

/// Collects everything the engine emits. Feeds metrics and the CSV
/// writers after the run; also the workhorse of the test suite.
#[derive(Debug, Default)]
pub struct MemoryReport {
    pub navs: Vec<NavRecord>,
    pub fills: Vec<Fill>,
    pub rejected: Vec<RejectedOrder>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportPort for MemoryReport {
    fn record_nav(&mut self, record: &NavRecord) {
        self.navs.push(record.clone());
    }

    fn record_fill(&mut self, fill: &Fill) {
        self.fills.push(fill.clone());
    }

    fn record_rejected(&mut self, order: &RejectedOrder) {
        self.rejected.push(order.clone());
    }
}

/// Writes the per-day equity curve as `date,nav,scaled` rows.
pub fn write_equity_csv(path: &Path, records: &[NavRecord]) -> Result<(), HistsimError> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::other)?;
    writer
        .write_record(["date", "nav", "scaled"])
        .map_err(std::io::Error::other)?;
    for record in records {
        writer
            .write_record([
                record.date.to_string(),
                format!("{:.2}", record.nav),
                format!("{:.6}", record.scaled),
            ])
            .map_err(std::io::Error::other)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the structured fill log as
/// `date,symbol,delta_shares,fill_price,commission` rows.
pub fn write_fill_csv(path: &Path, fills: &[Fill]) -> Result<(), HistsimError> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::other)?;
    writer
        .write_record(["date", "symbol", "delta_shares", "fill_price", "commission"])
        .map_err(std::io::Error::other)?;
    for fill in fills {
        writer
            .write_record([
                fill.date.to_string(),
                fill.symbol.clone(),
                fill.delta_shares.to_string(),
                format!("{:.4}", fill.fill_price),
                format!("{:.4}", fill.commission),
            ])
            .map_err(std::io::Error::other)?;
    }
    writer.flush()?;
    Ok(())
}
