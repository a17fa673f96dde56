//! CSV file data adapter.
//!
//! Loads one `{symbol}.csv` file per instrument. Equity files carry
//! `date,open,high,low,close,volume` rows; option files carry
//! `date,bid,ask,expiration,strike,right` rows and are recognized by their
//! header.

use crate::domain::bar::{Bar, EquityBar, OptionBar, OptionRight};
use crate::domain::error::HistsimError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn series_error(symbol: &str, reason: String) -> HistsimError {
    HistsimError::InvalidSeries {
        symbol: symbol.to_string(),
        reason,
    }
}

fn field<'a>(
    record: &'a StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<&'a str, HistsimError> {
    record
        .get(index)
        .ok_or_else(|| series_error(symbol, format!("missing {name} column")))
}

fn parse_f64(
    record: &StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<f64, HistsimError> {
    field(record, index, name, symbol)?
        .trim()
        .parse()
        .map_err(|e| series_error(symbol, format!("invalid {name} value: {e}")))
}

fn parse_date(
    record: &StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<NaiveDate, HistsimError> {
    NaiveDate::parse_from_str(field(record, index, name, symbol)?.trim(), "%Y-%m-%d")
        .map_err(|e| series_error(symbol, format!("invalid {name} value: {e}")))
}

fn parse_right(record: &StringRecord, index: usize, symbol: &str) -> Result<OptionRight, HistsimError> {
    match field(record, index, "right", symbol)?.trim().to_lowercase().as_str() {
        "call" | "c" => Ok(OptionRight::Call),
        "put" | "p" => Ok(OptionRight::Put),
        other => Err(series_error(symbol, format!("invalid right value: {other}"))),
    }
}

fn equity_row(record: &StringRecord, symbol: &str) -> Result<Bar, HistsimError> {
    Ok(Bar::Equity(EquityBar {
        date: parse_date(record, 0, "date", symbol)?,
        open: parse_f64(record, 1, "open", symbol)?,
        high: parse_f64(record, 2, "high", symbol)?,
        low: parse_f64(record, 3, "low", symbol)?,
        close: parse_f64(record, 4, "close", symbol)?,
        volume: field(record, 5, "volume", symbol)?
            .trim()
            .parse()
            .map_err(|e| series_error(symbol, format!("invalid volume value: {e}")))?,
    }))
}

fn option_row(record: &StringRecord, symbol: &str) -> Result<Bar, HistsimError> {
    Ok(Bar::Option(OptionBar {
        date: parse_date(record, 0, "date", symbol)?,
        bid: parse_f64(record, 1, "bid", symbol)?,
        ask: parse_f64(record, 2, "ask", symbol)?,
        expiration: parse_date(record, 3, "expiration", symbol)?,
        strike: parse_f64(record, 4, "strike", symbol)?,
        right: parse_right(record, 5, symbol)?,
    }))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, HistsimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let is_option = rdr
            .headers()
            .map_err(|e| series_error(symbol, format!("bad header: {e}")))?
            .iter()
            .any(|h| h.trim().eq_ignore_ascii_case("bid"));

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| series_error(symbol, format!("CSV parse error: {e}")))?;
            let bar = if is_option {
                option_row(&record, symbol)?
            } else {
                equity_row(&record, symbol)?
            };
            if bar.date() < start_date || bar.date() > end_date {
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(Bar::date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, HistsimError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
