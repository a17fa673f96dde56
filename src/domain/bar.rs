//! Bar representations: one period's price or quote snapshot.

use chrono::NaiveDate;

/// Option right: call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRight {
    Call,
    Put,
}

/// Daily OHLCV bar for an equity-like instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Daily quote bar for a single option contract.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionBar {
    pub date: NaiveDate,
    pub bid: f64,
    pub ask: f64,
    pub expiration: NaiveDate,
    pub strike: f64,
    pub right: OptionRight,
}

impl OptionBar {
    /// Bid/ask midpoint, the contract's marking price.
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// A bar is exclusively one of the two shapes; a series never mixes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Bar {
    Equity(EquityBar),
    Option(OptionBar),
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        match self {
            Bar::Equity(bar) => bar.date,
            Bar::Option(bar) => bar.date,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Bar::Option(_))
    }

    /// Marking price: equity close, or option bid/ask mid.
    pub fn mark(&self) -> f64 {
        match self {
            Bar::Equity(bar) => bar.close,
            Bar::Option(bar) => bar.mid(),
        }
    }
}
