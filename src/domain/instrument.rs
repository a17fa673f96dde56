//! Instruments and their backing data sources.
//!
//! A `DataSource` owns an immutable, validated bar sequence plus static
//! metadata. An `Instrument` wraps a source with the engine's day cursor and
//! exposes indexed lookback: offset 0 is the bar at the engine's current
//! date, offset `k` the bar `k` trading days earlier. Positions are not
//! stored here; they live in the ledger.

use chrono::NaiveDate;

use super::bar::{Bar, OptionRight};
use super::error::HistsimError;
use super::options::{self, Greeks, ImpliedVol};

const DAYS_PER_YEAR: f64 = 365.0;

/// Immutable bar series with metadata, built once at load time.
#[derive(Debug, Clone)]
pub struct DataSource {
    symbol: String,
    name: String,
    underlying: Option<String>,
    required: bool,
    bars: Vec<Bar>,
}

impl DataSource {
    /// Validates the series: strictly increasing unique dates, and a single
    /// bar shape throughout (equity or option, never both).
    pub fn new(symbol: &str, name: &str, bars: Vec<Bar>) -> Result<Self, HistsimError> {
        for pair in bars.windows(2) {
            if pair[1].date() <= pair[0].date() {
                return Err(HistsimError::InvalidSeries {
                    symbol: symbol.to_string(),
                    reason: format!(
                        "timestamps must be strictly increasing, got {} after {}",
                        pair[1].date(),
                        pair[0].date()
                    ),
                });
            }
            if pair[0].is_option() != pair[1].is_option() {
                return Err(HistsimError::InvalidSeries {
                    symbol: symbol.to_string(),
                    reason: "series mixes equity and option bars".to_string(),
                });
            }
        }
        Ok(Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            underlying: None,
            required: true,
            bars,
        })
    }

    /// Links an option series to its underlying's symbol.
    pub fn with_underlying(mut self, underlying: &str) -> Self {
        self.underlying = Some(underlying.to_string());
        self
    }

    /// Marks the series as optional: gaps in it do not suspend the
    /// engine's decision-making.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn underlying(&self) -> Option<&str> {
        self.underlying.as_deref()
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn is_option(&self) -> bool {
        self.bars.first().is_some_and(Bar::is_option)
    }
}

/// A data source positioned at the engine's current date.
#[derive(Debug, Clone)]
pub struct Instrument {
    source: DataSource,
    cursor: Option<usize>,
    aligned: bool,
    current_date: Option<NaiveDate>,
}

impl Instrument {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            cursor: None,
            aligned: false,
            current_date: None,
        }
    }

    pub fn symbol(&self) -> &str {
        self.source.symbol()
    }

    pub fn underlying(&self) -> Option<&str> {
        self.source.underlying()
    }

    pub fn required(&self) -> bool {
        self.source.required()
    }

    pub fn is_option(&self) -> bool {
        self.source.is_option()
    }

    /// Moves the cursor to the last bar at or before `date`. The cursor
    /// only moves forward; the engine advances dates monotonically.
    pub fn advance_to(&mut self, date: NaiveDate) {
        let bars = self.source.bars();
        let mut cursor = self.cursor;
        let mut next = cursor.map_or(0, |i| i + 1);
        while next < bars.len() && bars[next].date() <= date {
            cursor = Some(next);
            next += 1;
        }
        self.cursor = cursor;
        self.aligned = cursor.is_some_and(|i| bars[i].date() == date);
        self.current_date = Some(date);
    }

    /// True when a bar exists for the engine's current date. Unavailable
    /// instruments report gaps instead of stale data.
    pub fn is_available(&self) -> bool {
        self.aligned
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    /// True only if a bar exists for that exact date; no filling.
    pub fn has_data_at(&self, date: NaiveDate) -> bool {
        self.source
            .bars()
            .binary_search_by_key(&date, Bar::date)
            .is_ok()
    }

    /// Bar `k` trading days before the current date.
    pub fn bar_at(&self, k: usize) -> Result<&Bar, HistsimError> {
        let date = self.current_date.unwrap_or(NaiveDate::MIN);
        if !self.aligned {
            return Err(HistsimError::DataUnavailable {
                symbol: self.symbol().to_string(),
                date,
            });
        }
        let cursor = self.cursor.unwrap_or(0);
        if k > cursor {
            return Err(HistsimError::DataUnavailable {
                symbol: self.symbol().to_string(),
                date,
            });
        }
        Ok(&self.source.bars()[cursor - k])
    }

    /// Close (equities) or bid/ask mid (options) `k` days back.
    pub fn close_at(&self, k: usize) -> Result<f64, HistsimError> {
        Ok(self.bar_at(k)?.mark())
    }

    /// Bid and ask `k` days back; option instruments only.
    pub fn bid_ask_at(&self, k: usize) -> Result<(f64, f64), HistsimError> {
        match self.bar_at(k)? {
            Bar::Option(bar) => Ok((bar.bid, bar.ask)),
            Bar::Equity(_) => Err(HistsimError::InvalidSeries {
                symbol: self.symbol().to_string(),
                reason: "bid/ask requested on an equity series".to_string(),
            }),
        }
    }

    /// Most recent marking price at or before the current date. Used for
    /// NAV marking only; lookback access goes through `close_at`.
    pub fn last_close(&self) -> Option<f64> {
        self.cursor.map(|i| self.source.bars()[i].mark())
    }

    /// Implied volatility of today's quote given the underlying spot.
    pub fn implied_vol(
        &self,
        spot: f64,
        rate: f64,
        dividend_yield: f64,
    ) -> Result<ImpliedVol, HistsimError> {
        let (t, strike, right, mid) = self.quote_terms()?;
        options::solve_implied_volatility(spot, strike, t, rate, dividend_yield, mid, right)
    }

    /// Greeks of today's quote at a given volatility.
    pub fn greeks(
        &self,
        spot: f64,
        rate: f64,
        dividend_yield: f64,
        volatility: f64,
    ) -> Result<Greeks, HistsimError> {
        let (t, strike, right, _) = self.quote_terms()?;
        options::evaluate_greeks(spot, strike, t, rate, dividend_yield, volatility, right)
    }

    fn quote_terms(&self) -> Result<(f64, f64, OptionRight, f64), HistsimError> {
        match self.bar_at(0)? {
            Bar::Option(bar) => {
                let t = (bar.expiration - bar.date).num_days() as f64 / DAYS_PER_YEAR;
                Ok((t, bar.strike, bar.right, bar.mid()))
            }
            Bar::Equity(_) => Err(HistsimError::InvalidSeries {
                symbol: self.symbol().to_string(),
                reason: "option analytics requested on an equity series".to_string(),
            }),
        }
    }
}
