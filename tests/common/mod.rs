#![allow(dead_code)]

use chrono::NaiveDate;
use histsim::domain::bar::{Bar, EquityBar, OptionBar, OptionRight};
use histsim::domain::config::SimConfig;
use histsim::domain::engine::MarketView;
use histsim::domain::execution::{FillPolicy, TargetAllocation};
use histsim::domain::instrument::DataSource;
use histsim::ports::decision_port::DecisionPort;
use std::collections::HashMap;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn equity_bar(d: NaiveDate, close: f64) -> Bar {
    Bar::Equity(EquityBar {
        date: d,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 10_000,
    })
}

pub fn option_bar(
    d: NaiveDate,
    bid: f64,
    ask: f64,
    expiration: NaiveDate,
    strike: f64,
    right: OptionRight,
) -> Bar {
    Bar::Option(OptionBar {
        date: d,
        bid,
        ask,
        expiration,
        strike,
        right,
    })
}

/// Equity source with one bar per given day.
pub fn equity_source(symbol: &str, closes: &[(NaiveDate, f64)]) -> DataSource {
    let bars = closes.iter().map(|&(d, c)| equity_bar(d, c)).collect();
    DataSource::new(symbol, symbol, bars).unwrap()
}

/// The first full trading week of October 2015 (Oct 3/4 are a weekend).
pub fn october_days() -> Vec<NaiveDate> {
    vec![
        date(2015, 10, 1),
        date(2015, 10, 2),
        date(2015, 10, 5),
        date(2015, 10, 6),
        date(2015, 10, 7),
    ]
}

pub fn flat_closes(days: &[NaiveDate], close: f64) -> Vec<(NaiveDate, f64)> {
    days.iter().map(|&d| (d, close)).collect()
}

pub fn sample_config() -> SimConfig {
    SimConfig {
        start_date: date(2015, 10, 1),
        end_date: date(2015, 10, 7),
        warmup_start: None,
        initial_capital: 100_000.0,
        commission_per_share: 0.0,
        fill_policy: FillPolicy::CurrentBarClose,
    }
}

/// Replays a fixed script of per-date targets and records which dates the
/// engine asked for decisions on.
pub struct ScriptedDecisions {
    script: HashMap<NaiveDate, Vec<TargetAllocation>>,
    pub asked: Vec<NaiveDate>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            asked: Vec::new(),
        }
    }

    pub fn on(mut self, d: NaiveDate, targets: &[(&str, f64)]) -> Self {
        self.script.insert(
            d,
            targets
                .iter()
                .map(|(symbol, weight)| TargetAllocation {
                    symbol: symbol.to_string(),
                    weight: *weight,
                })
                .collect(),
        );
        self
    }
}

impl DecisionPort for ScriptedDecisions {
    fn target_allocations(&mut self, view: &MarketView) -> Vec<TargetAllocation> {
        self.asked.push(view.date());
        self.script.get(&view.date()).cloned().unwrap_or_default()
    }
}
