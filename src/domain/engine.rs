//! Simulation engine: the per-day replay loop.
//!
//! Composes the trading calendar, instruments, ledger and order execution,
//! and drives one deterministic pass over the configured date range.
//! Settlement is atomic per day; the loop never suspends mid-day.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::calendar::TradingCalendar;
use super::config::SimConfig;
use super::error::HistsimError;
use super::execution::{self, ExecutionConfig, FillPolicy, Settlement};
use super::instrument::{DataSource, Instrument};
use super::ledger::Ledger;
use crate::ports::decision_port::DecisionPort;
use crate::ports::report_port::ReportPort;

/// Equity-curve scale applied to the per-day output record.
const NAV_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    WarmingUp,
    Running,
    Completed,
}

/// Normalized per-day output record.
#[derive(Debug, Clone, PartialEq)]
pub struct NavRecord {
    pub date: NaiveDate,
    pub nav: f64,
    /// `NAV_SCALE × nav / initial_capital`, the scaled equity-curve value.
    pub scaled: f64,
}

/// Read-only snapshot handed to the decision callback.
pub struct MarketView<'a> {
    date: NaiveDate,
    instruments: &'a BTreeMap<String, Instrument>,
    ledger: &'a Ledger,
}

impl<'a> MarketView<'a> {
    pub(crate) fn new(
        date: NaiveDate,
        instruments: &'a BTreeMap<String, Instrument>,
        ledger: &'a Ledger,
    ) -> Self {
        Self {
            date,
            instruments,
            ledger,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn instrument(&self, symbol: &str) -> Option<&'a Instrument> {
        self.instruments.get(symbol)
    }

    /// All instruments, in symbol order.
    pub fn instruments(&self) -> impl Iterator<Item = &'a Instrument> {
        self.instruments.values()
    }

    pub fn ledger(&self) -> &'a Ledger {
        self.ledger
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.ledger.position(symbol)
    }

    /// NAV marked at the most recent closes.
    pub fn nav(&self) -> f64 {
        self.ledger.nav(&marks(self.instruments))
    }
}

/// Replays the configured date range day by day.
pub struct SimulationEngine {
    config: SimConfig,
    exec_config: ExecutionConfig,
    instruments: BTreeMap<String, Instrument>,
    ledger: Ledger,
    state: EngineState,
    pending_targets: BTreeMap<String, f64>,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Result<Self, HistsimError> {
        config.validate()?;
        let exec_config = ExecutionConfig {
            commission_per_share: config.commission_per_share,
            fill_policy: config.fill_policy,
        };
        let ledger = Ledger::new(config.initial_capital);
        Ok(Self {
            config,
            exec_config,
            instruments: BTreeMap::new(),
            ledger,
            state: EngineState::Uninitialized,
            pending_targets: BTreeMap::new(),
        })
    }

    /// Attaches a data source as an instrument. Setup-time only.
    pub fn add_instrument(&mut self, source: DataSource) -> Result<(), HistsimError> {
        if self.instruments.contains_key(source.symbol()) {
            return Err(HistsimError::InvalidSeries {
                symbol: source.symbol().to_string(),
                reason: "duplicate instrument symbol".to_string(),
            });
        }
        self.instruments
            .insert(source.symbol().to_string(), Instrument::new(source));
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    /// Runs the simulation to completion. Warmup days (before the
    /// user-visible start date) only advance cursors: no decisions, no
    /// orders, no output records. One call per engine.
    pub fn run(
        &mut self,
        decisions: &mut dyn DecisionPort,
        report: &mut dyn ReportPort,
    ) -> Result<(), HistsimError> {
        if self.state == EngineState::Completed {
            return Ok(());
        }

        let loop_start = self.config.warmup_start.unwrap_or(self.config.start_date);
        let calendar = TradingCalendar::new(loop_start, self.config.end_date)?;

        for date in calendar.trading_days() {
            for instrument in self.instruments.values_mut() {
                instrument.advance_to(date);
            }

            if date < self.config.start_date {
                self.state = EngineState::WarmingUp;
                continue;
            }
            self.state = EngineState::Running;
            self.settle_day(date, decisions, report);
        }

        self.state = EngineState::Completed;
        Ok(())
    }

    // One atomic settlement for one trading day.
    fn settle_day(
        &mut self,
        date: NaiveDate,
        decisions: &mut dyn DecisionPort,
        report: &mut dyn ReportPort,
    ) {
        let marks = marks(&self.instruments);
        let fill_prices = self.fill_prices();

        // Targets queued under NextBarClose settle first, against today's
        // snapshot. They are last day's submissions, not new orders, so a
        // required-data gap today does not hold them back.
        if !self.pending_targets.is_empty() {
            let targets = std::mem::take(&mut self.pending_targets);
            let settlement = execution::settle(
                &mut self.ledger,
                date,
                &targets,
                &fill_prices,
                &marks,
                &self.exec_config,
            );
            report_settlement(report, &settlement);
        }

        // A gap in any required instrument suspends decision-making for
        // this date only; the clock still advances.
        let all_required_available = self
            .instruments
            .values()
            .filter(|i| i.required())
            .all(Instrument::is_available);

        if all_required_available {
            let allocations = {
                let view = MarketView::new(date, &self.instruments, &self.ledger);
                decisions.target_allocations(&view)
            };
            if !allocations.is_empty() {
                let targets = execution::net_targets(&allocations);
                match self.exec_config.fill_policy {
                    FillPolicy::CurrentBarClose => {
                        let settlement = execution::settle(
                            &mut self.ledger,
                            date,
                            &targets,
                            &fill_prices,
                            &marks,
                            &self.exec_config,
                        );
                        report_settlement(report, &settlement);
                    }
                    FillPolicy::NextBarClose => {
                        self.pending_targets = targets;
                    }
                }
            }
        }

        let nav = self.ledger.nav(&marks);
        report.record_nav(&NavRecord {
            date,
            nav,
            scaled: NAV_SCALE * nav / self.ledger.initial_capital,
        });
    }

    // Closes of instruments with a bar on the current date. Instruments in
    // a gap have no fill price and orders against them are dropped.
    fn fill_prices(&self) -> BTreeMap<String, f64> {
        self.instruments
            .values()
            .filter(|i| i.is_available())
            .filter_map(|i| i.close_at(0).ok().map(|c| (i.symbol().to_string(), c)))
            .collect()
    }
}

fn marks(instruments: &BTreeMap<String, Instrument>) -> BTreeMap<String, f64> {
    instruments
        .values()
        .filter_map(|i| i.last_close().map(|c| (i.symbol().to_string(), c)))
        .collect()
}

fn report_settlement(report: &mut dyn ReportPort, settlement: &Settlement) {
    for fill in &settlement.fills {
        report.record_fill(fill);
    }
    for order in &settlement.rejected {
        report.record_rejected(order);
    }
}
