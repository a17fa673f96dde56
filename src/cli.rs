//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::momentum::MomentumAllocator;
use crate::adapters::report::{write_equity_csv, write_fill_csv, MemoryReport};
use crate::domain::bar::OptionRight;
use crate::domain::calendar::TradingCalendar;
use crate::domain::config::SimConfig;
use crate::domain::engine::SimulationEngine;
use crate::domain::error::HistsimError;
use crate::domain::instrument::DataSource;
use crate::domain::metrics::Metrics;
use crate::domain::options::{evaluate_greeks, solve_implied_volatility};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "histsim", about = "Historical market replay simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation with the momentum allocator
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the data directory from the config file
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Equity curve CSV output path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fill log CSV output path
        #[arg(long)]
        fills: Option<PathBuf>,
    },
    /// Print the trading days in a date range
    Calendar {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Print only the number of days
        #[arg(long)]
        count: bool,
    },
    /// Solve implied volatility and Greeks for a single quote
    Iv {
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        strike: f64,
        /// Calendar days to expiration
        #[arg(long)]
        days: f64,
        #[arg(long, default_value_t = 0.0)]
        rate: f64,
        #[arg(long = "yield", default_value_t = 0.0)]
        dividend_yield: f64,
        /// Quoted market price
        #[arg(long)]
        price: f64,
        #[arg(long)]
        put: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            output,
            fills,
        } => run_simulation(&config, data.as_ref(), output.as_ref(), fills.as_ref()),
        Command::Calendar { start, end, count } => run_calendar(start, end, count),
        Command::Iv {
            spot,
            strike,
            days,
            rate,
            dividend_yield,
            price,
            put,
        } => run_iv(spot, strike, days, rate, dividend_yield, price, put),
    }
}

fn fail(err: &HistsimError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_calendar(start: NaiveDate, end: NaiveDate, count: bool) -> ExitCode {
    let calendar = match TradingCalendar::new(start, end) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let days = calendar.trading_days();
    if count {
        println!("{}", days.len());
    } else {
        for day in days {
            println!("{day}");
        }
    }
    ExitCode::SUCCESS
}

fn run_iv(
    spot: f64,
    strike: f64,
    days: f64,
    rate: f64,
    dividend_yield: f64,
    price: f64,
    put: bool,
) -> ExitCode {
    let right = if put {
        OptionRight::Put
    } else {
        OptionRight::Call
    };
    let t = days / 365.0;

    let iv = match solve_implied_volatility(spot, strike, t, rate, dividend_yield, price, right) {
        Ok(iv) => iv,
        Err(e) => return fail(&e),
    };
    if !iv.converged {
        eprintln!("warning: solver budget exhausted, volatility is a best estimate");
    }

    let greeks = match evaluate_greeks(spot, strike, t, rate, dividend_yield, iv.volatility, right)
    {
        Ok(g) => g,
        Err(e) => return fail(&e),
    };

    println!("implied_vol = {:.6}", iv.volatility);
    println!("price       = {:.4}", greeks.price);
    println!("delta       = {:.6}", greeks.delta);
    println!("gamma       = {:.8}", greeks.gamma);
    println!("theta       = {:.4}", greeks.theta);
    println!("vega        = {:.4}", greeks.vega);
    ExitCode::SUCCESS
}

/// Splits a comma-separated symbol list, uppercased, empties skipped.
fn parse_symbols(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Parses `SYMBOL:UNDERLYING` pairs for option series.
fn parse_option_symbols(input: &str) -> Result<Vec<(String, String)>, HistsimError> {
    let mut pairs = Vec::new();
    for token in parse_symbols(input) {
        let Some((symbol, underlying)) = token.split_once(':') else {
            return Err(HistsimError::ConfigInvalid {
                section: "data".into(),
                key: "options".into(),
                reason: format!("expected SYMBOL:UNDERLYING, got {token}"),
            });
        };
        pairs.push((symbol.to_string(), underlying.to_string()));
    }
    Ok(pairs)
}

fn run_simulation(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    output: Option<&PathBuf>,
    fills_output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match FileConfigAdapter::from_file(config_path) {
        Ok(a) => a,
        Err(e) => {
            let err = HistsimError::ConfigParse {
                file: config_path.display().to_string(),
                reason: e.to_string(),
            };
            return fail(&err);
        }
    };

    let sim_config = match SimConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let data_path = match data_override {
        Some(path) => path.clone(),
        None => match adapter.get_string("data", "path") {
            Some(path) => PathBuf::from(path),
            None => {
                return fail(&HistsimError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                });
            }
        },
    };

    let symbols = adapter
        .get_string("data", "symbols")
        .map(|s| parse_symbols(&s))
        .unwrap_or_default();
    if symbols.is_empty() {
        return fail(&HistsimError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        });
    }
    let option_symbols = match adapter
        .get_string("data", "options")
        .map(|s| parse_option_symbols(&s))
        .transpose()
    {
        Ok(pairs) => pairs.unwrap_or_default(),
        Err(e) => return fail(&e),
    };

    let mut engine = match SimulationEngine::new(sim_config.clone()) {
        Ok(engine) => engine,
        Err(e) => return fail(&e),
    };

    let data_port = CsvAdapter::new(data_path);
    let load_start = sim_config.warmup_start.unwrap_or(sim_config.start_date);

    for symbol in &symbols {
        match load_source(&data_port, symbol, load_start, sim_config.end_date) {
            Ok(source) => {
                eprintln!("  {}: {} bars [OK]", symbol, source.bars().len());
                if let Err(e) = engine.add_instrument(source) {
                    return fail(&e);
                }
            }
            Err(e) => return fail(&e),
        }
    }
    for (symbol, underlying) in &option_symbols {
        match load_source(&data_port, symbol, load_start, sim_config.end_date) {
            Ok(source) => {
                let source = source.with_underlying(underlying).optional();
                eprintln!("  {}: {} bars [OK]", symbol, source.bars().len());
                if let Err(e) = engine.add_instrument(source) {
                    return fail(&e);
                }
            }
            Err(e) => return fail(&e),
        }
    }

    let lookback = adapter.get_int("strategy", "lookback_days", 63).max(1) as usize;
    let picks = adapter.get_int("strategy", "num_picks", 2).max(1) as usize;
    let mut decisions = MomentumAllocator::new(lookback, picks);
    let mut report = MemoryReport::new();

    eprintln!(
        "Simulating {} .. {}",
        sim_config.start_date, sim_config.end_date
    );
    if let Err(e) = engine.run(&mut decisions, &mut report) {
        return fail(&e);
    }

    let risk_free = adapter.get_double("strategy", "risk_free_rate", 0.0);
    let metrics = Metrics::compute(&report.navs, sim_config.initial_capital, risk_free);
    eprintln!("Days simulated:    {}", report.navs.len());
    eprintln!("Fills:             {}", report.fills.len());
    eprintln!("Dropped orders:    {}", report.rejected.len());
    eprintln!("Total return:      {:.2}%", 100.0 * metrics.total_return);
    eprintln!(
        "Annualized return: {:.2}%",
        100.0 * metrics.annualized_return
    );
    eprintln!("Sharpe ratio:      {:.2}", metrics.sharpe_ratio);
    eprintln!("Max drawdown:      {:.2}%", 100.0 * metrics.max_drawdown);

    if let Some(path) = output {
        if let Err(e) = write_equity_csv(path, &report.navs) {
            return fail(&e);
        }
        eprintln!("Equity curve written to {}", path.display());
    }
    if let Some(path) = fills_output {
        if let Err(e) = write_fill_csv(path, &report.fills) {
            return fail(&e);
        }
        eprintln!("Fill log written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn load_source(
    data_port: &CsvAdapter,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DataSource, HistsimError> {
    let bars = data_port.fetch_bars(symbol, start, end)?;
    DataSource::new(symbol, symbol, bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_symbols_trims_and_uppercases() {
        assert_eq!(
            parse_symbols(" spy , TLT ,agg "),
            vec!["SPY", "TLT", "AGG"]
        );
        assert!(parse_symbols("").is_empty());
        assert_eq!(parse_symbols("spy,,tlt"), vec!["SPY", "TLT"]);
    }

    #[test]
    fn parse_option_symbols_requires_underlying() {
        let pairs = parse_option_symbols("spx_opt:spx").unwrap();
        assert_eq!(pairs, vec![("SPX_OPT".to_string(), "SPX".to_string())]);

        assert!(matches!(
            parse_option_symbols("spx_opt"),
            Err(HistsimError::ConfigInvalid { .. })
        ));
    }
}
