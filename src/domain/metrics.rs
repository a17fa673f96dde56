//! Performance statistics over a recorded NAV series.

use super::engine::NavRecord;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
}

impl Metrics {
    pub fn compute(records: &[NavRecord], initial_capital: f64, risk_free_rate: f64) -> Self {
        let final_nav = records.last().map(|r| r.nav).unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_nav - initial_capital) / initial_capital
        } else {
            0.0
        };

        let trading_days = records.len() as f64;
        let years = trading_days / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(records);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(records, daily_rf);

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

fn compute_drawdown(records: &[NavRecord]) -> (f64, i64) {
    if records.is_empty() {
        return (0.0, 0);
    }

    let mut peak = records[0].nav;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for record in records {
        if record.nav > peak {
            peak = record.nav;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - record.nav) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(records: &[NavRecord], daily_rf: f64) -> (f64, f64) {
    if records.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = records
        .windows(2)
        .map(|w| {
            if w[0].nav > 0.0 {
                (w[1].nav - w[0].nav) / w[0].nav
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: Vec<f64> = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .collect();

    let downside_stddev = if !downside.is_empty() {
        (downside.iter().sum::<f64>() / n).sqrt()
    } else {
        0.0
    };

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
