//! Order execution: target weights to deterministic fills.
//!
//! `target_shares` truncates toward zero, so realized exposure never
//! exceeds the target weight in magnitude. A settlement resolves every
//! netted target against one NAV snapshot and one price snapshot;
//! instruments without a resolvable price drop their order.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::ledger::Ledger;

/// Which bar's close executes a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Fill at the close of the decision day's bar.
    CurrentBarClose,
    /// Queue and fill at the close of the next trading day's bar.
    NextBarClose,
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current_bar_close" => Ok(FillPolicy::CurrentBarClose),
            "next_bar_close" => Ok(FillPolicy::NextBarClose),
            other => Err(format!("unknown fill policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub commission_per_share: f64,
    pub fill_policy: FillPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            commission_per_share: 0.0,
            fill_policy: FillPolicy::CurrentBarClose,
        }
    }
}

/// A decision callback's requested portfolio weight for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAllocation {
    pub symbol: String,
    pub weight: f64,
}

/// Shares needed to reach `weight × nav` of exposure at `price`,
/// truncated toward zero.
pub fn target_shares(weight: f64, nav: f64, price: f64) -> i64 {
    (weight * nav / price).trunc() as i64
}

/// Nets duplicate targets within one settlement window: the last target
/// submitted for a symbol wins, so at most one delta per instrument is
/// applied.
pub fn net_targets(allocations: &[TargetAllocation]) -> BTreeMap<String, f64> {
    let mut netted = BTreeMap::new();
    for alloc in allocations {
        netted.insert(alloc.symbol.clone(), alloc.weight);
    }
    netted
}

/// One executed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub symbol: String,
    pub delta_shares: i64,
    pub fill_price: f64,
    pub commission: f64,
}

/// An order dropped for lack of a fill price. Never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub date: NaiveDate,
    pub symbol: String,
    pub weight: f64,
}

/// Outcome of one settlement window.
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    pub fills: Vec<Fill>,
    pub rejected: Vec<RejectedOrder>,
}

/// Settles netted targets against the ledger. One NAV snapshot and one
/// price snapshot cover every order; targets iterate in symbol order.
pub fn settle(
    ledger: &mut Ledger,
    date: NaiveDate,
    targets: &BTreeMap<String, f64>,
    fill_prices: &BTreeMap<String, f64>,
    marks: &BTreeMap<String, f64>,
    config: &ExecutionConfig,
) -> Settlement {
    let nav = ledger.nav(marks);
    let mut settlement = Settlement::default();

    for (symbol, &weight) in targets {
        let Some(&price) = fill_prices.get(symbol).filter(|&&p| p > 0.0) else {
            settlement.rejected.push(RejectedOrder {
                date,
                symbol: symbol.clone(),
                weight,
            });
            continue;
        };

        let delta = target_shares(weight, nav, price) - ledger.position(symbol);
        if delta == 0 {
            continue;
        }
        let commission = delta.unsigned_abs() as f64 * config.commission_per_share;
        ledger.apply_fill(symbol, delta, price, commission);
        settlement.fills.push(Fill {
            date,
            symbol: symbol.clone(),
            delta_shares: delta,
            fill_price: price,
            commission,
        });
    }

    settlement
}
