//! Portfolio ledger: cash, signed positions, cost basis, NAV.
//!
//! The ledger is the sole owner of position state. All writes happen
//! through `apply_fill` inside a settlement; entries are zeroed when flat,
//! never deleted, so realized P&L history survives round trips.

use std::collections::BTreeMap;

/// One instrument's position record.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub symbol: String,
    pub quantity: i64,
    pub avg_cost: f64,
    pub realized_pnl: f64,
}

impl LedgerEntry {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity: 0,
            avg_cost: 0.0,
            realized_pnl: 0.0,
        }
    }

    /// Signed market value at a marking price.
    pub fn market_value(&self, mark: f64) -> f64 {
        self.quantity as f64 * mark
    }

    pub fn unrealized_pnl(&self, mark: f64) -> f64 {
        self.quantity as f64 * (mark - self.avg_cost)
    }
}

/// Cash plus position entries. Keyed by symbol in a `BTreeMap` so every
/// iteration order is deterministic (lexicographic by symbol).
#[derive(Debug, Clone)]
pub struct Ledger {
    pub cash: f64,
    pub initial_capital: f64,
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            entries: BTreeMap::new(),
        }
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.entries.get(symbol).map_or(0, |e| e.quantity)
    }

    pub fn entry(&self, symbol: &str) -> Option<&LedgerEntry> {
        self.entries.get(symbol)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Applies a fill: cash moves by `-delta × price - commission`,
    /// the entry's quantity, average cost and realized P&L update.
    /// Commission is a cash cost only; realized P&L tracks price moves.
    pub fn apply_fill(&mut self, symbol: &str, delta: i64, price: f64, commission: f64) {
        if delta == 0 {
            return;
        }
        self.cash -= delta as f64 * price + commission;

        let entry = self
            .entries
            .entry(symbol.to_string())
            .or_insert_with(|| LedgerEntry::new(symbol));
        let old_qty = entry.quantity;
        let new_qty = old_qty + delta;

        if old_qty == 0 || (old_qty > 0) == (delta > 0) {
            // opening or adding in the same direction: weighted average cost
            let total =
                entry.avg_cost * old_qty.abs() as f64 + price * delta.abs() as f64;
            entry.avg_cost = total / new_qty.abs() as f64;
        } else {
            // reducing, closing, or crossing through zero
            let closed = delta.abs().min(old_qty.abs());
            let direction = if old_qty > 0 { 1.0 } else { -1.0 };
            entry.realized_pnl += direction * closed as f64 * (price - entry.avg_cost);
            if new_qty == 0 {
                entry.avg_cost = 0.0;
            } else if (new_qty > 0) != (old_qty > 0) {
                // the remainder is a fresh position opened at the fill price
                entry.avg_cost = price;
            }
        }
        entry.quantity = new_qty;
    }

    /// `cash + Σ(position × mark)`. Entries without a mark (no bar seen
    /// yet) contribute nothing.
    pub fn nav(&self, marks: &BTreeMap<String, f64>) -> f64 {
        let positions: f64 = self
            .entries
            .values()
            .filter(|e| e.quantity != 0)
            .filter_map(|e| marks.get(&e.symbol).map(|&m| e.market_value(m)))
            .sum();
        self.cash + positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs
            .iter()
            .map(|(s, m)| (s.to_string(), *m))
            .collect()
    }

    #[test]
    fn new_ledger_is_all_cash() {
        let ledger = Ledger::new(100_000.0);
        assert!((ledger.cash - 100_000.0).abs() < f64::EPSILON);
        assert_eq!(ledger.position("SPY"), 0);
        assert!((ledger.nav(&marks(&[])) - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn open_long_moves_cash_not_nav() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);

        assert_eq!(ledger.position("SPY"), 100);
        assert!((ledger.cash - 80_000.0).abs() < f64::EPSILON);
        // Filling at the marking price leaves NAV unchanged.
        let nav = ledger.nav(&marks(&[("SPY", 200.0)]));
        assert!((nav - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn commission_reduces_cash_and_nav() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 1.0);
        assert!((ledger.cash - 79_999.0).abs() < f64::EPSILON);
        let nav = ledger.nav(&marks(&[("SPY", 200.0)]));
        assert!((nav - 99_999.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adding_updates_average_cost() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);
        ledger.apply_fill("SPY", 100, 210.0, 0.0);

        let entry = ledger.entry("SPY").unwrap();
        assert_eq!(entry.quantity, 200);
        assert!((entry.avg_cost - 205.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reducing_realizes_pnl() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);
        ledger.apply_fill("SPY", -40, 210.0, 0.0);

        let entry = ledger.entry("SPY").unwrap();
        assert_eq!(entry.quantity, 60);
        assert!((entry.realized_pnl - 400.0).abs() < f64::EPSILON);
        assert!((entry.avg_cost - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn closing_zeroes_entry_without_deleting() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);
        ledger.apply_fill("SPY", -100, 190.0, 0.0);

        let entry = ledger.entry("SPY").unwrap();
        assert_eq!(entry.quantity, 0);
        assert!((entry.avg_cost - 0.0).abs() < f64::EPSILON);
        assert!((entry.realized_pnl - (-1000.0)).abs() < f64::EPSILON);
        // Flat round trip at a loss: all value is back in cash.
        assert!((ledger.cash - 99_000.0).abs() < f64::EPSILON);
        assert!((ledger.nav(&marks(&[("SPY", 190.0)])) - 99_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn crossing_through_zero_reopens_at_fill_price() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);
        ledger.apply_fill("SPY", -150, 220.0, 0.0);

        let entry = ledger.entry("SPY").unwrap();
        assert_eq!(entry.quantity, -50);
        assert!((entry.realized_pnl - 2000.0).abs() < f64::EPSILON);
        assert!((entry.avg_cost - 220.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_round_trip() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", -100, 200.0, 0.0);
        assert!((ledger.cash - 120_000.0).abs() < f64::EPSILON);

        ledger.apply_fill("SPY", 100, 180.0, 0.0);
        let entry = ledger.entry("SPY").unwrap();
        assert_eq!(entry.quantity, 0);
        assert!((entry.realized_pnl - 2000.0).abs() < f64::EPSILON);
        assert!((ledger.cash - 102_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn nav_skips_unmarked_entries() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);
        let nav = ledger.nav(&marks(&[]));
        assert!((nav - 80_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_tracks_mark() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("SPY", 100, 200.0, 0.0);
        let entry = ledger.entry("SPY").unwrap();
        assert!((entry.unrealized_pnl(205.0) - 500.0).abs() < f64::EPSILON);
        assert!((entry.unrealized_pnl(195.0) - (-500.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn entries_iterate_in_symbol_order() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply_fill("TLT", 10, 100.0, 0.0);
        ledger.apply_fill("AGG", 10, 100.0, 0.0);
        ledger.apply_fill("SPY", 10, 100.0, 0.0);
        let symbols: Vec<&str> = ledger.entries().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AGG", "SPY", "TLT"]);
    }
}
