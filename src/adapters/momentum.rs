//! Example decision adapter: monthly top-N momentum rotation.
//!
//! Scores every required equity instrument by rate-of-change over a
//! lookback window, ranks deterministically, and rebalances into equal
//! weights on the first trading day of each month. Instruments falling out
//! of the top set get an explicit zero target so they are closed.

use chrono::Datelike;
use std::collections::HashSet;

use crate::domain::engine::MarketView;
use crate::domain::execution::TargetAllocation;
use crate::domain::ranking::RankingTable;
use crate::ports::decision_port::DecisionPort;

pub struct MomentumAllocator {
    lookback_days: usize,
    num_picks: usize,
    last_rebalance: Option<(i32, u32)>,
}

impl MomentumAllocator {
    pub fn new(lookback_days: usize, num_picks: usize) -> Self {
        Self {
            lookback_days,
            num_picks: num_picks.max(1),
            last_rebalance: None,
        }
    }
}

impl DecisionPort for MomentumAllocator {
    fn target_allocations(&mut self, view: &MarketView) -> Vec<TargetAllocation> {
        let month = (view.date().year(), view.date().month());
        if self.last_rebalance == Some(month) {
            return Vec::new();
        }
        self.last_rebalance = Some(month);

        let mut scores = Vec::new();
        for instrument in view.instruments() {
            if instrument.is_option() || !instrument.required() {
                continue;
            }
            // Instruments without full lookback depth sit out this cycle.
            let (Ok(now), Ok(then)) = (
                instrument.close_at(0),
                instrument.close_at(self.lookback_days),
            ) else {
                continue;
            };
            scores.push((instrument.symbol().to_string(), now / then - 1.0));
        }

        let table = RankingTable::from_scores(scores);
        let picked: HashSet<&str> = table
            .top(self.num_picks)
            .iter()
            .map(|e| e.symbol.as_str())
            .collect();
        let weight = 1.0 / self.num_picks as f64;

        table
            .entries()
            .iter()
            .map(|entry| TargetAllocation {
                symbol: entry.symbol.clone(),
                weight: if picked.contains(entry.symbol.as_str()) {
                    weight
                } else {
                    0.0
                },
            })
            .collect()
    }
}
