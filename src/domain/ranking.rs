//! Per-cycle ranking tables.
//!
//! A table is built fresh each decision cycle and never mutated. Ordering
//! is fully deterministic: descending by score, ties broken
//! lexicographically by symbol, NaN scores last.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedScore {
    pub symbol: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingTable {
    entries: Vec<RankedScore>,
}

impl RankingTable {
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut entries: Vec<RankedScore> = scores
            .into_iter()
            .map(|(symbol, score)| RankedScore { symbol, score })
            .collect();
        entries.sort_by(|a, b| {
            score_order(a.score, b.score).then_with(|| a.symbol.cmp(&b.symbol))
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[RankedScore] {
        &self.entries
    }

    /// The `n` best-scoring entries (fewer if the table is smaller).
    pub fn top(&self, n: usize) -> &[RankedScore] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn score_order(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
