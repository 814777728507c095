//! Bounded probability history per market

use market_core::MarketProbability;
use std::collections::VecDeque;

/// Samples kept per market
pub const HISTORY_CAPACITY: usize = 256;

/// Most recent probability samples of one market, oldest first
#[derive(Debug, Clone)]
pub struct ProbabilityHistory {
    samples: VecDeque<MarketProbability>,
    capacity: usize,
}

impl Default for ProbabilityHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ProbabilityHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest when full
    ///
    /// A sample at the same timestamp as the latest one replaces it.
    pub fn record(&mut self, sample: MarketProbability) {
        if let Some(last) = self.samples.back_mut() {
            if last.timestamp == sample.timestamp {
                *last = sample;
                return;
            }
        }

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&MarketProbability> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> Vec<MarketProbability> {
        self.samples.iter().copied().collect()
    }

    /// Chart series: the opening 50/50 sample at creation, then recorded samples
    pub fn series_from(&self, created_at: i64) -> Vec<MarketProbability> {
        let mut series = Vec::with_capacity(self.samples.len() + 1);
        series.push(MarketProbability::new(created_at, 0.5, 0.5));
        series.extend(self.samples.iter().filter(|s| s.timestamp > created_at).copied());
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64, yes: f64) -> MarketProbability {
        MarketProbability::new(ts, yes, 1.0 - yes)
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = ProbabilityHistory::with_capacity(3);
        for ts in 1..=5 {
            history.record(sample(ts, 0.5));
        }

        let timestamps: Vec<i64> = history.samples().iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![3, 4, 5]);
    }

    #[test]
    fn test_same_timestamp_replaces() {
        let mut history = ProbabilityHistory::default();
        history.record(sample(10, 0.4));
        history.record(sample(10, 0.7));

        assert_eq!(history.len(), 1);
        assert!((history.latest().unwrap().yes_probability - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_series_starts_at_even_odds() {
        let mut history = ProbabilityHistory::default();
        history.record(sample(200, 0.65));

        let series = history.series_from(100);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].timestamp, 100);
        assert_eq!(series[0].yes_probability, 0.5);
        assert_eq!(series[1].timestamp, 200);
    }
}
