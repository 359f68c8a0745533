use std::time::Instant;

use super::mean::WeightedMeanAccumulator;

/// `GaugeTimedAvg` is a weighted average where the weight of each sample is
/// the wall-clock time elapsed since the previous update. The first update
/// after construction or reset has nothing to weight against, so it is
/// recorded with weight `1.0` rather than contributing nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimedAvg {
    pub acc: WeightedMeanAccumulator,
    pub last_update: Option<Instant>,
}

impl TimedAvg {
    pub fn update(&mut self, sample: f64, now: Instant) {
        let weight = match self.last_update {
            Some(last) => now.saturating_duration_since(last).as_secs_f64(),
            None => 1.0,
        };
        self.acc.add(sample, weight);
        self.last_update = Some(now);
    }

    pub fn merge(&mut self, other: &TimedAvg) {
        self.acc.merge(&other.acc);
        self.last_update = match (self.last_update, other.last_update) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
    }

    pub fn eval(&self) -> Option<f64> {
        self.acc.mean()
    }
}
