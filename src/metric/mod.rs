//! The metric algebra: a closed set of accumulator kinds that know how to
//! absorb a sample, merge with a same-kind snapshot from another thread, and
//! evaluate to the single number a handler flushes.
//!
//! `Metric` is deliberately a plain enum rather than a `dyn Trait` object:
//! the set of kinds is fixed and known at compile time, and matching on the
//! concrete variant lets `merge` detect kind mismatches without downcasting.

mod extremum;
mod mean;
mod median;
mod mode;
mod timed_avg;

use std::time::Instant;

pub use extremum::{Extremum, MidRange};
pub use mean::{MeanAccumulator, WeightedMeanAccumulator};
pub use median::MedianSamples;
pub use mode::ModeCounts;
pub use timed_avg::TimedAvg;

use crate::error::MetricError;

/// `GaugeGMean`/`GaugeHMean` (and their weighted counterparts) take the
/// logarithm or reciprocal of every sample, which is undefined or
/// sign-reversing for `sample <= 0`.
fn require_positive_sample(sample: f64) -> Result<(), MetricError> {
    if sample > 0.0 {
        Ok(())
    } else {
        Err(MetricError::NonPositiveSample(sample))
    }
}

/// Selects how a `GaugeWGMean` reports its accumulated value: the raw mean
/// of logarithms (`LogDomain`), or that mean exponentiated back into the
/// original unit (`Linear`), matching the geometric mean's own convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GMeanOutput {
    #[default]
    Linear,
    LogDomain,
}

/// A single named metric's accumulated state. Every variant supports
/// `update` (absorb one sample), `merge` (fold in another snapshot of the
/// same kind) and `evaluate` (produce the flushed number).
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Counter(f64),
    Timer(f64),
    Gauge(f64),
    GaugeMin(Extremum),
    GaugeMax(Extremum),
    GaugeMidRange(MidRange),
    GaugeMedian(MedianSamples),
    GaugeMode(ModeCounts),
    GaugeAMean(MeanAccumulator),
    GaugeGMean(MeanAccumulator),
    GaugeHMean(MeanAccumulator),
    GaugeQMean(MeanAccumulator),
    GaugeWAMean(WeightedMeanAccumulator),
    GaugeWGMean(WeightedMeanAccumulator, GMeanOutput),
    GaugeWHMean(WeightedMeanAccumulator),
    GaugeTimedAvg(TimedAvg),
}

impl Metric {
    /// Alias constructor for `GaugeAMean`, matching the original `GaugeAvg`
    /// name.
    pub fn gauge_avg() -> Metric {
        Metric::GaugeAMean(MeanAccumulator::default())
    }

    /// Alias constructor for `GaugeQMean`, matching the original `GaugeRMS`
    /// name.
    pub fn gauge_rms() -> Metric {
        Metric::GaugeQMean(MeanAccumulator::default())
    }

    /// The variant name as used by `{"type": ...}` handler enrichment and
    /// by error messages. Matches the original class names exactly,
    /// including the `GaugeAvg`/`GaugeRMS` aliasing at the config layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "Counter",
            Metric::Timer(_) => "Timer",
            Metric::Gauge(_) => "Gauge",
            Metric::GaugeMin(_) => "GaugeMin",
            Metric::GaugeMax(_) => "GaugeMax",
            Metric::GaugeMidRange(_) => "GaugeMidRange",
            Metric::GaugeMedian(_) => "GaugeMedian",
            Metric::GaugeMode(_) => "GaugeMode",
            Metric::GaugeAMean(_) => "GaugeAMean",
            Metric::GaugeGMean(_) => "GaugeGMean",
            Metric::GaugeHMean(_) => "GaugeHMean",
            Metric::GaugeQMean(_) => "GaugeQMean",
            Metric::GaugeWAMean(_) => "GaugeWAMean",
            Metric::GaugeWGMean(_, _) => "GaugeWGMean",
            Metric::GaugeWHMean(_) => "GaugeWHMean",
            Metric::GaugeTimedAvg(_) => "GaugeTimedAvg",
        }
    }

    /// Absorb one unweighted sample. Variants that require a weight
    /// (`GaugeW*Mean`) or a timestamp (`GaugeTimedAvg`) are updated through
    /// their dedicated methods instead and ignore this entry point.
    ///
    /// Returns a domain error, without mutating the accumulator, for a
    /// non-positive sample fed to a geometric or harmonic mean (`ln`/`1/x`
    /// are undefined or sign-reversing there).
    pub fn update(&mut self, sample: f64) -> Result<(), MetricError> {
        match self {
            Metric::Counter(total) => *total += sample,
            Metric::Timer(total) => *total += sample,
            Metric::Gauge(value) => *value = sample,
            Metric::GaugeMin(ext) => ext.update_min(sample),
            Metric::GaugeMax(ext) => ext.update_max(sample),
            Metric::GaugeMidRange(mid) => mid.update(sample),
            Metric::GaugeMedian(samples) => samples.update(sample),
            Metric::GaugeMode(counts) => counts.update(sample),
            Metric::GaugeAMean(acc) => acc.add(sample),
            Metric::GaugeGMean(acc) => {
                require_positive_sample(sample)?;
                acc.add(sample.ln());
            }
            Metric::GaugeHMean(acc) => {
                require_positive_sample(sample)?;
                acc.add(1.0 / sample);
            }
            Metric::GaugeQMean(acc) => acc.add(sample * sample),
            Metric::GaugeWAMean(acc) => acc.add(sample, 1.0),
            Metric::GaugeWGMean(acc, _) => {
                require_positive_sample(sample)?;
                acc.add(sample.ln(), 1.0);
            }
            Metric::GaugeWHMean(acc) => {
                require_positive_sample(sample)?;
                acc.add(1.0 / sample, 1.0);
            }
            Metric::GaugeTimedAvg(timed) => timed.update(sample, Instant::now()),
        }
        Ok(())
    }

    /// Absorb one weighted sample. Valid only for the weighted means;
    /// calling it on any other variant updates nothing and returns an
    /// incompatible-kind style error through `update` semantics being
    /// bypassed entirely, so callers should route by `kind()` first.
    pub fn update_weighted(&mut self, sample: f64, weight: f64) -> Result<(), MetricError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(MetricError::InvalidWeight(weight));
        }
        match self {
            Metric::GaugeWAMean(acc) => acc.add(sample, weight),
            Metric::GaugeWGMean(acc, _) => {
                require_positive_sample(sample)?;
                acc.add(sample.ln(), weight);
            }
            Metric::GaugeWHMean(acc) => {
                require_positive_sample(sample)?;
                acc.add(1.0 / sample, weight);
            }
            other => {
                return Err(MetricError::Incompatible {
                    left: other.kind(),
                    right: "weighted sample",
                })
            }
        }
        Ok(())
    }

    /// Fold another snapshot of the same kind into this one. Mismatched
    /// kinds are a domain error rather than a panic: the caller (the
    /// context's merge pass) logs and skips rather than aborting the
    /// whole flush.
    pub fn merge(&mut self, other: &Metric) -> Result<(), MetricError> {
        match (self, other) {
            (Metric::Counter(total), Metric::Counter(addend)) => {
                *total += addend;
                Ok(())
            }
            (Metric::Timer(total), Metric::Timer(addend)) => {
                *total += addend;
                Ok(())
            }
            (Metric::Gauge(value), Metric::Gauge(other)) => {
                *value = *other;
                Ok(())
            }
            (Metric::GaugeMin(ext), Metric::GaugeMin(other)) => {
                ext.merge_min(other);
                Ok(())
            }
            (Metric::GaugeMax(ext), Metric::GaugeMax(other)) => {
                ext.merge_max(other);
                Ok(())
            }
            (Metric::GaugeMidRange(mid), Metric::GaugeMidRange(other)) => {
                mid.merge(other);
                Ok(())
            }
            (Metric::GaugeMedian(samples), Metric::GaugeMedian(other)) => {
                samples.merge(other);
                Ok(())
            }
            (Metric::GaugeMode(counts), Metric::GaugeMode(other)) => {
                counts.merge(other);
                Ok(())
            }
            (Metric::GaugeAMean(acc), Metric::GaugeAMean(other))
            | (Metric::GaugeGMean(acc), Metric::GaugeGMean(other))
            | (Metric::GaugeHMean(acc), Metric::GaugeHMean(other))
            | (Metric::GaugeQMean(acc), Metric::GaugeQMean(other)) => {
                acc.merge(other);
                Ok(())
            }
            (Metric::GaugeWAMean(acc), Metric::GaugeWAMean(other))
            | (Metric::GaugeWHMean(acc), Metric::GaugeWHMean(other)) => {
                acc.merge(other);
                Ok(())
            }
            (Metric::GaugeWGMean(acc, _), Metric::GaugeWGMean(other, _)) => {
                acc.merge(other);
                Ok(())
            }
            (Metric::GaugeTimedAvg(timed), Metric::GaugeTimedAvg(other)) => {
                timed.merge(other);
                Ok(())
            }
            (this, other) => Err(MetricError::Incompatible {
                left: this.kind(),
                right: other.kind(),
            }),
        }
    }

    /// Produce the single number a handler flushes for this metric.
    /// `None` means no samples were ever recorded (an empty mean/median/
    /// mode/extremum): the caller omits the key from the flushed snapshot.
    pub fn evaluate(&self) -> Option<f64> {
        match self {
            Metric::Counter(total) => Some(*total),
            Metric::Timer(total) => Some(*total),
            Metric::Gauge(value) => Some(*value),
            Metric::GaugeMin(ext) | Metric::GaugeMax(ext) => ext.value,
            Metric::GaugeMidRange(mid) => mid.eval(),
            Metric::GaugeMedian(samples) => samples.eval(),
            Metric::GaugeMode(counts) => counts.eval(),
            Metric::GaugeAMean(acc) => acc.mean(),
            Metric::GaugeGMean(acc) => acc.mean().map(f64::exp),
            Metric::GaugeHMean(acc) => acc.mean().map(|m| 1.0 / m),
            Metric::GaugeQMean(acc) => acc.mean().map(f64::sqrt),
            Metric::GaugeWAMean(acc) => acc.mean(),
            Metric::GaugeWGMean(acc, output) => acc.mean().map(|m| match output {
                GMeanOutput::Linear => m.exp(),
                GMeanOutput::LogDomain => m,
            }),
            Metric::GaugeWHMean(acc) => acc.mean().map(|m| 1.0 / m),
            Metric::GaugeTimedAvg(timed) => timed.eval(),
        }
    }

    /// A structured document describing this metric's current value,
    /// suitable for the serializing handlers. At minimum `{"value": ...}`;
    /// `GaugeMidRange` additionally exports its `min`/`max` bounds.
    pub fn render(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut doc = serde_json::Map::new();
        if let Some(value) = self.evaluate() {
            doc.insert("value".to_string(), serde_json::json!(value));
        }
        if let Metric::GaugeMidRange(mid) = self {
            doc.insert("min".to_string(), serde_json::json!(mid.min));
            doc.insert("max".to_string(), serde_json::json!(mid.max));
        }
        doc
    }

}

/// The value stored under a metric name in a [`crate::context::Context`].
/// Most entries are full [`Metric`] accumulators, but `Collector::set`
/// stores a bare number directly without going through the algebra, so the
/// context has to dispatch dynamically on which of the two it is holding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Raw(f64),
    Aggregated(Metric),
}

impl Value {
    pub fn evaluate(&self) -> Option<f64> {
        match self {
            Value::Raw(n) => Some(*n),
            Value::Aggregated(metric) => metric.evaluate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Raw(_) => "Raw",
            Value::Aggregated(metric) => metric.kind(),
        }
    }

    pub fn merge(&mut self, other: &Value) -> Result<(), MetricError> {
        match (self, other) {
            (Value::Raw(a), Value::Raw(b)) => {
                *a += *b;
                Ok(())
            }
            (Value::Aggregated(a), Value::Aggregated(b)) => a.merge(b),
            (this, other) => Err(MetricError::Incompatible {
                left: this.kind(),
                right: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amean() -> Metric {
        Metric::GaugeAMean(MeanAccumulator::default())
    }

    #[test]
    fn counter_is_additive() {
        let mut total = Metric::Counter(0.0);
        total.update(2.0).unwrap();
        total.update(2.0).unwrap();
        let mut other = Metric::Counter(0.0);
        other.update(4.0).unwrap();
        total.merge(&other).unwrap();
        assert_eq!(total.evaluate(), Some(8.0));
    }

    #[test]
    fn gmean_matches_known_product() {
        let mut m = Metric::GaugeGMean(MeanAccumulator::default());
        for sample in [5.0, 20.0, 270.0] {
            m.update(sample).unwrap();
        }
        assert!((m.evaluate().unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn hmean_matches_known_reciprocal_sum() {
        let mut m = Metric::GaugeHMean(MeanAccumulator::default());
        for sample in [5.0, 10.0, 30.0] {
            m.update(sample).unwrap();
        }
        assert!((m.evaluate().unwrap() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn qmean_matches_known_rms() {
        let mut m = Metric::GaugeQMean(MeanAccumulator::default());
        for sample in [1.0, 5.0, 7.0] {
            m.update(sample).unwrap();
        }
        assert!((m.evaluate().unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn mean_bounds_hold_across_same_samples() {
        let samples = [2.0, 3.0, 9.0, 16.0];
        let mut h = Metric::GaugeHMean(MeanAccumulator::default());
        let mut g = Metric::GaugeGMean(MeanAccumulator::default());
        let mut a = Metric::GaugeAMean(MeanAccumulator::default());
        let mut q = Metric::GaugeQMean(MeanAccumulator::default());
        for s in samples {
            h.update(s).unwrap();
            g.update(s).unwrap();
            a.update(s).unwrap();
            q.update(s).unwrap();
        }
        let (h, g, a, q) = (
            h.evaluate().unwrap(),
            g.evaluate().unwrap(),
            a.evaluate().unwrap(),
            q.evaluate().unwrap(),
        );
        assert!(h <= g + 1e-9);
        assert!(g <= a + 1e-9);
        assert!(a <= q + 1e-9);
    }

    #[test]
    fn merge_type_mismatch_is_reported_not_panicked() {
        let mut counter = Metric::Counter(1.0);
        let gauge = Metric::Gauge(1.0);
        let err = counter.merge(&gauge).unwrap_err();
        assert!(matches!(err, MetricError::Incompatible { .. }));
    }

    #[test]
    fn empty_accumulators_evaluate_to_none() {
        assert_eq!(amean().evaluate(), None);
        assert_eq!(Metric::GaugeMedian(MedianSamples::default()).evaluate(), None);
        assert_eq!(Metric::GaugeMode(ModeCounts::default()).evaluate(), None);
        assert_eq!(Metric::GaugeMin(Extremum::default()).evaluate(), None);
    }

    #[test]
    fn midrange_merge_prefers_whichever_side_is_set() {
        let mut a = MidRange { min: Some(3.0), max: None };
        let b = MidRange { min: None, max: Some(9.0) };
        a.merge(&b);
        assert_eq!(a, MidRange { min: Some(3.0), max: Some(9.0) });
    }

    #[test]
    fn gauge_avg_and_rms_aliases_match_their_underlying_kind() {
        assert_eq!(Metric::gauge_avg().kind(), "GaugeAMean");
        assert_eq!(Metric::gauge_rms().kind(), "GaugeQMean");
    }

    #[test]
    fn mode_eval_breaks_ties_by_insertion_order() {
        let mut m = Metric::GaugeMode(ModeCounts::default());
        m.update(7.0).unwrap();
        m.update(3.0).unwrap();
        assert_eq!(m.evaluate(), Some(7.0));
    }

    #[test]
    fn mode_merge_sums_counts() {
        let mut a = Metric::GaugeMode(ModeCounts::default());
        a.update(1.0).unwrap();
        a.update(1.0).unwrap();
        a.update(2.0).unwrap();
        let mut b = Metric::GaugeMode(ModeCounts::default());
        b.update(2.0).unwrap();
        b.update(2.0).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.evaluate(), Some(2.0));
    }

    #[test]
    fn gmean_rejects_a_non_positive_sample() {
        let mut m = Metric::GaugeGMean(MeanAccumulator::default());
        let err = m.update(0.0).unwrap_err();
        assert!(matches!(err, MetricError::NonPositiveSample(_)));
        // the rejected sample must not have poisoned the accumulator
        assert_eq!(m.evaluate(), None);
    }

    #[test]
    fn hmean_rejects_a_negative_sample() {
        let mut m = Metric::GaugeHMean(MeanAccumulator::default());
        let err = m.update(-1.0).unwrap_err();
        assert!(matches!(err, MetricError::NonPositiveSample(_)));
    }

    #[test]
    fn value_raw_merge_sums_rather_than_overwrites() {
        let mut a = Value::Raw(3.0);
        let b = Value::Raw(4.0);
        a.merge(&b).unwrap();
        assert_eq!(a, Value::Raw(7.0));
    }
}
