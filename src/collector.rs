//! The collector facade: the handle application code actually reaches for
//! to record a sample, scoped under a name prefix (e.g. `myjob.`).

use std::sync::Arc;

use crate::context::Context;
use crate::error::MetricError;
use crate::metric::{MeanAccumulator, Metric, Value};

/// Scopes every metric name under `prefix.` before touching the shared
/// [`Context`]. Cheap to construct; typically obtained once per job via
/// [`crate::context::get_collector`] and reused.
pub struct Collector {
    context: Arc<Context>,
    prefix: String,
}

impl Collector {
    pub fn new(context: Arc<Context>, prefix: impl Into<String>) -> Self {
        Collector {
            context,
            prefix: prefix.into(),
        }
    }

    /// A sub-collector nested under this one's prefix, e.g.
    /// `get_collector("myjob").get_collector("sub")` records under
    /// `myjob.sub.`.
    pub fn get_collector(&self, prefix: impl AsRef<str>) -> Collector {
        Collector::new(self.context.clone(), self.full_name(prefix.as_ref()))
    }

    fn full_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// Overwrite `name` with a bare number, bypassing the metric algebra
    /// entirely. A later `inc`/`avg` against the same name will report a
    /// kind mismatch rather than silently reinterpreting the raw value.
    pub fn set(&self, name: &str, value: f64) {
        let full = self.full_name(name);
        self.context.data().lock().insert(full, Value::Raw(value));
    }

    /// Add `delta` to a running counter, creating it on first use. Mirrors
    /// the original duck-typed dispatch: an existing raw number is just
    /// added to directly, an existing `Counter` metric is updated through
    /// the algebra, and anything else is a reported kind mismatch that
    /// leaves the entry untouched.
    pub fn inc(&self, name: &str, delta: f64) {
        let full = self.full_name(name);
        let mut data = self.context.data().lock();
        match data.get_mut(&full) {
            Some(Value::Raw(total)) => *total += delta,
            Some(Value::Aggregated(metric @ Metric::Counter(_))) => {
                if let Err(e) = metric.update(delta) {
                    log::error!("cannot increment {full:?}: {e}");
                }
            }
            Some(existing) => {
                log::error!(
                    "cannot increment {full:?}: existing value is a {}",
                    existing.kind()
                );
            }
            None => {
                data.insert(full, Value::Aggregated(Metric::Counter(delta)));
            }
        }
    }

    /// Convenience for `inc(name, 1.0)`.
    pub fn inc_by_one(&self, name: &str) {
        self.inc(name, 1.0);
    }

    /// Feed one sample into `name`'s arithmetic mean gauge, creating it on
    /// first use.
    pub fn avg(&self, name: &str, sample: f64) {
        let full = self.full_name(name);
        let mut data = self.context.data().lock();
        match data.get_mut(&full) {
            Some(Value::Aggregated(metric @ Metric::GaugeAMean(_))) => {
                if let Err(e) = metric.update(sample) {
                    log::error!("cannot average into {full:?}: {e}");
                }
            }
            Some(existing) => {
                log::error!(
                    "cannot average into {full:?}: existing value is a {}",
                    existing.kind()
                );
            }
            None => {
                let mut metric = Metric::GaugeAMean(MeanAccumulator::default());
                if let Err(e) = metric.update(sample) {
                    log::error!("cannot average into {full:?}: {e}");
                    return;
                }
                data.insert(full, Value::Aggregated(metric));
            }
        }
    }

    /// The currently evaluated number for `name`, or `None` if it has never
    /// been set or has no samples yet.
    pub fn get(&self, name: &str) -> Option<f64> {
        let full = self.full_name(name);
        self.context.data().lock().get(&full).and_then(Value::evaluate)
    }

    /// A clone of the underlying [`Metric`] for `name`, for callers that
    /// need more than the evaluated number (e.g. to merge it elsewhere).
    /// `None` if `name` holds a raw value or does not exist.
    pub fn get_metric(&self, name: &str) -> Option<Metric> {
        let full = self.full_name(name);
        match self.context.data().lock().get(&full) {
            Some(Value::Aggregated(metric)) => Some(metric.clone()),
            _ => None,
        }
    }

    /// Register or replace the accumulator at `name` directly, for metric
    /// kinds `inc`/`avg` do not construct implicitly (extrema, medians,
    /// mode, weighted means, timed averages).
    pub fn set_metric(&self, name: &str, metric: Metric) {
        let full = self.full_name(name);
        self.context
            .data()
            .lock()
            .insert(full, Value::Aggregated(metric));
    }

    /// Feed one weighted sample into one of the weighted-mean gauges
    /// (`GaugeWAMean`/`GaugeWGMean`/`GaugeWHMean`), which must already be
    /// registered via [`Collector::set_metric`]. Returns an error if `name`
    /// is absent, holds a raw value, or holds a non-weighted metric.
    pub fn update_weighted(&self, name: &str, sample: f64, weight: f64) -> Result<(), MetricError> {
        let full = self.full_name(name);
        let mut data = self.context.data().lock();
        match data.get_mut(&full) {
            Some(Value::Aggregated(metric)) => metric.update_weighted(sample, weight),
            Some(Value::Raw(_)) => Err(MetricError::Incompatible {
                left: "Raw",
                right: "weighted sample",
            }),
            None => Err(MetricError::Empty("weighted metric")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn collector() -> Collector {
        Collector::new(Arc::new(Context::new()), "myjob")
    }

    #[test]
    fn inc_creates_and_accumulates_a_counter() {
        let c = collector();
        c.inc("count", 1.0);
        c.inc("count", 1.0);
        c.inc("count", 2.0);
        assert_eq!(c.get("count"), Some(4.0));
    }

    #[test]
    fn nested_collector_prefixes_full_name() {
        let c = collector();
        let sub = c.get_collector("sub");
        sub.avg("duration", 0.5);
        sub.avg("duration", 0.6);
        assert_eq!(c.get("sub.duration"), Some(0.55));
    }

    #[test]
    fn set_overwrites_with_a_raw_value() {
        let c = collector();
        c.set("level", 3.0);
        assert_eq!(c.get("level"), Some(3.0));
    }

    #[test]
    fn inc_adds_in_place_to_an_existing_raw_value() {
        let c = collector();
        c.set("level", 3.0);
        c.inc("level", 1.0);
        assert_eq!(c.get("level"), Some(4.0));
    }

    #[test]
    fn inc_against_mismatched_kind_is_reported_and_skipped() {
        let c = collector();
        c.set_metric("level", Metric::GaugeMidRange(Default::default()));
        c.inc("level", 1.0);
        assert_eq!(c.get("level"), None);
    }

    #[test]
    fn get_metric_returns_none_for_raw_values() {
        let c = collector();
        c.set("level", 3.0);
        assert!(c.get_metric("level").is_none());
    }

    #[test]
    fn update_weighted_feeds_a_registered_weighted_mean() {
        let c = collector();
        c.set_metric(
            "latency",
            Metric::GaugeWAMean(crate::metric::WeightedMeanAccumulator::default()),
        );
        c.update_weighted("latency", 10.0, 1.0).unwrap();
        c.update_weighted("latency", 20.0, 3.0).unwrap();
        assert_eq!(c.get("latency"), Some(17.5));
    }

    #[test]
    fn update_weighted_against_an_absent_name_is_an_error() {
        let c = collector();
        assert!(c.update_weighted("missing", 1.0, 1.0).is_err());
    }

    #[test]
    fn update_weighted_against_a_raw_value_is_an_error() {
        let c = collector();
        c.set("level", 3.0);
        assert!(c.update_weighted("level", 1.0, 1.0).is_err());
    }
}
