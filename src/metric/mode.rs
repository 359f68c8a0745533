use indexmap::IndexMap;
use ordered_float::OrderedFloat;

/// `GaugeMode` tracks a frequency table of observed values. Merging sums the
/// per-value counts; evaluation returns the value with the highest count,
/// ties broken by insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeCounts {
    pub counts: IndexMap<OrderedFloat<f64>, u64>,
}

impl ModeCounts {
    pub fn update(&mut self, sample: f64) {
        *self.counts.entry(OrderedFloat(sample)).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &ModeCounts) {
        for (value, count) in &other.counts {
            *self.counts.entry(*value).or_insert(0) += count;
        }
    }

    pub fn eval(&self) -> Option<f64> {
        // `Iterator::max_by_key` keeps the *last* element on a tie; fold
        // manually with a strict `>` so the earliest-inserted value wins
        // instead, matching insertion-order tie-breaking.
        let mut best: Option<(OrderedFloat<f64>, u64)> = None;
        for (value, count) in &self.counts {
            match best {
                Some((_, best_count)) if *count <= best_count => {}
                _ => best = Some((*value, *count)),
            }
        }
        best.map(|(value, _)| value.into_inner())
    }
}
