/// Backs `GaugeMin` and `GaugeMax`: a single running extreme value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extremum {
    pub value: Option<f64>,
}

impl Extremum {
    pub fn update_min(&mut self, sample: f64) {
        self.value = Some(match self.value {
            Some(current) => current.min(sample),
            None => sample,
        });
    }

    pub fn update_max(&mut self, sample: f64) {
        self.value = Some(match self.value {
            Some(current) => current.max(sample),
            None => sample,
        });
    }

    pub fn merge_min(&mut self, other: &Extremum) {
        self.value = combine(self.value, other.value, f64::min);
    }

    pub fn merge_max(&mut self, other: &Extremum) {
        self.value = combine(self.value, other.value, f64::max);
    }
}

/// `GaugeMidRange` tracks min and max independently; `eval` is their average.
/// When merging two snapshots, each side combines independently: if both
/// sides have a bound set it is min/max-combined, otherwise whichever side
/// has it wins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MidRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MidRange {
    pub fn update(&mut self, sample: f64) {
        self.min = Some(match self.min {
            Some(current) => current.min(sample),
            None => sample,
        });
        self.max = Some(match self.max {
            Some(current) => current.max(sample),
            None => sample,
        });
    }

    pub fn merge(&mut self, other: &MidRange) {
        self.min = combine(self.min, other.min, f64::min);
        self.max = combine(self.max, other.max, f64::max);
    }

    pub fn eval(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min + max) / 2.0),
            _ => None,
        }
    }
}

fn combine(a: Option<f64>, b: Option<f64>, f: impl Fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
