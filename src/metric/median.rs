/// `GaugeMedian` keeps every sample seen since the last flush and sorts on
/// evaluation. Merging concatenates the sample lists, matching the way the
/// backing store accumulates values between flushes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedianSamples {
    pub samples: Vec<f64>,
}

impl MedianSamples {
    pub fn update(&mut self, sample: f64) {
        self.samples.push(sample);
    }

    pub fn merge(&mut self, other: &MedianSamples) {
        self.samples.extend(other.samples.iter().copied());
    }

    pub fn eval(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }
}
