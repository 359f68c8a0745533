//! Wire encodings shared by the handler layer: length-prefixed framing for
//! the stream-socket handler, and a TNetStrings encoder for the UDP variant
//! that uses it.

pub mod frame;
pub mod tnetstring;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::metric::Value;

/// Build the JSON-ish document a handler serializes for one flush: each
/// metric name maps to `render(metric) ∪ {"type": <variant name>}`,
/// mirroring the enrichment attributes the original handler layer merges in
/// before pickling. Entries whose metric has no samples are omitted.
pub fn snapshot_to_document(data: &IndexMap<String, Value>) -> Map<String, JsonValue> {
    let mut document = Map::with_capacity(data.len());
    for (name, value) in data {
        let mut doc = match value {
            Value::Raw(n) => {
                let mut doc = Map::new();
                doc.insert("value".to_string(), JsonValue::from(*n));
                doc
            }
            Value::Aggregated(metric) => metric.render(),
        };
        if doc.is_empty() {
            continue;
        }
        doc.insert("type".to_string(), JsonValue::from(value.kind()));
        document.insert(name.clone(), JsonValue::Object(doc));
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MeanAccumulator, Metric};

    #[test]
    fn empty_metrics_are_omitted_from_the_document() {
        let mut data = IndexMap::new();
        data.insert(
            "job.mean".to_string(),
            Value::Aggregated(Metric::GaugeAMean(MeanAccumulator::default())),
        );
        let document = snapshot_to_document(&data);
        assert!(document.is_empty());
    }

    #[test]
    fn raw_and_aggregated_values_both_enrich_with_type() {
        let mut data = IndexMap::new();
        data.insert("job.count".to_string(), Value::Raw(4.0));
        let document = snapshot_to_document(&data);
        assert_eq!(document["job.count"]["type"], "Raw");
        assert_eq!(document["job.count"]["value"], 4.0);
    }

    #[test]
    fn midrange_document_exports_min_and_max() {
        let mut data = IndexMap::new();
        let mut metric = Metric::GaugeMidRange(Default::default());
        metric.update(3.0).unwrap();
        metric.update(9.0).unwrap();
        data.insert("job.spread".to_string(), Value::Aggregated(metric));
        let document = snapshot_to_document(&data);
        assert_eq!(document["job.spread"]["min"], 3.0);
        assert_eq!(document["job.spread"]["max"], 9.0);
    }
}
