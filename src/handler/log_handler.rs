use crate::codec::snapshot_to_document;
use crate::error::HandlerError;
use crate::handler::{Emit, Handler, HandlerBase, Snapshot};

/// Flushes a snapshot as a single `log::info!` line: keys sorted, rendered
/// as `key: value` pairs joined by `, ` and wrapped in braces, e.g.
/// `{myjob.count: 4, myjob.sub.duration: 0.55}`.
pub struct LogHandler {
    base: HandlerBase<LogEmit>,
}

impl LogHandler {
    pub fn new(target: String) -> Self {
        LogHandler {
            base: HandlerBase::new(LogEmit { target }),
        }
    }
}

impl Handler for LogHandler {
    fn process(&self, data: &Snapshot) -> Result<(), HandlerError> {
        self.base.process(data)
    }

    fn close(&self) {
        self.base.close()
    }
}

struct LogEmit {
    target: String,
}

impl Emit for LogEmit {
    fn emit(&mut self, data: &Snapshot) -> Result<(), HandlerError> {
        let document = snapshot_to_document(data);
        let mut entries: Vec<(&String, f64)> = document
            .iter()
            .map(|(name, doc)| (name, doc["value"].as_f64().unwrap_or(0.0)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let rendered = entries
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");

        log::info!(target: "statcollect", "{} {{{}}}", self.target, rendered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Value;
    use indexmap::IndexMap;

    #[test]
    fn empty_snapshot_produces_no_emit_call() {
        let handler = LogHandler::new("stats".to_string());
        let data: Snapshot = IndexMap::new();
        handler.process(&data).unwrap();
    }

    #[test]
    fn nonempty_snapshot_is_accepted() {
        let handler = LogHandler::new("stats".to_string());
        let mut data: Snapshot = IndexMap::new();
        data.insert("myjob.count".to_string(), Value::Raw(4.0));
        assert!(handler.process(&data).is_ok());
    }
}
