//! The process-wide registry: holds every metric's accumulated state
//! between flushes, and drives the flush itself out to the configured
//! handlers.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::collector::Collector;
use crate::handler::Handler;
use crate::metric::Value;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Owns the metric data map and the registered handlers. Cheaply shared via
/// `Arc` rather than borrowed with a lifetime, since collectors and the
/// flush loop both need to hold a reference from independent threads.
pub struct Context {
    data: Mutex<IndexMap<String, Value>>,
    handlers: RwLock<IndexMap<String, Box<dyn Handler>>>,
    interval: Mutex<Duration>,
    last_flush: Mutex<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            data: Mutex::new(IndexMap::new()),
            handlers: RwLock::new(IndexMap::new()),
            interval: Mutex::new(DEFAULT_INTERVAL),
            last_flush: Mutex::new(Instant::now()),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply configuration options understood by the context itself. Other
    /// options (handler backends, their params) are consumed by
    /// `configure_handler` instead.
    pub fn configure(&self, interval: Duration) {
        *self.interval.lock() = interval;
    }

    pub fn register_handler(&self, name: impl Into<String>, handler: Box<dyn Handler>) {
        self.handlers.write().insert(name.into(), handler);
    }

    pub(crate) fn data(&self) -> &Mutex<IndexMap<String, Value>> {
        &self.data
    }

    /// Atomically take the current data map, leaving an empty one behind,
    /// and return what was taken. This is what makes a flush see a
    /// consistent point-in-time snapshot even while collectors keep writing
    /// to the (now fresh) map concurrently.
    pub fn reset_stats(&self) -> IndexMap<String, Value> {
        std::mem::take(&mut *self.data.lock())
    }

    /// Fold a snapshot (typically one taken by `reset_stats` on another
    /// thread or process) back into the live data map. A kind mismatch
    /// between an incoming and existing entry is a domain error: it is
    /// logged and that key is left untouched, rather than aborting the
    /// whole merge.
    pub fn merge_stats(&self, incoming: &IndexMap<String, Value>) {
        let mut data = self.data.lock();
        for (name, value) in incoming {
            match data.get_mut(name) {
                Some(existing) => {
                    if let Err(e) = existing.merge(value) {
                        log::error!("cannot merge stat {name:?}: {e}");
                    }
                }
                None => {
                    data.insert(name.clone(), value.clone());
                }
            }
        }
    }

    /// Flush to every registered handler if the configured interval has
    /// elapsed since the last flush, or unconditionally when `force` is
    /// set. A handler that fails is logged and skipped; it does not stop
    /// the remaining handlers from receiving the snapshot.
    pub fn process_stats(&self, force: bool) {
        let due = {
            let last_flush = self.last_flush.lock();
            force || last_flush.elapsed() >= *self.interval.lock()
        };
        if !due {
            return;
        }

        let snapshot = self.reset_stats();
        *self.last_flush.lock() = Instant::now();

        for (name, handler) in self.handlers.read().iter() {
            if let Err(e) = handler.process(&snapshot) {
                log::error!("handler {name:?} failed to flush: {e}");
            }
        }
    }

    pub fn close(&self) {
        for (_, handler) in self.handlers.read().iter() {
            handler.close();
        }
    }
}

static GLOBAL_CONTEXT: OnceLock<Arc<Context>> = OnceLock::new();

/// The process-wide singleton context, created lazily on first use.
pub fn global_context() -> Arc<Context> {
    GLOBAL_CONTEXT
        .get_or_init(|| Arc::new(Context::new()))
        .clone()
}

/// Get a collector scoped to `prefix` against the global context, the
/// entry point most application code uses.
pub fn get_collector(prefix: impl Into<String>) -> Collector {
    Collector::new(global_context(), prefix)
}
