//! The handler layer: pluggable flush sinks, each wrapping an [`Emit`]
//! implementation in a [`HandlerBase`] that owns the locking contract every
//! handler shares.

mod datagram_handler;
mod log_handler;
mod stream_handler;
mod tnetstring_handler;

pub use datagram_handler::DatagramHandler;
pub use log_handler::LogHandler;
pub use stream_handler::StreamHandler;
pub use tnetstring_handler::TNetStringsHandler;

use std::cell::RefCell;

use indexmap::IndexMap;
use parking_lot::ReentrantMutex;

use crate::error::HandlerError;
use crate::metric::Value;

/// A snapshot of the registry, keyed by fully-qualified metric name, that a
/// handler flushes on each `process_stats` pass.
pub type Snapshot = IndexMap<String, Value>;

/// Implemented by each concrete sink (text log, TCP, UDP, UDP/TNetStrings).
/// `HandlerBase` owns the locking and empty-snapshot short-circuit so every
/// `Emit` only has to know how to serialize and send.
pub trait Emit: Send {
    fn emit(&mut self, data: &Snapshot) -> Result<(), HandlerError>;

    fn close(&mut self) {}
}

/// Dispatch contract every handler exposes to the context: validate, emit,
/// and never leave the handler's internal lock held past a single flush.
pub trait Handler: Send + Sync {
    fn process(&self, data: &Snapshot) -> Result<(), HandlerError>;

    fn close(&self);
}

/// Wraps an [`Emit`] behind a reentrant lock. The lock is reentrant because
/// a handler's own error path may call back into logging or another
/// handler method while still holding it (mirroring the original
/// `acquire`/`release` contract, which used a recursive lock for the same
/// reason); the base releases it on every exit path, error or not.
pub struct HandlerBase<E: Emit> {
    inner: ReentrantMutex<RefCell<E>>,
}

impl<E: Emit> HandlerBase<E> {
    pub fn new(emit: E) -> Self {
        HandlerBase {
            inner: ReentrantMutex::new(RefCell::new(emit)),
        }
    }
}

impl<E: Emit> Handler for HandlerBase<E> {
    fn process(&self, data: &Snapshot) -> Result<(), HandlerError> {
        if data.is_empty() {
            return Ok(());
        }
        let guard = self.inner.lock();
        let mut emitter = guard.borrow_mut();
        emitter.emit(data)
    }

    fn close(&self) {
        let guard = self.inner.lock();
        guard.borrow_mut().close();
    }
}
