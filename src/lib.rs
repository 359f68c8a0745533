//! In-process statistics collection: hierarchical metric names backed by a
//! small algebra of accumulator kinds, flushed periodically to one or more
//! pluggable sinks (a log line, a TCP stream, a UDP datagram, or UDP
//! encoded as TNetStrings).
//!
//! ```
//! use statcollect::get_collector;
//!
//! let job = get_collector("myjob");
//! job.inc("count", 1.0);
//! job.get_collector("sub").avg("duration", 0.55);
//! assert_eq!(job.get("count"), Some(1.0));
//! ```

pub mod codec;
pub mod collector;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod metric;

pub use collector::Collector;
pub use context::{get_collector, global_context, Context};
pub use metric::{GMeanOutput, Metric, Value};
