use std::io::Write;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::codec::frame::encode_frame;
use crate::error::HandlerError;
use crate::handler::{Emit, Handler, HandlerBase, Snapshot};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const RETRY_START: f64 = 1.0;
const RETRY_MAX: f64 = 30.0;
const RETRY_FACTOR: f64 = 2.0;

/// Flushes a snapshot over a persistent TCP connection, one length-prefixed
/// frame per metric. A failed send or connect drops the socket and starts
/// an exponential backoff: `1s, 2s, 4s, ... capped at 30s`. While backed
/// off, flushes are skipped rather than retried inline.
pub struct StreamHandler {
    base: HandlerBase<StreamEmit>,
}

impl StreamHandler {
    pub fn new(host: String, port: u16) -> Self {
        StreamHandler {
            base: HandlerBase::new(StreamEmit {
                host,
                port,
                stream: None,
                retry_period: None,
                retry_until: None,
            }),
        }
    }
}

impl Handler for StreamHandler {
    fn process(&self, data: &Snapshot) -> Result<(), HandlerError> {
        self.base.process(data)
    }

    fn close(&self) {
        self.base.close()
    }
}

struct StreamEmit {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    retry_period: Option<f64>,
    retry_until: Option<Instant>,
}

impl StreamEmit {
    fn ensure_connected(&mut self) -> Result<(), HandlerError> {
        if self.stream.is_some() {
            return Ok(());
        }
        if let Some(retry_until) = self.retry_until {
            if Instant::now() < retry_until {
                return Err(HandlerError::Backoff);
            }
        }

        let addr = format!("{}:{}", self.host, self.port);
        let resolved = match addr
            .to_socket_addrs_first()
            .ok_or_else(|| HandlerError::BadUrl(addr.clone()))
        {
            Ok(a) => a,
            Err(e) => {
                self.schedule_backoff();
                return Err(e);
            }
        };

        match TcpStream::connect_timeout(&resolved, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_read_timeout(Some(CONNECT_TIMEOUT)).ok();
                stream.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();
                self.stream = Some(stream);
                self.retry_period = None;
                self.retry_until = None;
                Ok(())
            }
            Err(e) => {
                self.schedule_backoff();
                Err(HandlerError::Io(e))
            }
        }
    }

    fn schedule_backoff(&mut self) {
        let period = match self.retry_period {
            Some(previous) => (previous * RETRY_FACTOR).min(RETRY_MAX),
            None => RETRY_START,
        };
        self.retry_period = Some(period);
        self.retry_until = Some(Instant::now() + Duration::from_secs_f64(period));
    }
}

trait FirstSocketAddr {
    fn to_socket_addrs_first(&self) -> Option<std::net::SocketAddr>;
}

impl FirstSocketAddr for str {
    fn to_socket_addrs_first(&self) -> Option<std::net::SocketAddr> {
        use std::net::ToSocketAddrs;
        self.to_socket_addrs().ok()?.next()
    }
}

impl Emit for StreamEmit {
    fn emit(&mut self, data: &Snapshot) -> Result<(), HandlerError> {
        self.ensure_connected()?;
        let document = crate::codec::snapshot_to_document(data);

        for (name, doc) in &document {
            let mut framed_doc = doc.clone();
            framed_doc["name"] = json!(name);
            let payload = serde_json::to_vec(&framed_doc).map_err(|e| HandlerError::Encode {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            let framed = encode_frame(&payload);

            let stream = self.stream.as_mut().expect("just connected");
            if let Err(e) = stream.write_all(&framed) {
                self.stream = None;
                self.schedule_backoff();
                return Err(HandlerError::Io(e));
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_doubles_and_caps() {
        let mut emit = StreamEmit {
            host: "127.0.0.1".to_string(),
            port: 1,
            stream: None,
            retry_period: None,
            retry_until: None,
        };
        let mut periods = Vec::new();
        for _ in 0..8 {
            emit.schedule_backoff();
            periods.push(emit.retry_period.unwrap());
        }
        assert_eq!(periods[0], 1.0);
        assert_eq!(periods[1], 2.0);
        assert_eq!(periods[2], 4.0);
        assert_eq!(periods[3], 8.0);
        assert_eq!(periods[4], 16.0);
        assert_eq!(periods[5], 30.0);
        assert_eq!(periods[6], 30.0);
        assert_eq!(periods[7], 30.0);
    }

    #[test]
    fn connect_failure_enters_backoff() {
        let mut emit = StreamEmit {
            host: "127.0.0.1".to_string(),
            port: 1,
            stream: None,
            retry_period: None,
            retry_until: None,
        };
        assert!(emit.ensure_connected().is_err());
        assert!(emit.retry_until.is_some());
        assert!(emit.ensure_connected().is_err());
    }
}
