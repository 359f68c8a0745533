use std::net::UdpSocket;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::codec::tnetstring;
use crate::error::HandlerError;
use crate::handler::{Emit, Handler, HandlerBase, Snapshot};

const SOCKET_RECYCLE_AFTER: Duration = Duration::from_secs(1);

/// Flushes a snapshot as UDP datagrams encoded with TNetStrings rather than
/// JSON, with no length prefix (a datagram is already a whole message). The
/// socket is periodically recreated rather than reused indefinitely, so a
/// change in DNS resolution for the backend host is eventually picked up.
pub struct TNetStringsHandler {
    base: HandlerBase<TNetStringsEmit>,
}

impl TNetStringsHandler {
    pub fn new(host: String, port: u16) -> Self {
        TNetStringsHandler {
            base: HandlerBase::new(TNetStringsEmit {
                host,
                port,
                socket: None,
                connected_at: None,
            }),
        }
    }
}

impl Handler for TNetStringsHandler {
    fn process(&self, data: &Snapshot) -> Result<(), HandlerError> {
        self.base.process(data)
    }

    fn close(&self) {
        self.base.close()
    }
}

struct TNetStringsEmit {
    host: String,
    port: u16,
    socket: Option<UdpSocket>,
    connected_at: Option<Instant>,
}

impl TNetStringsEmit {
    fn ensure_connected(&mut self) -> Result<(), HandlerError> {
        let stale = self
            .connected_at
            .is_some_and(|at| at.elapsed() > SOCKET_RECYCLE_AFTER);
        if self.socket.is_none() || stale {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            socket.connect((self.host.as_str(), self.port))?;
            self.socket = Some(socket);
            self.connected_at = Some(Instant::now());
        }
        Ok(())
    }
}

impl Emit for TNetStringsEmit {
    fn emit(&mut self, data: &Snapshot) -> Result<(), HandlerError> {
        self.ensure_connected()?;
        let document = crate::codec::snapshot_to_document(data);
        let socket = self.socket.as_ref().expect("just connected");

        for (name, doc) in &document {
            let mut framed_doc = doc.clone();
            framed_doc["name"] = json!(name);
            let payload = tnetstring::encode(&framed_doc);
            if let Err(e) = socket.send(&payload) {
                self.socket = None;
                return Err(HandlerError::Io(e));
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_is_recycled_once_stale() {
        let mut emit = TNetStringsEmit {
            host: "127.0.0.1".to_string(),
            port: 19998,
            socket: None,
            connected_at: Some(Instant::now() - Duration::from_secs(5)),
        };
        emit.ensure_connected().unwrap();
        assert!(emit.connected_at.unwrap().elapsed() < SOCKET_RECYCLE_AFTER);
    }
}
