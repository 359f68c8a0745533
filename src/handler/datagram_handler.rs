use std::net::UdpSocket;
use std::time::Duration;

use serde_json::json;

use crate::error::HandlerError;
use crate::handler::{Emit, Handler, HandlerBase, Snapshot};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(1);

/// Flushes a snapshot as one UDP datagram per metric, JSON-encoded. Unlike
/// the stream handler there is no reconnect state machine: a connected UDP
/// socket has no notion of a broken peer, so a send failure is reported and
/// retried on the next flush rather than backed off.
pub struct DatagramHandler {
    base: HandlerBase<DatagramEmit>,
}

impl DatagramHandler {
    pub fn new(host: String, port: u16) -> Self {
        DatagramHandler {
            base: HandlerBase::new(DatagramEmit {
                host,
                port,
                socket: None,
            }),
        }
    }
}

impl Handler for DatagramHandler {
    fn process(&self, data: &Snapshot) -> Result<(), HandlerError> {
        self.base.process(data)
    }

    fn close(&self) {
        self.base.close()
    }
}

struct DatagramEmit {
    host: String,
    port: u16,
    socket: Option<UdpSocket>,
}

impl DatagramEmit {
    fn ensure_connected(&mut self) -> Result<(), HandlerError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_write_timeout(Some(SOCKET_TIMEOUT))?;
        socket.connect((self.host.as_str(), self.port))?;
        self.socket = Some(socket);
        Ok(())
    }
}

impl Emit for DatagramEmit {
    fn emit(&mut self, data: &Snapshot) -> Result<(), HandlerError> {
        self.ensure_connected()?;
        let document = crate::codec::snapshot_to_document(data);
        let socket = self.socket.as_ref().expect("just connected");

        for (name, doc) in &document {
            let mut framed_doc = doc.clone();
            framed_doc["name"] = json!(name);
            let payload = serde_json::to_vec(&framed_doc).map_err(|e| HandlerError::Encode {
                name: name.clone(),
                reason: e.to_string(),
            })?;
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
    fn connects_lazily_on_first_emit() {
        let mut emit = DatagramEmit {
            host: "127.0.0.1".to_string(),
            port: 19999,
            socket: None,
        };
        assert!(emit.ensure_connected().is_ok());
        assert!(emit.socket.is_some());
    }
}
