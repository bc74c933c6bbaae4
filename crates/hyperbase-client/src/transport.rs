//! The transport boundary (§4.2 "It draws messages from the transport").
//!
//! `Transport` is deliberately synchronous and non-blocking-by-contract: the
//! pipeline above it (`Client::loop_once`) never awaits, matching §5's
//! "client: single-threaded cooperative. The only suspension is `loop()`."
//! Building without the `tokio` feature keeps this crate runtime-agnostic;
//! the feature only adds one concrete `Transport` implementation.

use std::time::Duration;

use hyperbase_types::ServerId;

use crate::error::TransportError;

/// One framed message read off the wire, addressed by the server that sent
/// it (the client matches it to a pending op by server nonce afterward).
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub from: ServerId,
    pub bytes: Vec<u8>,
}

/// The boundary `Client::loop_once` drives. An implementation owns whatever
/// sockets/connections it needs per `ServerId` and buffers partial reads
/// internally; `poll` blocks for at most `timeout` before returning
/// whatever frames are ready.
pub trait Transport {
    /// Queues `bytes` for delivery to `target`, connecting lazily if needed.
    fn send(&mut self, target: ServerId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Blocks for up to `timeout`, returning every complete frame received
    /// in that window (possibly empty, which is not itself an error —
    /// `Client::loop_once` turns an empty poll with no pending reply into
    /// `TIMEOUT`).
    fn poll(&mut self, timeout: Duration) -> Result<Vec<InboundFrame>, TransportError>;

    /// Registers (or re-registers, after a reconnect) the address a server
    /// id should be reached at. Called when the client installs a new
    /// configuration.
    fn set_endpoint(&mut self, server: ServerId, address: String);
}

/// A `Transport` that keeps everything in memory, for tests: messages
/// `send` to a peer are delivered back out of that peer's `poll` once the
/// test wires them together, or simply inspected directly.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    endpoints: std::collections::HashMap<ServerId, String>,
    outbox: Vec<(ServerId, Vec<u8>)>,
    inbox: std::collections::VecDeque<InboundFrame>,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: makes `bytes` available to the next `poll` as if `from`
    /// had sent it.
    pub fn deliver(&mut self, from: ServerId, bytes: Vec<u8>) {
        self.inbox.push_back(InboundFrame { from, bytes });
    }

    /// Test hook: drains everything `send` has queued so far.
    pub fn sent(&mut self) -> Vec<(ServerId, Vec<u8>)> {
        std::mem::take(&mut self.outbox)
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, target: ServerId, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.endpoints.contains_key(&target) {
            return Err(TransportError::Disconnected);
        }
        self.outbox.push((target, bytes.to_vec()));
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<InboundFrame>, TransportError> {
        Ok(self.inbox.drain(..).collect())
    }

    fn set_endpoint(&mut self, server: ServerId, address: String) {
        self.endpoints.insert(server, address);
    }
}

#[cfg(feature = "tokio")]
pub mod tokio_transport {
    //! A `tokio`-backed `Transport`. Each `poll` call drives the runtime for
    //! at most the requested timeout via a bounded `block_on`, keeping the
    //! synchronous contract `Transport` promises while reusing `tokio`'s
    //! TCP stack and timers rather than hand-rolling non-blocking I/O.

    use std::collections::HashMap;

    use hyperbase_types::ServerId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::runtime::Handle;

    use super::{InboundFrame, Transport};
    use crate::error::TransportError;

    pub struct TokioTransport {
        handle: Handle,
        endpoints: HashMap<ServerId, String>,
        connections: HashMap<ServerId, TcpStream>,
    }

    impl TokioTransport {
        #[must_use]
        pub fn new(handle: Handle) -> Self {
            Self { handle, endpoints: HashMap::new(), connections: HashMap::new() }
        }

        fn connection(&mut self, target: ServerId) -> Result<&mut TcpStream, TransportError> {
            if !self.connections.contains_key(&target) {
                let address = self.endpoints.get(&target).ok_or(TransportError::Disconnected)?.clone();
                let stream = self
                    .handle
                    .block_on(TcpStream::connect(address))
                    .map_err(|_| TransportError::Io)?;
                self.connections.insert(target, stream);
            }
            Ok(self.connections.get_mut(&target).expect("just inserted"))
        }
    }

    impl Transport for TokioTransport {
        fn send(&mut self, target: ServerId, bytes: &[u8]) -> Result<(), TransportError> {
            let handle = self.handle.clone();
            let stream = self.connection(target)?;
            handle.block_on(stream.write_all(bytes)).map_err(|_| TransportError::Io)
        }

        fn poll(&mut self, timeout: std::time::Duration) -> Result<Vec<InboundFrame>, TransportError> {
            let handle = self.handle.clone();
            let mut frames = Vec::new();
            for (&server, stream) in &mut self.connections {
                let mut buf = [0u8; 4096];
                let read = handle.block_on(async {
                    tokio::time::timeout(timeout, stream.read(&mut buf)).await
                });
                match read {
                    Ok(Ok(0)) | Err(_) => continue,
                    Ok(Ok(n)) => frames.push(InboundFrame { from: server, bytes: buf[..n].to_vec() }),
                    Ok(Err(_)) => return Err(TransportError::Io),
                }
            }
            Ok(frames)
        }

        fn set_endpoint(&mut self, server: ServerId, address: String) {
            self.endpoints.insert(server, address);
            self.connections.remove(&server);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_requires_a_known_endpoint() {
        let mut t = LoopbackTransport::new();
        let err = t.send(ServerId::new(1), b"hi").unwrap_err();
        assert_eq!(err, TransportError::Disconnected);
    }

    #[test]
    fn delivered_frames_surface_on_poll() {
        let mut t = LoopbackTransport::new();
        t.set_endpoint(ServerId::new(1), "127.0.0.1:0".into());
        t.deliver(ServerId::new(1), b"reply".to_vec());
        let frames = t.poll(Duration::from_millis(0)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes, b"reply");
    }
}
