//! Single-threaded mio accept/poll loop: ambient transport plumbing
//! needed for a runnable daemon binary.
//!
//! One [`Listener`] owns exactly the connections for one hosted
//! `(region, virtual_server)`; a real daemon process runs one per region it
//! hosts. This mirrors the "no async runtime, explicit poll-based event
//! loop" shape the rest of the crate follows.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use crate::replication::ChainLink;
use crate::storage::RegionStore;

const LISTENER_TOKEN: Token = Token(0);

/// Tunables for one [`Listener`] instance.
#[derive(Debug, Clone, Copy)]
pub struct ListenerConfig {
    pub bind_addr: SocketAddr,
    pub buffer_size: usize,
    pub poll_timeout: Duration,
}

impl ListenerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr, buffer_size: 64 * 1024, poll_timeout: Duration::from_millis(100) }
    }
}

/// Drives accept + request/response I/O for one hosted region against a
/// [`crate::handler::RequestHandler`]. `run_once` processes a single poll
/// tick so callers (a daemon main loop, or a test) control the outer
/// lifetime and shutdown signal.
pub struct Listener {
    poll: Poll,
    listener: TcpListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    config: ListenerConfig,
}

impl Listener {
    pub fn bind(config: ListenerConfig) -> ServerResult<Self> {
        let mut listener = TcpListener::bind(config.bind_addr)?;
        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        Ok(Self { poll, listener, connections: HashMap::new(), next_token: 1, config })
    }

    #[must_use]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn next_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// Runs one `poll` tick: accepts any pending connections, services
    /// readable/writable sockets, dispatches complete frames through
    /// `handler`, and drops connections the peer closed.
    pub fn run_once<S, C>(
        &mut self,
        handler: &mut crate::handler::RequestHandler<S, C>,
        now_unix_seconds: u64,
    ) -> ServerResult<()>
    where
        S: RegionStore,
        C: ChainLink,
    {
        let mut events = Events::with_capacity(256);
        self.poll.poll(&mut events, Some(self.config.poll_timeout))?;

        for event in &events {
            if event.token() == LISTENER_TOKEN {
                self.accept_all()?;
                continue;
            }
            let token = event.token();
            let mut drop_connection = false;
            if let Some(conn) = self.connections.get_mut(&token) {
                if event.is_readable() {
                    match conn.read() {
                        Ok(true) => {}
                        Ok(false) => drop_connection = true,
                        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => drop_connection = true,
                        Err(e) => return Err(ServerError::Io(e)),
                    }
                    loop {
                        match conn.try_take_frame() {
                            Ok(Some((req_header, body))) => {
                                let (resp_header, payload) = handler.handle(&req_header, &body, now_unix_seconds)?;
                                conn.queue_response(&resp_header.encode(), &payload);
                            }
                            Ok(None) => break,
                            Err(e) => return Err(ServerError::Wire(e)),
                        }
                    }
                }
                if event.is_writable() || !conn.write_buf.is_empty() {
                    match conn.flush() {
                        Ok(_) => {}
                        Err(e) => return Err(ServerError::Io(e)),
                    }
                }
                if conn.closing && conn.write_buf.is_empty() {
                    drop_connection = true;
                }
            }
            if drop_connection {
                if let Some(mut conn) = self.connections.remove(&token) {
                    tracing::debug!(?token, "connection closed");
                    let _ = self.poll.registry().deregister(&mut conn.stream);
                }
            } else if let Some(conn) = self.connections.get_mut(&token) {
                self.poll.registry().reregister(&mut conn.stream, token, conn.interest())?;
            }
        }
        Ok(())
    }

    fn accept_all(&mut self) -> ServerResult<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = self.next_token();
                    tracing::debug!(?token, %peer, "accepted connection");
                    self.poll.registry().register(&mut stream, token, Interest::READABLE)?;
                    self.connections.insert(token, Connection::new(token, stream, self.config.buffer_size));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(ServerError::Io(e)),
            }
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
