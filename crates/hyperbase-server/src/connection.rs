//! Connection state for the mio-based accept loop: ambient transport
//! plumbing underneath the message header.
//!
//! The byte-for-byte envelope below the HyperDex message header is left
//! unspecified; this module only needs *some* way to delimit one request
//! from the next on a byte stream, so it prefixes every
//! `RequestHeader`/`ResponseHeader` + body with a 4-byte big-endian
//! length.

use std::io::{self, Read, Write};

use bytes::BytesMut;
use mio::Token;
use mio::net::TcpStream;

use hyperbase_wire::{REQUEST_HEADER_LEN, RequestHeader};

/// Length prefix width, in bytes, of the ambient framing this crate uses
/// to delimit header+body on the wire.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// One accepted client connection.
pub struct Connection {
    #[allow(dead_code)]
    pub token: Token,
    pub stream: TcpStream,
    pub read_buf: BytesMut,
    pub write_buf: BytesMut,
    pub closing: bool,
}

impl Connection {
    #[must_use]
    pub fn new(token: Token, stream: TcpStream, buffer_size: usize) -> Self {
        Self {
            token,
            stream,
            read_buf: BytesMut::with_capacity(buffer_size),
            write_buf: BytesMut::with_capacity(buffer_size),
            closing: false,
        }
    }

    /// Reads whatever is available into `read_buf`. Returns `false` once
    /// the peer has closed the stream.
    pub fn read(&mut self) -> io::Result<bool> {
        let mut scratch = [0u8; 4096];
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => return Ok(false),
                Ok(n) => self.read_buf.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) => return Err(e),
            }
        }
    }

    /// Flushes as much of `write_buf` as the socket will currently accept.
    /// Returns `true` once everything queued has been written.
    pub fn flush(&mut self) -> io::Result<bool> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "peer closed during write")),
                Ok(n) => {
                    let _ = self.write_buf.split_to(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Pulls the next complete `(header, body)` pair out of `read_buf`, if
    /// a full frame has arrived, consuming it. `None` means keep reading.
    pub fn try_take_frame(&mut self) -> Result<Option<(RequestHeader, Vec<u8>)>, hyperbase_wire::WireError> {
        if self.read_buf.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }
        let len =
            u32::from_be_bytes(self.read_buf[..LENGTH_PREFIX_LEN].try_into().unwrap()) as usize;
        let total = LENGTH_PREFIX_LEN + len;
        if self.read_buf.len() < total {
            return Ok(None);
        }
        let _ = self.read_buf.split_to(LENGTH_PREFIX_LEN);
        let frame = self.read_buf.split_to(len);
        if frame.len() < REQUEST_HEADER_LEN {
            return Err(hyperbase_wire::WireError::Truncated { need: REQUEST_HEADER_LEN, have: frame.len() });
        }
        let header = RequestHeader::decode(&frame[..REQUEST_HEADER_LEN])?;
        let body = frame[REQUEST_HEADER_LEN..].to_vec();
        Ok(Some((header, body)))
    }

    /// Queues a response header+body for delivery, framed the same way
    /// incoming requests are.
    pub fn queue_response(&mut self, header_bytes: &[u8], body: &[u8]) {
        let len = (header_bytes.len() + body.len()) as u32;
        self.write_buf.extend_from_slice(&len.to_be_bytes());
        self.write_buf.extend_from_slice(header_bytes);
        self.write_buf.extend_from_slice(body);
    }

    pub fn interest(&self) -> mio::Interest {
        if self.write_buf.is_empty() {
            mio::Interest::READABLE
        } else {
            mio::Interest::READABLE | mio::Interest::WRITABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_wire::{MessageType, RESPONSE_HEADER_LEN, ResponseHeader, request_flags};

    fn framed(header: &RequestHeader, body: &[u8]) -> Vec<u8> {
        let header_bytes = header.encode();
        let len = (header_bytes.len() + body.len()) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn length_prefix_matches_header_plus_response_length() {
        let header =
            ResponseHeader { message_type: MessageType::GetReply, dest_virtual_server: 1, nonce: 2 };
        let body = b"payload";
        let header_bytes = header.encode();
        let mut buf = Vec::new();
        let len = (header_bytes.len() + body.len()) as u32;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(body);
        assert_eq!(buf.len(), LENGTH_PREFIX_LEN + RESPONSE_HEADER_LEN + body.len());
    }

    #[test]
    fn a_partial_frame_round_trips_through_framed_helper() {
        let header = RequestHeader {
            message_type: MessageType::Get,
            flags: request_flags::FAIL_IF_NOT_FOUND,
            configuration_version: 1,
            dest_virtual_server: 9,
            nonce: 7,
        };
        let bytes = framed(&header, b"abc");
        assert_eq!(bytes.len(), LENGTH_PREFIX_LEN + REQUEST_HEADER_LEN + 3);
    }
}
