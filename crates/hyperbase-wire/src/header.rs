//! Fixed-width, big-endian message headers (§6).

use crate::error::WireError;
use crate::message::MessageType;

pub const REQUEST_HEADER_LEN: usize = 1 + 1 + 8 + 8 + 8;
pub const RESPONSE_HEADER_LEN: usize = 1 + 8 + 8;

/// Flags occupying the request header's flags byte.
pub mod request_flags {
    pub const FAIL_IF_NOT_FOUND: u8 = 1 << 0;
    pub const FAIL_IF_FOUND: u8 = 1 << 1;
    pub const AUTH_WALLET_PRESENT: u8 = 1 << 6;
    pub const WRITE: u8 = 1 << 7;
}

/// `message type (1) ‖ flags (1) ‖ configuration version (8) ‖ destination
/// virtual server id (8) ‖ nonce (8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub message_type: MessageType,
    pub flags: u8,
    pub configuration_version: u64,
    pub dest_virtual_server: u64,
    pub nonce: u64,
}

impl RequestHeader {
    #[must_use]
    pub fn encode(&self) -> [u8; REQUEST_HEADER_LEN] {
        let mut buf = [0u8; REQUEST_HEADER_LEN];
        buf[0] = self.message_type.as_u8();
        buf[1] = self.flags;
        buf[2..10].copy_from_slice(&self.configuration_version.to_be_bytes());
        buf[10..18].copy_from_slice(&self.dest_virtual_server.to_be_bytes());
        buf[18..26].copy_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < REQUEST_HEADER_LEN {
            return Err(WireError::Truncated { need: REQUEST_HEADER_LEN, have: bytes.len() });
        }
        Ok(Self {
            message_type: MessageType::from_u8(bytes[0])?,
            flags: bytes[1],
            configuration_version: u64::from_be_bytes(bytes[2..10].try_into().unwrap()),
            dest_virtual_server: u64::from_be_bytes(bytes[10..18].try_into().unwrap()),
            nonce: u64::from_be_bytes(bytes[18..26].try_into().unwrap()),
        })
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        self.flags & request_flags::WRITE != 0
    }

    #[must_use]
    pub const fn fail_if_not_found(&self) -> bool {
        self.flags & request_flags::FAIL_IF_NOT_FOUND != 0
    }

    #[must_use]
    pub const fn fail_if_found(&self) -> bool {
        self.flags & request_flags::FAIL_IF_FOUND != 0
    }

    #[must_use]
    pub const fn has_auth_wallet(&self) -> bool {
        self.flags & request_flags::AUTH_WALLET_PRESENT != 0
    }
}

/// `message type (1) ‖ destination virtual server id (8) ‖ nonce (8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub message_type: MessageType,
    pub dest_virtual_server: u64,
    pub nonce: u64,
}

impl ResponseHeader {
    #[must_use]
    pub fn encode(&self) -> [u8; RESPONSE_HEADER_LEN] {
        let mut buf = [0u8; RESPONSE_HEADER_LEN];
        buf[0] = self.message_type.as_u8();
        buf[1..9].copy_from_slice(&self.dest_virtual_server.to_be_bytes());
        buf[9..17].copy_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < RESPONSE_HEADER_LEN {
            return Err(WireError::Truncated { need: RESPONSE_HEADER_LEN, have: bytes.len() });
        }
        Ok(Self {
            message_type: MessageType::from_u8(bytes[0])?,
            dest_virtual_server: u64::from_be_bytes(bytes[1..9].try_into().unwrap()),
            nonce: u64::from_be_bytes(bytes[9..17].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_round_trips() {
        let h = RequestHeader {
            message_type: MessageType::Put,
            flags: request_flags::WRITE | request_flags::FAIL_IF_FOUND,
            configuration_version: 7,
            dest_virtual_server: 42,
            nonce: 99,
        };
        let bytes = h.encode();
        assert_eq!(bytes.len(), REQUEST_HEADER_LEN);
        assert_eq!(RequestHeader::decode(&bytes).unwrap(), h);
    }

    #[test]
    fn response_header_round_trips() {
        let h = ResponseHeader { message_type: MessageType::PutReply, dest_virtual_server: 1, nonce: 2 };
        assert_eq!(ResponseHeader::decode(&h.encode()).unwrap(), h);
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert!(RequestHeader::decode(&[0u8; 4]).is_err());
    }

    #[test]
    fn flag_bits_are_independent() {
        let h = RequestHeader {
            message_type: MessageType::Get,
            flags: request_flags::FAIL_IF_NOT_FOUND,
            configuration_version: 0,
            dest_virtual_server: 0,
            nonce: 0,
        };
        assert!(h.fail_if_not_found());
        assert!(!h.is_write());
        assert!(!h.has_auth_wallet());
    }
}
