//! Message type tags (§6). Field order is fixed and widths are
//! power-of-two, but the byte-for-byte envelope used by the original
//! on-the-wire format is explicitly out of scope (§1 Non-goals) — only the
//! semantics this enum and the headers in [`crate::header`] describe are
//! guaranteed.

use crate::error::WireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Get = 1,
    GetReply = 2,
    Put = 3,
    PutReply = 4,
    CondPut = 5,
    CondPutReply = 6,
    Del = 7,
    DelReply = 8,
    CondDel = 9,
    CondDelReply = 10,
    Atomic = 11,
    AtomicReply = 12,
    SearchStart = 13,
    SearchItem = 14,
    SearchNext = 15,
    SearchDone = 16,
    SortedSearch = 17,
    SortedSearchReply = 18,
    Count = 19,
    CountReply = 20,
    Sum = 21,
    SumReply = 22,
    GroupDel = 23,
    GroupDelReply = 24,
    GroupAtomic = 25,
    GroupAtomicReply = 26,
    SearchDescribe = 27,
    SearchDescribeReply = 28,
    ConfigMismatch = 253,
    ServerError = 254,
    Garbage = 255,
}

impl MessageType {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(byte: u8) -> Result<Self, WireError> {
        Ok(match byte {
            1 => Self::Get,
            2 => Self::GetReply,
            3 => Self::Put,
            4 => Self::PutReply,
            5 => Self::CondPut,
            6 => Self::CondPutReply,
            7 => Self::Del,
            8 => Self::DelReply,
            9 => Self::CondDel,
            10 => Self::CondDelReply,
            11 => Self::Atomic,
            12 => Self::AtomicReply,
            13 => Self::SearchStart,
            14 => Self::SearchItem,
            15 => Self::SearchNext,
            16 => Self::SearchDone,
            17 => Self::SortedSearch,
            18 => Self::SortedSearchReply,
            19 => Self::Count,
            20 => Self::CountReply,
            21 => Self::Sum,
            22 => Self::SumReply,
            23 => Self::GroupDel,
            24 => Self::GroupDelReply,
            25 => Self::GroupAtomic,
            26 => Self::GroupAtomicReply,
            27 => Self::SearchDescribe,
            28 => Self::SearchDescribeReply,
            253 => Self::ConfigMismatch,
            254 => Self::ServerError,
            255 => Self::Garbage,
            other => return Err(WireError::UnknownMessageType(other)),
        })
    }

    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(
            self,
            Self::Get
                | Self::Put
                | Self::CondPut
                | Self::Del
                | Self::CondDel
                | Self::Atomic
                | Self::SearchStart
                | Self::SearchNext
                | Self::SortedSearch
                | Self::Count
                | Self::Sum
                | Self::GroupDel
                | Self::GroupAtomic
                | Self::SearchDescribe
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_byte() {
        for mt in [MessageType::Get, MessageType::SearchItem, MessageType::ConfigMismatch] {
            assert_eq!(MessageType::from_u8(mt.as_u8()).unwrap(), mt);
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert!(MessageType::from_u8(200).is_err());
    }
}
