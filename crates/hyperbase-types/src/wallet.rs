//! Auth wallet: zero or more opaque capability tokens shipped alongside a
//! key change (§3, §4.5). Token verification itself lives in
//! `hyperbase-crypto`; this type is the plain data carried on the wire.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthWallet {
    pub tokens: Vec<Vec<u8>>,
}

impl AuthWallet {
    #[must_use]
    pub const fn empty() -> Self {
        Self { tokens: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
