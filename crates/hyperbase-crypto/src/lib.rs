//! # hyperbase-crypto: auth wallet capability verification (§4.5)
//!
//! HyperDex binds capability tokens to a macaroon-secret attribute value
//! using HMAC-chained caveats; the cryptographic primitive for the chain
//! itself is left unspecified, so this crate uses `hmac`+`sha2` the way
//! the rest of the workspace reaches for `sha2`/`blake3` for its other
//! keyed hashes.
//!
//! [`wallet`] verifies the tokens an [`hyperbase_types::AuthWallet`] carries
//! against a record's secret attribute value, the way `hyperbase-server`'s
//! auth layer needs before allowing a read or write through (§4.5).

pub mod wallet;

pub use wallet::{Caveat, CaveatError, Op, Token, VerifyContext, verify_wallet};
