//! Capability token verification for the auth wallet (§4.5).
//!
//! A [`Token`] binds a chain of caveats to a root secret (the record's
//! macaroon-secret attribute value) by HMAC-chaining: `sig_0 =
//! HMAC(root, identifier)`, `sig_i = HMAC(sig_{i-1}, caveat_i)`. Verifying a
//! token recomputes the chain from the claimed root and compares the final
//! signature in constant time, then checks every caveat is satisfied by the
//! operation actually being attempted.
//!
//! Two caveat shapes are recognized, matching §4.5's literal wording:
//! an *exact* caveat (`op = read`, `op = write`) and a *general* caveat
//! (`time < <unix-seconds>`) evaluated against the current wall clock. Any
//! other predicate fails closed -- an unrecognized caveat can never be
//! satisfied, so a token carrying one can never verify.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_LEN: usize = 32;

/// The operation a wallet is presented alongside (§4.5: reads check
/// `op = read`, writes check `op = write`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
}

impl Op {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// The context a caveat is checked against: which operation is being
/// attempted, and the current wall-clock time in Unix seconds.
#[derive(Debug, Clone, Copy)]
pub struct VerifyContext {
    pub op: Op,
    pub now_unix_seconds: u64,
}

/// One link in a token's caveat chain, as a plain predicate string (e.g.
/// `"op = read"`, `"time < 1893456000"`). HyperDex's own caveats are
/// opaque byte strings to the signature chain; only verification needs to
/// parse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caveat(pub String);

impl Caveat {
    #[must_use]
    pub fn exact_op(op: Op) -> Self {
        Self(format!("op = {}", op.as_str()))
    }

    #[must_use]
    pub fn expires_at(unix_seconds: u64) -> Self {
        Self(format!("time < {unix_seconds}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaveatError {
    #[error("caveat predicate is not recognized")]
    Unsupported,
    #[error("caveat predicate is malformed")]
    Malformed,
}

/// A capability token: an identifier, the ordered caveats appended after
/// minting, and the HMAC chain signature binding them to a root secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub identifier: Vec<u8>,
    pub caveats: Vec<Caveat>,
    pub signature: [u8; SIGNATURE_LEN],
}

/// Errors decoding a token off the wire (§3 "auth wallet ... opaque
/// capability tokens"; the wallet carries the encoded bytes, not the
/// structured type, so a malformed wallet entry is a wire-level failure).
#[derive(Debug, Error)]
pub enum TokenCodecError {
    #[error("malformed capability token: {0}")]
    Malformed(#[from] postcard::Error),
}

impl Token {
    /// Serializes a token to the opaque bytes an [`crate::wallet`]'s
    /// `AuthWallet` entry carries on the wire.
    pub fn encode(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("token serialization is infallible")
    }

    /// Parses a token back out of one `AuthWallet` entry.
    pub fn decode(bytes: &[u8]) -> Result<Self, TokenCodecError> {
        Ok(postcard::from_bytes(bytes)?)
    }
    /// Mints a fresh token bound to `root_key` (the record's macaroon-secret
    /// value) with no caveats yet.
    #[must_use]
    pub fn mint(root_key: &[u8], identifier: Vec<u8>) -> Self {
        let signature = chain_step(root_key, &identifier);
        Self { identifier, caveats: Vec::new(), signature }
    }

    /// Appends a caveat, extending the HMAC chain. Consumes and returns
    /// `self` so a wallet is built as `Token::mint(..).with_caveat(..)`.
    #[must_use]
    pub fn with_caveat(mut self, caveat: Caveat) -> Self {
        let signature = chain_step(&self.signature, caveat.0.as_bytes());
        self.caveats.push(caveat);
        self.signature = signature;
        self
    }

    /// Recomputes the HMAC chain from `root_key` and compares it to the
    /// token's claimed signature in constant time.
    #[must_use]
    fn signature_matches(&self, root_key: &[u8]) -> bool {
        let mut sig = chain_step(root_key, &self.identifier);
        for caveat in &self.caveats {
            sig = chain_step(&sig, caveat.0.as_bytes());
        }
        sig.ct_eq(&self.signature).into()
    }

    /// Returns `Ok(())` if every caveat is satisfied by `ctx`, or the first
    /// violated/unsupported caveat's error.
    fn caveats_satisfied(&self, ctx: &VerifyContext) -> Result<(), CaveatError> {
        for caveat in &self.caveats {
            check_caveat(&caveat.0, ctx)?;
        }
        Ok(())
    }

    /// Full verification: signature chain against `root_key`, then every
    /// caveat against `ctx`. This is the single entry point
    /// `hyperbase-server`'s auth layer calls per token (§4.5).
    #[must_use]
    pub fn verify(&self, root_key: &[u8], ctx: &VerifyContext) -> bool {
        self.signature_matches(root_key) && self.caveats_satisfied(ctx).is_ok()
    }
}

fn chain_step(key: &[u8], data: &[u8]) -> [u8; SIGNATURE_LEN] {
    // `Hmac::new_from_slice` never fails for HMAC (any key length is
    // accepted), so the expect here documents an invariant, not a
    // reachable failure.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn check_caveat(predicate: &str, ctx: &VerifyContext) -> Result<(), CaveatError> {
    if let Some(rhs) = predicate.strip_prefix("op = ") {
        return if rhs.trim() == ctx.op.as_str() { Ok(()) } else { Err(CaveatError::Unsupported) };
    }
    if let Some(rhs) = predicate.strip_prefix("time < ") {
        let deadline: u64 = rhs.trim().parse().map_err(|_| CaveatError::Malformed)?;
        return if ctx.now_unix_seconds < deadline { Ok(()) } else { Err(CaveatError::Unsupported) };
    }
    Err(CaveatError::Unsupported)
}

/// Verifies every token in a wallet's raw bytes against `root_key`.
/// Returns `false` if the wallet is empty -- §4.5 requires at least one
/// satisfying token for a protected read or write, and the caller (not
/// this function) decides whether an empty wallet is itself disqualifying
/// or whether a write is instead creating the secret.
#[must_use]
pub fn verify_wallet(tokens: &[Token], root_key: &[u8], ctx: &VerifyContext) -> bool {
    !tokens.is_empty() && tokens.iter().all(|t| t.verify(root_key, ctx))
}

/// Zeroizing wrapper for a root secret pulled out of a stored record, so it
/// doesn't linger in memory longer than the verification call needs it.
pub type RootKey = Zeroizing<Vec<u8>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(op: Op, now: u64) -> VerifyContext {
        VerifyContext { op, now_unix_seconds: now }
    }

    #[test]
    fn freshly_minted_token_verifies_against_its_root() {
        let root = b"shh-its-a-secret";
        let token = Token::mint(root, b"cap-1".to_vec());
        assert!(token.verify(root, &ctx(Op::Read, 100)));
    }

    #[test]
    fn wrong_root_fails_verification() {
        let token = Token::mint(b"root-a", b"cap-1".to_vec());
        assert!(!token.verify(b"root-b", &ctx(Op::Read, 100)));
    }

    #[test]
    fn op_caveat_restricts_to_matching_operation() {
        let root = b"root";
        let token = Token::mint(root, b"cap-1".to_vec()).with_caveat(Caveat::exact_op(Op::Read));
        assert!(token.verify(root, &ctx(Op::Read, 0)));
        assert!(!token.verify(root, &ctx(Op::Write, 0)));
    }

    #[test]
    fn time_caveat_expires() {
        let root = b"root";
        let token = Token::mint(root, b"cap-1".to_vec()).with_caveat(Caveat::expires_at(1_000));
        assert!(token.verify(root, &ctx(Op::Read, 500)));
        assert!(!token.verify(root, &ctx(Op::Read, 1_000)));
        assert!(!token.verify(root, &ctx(Op::Read, 2_000)));
    }

    #[test]
    fn unsupported_caveat_fails_closed() {
        let root = b"root";
        let token = Token::mint(root, b"cap-1".to_vec()).with_caveat(Caveat("nonsense = predicate".into()));
        assert!(!token.verify(root, &ctx(Op::Read, 0)));
    }

    #[test]
    fn empty_wallet_never_verifies() {
        assert!(!verify_wallet(&[], b"root", &ctx(Op::Read, 0)));
    }

    #[test]
    fn wallet_requires_every_token_to_verify() {
        let root = b"root";
        let good = Token::mint(root, b"a".to_vec());
        let bad = Token::mint(b"other-root", b"b".to_vec());
        assert!(!verify_wallet(&[good.clone(), bad], root, &ctx(Op::Read, 0)));
        assert!(verify_wallet(&[good], root, &ctx(Op::Read, 0)));
    }

    #[test]
    fn caveat_chain_is_order_sensitive() {
        let root = b"root";
        let a = Token::mint(root, b"id".to_vec())
            .with_caveat(Caveat::exact_op(Op::Read))
            .with_caveat(Caveat::expires_at(1_000));
        let b = Token::mint(root, b"id".to_vec())
            .with_caveat(Caveat::expires_at(1_000))
            .with_caveat(Caveat::exact_op(Op::Read));
        assert_ne!(a.signature, b.signature);
    }

    use test_case::test_case;

    #[test_case(Caveat::exact_op(Op::Read), Op::Read, 0, true; "op_read_caveat_allows_read")]
    #[test_case(Caveat::exact_op(Op::Read), Op::Write, 0, false; "op_read_caveat_blocks_write")]
    #[test_case(Caveat::exact_op(Op::Write), Op::Write, 0, true; "op_write_caveat_allows_write")]
    #[test_case(Caveat::expires_at(1_000), Op::Read, 999, true; "time_caveat_allows_before_deadline")]
    #[test_case(Caveat::expires_at(1_000), Op::Read, 1_000, false; "time_caveat_blocks_at_deadline")]
    #[test_case(Caveat(String::from("op = read")), Op::Read, 0, true; "hand_built_caveat_string_parses_like_the_constructor")]
    #[test_case(Caveat(String::from("role = admin")), Op::Read, 0, false; "unrecognized_predicate_fails_closed")]
    fn caveat_verification_table(caveat: Caveat, op: Op, now: u64, expect_verifies: bool) {
        let root = b"root";
        let token = Token::mint(root, b"cap".to_vec()).with_caveat(caveat);
        assert_eq!(token.verify(root, &ctx(op, now)), expect_verifies);
    }
}
