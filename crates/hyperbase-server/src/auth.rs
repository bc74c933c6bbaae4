//! Auth wallet enforcement wrapping reads and writes (§4.5).
//!
//! `schema.authorization == true` gates every keyed read/write behind a
//! capability check against the record's macaroon-secret attribute value:
//!
//! - reads require every token in the wallet to verify under `op = read`
//!   against the *current* stored secret;
//! - writes require the same under `op = write`, *unless* there is no
//!   current record, in which case the write is allowed only if its
//!   funcall set includes a `SET` on the macaroon-secret attribute (the
//!   write is creating the secret).
//!
//! Sensitive attributes (`DataType::MacaroonSecret`) are stripped from
//! every outbound read reply before it leaves the server -- stripping
//! happens server-side, and only here.

use hyperbase_crypto::wallet::{Op, Token, VerifyContext, verify_wallet};
use hyperbase_types::{AuthWallet, DataType, Funcall, FuncallName, Schema, Value};

/// Why an auth-gated operation was refused. Maps to `ResultCode::NoCanDo`
/// at the handler layer: auth failure is a consistency-class rejection,
/// not a malformed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied,
}

/// Finds the schema position of the space's macaroon-secret attribute, if
/// any. A schema with `authorization = true` is required (by
/// `Schema::validate`, see `hyperbase-types`) to carry exactly the
/// attribute this returns.
#[must_use]
pub fn secret_attr_position(schema: &Schema) -> Option<usize> {
    schema.attributes.iter().position(|a| a.datatype == DataType::MacaroonSecret)
}

fn root_key_bytes(value: &Value) -> Option<&[u8]> {
    match value {
        Value::MacaroonSecret(bytes) => Some(bytes),
        _ => None,
    }
}

fn decode_wallet(wallet: &AuthWallet) -> Result<Vec<Token>, hyperbase_crypto::wallet::TokenCodecError> {
    wallet.tokens.iter().map(|bytes| Token::decode(bytes)).collect()
}

/// Checks whether `wallet` authorizes a read of a record whose currently
/// stored secondary attributes are `stored`. `schema` must have
/// `authorization == true`; callers skip this entirely otherwise.
pub fn authorize_read(
    schema: &Schema,
    stored: &[Value],
    wallet: &AuthWallet,
    now_unix_seconds: u64,
) -> AuthDecision {
    let Some(secret_pos) = secret_attr_position(schema) else {
        return AuthDecision::Denied;
    };
    // Position 0 is the key; `stored` holds secondary attributes only.
    let Some(secret_idx) = secret_pos.checked_sub(1) else {
        return AuthDecision::Denied;
    };
    let Some(root) = stored.get(secret_idx).and_then(root_key_bytes) else {
        return AuthDecision::Denied;
    };
    let Ok(tokens) = decode_wallet(wallet) else {
        return AuthDecision::Denied;
    };
    let ctx = VerifyContext { op: Op::Read, now_unix_seconds };
    if verify_wallet(&tokens, root, &ctx) {
        AuthDecision::Allowed
    } else {
        AuthDecision::Denied
    }
}

/// Checks whether `wallet` authorizes a write. `stored` is the record's
/// current secondary attributes, if any exist yet; `funcalls` is the
/// mutation the write would apply.
pub fn authorize_write(
    schema: &Schema,
    stored: Option<&[Value]>,
    wallet: &AuthWallet,
    funcalls: &[Funcall],
    now_unix_seconds: u64,
) -> AuthDecision {
    let Some(secret_pos) = secret_attr_position(schema) else {
        return AuthDecision::Denied;
    };
    let Some(secret_idx) = secret_pos.checked_sub(1) else {
        return AuthDecision::Denied;
    };
    match stored.and_then(|attrs| attrs.get(secret_idx)).and_then(root_key_bytes) {
        Some(root) => {
            let Ok(tokens) = decode_wallet(wallet) else {
                return AuthDecision::Denied;
            };
            let ctx = VerifyContext { op: Op::Write, now_unix_seconds };
            if verify_wallet(&tokens, root, &ctx) {
                AuthDecision::Allowed
            } else {
                AuthDecision::Denied
            }
        }
        // No secret on record yet: only a write that creates it (a `SET`
        // funcall targeting the secret attribute) is allowed through.
        None => {
            let creates_secret = funcalls
                .iter()
                .any(|f| f.attr == secret_pos && f.name == FuncallName::Set);
            if creates_secret { AuthDecision::Allowed } else { AuthDecision::Denied }
        }
    }
}

/// Strips sensitive (macaroon-secret) attributes from an outbound read
/// reply, replacing each with an empty placeholder of the same shape the
/// client never inspects (a sensitive attribute is never requested by
/// position in `attrs[]`, only existence-checked, so the empty value is
/// never observed as meaningful data).
pub fn strip_sensitive(schema: &Schema, attrs: &mut [Value]) {
    for (idx, attr) in schema.attributes.iter().skip(1).enumerate() {
        if attr.datatype.is_sensitive() {
            if let Some(slot) = attrs.get_mut(idx) {
                *slot = Value::MacaroonSecret(Vec::new());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_crypto::wallet::Caveat;
    use hyperbase_types::{Attribute, FuncallName};

    fn auth_schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("k", DataType::String),
                Attribute::new("secret", DataType::MacaroonSecret),
                Attribute::new("v", DataType::String),
            ],
            true,
        )
        .unwrap()
    }

    fn wallet_of(tokens: Vec<Token>) -> AuthWallet {
        AuthWallet { tokens: tokens.iter().map(Token::encode).collect() }
    }

    #[test]
    fn read_without_wallet_is_denied() {
        let schema = auth_schema();
        let stored = vec![Value::MacaroonSecret(b"root".to_vec()), Value::String(b"hi".to_vec())];
        let wallet = AuthWallet::empty();
        assert_eq!(authorize_read(&schema, &stored, &wallet, 0), AuthDecision::Denied);
    }

    #[test]
    fn read_with_write_only_caveat_is_denied() {
        let schema = auth_schema();
        let stored = vec![Value::MacaroonSecret(b"root".to_vec()), Value::String(b"hi".to_vec())];
        let token = Token::mint(b"root", b"id".to_vec()).with_caveat(Caveat::exact_op(Op::Write));
        let wallet = wallet_of(vec![token]);
        assert_eq!(authorize_read(&schema, &stored, &wallet, 0), AuthDecision::Denied);
    }

    #[test]
    fn read_with_matching_token_is_allowed() {
        let schema = auth_schema();
        let stored = vec![Value::MacaroonSecret(b"root".to_vec()), Value::String(b"hi".to_vec())];
        let token = Token::mint(b"root", b"id".to_vec()).with_caveat(Caveat::exact_op(Op::Read));
        let wallet = wallet_of(vec![token]);
        assert_eq!(authorize_read(&schema, &stored, &wallet, 0), AuthDecision::Allowed);
    }

    #[test]
    fn write_creating_secret_from_empty_succeeds_without_a_wallet() {
        let schema = auth_schema();
        let funcalls = vec![Funcall::set(1, Value::MacaroonSecret(b"root".to_vec()))];
        let wallet = AuthWallet::empty();
        assert_eq!(authorize_write(&schema, None, &wallet, &funcalls, 0), AuthDecision::Allowed);
    }

    #[test]
    fn write_without_creating_secret_from_empty_is_denied() {
        let schema = auth_schema();
        let funcalls = vec![Funcall::set(2, Value::String(b"hi".to_vec()))];
        let wallet = AuthWallet::empty();
        assert_eq!(authorize_write(&schema, None, &wallet, &funcalls, 0), AuthDecision::Denied);
    }

    #[test]
    fn strip_sensitive_blanks_the_secret_attribute() {
        let schema = auth_schema();
        let mut attrs = vec![Value::MacaroonSecret(b"root".to_vec()), Value::String(b"hi".to_vec())];
        strip_sensitive(&schema, &mut attrs);
        assert_eq!(attrs[0], Value::MacaroonSecret(Vec::new()));
        assert_eq!(attrs[1], Value::String(b"hi".to_vec()));
    }
}
