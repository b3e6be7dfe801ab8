//! Envelope verification and decryption.

use crate::error::DecryptionError;
use crate::key::AppKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rootcause::prelude::Report;
use serde::Deserialize;
use sessionbridge_core::security;
use sessionbridge_phpserde::{ClassRegistry, Value, from_bytes};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Separator between the cookie-name prefix hash and the real value.
const VALUE_SEPARATOR: char = '|';

#[derive(Deserialize)]
struct Envelope {
    iv: String,
    value: String,
    mac: String,
    #[serde(default)]
    tag: Option<String>,
}

/// Decrypts a session cookie and returns the session ID it carries.
///
/// `cookie` is the cookie value as received; percent-encoding is undone
/// first. The MAC is checked before any block decryption happens.
///
/// # Errors
///
/// Returns [`DecryptionError`] if the envelope is malformed, the MAC does not
/// verify, or decryption fails.
pub fn decrypt(cookie: &str, key: &AppKey) -> Result<String, Report<DecryptionError>> {
    let envelope = parse_envelope(cookie)?;
    verify_mac(&envelope, key)?;

    let iv = decode_field("iv", &envelope.iv)?;
    let ciphertext = decode_field("value", &envelope.value)?;
    let plaintext = cbc_decrypt(key.as_bytes(), &iv, &ciphertext)?;

    let plaintext = String::from_utf8(plaintext).map_err(|_| DecryptionError::CipherFailure {
        reason: "plaintext is not valid UTF-8".to_string(),
    })?;
    tracing::debug!(plaintext = %security::redact(&plaintext), "cookie decrypted");

    let value = unwrap_serialized_string(plaintext);
    Ok(strip_value_prefix(&value).to_string())
}

/// Removes the cookie-name prefix hash from a decrypted value.
///
/// Values of the form `<hash>|<id>` yield `<id>`. Values with no separator,
/// or with more than one, are returned unchanged.
#[must_use]
pub fn strip_value_prefix(value: &str) -> &str {
    if value.matches(VALUE_SEPARATOR).count() != 1 {
        return value;
    }
    value
        .split_once(VALUE_SEPARATOR)
        .map_or(value, |(_, rest)| rest)
}

fn parse_envelope(cookie: &str) -> Result<Envelope, DecryptionError> {
    let cookie = urlencoding::decode(cookie.trim()).map_err(|e| DecryptionError::MalformedEnvelope {
        reason: format!("invalid percent-encoding: {e}"),
    })?;
    let json = STANDARD
        .decode(cookie.as_bytes())
        .map_err(|e| DecryptionError::MalformedEnvelope {
            reason: format!("not valid base64: {e}"),
        })?;
    let envelope: Envelope =
        serde_json::from_slice(&json).map_err(|e| DecryptionError::MalformedEnvelope {
            reason: e.to_string(),
        })?;

    if envelope.tag.as_deref().is_some_and(|tag| !tag.is_empty()) {
        return Err(DecryptionError::MalformedEnvelope {
            reason: "authenticated-cipher envelopes are not supported".to_string(),
        });
    }
    Ok(envelope)
}

fn verify_mac(envelope: &Envelope, key: &AppKey) -> Result<(), DecryptionError> {
    let expected = hex::decode(envelope.mac.trim()).map_err(|e| DecryptionError::MalformedEnvelope {
        reason: format!("mac is not hex: {e}"),
    })?;

    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| {
        DecryptionError::InvalidKey {
            reason: e.to_string(),
        }
    })?;
    // The MAC covers the base64 text, not the decoded bytes.
    mac.update(envelope.iv.as_bytes());
    mac.update(envelope.value.as_bytes());

    mac.verify_slice(&expected).map_err(|_| {
        tracing::debug!("cookie MAC verification failed");
        DecryptionError::MacMismatch
    })
}

fn decode_field(name: &str, text: &str) -> Result<Vec<u8>, DecryptionError> {
    STANDARD
        .decode(text)
        .map_err(|e| DecryptionError::MalformedEnvelope {
            reason: format!("{name} is not valid base64: {e}"),
        })
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
    let cipher_failure = |reason: String| DecryptionError::CipherFailure { reason };
    match key.len() {
        16 => Aes128CbcDec::new_from_slices(key, iv)
            .map_err(|e| cipher_failure(format!("bad iv: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| cipher_failure("bad padding".to_string())),
        32 => Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| cipher_failure(format!("bad iv: {e}")))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| cipher_failure("bad padding".to_string())),
        n => Err(DecryptionError::InvalidKey {
            reason: format!("expected 16 or 32 bytes, got {n}"),
        }),
    }
}

/// Unwraps `s:<len>:"<value>";`, returning other plaintext unchanged.
fn unwrap_serialized_string(plaintext: String) -> String {
    if !plaintext.starts_with("s:") {
        return plaintext;
    }
    match from_bytes(plaintext.as_bytes(), &ClassRegistry::empty()) {
        Ok(Value::String(inner)) => inner,
        _ => plaintext,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    const IV: [u8; 16] = [3u8; 16];

    fn key256() -> AppKey {
        AppKey::from_bytes((0u8..32).collect()).expect("valid key")
    }

    fn encrypt(plaintext: &str, key: &AppKey) -> (String, String) {
        let ciphertext = match key.as_bytes().len() {
            32 => Aes256CbcEnc::new_from_slices(key.as_bytes(), &IV)
                .expect("key and iv")
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()),
            _ => Aes128CbcEnc::new_from_slices(key.as_bytes(), &IV)
                .expect("key and iv")
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes()),
        };
        (STANDARD.encode(IV), STANDARD.encode(ciphertext))
    }

    fn sign(iv: &str, value: &str, key: &AppKey) -> String {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("hmac key");
        mac.update(iv.as_bytes());
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn wrap(iv: &str, value: &str, mac: &str) -> String {
        let json = serde_json::json!({"iv": iv, "value": value, "mac": mac, "tag": ""});
        STANDARD.encode(json.to_string())
    }

    fn cookie(plaintext: &str, key: &AppKey) -> String {
        let (iv, value) = encrypt(plaintext, key);
        let mac = sign(&iv, &value, key);
        wrap(&iv, &value, &mac)
    }

    fn error_of(result: Result<String, Report<DecryptionError>>) -> DecryptionError {
        result
            .expect_err("decryption should fail")
            .current_context()
            .clone()
    }

    #[test]
    fn decrypts_serialized_prefixed_session_id() {
        let key = key256();
        let inner = format!("{}|abc123", "f".repeat(40));
        let plaintext = format!("s:{}:\"{inner}\";", inner.len());
        let session_id = decrypt(&cookie(&plaintext, &key), &key).expect("decrypts");
        assert_eq!(session_id, "abc123");
    }

    #[test]
    fn decrypts_plain_value_with_aes128_key() {
        let key = AppKey::from_bytes(vec![9u8; 16]).expect("valid key");
        let session_id = decrypt(&cookie("plainsession", &key), &key).expect("decrypts");
        assert_eq!(session_id, "plainsession");
    }

    #[test]
    fn accepts_percent_encoded_cookie() {
        let key = key256();
        let encoded = cookie("abc", &key).replace('=', "%3D");
        assert_eq!(decrypt(&encoded, &key).expect("decrypts"), "abc");
    }

    #[test]
    fn flipped_ciphertext_bit_fails_mac_check() {
        let key = key256();
        let (iv, value) = encrypt("abc123", &key);
        let mac = sign(&iv, &value, &key);

        let mut bytes = STANDARD.decode(&value).expect("ciphertext");
        bytes[0] ^= 0x01;
        let tampered = STANDARD.encode(bytes);

        assert_eq!(
            error_of(decrypt(&wrap(&iv, &tampered, &mac), &key)),
            DecryptionError::MacMismatch
        );
    }

    #[test]
    fn mac_over_decoded_bytes_is_rejected() {
        let key = key256();
        let (iv, value) = encrypt("abc123", &key);
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("hmac key");
        mac.update(&STANDARD.decode(&iv).expect("iv"));
        mac.update(&STANDARD.decode(&value).expect("value"));
        let binary_mac = hex::encode(mac.finalize().into_bytes());

        assert_eq!(
            error_of(decrypt(&wrap(&iv, &value, &binary_mac), &key)),
            DecryptionError::MacMismatch
        );
    }

    #[test]
    fn wrong_key_fails_mac_check() {
        let key = key256();
        let other = AppKey::from_bytes(vec![1u8; 32]).expect("valid key");
        assert_eq!(
            error_of(decrypt(&cookie("abc", &key), &other)),
            DecryptionError::MacMismatch
        );
    }

    #[test]
    fn malformed_envelopes_are_rejected() {
        let key = key256();
        assert!(matches!(
            error_of(decrypt("%%%", &key)),
            DecryptionError::MalformedEnvelope { .. }
        ));
        assert!(matches!(
            error_of(decrypt(&STANDARD.encode("not json"), &key)),
            DecryptionError::MalformedEnvelope { .. }
        ));
        assert!(matches!(
            error_of(decrypt(&STANDARD.encode(r#"{"iv":"a"}"#), &key)),
            DecryptionError::MalformedEnvelope { .. }
        ));
    }

    #[test]
    fn authenticated_cipher_envelopes_are_rejected() {
        let key = key256();
        let json = serde_json::json!({"iv": "aa", "value": "bb", "mac": "", "tag": "dGFn"});
        assert!(matches!(
            error_of(decrypt(&STANDARD.encode(json.to_string()), &key)),
            DecryptionError::MalformedEnvelope { .. }
        ));
    }

    #[test]
    fn bad_padding_is_a_cipher_failure() {
        let key = key256();
        let iv = STANDARD.encode(IV);
        let value = STANDARD.encode([0u8; 16]);
        let mac = sign(&iv, &value, &key);
        assert!(matches!(
            error_of(decrypt(&wrap(&iv, &value, &mac), &key)),
            DecryptionError::CipherFailure { .. }
        ));
    }

    #[test]
    fn strip_value_prefix_needs_exactly_one_separator() {
        assert_eq!(strip_value_prefix("hash|session"), "session");
        assert_eq!(strip_value_prefix("session"), "session");
        assert_eq!(strip_value_prefix("1|token|hash"), "1|token|hash");
    }

    #[test]
    fn unwrap_serialized_string_leaves_other_text_alone() {
        assert_eq!(unwrap_serialized_string("s:3:\"abc\";".to_string()), "abc");
        assert_eq!(unwrap_serialized_string("s:9:\"abc\";".to_string()), "s:9:\"abc\";");
        assert_eq!(unwrap_serialized_string("i:5;".to_string()), "i:5;");
    }
}
