//! Value codec: logical text <-> store-safe wire text.
//!
//! Responsibilities:
//! - Escape `{{` / `}}` (which the store rejects) into single substitute characters.
//! - Seal values too large for the store's plain limit into a signed, base64 envelope.
//!   Text that would itself unseal is sealed again so it reads back unchanged.
//! - Reverse both transformations on read.
//!
//! Does NOT handle:
//! - Encryption. Sealed values are signed, not hidden.
//!
//! Invariants:
//! - `decode_from_wire(encode_for_wire(t)) == t` for every `t`.
//! - Decoding never fails: anything that is not a valid envelope is plain escaped text.
//!
//! Envelope layout (before base64): `SSMCFG1\0` ‖ HMAC-SHA256(key, payload) ‖ payload.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::trace;

use crate::constants::{
    CLOSE_SUBSTITUTE, DEFAULT_SIGNING_KEY, ENVELOPE_MAC_LEN, ENVELOPE_MAGIC, MAX_PLAIN_VALUE_CHARS,
    OPEN_SUBSTITUTE,
};

type HmacSha256 = Hmac<Sha256>;

/// Replace the forbidden brace pairs with their substitute characters.
pub fn escape(text: &str) -> String {
    text.replace("{{", &OPEN_SUBSTITUTE.to_string())
        .replace("}}", &CLOSE_SUBSTITUTE.to_string())
}

/// Reverse [`escape`].
pub fn unescape(text: &str) -> String {
    text.replace(CLOSE_SUBSTITUTE, "}}")
        .replace(OPEN_SUBSTITUTE, "{{")
}

/// Encodes and decodes values with a given envelope signing key.
#[derive(Clone)]
pub struct ValueCodec {
    key: Arc<[u8]>,
}

impl std::fmt::Debug for ValueCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCodec").finish_non_exhaustive()
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNING_KEY)
    }
}

impl ValueCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into().into(),
        }
    }

    /// Turn logical text into what is sent to the store.
    pub fn encode_for_wire(&self, text: &str) -> String {
        let escaped = escape(text);
        if needs_seal(text, &escaped) || self.unseal(text).is_some() {
            self.seal(text)
        } else {
            escaped
        }
    }

    /// Turn a raw store value back into logical text.
    pub fn decode_from_wire(&self, wire: &str) -> String {
        self.decode_unescaped(&unescape(wire))
    }

    /// Decode a value whose escaping has already been reversed.
    pub fn decode_unescaped(&self, value: &str) -> String {
        self.unseal(value).unwrap_or_else(|| value.to_string())
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| HmacSha256::new(&Default::default()))
    }

    fn seal(&self, text: &str) -> String {
        let payload = text.as_bytes();
        let mut mac = self.mac();
        mac.update(payload);
        let tag = mac.finalize().into_bytes();

        let mut bytes = Vec::with_capacity(ENVELOPE_MAGIC.len() + ENVELOPE_MAC_LEN + payload.len());
        bytes.extend_from_slice(ENVELOPE_MAGIC);
        bytes.extend_from_slice(&tag);
        bytes.extend_from_slice(payload);
        STANDARD.encode(bytes)
    }

    fn unseal(&self, value: &str) -> Option<String> {
        let bytes = match STANDARD.decode(value.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                trace!(error = %e, "value is not an envelope (base64)");
                return None;
            }
        };
        let header = ENVELOPE_MAGIC.len() + ENVELOPE_MAC_LEN;
        if bytes.len() < header || &bytes[..ENVELOPE_MAGIC.len()] != ENVELOPE_MAGIC {
            trace!(len = bytes.len(), "value is not an envelope (header)");
            return None;
        }
        let (tag, payload) = bytes[ENVELOPE_MAGIC.len()..].split_at(ENVELOPE_MAC_LEN);
        let mut mac = self.mac();
        mac.update(payload);
        if mac.verify_slice(tag).is_err() {
            trace!("envelope signature mismatch");
            return None;
        }
        match String::from_utf8(payload.to_vec()) {
            Ok(text) => Some(text),
            Err(_) => {
                trace!("envelope payload is not UTF-8");
                None
            }
        }
    }
}

fn needs_seal(text: &str, escaped: &str) -> bool {
    escaped.chars().count() > MAX_PLAIN_VALUE_CHARS
        || text.contains([OPEN_SUBSTITUTE, CLOSE_SUBSTITUTE])
}

/// Encode with the default codec.
pub fn encode_for_wire(text: &str) -> String {
    ValueCodec::default().encode_for_wire(text)
}

/// Decode with the default codec.
pub fn decode_from_wire(wire: &str) -> String {
    ValueCodec::default().decode_from_wire(wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_braces() {
        assert_eq!(escape("a {{b}} c"), "a ʃbʅ c");
        assert_eq!(unescape("a ʃbʅ c"), "a {{b}} c");
    }

    #[test]
    fn test_short_values_are_only_escaped() {
        let wire = encode_for_wire("test_value {{brackets}}\n😀");
        assert_eq!(wire, "test_value ʃbracketsʅ\n😀");
        assert_eq!(decode_from_wire(&wire), "test_value {{brackets}}\n😀");
    }

    #[test]
    fn test_long_values_are_sealed() {
        let text = "x".repeat(MAX_PLAIN_VALUE_CHARS + 1);
        let wire = encode_for_wire(&text);
        assert_ne!(wire, text);
        assert!(STANDARD.decode(&wire).is_ok());
        assert_eq!(decode_from_wire(&wire), text);
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        let text = "é".repeat(MAX_PLAIN_VALUE_CHARS);
        assert_eq!(encode_for_wire(&text), text);
    }

    #[test]
    fn test_substitute_characters_survive() {
        let text = "literal ʃ and ʅ with {{x}}";
        assert_eq!(decode_from_wire(&encode_for_wire(text)), text);
    }

    #[test]
    fn test_wrong_key_falls_back_to_text() {
        let sealed = ValueCodec::new(b"one".to_vec()).encode_for_wire(&"y".repeat(5000));
        let other = ValueCodec::new(b"two".to_vec());
        assert_eq!(other.decode_from_wire(&sealed), sealed);
    }

    #[test]
    fn test_plain_base64_is_not_unsealed() {
        let text = STANDARD.encode("just some bytes that are long enough to pass the header length");
        assert_eq!(decode_from_wire(&text), text);
    }

    #[test]
    fn test_envelope_text_is_sealed_again() {
        let inner = encode_for_wire("ʃ");
        let outer = encode_for_wire(&inner);
        assert_ne!(outer, inner);
        assert_eq!(decode_from_wire(&outer), inner);
        assert_eq!(decode_from_wire(&inner), "ʃ");

        let padded = format!(" {inner}\n");
        assert_eq!(decode_from_wire(&encode_for_wire(&padded)), padded);
    }

    #[test]
    fn test_envelope_under_another_key_stays_plain() {
        let foreign = ValueCodec::new(b"other".to_vec()).encode_for_wire("ʃ");
        assert_eq!(encode_for_wire(&foreign), foreign);
        assert_eq!(decode_from_wire(&foreign), foreign);
    }

    #[test]
    fn test_decode_trims_envelope_whitespace() {
        let text = "z".repeat(5000);
        let wire = format!("  {}\n", encode_for_wire(&text));
        assert_eq!(decode_from_wire(&wire), text);
    }
}
