//! # Codec Module
//!
//! Canonical text form of a fingerprint, as stored in the reference table.
//!
//! The text form is lowercase hexadecimal, exactly `bits / 4` characters
//! long (16 for a 64-bit fingerprint). Decoding is strict: a stored value of
//! the wrong length or with non-hex characters is an error, never a default
//! fingerprint.

use crate::core::hasher::Fingerprint;
use crate::error::CodecError;

/// Default fingerprint size in bits
pub const DEFAULT_FINGERPRINT_BITS: u32 = 64;

/// Encodes and decodes fingerprints of one fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintCodec {
    bits: u32,
}

impl FingerprintCodec {
    /// Create a codec for fingerprints of `bits` bits
    pub fn new(bits: u32) -> Self {
        Self { bits }
    }

    /// Create a codec matching an extractor hash size (`size * size` bits)
    pub fn for_hash_size(hash_size: u32) -> Self {
        Self::new(hash_size * hash_size)
    }

    /// Number of bits per fingerprint
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Length of the canonical text form
    pub fn text_len(&self) -> usize {
        (self.bits / 4) as usize
    }

    /// Encode to lowercase hex
    pub fn encode(&self, fingerprint: &Fingerprint) -> String {
        hex::encode(fingerprint.as_bytes())
    }

    /// Decode from hex text
    pub fn decode(&self, text: &str) -> Result<Fingerprint, CodecError> {
        let actual = text.chars().count();
        if actual != self.text_len() {
            return Err(CodecError::InvalidLength {
                expected: self.text_len(),
                actual,
            });
        }

        if let Some((position, character)) = text
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_hexdigit())
        {
            return Err(CodecError::InvalidCharacter {
                position,
                character,
            });
        }

        // Length and alphabet are already validated
        let bytes = hex::decode(text).map_err(|_| CodecError::InvalidLength {
            expected: self.text_len(),
            actual,
        })?;

        Ok(Fingerprint::from_bytes(bytes))
    }
}

impl Default for FingerprintCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FINGERPRINT_BITS)
    }
}
