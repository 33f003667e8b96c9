//! # Hasher Module
//!
//! Turns raw image bytes into a perceptual fingerprint.
//!
//! ## How It Works
//! 1. Decode the bytes (zune-jpeg for JPEG, image crate otherwise)
//! 2. Flatten to opaque RGB (alpha composited over white)
//! 3. Downsample to a small grid and apply a DCT
//! 4. Keep the top-left low-frequency block
//! 5. Set each bit by comparing its coefficient to the block median
//!
//! Steps 3-5 are the pHash variant of the image_hasher crate
//! (`HashAlg::Median` with DCT preprocessing). The same configuration must
//! be used for registration and comparison, otherwise distances are
//! meaningless.
//!
//! ## Example
//! ```rust,ignore
//! use image_similarity_checker::core::hasher::HasherConfig;
//!
//! let extractor = HasherConfig::new().hash_size(8).build()?;
//! let fingerprint = extractor.extract(&std::fs::read("cat.png")?)?;
//! assert_eq!(fingerprint.bit_count(), 64);
//! ```

mod decode;
mod fingerprint;

pub use decode::{flatten_to_rgb, ImageDecoder};
pub use fingerprint::Fingerprint;

use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

/// Hash sizes accepted by the extractor
pub const SUPPORTED_HASH_SIZES: [u32; 3] = [8, 16, 32];

/// Default hash size (8x8 = 64 bits)
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Configuration builder for the fingerprint extractor
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Side of the retained DCT block (8, 16, or 32)
    hash_size: u32,
}

impl HasherConfig {
    /// Create a new hasher configuration with defaults
    pub fn new() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
        }
    }

    /// Set the hash size (8, 16, or 32)
    ///
    /// - 8: 64 bits, the reference configuration
    /// - 16: 256 bits
    /// - 32: 1024 bits
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    /// Build the extractor
    pub fn build(self) -> Result<FingerprintExtractor, HashError> {
        if !SUPPORTED_HASH_SIZES.contains(&self.hash_size) {
            return Err(HashError::InvalidHashSize {
                size: self.hash_size,
            });
        }

        let hasher = ImageHasherConfig::new()
            .hash_size(self.hash_size, self.hash_size)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();

        Ok(FingerprintExtractor {
            hash_size: self.hash_size,
            hasher,
        })
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes fingerprints from image bytes.
///
/// Pure: the same bytes always give the same fingerprint.
pub struct FingerprintExtractor {
    hash_size: u32,
    hasher: image_hasher::Hasher,
}

impl FingerprintExtractor {
    /// Decode, normalize and hash raw image bytes
    pub fn extract(&self, bytes: &[u8]) -> Result<Fingerprint, HashError> {
        let rgb = ImageDecoder::decode_rgb(bytes)?;
        Ok(self.hash_rgb(&DynamicImage::ImageRgb8(rgb)))
    }

    /// Hash an already decoded image, flattening it first
    pub fn extract_image(&self, image: &DynamicImage) -> Fingerprint {
        let rgb = flatten_to_rgb(image);
        self.hash_rgb(&DynamicImage::ImageRgb8(rgb))
    }

    fn hash_rgb(&self, image: &DynamicImage) -> Fingerprint {
        let hash = self.hasher.hash_image(image);
        Fingerprint::from_bytes(hash.as_bytes().to_vec())
    }

    /// Side of the retained DCT block
    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }

    /// Number of bits in every fingerprint this extractor produces
    pub fn bit_count(&self) -> u32 {
        self.hash_size * self.hash_size
    }
}
