//! Perceptual photo hashing
//!
//! This module provides a DCT-based perceptual hash for still images:
//! - Image decoding from bytes (format guessed from content)
//! - Grayscale reduction to a 32x32 thumbnail
//! - 2-D DCT-II over the thumbnail, keeping the 8x8 low-frequency block
//! - One bit per coefficient, set when it exceeds the AC median
//!
//! Visually similar images produce hashes with a small Hamming distance.

use crate::{BytesHasher, HashError, Result, SignalType};
use image::{imageops::FilterType, DynamicImage, ImageError};
use std::f64::consts::PI;

/// Side length of the grayscale thumbnail fed to the DCT
pub const THUMBNAIL_SIZE: u32 = 32;

/// Side length of the low-frequency coefficient block
pub const HASH_BLOCK_SIZE: usize = 8;

/// Resize filter used for the thumbnail
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Perceptual hash for photos, rendered as 16 lowercase hex chars
#[derive(Debug, Clone, Default)]
pub struct PhotoPHashSignal;

impl PhotoPHashSignal {
    /// Create a hasher
    pub fn new() -> Self {
        Self
    }

    /// Hash an already decoded image
    pub fn hash_image(&self, img: &DynamicImage) -> u64 {
        let thumb = img
            .resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, RESIZE_FILTER)
            .to_luma8();

        let n = THUMBNAIL_SIZE as usize;
        let pixels: Vec<f64> = thumb.pixels().map(|p| f64::from(p.0[0])).collect();

        let coefficients = low_frequency_dct(&pixels, n);

        // DC term excluded from the median
        let mut ac: Vec<f64> = coefficients[1..].to_vec();
        ac.sort_by(f64::total_cmp);
        let median = ac[ac.len() / 2];

        coefficients
            .iter()
            .enumerate()
            .fold(0u64, |hash, (i, &c)| if c > median { hash | (1u64 << (63 - i)) } else { hash })
    }
}

impl SignalType for PhotoPHashSignal {
    fn name(&self) -> &str {
        "photo_phash"
    }

    fn as_bytes_hasher(&self) -> Option<&dyn BytesHasher> {
        Some(self)
    }
}

impl BytesHasher for PhotoPHashSignal {
    fn hash_from_bytes(&self, bytes: &[u8]) -> Result<String> {
        let img = image::load_from_memory(bytes).map_err(|e| match e {
            ImageError::Limits(limits) => HashError::Hashing(limits.to_string()),
            other => HashError::UnrecognizedImage(other.to_string()),
        })?;

        Ok(format!("{:016x}", self.hash_image(&img)))
    }
}

/// Top-left `HASH_BLOCK_SIZE` square of the 2-D DCT-II of an `n`x`n` image,
/// row-major
fn low_frequency_dct(pixels: &[f64], n: usize) -> Vec<f64> {
    // cos_table[k][x] = cos((2x + 1) k pi / 2n)
    let cos_table: Vec<Vec<f64>> = (0..HASH_BLOCK_SIZE)
        .map(|k| {
            (0..n)
                .map(|x| ((2 * x + 1) as f64 * k as f64 * PI / (2 * n) as f64).cos())
                .collect()
        })
        .collect();

    let mut out = Vec::with_capacity(HASH_BLOCK_SIZE * HASH_BLOCK_SIZE);
    for v in 0..HASH_BLOCK_SIZE {
        for u in 0..HASH_BLOCK_SIZE {
            let mut sum = 0.0;
            for y in 0..n {
                let row = &pixels[y * n..(y + 1) * n];
                let cy = cos_table[v][y];
                for (x, &p) in row.iter().enumerate() {
                    sum += p * cos_table[u][x] * cy;
                }
            }
            out.push(sum);
        }
    }
    out
}

/// Hamming distance between two hex-encoded photo hashes
///
/// Returns `None` if either value is not a 64-bit hex string.
///
/// # Examples
/// ```
/// use signal_types::hamming_distance;
///
/// assert_eq!(hamming_distance("ffffffffffffffff", "fffffffffffffff0"), Some(4));
/// assert_eq!(hamming_distance("zz", "00"), None);
/// ```
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    let a = u64::from_str_radix(a, 16).ok()?;
    let b = u64::from_str_radix(b, 16).ok()?;
    Some((a ^ b).count_ones())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Left half black, right half white (or the inverse)
    fn split_image(inverted: bool) -> DynamicImage {
        let (dark, light) = if inverted { (255u8, 0u8) } else { (0u8, 255u8) };
        let img = RgbImage::from_fn(64, 64, |x, _| {
            let v = if x < 32 { dark } else { light };
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_hash_is_hex_64_bits() {
        let bytes = encode(&split_image(false), ImageFormat::Png);
        let hash = PhotoPHashSignal::new().hash_from_bytes(&bytes).unwrap();
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let bytes = encode(&split_image(false), ImageFormat::Png);
        let hasher = PhotoPHashSignal::new();
        assert_eq!(
            hasher.hash_from_bytes(&bytes).unwrap(),
            hasher.hash_from_bytes(&bytes).unwrap()
        );
    }

    #[test]
    fn test_lossless_encodings_hash_equal() {
        let img = split_image(false);
        let hasher = PhotoPHashSignal::new();
        let png = hasher.hash_from_bytes(&encode(&img, ImageFormat::Png)).unwrap();
        let bmp = hasher.hash_from_bytes(&encode(&img, ImageFormat::Bmp)).unwrap();
        assert_eq!(png, bmp);
    }

    #[test]
    fn test_inverted_images_differ() {
        let hasher = PhotoPHashSignal::new();
        let a = hasher.hash_image(&split_image(false));
        let b = hasher.hash_image(&split_image(true));
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_image_is_unrecognized() {
        let err = PhotoPHashSignal::new()
            .hash_from_bytes(b"\x8a\x91encrypted-blob-not-an-image")
            .unwrap_err();
        assert!(err.is_unrecognized());
    }

    #[test]
    fn test_truncated_png_is_unrecognized() {
        let bytes = encode(&split_image(false), ImageFormat::Png);
        let err = PhotoPHashSignal::new()
            .hash_from_bytes(&bytes[..bytes.len() / 3])
            .unwrap_err();
        assert!(err.is_unrecognized());
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance("0000000000000000", "0000000000000000"), Some(0));
        assert_eq!(hamming_distance("0000000000000000", "ffffffffffffffff"), Some(64));
        assert_eq!(hamming_distance("not-hex", "0"), None);
    }
}
