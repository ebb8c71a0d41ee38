//! Difference hash (dHash) and Hamming comparison
//!
//! The hash is computed on a grayscale copy resized to
//! `(hash_size + 1) x hash_size` with a bilinear filter. Bit `(row, col)` is set
//! when the sample at `col` is strictly brighter than the one at `col + 1`.

use super::types::HashMatrix;
use crate::error::{SkillError, SkillResult};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

/// Default side length of the hash grid (16x16 = 256 bits)
pub const DEFAULT_HASH_SIZE: usize = 16;

/// Filter shared by template and window hashing; both sides must match
const HASH_FILTER: FilterType = FilterType::Triangle;

/// Perceptual hasher with a fixed grid size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PerceptualHasher {
    hash_size: usize,
}

impl PerceptualHasher {
    pub fn new(hash_size: usize) -> Self {
        Self { hash_size }
    }

    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    /// Hash a color image (converted to luma first)
    pub fn hash(&self, image: &RgbImage) -> SkillResult<HashMatrix> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SkillError::invalid_input("cannot hash a zero-area image"));
        }
        self.hash_gray(&imageops::grayscale(image))
    }

    /// Hash an image that is already grayscale
    pub fn hash_gray(&self, gray: &GrayImage) -> SkillResult<HashMatrix> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(SkillError::invalid_input("cannot hash a zero-area image"));
        }
        if self.hash_size == 0 {
            return Err(SkillError::invalid_input("hash size must be positive"));
        }

        let n = self.hash_size as u32;
        let resized = imageops::resize(gray, n + 1, n, HASH_FILTER);

        let bits = (0..n).flat_map(|row| {
            let resized = &resized;
            (0..n).map(move |col| resized.get_pixel(col, row)[0] > resized.get_pixel(col + 1, row)[0])
        });
        HashMatrix::from_bits(self.hash_size, bits)
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_SIZE)
    }
}

/// Compare two hashes, returning `(similarity, hamming_distance)`.
///
/// `similarity = 1 - distance / total_bits`. Hashes of different sizes are a
/// caller bug and yield `ShapeMismatch`.
pub fn similarity(a: &HashMatrix, b: &HashMatrix) -> SkillResult<(f32, u32)> {
    if a.size() != b.size() {
        return Err(SkillError::ShapeMismatch {
            left: a.size(),
            right: b.size(),
        });
    }
    let distance: u32 = a
        .words()
        .iter()
        .zip(b.words())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    let total = a.total_bits() as f32;
    Ok((1.0 - distance as f32 / total, distance))
}
