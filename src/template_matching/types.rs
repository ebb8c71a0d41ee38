/// Template matching data types
use crate::error::{SkillError, SkillResult};
use serde::{Deserialize, Serialize};

/// Square bit grid produced by the difference hash.
///
/// Bits are stored row-major, packed 64 per word, so Hamming distance is a
/// popcount over XOR-ed words.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HashMatrix {
    size: usize,
    words: Vec<u64>,
}

impl HashMatrix {
    /// Build a matrix from `size * size` row-major bits
    pub fn from_bits<I>(size: usize, bits: I) -> SkillResult<Self>
    where
        I: IntoIterator<Item = bool>,
    {
        if size == 0 {
            return Err(SkillError::invalid_input("hash size must be positive"));
        }
        let total = size * size;
        let mut words = vec![0u64; total.div_ceil(64)];
        let mut count = 0usize;
        for (i, bit) in bits.into_iter().enumerate() {
            if i >= total {
                return Err(SkillError::invalid_input(format!(
                    "more than {total} bits supplied for a {size}x{size} hash"
                )));
            }
            if bit {
                words[i / 64] |= 1 << (i % 64);
            }
            count += 1;
        }
        if count != total {
            return Err(SkillError::invalid_input(format!(
                "expected {total} bits for a {size}x{size} hash, got {count}"
            )));
        }
        Ok(Self { size, words })
    }

    /// Side length (`hash_size`)
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn total_bits(&self) -> usize {
        self.size * self.size
    }

    /// Bit at (`row`, `col`), `None` when out of range
    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        if row >= self.size || col >= self.size {
            return None;
        }
        let i = row * self.size + col;
        Some(self.words[i / 64] & (1 << (i % 64)) != 0)
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Row-major '0'/'1' rendering, handy for logs and fixtures
    pub fn to_bit_string(&self) -> String {
        (0..self.total_bits())
            .map(|i| {
                if self.words[i / 64] & (1 << (i % 64)) != 0 {
                    '1'
                } else {
                    '0'
                }
            })
            .collect()
    }
}

/// Per-template acceptance threshold in (0, 1]
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct MatchThreshold(f32);

impl MatchThreshold {
    pub fn new(value: f32) -> SkillResult<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(SkillError::InvalidSettings {
                description: format!("match threshold {value} is outside (0, 1]"),
            })
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// A similarity exactly equal to the threshold is accepted
    pub fn accepts(self, similarity: f32) -> bool {
        similarity >= self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self(0.9)
    }
}

impl TryFrom<f32> for MatchThreshold {
    type Error = SkillError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MatchThreshold> for f32 {
    fn from(threshold: MatchThreshold) -> Self {
        threshold.0
    }
}

/// Outcome of searching one template inside one captured region
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// Whether the confidence cleared the template's threshold
    pub found: bool,
    /// Similarity or correlation score (0.0-1.0)
    pub confidence: f32,
    /// Offset of the best window inside the searched region
    pub location: Option<(u32, u32)>,
}

impl MatchResult {
    /// Nothing searched or nothing comparable (e.g. region smaller than template)
    pub fn not_found() -> Self {
        Self {
            found: false,
            confidence: 0.0,
            location: None,
        }
    }

    /// Below threshold; keeps the best-effort peak for diagnostics
    pub fn missed(confidence: f32, location: Option<(u32, u32)>) -> Self {
        Self {
            found: false,
            confidence,
            location,
        }
    }

    pub fn found(confidence: f32, x: u32, y: u32) -> Self {
        Self {
            found: true,
            confidence,
            location: Some((x, y)),
        }
    }
}

/// Scoring used by the direct (whole-region, single pass) strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    /// Normalized cross-correlation, confidence is the peak value
    CrossCorrelation,
    /// Normalized squared difference, confidence is `1 - min`
    SquaredDifference,
}

/// How the region matcher searches a captured region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Difference-hash every template-sized window (tolerates jitter)
    HashedWindow,
    /// One correlation pass over the whole region
    Direct(CorrelationMethod),
    /// Direct cross-correlation repeated over the configured scale factors
    MultiScale,
    /// Cross-correlation of Canny edge maps
    EdgeCorrelation,
}

impl std::str::FromStr for SearchStrategy {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashed" | "hash" => Ok(SearchStrategy::HashedWindow),
            "ncc" | "correlation" => Ok(SearchStrategy::Direct(CorrelationMethod::CrossCorrelation)),
            "sqdiff" | "ssd" => Ok(SearchStrategy::Direct(CorrelationMethod::SquaredDifference)),
            "multiscale" | "multi-scale" => Ok(SearchStrategy::MultiScale),
            "edges" | "edge" => Ok(SearchStrategy::EdgeCorrelation),
            other => Err(SkillError::InvalidSettings {
                description: format!("unknown search strategy '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matrix_bit_access() {
        let bits = (0..16).map(|i| i % 3 == 0);
        let hash = HashMatrix::from_bits(4, bits).unwrap();
        assert_eq!(hash.size(), 4);
        assert_eq!(hash.total_bits(), 16);
        assert_eq!(hash.get(0, 0), Some(true));
        assert_eq!(hash.get(0, 1), Some(false));
        assert_eq!(hash.get(3, 3), Some(true)); // index 15
        assert_eq!(hash.get(4, 0), None);
        assert_eq!(hash.to_bit_string(), "1001001001001001");
    }

    #[test]
    fn test_hash_matrix_rejects_wrong_bit_count() {
        assert!(HashMatrix::from_bits(4, std::iter::repeat_n(true, 15)).is_err());
        assert!(HashMatrix::from_bits(4, std::iter::repeat_n(true, 17)).is_err());
        assert!(HashMatrix::from_bits(0, std::iter::empty()).is_err());
    }

    #[test]
    fn test_threshold_range() {
        assert!(MatchThreshold::new(0.0).is_err());
        assert!(MatchThreshold::new(1.01).is_err());
        assert!(MatchThreshold::new(1.0).is_ok());
        let t = MatchThreshold::new(0.8).unwrap();
        assert!(t.accepts(0.8));
        assert!(!t.accepts(0.8 - f32::EPSILON));
    }

    #[test]
    fn test_threshold_serde_validates() {
        let t: MatchThreshold = serde_json::from_str("0.75").unwrap();
        assert_eq!(t.value(), 0.75);
        assert!(serde_json::from_str::<MatchThreshold>("1.5").is_err());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("hashed".parse::<SearchStrategy>().unwrap(), SearchStrategy::HashedWindow);
        assert_eq!(
            "SQDIFF".parse::<SearchStrategy>().unwrap(),
            SearchStrategy::Direct(CorrelationMethod::SquaredDifference)
        );
        assert!("sift".parse::<SearchStrategy>().is_err());
    }
}
