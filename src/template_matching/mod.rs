/// Icon recognition primitives
///
/// This module provides:
/// - Difference hashing with a configurable grid size
/// - Hamming-based hash similarity
/// - Saturation check for greyed-out (disabled) icons
/// - Region matching by sliding hashed window or direct correlation
pub mod castability;
pub mod hash;
pub mod matcher;
pub mod types;

pub use castability::{DEFAULT_MIN_SATURATION, is_castable, mean_saturation};
pub use hash::{DEFAULT_HASH_SIZE, PerceptualHasher, similarity};
pub use matcher::{MatchTarget, RegionMatcher, find_direct, find_edges};
pub use types::{CorrelationMethod, HashMatrix, MatchResult, MatchThreshold, SearchStrategy};
