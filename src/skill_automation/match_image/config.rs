//! Configuration for icon matching operations

use crate::template_matching::{
    CorrelationMethod, DEFAULT_HASH_SIZE, DEFAULT_MIN_SATURATION, RegionMatcher, SearchStrategy,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Side length of the difference-hash grid
    pub hash_size: usize,
    /// How each template is searched for inside the captured region
    pub strategy: SearchStrategy,
    /// Scale factors tried by the multi-scale strategy, in order
    pub scale_factors: Vec<f32>,
    /// Mean saturation below which a hashed hit counts as disabled
    pub min_saturation: f32,
    /// Luma above which a pixel counts as foreground (new icon heuristic)
    pub background_luma: u8,
    /// Foreground share of the region needed to report a new icon
    pub min_foreground_ratio: f32,
    /// Consecutive failed cycles before the loop returns to idle
    pub max_consecutive_failures: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            strategy: SearchStrategy::HashedWindow,
            scale_factors: vec![1.0, 0.95, 1.05],
            min_saturation: DEFAULT_MIN_SATURATION,
            background_luma: 30,
            min_foreground_ratio: 0.10,
            max_consecutive_failures: 3,
        }
    }
}

impl MatchConfig {
    /// Build the region matcher described by this configuration
    pub fn region_matcher(&self) -> RegionMatcher {
        RegionMatcher::new(self.strategy)
            .with_scale_factors(self.scale_factors.clone())
            .with_min_saturation(self.min_saturation)
    }
}

/// Create a default configuration for skill bars that jitter by a few pixels
pub fn create_default_config() -> MatchConfig {
    MatchConfig::default()
}

/// Configuration preset for icons that never move inside the monitor region
pub fn create_fixed_position_config() -> MatchConfig {
    MatchConfig {
        strategy: SearchStrategy::Direct(CorrelationMethod::CrossCorrelation),
        ..MatchConfig::default()
    }
}

/// Configuration preset for UIs rendered at a slightly different scale than
/// the captured templates
pub fn create_scaled_icon_config() -> MatchConfig {
    MatchConfig {
        strategy: SearchStrategy::MultiScale,
        scale_factors: vec![1.0, 0.9, 0.95, 1.05, 1.1],
        ..MatchConfig::default()
    }
}
