//! Domain logic for severity scoring.

mod cache;
mod features;

pub use cache::ScoreCache;
pub use features::{assemble_features, contributing_factors};

/// Scorer configuration.
#[derive(Clone, Debug)]
pub struct ScorerConfig {
    /// Maximum cached scores before the oldest entries are evicted.
    pub cache_size: usize,
    /// How many contributing factors to record per score.
    pub max_factors: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            cache_size: 10_000,
            max_factors: 5,
        }
    }
}
