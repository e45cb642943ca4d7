//! Build and query configuration
//!
//! Every section has serde defaults so a partial JSON document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub signature: SignatureConfig,
    pub similarity: SimilarityConfig,
    pub simrank: SimRankConfig,
    pub join: JoinConfig,
}

impl DiscoveryConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let config: DiscoveryConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signature.size == 0 {
            return Err(Error::Configuration("signature.size must be positive".into()));
        }
        if self.signature.max_values_per_column == 0 {
            return Err(Error::Configuration(
                "signature.max_values_per_column must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity.ks_threshold) {
            return Err(Error::Configuration("similarity.ks_threshold must be in [0, 1]".into()));
        }
        if !(-1.0..=1.0).contains(&self.similarity.cosine_threshold) {
            return Err(Error::Configuration(
                "similarity.cosine_threshold must be in [-1, 1]".into(),
            ));
        }
        let c = self.simrank.damping;
        if !(c > 0.0 && c < 1.0) {
            return Err(Error::Configuration(format!(
                "simrank.damping must be in (0, 1), got {}",
                c
            )));
        }
        if self.simrank.epsilon < 0.0 {
            return Err(Error::Configuration("simrank.epsilon must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&self.simrank.structural_threshold) {
            return Err(Error::Configuration(
                "simrank.structural_threshold must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.join.overlap_fraction) {
            return Err(Error::Configuration("join.overlap_fraction must be in [0, 1]".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Sketch width for both numeric and textual signatures
    pub size: usize,
    /// Values beyond this count are ignored when sketching and computing overlap
    pub max_values_per_column: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            size: 128,
            max_values_per_column: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Maximum two-sample KS statistic for two numeric fields to be similar
    pub ks_threshold: f64,
    /// Minimum cosine between textual sketches for two textual fields to be similar
    pub cosine_threshold: f32,
    /// Schema matches need an edit distance strictly below this
    pub schema_sim_threshold: usize,
    /// Add SCHEMA_SIM edges between fields with matching column-name tokens
    pub schema_edges: bool,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            ks_threshold: 0.2,
            cosine_threshold: 0.6,
            schema_sim_threshold: 3,
            schema_edges: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimRankConfig {
    pub damping: f32,
    pub max_iterations: usize,
    /// Stop once the total absolute change of a round drops below this
    pub epsilon: f32,
    /// Every node is part of its own in-neighborhood
    pub reflexive: bool,
    /// Minimum score for `columns_in_context_with`
    pub structural_threshold: f32,
}

impl Default for SimRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.8,
            max_iterations: 10,
            epsilon: 1e-4,
            reflexive: true,
            structural_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub overlap_fraction: f64,
    pub path_dedup: PathDedup,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            overlap_fraction: 0.5,
            path_dedup: PathDedup::Endpoints,
        }
    }
}

/// How join-path search suppresses duplicate paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathDedup {
    /// Two paths with the same first and last field are duplicates
    #[default]
    Endpoints,
    /// Only identical hop sequences are duplicates
    FullPath,
}
