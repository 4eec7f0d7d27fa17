//! Pipeline settings.
//!
//! Stored as a plain JSON object on disk; every field is optional:
//! ```json
//! {
//!   "bucket_width_ms": 900000,
//!   "strategy": "cumulative-net",
//!   "resolution": "name-then-nearest",
//!   "duplicate_names": "last-wins"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bucket::BucketWidth;
use crate::catalog::{CatalogOptions, DuplicateNamePolicy};
use crate::occupancy::AggregationStrategy;
use crate::resolver::ResolutionMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(rename = "bucket_width_ms")]
    pub bucket_width: BucketWidth,
    pub strategy: AggregationStrategy,
    pub resolution: ResolutionMode,
    pub duplicate_names: DuplicateNamePolicy,
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config '{path}'"))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pipeline config '{path}'"))
    }

    /// Catalog options implied by this config. Coordinates are only required
    /// when endpoints may be resolved spatially.
    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            spatial: self.resolution != ResolutionMode::Name,
            duplicate_names: self.duplicate_names,
        }
    }
}
