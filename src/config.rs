//! Settings shared by the hash-list tools, loadable from a JSON file.
//!
//! ```json
//! { "distance_threshold": 31, "query_mode": "brute-force", "trace_every": 1000 }
//! ```
//!
//! Missing keys take their defaults. Command-line flags override file values.

use crate::error::{Error, Result};
use crate::index::{QueryMode, MAX_DISTANCE};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default Hamming-distance threshold for matching and clustering.
pub const DEFAULT_DISTANCE_THRESHOLD: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub distance_threshold: usize,
    pub query_mode: QueryMode,
    /// Log progress every this many items; 0 is off.
    pub trace_every: usize,
    /// Print a blank line between clusters.
    pub separate_clusters: bool,
    /// Transitive clustering; when off, every hash lists its own neighbours.
    pub snowball: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            query_mode: QueryMode::Indexed,
            trace_every: 0,
            separate_clusters: false,
            snowball: true,
        }
    }
}

impl Config {
    /// Loads a JSON config file. Call [`Config::validate`] once overrides are applied.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Rejects an indexed query mode with a threshold the index cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.query_mode == QueryMode::Indexed && self.distance_threshold > MAX_DISTANCE {
            return Err(Error::DimensionExceeded {
                d: self.distance_threshold,
                max: MAX_DISTANCE,
            });
        }
        Ok(())
    }
}
