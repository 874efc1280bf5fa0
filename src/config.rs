//! Configuration: dimension/variable naming and metric options
//!
//! Defaults follow the naming of the GFDL CM2.6 ocean output. A JSON file can
//! override any subset of the fields.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the dimensions and geometry variables of a model grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridNames {
    pub xdim: String,
    pub ydim: String,
    pub zdim: String,
    pub tdim: String,
    /// Cell area coordinate used as horizontal weight
    pub area: String,
    /// Cell volume coordinate used as volume weight
    pub volume: String,
}

impl Default for GridNames {
    fn default() -> Self {
        Self {
            xdim: "xt_ocean".to_string(),
            ydim: "yt_ocean".to_string(),
            zdim: "st_ocean".to_string(),
            tdim: "time".to_string(),
            area: "area_t".to_string(),
            volume: "volume".to_string(),
        }
    }
}

/// Options controlling [`crate::metrics::metrics_ds`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub names: GridNames,
    /// Weighted means instead of weighted sums
    pub compute_average: bool,
    /// Drop the tracking variable from averaged metrics
    pub drop_control: bool,
    /// Dimension created by threshold masking, plotted as separate lines
    pub threshold_dim: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            names: GridNames::default(),
            compute_average: false,
            drop_control: false,
            threshold_dim: "omz_thresholds".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
