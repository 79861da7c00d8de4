//! Fit settings

use serde::Deserialize;

/// Thresholds for the warnings attached to a fit
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RegressionOptions {
    /// Fits over fewer observations are flagged low-confidence
    pub min_observations_warning: usize,
    /// Outlier screening needs at least this many observations
    pub outlier_min_samples: usize,
    /// Distance from the mean, in population standard deviations, beyond
    /// which a value is reported as an outlier
    pub outlier_sigma: f64,
    /// R² below this logs a weak-fit warning
    pub low_r_squared_warning: f64,
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self {
            min_observations_warning: 3,
            outlier_min_samples: 5,
            outlier_sigma: 3.0,
            low_r_squared_warning: 0.5,
        }
    }
}
