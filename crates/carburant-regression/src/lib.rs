//! # carburant-regression
//!
//! Linear model of fuel consumption:
//!
//! ```text
//! Consommation = b1 × Kilometrage + b2 × Tonnage + b0
//! ```
//!
//! fitted by ordinary least squares, with coefficient statistics and
//! outlier screening attached as [`FitDiagnostics`].
//!
//! ## Example
//!
//! ```rust
//! use carburant_regression::{fit_observations, Observation, RegressionOptions};
//!
//! let observations: Vec<Observation> = (0..10)
//!     .map(|i| {
//!         let distance = 500.0 + 100.0 * i as f64;
//!         let tonnage = (i % 4) as f64;
//!         Observation { distance, tonnage, liters: 0.2 * distance + 3.0 * tonnage + 12.0 }
//!     })
//!     .collect();
//!
//! let result = fit_observations(&observations, "Camion", &RegressionOptions::default()).unwrap();
//! assert!((result.distance_coefficient() - 0.2).abs() < 1e-9);
//! assert_eq!(result.r_squared, 1.0);
//! ```

pub mod error;
pub mod fit;
pub mod ols;
pub mod options;
pub mod outliers;
pub mod result;

pub use error::{FitResult, RegressionError};
pub use fit::{fit, fit_by_type, fit_or_default, ALL_VEHICLES};
pub use ols::{approximate_p_value, fit_observations, Observation};
pub use options::RegressionOptions;
pub use outliers::screen_outliers;
pub use result::{
    format_equation, CoefficientStats, FitDiagnostics, Outlier, OutlierField, RegressionResult,
    DEFAULT_DISTANCE_COEFFICIENT, DEFAULT_TONNAGE_COEFFICIENT, DISTANCE_KEY, TONNAGE_KEY,
};
