//! Fit output and equation rendering

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Coefficient key of the distance predictor
pub const DISTANCE_KEY: &str = "kilometrage";
/// Coefficient key of the tonnage predictor
pub const TONNAGE_KEY: &str = "tonnage";

/// Coefficients substituted when a fit is unusable
pub const DEFAULT_DISTANCE_COEFFICIENT: f64 = 0.001;
pub const DEFAULT_TONNAGE_COEFFICIENT: f64 = 0.001;

/// A fitted model `Consommation = b1 * km + b2 * t + b0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionResult {
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub regression_equation: String,
    /// Exactly the keys [`DISTANCE_KEY`] and [`TONNAGE_KEY`]
    pub coefficients: BTreeMap<String, f64>,
    pub intercept: f64,
    #[serde(rename = "rSquared")]
    pub r_squared: f64,
    #[serde(rename = "adjustedRSquared")]
    pub adjusted_r_squared: f64,
    pub mse: f64,
    /// Absent on the substituted default result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<FitDiagnostics>,
}

impl RegressionResult {
    pub fn distance_coefficient(&self) -> f64 {
        self.coefficients.get(DISTANCE_KEY).copied().unwrap_or(0.0)
    }

    pub fn tonnage_coefficient(&self) -> f64 {
        self.coefficients.get(TONNAGE_KEY).copied().unwrap_or(0.0)
    }

    /// Predicted consumption in liters
    pub fn predict(&self, km: f64, tons: f64) -> f64 {
        self.distance_coefficient() * km + self.tonnage_coefficient() * tons + self.intercept
    }

    /// The placeholder used when a fit fails
    pub fn default_for(vehicle_type: &str) -> Self {
        Self {
            vehicle_type: vehicle_type.to_string(),
            regression_equation: format!(
                "Consommation = {:.4} * Kilometrage + {:.4} * Tonnage + 0",
                DEFAULT_DISTANCE_COEFFICIENT, DEFAULT_TONNAGE_COEFFICIENT
            ),
            coefficients: coefficient_map(DEFAULT_DISTANCE_COEFFICIENT, DEFAULT_TONNAGE_COEFFICIENT),
            intercept: 0.0,
            r_squared: 0.0,
            adjusted_r_squared: 0.0,
            mse: 0.0,
            diagnostics: None,
        }
    }

    pub fn is_default(&self) -> bool {
        self.diagnostics.is_none()
    }
}

pub(crate) fn coefficient_map(distance: f64, tonnage: f64) -> BTreeMap<String, f64> {
    BTreeMap::from([
        (DISTANCE_KEY.to_string(), distance),
        (TONNAGE_KEY.to_string(), tonnage),
    ])
}

/// Render `Consommation = b1 × Kilometrage ± |b2| × Tonnage ± |b0|` with
/// four decimals
pub fn format_equation(distance: f64, tonnage: f64, intercept: f64) -> String {
    format!(
        "Consommation = {:.4} × Kilometrage {} {:.4} × Tonnage {} {:.4}",
        distance,
        sign(tonnage),
        tonnage.abs(),
        sign(intercept),
        intercept.abs()
    )
}

fn sign(value: f64) -> char {
    if value >= 0.0 {
        '+'
    } else {
        '-'
    }
}

/// Inference statistics for one coefficient. Standard error, t and p are
/// unset when the fit has no residual degrees of freedom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoefficientStats {
    pub name: String,
    pub estimate: f64,
    pub standard_error: Option<f64>,
    pub t_value: Option<f64>,
    pub p_value: Option<f64>,
}

/// Which observed quantity an outlier was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutlierField {
    Kilometrage,
    Tonnage,
    Consommation,
}

/// An observation far from the mean of its field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outlier {
    /// Position of the observation in the fitted set
    pub index: usize,
    pub field: OutlierField,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Everything known about a fit beyond its headline numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitDiagnostics {
    pub observations: usize,
    /// Observations minus fitted parameters
    pub degrees_of_freedom: usize,
    /// Intercept, then distance, then tonnage
    pub coefficients: Vec<CoefficientStats>,
    /// Fewer observations than the configured minimum
    pub low_confidence: bool,
    /// R² below the configured threshold
    pub weak_fit: bool,
    pub outliers: Vec<Outlier>,
}
