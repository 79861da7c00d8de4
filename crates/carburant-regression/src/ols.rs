//! Ordinary least squares with two predictors
//!
//! The model is `y = b0 + b1 * x1 + b2 * x2` over raw values. Slopes come
//! from the centered 2x2 normal equations, which gives the same estimates as
//! the full 3x3 system with better conditioning.

use carburant_extract::{round_metric, VehicleRecord};

use crate::error::{FitResult, RegressionError};
use crate::options::RegressionOptions;
use crate::outliers::screen_outliers;
use crate::result::{
    coefficient_map, format_equation, CoefficientStats, FitDiagnostics, RegressionResult,
};

/// Fitted parameters: intercept, distance and tonnage
const PARAMETERS: usize = 3;

/// Relative determinant below which the predictors are treated as collinear
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// One row of the design: distance and tonnage predict liters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub distance: f64,
    pub tonnage: f64,
    pub liters: f64,
}

impl From<&VehicleRecord> for Observation {
    fn from(record: &VehicleRecord) -> Self {
        Self {
            distance: record.kilometrage,
            tonnage: record.produits_tonnes,
            liters: record.consommation_l,
        }
    }
}

/// Fit liters against distance and tonnage for `vehicle_type`.
///
/// Fewer than `min_observations_warning` observations still fit when the
/// design allows it, flagged as low-confidence.
pub fn fit_observations(
    observations: &[Observation],
    vehicle_type: &str,
    options: &RegressionOptions,
) -> FitResult<RegressionResult> {
    let n = observations.len();
    if n == 0 {
        return Err(RegressionError::NoData(vehicle_type.to_string()));
    }
    log::debug!(
        "Performing regression for {} with {} observations",
        vehicle_type,
        n
    );

    let low_confidence = n < options.min_observations_warning;
    if low_confidence {
        log::warn!(
            "Insufficient data points for reliable regression ({}). At least {} are recommended.",
            n,
            options.min_observations_warning
        );
    }
    let outliers = screen_outliers(observations, options);

    let moments = Moments::new(observations);
    let [b0, b1, b2] = moments.coefficients();
    let sse: f64 = observations
        .iter()
        .map(|o| {
            let residual = o.liters - (b0 + b1 * o.distance + b2 * o.tonnage);
            residual * residual
        })
        .sum();
    let r_squared = 1.0 - sse / moments.syy;

    if ![b0, b1, b2].iter().all(|v| v.is_finite()) {
        log::error!(
            "Invalid regression coefficients detected: intercept={}, kilometrage={}, tonnage={}",
            b0,
            b1,
            b2
        );
        return Err(RegressionError::InvalidFit {
            intercept: b0,
            distance: b1,
            tonnage: b2,
            r_squared,
        });
    }

    let df = n.saturating_sub(PARAMETERS);
    let adjusted = if df > 0 {
        1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df as f64
    } else {
        r_squared
    };
    // constant consumption leaves R² undefined
    let r_squared = round_metric(finite_or_zero(r_squared));
    let adjusted_r_squared = round_metric(finite_or_zero(adjusted));
    let mse = sse / n as f64;

    let weak_fit = r_squared < options.low_r_squared_warning;
    if weak_fit {
        log::warn!(
            "Low R-squared value ({}) indicates poor model fit",
            r_squared
        );
    }

    let coefficients = moments.coefficient_stats([b0, b1, b2], sse, df);
    for stats in &coefficients {
        log::debug!(
            "{} coefficient: {} (p-value: {:?})",
            stats.name,
            stats.estimate,
            stats.p_value
        );
    }

    let equation = format_equation(b1, b2, b0);
    log::info!("Regression equation for {}: {}", vehicle_type, equation);

    Ok(RegressionResult {
        vehicle_type: vehicle_type.to_string(),
        regression_equation: equation,
        coefficients: coefficient_map(b1, b2),
        intercept: b0,
        r_squared,
        adjusted_r_squared,
        mse,
        diagnostics: Some(FitDiagnostics {
            observations: n,
            degrees_of_freedom: df,
            coefficients,
            low_confidence,
            weak_fit,
            outliers,
        }),
    })
}

/// Means and centered cross products of the observations
struct Moments {
    n: f64,
    mean_x1: f64,
    mean_x2: f64,
    mean_y: f64,
    s11: f64,
    s22: f64,
    s12: f64,
    s1y: f64,
    s2y: f64,
    syy: f64,
}

impl Moments {
    fn new(observations: &[Observation]) -> Self {
        let n = observations.len() as f64;
        let mean = |f: fn(&Observation) -> f64| observations.iter().map(f).sum::<f64>() / n;
        let mean_x1 = mean(|o| o.distance);
        let mean_x2 = mean(|o| o.tonnage);
        let mean_y = mean(|o| o.liters);

        let mut m = Moments {
            n,
            mean_x1,
            mean_x2,
            mean_y,
            s11: 0.0,
            s22: 0.0,
            s12: 0.0,
            s1y: 0.0,
            s2y: 0.0,
            syy: 0.0,
        };
        for o in observations {
            let dx1 = o.distance - mean_x1;
            let dx2 = o.tonnage - mean_x2;
            let dy = o.liters - mean_y;
            m.s11 += dx1 * dx1;
            m.s22 += dx2 * dx2;
            m.s12 += dx1 * dx2;
            m.s1y += dx1 * dy;
            m.s2y += dx2 * dy;
            m.syy += dy * dy;
        }
        m
    }

    fn determinant(&self) -> f64 {
        self.s11 * self.s22 - self.s12 * self.s12
    }

    /// A constant predictor or perfectly collinear predictors
    fn is_singular(&self) -> bool {
        let det = self.determinant();
        !(det > SINGULAR_TOLERANCE * self.s11 * self.s22)
    }

    /// `[b0, b1, b2]`, all NaN for a singular design
    fn coefficients(&self) -> [f64; 3] {
        if self.is_singular() {
            return [f64::NAN; 3];
        }
        let det = self.determinant();
        let b1 = (self.s22 * self.s1y - self.s12 * self.s2y) / det;
        let b2 = (self.s11 * self.s2y - self.s12 * self.s1y) / det;
        let b0 = self.mean_y - b1 * self.mean_x1 - b2 * self.mean_x2;
        [b0, b1, b2]
    }

    /// Diagonal of `(XᵀX)⁻¹` for intercept, distance, tonnage
    fn inverse_diagonal(&self) -> [f64; 3] {
        let det = self.determinant();
        let (m1, m2) = (self.mean_x1, self.mean_x2);
        let intercept = 1.0 / self.n
            + (m1 * m1 * self.s22 - 2.0 * m1 * m2 * self.s12 + m2 * m2 * self.s11) / det;
        [intercept, self.s22 / det, self.s11 / det]
    }

    fn coefficient_stats(&self, beta: [f64; 3], sse: f64, df: usize) -> Vec<CoefficientStats> {
        let variance = (df > 0).then(|| sse / df as f64);
        let diagonal = self.inverse_diagonal();

        ["intercept", "kilometrage", "tonnage"]
            .iter()
            .zip(beta)
            .zip(diagonal)
            .map(|((name, estimate), d)| {
                let standard_error = variance.map(|v| (v * d).sqrt()).filter(|se| se.is_finite());
                let t_value = standard_error
                    .map(|se| estimate / se)
                    .filter(|t| t.is_finite());
                let p_value = t_value.map(|t| approximate_p_value(t, df));
                CoefficientStats {
                    name: name.to_string(),
                    estimate,
                    standard_error,
                    t_value,
                    p_value,
                }
            })
            .collect()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Two-tailed p-value approximation `2 * (1 - |t| / sqrt(df + t²))`
pub fn approximate_p_value(t: f64, df: usize) -> f64 {
    2.0 * (1.0 - t.abs() / (df as f64 + t * t).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegressionError;

    fn obs(distance: f64, tonnage: f64, liters: f64) -> Observation {
        Observation {
            distance,
            tonnage,
            liters,
        }
    }

    fn synthetic(n: usize) -> Vec<Observation> {
        (0..n)
            .map(|i| {
                let km = 1000.0 + 137.0 * i as f64;
                let tons = 5.0 + ((i * 7) % 11) as f64 * 3.0;
                obs(km, tons, 0.05 * km + 0.02 * tons + 10.0)
            })
            .collect()
    }

    #[test]
    fn test_recovers_exact_linear_model() {
        let result = fit_observations(&synthetic(20), "Camion", &RegressionOptions::default())
            .unwrap();
        assert!((result.distance_coefficient() - 0.05).abs() < 1e-9);
        assert!((result.tonnage_coefficient() - 0.02).abs() < 1e-9);
        assert!((result.intercept - 10.0).abs() < 1e-6);
        assert_eq!(result.r_squared, 1.0);
        assert_eq!(result.adjusted_r_squared, 1.0);
        assert!(result.mse < 1e-12);
        assert_eq!(
            result.regression_equation,
            "Consommation = 0.0500 × Kilometrage + 0.0200 × Tonnage + 10.0000"
        );

        let diagnostics = result.diagnostics.unwrap();
        assert_eq!(diagnostics.observations, 20);
        assert_eq!(diagnostics.degrees_of_freedom, 17);
        assert!(!diagnostics.low_confidence);
        assert!(diagnostics.outliers.is_empty());
    }

    #[test]
    fn test_noisy_fit_statistics() {
        let observations: Vec<Observation> = synthetic(30)
            .into_iter()
            .enumerate()
            .map(|(i, mut o)| {
                o.liters += if i % 2 == 0 { 1.5 } else { -1.5 };
                o
            })
            .collect();
        let result =
            fit_observations(&observations, "Camion", &RegressionOptions::default()).unwrap();

        assert!((result.distance_coefficient() - 0.05).abs() < 1e-2);
        assert!(result.r_squared > 0.9 && result.r_squared <= 1.0);
        assert!(result.adjusted_r_squared <= result.r_squared);
        assert!((result.mse - 2.25).abs() < 0.5);

        let stats = &result.diagnostics.unwrap().coefficients;
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[1].name, "kilometrage");
        let se = stats[1].standard_error.unwrap();
        assert!(se > 0.0);
        let t = stats[1].t_value.unwrap();
        assert!((t - stats[1].estimate / se).abs() < 1e-9);
        assert_eq!(stats[1].p_value, Some(approximate_p_value(t, 27)));
    }

    #[test]
    fn test_constant_tonnage_is_invalid() {
        let observations: Vec<Observation> = (0..6)
            .map(|i| obs(100.0 * (i + 1) as f64, 0.0, 8.0 * (i + 1) as f64))
            .collect();
        let err = fit_observations(&observations, "Minibus", &RegressionOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegressionError::InvalidFit { .. }));
    }

    #[test]
    fn test_constant_consumption_fits_with_zero_r_squared() {
        let observations: Vec<Observation> = synthetic(10)
            .into_iter()
            .map(|mut o| {
                o.liters = 0.0;
                o
            })
            .collect();
        let result =
            fit_observations(&observations, "Camion", &RegressionOptions::default()).unwrap();

        assert_eq!(result.distance_coefficient(), 0.0);
        assert_eq!(result.tonnage_coefficient(), 0.0);
        assert_eq!(result.intercept, 0.0);
        assert_eq!(result.r_squared, 0.0);
        assert_eq!(result.adjusted_r_squared, 0.0);
        assert_eq!(result.mse, 0.0);
        assert!(!result.is_default());
        assert!(result.diagnostics.unwrap().weak_fit);
    }

    #[test]
    fn test_collinear_predictors_are_invalid() {
        let observations: Vec<Observation> = (0..6)
            .map(|i| {
                let km = 100.0 * (i + 1) as f64;
                obs(km, km / 50.0, km * 0.07)
            })
            .collect();
        assert!(fit_observations(&observations, "Camion", &RegressionOptions::default()).is_err());
    }

    #[test]
    fn test_too_few_observations() {
        let err = fit_observations(
            &[obs(100.0, 2.0, 10.0), obs(200.0, 3.0, 18.0)],
            "Camion",
            &RegressionOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RegressionError::InvalidFit { .. }));

        assert_eq!(
            fit_observations(&[], "Camion", &RegressionOptions::default()),
            Err(RegressionError::NoData("Camion".into()))
        );
    }

    #[test]
    fn test_exactly_determined_fit() {
        let observations = [
            obs(100.0, 1.0, 16.0),
            obs(200.0, 5.0, 20.1),
            obs(400.0, 2.0, 30.04),
        ];
        let result =
            fit_observations(&observations, "Camion", &RegressionOptions::default()).unwrap();
        let diagnostics = result.diagnostics.unwrap();
        assert_eq!(diagnostics.degrees_of_freedom, 0);
        assert!(diagnostics.coefficients.iter().all(|c| c.standard_error.is_none()));
        assert_eq!(result.adjusted_r_squared, result.r_squared);
    }

    #[test]
    fn test_low_confidence_flag() {
        let options = RegressionOptions {
            min_observations_warning: 10,
            ..Default::default()
        };
        let result = fit_observations(&synthetic(5), "Camion", &options).unwrap();
        assert!(result.diagnostics.unwrap().low_confidence);
    }

    #[test]
    fn test_p_value_approximation() {
        assert_eq!(approximate_p_value(0.0, 10), 2.0);
        assert!(approximate_p_value(50.0, 10) < 0.01);
        assert_eq!(approximate_p_value(-2.0, 0), 0.0);
    }
}
