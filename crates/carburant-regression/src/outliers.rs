//! Outlier screening over the observed fields

use crate::ols::Observation;
use crate::options::RegressionOptions;
use crate::result::{Outlier, OutlierField};

/// Report values further than `outlier_sigma` population standard deviations
/// from the mean of their field.
///
/// Screening only reports; the observations are still fitted. Sets smaller
/// than `outlier_min_samples` are not screened.
pub fn screen_outliers(observations: &[Observation], options: &RegressionOptions) -> Vec<Outlier> {
    if observations.len() < options.outlier_min_samples {
        return Vec::new();
    }

    let fields: [(OutlierField, fn(&Observation) -> f64); 3] = [
        (OutlierField::Kilometrage, |o| o.distance),
        (OutlierField::Tonnage, |o| o.tonnage),
        (OutlierField::Consommation, |o| o.liters),
    ];

    let mut outliers = Vec::new();
    for (field, value_of) in fields {
        let values: Vec<f64> = observations.iter().map(value_of).collect();
        let (mean, std_dev) = population_stats(&values);
        let threshold = options.outlier_sigma * std_dev;

        for (index, &value) in values.iter().enumerate() {
            if (value - mean).abs() > threshold {
                log::warn!(
                    "Potential outlier detected in {:?} at index {}: {}",
                    field,
                    index,
                    value
                );
                outliers.push(Outlier {
                    index,
                    field,
                    value,
                    mean,
                    std_dev,
                });
            }
        }
    }
    outliers
}

/// Mean and population standard deviation
fn population_stats(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mean_square = values.iter().map(|v| v * v).sum::<f64>() / n;
    (mean, (mean_square - mean * mean).max(0.0).sqrt())
}
