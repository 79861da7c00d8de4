//! Fitting vehicle records

use std::collections::BTreeMap;

use carburant_extract::{VehicleRecord, VehicleType};

use crate::error::FitResult;
use crate::ols::{fit_observations, Observation};
use crate::options::RegressionOptions;
use crate::result::RegressionResult;

/// Key of the fleet-wide model in [`fit_by_type`]
pub const ALL_VEHICLES: &str = "all";

/// Fit consumption of `records` against distance and tonnage
pub fn fit<'a, I>(
    records: I,
    vehicle_type: &str,
    options: &RegressionOptions,
) -> FitResult<RegressionResult>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    let observations: Vec<Observation> = records.into_iter().map(Observation::from).collect();
    fit_observations(&observations, vehicle_type, options)
}

/// Like [`fit`], substituting [`RegressionResult::default_for`] when the fit
/// fails
pub fn fit_or_default<'a, I>(
    records: I,
    vehicle_type: &str,
    options: &RegressionOptions,
) -> RegressionResult
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    match fit(records, vehicle_type, options) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Error in regression analysis for {}: {}", vehicle_type, e);
            RegressionResult::default_for(vehicle_type)
        }
    }
}

/// One model per vehicle type present in `records`, plus a fleet-wide model
/// under [`ALL_VEHICLES`].
///
/// Types whose fit fails are left out.
pub fn fit_by_type(
    records: &[VehicleRecord],
    options: &RegressionOptions,
) -> BTreeMap<String, RegressionResult> {
    let mut by_type: BTreeMap<VehicleType, Vec<&VehicleRecord>> = BTreeMap::new();
    for record in records {
        by_type.entry(record.vehicle_type).or_default().push(record);
    }

    let mut results = BTreeMap::new();
    let groups = by_type
        .iter()
        .map(|(t, group)| (t.as_str(), group.clone()))
        .chain(std::iter::once((ALL_VEHICLES, records.iter().collect())));

    for (name, group) in groups {
        match fit(group, name, options) {
            Ok(result) => {
                results.insert(name.to_string(), result);
            }
            Err(e) => log::warn!("Skipping regression for {}: {}", name, e),
        }
    }
    results
}
