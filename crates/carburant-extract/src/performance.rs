//! Per-vehicle performance summaries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::VehicleRecord;
use crate::vehicle::VehicleType;

/// One month's figures for a single vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetrics {
    pub consommation_l: f64,
    #[serde(rename = "consommationTEP")]
    pub consommation_tep: f64,
    #[serde(rename = "coutDT")]
    pub cout_dt: f64,
    pub kilometrage: f64,
    pub produits_tonnes: f64,
    pub ipe_l100km: Option<f64>,
    pub ipe_l100_tonne_km: Option<f64>,
}

impl From<&VehicleRecord> for MonthlyMetrics {
    fn from(record: &VehicleRecord) -> Self {
        Self {
            consommation_l: record.consommation_l,
            consommation_tep: record.consommation_tep,
            cout_dt: record.cout_dt,
            kilometrage: record.kilometrage,
            produits_tonnes: record.produits_tonnes,
            ipe_l100km: record.ipe_l100km,
            ipe_l100_tonne_km: record.ipe_l100_tonne_km,
        }
    }
}

/// Totals and indices of one vehicle over all its records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePerformance {
    pub matricule: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub consommation_totale_l: f64,
    pub kilometrage_total_km: f64,
    pub produits_total_tonnes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipe_l100km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipe_l100_tonne_km: Option<f64>,
    /// Keyed by month label. A later record for the same month replaces an
    /// earlier one.
    pub monthly_data: BTreeMap<String, MonthlyMetrics>,
}

/// Group `records` by registration, sorted by registration.
///
/// The vehicle type is taken from the vehicle's first record.
pub fn vehicle_performance<'a, I>(records: I) -> Vec<VehiclePerformance>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    let mut by_vehicle: BTreeMap<&str, Vec<&VehicleRecord>> = BTreeMap::new();
    for record in records {
        by_vehicle.entry(&record.matricule).or_default().push(record);
    }

    by_vehicle
        .into_iter()
        .filter_map(|(matricule, records)| {
            let first = records.first()?;
            let liters: f64 = records.iter().map(|r| r.consommation_l).sum();
            let km: f64 = records.iter().map(|r| r.kilometrage).sum();
            let tons: f64 = records.iter().map(|r| r.produits_tonnes).sum();

            let ipe_l100km = (km > 0.0).then(|| liters / (km / 100.0));
            let ipe_l100_tonne_km = ipe_l100km
                .filter(|_| tons > 0.0)
                .map(|ipe| ipe * (1.0 / (tons / 1000.0)));

            Some(VehiclePerformance {
                matricule: matricule.to_string(),
                vehicle_type: first.vehicle_type,
                consommation_totale_l: liters,
                kilometrage_total_km: km,
                produits_total_tonnes: tons,
                ipe_l100km,
                ipe_l100_tonne_km,
                monthly_data: records
                    .iter()
                    .map(|r| (r.mois.clone(), MonthlyMetrics::from(*r)))
                    .collect(),
            })
        })
        .collect()
}
