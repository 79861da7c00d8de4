//! Row extraction: grid rows to vehicle records

use std::collections::BTreeMap;

use carburant_core::{Cell, Grid};
use serde::{Serialize, Serializer};

use crate::error::RowError;
use crate::options::ExtractOptions;
use crate::parse::{parse_currency, parse_numeric};
use crate::record::{raw_keys, MonthlyTotals, VehicleRecord};
use crate::roles::{classify_columns, is_valid_roles, ColumnRoles};
use crate::vehicle::classify_vehicle;

/// A data row that produced no record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    /// Zero-based grid row
    pub row: usize,
    #[serde(serialize_with = "serialize_display")]
    pub reason: RowError,
}

fn serialize_display<S: Serializer>(reason: &RowError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Everything one sheet yielded
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub roles: ColumnRoles,
    pub records: Vec<VehicleRecord>,
    pub monthly_totals: MonthlyTotals,
    pub issues: Vec<RowIssue>,
}

/// Classify the header row of `grid`, then extract its data rows
pub fn extract_grid(grid: &Grid, sheet_name: &str, options: &ExtractOptions) -> Extraction {
    let header = grid.row(options.header_row).unwrap_or(&[]);
    log::info!(
        "Processing sheet: {} with {} columns",
        sheet_name,
        header.len()
    );

    let roles = classify_columns(header, sheet_name);
    if !is_valid_roles(&roles) {
        log::warn!(
            "Could not identify all required columns in sheet: {}. Found: {}",
            sheet_name,
            roles
        );
    }
    extract(grid, &roles, sheet_name, options)
}

/// Extract every data row of `grid` using an existing role map.
///
/// Rows are read in order after the header. The month column carries
/// forward: a blank month cell means "same month as the row above". Rows
/// that are not vehicles are skipped and reported in
/// [`Extraction::issues`]; blank rows are skipped silently.
pub fn extract(
    grid: &Grid,
    roles: &ColumnRoles,
    sheet_name: &str,
    options: &ExtractOptions,
) -> Extraction {
    let mut extraction = Extraction {
        roles: *roles,
        ..Default::default()
    };
    let mut current_month: Option<String> = None;

    for (index, row) in grid.rows().enumerate().skip(options.header_row + 1) {
        if is_blank_row(row, options.skip_zero_rows) {
            continue;
        }

        if let Some(cell) = column(row, roles.month).filter(|c| c.has_text()) {
            let month = cell.display().trim().to_string();
            log::debug!("Found month: {}", month);
            extraction.monthly_totals.touch(&month);
            current_month = Some(month);
        }

        let result = vehicle_id(row, roles).and_then(|id| {
            let month = current_month.get_or_insert_with(|| {
                extraction
                    .monthly_totals
                    .touch(&options.default_month_label);
                options.default_month_label.clone()
            });
            read_record(row, roles, id, month)
        });

        match result {
            Ok(record) => {
                extraction.monthly_totals.add(&record);
                extraction.records.push(record);
            }
            Err(reason) => {
                log::error!("Skipping row {} in sheet {}: {}", index, sheet_name, reason);
                extraction.issues.push(RowIssue { row: index, reason });
            }
        }
    }

    log::info!(
        "Extracted {} valid vehicle records from sheet {}",
        extraction.records.len(),
        sheet_name
    );
    log::info!(
        "Calculated monthly totals for {} months",
        extraction.monthly_totals.len()
    );
    extraction
}

/// Blank rows, and rows of zeros when `zeros_are_blank` is set
fn is_blank_row(row: &[Cell], zeros_are_blank: bool) -> bool {
    row.iter().all(|cell| {
        if cell.value().is_empty() {
            return true;
        }
        let text = cell.display().trim();
        text.is_empty() || (zeros_are_blank && (text == "0" || text == "0.0"))
    })
}

fn column(row: &[Cell], col: Option<usize>) -> Option<&Cell> {
    col.and_then(|c| row.get(c))
}

fn vehicle_id<'a>(row: &'a [Cell], roles: &ColumnRoles) -> Result<&'a str, RowError> {
    column(row, roles.vehicle_id)
        .filter(|c| c.has_text())
        .map(|c| c.display().trim())
        .ok_or(RowError::MissingVehicleId)
}

fn read_record(
    row: &[Cell],
    roles: &ColumnRoles,
    vehicle_id: &str,
    month: &str,
) -> Result<VehicleRecord, RowError> {
    let description = column(row, roles.description)
        .map(|c| c.display().trim())
        .unwrap_or("");
    let vehicle_type = classify_vehicle(vehicle_id, description)
        .ok_or_else(|| RowError::UnrecognizedVehicle(vehicle_id.to_string()))?;
    log::debug!(
        "Processing vehicle: {} (type: {}) for month: {}",
        vehicle_id,
        vehicle_type,
        month
    );

    let number = |col: Option<usize>| column(row, col).map(parse_numeric).unwrap_or(0.0);
    let liters = number(roles.liters);
    let tep = number(roles.tep);
    let cost = column(row, roles.cost).map(parse_currency).unwrap_or(0.0);
    let km = number(roles.distance);
    let tons = number(roles.tonnage);
    let direct_index = number(roles.index);

    let raw_values: BTreeMap<String, f64> = [
        (raw_keys::LITERS, roles.liters, liters),
        (raw_keys::TEP, roles.tep, tep),
        (raw_keys::COST, roles.cost, cost),
        (raw_keys::DISTANCE, roles.distance, km),
        (raw_keys::TONNAGE, roles.tonnage, tons),
        (raw_keys::DIRECT_INDEX, roles.index, direct_index),
    ]
    .into_iter()
    .filter(|(_, col, _)| col.is_some())
    .map(|(key, _, value)| (key.to_string(), value))
    .collect();

    let (ipe_l100km, ipe_l100_tonne_km) = performance_indices(liters, km, tons, direct_index);

    Ok(VehicleRecord {
        vehicle_type,
        matricule: vehicle_id.to_string(),
        mois: month.to_string(),
        year: None,
        region: None,
        consommation_l: liters,
        consommation_tep: tep,
        cout_dt: cost,
        kilometrage: km,
        produits_tonnes: tons,
        ipe_l100km,
        ipe_l100_tonne_km,
        raw_values,
    })
}

/// `(L/100km, L/100km per ton)`.
///
/// Without a positive tonnage, a positive value from the sheet's own index
/// column replaces the computed L/100km.
pub fn performance_indices(
    liters: f64,
    km: f64,
    tons: f64,
    direct_index: f64,
) -> (Option<f64>, Option<f64>) {
    let mut per_100km = None;
    let mut per_ton = None;

    if liters > 0.0 && km > 0.0 {
        per_100km = Some(liters / (km / 100.0));
    }
    if liters > 0.0 && km > 0.0 && tons > 0.0 {
        per_ton = Some(liters / (km / 100.0) * (1.0 / (tons / 1000.0)));
    } else if direct_index > 0.0 {
        per_100km = Some(direct_index);
    }
    (per_100km, per_ton)
}
