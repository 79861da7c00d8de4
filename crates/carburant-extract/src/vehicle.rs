//! Vehicle categories and row validity

use std::fmt;
use std::str::FromStr;

use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};

/// Vehicle category assigned to each extracted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VehicleType {
    /// Truck, registration like `1682 TU 147`
    Camion,
    /// Minibus, registration like `105774 RS`, or a bus description
    Minibus,
    /// Forklift, recognized by its description
    Chariot,
    /// Car. Extraction never assigns it on its own; it appears on records
    /// tagged by other producers.
    Voiture,
}

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Camion => "Camion",
            VehicleType::Minibus => "Minibus",
            VehicleType::Chariot => "Chariot",
            VehicleType::Voiture => "Voiture",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "camion" | "camions" => Ok(VehicleType::Camion),
            "minibus" => Ok(VehicleType::Minibus),
            "chariot" | "chariots" => Ok(VehicleType::Chariot),
            "voiture" | "voitures" => Ok(VehicleType::Voiture),
            other => Err(format!("unknown vehicle type '{}'", other)),
        }
    }
}

/// Classify a row from its registration and description.
///
/// Registrations are checked first (`TU` then `RS`), then the description
/// (forklift keywords then bus keywords). `None` means the row is not a
/// vehicle and must be dropped.
pub fn classify_vehicle(vehicle_id: &str, description: &str) -> Option<VehicleType> {
    let vehicle_id = vehicle_id.trim();
    if vehicle_id.is_empty() {
        return None;
    }

    if regex_is_match!(r"(?i)TU\s*\d+", vehicle_id) {
        return Some(VehicleType::Camion);
    }
    if regex_is_match!(r"(?i)\d+\s*RS", vehicle_id) {
        return Some(VehicleType::Minibus);
    }

    let description = description.trim();
    if regex_is_match!(r"(?i)chariot|élévateur|elevateur", description) {
        return Some(VehicleType::Chariot);
    }
    if regex_is_match!(r"(?i)minibus|bus", description) {
        return Some(VehicleType::Minibus);
    }

    None
}
