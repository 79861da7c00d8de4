//! Extracted records and per-month running totals

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleType;

/// `rawValues` keys, one per metric column present in the sheet
pub mod raw_keys {
    pub const LITERS: &str = "consommationL";
    pub const TEP: &str = "consommationTEP";
    pub const COST: &str = "coutDT";
    pub const DISTANCE: &str = "kilometrage";
    pub const TONNAGE: &str = "produitsTonnes";
    pub const DIRECT_INDEX: &str = "ipeDirectValue";
}

/// One vehicle's figures for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub matricule: String,
    pub mois: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub consommation_l: f64,
    #[serde(rename = "consommationTEP")]
    pub consommation_tep: f64,
    #[serde(rename = "coutDT")]
    pub cout_dt: f64,
    pub kilometrage: f64,
    pub produits_tonnes: f64,
    /// Liters per 100 km; unset when it could not be derived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipe_l100km: Option<f64>,
    /// Liters per 100 km per ton of goods carried
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipe_l100_tonne_km: Option<f64>,
    /// Parsed value of every metric column the sheet had, keyed by
    /// [`raw_keys`]
    #[serde(default)]
    pub raw_values: BTreeMap<String, f64>,
}

impl VehicleRecord {
    /// `type:matricule:mois:year`, with an empty year when untagged
    pub fn natural_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.vehicle_type,
            self.matricule,
            self.mois,
            self.year.as_deref().unwrap_or("")
        )
    }

    pub fn raw_value(&self, key: &str) -> Option<f64> {
        self.raw_values.get(key).copied()
    }
}

/// Sums for one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTotals {
    pub consommation_l: f64,
    #[serde(rename = "consommationTEP")]
    pub consommation_tep: f64,
    #[serde(rename = "coutDT")]
    pub cout_dt: f64,
    pub kilometrage: f64,
    pub produits_tonnes: f64,
    pub vehicle_count: u32,
}

impl MonthTotals {
    pub fn add(&mut self, record: &VehicleRecord) {
        self.consommation_l += record.consommation_l;
        self.consommation_tep += record.consommation_tep;
        self.cout_dt += record.cout_dt;
        self.kilometrage += record.kilometrage;
        self.produits_tonnes += record.produits_tonnes;
        self.vehicle_count += 1;
    }
}

/// Totals keyed by month label.
///
/// Labels are kept in lexical order; use
/// [`month_number`](crate::aggregate::month_number) for calendar order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlyTotals(BTreeMap<String, MonthTotals>);

impl MonthlyTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `month` has an entry, even if no record lands in it
    pub fn touch(&mut self, month: &str) -> &mut MonthTotals {
        self.0.entry(month.to_string()).or_default()
    }

    pub fn add(&mut self, record: &VehicleRecord) {
        self.touch(&record.mois).add(record);
    }

    pub fn get(&self, month: &str) -> Option<&MonthTotals> {
        self.0.get(month)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MonthTotals)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<'a> FromIterator<&'a VehicleRecord> for MonthlyTotals {
    fn from_iter<I: IntoIterator<Item = &'a VehicleRecord>>(iter: I) -> Self {
        let mut totals = MonthlyTotals::new();
        for record in iter {
            totals.add(record);
        }
        totals
    }
}

/// Amount with three decimals and the dinar code, e.g. `"1250.500 TND"`
pub fn format_currency(value: f64) -> String {
    format!("{:.3} TND", value)
}
