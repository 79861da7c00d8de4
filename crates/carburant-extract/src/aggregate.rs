//! Monthly aggregation over a record set

use std::collections::BTreeMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::record::VehicleRecord;

/// Decimal places of every published metric
pub const METRIC_DECIMALS: u32 = 4;

/// One month of aggregated fleet figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub month: String,
    /// Calendar month 1-12, or 0 when the label is not recognized
    pub month_numeric: u32,
    pub total_consommation_l: f64,
    #[serde(rename = "totalConsommationTEP")]
    pub total_consommation_tep: f64,
    #[serde(rename = "totalCoutDT")]
    pub total_cout_dt: f64,
    pub total_kilometrage: f64,
    pub total_produits_tonnes: f64,
    pub vehicle_count: u32,
    pub avg_ipe_l100km: f64,
    pub avg_ipe_l100_tonne_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub km_per_liter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_km: Option<f64>,
}

#[derive(Default)]
struct Sums {
    liters: f64,
    tep: f64,
    cost: f64,
    km: f64,
    tons: f64,
    count: u32,
}

impl Sums {
    fn add(&mut self, record: &VehicleRecord) {
        self.liters += finite(record.consommation_l);
        self.tep += finite(record.consommation_tep);
        self.cost += finite(record.cout_dt);
        self.km += finite(record.kilometrage);
        self.tons += finite(record.produits_tonnes);
        self.count += 1;
    }

    fn summarize(self, month: String) -> MonthlySummary {
        let avg_ipe = if self.km > 0.0 {
            self.liters * 100.0 / self.km
        } else {
            0.0
        };

        let divisor = self.tons * self.km / 100.0;
        let avg_ipe_ton = if self.tons > 0.0 && self.km > 0.0 && divisor > 0.0 {
            self.liters * 100.0 / divisor
        } else {
            0.0
        };

        let km_per_liter = (self.km > 0.0 && self.liters > 0.0).then(|| self.km / self.liters);
        let cost_per_km = (self.km > 0.0 && self.cost > 0.0).then(|| self.cost / self.km);

        MonthlySummary {
            month_numeric: month_number(&month),
            month,
            total_consommation_l: round_metric(self.liters),
            total_consommation_tep: round_metric(self.tep),
            total_cout_dt: round_metric(self.cost),
            total_kilometrage: round_metric(self.km),
            total_produits_tonnes: round_metric(self.tons),
            vehicle_count: self.count,
            avg_ipe_l100km: round_metric(avg_ipe),
            avg_ipe_l100_tonne_km: round_metric(avg_ipe_ton),
            km_per_liter: km_per_liter.map(round_metric),
            cost_per_km: cost_per_km.map(round_metric),
        }
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Aggregate `records` per month label, in calendar order.
///
/// Records with a blank month are ignored. Unrecognized labels sort first,
/// ties keep label order.
pub fn monthly_summary<'a, I>(records: I) -> Vec<MonthlySummary>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    let mut months: BTreeMap<String, Sums> = BTreeMap::new();
    for record in records {
        let month = record.mois.trim();
        if month.is_empty() {
            continue;
        }
        months.entry(month.to_string()).or_default().add(record);
    }

    let mut summary: Vec<MonthlySummary> = months
        .into_iter()
        .map(|(month, sums)| sums.summarize(month))
        .collect();
    summary.sort_by_key(|m| m.month_numeric);
    log::info!("Generated monthly data for {} months", summary.len());
    summary
}

/// Records usable as regression observations: non-negative distance and
/// liters, and a month label
pub fn filter_for_regression<'a, I>(records: I) -> Vec<VehicleRecord>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    records
        .into_iter()
        .filter(|r| r.kilometrage >= 0.0 && r.consommation_l >= 0.0 && !r.mois.trim().is_empty())
        .cloned()
        .collect()
}

/// Round half-up to [`METRIC_DECIMALS`] places, matching spreadsheet display.
/// Non-finite values pass through.
pub fn round_metric(value: f64) -> f64 {
    round_to(value, METRIC_DECIMALS)
}

/// Round half-up (towards positive infinity on ties) to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let Some(decimal) = Decimal::from_f64(value) else {
        return value;
    };
    let strategy = if decimal.is_sign_negative() {
        RoundingStrategy::MidpointTowardZero
    } else {
        RoundingStrategy::MidpointAwayFromZero
    };
    decimal
        .round_dp_with_strategy(decimals, strategy)
        .to_f64()
        .unwrap_or(value)
}

/// Calendar month of a label: French names with or without accents,
/// `"1"`..`"12"` (zero padding allowed), or a French prefix such as
/// `"janv."` or `"février 2024"`. Unrecognized labels give 0.
pub fn month_number(label: &str) -> u32 {
    let normalized = label.trim().to_lowercase();
    if normalized.is_empty() {
        return 0;
    }

    let exact = match normalized.as_str() {
        "janvier" => 1,
        "février" | "fevrier" => 2,
        "mars" => 3,
        "avril" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" => 7,
        "août" | "aout" => 8,
        "septembre" => 9,
        "octobre" => 10,
        "novembre" => 11,
        "décembre" | "decembre" => 12,
        _ => 0,
    };
    if exact != 0 {
        return exact;
    }

    if let Ok(n) = normalized.parse::<u32>() {
        if (1..=12).contains(&n) {
            return n;
        }
    }

    const PREFIXES: [(&str, u32); 15] = [
        ("jan", 1),
        ("fév", 2),
        ("fev", 2),
        ("mar", 3),
        ("avr", 4),
        ("mai", 5),
        ("juin", 6),
        ("juil", 7),
        ("aoû", 8),
        ("aou", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("déc", 12),
        ("dec", 12),
    ];
    if let Some(&(_, n)) = PREFIXES.iter().find(|(p, _)| normalized.starts_with(p)) {
        return n;
    }

    log::warn!("Unrecognized month name: {}", label);
    0
}
