//! Header classification: which column holds which metric
//!
//! Classification runs three passes over the header row:
//!
//! 1. Keyword patterns, left to right. Each header takes at most one role,
//!    roles are tried in [`Role::ALL`] order and a role is never reassigned.
//! 2. Exact terms, only when month, vehicle id or cost is still missing.
//! 3. Positional guesses for month, vehicle id and liters.

use std::fmt;

use carburant_core::{Cell, FRENCH_MONTHS};
use lazy_regex::regex;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Semantic role of a sheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Month,
    VehicleId,
    Liters,
    Tep,
    Cost,
    Distance,
    Tonnage,
    Index,
    Description,
}

impl Role {
    /// Every role, in pattern-matching priority order
    pub const ALL: [Role; 9] = [
        Role::Month,
        Role::VehicleId,
        Role::Liters,
        Role::Tep,
        Role::Cost,
        Role::Distance,
        Role::Tonnage,
        Role::Index,
        Role::Description,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Role::Month => "month",
            Role::VehicleId => "matricule",
            Role::Liters => "consommationL",
            Role::Tep => "consommationTEP",
            Role::Cost => "coutDT",
            Role::Distance => "kilometrage",
            Role::Tonnage => "produitsTonnes",
            Role::Index => "ipe",
            Role::Description => "description",
        }
    }

    /// Keyword pattern tested against a lower-cased header
    fn pattern(self) -> &'static Regex {
        match self {
            Role::Month => regex!(r"mois|month|date|période|period"),
            Role::VehicleId => {
                regex!(r"matricule|immatriculation|numéro|véhicule|vehicle|registration|number")
            }
            Role::Liters => regex!(
                r"consommation.*l|consumption.*l|carburant|fuel|essence|diesel|gasoil|gazole"
            ),
            Role::Tep => regex!(r"consommation.*tep|consumption.*tep|tep"),
            Role::Cost => regex!(r"coût|cout|cost|dt|dinar|prix|price"),
            Role::Distance => regex!(r"kilométrage|kilometrage|km|distance|parcouru|traveled"),
            Role::Tonnage => {
                regex!(r"produit|product|transporté|transported|tonne|ton|charge|weight|poids")
            }
            Role::Index => {
                regex!(r"ipe|indice|index|performance|énergétique|energetique|l/100")
            }
            Role::Description => regex!(r"description|type|label|désignation|designation"),
        }
    }

    /// Exact-term fallback. Only month, vehicle id, cost and description
    /// have one.
    fn matches_term(self, header: &str) -> bool {
        match self {
            Role::Month => matches!(header, "mois" | "month"),
            Role::VehicleId => header == "matricule",
            Role::Cost => {
                matches!(header, "cout" | "coût") || header.contains("dt") || header.contains("tnd")
            }
            Role::Description => {
                matches!(header, "description" | "type" | "désignation" | "designation")
            }
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Month names searched for in headers when no month column was named
static MONTH_NAMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    FRENCH_MONTHS
        .iter()
        .copied()
        .chain([
            "january",
            "february",
            "march",
            "april",
            "may",
            "june",
            "july",
            "august",
            "september",
            "october",
            "november",
            "december",
        ])
        .collect()
});

/// Zero-based column index per role; `None` means unassigned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRoles {
    pub month: Option<usize>,
    pub vehicle_id: Option<usize>,
    pub liters: Option<usize>,
    pub tep: Option<usize>,
    pub cost: Option<usize>,
    pub distance: Option<usize>,
    pub tonnage: Option<usize>,
    pub index: Option<usize>,
    pub description: Option<usize>,
}

impl ColumnRoles {
    pub fn get(&self, role: Role) -> Option<usize> {
        *self.slot(role)
    }

    pub fn is_assigned(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Assign `role` to `col` unless it already has a column.
    /// Returns true when the assignment happened.
    pub fn assign(&mut self, role: Role, col: usize) -> bool {
        let slot = self.slot_mut(role);
        if slot.is_some() {
            return false;
        }
        *slot = Some(col);
        true
    }

    fn slot(&self, role: Role) -> &Option<usize> {
        match role {
            Role::Month => &self.month,
            Role::VehicleId => &self.vehicle_id,
            Role::Liters => &self.liters,
            Role::Tep => &self.tep,
            Role::Cost => &self.cost,
            Role::Distance => &self.distance,
            Role::Tonnage => &self.tonnage,
            Role::Index => &self.index,
            Role::Description => &self.description,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<usize> {
        match role {
            Role::Month => &mut self.month,
            Role::VehicleId => &mut self.vehicle_id,
            Role::Liters => &mut self.liters,
            Role::Tep => &mut self.tep,
            Role::Cost => &mut self.cost,
            Role::Distance => &mut self.distance,
            Role::Tonnage => &mut self.tonnage,
            Role::Index => &mut self.index,
            Role::Description => &mut self.description,
        }
    }
}

impl fmt::Display for ColumnRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for role in Role::ALL {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match self.get(role) {
                Some(col) => write!(f, "{}={}", role, col)?,
                None => write!(f, "{}=-", role)?,
            }
        }
        Ok(())
    }
}

/// Month, vehicle id and at least one consumption column are assigned
pub fn is_valid_roles(roles: &ColumnRoles) -> bool {
    roles.month.is_some() && roles.vehicle_id.is_some() && (roles.liters.is_some() || roles.tep.is_some())
}

/// Assign roles to the columns of `header`. Never fails; an unrecognizable
/// header still yields the positional month and vehicle id defaults.
pub fn classify_columns(header: &[Cell], sheet_name: &str) -> ColumnRoles {
    let headers: Vec<Option<String>> = header.iter().map(header_text).collect();
    log::debug!(
        "Headers in sheet {}: {:?}",
        sheet_name,
        headers.iter().flatten().collect::<Vec<_>>()
    );

    let mut roles = headers
        .iter()
        .enumerate()
        .filter_map(|(col, text)| text.as_deref().map(|t| (col, t)))
        .fold(ColumnRoles::default(), |mut roles, (col, text)| {
            if let Some(role) = Role::ALL
                .into_iter()
                .find(|&role| !roles.is_assigned(role) && role.pattern().is_match(text))
            {
                roles.assign(role, col);
                log::debug!("Found {} column at index {}: '{}'", role, col, text);
            }
            roles
        });

    if roles.month.is_none() || roles.vehicle_id.is_none() || roles.cost.is_none() {
        for (col, text) in headers
            .iter()
            .enumerate()
            .filter_map(|(col, text)| text.as_deref().map(|t| (col, t)))
        {
            if let Some(role) = [Role::Month, Role::VehicleId, Role::Cost, Role::Description]
                .into_iter()
                .find(|&role| !roles.is_assigned(role) && role.matches_term(text))
            {
                roles.assign(role, col);
                log::debug!("Found {} column (exact match) at index {}: '{}'", role, col, text);
            }
        }
    }

    apply_positional_fallbacks(&mut roles, &headers);
    roles
}

fn apply_positional_fallbacks(roles: &mut ColumnRoles, headers: &[Option<String>]) {
    if roles.month.is_none() {
        let named = headers.iter().position(|text| {
            text.as_deref()
                .is_some_and(|t| MONTH_NAMES.iter().any(|month| t.contains(month)))
        });
        match named {
            Some(col) => {
                log::info!("Inferred month column at index {} from a month name", col);
                roles.month = Some(col);
            }
            None => {
                log::info!("Defaulting month column to index 0");
                roles.month = Some(0);
            }
        }
    }

    if roles.vehicle_id.is_none() {
        let col = if roles.month == Some(0) { 1 } else { 0 };
        log::info!("Defaulting matricule column to index {}", col);
        roles.vehicle_id = Some(col);
    }

    if roles.liters.is_none() {
        if let Some(col) = headers.iter().position(|text| {
            text.as_deref()
                .is_some_and(|t| t.contains('l') || t.contains("litre"))
        }) {
            log::warn!("Inferred consommationL column at index {}", col);
            roles.liters = Some(col);
        }
    }
}

/// Trimmed, lower-cased header text; `None` for cells without a value
fn header_text(cell: &Cell) -> Option<String> {
    if cell.value().is_empty() {
        return None;
    }
    Some(cell.display().trim().to_lowercase())
}
