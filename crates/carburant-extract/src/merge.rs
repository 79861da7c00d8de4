//! Merging a fresh extraction into an existing record set

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::record::VehicleRecord;
use crate::vehicle::VehicleType;

/// How incoming records combine with existing ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Drop every existing record of the incoming vehicle types first
    Replace,
    /// Replace records with the same natural key, append the rest
    #[default]
    Upsert,
}

/// Outcome counts of [`merge_records`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub removed: usize,
    pub updated: usize,
    pub inserted: usize,
}

/// Merge `incoming` into `existing` in place.
///
/// Natural keys are `type:matricule:mois:year`. In [`MergeMode::Upsert`] an
/// incoming record takes the position of the existing record it replaces.
pub fn merge_records(
    existing: &mut Vec<VehicleRecord>,
    incoming: Vec<VehicleRecord>,
    mode: MergeMode,
) -> MergeStats {
    let mut stats = MergeStats::default();
    if incoming.is_empty() {
        log::info!("No records to merge");
        return stats;
    }

    match mode {
        MergeMode::Replace => {
            let types: Vec<VehicleType> = {
                let mut types: Vec<_> = incoming.iter().map(|r| r.vehicle_type).collect();
                types.sort();
                types.dedup();
                types
            };
            let before = existing.len();
            existing.retain(|r| !types.contains(&r.vehicle_type));
            stats.removed = before - existing.len();
            stats.inserted = incoming.len();
            existing.extend(incoming);
        }
        MergeMode::Upsert => {
            let mut positions: AHashMap<String, usize> = existing
                .iter()
                .enumerate()
                .map(|(i, r)| (r.natural_key(), i))
                .collect();

            for record in incoming {
                let key = record.natural_key();
                match positions.get(&key) {
                    Some(&i) => {
                        existing[i] = record;
                        stats.updated += 1;
                    }
                    None => {
                        positions.insert(key, existing.len());
                        existing.push(record);
                        stats.inserted += 1;
                    }
                }
            }
        }
    }

    log::info!(
        "Merged records ({:?}): {} removed, {} updated, {} new",
        mode,
        stats.removed,
        stats.updated,
        stats.inserted
    );
    stats
}
