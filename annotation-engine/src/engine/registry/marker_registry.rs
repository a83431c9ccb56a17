use std::collections::HashMap;

use bevy::prelude::*;

use crate::gateway::{GatewayError, GatewayResult, InventoryRecord, RecordId};

/// Rendering-facing projection of one inventory record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub record_id: RecordId,
    pub position: Vec3,
}

/// Result of applying one refresh response.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The record set was replaced by the response.
    Replaced { count: usize, generation: u64 },
    /// The fetch failed and the previous set was kept.
    Retained { error: GatewayError },
}

/// Authoritative local copy of the inventory.
///
/// The record set is only ever replaced wholesale by [`apply_refresh`]; a
/// failed fetch leaves it untouched and records are never merged across
/// responses.
///
/// [`apply_refresh`]: MarkerRegistry::apply_refresh
#[derive(Resource, Debug, Default)]
pub struct MarkerRegistry {
    records: Vec<InventoryRecord>,
    index: HashMap<RecordId, usize>,
    generation: u64,
    last_failure: Option<GatewayError>,
}

impl MarkerRegistry {
    /// Records of the last successful refresh, in server order.
    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&InventoryRecord> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One marker per record, in server order.
    pub fn markers(&self) -> impl Iterator<Item = Marker> + '_ {
        self.records.iter().map(|record| Marker {
            record_id: record.id,
            position: record.world_position(),
        })
    }

    /// Number of successful replacements so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Failure of the most recent refresh, cleared by the next success.
    pub fn last_failure(&self) -> Option<&GatewayError> {
        self.last_failure.as_ref()
    }

    /// Apply a list response: replace on success, retain on failure.
    pub fn apply_refresh(&mut self, response: GatewayResult<Vec<InventoryRecord>>) -> RefreshOutcome {
        match response {
            Ok(records) => {
                self.replace(records);
                RefreshOutcome::Replaced {
                    count: self.records.len(),
                    generation: self.generation,
                }
            }
            Err(error) => {
                self.last_failure = Some(error.clone());
                RefreshOutcome::Retained { error }
            }
        }
    }

    fn replace(&mut self, records: Vec<InventoryRecord>) {
        let mut index = HashMap::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.id) {
                warn!(
                    "Inventory listing contains record {} more than once; keeping the first",
                    record.id
                );
                continue;
            }
            index.insert(record.id, unique.len());
            unique.push(record);
        }

        self.records = unique;
        self.index = index;
        self.generation += 1;
        self.last_failure = None;
    }
}
