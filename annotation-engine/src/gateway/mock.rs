use std::collections::VecDeque;
use std::sync::Mutex;

use bevy::math::Vec3;

use super::{
    CreatedRecord, GatewayError, GatewayResult, InventoryGateway, InventoryRecord, MediaPayload,
    RecordId, UpdateReceipt,
};

/// One call observed by [`MockInventoryGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    ListInventory,
    CreateText { text: String },
    CreateImage { bytes: usize, position: Vec3 },
    CreateAudio { bytes: usize },
    UpdateText { id: RecordId, text: String },
    UpdateImage { id: RecordId, bytes: usize, position: Option<Vec3> },
    UpdateAudio { id: RecordId, bytes: usize },
}

impl GatewayCall {
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Self::CreateText { .. } | Self::CreateImage { .. } | Self::CreateAudio { .. }
        )
    }

    /// Record id targeted by an update call.
    pub fn updated_id(&self) -> Option<RecordId> {
        match self {
            Self::UpdateText { id, .. }
            | Self::UpdateImage { id, .. }
            | Self::UpdateAudio { id, .. } => Some(*id),
            _ => None,
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<GatewayCall>,
    inventory: Vec<InventoryRecord>,
    list_script: VecDeque<GatewayResult<Vec<InventoryRecord>>>,
    create_script: VecDeque<GatewayResult<CreatedRecord>>,
    update_script: VecDeque<GatewayResult<UpdateReceipt>>,
    next_id: RecordId,
}

/// In-memory inventory service.
///
/// Without scripted replies it behaves like a well-formed server: listing
/// returns the current inventory, creates assign sequential ids and append
/// a record, updates succeed. Scripted replies are consumed first, in order.
pub struct MockInventoryGateway {
    state: Mutex<MockState>,
}

impl Default for MockInventoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInventoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            }),
        }
    }

    pub fn with_inventory(self, records: Vec<InventoryRecord>) -> Self {
        self.set_inventory(records);
        self
    }

    pub fn with_next_id(self, id: RecordId) -> Self {
        self.lock().next_id = id;
        self
    }

    /// Replace the server-side inventory returned by unscripted list calls.
    pub fn set_inventory(&self, records: Vec<InventoryRecord>) {
        self.lock().inventory = records;
    }

    pub fn push_list_response(&self, response: GatewayResult<Vec<InventoryRecord>>) {
        self.lock().list_script.push_back(response);
    }

    pub fn push_create_response(&self, response: GatewayResult<CreatedRecord>) {
        self.lock().create_script.push_back(response);
    }

    pub fn push_update_response(&self, response: GatewayResult<UpdateReceipt>) {
        self.lock().update_script.push_back(response);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    /// Calls excluding inventory listings.
    pub fn write_calls(&self) -> Vec<GatewayCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call != GatewayCall::ListInventory)
            .cloned()
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == GatewayCall::ListInventory)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the calls it already made.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn create(&self, call: GatewayCall, position: Option<Vec3>) -> GatewayResult<CreatedRecord> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(scripted) = state.create_script.pop_front() {
            if let Ok(created) = &scripted {
                let record =
                    InventoryRecord::placed(created.id, position.unwrap_or_default(), "Unknown");
                state.inventory.push(record);
            }
            return scripted;
        }

        let id = state.next_id;
        state.next_id += 1;
        state.inventory.push(InventoryRecord::placed(
            id,
            position.unwrap_or_default(),
            "Unknown",
        ));
        Ok(CreatedRecord {
            id,
            message: format!("Created inventory item {id}"),
        })
    }

    fn update(&self, call: GatewayCall) -> GatewayResult<UpdateReceipt> {
        let mut state = self.lock();
        let id = call.updated_id();
        state.calls.push(call);
        if let Some(scripted) = state.update_script.pop_front() {
            return scripted;
        }
        match id {
            Some(id) if state.inventory.iter().any(|r| r.id == id) => Ok(UpdateReceipt {
                message: format!("Updated inventory item {id}"),
            }),
            Some(id) => Err(GatewayError::Status {
                status: 404,
                body: format!("inventory item {id} not found"),
            }),
            None => Err(GatewayError::Encoding("not an update call".to_string())),
        }
    }
}

impl InventoryGateway for MockInventoryGateway {
    fn list_inventory(&self) -> GatewayResult<Vec<InventoryRecord>> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::ListInventory);
        if let Some(scripted) = state.list_script.pop_front() {
            return scripted;
        }
        Ok(state.inventory.clone())
    }

    fn create_text(&self, text: &str) -> GatewayResult<CreatedRecord> {
        self.create(
            GatewayCall::CreateText {
                text: text.to_string(),
            },
            None,
        )
    }

    fn create_image(&self, image: &MediaPayload, position: Vec3) -> GatewayResult<CreatedRecord> {
        self.create(
            GatewayCall::CreateImage {
                bytes: image.bytes.len(),
                position,
            },
            Some(position),
        )
    }

    fn create_audio(&self, audio: &MediaPayload) -> GatewayResult<CreatedRecord> {
        self.create(
            GatewayCall::CreateAudio {
                bytes: audio.bytes.len(),
            },
            None,
        )
    }

    fn update_text(&self, id: RecordId, text: &str) -> GatewayResult<UpdateReceipt> {
        self.update(GatewayCall::UpdateText {
            id,
            text: text.to_string(),
        })
    }

    fn update_image(
        &self,
        id: RecordId,
        image: &MediaPayload,
        position: Option<Vec3>,
    ) -> GatewayResult<UpdateReceipt> {
        self.update(GatewayCall::UpdateImage {
            id,
            bytes: image.bytes.len(),
            position,
        })
    }

    fn update_audio(&self, id: RecordId, audio: &MediaPayload) -> GatewayResult<UpdateReceipt> {
        self.update(GatewayCall::UpdateAudio {
            id,
            bytes: audio.bytes.len(),
        })
    }
}
