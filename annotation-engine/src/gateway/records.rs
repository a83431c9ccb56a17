use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use super::{GatewayError, GatewayResult};

/// Server-assigned inventory record identifier.
pub type RecordId = i64;

/// World-space coordinate as carried on the wire (`x`, `y`, `z` fields).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// One inventory record as listed by the service.
///
/// Every descriptive field is owned by the server; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub position: Position,
    #[serde(default)]
    pub equipment_type: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub last_check: Option<String>,
    #[serde(default)]
    pub ai_comments: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, rename = "image", alias = "image_url")]
    pub image_url: Option<String>,
}

impl InventoryRecord {
    /// Minimal record, used when only identity and placement matter.
    pub fn placed(id: RecordId, position: Vec3, equipment_type: impl Into<String>) -> Self {
        Self {
            id,
            position: position.into(),
            equipment_type: equipment_type.into(),
            material: None,
            manufacturer: None,
            model: None,
            serial_number: None,
            last_check: None,
            ai_comments: None,
            condition: None,
            image_url: None,
        }
    }

    pub fn world_position(&self) -> Vec3 {
        self.position.to_vec3()
    }
}

/// Room grouping returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
struct Room {
    #[serde(default)]
    inventory_items: Vec<InventoryRecord>,
}

/// Photo or voice note bytes with the metadata needed for a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl MediaPayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let file_name = format!("upload.{}", extension_for(&mime_type));
        Self {
            bytes,
            mime_type,
            file_name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/heic" => "heic",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        _ => "bin",
    }
}

/// Identity returned by a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRecord {
    pub id: RecordId,
    pub message: String,
}

/// Acknowledgement of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReceipt {
    pub message: String,
}

#[derive(Deserialize)]
struct CreateReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    inventory: Option<CreatedInventory>,
}

#[derive(Deserialize)]
struct CreatedInventory {
    #[serde(default)]
    id: Option<RecordId>,
}

#[derive(Deserialize)]
struct MessageReply {
    #[serde(default)]
    message: Option<String>,
}

/// Decode the rooms listing and flatten every room's items into one list.
pub fn parse_rooms(body: &str) -> GatewayResult<Vec<InventoryRecord>> {
    let rooms: Vec<Room> = serde_json::from_str(body)
        .map_err(|e| GatewayError::Malformed(format!("rooms listing: {e}")))?;
    Ok(rooms
        .into_iter()
        .flat_map(|room| room.inventory_items)
        .collect())
}

/// Decode a create reply; a reply without `inventory.id` is malformed.
pub fn parse_created(body: &str) -> GatewayResult<CreatedRecord> {
    let reply: CreateReply = serde_json::from_str(body)
        .map_err(|e| GatewayError::Malformed(format!("create reply: {e}")))?;
    let id = reply
        .inventory
        .and_then(|inventory| inventory.id)
        .ok_or_else(|| GatewayError::Malformed("create reply has no inventory.id".to_string()))?;
    Ok(CreatedRecord {
        id,
        message: reply.message.unwrap_or_default(),
    })
}

/// Decode an update reply: `{message}` when JSON, otherwise the raw body text.
pub fn parse_update(body: &str) -> UpdateReceipt {
    let message = match serde_json::from_str::<MessageReply>(body) {
        Ok(reply) => reply.message.unwrap_or_default(),
        Err(_) => body.trim().to_string(),
    };
    UpdateReceipt { message }
}
