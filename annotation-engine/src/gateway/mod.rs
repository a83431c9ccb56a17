//! Remote inventory service boundary.
//!
//! The engine never talks to the network directly; it holds an injected
//! [`InventoryGateway`] behind the [`SharedGateway`] resource. The production
//! implementation is [`http::HttpInventoryGateway`]; tests and demos use
//! [`mock::MockInventoryGateway`].
//!
//! Gateway calls are blocking. Callers start each one on its own worker
//! thread through [`worker::PendingCall`] and apply the reply on the main
//! schedule.
//!
//! ## Operations
//!
//! | Operation     | Input                      | Success                     |
//! |---------------|----------------------------|-----------------------------|
//! | list          | none                       | rooms flattened to records  |
//! | create text   | text                       | new record id + message     |
//! | create image  | image bytes, x/y/z         | new record id + message     |
//! | create audio  | audio bytes                | new record id + message     |
//! | update text   | id, text                   | message (JSON or raw text)  |
//! | update image  | id, image bytes, x/y/z     | message                     |
//! | update audio  | id, audio bytes            | message                     |
//!
//! Any non-2xx status, transport error or reply missing required fields is a
//! failure; there is no partial success.

use std::sync::Arc;

use bevy::math::Vec3;
use bevy::prelude::Resource;
use thiserror::Error;

/// Blocking HTTP implementation backed by `reqwest`.
pub mod http;

/// Scripted in-memory gateway recording every call.
pub mod mock;

/// Wire types and reply decoding.
pub mod records;

/// One worker thread per in-flight call.
pub mod worker;

pub use records::{
    CreatedRecord, InventoryRecord, MediaPayload, Position, RecordId, UpdateReceipt,
};

/// Gateway failure taxonomy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// No connectivity, timeout, or connection dropped mid-request.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status.
    #[error("inventory service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Reply was received but lacks the fields the operation requires.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Request could not be built (e.g. invalid MIME type for a multipart part).
    #[error("failed to encode request: {0}")]
    Encoding(String),
}

impl GatewayError {
    /// True when the failure happened before any reply was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Remote inventory operations consumed by the engine.
pub trait InventoryGateway: Send + Sync + 'static {
    /// Full inventory, flattened across rooms.
    fn list_inventory(&self) -> GatewayResult<Vec<InventoryRecord>>;

    fn create_text(&self, text: &str) -> GatewayResult<CreatedRecord>;

    fn create_image(&self, image: &MediaPayload, position: Vec3) -> GatewayResult<CreatedRecord>;

    fn create_audio(&self, audio: &MediaPayload) -> GatewayResult<CreatedRecord>;

    fn update_text(&self, id: RecordId, text: &str) -> GatewayResult<UpdateReceipt>;

    /// `position` is omitted from the request when the session never learnt one.
    fn update_image(
        &self,
        id: RecordId,
        image: &MediaPayload,
        position: Option<Vec3>,
    ) -> GatewayResult<UpdateReceipt>;

    fn update_audio(&self, id: RecordId, audio: &MediaPayload) -> GatewayResult<UpdateReceipt>;
}

/// Injected gateway shared by the registry and the authoring sessions.
#[derive(Resource, Clone)]
pub struct SharedGateway(pub Arc<dyn InventoryGateway>);

impl SharedGateway {
    pub fn new(gateway: impl InventoryGateway) -> Self {
        Self(Arc::new(gateway))
    }

    pub fn from_arc(gateway: Arc<dyn InventoryGateway>) -> Self {
        Self(gateway)
    }

    /// Cheap handle that can be moved into a worker.
    pub fn handle(&self) -> Arc<dyn InventoryGateway> {
        Arc::clone(&self.0)
    }
}
