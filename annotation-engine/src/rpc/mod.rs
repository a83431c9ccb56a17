//! JSON-RPC 2.0 communication layer for the host UI.
//!
//! The engine never presents dialogs itself. Taps, registry changes and
//! submission results are pushed to the host as notifications; the host drives
//! sessions through requests.
//!
//! ## Message Flow
//!
//! ```text
//! Host UI                        RpcChannel                      Engine
//!    │                                                              │
//!    ├─ Request {method, params, id} ──> inbox ──> handle_rpc_messages()
//!    │ <── Response {result | error, id} ── outbox <───────────────┤
//!    │ <── Notification {method, params} ── outbox <───────────────┤
//! ```
//!
//! `tap` is answered once the pick is resolved later in the same frame; all
//! other requests are answered in the frame they arrive.
//!
//! ## Methods
//!
//! ### Scene
//! - `tap {x, y}`: resolve a viewport point; result is `{kind: "marker", record_id}`,
//!   `{kind: "empty", position}` or `{kind: "none"}`
//! - `list_records`: current registry snapshot (id, position, equipment type)
//! - `record_details {id}`: every field of one record
//! - `refresh`: refresh the registry on the next frame
//! - `set_surface_visible {visible}`: start or stop polling
//!
//! ### Authoring
//! - `open_session {record_id}` or `open_session {position: [x, y, z]}`
//! - `close_session {session}`
//! - `session_state {session}`: state, record id, pending operation, transcript
//! - `submit {session, modality: "text" | "image" | "audio", text | data (base64), mime_type?}`
//! - `audio_start {session, mime_type?}`, `audio_chunk {session, data}`, `audio_stop {session}`
//!
//! ## Notifications
//! - `scene_hit`, `markers_changed`, `registry_refresh_failed`
//! - `record_id_acquired`, `submission_completed`, `submission_rejected`
//!
//! ## Error Handling
//!
//! Standard JSON-RPC 2.0 error codes:
//! - `-32700`: Parse error
//! - `-32601`: Method not found
//! - `-32602`: Invalid params
//! - `-32603`: Internal error / gateway failure
//!
//! Application codes:
//! - `-32001`: Session busy, a submission is already in flight
//! - `-32002`: Unknown session
//! - `-32003`: Empty payload

/// JSON-RPC 2.0 bidirectional communication system for the host UI.
///
/// Handles request-response patterns, deferred tap answers and notifications.
pub mod web_rpc;
