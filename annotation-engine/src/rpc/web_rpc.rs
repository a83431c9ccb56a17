use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::engine::core::sets::{AnnotationSet, configure_annotation_sets};
use crate::engine::picking::{SceneHit, SceneHitEvent, TapEvent};
use crate::engine::registry::{
    MarkerRegistry, RefreshSchedule, RegistryRefreshFailed, SurfaceVisibilityChanged,
};
use crate::engine::scene::markers::MarkersChanged;
use crate::gateway::{MediaPayload, RecordId, SharedGateway};
use crate::tools::authoring::{
    Author, AuthoringSession, AuthoringSessions, Modality, RecordIdAcquired, SessionError,
    SessionId, SessionState, Submission, SubmissionCompleted, SubmissionRejected,
    dispatch_submission,
};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// Application error codes.
pub const BUSY: i32 = -32001;
pub const UNKNOWN_SESSION: i32 = -32002;
pub const EMPTY_PAYLOAD: i32 = -32003;

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn parse_error(message: &str) -> Self {
        Self {
            code: -32700,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "Method not found".to_string(),
            data: Some(json!({ "method": method })),
        }
    }

    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }
}

impl From<SessionError> for RpcError {
    fn from(error: SessionError) -> Self {
        let code = match &error {
            SessionError::Busy => BUSY,
            SessionError::UnknownSession(_) => UNKNOWN_SESSION,
            SessionError::EmptyPayload => EMPTY_PAYLOAD,
            SessionError::Gateway(_) => -32603,
        };
        Self {
            code,
            message: error.to_string(),
            data: None,
        }
    }
}

/// In-process transport between the engine and its host UI.
///
/// The host posts serialized requests into the inbox and drains responses and
/// notifications from the outbox; clones share the same queues.
#[derive(Resource, Clone, Default)]
pub struct RpcChannel {
    inbox: Arc<Mutex<Vec<String>>>,
    outbox: Arc<Mutex<Vec<String>>>,
}

impl RpcChannel {
    pub fn post(&self, message: impl Into<String>) {
        if let Ok(mut inbox) = self.inbox.lock() {
            inbox.push(message.into());
        }
    }

    /// Messages sent by the engine since the last drain, in send order.
    pub fn drain_outgoing(&self) -> Vec<String> {
        match self.outbox.lock() {
            Ok(mut outbox) => std::mem::take(&mut *outbox),
            Err(_) => Vec::new(),
        }
    }

    fn take_incoming(&self) -> Vec<String> {
        match self.inbox.lock() {
            Ok(mut inbox) => std::mem::take(&mut *inbox),
            Err(_) => Vec::new(),
        }
    }

    fn push_outgoing(&self, message: String) {
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(message);
        }
    }
}

/// Resource managing bidirectional RPC communication with the host UI.
/// Handles both request-response patterns and notification broadcasting.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
    pending_taps: HashMap<u64, Value>,
    next_ticket: u64,
}

impl WebRpcInterface {
    /// Send notification to the host without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    /// Park a tap request until its hit is resolved.
    fn defer_tap(&mut self, id: Option<Value>) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        if let Some(id) = id {
            self.pending_taps.insert(ticket, id);
        }
        ticket
    }
}

/// Plugin establishing the RPC layer between the engine and its host UI.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        configure_annotation_sets(app);

        app.init_resource::<WebRpcInterface>()
            .init_resource::<RpcChannel>()
            .add_event::<IncomingRpcMessage>()
            .add_event::<TapEvent>()
            .add_event::<SurfaceVisibilityChanged>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .in_set(AnnotationSet::Input),
            )
            .add_systems(
                Update,
                (
                    (
                        forward_scene_hits,
                        forward_marker_changes,
                        forward_refresh_failures,
                        forward_submission_events,
                    ),
                    send_outgoing_messages,
                )
                    .chain()
                    .in_set(AnnotationSet::Notify),
            );
    }
}

/// Event representing an incoming RPC message from the host.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    channel: Res<RpcChannel>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    for message_str in channel.take_incoming() {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Engine state reachable from RPC handlers.
#[derive(SystemParam)]
pub struct RpcContext<'w, 's> {
    commands: Commands<'w, 's>,
    gateway: Res<'w, SharedGateway>,
    registry: Res<'w, MarkerRegistry>,
    sessions: ResMut<'w, AuthoringSessions>,
    schedule: ResMut<'w, RefreshSchedule>,
    taps: EventWriter<'w, TapEvent>,
    visibility: EventWriter<'w, SurfaceVisibilityChanged>,
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut ctx: RpcContext,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("Processing RPC method: {}", request.method);
                if let Some(response) = handle_rpc_request(&request, &mut rpc_interface, &mut ctx) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Discarding malformed RPC message: {}", parse_error);
                rpc_interface.queue_response(create_error_response(
                    Value::Null,
                    RpcError::parse_error(&parse_error.to_string()),
                ));
            }
        }
    }
}

/// Handle one request. Notifications (no id) run but get no response; taps
/// are answered once the pick is resolved.
fn handle_rpc_request(
    request: &RpcRequest,
    rpc_interface: &mut WebRpcInterface,
    ctx: &mut RpcContext,
) -> Option<RpcResponse> {
    let params = &request.params;
    let result = match request.method.as_str() {
        "tap" => match handle_tap(params, request.id.clone(), rpc_interface, ctx) {
            Ok(()) => return None,
            Err(error) => Err(error),
        },
        "list_records" => Ok(handle_list_records(&ctx.registry)),
        "record_details" => handle_record_details(params, &ctx.registry),
        "open_session" => handle_open_session(params, ctx),
        "close_session" => handle_close_session(params, ctx),
        "session_state" => handle_session_state(params, &ctx.sessions),
        "submit" => handle_submit(params, ctx),
        "audio_start" => handle_audio_start(params, ctx),
        "audio_chunk" => handle_audio_chunk(params, ctx),
        "audio_stop" => handle_audio_stop(params, ctx),
        "refresh" => {
            ctx.schedule.request_immediate();
            Ok(json!({ "requested": true }))
        }
        "set_surface_visible" => handle_set_surface_visible(params, ctx),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            Err(RpcError::method_not_found(&request.method))
        }
    };

    let id = request.id.clone()?;
    Some(match result {
        Ok(result_value) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        },
        Err(error) => create_error_response(id, error),
    })
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: &Value, expected: &str) -> Result<T, RpcError> {
    serde_json::from_value::<T>(params.clone())
        .map_err(|e| RpcError::invalid_params(&format!("Expected {expected}: {e}")))
}

#[derive(Deserialize)]
struct SessionParams {
    session: SessionId,
}

fn handle_tap(
    params: &Value,
    id: Option<Value>,
    rpc_interface: &mut WebRpcInterface,
    ctx: &mut RpcContext,
) -> Result<(), RpcError> {
    #[derive(Deserialize)]
    struct TapParams {
        x: f32,
        y: f32,
    }

    let tap = parse_params::<TapParams>(params, "'x' and 'y' viewport coordinates")?;
    let ticket = rpc_interface.defer_tap(id);
    ctx.taps.write(TapEvent {
        point: Vec2::new(tap.x, tap.y),
        ticket: Some(ticket),
    });
    Ok(())
}

fn handle_list_records(registry: &MarkerRegistry) -> Value {
    let records: Vec<Value> = registry
        .records()
        .iter()
        .map(|record| {
            json!({
                "id": record.id,
                "position": vec3_json(record.world_position()),
                "equipment_type": record.equipment_type,
            })
        })
        .collect();

    json!({
        "generation": registry.generation(),
        "records": records,
    })
}

fn handle_record_details(params: &Value, registry: &MarkerRegistry) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct RecordParams {
        id: RecordId,
    }

    let parsed = parse_params::<RecordParams>(params, "'id' parameter")?;
    let record = registry
        .get(parsed.id)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown record: {}", parsed.id)))?;
    serde_json::to_value(record).map_err(|e| RpcError::internal_error(&e.to_string()))
}

fn handle_open_session(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct OpenParams {
        #[serde(default)]
        record_id: Option<RecordId>,
        #[serde(default)]
        position: Option<[f32; 3]>,
    }

    let parsed = parse_params::<OpenParams>(params, "'record_id' or 'position'")?;
    let position = parsed.position.map(Vec3::from_array);

    let session = match (parsed.record_id, position) {
        (Some(record_id), position) => {
            let known = ctx.registry.get(record_id).map(|r| r.world_position());
            AuthoringSession::for_record(record_id, known.or(position))
        }
        (None, Some(position)) => AuthoringSession::empty_at(position),
        (None, None) => {
            return Err(RpcError::invalid_params(
                "Expected 'record_id' for an existing marker or 'position' for an empty spot",
            ));
        }
    };

    let id = ctx.sessions.open(session);
    let session = ctx
        .sessions
        .get(id)
        .ok_or_else(|| RpcError::internal_error("session vanished after open"))?;
    Ok(session_json(id, session))
}

fn handle_close_session(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    let parsed = parse_params::<SessionParams>(params, "'session' parameter")?;
    Ok(json!({ "closed": ctx.sessions.close(parsed.session).is_some() }))
}

fn handle_session_state(params: &Value, sessions: &AuthoringSessions) -> Result<Value, RpcError> {
    let parsed = parse_params::<SessionParams>(params, "'session' parameter")?;
    let session = sessions
        .get(parsed.session)
        .ok_or(SessionError::UnknownSession(parsed.session))?;
    Ok(session_json(parsed.session, session))
}

#[derive(Deserialize)]
struct SubmitParams {
    session: SessionId,
    modality: String,
    #[serde(default)]
    text: Option<String>,
    /// Base64 photo or audio bytes.
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

fn decode_submission(params: &SubmitParams) -> Result<Submission, RpcError> {
    let modality = Modality::parse(&params.modality)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown modality: {}", params.modality)))?;

    match modality {
        Modality::Text => Ok(Submission::Text(params.text.clone().unwrap_or_default())),
        Modality::Image | Modality::Audio => {
            let bytes = match params.data.as_deref() {
                Some(data) => BASE64
                    .decode(data)
                    .map_err(|e| RpcError::invalid_params(&format!("Invalid base64 data: {e}")))?,
                None => Vec::new(),
            };
            let default_mime = if modality == Modality::Image {
                "image/jpeg"
            } else {
                "audio/x-m4a"
            };
            let media = MediaPayload::new(
                bytes,
                params.mime_type.clone().unwrap_or_else(|| default_mime.to_string()),
            );
            Ok(if modality == Modality::Image {
                Submission::Image(media)
            } else {
                Submission::Audio(media)
            })
        }
    }
}

fn handle_submit(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    let parsed = parse_params::<SubmitParams>(params, "'session' and 'modality'")?;
    let submission = decode_submission(&parsed)?;
    submit(ctx, parsed.session, submission)
}

fn submit(ctx: &mut RpcContext, session: SessionId, submission: Submission) -> Result<Value, RpcError> {
    let modality = submission.modality();
    let operation = dispatch_submission(
        &mut ctx.commands,
        &ctx.gateway,
        &mut ctx.sessions,
        session,
        submission,
    )?;
    Ok(json!({
        "accepted": true,
        "session": session,
        "modality": modality.as_str(),
        "operation": operation.as_str(),
    }))
}

fn handle_audio_start(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct AudioStartParams {
        session: SessionId,
        #[serde(default)]
        mime_type: Option<String>,
    }

    let parsed = parse_params::<AudioStartParams>(params, "'session' parameter")?;
    let capture = ctx
        .sessions
        .audio_mut(parsed.session)
        .ok_or(SessionError::UnknownSession(parsed.session))?;
    let started = capture.press(parsed.mime_type.unwrap_or_else(|| "audio/x-m4a".to_string()));
    Ok(json!({ "recording": capture.is_recording(), "started": started }))
}

fn handle_audio_chunk(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct AudioChunkParams {
        session: SessionId,
        data: String,
    }

    let parsed = parse_params::<AudioChunkParams>(params, "'session' and base64 'data'")?;
    let bytes = BASE64
        .decode(&parsed.data)
        .map_err(|e| RpcError::invalid_params(&format!("Invalid base64 data: {e}")))?;
    let capture = ctx
        .sessions
        .audio_mut(parsed.session)
        .ok_or(SessionError::UnknownSession(parsed.session))?;
    let accepted = capture.append(&bytes);
    Ok(json!({ "accepted": accepted, "captured_bytes": capture.captured_bytes() }))
}

fn handle_audio_stop(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    let parsed = parse_params::<SessionParams>(params, "'session' parameter")?;
    let session = ctx
        .sessions
        .get(parsed.session)
        .ok_or(SessionError::UnknownSession(parsed.session))?;
    // The capture stays armed while a submission is in flight.
    if session.is_busy() {
        return Err(SessionError::Busy.into());
    }

    let capture = ctx
        .sessions
        .audio_mut(parsed.session)
        .ok_or(SessionError::UnknownSession(parsed.session))?;

    match capture.release() {
        Some(audio) => {
            let mut result = submit(ctx, parsed.session, Submission::Audio(audio))?;
            result["submitted"] = json!(true);
            Ok(result)
        }
        None => {
            debug!("Audio stop for session {} with nothing captured", parsed.session);
            Ok(json!({ "submitted": false }))
        }
    }
}

fn handle_set_surface_visible(params: &Value, ctx: &mut RpcContext) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct VisibleParams {
        visible: bool,
    }

    let parsed = parse_params::<VisibleParams>(params, "'visible' flag")?;
    ctx.visibility.write(SurfaceVisibilityChanged {
        visible: parsed.visible,
    });
    Ok(json!({ "visible": parsed.visible }))
}

fn vec3_json(v: Vec3) -> Value {
    json!([v.x, v.y, v.z])
}

fn scene_hit_json(hit: &SceneHit) -> Value {
    match hit {
        SceneHit::Marker { record_id } => json!({ "kind": "marker", "record_id": record_id }),
        SceneHit::Empty { position } => json!({ "kind": "empty", "position": vec3_json(*position) }),
        SceneHit::None => json!({ "kind": "none" }),
    }
}

fn session_json(id: SessionId, session: &AuthoringSession) -> Value {
    let transcript: Vec<Value> = session
        .transcript()
        .iter()
        .map(|entry| {
            json!({
                "author": match entry.author {
                    Author::User => "user",
                    Author::Service => "service",
                },
                "text": entry.text,
            })
        })
        .collect();

    json!({
        "session": id,
        "state": match session.state() {
            SessionState::Empty => "empty",
            SessionState::HasId(_) => "has_id",
        },
        "record_id": session.record_id(),
        "position": session.position().map(vec3_json),
        "pending": session.pending().as_str(),
        "transcript": transcript,
    })
}

/// Answer deferred taps and announce every resolved hit.
fn forward_scene_hits(
    mut hits: EventReader<SceneHitEvent>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in hits.read() {
        let hit = scene_hit_json(&event.hit);

        if let Some(id) = event
            .ticket
            .and_then(|ticket| rpc_interface.pending_taps.remove(&ticket))
        {
            rpc_interface.queue_response(RpcResponse {
                jsonrpc: "2.0".to_string(),
                result: Some(hit.clone()),
                error: None,
                id: Some(id),
            });
        }

        let mut params = hit;
        params["point"] = json!([event.point.x, event.point.y]);
        rpc_interface.send_notification("scene_hit", params);
    }
}

fn forward_marker_changes(
    mut changes: EventReader<MarkersChanged>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for change in changes.read() {
        rpc_interface.send_notification(
            "markers_changed",
            json!({
                "added": change.added,
                "removed": change.removed,
                "moved": change.moved,
                "generation": change.generation,
            }),
        );
    }
}

fn forward_refresh_failures(
    mut failures: EventReader<RegistryRefreshFailed>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for failure in failures.read() {
        rpc_interface.send_notification(
            "registry_refresh_failed",
            json!({
                "message": failure.error.to_string(),
                "transport": failure.error.is_transport(),
            }),
        );
    }
}

fn forward_submission_events(
    mut acquired: EventReader<RecordIdAcquired>,
    mut completed: EventReader<SubmissionCompleted>,
    mut rejected: EventReader<SubmissionRejected>,
    sessions: Res<AuthoringSessions>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in acquired.read() {
        rpc_interface.send_notification(
            "record_id_acquired",
            json!({ "session": event.session, "record_id": event.record_id }),
        );
    }

    for event in completed.read() {
        let mut params = json!({
            "session": event.session,
            "modality": event.modality.as_str(),
            "operation": event.operation.as_str(),
            "record_id": event.record_id,
            "success": event.outcome.is_ok(),
        });
        match &event.outcome {
            Ok(message) => params["message"] = json!(message),
            Err(error) => params["error"] = json!(error.to_string()),
        }
        if let Some(session) = sessions.get(event.session) {
            params["state"] = session_json(event.session, session);
        }
        rpc_interface.send_notification("submission_completed", params);
    }

    for event in rejected.read() {
        let error = RpcError::from(event.error.clone());
        rpc_interface.send_notification(
            "submission_rejected",
            json!({
                "session": event.session,
                "modality": event.modality.as_str(),
                "code": error.code,
                "message": error.message,
            }),
        );
    }
}

/// Create standardized error response.
fn create_error_response(id: Value, error: RpcError) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(error),
        id: Some(id),
    }
}

/// Flush queued notifications, then responses, to the host.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>, channel: Res<RpcChannel>) {
    let notifications: Vec<RpcNotification> = rpc_interface.outgoing_notifications.drain(..).collect();
    for notification in &notifications {
        send_message_to_host(&channel, notification);
    }

    let responses: Vec<RpcResponse> = rpc_interface.outgoing_responses.drain(..).collect();
    for response in &responses {
        send_message_to_host(&channel, response);
    }
}

fn send_message_to_host<T: Serialize>(channel: &RpcChannel, message: &T) {
    match serde_json::to_string(message) {
        Ok(json) => channel.push_outgoing(json),
        Err(e) => error!("Failed to serialize message: {}", e),
    }
}
