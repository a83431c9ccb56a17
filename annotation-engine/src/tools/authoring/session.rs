use std::fmt;

use bevy::prelude::*;
use thiserror::Error;

use crate::engine::picking::SceneHit;
use crate::engine::registry::MarkerRegistry;
use crate::gateway::{
    CreatedRecord, GatewayError, GatewayResult, InventoryGateway, MediaPayload, RecordId,
    UpdateReceipt,
};

/// Handle of an open session.
pub type SessionId = u64;

/// Text shown while a submission is on the wire.
pub const SENDING_PLACEHOLDER: &str = "Sending...";

/// Text shown when a submission failed.
pub const FAILED_REPLY: &str = "Failed to receive response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Text,
    Image,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "image" | "photo" => Some(Self::Image),
            "audio" | "voice" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of content for the record being authored.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Text(String),
    Image(MediaPayload),
    Audio(MediaPayload),
}

impl Submission {
    pub fn modality(&self) -> Modality {
        match self {
            Self::Text(_) => Modality::Text,
            Self::Image(_) => Modality::Image,
            Self::Audio(_) => Modality::Audio,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Image(media) | Self::Audio(media) => media.is_empty(),
        }
    }

    fn transcript_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Image(media) => format!("[photo, {} bytes]", media.bytes.len()),
            Self::Audio(media) => format!("[voice note, {} bytes]", media.bytes.len()),
        }
    }
}

/// Whether the session already owns a server record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No record yet; the first successful submit creates one.
    Empty,
    /// Bound to a server record; every submit updates it.
    HasId(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingOperation {
    #[default]
    None,
    Creating,
    Updating,
}

impl PendingOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Creating => "creating",
            Self::Updating => "updating",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// A submission is already in flight for this session.
    #[error("a submission is already in progress for this record")]
    Busy,

    #[error("nothing to submit")]
    EmptyPayload,

    #[error("no open session {0}")]
    UnknownSession(SessionId),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Gateway call prepared by [`AuthoringSession::begin_submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayRequest {
    Create {
        submission: Submission,
        position: Vec3,
    },
    Update {
        id: RecordId,
        submission: Submission,
        position: Option<Vec3>,
    },
}

impl GatewayRequest {
    pub fn modality(&self) -> Modality {
        match self {
            Self::Create { submission, .. } | Self::Update { submission, .. } => {
                submission.modality()
            }
        }
    }

    /// Run the call. Blocking; meant for a gateway worker thread.
    pub fn execute(&self, gateway: &dyn InventoryGateway) -> GatewayResult<SubmissionOutcome> {
        match self {
            Self::Create {
                submission,
                position,
            } => {
                let created = match submission {
                    Submission::Text(text) => gateway.create_text(text)?,
                    Submission::Image(image) => gateway.create_image(image, *position)?,
                    Submission::Audio(audio) => gateway.create_audio(audio)?,
                };
                Ok(SubmissionOutcome::Created(created))
            }
            Self::Update {
                id,
                submission,
                position,
            } => {
                let receipt = match submission {
                    Submission::Text(text) => gateway.update_text(*id, text)?,
                    Submission::Image(image) => gateway.update_image(*id, image, *position)?,
                    Submission::Audio(audio) => gateway.update_audio(*id, audio)?,
                };
                Ok(SubmissionOutcome::Updated(receipt))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Created(CreatedRecord),
    Updated(UpdateReceipt),
}

impl SubmissionOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Created(created) => &created.message,
            Self::Updated(receipt) => &receipt.message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Service,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub author: Author,
    pub text: String,
}

/// What a finished round trip did to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub operation: PendingOperation,
    /// Set on the one completion that moved the session to `HasId`.
    pub acquired: Option<RecordId>,
    pub outcome: Result<String, SessionError>,
}

/// Create-then-update state machine for one annotation.
///
/// ```text
///   Empty ──submit──> creating ──ok(id)──> HasId(id) ──submit──> updating ──┐
///     ^                  │                   ^                              │
///     └────── err ───────┘                   └───────── ok | err ───────────┘
/// ```
///
/// At most one operation is in flight; a second submit is rejected with
/// [`SessionError::Busy`] before anything reaches the network. The record id
/// is adopted once and never reset.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoringSession {
    state: SessionState,
    position: Option<Vec3>,
    pending: PendingOperation,
    transcript: Vec<TranscriptEntry>,
}

impl AuthoringSession {
    /// Session for a new record at an empty spot.
    pub fn empty_at(position: Vec3) -> Self {
        Self {
            state: SessionState::Empty,
            position: Some(position),
            pending: PendingOperation::None,
            transcript: Vec::new(),
        }
    }

    /// Session bound to an existing record.
    pub fn for_record(id: RecordId, position: Option<Vec3>) -> Self {
        Self {
            state: SessionState::HasId(id),
            position,
            pending: PendingOperation::None,
            transcript: Vec::new(),
        }
    }

    /// Session for a resolved tap; `None` when the tap hit nothing.
    pub fn for_hit(hit: SceneHit, registry: &MarkerRegistry) -> Option<Self> {
        match hit {
            SceneHit::Marker { record_id } => Some(Self::for_record(
                record_id,
                registry.get(record_id).map(|record| record.world_position()),
            )),
            SceneHit::Empty { position } => Some(Self::empty_at(position)),
            SceneHit::None => None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn record_id(&self) -> Option<RecordId> {
        match self.state {
            SessionState::Empty => None,
            SessionState::HasId(id) => Some(id),
        }
    }

    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    pub fn pending(&self) -> PendingOperation {
        self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.pending != PendingOperation::None
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Validate a submit and move to `creating` or `updating`.
    ///
    /// Rejections leave the session untouched.
    pub fn begin_submit(&mut self, submission: Submission) -> Result<GatewayRequest, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if submission.is_empty() {
            return Err(SessionError::EmptyPayload);
        }

        self.transcript.push(TranscriptEntry {
            author: Author::User,
            text: submission.transcript_text(),
        });
        self.transcript.push(TranscriptEntry {
            author: Author::Service,
            text: SENDING_PLACEHOLDER.to_string(),
        });

        let request = match self.state {
            SessionState::Empty => {
                self.pending = PendingOperation::Creating;
                GatewayRequest::Create {
                    submission,
                    position: self.position.unwrap_or_default(),
                }
            }
            SessionState::HasId(id) => {
                self.pending = PendingOperation::Updating;
                GatewayRequest::Update {
                    id,
                    submission,
                    position: self.position,
                }
            }
        };
        Ok(request)
    }

    /// Apply the result of the in-flight operation. `None` when nothing was pending.
    pub fn complete(&mut self, result: GatewayResult<SubmissionOutcome>) -> Option<Completion> {
        let operation = std::mem::take(&mut self.pending);
        if operation == PendingOperation::None {
            return None;
        }

        let mut acquired = None;
        let outcome = match result {
            Ok(SubmissionOutcome::Created(created)) => {
                match self.state {
                    SessionState::Empty => {
                        self.state = SessionState::HasId(created.id);
                        acquired = Some(created.id);
                    }
                    SessionState::HasId(existing) => {
                        warn!(
                            "Create returned record {} for a session already bound to {}; keeping {}",
                            created.id, existing, existing
                        );
                    }
                }
                Ok(created.message)
            }
            Ok(SubmissionOutcome::Updated(receipt)) => Ok(receipt.message),
            Err(error) => Err(SessionError::Gateway(error)),
        };

        let reply = match &outcome {
            Ok(message) if message.is_empty() => "Saved.".to_string(),
            Ok(message) => message.clone(),
            Err(_) => FAILED_REPLY.to_string(),
        };
        self.replace_placeholder(reply);

        Some(Completion {
            operation,
            acquired,
            outcome,
        })
    }

    fn replace_placeholder(&mut self, text: String) {
        let placeholder = self
            .transcript
            .iter_mut()
            .rev()
            .find(|entry| entry.author == Author::Service && entry.text == SENDING_PLACEHOLDER);
        match placeholder {
            Some(entry) => entry.text = text,
            None => self.transcript.push(TranscriptEntry {
                author: Author::Service,
                text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InventoryRecord;
    use crate::gateway::mock::{GatewayCall, MockInventoryGateway};

    fn text(s: &str) -> Submission {
        Submission::Text(s.to_string())
    }

    fn photo() -> Submission {
        Submission::Image(MediaPayload::new(vec![0xff, 0xd8, 0xff], "image/jpeg"))
    }

    fn voice() -> Submission {
        Submission::Audio(MediaPayload::new(vec![1, 2, 3, 4], "audio/x-m4a"))
    }

    fn created(id: RecordId) -> GatewayResult<SubmissionOutcome> {
        Ok(SubmissionOutcome::Created(CreatedRecord {
            id,
            message: format!("Created {id}"),
        }))
    }

    fn updated(message: &str) -> GatewayResult<SubmissionOutcome> {
        Ok(SubmissionOutcome::Updated(UpdateReceipt {
            message: message.to_string(),
        }))
    }

    /// Drive one submit through the gateway synchronously.
    fn submit(
        session: &mut AuthoringSession,
        gateway: &MockInventoryGateway,
        submission: Submission,
    ) -> Completion {
        let request = session.begin_submit(submission).unwrap();
        session.complete(request.execute(gateway)).unwrap()
    }

    #[test]
    fn first_success_adopts_the_server_id_and_later_submits_update_it() {
        let gateway = MockInventoryGateway::new().with_next_id(7);
        let mut session = AuthoringSession::empty_at(Vec3::new(2.0, 3.0, 4.0));

        let first = submit(&mut session, &gateway, text("drill"));
        assert_eq!(first.acquired, Some(7));
        assert_eq!(session.state(), SessionState::HasId(7));

        let second = submit(&mut session, &gateway, photo());
        assert_eq!(second.operation, PendingOperation::Updating);
        assert_eq!(second.acquired, None);

        assert_eq!(
            gateway.write_calls(),
            vec![
                GatewayCall::CreateText {
                    text: "drill".to_string()
                },
                GatewayCall::UpdateImage {
                    id: 7,
                    bytes: 3,
                    position: Some(Vec3::new(2.0, 3.0, 4.0)),
                },
            ]
        );
    }

    #[test]
    fn session_with_id_never_creates() {
        let gateway = MockInventoryGateway::new()
            .with_inventory(vec![InventoryRecord::placed(42, Vec3::ONE, "Valve")]);
        let mut session = AuthoringSession::for_record(42, Some(Vec3::ONE));

        for submission in [text("leaking"), photo(), voice(), text("again")] {
            submit(&mut session, &gateway, submission);
        }
        // A failing update must not make the next submit create either.
        gateway.push_update_response(Err(GatewayError::Transport("offline".into())));
        submit(&mut session, &gateway, text("offline"));
        submit(&mut session, &gateway, text("back"));

        let calls = gateway.write_calls();
        assert_eq!(calls.len(), 6);
        assert!(calls.iter().all(|call| call.updated_id() == Some(42)));
        assert_eq!(session.record_id(), Some(42));
    }

    #[test]
    fn submit_while_pending_is_rejected_without_touching_state() {
        let mut session = AuthoringSession::empty_at(Vec3::ZERO);
        let request = session.begin_submit(text("first")).unwrap();
        assert!(matches!(request, GatewayRequest::Create { .. }));
        let before = session.clone();

        assert_eq!(session.begin_submit(photo()), Err(SessionError::Busy));
        assert_eq!(session, before);
        assert_eq!(session.pending(), PendingOperation::Creating);
    }

    #[test]
    fn failed_create_keeps_empty_and_the_remembered_position() {
        let mut session = AuthoringSession::empty_at(Vec3::new(1.0, 0.0, -1.0));
        session.begin_submit(photo()).unwrap();

        let completion = session
            .complete(Err(GatewayError::Status {
                status: 500,
                body: String::new(),
            }))
            .unwrap();

        assert!(matches!(completion.outcome, Err(SessionError::Gateway(_))));
        assert_eq!(session.state(), SessionState::Empty);
        assert_eq!(session.position(), Some(Vec3::new(1.0, 0.0, -1.0)));
        assert_eq!(session.pending(), PendingOperation::None);

        let retry = session.begin_submit(photo()).unwrap();
        assert_eq!(
            retry,
            GatewayRequest::Create {
                submission: photo(),
                position: Vec3::new(1.0, 0.0, -1.0),
            }
        );
    }

    #[test]
    fn malformed_create_reply_adopts_no_id() {
        let gateway = MockInventoryGateway::new();
        gateway.push_create_response(Err(GatewayError::Malformed("no id".into())));
        let mut session = AuthoringSession::empty_at(Vec3::ZERO);

        let completion = submit(&mut session, &gateway, text("pump"));
        assert_eq!(completion.acquired, None);
        assert_eq!(session.record_id(), None);
    }

    #[test]
    fn failed_update_keeps_the_id() {
        let mut session = AuthoringSession::for_record(5, None);
        session.begin_submit(voice()).unwrap();
        session.complete(Err(GatewayError::Transport("reset".into())));

        assert_eq!(session.state(), SessionState::HasId(5));
        assert!(!session.is_busy());
    }

    #[test]
    fn audio_after_text_updates_the_same_record() {
        let gateway = MockInventoryGateway::new().with_next_id(11);
        let mut session = AuthoringSession::empty_at(Vec3::ZERO);

        submit(&mut session, &gateway, text("compressor"));
        submit(&mut session, &gateway, voice());

        let calls = gateway.write_calls();
        assert_eq!(calls.iter().filter(|c| c.is_create()).count(), 1);
        assert_eq!(calls[1], GatewayCall::UpdateAudio { id: 11, bytes: 4 });
    }

    #[test]
    fn image_create_carries_the_tapped_position() {
        let gateway = MockInventoryGateway::new();
        let mut session = AuthoringSession::empty_at(Vec3::new(-2.0, 0.5, 9.0));
        submit(&mut session, &gateway, photo());

        assert_eq!(
            gateway.write_calls()[0],
            GatewayCall::CreateImage {
                bytes: 3,
                position: Vec3::new(-2.0, 0.5, 9.0)
            }
        );
    }

    #[test]
    fn empty_payloads_are_rejected() {
        let mut session = AuthoringSession::empty_at(Vec3::ZERO);
        assert_eq!(session.begin_submit(text("   ")), Err(SessionError::EmptyPayload));
        assert_eq!(
            session.begin_submit(Submission::Audio(MediaPayload::new(vec![], "audio/wav"))),
            Err(SessionError::EmptyPayload)
        );
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn transcript_replaces_the_placeholder_with_the_reply() {
        let mut session = AuthoringSession::for_record(3, None);

        session.begin_submit(text("What is this?")).unwrap();
        assert_eq!(session.transcript()[1].text, SENDING_PLACEHOLDER);
        session.complete(updated("A heat exchanger."));

        session.begin_submit(text("Model?")).unwrap();
        session.complete(Err(GatewayError::Transport("timeout".into())));

        let texts: Vec<&str> = session.transcript().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["What is this?", "A heat exchanger.", "Model?", FAILED_REPLY]
        );
    }

    #[test]
    fn completion_without_pending_operation_is_ignored() {
        let mut session = AuthoringSession::empty_at(Vec3::ZERO);
        assert_eq!(session.complete(created(1)), None);
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn sessions_follow_the_tap_outcome() {
        let mut registry = MarkerRegistry::default();
        registry.apply_refresh(Ok(vec![InventoryRecord::placed(42, Vec3::X, "Fan")]));

        let marker = AuthoringSession::for_hit(SceneHit::Marker { record_id: 42 }, &registry).unwrap();
        assert_eq!(marker.record_id(), Some(42));
        assert_eq!(marker.position(), Some(Vec3::X));

        let empty = AuthoringSession::for_hit(SceneHit::Empty { position: Vec3::Y }, &registry).unwrap();
        assert_eq!(empty.state(), SessionState::Empty);

        assert!(AuthoringSession::for_hit(SceneHit::None, &registry).is_none());
    }
}
