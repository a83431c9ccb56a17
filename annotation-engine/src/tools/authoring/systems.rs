use std::collections::BTreeMap;

use bevy::prelude::*;

use super::audio::AudioCapture;
use super::session::{
    AuthoringSession, Modality, PendingOperation, SessionError, SessionId, Submission,
    SubmissionOutcome,
};
use crate::engine::registry::RefreshSchedule;
use crate::gateway::worker::PendingCall;
use crate::gateway::{RecordId, SharedGateway};

struct SessionSlot {
    session: AuthoringSession,
    audio: AudioCapture,
}

/// Open authoring sessions, keyed by the id handed to the UI.
#[derive(Resource)]
pub struct AuthoringSessions {
    slots: BTreeMap<SessionId, SessionSlot>,
    next_id: SessionId,
}

impl Default for AuthoringSessions {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl AuthoringSessions {
    pub fn open(&mut self, session: AuthoringSession) -> SessionId {
        let id = self.next_id;
        self.next_id += 1;
        info!(
            "Opened authoring session {} ({})",
            id,
            match session.record_id() {
                Some(record_id) => format!("record {record_id}"),
                None => "new record".to_string(),
            }
        );
        self.slots.insert(
            id,
            SessionSlot {
                session,
                audio: AudioCapture::default(),
            },
        );
        id
    }

    /// Discard a session. A submission still in flight completes unseen.
    pub fn close(&mut self, id: SessionId) -> Option<AuthoringSession> {
        let slot = self.slots.remove(&id)?;
        info!("Closed authoring session {}", id);
        Some(slot.session)
    }

    pub fn get(&self, id: SessionId) -> Option<&AuthoringSession> {
        self.slots.get(&id).map(|slot| &slot.session)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut AuthoringSession> {
        self.slots.get_mut(&id).map(|slot| &mut slot.session)
    }

    pub fn audio_mut(&mut self, id: SessionId) -> Option<&mut AudioCapture> {
        self.slots.get_mut(&id).map(|slot| &mut slot.audio)
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Ask a session to submit content. Used by callers that have no RPC reply channel.
#[derive(Event, Debug, Clone)]
pub struct SubmitRequest {
    pub session: SessionId,
    pub submission: Submission,
}

/// A submit was refused before reaching the network.
#[derive(Event, Debug, Clone)]
pub struct SubmissionRejected {
    pub session: SessionId,
    pub modality: Modality,
    pub error: SessionError,
}

/// A gateway round trip for a session finished.
#[derive(Event, Debug, Clone)]
pub struct SubmissionCompleted {
    pub session: SessionId,
    pub modality: Modality,
    pub operation: PendingOperation,
    pub record_id: Option<RecordId>,
    pub outcome: Result<String, SessionError>,
}

/// A session learnt the server id of the record it created.
#[derive(Event, Debug, Clone, Copy)]
pub struct RecordIdAcquired {
    pub session: SessionId,
    pub record_id: RecordId,
}

/// Outstanding gateway call for one session.
#[derive(Component)]
pub struct SubmissionTask {
    pub session: SessionId,
    pub modality: Modality,
    call: PendingCall<SubmissionOutcome>,
}

/// Validate a submission against its session and start the gateway call.
///
/// Rejections (unknown session, busy, empty payload) return synchronously and
/// never reach the gateway.
pub fn dispatch_submission(
    commands: &mut Commands,
    gateway: &SharedGateway,
    sessions: &mut AuthoringSessions,
    session_id: SessionId,
    submission: Submission,
) -> Result<PendingOperation, SessionError> {
    let session = sessions
        .get_mut(session_id)
        .ok_or(SessionError::UnknownSession(session_id))?;
    let request = session.begin_submit(submission)?;
    let operation = session.pending();
    let modality = request.modality();

    debug!(
        "Session {} submitting {} ({})",
        session_id,
        modality,
        operation.as_str()
    );

    let gateway = gateway.handle();
    let call = PendingCall::spawn(format!("session-{session_id}-{modality}"), move || {
        request.execute(gateway.as_ref())
    });
    commands.spawn((
        Name::new(format!("Submission {session_id}")),
        SubmissionTask {
            session: session_id,
            modality,
            call,
        },
    ));
    Ok(operation)
}

pub fn handle_submit_requests(
    mut commands: Commands,
    mut requests: EventReader<SubmitRequest>,
    gateway: Res<SharedGateway>,
    mut sessions: ResMut<AuthoringSessions>,
    mut rejected: EventWriter<SubmissionRejected>,
) {
    for request in requests.read() {
        let modality = request.submission.modality();
        if let Err(error) = dispatch_submission(
            &mut commands,
            &gateway,
            &mut sessions,
            request.session,
            request.submission.clone(),
        ) {
            warn!("Submission for session {} rejected: {}", request.session, error);
            rejected.write(SubmissionRejected {
                session: request.session,
                modality,
                error,
            });
        }
    }
}

pub fn poll_submission_tasks(
    mut commands: Commands,
    tasks: Query<(Entity, &SubmissionTask)>,
    mut sessions: ResMut<AuthoringSessions>,
    mut schedule: ResMut<RefreshSchedule>,
    mut completed: EventWriter<SubmissionCompleted>,
    mut acquired: EventWriter<RecordIdAcquired>,
) {
    for (entity, pending) in &tasks {
        let Some(result) = pending.call.poll() else {
            continue;
        };
        commands.entity(entity).despawn();

        let Some(session) = sessions.get_mut(pending.session) else {
            if let Ok(SubmissionOutcome::Created(created)) = &result {
                // The record exists on the server even though nobody is listening.
                schedule.request_immediate();
                info!(
                    "Session {} closed before record {} was created",
                    pending.session, created.id
                );
            } else {
                debug!("Dropping reply for closed session {}", pending.session);
            }
            continue;
        };

        let Some(completion) = session.complete(result) else {
            continue;
        };

        match &completion.outcome {
            Ok(_) => debug!("Session {} {} succeeded", pending.session, pending.modality),
            Err(SessionError::Gateway(error)) if error.is_transport() => {
                warn!("Session {} {} failed: {}", pending.session, pending.modality, error)
            }
            Err(error) => error!("Session {} {} failed: {}", pending.session, pending.modality, error),
        }

        if let Some(record_id) = completion.acquired {
            info!("Session {} acquired record id {}", pending.session, record_id);
            schedule.request_immediate();
            acquired.write(RecordIdAcquired {
                session: pending.session,
                record_id,
            });
        }

        completed.write(SubmissionCompleted {
            session: pending.session,
            modality: pending.modality,
            operation: completion.operation,
            record_id: session.record_id(),
            outcome: completion.outcome,
        });
    }
}
