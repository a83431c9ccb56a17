//! Multi-modal authoring of inventory records.
//!
//! One [`AuthoringSession`] per annotation drives text, photo and voice
//! submissions through create-then-update: the first successful submit on an
//! empty spot creates a record and adopts its server id, every later submit
//! (any modality) updates that id.
//!
//! ```text
//! SubmitRequest / RPC submit
//!   └─> dispatch_submission()
//!       ├─> session.begin_submit()   busy | empty payload -> rejected, no network
//!       └─> worker thread: GatewayRequest::execute()
//!             └─> poll_submission_tasks()
//!                   ├─> session.complete()
//!                   ├─> RecordIdAcquired + immediate registry refresh
//!                   └─> SubmissionCompleted
//! ```

use bevy::prelude::*;

use crate::engine::core::sets::{AnnotationSet, configure_annotation_sets};
use crate::engine::registry::RefreshSchedule;

/// Press-and-hold voice note buffer.
pub mod audio;

/// Session state machine, gateway requests and transcript.
pub mod session;

/// Session store, submission tasks and their events.
pub mod systems;

pub use audio::AudioCapture;
pub use session::{
    Author, AuthoringSession, Completion, GatewayRequest, Modality, PendingOperation, SessionError,
    SessionId, SessionState, Submission, SubmissionOutcome, TranscriptEntry,
};
pub use systems::{
    AuthoringSessions, RecordIdAcquired, SubmissionCompleted, SubmissionRejected, SubmitRequest,
    dispatch_submission,
};

pub struct AuthoringPlugin;

impl Plugin for AuthoringPlugin {
    fn build(&self, app: &mut App) {
        configure_annotation_sets(app);

        app.init_resource::<AuthoringSessions>()
            .init_resource::<RefreshSchedule>()
            .add_event::<SubmitRequest>()
            .add_event::<SubmissionRejected>()
            .add_event::<SubmissionCompleted>()
            .add_event::<RecordIdAcquired>()
            .add_systems(
                Update,
                (systems::handle_submit_requests, systems::poll_submission_tasks)
                    .chain()
                    .in_set(AnnotationSet::Authoring),
            );
    }
}
