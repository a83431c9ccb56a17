//! Create-then-update authoring through the headless app.

mod helpers;

use std::sync::Arc;

use annotation_engine::engine::registry::MarkerRegistry;
use annotation_engine::engine::scene::markers::MarkerNode;
use annotation_engine::gateway::mock::{GatewayCall, MockInventoryGateway};
use annotation_engine::gateway::{GatewayError, MediaPayload};
use annotation_engine::tools::authoring::session::FAILED_REPLY;
use annotation_engine::tools::authoring::{
    AuthoringSession, AuthoringSessions, PendingOperation, RecordIdAcquired, SessionError,
    SessionId, SessionState, Submission, SubmissionCompleted, SubmissionRejected, SubmitRequest,
};
use bevy::prelude::*;
use helpers::{capture, captured, headless_app, update_until};

fn open_empty(app: &mut App, position: Vec3) -> SessionId {
    app.world_mut()
        .resource_mut::<AuthoringSessions>()
        .open(AuthoringSession::empty_at(position))
}

fn session(app: &App, id: SessionId) -> AuthoringSession {
    app.world()
        .resource::<AuthoringSessions>()
        .get(id)
        .cloned()
        .expect("session should still be open")
}

fn submit(app: &mut App, session: SessionId, submission: Submission) {
    app.world_mut().send_event(SubmitRequest {
        session,
        submission,
    });
}

fn idle(app: &App, id: SessionId) -> bool {
    !session(app, id).is_busy()
}

#[test]
fn text_on_empty_spot_creates_then_photo_updates_same_record() {
    let gateway = Arc::new(MockInventoryGateway::new().with_next_id(7));
    let mut app = headless_app(gateway.clone());
    capture::<RecordIdAcquired>(&mut app);
    capture::<SubmissionCompleted>(&mut app);
    app.update();

    let id = open_empty(&mut app, Vec3::new(2.0, 3.0, 4.0));
    submit(&mut app, id, Submission::Text("drill".to_string()));
    update_until(&mut app, "record id from create", |app| idle(app, id));

    let after_create = session(&app, id);
    assert_eq!(after_create.state(), SessionState::HasId(7));
    assert_eq!(after_create.position(), Some(Vec3::new(2.0, 3.0, 4.0)));
    assert_eq!(
        gateway.write_calls(),
        vec![GatewayCall::CreateText {
            text: "drill".to_string()
        }]
    );

    let acquired = captured::<RecordIdAcquired>(&app);
    assert_eq!(acquired.len(), 1);
    assert_eq!(acquired[0].session, id);
    assert_eq!(acquired[0].record_id, 7);

    submit(
        &mut app,
        id,
        Submission::Image(MediaPayload::new(vec![0xff, 0xd8, 0xff], "image/jpeg")),
    );
    update_until(&mut app, "photo update", |app| {
        captured::<SubmissionCompleted>(app).len() == 2
    });

    assert_eq!(
        gateway.write_calls()[1],
        GatewayCall::UpdateImage {
            id: 7,
            bytes: 3,
            position: Some(Vec3::new(2.0, 3.0, 4.0)),
        }
    );

    let completed = captured::<SubmissionCompleted>(&app);
    assert_eq!(completed[0].operation, PendingOperation::Creating);
    assert_eq!(completed[1].operation, PendingOperation::Updating);
    assert_eq!(completed[1].record_id, Some(7));
    assert!(completed[1].outcome.is_ok());

    let transcript = session(&app, id).transcript().to_vec();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[0].text, "drill");
    assert_eq!(transcript[1].text, "Created inventory item 7");
    assert_eq!(transcript[3].text, "Updated inventory item 7");
}

#[test]
fn acquired_id_triggers_refresh_and_marker() {
    let gateway = Arc::new(MockInventoryGateway::new().with_next_id(11));
    let mut app = headless_app(gateway.clone());
    update_until(&mut app, "initial listing", |app| {
        app.world().resource::<MarkerRegistry>().generation() == 1
    });

    let id = open_empty(&mut app, Vec3::new(1.0, 0.0, 1.0));
    submit(&mut app, id, Submission::Text("valve".to_string()));
    update_until(&mut app, "marker for the new record", |app| {
        let mut nodes = app.world_mut().query::<&MarkerNode>();
        nodes.iter(app.world()).any(|node| node.record_id == 11)
    });

    assert!(app.world().resource::<MarkerRegistry>().contains(11));
    assert!(gateway.list_calls() >= 2);
}

#[test]
fn second_submit_while_creating_is_rejected_without_network() {
    let gateway = Arc::new(MockInventoryGateway::new().with_next_id(3));
    let mut app = headless_app(gateway.clone());
    capture::<SubmissionRejected>(&mut app);
    app.update();

    let id = open_empty(&mut app, Vec3::ZERO);
    submit(&mut app, id, Submission::Text("first".to_string()));
    submit(&mut app, id, Submission::Text("second".to_string()));
    update_until(&mut app, "first create", |app| idle(app, id));

    assert_eq!(
        gateway.write_calls(),
        vec![GatewayCall::CreateText {
            text: "first".to_string()
        }]
    );

    let rejected = captured::<SubmissionRejected>(&app);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].error, SessionError::Busy);
    assert_eq!(session(&app, id).record_id(), Some(3));
}

#[test]
fn failed_create_keeps_session_empty_and_retry_creates() {
    let gateway = Arc::new(MockInventoryGateway::new().with_next_id(5));
    gateway.push_create_response(Err(GatewayError::Transport("offline".to_string())));
    let mut app = headless_app(gateway.clone());
    capture::<SubmissionCompleted>(&mut app);
    app.update();

    let id = open_empty(&mut app, Vec3::new(4.0, 0.0, 2.0));
    submit(&mut app, id, Submission::Text("pump".to_string()));
    update_until(&mut app, "failed create", |app| idle(app, id));

    let failed = session(&app, id);
    assert_eq!(failed.state(), SessionState::Empty);
    assert_eq!(failed.position(), Some(Vec3::new(4.0, 0.0, 2.0)));
    assert_eq!(
        failed.transcript().last().map(|entry| entry.text.as_str()),
        Some(FAILED_REPLY)
    );
    assert!(captured::<SubmissionCompleted>(&app)[0].outcome.is_err());

    submit(&mut app, id, Submission::Text("pump".to_string()));
    update_until(&mut app, "retried create", |app| idle(app, id));

    assert_eq!(session(&app, id).state(), SessionState::HasId(5));
    let writes = gateway.write_calls();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(GatewayCall::is_create));
}

#[test]
fn empty_payload_is_rejected_before_the_gateway() {
    let gateway = Arc::new(MockInventoryGateway::new());
    let mut app = headless_app(gateway.clone());
    capture::<SubmissionRejected>(&mut app);
    app.update();

    let id = open_empty(&mut app, Vec3::ZERO);
    submit(&mut app, id, Submission::Text("   ".to_string()));
    submit(
        &mut app,
        id,
        Submission::Audio(MediaPayload::new(Vec::new(), "audio/x-m4a")),
    );
    app.update();

    let rejected = captured::<SubmissionRejected>(&app);
    assert_eq!(rejected.len(), 2);
    assert!(rejected
        .iter()
        .all(|event| event.error == SessionError::EmptyPayload));
    assert!(gateway.write_calls().is_empty());
    assert!(session(&app, id).transcript().is_empty());
}
