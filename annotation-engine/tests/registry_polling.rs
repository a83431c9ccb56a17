//! Registry polling and marker reconciliation through the headless app.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;

use annotation_engine::engine::registry::{
    MarkerRegistry, RefreshSchedule, RegistryRefreshFailed, RegistryRefreshed,
    SurfaceVisibilityChanged,
};
use annotation_engine::config::AnnotationConfig;
use annotation_engine::engine::scene::markers::{MarkerNode, MarkersChanged};
use annotation_engine::gateway::mock::MockInventoryGateway;
use annotation_engine::gateway::{
    CreatedRecord, GatewayError, GatewayResult, InventoryGateway, InventoryRecord, MediaPayload,
    RecordId, SharedGateway, UpdateReceipt,
};
use annotation_engine::tools::authoring::{
    AuthoringSession, AuthoringSessions, SessionState, Submission, SubmitRequest,
};
use bevy::prelude::*;
use helpers::{capture, captured, headless_app, headless_app_on, update_until};

fn record(id: RecordId, x: f32) -> InventoryRecord {
    InventoryRecord::placed(id, Vec3::new(x, 0.0, 0.0), "Boiler")
}

fn marker_nodes(app: &mut App) -> HashMap<RecordId, (Entity, Vec3)> {
    let mut nodes = app.world_mut().query::<(Entity, &MarkerNode, &Transform)>();
    nodes
        .iter(app.world())
        .map(|(entity, node, transform)| (node.record_id, (entity, transform.translation)))
        .collect()
}

fn generation(app: &App) -> u64 {
    app.world().resource::<MarkerRegistry>().generation()
}

fn refresh_now(app: &mut App) {
    app.world_mut()
        .resource_mut::<RefreshSchedule>()
        .request_immediate();
}

#[test]
fn new_record_spawns_only_its_marker() {
    let gateway = Arc::new(MockInventoryGateway::new().with_inventory(vec![record(1, 1.0)]));
    let mut app = headless_app(gateway.clone());
    capture::<MarkersChanged>(&mut app);
    update_until(&mut app, "first listing", |app| generation(app) == 1);
    app.update();

    let before = marker_nodes(&mut app);
    assert_eq!(before.len(), 1);
    let (first_entity, _) = before[&1];

    gateway.set_inventory(vec![record(1, 1.0), record(2, 2.0)]);
    refresh_now(&mut app);
    update_until(&mut app, "second listing", |app| generation(app) == 2);
    app.update();

    let after = marker_nodes(&mut app);
    assert_eq!(after.len(), 2);
    assert_eq!(after[&1].0, first_entity);
    assert_eq!(after[&2].1, Vec3::new(2.0, 0.0, 0.0));

    let changes = captured::<MarkersChanged>(&app);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].added, vec![2]);
    assert!(changes[1].removed.is_empty());
    assert!(changes[1].moved.is_empty());
}

#[test]
fn removed_and_moved_records_update_nodes_in_place() {
    let gateway = Arc::new(
        MockInventoryGateway::new().with_inventory(vec![record(1, 1.0), record(2, 2.0)]),
    );
    let mut app = headless_app(gateway.clone());
    update_until(&mut app, "first listing", |app| generation(app) == 1);
    app.update();
    let (moved_entity, _) = marker_nodes(&mut app)[&2];

    gateway.set_inventory(vec![record(2, 5.0)]);
    refresh_now(&mut app);
    update_until(&mut app, "second listing", |app| generation(app) == 2);
    app.update();

    let nodes = marker_nodes(&mut app);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[&2], (moved_entity, Vec3::new(5.0, 0.0, 0.0)));
}

#[test]
fn failed_refresh_keeps_previous_snapshot() {
    let gateway = Arc::new(MockInventoryGateway::new().with_inventory(vec![record(1, 1.0)]));
    let mut app = headless_app(gateway.clone());
    capture::<RegistryRefreshed>(&mut app);
    capture::<RegistryRefreshFailed>(&mut app);
    update_until(&mut app, "first listing", |app| generation(app) == 1);
    app.update();

    gateway.push_list_response(Err(GatewayError::Status {
        status: 503,
        body: "maintenance".to_string(),
    }));
    refresh_now(&mut app);
    update_until(&mut app, "failed listing", |app| {
        !captured::<RegistryRefreshFailed>(app).is_empty()
    });
    app.update();

    let registry = app.world().resource::<MarkerRegistry>();
    assert_eq!(registry.generation(), 1);
    assert!(registry.contains(1));
    assert!(matches!(
        registry.last_failure(),
        Some(GatewayError::Status { status: 503, .. })
    ));
    assert_eq!(captured::<RegistryRefreshed>(&app).len(), 1);
    assert_eq!(marker_nodes(&mut app).len(), 1);
}

#[test]
fn hidden_surface_stops_polling_and_visible_resumes() {
    let gateway = Arc::new(MockInventoryGateway::new());
    let mut app = headless_app(gateway.clone());
    update_until(&mut app, "first listing", |app| generation(app) == 1);

    app.world_mut()
        .send_event(SurfaceVisibilityChanged { visible: false });
    app.update();
    assert!(!app.world().resource::<RefreshSchedule>().is_polling());

    app.world_mut()
        .send_event(SurfaceVisibilityChanged { visible: true });
    update_until(&mut app, "listing after resume", |app| generation(app) == 2);
    assert!(app.world().resource::<RefreshSchedule>().is_polling());
    assert_eq!(gateway.list_calls(), 2);
}

/// Inventory service whose creates hang until the test lets them through.
struct StalledCreates {
    inner: Arc<MockInventoryGateway>,
    gate: async_channel::Receiver<()>,
}

impl InventoryGateway for StalledCreates {
    fn list_inventory(&self) -> GatewayResult<Vec<InventoryRecord>> {
        self.inner.list_inventory()
    }

    fn create_text(&self, text: &str) -> GatewayResult<CreatedRecord> {
        self.gate.recv_blocking().ok();
        self.inner.create_text(text)
    }

    fn create_image(&self, image: &MediaPayload, position: Vec3) -> GatewayResult<CreatedRecord> {
        self.gate.recv_blocking().ok();
        self.inner.create_image(image, position)
    }

    fn create_audio(&self, audio: &MediaPayload) -> GatewayResult<CreatedRecord> {
        self.gate.recv_blocking().ok();
        self.inner.create_audio(audio)
    }

    fn update_text(&self, id: RecordId, text: &str) -> GatewayResult<UpdateReceipt> {
        self.inner.update_text(id, text)
    }

    fn update_image(
        &self,
        id: RecordId,
        image: &MediaPayload,
        position: Option<Vec3>,
    ) -> GatewayResult<UpdateReceipt> {
        self.inner.update_image(id, image, position)
    }

    fn update_audio(&self, id: RecordId, audio: &MediaPayload) -> GatewayResult<UpdateReceipt> {
        self.inner.update_audio(id, audio)
    }
}

#[test]
fn hung_create_does_not_hold_up_registry_refresh() {
    let inner = Arc::new(
        MockInventoryGateway::new()
            .with_next_id(7)
            .with_inventory(vec![record(1, 1.0)]),
    );
    let (release, gate) = async_channel::bounded(1);
    let gateway = SharedGateway::new(StalledCreates {
        inner: inner.clone(),
        gate,
    });
    let mut app = headless_app_on(gateway, AnnotationConfig::default());
    update_until(&mut app, "first listing", |app| generation(app) == 1);

    let session = app
        .world_mut()
        .resource_mut::<AuthoringSessions>()
        .open(AuthoringSession::empty_at(Vec3::ZERO));
    app.world_mut().send_event(SubmitRequest {
        session,
        submission: Submission::Text("compressor".to_string()),
    });
    app.update();

    inner.set_inventory(vec![record(1, 1.0), record(2, 2.0)]);
    refresh_now(&mut app);
    update_until(&mut app, "listing behind a hung create", |app| {
        generation(app) == 2
    });

    let sessions = app.world().resource::<AuthoringSessions>();
    assert!(sessions.get(session).is_some_and(AuthoringSession::is_busy));
    assert!(app.world().resource::<MarkerRegistry>().contains(2));

    release.send_blocking(()).unwrap();
    update_until(&mut app, "released create", |app| {
        let sessions = app.world().resource::<AuthoringSessions>();
        sessions
            .get(session)
            .is_some_and(|open| open.state() == SessionState::HasId(7))
    });
}
