//! Headless app harness for integration tests.
//!
//! Builds the annotation core on `MinimalPlugins` with a scripted gateway and
//! spins frames until replies from gateway worker threads have been applied.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use annotation_engine::config::AnnotationConfig;
use annotation_engine::engine::core::app_setup::AnnotationCorePlugin;
use annotation_engine::gateway::SharedGateway;
use annotation_engine::gateway::mock::MockInventoryGateway;
use bevy::prelude::*;

const MAX_FRAMES: usize = 500;

/// Events of type `E` seen since the app started, in order.
#[derive(Resource)]
pub struct Captured<E: Event + Clone>(pub Vec<E>);

impl<E: Event + Clone> Default for Captured<E> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

pub fn headless_app(gateway: Arc<MockInventoryGateway>) -> App {
    headless_app_with(gateway, AnnotationConfig::default())
}

pub fn headless_app_with(gateway: Arc<MockInventoryGateway>, config: AnnotationConfig) -> App {
    headless_app_on(SharedGateway::from_arc(gateway), config)
}

/// Headless app over any gateway implementation.
pub fn headless_app_on(gateway: SharedGateway, config: AnnotationConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(config)
        .add_plugins(AnnotationCorePlugin::new(gateway));
    app
}

/// Keep every `E` written from now on in [`Captured<E>`].
pub fn capture<E: Event + Clone>(app: &mut App) {
    app.init_resource::<Captured<E>>().add_systems(
        Last,
        |mut events: EventReader<E>, mut captured: ResMut<Captured<E>>| {
            captured.0.extend(events.read().cloned());
        },
    );
}

pub fn captured<E: Event + Clone>(app: &App) -> Vec<E> {
    app.world().resource::<Captured<E>>().0.clone()
}

/// Run frames until `done` holds, failing the test if it never does.
pub fn update_until(app: &mut App, what: &str, mut done: impl FnMut(&mut App) -> bool) {
    for _ in 0..MAX_FRAMES {
        app.update();
        if done(app) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("gave up waiting for {what}");
}
