use bevy::asset::AssetMetaCheck;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

use crate::config::AnnotationConfig;
use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::camera::viewport_camera::camera_controller;
use crate::engine::core::app_state::{AppState, announce_running};
use crate::engine::core::sets::{AnnotationSet, configure_annotation_sets};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::manifest_loader::{ManifestLoader, load_manifest_system, start_loading};
use crate::engine::picking::ScenePickingPlugin;
use crate::engine::registry::MarkerRegistryPlugin;
use crate::engine::registry::polling::forward_window_occlusion;
use crate::engine::scene::building::setup_scene;
use crate::engine::scene::markers::MarkerSyncPlugin;
use crate::gateway::SharedGateway;
use crate::rpc::web_rpc::WebRpcPlugin;
use crate::tools::authoring::AuthoringPlugin;

const DEFAULT_LOG_FILTER: &str = "info,wgpu=error,annotation_engine=debug";

/// Registry, picking, marker sync, authoring and the RPC bridge.
///
/// Runs without a window or renderer, which is how the integration tests
/// drive it. Marker meshes are only attached when `Assets<StandardMaterial>`
/// exists, so add rendering plugins before this one.
pub struct AnnotationCorePlugin {
    gateway: SharedGateway,
}

impl AnnotationCorePlugin {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }
}

impl Plugin for AnnotationCorePlugin {
    fn build(&self, app: &mut App) {
        configure_annotation_sets(app);

        app.insert_resource(self.gateway.clone())
            .init_resource::<AnnotationConfig>()
            .add_plugins((
                MarkerRegistryPlugin,
                ScenePickingPlugin,
                MarkerSyncPlugin,
                AuthoringPlugin,
                WebRpcPlugin,
            ));
    }
}

pub fn create_app(config: AnnotationConfig, gateway: SharedGateway) -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(JsonAssetPlugin::<SceneManifest>::new(&["json"]))
        .init_state::<AppState>()
        .insert_resource(config)
        .init_resource::<ManifestLoader>()
        .add_plugins(AnnotationCorePlugin::new(gateway));

    app.add_systems(Startup, (setup_scene, start_loading))
        .add_systems(
            Update,
            load_manifest_system.run_if(in_state(AppState::Loading)),
        )
        .add_systems(OnEnter(AppState::Running), announce_running)
        .add_systems(
            Update,
            (
                forward_window_occlusion,
                camera_controller.run_if(in_state(AppState::Running)),
            )
                .in_set(AnnotationSet::Input),
        );

    app
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    let log_config = LogPlugin {
        level: Level::INFO,
        filter: DEFAULT_LOG_FILTER.to_string(),
        ..default()
    };

    DefaultPlugins
        .set(window_config)
        .set(asset_config)
        .set(log_config)
}
