use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::config::AnnotationConfig;
use crate::engine::assets::scene_manifest::SceneManifest;
use crate::engine::camera::viewport_camera::ViewportCamera;
use crate::engine::core::app_state::AppState;
use crate::engine::scene::building::spawn_building;
use crate::engine::scene::markers::MarkerStyle;

#[derive(Resource, Default)]
pub struct ManifestLoader {
    handle: Option<Handle<SceneManifest>>,
}

// Start the loading process
pub fn start_loading(
    mut manifest_loader: ResMut<ManifestLoader>,
    asset_server: Res<AssetServer>,
    config: Res<AnnotationConfig>,
) {
    info!("Loading scene manifest from {}", config.scene_manifest_path);
    manifest_loader.handle = Some(asset_server.load(config.scene_manifest_path.clone()));
}

/// Apply the manifest once loaded: marker style, camera, building model.
pub fn load_manifest_system(
    mut commands: Commands,
    manifest_loader: Res<ManifestLoader>,
    asset_server: Res<AssetServer>,
    manifests: Res<Assets<SceneManifest>>,
    mut style: ResMut<MarkerStyle>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(handle) = manifest_loader.handle.as_ref() else {
        return;
    };

    if let Some(manifest) = manifests.get(handle) {
        info!("✓ Scene manifest loaded: {}", manifest.building.model);
        *style = manifest.marker_style();
        commands.insert_resource(ViewportCamera::from_manifest(manifest));
        spawn_building(&mut commands, &asset_server, manifest);
        commands.insert_resource(manifest.clone());
        next_state.set(AppState::Running);
        return;
    }

    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(handle) {
        warn!("Scene manifest failed to load ({err}); running with an empty scene");
        commands.insert_resource(ViewportCamera::default());
        next_state.set(AppState::Running);
    }
}
