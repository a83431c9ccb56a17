use bevy::prelude::*;
use constants::render_settings::{AMBIENT_LIGHT_BRIGHTNESS, DIRECTIONAL_LIGHT_ILLUMINANCE};

use crate::engine::assets::scene_manifest::SceneManifest;

/// Root of the loaded building model; the geometry taps are cast against.
#[derive(Component)]
pub struct BuildingModel;

pub fn spawn_building(commands: &mut Commands, asset_server: &AssetServer, manifest: &SceneManifest) {
    let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(manifest.building.model.clone()));
    commands.spawn((
        Name::new("Building"),
        BuildingModel,
        SceneRoot(scene),
        Transform::default(),
    ));
}

pub fn spawn_lighting(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: AMBIENT_LIGHT_BRIGHTNESS,
        ..default()
    });

    commands.spawn((
        Name::new("Key Light"),
        DirectionalLight {
            illuminance: DIRECTIONAL_LIGHT_ILLUMINANCE,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

/// The controller places it once the manifest is known.
pub fn spawn_camera(commands: &mut Commands) {
    commands.spawn((
        Name::new("Viewport Camera"),
        Camera3d::default(),
        Transform::from_xyz(0.0, 0.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

// Startup system that only handles basic initialisation
pub fn setup_scene(mut commands: Commands) {
    spawn_lighting(&mut commands);
    spawn_camera(&mut commands);
}
