use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::math::EulerRot;
use bevy::prelude::*;
use constants::render_settings::DEFAULT_CAMERA_DISTANCE;

use crate::engine::assets::scene_manifest::SceneManifest;

/// Orbit camera around a focus point.
#[derive(Resource, Debug, Clone)]
pub struct ViewportCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for ViewportCamera {
    fn default() -> Self {
        Self {
            focus_point: Vec3::ZERO,
            distance: DEFAULT_CAMERA_DISTANCE,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

impl ViewportCamera {
    /// Start looking at the model centre from `camera.distance` along +Z.
    pub fn from_manifest(manifest: &SceneManifest) -> Self {
        Self {
            focus_point: manifest.model_centre(),
            distance: manifest.camera.distance,
            ..default()
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn eye(&self) -> Vec3 {
        self.focus_point + self.rotation() * Vec3::Z * self.distance
    }

    pub fn orbit(&mut self, delta: Vec2) {
        let yaw_sens = 0.0035;
        let pitch_sens = 0.0030;
        self.yaw += -delta.x * yaw_sens;
        self.pitch += -delta.y * pitch_sens;
        self.pitch = self.pitch.clamp(-1.55, 1.55);
    }

    pub fn zoom(&mut self, scroll: f32) {
        let dolly_speed = (self.distance * 0.1).clamp(0.05, 50.0);
        self.distance = (self.distance - scroll * dolly_speed).clamp(0.5, 1000.0);
    }

    /// Move the focus point in the camera's frame; `input` is right/up/back.
    pub fn pan(&mut self, input: Vec3, speed: f32) {
        if input == Vec3::ZERO {
            return;
        }
        let rotation = self.rotation();
        let right = rotation * Vec3::X;
        let back = rotation * Vec3::Z;
        let world_delta = right * input.x + Vec3::Y * input.y + back * input.z;
        self.focus_point += world_delta.normalize() * speed;
    }
}

pub fn camera_controller(
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mut viewport_camera: ResMut<ViewportCamera>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    // Right drag orbits; left is reserved for taps.
    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    if mouse_button.pressed(MouseButton::Right) && mouse_delta != Vec2::ZERO {
        viewport_camera.orbit(mouse_delta);
    }

    let scroll: f32 = scroll_events
        .read()
        .map(|ev| match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        })
        .sum();
    if scroll.abs() > f32::EPSILON {
        viewport_camera.zoom(scroll);
    }

    let mut move_input = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) { move_input.z -= 1.0; }
    if keyboard.pressed(KeyCode::KeyS) { move_input.z += 1.0; }
    if keyboard.pressed(KeyCode::KeyD) { move_input.x += 1.0; }
    if keyboard.pressed(KeyCode::KeyA) { move_input.x -= 1.0; }
    if keyboard.pressed(KeyCode::KeyE) { move_input.y += 1.0; }
    if keyboard.pressed(KeyCode::KeyQ) { move_input.y -= 1.0; }

    // Shift = faster, ctrl = slower
    let mut speed = viewport_camera.distance.clamp(1.0, 50.0);
    if keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) { speed *= 3.5; }
    if keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]) { speed *= 0.25; }
    viewport_camera.pan(move_input, speed * time.delta_secs());

    let target = Transform::from_translation(viewport_camera.eye())
        .looking_at(viewport_camera.focus_point, Vec3::Y);
    let lerp_speed = (12.0 * time.delta_secs()).min(1.0);
    camera_transform.translation = camera_transform.translation.lerp(target.translation, lerp_speed);
    camera_transform.rotation = camera_transform.rotation.slerp(target.rotation, lerp_speed);
}
