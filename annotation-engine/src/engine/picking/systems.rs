use bevy::ecs::system::SystemParam;
use bevy::picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings, RayCastVisibility};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::render_settings::TAP_MAX_DRAG_PIXELS;

use super::resolver::{SceneHit, SurfaceHit, marker_surface_hits, resolve_scene_hit, screen_ray};
use crate::engine::registry::MarkerRegistry;
use crate::engine::scene::markers::{MarkerBounds, MarkerNode};

/// A tap at a viewport point, from the pointer or from the host UI.
#[derive(Event, Debug, Clone, Copy)]
pub struct TapEvent {
    pub point: Vec2,
    /// Correlates the resolved hit with the request that produced the tap.
    pub ticket: Option<u64>,
}

impl TapEvent {
    pub fn at(point: Vec2) -> Self {
        Self {
            point,
            ticket: None,
        }
    }
}

/// Resolution of one [`TapEvent`].
#[derive(Event, Debug, Clone, Copy)]
pub struct SceneHitEvent {
    pub point: Vec2,
    pub ticket: Option<u64>,
    pub hit: SceneHit,
}

/// Left-button press and release without dragging counts as a tap; drags
/// belong to the camera.
pub fn emit_taps_from_mouse(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut pressed_at: Local<Option<Vec2>>,
    mut taps: EventWriter<TapEvent>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let cursor = window.cursor_position();

    if buttons.just_pressed(MouseButton::Left) {
        *pressed_at = cursor;
    }

    if buttons.just_released(MouseButton::Left) {
        if let (Some(start), Some(end)) = (pressed_at.take(), cursor) {
            if start.distance(end) <= TAP_MAX_DRAG_PIXELS {
                taps.write(TapEvent::at(end));
            }
        }
    }
}

/// Everything a pick along a world ray looks at.
#[derive(SystemParam)]
pub struct ScenePicker<'w, 's> {
    ray_cast: MeshRayCast<'w, 's>,
    markers: Query<
        'w,
        's,
        (
            &'static MarkerNode,
            &'static GlobalTransform,
            &'static MarkerBounds,
        ),
    >,
    marker_entities: Query<'w, 's, (), With<MarkerNode>>,
    registry: Res<'w, MarkerRegistry>,
}

impl ScenePicker<'_, '_> {
    /// Classify the nearest surface along `ray`.
    ///
    /// Building geometry comes from the mesh ray cast, with marker entities
    /// filtered out; markers are tested against their padded pick boxes.
    pub fn pick(&mut self, ray: Ray3d) -> SceneHit {
        let marker_entities = &self.marker_entities;
        let not_marker = |entity: Entity| !marker_entities.contains(entity);
        let settings = MeshRayCastSettings::default()
            .with_visibility(RayCastVisibility::Visible)
            .with_filter(&not_marker);

        let mut surfaces: Vec<SurfaceHit> = self
            .ray_cast
            .cast_ray(ray, &settings)
            .iter()
            .map(|(_, hit)| SurfaceHit::geometry(hit.distance, hit.point))
            .collect();
        surfaces.extend(marker_surface_hits(
            ray,
            self.markers
                .iter()
                .map(|(node, xf, bounds)| (node.record_id, *xf, bounds.0)),
        ));

        resolve_scene_hit(&surfaces, &self.registry)
    }
}

pub fn resolve_taps(
    mut taps: EventReader<TapEvent>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    mut picker: ScenePicker,
    mut hits: EventWriter<SceneHitEvent>,
) {
    for tap in taps.read() {
        let hit = match cameras.single() {
            Ok((camera, camera_xf)) => match screen_ray(camera, camera_xf, tap.point) {
                Some(ray) => picker.pick(ray),
                None => SceneHit::None,
            },
            Err(_) => {
                warn!("Tap ignored: no 3D camera in the scene");
                SceneHit::None
            }
        };

        debug!("Tap at {:?} resolved to {}", tap.point, hit.kind());
        hits.write(SceneHitEvent {
            point: tap.point,
            ticket: tap.ticket,
            hit,
        });
    }
}
