use bevy::prelude::*;

use super::ray::ray_hits_obb;
use crate::engine::registry::MarkerRegistry;
use crate::gateway::RecordId;

/// One ray intersection, either with building geometry or with a marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub distance: f32,
    pub point: Vec3,
    /// Set when the surface belongs to a marker node.
    pub record_id: Option<RecordId>,
}

impl SurfaceHit {
    pub fn geometry(distance: f32, point: Vec3) -> Self {
        Self {
            distance,
            point,
            record_id: None,
        }
    }

    pub fn marker(distance: f32, point: Vec3, record_id: RecordId) -> Self {
        Self {
            distance,
            point,
            record_id: Some(record_id),
        }
    }
}

/// Outcome of a pick query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneHit {
    /// The nearest surface is the marker of an existing record.
    Marker { record_id: RecordId },
    /// The nearest surface is plain geometry at `position`.
    Empty { position: Vec3 },
    /// Nothing under the pointer.
    None,
}

impl SceneHit {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Marker { .. } => "marker",
            Self::Empty { .. } => "empty",
            Self::None => "none",
        }
    }
}

/// Classify the nearest intersection.
///
/// Markers get no priority: one behind a wall is not selectable. Marker hits
/// for records missing from the current snapshot belong to nodes about to be
/// removed and are ignored. On an exact distance tie geometry wins.
pub fn resolve_scene_hit(hits: &[SurfaceHit], registry: &MarkerRegistry) -> SceneHit {
    let nearest = hits
        .iter()
        .filter(|hit| hit.distance.is_finite() && hit.distance >= 0.0)
        .filter(|hit| match hit.record_id {
            Some(id) if !registry.contains(id) => {
                debug!("Ignoring pick on stale marker {}", id);
                false
            }
            _ => true,
        })
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.record_id.is_some().cmp(&b.record_id.is_some()))
        });

    match nearest {
        Some(SurfaceHit {
            record_id: Some(record_id),
            ..
        }) => SceneHit::Marker {
            record_id: *record_id,
        },
        Some(hit) => SceneHit::Empty {
            position: hit.point,
        },
        None => SceneHit::None,
    }
}

/// Intersect `ray` with every marker's pick box.
pub fn marker_surface_hits(
    ray: Ray3d,
    markers: impl IntoIterator<Item = (RecordId, GlobalTransform, Vec3)>,
) -> Vec<SurfaceHit> {
    let origin = ray.origin;
    let dir = ray.direction.as_vec3();

    markers
        .into_iter()
        .filter_map(|(record_id, xf, size)| {
            ray_hits_obb(origin, dir, xf, size)
                .filter(|t| *t > 0.0)
                .map(|t| SurfaceHit::marker(t, ray.get_point(t), record_id))
        })
        .collect()
}

/// World ray under a viewport point.
pub fn screen_ray(camera: &Camera, camera_xf: &GlobalTransform, point: Vec2) -> Option<Ray3d> {
    camera.viewport_to_world(camera_xf, point).ok()
}
