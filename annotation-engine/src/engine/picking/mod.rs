//! Tap-to-scene resolution.
//!
//! ```text
//! mouse / RPC tap ──> TapEvent ──> screen ray
//!                                   ├─ MeshRayCast over building geometry (markers filtered out)
//!                                   └─ padded OBB test per marker node
//!                                         └─> resolve_scene_hit ──> SceneHitEvent
//! ```
//!
//! The nearest intersection decides the outcome; the resolver itself is a
//! pure function of the hit list and the registry snapshot.

use bevy::prelude::*;

use crate::engine::core::sets::{AnnotationSet, configure_annotation_sets};

/// Ray against oriented and axis-aligned boxes.
pub mod ray;

/// Pure classification of ray hits into a [`resolver::SceneHit`].
pub mod resolver;

/// Tap input and the ray casting system.
pub mod systems;

pub use resolver::{SceneHit, SurfaceHit, resolve_scene_hit};
pub use systems::{SceneHitEvent, ScenePicker, TapEvent};

pub struct ScenePickingPlugin;

impl Plugin for ScenePickingPlugin {
    fn build(&self, app: &mut App) {
        configure_annotation_sets(app);

        // Headless apps have no asset server; taps then resolve to `none`.
        app.init_resource::<Assets<Mesh>>()
            .add_event::<TapEvent>()
            .add_event::<SceneHitEvent>()
            .add_systems(
                Update,
                (
                    systems::emit_taps_from_mouse
                        .run_if(resource_exists::<ButtonInput<MouseButton>>)
                        .in_set(AnnotationSet::Input),
                    systems::resolve_taps.in_set(AnnotationSet::Picking),
                ),
            );
    }
}
