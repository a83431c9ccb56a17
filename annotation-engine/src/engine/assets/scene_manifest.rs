use bevy::prelude::*;
use constants::marker::{MARKER_COLOUR, MARKER_PICK_PADDING, MARKER_RADIUS};
use constants::render_settings::DEFAULT_CAMERA_DISTANCE;
use serde::{Deserialize, Serialize};

use crate::engine::scene::markers::MarkerStyle;

/// Building model to load, relative to the asset root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingModel {
    /// glTF / GLB file; scene 0 is spawned.
    pub model: String,
    /// Model centre in world space; the camera orbits around it.
    #[serde(default)]
    pub centre: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Distance from the model centre along +Z.
    #[serde(default = "default_camera_distance")]
    pub distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: DEFAULT_CAMERA_DISTANCE,
        }
    }
}

fn default_camera_distance() -> f32 {
    DEFAULT_CAMERA_DISTANCE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSettings {
    pub radius: f32,
    pub pick_padding: f32,
    pub colour: [f32; 3],
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            radius: MARKER_RADIUS,
            pick_padding: MARKER_PICK_PADDING,
            colour: MARKER_COLOUR,
        }
    }
}

/// Scene layout as a Bevy asset. Mirrors the JSON file.
#[derive(Asset, Debug, Clone, Serialize, Deserialize, TypePath, Resource)]
pub struct SceneManifest {
    pub building: BuildingModel,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub markers: MarkerSettings,
}

impl SceneManifest {
    pub fn model_centre(&self) -> Vec3 {
        Vec3::from_array(self.building.centre)
    }

    /// Initial camera position: the model centre pushed back along +Z.
    pub fn camera_eye(&self) -> Vec3 {
        self.model_centre() + Vec3::Z * self.camera.distance
    }

    pub fn marker_style(&self) -> MarkerStyle {
        MarkerStyle {
            radius: self.markers.radius,
            pick_padding: self.markers.pick_padding,
            colour: self.markers.colour,
        }
    }
}
