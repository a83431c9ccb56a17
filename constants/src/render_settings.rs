/// Ambient light brightness applied to the building model.
pub const AMBIENT_LIGHT_BRIGHTNESS: f32 = 500.0;

/// Illuminance of the key directional light (lux).
pub const DIRECTIONAL_LIGHT_ILLUMINANCE: f32 = 1000.0;

/// Camera distance from the model centre when the manifest does not set one.
pub const DEFAULT_CAMERA_DISTANCE: f32 = 10.0;

/// Cursor travel (pixels) below which a press/release pair counts as a tap.
pub const TAP_MAX_DRAG_PIXELS: f32 = 6.0;
