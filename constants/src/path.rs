/// Scene manifest describing the building model, camera and marker style.
pub const DEFAULT_SCENE_MANIFEST_PATH: &str = "scene/manifest.json";
