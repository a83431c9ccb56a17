//! Scene layout assets.
//!
//! The building model, initial camera placement and marker style are
//! described by a JSON scene manifest loaded through `bevy_common_assets`.

/// Scene manifest asset with building, camera and marker settings.
pub mod scene_manifest;
