//! Viewport camera for building navigation.
//!
//! Orbit around the model centre with right drag, dolly with the scroll
//! wheel, move the focus with WASD/QE.

/// Viewport camera resource and controller system.
pub mod viewport_camera;
