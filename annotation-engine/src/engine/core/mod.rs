//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, loading-state
//! transitions, frame ordering of the annotation systems, and plugin
//! initialisation.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Creates the windowed app with scene loading, picking, registry polling,
/// authoring and the RPC bridge; also provides the headless core plugin.
pub mod app_setup;

/// Application state machine from manifest loading to runtime.
pub mod app_state;

/// Per-frame ordering of input, picking, authoring, registry, sync and notification systems.
pub mod sets;

/// Native window configuration.
pub mod window_config;
