//! Spatial annotation and multi-modal authoring engine.
//!
//! Lets a technician tag equipment inside a 3-D building model and describe
//! each item with text, photos or voice notes. The crate is organised like a
//! Bevy application:
//!
//! ```text
//! rpc::web_rpc            JSON-RPC 2.0 bridge to the surrounding UI
//!   └─> tools::authoring  create-then-update session state machine
//!         └─> gateway     remote inventory service (list/create/update)
//!   └─> engine::picking   tap -> ray cast -> SceneHit
//!   └─> engine::registry  polled inventory snapshot (replace, never merge)
//!         └─> engine::scene::markers  registry -> marker nodes in the scene
//! ```
//!
//! All scene and session mutation happens on the main schedule. Each network
//! round trip runs on its own worker thread and its reply is applied by
//! systems that poll the pending call each frame.

/// Runtime configuration resolved from the environment.
pub mod config;

/// Scene, registry, picking and application setup.
pub mod engine;

/// Remote inventory service boundary.
pub mod gateway;

/// JSON-RPC bridge exposing the engine to its host UI.
pub mod rpc;

/// Interactive authoring tools.
pub mod tools;
