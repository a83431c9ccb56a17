//! Compile-time defaults shared by the annotation engine workspace.

pub mod marker;
pub mod network;
pub mod path;
pub mod render_settings;
