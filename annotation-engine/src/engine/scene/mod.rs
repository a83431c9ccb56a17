//! Scene content: the building model and the inventory marker nodes.

/// Building model, lighting and camera bootstrap.
pub mod building;

/// Marker nodes kept in step with the registry snapshot.
///
/// Diffs existing nodes against the snapshot and spawns, relocates or
/// despawns only what changed.
pub mod markers;
