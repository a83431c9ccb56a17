use bevy::prelude::*;

/// Frame phases of the annotation engine, executed in declaration order.
///
/// Every mutation of the registry, the sessions and the marker nodes happens
/// inside one of these sets on the main schedule, so none of them ever runs
/// concurrently with another.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationSet {
    /// Incoming RPC frames and pointer input.
    Input,
    /// Tap resolution against the scene.
    Picking,
    /// Session submissions and completed gateway round trips.
    Authoring,
    /// Registry polling and refresh application.
    Registry,
    /// Marker nodes reconciled with the registry snapshot.
    Sync,
    /// Notifications flushed to the host UI.
    Notify,
}

/// Chain the annotation sets in `Update`. Safe to call from several plugins.
pub fn configure_annotation_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            AnnotationSet::Input,
            AnnotationSet::Picking,
            AnnotationSet::Authoring,
            AnnotationSet::Registry,
            AnnotationSet::Sync,
            AnnotationSet::Notify,
        )
            .chain(),
    );
}
