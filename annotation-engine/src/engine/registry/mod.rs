//! Polled local copy of the remote inventory.
//!
//! ```text
//! RefreshSchedule::tick ──Fire──> worker thread: gateway.list_inventory()
//!        │                                   │
//!        └─Skipped (fetch in flight)         v
//!                                  apply_refresh_results (main schedule)
//!                                    ├─ Ok  -> MarkerRegistry replaced, RegistryRefreshed
//!                                    └─ Err -> previous set kept, RegistryRefreshFailed
//! ```

use bevy::prelude::*;

use crate::config::AnnotationConfig;
use crate::engine::core::sets::{AnnotationSet, configure_annotation_sets};
use crate::gateway::GatewayError;

/// Authoritative record snapshot and its marker projection.
pub mod marker_registry;

/// Refresh timer, in-flight guard and the systems driving fetches.
pub mod polling;

pub use marker_registry::{Marker, MarkerRegistry, RefreshOutcome};
pub use polling::{RefreshSchedule, TickDecision};

/// A refresh replaced the record set.
#[derive(Event, Debug, Clone, Copy)]
pub struct RegistryRefreshed {
    pub generation: u64,
    pub count: usize,
}

/// A refresh failed; the previous record set is still shown.
#[derive(Event, Debug, Clone)]
pub struct RegistryRefreshFailed {
    pub error: GatewayError,
}

/// The consuming surface was shown or hidden. Polling follows it.
#[derive(Event, Debug, Clone, Copy)]
pub struct SurfaceVisibilityChanged {
    pub visible: bool,
}

pub struct MarkerRegistryPlugin;

impl Plugin for MarkerRegistryPlugin {
    fn build(&self, app: &mut App) {
        configure_annotation_sets(app);

        app.init_resource::<AnnotationConfig>()
            .init_resource::<MarkerRegistry>()
            .init_resource::<RefreshSchedule>()
            .add_event::<RegistryRefreshed>()
            .add_event::<RegistryRefreshFailed>()
            .add_event::<SurfaceVisibilityChanged>()
            .add_systems(Startup, polling::start_polling)
            .add_systems(
                Update,
                (
                    polling::apply_surface_visibility,
                    polling::drive_registry_refresh,
                    polling::apply_refresh_results,
                )
                    .chain()
                    .in_set(AnnotationSet::Registry),
            );
    }
}
