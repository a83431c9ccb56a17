use std::time::Duration;

use bevy::prelude::*;

use super::marker_registry::{MarkerRegistry, RefreshOutcome};
use super::{RegistryRefreshFailed, RegistryRefreshed, SurfaceVisibilityChanged};
use crate::config::AnnotationConfig;
use crate::gateway::worker::PendingCall;
use crate::gateway::{GatewayError, InventoryRecord, SharedGateway};

/// What one frame of the refresh schedule asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Nothing due this frame.
    Idle,
    /// Start a refresh now.
    Fire,
    /// A periodic tick landed while a fetch is in flight and was dropped.
    Skipped,
}

/// Fixed-period refresh timer with an in-flight guard.
///
/// Polling fires once immediately on [`start`](Self::start) and then every
/// period. At most one fetch is in flight; periodic ticks that land while one
/// is outstanding are skipped rather than queued. An immediate request made
/// during a fetch stays pending and fires as soon as that fetch is applied.
/// Stopping cancels future ticks only, a fetch already in flight still
/// completes and is applied.
#[derive(Resource, Debug, Default)]
pub struct RefreshSchedule {
    timer: Option<Timer>,
    immediate: bool,
    in_flight: bool,
    skipped_ticks: u64,
}

impl RefreshSchedule {
    pub fn start(&mut self, period: Duration) {
        self.timer = Some(Timer::new(period, TimerMode::Repeating));
        self.immediate = true;
    }

    pub fn stop(&mut self) {
        self.timer = None;
        self.immediate = false;
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.timer.as_ref().map(Timer::duration)
    }

    /// Ask for a refresh on the next tick, outside the periodic cadence.
    pub fn request_immediate(&mut self) {
        self.immediate = true;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    pub fn tick(&mut self, delta: Duration) -> TickDecision {
        let periodic = match self.timer.as_mut() {
            Some(timer) => timer.tick(delta).just_finished(),
            None => false,
        };

        if self.in_flight {
            if periodic {
                self.skipped_ticks += 1;
                return TickDecision::Skipped;
            }
            return TickDecision::Idle;
        }

        if periodic | std::mem::take(&mut self.immediate) {
            TickDecision::Fire
        } else {
            TickDecision::Idle
        }
    }

    /// Mark a fetch as started.
    pub fn begin(&mut self) {
        self.in_flight = true;
    }

    /// Mark the outstanding fetch as applied.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}

/// Outstanding inventory fetch.
#[derive(Component)]
pub struct RefreshTask(pub PendingCall<Vec<InventoryRecord>>);

/// Start polling as soon as the app comes up; the surface starts visible.
pub fn start_polling(config: Res<AnnotationConfig>, mut schedule: ResMut<RefreshSchedule>) {
    info!(
        "Starting inventory polling every {:.1}s",
        config.poll_interval.as_secs_f32()
    );
    schedule.start(config.poll_interval);
}

pub fn drive_registry_refresh(
    mut commands: Commands,
    time: Res<Time>,
    gateway: Res<SharedGateway>,
    mut schedule: ResMut<RefreshSchedule>,
) {
    match schedule.tick(time.delta()) {
        TickDecision::Idle => {}
        TickDecision::Skipped => {
            debug!("Registry refresh still in flight, skipping tick");
        }
        TickDecision::Fire => {
            schedule.begin();
            let gateway = gateway.handle();
            let call = PendingCall::spawn("inventory-refresh", move || gateway.list_inventory());
            commands.spawn((Name::new("Registry Refresh"), RefreshTask(call)));
        }
    }
}

pub fn apply_refresh_results(
    mut commands: Commands,
    tasks: Query<(Entity, &RefreshTask)>,
    mut registry: ResMut<MarkerRegistry>,
    mut schedule: ResMut<RefreshSchedule>,
    mut refreshed: EventWriter<RegistryRefreshed>,
    mut failed: EventWriter<RegistryRefreshFailed>,
) {
    for (entity, task) in &tasks {
        let Some(response) = task.0.poll() else {
            continue;
        };
        commands.entity(entity).despawn();
        schedule.finish();

        match registry.apply_refresh(response) {
            RefreshOutcome::Replaced { count, generation } => {
                debug!("Registry replaced: {} records (generation {})", count, generation);
                refreshed.write(RegistryRefreshed { generation, count });
            }
            RefreshOutcome::Retained { error } => {
                log_refresh_failure(&error);
                failed.write(RegistryRefreshFailed { error });
            }
        }
    }
}

fn log_refresh_failure(error: &GatewayError) {
    match error {
        GatewayError::Malformed(_) => error!("Inventory refresh failed, keeping markers: {}", error),
        _ => warn!("Inventory refresh failed, keeping markers: {}", error),
    }
}

pub fn apply_surface_visibility(
    mut events: EventReader<SurfaceVisibilityChanged>,
    config: Res<AnnotationConfig>,
    mut schedule: ResMut<RefreshSchedule>,
) {
    for event in events.read() {
        match (event.visible, schedule.is_polling()) {
            (true, false) => {
                info!("Annotation surface visible, resuming polling");
                schedule.start(config.poll_interval);
            }
            (false, true) => {
                info!("Annotation surface hidden, stopping polling");
                schedule.stop();
            }
            _ => {}
        }
    }
}

/// Window occlusion is the native signal for the surface being hidden.
pub fn forward_window_occlusion(
    mut occlusions: EventReader<bevy::window::WindowOccluded>,
    mut visibility: EventWriter<SurfaceVisibilityChanged>,
) {
    for event in occlusions.read() {
        visibility.write(SurfaceVisibilityChanged {
            visible: !event.occluded,
        });
    }
}
