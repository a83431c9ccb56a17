use std::collections::{HashMap, HashSet};

use bevy::prelude::*;
use constants::marker::{MARKER_COLOUR, MARKER_PICK_PADDING, MARKER_POSITION_EPSILON, MARKER_RADIUS};

use crate::engine::core::sets::{AnnotationSet, configure_annotation_sets};
use crate::engine::registry::{Marker, MarkerRegistry};
use crate::gateway::RecordId;
use crate::tools::authoring::RecordIdAcquired;

/// Scene node standing for one inventory record.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerNode {
    pub record_id: RecordId,
}

/// Full extents of the box taps are tested against.
#[derive(Component, Debug, Clone, Copy)]
pub struct MarkerBounds(pub Vec3);

/// Size and colour of marker nodes; the scene manifest may override it.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub radius: f32,
    pub pick_padding: f32,
    pub colour: [f32; 3],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: MARKER_RADIUS,
            pick_padding: MARKER_PICK_PADDING,
            colour: MARKER_COLOUR,
        }
    }
}

impl MarkerStyle {
    pub fn pick_extents(&self) -> Vec3 {
        Vec3::splat((self.radius + self.pick_padding) * 2.0)
    }
}

/// Shared render handles for marker nodes.
#[derive(Resource, Clone)]
pub struct MarkerAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

/// The marker set on screen changed.
#[derive(Event, Debug, Clone, Default, PartialEq)]
pub struct MarkersChanged {
    pub added: Vec<RecordId>,
    pub removed: Vec<RecordId>,
    pub moved: Vec<RecordId>,
    pub generation: u64,
}

/// Node edits that bring the scene in line with a registry snapshot.
#[derive(Debug, Default, PartialEq)]
pub struct MarkerSyncPlan {
    pub spawn: Vec<Marker>,
    pub despawn: Vec<(Entity, RecordId)>,
    pub relocate: Vec<(Entity, Marker)>,
}

impl MarkerSyncPlan {
    pub fn is_empty(&self) -> bool {
        self.spawn.is_empty() && self.despawn.is_empty() && self.relocate.is_empty()
    }
}

/// Diff existing nodes against the snapshot markers.
///
/// Nodes for records no longer listed are removed, as is any second node for
/// the same record. Nodes whose record moved are relocated in place. Records
/// without a node get one, in snapshot order. Everything else is untouched.
pub fn plan_marker_sync(
    existing: impl IntoIterator<Item = (Entity, RecordId, Vec3)>,
    markers: impl IntoIterator<Item = Marker>,
) -> MarkerSyncPlan {
    let markers: Vec<Marker> = markers.into_iter().collect();
    let wanted: HashMap<RecordId, Vec3> =
        markers.iter().map(|m| (m.record_id, m.position)).collect();

    let mut plan = MarkerSyncPlan::default();
    let mut present: HashSet<RecordId> = HashSet::new();

    for (entity, record_id, position) in existing {
        let Some(&target) = wanted.get(&record_id) else {
            plan.despawn.push((entity, record_id));
            continue;
        };
        if !present.insert(record_id) {
            plan.despawn.push((entity, record_id));
            continue;
        }
        if position.distance(target) > MARKER_POSITION_EPSILON {
            plan.relocate.push((
                entity,
                Marker {
                    record_id,
                    position: target,
                },
            ));
        }
    }

    for marker in markers {
        if present.insert(marker.record_id) {
            plan.spawn.push(marker);
        }
    }

    plan
}

/// Reconcile marker nodes after a registry refresh or an id acquisition.
pub fn sync_marker_nodes(
    mut commands: Commands,
    registry: Res<MarkerRegistry>,
    style: Res<MarkerStyle>,
    mut acquired: EventReader<RecordIdAcquired>,
    mut nodes: Query<(Entity, &MarkerNode, &mut Transform)>,
    mut changed: EventWriter<MarkersChanged>,
) {
    let acquired_id = acquired.read().count() > 0;
    if !registry.is_changed() && !acquired_id {
        return;
    }

    let plan = plan_marker_sync(
        nodes
            .iter()
            .map(|(entity, node, transform)| (entity, node.record_id, transform.translation)),
        registry.markers(),
    );
    if plan.is_empty() {
        return;
    }

    let mut event = MarkersChanged {
        generation: registry.generation(),
        ..default()
    };

    for (entity, record_id) in plan.despawn {
        commands.entity(entity).despawn();
        event.removed.push(record_id);
    }

    for (entity, marker) in plan.relocate {
        if let Ok((_, _, mut transform)) = nodes.get_mut(entity) {
            transform.translation = marker.position;
            event.moved.push(marker.record_id);
        }
    }

    for marker in plan.spawn {
        commands.spawn((
            Name::new(format!("Marker {}", marker.record_id)),
            MarkerNode {
                record_id: marker.record_id,
            },
            MarkerBounds(style.pick_extents()),
            Transform::from_translation(marker.position),
            Visibility::default(),
        ));
        event.added.push(marker.record_id);
    }

    info!(
        "Markers synced: +{} -{} ~{}",
        event.added.len(),
        event.removed.len(),
        event.moved.len()
    );
    changed.write(event);
}

/// Build the shared sphere mesh and material whenever the style changes.
pub fn refresh_marker_assets(
    mut commands: Commands,
    style: Res<MarkerStyle>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut nodes: Query<(Entity, &mut MarkerBounds), With<MarkerNode>>,
) {
    if !style.is_changed() {
        return;
    }

    let [r, g, b] = style.colour;
    let assets = MarkerAssets {
        mesh: meshes.add(Sphere::new(style.radius)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(r, g, b),
            emissive: LinearRgba::new(r * 0.4, g * 0.4, b * 0.4, 1.0),
            ..default()
        }),
    };

    for (entity, mut bounds) in &mut nodes {
        bounds.0 = style.pick_extents();
        commands.entity(entity).insert((
            Mesh3d(assets.mesh.clone()),
            MeshMaterial3d(assets.material.clone()),
        ));
    }
    commands.insert_resource(assets);
}

pub fn attach_marker_meshes(
    mut commands: Commands,
    assets: Option<Res<MarkerAssets>>,
    nodes: Query<Entity, (With<MarkerNode>, Without<Mesh3d>)>,
) {
    let Some(assets) = assets else {
        return;
    };
    for entity in &nodes {
        commands.entity(entity).insert((
            Mesh3d(assets.mesh.clone()),
            MeshMaterial3d(assets.material.clone()),
        ));
    }
}

pub struct MarkerSyncPlugin;

impl Plugin for MarkerSyncPlugin {
    fn build(&self, app: &mut App) {
        configure_annotation_sets(app);

        app.init_resource::<MarkerRegistry>()
            .init_resource::<MarkerStyle>()
            .add_event::<RecordIdAcquired>()
            .add_event::<MarkersChanged>()
            .add_systems(Update, sync_marker_nodes.in_set(AnnotationSet::Sync));

        // Meshes only exist when rendering is present.
        if app.world().contains_resource::<Assets<StandardMaterial>>() {
            app.add_systems(
                Update,
                (refresh_marker_assets, attach_marker_meshes)
                    .chain()
                    .after(sync_marker_nodes)
                    .in_set(AnnotationSet::Sync),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(record_id: RecordId, x: f32) -> Marker {
        Marker {
            record_id,
            position: Vec3::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn growing_snapshot_spawns_only_the_new_record() {
        let node_1 = Entity::from_raw(10);
        let plan = plan_marker_sync(
            [(node_1, 1, Vec3::ZERO)],
            [marker(1, 0.0), marker(2, 1.0)],
        );

        assert_eq!(plan.spawn, vec![marker(2, 1.0)]);
        assert!(plan.despawn.is_empty());
        assert!(plan.relocate.is_empty());
    }

    #[test]
    fn missing_and_duplicate_nodes_are_removed() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let c = Entity::from_raw(3);
        let plan = plan_marker_sync(
            [(a, 1, Vec3::ZERO), (b, 1, Vec3::ZERO), (c, 3, Vec3::ZERO)],
            [marker(1, 0.0)],
        );

        assert_eq!(plan.despawn, vec![(b, 1), (c, 3)]);
        assert!(plan.spawn.is_empty());
    }

    #[test]
    fn moved_record_relocates_its_node() {
        let a = Entity::from_raw(1);
        let plan = plan_marker_sync([(a, 1, Vec3::ZERO)], [marker(1, 2.0)]);

        assert_eq!(plan.relocate, vec![(a, marker(1, 2.0))]);
        assert!(plan.spawn.is_empty() && plan.despawn.is_empty());
    }

    #[test]
    fn identical_snapshot_needs_no_edits() {
        let a = Entity::from_raw(1);
        let plan = plan_marker_sync([(a, 1, Vec3::new(0.00001, 0.0, 0.0))], [marker(1, 0.0)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn empty_snapshot_clears_the_scene() {
        let plan = plan_marker_sync(
            [(Entity::from_raw(1), 1, Vec3::ZERO), (Entity::from_raw(2), 2, Vec3::X)],
            Vec::<Marker>::new(),
        );
        assert_eq!(plan.despawn.len(), 2);
    }
}
