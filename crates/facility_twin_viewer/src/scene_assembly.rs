use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use facility_twin::assembly::{PartCatalog, PartSpec};
use facility_twin::geometry::Point3;
use facility_twin::telemetry::MetricKind;

use super::BaseScale;

pub(super) const FLAME_SEGMENTS: usize = 6;
const FLAME_SEGMENT_HEIGHT: f32 = 0.5;
const FLARE_TIP_HEIGHT: f32 = 9.8;

pub(super) fn to_vec3(point: Point3) -> Vec3 {
    Vec3::new(point.x, point.y, point.z)
}

pub(super) fn to_point(vec: Vec3) -> Point3 {
    Point3::new(vec.x, vec.y, vec.z)
}

/// Root marker for one selectable assembly part.
#[derive(Component)]
pub(super) struct PartRoot {
    pub key: String,
}

/// Local-space bounds of one part, relative to its root.
#[derive(Clone, Copy, Debug)]
pub(super) struct PartBounds {
    pub center: Vec3,
    pub half_extents: Vec3,
}

/// Continuously rotating equipment driven by a live metric.
#[derive(Component)]
pub(super) struct SpinRotor {
    pub axis: Vec3,
    pub base_rate: f32,
    pub gain: f32,
    pub cap: f32,
    pub metric: MetricKind,
}

#[derive(Component)]
pub(super) struct PumpCrank;

#[derive(Component)]
pub(super) struct PumpBeam;

#[derive(Component)]
pub(super) struct PumpPitman;

#[derive(Component)]
pub(super) struct PumpRod;

/// Undisturbed local translation of an articulated node; the kinematics
/// systems offset from this instead of accumulating into the transform.
#[derive(Component, Copy, Clone)]
pub(super) struct RestTranslation(pub Vec3);

/// One stacked slice of the flare flame column.
#[derive(Component)]
pub(super) struct FlameSegment {
    pub height_frac: f32,
}

#[derive(Component)]
pub(super) struct FlameGlow;

/// World-space spawn point for flare vapor puffs.
#[derive(Component)]
pub(super) struct PuffEmitter;

#[derive(Resource)]
pub(super) struct PuffAssets {
    pub mesh: Handle<Mesh>,
}

/// Maps part keys to scene entities and bounds; owns the assembly catalog
/// the explode machine runs against. Insertion order is display order.
#[derive(Resource, Default)]
pub(super) struct PartRegistry {
    pub catalog: PartCatalog,
    roots: HashMap<String, Entity>,
    bounds: HashMap<String, PartBounds>,
}

impl PartRegistry {
    pub fn register(&mut self, spec: PartSpec, entity: Entity, bounds: PartBounds) {
        self.roots.insert(spec.key.clone(), entity);
        self.bounds.insert(spec.key.clone(), bounds);
        self.catalog.push(spec);
    }

    pub fn root_of(&self, key: &str) -> Option<Entity> {
        self.roots.get(key).copied()
    }

    pub fn bounds_of(&self, key: &str) -> Option<PartBounds> {
        self.bounds.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.catalog.iter().map(|spec| spec.key.as_str())
    }
}

struct PartSite {
    key: &'static str,
    position: Vec3,
    exploded_offset: Vec3,
}

const SITES: [PartSite; 9] = [
    PartSite {
        key: "wellhead-trees",
        position: Vec3::new(-16.0, 0.0, -7.0),
        exploded_offset: Vec3::new(-9.0, 4.5, -4.0),
    },
    PartSite {
        key: "manifold",
        position: Vec3::new(-9.0, 0.0, -3.0),
        exploded_offset: Vec3::new(-5.0, 3.5, -2.0),
    },
    PartSite {
        key: "separator",
        position: Vec3::new(-1.0, 0.0, -5.0),
        exploded_offset: Vec3::new(-1.0, 5.0, -7.0),
    },
    PartSite {
        key: "knockout-drum",
        position: Vec3::new(4.0, 0.0, -9.0),
        exploded_offset: Vec3::new(3.0, 4.0, -7.0),
    },
    PartSite {
        key: "vapor-recovery",
        position: Vec3::new(6.0, 0.0, 2.0),
        exploded_offset: Vec3::new(4.0, 3.5, 3.0),
    },
    PartSite {
        key: "tank-cluster",
        position: Vec3::new(-3.0, 0.0, 7.0),
        exploded_offset: Vec3::new(-2.0, 4.5, 6.0),
    },
    PartSite {
        key: "pumpjack",
        position: Vec3::new(-13.0, 0.0, 6.0),
        exploded_offset: Vec3::new(-8.0, 5.0, 5.0),
    },
    PartSite {
        key: "flare-stack",
        position: Vec3::new(14.0, 0.0, -10.0),
        exploded_offset: Vec3::new(9.0, 6.0, -7.0),
    },
    PartSite {
        key: "pipelines",
        position: Vec3::ZERO,
        exploded_offset: Vec3::new(0.0, 10.0, 0.0),
    },
];

pub(super) fn setup_facility_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<PartRegistry>,
) {
    commands.insert_resource(PuffAssets {
        mesh: meshes.add(Sphere::new(0.3)),
    });

    for site in SITES.iter() {
        let (entity, bounds) = match site.key {
            "wellhead-trees" => spawn_wellhead_trees(&mut commands, &mut meshes, &mut materials, site),
            "manifold" => spawn_manifold(&mut commands, &mut meshes, &mut materials, site),
            "separator" => spawn_separator(&mut commands, &mut meshes, &mut materials, site),
            "knockout-drum" => spawn_knockout_drum(&mut commands, &mut meshes, &mut materials, site),
            "vapor-recovery" => spawn_vapor_recovery(&mut commands, &mut meshes, &mut materials, site),
            "tank-cluster" => spawn_tank_cluster(&mut commands, &mut meshes, &mut materials, site),
            "pumpjack" => spawn_pumpjack(&mut commands, &mut meshes, &mut materials, site),
            "flare-stack" => spawn_flare_stack(&mut commands, &mut meshes, &mut materials, site),
            _ => spawn_pipelines(&mut commands, &mut meshes, &mut materials, site),
        };
        registry.register(
            PartSpec {
                key: site.key.to_string(),
                final_position: to_point(site.position),
                exploded_position: to_point(site.position + site.exploded_offset),
            },
            entity,
            bounds,
        );
    }
}

fn part_root(commands: &mut Commands, site: &PartSite) -> Entity {
    commands
        .spawn((
            PartRoot {
                key: site.key.to_string(),
            },
            Transform::from_translation(site.position),
            Visibility::default(),
            BaseScale(Vec3::ONE),
            Name::new(site.key),
        ))
        .id()
}

// Every part gets its own material instances so focus-highlight edits on one
// part can never bleed into another.
fn painted_steel(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        perceptual_roughness: 0.55,
        metallic: 0.35,
        ..default()
    }
}

fn piping() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgb(0.55, 0.56, 0.6),
        perceptual_roughness: 0.4,
        metallic: 0.7,
        ..default()
    }
}

fn x_axis_pipe() -> Quat {
    Quat::from_rotation_z(FRAC_PI_2)
}

fn z_axis_pipe() -> Quat {
    Quat::from_rotation_x(FRAC_PI_2)
}

fn spawn_wellhead_trees(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let casing = meshes.add(Cylinder::new(0.18, 1.0));
    let body = meshes.add(Cylinder::new(0.14, 1.4));
    let arm = meshes.add(Cuboid::new(1.0, 0.16, 0.16));
    let wheel = meshes.add(Cylinder::new(0.22, 0.06));
    let cap = meshes.add(Sphere::new(0.15));
    let green = materials.add(painted_steel(Color::srgb(0.2, 0.45, 0.3)));
    let red = materials.add(painted_steel(Color::srgb(0.6, 0.16, 0.14)));
    let steel = materials.add(piping());

    commands.entity(root).with_children(|parent| {
        for tree_x in [-1.6_f32, 0.0, 1.6] {
            parent.spawn((
                Mesh3d(casing.clone()),
                MeshMaterial3d(steel.clone()),
                Transform::from_xyz(tree_x, 0.5, 0.0),
            ));
            parent.spawn((
                Mesh3d(body.clone()),
                MeshMaterial3d(green.clone()),
                Transform::from_xyz(tree_x, 1.7, 0.0),
            ));
            parent.spawn((
                Mesh3d(arm.clone()),
                MeshMaterial3d(green.clone()),
                Transform::from_xyz(tree_x, 1.9, 0.0),
            ));
            for wing in [-0.5_f32, 0.5] {
                parent.spawn((
                    Mesh3d(wheel.clone()),
                    MeshMaterial3d(red.clone()),
                    Transform::from_xyz(tree_x + wing, 1.9, 0.0).with_rotation(x_axis_pipe()),
                ));
            }
            parent.spawn((
                Mesh3d(cap.clone()),
                MeshMaterial3d(red.clone()),
                Transform::from_xyz(tree_x, 2.5, 0.0),
            ));
        }
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 1.3, 0.0),
            half_extents: Vec3::new(2.3, 1.4, 0.6),
        },
    )
}

fn spawn_manifold(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let skid = meshes.add(Cuboid::new(4.6, 0.2, 1.6));
    let header = meshes.add(Cylinder::new(0.16, 3.8));
    let valve_body = meshes.add(Cuboid::new(0.35, 0.35, 0.35));
    let handwheel = meshes.add(Cylinder::new(0.25, 0.06));
    let pump_housing = meshes.add(Cuboid::new(0.7, 0.5, 0.5));
    let impeller = meshes.add(Cylinder::new(0.3, 0.08));
    let grey = materials.add(painted_steel(Color::srgb(0.5, 0.5, 0.52)));
    let blue = materials.add(painted_steel(Color::srgb(0.2, 0.32, 0.55)));
    let pipe = materials.add(piping());

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(skid),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.0, 0.1, 0.0),
        ));
        parent.spawn((
            Mesh3d(header),
            MeshMaterial3d(pipe.clone()),
            Transform::from_xyz(-0.3, 0.7, 0.0).with_rotation(x_axis_pipe()),
        ));
        for valve_x in [-1.5_f32, -0.3, 0.9] {
            parent.spawn((
                Mesh3d(valve_body.clone()),
                MeshMaterial3d(blue.clone()),
                Transform::from_xyz(valve_x, 0.7, 0.0),
            ));
            parent.spawn((
                Mesh3d(handwheel.clone()),
                MeshMaterial3d(blue.clone()),
                Transform::from_xyz(valve_x, 1.05, 0.0),
            ));
        }
        parent.spawn((
            Mesh3d(pump_housing),
            MeshMaterial3d(blue.clone()),
            Transform::from_xyz(1.6, 0.45, 0.55),
        ));
        parent.spawn((
            Mesh3d(impeller),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(2.05, 0.45, 0.55).with_rotation(x_axis_pipe()),
            SpinRotor {
                axis: Vec3::X,
                base_rate: 0.8,
                gain: 0.008,
                cap: 600.0,
                metric: MetricKind::OilRate,
            },
            Name::new("transfer-pump-impeller"),
        ));
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 0.6, 0.1),
            half_extents: Vec3::new(2.4, 0.7, 1.0),
        },
    )
}

fn spawn_separator(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let saddle = meshes.add(Cuboid::new(0.5, 0.7, 1.6));
    let shell = meshes.add(Cylinder::new(0.9, 4.6));
    let head = meshes.add(Sphere::new(0.9));
    let riser = meshes.add(Cylinder::new(0.12, 1.2));
    let outlet = meshes.add(Cylinder::new(0.1, 0.9));
    let gauge = meshes.add(Sphere::new(0.12));
    let tan = materials.add(painted_steel(Color::srgb(0.73, 0.68, 0.55)));
    let grey = materials.add(painted_steel(Color::srgb(0.45, 0.45, 0.48)));
    let pipe = materials.add(piping());

    commands.entity(root).with_children(|parent| {
        for saddle_x in [-1.4_f32, 1.4] {
            parent.spawn((
                Mesh3d(saddle.clone()),
                MeshMaterial3d(grey.clone()),
                Transform::from_xyz(saddle_x, 0.35, 0.0),
            ));
        }
        parent.spawn((
            Mesh3d(shell),
            MeshMaterial3d(tan.clone()),
            Transform::from_xyz(0.0, 1.5, 0.0).with_rotation(x_axis_pipe()),
        ));
        for head_x in [-2.3_f32, 2.3] {
            parent.spawn((
                Mesh3d(head.clone()),
                MeshMaterial3d(tan.clone()),
                Transform::from_xyz(head_x, 1.5, 0.0),
            ));
        }
        parent.spawn((
            Mesh3d(riser),
            MeshMaterial3d(pipe.clone()),
            Transform::from_xyz(-2.0, 2.4, 0.0),
        ));
        parent.spawn((
            Mesh3d(outlet),
            MeshMaterial3d(pipe.clone()),
            Transform::from_xyz(0.0, 2.6, 0.0),
        ));
        parent.spawn((
            Mesh3d(gauge),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(1.2, 2.45, 0.0),
        ));
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 1.5, 0.0),
            half_extents: Vec3::new(3.2, 1.4, 1.0),
        },
    )
}

fn spawn_knockout_drum(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let vessel = meshes.add(Cylinder::new(0.55, 2.4));
    let boot = meshes.add(Cylinder::new(0.25, 0.5));
    let leg = meshes.add(Cuboid::new(0.12, 0.8, 0.12));
    let inlet = meshes.add(Cylinder::new(0.1, 1.2));
    let shell = materials.add(painted_steel(Color::srgb(0.62, 0.6, 0.58)));
    let pipe = materials.add(piping());

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(vessel),
            MeshMaterial3d(shell.clone()),
            Transform::from_xyz(0.0, 1.6, 0.0),
        ));
        parent.spawn((
            Mesh3d(boot),
            MeshMaterial3d(shell.clone()),
            Transform::from_xyz(0.0, 0.25, 0.0),
        ));
        for angle in [0.0_f32, 2.094, 4.189] {
            parent.spawn((
                Mesh3d(leg.clone()),
                MeshMaterial3d(pipe.clone()),
                Transform::from_xyz(angle.cos() * 0.5, 0.4, angle.sin() * 0.5),
            ));
        }
        parent.spawn((
            Mesh3d(inlet),
            MeshMaterial3d(pipe.clone()),
            Transform::from_xyz(-0.8, 2.2, 0.0).with_rotation(x_axis_pipe()),
        ));
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 1.4, 0.0),
            half_extents: Vec3::new(1.0, 1.5, 0.8),
        },
    )
}

fn spawn_vapor_recovery(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let skid = meshes.add(Cuboid::new(3.0, 0.2, 2.0));
    let compressor = meshes.add(Cuboid::new(1.2, 0.8, 0.9));
    let motor = meshes.add(Cylinder::new(0.3, 0.8));
    let scrubber = meshes.add(Cylinder::new(0.3, 1.6));
    let fan_housing = meshes.add(Cylinder::new(0.55, 0.18));
    let fan_disk = meshes.add(Cylinder::new(0.45, 0.06));
    let grey = materials.add(painted_steel(Color::srgb(0.5, 0.5, 0.52)));
    let yellow = materials.add(painted_steel(Color::srgb(0.75, 0.6, 0.15)));
    let pipe = materials.add(piping());

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(skid),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.0, 0.1, 0.0),
        ));
        parent.spawn((
            Mesh3d(compressor),
            MeshMaterial3d(yellow.clone()),
            Transform::from_xyz(-0.6, 0.6, 0.0),
        ));
        parent.spawn((
            Mesh3d(motor),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.6, 0.6, 0.0).with_rotation(x_axis_pipe()),
        ));
        parent.spawn((
            Mesh3d(scrubber),
            MeshMaterial3d(pipe.clone()),
            Transform::from_xyz(1.1, 1.0, -0.6),
        ));
        parent.spawn((
            Mesh3d(fan_housing),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(-0.9, 1.0, 0.75).with_rotation(z_axis_pipe()),
        ));
        parent.spawn((
            Mesh3d(fan_disk),
            MeshMaterial3d(yellow.clone()),
            Transform::from_xyz(-0.9, 1.0, 0.82).with_rotation(z_axis_pipe()),
            SpinRotor {
                axis: Vec3::Z,
                base_rate: 2.0,
                gain: 0.05,
                cap: 240.0,
                metric: MetricKind::RecoveredVaporRate,
            },
            Name::new("vru-cooler-fan"),
        ));
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 0.8, 0.0),
            half_extents: Vec3::new(1.7, 1.0, 1.2),
        },
    )
}

fn spawn_tank_cluster(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let shell = meshes.add(Cylinder::new(1.1, 2.6));
    let roof = meshes.add(Cylinder::new(1.12, 0.15));
    let manway = meshes.add(Cylinder::new(0.18, 0.1));
    let walkway = meshes.add(Cuboid::new(3.4, 0.1, 0.5));
    let beige = materials.add(painted_steel(Color::srgb(0.78, 0.74, 0.64)));
    let grey = materials.add(painted_steel(Color::srgb(0.45, 0.45, 0.48)));

    commands.entity(root).with_children(|parent| {
        for tank in [
            Vec3::new(-1.4, 0.0, -0.8),
            Vec3::new(1.4, 0.0, -0.8),
            Vec3::new(0.0, 0.0, 1.2),
        ] {
            parent.spawn((
                Mesh3d(shell.clone()),
                MeshMaterial3d(beige.clone()),
                Transform::from_translation(tank + Vec3::new(0.0, 1.3, 0.0)),
            ));
            parent.spawn((
                Mesh3d(roof.clone()),
                MeshMaterial3d(grey.clone()),
                Transform::from_translation(tank + Vec3::new(0.0, 2.67, 0.0)),
            ));
            parent.spawn((
                Mesh3d(manway.clone()),
                MeshMaterial3d(grey.clone()),
                Transform::from_translation(tank + Vec3::new(0.0, 0.6, 1.05))
                    .with_rotation(z_axis_pipe()),
            ));
        }
        parent.spawn((
            Mesh3d(walkway),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.0, 2.8, -0.8),
        ));
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 1.4, 0.2),
            half_extents: Vec3::new(2.6, 1.5, 2.4),
        },
    )
}

fn spawn_pumpjack(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let skid = meshes.add(Cuboid::new(4.4, 0.25, 1.6));
    let gearbox = meshes.add(Cuboid::new(1.0, 0.8, 1.2));
    let motor = meshes.add(Cuboid::new(0.6, 0.5, 0.7));
    let post = meshes.add(Cuboid::new(0.6, 3.4, 0.9));
    let crank_disk = meshes.add(Cylinder::new(1.0, 0.12));
    let counterweight = meshes.add(Cuboid::new(0.5, 0.6, 0.14));
    let beam = meshes.add(Cuboid::new(4.6, 0.3, 0.35));
    let horsehead = meshes.add(Cuboid::new(0.5, 1.0, 0.5));
    let pitman_arm = meshes.add(Cuboid::new(0.15, 2.6, 0.15));
    let rod = meshes.add(Cylinder::new(0.06, 2.4));
    let orange = materials.add(painted_steel(Color::srgb(0.75, 0.38, 0.12)));
    let grey = materials.add(painted_steel(Color::srgb(0.45, 0.45, 0.48)));
    let dark = materials.add(painted_steel(Color::srgb(0.2, 0.2, 0.22)));

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(skid),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.0, 0.12, 0.0),
        ));
        parent.spawn((
            Mesh3d(gearbox),
            MeshMaterial3d(dark.clone()),
            Transform::from_xyz(-2.1, 0.65, 0.0),
        ));
        parent.spawn((
            Mesh3d(motor),
            MeshMaterial3d(dark.clone()),
            Transform::from_xyz(-3.0, 0.45, 0.0),
        ));
        parent.spawn((
            Mesh3d(post),
            MeshMaterial3d(orange.clone()),
            Transform::from_xyz(-0.4, 1.7, 0.0),
        ));

        // The cranks rotate about the gearbox's Z axis; the counterweight
        // rides opposite the crank pin.
        for crank_z in [-0.85_f32, 0.85] {
            parent
                .spawn((
                    PumpCrank,
                    RestTranslation(Vec3::new(-2.1, 0.65, crank_z)),
                    Transform::from_xyz(-2.1, 0.65, crank_z),
                    Visibility::default(),
                ))
                .with_children(|crank| {
                    crank.spawn((
                        Mesh3d(crank_disk.clone()),
                        MeshMaterial3d(orange.clone()),
                        Transform::from_rotation(z_axis_pipe()),
                    ));
                    crank.spawn((
                        Mesh3d(counterweight.clone()),
                        MeshMaterial3d(dark.clone()),
                        Transform::from_xyz(0.0, -0.65, 0.0),
                    ));
                });
        }

        parent
            .spawn((
                PumpBeam,
                RestTranslation(Vec3::new(-0.4, 3.4, 0.0)),
                Transform::from_xyz(-0.4, 3.4, 0.0),
                Visibility::default(),
            ))
            .with_children(|walking_beam| {
                walking_beam.spawn((
                    Mesh3d(beam),
                    MeshMaterial3d(orange.clone()),
                    Transform::from_xyz(0.6, 0.0, 0.0),
                ));
                walking_beam.spawn((
                    Mesh3d(horsehead),
                    MeshMaterial3d(orange.clone()),
                    Transform::from_xyz(2.9, -0.2, 0.0),
                ));
            });

        parent
            .spawn((
                PumpPitman,
                RestTranslation(Vec3::new(-2.1, 0.65, 0.0)),
                Transform::from_xyz(-2.1, 0.65, 0.0),
                Visibility::default(),
            ))
            .with_children(|pitman| {
                pitman.spawn((
                    Mesh3d(pitman_arm),
                    MeshMaterial3d(grey.clone()),
                    Transform::from_xyz(0.0, 1.3, 0.0),
                ));
            });

        // Polished rod hangs under the horsehead (beam pivot -0.4 plus the
        // 2.9 forward reach of the beam).
        parent.spawn((
            PumpRod,
            RestTranslation(Vec3::new(2.5, 1.6, 0.0)),
            Mesh3d(rod),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(2.5, 1.6, 0.0),
        ));
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.3, 1.9, 0.0),
            half_extents: Vec3::new(2.9, 2.4, 1.2),
        },
    )
}

fn spawn_flare_stack(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let pad = meshes.add(Cuboid::new(1.6, 0.3, 1.6));
    let riser = meshes.add(Cylinder::new(0.32, 9.0));
    let support = meshes.add(Cylinder::new(0.08, 5.0));
    let collar = meshes.add(Cylinder::new(0.45, 0.5));
    let flame_slice = meshes.add(Cylinder::new(1.0, FLAME_SEGMENT_HEIGHT));
    let glow_quad = meshes.add(Rectangle::new(2.6, 3.4));
    let grey = materials.add(painted_steel(Color::srgb(0.48, 0.48, 0.5)));
    let pipe = materials.add(piping());
    let glow_material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 0.55, 0.2, 0.3),
        unlit: true,
        alpha_mode: AlphaMode::Add,
        ..default()
    });

    commands.entity(root).with_children(|parent| {
        parent.spawn((
            Mesh3d(pad),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.0, 0.15, 0.0),
        ));
        parent.spawn((
            Mesh3d(riser),
            MeshMaterial3d(pipe.clone()),
            Transform::from_xyz(0.0, 4.8, 0.0),
        ));
        for angle in [0.5_f32, 2.6, 4.7] {
            parent.spawn((
                Mesh3d(support.clone()),
                MeshMaterial3d(pipe.clone()),
                Transform::from_xyz(angle.cos() * 0.9, 2.5, angle.sin() * 0.9),
            ));
        }
        parent.spawn((
            Mesh3d(collar),
            MeshMaterial3d(grey.clone()),
            Transform::from_xyz(0.0, 9.4, 0.0),
        ));

        parent
            .spawn((
                PuffEmitter,
                Transform::from_xyz(0.0, FLARE_TIP_HEIGHT, 0.0),
                Visibility::default(),
                Name::new("flare-tip"),
            ))
            .with_children(|tip| {
                for index in 0..FLAME_SEGMENTS {
                    let height_frac = (index as f32 + 0.5) / FLAME_SEGMENTS as f32;
                    let flame_material = materials.add(StandardMaterial {
                        base_color: Color::srgba(1.0, 0.6, 0.2, 0.85),
                        emissive: LinearRgba::new(3.0, 1.6, 0.5, 1.0),
                        unlit: true,
                        alpha_mode: AlphaMode::Blend,
                        ..default()
                    });
                    tip.spawn((
                        FlameSegment { height_frac },
                        Mesh3d(flame_slice.clone()),
                        MeshMaterial3d(flame_material),
                        Transform::from_xyz(
                            0.0,
                            (index as f32 + 0.5) * FLAME_SEGMENT_HEIGHT,
                            0.0,
                        )
                        .with_scale(Vec3::new(0.4, 1.0, 0.4)),
                    ));
                }
                tip.spawn((
                    FlameGlow,
                    Mesh3d(glow_quad),
                    MeshMaterial3d(glow_material),
                    Transform::from_xyz(0.0, 1.4, 0.0),
                ));
            });
    });

    (
        root,
        PartBounds {
            center: Vec3::new(0.0, 5.0, 0.0),
            half_extents: Vec3::new(1.6, 5.4, 1.6),
        },
    )
}

fn spawn_pipelines(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    site: &PartSite,
) -> (Entity, PartBounds) {
    let root = part_root(commands, site);
    let pipe_material = materials.add(piping());
    let riser = meshes.add(Cylinder::new(0.1, 0.6));

    // Gathering runs between the pads, axis-aligned at grade.
    let runs: [(Vec3, f32, bool); 4] = [
        (Vec3::new(-12.5, 0.3, -5.0), 7.0, true),
        (Vec3::new(-5.0, 0.3, -4.0), 8.0, true),
        (Vec3::new(6.5, 0.3, -9.0), 15.0, true),
        (Vec3::new(-2.0, 0.3, 1.0), 12.0, false),
    ];

    commands.entity(root).with_children(|parent| {
        for (center, length, along_x) in runs {
            let mesh = meshes.add(Cylinder::new(0.14, length));
            let rotation = if along_x { x_axis_pipe() } else { z_axis_pipe() };
            parent.spawn((
                Mesh3d(mesh),
                MeshMaterial3d(pipe_material.clone()),
                Transform::from_translation(center).with_rotation(rotation),
            ));
        }
        for riser_at in [
            Vec3::new(-16.0, 0.3, -5.0),
            Vec3::new(-1.0, 0.3, -9.0),
            Vec3::new(14.0, 0.3, -9.0),
            Vec3::new(-2.0, 0.3, 7.0),
        ] {
            parent.spawn((
                Mesh3d(riser.clone()),
                MeshMaterial3d(pipe_material.clone()),
                Transform::from_translation(riser_at),
            ));
        }
    });

    (
        root,
        PartBounds {
            center: Vec3::new(-1.0, 0.3, -3.0),
            half_extents: Vec3::new(15.5, 0.6, 7.5),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use facility_twin::assembly::AssemblyState;

    fn build_scene_app() -> App {
        let mut app = App::new();
        app.insert_resource(PartRegistry::default());
        app.insert_resource(Assets::<Mesh>::default());
        app.insert_resource(Assets::<StandardMaterial>::default());
        app.add_systems(Startup, setup_facility_scene);
        app.update();
        app
    }

    #[test]
    fn every_site_registers_a_root_with_bounds() {
        let app = build_scene_app();
        let registry = app.world().resource::<PartRegistry>();
        assert_eq!(registry.catalog.len(), SITES.len());
        for site in SITES.iter() {
            assert!(registry.root_of(site.key).is_some(), "{} root", site.key);
            let bounds = registry.bounds_of(site.key).expect("bounds");
            assert!(bounds.half_extents.min_element() > 0.0);
        }
    }

    #[test]
    fn registry_order_matches_site_order() {
        let app = build_scene_app();
        let registry = app.world().resource::<PartRegistry>();
        let keys: Vec<&str> = registry.keys().collect();
        let expected: Vec<&str> = SITES.iter().map(|site| site.key).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn exploded_positions_differ_from_final_positions() {
        let app = build_scene_app();
        let registry = app.world().resource::<PartRegistry>();
        for spec in registry.catalog.iter() {
            assert!(
                spec.target_for(AssemblyState::Exploded)
                    .distance(spec.target_for(AssemblyState::Assembled))
                    > 1.0,
                "{} must move when exploded",
                spec.key
            );
        }
    }

    #[test]
    fn scene_carries_metric_driven_rotors_and_flame_column() {
        let mut app = build_scene_app();

        let rotor_metrics: Vec<MetricKind> = app
            .world_mut()
            .query::<&SpinRotor>()
            .iter(app.world())
            .map(|rotor| rotor.metric)
            .collect();
        assert!(rotor_metrics.contains(&MetricKind::OilRate));
        assert!(rotor_metrics.contains(&MetricKind::RecoveredVaporRate));

        let segments = app
            .world_mut()
            .query::<&FlameSegment>()
            .iter(app.world())
            .count();
        assert_eq!(segments, FLAME_SEGMENTS);

        let emitters = app
            .world_mut()
            .query::<&PuffEmitter>()
            .iter(app.world())
            .count();
        assert_eq!(emitters, 1);
    }

    #[test]
    fn pumpjack_linkage_nodes_record_rest_translations() {
        let mut app = build_scene_app();
        let cranks = app
            .world_mut()
            .query_filtered::<&RestTranslation, With<PumpCrank>>()
            .iter(app.world())
            .count();
        assert_eq!(cranks, 2);

        let rods: Vec<Vec3> = app
            .world_mut()
            .query_filtered::<&RestTranslation, With<PumpRod>>()
            .iter(app.world())
            .map(|rest| rest.0)
            .collect();
        assert_eq!(rods.len(), 1);
        assert!(rods[0].y > 0.0);
    }
}
