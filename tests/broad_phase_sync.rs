//! Cross module behavior of the shape simulation layer: broad phase
//! residency, volume lifecycle, and the stepping driver's ordering
//! guarantees, exercised through the public `Simulation` surface.

use glam::{Quat, Vec3};
use shapesim::physics::body_sim::BodyKind;
use shapesim::physics::filters::FilterAttributes;
use shapesim::physics::handles::BodyHandle;
use shapesim::physics::pose::RigidPose;
use shapesim::physics::settings::SimulationSettings;
use shapesim::physics::shape_core::{ShapeCore, ShapeGeometry};
use shapesim::physics::shape_sim::ShapeResidency;
use shapesim::physics::simulation::{Simulation, VolumePolicy};

fn sphere_core(radius: f32) -> ShapeCore {
    ShapeCore::new(ShapeGeometry::Sphere { radius })
}

/// Small deterministic generator so the mixed attach/detach sequence is
/// reproducible without pulling in a randomness dependency.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn handle_uniqueness_across_attach_detach_sequences() {
    let mut simulation = Simulation::default();
    let core = simulation.register_core(sphere_core(1.0));
    let bodies: Vec<BodyHandle> = (0..4)
        .map(|i| {
            simulation.add_body(
                BodyKind::Rigid,
                RigidPose::from_position(Vec3::new(i as f32 * 3.0, 0.0, 0.0)),
            )
        })
        .collect();

    let mut live: Vec<(BodyHandle, shapesim::physics::handles::ElementId)> = Vec::new();
    let mut rng = Lcg(0x5eed);
    for _ in 0..200 {
        let attach = live.is_empty() || rng.next() % 3 != 0;
        if attach {
            let body = bodies[(rng.next() % bodies.len() as u64) as usize];
            let element = simulation
                .attach_shape(body, core, VolumePolicy::CreateVolume)
                .unwrap();
            live.push((body, element));
        } else {
            let (body, element) = live.swap_remove((rng.next() % live.len() as u64) as usize);
            assert!(simulation.detach_shape(body, element));
        }

        // Every live shape holds exactly one broad phase handle and no two
        // shapes share one.
        let mut handles: Vec<_> = live
            .iter()
            .map(|&(body, element)| {
                simulation
                    .shape(body, element)
                    .expect("live shape must be reachable")
                    .broad_phase_handle()
                    .expect("live shape must be registered")
            })
            .collect();
        let total = handles.len();
        handles.sort_by_key(|handle| (handle.index, handle.generation));
        handles.dedup();
        assert_eq!(handles.len(), total, "broad phase handles must never be shared");
        assert_eq!(simulation.broad_phase().len(), total);
    }
}

#[test]
fn update_ordering_reflects_the_new_pose() {
    let mut simulation = Simulation::default();
    let margin = 0.25;
    let core = simulation.register_core(sphere_core(2.0).with_margin(margin));
    let body = simulation.add_body(BodyKind::Rigid, RigidPose::IDENTITY);
    let element = simulation
        .attach_shape(body, core, VolumePolicy::BoundsOnly)
        .unwrap();
    simulation.update_body_bounds();

    // Step N+1: the body moves, then the preparation phase runs.
    let new_position = Vec3::new(17.0, -4.0, 9.0);
    simulation.set_body_pose(body, RigidPose::from_position(new_position));
    simulation.update_body_bounds();

    let handle = simulation
        .shape(body, element)
        .unwrap()
        .broad_phase_handle()
        .unwrap();
    let stored = simulation.broad_phase().stored_bounds(handle).unwrap();
    // The broad phase visible bound matches one computed directly from the
    // new pose; nothing of the old pose remains.
    let extent = Vec3::splat(2.0 + margin);
    assert_eq!(stored.min, new_position - extent);
    assert_eq!(stored.max, new_position + extent);
}

#[test]
fn create_after_failed_create_recovers_cleanly() {
    let mut simulation = Simulation::new(SimulationSettings {
        volume_pool_capacity: 1,
        ..SimulationSettings::default()
    });
    let core = simulation.register_core(sphere_core(1.0));
    let body = simulation.add_body(BodyKind::Rigid, RigidPose::IDENTITY);

    let first = simulation
        .attach_shape(body, core, VolumePolicy::CreateVolume)
        .unwrap();
    assert_eq!(
        simulation.shape_residency(body, first),
        Some(ShapeResidency::Active)
    );

    // The pool is full: the second shape degrades to broad phase only.
    let second = simulation
        .attach_shape(body, core, VolumePolicy::CreateVolume)
        .unwrap();
    assert_eq!(
        simulation.shape_residency(body, second),
        Some(ShapeResidency::BoundRegistered)
    );
    // It still tracks a valid bound.
    let bounds = simulation.shape_bounds(body, second).unwrap();
    assert!(bounds.min.is_finite() && bounds.max.is_finite());
    assert!(bounds.min.cmple(bounds.max).all());

    // Once the resource condition clears, a later creation succeeds.
    assert!(simulation.destroy_shape_volume(body, first));
    simulation.create_shape_volume(body, second).unwrap();
    assert_eq!(
        simulation.shape_residency(body, second),
        Some(ShapeResidency::Active)
    );
}

#[test]
fn destroying_a_volume_twice_changes_nothing() {
    let mut simulation = Simulation::default();
    let core = simulation.register_core(sphere_core(1.0));
    let body = simulation.add_body(BodyKind::Rigid, RigidPose::IDENTITY);
    let element = simulation
        .attach_shape(body, core, VolumePolicy::CreateVolume)
        .unwrap();

    assert!(simulation.destroy_shape_volume(body, element));
    let residency = simulation.shape_residency(body, element);
    let live_count = simulation.volumes().live_count();
    assert!(simulation.destroy_shape_volume(body, element));
    assert_eq!(simulation.shape_residency(body, element), residency);
    assert_eq!(simulation.volumes().live_count(), live_count);
}

#[test]
fn teardown_releases_volume_and_slot_together() {
    let mut simulation = Simulation::default();
    let core = simulation.register_core(sphere_core(1.0));
    let body = simulation.add_body(BodyKind::Rigid, RigidPose::IDENTITY);
    let element = simulation
        .attach_shape(body, core, VolumePolicy::CreateVolume)
        .unwrap();
    let shape = simulation.shape(body, element).unwrap();
    let broad_phase_handle = shape.broad_phase_handle().unwrap();
    let volume_handle = shape.volume().unwrap();

    assert!(simulation.detach_shape(body, element));
    // No state exists in which the broad phase slot is gone while the volume
    // is still considered live.
    assert!(!simulation.volumes().is_live(volume_handle));
    assert!(!simulation.broad_phase().is_live(broad_phase_handle));
}

#[test]
fn stale_broad_phase_handles_stay_inert_after_slot_reuse() {
    let mut simulation = Simulation::default();
    let core = simulation.register_core(sphere_core(1.0));
    let body = simulation.add_body(BodyKind::Rigid, RigidPose::IDENTITY);

    let first = simulation
        .attach_shape(body, core, VolumePolicy::BoundsOnly)
        .unwrap();
    let stale = simulation
        .shape(body, first)
        .unwrap()
        .broad_phase_handle()
        .unwrap();
    simulation.detach_shape(body, first);

    let second = simulation
        .attach_shape(body, core, VolumePolicy::BoundsOnly)
        .unwrap();
    let fresh = simulation
        .shape(body, second)
        .unwrap()
        .broad_phase_handle()
        .unwrap();
    // The slot was reused but the generation moved on.
    assert_eq!(stale.index, fresh.index);
    assert_ne!(stale.generation, fresh.generation);
    assert!(!simulation.broad_phase().is_live(stale));
    assert_eq!(simulation.broad_phase().stored_bounds(stale), None);
    assert_eq!(simulation.broad_phase().element(stale), None);
}

#[test]
fn candidate_pairs_apply_asymmetric_masks() {
    let mut simulation = Simulation::default();
    // `seeker` wants to hit `target`, but `target` masks `seeker` out, so the
    // pair never becomes a candidate. `mutual` and `seeker` accept each other.
    let seeker = simulation.register_core(
        sphere_core(1.0).with_filter_attributes(FilterAttributes::new(0b001, 0b110)),
    );
    let target = simulation.register_core(
        sphere_core(1.0).with_filter_attributes(FilterAttributes::new(0b010, 0b000)),
    );
    let mutual = simulation.register_core(
        sphere_core(1.0).with_filter_attributes(FilterAttributes::new(0b100, 0b001)),
    );
    let at = |x: f32| RigidPose::from_position(Vec3::new(x, 0.0, 0.0));
    let body_a = simulation.add_body(BodyKind::Rigid, at(0.0));
    let body_b = simulation.add_body(BodyKind::Rigid, at(0.5));
    let body_c = simulation.add_body(BodyKind::Rigid, at(1.0));
    let element_a = simulation
        .attach_shape(body_a, seeker, VolumePolicy::BoundsOnly)
        .unwrap();
    let _element_b = simulation
        .attach_shape(body_b, target, VolumePolicy::BoundsOnly)
        .unwrap();
    let element_c = simulation
        .attach_shape(body_c, mutual, VolumePolicy::BoundsOnly)
        .unwrap();

    simulation.update_body_bounds();
    let pairs = simulation.candidate_pairs();
    assert_eq!(pairs, vec![(element_a, element_c)]);
}

#[test]
fn hair_system_bounds_follow_the_strand_solver() {
    let mut simulation = Simulation::default();
    let strand_radius = 0.5;
    let core = simulation.register_core(ShapeCore::new(ShapeGeometry::HairStrands {
        strand_radius,
        rest_vertices: vec![Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0)],
    }));
    let body = simulation.add_body(BodyKind::hair_system(), RigidPose::IDENTITY);
    let element = simulation
        .attach_shape(body, core, VolumePolicy::CreateVolume)
        .unwrap();
    simulation.update_body_bounds();
    let rest_bounds = simulation.shape_bounds(body, element).unwrap();
    assert_eq!(rest_bounds.min, Vec3::new(-0.5, -1.5, -0.5));

    // The strand solver writes world space vertices; the next preparation
    // phase must bound the deformed state, not the rest pose.
    simulation.set_strand_vertices(
        body,
        vec![Vec3::new(3.0, 2.0, 1.0), Vec3::new(4.0, 0.0, 1.0)],
    );
    simulation.update_body_bounds();
    let deformed_bounds = simulation.shape_bounds(body, element).unwrap();
    assert_eq!(deformed_bounds.min, Vec3::new(2.5, -0.5, 0.5));
    assert_eq!(deformed_bounds.max, Vec3::new(4.5, 2.5, 1.5));
    let handle = simulation
        .shape(body, element)
        .unwrap()
        .broad_phase_handle()
        .unwrap();
    assert_eq!(
        simulation.broad_phase().stored_bounds(handle),
        Some(deformed_bounds)
    );
}

#[test]
fn parallel_preparation_matches_the_serial_path() {
    let build = |worker_count: usize| {
        let mut simulation = Simulation::new(SimulationSettings {
            worker_count,
            ..SimulationSettings::default()
        });
        let sphere = simulation.register_core(sphere_core(1.5).with_margin(0.1));
        let capsule = simulation.register_core(ShapeCore::new(ShapeGeometry::Capsule {
            radius: 0.5,
            half_length: 2.0,
        }));
        let mut elements = Vec::new();
        let mut rng = Lcg(0xfeed);
        for i in 0..32 {
            let position = Vec3::new(
                (rng.next() % 100) as f32 - 50.0,
                (rng.next() % 100) as f32 - 50.0,
                (rng.next() % 100) as f32 - 50.0,
            );
            let orientation = Quat::from_rotation_y((rng.next() % 628) as f32 / 100.0);
            let body = simulation.add_body(BodyKind::Rigid, RigidPose::new(position, orientation));
            let core = if i % 2 == 0 { sphere } else { capsule };
            let element = simulation
                .attach_shape(body, core, VolumePolicy::BoundsOnly)
                .unwrap();
            elements.push((body, element));
        }
        simulation.update_body_bounds();
        (simulation, elements)
    };

    let (serial, serial_elements) = build(1);
    let (parallel, parallel_elements) = build(4);
    for (&(body_s, element_s), &(body_p, element_p)) in
        serial_elements.iter().zip(&parallel_elements)
    {
        let serial_bounds = serial.shape_bounds(body_s, element_s).unwrap();
        let parallel_bounds = parallel.shape_bounds(body_p, element_p).unwrap();
        assert_eq!(serial_bounds, parallel_bounds);
    }
}
