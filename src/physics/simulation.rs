use glam::Vec3;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::physics::body_sim::{Bodies, BodyKind, BodySim};
use crate::physics::broad_phase::BroadPhase;
use crate::physics::element::ElementSim;
use crate::physics::filters::{FilterAttributes, FilterData};
use crate::physics::handles::{BodyHandle, ElementId, ShapeCoreId};
use crate::physics::narrow_phase::{LowLevelVolumes, VolumeError};
use crate::physics::pose::RigidPose;
use crate::physics::settings::SimulationSettings;
use crate::physics::shape_core::{ShapeCore, ShapeCores};
use crate::physics::shape_sim::{ShapeResidency, ShapeSim};
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::id_pool::IdPool;

/// Decides what state a freshly attached shape ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePolicy {
    /// Register the bound only; the shape stays `BoundRegistered`.
    BoundsOnly,
    /// Try to create the collision volume. On failure the shape degrades to
    /// broad phase only tracking and the attachment still succeeds.
    CreateVolume,
    /// Create the collision volume or roll the attachment back entirely.
    RequireVolume,
}

/// Describes why an attachment or volume operation could not be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("{0} does not exist")]
    UnknownBody(BodyHandle),
    #[error("{0} is not registered")]
    UnknownCore(ShapeCoreId),
    #[error("{0} is not attached to the given body")]
    UnknownShape(ElementId),
    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Owns the registries of the shape simulation layer and drives the broad
/// phase preparation phase of the stepping pipeline.
///
/// Structural changes (body and shape lifecycle, volume creation and
/// destruction, core registration) require `&mut self` and therefore cannot
/// interleave with `update_body_bounds`, whose internal fan out is the only
/// concurrency in this layer. That exclusivity is what makes a stale bound
/// unobservable: every bound commit happens inside the phase, and every
/// query happens after it returns.
pub struct Simulation {
    bodies: Bodies,
    shape_cores: ShapeCores,
    broad_phase: BroadPhase,
    volumes: LowLevelVolumes,
    element_ids: IdPool,
    worker_count: usize,
}

impl Simulation {
    /// Creates a simulation with the given settings.
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            bodies: Bodies::with_capacity(settings.body_capacity),
            shape_cores: ShapeCores::with_capacity(settings.shape_core_capacity),
            broad_phase: BroadPhase::with_capacity(settings.broad_phase_capacity),
            volumes: LowLevelVolumes::with_capacity(settings.volume_pool_capacity),
            element_ids: IdPool::new(settings.broad_phase_capacity),
            worker_count: settings.worker_count.max(1),
        }
    }

    /// The broad phase index.
    #[inline(always)]
    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad_phase
    }

    /// The narrow phase volume pool.
    #[inline(always)]
    pub fn volumes(&self) -> &LowLevelVolumes {
        &self.volumes
    }

    /// The body collection.
    #[inline(always)]
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    /// The shape core registry.
    #[inline(always)]
    pub fn shape_cores(&self) -> &ShapeCores {
        &self.shape_cores
    }

    /// Registers a shape core snapshot for later attachment.
    pub fn register_core(&mut self, core: ShapeCore) -> ShapeCoreId {
        let id = self.shape_cores.add(core);
        debug!(core = %id, "registered shape core");
        id
    }

    /// Unregisters a core snapshot. Refused while any live shape still
    /// references it; detach those shapes (or rebind them) first.
    pub fn unregister_core(&mut self, id: ShapeCoreId) -> Option<ShapeCore> {
        let in_use = self
            .bodies
            .iter()
            .any(|body| body.shapes().iter().any(|shape| shape.core() == id));
        if in_use {
            warn!(core = %id, "refusing to unregister a core still referenced by a live shape");
            return None;
        }
        self.shape_cores.remove(id)
    }

    /// Adds a simulated body with no shapes.
    pub fn add_body(&mut self, kind: BodyKind, pose: RigidPose) -> BodyHandle {
        let handle = self.bodies.add(BodySim::new(kind, pose));
        debug!(body = %handle, "added body");
        handle
    }

    /// Removes a body, detaching every owned shape first. Per shape, the
    /// collision volume is released strictly before the broad phase slot.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        for shape in body.shapes_mut() {
            let element = shape.element_id();
            shape.detach(&mut self.broad_phase, &mut self.volumes);
            self.element_ids.return_id(element.0);
        }
        self.bodies.remove(handle);
        debug!(body = %handle, "removed body");
        true
    }

    /// Gets a body by handle.
    #[inline(always)]
    pub fn body(&self, handle: BodyHandle) -> Option<&BodySim> {
        self.bodies.get(handle)
    }

    /// Sets a body's world pose. A structural write: callers must not race
    /// this against `update_body_bounds`.
    pub fn set_body_pose(&mut self, handle: BodyHandle, pose: RigidPose) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_pose(pose);
                true
            }
            None => false,
        }
    }

    /// Hands a hair system body its deformed world space strand state.
    pub fn set_strand_vertices(&mut self, handle: BodyHandle, vertices: Vec<Vec3>) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_strand_vertices(vertices);
                true
            }
            None => false,
        }
    }

    /// Attaches a shape to a body: computes an initial bound, registers it in
    /// the broad phase, and applies the volume policy. Per shape failures are
    /// local; they never affect the body's other shapes.
    pub fn attach_shape(
        &mut self,
        body: BodyHandle,
        core_id: ShapeCoreId,
        policy: VolumePolicy,
    ) -> Result<ElementId, AttachError> {
        let Some(core) = self.shape_cores.get(core_id) else {
            return Err(AttachError::UnknownCore(core_id));
        };
        let Some(body_sim) = self.bodies.get_mut(body) else {
            return Err(AttachError::UnknownBody(body));
        };
        let pose = *body_sim.pose();
        let element = ElementId(self.element_ids.take());
        let mut shape = ShapeSim::new(element, body, core_id, core);
        shape.update_bounds(core, &pose, body_sim.strand_vertices());
        shape.attach_to_broad_phase(&mut self.broad_phase);

        match policy {
            VolumePolicy::BoundsOnly => {}
            VolumePolicy::CreateVolume => {
                if let Err(error) = shape.create_low_level_volume(core, &pose, &mut self.volumes) {
                    warn!(
                        body = %body,
                        element = %element,
                        %error,
                        "volume creation failed; shape degrades to broad phase only tracking"
                    );
                }
            }
            VolumePolicy::RequireVolume => {
                if let Err(error) = shape.create_low_level_volume(core, &pose, &mut self.volumes) {
                    shape.detach(&mut self.broad_phase, &mut self.volumes);
                    self.element_ids.return_id(element.0);
                    return Err(error.into());
                }
            }
        }

        body_sim.push_shape(shape);
        debug!(body = %body, element = %element, core = %core_id, "attached shape");
        Ok(element)
    }

    /// Detaches a shape from a body, releasing the collision volume strictly
    /// before the broad phase slot.
    pub fn detach_shape(&mut self, body: BodyHandle, element: ElementId) -> bool {
        let Some(body_sim) = self.bodies.get_mut(body) else {
            return false;
        };
        let Some(mut shape) = body_sim.take_shape(element) else {
            return false;
        };
        shape.detach(&mut self.broad_phase, &mut self.volumes);
        self.element_ids.return_id(element.0);
        debug!(body = %body, element = %element, "detached shape");
        true
    }

    /// Creates the collision volume for an attached shape. Creating a volume
    /// for a shape that already owns one is rejected explicitly; the live
    /// volume is never implicitly destroyed.
    pub fn create_shape_volume(
        &mut self,
        body: BodyHandle,
        element: ElementId,
    ) -> Result<(), AttachError> {
        let Some(body_sim) = self.bodies.get_mut(body) else {
            return Err(AttachError::UnknownBody(body));
        };
        let pose = *body_sim.pose();
        let Some(shape) = body_sim.find_shape_mut(element) else {
            return Err(AttachError::UnknownShape(element));
        };
        if shape.volume().is_some() {
            return Err(AttachError::Volume(VolumeError::VolumeAlreadyLive));
        }
        let core_id = shape.core();
        let Some(core) = self.shape_cores.get(core_id) else {
            return Err(AttachError::UnknownCore(core_id));
        };
        shape.create_low_level_volume(core, &pose, &mut self.volumes)?;
        debug!(body = %body, element = %element, "created collision volume");
        Ok(())
    }

    /// Destroys the collision volume of an attached shape, if present.
    /// Idempotent: a volume less shape is a safe no-op.
    pub fn destroy_shape_volume(&mut self, body: BodyHandle, element: ElementId) -> bool {
        let Some(shape) = self
            .bodies
            .get_mut(body)
            .and_then(|body_sim| body_sim.find_shape_mut(element))
        else {
            return false;
        };
        shape.destroy_low_level_volume(&mut self.volumes);
        debug!(body = %body, element = %element, "destroyed collision volume");
        true
    }

    /// Rebinds an attached shape to a different core snapshot. A live volume
    /// built from the old core is destroyed first and recreated from the new
    /// one; a volume never outlives the snapshot it was built from. If the
    /// recreation fails, the shape stays attached in `BoundRegistered` and the
    /// error is reported.
    pub fn replace_shape_core(
        &mut self,
        body: BodyHandle,
        element: ElementId,
        new_core_id: ShapeCoreId,
    ) -> Result<(), AttachError> {
        let Some(core) = self.shape_cores.get(new_core_id) else {
            return Err(AttachError::UnknownCore(new_core_id));
        };
        let Some(body_sim) = self.bodies.get_mut(body) else {
            return Err(AttachError::UnknownBody(body));
        };
        let pose = *body_sim.pose();
        let strand_vertices = body_sim.strand_vertices().map(<[Vec3]>::to_vec);
        let Some(shape) = body_sim.find_shape_mut(element) else {
            return Err(AttachError::UnknownShape(element));
        };
        let had_volume = shape.volume().is_some();
        shape.destroy_low_level_volume(&mut self.volumes);
        shape.set_core(new_core_id, core);
        shape.update_bounds(core, &pose, strand_vertices.as_deref());
        shape.update_bounds_in_aabb_mgr(&mut self.broad_phase);
        if had_volume {
            shape.create_low_level_volume(core, &pose, &mut self.volumes)?;
        }
        debug!(body = %body, element = %element, core = %new_core_id, "replaced shape core");
        Ok(())
    }

    /// The broad phase preparation phase: recomputes every owned shape's bound
    /// from its body's finalized state, then commits the bounds into the broad
    /// phase. Recomputation fans out across worker threads over bodies (shapes
    /// of distinct bodies are independent); the commits into the shared index
    /// run serialized after the fan out joins, so no query can observe a
    /// half updated step.
    pub fn update_body_bounds(&mut self) {
        let worker_count = self.worker_count;
        let cores = &self.shape_cores;
        let bodies = self.bodies.as_mut_slice();
        if worker_count == 1 || bodies.len() <= 1 {
            for body in bodies.iter_mut() {
                body.update_attached_bounds(cores);
            }
        } else {
            let chunk_size = bodies.len().div_ceil(worker_count);
            crossbeam_utils::thread::scope(|scope| {
                for chunk in bodies.chunks_mut(chunk_size) {
                    scope.spawn(move |_| {
                        for body in chunk {
                            body.update_attached_bounds(cores);
                        }
                    });
                }
            })
            .unwrap();
        }

        let mut committed = 0usize;
        for body in self.bodies.iter() {
            for shape in body.shapes() {
                shape.update_bounds_in_aabb_mgr(&mut self.broad_phase);
                committed += 1;
            }
        }
        trace!(shapes = committed, "committed shape bounds to broad phase");
    }

    /// Enumerates the element pairs whose stored bounds overlap and whose
    /// filter information permits collision. Candidates only; the narrow phase
    /// still runs full geometric tests on them.
    pub fn candidate_pairs(&self) -> Vec<(ElementId, ElementId)> {
        let overlaps = self.broad_phase.collect_overlaps();
        let mut pairs = Vec::with_capacity(overlaps.len());
        for (a, b) in overlaps {
            let (Some(element_a), Some(element_b)) =
                (self.broad_phase.element(a), self.broad_phase.element(b))
            else {
                continue;
            };
            let (Some(info_a), Some(info_b)) =
                (self.filter_info(element_a), self.filter_info(element_b))
            else {
                continue;
            };
            if FilterAttributes::can_collide(&info_a.0, &info_b.0) {
                pairs.push((element_a, element_b));
            }
        }
        pairs
    }

    /// Looks up the filter information of a live element.
    pub fn filter_info(&self, element: ElementId) -> Option<(FilterAttributes, FilterData)> {
        self.find_element(element).map(ElementSim::get_filter_info)
    }

    /// Finds a live shape by its element identity, searching every body.
    pub fn find_element(&self, element: ElementId) -> Option<&ShapeSim> {
        self.bodies
            .iter()
            .find_map(|body| body.find_shape(element))
    }

    /// Gets an attached shape.
    pub fn shape(&self, body: BodyHandle, element: ElementId) -> Option<&ShapeSim> {
        self.bodies
            .get(body)
            .and_then(|body_sim| body_sim.find_shape(element))
    }

    /// Gets the cached bound of an attached shape.
    pub fn shape_bounds(&self, body: BodyHandle, element: ElementId) -> Option<BoundingBox> {
        self.shape(body, element).map(ShapeSim::get_bounds)
    }

    /// Gets the residency state of an attached shape.
    pub fn shape_residency(&self, body: BodyHandle, element: ElementId) -> Option<ShapeResidency> {
        self.shape(body, element).map(ShapeSim::residency)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationSettings::default())
    }
}
