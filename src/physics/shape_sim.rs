use glam::Vec3;

use crate::physics::broad_phase::BroadPhase;
use crate::physics::element::ElementSim;
use crate::physics::filters::{FilterAttributes, FilterData};
use crate::physics::handles::{BodyHandle, BroadPhaseHandle, ElementId, ShapeCoreId, VolumeHandle};
use crate::physics::narrow_phase::{LowLevelVolumes, VolumeError};
use crate::physics::pose::RigidPose;
use crate::physics::shape_core::{ShapeCore, ShapeGeometry};
use crate::utilities::bounding_box::BoundingBox;

/// Broad phase and narrow phase residency of a shape simulation.
///
/// Attachment moves `Detached` to `BoundRegistered`; a successful volume
/// creation moves `BoundRegistered` to `Active`; destroying the volume moves
/// back to `BoundRegistered`; detachment releases every live handle from any
/// state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeResidency {
    /// No live handles.
    Detached,
    /// Broad phase handle live, no collision volume.
    BoundRegistered,
    /// Broad phase handle and collision volume both live.
    Active,
}

/// Runtime simulation side object binding one shape core to one simulated body.
///
/// Tracks the shape's world space bound, its residency in the broad phase,
/// and the lifecycle of the narrow phase collision volume backing it. The
/// back references to the owning body and the core snapshot are weak: the
/// owning registries outlive the shape simulation, and slot generations catch
/// any reference that does not.
#[derive(Debug)]
pub struct ShapeSim {
    element: ElementId,
    body: BodyHandle,
    core: ShapeCoreId,
    bounds: BoundingBox,
    broad_phase_handle: Option<BroadPhaseHandle>,
    volume: Option<VolumeHandle>,
    filter_attributes: FilterAttributes,
    filter_data: FilterData,
}

impl ShapeSim {
    /// Creates a detached shape simulation for a core attached to a body.
    /// The filter information is snapshotted from the core; swapping the core
    /// refreshes it.
    pub(crate) fn new(
        element: ElementId,
        body: BodyHandle,
        core_id: ShapeCoreId,
        core: &ShapeCore,
    ) -> Self {
        Self {
            element,
            body,
            core: core_id,
            bounds: BoundingBox::ZERO,
            broad_phase_handle: None,
            volume: None,
            filter_attributes: core.filter_attributes,
            filter_data: core.filter_data,
        }
    }

    /// Gets the handle of the owning body simulation.
    #[inline(always)]
    pub fn get_owning_body(&self) -> BodyHandle {
        self.body
    }

    /// Gets the id of the core snapshot this shape was built from.
    #[inline(always)]
    pub fn core(&self) -> ShapeCoreId {
        self.core
    }

    /// Gets the last computed world space bound. No recomputation happens here.
    #[inline(always)]
    pub fn get_bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Gets the shape's broad phase handle, if registered.
    #[inline(always)]
    pub fn broad_phase_handle(&self) -> Option<BroadPhaseHandle> {
        self.broad_phase_handle
    }

    /// Gets the shape's collision volume handle, if one is live.
    #[inline(always)]
    pub fn volume(&self) -> Option<VolumeHandle> {
        self.volume
    }

    /// Gets the shape's current residency state, derived from its live handles.
    #[inline(always)]
    pub fn residency(&self) -> ShapeResidency {
        debug_assert!(
            self.volume.is_none() || self.broad_phase_handle.is_some(),
            "A shape can never hold a collision volume without broad phase residency."
        );
        match (self.broad_phase_handle, self.volume) {
            (None, _) => ShapeResidency::Detached,
            (Some(_), None) => ShapeResidency::BoundRegistered,
            (Some(_), Some(_)) => ShapeResidency::Active,
        }
    }

    /// Rebinds the shape to a different core snapshot, refreshing the filter
    /// snapshot. The caller must have destroyed any volume built from the old
    /// core first; a volume never outlives the snapshot it was built from.
    pub(crate) fn set_core(&mut self, core_id: ShapeCoreId, core: &ShapeCore) {
        debug_assert!(
            self.volume.is_none(),
            "Rebinding a core requires destroying the old core's volume first."
        );
        self.core = core_id;
        self.filter_attributes = core.filter_attributes;
        self.filter_data = core.filter_data;
    }

    /// Registers the shape's cached bound in the broad phase.
    pub(crate) fn attach_to_broad_phase(&mut self, broad_phase: &mut BroadPhase) {
        debug_assert!(
            self.broad_phase_handle.is_none(),
            "A shape must not be registered in the broad phase twice."
        );
        self.broad_phase_handle = Some(broad_phase.add(self.element, self.bounds));
    }

    /// Recomputes the cached world space bound from the core snapshot and the
    /// owning body's finalized pose (plus deformed strand state, when the body
    /// carries one). Deterministic, touches nothing but the cached bound, and
    /// over approximates the true extent by at least the core's collision
    /// margin.
    pub(crate) fn update_bounds(
        &mut self,
        core: &ShapeCore,
        body_pose: &RigidPose,
        strand_vertices: Option<&[Vec3]>,
    ) {
        let world_pose = RigidPose::multiply(body_pose, &core.local_pose);
        if let ShapeGeometry::HairStrands { strand_radius, .. } = &core.geometry {
            // A deforming hair body supplies its strand state in world space;
            // the rest pose only covers shapes the solver has not touched yet.
            if let Some(vertices) = strand_vertices {
                if !vertices.is_empty() {
                    self.bounds = Self::bounds_of_vertices(vertices)
                        .inflate(strand_radius.max(0.0) + core.margin);
                    return;
                }
            }
        }
        let local = core.geometry.compute_local_bounds(world_pose.orientation);
        self.bounds = BoundingBox::new(
            local.min + world_pose.position,
            local.max + world_pose.position,
        )
        .inflate(core.margin);
    }

    /// Pushes the cached bound into the broad phase under the existing handle.
    /// Must follow `update_bounds` within the same step; the stepping driver
    /// exposes the two as one paired operation.
    pub(crate) fn update_bounds_in_aabb_mgr(&self, broad_phase: &mut BroadPhase) {
        debug_assert!(
            self.broad_phase_handle.is_some(),
            "Bound commits require broad phase residency."
        );
        if let Some(handle) = self.broad_phase_handle {
            broad_phase.update_bounds(handle, self.bounds);
        }
    }

    /// Builds the narrow phase collision volume from the current core snapshot
    /// and the owning body's pose. On failure the shape stays valid and volume
    /// less, still participating in broad phase bounds tracking. Calling this
    /// while a volume is live is a contract violation: the old volume is never
    /// implicitly destroyed or leaked.
    pub(crate) fn create_low_level_volume(
        &mut self,
        core: &ShapeCore,
        body_pose: &RigidPose,
        volumes: &mut LowLevelVolumes,
    ) -> Result<(), VolumeError> {
        debug_assert!(
            self.broad_phase_handle.is_some(),
            "Volume creation requires broad phase residency."
        );
        debug_assert!(
            self.volume.is_none(),
            "Volume creation requested for a shape that already owns one."
        );
        if self.volume.is_some() {
            return Err(VolumeError::VolumeAlreadyLive);
        }
        let world_pose = RigidPose::multiply(body_pose, &core.local_pose);
        let handle = volumes.create(self.core, core, &world_pose)?;
        self.volume = Some(handle);
        Ok(())
    }

    /// Releases the narrow phase collision volume if present.
    /// Idempotent: calling this on a volume less shape is a safe no-op.
    pub(crate) fn destroy_low_level_volume(&mut self, volumes: &mut LowLevelVolumes) {
        if let Some(handle) = self.volume.take() {
            let destroyed = volumes.destroy(handle);
            debug_assert!(
                destroyed,
                "A shape's recorded volume handle must be live until released here."
            );
        }
    }

    /// Releases every live handle: the collision volume strictly before the
    /// broad phase slot. Terminal; the shape ends `Detached`.
    pub(crate) fn detach(
        &mut self,
        broad_phase: &mut BroadPhase,
        volumes: &mut LowLevelVolumes,
    ) {
        self.destroy_low_level_volume(volumes);
        if let Some(handle) = self.broad_phase_handle.take() {
            let removed = broad_phase.remove(handle);
            debug_assert!(
                removed,
                "A shape's broad phase handle must be live until released here."
            );
        }
    }

    fn bounds_of_vertices(vertices: &[Vec3]) -> BoundingBox {
        let mut bounds = BoundingBox::ZERO;
        let mut any = false;
        for vertex in vertices {
            if !vertex.is_finite() {
                continue;
            }
            if any {
                bounds.min = bounds.min.min(*vertex);
                bounds.max = bounds.max.max(*vertex);
            } else {
                bounds = BoundingBox::new(*vertex, *vertex);
                any = true;
            }
        }
        bounds
    }
}

impl ElementSim for ShapeSim {
    #[inline(always)]
    fn element_id(&self) -> ElementId {
        self.element
    }

    #[inline(always)]
    fn get_filter_info(&self) -> (FilterAttributes, FilterData) {
        (self.filter_attributes, self.filter_data)
    }
}
