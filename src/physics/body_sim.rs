use glam::Vec3;

use crate::physics::element::ElementSim;
use crate::physics::handles::{BodyHandle, ElementId};
use crate::physics::pose::RigidPose;
use crate::physics::shape_core::ShapeCores;
use crate::physics::shape_sim::ShapeSim;
use crate::utilities::id_pool::IdPool;

/// The kind of simulated body a set of shapes is attached to.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    /// Rigid body: the world pose alone determines every owned shape's bounds.
    Rigid,
    /// Deformable hair system: the external strand solver writes the world
    /// space deformed vertex state each step, and hair shapes bound that
    /// state rather than the rest pose.
    HairSystem {
        /// World space strand vertices as of the last solver write.
        /// Empty until the solver has run once.
        strand_vertices: Vec<Vec3>,
    },
}

impl BodyKind {
    /// Creates a hair system kind with no deformed state yet.
    pub fn hair_system() -> Self {
        Self::HairSystem {
            strand_vertices: Vec::new(),
        }
    }
}

/// One simulated body: the unit of simulation stepping. Owns the shape
/// simulations attached to it (in attachment order) and supplies the world
/// transform their bounds are computed from. The pose must be finalized
/// before the broad phase preparation phase reads it.
#[derive(Debug)]
pub struct BodySim {
    pose: RigidPose,
    kind: BodyKind,
    shapes: Vec<ShapeSim>,
}

impl BodySim {
    /// Creates a body with no attached shapes.
    pub fn new(kind: BodyKind, pose: RigidPose) -> Self {
        Self {
            pose,
            kind,
            shapes: Vec::new(),
        }
    }

    /// Gets the body's current world pose.
    #[inline(always)]
    pub fn pose(&self) -> &RigidPose {
        &self.pose
    }

    /// Sets the body's world pose. Must not race the broad phase preparation
    /// phase; poses are read only while shape bounds update.
    #[inline(always)]
    pub fn set_pose(&mut self, pose: RigidPose) {
        self.pose = pose;
    }

    /// Gets the body kind.
    #[inline(always)]
    pub fn kind(&self) -> &BodyKind {
        &self.kind
    }

    /// Gets the deformed strand state, if this is a hair system body that the
    /// solver has written at least once.
    #[inline(always)]
    pub fn strand_vertices(&self) -> Option<&[Vec3]> {
        match &self.kind {
            BodyKind::HairSystem { strand_vertices } => Some(strand_vertices.as_slice()),
            BodyKind::Rigid => None,
        }
    }

    /// Replaces the deformed strand state. Writing strand state to a body that
    /// is not a hair system is a contract violation; release builds ignore it.
    pub fn set_strand_vertices(&mut self, vertices: Vec<Vec3>) {
        debug_assert!(
            matches!(self.kind, BodyKind::HairSystem { .. }),
            "Only hair system bodies carry strand state."
        );
        if let BodyKind::HairSystem { strand_vertices } = &mut self.kind {
            *strand_vertices = vertices;
        }
    }

    /// The shapes attached to this body, in attachment order.
    #[inline(always)]
    pub fn shapes(&self) -> &[ShapeSim] {
        &self.shapes
    }

    /// Number of attached shapes.
    #[inline(always)]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Finds an attached shape by its element identity.
    pub fn find_shape(&self, element: ElementId) -> Option<&ShapeSim> {
        self.shapes.iter().find(|shape| shape.element_id() == element)
    }

    pub(crate) fn shapes_mut(&mut self) -> &mut [ShapeSim] {
        &mut self.shapes
    }

    pub(crate) fn push_shape(&mut self, shape: ShapeSim) {
        self.shapes.push(shape);
    }

    pub(crate) fn find_shape_mut(&mut self, element: ElementId) -> Option<&mut ShapeSim> {
        self.shapes
            .iter_mut()
            .find(|shape| shape.element_id() == element)
    }

    /// Recomputes the cached bound of every attached shape from this body's
    /// finalized pose and deformed state. The per body half of the broad phase
    /// preparation phase; shapes of distinct bodies have no data dependency on
    /// each other, so the driver may run this concurrently across bodies.
    pub(crate) fn update_attached_bounds(&mut self, cores: &ShapeCores) {
        let pose = self.pose;
        let strand_vertices = match &self.kind {
            BodyKind::HairSystem { strand_vertices } => Some(strand_vertices.as_slice()),
            BodyKind::Rigid => None,
        };
        for shape in &mut self.shapes {
            let Some(core) = cores.get(shape.core()) else {
                debug_assert!(false, "A live shape must reference a registered core.");
                continue;
            };
            shape.update_bounds(core, &pose, strand_vertices);
        }
    }

    /// Removes a shape by identity, preserving the attachment order of the rest.
    /// Identity based removal keeps concurrent iteration bookkeeping simple;
    /// indices of later shapes shift, identities never do.
    pub(crate) fn take_shape(&mut self, element: ElementId) -> Option<ShapeSim> {
        let index = self
            .shapes
            .iter()
            .position(|shape| shape.element_id() == element)?;
        Some(self.shapes.remove(index))
    }
}

/// Collection of allocated bodies.
///
/// Handles remap through an index table so body storage can stay dense;
/// removal swaps the last body into the vacated slot and patches the
/// mappings.
#[derive(Debug, Default)]
pub struct Bodies {
    handle_to_index: Vec<i32>,
    index_to_handle: Vec<BodyHandle>,
    bodies: Vec<BodySim>,
    handle_pool: IdPool,
}

impl Bodies {
    /// Creates a new Bodies collection.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handle_to_index: Vec::with_capacity(capacity),
            index_to_handle: Vec::with_capacity(capacity),
            bodies: Vec::with_capacity(capacity),
            handle_pool: IdPool::new(capacity),
        }
    }

    /// Number of currently allocated bodies.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.bodies.len()
    }

    /// Checks whether a body handle is currently registered.
    #[inline(always)]
    pub fn body_exists(&self, handle: BodyHandle) -> bool {
        let slot = handle.0 as usize;
        handle.0 >= 0 && slot < self.handle_to_index.len() && self.handle_to_index[slot] >= 0
    }

    /// Debug-mode validation that a handle exists and mappings are consistent.
    #[inline(always)]
    pub fn validate_existing_handle(&self, handle: BodyHandle) {
        debug_assert!(handle.0 >= 0, "Handles must be nonnegative.");
        debug_assert!(self.body_exists(handle), "Handle must exist.");
        let index = self.handle_to_index[handle.0 as usize];
        debug_assert!(
            index >= 0 && self.index_to_handle[index as usize] == handle,
            "Mappings are out of sync."
        );
    }

    /// Adds a new body to the collection.
    pub fn add(&mut self, body: BodySim) -> BodyHandle {
        let handle = BodyHandle(self.handle_pool.take());
        let index = self.bodies.len() as i32;
        let slot = handle.0 as usize;
        if slot == self.handle_to_index.len() {
            self.handle_to_index.push(index);
        } else {
            debug_assert!(
                self.handle_to_index[slot] < 0,
                "The handle pool handed out a slot that is still mapped."
            );
            self.handle_to_index[slot] = index;
        }
        self.index_to_handle.push(handle);
        self.bodies.push(body);
        handle
    }

    /// Gets the body referenced by a handle.
    #[inline(always)]
    pub fn get(&self, handle: BodyHandle) -> Option<&BodySim> {
        if !self.body_exists(handle) {
            return None;
        }
        self.validate_existing_handle(handle);
        Some(&self.bodies[self.handle_to_index[handle.0 as usize] as usize])
    }

    /// Gets the body referenced by a handle, mutably.
    #[inline(always)]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut BodySim> {
        if !self.body_exists(handle) {
            return None;
        }
        self.validate_existing_handle(handle);
        Some(&mut self.bodies[self.handle_to_index[handle.0 as usize] as usize])
    }

    /// Removes a body and returns it. The caller must have detached its shapes.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<BodySim> {
        if !self.body_exists(handle) {
            return None;
        }
        self.validate_existing_handle(handle);
        let index = self.handle_to_index[handle.0 as usize] as usize;
        let body = self.bodies.swap_remove(index);
        self.index_to_handle.swap_remove(index);
        // Patch the mapping of the body that moved into the vacated slot.
        if index < self.bodies.len() {
            let moved_handle = self.index_to_handle[index];
            self.handle_to_index[moved_handle.0 as usize] = index as i32;
        }
        self.handle_to_index[handle.0 as usize] = -1;
        self.handle_pool.return_id(handle.0);
        Some(body)
    }

    /// Iterates the bodies in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &BodySim> {
        self.bodies.iter()
    }

    /// Dense body storage, for the stepping driver's fan out.
    pub(crate) fn as_mut_slice(&mut self) -> &mut [BodySim] {
        &mut self.bodies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> BodySim {
        BodySim::new(BodyKind::Rigid, RigidPose::IDENTITY)
    }

    #[test]
    fn test_add_get_remove() {
        let mut bodies = Bodies::with_capacity(4);
        let a = bodies.add(body());
        let b = bodies.add(body());
        assert_eq!(bodies.count(), 2);
        assert!(bodies.get(a).is_some());
        assert!(bodies.remove(a).is_some());
        assert!(!bodies.body_exists(a));
        assert!(bodies.get(b).is_some());
        assert_eq!(bodies.count(), 1);
    }

    #[test]
    fn test_swap_remove_patches_mappings() {
        let mut bodies = Bodies::with_capacity(4);
        let a = bodies.add(body());
        let b = bodies.add(body());
        let c = bodies.add(body());
        // Removing the first body moves the last into its slot.
        bodies.remove(a);
        bodies.validate_existing_handle(b);
        bodies.validate_existing_handle(c);
        assert!(bodies.get(b).is_some());
        assert!(bodies.get(c).is_some());
    }

    #[test]
    fn test_handle_reuse_after_removal() {
        let mut bodies = Bodies::with_capacity(4);
        let a = bodies.add(body());
        bodies.remove(a);
        let reused = bodies.add(body());
        assert_eq!(reused, a);
        assert!(bodies.body_exists(reused));
    }

    #[test]
    fn test_strand_state_only_on_hair_bodies() {
        let mut hair = BodySim::new(BodyKind::hair_system(), RigidPose::IDENTITY);
        assert_eq!(hair.strand_vertices().unwrap().len(), 0);
        hair.set_strand_vertices(vec![Vec3::ONE]);
        assert_eq!(hair.strand_vertices().unwrap().len(), 1);

        let rigid = BodySim::new(BodyKind::Rigid, RigidPose::IDENTITY);
        assert!(rigid.strand_vertices().is_none());
    }
}
