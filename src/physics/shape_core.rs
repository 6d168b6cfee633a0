use glam::{Quat, Vec3};
use thiserror::Error;

use crate::physics::filters::{FilterAttributes, FilterData};
use crate::physics::handles::ShapeCoreId;
use crate::physics::pose::RigidPose;
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::id_pool::IdPool;

/// Describes why a shape's geometry cannot back a narrow phase primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("shape extent is not finite")]
    NonFiniteExtent,
    #[error("shape extent must be positive")]
    NonPositiveExtent,
    #[error("strand shape has no vertices")]
    EmptyStrandSet,
}

/// Closed set of shape kinds understood by the simulation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Sphere centered on the shape's local origin.
    Sphere {
        /// Radius of the sphere.
        radius: f32,
    },
    /// Capsule aligned with the shape's local Y axis.
    Capsule {
        /// Radius of the capsule's internal line segment.
        radius: f32,
        /// Half of the length of the capsule's internal line segment.
        half_length: f32,
    },
    /// Deformable hair system footprint: a vertex cloud swept by a per strand radius.
    /// The rest vertices are expressed in the shape's local space; a hair system
    /// body replaces them with its deformed state each step.
    HairStrands {
        /// Radius swept around every strand vertex.
        strand_radius: f32,
        /// Strand vertex positions in the shape's local space at rest.
        rest_vertices: Vec<Vec3>,
    },
}

/// Clamps an authored extent to something bounds math can always digest.
/// Degenerate extents fail volume creation, but bounds must stay finite.
#[inline(always)]
fn sanitize_extent(extent: f32) -> f32 {
    if extent.is_finite() {
        extent.max(0.0)
    } else {
        0.0
    }
}

impl ShapeGeometry {
    /// Checks that the geometry can back a narrow phase primitive.
    /// Bounds computation never requires this to pass.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            ShapeGeometry::Sphere { radius } => {
                if !radius.is_finite() {
                    return Err(GeometryError::NonFiniteExtent);
                }
                if *radius <= 0.0 {
                    return Err(GeometryError::NonPositiveExtent);
                }
            }
            ShapeGeometry::Capsule {
                radius,
                half_length,
            } => {
                if !radius.is_finite() || !half_length.is_finite() {
                    return Err(GeometryError::NonFiniteExtent);
                }
                if *radius <= 0.0 || *half_length <= 0.0 {
                    return Err(GeometryError::NonPositiveExtent);
                }
            }
            ShapeGeometry::HairStrands {
                strand_radius,
                rest_vertices,
            } => {
                if rest_vertices.is_empty() {
                    return Err(GeometryError::EmptyStrandSet);
                }
                if !strand_radius.is_finite()
                    || rest_vertices.iter().any(|v| !v.is_finite())
                {
                    return Err(GeometryError::NonFiniteExtent);
                }
                if *strand_radius <= 0.0 {
                    return Err(GeometryError::NonPositiveExtent);
                }
            }
        }
        Ok(())
    }

    /// Computes the bounding box of the shape in local space given an orientation.
    /// The result is symmetric around the local origin for the convex kinds and
    /// always finite, even for geometry that would fail validation.
    pub fn compute_local_bounds(&self, orientation: Quat) -> BoundingBox {
        match self {
            ShapeGeometry::Sphere { radius } => {
                let max = Vec3::splat(sanitize_extent(*radius));
                BoundingBox::new(-max, max)
            }
            ShapeGeometry::Capsule {
                radius,
                half_length,
            } => {
                let segment_offset = orientation * Vec3::Y;
                let max = (sanitize_extent(*half_length) * segment_offset).abs()
                    + Vec3::splat(sanitize_extent(*radius));
                BoundingBox::new(-max, max)
            }
            ShapeGeometry::HairStrands {
                strand_radius,
                rest_vertices,
            } => {
                let mut bounds = BoundingBox::ZERO;
                let mut any = false;
                for vertex in rest_vertices {
                    if !vertex.is_finite() {
                        continue;
                    }
                    let rotated = orientation * *vertex;
                    if any {
                        bounds.min = bounds.min.min(rotated);
                        bounds.max = bounds.max.max(rotated);
                    } else {
                        bounds = BoundingBox::new(rotated, rotated);
                        any = true;
                    }
                }
                bounds.inflate(sanitize_extent(*strand_radius))
            }
        }
    }
}

/// Immutable per shape snapshot authored independently of simulation:
/// geometry, local pose relative to the owning body, collision margin,
/// and filter metadata. Never mutated after registration; changing the
/// geometry means registering a new core and rebuilding any low level
/// volume built from the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeCore {
    /// Geometric description of the shape.
    pub geometry: ShapeGeometry,
    /// Pose of the shape relative to the owning body.
    pub local_pose: RigidPose,
    /// Collision margin the bounds must over approximate by.
    pub margin: f32,
    /// Collision group and mask metadata.
    pub filter_attributes: FilterAttributes,
    /// Application defined filter payload.
    pub filter_data: FilterData,
}

impl ShapeCore {
    /// Creates a core with an identity local pose, zero margin, and default filters.
    pub fn new(geometry: ShapeGeometry) -> Self {
        Self {
            geometry,
            local_pose: RigidPose::IDENTITY,
            margin: 0.0,
            filter_attributes: FilterAttributes::DEFAULT,
            filter_data: FilterData::default(),
        }
    }

    /// Returns the core with the given local pose.
    pub fn with_local_pose(mut self, local_pose: RigidPose) -> Self {
        self.local_pose = local_pose;
        self
    }

    /// Returns the core with the given collision margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        debug_assert!(margin >= 0.0, "Collision margins must be nonnegative.");
        self.margin = margin;
        self
    }

    /// Returns the core with the given filter attributes.
    pub fn with_filter_attributes(mut self, filter_attributes: FilterAttributes) -> Self {
        self.filter_attributes = filter_attributes;
        self
    }

    /// Returns the core with the given filter payload.
    pub fn with_filter_data(mut self, filter_data: FilterData) -> Self {
        self.filter_data = filter_data;
        self
    }
}

/// Registry owning the shape core snapshots referenced by shape simulations.
/// Ids are generation checked: removing a core and reusing its slot bumps the
/// generation, so a stale id held elsewhere can never resolve to the newcomer.
#[derive(Debug, Default)]
pub struct ShapeCores {
    slots: Vec<Option<ShapeCore>>,
    generations: Vec<u32>,
    ids: IdPool,
    count: usize,
}

impl ShapeCores {
    /// Creates an empty registry with the given slot capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            ids: IdPool::new(capacity),
            count: 0,
        }
    }

    /// Number of registered cores.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Registers a core snapshot and returns its id.
    pub fn add(&mut self, core: ShapeCore) -> ShapeCoreId {
        let index = self.ids.take() as usize;
        if index == self.slots.len() {
            self.slots.push(Some(core));
            self.generations.push(0);
        } else {
            debug_assert!(
                self.slots[index].is_none(),
                "The id pool handed out a slot that is still occupied."
            );
            self.slots[index] = Some(core);
        }
        self.count += 1;
        ShapeCoreId {
            index: index as u32,
            generation: self.generations[index],
        }
    }

    /// Checks whether an id refers to a currently registered core.
    #[inline(always)]
    pub fn core_exists(&self, id: ShapeCoreId) -> bool {
        let index = id.index as usize;
        index < self.slots.len()
            && self.generations[index] == id.generation
            && self.slots[index].is_some()
    }

    /// Gets the core referenced by an id, if it is still registered.
    #[inline(always)]
    pub fn get(&self, id: ShapeCoreId) -> Option<&ShapeCore> {
        if !self.core_exists(id) {
            return None;
        }
        self.slots[id.index as usize].as_ref()
    }

    /// Removes a core from the registry and returns it.
    /// The caller is responsible for tearing down any shape simulation still
    /// referencing the core before removing it.
    pub fn remove(&mut self, id: ShapeCoreId) -> Option<ShapeCore> {
        if !self.core_exists(id) {
            return None;
        }
        let index = id.index as usize;
        let core = self.slots[index].take();
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.ids.return_id(index as i32);
        self.count -= 1;
        core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_validate_rejects_degenerate_extents() {
        assert_eq!(
            ShapeGeometry::Sphere { radius: 0.0 }.validate(),
            Err(GeometryError::NonPositiveExtent)
        );
        assert_eq!(
            ShapeGeometry::Sphere { radius: f32::NAN }.validate(),
            Err(GeometryError::NonFiniteExtent)
        );
        assert_eq!(
            ShapeGeometry::Capsule {
                radius: 0.5,
                half_length: -1.0
            }
            .validate(),
            Err(GeometryError::NonPositiveExtent)
        );
        assert_eq!(
            ShapeGeometry::HairStrands {
                strand_radius: 0.1,
                rest_vertices: Vec::new()
            }
            .validate(),
            Err(GeometryError::EmptyStrandSet)
        );
        assert!(ShapeGeometry::Sphere { radius: 0.5 }.validate().is_ok());
    }

    #[test]
    fn test_sphere_bounds_ignore_orientation() {
        let sphere = ShapeGeometry::Sphere { radius: 2.0 };
        let bounds = sphere.compute_local_bounds(Quat::from_rotation_x(1.3));
        assert_eq!(bounds.min, Vec3::splat(-2.0));
        assert_eq!(bounds.max, Vec3::splat(2.0));
    }

    #[test]
    fn test_capsule_bounds_follow_segment() {
        let capsule = ShapeGeometry::Capsule {
            radius: 0.5,
            half_length: 2.0,
        };
        // Local Y axis rotated onto X: the long extent moves to X.
        let bounds = capsule.compute_local_bounds(Quat::from_rotation_z(-FRAC_PI_2));
        assert_relative_eq!(bounds.max.x, 2.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.y, 0.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.z, 0.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.min.x, -2.5, epsilon = 1e-5);
    }

    #[test]
    fn test_hair_bounds_cover_inflated_vertices() {
        let strands = ShapeGeometry::HairStrands {
            strand_radius: 0.25,
            rest_vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, -2.0, 0.5),
                Vec3::new(-0.5, 1.0, 3.0),
            ],
        };
        let bounds = strands.compute_local_bounds(Quat::IDENTITY);
        assert_eq!(bounds.min, Vec3::new(-0.75, -2.25, -0.25));
        assert_eq!(bounds.max, Vec3::new(1.25, 1.25, 3.25));
    }

    #[test]
    fn test_degenerate_geometry_still_bounds_finitely() {
        let sphere = ShapeGeometry::Sphere {
            radius: f32::INFINITY,
        };
        let bounds = sphere.compute_local_bounds(Quat::IDENTITY);
        assert!(bounds.min.is_finite() && bounds.max.is_finite());

        let strands = ShapeGeometry::HairStrands {
            strand_radius: 0.1,
            rest_vertices: vec![Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ONE],
        };
        let bounds = strands.compute_local_bounds(Quat::IDENTITY);
        assert!(bounds.min.is_finite() && bounds.max.is_finite());
    }

    #[test]
    fn test_registry_generation_checks() {
        let mut cores = ShapeCores::with_capacity(4);
        let id = cores.add(ShapeCore::new(ShapeGeometry::Sphere { radius: 1.0 }));
        assert!(cores.core_exists(id));
        assert!(cores.remove(id).is_some());
        assert!(!cores.core_exists(id));
        assert!(cores.remove(id).is_none());

        // Slot reuse must not let the stale id alias the new core.
        let replacement = cores.add(ShapeCore::new(ShapeGeometry::Sphere { radius: 9.0 }));
        assert_eq!(replacement.index, id.index);
        assert_ne!(replacement.generation, id.generation);
        assert!(cores.get(id).is_none());
        assert!(cores.get(replacement).is_some());
    }
}
