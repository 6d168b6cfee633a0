use glam::{Quat, Vec3};

/// Represents a rigid transformation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    /// Orientation of the pose.
    pub orientation: Quat,
    /// Position of the pose.
    pub position: Vec3,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Creates a rigid pose with the given position and orientation.
    #[inline(always)]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            orientation,
            position,
        }
    }

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position,
        }
    }

    /// Transforms a point by the rigid pose: v * pose.orientation + pose.position.
    #[inline(always)]
    pub fn transform(&self, v: Vec3) -> Vec3 {
        self.orientation * v + self.position
    }

    /// Transforms a point by the inverse of the rigid pose:
    /// (v - pose.position) * pose.orientation^-1.
    #[inline(always)]
    pub fn transform_by_inverse(&self, v: Vec3) -> Vec3 {
        self.orientation.conjugate() * (v - self.position)
    }

    /// Concatenates two poses: the result maps local space through `local` and then `parent`.
    #[inline(always)]
    pub fn multiply(parent: &RigidPose, local: &RigidPose) -> RigidPose {
        RigidPose {
            orientation: (parent.orientation * local.orientation).normalize(),
            position: parent.transform(local.position),
        }
    }

    /// Inverts the rigid transformation of the pose.
    #[inline(always)]
    pub fn invert(&self) -> RigidPose {
        let inverse_orientation = self.orientation.conjugate();
        RigidPose {
            orientation: inverse_orientation,
            position: inverse_orientation * -self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_transform_round_trip() {
        let pose = RigidPose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(FRAC_PI_2),
        );
        let v = Vec3::new(0.5, -1.5, 4.0);
        let round_tripped = pose.transform_by_inverse(pose.transform(v));
        assert_relative_eq!(round_tripped.x, v.x, epsilon = 1e-5);
        assert_relative_eq!(round_tripped.y, v.y, epsilon = 1e-5);
        assert_relative_eq!(round_tripped.z, v.z, epsilon = 1e-5);
    }

    #[test]
    fn test_multiply_matches_sequential_transforms() {
        let parent = RigidPose::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(0.3));
        let local = RigidPose::new(Vec3::new(2.0, 0.0, 0.0), Quat::from_rotation_x(-0.7));
        let composed = RigidPose::multiply(&parent, &local);
        let v = Vec3::new(0.25, 0.5, -0.75);
        let expected = parent.transform(local.transform(v));
        let actual = composed.transform(v);
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(actual.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn test_invert_composes_to_identity() {
        let pose = RigidPose::new(Vec3::new(-3.0, 0.5, 2.0), Quat::from_rotation_y(1.1));
        let identity = RigidPose::multiply(&pose, &pose.invert());
        assert_relative_eq!(identity.position.length(), 0.0, epsilon = 1e-5);
        assert!(identity.orientation.dot(Quat::IDENTITY).abs() > 1.0 - 1e-5);
    }
}
