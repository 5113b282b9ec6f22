//! Rigid-body pose: position plus orientation.
//!
//! Orientation is stored as a unit quaternion; Euler-angle (roll/pitch/yaw)
//! construction and extraction are provided so both representations are
//! first-class.  The conversion convention is nalgebra's intrinsic
//! roll-pitch-yaw.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Position (meters) plus orientation of a link or goal in the base frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
}

impl Pose {
    /// Create a pose from a position and a unit quaternion.
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Origin with no rotation.
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Create a pose from a position and roll/pitch/yaw Euler angles.
    pub fn from_euler(position: Vector3<f32>, roll: f32, pitch: f32, yaw: f32) -> Self {
        Self::new(position, UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Extract the orientation as (roll, pitch, yaw) Euler angles.
    pub fn euler_angles(&self) -> (f32, f32, f32) {
        self.orientation.euler_angles()
    }

    /// View this pose as an isometry for composition.
    pub fn isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }
}

impl From<Isometry3<f32>> for Pose {
    fn from(iso: Isometry3<f32>) -> Self {
        Self::new(iso.translation.vector, iso.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
