//! Kinematic chain extracted from an [`ArmDescription`].
//!
//! A [`KinematicChain`] is the ordered list of actuated joints from the base
//! link to the end-effector flange.  Fixed joints contribute no degree of
//! freedom; their static transforms are folded into the next actuated
//! joint's origin (or into the trailing end-effector offset).

use nalgebra::{Isometry3, Translation3, UnitQuaternion, UnitVector3, Vector3};
use sixarm_types::{ArmDescription, ArmError, JointType};

use crate::pose::Pose;

/// One actuated joint of the chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    pub name: String,
    /// Static transform from the parent link frame to this joint frame,
    /// including any folded fixed joints.
    pub origin: Isometry3<f32>,
    /// Motion axis in the joint's local frame.
    pub axis: UnitVector3<f32>,
    /// `true` for prismatic joints, `false` for revolute.
    pub prismatic: bool,
    pub lower_limit: f32,
    pub upper_limit: f32,
}

/// Ordered actuated joints from base to end-effector.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    joints: Vec<ChainJoint>,
    /// Transform from the last actuated joint's child link to the
    /// end-effector frame (trailing fixed joints).
    ee_offset: Isometry3<f32>,
}

impl KinematicChain {
    /// Build the chain from a serial robot description.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::LoadFailed`] if the description contains a
    /// spherical or planar joint (this controller only models single-axis
    /// joints) or an actuated joint with a zero-length axis.
    pub fn from_description(description: &ArmDescription) -> Result<Self, ArmError> {
        let mut joints = Vec::new();
        let mut pending_fixed = Isometry3::identity();

        for spec in &description.joints {
            let origin = origin_isometry(spec.origin_xyz, spec.origin_rpy);
            match spec.joint_type {
                JointType::Fixed => {
                    pending_fixed *= origin;
                }
                JointType::Revolute | JointType::Prismatic => {
                    let axis = Vector3::new(spec.axis[0], spec.axis[1], spec.axis[2]);
                    let axis = UnitVector3::try_new(axis, 1e-6).ok_or_else(|| {
                        ArmError::LoadFailed {
                            what: format!("joint '{}'", spec.name),
                            details: "actuated joint has a zero-length axis".to_string(),
                        }
                    })?;
                    joints.push(ChainJoint {
                        name: spec.name.clone(),
                        origin: pending_fixed * origin,
                        axis,
                        prismatic: spec.joint_type == JointType::Prismatic,
                        lower_limit: spec.lower_limit,
                        upper_limit: spec.upper_limit,
                    });
                    pending_fixed = Isometry3::identity();
                }
                JointType::Spherical | JointType::Planar => {
                    return Err(ArmError::LoadFailed {
                        what: format!("joint '{}'", spec.name),
                        details: format!(
                            "unsupported joint type {:?} in a serial chain",
                            spec.joint_type
                        ),
                    });
                }
            }
        }

        Ok(Self {
            joints,
            ee_offset: pending_fixed,
        })
    }

    /// Number of actuated degrees of freedom.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Actuated joint names in chain order.
    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// Forward kinematics: joint values to end-effector pose in the base
    /// frame.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.dof()`; that is a caller bug, not a
    /// runtime condition.
    pub fn forward_kinematics(&self, q: &[f32]) -> Pose {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut transform = Isometry3::identity();
        for (joint, &value) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            transform *= joint_motion(&joint.axis, joint.prismatic, value);
        }
        Pose::from(transform * self.ee_offset)
    }

    /// Per-joint origins and axes in the base frame, plus the end-effector
    /// position, for Jacobian assembly.
    pub fn joint_frames(
        &self,
        q: &[f32],
    ) -> (Vec<Vector3<f32>>, Vec<Vector3<f32>>, Vector3<f32>) {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut transform = Isometry3::identity();
        let mut origins = Vec::with_capacity(self.dof());
        let mut axes = Vec::with_capacity(self.dof());

        for (joint, &value) in self.joints.iter().zip(q.iter()) {
            transform *= joint.origin;
            // Frame recorded before the joint's own motion is applied.
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * joint.axis.into_inner());
            transform *= joint_motion(&joint.axis, joint.prismatic, value);
        }

        let ee = (transform * self.ee_offset).translation.vector;
        (origins, axes, ee)
    }

    /// Clamp joint values to the registered limits.
    pub fn clamp(&self, q: &mut [f32]) {
        for (value, joint) in q.iter_mut().zip(self.joints.iter()) {
            *value = value.clamp(joint.lower_limit, joint.upper_limit);
        }
    }
}

/// Convert an xyz translation plus roll/pitch/yaw rotation to an isometry.
pub fn origin_isometry(xyz: [f32; 3], rpy: [f32; 3]) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(xyz[0], xyz[1], xyz[2]),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    )
}

/// The transform contributed by a single joint at a given value.
pub fn joint_motion(axis: &UnitVector3<f32>, prismatic: bool, value: f32) -> Isometry3<f32> {
    if prismatic {
        Isometry3::from_parts(
            Translation3::from(axis.into_inner() * value),
            UnitQuaternion::identity(),
        )
    } else {
        Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, value),
        )
    }
}
