//! Embedded robot and environment descriptions.
//!
//! Shipping the descriptions as data keeps a general-purpose URDF parser
//! out of scope: the simulator instantiates them directly, and the JSON
//! form of [`ur5e`] is the serialized kinematic tree handed to the
//! objective solver at startup.

use sixarm_types::{ArmDescription, CuboidDescription, JointSpec, JointType};
use std::f32::consts::{PI, TAU};

/// World-space placement of the table body, matching the classic bench
/// setup: tabletop surface at z ≈ 0, robot base at the origin on top.
pub const TABLE_POSITION: [f32; 3] = [0.5, 0.0, -0.63];

/// Effort cap for the three large proximal joints (N·m).
const SHOULDER_FORCE: f32 = 150.0;
/// Effort cap for the three wrist joints (N·m).
const WRIST_FORCE: f32 = 28.0;

fn revolute(
    name: &str,
    xyz: [f32; 3],
    axis: [f32; 3],
    lower: f32,
    upper: f32,
    force: f32,
) -> JointSpec {
    JointSpec {
        name: name.to_string(),
        joint_type: JointType::Revolute,
        origin_xyz: xyz,
        origin_rpy: [0.0; 3],
        axis,
        lower_limit: lower,
        upper_limit: upper,
        max_force: force,
        max_velocity: PI,
    }
}

fn fixed(name: &str, xyz: [f32; 3]) -> JointSpec {
    JointSpec {
        name: name.to_string(),
        joint_type: JointType::Fixed,
        origin_xyz: xyz,
        origin_rpy: [0.0; 3],
        axis: [0.0; 3],
        lower_limit: 0.0,
        upper_limit: 0.0,
        max_force: 0.0,
        max_velocity: 0.0,
    }
}

/// The UR5e-class 6-axis manipulator: six revolute joints between a fixed
/// base mount and a fixed end-effector flange.
///
/// Link lengths follow the UR5e (shoulder height 0.1625 m, upper arm
/// 0.425 m, forearm 0.3922 m, wrist offsets 0.1333/0.0997/0.0996 m).
pub fn ur5e() -> ArmDescription {
    ArmDescription {
        name: "ur5e".to_string(),
        joints: vec![
            fixed("base_link_fixed_joint", [0.0, 0.0, 0.0]),
            revolute(
                "shoulder_pan_joint",
                [0.0, 0.0, 0.1625],
                [0.0, 0.0, 1.0],
                -TAU,
                TAU,
                SHOULDER_FORCE,
            ),
            revolute(
                "shoulder_lift_joint",
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                -TAU,
                TAU,
                SHOULDER_FORCE,
            ),
            revolute(
                "elbow_joint",
                [0.0, 0.0, 0.425],
                [0.0, 1.0, 0.0],
                -PI,
                PI,
                SHOULDER_FORCE,
            ),
            revolute(
                "wrist_1_joint",
                [0.0, 0.0, 0.3922],
                [0.0, 1.0, 0.0],
                -TAU,
                TAU,
                WRIST_FORCE,
            ),
            revolute(
                "wrist_2_joint",
                [0.0, 0.1333, 0.0],
                [0.0, 0.0, 1.0],
                -TAU,
                TAU,
                WRIST_FORCE,
            ),
            revolute(
                "wrist_3_joint",
                [0.0, 0.0, 0.0997],
                [0.0, 1.0, 0.0],
                -TAU,
                TAU,
                WRIST_FORCE,
            ),
            fixed("ee_fixed_joint", [0.0, 0.0996, 0.0]),
        ],
    }
}

/// The work table: a static box whose top surface sits at z = 0 when placed
/// at [`TABLE_POSITION`].
pub fn table() -> CuboidDescription {
    CuboidDescription {
        name: "table".to_string(),
        half_extents: [0.75, 0.5, 0.63],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ur5e_has_six_revolute_joints() {
        let arm = ur5e();
        let revolute_count = arm
            .joints
            .iter()
            .filter(|j| j.joint_type == JointType::Revolute)
            .count();
        assert_eq!(revolute_count, 6);
        assert_eq!(arm.joints.len(), 8);
    }

    #[test]
    fn ur5e_flange_is_the_last_joint() {
        let arm = ur5e();
        assert_eq!(arm.joints.last().unwrap().name, "ee_fixed_joint");
        assert_eq!(arm.joints.last().unwrap().joint_type, JointType::Fixed);
    }

    #[test]
    fn wrist_joints_have_lower_effort_caps_than_shoulder() {
        let arm = ur5e();
        let shoulder = arm
            .joints
            .iter()
            .find(|j| j.name == "shoulder_pan_joint")
            .unwrap();
        let wrist = arm.joints.iter().find(|j| j.name == "wrist_3_joint").unwrap();
        assert!(shoulder.max_force > wrist.max_force);
    }

    #[test]
    fn table_top_sits_at_world_zero() {
        let top = TABLE_POSITION[2] + table().half_extents[2];
        assert!(top.abs() < 1e-6);
    }
}
