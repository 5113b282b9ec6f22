//! Joint discovery and the typed robot model.
//!
//! At startup the registry walks every joint the simulator reports for the
//! robot body, decodes the raw records into [`JointDescriptor`]s, marks the
//! six control joints, and disables their passive velocity motors.  The
//! result is a [`RobotModel`]: the one source of truth about joint indices,
//! limits, and effort caps for the rest of the stack.

use std::collections::HashMap;

use sixarm_types::{ArmError, JointDescriptor, JointType};
use tracing::{debug, info};

use crate::simulator::{BodyHandle, Simulator};

/// The manipulator's six actuated joints, base to wrist.  Every one of these
/// must exist in the loaded robot or startup fails.
pub const CONTROL_JOINTS: [&str; 6] = [
    "shoulder_pan_joint",
    "shoulder_lift_joint",
    "elbow_joint",
    "wrist_1_joint",
    "wrist_2_joint",
    "wrist_3_joint",
];

/// Everything the control stack knows about the loaded robot.
#[derive(Debug)]
pub struct RobotModel {
    body: BodyHandle,
    end_effector_link: usize,
    joints: HashMap<String, JointDescriptor>,
    /// Controllable joint names in [`CONTROL_JOINTS`] order.
    controllable: Vec<String>,
}

impl RobotModel {
    /// Descriptor for a joint by name.
    pub fn joint(&self, name: &str) -> Option<&JointDescriptor> {
        self.joints.get(name)
    }

    /// Controllable joint names in command order.
    pub fn controllable_joints(&self) -> &[String] {
        &self.controllable
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Link index used for end-effector pose queries (the flange link).
    pub fn end_effector_link(&self) -> usize {
        self.end_effector_link
    }
}

/// Builds a [`RobotModel`] from simulator introspection.
pub struct JointRegistry;

impl JointRegistry {
    /// Enumerate and register every joint of `body`.
    ///
    /// Controllable revolute joints get their velocity motors disabled so
    /// they hold still until the first position command.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::LoadFailed`] for a joint type code the controller
    /// does not know, and [`ArmError::MissingControlJoint`] if any of the six
    /// control joints is absent.  Both mean the robot description does not
    /// match this controller and are fatal.
    pub fn build<S: Simulator>(sim: &mut S, body: BodyHandle) -> Result<RobotModel, ArmError> {
        let count = sim.joint_count(body);
        let mut joints = HashMap::with_capacity(count);

        for index in 0..count {
            let info = sim.joint_info(body, index)?;
            let joint_type = JointType::from_code(info.type_code)?;
            let controllable = CONTROL_JOINTS.contains(&info.name.as_str());

            if controllable && joint_type == JointType::Revolute {
                sim.disable_velocity_motor(body, index)?;
            }

            debug!(
                joint = %info.name,
                index,
                ?joint_type,
                controllable,
                "registered joint"
            );
            joints.insert(
                info.name.clone(),
                JointDescriptor {
                    index,
                    name: info.name,
                    joint_type,
                    lower_limit: info.lower_limit,
                    upper_limit: info.upper_limit,
                    max_force: info.max_force,
                    max_velocity: info.max_velocity,
                    controllable,
                },
            );
        }

        let mut controllable = Vec::with_capacity(CONTROL_JOINTS.len());
        for name in CONTROL_JOINTS {
            if !joints.contains_key(name) {
                return Err(ArmError::MissingControlJoint {
                    name: name.to_string(),
                });
            }
            controllable.push(name.to_string());
        }

        info!(
            joints = joints.len(),
            controllable = controllable.len(),
            "robot model ready"
        );
        Ok(RobotModel {
            body,
            end_effector_link: count - 1,
            joints,
            controllable,
        })
    }
}
