//! In-process simulator implementation.
//!
//! [`HeadlessSim`] models only what the control stack observes: servoed
//! joint positions integrated at a fixed timestep, coarse box contacts, and
//! forward-kinematic link poses.  No gravity, no dynamics: a joint without
//! an active motor simply holds its position.  That is enough to exercise
//! the whole stack in tests and CI without a physics backend.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use sixarm_kinematics::{joint_motion, origin_isometry, Pose};
use sixarm_types::{ArmDescription, ArmError, CuboidDescription, JointType, ModelDescription};
use tracing::{debug, info};

use crate::simulator::{BodyHandle, JointInfo, PositionCommand, Simulator, SliderHandle};

/// Fixed integration timestep (240 Hz, the conventional physics rate).
pub const TIMESTEP_S: f32 = 1.0 / 240.0;

/// Per-joint motor state.
#[derive(Debug, Clone)]
enum Motor {
    /// Engine default: hold the current position (zero target velocity).
    VelocityHold,
    /// Motor disabled; the joint coasts (here: holds, no dynamics).
    Free,
    /// Active position servo.
    Position {
        target: f32,
        gain: f32,
        max_force: f32,
    },
}

#[derive(Debug)]
struct ArmBody {
    description: ArmDescription,
    base: Isometry3<f32>,
    /// One entry per joint index; fixed joints stay at zero.
    positions: Vec<f32>,
    motors: Vec<Motor>,
}

#[derive(Debug)]
struct CuboidBody {
    description: CuboidDescription,
    base: Isometry3<f32>,
}

#[derive(Debug)]
enum Body {
    Arm(ArmBody),
    Cuboid(CuboidBody),
}

/// A kinematic stand-in for a rigid-body engine.
#[derive(Debug, Default)]
pub struct HeadlessSim {
    bodies: Vec<Body>,
    sliders: Vec<f32>,
    steps: u64,
}

impl HeadlessSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps taken since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn arm(&self, body: BodyHandle) -> Result<&ArmBody, ArmError> {
        match self.bodies.get(body.0) {
            Some(Body::Arm(arm)) => Ok(arm),
            Some(Body::Cuboid(_)) => Err(ArmError::Simulator(format!(
                "body {} has no joints",
                body.0
            ))),
            None => Err(ArmError::Simulator(format!("unknown body {}", body.0))),
        }
    }

    fn arm_mut(&mut self, body: BodyHandle) -> Result<&mut ArmBody, ArmError> {
        match self.bodies.get_mut(body.0) {
            Some(Body::Arm(arm)) => Ok(arm),
            Some(Body::Cuboid(_)) => Err(ArmError::Simulator(format!(
                "body {} has no joints",
                body.0
            ))),
            None => Err(ArmError::Simulator(format!("unknown body {}", body.0))),
        }
    }

    /// World-space positions of every link origin of an arm.
    fn link_origins(arm: &ArmBody) -> Vec<Vector3<f32>> {
        let mut transform = arm.base;
        let mut origins = Vec::with_capacity(arm.description.joints.len());
        for (spec, &value) in arm.description.joints.iter().zip(arm.positions.iter()) {
            transform *= origin_isometry(spec.origin_xyz, spec.origin_rpy);
            if let Some(axis) = actuated_axis(spec) {
                transform *= joint_motion(&axis, spec.joint_type == JointType::Prismatic, value);
            }
            origins.push(transform.translation.vector);
        }
        origins
    }
}

fn actuated_axis(spec: &sixarm_types::JointSpec) -> Option<nalgebra::UnitVector3<f32>> {
    match spec.joint_type {
        JointType::Revolute | JointType::Prismatic => nalgebra::UnitVector3::try_new(
            Vector3::new(spec.axis[0], spec.axis[1], spec.axis[2]),
            1e-6,
        ),
        _ => None,
    }
}

fn base_isometry(position: [f32; 3], orientation: [f32; 4]) -> Isometry3<f32> {
    let quat = Quaternion::new(
        orientation[3],
        orientation[0],
        orientation[1],
        orientation[2],
    );
    Isometry3::from_parts(
        Translation3::new(position[0], position[1], position[2]),
        UnitQuaternion::from_quaternion(quat),
    )
}

/// Strict interior test: touching a face does not count as contact.
fn inside_box(point: &Vector3<f32>, center: &Vector3<f32>, half_extents: [f32; 3]) -> bool {
    (point.x - center.x).abs() < half_extents[0]
        && (point.y - center.y).abs() < half_extents[1]
        && (point.z - center.z).abs() < half_extents[2]
}

impl Simulator for HeadlessSim {
    fn load_model(
        &mut self,
        description: &ModelDescription,
        position: [f32; 3],
        orientation: [f32; 4],
    ) -> Result<BodyHandle, ArmError> {
        let base = base_isometry(position, orientation);
        let body = match description {
            ModelDescription::Arm(arm) => {
                if arm.joints.is_empty() {
                    return Err(ArmError::LoadFailed {
                        what: format!("arm '{}'", arm.name),
                        details: "description has no joints".to_string(),
                    });
                }
                info!(name = %arm.name, joints = arm.joints.len(), "loading arm body");
                Body::Arm(ArmBody {
                    description: arm.clone(),
                    base,
                    positions: vec![0.0; arm.joints.len()],
                    motors: vec![Motor::VelocityHold; arm.joints.len()],
                })
            }
            ModelDescription::Cuboid(cuboid) => {
                if cuboid.half_extents.iter().any(|&h| h <= 0.0) {
                    return Err(ArmError::LoadFailed {
                        what: format!("cuboid '{}'", cuboid.name),
                        details: "half extents must be positive".to_string(),
                    });
                }
                info!(name = %cuboid.name, "loading cuboid body");
                Body::Cuboid(CuboidBody {
                    description: cuboid.clone(),
                    base,
                })
            }
        };
        self.bodies.push(body);
        Ok(BodyHandle(self.bodies.len() - 1))
    }

    fn joint_count(&self, body: BodyHandle) -> usize {
        match self.bodies.get(body.0) {
            Some(Body::Arm(arm)) => arm.description.joints.len(),
            _ => 0,
        }
    }

    fn joint_info(&self, body: BodyHandle, index: usize) -> Result<JointInfo, ArmError> {
        let arm = self.arm(body)?;
        let spec = arm.description.joints.get(index).ok_or_else(|| {
            ArmError::Simulator(format!("body {} has no joint {index}", body.0))
        })?;
        Ok(JointInfo {
            index,
            name: spec.name.clone(),
            type_code: spec.joint_type.code(),
            lower_limit: spec.lower_limit,
            upper_limit: spec.upper_limit,
            max_force: spec.max_force,
            max_velocity: spec.max_velocity,
        })
    }

    fn disable_velocity_motor(&mut self, body: BodyHandle, index: usize) -> Result<(), ArmError> {
        let arm = self.arm_mut(body)?;
        let motor = arm.motors.get_mut(index).ok_or_else(|| {
            ArmError::Simulator(format!("body {} has no joint {index}", body.0))
        })?;
        *motor = Motor::Free;
        debug!(joint = index, "velocity motor disabled");
        Ok(())
    }

    fn set_position_targets(
        &mut self,
        body: BodyHandle,
        command: &PositionCommand,
    ) -> Result<(), ArmError> {
        let count = command.joint_indices.len();
        if command.targets.len() != count
            || command.target_velocities.len() != count
            || command.position_gains.len() != count
            || command.forces.len() != count
        {
            return Err(ArmError::Simulator(
                "position command arrays disagree in length".to_string(),
            ));
        }

        let handle = body.0;
        let arm = self.arm_mut(body)?;
        for i in 0..count {
            let index = command.joint_indices[i];
            let spec = arm
                .description
                .joints
                .get(index)
                .ok_or_else(|| ArmError::Simulator(format!("body {handle} has no joint {index}")))?;
            if spec.joint_type == JointType::Fixed {
                return Err(ArmError::Simulator(format!(
                    "joint '{}' is fixed and cannot be commanded",
                    spec.name
                )));
            }
            arm.motors[index] = Motor::Position {
                target: command.targets[i],
                gain: command.position_gains[i],
                max_force: command.forces[i],
            };
        }
        Ok(())
    }

    fn joint_positions(&self, body: BodyHandle, indices: &[usize]) -> Vec<f32> {
        match self.bodies.get(body.0) {
            Some(Body::Arm(arm)) => indices
                .iter()
                .map(|&i| arm.positions.get(i).copied().unwrap_or(0.0))
                .collect(),
            _ => vec![0.0; indices.len()],
        }
    }

    fn step(&mut self) {
        for body in &mut self.bodies {
            let Body::Arm(arm) = body else { continue };
            for (index, motor) in arm.motors.iter().enumerate() {
                let Motor::Position {
                    target,
                    gain,
                    max_force,
                } = motor
                else {
                    continue;
                };
                if *max_force <= 0.0 {
                    continue;
                }
                let spec = &arm.description.joints[index];
                let position = arm.positions[index];
                let step_cap = spec.max_velocity * TIMESTEP_S;
                let delta = (gain * (target - position)).clamp(-step_cap, step_cap);
                arm.positions[index] =
                    (position + delta).clamp(spec.lower_limit, spec.upper_limit);
            }
        }
        self.steps += 1;
    }

    fn contact_count(&self) -> usize {
        let mut contacts = 0;
        for body in &self.bodies {
            let Body::Arm(arm) = body else { continue };
            let origins = Self::link_origins(arm);
            for other in &self.bodies {
                let Body::Cuboid(cuboid) = other else { continue };
                let center = cuboid.base.translation.vector;
                contacts += origins
                    .iter()
                    .filter(|p| inside_box(p, &center, cuboid.description.half_extents))
                    .count();
            }
        }
        contacts
    }

    fn link_pose(&self, body: BodyHandle, link_index: usize) -> Result<Pose, ArmError> {
        let arm = self.arm(body)?;
        if link_index >= arm.description.joints.len() {
            return Err(ArmError::Simulator(format!(
                "body {} has no link {link_index}",
                body.0
            )));
        }
        let mut transform = arm.base;
        for (spec, &value) in arm
            .description
            .joints
            .iter()
            .zip(arm.positions.iter())
            .take(link_index + 1)
        {
            transform *= origin_isometry(spec.origin_xyz, spec.origin_rpy);
            if let Some(axis) = actuated_axis(spec) {
                transform *= joint_motion(&axis, spec.joint_type == JointType::Prismatic, value);
            }
        }
        Ok(Pose::from(transform))
    }

    fn add_slider(&mut self, label: &str, _min: f32, _max: f32, initial: f32) -> SliderHandle {
        debug!(label, initial, "slider registered (headless: value is constant)");
        self.sliders.push(initial);
        SliderHandle(self.sliders.len() - 1)
    }

    fn read_slider(&self, slider: SliderHandle) -> f32 {
        self.sliders.get(slider.0).copied().unwrap_or(0.0)
    }
}
