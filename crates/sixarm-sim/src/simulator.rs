//! The simulator boundary.
//!
//! Everything the control stack needs from a rigid-body engine is captured
//! by the [`Simulator`] trait: body loading, joint introspection, motor
//! commands, stepping, contact queries, link-state (forward-kinematics)
//! queries, and the optional debug sliders.  The rest of the workspace only
//! ever talks to the trait, so the engine can be swapped without touching
//! control logic.

use sixarm_kinematics::Pose;
use sixarm_types::{ArmError, ModelDescription};

/// Opaque handle to a body instantiated in the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// Opaque handle to a debug slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliderHandle(pub usize);

/// Raw per-joint introspection record, as reported by the engine.
///
/// This is the untyped source material [`JointRegistry`][crate::registry::JointRegistry]
/// turns into [`JointDescriptor`][sixarm_types::JointDescriptor]s; `type_code`
/// is decoded via [`JointType::from_code`][sixarm_types::JointType::from_code].
#[derive(Debug, Clone)]
pub struct JointInfo {
    pub index: usize,
    pub name: String,
    pub type_code: u8,
    pub lower_limit: f32,
    pub upper_limit: f32,
    pub max_force: f32,
    pub max_velocity: f32,
}

/// One batched position-control command: parallel arrays covering exactly
/// the joints being commanded.
#[derive(Debug, Clone, Default)]
pub struct PositionCommand {
    pub joint_indices: Vec<usize>,
    pub targets: Vec<f32>,
    pub target_velocities: Vec<f32>,
    pub position_gains: Vec<f32>,
    pub forces: Vec<f32>,
}

impl PositionCommand {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            joint_indices: Vec::with_capacity(capacity),
            targets: Vec::with_capacity(capacity),
            target_velocities: Vec::with_capacity(capacity),
            position_gains: Vec::with_capacity(capacity),
            forces: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.joint_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joint_indices.is_empty()
    }
}

/// The contract a rigid-body engine must satisfy.
pub trait Simulator {
    /// Instantiate a body from its description at a world-space position and
    /// orientation (unit quaternion, `[x, y, z, w]`).
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::LoadFailed`] if the description cannot be
    /// instantiated.  Fatal at startup; never retried.
    fn load_model(
        &mut self,
        description: &ModelDescription,
        position: [f32; 3],
        orientation: [f32; 4],
    ) -> Result<BodyHandle, ArmError>;

    /// Number of joints the engine reports for `body`.
    fn joint_count(&self, body: BodyHandle) -> usize;

    /// Introspection record for one joint.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Simulator`] for an unknown body or joint index.
    fn joint_info(&self, body: BodyHandle, index: usize) -> Result<JointInfo, ArmError>;

    /// Disable the joint's passive velocity motor (zero target velocity,
    /// zero force) so it does not drift before the first position command.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Simulator`] for an unknown body or joint index.
    fn disable_velocity_motor(&mut self, body: BodyHandle, index: usize) -> Result<(), ArmError>;

    /// Issue one batched position-control command.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Simulator`] if the command's parallel arrays
    /// disagree in length or reference an unknown joint index.
    fn set_position_targets(
        &mut self,
        body: BodyHandle,
        command: &PositionCommand,
    ) -> Result<(), ArmError>;

    /// Current positions of the given joints.
    fn joint_positions(&self, body: BodyHandle, indices: &[usize]) -> Vec<f32>;

    /// Advance the simulation by exactly one fixed timestep.
    fn step(&mut self);

    /// Number of contact points in the whole world right now.
    fn contact_count(&self) -> usize;

    /// World-frame pose of a link, computed with forward kinematics.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Simulator`] for an unknown body or link index.
    fn link_pose(&self, body: BodyHandle, link_index: usize) -> Result<Pose, ArmError>;

    /// Create an interactive numeric slider (debug-only path; headless
    /// implementations return the initial value forever).
    fn add_slider(&mut self, label: &str, min: f32, max: f32, initial: f32) -> SliderHandle;

    /// Current value of a slider.
    fn read_slider(&self, slider: SliderHandle) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_command_with_capacity_starts_empty() {
        let command = PositionCommand::with_capacity(6);
        assert!(command.is_empty());
        assert_eq!(command.len(), 0);
    }

    #[test]
    fn position_command_len_tracks_indices() {
        let mut command = PositionCommand::default();
        command.joint_indices.push(3);
        command.targets.push(0.5);
        command.target_velocities.push(0.0);
        command.position_gains.push(0.04);
        command.forces.push(150.0);
        assert_eq!(command.len(), 1);
    }
}
