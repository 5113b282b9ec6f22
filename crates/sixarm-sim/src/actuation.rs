//! Turning solved configurations into motor commands.

use sixarm_types::{ArmError, JointConfiguration};
use tracing::debug;

use crate::registry::RobotModel;
use crate::simulator::{PositionCommand, Simulator};

/// Position-control gain applied to every commanded joint.  Deliberately
/// soft so motion between ticks stays smooth; the solver, not the servo,
/// decides how fast the arm moves.
pub const POSITION_GAIN: f32 = 0.04;

/// Translates a [`JointConfiguration`] into one batched position command.
pub struct ActuationController;

impl ActuationController {
    /// Command every joint named in `configuration`.
    ///
    /// Target velocities are zero and per-joint forces come from the
    /// registered effort caps.  Array order follows the configuration's
    /// insertion order, so identical configurations produce identical
    /// commands tick after tick.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::UnknownJoint`] if the configuration names a joint
    /// the model does not mark controllable: a solver defect, not a
    /// condition to paper over.
    pub fn apply<S: Simulator>(
        sim: &mut S,
        model: &RobotModel,
        configuration: &JointConfiguration,
    ) -> Result<(), ArmError> {
        let mut command = PositionCommand::with_capacity(configuration.len());

        for (name, target) in configuration.iter() {
            let descriptor = model
                .joint(name)
                .filter(|d| d.controllable)
                .ok_or_else(|| ArmError::UnknownJoint {
                    name: name.to_string(),
                })?;
            command.joint_indices.push(descriptor.index);
            command.targets.push(target);
            command.target_velocities.push(0.0);
            command.position_gains.push(POSITION_GAIN);
            command.forces.push(descriptor.max_force);
        }

        debug!(joints = command.len(), "applying position command");
        sim.set_position_targets(model.body(), &command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSim;
    use crate::registry::{JointRegistry, CONTROL_JOINTS};
    use crate::ur5e::ur5e;
    use approx::assert_relative_eq;
    use sixarm_types::ModelDescription;

    fn setup() -> (HeadlessSim, RobotModel) {
        let mut sim = HeadlessSim::new();
        let body = sim
            .load_model(
                &ModelDescription::Arm(ur5e()),
                [0.0; 3],
                [0.0, 0.0, 0.0, 1.0],
            )
            .unwrap();
        let model = JointRegistry::build(&mut sim, body).unwrap();
        (sim, model)
    }

    fn full_configuration() -> JointConfiguration {
        CONTROL_JOINTS
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), 0.1 * i as f32))
            .collect()
    }

    #[test]
    fn commands_drive_the_servo() {
        let (mut sim, model) = setup();
        let mut config = JointConfiguration::new();
        config.insert("elbow_joint", 0.3);

        ActuationController::apply(&mut sim, &model, &config).unwrap();
        for _ in 0..400 {
            sim.step();
        }

        let index = model.joint("elbow_joint").unwrap().index;
        let position = sim.joint_positions(model.body(), &[index])[0];
        assert_relative_eq!(position, 0.3, epsilon = 1e-3);
    }

    #[test]
    fn all_six_joints_commanded_in_one_batch() {
        let (mut sim, model) = setup();
        let config = full_configuration();
        ActuationController::apply(&mut sim, &model, &config).unwrap();

        for _ in 0..2000 {
            sim.step();
        }
        for (name, target) in config.iter() {
            let index = model.joint(name).unwrap().index;
            let position = sim.joint_positions(model.body(), &[index])[0];
            assert_relative_eq!(position, target, epsilon = 1e-3);
        }
    }

    #[test]
    fn unknown_joint_name_errors() {
        let (mut sim, model) = setup();
        let mut config = JointConfiguration::new();
        config.insert("ghost_joint", 0.1);

        let result = ActuationController::apply(&mut sim, &model, &config);
        assert!(matches!(result, Err(ArmError::UnknownJoint { .. })));
    }

    #[test]
    fn uncontrollable_joint_name_errors() {
        let (mut sim, model) = setup();
        let mut config = JointConfiguration::new();
        config.insert("ee_fixed_joint", 0.1);

        let result = ActuationController::apply(&mut sim, &model, &config);
        assert!(matches!(result, Err(ArmError::UnknownJoint { .. })));
    }
}
