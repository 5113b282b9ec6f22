//! `sixarm-cli` – entry point for the manipulator control loop.
//!
//! This binary takes no arguments and keeps no persisted state.  It:
//!
//! 1. Initialises structured logging from the environment.
//! 2. Builds the headless scene: work table plus the UR5e-class arm.
//! 3. Registers the robot's joints and constructs the objective solver from
//!    the serialized kinematic tree.
//! 4. Runs the 30 Hz control loop until the process is killed.
//!
//! Set `SIXARM_MODE=sliders` for the debug path: six interactive sliders
//! (X/Y/Z/Rx/Ry/Rz) feed the numeric IK solver directly instead of the
//! objective solver.

use std::f32::consts::FRAC_PI_2;

use sixarm_kinematics::{IkSolver, KinematicChain, ObjectiveSolver, ObjectiveWeights, Pose};
use sixarm_runtime::{ControlLoop, ControlLoopConfig};
use sixarm_sim::ur5e::{table, ur5e, TABLE_POSITION};
use sixarm_sim::{HeadlessSim, JointRegistry, Simulator};
use sixarm_types::{ArmError, GoalSet, ModelDescription};
use tracing::info;

const IDENTITY_ORIENTATION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// The demo goal: hold near the centre of the workspace while the
/// liveliness objective keeps the arm in continuous motion.
const GOAL_POSITION: [f32; 3] = [0.47, -0.03, 0.64];
const GOAL_LIVELINESS: [f32; 3] = [0.15, 0.05, 0.4];

fn main() -> Result<(), ArmError> {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set SIXARM_LOG_FORMAT=json to emit newline-delimited JSON logs
    // suitable for log aggregators.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("SIXARM_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    // ── Scene ─────────────────────────────────────────────────────────────
    let mut sim = HeadlessSim::new();
    sim.load_model(
        &ModelDescription::Cuboid(table()),
        TABLE_POSITION,
        IDENTITY_ORIENTATION,
    )?;
    let arm = ur5e();
    let body = sim.load_model(
        &ModelDescription::Arm(arm.clone()),
        [0.0; 3],
        IDENTITY_ORIENTATION,
    )?;
    let model = JointRegistry::build(&mut sim, body)?;

    if std::env::var("SIXARM_MODE").as_deref() == Ok("sliders") {
        return run_slider_mode(sim, model, &arm);
    }

    // ── Objective solver ──────────────────────────────────────────────────
    // The solver receives the robot only as its serialized kinematic tree;
    // it never touches the simulator.
    let tree = serde_json::to_string(&arm)
        .map_err(|e| ArmError::Solver(format!("failed to serialize kinematic tree: {e}")))?;
    let solver =
        ObjectiveSolver::from_description(&tree, Pose::identity(), ObjectiveWeights::default())?;

    let goals = GoalSet {
        position: GOAL_POSITION,
        orientation_rpy: [0.0; 3],
        liveliness: GOAL_LIVELINESS,
    };

    info!(?goals, "starting goal-driven control loop");
    let mut control = ControlLoop::new(
        sim,
        model,
        Box::new(solver),
        goals,
        ControlLoopConfig::default(),
    );
    control.run()
}

/// Debug path: end-effector pose comes from six interactive sliders and is
/// solved by numeric IK every tick.
fn run_slider_mode(
    mut sim: HeadlessSim,
    model: sixarm_sim::RobotModel,
    arm: &sixarm_types::ArmDescription,
) -> Result<(), ArmError> {
    info!("starting slider-driven control loop");

    let x = sim.add_slider("X", 0.0, 1.0, 0.4);
    let y = sim.add_slider("Y", -1.0, 1.0, 0.0);
    let z = sim.add_slider("Z", 0.3, 1.0, 0.4);
    let rx = sim.add_slider("Rx", -FRAC_PI_2, FRAC_PI_2, 0.0);
    let ry = sim.add_slider("Ry", -FRAC_PI_2, FRAC_PI_2, 0.0);
    let rz = sim.add_slider("Rz", -FRAC_PI_2, FRAC_PI_2, 0.0);

    let chain = KinematicChain::from_description(arm)?;
    let solver = IkSolver::with_defaults(chain);

    let initial = GoalSet::fixed([0.4, 0.0, 0.4]);
    let mut control = ControlLoop::new(
        sim,
        model,
        Box::new(solver),
        initial,
        ControlLoopConfig::default(),
    );
    control.run_with(|sim| {
        Some(GoalSet {
            position: [
                sim.read_slider(x),
                sim.read_slider(y),
                sim.read_slider(z),
            ],
            orientation_rpy: [
                sim.read_slider(rx),
                sim.read_slider(ry),
                sim.read_slider(rz),
            ],
            liveliness: [0.0; 3],
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use sixarm_kinematics::ConfigurationSolver;

    #[test]
    fn scene_and_solver_build_from_embedded_descriptions() {
        let mut sim = HeadlessSim::new();
        sim.load_model(
            &ModelDescription::Cuboid(table()),
            TABLE_POSITION,
            IDENTITY_ORIENTATION,
        )
        .unwrap();
        let body = sim
            .load_model(
                &ModelDescription::Arm(ur5e()),
                [0.0; 3],
                IDENTITY_ORIENTATION,
            )
            .unwrap();
        let model = JointRegistry::build(&mut sim, body).unwrap();
        assert_eq!(model.controllable_joints().len(), 6);

        let tree = serde_json::to_string(&ur5e()).unwrap();
        let mut solver = ObjectiveSolver::from_description(
            &tree,
            Pose::identity(),
            ObjectiveWeights::default(),
        )
        .unwrap();
        let goals = GoalSet::fixed(GOAL_POSITION);
        let config = solver.compute_configuration(&goals, 0.0).unwrap();
        assert_eq!(config.len(), 6);
    }

    #[test]
    fn goal_position_is_reachable() {
        let chain = KinematicChain::from_description(&ur5e()).unwrap();
        let solver = IkSolver::with_defaults(chain);
        let config = solver.solve(
            Vector3::new(GOAL_POSITION[0], GOAL_POSITION[1], GOAL_POSITION[2]),
            [0.0; 3],
        );
        assert_eq!(config.len(), 6);
    }
}
