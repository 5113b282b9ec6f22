//! Goal-driven configuration solving with liveliness motion.
//!
//! [`ObjectiveSolver`] is the objective-based counterpart to the numeric
//! [`IkSolver`][crate::ik::IkSolver]: constructed once from a serialized
//! kinematic tree and a fixed root transform, then called every tick with
//! updated goals and the current time.  It is internally stateful: each
//! solve warm-starts from the previous solution and blends toward the new
//! one, so the commanded motion stays smooth, and the liveliness objective
//! perturbs the position goal with per-axis sinusoids so the end-effector
//! keeps moving inside the requested region instead of settling.
//!
//! With an unchanged goal and zero liveliness, successive solutions converge.

use nalgebra::Vector3;
use sixarm_types::{ArmDescription, ArmError, GoalSet, JointConfiguration};
use std::f32::consts::TAU;
use tracing::debug;

use crate::chain::KinematicChain;
use crate::ik::{IkConfig, IkSolver, IkTarget};
use crate::pose::Pose;
use crate::ConfigurationSolver;

/// Per-axis phase offsets that keep the liveliness path from collapsing to a
/// line.
const LIVELINESS_PHASES: [f32; 3] = [0.0, TAU / 3.0, 2.0 * TAU / 3.0];

/// Named objective weights, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveWeights {
    /// Weight of the end-effector position-match objective.
    pub position: f32,
    /// Weight of the smoothness objective; higher values blend more slowly
    /// toward each new solution.
    pub smoothness: f32,
    /// Weight of the position-liveliness objective.
    pub liveliness: f32,
    /// Liveliness oscillation frequency (Hz).
    pub frequency_hz: f32,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            position: 10.0,
            smoothness: 5.0,
            liveliness: 20.0,
            frequency_hz: 1.0,
        }
    }
}

/// Stateful goal/liveliness solver behind the [`ConfigurationSolver`]
/// contract.
pub struct ObjectiveSolver {
    ik: IkSolver,
    root: Pose,
    weights: ObjectiveWeights,
    /// Previous solution; warm start and smoothing reference.
    state: Vec<f32>,
    /// Fraction of each new solution blended into the state per call.
    blend: f32,
}

impl ObjectiveSolver {
    /// Construct the solver from a serialized kinematic tree (the JSON form
    /// of an [`ArmDescription`]), a fixed root transform, and objective
    /// weights.
    ///
    /// This is the once-at-startup handoff: afterwards the solver is only
    /// ever called through [`ConfigurationSolver::compute_configuration`].
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Solver`] if the tree does not parse, or
    /// [`ArmError::LoadFailed`] if it contains joints the chain cannot model.
    pub fn from_description(
        tree_json: &str,
        root: Pose,
        weights: ObjectiveWeights,
    ) -> Result<Self, ArmError> {
        let description: ArmDescription = serde_json::from_str(tree_json)
            .map_err(|e| ArmError::Solver(format!("invalid kinematic tree: {e}")))?;
        let chain = KinematicChain::from_description(&description)?;
        debug!(robot = %description.name, dof = chain.dof(), "objective solver initialised");

        // The liveliness target moves every call, so a handful of damped
        // iterations per call tracks it closely enough; joint limits come
        // from the description, not the ±π IK simplification.
        let ik = IkSolver::new(
            chain,
            IkConfig {
                symmetric_limits: false,
                max_iterations: 50,
                ..IkConfig::default()
            },
        );
        let state = ik.seed();

        let weight_sum = weights.position + weights.smoothness;
        let blend = if weight_sum > 0.0 {
            (weights.position / weight_sum).clamp(0.05, 1.0)
        } else {
            1.0
        };

        Ok(Self {
            ik,
            root,
            weights,
            state,
            blend,
        })
    }

    /// The position goal perturbed by the liveliness sinusoids at `time_s`.
    fn lively_target(&self, goals: &GoalSet, time_s: f64) -> Vector3<f32> {
        let center = Vector3::new(goals.position[0], goals.position[1], goals.position[2]);
        if self.weights.liveliness <= 0.0 {
            return center;
        }
        let phase = (TAU as f64 * f64::from(self.weights.frequency_hz) * time_s) as f32;
        let offset = Vector3::new(
            0.5 * goals.liveliness[0] * (phase + LIVELINESS_PHASES[0]).sin(),
            0.5 * goals.liveliness[1] * (phase + LIVELINESS_PHASES[1]).sin(),
            0.5 * goals.liveliness[2] * (phase + LIVELINESS_PHASES[2]).sin(),
        );
        center + offset
    }
}

impl ConfigurationSolver for ObjectiveSolver {
    fn compute_configuration(
        &mut self,
        goals: &GoalSet,
        time_s: f64,
    ) -> Result<JointConfiguration, ArmError> {
        let local = self.lively_target(goals, time_s);
        let target = self.root.orientation * local + self.root.position;

        let outcome = self
            .ik
            .solve_target(&IkTarget::Position(target), &self.state);

        // Smoothness: move only part of the way toward the fresh solution.
        for (state, solved) in self.state.iter_mut().zip(outcome.q.iter()) {
            *state += self.blend * (*solved - *state);
        }

        Ok(self.ik.to_configuration(&self.state))
    }
}
