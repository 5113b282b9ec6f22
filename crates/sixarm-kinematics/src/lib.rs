//! `sixarm-kinematics` – pose math and configuration solving.
//!
//! # Modules
//!
//! - [`pose`] – [`Pose`][pose::Pose]: position + unit-quaternion orientation
//!   with Euler-angle conversion in both directions.
//! - [`chain`] – [`KinematicChain`][chain::KinematicChain]: the ordered
//!   actuated-joint chain extracted from an
//!   [`ArmDescription`][sixarm_types::ArmDescription], with forward
//!   kinematics and the per-joint frames needed for the Jacobian.
//! - [`ik`] – [`IkSolver`][ik::IkSolver]: damped-least-squares numeric IK
//!   seeded from a fixed rest pose, with configurable symmetric ±π limits.
//! - [`objective`] – [`ObjectiveSolver`][objective::ObjectiveSolver]: the
//!   goal/liveliness solver, constructed once from a serialized kinematic
//!   tree and warm-started across calls.
//!
//! Both solvers implement [`ConfigurationSolver`], the single strategy
//! contract the control loop programs against.

pub mod chain;
pub mod ik;
pub mod objective;
pub mod pose;

pub use chain::{joint_motion, origin_isometry, ChainJoint, KinematicChain};
pub use ik::{IkConfig, IkSolver, IkTarget};
pub use objective::{ObjectiveSolver, ObjectiveWeights};
pub use pose::Pose;

use sixarm_types::{ArmError, GoalSet, JointConfiguration};

/// A strategy that turns a goal set and a time value into a joint
/// configuration.
///
/// Numeric IK and objective-based solving are interchangeable behind this
/// contract.  Implementations may be internally stateful (the objective
/// solver warm-starts from its previous solution and uses `time_s` to drive
/// liveliness motion); callers construct a solver once and invoke it every
/// tick without re-initialisation.
pub trait ConfigurationSolver {
    /// Compute a configuration for `goals` at wall-clock time `time_s`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Solver`] when the goal set cannot be interpreted
    /// against the solver's kinematic model.
    fn compute_configuration(
        &mut self,
        goals: &GoalSet,
        time_s: f64,
    ) -> Result<JointConfiguration, ArmError>;
}
