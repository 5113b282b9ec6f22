//! Damped-least-squares numeric inverse kinematics.
//!
//! Iterates `dq = Jᵀ (J Jᵀ + λ²I)⁻¹ e` over the geometric Jacobian until the
//! end-effector error is inside tolerance.  The solver is seeded from a fixed
//! rest pose to bias convergence toward the canonical "elbow" configuration,
//! and by default applies symmetric ±π limits (2π ranges) to every joint
//! regardless of the registered limits, switchable via
//! [`IkConfig::symmetric_limits`].
//!
//! There is no failure path: [`IkSolver::solve`] always returns *some*
//! configuration, possibly one that has not converged.  Sanity-checking the
//! result is the caller's responsibility.

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};
use sixarm_types::{ArmError, GoalSet, JointConfiguration};
use std::f32::consts::{FRAC_PI_2, PI};
use tracing::debug;

use crate::chain::KinematicChain;
use crate::pose::Pose;
use crate::ConfigurationSolver;

/// What the solver should reach.
#[derive(Debug, Clone)]
pub enum IkTarget {
    /// Position only (3 constraint rows).
    Position(Vector3<f32>),
    /// Position and orientation (6 constraint rows).
    Pose(Pose),
}

/// Numeric-IK tuning knobs.
#[derive(Debug, Clone)]
pub struct IkConfig {
    pub max_iterations: u32,
    /// Position convergence tolerance (meters).
    pub position_tolerance: f32,
    /// Orientation convergence tolerance (radians).
    pub angle_tolerance: f32,
    /// Damping factor λ; higher is more robust near singularities, slower to
    /// converge.
    pub damping: f32,
    /// Apply ±π limits and 2π ranges to all joints instead of the registered
    /// limits.  On by default; keeps the solve away from wound-up solutions.
    pub symmetric_limits: bool,
    /// Seed configuration biasing the solve toward an elbow-up solution.
    pub rest_pose: Vec<f32>,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            position_tolerance: 1e-4,
            angle_tolerance: 1e-3,
            damping: 0.01,
            symmetric_limits: true,
            rest_pose: vec![0.0, -FRAC_PI_2, -FRAC_PI_2, -FRAC_PI_2, -FRAC_PI_2, 0.0],
        }
    }
}

/// Raw outcome of one DLS solve.
#[derive(Debug, Clone)]
pub struct IkOutcome {
    pub q: Vec<f32>,
    pub converged: bool,
    pub iterations: u32,
    pub position_error: f32,
}

/// Damped-least-squares IK over a [`KinematicChain`].
pub struct IkSolver {
    chain: KinematicChain,
    config: IkConfig,
}

impl IkSolver {
    pub fn new(chain: KinematicChain, config: IkConfig) -> Self {
        Self { chain, config }
    }

    pub fn with_defaults(chain: KinematicChain) -> Self {
        Self::new(chain, IkConfig::default())
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    /// Solve for a target position and Euler orientation.
    ///
    /// The Euler angles are converted to a quaternion internally; the result
    /// maps each chain joint name to its solved value, in chain order.
    /// Always returns a configuration; convergence status is only logged.
    pub fn solve(&self, position: Vector3<f32>, orientation_rpy: [f32; 3]) -> JointConfiguration {
        let orientation = UnitQuaternion::from_euler_angles(
            orientation_rpy[0],
            orientation_rpy[1],
            orientation_rpy[2],
        );
        let target = IkTarget::Pose(Pose::new(position, orientation));
        let outcome = self.solve_target(&target, &self.seed());
        if !outcome.converged {
            debug!(
                position_error = outcome.position_error,
                iterations = outcome.iterations,
                "IK did not converge; returning best-effort configuration"
            );
        }
        self.to_configuration(&outcome.q)
    }

    /// Run the DLS iteration from an explicit seed.
    pub fn solve_target(&self, target: &IkTarget, seed: &[f32]) -> IkOutcome {
        assert_eq!(seed.len(), self.chain.dof(), "seed.len() must equal chain DOF");

        let mut q = seed.to_vec();
        let n = self.chain.dof();
        let limits = self.effective_limits();

        for iteration in 0..self.config.max_iterations {
            let ee = self.chain.forward_kinematics(&q);
            let (pos_err, ori_err, error) = pose_error(&ee, target);

            let converged = match target {
                IkTarget::Position(_) => pos_err < self.config.position_tolerance,
                IkTarget::Pose(_) => {
                    pos_err < self.config.position_tolerance
                        && ori_err < self.config.angle_tolerance
                }
            };
            if converged {
                return IkOutcome {
                    q,
                    converged: true,
                    iterations: iteration,
                    position_error: pos_err,
                };
            }

            let jacobian = self.jacobian(&q, target);
            let m = jacobian.nrows();
            let damped = &jacobian * jacobian.transpose()
                + DMatrix::identity(m, m) * (self.config.damping * self.config.damping);
            let Some(inverse) = damped.try_inverse() else {
                // Singular even with damping: return what we have.
                return IkOutcome {
                    q,
                    converged: false,
                    iterations: iteration,
                    position_error: pos_err,
                };
            };

            let dq = jacobian.transpose() * inverse * error;
            for i in 0..n {
                q[i] = (q[i] + dq[i]).clamp(limits[i].0, limits[i].1);
            }
        }

        let ee = self.chain.forward_kinematics(&q);
        let (pos_err, _, _) = pose_error(&ee, target);
        IkOutcome {
            q,
            converged: false,
            iterations: self.config.max_iterations,
            position_error: pos_err,
        }
    }

    /// Map a solved vector onto joint names in chain order.
    pub fn to_configuration(&self, q: &[f32]) -> JointConfiguration {
        self.chain
            .joint_names()
            .iter()
            .zip(q.iter())
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    /// The rest pose when it matches the chain, zeros otherwise.
    pub fn seed(&self) -> Vec<f32> {
        if self.config.rest_pose.len() == self.chain.dof() {
            self.config.rest_pose.clone()
        } else {
            vec![0.0; self.chain.dof()]
        }
    }

    fn effective_limits(&self) -> Vec<(f32, f32)> {
        if self.config.symmetric_limits {
            vec![(-PI, PI); self.chain.dof()]
        } else {
            self.chain
                .joints()
                .iter()
                .map(|j| (j.lower_limit, j.upper_limit))
                .collect()
        }
    }

    fn jacobian(&self, q: &[f32], target: &IkTarget) -> DMatrix<f32> {
        let n = self.chain.dof();
        let (origins, axes, ee) = self.chain.joint_frames(q);
        let rows = match target {
            IkTarget::Position(_) => 3,
            IkTarget::Pose(_) => 6,
        };
        let mut jacobian = DMatrix::zeros(rows, n);

        for i in 0..n {
            let axis = &axes[i];
            if self.chain.joints()[i].prismatic {
                jacobian[(0, i)] = axis.x;
                jacobian[(1, i)] = axis.y;
                jacobian[(2, i)] = axis.z;
            } else {
                let lever = ee - origins[i];
                let linear = axis.cross(&lever);
                jacobian[(0, i)] = linear.x;
                jacobian[(1, i)] = linear.y;
                jacobian[(2, i)] = linear.z;
                if rows == 6 {
                    jacobian[(3, i)] = axis.x;
                    jacobian[(4, i)] = axis.y;
                    jacobian[(5, i)] = axis.z;
                }
            }
        }
        jacobian
    }
}

impl ConfigurationSolver for IkSolver {
    fn compute_configuration(
        &mut self,
        goals: &GoalSet,
        _time_s: f64,
    ) -> Result<JointConfiguration, ArmError> {
        let position = Vector3::new(goals.position[0], goals.position[1], goals.position[2]);
        Ok(self.solve(position, goals.orientation_rpy))
    }
}

/// Position and orientation error between the current pose and the target.
fn pose_error(ee: &Pose, target: &IkTarget) -> (f32, f32, DVector<f32>) {
    match target {
        IkTarget::Position(target_pos) => {
            let delta = target_pos - ee.position;
            let error = DVector::from_column_slice(&[delta.x, delta.y, delta.z]);
            (delta.norm(), 0.0, error)
        }
        IkTarget::Pose(target_pose) => {
            let delta = target_pose.position - ee.position;
            let rotation = target_pose.orientation * ee.orientation.inverse();
            let angular = rotation
                .axis()
                .map(|axis| axis.into_inner() * rotation.angle())
                .unwrap_or_else(Vector3::zeros);
            let error = DVector::from_column_slice(&[
                delta.x, delta.y, delta.z, angular.x, angular.y, angular.z,
            ]);
            (delta.norm(), angular.norm(), error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sixarm_types::{ArmDescription, JointSpec, JointType};

    fn revolute(name: &str, xyz: [f32; 3], axis: [f32; 3]) -> JointSpec {
        JointSpec {
            name: name.to_string(),
            joint_type: JointType::Revolute,
            origin_xyz: xyz,
            origin_rpy: [0.0; 3],
            axis,
            lower_limit: -2.6,
            upper_limit: 2.6,
            max_force: 50.0,
            max_velocity: PI,
        }
    }

    fn planar_two_link() -> KinematicChain {
        let desc = ArmDescription {
            name: "planar".to_string(),
            joints: vec![
                revolute("shoulder", [0.0, 0.0, 0.05], [0.0, 1.0, 0.0]),
                revolute("elbow", [0.0, 0.0, 0.3], [0.0, 1.0, 0.0]),
                JointSpec {
                    name: "tip".to_string(),
                    joint_type: JointType::Fixed,
                    origin_xyz: [0.0, 0.0, 0.25],
                    origin_rpy: [0.0; 3],
                    axis: [0.0; 3],
                    lower_limit: 0.0,
                    upper_limit: 0.0,
                    max_force: 0.0,
                    max_velocity: 0.0,
                },
            ],
        };
        KinematicChain::from_description(&desc).unwrap()
    }

    fn two_link_config() -> IkConfig {
        IkConfig {
            rest_pose: vec![0.0, 0.0],
            ..IkConfig::default()
        }
    }

    #[test]
    fn fk_roundtrip_recovers_reachable_target() {
        let chain = planar_two_link();
        let q_known = [0.4, -0.7];
        let target_pose = chain.forward_kinematics(&q_known);
        let solver = IkSolver::new(chain, two_link_config());

        let target = IkTarget::Position(target_pose.position);
        let outcome = solver.solve_target(&target, &[0.0, 0.0]);
        assert!(outcome.converged, "pos_err={}", outcome.position_error);

        let solved = solver.chain().forward_kinematics(&outcome.q);
        assert_relative_eq!(solved.position.x, target_pose.position.x, epsilon = 1e-2);
        assert_relative_eq!(solved.position.z, target_pose.position.z, epsilon = 1e-2);
    }

    #[test]
    fn unreachable_target_returns_best_effort() {
        let chain = planar_two_link();
        let solver = IkSolver::new(chain, two_link_config());
        // Far outside the ~0.55 m workspace.
        let target = IkTarget::Position(Vector3::new(5.0, 0.0, 5.0));
        let outcome = solver.solve_target(&target, &[0.0, 0.0]);
        assert!(!outcome.converged);
        assert!(outcome.position_error > 1.0);
        assert_eq!(outcome.q.len(), 2);
    }

    #[test]
    fn symmetric_limits_clamp_to_pi() {
        let chain = planar_two_link();
        let solver = IkSolver::new(chain, two_link_config());
        let limits = solver.effective_limits();
        assert_eq!(limits, vec![(-PI, PI); 2]);
    }

    #[test]
    fn registered_limits_used_when_symmetric_disabled() {
        let chain = planar_two_link();
        let config = IkConfig {
            symmetric_limits: false,
            rest_pose: vec![0.0, 0.0],
            ..IkConfig::default()
        };
        let solver = IkSolver::new(chain, config);
        let limits = solver.effective_limits();
        assert_relative_eq!(limits[0].0, -2.6, epsilon = 1e-6);
        assert_relative_eq!(limits[1].1, 2.6, epsilon = 1e-6);
    }

    #[test]
    fn solve_returns_configuration_in_chain_order() {
        let chain = planar_two_link();
        let solver = IkSolver::new(chain, two_link_config());
        let config = solver.solve(Vector3::new(0.1, 0.0, 0.5), [0.0; 3]);
        let names: Vec<&str> = config.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["shoulder", "elbow"]);
    }

    #[test]
    fn mismatched_rest_pose_falls_back_to_zeros() {
        let chain = planar_two_link();
        // Default rest pose is six entries; this chain has two.
        let solver = IkSolver::with_defaults(chain);
        assert_eq!(solver.seed(), vec![0.0, 0.0]);
    }

    #[test]
    fn configuration_solver_contract_uses_goal_orientation() {
        let chain = planar_two_link();
        let mut solver = IkSolver::new(chain, two_link_config());
        let goals = GoalSet::fixed([0.1, 0.0, 0.5]);
        let config = solver.compute_configuration(&goals, 0.0).unwrap();
        assert_eq!(config.len(), 2);
    }
}
