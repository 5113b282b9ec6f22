//! `sixarm-runtime` – the per-tick control scheduler.
//!
//! [`ControlLoop`] owns the simulator, the robot model, and a boxed
//! [`ConfigurationSolver`], and drives the fixed-rate sense/solve/act cycle:
//! resolve the current goals against the solver, apply the result as motor
//! commands, observe contacts, advance the simulation exactly one step,
//! sleep the fixed interval.  Single-threaded and sequential; there is no
//! catch-up logic: if a tick runs long the loop simply drifts.
//!
//! Solver errors at the actuation boundary abort the loop.  A collision is
//! an observation, not an error: the loop keeps running unless
//! [`ControlLoopConfig::halt_on_collision`] is set.

use std::time::{Duration, Instant};

use sixarm_kinematics::{ConfigurationSolver, Pose};
use sixarm_sim::{ActuationController, CollisionMonitor, RobotModel, Simulator};
use sixarm_types::{ArmError, CollisionEvent, GoalSet, JointConfiguration};
use tracing::{info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    /// Control ticks per second.  The simulator still advances exactly one
    /// fixed physics step per tick regardless of this rate.
    pub tick_rate_hz: f32,
    /// Terminate the loop on the first observed contact.
    pub halt_on_collision: bool,
    /// Stop after this many ticks; `None` runs until the process is killed.
    pub max_ticks: Option<u64>,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30.0,
            halt_on_collision: false,
            max_ticks: None,
        }
    }
}

/// Lifecycle of a [`ControlLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, never ticked.
    Initializing,
    /// Between ticks.
    Ready,
    /// Inside a tick.
    Stepping,
    /// Stopped via `max_ticks` or halt-on-collision; will not tick again.
    Terminated,
}

/// What one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub configuration: JointConfiguration,
    pub collision: CollisionEvent,
}

/// The fixed-rate control cycle over a simulator.
pub struct ControlLoop<S: Simulator> {
    sim: S,
    model: RobotModel,
    solver: Box<dyn ConfigurationSolver>,
    config: ControlLoopConfig,
    goals: GoalSet,
    state: LoopState,
    ticks: u64,
}

impl<S: Simulator> ControlLoop<S> {
    pub fn new(
        sim: S,
        model: RobotModel,
        solver: Box<dyn ConfigurationSolver>,
        goals: GoalSet,
        config: ControlLoopConfig,
    ) -> Self {
        Self {
            sim,
            model,
            solver,
            config,
            goals,
            state: LoopState::Initializing,
            ticks: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn goals(&self) -> &GoalSet {
        &self.goals
    }

    /// Replace the goal set; takes effect on the next tick.
    pub fn set_goals(&mut self, goals: GoalSet) {
        self.goals = goals;
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn model(&self) -> &RobotModel {
        &self.model
    }

    /// Current end-effector pose, via the simulator's link-state query.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Simulator`] if the flange link cannot be queried.
    pub fn end_effector_pose(&self) -> Result<Pose, ArmError> {
        self.sim
            .link_pose(self.model.body(), self.model.end_effector_link())
    }

    /// Execute one tick at the given time value.
    ///
    /// Order is fixed: solve, apply, observe contacts, step.  The simulator
    /// step is never skipped, collision or not.  Public so tests and demos
    /// can drive the loop with synthetic timestamps instead of wall time.
    ///
    /// # Errors
    ///
    /// Propagates solver and actuation errors; either aborts the loop.
    pub fn tick_at(&mut self, time_s: f64) -> Result<TickOutcome, ArmError> {
        self.state = LoopState::Stepping;

        let configuration = self.solver.compute_configuration(&self.goals, time_s)?;
        ActuationController::apply(&mut self.sim, &self.model, &configuration)?;
        let collision = CollisionMonitor::check(&self.sim);
        self.sim.step();
        self.ticks += 1;

        if self.config.halt_on_collision && collision.colliding {
            warn!(tick = self.ticks, "halting on collision");
            self.state = LoopState::Terminated;
        } else if self.config.max_ticks.is_some_and(|max| self.ticks >= max) {
            info!(ticks = self.ticks, "tick budget reached");
            self.state = LoopState::Terminated;
        } else {
            self.state = LoopState::Ready;
        }

        Ok(TickOutcome {
            configuration,
            collision,
        })
    }

    /// Run at the configured rate with a fixed goal set.
    ///
    /// # Errors
    ///
    /// Propagates the first solver or actuation error.
    pub fn run(&mut self) -> Result<(), ArmError> {
        self.run_with(|_| None)
    }

    /// Run at the configured rate, consulting `goal_source` before every
    /// tick.  Returning `Some` replaces the goal set for that tick; the
    /// source gets the simulator so it can read debug sliders.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Simulator`] for a non-positive tick rate, and
    /// propagates the first solver or actuation error.
    pub fn run_with<F>(&mut self, mut goal_source: F) -> Result<(), ArmError>
    where
        F: FnMut(&mut S) -> Option<GoalSet>,
    {
        if self.config.tick_rate_hz <= 0.0 {
            return Err(ArmError::Simulator(format!(
                "tick rate must be positive, got {}",
                self.config.tick_rate_hz
            )));
        }
        let interval = Duration::from_secs_f64(1.0 / f64::from(self.config.tick_rate_hz));
        let start = Instant::now();
        info!(tick_rate_hz = self.config.tick_rate_hz, "control loop running");

        while self.state != LoopState::Terminated {
            if let Some(goals) = goal_source(&mut self.sim) {
                self.goals = goals;
            }
            self.tick_at(start.elapsed().as_secs_f64())?;
            std::thread::sleep(interval);
        }

        info!(ticks = self.ticks, "control loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use sixarm_kinematics::{ObjectiveSolver, ObjectiveWeights};
    use sixarm_sim::ur5e::{table, ur5e, TABLE_POSITION};
    use sixarm_sim::{BodyHandle, HeadlessSim, JointRegistry};
    use sixarm_types::ModelDescription;

    const IDENTITY_ORIENTATION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    fn objective_solver() -> Box<dyn ConfigurationSolver> {
        let tree = serde_json::to_string(&ur5e()).unwrap();
        Box::new(
            ObjectiveSolver::from_description(
                &tree,
                Pose::identity(),
                ObjectiveWeights::default(),
            )
            .unwrap(),
        )
    }

    fn arm_only_loop(goals: GoalSet, config: ControlLoopConfig) -> ControlLoop<HeadlessSim> {
        let mut sim = HeadlessSim::new();
        let body = sim
            .load_model(
                &ModelDescription::Arm(ur5e()),
                [0.0; 3],
                IDENTITY_ORIENTATION,
            )
            .unwrap();
        let model = JointRegistry::build(&mut sim, body).unwrap();
        ControlLoop::new(sim, model, objective_solver(), goals, config)
    }

    /// Solver double that names a joint the robot does not have.
    struct BadSolver;

    impl ConfigurationSolver for BadSolver {
        fn compute_configuration(
            &mut self,
            _goals: &GoalSet,
            _time_s: f64,
        ) -> Result<JointConfiguration, ArmError> {
            let mut config = JointConfiguration::new();
            config.insert("ghost_joint", 0.1);
            Ok(config)
        }
    }

    /// Solver double that commands nothing at all.
    struct IdleSolver;

    impl ConfigurationSolver for IdleSolver {
        fn compute_configuration(
            &mut self,
            _goals: &GoalSet,
            _time_s: f64,
        ) -> Result<JointConfiguration, ArmError> {
            Ok(JointConfiguration::new())
        }
    }

    #[test]
    fn loop_starts_initializing_and_becomes_ready_after_a_tick() {
        let mut control = arm_only_loop(
            GoalSet::fixed([0.47, -0.03, 0.64]),
            ControlLoopConfig::default(),
        );
        assert_eq!(control.state(), LoopState::Initializing);
        control.tick_at(0.0).unwrap();
        assert_eq!(control.state(), LoopState::Ready);
        assert_eq!(control.ticks(), 1);
    }

    #[test]
    fn end_effector_converges_to_a_static_goal() {
        let goal = [0.47, -0.03, 0.64];
        let mut control =
            arm_only_loop(GoalSet::fixed(goal), ControlLoopConfig::default());

        let mut any_collision = false;
        for tick in 0..600 {
            let outcome = control.tick_at(f64::from(tick) / 30.0).unwrap();
            any_collision |= outcome.collision.colliding;
        }

        let pose = control.end_effector_pose().unwrap();
        assert_relative_eq!(pose.position.x, goal[0], epsilon = 2e-2);
        assert_relative_eq!(pose.position.y, goal[1], epsilon = 2e-2);
        assert_relative_eq!(pose.position.z, goal[2], epsilon = 2e-2);
        assert!(!any_collision);
    }

    #[test]
    fn liveliness_keeps_the_end_effector_moving_inside_the_region() {
        let goals = GoalSet {
            position: [0.47, -0.03, 0.64],
            orientation_rpy: [0.0; 3],
            liveliness: [0.15, 0.05, 0.4],
        };
        let mut control = arm_only_loop(goals, ControlLoopConfig::default());

        let mut late_positions = Vec::new();
        for tick in 0..500 {
            control.tick_at(f64::from(tick) / 30.0).unwrap();
            if tick >= 250 {
                late_positions.push(control.end_effector_pose().unwrap().position);
            }
        }

        // Never settles: the end-effector keeps traversing a non-trivial span.
        let mut span = 0.0f32;
        for a in &late_positions {
            for b in &late_positions {
                span = span.max((a - b).norm());
            }
        }
        assert!(span > 1e-3, "end-effector settled, span {span}");

        // Stays inside the liveliness region around the goal (with margin for
        // residual solver error).
        let center = Vector3::new(0.47, -0.03, 0.64);
        for p in &late_positions {
            let d = p - center;
            assert!(d.x.abs() <= 0.075 + 0.05, "x excursion {}", d.x);
            assert!(d.y.abs() <= 0.025 + 0.05, "y excursion {}", d.y);
            assert!(d.z.abs() <= 0.2 + 0.05, "z excursion {}", d.z);
        }
    }

    #[test]
    fn solver_naming_an_unknown_joint_aborts_the_tick() {
        let mut sim = HeadlessSim::new();
        let body = sim
            .load_model(
                &ModelDescription::Arm(ur5e()),
                [0.0; 3],
                IDENTITY_ORIENTATION,
            )
            .unwrap();
        let model = JointRegistry::build(&mut sim, body).unwrap();
        let mut control = ControlLoop::new(
            sim,
            model,
            Box::new(BadSolver),
            GoalSet::fixed([0.4, 0.0, 0.4]),
            ControlLoopConfig::default(),
        );

        let result = control.tick_at(0.0);
        assert!(matches!(result, Err(ArmError::UnknownJoint { .. })));
    }

    fn buried_arm_scene() -> (HeadlessSim, BodyHandle) {
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
                [0.5, 0.0, -0.63],
                IDENTITY_ORIENTATION,
            )
            .unwrap();
        (sim, body)
    }

    #[test]
    fn collision_is_reported_but_does_not_halt_by_default() {
        let (mut sim, body) = buried_arm_scene();
        let model = JointRegistry::build(&mut sim, body).unwrap();
        let mut control = ControlLoop::new(
            sim,
            model,
            Box::new(IdleSolver),
            GoalSet::fixed([0.4, 0.0, 0.4]),
            ControlLoopConfig::default(),
        );

        let outcome = control.tick_at(0.0).unwrap();
        assert!(outcome.collision.colliding);
        assert_eq!(control.state(), LoopState::Ready);
    }

    #[test]
    fn halt_on_collision_terminates_the_loop() {
        let (mut sim, body) = buried_arm_scene();
        let model = JointRegistry::build(&mut sim, body).unwrap();
        let mut control = ControlLoop::new(
            sim,
            model,
            Box::new(IdleSolver),
            GoalSet::fixed([0.4, 0.0, 0.4]),
            ControlLoopConfig {
                halt_on_collision: true,
                ..ControlLoopConfig::default()
            },
        );

        let outcome = control.tick_at(0.0).unwrap();
        assert!(outcome.collision.colliding);
        assert_eq!(control.state(), LoopState::Terminated);
        // A terminated loop returns immediately from run().
        control.run().unwrap();
        assert_eq!(control.ticks(), 1);
    }

    #[test]
    fn run_stops_at_the_tick_budget() {
        let mut control = arm_only_loop(
            GoalSet::fixed([0.47, -0.03, 0.64]),
            ControlLoopConfig {
                tick_rate_hz: 240.0,
                max_ticks: Some(3),
                ..ControlLoopConfig::default()
            },
        );
        control.run().unwrap();
        assert_eq!(control.ticks(), 3);
        assert_eq!(control.state(), LoopState::Terminated);
    }

    #[test]
    fn run_with_consults_the_goal_source_each_tick() {
        let mut control = arm_only_loop(
            GoalSet::fixed([0.4, 0.0, 0.4]),
            ControlLoopConfig {
                tick_rate_hz: 240.0,
                max_ticks: Some(2),
                ..ControlLoopConfig::default()
            },
        );
        let mut calls = 0;
        control
            .run_with(|_sim| {
                calls += 1;
                Some(GoalSet::fixed([0.3, 0.1, 0.5]))
            })
            .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(control.goals().position, [0.3, 0.1, 0.5]);
    }

    #[test]
    fn non_positive_tick_rate_is_rejected() {
        let mut control = arm_only_loop(
            GoalSet::fixed([0.4, 0.0, 0.4]),
            ControlLoopConfig {
                tick_rate_hz: 0.0,
                ..ControlLoopConfig::default()
            },
        );
        assert!(matches!(control.run(), Err(ArmError::Simulator(_))));
    }
}
