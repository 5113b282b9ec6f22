//! `sixarm-sim` – the simulator boundary and everything that talks to it.
//!
//! The physics engine is an external collaborator: this crate defines the
//! [`Simulator`] trait it must satisfy and ships [`HeadlessSim`], an
//! in-process implementation that lets the full control stack run in tests
//! and CI without a physics backend.
//!
//! # Modules
//!
//! - [`simulator`] – [`Simulator`] trait plus the wire types crossing it
//!   ([`JointInfo`], [`PositionCommand`], handles).
//! - [`headless`] – [`HeadlessSim`]: kinematic motor integration, coarse box
//!   contacts, stub debug sliders.
//! - [`ur5e`] – the embedded UR5e-class robot and table descriptions.
//! - [`registry`] – [`JointRegistry`]: simulator introspection →
//!   [`RobotModel`] with typed joint descriptors.
//! - [`actuation`] – [`ActuationController`]: batched position-control
//!   commands from a joint configuration.
//! - [`collision`] – [`CollisionMonitor`]: the per-tick global contact
//!   check.

pub mod actuation;
pub mod collision;
pub mod headless;
pub mod registry;
pub mod simulator;
pub mod ur5e;

pub use actuation::{ActuationController, POSITION_GAIN};
pub use collision::CollisionMonitor;
pub use headless::HeadlessSim;
pub use registry::{JointRegistry, RobotModel, CONTROL_JOINTS};
pub use simulator::{BodyHandle, JointInfo, PositionCommand, Simulator, SliderHandle};
