use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinematic joint classification, matching the simulator's integer type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    Revolute,
    Prismatic,
    Spherical,
    Planar,
    Fixed,
}

impl JointType {
    /// Decode the simulator's raw joint type code.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::LoadFailed`] for a code outside the five known
    /// kinematic types; that indicates a robot description the controller
    /// was never written for.
    pub fn from_code(code: u8) -> Result<Self, ArmError> {
        match code {
            0 => Ok(Self::Revolute),
            1 => Ok(Self::Prismatic),
            2 => Ok(Self::Spherical),
            3 => Ok(Self::Planar),
            4 => Ok(Self::Fixed),
            other => Err(ArmError::LoadFailed {
                what: "joint type".to_string(),
                details: format!("unknown joint type code {other}"),
            }),
        }
    }

    /// The simulator's integer code for this type; inverse of [`from_code`][Self::from_code].
    pub fn code(self) -> u8 {
        match self {
            Self::Revolute => 0,
            Self::Prismatic => 1,
            Self::Spherical => 2,
            Self::Planar => 3,
            Self::Fixed => 4,
        }
    }
}

/// Immutable per-joint metadata, assembled once from simulator introspection
/// at robot load time.
///
/// Limits are radians for revolute joints and meters for prismatic ones.
/// `controllable` is `true` only for the manipulator's six actuated joints;
/// no other joint is ever commanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointDescriptor {
    pub index: usize,
    pub name: String,
    pub joint_type: JointType,
    pub lower_limit: f32,
    pub upper_limit: f32,
    pub max_force: f32,
    pub max_velocity: f32,
    pub controllable: bool,
}

/// An ordered mapping from controllable joint name to a target scalar value
/// (angle or displacement).
///
/// Insertion order is preserved so that the actuation arrays derived from a
/// configuration are stable across ticks.  Every key must name a joint that
/// the [`JointDescriptor`] set marks controllable; values are expected to
/// respect that joint's limits: enforcing them is the solver's job, and an
/// out-of-range value is a solver defect, not something the actuator clamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointConfiguration {
    values: Vec<(String, f32)>,
}

impl JointConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target for `name`, replacing any earlier entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: f32) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Look up the target for `name`.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f32)> for JointConfiguration {
    fn from_iter<T: IntoIterator<Item = (String, f32)>>(iter: T) -> Self {
        let mut config = Self::new();
        for (name, value) in iter {
            config.insert(name, value);
        }
        config
    }
}

/// A point-in-time contact observation, recomputed every tick.
///
/// Not an accumulating log: each tick overwrites the previous observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// `true` if the simulator reported at least one contact point.
    pub colliding: bool,
    pub at: DateTime<Utc>,
}

/// Named goals handed to a configuration solver each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalSet {
    /// Target end-effector translation in the base frame (meters).
    pub position: [f32; 3],
    /// Target end-effector orientation as roll/pitch/yaw Euler angles
    /// (radians).  Consumed by the numeric-IK path; the objective solver
    /// matches position only.
    #[serde(default)]
    pub orientation_rpy: [f32; 3],
    /// Liveliness region size around the target: the solver keeps the
    /// end-effector in continuous motion within this box.  All-zero means a
    /// static goal.
    #[serde(default)]
    pub liveliness: [f32; 3],
}

impl GoalSet {
    /// A static position goal with zero orientation and no liveliness motion.
    pub fn fixed(position: [f32; 3]) -> Self {
        Self {
            position,
            orientation_rpy: [0.0; 3],
            liveliness: [0.0; 3],
        }
    }
}

/// One joint of a serial robot description: the static transform from the
/// parent link, the motion axis, and the registered limits/caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    pub joint_type: JointType,
    /// Translation from the parent link frame (meters).
    pub origin_xyz: [f32; 3],
    /// Rotation from the parent link frame, roll/pitch/yaw (radians).
    pub origin_rpy: [f32; 3],
    /// Motion axis in the joint's local frame.
    pub axis: [f32; 3],
    pub lower_limit: f32,
    pub upper_limit: f32,
    pub max_force: f32,
    pub max_velocity: f32,
}

/// A serial-chain robot description, base to flange.
///
/// This is data, not a parser: the simulator instantiates it directly, and
/// its JSON form is the "serialized kinematic tree" handed to the objective
/// solver at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmDescription {
    pub name: String,
    /// Joints in tree order; link index `i` is the child of joint `i`.
    pub joints: Vec<JointSpec>,
}

/// An axis-aligned static box body (table, obstacle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuboidDescription {
    pub name: String,
    pub half_extents: [f32; 3],
}

/// A body description the simulator can instantiate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelDescription {
    Arm(ArmDescription),
    Cuboid(CuboidDescription),
}

/// Error taxonomy for the control stack.
///
/// Load errors and unknown-joint errors are fatal: they indicate a mismatched
/// robot description or a solver defect and are never retried.  Collision
/// events are observations, not errors, and do not appear here.
#[derive(Error, Debug)]
pub enum ArmError {
    #[error("failed to load {what}: {details}")]
    LoadFailed { what: String, details: String },

    #[error("controllable joint '{name}' missing from the simulator's joint set")]
    MissingControlJoint { name: String },

    #[error("joint '{name}' is not a controllable joint of this robot")]
    UnknownJoint { name: String },

    #[error("solver error: {0}")]
    Solver(String),

    #[error("simulator error: {0}")]
    Simulator(String),
}
