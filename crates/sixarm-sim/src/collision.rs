//! Per-tick contact observation.

use chrono::Utc;
use sixarm_types::CollisionEvent;
use tracing::warn;

use crate::simulator::Simulator;

/// Samples the simulator's global contact state once per tick.
///
/// The check is world-wide rather than per-body-pair: any contact anywhere
/// counts.  The observation is returned to the caller, which decides whether
/// to keep running; the monitor itself only reports.
pub struct CollisionMonitor;

impl CollisionMonitor {
    pub fn check<S: Simulator>(sim: &S) -> CollisionEvent {
        let contacts = sim.contact_count();
        if contacts > 0 {
            warn!(contacts, "collision detected");
        }
        CollisionEvent {
            colliding: contacts > 0,
            at: Utc::now(),
        }
    }
}
