//! External collaborator seam.
//!
//! The navigation core does not own the transport to the robot: sensor
//! packets arrive on an independently-running receiver thread and actuator
//! commands leave through whatever gateway the process wires up. This
//! module defines the boundary the core talks through: the [`RobotLink`]
//! trait and the [`SweepBuffer`] shared with the receiver.

use crate::scanner::{Sweep, SWEEP_RESOLUTION};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the navigation core needs from the robot.
///
/// Implemented by the real gateway glue and by [`crate::sim::SimulatedField`].
pub trait RobotLink {
    /// Exclusive snapshot of the latest range sweep.
    ///
    /// Returns `None` when the snapshot cannot be acquired this tick (the
    /// receiver is mid-write). The core treats that as "no new data" and
    /// keeps its previous state; the next tick retries naturally.
    fn try_sweep(&mut self) -> Option<Sweep>;

    /// Count of currently-flagged close obstacles.
    fn obstacle_count(&self) -> usize;

    /// Issue a speed command.
    fn set_speed(&mut self, speed: i8);

    /// Issue a steering command, in degrees.
    fn set_steering(&mut self, angle: i8);

    /// Issue a combined speed and steering command.
    fn set_motor(&mut self, speed: i8, angle: i8) {
        self.set_speed(speed);
        self.set_steering(angle);
    }

    /// Last speed reported by the motor controller.
    fn motor_speed(&self) -> f64;

    /// Instantaneous ground speed from the odometer.
    fn odometer_speed(&self) -> f64;

    /// Monotonic distance from the odometer.
    fn odometer_distance(&self) -> f64;

    /// Zero the gyro's heading integration.
    fn gyro_reset(&mut self);
}

/// Sweep buffer shared between the receiver thread and the core.
///
/// The receiver overwrites the buffer as packets arrive; the core takes a
/// scoped snapshot once per tick. [`SweepBuffer::snapshot`] uses `try_lock`
/// so a contended tick degrades to "no new data" instead of blocking, and
/// the guard is released before any state dispatch runs.
#[derive(Clone, Debug)]
pub struct SweepBuffer {
    inner: Arc<Mutex<Sweep>>,
}

impl SweepBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new([0u16; SWEEP_RESOLUTION])),
        }
    }

    /// Overwrite the buffer with a freshly received sweep (receiver side).
    pub fn publish(&self, sweep: &Sweep) {
        *self.inner.lock() = *sweep;
    }

    /// Copy the latest sweep out under the guard, or `None` on contention.
    pub fn snapshot(&self) -> Option<Sweep> {
        self.inner.try_lock().map(|guard| *guard)
    }
}

impl Default for SweepBuffer {
    fn default() -> Self {
        Self::new()
    }
}
