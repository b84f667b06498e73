//! In-process simulation harness.
//!
//! [`SimulatedField`] implements [`RobotLink`] against a synthetic field:
//! two parallel crop rows modeled as finite walls either side of the start
//! line. Each tick it ray-casts a fresh sweep into the shared buffer and
//! integrates commanded speed into the odometer, which is enough to drive
//! the full wait/approach/stop/turn cycle without any hardware or network
//! transport.

use crate::link::{RobotLink, SweepBuffer};
use crate::scanner::{Sweep, SWEEP_BEGIN_ANGLE_DEG, SWEEP_RESOLUTION};
use std::time::Duration;

/// Geometry of the synthetic field, in millimeters.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    /// Lateral offset of each row from the robot's track (both sides).
    pub row_offset_mm: f64,
    /// World-frame start of the rows along the direction of travel.
    pub row_start_mm: f64,
    /// World-frame end of the rows.
    pub row_end_mm: f64,
    /// Sensor maximum range; farther hits read as no return.
    pub max_range_mm: f64,
    /// Returns closer than this are flagged as close obstacles.
    pub detect_range_mm: f64,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            row_offset_mm: 400.0,
            row_start_mm: 0.0,
            row_end_mm: 1500.0,
            max_range_mm: 4000.0,
            detect_range_mm: 700.0,
        }
    }
}

/// Simulated robot in a two-row field.
pub struct SimulatedField {
    layout: FieldLayout,
    buffer: SweepBuffer,
    last_sweep: Sweep,
    commanded_speed: i8,
    commanded_steer: i8,
    /// Signed displacement along the track.
    position_mm: f64,
    /// Monotonic odometer distance (accumulates |speed|).
    travelled: f64,
    gyro_resets: usize,
}

impl SimulatedField {
    pub fn new() -> Self {
        Self::with_layout(FieldLayout::default())
    }

    pub fn with_layout(layout: FieldLayout) -> Self {
        let mut field = Self {
            layout,
            buffer: SweepBuffer::new(),
            last_sweep: [0u16; SWEEP_RESOLUTION],
            commanded_speed: 0,
            commanded_steer: 0,
            position_mm: 0.0,
            travelled: 0.0,
            gyro_resets: 0,
        };
        field.refresh_sweep();
        field
    }

    /// Advance the simulation by one tick: integrate motion, then publish
    /// a fresh sweep the way the receiver thread would.
    pub fn advance(&mut self, dt: Duration) {
        let speed = f64::from(self.commanded_speed);
        let secs = dt.as_secs_f64();
        self.position_mm += speed * secs;
        self.travelled += speed.abs() * secs;
        self.refresh_sweep();
    }

    fn refresh_sweep(&mut self) {
        self.last_sweep = self.render_sweep();
        self.buffer.publish(&self.last_sweep);
    }

    /// Ray-cast the two row walls from the robot's current position.
    fn render_sweep(&self) -> Sweep {
        let mut sweep = [0u16; SWEEP_RESOLUTION];
        for (index, sample) in sweep.iter_mut().enumerate() {
            let angle =
                (f64::from(SWEEP_BEGIN_ANGLE_DEG) + index as f64).to_radians();
            let (sin, cos) = angle.sin_cos();

            let mut nearest: Option<f64> = None;
            for side in [1.0, -1.0] {
                // The ray must head toward the wall on this side.
                if sin * side < 1e-9 {
                    continue;
                }
                let t = side * self.layout.row_offset_mm / sin;
                if t > self.layout.max_range_mm {
                    continue;
                }
                let hit_x = self.position_mm + t * cos;
                if hit_x < self.layout.row_start_mm || hit_x > self.layout.row_end_mm {
                    continue;
                }
                nearest = Some(nearest.map_or(t, |best: f64| best.min(t)));
            }

            if let Some(t) = nearest {
                *sample = t.round() as u16;
            }
        }
        sweep
    }

    /// Number of gyro resets requested so far.
    pub fn gyro_resets(&self) -> usize {
        self.gyro_resets
    }

    /// Signed displacement along the track, in millimeters.
    pub fn position_mm(&self) -> f64 {
        self.position_mm
    }

    /// Last commanded steering angle, in degrees.
    pub fn commanded_steer(&self) -> i8 {
        self.commanded_steer
    }
}

impl Default for SimulatedField {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotLink for SimulatedField {
    fn try_sweep(&mut self) -> Option<Sweep> {
        self.buffer.snapshot()
    }

    fn obstacle_count(&self) -> usize {
        self.last_sweep
            .iter()
            .filter(|&&range| range > 0 && f64::from(range) < self.layout.detect_range_mm)
            .count()
    }

    fn set_speed(&mut self, speed: i8) {
        self.commanded_speed = speed;
    }

    fn set_steering(&mut self, angle: i8) {
        self.commanded_steer = angle;
    }

    // The simulated motor responds instantly.
    fn motor_speed(&self) -> f64 {
        f64::from(self.commanded_speed)
    }

    fn odometer_speed(&self) -> f64 {
        f64::from(self.commanded_speed)
    }

    fn odometer_distance(&self) -> f64 {
        self.travelled
    }

    fn gyro_reset(&mut self) {
        self.gyro_resets += 1;
    }
}
