//! FurrowNav - Navigation core for a row-crop ground robot
//!
//! Converts a raw 360°-class range-sensor sweep into geometric structure
//! (sub-lines: clusters of points approximating nearby obstacle edges) and
//! drives a discrete maneuver state machine that issues motor commands from
//! that structure and from odometry/gyro feedback.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 main.rs / sim                       │  ← Wiring & harness
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   navigation                        │  ← Maneuver cycle
//! │        (wait → approach → stop → turn → …)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    scanner                          │  ← Sweep clustering
//! │          (agglomerate, density expansion)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                geometry / link                      │  ← Foundation
//! │        (points, tags, collaborator seam)            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! One update tick: acquire a guarded sweep snapshot, rebuild the sub-line
//! collection, integrate run distance, dispatch the active maneuver handler
//! exactly once. World and sub-lines are rebuilt from scratch every tick;
//! only the maneuver state persists.

pub mod config;
pub mod error;
pub mod geometry;
pub mod link;
pub mod navigation;
pub mod scanner;
pub mod sim;

// Convenience re-exports (flat namespace for common use)
pub use config::{FurrowConfig, ManeuverTuning, ScannerTuning};
pub use error::{FurrowError, Result};
pub use geometry::{euclidean_distance, scan_cmp, ClusterTag, Point};
pub use link::{RobotLink, SweepBuffer};
pub use navigation::{Maneuver, Navigator};
pub use scanner::{
    Scanner, SubLine, Sweep, MIN_SUB_LINE_POINTS, SWEEP_BEGIN_ANGLE_DEG, SWEEP_RESOLUTION,
};
pub use sim::{FieldLayout, SimulatedField};
