//! Sweep clustering engine.
//!
//! Turns one raw range sweep into "sub-lines": spatially coherent groups of
//! points approximating nearby obstacle edges (crop rows, fence posts). The
//! pass is a single-radius density clustering over the sweep world:
//!
//! 1. **Agglomerate** — convert non-zero samples to Cartesian points and
//!    sort them in scan-traversal order (see [`Point::scan_key`]).
//! 2. **Cluster** — walk the world in that order; each unclaimed point
//!    within seed range opens a fresh cluster and expands it through an
//!    index-based worklist over the point arena.
//!
//! Clusters keep their insertion order; ids increase monotonically and are
//! never reused within a pass, including ids of clusters later discarded
//! for having fewer than three members.

use crate::config::ScannerTuning;
use crate::geometry::{euclidean_distance, scan_cmp, ClusterTag, Point};
use std::cmp::Ordering;

/// Number of samples in one sweep, one per whole degree.
pub const SWEEP_RESOLUTION: usize = 271;

/// Angle of the first sweep sample, in degrees (zero is straight ahead).
pub const SWEEP_BEGIN_ANGLE_DEG: i16 = -135;

/// Minimum cluster size retained as a sub-line.
pub const MIN_SUB_LINE_POINTS: usize = 3;

/// One full sensor sweep. Values are ranges in millimeters; 0 = no return.
pub type Sweep = [u16; SWEEP_RESOLUTION];

/// A retained cluster of at least [`MIN_SUB_LINE_POINTS`] points,
/// approximating a contiguous obstacle edge segment.
pub type SubLine = Vec<Point>;

/// The clustering engine. Rebuilds its world and sub-lines from scratch on
/// every [`Scanner::update`]; no state carries over between sweeps.
#[derive(Debug, Clone)]
pub struct Scanner {
    /// Neighbor-inclusion radius in millimeters (strict `<` comparison).
    epsilon: f64,
    /// Seed gate: points farther than this never open a cluster.
    max_seed_range: f64,
    /// Worklist items processed during the last pass (diagnostic only).
    iterations: usize,
    world: Vec<Point>,
    sub_lines: Vec<SubLine>,
}

impl Scanner {
    pub fn new(tuning: &ScannerTuning) -> Self {
        Self {
            epsilon: tuning.epsilon_mm,
            max_seed_range: tuning.max_seed_range_mm,
            iterations: 0,
            world: Vec::new(),
            sub_lines: Vec::new(),
        }
    }

    /// Consume one sweep: rebuild the world, then rebuild the sub-lines.
    pub fn update(&mut self, sweep: &Sweep) {
        self.agglomerate(sweep);
        self.scan_sub_lines();
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Worklist items processed during the last clustering pass.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Sub-lines from the last sweep, in cluster-id order.
    pub fn sub_lines(&self) -> &[SubLine] {
        &self.sub_lines
    }

    /// All points from the last sweep, in scan-traversal order.
    pub fn world(&self) -> &[Point] {
        &self.world
    }

    /// Convert the sweep to Cartesian points and sort them.
    ///
    /// The sort is by `(|y|, |x|)`, which is deliberately not an angular
    /// ordering: it fixes a deterministic, magnitude-biased traversal for
    /// the clustering pass.
    fn agglomerate(&mut self, sweep: &Sweep) {
        self.world.clear();
        for (index, &range) in sweep.iter().enumerate() {
            if range == 0 {
                // No return at this angle.
                continue;
            }
            let angle = f64::from(SWEEP_BEGIN_ANGLE_DEG) + index as f64;
            self.world.push(Point::from_polar(f64::from(range), angle));
        }
        self.world.sort_by(scan_cmp);
    }

    /// Run the density pass over the sorted world.
    fn scan_sub_lines(&mut self) {
        let mut sub_lines = Vec::new();
        let mut next_id = 0usize;
        self.iterations = 0;

        for seed in 0..self.world.len() {
            let point = self.world[seed];
            if point.cluster != ClusterTag::Unbound || point.range() > self.max_seed_range {
                continue;
            }
            // The neighbor set is computed before the seed is claimed, so
            // it contains the seed itself; expansion skips it as claimed.
            let worklist = self.neighbors_of(seed);
            self.world[seed].cluster = ClusterTag::Id(next_id);
            let mut members = vec![self.world[seed]];
            self.expand(next_id, worklist, &mut members);

            // Undersized clusters are dropped, but their id stays consumed
            // and their members stay tagged with it.
            if members.len() >= MIN_SUB_LINE_POINTS {
                sub_lines.push(members);
            }
            next_id += 1;
        }

        self.sub_lines = sub_lines;
    }

    /// Indices of unclaimed points strictly within epsilon of `origin`,
    /// in world (scan-traversal) order.
    fn neighbors_of(&self, origin: usize) -> Vec<usize> {
        let from = self.world[origin];
        (0..self.world.len())
            .filter(|&i| {
                self.world[i].cluster == ClusterTag::Unbound
                    && euclidean_distance(&from, &self.world[i]) < self.epsilon
            })
            .collect()
    }

    /// Grow cluster `id` by draining the worklist.
    ///
    /// Each claimed point contributes its own neighbors, but only the
    /// suffix sorting strictly after the worklist's current last element:
    /// points behind the traversal were either claimed already or belong to
    /// another pending entry. This truncation bounds worklist growth; it is
    /// a deviation from textbook density clustering, kept from the tuned
    /// field behavior.
    fn expand(&mut self, id: usize, mut worklist: Vec<usize>, members: &mut Vec<Point>) {
        let mut cursor = 0;
        while cursor < worklist.len() {
            self.iterations += 1;
            let index = worklist[cursor];
            cursor += 1;

            if self.world[index].cluster != ClusterTag::Unbound {
                // Already claimed, possibly via a duplicate worklist entry.
                continue;
            }
            self.world[index].cluster = ClusterTag::Id(id);
            members.push(self.world[index]);

            let fresh = self.neighbors_of(index);
            let tail = self.world[worklist[worklist.len() - 1]];
            let keep_from = fresh
                .iter()
                .position(|&i| scan_cmp(&tail, &self.world[i]) == Ordering::Less)
                .unwrap_or(fresh.len());
            worklist.extend_from_slice(&fresh[keep_from..]);
        }
    }
}
