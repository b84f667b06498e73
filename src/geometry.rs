//! Geometric primitives for the sweep world.
//!
//! A [`Point`] is one lidar return converted to Cartesian coordinates, plus
//! the cluster tag assigned by the scanner. Coordinates are in millimeters
//! in the robot frame: +x straight ahead, +y to the left.

use std::cmp::Ordering;

/// Cluster membership tag.
///
/// Written at most once per clustering pass: `Unbound` points become either
/// `Id(n)` or `Noise`. `Noise` is reserved for gating filters (none are
/// active in the current pass, which only ever assigns `Id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterTag {
    /// Not yet visited by the clustering pass.
    Unbound,
    /// Rejected by a gating filter.
    Noise,
    /// Member of the cluster with this id.
    Id(usize),
}

/// A single sweep return in Cartesian coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    /// Forward offset in millimeters.
    pub x: f64,
    /// Lateral offset in millimeters.
    pub y: f64,
    /// Cluster tag, mutated exactly once per clustering pass.
    pub cluster: ClusterTag,
}

impl Point {
    /// Create an unbound point at the given coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            cluster: ClusterTag::Unbound,
        }
    }

    /// The origin (robot center), unbound.
    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Convert a polar reading to Cartesian. Angle zero is straight ahead.
    pub fn from_polar(distance: f64, angle_deg: f64) -> Self {
        let rad = angle_deg.to_radians();
        Self::new(distance * rad.cos(), distance * rad.sin())
    }

    /// Distance from the origin.
    pub fn range(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit-length copy of this point's direction vector.
    ///
    /// Returns the origin unchanged (a zero vector has no direction).
    pub fn normalized(&self) -> Self {
        let len = self.range();
        if len == 0.0 {
            return *self;
        }
        Self::new(self.x / len, self.y / len)
    }

    /// Sort key for the clustering traversal order: `(|y|, |x|)`.
    ///
    /// This is NOT an angular ordering. It is a tie-broken magnitude sort
    /// whose only purpose is a deterministic, magnitude-biased traversal
    /// for the clustering pass.
    #[inline]
    pub fn scan_key(&self) -> (f64, f64) {
        (self.y.abs(), self.x.abs())
    }
}

/// Compare two points in scan-traversal order.
#[inline]
pub fn scan_cmp(a: &Point, b: &Point) -> Ordering {
    a.scan_key()
        .partial_cmp(&b.scan_key())
        .unwrap_or(Ordering::Equal)
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.scan_key() == other.scan_key()
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(scan_cmp(self, other))
    }
}

/// Euclidean distance between two points.
pub fn euclidean_distance(p: &Point, q: &Point) -> f64 {
    let dx = q.x - p.x;
    let dy = q.y - p.y;
    (dx * dx + dy * dy).sqrt()
}

/// Angle in degrees between two direction vectors.
pub fn vector_angle_deg(p: &Point, q: &Point) -> f64 {
    let pn = p.normalized();
    let qn = q.normalized();
    (pn.x * qn.x + pn.y * qn.y).clamp(-1.0, 1.0).acos().to_degrees()
}
