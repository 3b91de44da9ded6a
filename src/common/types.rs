//! Common types used throughout tpspace_rrt

use nalgebra::{Vector2, Vector3};

use crate::math::wrap_to_pi;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

/// SE(2) pose (position + heading) in the world frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub phi: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, phi: f64) -> Self {
        Self { x, y, phi }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, phi: 0.0 }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.phi)
    }

    /// Pose composition: `self ⊕ rel`, expressing a pose given relative to
    /// this one in the world frame.
    pub fn compose(&self, rel: &Pose2D) -> Pose2D {
        let (s, c) = self.phi.sin_cos();
        Pose2D {
            x: self.x + rel.x * c - rel.y * s,
            y: self.y + rel.x * s + rel.y * c,
            phi: wrap_to_pi(self.phi + rel.phi),
        }
    }

    /// Transforms a point given in this pose's body frame into the world frame.
    pub fn compose_point(&self, p: Point2D) -> Point2D {
        let (s, c) = self.phi.sin_cos();
        Point2D {
            x: self.x + p.x * c - p.y * s,
            y: self.y + p.x * s + p.y * c,
        }
    }

    /// Transforms a world-frame point into this pose's body frame.
    pub fn inverse_compose_point(&self, p: Point2D) -> Point2D {
        let (s, c) = self.phi.sin_cos();
        let dx = p.x - self.x;
        let dy = p.y - self.y;
        Point2D {
            x: dx * c + dy * s,
            y: -dx * s + dy * c,
        }
    }

    /// Relative pose of `other` as seen from this pose: `self⁻¹ ⊕ other`.
    pub fn inverse_compose(&self, other: &Pose2D) -> Pose2D {
        let p = self.inverse_compose_point(other.position());
        Pose2D {
            x: p.x,
            y: p.y,
            phi: wrap_to_pi(other.phi - self.phi),
        }
    }

    /// Euclidean distance between the (x, y) parts of two poses.
    pub fn xy_distance(&self, other: &Pose2D) -> f64 {
        self.position().distance(&other.position())
    }
}

impl From<Vector3<f64>> for Pose2D {
    fn from(v: Vector3<f64>) -> Self {
        Self { x: v[0], y: v[1], phi: v[2] }
    }
}

/// Velocity twist (vx, vy, omega)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twist2D {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

impl Twist2D {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    pub fn zero() -> Self {
        Self { vx: 0.0, vy: 0.0, omega: 0.0 }
    }

    /// Rotates the linear part by `angle`; the angular rate is frame-invariant.
    /// `twist.rotated(-pose.phi)` converts a world twist into the body frame.
    pub fn rotated(&self, angle: f64) -> Twist2D {
        let (s, c) = angle.sin_cos();
        Twist2D {
            vx: self.vx * c - self.vy * s,
            vy: self.vx * s + self.vy * c,
            omega: self.omega,
        }
    }

    pub fn norm(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }
}

/// Kinematic state: pose plus world-frame velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinState2D {
    pub pose: Pose2D,
    pub twist: Twist2D,
}

impl KinState2D {
    pub fn new(pose: Pose2D, twist: Twist2D) -> Self {
        Self { pose, twist }
    }

    pub fn at_rest(pose: Pose2D) -> Self {
        Self { pose, twist: Twist2D::zero() }
    }

    /// Velocity expressed in the body frame of `pose`.
    pub fn local_twist(&self) -> Twist2D {
        self.twist.rotated(-self.pose.phi)
    }
}

/// Static obstacle point cloud
#[derive(Debug, Clone, Default)]
pub struct Obstacles {
    pub points: Vec<Point2D>,
}

impl Obstacles {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn from_xy(x: &[f64], y: &[f64]) -> Self {
        assert_eq!(x.len(), y.len());
        let points = x.iter().zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Self { points }
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Closest obstacle point to (x, y), if the cloud is non-empty.
    pub fn closest_point(&self, x: f64, y: f64) -> Option<Point2D> {
        let q = Point2D::new(x, y);
        self.points
            .iter()
            .min_by(|a, b| {
                a.distance(&q)
                    .partial_cmp(&b.distance(&q))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_point2d_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_pose_compose() {
        let a = Pose2D::new(1.0, 0.0, FRAC_PI_2);
        let rel = Pose2D::new(1.0, 0.0, 0.0);
        let b = a.compose(&rel);
        assert!((b.x - 1.0).abs() < 1e-12);
        assert!((b.y - 1.0).abs() < 1e-12);
        assert!((b.phi - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_pose_compose_inverse_round_trip() {
        let a = Pose2D::new(0.3, -1.2, 0.8);
        let b = Pose2D::new(-2.0, 0.5, -2.4);
        let rel = a.inverse_compose(&b);
        let back = a.compose(&rel);
        assert!((back.x - b.x).abs() < 1e-12);
        assert!((back.y - b.y).abs() < 1e-12);
        assert!((back.phi - b.phi).abs() < 1e-12);
    }

    #[test]
    fn test_twist_rotated() {
        let t = Twist2D::new(1.0, 0.0, 0.5);
        let r = t.rotated(FRAC_PI_2);
        assert!(r.vx.abs() < 1e-12);
        assert!((r.vy - 1.0).abs() < 1e-12);
        assert!((r.omega - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_local_twist() {
        let state = KinState2D::new(
            Pose2D::new(0.0, 0.0, FRAC_PI_2),
            Twist2D::new(0.0, 1.0, 0.0),
        );
        let local = state.local_twist();
        assert!((local.vx - 1.0).abs() < 1e-12);
        assert!(local.vy.abs() < 1e-12);
    }

    #[test]
    fn test_obstacles_closest_point() {
        let obs = Obstacles::from_xy(&[0.0, 2.0, 5.0], &[0.0, 0.0, 0.0]);
        let c = obs.closest_point(1.8, 0.0).unwrap();
        assert!((c.x - 2.0).abs() < 1e-12);

        let empty = Obstacles::new();
        assert!(empty.closest_point(0.0, 0.0).is_none());
    }
}
