//! Parameterized Trajectory Generators (PTGs)
//!
//! A PTG defines a continuous family of kinematically feasible trajectories
//! indexed by a discrete direction parameter alpha (the "k" index) and a
//! continuous arc-length-like distance d. It maps between workspace
//! displacements (x, y, phi) and trajectory-parameter space (alpha, d), and
//! projects workspace point obstacles into per-direction collision distances
//! ("TP-obstacles").
//!
//! Trajectory shape may depend on the robot's current velocity; that dynamic
//! state is passed explicitly as a [`PtgContext`] into every query, so PTGs
//! are immutable after construction and queries from concurrent evaluations
//! cannot race.

pub mod collision_grid;
pub mod diff_drive;
pub mod holonomic_blend;

use std::f64::consts::PI;

use crate::common::{Pose2D, Twist2D};
use crate::math::wrap_to_pi;

pub use diff_drive::{DiffDriveCConfig, DiffDriveCPtg};
pub use holonomic_blend::{HolonomicBlendConfig, HolonomicBlendPtg};

/// Dynamic state a PTG query is evaluated under: the robot's velocity in its
/// own body frame at the segment start, the relative target pose, and the
/// speed scale requested at the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtgContext {
    pub cur_vel_local: Twist2D,
    pub rel_target: Pose2D,
    pub target_rel_speed: f64,
}

impl Default for PtgContext {
    fn default() -> Self {
        Self {
            cur_vel_local: Twist2D::zero(),
            rel_target: Pose2D::new(1.0, 0.0, 0.0),
            target_rel_speed: 1.0,
        }
    }
}

impl PtgContext {
    /// Context for evaluating motions that start from `state`.
    pub fn from_state(state: &crate::common::KinState2D) -> Self {
        Self {
            cur_vel_local: state.local_twist(),
            ..Default::default()
        }
    }
}

/// Circular robot footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotShape {
    pub radius: f64,
}

impl RobotShape {
    pub fn circular(radius: f64) -> Self {
        Self { radius }
    }

    /// Whether a body-frame point lies inside the footprint.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x * x + y * y <= self.radius * self.radius
    }
}

/// Result of mapping a workspace offset into TP-space.
///
/// `d_norm` is the trajectory distance normalized by the PTG reference
/// distance. `exact` is false for snapped or clamped solutions that no
/// trajectory of the family realizes exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WsTpMapping {
    pub k: usize,
    pub d_norm: f64,
    pub exact: bool,
}

/// Capability interface of a trajectory family.
///
/// Numeric queries signal failure through `Option`; no query panics on
/// unreachable inputs.
pub trait Ptg {
    /// Short human-readable description of the family and its parameters.
    fn description(&self) -> String;

    /// Number of discrete directions K.
    fn alpha_count(&self) -> usize;

    /// Reference distance (horizon) used to normalize d, in meters.
    fn ref_distance(&self) -> f64;

    /// Robot footprint used for collision projection.
    fn robot_shape(&self) -> &RobotShape;

    /// Direction angle of trajectory `k`, uniformly spaced in (-PI, PI].
    fn index2alpha(&self, k: usize) -> f64 {
        let n = self.alpha_count() as f64;
        PI * (-1.0 + 2.0 * (k as f64 + 0.5) / n)
    }

    /// Trajectory index for direction `alpha`, clamped into [0, K).
    fn alpha2index(&self, alpha: f64) -> usize {
        let n = self.alpha_count() as f64;
        let a = wrap_to_pi(alpha);
        let k = (0.5 * (n * (1.0 + a / PI) - 1.0)).round() as i64;
        k.clamp(0, self.alpha_count() as i64 - 1) as usize
    }

    /// Time-step index along trajectory `k` at which the traveled distance
    /// reaches `dist` (pseudo-meters). `None` if the trajectory cannot
    /// reach that distance.
    fn path_step_for_dist(&self, ctx: &PtgContext, k: usize, dist: f64) -> Option<usize>;

    /// Pose relative to the trajectory start at the given step.
    fn path_pose(&self, ctx: &PtgContext, k: usize, step: usize) -> Pose2D;

    /// Velocity in the trajectory start frame at the given step.
    fn path_twist(&self, ctx: &PtgContext, k: usize, step: usize) -> Twist2D;

    /// Best (k, d) for the relative workspace offset (x, y).
    fn inverse_map(&self, ctx: &PtgContext, x: f64, y: f64) -> Option<WsTpMapping>;

    /// Whether some trajectory of the family reaches (x, y).
    fn is_into_domain(&self, ctx: &PtgContext, x: f64, y: f64) -> bool;

    /// Resets the running TP-obstacle distance for direction `k` to the
    /// collision-free horizon.
    fn init_tp_obstacle(&self, _k: usize, tp_obstacle_k: &mut f64) {
        *tp_obstacle_k = self.ref_distance();
    }

    /// Narrows the running TP-obstacle distance for direction `k` with the
    /// point obstacle (ox, oy), given in the trajectory start frame.
    fn update_tp_obstacle(
        &self,
        ctx: &PtgContext,
        ox: f64,
        oy: f64,
        k: usize,
        tp_obstacle_k: &mut f64,
    );
}

/// Monotone TP-obstacle narrowing shared by all PTGs: a collision already
/// inside the footprint maps to distance zero, and the running minimum only
/// ever decreases.
pub(crate) fn tp_obstacle_postprocess(
    shape: &RobotShape,
    ox: f64,
    oy: f64,
    collision_dist: f64,
    tp_obstacle_k: &mut f64,
) {
    let d = if shape.contains(ox, oy) { 0.0 } else { collision_dist };
    if d < *tp_obstacle_k {
        *tp_obstacle_k = d;
    }
}

/// An ordered family of initialized PTGs sharing one robot footprint.
pub struct TrajectorySet {
    pub ptgs: Vec<Box<dyn Ptg>>,
    pub robot_shape: RobotShape,
}

impl TrajectorySet {
    pub fn new(ptgs: Vec<Box<dyn Ptg>>, robot_shape: RobotShape) -> Self {
        Self { ptgs, robot_shape }
    }

    pub fn is_empty(&self) -> bool {
        self.ptgs.is_empty()
    }

    /// Largest reference distance over the family; defines the local
    /// obstacle clipping square.
    pub fn max_ref_distance(&self) -> f64 {
        self.ptgs.iter().map(|p| p.ref_distance()).fold(0.0, f64::max)
    }

    /// Whether a body-frame obstacle point collides with the robot shape.
    pub fn point_collides(&self, x: f64, y: f64) -> bool {
        self.robot_shape.contains(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GridOnly {
        n: usize,
        shape: RobotShape,
    }

    impl Ptg for GridOnly {
        fn description(&self) -> String {
            "grid-only".to_string()
        }
        fn alpha_count(&self) -> usize {
            self.n
        }
        fn ref_distance(&self) -> f64 {
            10.0
        }
        fn robot_shape(&self) -> &RobotShape {
            &self.shape
        }
        fn path_step_for_dist(&self, _: &PtgContext, _: usize, _: f64) -> Option<usize> {
            None
        }
        fn path_pose(&self, _: &PtgContext, _: usize, _: usize) -> Pose2D {
            Pose2D::origin()
        }
        fn path_twist(&self, _: &PtgContext, _: usize, _: usize) -> Twist2D {
            Twist2D::zero()
        }
        fn inverse_map(&self, _: &PtgContext, _: f64, _: f64) -> Option<WsTpMapping> {
            None
        }
        fn is_into_domain(&self, _: &PtgContext, _: f64, _: f64) -> bool {
            false
        }
        fn update_tp_obstacle(&self, _: &PtgContext, _: f64, _: f64, _: usize, _: &mut f64) {}
    }

    #[test]
    fn test_alpha_index_round_trip() {
        let ptg = GridOnly { n: 31, shape: RobotShape::circular(0.2) };
        for k in 0..31 {
            let a = ptg.index2alpha(k);
            assert!(a > -PI && a <= PI);
            assert_eq!(ptg.alpha2index(a), k);
        }
    }

    #[test]
    fn test_alpha2index_extremes() {
        let ptg = GridOnly { n: 31, shape: RobotShape::circular(0.2) };
        // alpha = PI maps to the far-right direction
        assert_eq!(ptg.alpha2index(PI), 30);
        // alpha = 0 lands on the central direction of an odd grid
        assert_eq!(ptg.alpha2index(0.0), 15);
    }

    #[test]
    fn test_tp_obstacle_postprocess() {
        let shape = RobotShape::circular(0.5);
        let mut running = 10.0;
        tp_obstacle_postprocess(&shape, 3.0, 0.0, 4.0, &mut running);
        assert_eq!(running, 4.0);
        // larger candidate does not widen the running minimum
        tp_obstacle_postprocess(&shape, 5.0, 0.0, 8.0, &mut running);
        assert_eq!(running, 4.0);
        // obstacle inside the footprint collapses it to zero
        tp_obstacle_postprocess(&shape, 0.1, 0.1, 2.0, &mut running);
        assert_eq!(running, 0.0);
    }

    #[test]
    fn test_robot_shape_contains() {
        let shape = RobotShape::circular(0.3);
        assert!(shape.contains(0.2, 0.1));
        assert!(!shape.contains(0.3, 0.3));
    }
}
