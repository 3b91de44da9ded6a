//! Constant-curvature circular-arc PTG ("C" trajectories)
//!
//! Differential-drive kinematics with a signed direction parameter K:
//!
//! v(alpha) = V_max * sign(K)
//! w(alpha) = (alpha / PI) * W_max * sign(K)
//!
//! so each trajectory is a circular arc of constant radius
//! R(alpha) = (V_max / W_max) * (PI / alpha). The workspace-to-TP inverse is
//! closed-form; TP-obstacle queries answer from a collision grid built by
//! sweeping the simulated paths with the robot footprint.
//!
//! Distances are "pseudo-meters": the path metric accumulates
//! (|v| + |w| * turning_radius_ref) * dt, which on a constant-curvature arc
//! integrates to theta * (|R| + turning_radius_ref) — the same value the
//! inverse map computes, so forward and inverse lookups agree.

use std::f64::consts::PI;

use crate::common::{PlannerError, PlannerResult, Pose2D, Twist2D};
use crate::math::{sign, wrap_to_2pi, wrap_to_pi};
use crate::ptg::collision_grid::CollisionGrid;
use crate::ptg::{tp_obstacle_postprocess, Ptg, PtgContext, RobotShape, WsTpMapping};

/// Configuration of a [`DiffDriveCPtg`]
#[derive(Debug, Clone)]
pub struct DiffDriveCConfig {
    /// +1.0 for forward arcs, -1.0 for backward arcs
    pub k_sign: f64,
    /// Maximum linear velocity [m/s]
    pub v_max: f64,
    /// Maximum angular velocity [rad/s]
    pub w_max: f64,
    /// Number of discrete directions
    pub alpha_count: usize,
    /// Trajectory horizon used to normalize distances [m]
    pub ref_distance: f64,
    /// Robot-scale length weighting rotation in the path metric [m]
    pub turning_radius_ref: f64,
    /// Robot footprint radius [m]
    pub robot_radius: f64,
    /// Integration step of the trajectory simulation [s]
    pub sim_time_step: f64,
    /// Collision grid resolution [m]
    pub grid_cell_size: f64,
}

impl Default for DiffDriveCConfig {
    fn default() -> Self {
        Self {
            k_sign: 1.0,
            v_max: 1.0,
            w_max: 1.0,
            alpha_count: 121,
            ref_distance: 10.0,
            turning_radius_ref: 0.10,
            robot_radius: 0.25,
            sim_time_step: 0.01,
            grid_cell_size: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PathStep {
    pose: Pose2D,
    v: f64,
    w: f64,
    dist: f64,
}

/// Circular-arc PTG for differential-driven robots
pub struct DiffDriveCPtg {
    cfg: DiffDriveCConfig,
    shape: RobotShape,
    paths: Vec<Vec<PathStep>>,
    grid: CollisionGrid,
}

impl DiffDriveCPtg {
    pub fn new(cfg: DiffDriveCConfig) -> PlannerResult<Self> {
        if cfg.k_sign != 1.0 && cfg.k_sign != -1.0 {
            return Err(PlannerError::InvalidParameter(format!(
                "k_sign must be +1 or -1, got {}",
                cfg.k_sign
            )));
        }
        for (name, v) in [
            ("v_max", cfg.v_max),
            ("w_max", cfg.w_max),
            ("ref_distance", cfg.ref_distance),
            ("robot_radius", cfg.robot_radius),
            ("sim_time_step", cfg.sim_time_step),
            ("grid_cell_size", cfg.grid_cell_size),
        ] {
            if v <= 0.0 {
                return Err(PlannerError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, v
                )));
            }
        }
        if cfg.alpha_count == 0 {
            return Err(PlannerError::InvalidParameter(
                "alpha_count must be positive".to_string(),
            ));
        }
        if cfg.turning_radius_ref < 0.0 {
            return Err(PlannerError::InvalidParameter(
                "turning_radius_ref must be non-negative".to_string(),
            ));
        }

        let shape = RobotShape::circular(cfg.robot_radius);
        let paths = simulate_paths(&cfg);
        let mut grid =
            CollisionGrid::new(cfg.ref_distance + cfg.robot_radius, cfg.grid_cell_size);
        // stamping every half cell of travel is enough to leave no gaps in
        // the footprint sweep
        let stamp_spacing = cfg.grid_cell_size * 0.5;
        for (k, steps) in paths.iter().enumerate() {
            let mut last_stamp = f64::NEG_INFINITY;
            for step in steps {
                if step.dist - last_stamp < stamp_spacing {
                    continue;
                }
                last_stamp = step.dist;
                grid.mark_disc(step.pose.x, step.pose.y, cfg.robot_radius, k as u16, step.dist);
            }
        }

        Ok(Self { cfg, shape, paths, grid })
    }

    pub fn config(&self) -> &DiffDriveCConfig {
        &self.cfg
    }

    fn steps(&self, k: usize) -> &[PathStep] {
        &self.paths[k.min(self.paths.len() - 1)]
    }
}

/// Steering function evaluated over the direction grid, Euler-integrated
/// until the pseudo-distance horizon is reached.
fn simulate_paths(cfg: &DiffDriveCConfig) -> Vec<Vec<PathStep>> {
    let dt = cfg.sim_time_step;
    let n = cfg.alpha_count as f64;
    let mut paths = Vec::with_capacity(cfg.alpha_count);

    for k in 0..cfg.alpha_count {
        let alpha = PI * (-1.0 + 2.0 * (k as f64 + 0.5) / n);
        let v = cfg.v_max * sign(cfg.k_sign);
        let w = (alpha / PI) * cfg.w_max * sign(cfg.k_sign);
        let d_step = (v.abs() + w.abs() * cfg.turning_radius_ref) * dt;

        let mut steps = Vec::new();
        let mut pose = Pose2D::origin();
        let mut dist = 0.0;
        steps.push(PathStep { pose, v, w, dist });

        while dist < cfg.ref_distance {
            pose.x += v * pose.phi.cos() * dt;
            pose.y += v * pose.phi.sin() * dt;
            pose.phi = wrap_to_pi(pose.phi + w * dt);
            dist += d_step;
            steps.push(PathStep { pose, v, w, dist });
        }
        paths.push(steps);
    }
    paths
}

impl Ptg for DiffDriveCPtg {
    fn description(&self) -> String {
        format!("DiffDrive_C,K={:+}", self.cfg.k_sign as i32)
    }

    fn alpha_count(&self) -> usize {
        self.cfg.alpha_count
    }

    fn ref_distance(&self) -> f64 {
        self.cfg.ref_distance
    }

    fn robot_shape(&self) -> &RobotShape {
        &self.shape
    }

    fn path_step_for_dist(&self, _ctx: &PtgContext, k: usize, dist: f64) -> Option<usize> {
        let steps = self.steps(k);
        if dist < 0.0 || dist > steps.last()?.dist {
            return None;
        }
        Some(steps.partition_point(|s| s.dist < dist))
    }

    fn path_pose(&self, _ctx: &PtgContext, k: usize, step: usize) -> Pose2D {
        let steps = self.steps(k);
        steps[step.min(steps.len() - 1)].pose
    }

    fn path_twist(&self, _ctx: &PtgContext, k: usize, step: usize) -> Twist2D {
        let steps = self.steps(k);
        let s = &steps[step.min(steps.len() - 1)];
        Twist2D::new(s.v * s.pose.phi.cos(), s.v * s.pose.phi.sin(), s.w)
    }

    fn inverse_map(&self, _ctx: &PtgContext, x: f64, y: f64) -> Option<WsTpMapping> {
        let cfg = &self.cfg;
        let (k, d, exact);

        if y != 0.0 {
            let mut r = (x * x + y * y) / (2.0 * y);
            let r_min = (cfg.v_max / cfg.w_max).abs();

            let theta = if cfg.k_sign > 0.0 {
                if y > 0.0 {
                    x.atan2(r.abs() - y)
                } else {
                    x.atan2(y + r.abs())
                }
            } else if y > 0.0 {
                (-x).atan2(r.abs() - y)
            } else {
                (-x).atan2(y + r.abs())
            };
            // Arc length must be positive, [0, 2*PI)
            let theta = wrap_to_2pi(theta);

            d = theta * (r.abs() + cfg.turning_radius_ref);

            if r.abs() < r_min {
                exact = false;
                r = r_min * sign(r);
            } else {
                exact = true;
            }

            let alpha = PI * cfg.v_max / (cfg.w_max * r);
            k = self.alpha2index(alpha);
        } else if sign(x) == sign(cfg.k_sign) {
            k = self.alpha2index(0.0);
            d = x * sign(cfg.k_sign);
            exact = true;
        } else {
            // offset behind the family; report the far-right direction with
            // an out-of-horizon sentinel
            k = cfg.alpha_count - 1;
            d = 1e3;
            exact = false;
        }

        Some(WsTpMapping { k, d_norm: d / cfg.ref_distance, exact })
    }

    fn is_into_domain(&self, _ctx: &PtgContext, _x: f64, _y: f64) -> bool {
        true
    }

    fn update_tp_obstacle(
        &self,
        _ctx: &PtgContext,
        ox: f64,
        oy: f64,
        k: usize,
        tp_obstacle_k: &mut f64,
    ) {
        for &(ek, dist) in self.grid.collisions_at(ox, oy) {
            if ek as usize == k {
                tp_obstacle_postprocess(&self.shape, ox, oy, dist, tp_obstacle_k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptg_with(v_max: f64, w_max: f64, turning_radius_ref: f64) -> DiffDriveCPtg {
        // moderate horizon and direction count keep construction cheap
        DiffDriveCPtg::new(DiffDriveCConfig {
            v_max,
            w_max,
            turning_radius_ref,
            alpha_count: 61,
            ref_distance: 5.0,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(DiffDriveCPtg::new(DiffDriveCConfig { k_sign: 0.5, ..Default::default() })
            .is_err());
        assert!(DiffDriveCPtg::new(DiffDriveCConfig { v_max: 0.0, ..Default::default() })
            .is_err());
    }

    #[test]
    fn test_inverse_map_straight() {
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();

        let sol = ptg.inverse_map(&ctx, 2.0, 0.0).unwrap();
        assert!(sol.exact);
        assert_eq!(sol.k, ptg.alpha2index(0.0));
        assert!((sol.d_norm * ptg.ref_distance() - 2.0).abs() < 1e-12);

        // behind a forward-only family: inexact sentinel
        let sol = ptg.inverse_map(&ctx, -2.0, 0.0).unwrap();
        assert!(!sol.exact);
        assert_eq!(sol.k, ptg.alpha_count() - 1);
        assert!(sol.d_norm * ptg.ref_distance() > 100.0);
    }

    #[test]
    fn test_inverse_map_lateral_unit_offset() {
        // (0, 1) with V=W=1: R = 0.5, theta = PI, clamped below R_min = 1
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();

        let sol = ptg.inverse_map(&ctx, 0.0, 1.0).unwrap();
        assert!(!sol.exact);
        assert_eq!(sol.k, ptg.alpha2index(PI));
        let d = sol.d_norm * ptg.ref_distance();
        assert!((d - PI * (0.5 + 0.1)).abs() < 1e-9);

        // with a zero turning radius reference the distance is the plain
        // half-circumference PI/2
        let ptg = ptg_with(1.0, 1.0, 0.0);
        let sol = ptg.inverse_map(&ctx, 0.0, 1.0).unwrap();
        let d = sol.d_norm * ptg.ref_distance();
        assert!((d - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_then_forward_on_grid_circle() {
        // Sample an offset lying exactly on a grid-direction arc so that the
        // direction snap introduces no error; only step quantization and the
        // Euler drift remain.
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();

        let k = ptg.alpha2index(0.0) + 10;
        let alpha = ptg.index2alpha(k);
        let r = PI * 1.0 / (1.0 * alpha);
        assert!(r >= 1.0);
        let theta: f64 = 0.8;
        let (x, y) = (r * theta.sin(), r * (1.0 - theta.cos()));

        let sol = ptg.inverse_map(&ctx, x, y).unwrap();
        assert!(sol.exact);
        assert_eq!(sol.k, k);
        let d = sol.d_norm * ptg.ref_distance();
        assert!((d - theta * (r + 0.1)).abs() < 1e-9);

        let step = ptg.path_step_for_dist(&ctx, sol.k, d).unwrap();
        let pose = ptg.path_pose(&ctx, sol.k, step);
        assert!((pose.x - x).abs() < 2e-2);
        assert!((pose.y - y).abs() < 2e-2);
        assert!((wrap_to_pi(pose.phi - theta)).abs() < 2e-2);
    }

    #[test]
    fn test_forward_then_inverse_round_trip() {
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();

        for dk in [-20i64, -5, 0, 5, 20] {
            let k = (ptg.alpha2index(0.0) as i64 + dk) as usize;
            let d = 2.0;
            let step = ptg.path_step_for_dist(&ctx, k, d).unwrap();
            let pose = ptg.path_pose(&ctx, k, step);

            let sol = ptg.inverse_map(&ctx, pose.x, pose.y).unwrap();
            assert!(sol.exact, "k={} should be exactly realizable", k);
            assert_eq!(sol.k, k);
            assert!((sol.d_norm * ptg.ref_distance() - d).abs() < 5e-2);
        }
    }

    #[test]
    fn test_path_step_for_dist_bounds() {
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        assert!(ptg.path_step_for_dist(&ctx, k, 0.5).is_some());
        // beyond the horizon the trajectory cannot reach the distance
        assert!(ptg.path_step_for_dist(&ctx, k, ptg.ref_distance() * 1.5).is_none());
    }

    #[test]
    fn test_path_twist_straight() {
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);
        let step = ptg.path_step_for_dist(&ctx, k, 1.0).unwrap();
        let tw = ptg.path_twist(&ctx, k, step);
        assert!((tw.vx - 1.0).abs() < 1e-6);
        assert!(tw.vy.abs() < 1e-6);
        assert!(tw.omega.abs() < 1e-6);
    }

    #[test]
    fn test_tp_obstacle_ahead() {
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let mut free = 0.0;
        ptg.init_tp_obstacle(k, &mut free);
        assert_eq!(free, ptg.ref_distance());

        // obstacle 1 m straight ahead stops the straight trajectory about a
        // footprint radius short of it
        ptg.update_tp_obstacle(&ctx, 1.0, 0.0, k, &mut free);
        assert!(free > 0.6 && free < 0.9, "free distance {}", free);

        // an obstacle far off the straight path leaves it untouched
        let mut free2 = 0.0;
        ptg.init_tp_obstacle(k, &mut free2);
        ptg.update_tp_obstacle(&ctx, 1.0, 2.0, k, &mut free2);
        assert_eq!(free2, ptg.ref_distance());
    }

    #[test]
    fn test_obstacle_inside_footprint_collapses_to_zero() {
        let ptg = ptg_with(1.0, 1.0, 0.1);
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);
        let mut free = 0.0;
        ptg.init_tp_obstacle(k, &mut free);
        ptg.update_tp_obstacle(&ctx, 0.05, 0.0, k, &mut free);
        assert_eq!(free, 0.0);
    }
}
