//! Ramped-velocity holonomic PTG
//!
//! At t = 0 the robot moves with its current local velocity (vxi, vyi, wi).
//! Each direction alpha commands the target velocity
//! (vf cos(alpha), vf sin(alpha), wf), approached with a linear blend over
//! [0, T_ramp] and held afterwards. vf, wf and T_ramp may depend on alpha
//! through user-supplied math expressions (defaults: `V_MAX`, `W_MAX`,
//! `T_ramp_max`).
//!
//! Everything is closed-form: the inverse workspace map is a 4-dimensional
//! Newton iteration, TP-obstacle distances come from the real roots of a
//! quartic (in-ramp) or a quadratic (post-ramp) in the collision time, and
//! arc length along the blend is a short trapezoid-rule integral of
//! sqrt(a t^2 + b t + c).

use nalgebra::{Matrix4, Vector4};

use crate::common::{PlannerError, PlannerResult, Pose2D, Twist2D};
use crate::math::expr::Expr;
use crate::math::poly::{solve_poly2, solve_poly3, solve_poly4};
use crate::math::sign_with_zero;
use crate::ptg::{tp_obstacle_postprocess, Ptg, PtgContext, RobotShape, WsTpMapping};

/// Time resolution of a path step [s]
pub const PATH_TIME_STEP: f64 = 0.01;

/// Epsilon for detecting 1/0 situations
const EPS: f64 = 1e-4;

/// Speeds below this absolute threshold are treated as "reach target and
/// stop", which couples T_ramp to the arrival time in the inverse map
const REL_SPEED_TO_CONSIDER_REACH_AND_STOP: f64 = 0.10 * 1.05;

/// Variables available to the user expressions
const EXPR_SYMBOLS: [&str; 14] = [
    "dir",
    "target_dir",
    "target_dist",
    "V_MAX",
    "W_MAX",
    "T_ramp_max",
    "vxi",
    "vyi",
    "wi",
    "target_x",
    "target_y",
    "target_phi",
    "target_rel_speed",
    "trimmable_speed",
];

/// Configuration of a [`HolonomicBlendPtg`]
#[derive(Debug, Clone)]
pub struct HolonomicBlendConfig {
    /// Maximum linear velocity [m/s]
    pub v_max: f64,
    /// Maximum angular velocity [rad/s]
    pub w_max: f64,
    /// Maximum duration of the velocity blend [s]
    pub t_ramp_max: f64,
    /// Number of discrete directions
    pub alpha_count: usize,
    /// Trajectory horizon used to normalize distances [m]
    pub ref_distance: f64,
    /// Robot footprint radius [m]
    pub robot_radius: f64,
    /// Math expression for |V| as a function of the symbol set
    pub expr_v: String,
    /// Math expression for |omega| (the sign follows `dir`)
    pub expr_w: String,
    /// Math expression for the ramp duration
    pub expr_t_ramp: String,
}

impl Default for HolonomicBlendConfig {
    fn default() -> Self {
        Self {
            v_max: 1.0,
            w_max: 40.0_f64.to_radians(),
            t_ramp_max: 0.9,
            alpha_count: 31,
            ref_distance: 10.0,
            robot_radius: 0.25,
            expr_v: "V_MAX".to_string(),
            expr_w: "W_MAX".to_string(),
            expr_t_ramp: "T_ramp_max".to_string(),
        }
    }
}

/// Per-direction derived parameters
#[derive(Debug, Clone, Copy)]
struct BlendParams {
    t_ramp: f64,
    vf: f64,
    wf: f64,
    vxi: f64,
    vyi: f64,
    wi: f64,
    vxf: f64,
    vyf: f64,
}

/// Ramped holonomic PTG
pub struct HolonomicBlendPtg {
    cfg: HolonomicBlendConfig,
    shape: RobotShape,
    expr_v: Expr,
    expr_w: Expr,
    expr_t_ramp: Expr,
}

impl HolonomicBlendPtg {
    pub fn new(cfg: HolonomicBlendConfig) -> PlannerResult<Self> {
        for (name, v) in [
            ("v_max", cfg.v_max),
            ("w_max", cfg.w_max),
            ("t_ramp_max", cfg.t_ramp_max),
            ("ref_distance", cfg.ref_distance),
            ("robot_radius", cfg.robot_radius),
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

        let compile = |label: &str, src: &str| -> PlannerResult<Expr> {
            let expr = Expr::parse(src)
                .map_err(|e| PlannerError::InvalidParameter(format!("{}: {}", label, e)))?;
            for var in expr.variables() {
                if !EXPR_SYMBOLS.contains(&var.as_str()) {
                    return Err(PlannerError::InvalidParameter(format!(
                        "{}: unknown variable `{}`",
                        label, var
                    )));
                }
            }
            Ok(expr)
        };
        let expr_v = compile("expr_v", &cfg.expr_v)?;
        let expr_w = compile("expr_w", &cfg.expr_w)?;
        let expr_t_ramp = compile("expr_t_ramp", &cfg.expr_t_ramp)?;

        let shape = RobotShape::circular(cfg.robot_radius);
        Ok(Self { cfg, shape, expr_v, expr_w, expr_t_ramp })
    }

    pub fn config(&self) -> &HolonomicBlendConfig {
        &self.cfg
    }

    fn expr_scope(&self, ctx: &PtgContext, dir: f64) -> [(&'static str, f64); 14] {
        let target_dist =
            (ctx.rel_target.x * ctx.rel_target.x + ctx.rel_target.y * ctx.rel_target.y).sqrt();
        let target_dir = if target_dist > EPS {
            self.index2alpha(self.alpha2index(ctx.rel_target.y.atan2(ctx.rel_target.x)))
        } else {
            0.0
        };
        [
            ("dir", dir),
            ("target_dir", target_dir),
            ("target_dist", target_dist),
            ("V_MAX", self.cfg.v_max),
            ("W_MAX", self.cfg.w_max),
            ("T_ramp_max", self.cfg.t_ramp_max),
            ("vxi", ctx.cur_vel_local.vx),
            ("vyi", ctx.cur_vel_local.vy),
            ("wi", ctx.cur_vel_local.omega),
            ("target_x", ctx.rel_target.x),
            ("target_y", ctx.rel_target.y),
            ("target_phi", ctx.rel_target.phi),
            ("target_rel_speed", ctx.target_rel_speed),
            ("trimmable_speed", ctx.target_rel_speed),
        ]
    }

    /// |V(dir)| from the user expression.
    fn dir_speed(&self, ctx: &PtgContext, dir: f64) -> f64 {
        self.expr_v.eval(&self.expr_scope(ctx, dir)).abs()
    }

    fn params_for_dir(&self, ctx: &PtgContext, dir: f64) -> BlendParams {
        let scope = self.expr_scope(ctx, dir);
        let vf = self.expr_v.eval(&scope).abs();
        let wf = sign_with_zero(dir) * self.expr_w.eval(&scope).abs();
        let t_expr = self.expr_t_ramp.eval(&scope);
        let t_ramp = if t_expr.is_finite() && t_expr > 0.0 {
            t_expr
        } else {
            self.cfg.t_ramp_max
        };
        BlendParams {
            t_ramp,
            vf,
            wf,
            vxi: ctx.cur_vel_local.vx,
            vyi: ctx.cur_vel_local.vy,
            wi: ctx.cur_vel_local.omega,
            vxf: vf * dir.cos(),
            vyf: vf * dir.sin(),
        }
    }

    /// Translated distance at `step`, given the blend terminal velocity and
    /// ramp duration.
    fn path_dist_params(
        &self,
        step: usize,
        t_ramp: f64,
        vxi: f64,
        vyi: f64,
        vxf: f64,
        vyf: f64,
    ) -> f64 {
        let t = PATH_TIME_STEP * step as f64;
        let tr2 = 1.0 / (2.0 * t_ramp);
        let k2 = (vxf - vxi) * tr2;
        let k4 = (vyf - vyi) * tr2;

        if t < t_ramp {
            trans_distance_below_t_ramp(k2, k4, vxi, vyi, t)
        } else {
            (t - t_ramp) * self.cfg.v_max
                + trans_distance_below_t_ramp(k2, k4, vxi, vyi, t_ramp)
        }
    }

    /// Translated distance along trajectory `k` at `step` (pseudo-meters;
    /// for this family they coincide with real meters).
    pub fn path_dist(&self, ctx: &PtgContext, k: usize, step: usize) -> f64 {
        let p = self.params_for_dir(ctx, self.index2alpha(k));
        self.path_dist_params(step, p.t_ramp, p.vxi, p.vyi, p.vxf, p.vyf)
    }
}

/// Numeric integration of sqrt(a t^2 + b t + c) over [0, T], trapezoid rule.
/// Faster and free of special cases compared to the closed form.
fn trans_distance_integral(t_end: f64, a: f64, b: f64, c: f64) -> f64 {
    const NUM_STEPS: usize = 20;

    let mut d = 0.0;
    let mut f_prev = c.max(0.0).sqrt(); // value at t = 0
    let dt = t_end / NUM_STEPS as f64;
    let mut t = 0.0;
    for _ in 0..NUM_STEPS {
        t += dt;
        // handle numerical inaccuracies near t = T_ramp
        let dd = (a * t * t + b * t + c).max(0.0);
        let f_next = dd.sqrt();
        d += dt * (f_prev + f_next) * 0.5;
        f_prev = f_next;
    }
    d
}

/// Line-integral distance along the blend for t in [0, T_ramp], handling the
/// 1/0 special cases:
///
/// D(t) = integral of sqrt((4 k2^2 + 4 k4^2) t^2 + (4 k2 vxi + 4 k4 vyi) t
///                          + vxi^2 + vyi^2) dt
fn trans_distance_below_t_ramp(k2: f64, k4: f64, vxi: f64, vyi: f64, t: f64) -> f64 {
    let c = vxi * vxi + vyi * vyi;
    if k2.abs() > EPS || k4.abs() > EPS {
        let a = 4.0 * (k2 * k2 + k4 * k4);
        let b = 4.0 * (k2 * vxi + k4 * vyi);

        if b.abs() < EPS && c.abs() < EPS {
            // degenerate start at rest: integrand reduces to sqrt(a)*t
            a.sqrt() * t * t * 0.5
        } else {
            trans_distance_integral(t, a, b, c)
        }
    } else {
        c.sqrt() * t
    }
}

impl Ptg for HolonomicBlendPtg {
    fn description(&self) -> String {
        format!(
            "HolonomicBlend,Tramp={:.3},Vmax={:.3},Wmax={:.3}",
            self.cfg.t_ramp_max, self.cfg.v_max, self.cfg.w_max
        )
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

    fn path_step_for_dist(&self, ctx: &PtgContext, k: usize, dist: f64) -> Option<usize> {
        let p = self.params_for_dir(ctx, self.index2alpha(k));
        let tr2 = 1.0 / (2.0 * p.t_ramp);
        let k2 = (p.vxf - p.vxi) * tr2;
        let k4 = (p.vyf - p.vyi) * tr2;

        let dist_at_t_ramp = trans_distance_below_t_ramp(k2, k4, p.vxi, p.vyi, p.t_ramp);

        let t_solved = if dist >= dist_at_t_ramp {
            // solution within t >= T_ramp
            p.t_ramp + (dist - dist_at_t_ramp) / self.cfg.v_max
        } else if k2.abs() < EPS && k4.abs() < EPS {
            // straight line with no blend
            dist / self.cfg.v_max
        } else {
            let a = 4.0 * (k2 * k2 + k4 * k4);
            let b = 4.0 * (k2 * p.vxi + k4 * p.vyi);
            let c = p.vxi * p.vxi + p.vyi * p.vyi;

            if b.abs() < EPS && c.abs() < EPS {
                // start at rest: D = sqrt(a) t^2 / 2
                std::f64::consts::SQRT_2 * dist.sqrt() / a.powf(0.25)
            } else {
                // general case: Newton on D(t) - dist = 0 with
                // D'(t) = sqrt(a t^2 + b t + c)
                let mut t = p.t_ramp * 0.6;
                for _ in 0..10 {
                    let err = trans_distance_integral(t, a, b, c) - dist;
                    let diff = (a * t * t + b * t + c).sqrt();
                    if diff.abs() < 1e-40 {
                        return None;
                    }
                    t -= err / diff;
                    if t < 0.0 {
                        t = 0.0;
                    }
                    if err.abs() < 1e-3 {
                        break;
                    }
                }
                t
            }
        };

        if t_solved >= 0.0 && t_solved.is_finite() {
            Some((t_solved / PATH_TIME_STEP).round() as usize)
        } else {
            None
        }
    }

    fn path_pose(&self, ctx: &PtgContext, k: usize, step: usize) -> Pose2D {
        let dir = self.index2alpha(k);
        let p = self.params_for_dir(ctx, dir);
        let t = PATH_TIME_STEP * step as f64;
        let tr2 = 1.0 / (2.0 * p.t_ramp);

        let (x, y) = if t < p.t_ramp {
            (
                p.vxi * t + t * t * tr2 * (p.vxf - p.vxi),
                p.vyi * t + t * t * tr2 * (p.vyf - p.vyi),
            )
        } else {
            (
                p.t_ramp * 0.5 * (p.vxi + p.vxf) + (t - p.t_ramp) * p.vxf,
                p.t_ramp * 0.5 * (p.vyi + p.vyf) + (t - p.t_ramp) * p.vyf,
            )
        };

        let phi = if t < p.t_ramp {
            // has the heading aligned with `dir` already?
            let a = tr2 * (p.wf - p.wi);
            match solve_poly2(a, p.wi, -dir) {
                None => 0.0, // typical case: wi = wf = 0
                Some((r1, r2)) => {
                    let t_align = r1.max(r2);
                    if t > t_align {
                        dir
                    } else {
                        p.wi * t + t * t * tr2 * (p.wf - p.wi)
                    }
                }
            }
        } else {
            let t_align = (dir - p.t_ramp * 0.5 * (p.wi + p.wf)) / p.wf + p.t_ramp;
            if t > t_align {
                dir
            } else {
                p.t_ramp * 0.5 * (p.wi + p.wf) + (t - p.t_ramp) * p.wf
            }
        };

        Pose2D::new(x, y, phi)
    }

    fn path_twist(&self, ctx: &PtgContext, k: usize, step: usize) -> Twist2D {
        let dir = self.index2alpha(k);
        let p = self.params_for_dir(ctx, dir);
        let t = PATH_TIME_STEP * step as f64;
        let tr2 = 1.0 / (2.0 * p.t_ramp);

        let (vx, vy) = if t < p.t_ramp {
            let s = t / p.t_ramp;
            (p.vxi + s * (p.vxf - p.vxi), p.vyi + s * (p.vyf - p.vyi))
        } else {
            (p.vxf, p.vyf)
        };

        // angular rate mirrors the alignment logic of the heading profile
        let omega = if t < p.t_ramp {
            let a = tr2 * (p.wf - p.wi);
            match solve_poly2(a, p.wi, -dir) {
                None => 0.0,
                Some((r1, r2)) => {
                    if t > r1.max(r2) {
                        0.0
                    } else {
                        p.wi + (t / p.t_ramp) * (p.wf - p.wi)
                    }
                }
            }
        } else {
            let t_align = (dir - p.t_ramp * 0.5 * (p.wi + p.wf)) / p.wf + p.t_ramp;
            if t > t_align {
                0.0
            } else {
                p.wf
            }
        };

        Twist2D::new(vx, vy, omega)
    }

    fn inverse_map(&self, ctx: &PtgContext, x: f64, y: f64) -> Option<WsTpMapping> {
        let norm = (x * x + y * y).sqrt();
        if norm < 1e-12 {
            return None;
        }

        let err_threshold = 1e-3;
        let vxi = ctx.cur_vel_local.vx;
        let vyi = ctx.cur_vel_local.vy;
        let t_ramp_max = self.cfg.t_ramp_max;

        // Newton iteration over q = [t, vxf, vyf, T_ramp], branching on
        // t <=> T_ramp, with the speed constraint vxf^2 + vyf^2 = V(alpha)^2
        // and a stop-at-target condition coupling T_ramp to t for very slow
        // target speeds.
        let mut q = Vector4::new(
            t_ramp_max * 1.1,
            self.cfg.v_max * x / norm,
            self.cfg.v_max * y / norm,
            t_ramp_max,
        );

        let mut sol_found = false;
        for _ in 0..25 {
            if sol_found {
                break;
            }
            let t = q[0];
            let (vxf, vyf) = (q[1], q[2]);
            let alpha = vyf.atan2(vxf);

            let v_alpha = self.dir_speed(ctx, alpha);
            if !v_alpha.is_finite() {
                return None;
            }
            let v_sq = v_alpha * v_alpha;
            let stop_at_target =
                v_sq < REL_SPEED_TO_CONSIDER_REACH_AND_STOP * REL_SPEED_TO_CONSIDER_REACH_AND_STOP;

            let t_ramp = q[3];
            let tr = 1.0 / t_ramp;
            let tr2 = 1.0 / (2.0 * t_ramp);

            let mut r = Vector4::zeros();
            if t >= t_ramp {
                r[0] = 0.5 * t_ramp * (vxi + vxf) + (t - t_ramp) * vxf - x;
                r[1] = 0.5 * t_ramp * (vyi + vyf) + (t - t_ramp) * vyf - y;
            } else {
                r[0] = vxi * t + t * t * tr2 * (vxf - vxi) - x;
                r[1] = vyi * t + t * t * tr2 * (vyf - vyi) - y;
            }
            r[2] = vxf * vxf + vyf * vyf - v_sq;
            r[3] = if stop_at_target { t_ramp - t } else { 0.0 };

            let mut j = Matrix4::zeros();
            if t >= t_ramp {
                j[(0, 0)] = vxf;
                j[(0, 1)] = t - 0.5 * t_ramp;
                j[(1, 0)] = vyf;
                j[(1, 2)] = t - 0.5 * t_ramp;
                if stop_at_target {
                    j[(0, 3)] = 0.5 * (vxi - vxf);
                    j[(1, 3)] = 0.5 * (vyi - vyf);
                } else {
                    // pin T_ramp to the prescribed maximum
                    q[3] = t_ramp_max;
                    j[(3, 3)] = 1.0;
                }
            } else {
                j[(0, 0)] = vxi + t * tr * (vxf - vxi);
                j[(0, 1)] = tr2 * t * t;
                j[(1, 0)] = vyi + t * tr * (vyf - vyi);
                j[(1, 2)] = tr2 * t * t;
                if stop_at_target {
                    j[(0, 3)] = -t * t * tr2 * tr * (vxf - vxi);
                    j[(1, 3)] = -t * t * tr2 * tr * (vyf - vyi);
                } else {
                    q[3] = t_ramp_max;
                    j[(3, 3)] = 1.0;
                }
            }
            if stop_at_target {
                // impose t = T_ramp
                j[(3, 0)] = -1.0;
                j[(3, 3)] = 1.0;
            }
            j[(2, 1)] = 2.0 * vxf;
            j[(2, 2)] = 2.0 * vyf;

            let j_inv = j.try_inverse()?;
            q -= j_inv * r;

            sol_found = r.norm() < err_threshold;
        }

        if !sol_found || q[0] < 0.0 || !q[0].is_finite() {
            return None;
        }

        let alpha = q[2].atan2(q[1]);
        let k = self.alpha2index(alpha);
        let solved_step = (q[0] / PATH_TIME_STEP) as usize;
        let dist = self.path_dist_params(solved_step, q[3], vxi, vyi, q[1], q[2]);

        Some(WsTpMapping { k, d_norm: dist / self.cfg.ref_distance, exact: true })
    }

    fn is_into_domain(&self, ctx: &PtgContext, x: f64, y: f64) -> bool {
        self.inverse_map(ctx, x, y).is_some()
    }

    fn update_tp_obstacle(
        &self,
        ctx: &PtgContext,
        ox: f64,
        oy: f64,
        k: usize,
        tp_obstacle_k: &mut f64,
    ) {
        let radius = self.shape.radius;
        let dir = self.index2alpha(k);
        let p = self.params_for_dir(ctx, dir);
        let tr2 = 1.0 / (2.0 * p.t_ramp);
        let tr_half = p.t_ramp * 0.5;
        let t_ramp_thres099 = p.t_ramp * 0.99;
        let t_ramp_thres101 = p.t_ramp * 1.01;

        // It is tempting to try t > T_ramp first because its equations are
        // simpler, but valid collisions can exist on both sides of T_ramp;
        // the only safe order is increasing t.
        let k2 = (p.vxf - p.vxi) * tr2;
        let k4 = (p.vyf - p.vyi) * tr2;

        // in-ramp collision: a t^4 + b t^3 + c t^2 + d t + e = 0
        let a = k2 * k2 + k4 * k4;
        let b = 2.0 * (k2 * p.vxi + k4 * p.vyi);
        let c = -(2.0 * k2 * ox + 2.0 * k4 * oy - p.vxi * p.vxi - p.vyi * p.vyi);
        let d = -(2.0 * ox * p.vxi + 2.0 * oy * p.vyi);
        let e = -radius * radius + ox * ox + oy * oy;

        let roots = if a.abs() > EPS {
            solve_poly4(b / a, c / a, d / a, e / a)
        } else if b.abs() > EPS {
            // k2 = k4 = 0: straight path, cubic
            solve_poly3(c / b, d / b, e / b)
        } else {
            // a = b = 0: quadratic c t^2 + d t + e = 0
            let discr = d * d - 4.0 * c * e;
            if discr >= 0.0 {
                let sq = discr.sqrt();
                vec![(-d + sq) / (2.0 * c), (-d - sq) / (2.0 * c)]
            } else {
                Vec::new()
            }
        };

        let mut sol_t = -1.0_f64;
        for root in roots {
            if root.is_finite() && root >= 0.0 && root <= t_ramp_thres101 {
                if sol_t < 0.0 || root < sol_t {
                    sol_t = root;
                }
            }
        }

        if sol_t < 0.0 || sol_t > t_ramp_thres101 {
            // post-ramp: constant velocity, quadratic in t
            sol_t = -1.0;

            let c1 = tr_half * (p.vxi - p.vxf) - ox;
            let c2 = tr_half * (p.vyi - p.vyf) - oy;

            let xa = p.vf * p.vf;
            let xb = 2.0 * (c1 * p.vxf + c2 * p.vyf);
            let xc = c1 * c1 + c2 * c2 - radius * radius;

            let discr = xb * xb - 4.0 * xa * xc;
            if discr >= 0.0 {
                let sq = discr.sqrt();
                let sol_t0 = (-xb + sq) / (2.0 * xa);
                let sol_t1 = (-xb - sq) / (2.0 * xa);

                // keep the shortest collision time at or beyond the ramp end
                if sol_t0 < p.t_ramp && sol_t1 < p.t_ramp {
                    sol_t = -1.0;
                } else if sol_t0 < p.t_ramp && sol_t1 >= t_ramp_thres099 {
                    sol_t = sol_t1;
                } else if sol_t1 < p.t_ramp && sol_t0 >= t_ramp_thres099 {
                    sol_t = sol_t0;
                } else if sol_t1 >= t_ramp_thres099 && sol_t0 >= t_ramp_thres099 {
                    sol_t = sol_t0.min(sol_t1);
                }
            }
        }

        if sol_t < 0.0 {
            return;
        }

        let dist = if sol_t < p.t_ramp {
            trans_distance_below_t_ramp(k2, k4, p.vxi, p.vyi, sol_t)
        } else {
            (sol_t - p.t_ramp) * self.cfg.v_max
                + trans_distance_below_t_ramp(k2, k4, p.vxi, p.vyi, p.t_ramp)
        };

        tp_obstacle_postprocess(&self.shape, ox, oy, dist, tp_obstacle_k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptg_straight_unit() -> HolonomicBlendPtg {
        HolonomicBlendPtg::new(HolonomicBlendConfig {
            v_max: 1.0,
            t_ramp_max: 1.0,
            robot_radius: 0.3,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_params_and_exprs() {
        assert!(HolonomicBlendPtg::new(HolonomicBlendConfig {
            v_max: -1.0,
            ..Default::default()
        })
        .is_err());
        assert!(HolonomicBlendPtg::new(HolonomicBlendConfig {
            expr_v: "V_MAX *".to_string(),
            ..Default::default()
        })
        .is_err());
        assert!(HolonomicBlendPtg::new(HolonomicBlendConfig {
            expr_w: "NOT_A_SYMBOL".to_string(),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_straight_from_rest_distance_profile() {
        // vxi = vyi = 0, dir = 0, V = 1, T_ramp = 1:
        // a = 4 k2^2 = 1, b = c = 0 so D(t) = sqrt(a) t^2 / 2
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let d_half = ptg.path_dist(&ctx, k, 50); // t = 0.5
        assert!((d_half - 0.125).abs() < 1e-4);

        let d_ramp = ptg.path_dist(&ctx, k, 100); // t = T_ramp
        assert!((d_ramp - 0.5).abs() < 1e-4);

        // past the ramp the distance grows linearly at V_max
        let d_post = ptg.path_dist(&ctx, k, 200); // t = 2
        assert!((d_post - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_path_step_for_dist_from_rest() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        // within the ramp: t = sqrt(2) a^(-1/4) sqrt(d) = 0.5 for d = 0.125
        assert_eq!(ptg.path_step_for_dist(&ctx, k, 0.125), Some(50));
        // beyond the ramp: t = T_ramp + (d - 0.5) / V
        assert_eq!(ptg.path_step_for_dist(&ctx, k, 1.5), Some(200));
    }

    #[test]
    fn test_path_step_for_dist_moving_start() {
        // non-degenerate case exercises the Newton branch
        let ptg = ptg_straight_unit();
        let ctx = PtgContext {
            cur_vel_local: Twist2D::new(0.4, 0.2, 0.0),
            ..Default::default()
        };
        let k = ptg.alpha2index(0.0);

        let target = 0.2;
        let step = ptg.path_step_for_dist(&ctx, k, target).unwrap();
        let d = ptg.path_dist(&ctx, k, step);
        assert!((d - target).abs() < 5e-3, "distance {} at step {}", d, step);
    }

    #[test]
    fn test_path_pose_straight_heading_stays_zero() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let pose = ptg.path_pose(&ctx, k, 50);
        assert!((pose.x - 0.125).abs() < 1e-9);
        assert!(pose.y.abs() < 1e-9);
        assert!(pose.phi.abs() < 1e-9);

        let tw = ptg.path_twist(&ctx, k, 50);
        assert!((tw.vx - 0.5).abs() < 1e-9);
        assert!(tw.vy.abs() < 1e-9);
    }

    #[test]
    fn test_heading_aligns_to_direction() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.8);
        let dir = ptg.index2alpha(k);

        // late enough along the path the heading has converged to dir
        let pose = ptg.path_pose(&ctx, k, 400);
        assert!((pose.phi - dir).abs() < 1e-9);
        let tw = ptg.path_twist(&ctx, k, 400);
        assert!(tw.omega.abs() < 1e-9);
    }

    #[test]
    fn test_inverse_map_rejects_origin() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        assert!(ptg.inverse_map(&ctx, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_inverse_map_round_trip_from_rest() {
        // target on a grid direction: the direction snap is exact and only
        // step quantization remains
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();

        let k0 = ptg.alpha2index(0.5);
        let dir = ptg.index2alpha(k0);
        let (x, y) = (2.0 * dir.cos(), 2.0 * dir.sin());

        let sol = ptg.inverse_map(&ctx, x, y).unwrap();
        assert!(sol.exact);
        assert_eq!(sol.k, k0);

        let d = sol.d_norm * ptg.ref_distance();
        let step = ptg.path_step_for_dist(&ctx, sol.k, d).unwrap();
        let pose = ptg.path_pose(&ctx, sol.k, step);
        assert!((pose.x - x).abs() < 2e-2, "x {} vs {}", pose.x, x);
        assert!((pose.y - y).abs() < 2e-2, "y {} vs {}", pose.y, y);
    }

    #[test]
    fn test_inverse_map_round_trip_moving_start() {
        // a fine direction grid keeps the snap error below the tolerance
        let ptg = HolonomicBlendPtg::new(HolonomicBlendConfig {
            v_max: 1.0,
            t_ramp_max: 1.0,
            alpha_count: 361,
            ..Default::default()
        })
        .unwrap();
        let ctx = PtgContext {
            cur_vel_local: Twist2D::new(0.3, 0.1, 0.0),
            ..Default::default()
        };

        let (x, y) = (1.5, 0.5);
        let sol = ptg.inverse_map(&ctx, x, y).unwrap();
        let d = sol.d_norm * ptg.ref_distance();
        assert!(d > 0.0 && d < ptg.ref_distance());

        let step = ptg.path_step_for_dist(&ctx, sol.k, d).unwrap();
        let pose = ptg.path_pose(&ctx, sol.k, step);
        assert!((pose.x - x).abs() < 5e-2, "x {} vs {}", pose.x, x);
        assert!((pose.y - y).abs() < 5e-2, "y {} vs {}", pose.y, y);
    }

    #[test]
    fn test_is_into_domain() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        assert!(ptg.is_into_domain(&ctx, 1.0, 0.5));
        assert!(!ptg.is_into_domain(&ctx, 0.0, 0.0));
    }

    #[test]
    fn test_tp_obstacle_quartic_mid_ramp() {
        // obstacle exactly one footprint radius past the mid-ramp position:
        // collision at t = T_ramp / 2, path distance t^2 / 2 = 0.125
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let mut free = 0.0;
        ptg.init_tp_obstacle(k, &mut free);
        assert_eq!(free, ptg.ref_distance());

        ptg.update_tp_obstacle(&ctx, 0.125 + 0.3, 0.0, k, &mut free);
        assert!((free - 0.125).abs() < 0.125 * 0.01, "free {}", free);
        assert!(free < ptg.ref_distance());
    }

    #[test]
    fn test_tp_obstacle_post_ramp() {
        // obstacle far ahead on the straight path: collision past T_ramp.
        // x(t) = 0.5 + (t - 1) for t >= 1; collision when x = 2.0 - 0.3,
        // i.e. t = 2.2, distance = 1.7
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let mut free = 0.0;
        ptg.init_tp_obstacle(k, &mut free);
        ptg.update_tp_obstacle(&ctx, 2.0, 0.0, k, &mut free);
        assert!((free - 1.7).abs() < 1e-3, "free {}", free);
    }

    #[test]
    fn test_tp_obstacle_behind_is_ignored() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let mut free = 0.0;
        ptg.init_tp_obstacle(k, &mut free);
        ptg.update_tp_obstacle(&ctx, -1.0, 0.0, k, &mut free);
        assert_eq!(free, ptg.ref_distance());
    }

    #[test]
    fn test_tp_obstacle_off_path_is_ignored() {
        let ptg = ptg_straight_unit();
        let ctx = PtgContext::default();
        let k = ptg.alpha2index(0.0);

        let mut free = 0.0;
        ptg.init_tp_obstacle(k, &mut free);
        ptg.update_tp_obstacle(&ctx, 1.0, 2.0, k, &mut free);
        assert_eq!(free, ptg.ref_distance());
    }
}
