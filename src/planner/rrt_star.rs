//! TP-space RRT* kinodynamic planner
//!
//! Builds a tree of PTG motion primitives from a start state toward a goal
//! state:
//!
//! ```text
//! 1  X_T <- {x_0}                      # tree nodes
//! 2  E_T <- {}                         # tree edges
//! 3  for i in [1, N]:
//! 4    q_i <- SAMPLE(Q_free)
//! 5    x_best <- argmin{x in tree | tp_dist(x, q_i) < r and collision-free}
//!                 (cost[x] + cost[x, q_i])
//! 6    parent[x_i] <- x_best; cost[x_i] <- cost[x_best] + cost[x_best, x_i]
//! 7    rewire: reparent any x with tp_dist(x_i, x) < r, collision-free and
//!       cost[x_i] + cost[x_i, x] < cost[x]; propagate cost deltas
//! 8  return (X_T, E_T)
//! ```
//!
//! Sampling happens either uniformly over the workspace box or directly on
//! the TP manifold reachable from the existing nodes. All per-iteration
//! numeric failures drop the affected candidate and planning continues.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::{
    KinState2D, Obstacles, PlannerError, PlannerResult, Point2D, Pose2D,
};
use crate::math::wrap_to_pi;
use crate::planner::neighbors::{find_nodes_within_ball, Candidate};
use crate::planner::obstacle_cache::LocalObstacleCache;
use crate::planner::tree::{MotionTree, MoveEdge, NodeId};
use crate::ptg::{Ptg, PtgContext, TrajectorySet};
use crate::utils::visualization::render_tree;

/// RRT* planner configuration
#[derive(Debug, Clone)]
pub struct RrtStarParams {
    pub max_iterations: usize,
    /// Neighbor ball radius, in TP pseudo-meters
    pub initial_search_radius: f64,
    /// Probability of sampling the goal pose instead of a random free pose
    pub goal_bias: f64,
    /// Sample on the TP manifold of the existing nodes instead of uniformly
    /// over the workspace box
    pub draw_in_tps: bool,
    /// TP-distance bounds of TP-space samples [pseudo-meters]
    pub min_step_length: f64,
    pub max_step_length: f64,
    /// Number of interpolated sub-poses stored per edge (visualization only)
    pub render_path_interpolated_segments: usize,
    /// Write a debug scene file every N iterations; 0 disables
    pub save_debug_visualization_decimation: usize,
    /// PRNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Goal-reached position tolerance [m]
    pub goal_tolerance_xy: f64,
    /// Goal-reached heading tolerance [rad]
    pub goal_tolerance_phi: f64,
    /// Attempt budget of the free-pose samplers
    pub max_sampling_attempts: usize,
}

impl Default for RrtStarParams {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            initial_search_radius: 4.0,
            goal_bias: 0.05,
            draw_in_tps: false,
            min_step_length: 0.25,
            max_step_length: 2.0,
            render_path_interpolated_segments: 0,
            save_debug_visualization_decimation: 0,
            seed: None,
            goal_tolerance_xy: 0.25,
            goal_tolerance_phi: std::f64::consts::PI,
            max_sampling_attempts: 1_000_000,
        }
    }
}

impl RrtStarParams {
    fn validate(&self) -> PlannerResult<()> {
        if self.max_iterations == 0 {
            return Err(PlannerError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if self.initial_search_radius < 0.0 {
            return Err(PlannerError::InvalidParameter(
                "initial_search_radius must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.goal_bias) {
            return Err(PlannerError::InvalidParameter(format!(
                "goal_bias must be in [0, 1], got {}",
                self.goal_bias
            )));
        }
        if self.min_step_length <= 0.0 || self.max_step_length < self.min_step_length {
            return Err(PlannerError::InvalidParameter(
                "step lengths must satisfy 0 < min <= max".to_string(),
            ));
        }
        if self.goal_tolerance_xy < 0.0 || self.goal_tolerance_phi < 0.0 {
            return Err(PlannerError::InvalidParameter(
                "goal tolerances must be non-negative".to_string(),
            ));
        }
        if self.max_sampling_attempts == 0 {
            return Err(PlannerError::InvalidParameter(
                "max_sampling_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Planner problem statement
pub struct PlannerInput {
    pub state_start: KinState2D,
    pub state_goal: KinState2D,
    pub ptgs: TrajectorySet,
    pub obstacles: Obstacles,
    pub world_bbox_min: Pose2D,
    pub world_bbox_max: Pose2D,
}

/// Planner result: the problem statement, the full motion tree and the goal
/// verdict
pub struct PlannerOutput {
    pub input: PlannerInput,
    pub tree: MotionTree,
    pub success: bool,
    /// Cheapest node within goal tolerance, when one exists
    pub goal_node: Option<NodeId>,
}

fn within_bbox(p: &Pose2D, min: &Pose2D, max: &Pose2D) -> bool {
    p.x > min.x && p.y > min.y && p.phi > min.phi
        && p.x < max.x && p.y < max.y && p.phi < max.phi
}

/// TP-obstacle distance along a single direction: starts at the PTG horizon
/// and is narrowed by every local obstacle point. Returned un-normalized,
/// in pseudo-meters.
pub(crate) fn tp_obstacles_single_path(
    ptg: &dyn Ptg,
    ctx: &PtgContext,
    k: usize,
    local_obstacles: &[Point2D],
) -> f64 {
    let mut tp_obstacle_k = 0.0;
    ptg.init_tp_obstacle(k, &mut tp_obstacle_k);
    for p in local_obstacles {
        ptg.update_tp_obstacle(ctx, p.x, p.y, k, &mut tp_obstacle_k);
    }
    tp_obstacle_k
}

/// A rewire edge is accepted only when the PTG motion reproduces the pose
/// of the node being reparented within these bounds (step quantization plus
/// direction-grid snap).
const REWIRE_POSE_TOL_XY: f64 = 5e-2;
const REWIRE_POSE_TOL_PHI: f64 = 5e-2;

/// TP-space RRT* planner
pub struct RrtStarPlanner {
    pub params: RrtStarParams,
}

impl Default for RrtStarPlanner {
    fn default() -> Self {
        Self { params: RrtStarParams::default() }
    }
}

impl RrtStarPlanner {
    pub fn new(params: RrtStarParams) -> PlannerResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Runs the planner, consuming the input and returning it inside the
    /// output together with the full motion tree.
    pub fn plan(&self, input: PlannerInput) -> PlannerResult<PlannerOutput> {
        self.params.validate()?;
        self.check_preconditions(&input)?;

        let max_xy_dist = input.ptgs.max_ref_distance();

        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut tree = MotionTree::new();
        tree.insert_root_node(input.state_start);

        let mut cache = LocalObstacleCache::new();

        // may adapt with iteration; currently held constant
        let search_radius = self.params.initial_search_radius;

        for iter in 0..self.params.max_iterations {
            let qi = self.draw_random_free_pose(&mut rng, &input, &tree)?;

            let close_nodes = find_nodes_within_ball(&tree, &qi, search_radius, &input.ptgs);
            if close_nodes.is_empty() {
                continue;
            }
            log::debug!(
                "iter {}: {} candidate nodes near ({:.2}, {:.2}, {:.2})",
                iter,
                close_nodes.len(),
                qi.x,
                qi.y,
                qi.phi
            );

            // collision-check the candidates and keep the cheapest motion
            let mut best: Option<(f64, MoveEdge)> = None;
            for cand in &close_nodes {
                let Some(edge) =
                    self.evaluate_candidate(cand, &tree, &mut cache, &input, max_xy_dist)
                else {
                    continue;
                };
                let total = tree.node(cand.node_id).cost + edge.cost;
                if best.as_ref().map_or(true, |(c, _)| total < *c) {
                    best = Some((total, edge));
                }
            }
            let Some((_, best_edge)) = best else {
                log::debug!("iter {}: no valid edge found", iter);
                continue;
            };

            let parent = best_edge.parent;
            let state_to = best_edge.state_to;
            let new_id = tree.insert_node_and_edge(parent, state_to, best_edge);

            self.rewire_near_nodes(&mut tree, new_id, search_radius, &mut cache, &input, max_xy_dist);

            if self.params.save_debug_visualization_decimation > 0
                && iter % self.params.save_debug_visualization_decimation == 0
            {
                let filename = format!("debug_rrtstar_{:05}.png", iter);
                if let Err(e) = render_tree(&tree, &input, Some(new_id), &filename) {
                    log::warn!("debug visualization failed: {}", e);
                }
            }
        }

        let goal_node = self.find_goal_node(&tree, &input.state_goal.pose);
        Ok(PlannerOutput { success: goal_node.is_some(), goal_node, tree, input })
    }

    fn check_preconditions(&self, input: &PlannerInput) -> PlannerResult<()> {
        if input.ptgs.is_empty() {
            return Err(PlannerError::PrecondViolation(
                "trajectory set is empty".to_string(),
            ));
        }
        if input.ptgs.max_ref_distance() <= 0.0 {
            return Err(PlannerError::PrecondViolation(
                "PTG reference distances must be positive".to_string(),
            ));
        }
        let (min, max) = (&input.world_bbox_min, &input.world_bbox_max);
        if !(min.x < max.x && min.y < max.y && min.phi < max.phi) {
            return Err(PlannerError::PrecondViolation(
                "degenerate workspace bounding box".to_string(),
            ));
        }
        if !within_bbox(&input.state_start.pose, min, max) {
            return Err(PlannerError::PrecondViolation(
                "start state outside workspace bounding box".to_string(),
            ));
        }
        if !within_bbox(&input.state_goal.pose, min, max) {
            return Err(PlannerError::PrecondViolation(
                "goal state outside workspace bounding box".to_string(),
            ));
        }
        Ok(())
    }

    /// Edge cost of a candidate segment. Kept as its own hook so a derived
    /// cost (clearance, time, smoothness) can replace the plain distance.
    fn cost_path_segment(&self, edge: &MoveEdge) -> f64 {
        edge.ptg_dist
    }

    fn evaluate_candidate(
        &self,
        cand: &Candidate,
        tree: &MotionTree,
        cache: &mut LocalObstacleCache,
        input: &PlannerInput,
        max_xy_dist: f64,
    ) -> Option<MoveEdge> {
        let src_state = tree.node(cand.node_id).state;
        let ptg = input.ptgs.ptgs[cand.ptg_index].as_ref();
        let ctx = PtgContext::from_state(&src_state);

        let local_obs = cache.local_obstacles(tree, cand.node_id, &input.obstacles, max_xy_dist);
        let free_dist = tp_obstacles_single_path(ptg, &ctx, cand.alpha_index, local_obs);
        if cand.dist >= free_dist {
            // we would need to move farther than possible without colliding
            return None;
        }

        let step = ptg.path_step_for_dist(&ctx, cand.alpha_index, cand.dist)?;
        let rel_pose = ptg.path_pose(&ctx, cand.alpha_index, step);
        let rel_twist = ptg.path_twist(&ctx, cand.alpha_index, step);

        let state_to = KinState2D {
            pose: src_state.pose.compose(&rel_pose),
            // the twist is relative to the parent frame
            twist: rel_twist.rotated(src_state.pose.phi),
        };

        // the reconstructed pose, not the sample, becomes the node; it must
        // itself lie inside the workspace
        if !within_bbox(&state_to.pose, &input.world_bbox_min, &input.world_bbox_max) {
            return None;
        }

        let mut edge = MoveEdge {
            parent: cand.node_id,
            ptg_index: cand.ptg_index,
            alpha_index: cand.alpha_index,
            ptg_dist: cand.dist,
            speed_scale: ctx.target_rel_speed,
            state_from: src_state,
            state_to,
            cost: 0.0,
            interpolated_path: None,
        };

        let n_seg = self.params.render_path_interpolated_segments;
        if n_seg > 0 {
            let mut ip = Vec::with_capacity(n_seg + 2);
            ip.push(Pose2D::origin());
            for i in 0..n_seg {
                let i_step = ((i + 1) * step) / (n_seg + 2);
                ip.push(ptg.path_pose(&ctx, cand.alpha_index, i_step));
            }
            ip.push(rel_pose);
            edge.interpolated_path = Some(ip);
        }

        edge.cost = self.cost_path_segment(&edge);
        Some(edge)
    }

    /// RRT* rewiring: reparent any node that the freshly inserted one
    /// reaches exactly, collision-free and strictly cheaper, then push the
    /// cost change down to its descendants.
    fn rewire_near_nodes(
        &self,
        tree: &mut MotionTree,
        new_id: NodeId,
        radius: f64,
        cache: &mut LocalObstacleCache,
        input: &PlannerInput,
        max_xy_dist: f64,
    ) {
        let new_state = tree.node(new_id).state;
        let new_cost = tree.node(new_id).cost;
        let ctx = PtgContext::from_state(&new_state);

        for x_id in 0..tree.len() {
            if x_id == new_id || tree.node(x_id).parent.is_none() {
                continue;
            }
            let x_state = tree.node(x_id).state;
            let x_cost = tree.node(x_id).cost;
            let rel = new_state.pose.inverse_compose(&x_state.pose);

            // cheapest improving edge over all trajectories of all PTGs
            let mut best: Option<MoveEdge> = None;
            for (ptg_index, ptg) in input.ptgs.ptgs.iter().enumerate() {
                let Some(sol) = ptg.inverse_map(&ctx, rel.x, rel.y) else {
                    continue;
                };
                if !sol.exact {
                    continue;
                }
                let d = sol.d_norm * ptg.ref_distance();
                if d <= 0.0 || d > radius {
                    continue;
                }
                if new_cost + d >= x_cost
                    || best.as_ref().map_or(false, |b| d >= b.ptg_dist)
                {
                    continue;
                }

                let local_obs =
                    cache.local_obstacles(tree, new_id, &input.obstacles, max_xy_dist);
                let free_dist = tp_obstacles_single_path(ptg.as_ref(), &ctx, sol.k, local_obs);
                if d >= free_dist {
                    continue;
                }
                let Some(step) = ptg.path_step_for_dist(&ctx, sol.k, d) else {
                    continue;
                };

                // the motion must actually land on the node being rewired,
                // heading included, or the tree reconstruction breaks
                let rel_pose = ptg.path_pose(&ctx, sol.k, step);
                if (rel_pose.x - rel.x).abs() > REWIRE_POSE_TOL_XY
                    || (rel_pose.y - rel.y).abs() > REWIRE_POSE_TOL_XY
                    || wrap_to_pi(rel_pose.phi - rel.phi).abs() > REWIRE_POSE_TOL_PHI
                {
                    continue;
                }
                let rel_twist = ptg.path_twist(&ctx, sol.k, step);

                let mut edge = MoveEdge {
                    parent: new_id,
                    ptg_index,
                    alpha_index: sol.k,
                    ptg_dist: d,
                    speed_scale: ctx.target_rel_speed,
                    state_from: new_state,
                    state_to: KinState2D {
                        // the node keeps its pose; only its route changes
                        pose: x_state.pose,
                        twist: rel_twist.rotated(new_state.pose.phi),
                    },
                    cost: 0.0,
                    interpolated_path: None,
                };
                edge.cost = self.cost_path_segment(&edge);
                best = Some(edge);
            }

            if let Some(edge) = best {
                log::debug!(
                    "rewired node {} under {} (cost {} -> {})",
                    x_id,
                    new_id,
                    x_cost,
                    new_cost + edge.cost
                );
                tree.rewire_edge(x_id, edge);
                tree.propagate_cost_to_descendants(x_id);
            }
        }
    }

    fn draw_random_free_pose(
        &self,
        rng: &mut StdRng,
        input: &PlannerInput,
        tree: &MotionTree,
    ) -> PlannerResult<Pose2D> {
        if rng.gen_range(0.0..1.0) < self.params.goal_bias {
            return Ok(input.state_goal.pose);
        }
        if self.params.draw_in_tps {
            self.draw_random_tps(rng, input, tree)
        } else {
            self.draw_random_euclidean(rng, input)
        }
    }

    /// Whether a robot placed at `q` overlaps its closest obstacle point.
    fn pose_collides(&self, q: &Pose2D, input: &PlannerInput) -> bool {
        match input.obstacles.closest_point(q.x, q.y) {
            Some(obs) => {
                let local = q.inverse_compose_point(obs);
                input.ptgs.point_collides(local.x, local.y)
            }
            None => false,
        }
    }

    fn draw_random_euclidean(
        &self,
        rng: &mut StdRng,
        input: &PlannerInput,
    ) -> PlannerResult<Pose2D> {
        let (min, max) = (&input.world_bbox_min, &input.world_bbox_max);
        for _ in 0..self.params.max_sampling_attempts {
            let q = Pose2D::new(
                rng.gen_range(min.x..max.x),
                rng.gen_range(min.y..max.y),
                rng.gen_range(min.phi..max.phi),
            );
            if !self.pose_collides(&q, input) {
                return Ok(q);
            }
        }
        Err(PlannerError::SamplingExhausted { attempts: self.params.max_sampling_attempts })
    }

    /// Draws a source node, a PTG, a trajectory and a distance, and
    /// reconstructs the pose that motion would reach, so the sample lies on
    /// the TP manifold of the current tree by construction.
    fn draw_random_tps(
        &self,
        rng: &mut StdRng,
        input: &PlannerInput,
        tree: &MotionTree,
    ) -> PlannerResult<Pose2D> {
        for _ in 0..self.params.max_sampling_attempts {
            let node = &tree.nodes()[rng.gen_range(0..tree.len())];
            let ptg_index = rng.gen_range(0..input.ptgs.ptgs.len());
            let ptg = input.ptgs.ptgs[ptg_index].as_ref();
            let k = rng.gen_range(0..ptg.alpha_count());
            let d = rng.gen_range(self.params.min_step_length..=self.params.max_step_length);

            let ctx = PtgContext::from_state(&node.state);
            let Some(step) = ptg.path_step_for_dist(&ctx, k, d) else {
                continue;
            };
            let rel = ptg.path_pose(&ctx, k, step);
            let q = node.state.pose.compose(&rel);

            if !within_bbox(&q, &input.world_bbox_min, &input.world_bbox_max) {
                continue;
            }
            if !self.pose_collides(&q, input) {
                return Ok(q);
            }
        }
        Err(PlannerError::SamplingExhausted { attempts: self.params.max_sampling_attempts })
    }

    /// Cheapest node within the goal tolerances, if any reached it.
    fn find_goal_node(&self, tree: &MotionTree, goal: &Pose2D) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (id, node) in tree.nodes().iter().enumerate() {
            let dxy = node.state.pose.xy_distance(goal);
            let dphi = wrap_to_pi(node.state.pose.phi - goal.phi).abs();
            if dxy <= self.params.goal_tolerance_xy && dphi <= self.params.goal_tolerance_phi {
                if best.map_or(true, |(_, c)| node.cost < c) {
                    best = Some((id, node.cost));
                }
            }
        }
        best.map(|(id, _)| id)
    }
}
