//! TP-space nearest-neighbor search
//!
//! For a query pose, enumerates the (node, ptg, alpha, distance) tuples from
//! which the query is exactly reachable within a TP-distance ball. A cheap
//! workspace prune runs before the exact inverse map: every PTG
//! pseudo-distance dominates the straight-line chord, so a chord longer
//! than the radius can never qualify.

use ordered_float::OrderedFloat;

use crate::common::Pose2D;
use crate::planner::tree::{MotionTree, NodeId};
use crate::ptg::{Ptg, PtgContext, TrajectorySet};

/// One reachable (node, trajectory) pair, with its TP pseudo-distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub node_id: NodeId,
    pub ptg_index: usize,
    pub alpha_index: usize,
    /// Un-normalized TP distance, pseudo-meters
    pub dist: f64,
}

/// Conservative lower-bound prune: the query cannot be within `max_dist` of
/// the node in any PTG metric if even the workspace chord exceeds it.
fn cannot_be_nearer_than(node_pose: &Pose2D, query: &Pose2D, max_dist: f64) -> bool {
    node_pose.xy_distance(query) > max_dist
}

/// Exact TP distance from a node to the query under one PTG, `None` when
/// the family cannot realize the offset exactly.
fn tp_distance(
    ptg: &dyn Ptg,
    ctx: &PtgContext,
    node_pose: &Pose2D,
    query: &Pose2D,
) -> Option<(f64, usize)> {
    let rel = node_pose.inverse_compose(query);
    let sol = ptg.inverse_map(ctx, rel.x, rel.y)?;
    if !sol.exact {
        return None;
    }
    Some((sol.d_norm * ptg.ref_distance(), sol.k))
}

/// All candidates with TP distance in (0, radius], ordered closest-first.
pub fn find_nodes_within_ball(
    tree: &MotionTree,
    query: &Pose2D,
    radius: f64,
    ptgs: &TrajectorySet,
) -> Vec<Candidate> {
    let mut out = Vec::new();

    for (node_id, node) in tree.nodes().iter().enumerate() {
        if cannot_be_nearer_than(&node.state.pose, query, radius) {
            continue;
        }
        let ctx = PtgContext::from_state(&node.state);

        for (ptg_index, ptg) in ptgs.ptgs.iter().enumerate() {
            let Some((dist, alpha_index)) =
                tp_distance(ptg.as_ref(), &ctx, &node.state.pose, query)
            else {
                continue;
            };
            if dist <= 0.0 {
                // a duplicate of an existing node pose; not a usable motion
                log::debug!("skipping zero-distance candidate at node {}", node_id);
                continue;
            }
            if dist > radius {
                continue;
            }
            out.push(Candidate { node_id, ptg_index, alpha_index, dist });
        }
    }

    out.sort_by_key(|c| OrderedFloat(c.dist));
    out
}
