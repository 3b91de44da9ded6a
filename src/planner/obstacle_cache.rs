//! Per-node local obstacle cache
//!
//! Candidate evaluation repeatedly needs the obstacle cloud expressed in a
//! tree node's body frame, clipped to the square the PTGs can possibly map
//! into TP-space. Entries are stored by dense node id and re-derived
//! whenever the node's pose no longer matches the pose the entry was
//! computed at (rewiring keeps poses, but the compare makes staleness
//! impossible by construction).

use crate::common::{Obstacles, Point2D, Pose2D};
use crate::planner::tree::{MotionTree, NodeId};

#[derive(Debug, Clone)]
struct CacheEntry {
    node_pose: Pose2D,
    points: Vec<Point2D>,
}

#[derive(Debug, Default)]
pub struct LocalObstacleCache {
    entries: Vec<Option<CacheEntry>>,
}

/// Obstacles within the axis-aligned square of half-side `max_xy_dist`
/// around `pose`, transformed into its body frame. Points outside the
/// square cannot become TP-obstacles, so they are discarded before the
/// transform.
pub fn clip_to_local_frame(
    obstacles: &Obstacles,
    pose: &Pose2D,
    max_xy_dist: f64,
) -> Vec<Point2D> {
    let mut out = Vec::with_capacity(obstacles.len());
    for p in &obstacles.points {
        if (p.x - pose.x).abs() > max_xy_dist || (p.y - pose.y).abs() > max_xy_dist {
            continue;
        }
        out.push(pose.inverse_compose_point(*p));
    }
    out
}

impl LocalObstacleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body-frame obstacle points around `node_id`, computed on first use
    /// and whenever the node pose changed since the entry was built.
    pub fn local_obstacles(
        &mut self,
        tree: &MotionTree,
        node_id: NodeId,
        obstacles: &Obstacles,
        max_xy_dist: f64,
    ) -> &[Point2D] {
        let pose = tree.node(node_id).state.pose;
        if self.entries.len() <= node_id {
            self.entries.resize_with(node_id + 1, || None);
        }

        let entry = self.entries[node_id].get_or_insert_with(|| CacheEntry {
            node_pose: pose,
            points: clip_to_local_frame(obstacles, &pose, max_xy_dist),
        });
        if entry.node_pose != pose {
            entry.node_pose = pose;
            entry.points = clip_to_local_frame(obstacles, &pose, max_xy_dist);
        }
        &entry.points
    }
}
