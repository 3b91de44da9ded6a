//! Visualization utilities for tpspace_rrt
//!
//! Renders a motion tree, the obstacle cloud and the start/goal poses into
//! a PNG scene via gnuplot. The planner calls [`render_tree`] for its
//! periodic `debug_rrtstar_NNNNN.png` artifacts; rendering failures are
//! reported as errors and never abort planning.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, PointSize, PointSymbol};

use crate::common::{PlannerError, PlannerResult};
use crate::planner::rrt_star::PlannerInput;
use crate::planner::tree::{MotionTree, NodeId};

/// Color palette for consistent styling
pub mod colors {
    pub const OBSTACLE: &str = "#000000";
    pub const START: &str = "#00FF00";
    pub const GOAL: &str = "#0000FF";
    pub const TREE: &str = "#9999CC";
    pub const HIGHLIGHT: &str = "#FF0000";
}

/// Renders the tree into `output_path` (PNG). When an edge carries
/// interpolated sub-poses they are drawn in full; otherwise the edge is a
/// straight segment between its end states.
pub fn render_tree(
    tree: &MotionTree,
    input: &PlannerInput,
    highlight_path_to: Option<NodeId>,
    output_path: &str,
) -> PlannerResult<()> {
    let mut fg = Figure::new();
    {
        let axes = fg.axes2d();

        if !input.obstacles.is_empty() {
            axes.points(
                &input.obstacles.x_coords(),
                &input.obstacles.y_coords(),
                &[Caption("Obstacles"), Color(colors::OBSTACLE), PointSymbol('O'), PointSize(0.5)],
            );
        }

        for id in 1..tree.len() {
            let (xs, ys) = edge_polyline(tree, id);
            axes.lines(&xs, &ys, &[Color(colors::TREE)]);
        }

        if let Some(goal_id) = highlight_path_to {
            let path = tree.path_to_root(goal_id);
            let xs: Vec<f64> = path.iter().map(|&id| tree.node(id).state.pose.x).collect();
            let ys: Vec<f64> = path.iter().map(|&id| tree.node(id).state.pose.y).collect();
            axes.lines(&xs, &ys, &[Caption("Best branch"), Color(colors::HIGHLIGHT)]);
        }

        let start = &input.state_start.pose;
        let goal = &input.state_goal.pose;
        axes.points(&[start.x], &[start.y], &[Caption("Start"), Color(colors::START)]);
        axes.points(&[goal.x], &[goal.y], &[Caption("Goal"), Color(colors::GOAL)]);

        axes.set_title("TP-space RRT* tree", &[])
            .set_x_label("X [m]", &[])
            .set_y_label("Y [m]", &[])
            .set_aspect_ratio(AutoOption::Fix(1.0));
    }

    fg.save_to_png(output_path, 800, 600)
        .map_err(|e| PlannerError::VisualizationError(format!("{:?}", e)))
}

/// World-frame polyline of the edge into `id`: the interpolated sub-poses
/// composed onto the parent pose when present, else the straight segment.
fn edge_polyline(tree: &MotionTree, id: NodeId) -> (Vec<f64>, Vec<f64>) {
    let node = tree.node(id);
    if let Some(edge) = tree.edge_to(id) {
        if let Some(ip) = &edge.interpolated_path {
            let from = edge.state_from.pose;
            let xs = ip.iter().map(|p| from.compose(p).x).collect();
            let ys = ip.iter().map(|p| from.compose(p).y).collect();
            return (xs, ys);
        }
        let from = edge.state_from.pose;
        let to = node.state.pose;
        return (vec![from.x, to.x], vec![from.y, to.y]);
    }
    (vec![node.state.pose.x], vec![node.state.pose.y])
}
