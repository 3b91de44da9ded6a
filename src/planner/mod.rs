//! TP-space RRT* planner over motion-primitive trees

pub mod neighbors;
pub mod obstacle_cache;
pub mod rrt_star;
pub mod tree;

pub use neighbors::{find_nodes_within_ball, Candidate};
pub use obstacle_cache::LocalObstacleCache;
pub use rrt_star::{PlannerInput, PlannerOutput, RrtStarParams, RrtStarPlanner};
pub use tree::{MotionTree, MoveEdge, NodeId, TreeNode};
