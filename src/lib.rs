//! Kinodynamic TP-space RRT* motion planner for wheeled mobile robots
//!
//! Given a start and a goal kinematic state, a static obstacle point cloud,
//! a workspace bounding box and a family of Parameterized Trajectory
//! Generators (PTGs), the planner grows a tree of feasible, collision-free
//! motion primitives toward the goal, minimizing an additive path cost.
//!
//! - [`ptg`] defines the PTG capability interface and two concrete
//!   families: constant-curvature arcs for differential-drive robots and
//!   ramped-velocity holonomic paths.
//! - [`planner`] holds the motion tree, the TP-space neighbor search, the
//!   per-node obstacle cache and the RRT* search loop.
//! - [`common`] and [`math`] supply the shared geometry, error and numeric
//!   building blocks.

pub mod common;
pub mod math;
pub mod planner;
pub mod ptg;
pub mod utils;
