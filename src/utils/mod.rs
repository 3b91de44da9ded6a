//! Utility modules for tpspace_rrt

pub mod visualization;

pub use visualization::render_tree;
