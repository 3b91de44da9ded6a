//! Motion-primitive tree
//!
//! Nodes hold kinematic states with their cost-to-come; each non-root node
//! has exactly one incoming edge describing the PTG segment that produced
//! it, keyed by the child node id. Ids are dense indices, assigned in
//! insertion order, so a parent always has a smaller id than its children.

use crate::common::{KinState2D, Pose2D};

/// Dense node identifier
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub state: KinState2D,
    /// Cost-to-come from the root
    pub cost: f64,
    pub parent: Option<NodeId>,
}

/// A PTG trajectory segment connecting a parent node to a child node
#[derive(Debug, Clone)]
pub struct MoveEdge {
    pub parent: NodeId,
    /// Index of the PTG within the planner's trajectory set
    pub ptg_index: usize,
    /// Trajectory (direction) index within the PTG
    pub alpha_index: usize,
    /// Un-normalized trajectory distance, in pseudo-meters
    pub ptg_dist: f64,
    /// Speed scale requested at the target, in (0, 1]
    pub speed_scale: f64,
    pub state_from: KinState2D,
    pub state_to: KinState2D,
    pub cost: f64,
    /// Optional parent-frame sub-poses for visualization
    pub interpolated_path: Option<Vec<Pose2D>>,
}

/// Rooted tree of motion primitives
#[derive(Debug, Clone, Default)]
pub struct MotionTree {
    nodes: Vec<TreeNode>,
    /// Edge from `nodes[i].parent` into node i; `None` for the root
    edges: Vec<Option<MoveEdge>>,
    children: Vec<Vec<NodeId>>,
}

impl MotionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// Edge from the parent into `id`; `None` for the root.
    pub fn edge_to(&self, id: NodeId) -> Option<&MoveEdge> {
        self.edges[id].as_ref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    pub const ROOT_ID: NodeId = 0;

    /// Inserts the root node. The tree must be empty.
    pub fn insert_root_node(&mut self, state: KinState2D) -> NodeId {
        assert!(self.nodes.is_empty(), "root must be the first node");
        self.nodes.push(TreeNode { state, cost: 0.0, parent: None });
        self.edges.push(None);
        self.children.push(Vec::new());
        Self::ROOT_ID
    }

    /// Appends a child of `parent` reached through `edge`, returning its id.
    /// The child's cost-to-come is the parent's plus the edge cost.
    pub fn insert_node_and_edge(
        &mut self,
        parent: NodeId,
        state: KinState2D,
        edge: MoveEdge,
    ) -> NodeId {
        let id = self.nodes.len();
        let cost = self.nodes[parent].cost + edge.cost;
        self.nodes.push(TreeNode { state, cost, parent: Some(parent) });
        self.edges.push(Some(edge));
        self.children.push(Vec::new());
        self.children[parent].push(id);
        id
    }

    /// Reassigns the parent of `child` (a non-root node) to `edge.parent`,
    /// replacing its incoming edge, its cost-to-come and its stored state
    /// with the edge's terminal state. Descendant costs are not touched;
    /// see [`MotionTree::propagate_cost_to_descendants`].
    pub fn rewire_edge(&mut self, child: NodeId, edge: MoveEdge) {
        let old_parent = match self.nodes[child].parent {
            Some(p) => p,
            None => return, // the root cannot be rewired
        };
        self.children[old_parent].retain(|&c| c != child);
        let new_parent = edge.parent;
        self.children[new_parent].push(child);
        self.nodes[child].parent = Some(new_parent);
        self.nodes[child].cost = self.nodes[new_parent].cost + edge.cost;
        self.nodes[child].state = edge.state_to;
        self.edges[child] = Some(edge);
    }

    /// Re-derives cost-to-come for every descendant of `from` after its own
    /// cost changed, through a work queue over the children lists.
    pub fn propagate_cost_to_descendants(&mut self, from: NodeId) {
        let mut queue = vec![from];
        while let Some(p) = queue.pop() {
            let parent_cost = self.nodes[p].cost;
            for i in 0..self.children[p].len() {
                let c = self.children[p][i];
                if let Some(edge) = &self.edges[c] {
                    self.nodes[c].cost = parent_cost + edge.cost;
                }
                queue.push(c);
            }
        }
    }

    /// Node ids from the root down to `id`, inclusive.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(p) = self.nodes[cur].parent {
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{KinState2D, Pose2D};

    fn state_at(x: f64, y: f64) -> KinState2D {
        KinState2D::at_rest(Pose2D::new(x, y, 0.0))
    }

    fn edge(parent: NodeId, to: KinState2D, cost: f64) -> MoveEdge {
        MoveEdge {
            parent,
            ptg_index: 0,
            alpha_index: 0,
            ptg_dist: cost,
            speed_scale: 1.0,
            state_from: state_at(0.0, 0.0),
            state_to: to,
            cost,
            interpolated_path: None,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut tree = MotionTree::new();
        let root = tree.insert_root_node(state_at(0.0, 0.0));
        assert_eq!(root, MotionTree::ROOT_ID);
        assert_eq!(tree.node(root).cost, 0.0);
        assert!(tree.node(root).parent.is_none());
        assert!(tree.edge_to(root).is_none());

        let a = tree.insert_node_and_edge(root, state_at(1.0, 0.0), edge(root, state_at(1.0, 0.0), 1.0));
        let b = tree.insert_node_and_edge(a, state_at(2.0, 0.0), edge(a, state_at(2.0, 0.0), 2.0));

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.node(b).parent, Some(a));
        assert_eq!(tree.node(b).cost, 3.0);
        assert_eq!(tree.children(root), &[a]);
        assert_eq!(tree.children(a), &[b]);
        assert_eq!(tree.path_to_root(b), vec![root, a, b]);
    }

    #[test]
    fn test_rewire_updates_parent_and_costs() {
        let mut tree = MotionTree::new();
        let root = tree.insert_root_node(state_at(0.0, 0.0));
        // deliberately expensive first route to a
        let a = tree.insert_node_and_edge(root, state_at(2.0, 0.0), edge(root, state_at(2.0, 0.0), 5.0));
        let c = tree.insert_node_and_edge(a, state_at(3.0, 0.0), edge(a, state_at(3.0, 0.0), 1.0));
        let b = tree.insert_node_and_edge(root, state_at(1.0, 0.0), edge(root, state_at(1.0, 0.0), 1.0));
        assert_eq!(tree.node(a).cost, 5.0);
        assert_eq!(tree.node(c).cost, 6.0);

        tree.rewire_edge(a, edge(b, state_at(2.0, 0.0), 1.0));
        tree.propagate_cost_to_descendants(a);

        assert_eq!(tree.node(a).parent, Some(b));
        assert_eq!(tree.node(a).cost, 2.0);
        assert_eq!(tree.node(c).cost, 3.0);
        assert_eq!(tree.children(b), &[a]);
        assert!(tree.children(root).iter().all(|&x| x != a));
        assert_eq!(tree.path_to_root(c), vec![root, b, a, c]);
    }
}
