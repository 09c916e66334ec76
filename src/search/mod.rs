//! Generic best-first search.
//!
//! [`AStar`] runs over anything implementing [`SearchSpace`]: the tile grid
//! through [`AreaGraph`] (optionally bounded to a cluster range) and the
//! hierarchical graph through [`crate::graph::AbstractGraph`].

mod astar;
mod pool;

#[cfg(test)]
mod tests;

pub use astar::AStar;
pub use pool::{Lease, NodePool, SearchRecord};

use std::fmt::Debug;

use crate::area::{Area, NodeId};
use crate::config::CostModel;
use crate::math::{FixedNum, Location};

/// Capabilities a graph must offer to be searched.
///
/// Nodes are small copyable handles. `index_of` must map every node to a
/// distinct index below `index_bound`; the search keeps its bookkeeping in
/// arenas addressed by that index.
pub trait SearchSpace {
    type Node: Copy + Eq + Debug;

    fn index_bound(&self) -> usize;

    fn index_of(&self, node: Self::Node) -> usize;

    /// Append the nodes reachable from `node` in one move.
    fn neighbors(&self, node: Self::Node, out: &mut Vec<Self::Node>);

    /// Cost of moving from `from` to its neighbour `to`.
    fn cost(&self, from: Self::Node, to: Self::Node) -> FixedNum;

    /// Estimated remaining cost from `from` to `to`.
    fn estimate(&self, from: Self::Node, to: Self::Node) -> FixedNum;

    /// Obstacles must never be produced by `neighbors`.
    fn is_obstacle(&self, _node: Self::Node) -> bool {
        false
    }
}

/// Result of a search: nodes from just after the start up to and including the
/// end, and the cost recorded for the end node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path<N> {
    pub nodes: Vec<N>,
    pub cost: FixedNum,
}

impl<N: Copy> Path<N> {
    /// Zero-length path, returned when start equals end.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            cost: FixedNum::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn last(&self) -> Option<N> {
        self.nodes.last().copied()
    }

    /// The same route walked from its end back to `start`, which must be
    /// the node this path was searched from.
    pub fn reversed(&self, start: N) -> Self {
        let mut nodes: Vec<N> = self.nodes.iter().rev().skip(1).copied().collect();
        if !self.nodes.is_empty() {
            nodes.push(start);
        }
        Self { nodes, cost: self.cost }
    }
}

/// Tile-level search space over an [`Area`] with a [`CostModel`].
///
/// Searching a range confines the search to that range.
#[derive(Clone, Copy)]
pub struct AreaGraph<'a> {
    area: &'a Area,
    costs: &'a CostModel,
}

impl<'a> AreaGraph<'a> {
    pub fn new(area: &'a Area, costs: &'a CostModel) -> Self {
        Self { area, costs }
    }

    /// Summed step costs of walking `path` from `start`.
    pub fn path_cost(&self, start: NodeId, path: &[NodeId]) -> FixedNum {
        let mut previous = start;
        let mut total = FixedNum::ZERO;
        for &node in path {
            total += self.cost(previous, node);
            previous = node;
        }
        total
    }

    /// Ids come from the world this area was cut from; anything else is a
    /// caller bug.
    fn location(&self, node: NodeId) -> Location {
        let location = self.area.location_of(node);
        debug_assert!(location.is_some(), "{:?} is not a node of this world", node);
        location.unwrap_or_default()
    }
}

impl SearchSpace for AreaGraph<'_> {
    type Node = NodeId;

    fn index_bound(&self) -> usize {
        self.area.id_bound()
    }

    fn index_of(&self, node: NodeId) -> usize {
        node.index()
    }

    fn neighbors(&self, node: NodeId, out: &mut Vec<NodeId>) {
        out.extend(self.area.neighbors(node));
    }

    fn cost(&self, from: NodeId, to: NodeId) -> FixedNum {
        self.costs.step_cost(self.location(from), self.location(to))
    }

    fn estimate(&self, from: NodeId, to: NodeId) -> FixedNum {
        self.costs.estimate(self.location(from), self.location(to))
    }

    fn is_obstacle(&self, node: NodeId) -> bool {
        self.area.node(node).is_some_and(|n| n.is_obstacle())
    }
}
