use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use crate::area::{Area, NodeId};
use crate::config::CostModel;
use crate::math::{FixedNum, Location};
use crate::search::SearchSpace;

/// Index of a node in the [`AbstractGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbstractId(pub u32);

impl AbstractId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbstractKind {
    /// Built with the graph; represents merged cluster entrances.
    Permanent,
    /// Query endpoint, removed when its [`TemporaryScope`] ends.
    Temporary,
}

/// How one abstract node reaches a neighbour: the cost of the cached cluster
/// path and the pair of concrete tiles it runs between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
    pub cost: FixedNum,
    /// Child of the node holding this relation.
    pub from: NodeId,
    /// Child of the neighbour.
    pub to: NodeId,
}

impl Relation {
    /// The same edge seen from the other end.
    pub fn reversed(self) -> Self {
        Self {
            cost: self.cost,
            from: self.to,
            to: self.from,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AbstractNode {
    pub kind: AbstractKind,
    /// Concrete tiles merged into this node.
    pub children: BTreeSet<NodeId>,
    /// Location of the most recently added child; drives the heuristic.
    pub location: Location,
    pub neighbors: BTreeMap<AbstractId, Relation>,
}

impl AbstractNode {
    fn new(kind: AbstractKind, tile: NodeId, location: Location) -> Self {
        Self {
            kind,
            children: BTreeSet::from([tile]),
            location,
            neighbors: BTreeMap::new(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        self.kind == AbstractKind::Temporary
    }
}

/// Coarse graph searched between clusters.
///
/// # Structure
///
/// - **Nodes:** each permanent node owns a set of adjacent entrance tiles. Two
///   entrances of neighbouring clusters that touch end up in the same node,
///   which is what carries a route across a cluster boundary.
/// - **Edges:** only ever run inside one cluster. The [`Relation`] stores the
///   concrete tile pair so the edge can be expanded back into tiles.
/// - **Temporaries:** query endpoints are attached through a
///   [`TemporaryScope`] and vanish with it.
#[derive(Clone, Debug)]
pub struct AbstractGraph {
    nodes: Vec<AbstractNode>,
    /// Permanent owner of every merged tile.
    representative: FxHashMap<NodeId, AbstractId>,
    costs: CostModel,
}

impl AbstractGraph {
    pub fn new(costs: CostModel) -> Self {
        Self {
            nodes: Vec::new(),
            representative: FxHashMap::default(),
            costs,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: AbstractId) -> Option<&AbstractNode> {
        self.nodes.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (AbstractId, &AbstractNode)> + '_ {
        self.nodes.iter().enumerate().map(|(index, node)| (AbstractId(index as u32), node))
    }

    /// Undirected edge count.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.neighbors.len()).sum::<usize>() / 2
    }

    /// Permanent node that already holds `tile` as a child.
    pub fn representative(&self, tile: NodeId) -> Option<AbstractId> {
        self.representative.get(&tile).copied()
    }

    pub fn relation(&self, from: AbstractId, to: AbstractId) -> Option<Relation> {
        self.node(from).and_then(|node| node.neighbors.get(&to)).copied()
    }

    /// Merge `tile` into the permanent node that already owns it or owns a
    /// tile it neighbours. The lowest such id wins. `None` if no node takes it.
    pub fn merge(&mut self, area: &Area, tile: NodeId) -> Option<AbstractId> {
        if let Some(owner) = self.representative(tile) {
            return Some(owner);
        }

        let location = area.location_of(tile)?;
        let owner = Location::iter_box(Location::splat(3))
            .filter_map(|offset| area.at(location + offset - Location::splat(1)))
            .filter(|candidate| area.are_neighbors(tile, candidate.id))
            .filter_map(|candidate| self.representative(candidate.id))
            .min()?;

        self.adopt(owner, tile, location);
        Some(owner)
    }

    /// New permanent node owning just `tile`.
    pub fn add_permanent(&mut self, tile: NodeId, location: Location) -> AbstractId {
        let id = self.push(AbstractNode::new(AbstractKind::Permanent, tile, location));
        self.representative.insert(tile, id);
        id
    }

    /// Connect `a` and `b`, keeping the cheaper relation if one exists.
    /// `relation` is seen from `a`.
    pub fn link(&mut self, a: AbstractId, b: AbstractId, relation: Relation) {
        if a == b {
            return;
        }
        Self::set_neighbor(&mut self.nodes[a.index()], b, relation);
        Self::set_neighbor(&mut self.nodes[b.index()], a, relation.reversed());
    }

    /// Start attaching query endpoints. They are detached when the scope drops.
    pub fn temporary_scope(&mut self) -> TemporaryScope<'_> {
        let first = self.nodes.len();
        TemporaryScope { graph: self, first }
    }

    fn adopt(&mut self, owner: AbstractId, tile: NodeId, location: Location) {
        let node = &mut self.nodes[owner.index()];
        node.children.insert(tile);
        node.location = location;
        self.representative.insert(tile, owner);
    }

    fn push(&mut self, node: AbstractNode) -> AbstractId {
        let id = AbstractId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn set_neighbor(node: &mut AbstractNode, neighbor: AbstractId, relation: Relation) {
        match node.neighbors.get(&neighbor) {
            Some(current) if current.cost <= relation.cost => {}
            _ => {
                node.neighbors.insert(neighbor, relation);
            }
        }
    }

    /// Remove every node from `first` on, along with the edges pointing at them.
    fn truncate(&mut self, first: usize) {
        if first >= self.nodes.len() {
            return;
        }
        let removed: Vec<(AbstractId, Vec<AbstractId>)> = self.nodes[first..]
            .iter()
            .enumerate()
            .map(|(offset, node)| (AbstractId((first + offset) as u32), node.neighbors.keys().copied().collect()))
            .collect();

        for (id, neighbors) in removed {
            for neighbor in neighbors {
                if let Some(node) = self.nodes.get_mut(neighbor.index()) {
                    node.neighbors.remove(&id);
                }
            }
        }
        self.nodes.truncate(first);
    }
}

impl SearchSpace for AbstractGraph {
    type Node = AbstractId;

    fn index_bound(&self) -> usize {
        self.nodes.len()
    }

    fn index_of(&self, node: AbstractId) -> usize {
        node.index()
    }

    fn neighbors(&self, node: AbstractId, out: &mut Vec<AbstractId>) {
        if let Some(node) = self.node(node) {
            out.extend(node.neighbors.keys().copied());
        }
    }

    fn cost(&self, from: AbstractId, to: AbstractId) -> FixedNum {
        self.relation(from, to).map_or(FixedNum::ZERO, |relation| relation.cost)
    }

    fn estimate(&self, from: AbstractId, to: AbstractId) -> FixedNum {
        match (self.node(from), self.node(to)) {
            (Some(from), Some(to)) => self.costs.estimate(from.location, to.location),
            _ => FixedNum::ZERO,
        }
    }
}

/// Query-scoped view of an [`AbstractGraph`] that may hold temporary nodes.
///
/// Temporary nodes and every edge into them are removed on drop, so an early
/// return or a `?` cannot leave them wired into the permanent graph.
pub struct TemporaryScope<'g> {
    graph: &'g mut AbstractGraph,
    first: usize,
}

impl TemporaryScope<'_> {
    /// New temporary node standing for the query endpoint `tile`.
    pub fn add_temporary(&mut self, tile: NodeId, location: Location) -> AbstractId {
        self.graph.push(AbstractNode::new(AbstractKind::Temporary, tile, location))
    }

    /// Connect a temporary node. Permanent-to-permanent edges are rejected,
    /// since they would outlive the scope.
    pub fn link(&mut self, a: AbstractId, b: AbstractId, relation: Relation) {
        if a.index() < self.first && b.index() < self.first {
            return;
        }
        self.graph.link(a, b, relation);
    }
}

impl Deref for TemporaryScope<'_> {
    type Target = AbstractGraph;

    fn deref(&self) -> &AbstractGraph {
        self.graph
    }
}

impl Drop for TemporaryScope<'_> {
    fn drop(&mut self) {
        self.graph.truncate(self.first);
    }
}
