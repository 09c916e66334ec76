use tracing::{debug, warn};

use crate::area::{Area, NodeId};
use crate::cluster::Cluster;
use crate::config::CostModel;
use crate::error::PathfindingError;
use crate::graph::{AbstractGraph, AbstractId};
use crate::search::{AStar, AreaGraph};

use super::ClusterGrid;

/// Tile path under construction, starting just after the query start.
pub(super) struct Expansion<'a> {
    world: &'a Area,
    costs: &'a CostModel,
    grid: &'a ClusterGrid,
    clusters: &'a [Cluster],
    tiles: Vec<NodeId>,
    last: NodeId,
    bridges: usize,
}

impl<'a> Expansion<'a> {
    pub(super) fn new(
        world: &'a Area,
        costs: &'a CostModel,
        grid: &'a ClusterGrid,
        clusters: &'a [Cluster],
        start: NodeId,
    ) -> Self {
        Self {
            world,
            costs,
            grid,
            clusters,
            tiles: Vec::new(),
            last: start,
            bridges: 0,
        }
    }

    /// Walk the abstract route `source -> route...`, replacing every edge
    /// with the cluster path between its two children.
    ///
    /// An edge is realised by the cluster owning its `from` child. Consecutive
    /// edges that meet at different children of one node are joined.
    pub(super) fn follow(
        &mut self,
        astar: &mut AStar<NodeId>,
        graph: &AbstractGraph,
        source: AbstractId,
        route: &[AbstractId],
    ) -> Result<(), PathfindingError> {
        let location = |id: AbstractId| graph.node(id).map(|node| node.location).unwrap_or_default();
        let mut previous = source;

        for &next in route {
            let relation = graph.relation(previous, next).ok_or(PathfindingError::MissingSegment {
                from: location(previous),
                to: location(next),
            })?;

            self.join(astar, relation.from)?;
            if relation.from != relation.to {
                let from = self.world.location_of(relation.from).unwrap_or_default();
                let to = self.world.location_of(relation.to).unwrap_or_default();
                let cluster = self
                    .grid
                    .index_of(from)
                    .and_then(|index| self.clusters.get(index))
                    .filter(|cluster| cluster.contains(relation.to))
                    .ok_or(PathfindingError::ChildrenSpanClusters { from, to })?;

                let segment = cluster
                    .resolve(astar, relation.from, relation.to)?
                    .ok_or(PathfindingError::MissingSegment { from, to })?;
                if let Some(end) = segment.last() {
                    self.tiles.extend(segment.nodes);
                    self.last = end;
                }
            }
            previous = next;
        }
        Ok(())
    }

    /// Continue the path to `target`: directly when adjacent, otherwise
    /// through a bridging search over the whole world.
    pub(super) fn join(&mut self, astar: &mut AStar<NodeId>, target: NodeId) -> Result<(), PathfindingError> {
        if self.last == target {
            return Ok(());
        }
        if self.world.are_neighbors(self.last, target) {
            self.tiles.push(target);
        } else {
            let graph = AreaGraph::new(self.world, self.costs);
            let Some(bridge) = astar.get_path(&graph, self.last, target)? else {
                let from = self.world.location_of(self.last).unwrap_or_default();
                let to = self.world.location_of(target).unwrap_or_default();
                warn!("[PATHFINDING] Abstract route left an unbridgeable gap {} -> {}", from, to);
                return Err(PathfindingError::UnbridgedGap { from, to });
            };
            debug!("[PATHFINDING] Bridged gap with {} tiles before {:?}", bridge.len(), target);
            self.bridges += 1;
            self.tiles.extend(bridge.nodes);
        }
        self.last = target;
        Ok(())
    }

    /// Tiles so far and the number of bridges inserted.
    pub(super) fn finish(self) -> (Vec<NodeId>, usize) {
        (self.tiles, self.bridges)
    }
}
