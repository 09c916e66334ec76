//! Hierarchical pathfinding over a cluster partition of the world.
//!
//! # Architecture
//!
//! 1. **Clusters:** the world is cut into boxes of `cluster_size` x `cluster_size`
//!    x `cluster_depth` tiles ([`crate::cluster::Cluster`]).
//! 2. **Entrances:** every cluster finds the boundary tiles that open onto a
//!    neighbouring cluster.
//! 3. **Abstract graph:** touching entrances are merged into one abstract node;
//!    nodes are linked by the cost of the cached path inside each cluster.
//! 4. **Queries:** the endpoints are attached as temporary abstract nodes, the
//!    abstract graph is searched, and the abstract route is expanded back into
//!    tiles through the cluster caches, bridging any gaps at merged nodes.
//!
//! Construction happens once in [`Pathfinding::new`]; terrain changes require
//! building a new instance.

mod build;
mod expand;

#[cfg(test)]
mod tests;

use std::iter;
use tracing::{debug, info};

use crate::area::{Area, Node, NodeId};
use crate::cluster::Cluster;
use crate::config::{PathfindingConfig, MIN_CLUSTER_SIZE};
use crate::error::PathfindingError;
use crate::graph::{AbstractGraph, AbstractId, Relation, TemporaryScope};
use crate::math::{FixedNum, Location};
use crate::search::{AStar, AreaGraph};

use expand::Expansion;

/// Result of a hierarchical query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HierarchicalPath {
    /// `abstract_levels[0]` holds the waypoints of the coarse route, from the
    /// start location to the end location.
    pub abstract_levels: Vec<Vec<Location>>,
    /// Concrete tiles, excluding the start and including the end.
    pub tiles: Vec<NodeId>,
    /// Summed step cost of `tiles`.
    pub cost: FixedNum,
}

impl HierarchicalPath {
    fn empty() -> Self {
        Self {
            abstract_levels: vec![Vec::new()],
            tiles: Vec::new(),
            cost: FixedNum::ZERO,
        }
    }

    fn direct(start: Location, end: Location, tiles: Vec<NodeId>, cost: FixedNum) -> Self {
        Self {
            abstract_levels: vec![vec![start, end]],
            tiles,
            cost,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// World locations of the tiles.
    pub fn locations(&self, area: &Area) -> Vec<Location> {
        self.tiles.iter().filter_map(|&tile| area.location_of(tile)).collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub clusters: usize,
    pub entrances: usize,
    pub abstract_nodes: usize,
    pub edges: usize,
    pub cached_paths: usize,
}

/// Maps world locations to cluster indices.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClusterGrid {
    origin: Location,
    extent: Location,
    counts: Location,
}

impl ClusterGrid {
    fn new(origin: Location, size: Location, extent: Location) -> Self {
        let count = |size: i32, extent: i32| if size <= 0 { 0 } else { (size + extent - 1) / extent };
        Self {
            origin,
            extent,
            counts: Location::new(count(size.x, extent.x), count(size.y, extent.y), count(size.z, extent.z)),
        }
    }

    /// Index into the cluster list, which is ordered x fastest, then y, then z.
    pub(crate) fn index_of(&self, location: Location) -> Option<usize> {
        let local = location - self.origin;
        if local.x < 0 || local.y < 0 || local.z < 0 {
            return None;
        }
        let cell = Location::new(local.x / self.extent.x, local.y / self.extent.y, local.z / self.extent.z);
        if !cell.within(self.counts) {
            return None;
        }
        let (cx, cy) = (self.counts.x as usize, self.counts.y as usize);
        Some(cell.x as usize + cx * (cell.y as usize + cy * cell.z as usize))
    }
}

/// The hierarchical pathfinder: a cluster partition, its abstract graph and
/// the search instances used to query them.
///
/// Queries take `&mut self`: they extend the cluster caches and attach
/// temporary nodes to the shared graph. Give each thread its own instance.
pub struct Pathfinding {
    world: Area,
    config: PathfindingConfig,
    grid: ClusterGrid,
    clusters: Vec<Cluster>,
    graph: AbstractGraph,
    tile_search: AStar<NodeId>,
    abstract_search: AStar<AbstractId>,
    entrances: usize,
}

impl Pathfinding {
    /// Partition `world` and build the abstract graph. `astar` serves every
    /// tile-level search; the abstract search uses the configured closer
    /// modifier.
    pub fn new(world: Area, mut astar: AStar<NodeId>, config: PathfindingConfig) -> Result<Self, PathfindingError> {
        if config.cluster_size < MIN_CLUSTER_SIZE {
            return Err(PathfindingError::ClusterSizeTooSmall(config.cluster_size));
        }
        if let Some((field, _)) = config.invalid_field() {
            return Err(PathfindingError::InvalidConfig(field));
        }

        let size = world.size();
        let side = i32::try_from(config.cluster_size).unwrap_or(i32::MAX);
        let depth = config
            .cluster_depth
            .map_or(size.z, |depth| i32::try_from(depth).unwrap_or(i32::MAX))
            .max(1);
        let extent = Location::new(side, side, depth);
        let grid = ClusterGrid::new(world.origin(), size, extent);

        info!("=== GRAPH BUILD START ===");
        info!("  World: {} ({} tiles)", size, world.len());
        info!("  Cluster extent: {}", extent);

        let mut clusters = build::create_clusters(&world, extent, grid.counts, &config.costs);
        let mut graph = AbstractGraph::new(config.costs);
        let entrances = build::merge_entrances(&mut graph, &world, &mut clusters);
        build::link_entrances(&mut graph, &mut clusters, &mut astar)?;

        info!("=== GRAPH BUILD COMPLETE ===");

        Ok(Self {
            abstract_search: AStar::new(config.closer_modifier()),
            world,
            config,
            grid,
            clusters,
            graph,
            tile_search: astar,
            entrances,
        })
    }

    /// Route from `start` to `end`, both world locations.
    ///
    /// `Ok(None)` when either endpoint is an obstacle or no route exists.
    /// Errors are reserved for locations outside the world and broken graph
    /// invariants.
    pub fn resolve(&mut self, start: Location, end: Location) -> Result<Option<HierarchicalPath>, PathfindingError> {
        let start_node = *self.world.at(start).ok_or(PathfindingError::OutOfBounds(start))?;
        let end_node = *self.world.at(end).ok_or(PathfindingError::OutOfBounds(end))?;

        if start_node.is_obstacle() || end_node.is_obstacle() {
            debug!("[PATHFINDING] {} -> {}: obstacle endpoint", start, end);
            return Ok(None);
        }
        if start_node.id == end_node.id {
            return Ok(Some(HierarchicalPath::empty()));
        }
        if self.world.are_neighbors(start_node.id, end_node.id) {
            let cost = self.config.costs.step_cost(start, end);
            return Ok(Some(HierarchicalPath::direct(start, end, vec![end_node.id], cost)));
        }

        let start_cluster = self.grid.index_of(start).ok_or(PathfindingError::OutOfBounds(start))?;
        let end_cluster = self.grid.index_of(end).ok_or(PathfindingError::OutOfBounds(end))?;

        if start_cluster == end_cluster {
            let cluster = self
                .clusters
                .get(start_cluster)
                .ok_or(PathfindingError::OutOfBounds(start))?;
            if let Some(path) = cluster.resolve(&mut self.tile_search, start_node.id, end_node.id)? {
                debug!("[PATHFINDING] {} -> {}: {} tiles inside cluster {:?}", start, end, path.len(), cluster.id());
                return Ok(Some(HierarchicalPath::direct(start, end, path.nodes, path.cost)));
            }
            debug!("[PATHFINDING] {} -> {}: no route inside cluster, searching abstract graph", start, end);
        }

        self.resolve_abstract(&start_node, &end_node, start_cluster, end_cluster)
    }

    fn resolve_abstract(
        &mut self,
        start: &Node,
        end: &Node,
        start_cluster: usize,
        end_cluster: usize,
    ) -> Result<Option<HierarchicalPath>, PathfindingError> {
        let Self {
            world,
            config,
            grid,
            clusters,
            graph,
            tile_search,
            abstract_search,
            ..
        } = self;

        let mut scope = graph.temporary_scope();
        let source = attach(&mut scope, cluster_mut(clusters, start_cluster, start)?, tile_search, start)?;
        let target = attach(&mut scope, cluster_mut(clusters, end_cluster, end)?, tile_search, end)?;

        let Some(route) = abstract_search.get_path(&*scope, source, target)? else {
            debug!("[PATHFINDING] {} -> {}: no abstract route", start.location, end.location);
            return Ok(None);
        };

        let waypoints: Vec<Location> = iter::once(source)
            .chain(route.nodes.iter().copied())
            .filter_map(|id| scope.node(id))
            .map(|node| node.location)
            .collect();

        let mut expansion = Expansion::new(world, &config.costs, grid, clusters, start.id);
        expansion.follow(tile_search, &scope, source, &route.nodes)?;
        expansion.join(tile_search, end.id)?;
        let (tiles, bridges) = expansion.finish();
        drop(scope);

        let cost = AreaGraph::new(world, &config.costs).path_cost(start.id, &tiles);
        debug!(
            "[PATHFINDING] {} -> {}: {} tiles via {} abstract nodes ({} bridges)",
            start.location,
            end.location,
            tiles.len(),
            waypoints.len(),
            bridges
        );

        Ok(Some(HierarchicalPath {
            abstract_levels: vec![waypoints],
            tiles,
            cost,
        }))
    }

    pub fn area(&self) -> &Area {
        &self.world
    }

    pub fn config(&self) -> &PathfindingConfig {
        &self.config
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Cluster containing the world location `location`.
    pub fn cluster_of(&self, location: Location) -> Option<&Cluster> {
        self.grid.index_of(location).and_then(|index| self.clusters.get(index))
    }

    pub fn graph(&self) -> &AbstractGraph {
        &self.graph
    }

    pub fn abstract_node_count(&self) -> usize {
        self.graph.len()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            clusters: self.clusters.len(),
            entrances: self.entrances,
            abstract_nodes: self.graph.len(),
            edges: self.graph.edge_count(),
            cached_paths: self.clusters.iter().map(Cluster::cached_path_count).sum(),
        }
    }
}

fn cluster_mut<'c>(clusters: &'c mut [Cluster], index: usize, node: &Node) -> Result<&'c mut Cluster, PathfindingError> {
    clusters
        .get_mut(index)
        .ok_or(PathfindingError::OutOfBounds(node.location))
}

/// Add a temporary abstract node for the query endpoint `tile`, linked to the
/// owner of every entrance it reaches inside `cluster`. A tile that is itself
/// a merged entrance also gets a zero-cost edge into its owner.
fn attach(
    scope: &mut TemporaryScope<'_>,
    cluster: &mut Cluster,
    astar: &mut AStar<NodeId>,
    tile: &Node,
) -> Result<AbstractId, PathfindingError> {
    let temporary = scope.add_temporary(tile.id, tile.location);

    for (entrance, cost) in cluster.endpoint_connections(astar, tile.id)? {
        if let Some(owner) = scope.representative(entrance) {
            let relation = Relation {
                cost,
                from: tile.id,
                to: entrance,
            };
            scope.link(temporary, owner, relation);
        }
    }

    if let Some(owner) = scope.representative(tile.id) {
        let relation = Relation {
            cost: FixedNum::ZERO,
            from: tile.id,
            to: tile.id,
        };
        scope.link(temporary, owner, relation);
    }

    Ok(temporary)
}
