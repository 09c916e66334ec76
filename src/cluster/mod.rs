use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::area::{Area, NodeId};
use crate::config::CostModel;
use crate::error::PathfindingError;
use crate::math::{FixedNum, Location};
use crate::search::{AStar, AreaGraph, Path};


/// Grid coordinates of a cluster in the coordinator's partition.
pub type ClusterId = (usize, usize, usize);

/// One of the six faces of a cluster box.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
    Up = 4,
    Down = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::North, Face::South, Face::East, Face::West, Face::Up, Face::Down];

    /// Step from a tile on this face to the tile just outside it.
    pub fn offset(self) -> Location {
        match self {
            Face::North => Location::new(0, -1, 0),
            Face::South => Location::new(0, 1, 0),
            Face::East => Location::new(1, 0, 0),
            Face::West => Location::new(-1, 0, 0),
            Face::Up => Location::new(0, 0, 1),
            Face::Down => Location::new(0, 0, -1),
        }
    }

    /// Top or bottom face.
    pub fn is_vertical(self) -> bool {
        matches!(self, Face::Up | Face::Down)
    }

    /// Local coordinates of the tiles lying on this face of a box of `size`.
    pub fn tiles(self, size: Location) -> impl Iterator<Item = Location> {
        Location::iter_box(size).filter(move |local| match self {
            Face::North => local.y == 0,
            Face::South => local.y == size.y - 1,
            Face::East => local.x == size.x - 1,
            Face::West => local.x == 0,
            Face::Up => local.z == size.z - 1,
            Face::Down => local.z == 0,
        })
    }
}

/// A box of the world with its entrances and a cache of the paths between
/// them.
///
/// # Caching
///
/// - **Entrances** are computed on first use and kept.
/// - **Paths** are stored per start node, in both directions at once: a path
///   found from `a` to `b` is also served, reversed, from `b` to `a`.
/// - **Failures** are remembered too, so a pair without an intra-cluster route
///   is searched at most once.
///
/// Terrain changes are not tracked; the cluster is rebuilt wholesale.
#[derive(Clone, Debug)]
pub struct Cluster {
    id: ClusterId,
    world: Area,
    area: Area,
    costs: CostModel,
    entrances: Option<Vec<NodeId>>,
    paths: FxHashMap<NodeId, FxHashMap<NodeId, Path<NodeId>>>,
    unreachable: FxHashSet<(NodeId, NodeId)>,
}

impl Cluster {
    /// `area` must be a range of `world`.
    pub fn new(id: ClusterId, world: &Area, area: Area, costs: CostModel) -> Self {
        Self {
            id,
            world: world.clone(),
            area,
            costs,
            entrances: None,
            paths: FxHashMap::default(),
            unreachable: FxHashSet::default(),
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn contains(&self, tile: NodeId) -> bool {
        self.area.contains(tile)
    }

    /// Entrance tiles in id order. Computed on first call.
    pub fn entrances(&mut self) -> &[NodeId] {
        if self.entrances.is_none() {
            let entrances = self.compute_entrances();
            debug!("[CLUSTER] {:?}: {} entrances", self.id, entrances.len());
            self.entrances = Some(entrances);
        }
        self.entrances.as_deref().unwrap_or_default()
    }

    /// Cached paths from `node` to every entrance it can reach inside this
    /// cluster, keyed by entrance. Missing pairs are searched now and stored
    /// in both directions.
    pub fn connections(
        &mut self,
        astar: &mut AStar<NodeId>,
        node: NodeId,
    ) -> Result<&FxHashMap<NodeId, Path<NodeId>>, PathfindingError> {
        let entrances = self.entrances().to_vec();
        for entrance in entrances {
            if entrance != node {
                self.cache_pair(astar, node, entrance)?;
            }
        }
        Ok(self.paths.entry(node).or_default())
    }

    /// Cost from the query endpoint `node` to every entrance it can reach
    /// inside this cluster, in entrance order.
    ///
    /// Cached paths are reused but nothing new is stored, so arbitrary query
    /// endpoints do not grow the caches.
    pub fn endpoint_connections(
        &mut self,
        astar: &mut AStar<NodeId>,
        node: NodeId,
    ) -> Result<Vec<(NodeId, FixedNum)>, PathfindingError> {
        let entrances = self.entrances().to_vec();
        let mut connections = Vec::with_capacity(entrances.len());
        for entrance in entrances {
            if entrance == node {
                continue;
            }
            if let Some(path) = self.resolve(astar, node, entrance)? {
                connections.push((entrance, path.cost));
            }
        }
        Ok(connections)
    }

    /// Path from `start` to `end` inside this cluster. Served from the cache
    /// when either direction is known; otherwise searched without caching.
    pub fn resolve(
        &self,
        astar: &mut AStar<NodeId>,
        start: NodeId,
        end: NodeId,
    ) -> Result<Option<Path<NodeId>>, PathfindingError> {
        if !self.contains(start) || !self.contains(end) {
            return Ok(None);
        }
        if let Some(path) = self.cached(start, end) {
            return Ok(Some(path));
        }
        if self.unreachable.contains(&ordered(start, end)) {
            return Ok(None);
        }
        astar.get_path(&AreaGraph::new(&self.area, &self.costs), start, end)
    }

    /// Number of cached one-way paths. Only grows through [`Cluster::connections`];
    /// query endpoints go through [`Cluster::endpoint_connections`].
    pub fn cached_path_count(&self) -> usize {
        self.paths.values().map(FxHashMap::len).sum()
    }

    fn cached(&self, start: NodeId, end: NodeId) -> Option<Path<NodeId>> {
        if let Some(path) = self.paths.get(&start).and_then(|paths| paths.get(&end)) {
            return Some(path.clone());
        }
        self.paths
            .get(&end)
            .and_then(|paths| paths.get(&start))
            .map(|path| path.reversed(end))
    }

    fn cache_pair(&mut self, astar: &mut AStar<NodeId>, start: NodeId, end: NodeId) -> Result<(), PathfindingError> {
        let known = self.paths.get(&start).is_some_and(|paths| paths.contains_key(&end));
        if known || self.unreachable.contains(&ordered(start, end)) {
            return Ok(());
        }

        match self.resolve(astar, start, end)? {
            Some(path) => {
                let back = path.reversed(start);
                self.paths.entry(end).or_default().insert(start, back);
                self.paths.entry(start).or_default().insert(end, path);
            }
            None => {
                self.unreachable.insert(ordered(start, end));
            }
        }
        Ok(())
    }

    fn compute_entrances(&self) -> Vec<NodeId> {
        let mut entrances: Vec<NodeId> = Face::ALL.iter().flat_map(|&face| self.face_entrances(face)).collect();
        entrances.sort_unstable();
        entrances.dedup();
        entrances
    }

    /// Open tiles of `face` facing an open tile outside, reduced so a long
    /// opening keeps only its end tiles.
    ///
    /// On the top and bottom faces a tile only counts when a move actually
    /// crosses the face: a ramp, or a step down onto one. Those crossings are
    /// sparse and are kept unreduced.
    fn face_entrances(&self, face: Face) -> Vec<NodeId> {
        let candidates: Vec<NodeId> = face
            .tiles(self.area.size())
            .filter_map(|local| self.area.get(local))
            .filter(|tile| !tile.is_obstacle() && !tile.is_empty())
            .filter(|tile| {
                if face.is_vertical() {
                    return self.crosses(tile.id, face);
                }
                self.world
                    .neighbor_in(tile.id, face.offset())
                    .is_some_and(|outside| !outside.is_obstacle())
            })
            .map(|tile| tile.id)
            .collect();

        if face.is_vertical() {
            return candidates;
        }

        candidates
            .iter()
            .copied()
            .filter(|&tile| {
                candidates
                    .iter()
                    .filter(|&&other| self.world.are_neighbors(tile, other))
                    .count()
                    <= 1
            })
            .collect()
    }

    /// Whether `tile` has a neighbour on the far side of the vertical `face`.
    fn crosses(&self, tile: NodeId, face: Face) -> bool {
        let Some(from) = self.world.location_of(tile) else {
            return false;
        };
        self.world.neighbors(tile).iter().any(|&neighbor| {
            self.world
                .location_of(neighbor)
                .is_some_and(|to| to.z - from.z == face.offset().z)
        })
    }
}

/// Direction-independent key for a tile pair.
fn ordered(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
