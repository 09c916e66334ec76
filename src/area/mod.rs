//! Dense 3-D tile storage and neighbour topology.
//!
//! An [`Area`] is a window onto a shared node table. The world area covers the
//! whole table; ranges taken with [`Area::get_range`] cover a sub-box of it and
//! hand out the very same [`Node`]s (same [`NodeId`]), so identity comparisons
//! stay valid between a cluster and the world it was cut from.
//!
//! Node ids are dense (`x + sx * (y + sy * z)` over the world size), which lets
//! search bookkeeping live in flat arenas indexed by id.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

use crate::error::PathfindingError;
use crate::math::Location;


/// Upper bound of [`Area::neighbors`]: 8 lateral plus 8 on the layer above.
pub const MAX_NEIGHBORS: usize = 16;

pub type NeighborList = SmallVec<[NodeId; MAX_NEIGHBORS]>;

/// The eight lateral offsets on a layer.
const LATERAL_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Dense identity of a node in its world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What the host map says about one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Terrain {
    /// Never entered, never a path endpoint.
    pub obstacle: bool,
    /// Open space with no floor; movement passes through it vertically.
    pub empty: bool,
    /// Ramp: allows climbing to the layer above when that cell is empty.
    pub can_travel_up: bool,
}

impl Terrain {
    pub const OPEN: Self = Self {
        obstacle: false,
        empty: false,
        can_travel_up: false,
    };
    pub const OBSTACLE: Self = Self {
        obstacle: true,
        empty: false,
        can_travel_up: false,
    };
    pub const EMPTY: Self = Self {
        obstacle: false,
        empty: true,
        can_travel_up: false,
    };
    pub const RAMP: Self = Self {
        obstacle: false,
        empty: false,
        can_travel_up: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    /// World location, identical in every range the node appears in.
    pub location: Location,
    pub terrain: Terrain,
}

impl Node {
    #[inline]
    pub fn is_obstacle(&self) -> bool {
        self.terrain.obstacle
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terrain.empty
    }

    #[inline]
    pub fn can_travel_up(&self) -> bool {
        self.terrain.can_travel_up
    }
}

#[derive(Clone, Debug)]
struct NodeTable {
    size: Location,
    nodes: Vec<Node>,
}

impl NodeTable {
    fn index_of(&self, location: Location) -> Option<usize> {
        if !location.within(self.size) {
            return None;
        }
        let (sx, sy) = (self.size.x as usize, self.size.y as usize);
        Some(location.x as usize + sx * (location.y as usize + sy * location.z as usize))
    }
}

/// A bounded box of nodes. Cloning is cheap and shares the node table.
#[derive(Clone, Debug)]
pub struct Area {
    table: Arc<NodeTable>,
    /// World location of local `(0, 0, 0)`.
    origin: Location,
    size: Location,
}

impl Area {
    /// Build a world area, invoking `creator` once per cell in id order.
    pub fn new(size: Location, mut creator: impl FnMut(Location) -> Terrain) -> Self {
        let size = size.max(Location::ZERO);
        let nodes = Location::iter_box(size)
            .enumerate()
            .map(|(index, location)| Node {
                id: NodeId(index as u32),
                location,
                terrain: creator(location),
            })
            .collect();

        Self {
            table: Arc::new(NodeTable { size, nodes }),
            origin: Location::ZERO,
            size,
        }
    }

    /// Build a world area from cells laid out in id order. `None` if the cell
    /// count does not match `size`.
    pub fn from_terrain(size: Location, cells: &[Terrain]) -> Option<Self> {
        if size.max(Location::ZERO).volume() != cells.len() {
            return None;
        }
        let mut cells = cells.iter();
        Some(Self::new(size, |_| cells.next().copied().unwrap_or_default()))
    }

    pub fn size(&self) -> Location {
        self.size
    }

    /// World location of this area's local origin.
    pub fn origin(&self) -> Location {
        self.origin
    }

    /// Size of the whole world this area was cut from.
    pub fn world_size(&self) -> Location {
        self.table.size
    }

    pub fn len(&self) -> usize {
        self.size.volume()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ids in the world; every [`NodeId`] is below this.
    pub fn id_bound(&self) -> usize {
        self.table.nodes.len()
    }

    /// Bounds-checked lookup by local coordinates.
    pub fn get(&self, local: Location) -> Option<&Node> {
        if !local.within(self.size) {
            return None;
        }
        self.at(self.origin + local)
    }

    /// Lookup by world location, restricted to this area.
    pub fn at(&self, location: Location) -> Option<&Node> {
        if !self.contains_location(location) {
            return None;
        }
        self.table.index_of(location).map(|index| &self.table.nodes[index])
    }

    /// Lookup by id, restricted to this area.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.table.nodes.get(id.index()).filter(|node| self.contains_location(node.location))
    }

    /// Like [`Area::node`], as a hard failure.
    pub fn try_node(&self, id: NodeId) -> Result<&Node, PathfindingError> {
        self.node(id).ok_or(PathfindingError::UnknownNode(id))
    }

    /// World location of `id`, whether or not it lies inside this area.
    pub fn location_of(&self, id: NodeId) -> Option<Location> {
        self.table.nodes.get(id.index()).map(|node| node.location)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_location(&self, location: Location) -> bool {
        (location - self.origin).within(self.size)
    }

    /// Iterate the nodes of this area in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        Location::iter_box(self.size).filter_map(move |local| self.get(local))
    }

    /// Extract the sub-box starting at local `offset`. Without `size` the range
    /// reaches the far edge; an oversized request is clamped, never rejected.
    pub fn get_range(&self, offset: Location, size: Option<Location>) -> Area {
        let offset = offset.max(Location::ZERO).min(self.size);
        let available = self.size - offset;
        let size = size.map_or(available, |requested| requested.max(Location::ZERO).min(available));

        Area {
            table: Arc::clone(&self.table),
            origin: self.origin + offset,
            size,
        }
    }

    /// Replace the terrain at local `location`.
    ///
    /// Ranges taken earlier are snapshots and keep seeing the previous terrain.
    pub fn set_terrain(&mut self, local: Location, terrain: Terrain) -> Result<(), PathfindingError> {
        if !local.within(self.size) {
            return Err(PathfindingError::OutOfBounds(local));
        }
        let location = self.origin + local;
        let table = Arc::make_mut(&mut self.table);
        let index = table.index_of(location).ok_or(PathfindingError::OutOfBounds(local))?;
        table.nodes[index].terrain = terrain;
        Ok(())
    }

    /// The node one step from `id` along `offset`, if inside this area.
    pub fn neighbor_in(&self, id: NodeId, offset: Location) -> Option<&Node> {
        let node = self.node(id)?;
        self.at(node.location + offset)
    }

    /// Whether a single move connects `a` and `b`.
    ///
    /// Same layer: 8-connected. One layer apart: the lower node must be a ramp
    /// and the cell directly above it must be empty.
    pub fn are_neighbors(&self, a: NodeId, b: NodeId) -> bool {
        let (Some(a), Some(b)) = (self.node(a), self.node(b)) else {
            return false;
        };
        if a.id == b.id || a.is_obstacle() || b.is_obstacle() {
            return false;
        }
        if a.location.chebyshev_lateral(b.location) > 1 {
            return false;
        }

        match b.location.z - a.location.z {
            0 => true,
            1 => self.can_climb_from(a),
            -1 => self.can_climb_from(b),
            _ => false,
        }
    }

    fn can_climb_from(&self, lower: &Node) -> bool {
        lower.can_travel_up() && self.at(lower.location.above()).is_some_and(Node::is_empty)
    }

    /// Nodes reachable from `id` in one move, restricted to this area.
    ///
    /// An empty lateral neighbour is replaced by the ramp below it, if any.
    /// A ramp under an empty cell also reaches the solid lateral neighbours of
    /// that cell on the layer above.
    pub fn neighbors(&self, id: NodeId) -> NeighborList {
        let mut out = NeighborList::new();
        let Some(node) = self.node(id) else {
            return out;
        };
        if node.is_obstacle() {
            return out;
        }

        for neighbor in self.layer_neighbors(node.location) {
            if !neighbor.is_empty() {
                out.push(neighbor.id);
                continue;
            }
            if let Some(below) = self.at(neighbor.location.below()) {
                if below.can_travel_up() && !below.is_obstacle() {
                    out.push(below.id);
                }
            }
        }

        if self.can_climb_from(node) {
            let above = node.location.above();
            out.extend(
                self.layer_neighbors(above)
                    .filter(|neighbor| !neighbor.is_empty())
                    .map(|neighbor| neighbor.id),
            );
        }

        out
    }

    /// Non-obstacle nodes around `location` on its own layer.
    fn layer_neighbors(&self, location: Location) -> impl Iterator<Item = &Node> + '_ {
        LATERAL_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            self.at(location + Location::new(dx, dy, 0))
                .filter(|neighbor| !neighbor.is_obstacle())
        })
    }
}
