//! Hierarchical pathfinding over layered 3-D tile worlds.
//!
//! The world is an [`Area`] of tiles. [`Pathfinding`] cuts it into clusters,
//! links their entrances into an abstract graph, and answers route queries by
//! searching that graph and expanding the result back into tiles.
//!
//! ```
//! use voxel_hpa::{AStar, Area, Location, Pathfinding, PathfindingConfig, Terrain};
//!
//! let world = Area::new(Location::new(12, 12, 1), |_| Terrain::OPEN);
//! let mut pathfinding = Pathfinding::new(world, AStar::default(), PathfindingConfig::with_cluster_size(4))?;
//! let end = Location::new(11, 11, 0);
//! let path = pathfinding.resolve(Location::new(0, 0, 0), end)?.expect("open world");
//! assert_eq!(path.locations(pathfinding.area()).last(), Some(&end));
//! # Ok::<(), voxel_hpa::PathfindingError>(())
//! ```

pub mod area;
pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod map;
pub mod math;
pub mod pathfinding;
pub mod search;

pub use area::{Area, Node, NodeId, Terrain};
pub use cluster::{Cluster, Face};
pub use config::{CostModel, PathfindingConfig};
pub use error::{ConfigError, MapError, PathfindingError};
pub use graph::{AbstractGraph, AbstractId};
pub use map::TerrainMap;
pub use math::{FixedNum, Location};
pub use pathfinding::{GraphStats, HierarchicalPath, Pathfinding};
pub use search::{AStar, AreaGraph, Path, SearchSpace};
