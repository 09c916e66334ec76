use thiserror::Error;

use crate::area::NodeId;
use crate::math::Location;

/// Hard failures of graph construction or search.
///
/// These indicate a programming error in the graph or its use, never a missing
/// route: "no path" is reported as `Ok(None)` by every query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathfindingError {
    #[error("cluster size must be at least 3, got {0}")]
    ClusterSizeTooSmall(usize),

    #[error("config value {0} is not a usable cost")]
    InvalidConfig(&'static str),

    #[error("obstacle node {0} reached the search neighbour step")]
    ObstacleInSearch(usize),

    #[error("search node {0} was accessed after being released to the pool")]
    DisposedSearchNode(usize),

    #[error("search node {0} is already leased for this query")]
    NodeAlreadyLeased(usize),

    #[error("abstract edge children {from} and {to} do not belong to a single cluster")]
    ChildrenSpanClusters { from: Location, to: Location },

    #[error("location {0} is outside the area")]
    OutOfBounds(Location),

    #[error("node {0:?} does not belong to this area")]
    UnknownNode(NodeId),

    #[error("no bridge between consecutive tiles {from} and {to}")]
    UnbridgedGap { from: Location, to: Location },

    #[error("abstract edge {from} -> {to} has no cached cluster path")]
    MissingSegment { from: Location, to: Location },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("config value {field} = {value} is not a usable cost")]
    InvalidValue { field: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to access map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode map: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("unsupported map version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },

    #[error("map of size {size} exceeds the addressable node count")]
    TooLarge { size: Location },

    #[error("map of size {size} needs {expected} cells but has {found}")]
    CellCount { size: Location, expected: usize, found: usize },
}
