//! Graph construction phases.
//!
//! The graph is built in three passes over the cluster partition:
//! - Cluster creation (cutting the world into ranges)
//! - Entrance merging (one permanent abstract node per group of touching entrances)
//! - Entrance linking (abstract edges from cached intra-cluster paths)

use tracing::info;

use crate::area::{Area, NodeId};
use crate::cluster::Cluster;
use crate::config::CostModel;
use crate::error::PathfindingError;
use crate::graph::{AbstractGraph, Relation};
use crate::math::Location;
use crate::search::AStar;
use voxel_hpa_macros::profile;

/// Cut `world` into clusters of `extent`, ordered x fastest then y then z.
/// Clusters on the far edges are clamped to the world.
#[profile(1)]
pub(super) fn create_clusters(world: &Area, extent: Location, grid: Location, costs: &CostModel) -> Vec<Cluster> {
    let clusters: Vec<Cluster> = Location::iter_box(grid)
        .map(|cell| {
            let offset = Location::new(cell.x * extent.x, cell.y * extent.y, cell.z * extent.z);
            let range = world.get_range(offset, Some(extent));
            let id = (cell.x as usize, cell.y as usize, cell.z as usize);
            Cluster::new(id, world, range, *costs)
        })
        .collect();

    info!(
        "[GRAPH BUILD] Created {} clusters ({} x {} x {}, {} tiles each)",
        clusters.len(),
        grid.x,
        grid.y,
        grid.z,
        extent.volume()
    );
    clusters
}

/// Give every entrance a permanent abstract node, joining the node of a
/// touching entrance when there is one. Returns the number of entrances.
#[profile(1)]
pub(super) fn merge_entrances(graph: &mut AbstractGraph, world: &Area, clusters: &mut [Cluster]) -> usize {
    let mut entrances = 0;
    for cluster in clusters.iter_mut() {
        for &entrance in cluster.entrances() {
            entrances += 1;
            if graph.merge(world, entrance).is_some() {
                continue;
            }
            if let Some(location) = world.location_of(entrance) {
                graph.add_permanent(entrance, location);
            }
        }
    }

    info!(
        "[GRAPH BUILD] Merged {} entrances into {} abstract nodes",
        entrances,
        graph.len()
    );
    entrances
}

/// Wire abstract nodes whose entrances are connected inside a cluster. The
/// edge cost is the cost of the cached cluster path.
#[profile(1)]
pub(super) fn link_entrances(
    graph: &mut AbstractGraph,
    clusters: &mut [Cluster],
    astar: &mut AStar<NodeId>,
) -> Result<usize, PathfindingError> {
    let mut cached_paths = 0;
    for cluster in clusters.iter_mut() {
        let entrances = cluster.entrances().to_vec();
        for &entrance in &entrances {
            let Some(owner) = graph.representative(entrance) else {
                continue;
            };
            let mut connections: Vec<(NodeId, Relation)> = cluster
                .connections(astar, entrance)?
                .iter()
                .map(|(&other, path)| {
                    (
                        other,
                        Relation {
                            cost: path.cost,
                            from: entrance,
                            to: other,
                        },
                    )
                })
                .collect();
            connections.sort_unstable_by_key(|(other, _)| *other);

            for (other, relation) in connections {
                match graph.representative(other) {
                    Some(neighbor) if neighbor != owner => graph.link(owner, neighbor, relation),
                    _ => {}
                }
            }
        }
        cached_paths += cluster.cached_path_count();
    }

    info!(
        "[GRAPH BUILD] Linked {} abstract edges from {} cached cluster paths",
        graph.edge_count(),
        cached_paths
    );
    Ok(cached_paths)
}
