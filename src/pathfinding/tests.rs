/// Tests for hierarchical query correctness
///
/// These cover the scenarios the coordinator must get right: shortcuts inside
/// one cluster, routes across cluster boundaries and layers, and the absence
/// of residue from temporary nodes after a query.
use super::*;
use crate::area::Terrain;

/// Open world of `size` with the listed tiles blocked.
fn world_with_walls(size: Location, walls: &[Location]) -> Area {
    Area::new(size, |location| {
        if walls.contains(&location) {
            Terrain::OBSTACLE
        } else {
            Terrain::OPEN
        }
    })
}

fn pathfinding(world: Area, cluster_size: usize) -> Pathfinding {
    Pathfinding::new(world, AStar::default(), PathfindingConfig::with_cluster_size(cluster_size))
        .expect("graph should build")
}

/// Every step of `path` must be a single legal move starting from `start`.
fn assert_connected(pathfinding: &Pathfinding, start: Location, path: &HierarchicalPath) {
    let area = pathfinding.area();
    let mut previous = area.at(start).unwrap().id;
    for &tile in &path.tiles {
        assert!(
            area.are_neighbors(previous, tile),
            "gap between {} and {}",
            area.location_of(previous).unwrap(),
            area.location_of(tile).unwrap()
        );
        previous = tile;
    }
}

#[test]
fn test_cluster_size_below_minimum_is_rejected() {
    let world = world_with_walls(Location::new(5, 5, 1), &[]);
    let result = Pathfinding::new(world, AStar::default(), PathfindingConfig::with_cluster_size(2));

    assert!(matches!(result, Err(PathfindingError::ClusterSizeTooSmall(2))));
}

#[test]
fn test_straight_line() {
    let mut sut = pathfinding(world_with_walls(Location::new(3, 2, 1), &[]), 3);

    let path = sut.resolve(Location::new(0, 0, 0), Location::new(2, 0, 0)).unwrap().unwrap();

    assert_eq!(path.locations(sut.area()), vec![Location::new(1, 0, 0), Location::new(2, 0, 0)]);
    assert_eq!(path.cost, FixedNum::from_num(2));
}

#[test]
fn test_reroutes_around_obstacle() {
    let world = world_with_walls(Location::new(3, 2, 1), &[Location::new(1, 0, 0)]);
    let mut sut = pathfinding(world, 3);

    let path = sut.resolve(Location::new(0, 0, 0), Location::new(2, 0, 0)).unwrap().unwrap();

    assert_eq!(path.locations(sut.area()), vec![Location::new(1, 1, 0), Location::new(2, 0, 0)]);
}

#[test]
fn test_enclosed_destination_has_no_path() {
    let ring: Vec<Location> = Location::iter_box(Location::new(3, 3, 1))
        .map(|l| l + Location::new(1, 1, 0))
        .filter(|&l| l != Location::new(2, 2, 0))
        .collect();
    let mut sut = pathfinding(world_with_walls(Location::new(5, 5, 1), &ring), 3);

    let path = sut.resolve(Location::new(0, 0, 0), Location::new(2, 2, 0)).unwrap();

    assert!(path.is_none());
}

#[test]
fn test_adjacent_tiles_give_single_step() {
    let mut sut = pathfinding(world_with_walls(Location::new(5, 5, 1), &[]), 3);

    for (start, end) in [
        (Location::new(0, 0, 0), Location::new(1, 1, 0)),
        (Location::new(1, 1, 0), Location::new(1, 2, 0)),
        (Location::new(2, 2, 0), Location::new(3, 3, 0)),
    ] {
        let path = sut.resolve(start, end).unwrap().unwrap();
        assert_eq!(path.locations(sut.area()), vec![end], "{} -> {}", start, end);
    }
}

#[test]
fn test_same_start_and_end_is_empty() {
    let mut sut = pathfinding(world_with_walls(Location::new(5, 5, 1), &[]), 3);

    let path = sut.resolve(Location::new(2, 2, 0), Location::new(2, 2, 0)).unwrap().unwrap();

    assert!(path.is_empty());
    assert_eq!(path.cost, FixedNum::ZERO);
}

#[test]
fn test_obstacle_endpoint_has_no_path() {
    let world = world_with_walls(Location::new(5, 5, 1), &[Location::new(4, 4, 0)]);
    let mut sut = pathfinding(world, 3);

    assert!(sut.resolve(Location::new(0, 0, 0), Location::new(4, 4, 0)).unwrap().is_none());
    assert!(sut.resolve(Location::new(4, 4, 0), Location::new(0, 0, 0)).unwrap().is_none());
}

#[test]
fn test_out_of_bounds_endpoint_is_an_error() {
    let mut sut = pathfinding(world_with_walls(Location::new(5, 5, 1), &[]), 3);
    let outside = Location::new(5, 0, 0);

    assert_eq!(
        sut.resolve(Location::ZERO, outside),
        Err(PathfindingError::OutOfBounds(outside))
    );
}

#[test]
fn test_route_across_clusters() {
    let mut sut = pathfinding(world_with_walls(Location::new(9, 9, 1), &[]), 3);
    let (start, end) = (Location::new(0, 0, 0), Location::new(8, 8, 0));

    let path = sut.resolve(start, end).unwrap().unwrap();

    assert_connected(&sut, start, &path);
    assert_eq!(path.locations(sut.area()).last(), Some(&end));
    assert_eq!(path.abstract_levels[0].first(), Some(&start));
    assert_eq!(path.abstract_levels[0].last(), Some(&end));
    assert_eq!(path.cost, AreaGraph::new(sut.area(), &sut.config().costs).path_cost(sut.area().at(start).unwrap().id, &path.tiles));
}

#[test]
fn test_route_through_gap_in_wall() {
    // Wall at x = 4 with a single gap at y = 7.
    let walls: Vec<Location> = (0..9).filter(|&y| y != 7).map(|y| Location::new(4, y, 0)).collect();
    let mut sut = pathfinding(world_with_walls(Location::new(9, 9, 1), &walls), 3);
    let (start, end) = (Location::new(0, 0, 0), Location::new(8, 0, 0));

    let path = sut.resolve(start, end).unwrap().unwrap();
    let locations = path.locations(sut.area());

    assert_connected(&sut, start, &path);
    assert!(locations.contains(&Location::new(4, 7, 0)), "route must use the gap: {:?}", locations);
    assert_eq!(locations.last(), Some(&end));
}

#[test]
fn test_falls_through_when_cluster_has_no_inner_route() {
    // A wall splits the first cluster; the route leaves it and comes back.
    let walls = [Location::new(1, 0, 0), Location::new(1, 1, 0), Location::new(1, 2, 0)];
    let mut sut = pathfinding(world_with_walls(Location::new(6, 6, 1), &walls), 3);
    let (start, end) = (Location::new(0, 0, 0), Location::new(2, 0, 0));

    let path = sut.resolve(start, end).unwrap().expect("route around the wall through the next cluster");

    assert_connected(&sut, start, &path);
    assert!(path.locations(sut.area()).iter().any(|l| l.y >= 3), "route leaves the first cluster");
}

#[test]
fn test_queries_leave_no_temporary_nodes() {
    let mut sut = pathfinding(world_with_walls(Location::new(9, 9, 1), &[]), 3);
    let before = sut.stats();

    sut.resolve(Location::new(0, 0, 0), Location::new(8, 8, 0)).unwrap();
    sut.resolve(Location::new(1, 4, 0), Location::new(7, 2, 0)).unwrap();
    let after = sut.stats();

    assert_eq!(after.abstract_nodes, before.abstract_nodes);
    assert_eq!(after.edges, before.edges);
    assert!(sut.graph().iter().all(|(_, node)| !node.is_temporary()));
    assert_eq!(after.cached_paths, before.cached_paths, "query endpoints are not cached");
}

#[test]
fn test_graph_stats_for_open_world() {
    let sut = pathfinding(world_with_walls(Location::new(6, 6, 1), &[]), 3);
    let stats = sut.stats();

    assert_eq!(stats.clusters, 4);
    assert_eq!(stats.entrances, 12, "three entrances per cluster");
    assert_eq!(stats.abstract_nodes, 5, "touching entrances share a node");
    assert!(stats.edges > 0);
    assert_eq!(sut.abstract_node_count(), stats.abstract_nodes);
}

#[test]
fn test_cluster_of_location() {
    let sut = pathfinding(world_with_walls(Location::new(7, 4, 1), &[]), 3);

    assert_eq!(sut.clusters().len(), 6);
    assert_eq!(sut.cluster_of(Location::new(0, 0, 0)).map(Cluster::id), Some((0, 0, 0)));
    assert_eq!(sut.cluster_of(Location::new(6, 3, 0)).map(Cluster::id), Some((2, 1, 0)));
    assert!(sut.cluster_of(Location::new(7, 0, 0)).is_none());
    assert!(sut.cluster_of(Location::new(-1, 0, 0)).is_none());
}

#[test]
fn test_route_climbs_ramp_between_layered_clusters() {
    let mut world = world_with_walls(Location::new(6, 6, 2), &[]);
    world.set_terrain(Location::new(2, 2, 0), Terrain::RAMP).unwrap();
    world.set_terrain(Location::new(2, 2, 1), Terrain::EMPTY).unwrap();
    let config = PathfindingConfig {
        cluster_depth: Some(1),
        ..PathfindingConfig::with_cluster_size(3)
    };
    let mut sut = Pathfinding::new(world, AStar::default(), config).unwrap();
    let (start, end) = (Location::new(0, 0, 0), Location::new(5, 5, 1));

    let path = sut.resolve(start, end).unwrap().expect("the ramp connects the layers");
    let locations = path.locations(sut.area());

    assert_eq!(sut.clusters().len(), 8);
    assert_connected(&sut, start, &path);
    assert!(locations.contains(&Location::new(2, 2, 0)), "route must use the ramp: {:?}", locations);
    assert_eq!(locations.last(), Some(&end));
}

#[test]
fn test_unusable_config_is_rejected_before_building() {
    let world = world_with_walls(Location::new(5, 5, 1), &[]);
    let config = PathfindingConfig {
        closer_modifier: 1e30,
        ..PathfindingConfig::with_cluster_size(3)
    };
    let result = Pathfinding::new(world.clone(), AStar::default(), config);
    assert!(matches!(result, Err(PathfindingError::InvalidConfig("closer_modifier"))));

    let mut config = PathfindingConfig::with_cluster_size(3);
    config.costs.straight_cost = f64::NAN;
    let result = Pathfinding::new(world, AStar::default(), config);
    assert!(matches!(result, Err(PathfindingError::InvalidConfig("costs.straight_cost"))));
}
