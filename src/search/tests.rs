use super::*;
use crate::area::Terrain;
use crate::error::PathfindingError;

fn open_area(size: Location) -> Area {
    Area::new(size, |_| Terrain::OPEN)
}

fn id_at(area: &Area, x: i32, y: i32, z: i32) -> NodeId {
    area.get(Location::new(x, y, z)).expect("location should be inside the area").id
}

fn locations(area: &Area, path: &Path<NodeId>) -> Vec<Location> {
    path.nodes.iter().map(|&id| area.node(id).unwrap().location).collect()
}

/// A line of nodes where node `i` links to `i + 1`; `leaky` also lists an
/// obstacle as a neighbour of node 0.
struct Line {
    len: usize,
    obstacle: Option<usize>,
    leaky: bool,
}

impl SearchSpace for Line {
    type Node = usize;

    fn index_bound(&self) -> usize {
        self.len
    }

    fn index_of(&self, node: usize) -> usize {
        node
    }

    fn neighbors(&self, node: usize, out: &mut Vec<usize>) {
        if node > 0 {
            out.push(node - 1);
        }
        if node + 1 < self.len {
            out.push(node + 1);
        }
        if self.leaky && node == 0 {
            out.extend(self.obstacle);
        }
        out.retain(|&n| self.leaky || Some(n) != self.obstacle);
    }

    fn cost(&self, _from: usize, _to: usize) -> FixedNum {
        FixedNum::ONE
    }

    fn estimate(&self, from: usize, to: usize) -> FixedNum {
        FixedNum::from_num(from.abs_diff(to))
    }

    fn is_obstacle(&self, node: usize) -> bool {
        Some(node) == self.obstacle
    }
}

#[test]
fn test_same_start_and_end_is_empty_path() {
    let area = open_area(Location::new(3, 3, 1));
    let costs = CostModel::default();
    let mut astar = AStar::default();

    let start = id_at(&area, 1, 1, 0);
    let path = astar
        .get_path(&AreaGraph::new(&area, &costs), start, start)
        .unwrap()
        .expect("start == end should be a path");

    assert!(path.is_empty());
    assert_eq!(path.cost, FixedNum::ZERO);
}

#[test]
fn test_adjacent_end_is_single_step() {
    let area = open_area(Location::new(3, 3, 1));
    let costs = CostModel::default();
    let mut astar = AStar::default();

    let path = astar
        .get_path(&AreaGraph::new(&area, &costs), id_at(&area, 0, 0, 0), id_at(&area, 1, 1, 0))
        .unwrap()
        .unwrap();

    assert_eq!(path.nodes, vec![id_at(&area, 1, 1, 0)]);
    assert_eq!(path.cost, costs.step_cost(Location::ZERO, Location::new(1, 1, 0)));
}

#[test]
fn test_straight_line_excludes_start_and_includes_end() {
    let area = open_area(Location::new(3, 2, 1));
    let costs = CostModel::default();
    let mut astar = AStar::default();

    let path = astar
        .get_path(&AreaGraph::new(&area, &costs), id_at(&area, 0, 0, 0), id_at(&area, 2, 0, 0))
        .unwrap()
        .unwrap();

    assert_eq!(locations(&area, &path), vec![Location::new(1, 0, 0), Location::new(2, 0, 0)]);
    assert_eq!(path.cost, FixedNum::from_num(2));
}

#[test]
fn test_detours_around_blocked_tile() {
    let mut area = open_area(Location::new(3, 2, 1));
    area.set_terrain(Location::new(1, 0, 0), Terrain::OBSTACLE).unwrap();
    let costs = CostModel::default();
    let mut astar = AStar::default();

    let path = astar
        .get_path(&AreaGraph::new(&area, &costs), id_at(&area, 0, 0, 0), id_at(&area, 2, 0, 0))
        .unwrap()
        .unwrap();

    assert_eq!(locations(&area, &path), vec![Location::new(1, 1, 0), Location::new(2, 0, 0)]);
}

#[test]
fn test_enclosed_destination_has_no_path() {
    let area = Area::new(Location::new(5, 5, 1), |l| {
        let ring = (1..=3).contains(&l.x) && (1..=3).contains(&l.y) && l != Location::new(2, 2, 0);
        if ring {
            Terrain::OBSTACLE
        } else {
            Terrain::OPEN
        }
    });
    let costs = CostModel::default();
    let mut astar = AStar::default();

    let path = astar
        .get_path(&AreaGraph::new(&area, &costs), id_at(&area, 0, 0, 0), id_at(&area, 2, 2, 0))
        .unwrap();

    assert!(path.is_none());
    assert_eq!(astar.live_count(), 0, "no path must still release every record");
}

#[test]
fn test_recorded_cost_equals_summed_edge_costs() {
    let mut area = open_area(Location::new(6, 6, 2));
    area.set_terrain(Location::new(2, 2, 0), Terrain::RAMP).unwrap();
    area.set_terrain(Location::new(2, 2, 1), Terrain::EMPTY).unwrap();
    for y in 0..5 {
        area.set_terrain(Location::new(3, y, 0), Terrain::OBSTACLE).unwrap();
    }
    let costs = CostModel::default();
    let graph = AreaGraph::new(&area, &costs);
    let mut astar = AStar::default();

    let start = id_at(&area, 0, 0, 0);
    let path = astar.get_path(&graph, start, id_at(&area, 5, 0, 1)).unwrap().unwrap();

    assert_eq!(path.cost, graph.path_cost(start, &path.nodes));
    let mut previous = start;
    for &node in &path.nodes {
        assert!(area.are_neighbors(previous, node), "path has a dead step");
        previous = node;
    }
}

#[test]
fn test_range_bounds_the_search() {
    let mut area = open_area(Location::new(4, 3, 1));
    // Wall at x = 1 except the corner at y = 2, which lies outside the range.
    area.set_terrain(Location::new(1, 0, 0), Terrain::OBSTACLE).unwrap();
    area.set_terrain(Location::new(1, 1, 0), Terrain::OBSTACLE).unwrap();
    let range = area.get_range(Location::ZERO, Some(Location::new(4, 2, 1)));
    let costs = CostModel::default();
    let mut astar = AStar::default();

    let (start, end) = (id_at(&area, 0, 0, 0), id_at(&area, 3, 0, 0));
    assert!(astar.get_path(&AreaGraph::new(&range, &costs), start, end).unwrap().is_none());
    assert!(astar.get_path(&AreaGraph::new(&area, &costs), start, end).unwrap().is_some());
}

#[test]
fn test_pool_is_drained_after_each_query() {
    let area = open_area(Location::new(8, 8, 1));
    let costs = CostModel::default();
    let graph = AreaGraph::new(&area, &costs);
    let mut astar = AStar::default();

    for (x, y) in [(7, 7), (3, 5), (0, 7)] {
        astar.get_path(&graph, id_at(&area, 0, 0, 0), id_at(&area, x, y, 0)).unwrap();
        assert_eq!(astar.live_count(), 0);
    }
}

#[test]
fn test_obstacle_endpoint_has_no_path() {
    let space = Line {
        len: 4,
        obstacle: Some(3),
        leaky: false,
    };
    let mut astar = AStar::default();

    assert_eq!(astar.get_path(&space, 0, 3).unwrap(), None);
}

#[test]
fn test_obstacle_neighbor_is_an_invariant_violation() {
    let space = Line {
        len: 4,
        obstacle: Some(2),
        leaky: true,
    };
    let mut astar = AStar::default();

    let result = astar.get_path(&space, 0, 3);
    assert_eq!(result, Err(PathfindingError::ObstacleInSearch(2)));
    assert_eq!(astar.live_count(), 0, "failed queries must release their records");
}

#[test]
fn test_heavier_closer_modifier_still_reaches_goal() {
    let space = Line {
        len: 10,
        obstacle: None,
        leaky: false,
    };
    let mut astar = AStar::new(FixedNum::from_num(3));

    let path = astar.get_path(&space, 0, 9).unwrap().unwrap();
    assert_eq!(path.nodes, (1..=9).collect::<Vec<_>>());
    assert_eq!(path.cost, FixedNum::from_num(9));
}

#[test]
fn test_reversed_path_walks_back_to_start() {
    let path = Path {
        nodes: vec![1, 2, 3],
        cost: FixedNum::from_num(3),
    };

    let back = path.reversed(0);
    assert_eq!(back.nodes, vec![2, 1, 0]);
    assert_eq!(back.cost, path.cost);
    assert!(Path::<usize>::empty().reversed(0).is_empty());
}

fn record(node: usize) -> SearchRecord<usize> {
    SearchRecord {
        node,
        path_cost: FixedNum::ZERO,
        estimate: FixedNum::ZERO,
        parent: None,
    }
}

#[test]
fn test_pool_released_record_is_disposed() {
    let mut pool = NodePool::new();
    pool.reset(4);

    let lease = pool.acquire(1, record(1)).unwrap();
    let stale = pool_lease_copy(&lease);
    pool.release(lease).unwrap();

    assert_eq!(pool.record(&stale), Err(PathfindingError::DisposedSearchNode(1)));
    assert_eq!(pool.get(1), Err(PathfindingError::DisposedSearchNode(1)));
    assert_eq!(pool.live_count(), 0);
}

#[test]
fn test_pool_rejects_double_lease() {
    let mut pool = NodePool::new();
    pool.reset(2);

    let _lease = pool.acquire(0, record(0)).unwrap();
    assert_eq!(pool.acquire(0, record(0)), Err(PathfindingError::NodeAlreadyLeased(0)));
}

#[test]
fn test_pool_reset_invalidates_old_leases() {
    let mut pool = NodePool::new();
    pool.reset(2);
    let old = pool.acquire(0, record(0)).unwrap();

    pool.reset(2);
    let fresh = pool.acquire(0, record(0)).unwrap();

    assert_eq!(pool.record_mut(&old).map(|_| ()), Err(PathfindingError::DisposedSearchNode(0)));
    assert!(pool.record(&fresh).is_ok());
    assert_eq!(pool.release(old), Err(PathfindingError::DisposedSearchNode(0)));
    assert_eq!(pool.live_count(), 1);
}

#[test]
fn test_pool_reset_skips_storage_when_all_leases_returned() {
    let mut pool = NodePool::new();
    pool.reset(1024);
    let lease = pool.acquire(7, record(7)).unwrap();
    pool.release(lease).unwrap();

    assert_eq!(pool.reset(1024), 0, "nothing was outstanding");
    assert_eq!(pool.capacity(), 1024);

    let _kept = pool.acquire(3, record(3)).unwrap();
    assert_eq!(pool.reset(16), 1, "the abandoned record is dropped");
    assert_eq!(pool.capacity(), 1024, "reset never shrinks");
    assert!(pool.acquire(3, record(3)).is_ok());
}

#[test]
fn test_range_search_leaves_no_world_sized_state() {
    let world = open_area(Location::new(64, 64, 1));
    let range = world.get_range(Location::new(8, 8, 0), Some(Location::new(4, 4, 1)));
    let costs = CostModel::default();
    let mut astar = AStar::default();
    let (a, b) = (id_at(&world, 8, 8, 0), id_at(&world, 11, 10, 0));

    let path = astar.get_path(&AreaGraph::new(&range, &costs), a, b).unwrap().unwrap();

    assert_eq!(path.len(), 3);
    assert_eq!(astar.live_count(), 0);
    assert_eq!(astar.closed_count(), 0, "closed marks are cleared per node, not per world");

    // Stale closed marks would hide these nodes from the reverse search.
    let back = astar.get_path(&AreaGraph::new(&world, &costs), b, a).unwrap().unwrap();
    assert_eq!(back.cost, path.cost);
    assert_eq!(astar.closed_count(), 0);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "is not a node of this world")]
fn test_cost_of_foreign_node_fails_loudly() {
    let area = open_area(Location::new(2, 2, 1));
    let costs = CostModel::default();

    AreaGraph::new(&area, &costs).cost(id_at(&area, 0, 0, 0), NodeId(99));
}

/// Leases are not `Clone`; tests forge a duplicate to play the part of a
/// handle that outlived its release.
fn pool_lease_copy(lease: &Lease) -> Lease {
    Lease {
        index: lease.index,
        stamp: lease.stamp,
    }
}
