use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::trace;

use super::pool::{Lease, NodePool, SearchRecord};
use super::{Path, SearchSpace};
use crate::error::PathfindingError;
use crate::math::FixedNum;

/// Open-set entry. `BinaryHeap` is a max-heap, so the ordering is reversed:
/// lowest priority first, then lowest estimate, then lowest index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    priority: FixedNum,
    estimate: FixedNum,
    path_cost: FixedNum,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.estimate.cmp(&self.estimate))
            .then_with(|| other.index.cmp(&self.index))
            .then_with(|| other.path_cost.cmp(&self.path_cost))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first search with a reusable node pool.
///
/// One instance serves one query at a time; `get_path` takes `&mut self`, so
/// overlapping queries on the same instance cannot be expressed.
#[derive(Clone, Debug)]
pub struct AStar<N> {
    pool: NodePool<N>,
    closed: FixedBitSet,
    closer_modifier: FixedNum,
    scratch: Vec<N>,
}

impl<N: Copy> Default for AStar<N> {
    fn default() -> Self {
        Self::new(FixedNum::ONE)
    }
}

impl<N: Copy> AStar<N> {
    /// `closer_modifier` weights the heuristic: 1 is plain A*, larger values
    /// trade optimality for fewer expansions.
    pub fn new(closer_modifier: FixedNum) -> Self {
        Self {
            pool: NodePool::new(),
            closed: FixedBitSet::new(),
            closer_modifier,
            scratch: Vec::new(),
        }
    }

    pub fn closer_modifier(&self) -> FixedNum {
        self.closer_modifier
    }

    /// Search records still leased out. Zero whenever no query is running.
    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Nodes still marked closed. Zero whenever no query is running.
    pub fn closed_count(&self) -> usize {
        self.closed.count_ones(..)
    }

    /// Shortest path from `start` to `end` in `space`.
    ///
    /// The returned nodes exclude `start` and include `end`. `Ok(None)` means
    /// no route exists; `start == end` yields an empty path without searching.
    pub fn get_path<S>(&mut self, space: &S, start: N, end: N) -> Result<Option<Path<N>>, PathfindingError>
    where
        S: SearchSpace<Node = N>,
        N: Eq + std::fmt::Debug,
    {
        if start == end {
            return Ok(Some(Path::empty()));
        }
        if space.is_obstacle(start) || space.is_obstacle(end) {
            return Ok(None);
        }

        let bound = space.index_bound();
        self.pool.reset(bound);
        self.closed.grow(bound);

        let mut open_leases: FxHashMap<usize, Lease> = FxHashMap::default();
        let mut closed_leases: Vec<Lease> = Vec::new();

        let result = self.search(space, start, end, &mut open_leases, &mut closed_leases);

        // Only closed nodes ever set a bit.
        for lease in &closed_leases {
            self.closed.set(lease.index(), false);
        }
        let released = open_leases
            .into_values()
            .chain(closed_leases)
            .try_for_each(|lease| self.pool.release(lease));

        let path = result?;
        released?;
        Ok(path)
    }

    fn search<S>(
        &mut self,
        space: &S,
        start: N,
        end: N,
        open_leases: &mut FxHashMap<usize, Lease>,
        closed_leases: &mut Vec<Lease>,
    ) -> Result<Option<Path<N>>, PathfindingError>
    where
        S: SearchSpace<Node = N>,
        N: Eq + std::fmt::Debug,
    {
        let mut open = BinaryHeap::new();
        let start_index = space.index_of(start);
        let end_index = space.index_of(end);

        let estimate = space.estimate(start, end);
        let lease = self.pool.acquire(
            start_index,
            SearchRecord {
                node: start,
                path_cost: FixedNum::ZERO,
                estimate,
                parent: None,
            },
        )?;
        open_leases.insert(start_index, lease);
        open.push(OpenEntry {
            priority: estimate * self.closer_modifier,
            estimate,
            path_cost: FixedNum::ZERO,
            index: start_index,
        });

        let mut neighbors = std::mem::take(&mut self.scratch);
        let mut expanded = 0usize;

        while let Some(entry) = open.pop() {
            let Some(lease) = open_leases.get(&entry.index) else {
                continue;
            };
            let current = *self.pool.record(lease)?;
            // Superseded by a cheaper entry for the same node.
            if entry.path_cost != current.path_cost {
                continue;
            }
            let Some(lease) = open_leases.remove(&entry.index) else {
                continue;
            };
            self.closed.insert(entry.index);
            closed_leases.push(lease);
            expanded += 1;

            if entry.index == end_index {
                trace!("[ASTAR] {:?} -> {:?}: {} expansions", start, end, expanded);
                self.scratch = neighbors;
                return self.reconstruct(end_index, current.path_cost).map(Some);
            }

            neighbors.clear();
            space.neighbors(current.node, &mut neighbors);

            for &neighbor in &neighbors {
                let index = space.index_of(neighbor);
                if space.is_obstacle(neighbor) {
                    return Err(PathfindingError::ObstacleInSearch(index));
                }
                if self.closed.contains(index) {
                    continue;
                }

                let path_cost = current.path_cost + space.cost(current.node, neighbor);
                let estimate = match open_leases.get(&index) {
                    Some(lease) => {
                        let record = self.pool.record_mut(lease)?;
                        if path_cost >= record.path_cost {
                            continue;
                        }
                        record.path_cost = path_cost;
                        record.parent = Some(entry.index);
                        record.estimate
                    }
                    None => {
                        let estimate = space.estimate(neighbor, end);
                        let lease = self.pool.acquire(
                            index,
                            SearchRecord {
                                node: neighbor,
                                path_cost,
                                estimate,
                                parent: Some(entry.index),
                            },
                        )?;
                        open_leases.insert(index, lease);
                        estimate
                    }
                };

                open.push(OpenEntry {
                    priority: path_cost + estimate * self.closer_modifier,
                    estimate,
                    path_cost,
                    index,
                });
            }
        }

        trace!("[ASTAR] {:?} -> {:?}: no path after {} expansions", start, end, expanded);
        self.scratch = neighbors;
        Ok(None)
    }

    /// Walk parent links back from `end_index`. The start record has no
    /// parent and is left out.
    fn reconstruct(&self, end_index: usize, cost: FixedNum) -> Result<Path<N>, PathfindingError> {
        let mut nodes = Vec::new();
        let mut cursor = Some(end_index);
        while let Some(index) = cursor {
            let record = self.pool.get(index)?;
            cursor = record.parent;
            if cursor.is_some() {
                nodes.push(record.node);
            }
        }
        nodes.reverse();
        Ok(Path { nodes, cost })
    }
}
