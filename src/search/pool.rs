//! Reusable arena of per-node search records.
//!
//! A record is handed out as a [`Lease`] and goes back to the pool when the
//! lease is released. Each acquisition bumps a stamp, so a lease kept past its
//! release (or from an earlier query) is rejected instead of silently reading
//! a record that now belongs to someone else.

use crate::error::PathfindingError;
use crate::math::FixedNum;

/// Bookkeeping for one node during a single search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRecord<N> {
    pub node: N,
    /// Best known cost from the start.
    pub path_cost: FixedNum,
    /// Heuristic estimate to the goal.
    pub estimate: FixedNum,
    /// Index of the predecessor on the best known route.
    pub parent: Option<usize>,
}

/// Proof of ownership of one pool slot. Deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct Lease {
    pub(super) index: usize,
    pub(super) stamp: u64,
}

impl Lease {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Clone, Debug)]
struct Slot<N> {
    stamp: u64,
    record: Option<SearchRecord<N>>,
}

impl<N> Default for Slot<N> {
    fn default() -> Self {
        Self { stamp: 0, record: None }
    }
}

#[derive(Clone, Debug)]
pub struct NodePool<N> {
    slots: Vec<Slot<N>>,
    next_stamp: u64,
    live: usize,
}

impl<N> Default for NodePool<N> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next_stamp: 1,
            live: 0,
        }
    }
}

impl<N: Copy> NodePool<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every live record and make room for indices below `capacity`.
    /// Leases issued before the reset are no longer honoured.
    ///
    /// Only walks the slots when leases are still outstanding, so a pool whose
    /// leases were all released resets without touching its storage. Returns
    /// the number of records dropped.
    pub fn reset(&mut self, capacity: usize) -> usize {
        let dropped = self.live;
        if dropped > 0 {
            for slot in &mut self.slots {
                slot.record = None;
            }
        }
        if self.slots.len() < capacity {
            self.slots.resize_with(capacity, Slot::default);
        }
        self.next_stamp += 1;
        self.live = 0;
        dropped
    }

    /// Take slot `index` for `record`.
    pub fn acquire(&mut self, index: usize, record: SearchRecord<N>) -> Result<Lease, PathfindingError> {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Slot::default);
        }
        let slot = &mut self.slots[index];
        if slot.record.is_some() {
            return Err(PathfindingError::NodeAlreadyLeased(index));
        }

        let stamp = self.next_stamp;
        self.next_stamp += 1;
        slot.stamp = stamp;
        slot.record = Some(record);
        self.live += 1;
        Ok(Lease { index, stamp })
    }

    pub fn record(&self, lease: &Lease) -> Result<&SearchRecord<N>, PathfindingError> {
        self.slots
            .get(lease.index)
            .filter(|slot| slot.stamp == lease.stamp)
            .and_then(|slot| slot.record.as_ref())
            .ok_or(PathfindingError::DisposedSearchNode(lease.index))
    }

    pub fn record_mut(&mut self, lease: &Lease) -> Result<&mut SearchRecord<N>, PathfindingError> {
        self.slots
            .get_mut(lease.index)
            .filter(|slot| slot.stamp == lease.stamp)
            .and_then(|slot| slot.record.as_mut())
            .ok_or(PathfindingError::DisposedSearchNode(lease.index))
    }

    /// Read the live record at `index` without holding its lease. Used to walk
    /// parent links, which are stored as plain indices.
    pub fn get(&self, index: usize) -> Result<&SearchRecord<N>, PathfindingError> {
        self.slots
            .get(index)
            .and_then(|slot| slot.record.as_ref())
            .ok_or(PathfindingError::DisposedSearchNode(index))
    }

    /// Return the slot to the pool. A stale lease is reported, not ignored.
    pub fn release(&mut self, lease: Lease) -> Result<(), PathfindingError> {
        let slot = self
            .slots
            .get_mut(lease.index)
            .filter(|slot| slot.stamp == lease.stamp && slot.record.is_some())
            .ok_or(PathfindingError::DisposedSearchNode(lease.index))?;
        slot.record = None;
        self.live -= 1;
        Ok(())
    }

    /// Records currently leased out.
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
