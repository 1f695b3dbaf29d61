use rdmafit_core::{PhysicalFunction, RdmaInterfaceRequest};
use std::collections::HashSet;
use tracing::debug;

/// Result of fitting a pod's RDMA interfaces onto one node's inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Every requested interface found a physical function
    pub feasible: bool,
    /// Free bandwidth left on the node after placement; only meaningful for
    /// ranking feasible nodes
    pub residual: u64,
    /// `assignments[i]` is the physical function serving request `i`
    /// (empty when infeasible)
    pub assignments: Vec<usize>,
}

/// Placement strategy trait
///
/// Decides whether a set of interface requests fits a node's inventory.
/// Implementations must be pure: the same inputs always give the same result.
pub trait PlacementStrategy: Send + Sync {
    /// Fit `requests` onto `inventory`
    fn place(&self, requests: &[RdmaInterfaceRequest], inventory: &[PhysicalFunction])
        -> Placement;

    /// Name of the strategy
    fn name(&self) -> &str;
}

/// Exhaustive best-fit placement
///
/// Each request needs one free virtual function and at least `min_tx_rate`
/// of free bandwidth on a single physical function. Requests are placed
/// largest first onto the tightest function that still fits; on a dead end
/// the search backtracks, so an assignment is found whenever one exists.
/// Branches that cannot have enough free slots or bandwidth are cut early,
/// and failed states are remembered so interchangeable requests are not
/// retried in every order.
pub struct BestFitPlacement;

impl PlacementStrategy for BestFitPlacement {
    fn place(
        &self,
        requests: &[RdmaInterfaceRequest],
        inventory: &[PhysicalFunction],
    ) -> Placement {
        let total_free: u64 = inventory.iter().map(|pf| pf.free_tx_rate() as u64).sum();

        // Stable sort keeps annotation order among equal requests
        let mut order: Vec<usize> = (0..requests.len()).collect();
        order.sort_by(|&a, &b| requests[b].min_tx_rate.cmp(&requests[a].min_tx_rate));

        let mut remaining_need = vec![0u64; order.len() + 1];
        for pos in (0..order.len()).rev() {
            remaining_need[pos] = remaining_need[pos + 1] + requests[order[pos]].min_tx_rate as u64;
        }

        let mut search = Search {
            requests,
            free_vfs: inventory.iter().map(PhysicalFunction::free_vfs).collect(),
            free_tx: inventory.iter().map(PhysicalFunction::free_tx_rate).collect(),
            order,
            remaining_need,
            assignments: vec![0; requests.len()],
            dead_ends: HashSet::new(),
        };

        if search.assign(0) {
            let requested = search.remaining_need[0];
            debug!(
                "Placed {} interfaces on {:?}, {} Mbps left free",
                requests.len(),
                search.assignments,
                total_free - requested
            );
            Placement {
                feasible: true,
                residual: total_free - requested,
                assignments: search.assignments,
            }
        } else {
            debug!(
                "Could not place {} interfaces on {} physical functions ({} dead ends)",
                requests.len(),
                inventory.len(),
                search.dead_ends.len()
            );
            Placement {
                feasible: false,
                residual: total_free,
                assignments: Vec::new(),
            }
        }
    }

    fn name(&self) -> &str {
        "BestFitPlacement"
    }
}

/// Remaining request position plus the sorted free capacity of every usable
/// function. Two search states with the same key have the same answer.
type StateKey = (usize, Vec<(u32, u32)>);

struct Search<'a> {
    requests: &'a [RdmaInterfaceRequest],
    free_vfs: Vec<u32>,
    free_tx: Vec<u32>,
    order: Vec<usize>,
    /// `remaining_need[pos]` is the bandwidth still wanted by `order[pos..]`
    remaining_need: Vec<u64>,
    assignments: Vec<usize>,
    dead_ends: HashSet<StateKey>,
}

impl Search<'_> {
    fn assign(&mut self, pos: usize) -> bool {
        let Some(&request_index) = self.order.get(pos) else {
            return true;
        };
        let need = self.requests[request_index].min_tx_rate;

        if !self.has_room(pos) {
            return false;
        }
        let key = self.state_key(pos);
        if self.dead_ends.contains(&key) {
            return false;
        }

        let mut candidates: Vec<usize> = (0..self.free_tx.len())
            .filter(|&pf| self.free_vfs[pf] > 0 && self.free_tx[pf] >= need)
            .collect();
        candidates.sort_by_key(|&pf| (self.free_tx[pf], self.free_vfs[pf], pf));

        let mut tried: Vec<(u32, u32)> = Vec::new();
        for pf in candidates {
            // Functions with identical free capacity lead to the same subtree
            let state = (self.free_tx[pf], self.free_vfs[pf]);
            if tried.contains(&state) {
                continue;
            }
            tried.push(state);

            self.free_vfs[pf] -= 1;
            self.free_tx[pf] -= need;
            self.assignments[request_index] = pf;

            if self.assign(pos + 1) {
                return true;
            }

            self.free_vfs[pf] += 1;
            self.free_tx[pf] += need;
        }

        self.dead_ends.insert(key);
        false
    }

    /// Necessary conditions for placing `order[pos..]`: enough free virtual
    /// functions and enough free bandwidth on functions that can still take
    /// the smallest remaining request.
    fn has_room(&self, pos: usize) -> bool {
        let Some(&last) = self.order.last() else {
            return true;
        };
        let smallest = self.requests[last].min_tx_rate;
        let left = (self.order.len() - pos) as u64;
        let mut slots = 0u64;
        let mut bandwidth = 0u64;
        for (&vfs, &tx) in self.free_vfs.iter().zip(&self.free_tx) {
            if vfs > 0 && tx >= smallest {
                slots += vfs as u64;
                bandwidth += tx as u64;
            }
        }
        slots >= left && bandwidth >= self.remaining_need[pos]
    }

    fn state_key(&self, pos: usize) -> StateKey {
        // A function can take at most `left` more requests, so larger slot
        // counts are equivalent
        let left = u32::try_from(self.order.len() - pos).unwrap_or(u32::MAX);
        let mut functions: Vec<(u32, u32)> = self
            .free_tx
            .iter()
            .zip(&self.free_vfs)
            .filter(|(_, vfs)| **vfs > 0)
            .map(|(&tx, &vfs)| (tx, vfs.min(left)))
            .collect();
        functions.sort_unstable();
        (pos, functions)
    }
}
