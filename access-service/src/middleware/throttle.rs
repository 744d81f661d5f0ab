//! Per-identity cooldown for store-backed session re-checks.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::models::SessionIdentity;

/// Bounded map of the last successful session check per identity.
///
/// Non-authoritative: it only suppresses redundant store round-trips within
/// the minimum interval, is lost on restart, and never gates correctness. A
/// session invalidated server-side can therefore pass the gate for at most
/// one interval before the next real check catches it.
pub struct CheckThrottle {
    last_pass: DashMap<(i64, String), Instant>,
    min_interval: Duration,
    capacity: usize,
}

impl CheckThrottle {
    pub fn new(min_interval: Duration, capacity: usize) -> Self {
        Self {
            last_pass: DashMap::new(),
            min_interval,
            capacity: capacity.max(1),
        }
    }

    /// Whether the identity passed a real check recently enough to skip
    /// another store round-trip.
    pub fn recently_passed(&self, identity: &SessionIdentity) -> bool {
        self.last_pass
            .get(&(identity.user_id, identity.session_id.clone()))
            .map(|at| at.elapsed() < self.min_interval)
            .unwrap_or(false)
    }

    pub fn record_pass(&self, identity: &SessionIdentity) {
        if self.last_pass.len() >= self.capacity {
            // Stale entries are useless; drop them first, and if the map is
            // still full, drop everything. Worst case is extra store checks.
            let min_interval = self.min_interval;
            self.last_pass.retain(|_, at| at.elapsed() < min_interval);
            if self.last_pass.len() >= self.capacity {
                self.last_pass.clear();
            }
        }
        self.last_pass
            .insert((identity.user_id, identity.session_id.clone()), Instant::now());
    }

    /// Drop an identity eagerly, e.g. on explicit logout.
    pub fn forget(&self, identity: &SessionIdentity) {
        self.last_pass
            .remove(&(identity.user_id, identity.session_id.clone()));
    }
}
