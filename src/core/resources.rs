use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoreState {
    Idle,
    Busy,
}

/// Tracks which CPU core indices are reserved by running jobs.
///
/// Core indices are `0..count` — a flat range, not the hyperthread-pair
/// interleaving some schedulers use.
#[derive(Debug)]
pub struct CpuResourceManager {
    cores: BTreeMap<u32, CoreState>,
}

impl CpuResourceManager {
    pub fn new(count: u32) -> Self {
        let count = count.max(1);
        Self {
            cores: (0..count).map(|i| (i, CoreState::Idle)).collect(),
        }
    }

    pub fn total_count(&self) -> u32 {
        self.cores.len() as u32
    }

    pub fn available_count(&self) -> u32 {
        self.cores
            .values()
            .filter(|s| **s == CoreState::Idle)
            .count() as u32
    }

    /// Reserves `count` idle cores, returning their indices, or `None` if
    /// fewer than `count` are idle. All-or-nothing: never partially reserves.
    pub fn reserve(&mut self, count: u32) -> Option<Vec<u32>> {
        let idle: Vec<u32> = self
            .cores
            .iter()
            .filter(|(_, state)| **state == CoreState::Idle)
            .map(|(idx, _)| *idx)
            .take(count as usize)
            .collect();

        if idle.len() < count as usize {
            return None;
        }

        for idx in &idle {
            self.cores.insert(*idx, CoreState::Busy);
        }
        Some(idle)
    }

    pub fn free(&mut self, indices: &[u32]) {
        for idx in indices {
            if let Some(state) = self.cores.get_mut(idx) {
                *state = CoreState::Idle;
            }
        }
    }

    /// Grows or shrinks the managed core set. Shrinking never evicts cores
    /// currently reserved by a running job — it only removes idle ones,
    /// stopping once it has removed as many as it can without going below
    /// `new_count` worth of protection for busy cores.
    pub fn resize(&mut self, new_count: u32) {
        let new_count = new_count.max(1);
        let current = self.cores.len() as u32;

        if new_count > current {
            for idx in current..new_count {
                self.cores.insert(idx, CoreState::Idle);
            }
        } else if new_count < current {
            let mut removed = 0;
            let to_remove = current - new_count;
            let candidates: Vec<u32> = self
                .cores
                .iter()
                .rev()
                .filter(|(_, state)| **state == CoreState::Idle)
                .map(|(idx, _)| *idx)
                .take(to_remove as usize)
                .collect();
            for idx in candidates {
                self.cores.remove(&idx);
                removed += 1;
            }
            let _ = removed;
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// reserve(k) followed by free on the returned cores always leaves
        /// available_count where it started, for any total core count and
        /// any sequence of reservation sizes.
        #[test]
        fn reserve_then_free_round_trips(
            total in 1u32..32,
            reservations in prop::collection::vec(1u32..8, 0..16),
        ) {
            let mut mgr = CpuResourceManager::new(total);
            let before = mgr.available_count();
            let mut held = Vec::new();

            for count in reservations {
                if let Some(cores) = mgr.reserve(count) {
                    held.push(cores);
                }
            }
            for cores in &held {
                mgr.free(cores);
            }

            prop_assert_eq!(mgr.available_count(), before);
        }

        /// Reservations are never oversubscribed: at every step, idle plus
        /// busy accounts for exactly the total, and no two held reservations
        /// share a core index.
        #[test]
        fn reservations_never_overlap(
            total in 1u32..16,
            reservations in prop::collection::vec(1u32..4, 0..16),
        ) {
            let mut mgr = CpuResourceManager::new(total);
            let mut seen = std::collections::HashSet::new();

            for count in reservations {
                if let Some(cores) = mgr.reserve(count) {
                    for core in &cores {
                        prop_assert!(seen.insert(*core), "core {core} reserved twice");
                    }
                }
                prop_assert!(mgr.available_count() <= total);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_all_cores_idle() {
        let mgr = CpuResourceManager::new(4);
        assert_eq!(mgr.total_count(), 4);
        assert_eq!(mgr.available_count(), 4);
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let mut mgr = CpuResourceManager::new(2);
        assert!(mgr.reserve(3).is_none());
        assert_eq!(mgr.available_count(), 2);
    }

    #[test]
    fn reserve_and_free_round_trip() {
        let mut mgr = CpuResourceManager::new(4);
        let cores = mgr.reserve(2).unwrap();
        assert_eq!(cores.len(), 2);
        assert_eq!(mgr.available_count(), 2);
        mgr.free(&cores);
        assert_eq!(mgr.available_count(), 4);
    }

    #[test]
    fn core_indices_start_at_zero() {
        let mgr = CpuResourceManager::new(2);
        assert!(mgr.cores.contains_key(&0));
        assert!(mgr.cores.contains_key(&1));
    }

    #[test]
    fn resize_grows_with_idle_cores() {
        let mut mgr = CpuResourceManager::new(2);
        mgr.resize(4);
        assert_eq!(mgr.total_count(), 4);
        assert_eq!(mgr.available_count(), 4);
    }

    #[test]
    fn resize_shrink_preserves_busy_cores() {
        let mut mgr = CpuResourceManager::new(4);
        let reserved = mgr.reserve(2).unwrap();
        mgr.resize(1);
        // busy cores must still be tracked even if shrinking below their count
        for idx in &reserved {
            assert!(mgr.cores.contains_key(idx));
        }
    }
}
