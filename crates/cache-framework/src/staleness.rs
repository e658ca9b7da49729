//! # Staleness Tracking
//!
//! Per-resource freshness flags. Every resource starts stale. Invalidation
//! never touches cached data; it only forces the next access to refetch.
//!
//! Each invalidation also bumps a generation counter. A fetch remembers the
//! generation it started under and may only clear the flag if nothing was
//! invalidated in the meantime.

use crate::error::CacheError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Freshness {
    actual: bool,
    generation: u64,
}

impl Freshness {
    fn invalidate(&mut self) {
        self.actual = false;
        self.generation += 1;
    }
}

/// Freshness flags for a fixed set of resource names.
#[derive(Debug)]
pub struct StalenessTracker {
    slots: HashMap<&'static str, Freshness>,
}

impl StalenessTracker {
    pub fn new(names: impl IntoIterator<Item = &'static str>) -> Self {
        let slots = names
            .into_iter()
            .map(|name| {
                (
                    name,
                    Freshness {
                        actual: false,
                        generation: 0,
                    },
                )
            })
            .collect();
        Self { slots }
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Freshness, CacheError> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| CacheError::unknown_resource(name))
    }

    pub fn mark_stale(&mut self, name: &str) -> Result<(), CacheError> {
        self.slot_mut(name)?.invalidate();
        Ok(())
    }

    /// Marks everything stale except `keep`, whose flags are left untouched.
    ///
    /// All names in `keep` are checked before anything changes.
    pub fn mark_all_stale_except<K: AsRef<str>>(&mut self, keep: &[K]) -> Result<(), CacheError> {
        let keep: Vec<&str> = keep.iter().map(|k| k.as_ref()).collect();
        if let Some(unknown) = keep.iter().find(|k| !self.slots.contains_key(**k)) {
            return Err(CacheError::unknown_resource(unknown));
        }
        for (name, slot) in self.slots.iter_mut() {
            if !keep.contains(name) {
                slot.invalidate();
            }
        }
        Ok(())
    }

    pub fn mark_all_stale(&mut self) {
        self.slots.values_mut().for_each(Freshness::invalidate);
    }

    pub fn is_actual(&self, name: &str) -> Result<bool, CacheError> {
        self.slots
            .get(name)
            .map(|slot| slot.actual)
            .ok_or_else(|| CacheError::unknown_resource(name))
    }

    pub fn generation(&self, name: &str) -> Result<u64, CacheError> {
        self.slots
            .get(name)
            .map(|slot| slot.generation)
            .ok_or_else(|| CacheError::unknown_resource(name))
    }

    /// Clears the flag if no invalidation happened since `generation`.
    ///
    /// Returns whether the resource is now actual.
    pub fn mark_actual(&mut self, name: &str, generation: u64) -> Result<bool, CacheError> {
        let slot = self.slot_mut(name)?;
        if slot.generation == generation {
            slot.actual = true;
        }
        Ok(slot.actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 3] = ["listing", "stats", "orders"];

    fn all_actual() -> StalenessTracker {
        let mut tracker = StalenessTracker::new(NAMES);
        for name in NAMES {
            assert!(tracker.mark_actual(name, 0).unwrap());
        }
        tracker
    }

    #[test]
    fn test_resources_start_stale() {
        let tracker = StalenessTracker::new(NAMES);
        for name in NAMES {
            assert!(!tracker.is_actual(name).unwrap());
        }
    }

    #[test]
    fn test_mark_all_stale_except_keeps_listing() {
        let mut tracker = all_actual();
        tracker.mark_all_stale_except(&["listing"]).unwrap();
        assert!(tracker.is_actual("listing").unwrap());
        assert!(!tracker.is_actual("stats").unwrap());
        assert!(!tracker.is_actual("orders").unwrap());

        // A stale listing stays stale.
        let mut tracker = StalenessTracker::new(NAMES);
        tracker.mark_all_stale_except(&["listing"]).unwrap();
        assert!(!tracker.is_actual("listing").unwrap());
    }

    #[test]
    fn test_mark_all_stale_except_unknown_changes_nothing() {
        let mut tracker = all_actual();
        let result = tracker.mark_all_stale_except(&["listing", "bogus"]);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
        for name in NAMES {
            assert!(tracker.is_actual(name).unwrap());
        }
    }

    #[test]
    fn test_mark_stale_is_targeted() {
        let mut tracker = all_actual();
        tracker.mark_stale("stats").unwrap();
        assert!(tracker.is_actual("listing").unwrap());
        assert!(!tracker.is_actual("stats").unwrap());
        assert!(tracker.is_actual("orders").unwrap());
        assert!(tracker.mark_stale("bogus").is_err());
    }

    #[test]
    fn test_mark_all_stale() {
        let mut tracker = all_actual();
        tracker.mark_all_stale();
        for name in NAMES {
            assert!(!tracker.is_actual(name).unwrap());
        }
    }

    #[test]
    fn test_outdated_generation_does_not_clear_flag() {
        let mut tracker = StalenessTracker::new(NAMES);
        let started = tracker.generation("stats").unwrap();
        tracker.mark_stale("stats").unwrap();
        assert!(!tracker.mark_actual("stats", started).unwrap());
        let current = tracker.generation("stats").unwrap();
        assert!(tracker.mark_actual("stats", current).unwrap());
    }
}
