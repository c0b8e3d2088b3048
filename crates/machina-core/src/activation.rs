//! Per-owner activation limits.
//!
//! Every running machine holds a [`Reservation`] against the registry for its
//! owner and kind. The reservation is released when it is dropped, so an
//! activation that fails after reserving, or a machine that is deactivated
//! for any reason, gives its slot back without bookkeeping at the call site.

use crate::geometry::BlockLocation;
use crate::id::OwnerId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Counts = BTreeMap<(OwnerId, &'static str), u32>;

/// Why an activation was refused. Structures that are simply not recognised
/// are not errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("{owner:?} lacks permission '{permission}'")]
    PermissionDenied {
        owner: OwnerId,
        permission: &'static str,
    },
    #[error("{owner:?} already runs {limit} active {kind}")]
    LimitReached {
        owner: OwnerId,
        kind: &'static str,
        limit: u32,
    },
    #[error("container at {location:?} is protected")]
    InventoryProtected { location: BlockLocation },
}

/// Shared count of active machines per owner and kind.
#[derive(Debug, Clone, Default)]
pub struct ActivationRegistry {
    counts: Arc<Mutex<Counts>>,
}

impl ActivationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of active machines of `kind` owned by `owner`.
    pub fn active(&self, owner: OwnerId, kind: &'static str) -> u32 {
        self.lock().get(&(owner, kind)).copied().unwrap_or(0)
    }

    /// Reserve one activation slot. `limit` of `None` means unlimited.
    pub fn try_acquire(
        &self,
        owner: OwnerId,
        kind: &'static str,
        limit: Option<u32>,
    ) -> Result<Reservation, ActivationError> {
        let mut counts = self.lock();
        let count = counts.entry((owner, kind)).or_insert(0);
        if let Some(limit) = limit
            && *count >= limit
        {
            return Err(ActivationError::LimitReached { owner, kind, limit });
        }
        *count += 1;
        Ok(Reservation {
            counts: Arc::clone(&self.counts),
            owner,
            kind,
        })
    }
}

/// One held activation slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct Reservation {
    counts: Arc<Mutex<Counts>>,
    owner: OwnerId,
    kind: &'static str,
}

impl Reservation {
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (self.owner, self.kind);
        if let Some(count) = counts.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_enforced_per_owner() {
        let registry = ActivationRegistry::new();
        let alice = OwnerId(1);
        let bob = OwnerId(2);

        let first = registry.try_acquire(alice, "builder", Some(1)).unwrap();
        assert_eq!(
            registry.try_acquire(alice, "builder", Some(1)).unwrap_err(),
            ActivationError::LimitReached {
                owner: alice,
                kind: "builder",
                limit: 1
            }
        );
        // Other owners and other kinds are counted separately.
        let _bob = registry.try_acquire(bob, "builder", Some(1)).unwrap();
        let _drill = registry.try_acquire(alice, "drill", Some(1)).unwrap();
        assert_eq!(first.owner(), alice);
        assert_eq!(registry.active(alice, "builder"), 1);
    }

    #[test]
    fn dropping_reservation_frees_slot() {
        let registry = ActivationRegistry::new();
        let owner = OwnerId(7);
        {
            let _held = registry.try_acquire(owner, "builder", Some(1)).unwrap();
            assert_eq!(registry.active(owner, "builder"), 1);
        }
        assert_eq!(registry.active(owner, "builder"), 0);
        assert!(registry.try_acquire(owner, "builder", Some(1)).is_ok());
    }

    #[test]
    fn unlimited_kinds_never_refuse() {
        let registry = ActivationRegistry::new();
        let held: Vec<_> = (0..50)
            .map(|_| registry.try_acquire(OwnerId(1), "drill", None).unwrap())
            .collect();
        assert_eq!(registry.active(OwnerId(1), "drill"), 50);
        drop(held);
        assert_eq!(registry.active(OwnerId(1), "drill"), 0);
    }
}
