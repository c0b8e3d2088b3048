//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{BlockCatalog, material};
use crate::config::MachinaConfig;
use crate::geometry::BlockLocation;
use crate::id::{BlockTypeId, ItemTypeId, OwnerId};
use crate::item::{Container, ItemStack};
use crate::scheduler::Scheduler;
use crate::sim::{Env, Ticks};
use crate::world::{Block, BlockWorld, GridWorld, Protection};
use std::collections::BTreeSet;

// ===========================================================================
// Protection
// ===========================================================================

/// Protection with explicit deny lists. Everything not listed is allowed.
#[derive(Debug, Clone, Default)]
pub struct TestProtection {
    pub denied_permissions: BTreeSet<String>,
    /// Cells nobody may open, break or place into.
    pub locked: BTreeSet<BlockLocation>,
}

impl Protection for TestProtection {
    fn has_permission(&self, _owner: OwnerId, node: &str) -> bool {
        !self.denied_permissions.contains(node)
    }

    fn can_open(&self, _owner: OwnerId, location: BlockLocation) -> bool {
        !self.locked.contains(&location)
    }

    fn can_break(&self, _owner: OwnerId, location: BlockLocation) -> bool {
        !self.locked.contains(&location)
    }

    fn can_place(&self, _owner: OwnerId, location: BlockLocation, _block: Block) -> bool {
        !self.locked.contains(&location)
    }
}

// ===========================================================================
// Host
// ===========================================================================

/// A world plus everything else an [`Env`] borrows.
#[derive(Debug, Clone)]
pub struct TestHost {
    pub world: GridWorld,
    pub catalog: BlockCatalog,
    pub config: MachinaConfig,
    pub protection: TestProtection,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            world: GridWorld::new(),
            catalog: BlockCatalog::standard(),
            config: MachinaConfig::default(),
            protection: TestProtection::default(),
        }
    }

    pub fn env(&mut self) -> Env<'_> {
        Env::new(&mut self.world, &self.catalog, &self.protection, &self.config)
    }
}

/// Advance the scheduler `n` ticks.
pub fn run_ticks(scheduler: &mut Scheduler, host: &mut TestHost, n: Ticks) {
    let mut env = host.env();
    for _ in 0..n {
        scheduler.tick(&mut env);
    }
}

// ===========================================================================
// World builders
// ===========================================================================

/// Fill the box spanned by two corners (inclusive) with one block type.
pub fn fill(world: &mut GridWorld, a: BlockLocation, b: BlockLocation, kind: BlockTypeId) {
    for x in a.x.min(b.x)..=a.x.max(b.x) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                world.set_block(BlockLocation::new(x, y, z), Block::new(kind));
            }
        }
    }
}

/// A three-slot furnace inventory with `coal` pieces of coal in the fuel slot.
pub fn furnace_with(coal: u32) -> Container {
    let mut furnace = Container::new(3);
    if coal > 0 {
        furnace.slots[1] = Some(ItemStack::new(material::COAL, coal));
    }
    furnace
}

/// A chest holding the given stacks, in order, from the first slot.
pub fn chest_with(stacks: &[(ItemTypeId, u32)]) -> Container {
    let mut chest = Container::new(27);
    for (slot, &(item, quantity)) in chest.slots.iter_mut().zip(stacks) {
        *slot = Some(ItemStack::new(item, quantity));
    }
    chest
}

/// A chest with every slot holding a full stack of `item`.
pub fn full_chest(item: ItemTypeId) -> Container {
    let mut chest = Container::new(27);
    let max = chest.max_stack;
    for slot in chest.slots.iter_mut() {
        *slot = Some(ItemStack::new(item, max));
    }
    chest
}

/// Total of an item in the container at `location`, zero if there is none.
pub fn count(world: &dyn BlockWorld, location: BlockLocation, item: ItemTypeId) -> u32 {
    world.container(location).map_or(0, |c| c.quantity(item))
}
