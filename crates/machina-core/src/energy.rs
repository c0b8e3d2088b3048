//! Fuel-backed energy accounting.
//!
//! A machine's actions cost ticks of energy. Energy is produced by burning
//! fuel items out of the machine's fuel container one at a time; whatever a
//! burnt item yields beyond the current action stays stored for later ones.

use crate::catalog::BlockCatalog;
use crate::geometry::BlockLocation;
use crate::sim::Ticks;
use crate::world::BlockWorld;
use serde::{Deserialize, Serialize};

/// Stored energy of one machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyLedger {
    stored: Ticks,
}

impl EnergyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Ticks {
        self.stored
    }

    /// Energy that could be made available right now: what is stored plus
    /// the burn value of every fuel item in the container.
    pub fn available(&self, world: &dyn BlockWorld, catalog: &BlockCatalog, fuel: BlockLocation) -> Ticks {
        let in_container: Ticks = world
            .container(fuel)
            .map(|c| {
                c.slots
                    .iter()
                    .flatten()
                    .filter_map(|s| catalog.burn_time(s.item_type).map(|t| t * s.quantity as Ticks))
                    .sum()
            })
            .unwrap_or(0);
        self.stored + in_container
    }

    /// Spend `amount` ticks of energy, burning fuel from the container at
    /// `fuel` as needed.
    ///
    /// Returns `false` without burning anything if the stored energy plus all
    /// fuel present cannot cover `amount`.
    pub fn use_energy(
        &mut self,
        world: &mut dyn BlockWorld,
        catalog: &BlockCatalog,
        fuel: BlockLocation,
        amount: Ticks,
    ) -> bool {
        if self.available(world, catalog, fuel) < amount {
            return false;
        }

        while self.stored < amount {
            let Some(container) = world.container_mut(fuel) else {
                return false;
            };
            let burnable = |item| catalog.burn_time(item).is_some_and(|t| t > 0);
            let Some(slot) = container.find_slot(|s| burnable(s.item_type)) else {
                return false;
            };
            let Some(burnt) = container.decrement_slot(slot) else {
                return false;
            };
            self.stored += catalog.burn_time(burnt.item_type).unwrap_or(0);
        }

        self.stored -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::material::*;
    use crate::item::{Container, ItemStack};
    use crate::world::{Block, GridWorld};

    fn furnace(world: &mut GridWorld, stacks: Vec<Option<ItemStack>>) -> BlockLocation {
        let at = BlockLocation::new(0, 0, 0);
        world.put_container(at, Block::new(FURNACE), Container::with_slots(stacks));
        at
    }

    #[test]
    fn burns_one_item_and_keeps_the_rest() {
        let catalog = BlockCatalog::standard();
        let mut world = GridWorld::new();
        let at = furnace(&mut world, vec![None, Some(ItemStack::new(COAL, 2)), None]);

        let mut ledger = EnergyLedger::new();
        assert!(ledger.use_energy(&mut world, &catalog, at, 100));
        assert_eq!(ledger.stored(), 1500);
        assert_eq!(world.container(at).unwrap().quantity(COAL), 1);

        // Covered by the stored remainder, nothing else burns.
        assert!(ledger.use_energy(&mut world, &catalog, at, 1500));
        assert_eq!(ledger.stored(), 0);
        assert_eq!(world.container(at).unwrap().quantity(COAL), 1);
    }

    #[test]
    fn insufficient_fuel_burns_nothing() {
        let catalog = BlockCatalog::standard();
        let mut world = GridWorld::new();
        let at = furnace(&mut world, vec![Some(ItemStack::new(STICK, 1))]);

        let mut ledger = EnergyLedger::new();
        assert!(!ledger.use_energy(&mut world, &catalog, at, 500));
        assert_eq!(ledger.stored(), 0);
        assert_eq!(world.container(at).unwrap().quantity(STICK), 1);
    }

    #[test]
    fn non_fuel_items_are_skipped() {
        let catalog = BlockCatalog::standard();
        let mut world = GridWorld::new();
        let at = furnace(
            &mut world,
            vec![Some(ItemStack::new(DIRT.as_item(), 10)), Some(ItemStack::new(LOG.as_item(), 1))],
        );
        let mut ledger = EnergyLedger::new();
        assert!(ledger.use_energy(&mut world, &catalog, at, 300));
        let c = world.container(at).unwrap();
        assert_eq!(c.quantity(DIRT.as_item()), 10);
        assert_eq!(c.quantity(LOG.as_item()), 0);
    }

    #[test]
    fn missing_container_means_no_energy() {
        let catalog = BlockCatalog::standard();
        let mut world = GridWorld::new();
        let mut ledger = EnergyLedger::new();
        assert!(!ledger.use_energy(&mut world, &catalog, BlockLocation::new(9, 9, 9), 1));
        assert!(ledger.use_energy(&mut world, &catalog, BlockLocation::new(9, 9, 9), 0));
    }
}
