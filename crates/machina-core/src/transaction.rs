//! All-or-nothing transfers into a container.

use crate::item::{Container, ItemStack};

/// A staged set of item stacks to deposit into one container.
///
/// Nothing touches the container until [`InventoryTransaction::execute`],
/// which either places every staged stack or leaves the container exactly as
/// it was.
#[derive(Debug, Clone, Default)]
pub struct InventoryTransaction {
    staged: Vec<ItemStack>,
}

impl InventoryTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stack: ItemStack) {
        if stack.quantity > 0 {
            self.staged.push(stack);
        }
    }

    pub fn add_all(&mut self, stacks: impl IntoIterator<Item = ItemStack>) {
        for stack in stacks {
            self.add(stack);
        }
    }

    pub fn staged(&self) -> &[ItemStack] {
        &self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Whether executing against `container` would succeed. Does not modify it.
    pub fn fits(&self, container: &Container) -> bool {
        self.apply(container).is_some()
    }

    /// Deposit every staged stack. Returns `false` and leaves the container
    /// untouched if any of them would not fit.
    pub fn execute(&self, container: &mut Container) -> bool {
        match self.apply(container) {
            Some(updated) => {
                *container = updated;
                true
            }
            None => false,
        }
    }

    fn apply(&self, container: &Container) -> Option<Container> {
        let mut scratch = container.clone();
        for stack in &self.staged {
            if scratch.merge(*stack) > 0 {
                return None;
            }
        }
        Some(scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;

    const COBBLE: ItemTypeId = ItemTypeId(4);
    const COAL: ItemTypeId = ItemTypeId(263);

    #[test]
    fn execute_places_every_stack() {
        let mut chest = Container::new(3);
        let mut tx = InventoryTransaction::new();
        tx.add(ItemStack::new(COBBLE, 1));
        tx.add(ItemStack::new(COAL, 3));
        assert!(tx.execute(&mut chest));
        assert_eq!(chest.quantity(COBBLE), 1);
        assert_eq!(chest.quantity(COAL), 3);
    }

    #[test]
    fn failed_execute_leaves_container_unchanged() {
        let mut chest = Container::with_slots(vec![Some(ItemStack::new(COAL, 64)), None]);
        let before = chest.clone();

        let mut tx = InventoryTransaction::new();
        tx.add(ItemStack::new(COBBLE, 1));
        tx.add(ItemStack::new(COAL, 1));
        // Cobble takes the free slot, coal then has nowhere to go.
        assert!(!tx.fits(&chest));
        assert!(!tx.execute(&mut chest));
        assert_eq!(chest, before);
    }

    #[test]
    fn empty_transaction_always_succeeds() {
        let mut chest = Container::new(0);
        let mut tx = InventoryTransaction::new();
        tx.add(ItemStack::new(COBBLE, 0));
        assert!(tx.is_empty());
        assert!(tx.execute(&mut chest));
    }
}
