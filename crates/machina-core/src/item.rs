use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// Largest quantity a single slot holds unless a container says otherwise.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// A stack of identical items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }
}

/// The item slots of a container block (chest, furnace).
///
/// Slots may be empty, partially filled or hold different item types in any
/// order; every lookup is a linear scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub slots: Vec<Option<ItemStack>>,
    pub max_stack: u32,
}

impl Container {
    /// Create an empty container with `size` slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            max_stack: DEFAULT_MAX_STACK,
        }
    }

    /// Build a container from an explicit slot list.
    pub fn with_slots(slots: Vec<Option<ItemStack>>) -> Self {
        Self {
            slots,
            max_stack: DEFAULT_MAX_STACK,
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    /// Index of the first non-empty slot whose stack satisfies `predicate`.
    pub fn find_slot(&self, mut predicate: impl FnMut(&ItemStack) -> bool) -> Option<usize> {
        self.slots.iter().position(|slot| match slot {
            Some(stack) if stack.quantity > 0 => predicate(stack),
            _ => false,
        })
    }

    /// Remove one item from a slot. Returns a single-item stack of what was
    /// removed, or `None` if the slot was empty.
    pub fn decrement_slot(&mut self, index: usize) -> Option<ItemStack> {
        let slot = self.slots.get_mut(index)?;
        let stack = slot.as_mut()?;
        if stack.quantity == 0 {
            *slot = None;
            return None;
        }
        stack.quantity -= 1;
        let taken = ItemStack::new(stack.item_type, 1);
        if stack.quantity == 0 {
            *slot = None;
        }
        Some(taken)
    }

    /// Whether any slot holds at least one item of this type.
    pub fn contains(&self, item_type: ItemTypeId) -> bool {
        self.find_slot(|s| s.item_type == item_type).is_some()
    }

    /// Total quantity of an item type across all slots.
    pub fn quantity(&self, item_type: ItemTypeId) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item_type == item_type)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().flatten().all(|s| s.quantity == 0)
    }

    /// Merge a stack into the container, filling partial stacks of the same
    /// type before empty slots. Returns the quantity that did not fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub(crate) fn merge(&mut self, stack: ItemStack) -> u32 {
        let mut remaining = stack.quantity;
        let max = self.max_stack;

        for slot in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if slot.item_type == stack.item_type && slot.quantity < max {
                let moved = remaining.min(max - slot.quantity);
                slot.quantity += moved;
                remaining -= moved;
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = remaining.min(max);
                *slot = Some(ItemStack::new(stack.item_type, moved));
                remaining -= moved;
            }
        }

        remaining
    }
}
