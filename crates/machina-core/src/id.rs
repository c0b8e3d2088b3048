use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies an active machine in the scheduler.
    pub struct MachineId;
}

/// Identifies a block type in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockTypeId(pub u16);

/// Identifies an item type. Items that can be placed as blocks share their
/// numeric id with the block type they become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u16);

/// Identifies the player (or other actor) that activated a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

impl BlockTypeId {
    /// The item obtained when this block is picked up whole.
    pub fn as_item(self) -> ItemTypeId {
        ItemTypeId(self.0)
    }
}

impl ItemTypeId {
    /// The block this item would become if placed.
    pub fn as_block(self) -> BlockTypeId {
        BlockTypeId(self.0)
    }
}
