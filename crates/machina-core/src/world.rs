//! The narrow interface machines use to touch the host world.
//!
//! The host owns every block; machines only read and write cells through
//! [`BlockWorld`] and ask [`Protection`] whether an owner may act. [`GridWorld`]
//! is an in-memory implementation for tests and simple hosts.

use crate::catalog::{BlockCatalog, material};
use crate::geometry::BlockLocation;
use crate::id::{BlockTypeId, OwnerId};
use crate::item::{Container, ItemStack};
use crate::transaction::InventoryTransaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A block type plus its small data value (orientation, variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockTypeId,
    pub data: u8,
}

impl Block {
    pub const AIR: Block = Block {
        kind: material::AIR,
        data: 0,
    };

    pub fn new(kind: BlockTypeId) -> Self {
        Self { kind, data: 0 }
    }

    pub fn with_data(kind: BlockTypeId, data: u8) -> Self {
        Self { kind, data }
    }
}

impl From<BlockTypeId> for Block {
    fn from(kind: BlockTypeId) -> Self {
        Block::new(kind)
    }
}

/// A block lifted out of the world together with its inventory, so it can be
/// put down elsewhere unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBlock {
    pub block: Block,
    pub container: Option<Container>,
}

// ---------------------------------------------------------------------------
// BlockWorld
// ---------------------------------------------------------------------------

/// Block access supplied by the host.
pub trait BlockWorld {
    /// The block at a location. Unloaded or empty cells read as air.
    fn block(&self, location: BlockLocation) -> Block;

    /// Change a block's type and data, keeping any container contents.
    fn set_block(&mut self, location: BlockLocation, block: Block);

    /// Replace a cell with air, discarding any contents.
    fn clear_block(&mut self, location: BlockLocation);

    /// Remove a block and its contents, leaving air.
    fn take_block(&mut self, location: BlockLocation) -> PlacedBlock;

    /// Put a previously taken block down, overwriting the cell.
    fn place_block(&mut self, location: BlockLocation, placed: PlacedBlock);

    fn container(&self, location: BlockLocation) -> Option<&Container>;

    fn container_mut(&mut self, location: BlockLocation) -> Option<&mut Container>;

    fn kind(&self, location: BlockLocation) -> BlockTypeId {
        self.block(location).kind
    }

    /// Break a block: clear the cell and return what it drops.
    fn break_block(&mut self, location: BlockLocation, catalog: &BlockCatalog) -> Vec<ItemStack> {
        let drops = catalog.drops(self.kind(location));
        self.clear_block(location);
        drops
    }

    /// Break a block and store what it drops in the container at `chest`.
    ///
    /// All-or-nothing: when there is no container or the drops do not fit,
    /// the block stays where it is and `false` is returned.
    fn break_into(&mut self, location: BlockLocation, chest: BlockLocation, catalog: &BlockCatalog) -> bool {
        let mut planned = InventoryTransaction::new();
        planned.add_all(catalog.drops(self.kind(location)));
        if !self.container(chest).is_some_and(|c| planned.fits(c)) {
            return false;
        }

        let block = self.block(location);
        let mut deposit = InventoryTransaction::new();
        deposit.add_all(self.break_block(location, catalog));
        if self.container_mut(chest).is_some_and(|c| deposit.execute(c)) {
            return true;
        }
        // The host dropped more than the catalog lists.
        tracing::warn!(?location, ?chest, "drops did not fit, block restored");
        self.set_block(location, block);
        false
    }
}

// ---------------------------------------------------------------------------
// Protection
// ---------------------------------------------------------------------------

/// Host permission and land-protection checks.
///
/// Every method defaults to allowing the action.
pub trait Protection {
    /// Whether `owner` holds a named permission node.
    fn has_permission(&self, owner: OwnerId, node: &str) -> bool {
        let _ = (owner, node);
        true
    }

    /// Whether `owner` may open the container at `location`.
    fn can_open(&self, owner: OwnerId, location: BlockLocation) -> bool {
        let _ = (owner, location);
        true
    }

    /// Whether `owner` may break the block at `location`.
    fn can_break(&self, owner: OwnerId, location: BlockLocation) -> bool {
        let _ = (owner, location);
        true
    }

    /// Whether `owner` may place `block` at `location`.
    fn can_place(&self, owner: OwnerId, location: BlockLocation, block: Block) -> bool {
        let _ = (owner, location, block);
        true
    }
}

/// Protection that allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Protection for AllowAll {}

// ---------------------------------------------------------------------------
// GridWorld
// ---------------------------------------------------------------------------

/// In-memory world: a sparse map of non-air cells plus container contents.
#[derive(Debug, Clone, Default)]
pub struct GridWorld {
    blocks: BTreeMap<BlockLocation, Block>,
    containers: BTreeMap<BlockLocation, Container>,
}

impl GridWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a container block with the given contents.
    pub fn put_container(&mut self, location: BlockLocation, block: Block, container: Container) {
        self.place_block(
            location,
            PlacedBlock {
                block,
                container: Some(container),
            },
        );
    }

    /// Number of non-air cells.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over all non-air cells in location order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockLocation, Block)> + '_ {
        self.blocks.iter().map(|(&loc, &block)| (loc, block))
    }
}

impl BlockWorld for GridWorld {
    fn block(&self, location: BlockLocation) -> Block {
        self.blocks.get(&location).copied().unwrap_or(Block::AIR)
    }

    fn set_block(&mut self, location: BlockLocation, block: Block) {
        if block.kind == material::AIR {
            self.clear_block(location);
        } else {
            self.blocks.insert(location, block);
        }
    }

    fn clear_block(&mut self, location: BlockLocation) {
        self.blocks.remove(&location);
        self.containers.remove(&location);
    }

    fn take_block(&mut self, location: BlockLocation) -> PlacedBlock {
        let block = self.blocks.remove(&location).unwrap_or(Block::AIR);
        let container = self.containers.remove(&location);
        PlacedBlock { block, container }
    }

    fn place_block(&mut self, location: BlockLocation, placed: PlacedBlock) {
        self.clear_block(location);
        if placed.block.kind == material::AIR {
            return;
        }
        self.blocks.insert(location, placed.block);
        if let Some(container) = placed.container {
            self.containers.insert(location, container);
        }
    }

    fn container(&self, location: BlockLocation) -> Option<&Container> {
        self.containers.get(&location)
    }

    fn container_mut(&mut self, location: BlockLocation) -> Option<&mut Container> {
        self.containers.get_mut(&location)
    }
}
