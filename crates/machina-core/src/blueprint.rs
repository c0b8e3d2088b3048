//! Blueprint pattern model: named modules of block descriptors, with every
//! descriptor's offset precomputed for all four rotations.
//!
//! A blueprint is authored facing east, relative to a single anchor block.
//! Each descriptor is either a *key* block, which is read whenever the module
//! is detected or re-verified, or a plain block, which is trusted to be
//! present once the module's key blocks hold.

use crate::catalog::{BlockCatalog, material};
use crate::geometry::{BlockLocation, BlockRotation, BlockVector};
use crate::id::BlockTypeId;
use crate::world::BlockWorld;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifies a module within one blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u16);

/// Handle to one block descriptor within one blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRef(pub u16);

/// A block descriptor with its offset precomputed for every rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintBlock {
    pub kind: BlockTypeId,
    pub key: bool,
    pub module: ModuleId,
    vectors: [BlockVector; 4],
}

impl BlueprintBlock {
    fn new(vector: BlockVector, kind: BlockTypeId, key: bool, module: ModuleId) -> Self {
        Self {
            kind,
            key,
            module,
            vectors: BlockRotation::all().map(|r| vector.rotated(r)),
        }
    }

    /// Offset from the anchor under a rotation.
    pub fn vector(&self, rotation: BlockRotation) -> BlockVector {
        self.vectors[rotation.index()]
    }
}

/// Errors from validating a finished blueprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlueprintError {
    #[error("blueprint '{0}' has no lever")]
    NoLever(String),
    #[error("lever in module {module:?} of '{name}' is not a key block")]
    LeverNotKey { name: String, module: ModuleId },
    #[error("levers of '{0}' do not share one location")]
    LeverMismatch(String),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates modules and descriptors, then freezes them into a [`Blueprint`].
#[derive(Debug, Clone)]
pub struct BlueprintBuilder {
    name: String,
    blocks: Vec<BlueprintBlock>,
    modules: Vec<Vec<BlockRef>>,
}

impl BlueprintBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn new_module(&mut self) -> ModuleId {
        let id = ModuleId(self.modules.len() as u16);
        self.modules.push(Vec::new());
        id
    }

    /// Add a key block to a module.
    ///
    /// # Panics
    ///
    /// Panics if `module` was not created by this builder.
    pub fn add_key(&mut self, vector: BlockVector, kind: BlockTypeId, module: ModuleId) -> BlockRef {
        self.push(vector, kind, true, module)
    }

    /// Add a non-key block to a module.
    ///
    /// # Panics
    ///
    /// Panics if `module` was not created by this builder.
    pub fn add(&mut self, vector: BlockVector, kind: BlockTypeId, module: ModuleId) -> BlockRef {
        self.push(vector, kind, false, module)
    }

    fn push(&mut self, vector: BlockVector, kind: BlockTypeId, key: bool, module: ModuleId) -> BlockRef {
        let name = &self.name;
        let Some(members) = self.modules.get_mut(module.0 as usize) else {
            panic!("module {module:?} does not belong to blueprint '{name}'");
        };
        let block = BlockRef(self.blocks.len() as u16);
        members.push(block);
        self.blocks.push(BlueprintBlock::new(vector, kind, key, module));
        block
    }

    /// Validate the lever and freeze the blueprint.
    pub fn build(self) -> Result<Blueprint, BlueprintError> {
        let mut lever: Option<BlockVector> = None;
        for block in self.blocks.iter().filter(|b| b.kind == material::LEVER) {
            if !block.key {
                return Err(BlueprintError::LeverNotKey {
                    name: self.name,
                    module: block.module,
                });
            }
            let v = block.vector(BlockRotation::Rotate0);
            match lever {
                Some(existing) if existing != v => {
                    return Err(BlueprintError::LeverMismatch(self.name));
                }
                _ => lever = Some(v),
            }
        }
        let Some(lever) = lever else {
            return Err(BlueprintError::NoLever(self.name));
        };

        Ok(Blueprint {
            name: self.name,
            blocks: self.blocks,
            modules: self.modules,
            lever,
        })
    }
}

// ---------------------------------------------------------------------------
// Blueprint
// ---------------------------------------------------------------------------

/// The frozen pattern for one machine type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    name: String,
    blocks: Vec<BlueprintBlock>,
    modules: Vec<Vec<BlockRef>>,
    lever: BlockVector,
}

impl Blueprint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block(&self, block: BlockRef) -> &BlueprintBlock {
        &self.blocks[block.0 as usize]
    }

    /// Descriptors of a module in the order they were added.
    pub fn module(&self, module: ModuleId) -> &[BlockRef] {
        &self.modules[module.0 as usize]
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Offset of the activation lever from the anchor (unrotated).
    pub fn lever_vector(&self) -> BlockVector {
        self.lever
    }

    /// World location of a descriptor for a structure anchored at `anchor`.
    pub fn location(&self, anchor: BlockLocation, rotation: BlockRotation, block: BlockRef) -> BlockLocation {
        anchor + self.block(block).vector(rotation)
    }

    /// All descriptors of the given modules.
    pub fn blocks_of<'a>(
        &'a self,
        modules: &'a [ModuleId],
    ) -> impl Iterator<Item = (BlockRef, &'a BlueprintBlock)> + 'a {
        modules
            .iter()
            .flat_map(|&m| self.module(m).iter())
            .map(|&r| (r, self.block(r)))
    }

    /// Whether every key block of `module` is in place. Non-key blocks are
    /// not read.
    pub fn module_matches<W: BlockWorld + ?Sized>(
        &self,
        world: &W,
        catalog: &BlockCatalog,
        anchor: BlockLocation,
        rotation: BlockRotation,
        module: ModuleId,
    ) -> bool {
        self.module(module).iter().all(|&r| {
            let block = self.block(r);
            !block.key || catalog.matches(block.kind, world.kind(anchor + block.vector(rotation)))
        })
    }

    /// The first key block of `modules` that no longer holds, if any.
    pub fn first_broken_key<W: BlockWorld + ?Sized>(
        &self,
        world: &W,
        catalog: &BlockCatalog,
        anchor: BlockLocation,
        rotation: BlockRotation,
        modules: &[ModuleId],
    ) -> Option<BlockRef> {
        self.blocks_of(modules)
            .filter(|(_, b)| b.key)
            .find(|(_, b)| !catalog.matches(b.kind, world.kind(anchor + b.vector(rotation))))
            .map(|(r, _)| r)
    }
}

/// A list of offsets precomputed for every rotation, for patterns that are
/// not structure (drill targets, scan lines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedPattern {
    rotated: [Vec<BlockVector>; 4],
}

impl RotatedPattern {
    pub fn new(base: &[BlockVector]) -> Self {
        Self {
            rotated: BlockRotation::all().map(|r| base.iter().map(|v| v.rotated(r)).collect()),
        }
    }

    pub fn get(&self, rotation: BlockRotation) -> &[BlockVector] {
        &self.rotated[rotation.index()]
    }

    pub fn len(&self) -> usize {
        self.rotated[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotated[0].is_empty()
    }
}
