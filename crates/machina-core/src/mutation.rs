//! Moving and turning whole structures as one edit.
//!
//! A structure is one or more [`Section`]s sharing a rotation: the root first,
//! then any sub-structures hung off it. Every operation checks all
//! destinations before touching the world, then lifts every block (plain
//! blocks first, key blocks last) and puts them down again (key blocks first).
//! Nothing suspends between the two halves, so no other machine can observe a
//! half-moved structure.

use crate::blueprint::{Blueprint, ModuleId};
use crate::catalog::BlockCatalog;
use crate::geometry::{BlockLocation, BlockRotation, BlockVector};
use crate::world::{BlockWorld, PlacedBlock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An anchored group of blueprint modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Section {
    pub anchor: BlockLocation,
    pub modules: Vec<ModuleId>,
}

impl Section {
    pub fn new(anchor: BlockLocation, modules: Vec<ModuleId>) -> Self {
        Self { anchor, modules }
    }

    /// World locations of every block in this section.
    pub fn locations<'a>(
        &'a self,
        blueprint: &'a Blueprint,
        rotation: BlockRotation,
    ) -> impl Iterator<Item = BlockLocation> + 'a {
        blueprint
            .blocks_of(&self.modules)
            .map(move |(_, b)| self.anchor + b.vector(rotation))
    }
}

/// Errors from structural mutation. The world is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("destination {location:?} is obstructed")]
    Collision { location: BlockLocation },
}

struct Move {
    from: BlockLocation,
    to: BlockLocation,
    key: bool,
}

/// Shift every section by `offset`.
pub fn translate(
    world: &mut dyn BlockWorld,
    catalog: &BlockCatalog,
    blueprint: &Blueprint,
    rotation: BlockRotation,
    sections: &mut [Section],
    offset: BlockVector,
) -> Result<(), MutationError> {
    let mut moves = Vec::new();
    for section in sections.iter() {
        for (_, block) in blueprint.blocks_of(&section.modules) {
            let from = section.anchor + block.vector(rotation);
            moves.push(Move {
                from,
                to: from + offset,
                key: block.key,
            });
        }
    }

    relocate(world, catalog, moves)?;
    for section in sections.iter_mut() {
        section.anchor = section.anchor + offset;
    }
    Ok(())
}

/// Turn every section from rotation `from` to rotation `to` about the root
/// (first) section's anchor. Child anchors swing around the root anchor.
pub fn rotate(
    world: &mut dyn BlockWorld,
    catalog: &BlockCatalog,
    blueprint: &Blueprint,
    from: BlockRotation,
    to: BlockRotation,
    sections: &mut [Section],
) -> Result<(), MutationError> {
    let Some(root) = sections.first().map(|s| s.anchor) else {
        return Ok(());
    };
    let delta = to.relative_to(from);
    let anchors: Vec<BlockLocation> = sections
        .iter()
        .map(|s| root + s.anchor.offset_from(root).rotated(delta))
        .collect();

    let mut moves = Vec::new();
    for (section, &new_anchor) in sections.iter().zip(&anchors) {
        for (_, block) in blueprint.blocks_of(&section.modules) {
            moves.push(Move {
                from: section.anchor + block.vector(from),
                to: new_anchor + block.vector(to),
                key: block.key,
            });
        }
    }

    relocate(world, catalog, moves)?;
    for (section, anchor) in sections.iter_mut().zip(anchors) {
        section.anchor = anchor;
    }
    Ok(())
}

fn relocate(world: &mut dyn BlockWorld, catalog: &BlockCatalog, mut moves: Vec<Move>) -> Result<(), MutationError> {
    let vacated: BTreeSet<BlockLocation> = moves.iter().map(|m| m.from).collect();
    for m in &moves {
        if !vacated.contains(&m.to) && !catalog.is_replaceable(world.kind(m.to)) {
            return Err(MutationError::Collision { location: m.to });
        }
    }

    // Plain blocks leave first, key blocks last.
    moves.sort_by_key(|m| m.key);
    let lifted: Vec<(BlockLocation, bool, PlacedBlock)> = moves
        .iter()
        .map(|m| (m.to, m.key, world.take_block(m.from)))
        .collect();

    // Key blocks arrive first.
    for (to, _, placed) in lifted.iter().filter(|(_, key, _)| *key) {
        world.place_block(*to, placed.clone());
    }
    for (to, placed) in lifted
        .into_iter()
        .filter(|(_, key, _)| !*key)
        .map(|(to, _, placed)| (to, placed))
    {
        world.place_block(to, placed);
    }
    Ok(())
}
