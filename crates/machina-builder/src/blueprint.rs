//! The builder blueprint: one pattern shared by the basic, road and bridge
//! builders.
//!
//! All vectors face east from the central base. Bridge head modules are
//! relative to the primary bridge head, not the central base.

use machina_core::blueprint::{BlockRef, Blueprint, BlueprintBuilder, ModuleId};
use machina_core::catalog::material::{CHEST, FENCE, FURNACE, IRON_BLOCK, LEVER, WOOD};
use machina_core::geometry::BlockVector;
use std::sync::Arc;

fn v(x: i32, y: i32, z: i32) -> BlockVector {
    BlockVector::new(x, y, z)
}

/// Handles into the builder blueprint.
#[derive(Debug)]
pub struct BuilderParts {
    pub blueprint: Arc<Blueprint>,

    // -- Basic and road builders --
    pub basic_main: ModuleId,
    pub basic_left: ModuleId,
    pub basic_right: ModuleId,
    pub basic_backend: ModuleId,
    pub road_backend: ModuleId,

    pub basic_chest: BlockRef,
    pub basic_furnace: BlockRef,
    pub road_furnace: BlockRef,
    pub road_chest: BlockRef,
    pub basic_head: BlockRef,
    pub basic_head_left: BlockRef,
    pub basic_head_right: BlockRef,

    // -- Bridge builder --
    pub bridge_main: ModuleId,
    pub bridge_left: ModuleId,
    pub bridge_right: ModuleId,
    pub bridge_head: ModuleId,
    pub bridge_head_left: ModuleId,
    pub bridge_head_right: ModuleId,

    pub bridge_supply_chest: BlockRef,
    pub bridge_pattern_chest: BlockRef,
    pub bridge_furnace: BlockRef,
    pub bridge_head_block: BlockRef,
    pub bridge_head_left_block: BlockRef,
    pub bridge_head_right_block: BlockRef,
}

impl BuilderParts {
    pub fn new() -> Self {
        let mut b = BlueprintBuilder::new("builder");

        let basic_main = b.new_module();
        let basic_left = b.new_module();
        let basic_right = b.new_module();
        let basic_backend = b.new_module();
        let road_backend = b.new_module();

        b.add_key(v(0, 1, 0), LEVER, basic_main);
        b.add_key(v(0, 0, 0), WOOD, basic_main);
        let basic_head = b.add(v(1, 0, 0), IRON_BLOCK, basic_main);
        let basic_chest = b.add(v(1, 1, 0), CHEST, basic_main);

        let basic_furnace = b.add_key(v(-1, 0, 0), FURNACE, basic_backend);

        let road_furnace = b.add_key(v(-2, 0, 0), FURNACE, road_backend);
        b.add_key(v(-1, 0, 0), WOOD, road_backend);
        let road_chest = b.add_key(v(-1, 1, 0), CHEST, road_backend);

        let basic_head_left = b.add_key(v(1, 0, -1), IRON_BLOCK, basic_left);
        b.add(v(0, 0, -1), WOOD, basic_left);

        let basic_head_right = b.add_key(v(1, 0, 1), IRON_BLOCK, basic_right);
        b.add(v(0, 0, 1), WOOD, basic_right);

        let bridge_main = b.new_module();
        let bridge_left = b.new_module();
        let bridge_right = b.new_module();
        let bridge_head = b.new_module();
        let bridge_head_left = b.new_module();
        let bridge_head_right = b.new_module();

        b.add_key(v(0, 1, 0), LEVER, bridge_main);
        b.add_key(v(0, 0, 0), WOOD, bridge_main);
        b.add_key(v(1, 0, 0), WOOD, bridge_main);
        b.add_key(v(-1, 0, 0), WOOD, bridge_main);
        let bridge_furnace = b.add_key(v(-2, 0, 0), FURNACE, bridge_main);
        let bridge_supply_chest = b.add(v(1, 1, 0), CHEST, bridge_main);
        let bridge_pattern_chest = b.add(v(-1, 1, 0), CHEST, bridge_main);

        b.add_key(v(0, 0, -1), WOOD, bridge_left);
        b.add(v(1, 0, -1), WOOD, bridge_left);

        b.add_key(v(0, 0, 1), WOOD, bridge_right);
        b.add(v(1, 0, 1), WOOD, bridge_right);

        let bridge_head_block = b.add_key(v(0, 0, 0), IRON_BLOCK, bridge_head);
        b.add(v(0, 1, 0), FENCE, bridge_head);
        b.add(v(0, 2, 0), FENCE, bridge_head);

        let bridge_head_left_block = b.add_key(v(0, 0, -1), IRON_BLOCK, bridge_head_left);
        b.add(v(0, 1, -1), FENCE, bridge_head_left);
        b.add(v(0, 2, -1), FENCE, bridge_head_left);

        let bridge_head_right_block = b.add_key(v(0, 0, 1), IRON_BLOCK, bridge_head_right);
        b.add(v(0, 1, 1), FENCE, bridge_head_right);
        b.add(v(0, 2, 1), FENCE, bridge_head_right);

        let blueprint = match b.build() {
            Ok(bp) => bp,
            Err(e) => unreachable!("builder blueprint is invalid: {e}"),
        };

        Self {
            blueprint: Arc::new(blueprint),
            basic_main,
            basic_left,
            basic_right,
            basic_backend,
            road_backend,
            basic_chest,
            basic_furnace,
            road_furnace,
            road_chest,
            basic_head,
            basic_head_left,
            basic_head_right,
            bridge_main,
            bridge_left,
            bridge_right,
            bridge_head,
            bridge_head_left,
            bridge_head_right,
            bridge_supply_chest,
            bridge_pattern_chest,
            bridge_furnace,
            bridge_head_block,
            bridge_head_left_block,
            bridge_head_right_block,
        }
    }
}

impl Default for BuilderParts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_modules_are_registered() {
        let parts = BuilderParts::new();
        assert_eq!(parts.blueprint.module_count(), 11);
        assert_eq!(parts.blueprint.lever_vector(), v(0, 1, 0));
    }

    #[test]
    fn primary_head_is_trusted() {
        let parts = BuilderParts::new();
        assert!(!parts.blueprint.block(parts.basic_head).key);
        assert!(parts.blueprint.block(parts.basic_furnace).key);
    }

    #[test]
    fn every_module_has_a_key_block() {
        let parts = BuilderParts::new();
        for m in 0..parts.blueprint.module_count() {
            let module = ModuleId(m as u16);
            assert!(
                parts
                    .blueprint
                    .module(module)
                    .iter()
                    .any(|&r| parts.blueprint.block(r).key),
                "module {module:?} has no key block"
            );
        }
    }
}
