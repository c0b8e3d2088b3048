//! Drill machine for Machina.
//!
//! A drill is a gold anchor block on a wooden base, with a lever on top, a
//! furnace behind the base, a chest behind the anchor and an iron head in
//! front. Once started it bores a 3x3 tunnel: it breaks every drillable block
//! of the face two blocks ahead, depositing the drops in its chest, then
//! rolls one block forward and starts on the next face.
//!
//! # Layout (facing east, anchor at the origin)
//!
//! ```text
//!   y=1        lever
//!   y=0  chest anchor head  . [face]
//!   y=-1 furnace base       . [face]
//! ```
//!
//! Bases also sit at either side of the central base. Only the lever, anchor,
//! central base and furnace are key blocks.

mod state;

pub use state::{DrillBehavior, DrillState};

use machina_core::blueprint::{BlockRef, Blueprint, BlueprintBuilder, ModuleId, RotatedPattern};
use machina_core::catalog::material::{CHEST, FURNACE, GOLD_BLOCK, IRON_BLOCK, LEVER, WOOD};
use machina_core::config::MachinaConfig;
use machina_core::detect::{Candidate, Detection, Detector, Matched, Requirement};
use machina_core::geometry::BlockVector;
use machina_core::scheduler::MachineKind;
use machina_core::behavior::Behavior;
use std::sync::Arc;

pub const PERMISSION: &str = "machinadrill.activate";

/// The face the drill bores through, in the order its blocks are broken.
const DRILL_FACE: [BlockVector; 9] = [
    BlockVector::new(2, 0, 0),
    BlockVector::new(2, 1, 0),
    BlockVector::new(2, 0, 1),
    BlockVector::new(2, -1, 0),
    BlockVector::new(2, 0, -1),
    BlockVector::new(2, 1, -1),
    BlockVector::new(2, 1, 1),
    BlockVector::new(2, -1, 1),
    BlockVector::new(2, -1, -1),
];

/// Handles into the drill blueprint shared by the kind and its behaviors.
#[derive(Debug)]
pub struct DrillParts {
    pub blueprint: Arc<Blueprint>,
    pub main: ModuleId,
    pub central_base: BlockRef,
    pub furnace: BlockRef,
    pub chest: BlockRef,
    pub head: BlockRef,
    pub face: RotatedPattern,
}

impl DrillParts {
    fn new() -> Self {
        let mut b = BlueprintBuilder::new("drill");
        let main = b.new_module();
        b.add_key(BlockVector::new(0, 1, 0), LEVER, main);
        b.add_key(BlockVector::ZERO, GOLD_BLOCK, main);
        let central_base = b.add_key(BlockVector::new(0, -1, 0), WOOD, main);
        // The furnace behind the base fixes the heading.
        let furnace = b.add_key(BlockVector::new(-1, -1, 0), FURNACE, main);

        let chest = b.add(BlockVector::new(-1, 0, 0), CHEST, main);
        let head = b.add(BlockVector::new(1, 0, 0), IRON_BLOCK, main);
        b.add(BlockVector::new(0, -1, 1), WOOD, main);
        b.add(BlockVector::new(0, -1, -1), WOOD, main);

        let blueprint = match b.build() {
            Ok(bp) => bp,
            Err(e) => unreachable!("drill blueprint is invalid: {e}"),
        };
        Self {
            blueprint: Arc::new(blueprint),
            main,
            central_base,
            furnace,
            chest,
            head,
            face: RotatedPattern::new(&DRILL_FACE),
        }
    }
}

/// The drill machine kind.
#[derive(Debug)]
pub struct DrillKind {
    parts: Arc<DrillParts>,
    detector: Detector<()>,
}

impl Default for DrillKind {
    fn default() -> Self {
        Self::new()
    }
}

impl DrillKind {
    pub fn new() -> Self {
        let parts = Arc::new(DrillParts::new());
        let main = parts.main;
        let detector = Detector::new(Arc::clone(&parts.blueprint))
            .guard(BlockVector::ZERO, Requirement::Is(GOLD_BLOCK))
            .guard(BlockVector::new(0, -1, 0), Requirement::Is(WOOD))
            .guard(BlockVector::new(0, -2, 0), Requirement::Solid)
            .candidate(Candidate::new("drill", move |p| {
                p.module(main).then(|| Matched::new((), vec![main]))
            }));
        Self { parts, detector }
    }

    pub fn parts(&self) -> &DrillParts {
        &self.parts
    }
}

impl MachineKind for DrillKind {
    type Variant = ();

    fn name(&self) -> &'static str {
        "drill"
    }

    fn permission(&self) -> &'static str {
        PERMISSION
    }

    fn detector(&self) -> &Detector<()> {
        &self.detector
    }

    fn activation_limit(&self, config: &MachinaConfig) -> Option<u32> {
        config.drill.max_active
    }

    fn fuel_block(&self, _: ()) -> BlockRef {
        self.parts.furnace
    }

    fn containers(&self, _: ()) -> Vec<BlockRef> {
        vec![self.parts.furnace, self.parts.chest]
    }

    fn behavior(&self, _: &Detection<()>) -> Box<dyn Behavior> {
        Box::new(DrillBehavior::new(Arc::clone(&self.parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_core::catalog::material::*;
    use machina_core::geometry::{BlockLocation, BlockRotation, Facing};
    use machina_core::test_utils::*;
    use machina_core::world::{Block, BlockWorld, GridWorld};

    pub(crate) fn place_drill(world: &mut GridWorld, anchor: BlockLocation, rotation: BlockRotation, coal: u32) {
        let parts = DrillParts::new();
        let bp = &parts.blueprint;
        fill(
            world,
            anchor + BlockVector::new(-3, -2, -3),
            anchor + BlockVector::new(3, -2, 3),
            STONE,
        );
        for &r in bp.module(parts.main) {
            let at = bp.location(anchor, rotation, r);
            match bp.block(r).kind {
                FURNACE => world.put_container(at, Block::new(FURNACE), furnace_with(coal)),
                CHEST => world.put_container(at, Block::new(CHEST), chest_with(&[])),
                kind => world.set_block(at, Block::new(kind)),
            }
        }
    }

    #[test]
    fn detects_every_heading() {
        let kind = DrillKind::new();
        let catalog = machina_core::catalog::BlockCatalog::standard();
        for rotation in BlockRotation::all() {
            let mut world = GridWorld::new();
            let anchor = BlockLocation::new(5, 70, 5);
            place_drill(&mut world, anchor, rotation, 1);
            let found = kind.detector().detect(&world, &catalog, anchor).unwrap();
            assert_eq!(found.rotation, rotation);
            assert_eq!(found.modules(), &[kind.parts().main]);
        }
    }

    #[test]
    fn needs_ground_under_the_base() {
        let kind = DrillKind::new();
        let catalog = machina_core::catalog::BlockCatalog::standard();
        let mut world = GridWorld::new();
        let anchor = BlockLocation::new(0, 70, 0);
        place_drill(&mut world, anchor, BlockRotation::Rotate0, 1);
        world.clear_block(anchor + BlockVector::new(0, -2, 0));
        assert!(kind.detector().detect(&world, &catalog, anchor).is_none());
    }

    #[test]
    fn head_and_chest_are_trusted() {
        let kind = DrillKind::new();
        let catalog = machina_core::catalog::BlockCatalog::standard();
        let mut world = GridWorld::new();
        let anchor = BlockLocation::new(0, 70, 0);
        place_drill(&mut world, anchor, BlockRotation::Rotate90, 1);
        world.clear_block(anchor.step(Facing::South, 1));
        assert!(kind.detector().detect(&world, &catalog, anchor).is_some());
    }

    #[test]
    fn face_is_two_blocks_ahead() {
        let parts = DrillParts::new();
        for rotation in BlockRotation::all() {
            let forward = rotation.yaw_facing().vector().scaled(2);
            let face = parts.face.get(rotation);
            assert_eq!(face.len(), 9);
            assert_eq!(face[0], forward);
            assert!(face.iter().all(|v| (v.x - forward.x) * forward.x + (v.z - forward.z) * forward.z == 0));
        }
    }
}
