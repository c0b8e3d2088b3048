use crate::DrillParts;
use machina_core::behavior::{Behavior, Deactivation, Estimate, Flow, settle};
use machina_core::geometry::{BlockLocation, Facing};
use machina_core::id::BlockTypeId;
use machina_core::machine::Machine;
use machina_core::mutation::MutationError;
use machina_core::sim::{Env, Ticks};
use machina_core::transaction::InventoryTransaction;
use std::sync::Arc;

/// A block picked for breaking, with the type it had when picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub location: BlockLocation,
    pub kind: BlockTypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillState {
    /// Break the next drillable block of the face ahead.
    Drill { target: Option<Target> },
    /// Advance one block.
    Move,
}

#[derive(Debug)]
pub struct DrillBehavior {
    parts: Arc<DrillParts>,
    state: DrillState,
}

impl DrillBehavior {
    pub fn new(parts: Arc<DrillParts>) -> Self {
        Self {
            parts,
            state: DrillState::Drill { target: None },
        }
    }

    pub fn state(&self) -> DrillState {
        self.state
    }

    fn next_target(&self, machine: &Machine, env: &Env<'_>) -> Option<Target> {
        self.parts
            .face
            .get(machine.rotation())
            .iter()
            .map(|&v| machine.anchor() + v)
            .map(|location| Target {
                location,
                kind: env.world().kind(location),
            })
            .find(|t| env.catalog.is_drillable(t.kind))
    }

    fn drill(&mut self, target: Target, machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        let Target { location, kind } = target;
        if env.world.kind(location) != kind {
            return Flow::Deactivate(Deactivation::StaleTarget { location });
        }
        if !env.protection.can_break(machine.owner(), location) {
            return Flow::Deactivate(Deactivation::Protected { location });
        }

        let chest = machine.location(self.parts.chest);
        let mut deposit = InventoryTransaction::new();
        deposit.add_all(env.catalog.drops(kind));
        match env.world.container(chest) {
            None => return Flow::Deactivate(Deactivation::StaleTarget { location: chest }),
            // Full chest: leave the block and try again next cycle.
            Some(container) if !deposit.fits(container) => {
                tracing::debug!(machine = ?machine.id(), ?chest, "drill chest full");
                return Flow::Continue;
            }
            Some(_) => {}
        }

        let cost = env.catalog.drill_time(kind);
        if !machine.use_energy(env, cost) {
            return Flow::Deactivate(Deactivation::OutOfFuel);
        }
        if !env.world.break_into(location, chest, env.catalog) {
            tracing::debug!(machine = ?machine.id(), ?location, "drill target kept");
        }
        Flow::Continue
    }

    fn advance(&mut self, machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        let forward = machine.facing().vector();
        let ground = machine.location(self.parts.central_base).step(Facing::Down, 1) + forward;
        if !env.catalog.is_solid(env.world.kind(ground)) {
            return Flow::Deactivate(Deactivation::NoGround { location: ground });
        }

        let cost = env.config.drill.move_delay;
        if !machine.use_energy(env, cost) {
            return Flow::Deactivate(Deactivation::OutOfFuel);
        }
        match machine.translate(env, forward) {
            Ok(()) => {
                self.state = DrillState::Drill { target: None };
                Flow::Continue
            }
            Err(MutationError::Collision { location }) => {
                tracing::debug!(machine = ?machine.id(), ?location, "drill blocked");
                Flow::Deactivate(Deactivation::Obstructed { location })
            }
        }
    }
}

impl Behavior for DrillBehavior {
    fn enqueue(&mut self, machine: &Machine, env: &Env<'_>) -> Result<Ticks, Deactivation> {
        let next = self.next_target(machine, env);
        let move_delay = env.config.drill.move_delay;
        let catalog = env.catalog;
        settle(&mut self.state, |state| match state {
            DrillState::Drill { target } => match next {
                Some(t) => {
                    *target = Some(t);
                    Estimate::Ready(catalog.drill_time(t.kind))
                }
                None => Estimate::Switch(DrillState::Move),
            },
            // A turn or a placed block can put work back in front of the drill.
            DrillState::Move if next.is_some() => Estimate::Switch(DrillState::Drill { target: None }),
            DrillState::Move => Estimate::Ready(move_delay),
        })
    }

    fn run(&mut self, machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        match self.state {
            DrillState::Drill { target: Some(target) } => self.drill(target, machine, env),
            // Nothing was picked; the next enqueue decides.
            DrillState::Drill { target: None } => Flow::Continue,
            DrillState::Move => self.advance(machine, env),
        }
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            DrillState::Drill { .. } => "drill",
            DrillState::Move => "move",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DrillKind;
    use crate::tests::place_drill;
    use machina_core::catalog::material::*;
    use machina_core::geometry::{BlockRotation, BlockVector};
    use machina_core::id::OwnerId;
    use machina_core::scheduler::{Activation, ActivationRequest, Scheduler};
    use machina_core::test_utils::*;
    use machina_core::world::{Block, BlockWorld};

    const OWNER: OwnerId = OwnerId(3);

    fn setup(coal: u32) -> (TestHost, Scheduler, DrillKind, BlockLocation) {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 70, 0);
        place_drill(&mut host.world, anchor, BlockRotation::Rotate0, coal);
        (host, Scheduler::new(), DrillKind::new(), anchor)
    }

    fn start(host: &mut TestHost, scheduler: &mut Scheduler, kind: &DrillKind, anchor: BlockLocation) {
        let outcome = scheduler.activate(kind, &ActivationRequest::on(OWNER, anchor), &mut host.env());
        assert!(matches!(outcome, Ok(Activation::Started(_))), "{outcome:?}");
    }

    #[test]
    fn drills_stone_into_chest() {
        let (mut host, mut scheduler, kind, anchor) = setup(1);
        let face = anchor + BlockVector::new(2, 0, 0);
        host.world.set_block(face, Block::new(STONE));
        start(&mut host, &mut scheduler, &kind, anchor);

        run_ticks(&mut scheduler, &mut host, 15);
        assert_eq!(host.world.kind(face), AIR);
        let chest = anchor + BlockVector::new(-1, 0, 0);
        assert_eq!(count(&host.world, chest, COBBLESTONE.as_item()), 1);
        assert_eq!(count(&host.world, anchor + BlockVector::new(-1, -1, 0), COAL), 0);
    }

    #[test]
    fn full_chest_skips_the_cycle() {
        let (mut host, mut scheduler, kind, anchor) = setup(1);
        let face = anchor + BlockVector::new(2, 1, 0);
        host.world.set_block(face, Block::new(DIRT));
        let chest = anchor + BlockVector::new(-1, 0, 0);
        host.world
            .put_container(chest, Block::new(CHEST), full_chest(COBBLESTONE.as_item()));
        start(&mut host, &mut scheduler, &kind, anchor);

        run_ticks(&mut scheduler, &mut host, 30);
        assert_eq!(host.world.kind(face), DIRT);
        assert_eq!(scheduler.len(), 1);
        // No fuel was burnt for the skipped cycles.
        assert_eq!(count(&host.world, anchor + BlockVector::new(-1, -1, 0), COAL), 1);
    }

    #[test]
    fn empty_furnace_leaves_target_untouched() {
        let (mut host, mut scheduler, kind, anchor) = setup(0);
        let face = anchor + BlockVector::new(2, 0, 0);
        host.world.set_block(face, Block::new(STONE));
        start(&mut host, &mut scheduler, &kind, anchor);

        run_ticks(&mut scheduler, &mut host, 15);
        assert!(scheduler.is_empty());
        assert_eq!(host.world.kind(face), STONE);
        assert_eq!(count(&host.world, anchor + BlockVector::new(-1, 0, 0), COBBLESTONE.as_item()), 0);
    }

    #[test]
    fn clear_face_advances_one_block() {
        let (mut host, mut scheduler, kind, anchor) = setup(1);
        start(&mut host, &mut scheduler, &kind, anchor);
        let id = scheduler.ids().next().unwrap();
        assert_eq!(scheduler.state_name(id), Some("move"));

        let delay = host.config.drill.move_delay;
        run_ticks(&mut scheduler, &mut host, delay);
        let moved = anchor.step(Facing::East, 1);
        assert_eq!(scheduler.machine(id).unwrap().anchor(), moved);
        assert_eq!(host.world.kind(moved), GOLD_BLOCK);
        assert_eq!(host.world.kind(anchor), CHEST);
        assert_eq!(host.world.kind(moved + BlockVector::new(-1, -1, 0)), BURNING_FURNACE);
    }

    #[test]
    fn stops_at_the_edge_of_the_ground() {
        let (mut host, mut scheduler, kind, anchor) = setup(1);
        host.world.clear_block(anchor + BlockVector::new(1, -2, 0));
        start(&mut host, &mut scheduler, &kind, anchor);

        let delay = host.config.drill.move_delay;
        run_ticks(&mut scheduler, &mut host, delay);
        assert!(scheduler.is_empty());
        assert_eq!(host.world.kind(anchor), GOLD_BLOCK);
        assert!(scheduler.drain_events().iter().any(|e| matches!(
            e,
            machina_core::event::MachineEvent::Deactivated {
                reason: Deactivation::NoGround { .. },
                ..
            }
        )));
    }

    #[test]
    fn protected_blocks_stop_the_drill() {
        let (mut host, mut scheduler, kind, anchor) = setup(1);
        let face = anchor + BlockVector::new(2, 0, 0);
        host.world.set_block(face, Block::new(STONE));
        host.protection.locked.insert(face);
        start(&mut host, &mut scheduler, &kind, anchor);

        run_ticks(&mut scheduler, &mut host, 15);
        assert!(scheduler.is_empty());
        assert_eq!(host.world.kind(face), STONE);
    }

    #[test]
    fn enqueue_is_idempotent() {
        let (mut host, _, kind, anchor) = setup(1);
        host.world.set_block(anchor + BlockVector::new(2, -1, 1), Block::new(GRAVEL));
        let env = host.env();
        let detection = machina_core::scheduler::MachineKind::detector(&kind)
            .detect(env.world(), env.catalog, anchor)
            .unwrap();
        let machine = Machine::new(
            "drill",
            Arc::clone(&kind.parts().blueprint),
            detection.rotation,
            detection.root.clone(),
            None,
            OWNER,
            kind.parts().furnace,
            None,
        );
        let mut behavior = DrillBehavior::new(Arc::clone(&kind.parts));
        let first = behavior.enqueue(&machine, &env);
        let state = behavior.state();
        assert_eq!(behavior.enqueue(&machine, &env), first);
        assert_eq!(behavior.state(), state);
        assert_eq!(first, Ok(7));
    }
}
