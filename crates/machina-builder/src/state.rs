use crate::{BuilderParts, BuilderVariant};
use machina_core::behavior::{Behavior, Deactivation, Estimate, Flow, settle};
use machina_core::catalog::BlockCatalog;
use machina_core::geometry::{BlockLocation, Facing};
use machina_core::id::{BlockTypeId, ItemTypeId};
use machina_core::machine::Machine;
use machina_core::mutation::MutationError;
use machina_core::sim::{Env, Ticks};
use machina_core::transaction::InventoryTransaction;
use machina_core::world::{Block, BlockWorld};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderState {
    /// Dig up the ground under the heads and pave it with supply blocks.
    Road { targets: Vec<BlockLocation> },
    /// Fill the empty cells under the heads.
    Build { targets: Vec<BlockLocation> },
    /// Advance one block.
    Move,
}

impl BuilderState {
    fn initial(variant: BuilderVariant) -> Self {
        match variant {
            BuilderVariant::Road => BuilderState::Road { targets: Vec::new() },
            BuilderVariant::Basic | BuilderVariant::Bridge => BuilderState::Build { targets: Vec::new() },
        }
    }
}

/// A supply slot to take one block from.
#[derive(Debug, Clone, Copy)]
struct Material {
    slot: usize,
    block: BlockTypeId,
}

fn accepts(catalog: &BlockCatalog, pattern: Option<ItemTypeId>, item: ItemTypeId) -> bool {
    catalog.is_building_block(item) && pattern.is_none_or(|p| p == item)
}

#[derive(Debug)]
pub struct BuilderBehavior {
    parts: Arc<BuilderParts>,
    variant: BuilderVariant,
    state: BuilderState,
}

impl BuilderBehavior {
    pub fn new(parts: Arc<BuilderParts>, variant: BuilderVariant) -> Self {
        Self {
            parts,
            variant,
            state: BuilderState::initial(variant),
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn variant(&self) -> BuilderVariant {
        self.variant
    }

    /// The cells under every head the machine carries.
    fn targets(&self, machine: &Machine) -> Vec<BlockLocation> {
        let p = &self.parts;
        let heads: Vec<BlockLocation> = match self.variant {
            BuilderVariant::Basic | BuilderVariant::Road => [
                (p.basic_main, p.basic_head),
                (p.basic_left, p.basic_head_left),
                (p.basic_right, p.basic_head_right),
            ]
            .into_iter()
            .filter(|&(m, _)| machine.has_module(m))
            .map(|(_, block)| machine.location(block))
            .collect(),
            BuilderVariant::Bridge => {
                let Some(head) = machine.head() else {
                    return Vec::new();
                };
                [
                    (p.bridge_head, p.bridge_head_block),
                    (p.bridge_head_left, p.bridge_head_left_block),
                    (p.bridge_head_right, p.bridge_head_right_block),
                ]
                .into_iter()
                .filter(|(m, _)| head.modules.contains(m))
                .filter_map(|(_, block)| machine.head_location(block))
                .collect()
            }
        };
        heads.into_iter().map(|h| h.step(Facing::Down, 1)).collect()
    }

    fn supply_location(&self, machine: &Machine) -> BlockLocation {
        match self.variant {
            BuilderVariant::Bridge => machine.location(self.parts.bridge_supply_chest),
            BuilderVariant::Basic | BuilderVariant::Road => machine.location(self.parts.basic_chest),
        }
    }

    /// The block type a bridge is restricted to: its pattern chest's first stack.
    fn pattern(&self, machine: &Machine, world: &dyn BlockWorld) -> Option<ItemTypeId> {
        if self.variant != BuilderVariant::Bridge {
            return None;
        }
        let chest = world.container(machine.location(self.parts.bridge_pattern_chest))?;
        let slot = chest.find_slot(|_| true)?;
        chest.slot(slot).map(|s| s.item_type)
    }

    fn material(&self, machine: &Machine, world: &dyn BlockWorld, catalog: &BlockCatalog) -> Option<Material> {
        let pattern = self.pattern(machine, world);
        let supply = world.container(self.supply_location(machine))?;
        let slot = supply.find_slot(|s| accepts(catalog, pattern, s.item_type))?;
        let item = supply.slot(slot)?.item_type;
        Some(Material {
            slot,
            block: catalog.block_for_item(item)?,
        })
    }

    fn take_material(&self, machine: &Machine, env: &mut Env<'_>, material: Material) {
        if let Some(supply) = env.world.container_mut(self.supply_location(machine)) {
            supply.decrement_slot(material.slot);
        }
    }

    fn build(&mut self, targets: &[BlockLocation], machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        let delay = env.config.builder.build_delay;
        for &target in targets {
            // Someone else may have filled it since it was picked.
            if !env.catalog.is_replaceable(env.world.kind(target)) {
                continue;
            }
            let Some(material) = self.material(machine, env.world(), env.catalog) else {
                return Flow::Deactivate(Deactivation::OutOfMaterial);
            };
            let block = Block::new(material.block);
            if !env.protection.can_place(machine.owner(), target, block) {
                return Flow::Deactivate(Deactivation::Protected { location: target });
            }
            if !machine.use_energy(env, delay) {
                return Flow::Deactivate(Deactivation::OutOfFuel);
            }
            self.take_material(machine, env, material);
            env.world.set_block(target, block);
        }
        Flow::Continue
    }

    fn pave(&mut self, targets: &[BlockLocation], machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        let delay = env.config.builder.build_delay;
        let chest = machine.location(self.parts.road_chest);
        for &target in targets {
            let kind = env.world.kind(target);
            if !env.catalog.is_drillable(kind) {
                continue;
            }
            let Some(material) = self.material(machine, env.world(), env.catalog) else {
                self.state = BuilderState::Move;
                return Flow::Continue;
            };
            let block = Block::new(material.block);
            let owner = machine.owner();
            if !env.protection.can_break(owner, target) {
                return Flow::Deactivate(Deactivation::Protected { location: target });
            }
            if !env.protection.can_place(owner, target, block) {
                return Flow::Deactivate(Deactivation::Protected { location: target });
            }

            let mut deposit = InventoryTransaction::new();
            deposit.add_all(env.catalog.drops(kind));
            match env.world.container(chest) {
                None => return Flow::Deactivate(Deactivation::StaleTarget { location: chest }),
                Some(container) if !deposit.fits(container) => {
                    tracing::debug!(machine = ?machine.id(), ?chest, "road chest full");
                    continue;
                }
                Some(_) => {}
            }

            let cost = env.catalog.drill_time(kind) + delay;
            if !machine.use_energy(env, cost) {
                return Flow::Deactivate(Deactivation::OutOfFuel);
            }
            if !env.world.break_into(target, chest, env.catalog) {
                continue;
            }
            self.take_material(machine, env, material);
            env.world.set_block(target, block);
        }
        self.state = BuilderState::Build { targets: Vec::new() };
        Flow::Continue
    }

    fn advance(&mut self, machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        let forward = machine.facing().vector();
        let ground = machine.anchor().step(Facing::Down, 1) + forward;
        if !env.catalog.is_solid(env.world.kind(ground)) {
            return Flow::Deactivate(Deactivation::NoGround { location: ground });
        }

        let cost = env.config.builder.move_delay;
        if !machine.use_energy(env, cost) {
            return Flow::Deactivate(Deactivation::OutOfFuel);
        }
        match machine.translate(env, forward) {
            Ok(()) => {
                self.state = BuilderState::initial(self.variant);
                Flow::Continue
            }
            Err(MutationError::Collision { location }) => {
                tracing::debug!(machine = ?machine.id(), ?location, "builder blocked");
                Flow::Deactivate(Deactivation::Obstructed { location })
            }
        }
    }
}

impl Behavior for BuilderBehavior {
    fn enqueue(&mut self, machine: &Machine, env: &Env<'_>) -> Result<Ticks, Deactivation> {
        let world = env.world();
        let catalog = env.catalog;
        let config = &env.config.builder;
        let below = self.targets(machine);
        let has_material = self.material(machine, world, catalog).is_some();
        let supply = world.container(self.supply_location(machine));

        let build: Vec<BlockLocation> = below
            .iter()
            .copied()
            .filter(|&t| catalog.is_replaceable(world.kind(t)))
            .collect();
        // Cells already paved with something the supply holds are left alone.
        let road: Vec<BlockLocation> = below
            .iter()
            .copied()
            .filter(|&t| {
                let kind = world.kind(t);
                catalog.is_drillable(kind)
                    && !(catalog.is_solid(kind) && supply.is_some_and(|c| c.contains(kind.as_item())))
            })
            .collect();
        let road_cost: Ticks = road
            .iter()
            .map(|&t| catalog.drill_time(world.kind(t)) + config.build_delay)
            .sum();

        settle(&mut self.state, |state| match state {
            BuilderState::Road { targets } => {
                if !has_material || road.is_empty() {
                    return Estimate::Switch(BuilderState::Build { targets: Vec::new() });
                }
                targets.clone_from(&road);
                Estimate::Ready(road_cost)
            }
            BuilderState::Build { targets } => {
                if build.is_empty() {
                    return Estimate::Switch(BuilderState::Move);
                }
                if !has_material {
                    return Estimate::Stop(Deactivation::OutOfMaterial);
                }
                targets.clone_from(&build);
                Estimate::Ready(build.len() as Ticks * config.build_delay)
            }
            BuilderState::Move => Estimate::Ready(config.move_delay),
        })
    }

    fn run(&mut self, machine: &mut Machine, env: &mut Env<'_>) -> Flow {
        match &self.state {
            BuilderState::Road { targets } => {
                let targets = targets.clone();
                self.pave(&targets, machine, env)
            }
            BuilderState::Build { targets } => {
                let targets = targets.clone();
                self.build(&targets, machine, env)
            }
            BuilderState::Move => self.advance(machine, env),
        }
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            BuilderState::Road { .. } => "road",
            BuilderState::Build { .. } => "build",
            BuilderState::Move => "move",
        }
    }
}
