//! A running machine: where its structure stands, which way it faces, which
//! modules it was built with, and the resources it holds.
//!
//! The machine owns only locations. Every block stays in the host world and
//! is read again whenever an action runs.

use crate::activation::Reservation;
use crate::blueprint::{Blueprint, BlockRef, ModuleId};
use crate::catalog::BlockCatalog;
use crate::energy::EnergyLedger;
use crate::geometry::{BlockLocation, BlockRotation, BlockVector, Facing};
use crate::id::{BlockTypeId, MachineId, OwnerId};
use crate::mutation::{self, MutationError, Section};
use crate::sim::{Env, Ticks};
use crate::world::{Block, BlockWorld};
use std::sync::Arc;

#[derive(Debug)]
pub struct Machine {
    pub(crate) id: MachineId,
    kind: &'static str,
    blueprint: Arc<Blueprint>,
    rotation: BlockRotation,
    root: Section,
    head: Option<Section>,
    owner: OwnerId,
    fuel: BlockRef,
    pub energy: EnergyLedger,
    reservation: Option<Reservation>,
    pending_rotation: Option<BlockRotation>,
}

impl Machine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: &'static str,
        blueprint: Arc<Blueprint>,
        rotation: BlockRotation,
        root: Section,
        head: Option<Section>,
        owner: OwnerId,
        fuel: BlockRef,
        reservation: Option<Reservation>,
    ) -> Self {
        Self {
            id: MachineId::default(),
            kind,
            blueprint,
            rotation,
            root,
            head,
            owner,
            fuel,
            energy: EnergyLedger::new(),
            reservation,
            pending_rotation: None,
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn rotation(&self) -> BlockRotation {
        self.rotation
    }

    /// The direction the machine advances in.
    pub fn facing(&self) -> Facing {
        self.rotation.yaw_facing()
    }

    pub fn anchor(&self) -> BlockLocation {
        self.root.anchor
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub fn head(&self) -> Option<&Section> {
        self.head.as_ref()
    }

    pub fn modules(&self) -> &[ModuleId] {
        &self.root.modules
    }

    pub fn has_module(&self, module: ModuleId) -> bool {
        self.root.modules.contains(&module)
    }

    pub fn holds_reservation(&self) -> bool {
        self.reservation.is_some()
    }

    /// World location of a root descriptor.
    pub fn location(&self, block: BlockRef) -> BlockLocation {
        self.blueprint.location(self.root.anchor, self.rotation, block)
    }

    /// World location of a head descriptor, if the machine has a head.
    pub fn head_location(&self, block: BlockRef) -> Option<BlockLocation> {
        self.head
            .as_ref()
            .map(|head| self.blueprint.location(head.anchor, self.rotation, block))
    }

    /// World location of a blueprint-space offset from the anchor.
    pub fn relative(&self, v: BlockVector) -> BlockLocation {
        self.root.anchor + v.rotated(self.rotation)
    }

    pub fn lever_location(&self) -> BlockLocation {
        self.relative(self.blueprint.lever_vector())
    }

    pub fn fuel_location(&self) -> BlockLocation {
        self.location(self.fuel)
    }

    /// Whether any block of the structure sits at `location`.
    pub fn occupies(&self, location: BlockLocation) -> bool {
        self.sections()
            .any(|s| s.locations(&self.blueprint, self.rotation).any(|l| l == location))
    }

    fn sections(&self) -> impl Iterator<Item = &Section> {
        std::iter::once(&self.root).chain(self.head.as_ref())
    }

    /// The first key block (root, then head) that is no longer in place.
    pub fn broken_key(&self, world: &dyn BlockWorld, catalog: &BlockCatalog) -> Option<BlockLocation> {
        self.sections().find_map(|s| {
            self.blueprint
                .first_broken_key(world, catalog, s.anchor, self.rotation, &s.modules)
                .map(|block| self.blueprint.location(s.anchor, self.rotation, block))
        })
    }

    /// Spend energy, burning fuel from the machine's fuel block.
    pub fn use_energy(&mut self, env: &mut Env<'_>, amount: Ticks) -> bool {
        let fuel = self.fuel_location();
        self.energy.use_energy(env.world, env.catalog, fuel, amount)
    }

    /// Move the whole structure, head included, by `offset`.
    pub fn translate(&mut self, env: &mut Env<'_>, offset: BlockVector) -> Result<(), MutationError> {
        let mut sections = self.take_sections();
        let result = mutation::translate(
            env.world,
            env.catalog,
            &self.blueprint,
            self.rotation,
            &mut sections,
            offset,
        );
        self.restore_sections(sections);
        result
    }

    /// Turn the whole structure about its anchor to face `rotation`.
    pub fn rotate_to(&mut self, env: &mut Env<'_>, rotation: BlockRotation) -> Result<(), MutationError> {
        if rotation == self.rotation {
            return Ok(());
        }
        let mut sections = self.take_sections();
        let result = mutation::rotate(
            env.world,
            env.catalog,
            &self.blueprint,
            self.rotation,
            rotation,
            &mut sections,
        );
        self.restore_sections(sections);
        if result.is_ok() {
            self.rotation = rotation;
        }
        result
    }

    fn take_sections(&self) -> Vec<Section> {
        let mut sections = vec![self.root.clone()];
        sections.extend(self.head.clone());
        sections
    }

    fn restore_sections(&mut self, mut sections: Vec<Section>) {
        if self.head.is_some() {
            self.head = sections.pop();
        }
        if let Some(root) = sections.pop() {
            self.root = root;
        }
    }

    /// Switch the fuel block to its burning form.
    pub fn light_fuel(&self, world: &mut dyn BlockWorld, catalog: &BlockCatalog) {
        self.set_fuel_form(world, catalog, catalog.lit_form(self.fuel_kind()));
    }

    /// Switch the fuel block back to its resting form.
    pub fn extinguish_fuel(&self, world: &mut dyn BlockWorld, catalog: &BlockCatalog) {
        self.set_fuel_form(world, catalog, catalog.unlit_form(self.fuel_kind()));
    }

    fn fuel_kind(&self) -> BlockTypeId {
        self.blueprint.block(self.fuel).kind
    }

    fn set_fuel_form(&self, world: &mut dyn BlockWorld, catalog: &BlockCatalog, form: BlockTypeId) {
        let at = self.fuel_location();
        let current = world.block(at);
        // Leave the cell alone if something else took the fuel block's place.
        if current.kind != form && catalog.matches(self.fuel_kind(), current.kind) {
            world.set_block(at, Block::with_data(form, current.data));
        }
    }

    pub(crate) fn take_pending_rotation(&mut self) -> Option<BlockRotation> {
        self.pending_rotation.take()
    }

    pub(crate) fn set_pending_rotation(&mut self, rotation: BlockRotation) {
        self.pending_rotation = Some(rotation);
    }

    pub fn pending_rotation(&self) -> Option<BlockRotation> {
        self.pending_rotation
    }
}
