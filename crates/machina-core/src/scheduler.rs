//! The single cooperative loop that drives every active machine.
//!
//! Each machine is parked until the tick its last `enqueue` asked for. On
//! every [`Scheduler::tick`] the machines that are due are serviced in order
//! of their due tick, then activation order:
//!
//! 1. **Verify** -- every key block of the structure is read back; a missing
//!    one stops the machine.
//! 2. **Act** -- a pending rotation is performed, otherwise the behavior runs.
//! 3. **Re-enqueue** -- the behavior picks its next action and the machine is
//!    parked for its cost (at least one tick).
//!
//! A machine that stops never affects the others serviced in the same tick.
//!
//! # Activation
//!
//! [`Scheduler::activate`] turns a lever pull into a running machine:
//! detection, permission, the owner's activation cap, container protection,
//! then the first `enqueue`. The cap is held by a [`Reservation`] that lives
//! inside the machine, so every failure path and every deactivation gives the
//! slot back by dropping it.
//!
//! [`Reservation`]: crate::activation::Reservation

use crate::activation::{ActivationError, ActivationRegistry};
use crate::behavior::{Behavior, Deactivation, Flow};
use crate::blueprint::BlockRef;
use crate::config::MachinaConfig;
use crate::detect::{Detection, Detector};
use crate::event::MachineEvent;
use crate::geometry::{BlockLocation, BlockRotation, Facing};
use crate::id::{MachineId, OwnerId};
use crate::machine::Machine;
use crate::mutation::MutationError;
use crate::sim::{Env, Ticks};
use slotmap::SlotMap;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Machine kinds
// ---------------------------------------------------------------------------

/// Everything the scheduler needs to know about one kind of machine.
pub trait MachineKind {
    /// The structural variants the detector can recognise.
    type Variant: Copy + fmt::Debug;

    fn name(&self) -> &'static str;

    /// Permission node an owner needs to start this kind.
    fn permission(&self) -> &'static str;

    fn detector(&self) -> &Detector<Self::Variant>;

    /// Active machines of this kind allowed per owner. `None` is unlimited.
    fn activation_limit(&self, config: &MachinaConfig) -> Option<u32>;

    /// The block that holds this variant's fuel.
    fn fuel_block(&self, variant: Self::Variant) -> BlockRef;

    /// Containers of this variant the owner must be able to open.
    fn containers(&self, variant: Self::Variant) -> Vec<BlockRef>;

    /// A fresh state machine for a detected structure.
    fn behavior(&self, detection: &Detection<Self::Variant>) -> Box<dyn Behavior>;

    /// Whether turning an idle structure is held to the activation limit and
    /// container checks. When `false`, permission alone is enough to turn it.
    fn rotation_counts_as_activation(&self) -> bool {
        false
    }
}

/// A lever pull, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationRequest {
    pub owner: OwnerId,
    pub lever: BlockLocation,
    /// Face of the supporting block the lever is attached to.
    pub attached_face: Facing,
    /// Turn the structure to this heading instead of starting it.
    pub rotate_to: Option<BlockRotation>,
}

impl ActivationRequest {
    /// A lever standing on top of `anchor`.
    pub fn on(owner: OwnerId, anchor: BlockLocation) -> Self {
        Self {
            owner,
            lever: anchor.step(Facing::Up, 1),
            attached_face: Facing::Up,
            rotate_to: None,
        }
    }

    pub fn rotating(mut self, rotation: BlockRotation) -> Self {
        self.rotate_to = Some(rotation);
        self
    }

    /// The block the lever is attached to.
    pub fn anchor(&self) -> BlockLocation {
        self.lever.step(self.attached_face.opposite(), 1)
    }
}

/// Outcome of an activation attempt that was not refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Started(MachineId),
    /// The structure was turned and left inactive. Holds its final heading.
    Rotated(BlockRotation),
    /// Recognised, but the first action could not be scheduled.
    Stalled(Deactivation),
    /// A machine is already running on this anchor.
    AlreadyActive(MachineId),
    NotDetected,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Entry {
    machine: Machine,
    behavior: Box<dyn Behavior>,
    due: Ticks,
    enqueued_at: Ticks,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: SlotMap<MachineId, Entry>,
    registry: ActivationRegistry,
    tick: Ticks,
    next_seq: u64,
    events: Vec<MachineEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler sharing activation counts with others.
    pub fn with_registry(registry: ActivationRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &ActivationRegistry {
        &self.registry
    }

    /// The last tick processed.
    pub fn now(&self) -> Ticks {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = MachineId> + '_ {
        self.entries.keys()
    }

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.entries.get(id).map(|e| &e.machine)
    }

    pub fn state_name(&self, id: MachineId) -> Option<&'static str> {
        self.entries.get(id).map(|e| e.behavior.state_name())
    }

    /// Tick at which the machine acts next.
    pub fn due_at(&self, id: MachineId) -> Option<Ticks> {
        self.entries.get(id).map(|e| e.due)
    }

    /// The machine whose structure covers `location`, if any.
    pub fn machine_at(&self, location: BlockLocation) -> Option<MachineId> {
        self.entries
            .iter()
            .find(|(_, e)| e.machine.occupies(location))
            .map(|(id, _)| id)
    }

    pub fn drain_events(&mut self) -> Vec<MachineEvent> {
        std::mem::take(&mut self.events)
    }

    // -- Activation --

    /// Try to start a machine of `kind` from a lever pull.
    ///
    /// Structures that are not recognised yield [`Activation::NotDetected`];
    /// refusals the owner should hear about are errors.
    pub fn activate<K: MachineKind + ?Sized>(
        &mut self,
        kind: &K,
        request: &ActivationRequest,
        env: &mut Env<'_>,
    ) -> Result<Activation, ActivationError> {
        if request.attached_face != Facing::Up {
            return Ok(Activation::NotDetected);
        }
        let anchor = request.anchor();
        if let Some((id, _)) = self.entries.iter().find(|(_, e)| e.machine.anchor() == anchor) {
            return Ok(Activation::AlreadyActive(id));
        }
        let Some(detection) = kind.detector().detect(env.world(), env.catalog, anchor) else {
            return Ok(Activation::NotDetected);
        };

        let owner = request.owner;
        let permission = kind.permission();
        if !env.protection.has_permission(owner, permission) {
            return Err(ActivationError::PermissionDenied { owner, permission });
        }
        let turn_only = request.rotate_to.is_some() && !kind.rotation_counts_as_activation();
        let reservation = if turn_only {
            None
        } else {
            Some(
                self.registry
                    .try_acquire(owner, kind.name(), kind.activation_limit(env.config))?,
            )
        };

        let blueprint = Arc::clone(kind.detector().blueprint());
        if !turn_only {
            for block in kind.containers(detection.variant) {
                let location = blueprint.location(detection.anchor(), detection.rotation, block);
                if !env.protection.can_open(owner, location) {
                    return Err(ActivationError::InventoryProtected { location });
                }
            }
        }

        let mut machine = Machine::new(
            kind.name(),
            blueprint,
            detection.rotation,
            detection.root.clone(),
            detection.head.clone(),
            owner,
            kind.fuel_block(detection.variant),
            reservation,
        );

        if let Some(rotation) = request.rotate_to {
            if let Err(MutationError::Collision { location }) = machine.rotate_to(env, rotation) {
                tracing::debug!(kind = kind.name(), ?anchor, ?location, "rotation blocked");
            }
            return Ok(Activation::Rotated(machine.rotation()));
        }

        machine.light_fuel(env.world, env.catalog);
        let mut behavior = kind.behavior(&detection);
        let first = behavior.enqueue(&machine, env);

        let tick = self.tick;
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.entries.insert_with_key(|id| {
            let mut machine = machine;
            machine.id = id;
            Entry {
                machine,
                behavior,
                due: tick + 1,
                enqueued_at: tick,
                seq,
            }
        });

        tracing::info!(machine = ?id, kind = kind.name(), ?owner, variant = ?detection.variant, rotation = ?detection.rotation, "machine activated");
        self.events.push(MachineEvent::Activated {
            machine: id,
            kind: kind.name(),
            owner,
            tick,
        });

        match first {
            Ok(cost) => {
                self.entries[id].due = tick + cost.max(1);
                Ok(Activation::Started(id))
            }
            Err(reason) => {
                self.stop(id, reason, env);
                Ok(Activation::Stalled(reason))
            }
        }
    }

    // -- Control --

    /// Stop the machine whose lever sits at `location`.
    pub fn lever_toggled(&mut self, location: BlockLocation, env: &mut Env<'_>) -> Option<MachineId> {
        let id = self
            .entries
            .iter()
            .find(|(_, e)| e.machine.lever_location() == location)
            .map(|(id, _)| id)?;
        self.stop(id, Deactivation::LeverToggled, env);
        Some(id)
    }

    /// Stop a machine. Returns `false` if it was not running.
    pub fn deactivate(&mut self, id: MachineId, env: &mut Env<'_>) -> bool {
        self.stop(id, Deactivation::Requested, env)
    }

    /// Re-evaluate a parked machine's pending action, keeping the time it has
    /// already waited. Returns `false` if the machine is gone afterwards.
    pub fn requeue(&mut self, id: MachineId, env: &mut Env<'_>) -> bool {
        let tick = self.tick;
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if entry.machine.pending_rotation().is_some() {
            return true;
        }
        match entry.behavior.enqueue(&entry.machine, env) {
            Ok(cost) => {
                entry.due = (entry.enqueued_at + cost.max(1)).max(tick + 1);
                true
            }
            Err(reason) => {
                self.stop(id, reason, env);
                false
            }
        }
    }

    /// Turn a running machine to a new heading before its next action.
    pub fn request_rotation(&mut self, id: MachineId, rotation: BlockRotation, config: &MachinaConfig) -> bool {
        let tick = self.tick;
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if entry.machine.rotation() == rotation {
            return false;
        }
        entry.machine.set_pending_rotation(rotation);
        entry.enqueued_at = tick;
        entry.due = tick + config.rotate_delay.max(1);
        true
    }

    // -- Tick --

    /// Advance one tick and service every machine that is due. Returns how
    /// many machines were serviced.
    pub fn tick(&mut self, env: &mut Env<'_>) -> usize {
        self.tick += 1;
        env.tick = self.tick;

        let now = self.tick;
        let mut due: Vec<(Ticks, u64, MachineId)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.due <= now)
            .map(|(id, e)| (e.due, e.seq, id))
            .collect();
        due.sort_unstable();

        for &(_, _, id) in &due {
            self.service(id, env);
        }
        due.len()
    }

    fn service(&mut self, id: MachineId, env: &mut Env<'_>) {
        let now = self.tick;
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };

        if let Some(location) = entry.machine.broken_key(env.world(), env.catalog) {
            tracing::warn!(machine = ?id, ?location, "key block missing");
            self.stop(id, Deactivation::KeyBlockMissing { location }, env);
            return;
        }

        let from = entry.machine.anchor();
        let (flow, rotated) = match entry.machine.take_pending_rotation() {
            Some(rotation) => (rotate(&mut entry.machine, rotation, env), Some(rotation)),
            None => (entry.behavior.run(&mut entry.machine, env), None),
        };
        let to = entry.machine.anchor();

        let next = match flow {
            Flow::Continue => entry.behavior.enqueue(&entry.machine, env),
            Flow::Deactivate(reason) => Err(reason),
        };
        if let Ok(cost) = next {
            entry.due = now + cost.max(1);
            entry.enqueued_at = now;
            tracing::trace!(machine = ?id, state = entry.behavior.state_name(), due = entry.due, "machine parked");
        }

        if from != to {
            self.events.push(MachineEvent::Moved {
                machine: id,
                from,
                to,
                tick: now,
            });
        }
        if let (Flow::Continue, Some(rotation)) = (flow, rotated) {
            self.events.push(MachineEvent::Rotated {
                machine: id,
                rotation,
                tick: now,
            });
        }
        if let Err(reason) = next {
            self.stop(id, reason, env);
        }
    }

    fn stop(&mut self, id: MachineId, reason: Deactivation, env: &mut Env<'_>) -> bool {
        let Some(mut entry) = self.entries.remove(id) else {
            return false;
        };
        entry.behavior.on_deactivate(&mut entry.machine, env);
        entry.machine.extinguish_fuel(env.world, env.catalog);

        let machine = entry.machine;
        tracing::info!(machine = ?id, kind = machine.kind(), owner = ?machine.owner(), %reason, "machine deactivated");
        self.events.push(MachineEvent::Deactivated {
            machine: id,
            kind: machine.kind(),
            owner: machine.owner(),
            reason,
            tick: self.tick,
        });
        // Dropping the machine releases its reservation.
        true
    }
}

fn rotate(machine: &mut Machine, rotation: BlockRotation, env: &mut Env<'_>) -> Flow {
    let cost = env.config.rotate_delay;
    if !machine.use_energy(env, cost) {
        return Flow::Deactivate(Deactivation::OutOfFuel);
    }
    match machine.rotate_to(env, rotation) {
        Ok(()) => Flow::Continue,
        Err(MutationError::Collision { location }) => Flow::Deactivate(Deactivation::Obstructed { location }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Estimate, settle};
    use crate::blueprint::BlueprintBuilder;
    use crate::catalog::material::*;
    use crate::detect::{Candidate, Matched, Requirement};
    use crate::geometry::BlockVector;
    use crate::test_utils::*;
    use crate::world::{Block, BlockWorld};

    /// A wooden cart that rolls forward one block per action.
    struct Cart {
        detector: Detector<()>,
        fuel: BlockRef,
        limit: Option<u32>,
        strict_turns: bool,
    }

    impl Cart {
        fn new() -> Self {
            let mut b = BlueprintBuilder::new("cart");
            let main = b.new_module();
            b.add_key(BlockVector::new(0, 1, 0), LEVER, main);
            b.add_key(BlockVector::ZERO, WOOD, main);
            let fuel = b.add_key(BlockVector::new(-1, 0, 0), FURNACE, main);
            let detector = Detector::new(Arc::new(b.build().unwrap()))
                .guard(BlockVector::ZERO, Requirement::Is(WOOD))
                .candidate(Candidate::new("cart", move |p| {
                    p.module(main).then(|| Matched::new((), vec![main]))
                }));
            Self {
                detector,
                fuel,
                limit: None,
                strict_turns: false,
            }
        }
    }

    #[derive(Debug)]
    enum Roll {
        Forward,
        Idle,
    }

    impl Behavior for Roll {
        fn enqueue(&mut self, _: &Machine, _: &Env<'_>) -> Result<Ticks, Deactivation> {
            settle(self, |s| match s {
                Roll::Forward => Estimate::Ready(5),
                Roll::Idle => Estimate::Switch(Roll::Forward),
            })
        }

        fn run(&mut self, machine: &mut Machine, env: &mut Env<'_>) -> Flow {
            if !machine.use_energy(env, 5) {
                return Flow::Deactivate(Deactivation::OutOfFuel);
            }
            match machine.translate(env, machine.facing().vector()) {
                Ok(()) => Flow::Continue,
                Err(MutationError::Collision { location }) => Flow::Deactivate(Deactivation::Obstructed { location }),
            }
        }

        fn state_name(&self) -> &'static str {
            match self {
                Roll::Forward => "forward",
                Roll::Idle => "idle",
            }
        }
    }

    impl MachineKind for Cart {
        type Variant = ();

        fn name(&self) -> &'static str {
            "cart"
        }

        fn permission(&self) -> &'static str {
            "cart.activate"
        }

        fn detector(&self) -> &Detector<()> {
            &self.detector
        }

        fn activation_limit(&self, _: &MachinaConfig) -> Option<u32> {
            self.limit
        }

        fn fuel_block(&self, _: ()) -> BlockRef {
            self.fuel
        }

        fn containers(&self, _: ()) -> Vec<BlockRef> {
            vec![self.fuel]
        }

        fn behavior(&self, _: &Detection<()>) -> Box<dyn Behavior> {
            Box::new(Roll::Idle)
        }

        fn rotation_counts_as_activation(&self) -> bool {
            self.strict_turns
        }
    }

    const OWNER: OwnerId = OwnerId(1);

    fn place_cart(host: &mut TestHost, anchor: BlockLocation, coal: u32) {
        host.world.set_block(anchor, Block::new(WOOD));
        host.world.set_block(anchor.step(Facing::Up, 1), Block::new(LEVER));
        host.world
            .put_container(anchor.step(Facing::West, 1), Block::new(FURNACE), furnace_with(coal));
    }

    fn start(host: &mut TestHost, scheduler: &mut Scheduler, cart: &Cart, anchor: BlockLocation) -> MachineId {
        match scheduler.activate(cart, &ActivationRequest::on(OWNER, anchor), &mut host.env()) {
            Ok(Activation::Started(id)) => id,
            other => panic!("cart did not start: {other:?}"),
        }
    }

    #[test]
    fn activation_lights_furnace_and_reserves_slot() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();

        let id = start(&mut host, &mut scheduler, &cart, anchor);
        assert_eq!(host.world.kind(anchor.step(Facing::West, 1)), BURNING_FURNACE);
        assert_eq!(scheduler.registry().active(OWNER, "cart"), 1);
        assert_eq!(scheduler.due_at(id), Some(5));
        assert_eq!(scheduler.state_name(id), Some("forward"));
        assert!(matches!(
            scheduler.drain_events().as_slice(),
            [MachineEvent::Activated { kind: "cart", .. }]
        ));
    }

    #[test]
    fn machine_acts_when_due() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let id = start(&mut host, &mut scheduler, &cart, anchor);
        scheduler.drain_events();

        run_ticks(&mut scheduler, &mut host, 4);
        assert_eq!(scheduler.machine(id).unwrap().anchor(), anchor);

        run_ticks(&mut scheduler, &mut host, 1);
        let moved = anchor.step(Facing::East, 1);
        assert_eq!(scheduler.machine(id).unwrap().anchor(), moved);
        assert_eq!(host.world.kind(moved), WOOD);
        assert_eq!(host.world.kind(moved.step(Facing::Up, 1)), LEVER);
        assert_eq!(
            scheduler.drain_events(),
            vec![MachineEvent::Moved {
                machine: id,
                from: anchor,
                to: moved,
                tick: 5
            }]
        );
        assert_eq!(scheduler.due_at(id), Some(10));
    }

    #[test]
    fn lever_toggle_stops_and_releases() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let id = start(&mut host, &mut scheduler, &cart, anchor);

        assert_eq!(scheduler.lever_toggled(anchor.step(Facing::Up, 1), &mut host.env()), Some(id));
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.registry().active(OWNER, "cart"), 0);
        assert_eq!(host.world.kind(anchor.step(Facing::West, 1)), FURNACE);
        let events = scheduler.drain_events();
        assert!(matches!(
            events.last(),
            Some(MachineEvent::Deactivated {
                reason: Deactivation::LeverToggled,
                ..
            })
        ));
    }

    #[test]
    fn missing_key_block_stops_machine() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        start(&mut host, &mut scheduler, &cart, anchor);

        host.world.clear_block(anchor.step(Facing::Up, 1));
        run_ticks(&mut scheduler, &mut host, 5);
        assert!(scheduler.is_empty());
        assert!(scheduler.drain_events().iter().any(|e| matches!(
            e,
            MachineEvent::Deactivated {
                reason: Deactivation::KeyBlockMissing { .. },
                ..
            }
        )));
    }

    #[test]
    fn empty_furnace_stops_on_first_action() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 0);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        start(&mut host, &mut scheduler, &cart, anchor);

        run_ticks(&mut scheduler, &mut host, 5);
        assert!(scheduler.is_empty());
        assert_eq!(host.world.kind(anchor), WOOD);
        assert_eq!(scheduler.registry().active(OWNER, "cart"), 0);
    }

    #[test]
    fn one_failing_machine_does_not_stop_others() {
        let mut host = TestHost::new();
        let a = BlockLocation::new(0, 64, 0);
        let b = BlockLocation::new(0, 64, 10);
        place_cart(&mut host, a, 0);
        place_cart(&mut host, b, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        start(&mut host, &mut scheduler, &cart, a);
        let survivor = start(&mut host, &mut scheduler, &cart, b);

        assert_eq!(scheduler.tick(&mut host.env()), 0);
        run_ticks(&mut scheduler, &mut host, 4);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.machine(survivor).unwrap().anchor(), b.step(Facing::East, 1));
    }

    #[test]
    fn rotate_request_turns_without_starting() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();

        let request = ActivationRequest::on(OWNER, anchor).rotating(BlockRotation::Rotate180);
        let outcome = scheduler.activate(&cart, &request, &mut host.env()).unwrap();
        assert_eq!(outcome, Activation::Rotated(BlockRotation::Rotate180));
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.registry().active(OWNER, "cart"), 0);
        // The furnace swung to the other side and was never lit.
        assert_eq!(host.world.kind(anchor.step(Facing::East, 1)), FURNACE);
        assert_eq!(host.world.kind(anchor.step(Facing::West, 1)), AIR);
    }

    #[test]
    fn rotation_runs_before_next_action() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let id = start(&mut host, &mut scheduler, &cart, anchor);
        scheduler.drain_events();

        let config = host.config.clone();
        assert!(scheduler.request_rotation(id, BlockRotation::Rotate90, &config));
        assert_eq!(scheduler.due_at(id), Some(config.rotate_delay));
        run_ticks(&mut scheduler, &mut host, config.rotate_delay);

        let machine = scheduler.machine(id).unwrap();
        assert_eq!(machine.facing(), Facing::South);
        assert_eq!(machine.anchor(), anchor);
        assert_eq!(host.world.kind(anchor.step(Facing::North, 1)), BURNING_FURNACE);
        assert!(
            scheduler
                .drain_events()
                .contains(&MachineEvent::Rotated {
                    machine: id,
                    rotation: BlockRotation::Rotate90,
                    tick: config.rotate_delay
                })
        );
    }

    #[test]
    fn refusals_do_not_leak_reservations() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let request = ActivationRequest::on(OWNER, anchor);

        host.protection.locked.insert(anchor.step(Facing::West, 1));
        assert_eq!(
            scheduler.activate(&cart, &request, &mut host.env()),
            Err(ActivationError::InventoryProtected {
                location: anchor.step(Facing::West, 1)
            })
        );
        assert_eq!(scheduler.registry().active(OWNER, "cart"), 0);

        host.protection.locked.clear();
        host.protection.denied_permissions.insert("cart.activate".into());
        assert!(matches!(
            scheduler.activate(&cart, &request, &mut host.env()),
            Err(ActivationError::PermissionDenied { .. })
        ));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn per_owner_limit_applies() {
        let mut host = TestHost::new();
        let a = BlockLocation::new(0, 64, 0);
        let b = BlockLocation::new(0, 64, 10);
        place_cart(&mut host, a, 4);
        place_cart(&mut host, b, 4);
        let mut cart = Cart::new();
        cart.limit = Some(1);
        let mut scheduler = Scheduler::new();

        let first = start(&mut host, &mut scheduler, &cart, a);
        assert!(matches!(
            scheduler.activate(&cart, &ActivationRequest::on(OWNER, b), &mut host.env()),
            Err(ActivationError::LimitReached { limit: 1, .. })
        ));
        assert!(scheduler.deactivate(first, &mut host.env()));
        start(&mut host, &mut scheduler, &cart, b);
    }

    #[test]
    fn owner_at_the_limit_can_still_turn_an_idle_cart() {
        let mut host = TestHost::new();
        let a = BlockLocation::new(0, 64, 0);
        let b = BlockLocation::new(0, 64, 10);
        place_cart(&mut host, a, 4);
        place_cart(&mut host, b, 4);
        host.protection.locked.insert(b.step(Facing::West, 1));
        let mut cart = Cart::new();
        cart.limit = Some(1);
        let mut scheduler = Scheduler::new();

        start(&mut host, &mut scheduler, &cart, a);
        let request = ActivationRequest::on(OWNER, b).rotating(BlockRotation::Rotate180);
        let outcome = scheduler.activate(&cart, &request, &mut host.env());
        assert_eq!(outcome, Ok(Activation::Rotated(BlockRotation::Rotate180)));
        assert_eq!(host.world.kind(b.step(Facing::East, 1)), FURNACE);
        assert_eq!(scheduler.registry().active(OWNER, "cart"), 1);
    }

    #[test]
    fn strict_kinds_refuse_turns_at_the_limit() {
        let mut host = TestHost::new();
        let a = BlockLocation::new(0, 64, 0);
        let b = BlockLocation::new(0, 64, 10);
        place_cart(&mut host, a, 4);
        place_cart(&mut host, b, 4);
        let mut cart = Cart::new();
        cart.limit = Some(1);
        cart.strict_turns = true;
        let mut scheduler = Scheduler::new();

        start(&mut host, &mut scheduler, &cart, a);
        let request = ActivationRequest::on(OWNER, b).rotating(BlockRotation::Rotate180);
        assert!(matches!(
            scheduler.activate(&cart, &request, &mut host.env()),
            Err(ActivationError::LimitReached { limit: 1, .. })
        ));
        assert_eq!(host.world.kind(b.step(Facing::West, 1)), FURNACE);
    }

    #[test]
    fn lever_must_stand_on_top() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let request = ActivationRequest {
            owner: OWNER,
            lever: anchor.step(Facing::North, 1),
            attached_face: Facing::North,
            rotate_to: None,
        };
        assert_eq!(
            scheduler.activate(&cart, &request, &mut host.env()),
            Ok(Activation::NotDetected)
        );
    }

    #[test]
    fn second_pull_on_running_anchor_is_reported() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let id = start(&mut host, &mut scheduler, &cart, anchor);
        assert_eq!(
            scheduler.activate(&cart, &ActivationRequest::on(OWNER, anchor), &mut host.env()),
            Ok(Activation::AlreadyActive(id))
        );
    }

    #[test]
    fn requeue_keeps_elapsed_wait() {
        let mut host = TestHost::new();
        let anchor = BlockLocation::new(0, 64, 0);
        place_cart(&mut host, anchor, 4);
        let cart = Cart::new();
        let mut scheduler = Scheduler::new();
        let id = start(&mut host, &mut scheduler, &cart, anchor);

        run_ticks(&mut scheduler, &mut host, 2);
        assert!(scheduler.requeue(id, &mut host.env()));
        assert!(scheduler.requeue(id, &mut host.env()));
        assert_eq!(scheduler.due_at(id), Some(5));
        assert_eq!(scheduler.machine_at(anchor.step(Facing::West, 1)), Some(id));
    }
}
