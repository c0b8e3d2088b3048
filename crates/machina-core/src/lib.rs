//! Machina Core -- the runtime for block-built machines in a voxel world.
//!
//! A machine is a small structure of ordinary blocks (an anchor, a lever on
//! top, a furnace for fuel, chests, tool heads) that a player assembles by
//! hand and starts by pulling the lever. This crate recognises such
//! structures from their blueprints, runs each one as a state machine on a
//! shared tick clock, and moves or turns the whole structure as one edit.
//!
//! # Machine Lifecycle
//!
//! 1. **Detect** -- [`detect::Detector`] matches a [`blueprint::Blueprint`] at
//!    the lever's anchor in all four rotations.
//! 2. **Activate** -- [`scheduler::Scheduler::activate`] checks permission,
//!    the owner's activation cap and container protection, then creates a
//!    [`machine::Machine`] and lights its furnace.
//! 3. **Enqueue / Run** -- each [`behavior::Behavior`] picks its next action
//!    and its cost in ticks; when the cost has elapsed the scheduler re-checks
//!    the key blocks and runs the action.
//! 4. **Deactivate** -- a lever toggle, a missing key block or a failed action
//!    stops the machine, puts the furnace out and frees its activation slot.
//!
//! # Key Types
//!
//! - [`blueprint::Blueprint`] -- Modules of block descriptors, precomputed for
//!   every rotation.
//! - [`detect::Detector`] -- Guards plus an ordered candidate list per blueprint.
//! - [`scheduler::Scheduler`] -- The tick loop and the activation pipeline.
//! - [`energy::EnergyLedger`] -- Burns furnace fuel to pay for actions.
//! - [`transaction::InventoryTransaction`] -- All-or-nothing container deposits.
//! - [`mutation`] -- Collision-checked translation and rotation of structures.
//! - [`world::BlockWorld`] / [`world::Protection`] -- What the host provides.

pub mod activation;
pub mod behavior;
pub mod blueprint;
pub mod catalog;
pub mod config;
pub mod detect;
pub mod energy;
pub mod event;
pub mod geometry;
pub mod id;
pub mod item;
pub mod machine;
pub mod mutation;
pub mod scheduler;
pub mod sim;
pub mod transaction;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
