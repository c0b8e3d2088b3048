//! The two-step action protocol every machine state follows.
//!
//! The scheduler first asks a behavior to [`enqueue`](Behavior::enqueue) its
//! next action: the behavior picks its work, possibly switching state when
//! the current one has nothing to do, and returns how many ticks the action
//! costs. Once that many ticks have passed the scheduler calls
//! [`run`](Behavior::run), which re-reads the world, performs the action and
//! reports whether the machine keeps going.
//!
//! `enqueue` only reads the world and may be called again at any time with
//! the same result, so hosts can re-evaluate a waiting machine's cost.

use crate::geometry::BlockLocation;
use crate::machine::Machine;
use crate::sim::{Env, Ticks};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;

/// Longest chain of "nothing to do here, try that state" hand-offs one
/// `enqueue` may follow.
pub const MAX_DELEGATIONS: usize = 4;

/// Why a machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deactivation {
    /// The owner flipped the activation lever.
    LeverToggled,
    /// The host asked for the machine to stop.
    Requested,
    /// A key block of the structure is no longer in place.
    KeyBlockMissing { location: BlockLocation },
    /// Not enough fuel for the next action.
    OutOfFuel,
    /// No building material left in the supply chest.
    OutOfMaterial,
    /// The structure cannot move or turn into an occupied cell.
    Obstructed { location: BlockLocation },
    /// No solid ground to advance onto.
    NoGround { location: BlockLocation },
    /// The owner may not change the block at this location.
    Protected { location: BlockLocation },
    /// A block chosen at enqueue time changed before the action ran.
    StaleTarget { location: BlockLocation },
    /// States kept handing work to each other without settling.
    StateLoop,
}

impl fmt::Display for Deactivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deactivation::LeverToggled => write!(f, "lever toggled"),
            Deactivation::Requested => write!(f, "deactivation requested"),
            Deactivation::KeyBlockMissing { location } => write!(f, "key block missing at {location:?}"),
            Deactivation::OutOfFuel => write!(f, "out of fuel"),
            Deactivation::OutOfMaterial => write!(f, "out of material"),
            Deactivation::Obstructed { location } => write!(f, "obstructed at {location:?}"),
            Deactivation::NoGround { location } => write!(f, "no ground at {location:?}"),
            Deactivation::Protected { location } => write!(f, "protected block at {location:?}"),
            Deactivation::StaleTarget { location } => write!(f, "target changed at {location:?}"),
            Deactivation::StateLoop => write!(f, "state loop"),
        }
    }
}

/// Outcome of [`Behavior::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going; the next `enqueue` decides what comes next.
    Continue,
    Deactivate(Deactivation),
}

/// A machine kind's state machine.
pub trait Behavior: fmt::Debug + Send {
    /// Choose the next action and return its cost in ticks.
    fn enqueue(&mut self, machine: &Machine, env: &Env<'_>) -> Result<Ticks, Deactivation>;

    /// Perform the action chosen by the last `enqueue`.
    fn run(&mut self, machine: &mut Machine, env: &mut Env<'_>) -> Flow;

    /// Name of the current state, for logs and hosts.
    fn state_name(&self) -> &'static str;

    /// Called once when the machine stops, before its blocks are released.
    fn on_deactivate(&mut self, machine: &mut Machine, env: &mut Env<'_>) {
        let _ = (machine, env);
    }
}

/// What a state reports when asked for its next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Estimate<S> {
    /// Work is ready and costs this many ticks.
    Ready(Ticks),
    /// Nothing to do here; continue in this state.
    Switch(S),
    Stop(Deactivation),
}

/// Follow state hand-offs until one state has work.
///
/// A state may not hand off to another state of the same variant, and at most
/// [`MAX_DELEGATIONS`] hand-offs are followed; either case stops the machine
/// with [`Deactivation::StateLoop`].
pub fn settle<S>(state: &mut S, mut estimate: impl FnMut(&mut S) -> Estimate<S>) -> Result<Ticks, Deactivation> {
    for _ in 0..=MAX_DELEGATIONS {
        match estimate(state) {
            Estimate::Ready(cost) => return Ok(cost),
            Estimate::Stop(reason) => return Err(reason),
            Estimate::Switch(next) => {
                if mem::discriminant(&next) == mem::discriminant(state) {
                    tracing::warn!("state delegated to itself");
                    return Err(Deactivation::StateLoop);
                }
                *state = next;
            }
        }
    }
    tracing::warn!(limit = MAX_DELEGATIONS, "state delegation limit reached");
    Err(Deactivation::StateLoop)
}
