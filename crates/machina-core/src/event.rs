//! Lifecycle events recorded by the scheduler.
//!
//! Events are buffered during [`Scheduler::tick`](crate::scheduler::Scheduler::tick)
//! and control calls, and handed to the host in batch by
//! [`Scheduler::drain_events`](crate::scheduler::Scheduler::drain_events).

use crate::behavior::Deactivation;
use crate::geometry::{BlockLocation, BlockRotation};
use crate::id::{MachineId, OwnerId};
use crate::sim::Ticks;

/// A machine lifecycle event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineEvent {
    Activated {
        machine: MachineId,
        kind: &'static str,
        owner: OwnerId,
        tick: Ticks,
    },
    Deactivated {
        machine: MachineId,
        kind: &'static str,
        owner: OwnerId,
        reason: Deactivation,
        tick: Ticks,
    },
    /// The structure's anchor moved.
    Moved {
        machine: MachineId,
        from: BlockLocation,
        to: BlockLocation,
        tick: Ticks,
    },
    Rotated {
        machine: MachineId,
        rotation: BlockRotation,
        tick: Ticks,
    },
}

impl MachineEvent {
    pub fn machine(&self) -> MachineId {
        match self {
            MachineEvent::Activated { machine, .. }
            | MachineEvent::Deactivated { machine, .. }
            | MachineEvent::Moved { machine, .. }
            | MachineEvent::Rotated { machine, .. } => *machine,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            MachineEvent::Activated { tick, .. }
            | MachineEvent::Deactivated { tick, .. }
            | MachineEvent::Moved { tick, .. }
            | MachineEvent::Rotated { tick, .. } => *tick,
        }
    }
}
