//! Simulation time and the per-step context handed to machines.

use crate::catalog::BlockCatalog;
use crate::config::MachinaConfig;
use crate::world::{BlockWorld, Protection};

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Everything a machine may touch while it acts: the host world, material
/// properties, the host's protection checks and the tuning config.
///
/// One `Env` is built per scheduler step by the host and lent to every
/// machine serviced in that step.
pub struct Env<'a> {
    pub world: &'a mut dyn BlockWorld,
    pub catalog: &'a BlockCatalog,
    pub protection: &'a dyn Protection,
    pub config: &'a MachinaConfig,
    /// The tick being processed. Set by the scheduler.
    pub tick: Ticks,
}

impl<'a> Env<'a> {
    pub fn new(
        world: &'a mut dyn BlockWorld,
        catalog: &'a BlockCatalog,
        protection: &'a dyn Protection,
        config: &'a MachinaConfig,
    ) -> Self {
        Self {
            world,
            catalog,
            protection,
            config,
            tick: 0,
        }
    }

    /// Read-only access to the world.
    pub fn world(&self) -> &dyn BlockWorld {
        &*self.world
    }
}
