//! Builder machines for Machina.
//!
//! A builder is a wooden central base with a lever on top and a furnace
//! behind. It lays blocks from its supply chest under its heads, then moves
//! forward over what it laid. Three variants share one blueprint:
//!
//! - **basic**: furnace directly behind the base, an iron head in front.
//!   Fills the cells under its heads.
//! - **road**: furnace two blocks behind with a second chest above the back
//!   base. Before building, replaces the ground under its heads with supply
//!   blocks and keeps what it dug up.
//! - **bridge**: furnace two blocks behind and a separate iron head two
//!   blocks ahead, at most two blocks lower. Builds under the head using the
//!   block type of the first stack in its pattern chest.
//!
//! Basic and road builders take optional side heads; bridge builders take
//! optional side bases and side heads.

mod blueprint;
mod state;

pub use blueprint::BuilderParts;
pub use state::{BuilderBehavior, BuilderState};

use machina_core::behavior::Behavior;
use machina_core::blueprint::BlockRef;
use machina_core::catalog::material::WOOD;
use machina_core::config::MachinaConfig;
use machina_core::detect::{Candidate, Detection, Detector, Matched, Requirement};
use machina_core::geometry::BlockVector;
use machina_core::scheduler::MachineKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const PERMISSION: &str = "machinabuilder.activate";

/// How far below the central base a bridge head may hang.
const BRIDGE_HEAD_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuilderVariant {
    Basic,
    Road,
    Bridge,
}

impl fmt::Display for BuilderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuilderVariant::Basic => "basic",
            BuilderVariant::Road => "road",
            BuilderVariant::Bridge => "bridge",
        })
    }
}

/// The builder machine kind.
#[derive(Debug)]
pub struct BuilderKind {
    parts: Arc<BuilderParts>,
    detector: Detector<BuilderVariant>,
}

impl Default for BuilderKind {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderKind {
    pub fn new() -> Self {
        let parts = Arc::new(BuilderParts::new());
        let p = Arc::clone(&parts);

        let basic = {
            let (main, backend) = (p.basic_main, p.basic_backend);
            Candidate::new("basic", move |probe| {
                (probe.module(main) && probe.module(backend))
                    .then(|| Matched::new(BuilderVariant::Basic, vec![main, backend]))
            })
            .optional([p.basic_left, p.basic_right])
        };

        let bridge = {
            let (main, head) = (p.bridge_main, p.bridge_head);
            Candidate::new("bridge", move |probe| {
                if !probe.module(main) {
                    return None;
                }
                let start = BlockVector::new(2, 0, 0);
                let down = BlockVector::new(0, -1, 0);
                let depth = probe.find_along(start, down, BRIDGE_HEAD_DEPTH, |at| probe.module_at(at, head))?;
                Some(
                    Matched::new(BuilderVariant::Bridge, vec![main])
                        .with_head(start + down.scaled(depth as i32), vec![head]),
                )
            })
            .optional([p.bridge_left, p.bridge_right])
            .head_optional([p.bridge_head_left, p.bridge_head_right])
        };

        let road = {
            let (main, backend) = (p.basic_main, p.road_backend);
            Candidate::new("road", move |probe| {
                (probe.module(main) && probe.module(backend))
                    .then(|| Matched::new(BuilderVariant::Road, vec![main, backend]))
            })
            .optional([p.basic_left, p.basic_right])
        };

        let detector = Detector::new(Arc::clone(&parts.blueprint))
            .guard(BlockVector::ZERO, Requirement::Is(WOOD))
            .guard(BlockVector::new(0, -1, 0), Requirement::Solid)
            .candidate(basic)
            .candidate(bridge)
            .candidate(road);
        Self { parts, detector }
    }

    pub fn parts(&self) -> &BuilderParts {
        &self.parts
    }
}

impl MachineKind for BuilderKind {
    type Variant = BuilderVariant;

    fn name(&self) -> &'static str {
        "builder"
    }

    fn permission(&self) -> &'static str {
        PERMISSION
    }

    fn detector(&self) -> &Detector<BuilderVariant> {
        &self.detector
    }

    fn activation_limit(&self, config: &MachinaConfig) -> Option<u32> {
        config.builder.max_active
    }

    fn fuel_block(&self, variant: BuilderVariant) -> BlockRef {
        match variant {
            BuilderVariant::Basic => self.parts.basic_furnace,
            BuilderVariant::Road => self.parts.road_furnace,
            BuilderVariant::Bridge => self.parts.bridge_furnace,
        }
    }

    fn containers(&self, variant: BuilderVariant) -> Vec<BlockRef> {
        let p = &self.parts;
        match variant {
            BuilderVariant::Basic => vec![p.basic_chest, p.basic_furnace],
            BuilderVariant::Road => vec![p.basic_chest, p.road_chest, p.road_furnace],
            BuilderVariant::Bridge => vec![p.bridge_supply_chest, p.bridge_pattern_chest, p.bridge_furnace],
        }
    }

    fn behavior(&self, detection: &Detection<BuilderVariant>) -> Box<dyn Behavior> {
        Box::new(BuilderBehavior::new(Arc::clone(&self.parts), detection.variant))
    }

    fn rotation_counts_as_activation(&self) -> bool {
        true
    }
}
