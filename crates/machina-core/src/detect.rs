//! Structure recognition.
//!
//! A [`Detector`] checks a handful of guard cells at the candidate anchor,
//! then tries each rotation in [`BlockRotation::all`] order. For every
//! rotation it evaluates its [`Candidate`]s in priority order; each candidate
//! is a probe that either returns the variant it recognised, with its
//! mandatory modules, or nothing. The first hit wins and its optional modules
//! are probed before the [`Detection`] is returned.
//!
//! Detection never writes to the world.

use crate::blueprint::{Blueprint, ModuleId};
use crate::catalog::BlockCatalog;
use crate::geometry::{BlockLocation, BlockRotation, BlockVector, Facing};
use crate::id::BlockTypeId;
use crate::mutation::Section;
use crate::world::BlockWorld;
use std::fmt;
use std::sync::Arc;

/// Upper bound on secondary searches a probe may perform.
pub const MAX_PROBE_STEPS: usize = 3;

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// What a guard cell must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Exactly this material (lit and unlit forms are interchangeable).
    Is(BlockTypeId),
    /// Any solid material.
    Solid,
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Read-only view handed to candidate probes for one anchor and rotation.
///
/// All vectors given to a probe are in blueprint space (facing east); the
/// probe applies the rotation.
pub struct Probe<'a> {
    world: &'a dyn BlockWorld,
    catalog: &'a BlockCatalog,
    blueprint: &'a Blueprint,
    anchor: BlockLocation,
    rotation: BlockRotation,
}

impl<'a> Probe<'a> {
    pub fn rotation(&self) -> BlockRotation {
        self.rotation
    }

    pub fn anchor(&self) -> BlockLocation {
        self.anchor
    }

    /// The direction the structure would face.
    pub fn facing(&self) -> Facing {
        self.rotation.yaw_facing()
    }

    /// World location of a blueprint-space offset.
    pub fn location(&self, v: BlockVector) -> BlockLocation {
        self.anchor + v.rotated(self.rotation)
    }

    /// Whether the cell at `v` holds `kind`.
    pub fn is(&self, v: BlockVector, kind: BlockTypeId) -> bool {
        self.catalog.matches(kind, self.world.kind(self.location(v)))
    }

    /// Whether every key block of `module` holds, anchored at the structure anchor.
    pub fn module(&self, module: ModuleId) -> bool {
        self.module_at(BlockVector::ZERO, module)
    }

    /// Whether every key block of `module` holds, anchored at offset `at`.
    pub fn module_at(&self, at: BlockVector, module: ModuleId) -> bool {
        self.blueprint.module_matches(
            self.world,
            self.catalog,
            self.location(at),
            self.rotation,
            module,
        )
    }

    /// Walk from `start` along `step` (both in blueprint space) for at most
    /// `steps` cells, capped at [`MAX_PROBE_STEPS`]. Returns the number of
    /// steps taken before `accept` held.
    pub fn find_along(
        &self,
        start: BlockVector,
        step: BlockVector,
        steps: usize,
        mut accept: impl FnMut(BlockVector) -> bool,
    ) -> Option<usize> {
        (0..steps.min(MAX_PROBE_STEPS)).find(|&n| accept(start + step.scaled(n as i32)))
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// What a probe reports when it recognises a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched<V> {
    pub variant: V,
    /// Mandatory modules of the root structure.
    pub modules: Vec<ModuleId>,
    /// A movable sub-structure: its anchor offset (blueprint space) and
    /// mandatory modules.
    pub head: Option<(BlockVector, Vec<ModuleId>)>,
}

impl<V> Matched<V> {
    pub fn new(variant: V, modules: Vec<ModuleId>) -> Self {
        Self {
            variant,
            modules,
            head: None,
        }
    }

    pub fn with_head(mut self, offset: BlockVector, modules: Vec<ModuleId>) -> Self {
        self.head = Some((offset, modules));
        self
    }
}

type ProbeFn<V> = dyn Fn(&Probe<'_>) -> Option<Matched<V>> + Send + Sync;

/// A recognisable variant: a probe plus the optional modules to look for
/// once it has matched.
pub struct Candidate<V> {
    name: &'static str,
    probe: Box<ProbeFn<V>>,
    optional: Vec<ModuleId>,
    head_optional: Vec<ModuleId>,
}

impl<V> Candidate<V> {
    pub fn new(
        name: &'static str,
        probe: impl Fn(&Probe<'_>) -> Option<Matched<V>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            probe: Box::new(probe),
            optional: Vec::new(),
            head_optional: Vec::new(),
        }
    }

    /// Optional modules of the root structure.
    pub fn optional(mut self, modules: impl IntoIterator<Item = ModuleId>) -> Self {
        self.optional.extend(modules);
        self
    }

    /// Optional modules of the head, probed at the head's anchor.
    pub fn head_optional(mut self, modules: impl IntoIterator<Item = ModuleId>) -> Self {
        self.head_optional.extend(modules);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<V> fmt::Debug for Candidate<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .field("head_optional", &self.head_optional)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// A recognised structure, ready to become a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection<V> {
    pub variant: V,
    pub rotation: BlockRotation,
    /// Root anchor and every matched root module, mandatory first.
    pub root: Section,
    pub head: Option<Section>,
}

impl<V> Detection<V> {
    pub fn anchor(&self) -> BlockLocation {
        self.root.anchor
    }

    pub fn modules(&self) -> &[ModuleId] {
        &self.root.modules
    }
}

/// Guards plus an ordered candidate list for one blueprint.
#[derive(Debug)]
pub struct Detector<V> {
    blueprint: Arc<Blueprint>,
    guards: Vec<(BlockVector, Requirement)>,
    candidates: Vec<Candidate<V>>,
}

impl<V: fmt::Debug> Detector<V> {
    pub fn new(blueprint: Arc<Blueprint>) -> Self {
        Self {
            blueprint,
            guards: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Require a cell relative to the anchor (not rotated) before any
    /// rotation is tried.
    pub fn guard(mut self, v: BlockVector, requirement: Requirement) -> Self {
        self.guards.push((v, requirement));
        self
    }

    /// Append a candidate; earlier candidates take priority.
    pub fn candidate(mut self, candidate: Candidate<V>) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    fn guards_hold(&self, world: &dyn BlockWorld, catalog: &BlockCatalog, anchor: BlockLocation) -> bool {
        self.guards.iter().all(|&(v, requirement)| {
            let found = world.kind(anchor + v);
            match requirement {
                Requirement::Is(kind) => catalog.matches(kind, found),
                Requirement::Solid => catalog.is_solid(found),
            }
        })
    }

    /// Recognise a structure anchored at `anchor`, trying each rotation in
    /// [`BlockRotation::all`] order.
    pub fn detect(
        &self,
        world: &dyn BlockWorld,
        catalog: &BlockCatalog,
        anchor: BlockLocation,
    ) -> Option<Detection<V>> {
        if !self.guards_hold(world, catalog, anchor) {
            return None;
        }
        BlockRotation::all()
            .into_iter()
            .find_map(|rotation| self.match_rotation(world, catalog, anchor, rotation))
    }

    /// Recognise a structure facing one heading only.
    pub fn detect_facing(
        &self,
        world: &dyn BlockWorld,
        catalog: &BlockCatalog,
        anchor: BlockLocation,
        rotation: BlockRotation,
    ) -> Option<Detection<V>> {
        if !self.guards_hold(world, catalog, anchor) {
            return None;
        }
        self.match_rotation(world, catalog, anchor, rotation)
    }

    fn match_rotation(
        &self,
        world: &dyn BlockWorld,
        catalog: &BlockCatalog,
        anchor: BlockLocation,
        rotation: BlockRotation,
    ) -> Option<Detection<V>> {
        let probe = Probe {
            world,
            catalog,
            blueprint: &self.blueprint,
            anchor,
            rotation,
        };
        self.candidates.iter().find_map(|candidate| {
            let matched = (candidate.probe)(&probe)?;
            tracing::debug!(
                blueprint = self.blueprint.name(),
                candidate = candidate.name,
                ?rotation,
                ?anchor,
                "structure detected"
            );
            Some(self.complete(&probe, candidate, matched))
        })
    }

    fn complete(&self, probe: &Probe<'_>, candidate: &Candidate<V>, matched: Matched<V>) -> Detection<V> {
        let mut modules = matched.modules;
        for &m in &candidate.optional {
            if !modules.contains(&m) && probe.module(m) {
                modules.push(m);
            }
        }

        let head = matched.head.map(|(offset, mut head_modules)| {
            for &m in &candidate.head_optional {
                if !head_modules.contains(&m) && probe.module_at(offset, m) {
                    head_modules.push(m);
                }
            }
            Section::new(probe.location(offset), head_modules)
        });

        Detection {
            variant: matched.variant,
            rotation: probe.rotation,
            root: Section::new(probe.anchor, modules),
            head,
        }
    }
}
