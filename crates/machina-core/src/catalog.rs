//! Material properties of block and item types.
//!
//! The host world only stores type ids; everything the machines need to know
//! about a type (is it solid, can it be drilled, how long does that take, what
//! does it drop, how long does it burn) comes from the [`BlockCatalog`].

use crate::config::{self, ConfigError};
use crate::sim::Ticks;
use crate::id::{BlockTypeId, ItemTypeId};
use crate::item::ItemStack;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Well-known type ids used by the shipped blueprints.
pub mod material {
    use crate::id::{BlockTypeId, ItemTypeId};

    pub const AIR: BlockTypeId = BlockTypeId(0);
    pub const STONE: BlockTypeId = BlockTypeId(1);
    pub const GRASS: BlockTypeId = BlockTypeId(2);
    pub const DIRT: BlockTypeId = BlockTypeId(3);
    pub const COBBLESTONE: BlockTypeId = BlockTypeId(4);
    pub const WOOD: BlockTypeId = BlockTypeId(5);
    pub const BEDROCK: BlockTypeId = BlockTypeId(7);
    pub const WATER: BlockTypeId = BlockTypeId(9);
    pub const SAND: BlockTypeId = BlockTypeId(12);
    pub const GRAVEL: BlockTypeId = BlockTypeId(13);
    pub const IRON_ORE: BlockTypeId = BlockTypeId(15);
    pub const COAL_ORE: BlockTypeId = BlockTypeId(16);
    pub const LOG: BlockTypeId = BlockTypeId(17);
    pub const GOLD_BLOCK: BlockTypeId = BlockTypeId(41);
    pub const IRON_BLOCK: BlockTypeId = BlockTypeId(42);
    pub const OBSIDIAN: BlockTypeId = BlockTypeId(49);
    pub const CHEST: BlockTypeId = BlockTypeId(54);
    pub const FURNACE: BlockTypeId = BlockTypeId(61);
    pub const BURNING_FURNACE: BlockTypeId = BlockTypeId(62);
    pub const LEVER: BlockTypeId = BlockTypeId(69);
    pub const FENCE: BlockTypeId = BlockTypeId(85);

    pub const COAL: ItemTypeId = ItemTypeId(263);
    pub const STICK: ItemTypeId = ItemTypeId(280);
}

/// Properties of one block or item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDef {
    pub id: u16,
    pub name: String,
    /// Items with this flag never exist as blocks (coal, sticks).
    #[serde(default)]
    pub item_only: bool,
    #[serde(default)]
    pub solid: bool,
    /// Cells a moving structure may overwrite (air, liquids).
    #[serde(default)]
    pub replaceable: bool,
    #[serde(default)]
    pub drillable: bool,
    #[serde(default)]
    pub drill_time: Ticks,
    /// Items produced when broken. `None` drops one of the block itself.
    #[serde(default)]
    pub drops: Option<Vec<ItemStack>>,
    /// Ticks of energy one item of this type yields when burnt.
    #[serde(default)]
    pub burn_time: Option<Ticks>,
    /// The burning form of a fuel block.
    #[serde(default)]
    pub lit_form: Option<u16>,
    /// Number of item slots if this block is a container.
    #[serde(default)]
    pub container_slots: Option<usize>,
}

impl MaterialDef {
    fn new(id: BlockTypeId, name: &str) -> Self {
        Self {
            id: id.0,
            name: name.to_string(),
            item_only: false,
            solid: false,
            replaceable: false,
            drillable: false,
            drill_time: 0,
            drops: None,
            burn_time: None,
            lit_form: None,
            container_slots: None,
        }
    }

    fn solid(mut self) -> Self {
        self.solid = true;
        self
    }

    fn replaceable(mut self) -> Self {
        self.replaceable = true;
        self
    }

    fn drill(mut self, ticks: Ticks) -> Self {
        self.drillable = true;
        self.drill_time = ticks;
        self
    }

    fn drops(mut self, stacks: Vec<ItemStack>) -> Self {
        self.drops = Some(stacks);
        self
    }

    fn fuel(mut self, ticks: Ticks) -> Self {
        self.burn_time = Some(ticks);
        self
    }

    fn container(mut self, slots: usize) -> Self {
        self.container_slots = Some(slots);
        self
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    materials: Vec<MaterialDef>,
}

/// Lookup table of material properties keyed by type id.
#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    materials: BTreeMap<u16, MaterialDef>,
    unlit: BTreeMap<u16, u16>,
}

impl BlockCatalog {
    /// Build a catalog, rejecting duplicate ids and dangling lit forms.
    pub fn from_materials(defs: Vec<MaterialDef>) -> Result<Self, ConfigError> {
        let mut materials = BTreeMap::new();
        for def in defs {
            if materials.contains_key(&def.id) {
                return Err(ConfigError::DuplicateMaterial { id: def.id });
            }
            materials.insert(def.id, def);
        }

        let mut unlit = BTreeMap::new();
        for def in materials.values() {
            if let Some(lit) = def.lit_form {
                if !materials.contains_key(&lit) {
                    return Err(ConfigError::UnknownMaterial {
                        id: lit,
                        context: format!("lit form of '{}'", def.name),
                    });
                }
                unlit.insert(lit, def.id);
            }
        }

        Ok(Self { materials, unlit })
    }

    /// Load a material table from a `.ron`, `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file: CatalogFile = config::load_file(path)?;
        Self::from_materials(file.materials)
    }

    /// The materials used by the shipped drill and builder blueprints plus
    /// the common terrain they dig through.
    pub fn standard() -> Self {
        use material::*;
        let one = |item: ItemTypeId| vec![ItemStack::new(item, 1)];
        let defs = vec![
            MaterialDef::new(AIR, "air").replaceable(),
            MaterialDef::new(STONE, "stone")
                .solid()
                .drill(15)
                .drops(one(COBBLESTONE.as_item())),
            MaterialDef::new(GRASS, "grass")
                .solid()
                .drill(6)
                .drops(one(DIRT.as_item())),
            MaterialDef::new(DIRT, "dirt").solid().drill(6),
            MaterialDef::new(COBBLESTONE, "cobblestone").solid().drill(20),
            MaterialDef::new(WOOD, "wood").solid().drill(10).fuel(300),
            MaterialDef::new(BEDROCK, "bedrock").solid(),
            MaterialDef::new(WATER, "water").replaceable(),
            MaterialDef::new(SAND, "sand").solid().drill(6),
            MaterialDef::new(GRAVEL, "gravel").solid().drill(7),
            MaterialDef::new(IRON_ORE, "iron_ore").solid().drill(30),
            MaterialDef::new(COAL_ORE, "coal_ore")
                .solid()
                .drill(30)
                .drops(one(COAL)),
            MaterialDef::new(LOG, "log").solid().drill(10).fuel(300),
            MaterialDef::new(GOLD_BLOCK, "gold_block").solid(),
            MaterialDef::new(IRON_BLOCK, "iron_block").solid(),
            MaterialDef::new(OBSIDIAN, "obsidian").solid().drill(250),
            MaterialDef::new(CHEST, "chest").container(27),
            MaterialDef {
                lit_form: Some(BURNING_FURNACE.0),
                ..MaterialDef::new(FURNACE, "furnace").solid().container(3)
            },
            MaterialDef::new(BURNING_FURNACE, "burning_furnace")
                .solid()
                .container(3),
            MaterialDef::new(LEVER, "lever"),
            MaterialDef::new(FENCE, "fence").solid(),
            MaterialDef {
                item_only: true,
                ..MaterialDef::new(COAL.as_block(), "coal").fuel(1600)
            },
            MaterialDef {
                item_only: true,
                ..MaterialDef::new(STICK.as_block(), "stick").fuel(100)
            },
        ];
        // The table above is static and internally consistent.
        match Self::from_materials(defs) {
            Ok(catalog) => catalog,
            Err(e) => unreachable!("standard catalog is invalid: {e}"),
        }
    }

    pub fn get(&self, kind: BlockTypeId) -> Option<&MaterialDef> {
        self.materials.get(&kind.0)
    }

    /// Find a material by name.
    pub fn by_name(&self, name: &str) -> Option<BlockTypeId> {
        self.materials
            .values()
            .find(|m| m.name == name)
            .map(|m| BlockTypeId(m.id))
    }

    pub fn is_solid(&self, kind: BlockTypeId) -> bool {
        self.get(kind).is_some_and(|m| m.solid)
    }

    /// Unknown types are treated as not replaceable.
    pub fn is_replaceable(&self, kind: BlockTypeId) -> bool {
        self.get(kind).is_some_and(|m| m.replaceable)
    }

    pub fn is_drillable(&self, kind: BlockTypeId) -> bool {
        self.get(kind).is_some_and(|m| m.drillable)
    }

    pub fn drill_time(&self, kind: BlockTypeId) -> Ticks {
        self.get(kind).map_or(0, |m| m.drill_time)
    }

    /// Items yielded by breaking a block of this type.
    pub fn drops(&self, kind: BlockTypeId) -> Vec<ItemStack> {
        match self.get(kind) {
            Some(MaterialDef {
                drops: Some(drops), ..
            }) => drops.clone(),
            Some(m) if !m.replaceable => vec![ItemStack::new(kind.as_item(), 1)],
            _ => Vec::new(),
        }
    }

    pub fn burn_time(&self, item: ItemTypeId) -> Option<Ticks> {
        self.get(item.as_block()).and_then(|m| m.burn_time)
    }

    pub fn container_slots(&self, kind: BlockTypeId) -> Option<usize> {
        self.get(kind).and_then(|m| m.container_slots)
    }

    /// The block an item can be placed as, if it is a solid building block.
    pub fn block_for_item(&self, item: ItemTypeId) -> Option<BlockTypeId> {
        let m = self.get(item.as_block())?;
        (!m.item_only && m.solid && m.container_slots.is_none()).then(|| item.as_block())
    }

    pub fn is_building_block(&self, item: ItemTypeId) -> bool {
        self.block_for_item(item).is_some()
    }

    /// The burning form of a fuel block, or the block itself.
    pub fn lit_form(&self, kind: BlockTypeId) -> BlockTypeId {
        self.get(kind)
            .and_then(|m| m.lit_form)
            .map_or(kind, BlockTypeId)
    }

    /// The resting form of a burning block, or the block itself.
    pub fn unlit_form(&self, kind: BlockTypeId) -> BlockTypeId {
        self.unlit.get(&kind.0).copied().map_or(kind, BlockTypeId)
    }

    /// Whether a block found in the world satisfies a blueprint requirement.
    /// Lit and unlit forms of the same block are interchangeable.
    pub fn matches(&self, required: BlockTypeId, found: BlockTypeId) -> bool {
        required == found || self.unlit_form(required) == self.unlit_form(found)
    }
}
