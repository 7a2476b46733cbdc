//! Item identities, stacks, and the item catalog.
//!
//! The catalog maps an [`ItemId`] to its prototype: display name, class,
//! currency denomination, and stack limit. Inventories consult it for stack
//! limits and slot filters; an id the catalog does not know has a stack limit
//! of zero, so it can be swapped around but never merged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// ItemId / ItemStack
// ---------------------------------------------------------------------------

/// Identifies an item prototype. `0` is the empty item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    pub const EMPTY: ItemId = ItemId(0);

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// An item id with a count. Both are zero or both are nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
}

impl ItemStack {
    pub const EMPTY: ItemStack = ItemStack {
        item: ItemId::EMPTY,
        count: 0,
    };

    /// A stack of `count` items; zero of anything is the empty stack.
    pub fn new(item: ItemId, count: u32) -> Self {
        if item.is_empty() || count == 0 {
            Self::EMPTY
        } else {
            Self { item, count }
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// ---------------------------------------------------------------------------
// Prototypes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    #[default]
    Empty,
    Currency,
    Gem,
    Ring,
    Amulet,
    Key,
    Ore,
    Potion,
    Tool,
    Weapon,
    Armor,
    Shield,
    Plant,
    Book,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Copper,
    Silver,
    Gilded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProto {
    pub id: ItemId,
    pub name: String,
    pub class: ItemClass,
    #[serde(default)]
    pub currency: Option<Currency>,
    pub stack_limit: u32,
}

// ---------------------------------------------------------------------------
// ItemCatalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<ItemProto>,
}

/// Lookup table of item prototypes.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    by_id: HashMap<ItemId, ItemProto>,
}

impl ItemCatalog {
    pub const COPPER: ItemId = ItemId(1);
    pub const SILVER: ItemId = ItemId(2);
    pub const GILDED: ItemId = ItemId(3);
    pub const GEM: ItemId = ItemId(4);
    pub const SWORD: ItemId = ItemId(5);
    pub const SLIME_GOO: ItemId = ItemId(6);

    pub fn new() -> Self {
        Self::default()
    }

    /// The items every world knows about.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        let protos = [
            (Self::COPPER, "Copper Coin", ItemClass::Currency, Some(Currency::Copper), 100),
            (Self::SILVER, "Silver Coin", ItemClass::Currency, Some(Currency::Silver), 100),
            (Self::GILDED, "Gilded Coin", ItemClass::Currency, Some(Currency::Gilded), 100),
            (Self::GEM, "Gem", ItemClass::Gem, None, 50),
            (Self::SWORD, "Sword", ItemClass::Weapon, None, 1),
            (Self::SLIME_GOO, "Slime Goo", ItemClass::Plant, None, 99),
        ];
        for (id, name, class, currency, stack_limit) in protos {
            catalog.by_id.insert(
                id,
                ItemProto {
                    id,
                    name: name.to_owned(),
                    class,
                    currency,
                    stack_limit,
                },
            );
        }
        catalog
    }

    /// Load a catalog from `{ "items": [ ... ] }` JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for proto in file.items {
            catalog.insert(proto)?;
        }
        Ok(catalog)
    }

    /// Add a prototype. Rejects the empty id, zero stack limits, and duplicates.
    pub fn insert(&mut self, proto: ItemProto) -> Result<(), ConfigError> {
        if proto.id.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "item '{}' uses the reserved id 0",
                proto.name
            )));
        }
        if proto.stack_limit == 0 {
            return Err(ConfigError::Invalid(format!(
                "item {} has a stack limit of 0",
                proto.id.0
            )));
        }
        if self.by_id.contains_key(&proto.id) {
            return Err(ConfigError::Invalid(format!(
                "duplicate item id {}",
                proto.id.0
            )));
        }
        self.by_id.insert(proto.id, proto);
        Ok(())
    }

    pub fn find(&self, id: ItemId) -> Option<&ItemProto> {
        self.by_id.get(&id)
    }

    /// Stack limit of `id`, or `0` for unknown items.
    pub fn stack_limit(&self, id: ItemId) -> u32 {
        self.find(id).map(|p| p.stack_limit).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
