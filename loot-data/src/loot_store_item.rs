use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ItemDatabase, ItemId, LootModeFlags, LootStoreType};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct LootTemplateId(u32);

id_wrapper_impl!(LootTemplateId, u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ConditionId(u32);

id_wrapper_impl!(ConditionId, u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DungeonEncounterId(u32);

id_wrapper_impl!(DungeonEncounterId, u32);

pub const MAX_LOOT_GROUP_ID: u8 = 127;

const MIN_LOOT_CHANCE: f32 = 0.000001;

fn default_loot_mode() -> u16 {
    LootModeFlags::DEFAULT.bits()
}

/// A single row of a loot template table, exactly as stored.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LootRow {
    pub entry: LootTemplateId,
    #[serde(default)]
    pub item: u32,
    #[serde(default)]
    pub reference: u32,
    pub chance: f32,
    #[serde(default)]
    pub quest_required: bool,
    #[serde(default = "default_loot_mode")]
    pub loot_mode: u16,
    #[serde(default)]
    pub group_id: u8,
    pub min_count: u32,
    pub max_count: u32,
    #[serde(default)]
    pub conditions: Vec<ConditionId>,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LootStoreItemError {
    #[error("GroupId ({0}) must be less than 128")]
    GroupIdOutOfRange(u8),
    #[error("wrong MinCount (0)")]
    ZeroMinCount,
    #[error("row has neither an item nor a reference")]
    MissingItem,
    #[error("item {0} does not exist")]
    UnknownItem(ItemId),
    #[error("Chance == 0 in ungrouped entry")]
    ZeroChanceUngrouped,
    #[error("low chance ({0})")]
    ChanceTooLow(f32),
    #[error("MaxCount ({max_count}) < MinCount ({min_count})")]
    MaxCountLessThanMinCount { min_count: u32, max_count: u32 },
    #[error("zero chance is specified for a reference")]
    ZeroChanceReference,
}

/// A validated loot table entry: either a real item drop or a reference to
/// another template in the reference store.
#[derive(Clone, Debug, PartialEq)]
pub struct LootStoreItem {
    pub item_id: ItemId,
    pub reference: Option<LootTemplateId>,
    pub chance: f32,
    pub needs_quest: bool,
    pub loot_mode: LootModeFlags,
    pub group_id: u8,
    pub min_count: u32,
    pub max_count: u32,
    pub conditions: Vec<ConditionId>,
}

impl LootStoreItem {
    pub fn new(item_id: ItemId, chance: f32, min_count: u32, max_count: u32) -> Self {
        Self {
            item_id,
            reference: None,
            chance,
            needs_quest: false,
            loot_mode: LootModeFlags::DEFAULT,
            group_id: 0,
            min_count,
            max_count,
            conditions: Vec::new(),
        }
    }

    pub fn new_reference(reference: LootTemplateId, chance: f32, max_count: u32) -> Self {
        Self {
            item_id: ItemId::new(0),
            reference: Some(reference),
            chance,
            needs_quest: false,
            loot_mode: LootModeFlags::DEFAULT,
            group_id: 0,
            min_count: 1,
            max_count,
            conditions: Vec::new(),
        }
    }

    pub fn with_group(mut self, group_id: u8) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_quest_required(mut self, needs_quest: bool) -> Self {
        self.needs_quest = needs_quest;
        self
    }

    pub fn with_loot_mode(mut self, loot_mode: LootModeFlags) -> Self {
        self.loot_mode = loot_mode;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<ConditionId>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn from_row(row: &LootRow) -> Self {
        Self {
            item_id: ItemId::new(row.item),
            reference: if row.reference != 0 {
                Some(LootTemplateId::new(row.reference))
            } else {
                None
            },
            chance: row.chance,
            needs_quest: row.quest_required,
            loot_mode: LootModeFlags::from_bits_truncate(row.loot_mode),
            group_id: row.group_id,
            min_count: row.min_count,
            max_count: row.max_count,
            conditions: row.conditions.clone(),
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_explicitly_chanced(&self) -> bool {
        self.chance != 0.0
    }

    pub fn validate(
        &self,
        store_type: LootStoreType,
        entry: LootTemplateId,
        item_database: &ItemDatabase,
    ) -> Result<(), LootStoreItemError> {
        if self.group_id > MAX_LOOT_GROUP_ID {
            return Err(LootStoreItemError::GroupIdOutOfRange(self.group_id));
        }

        if self.min_count == 0 {
            return Err(LootStoreItemError::ZeroMinCount);
        }

        if self.reference.is_none() {
            if self.item_id.get() == 0 {
                return Err(LootStoreItemError::MissingItem);
            }

            if item_database.get_item(self.item_id).is_none() {
                return Err(LootStoreItemError::UnknownItem(self.item_id));
            }

            if self.chance == 0.0 && self.group_id == 0 {
                return Err(LootStoreItemError::ZeroChanceUngrouped);
            }

            if self.chance != 0.0 && self.chance < MIN_LOOT_CHANCE {
                return Err(LootStoreItemError::ChanceTooLow(self.chance));
            }

            if self.max_count < self.min_count {
                return Err(LootStoreItemError::MaxCountLessThanMinCount {
                    min_count: self.min_count,
                    max_count: self.max_count,
                });
            }
        } else if self.needs_quest {
            log::warn!(target: "loot_tables",
                "Table '{}' entry {} reference {:?}: quest required will be ignored",
                store_type.table_name(),
                entry,
                self.reference
            );
        } else if self.chance == 0.0 {
            return Err(LootStoreItemError::ZeroChanceReference);
        }

        Ok(())
    }
}
