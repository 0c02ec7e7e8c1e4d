use enum_map::Enum;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{de::Error, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::LootTemplateId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct ItemId(u32);

id_wrapper_impl!(ItemId, u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct BonusListId(u32);

id_wrapper_impl!(BonusListId, u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct QuestId(u32);

id_wrapper_impl!(QuestId, u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SkillId(u16);

id_wrapper_impl!(SkillId, u16);

impl SkillId {
    pub const ENCHANTING: SkillId = SkillId(333);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SpellId(u32);

id_wrapper_impl!(SpellId, u32);

impl SpellId {
    pub const DISENCHANT: SpellId = SpellId(13262);
}

/// Content context an item was generated in (difficulty, encounter type...),
/// used to select context specific bonus lists.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ItemContext(u8);

id_wrapper_impl!(ItemContext, u8);

impl ItemContext {
    pub const NONE: ItemContext = ItemContext(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    FromPrimitive,
    Deserialize,
    Serialize,
)]
pub enum ItemQuality {
    Poor = 0,
    Normal = 1,
    Uncommon = 2,
    Rare = 3,
    Epic = 4,
    Legendary = 5,
    Artifact = 6,
    Heirloom = 7,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, Deserialize, Serialize)]
pub enum ItemClass {
    Consumable = 0,
    Container = 1,
    Weapon = 2,
    Gem = 3,
    Armor = 4,
    Reagent = 5,
    Projectile = 6,
    TradeGoods = 7,
    ItemEnhancement = 8,
    Recipe = 9,
    Quiver = 11,
    Quest = 12,
    Key = 13,
    Miscellaneous = 15,
    Glyph = 16,
}

bitflags::bitflags! {
    #[derive(Default)]
    #[repr(transparent)]
    pub struct ItemFlags : u32 {
        const NONE                = 0;

        // Every eligible looter receives their own copy
        const MULTI_DROP          = 1 << 0;
        const FOLLOW_LOOT_RULES   = 1 << 1;
        const IGNORE_QUEST_STATUS = 1 << 2;
        const HORDE_ONLY          = 1 << 3;
        const ALLIANCE_ONLY       = 1 << 4;
        const CAN_ONLY_ROLL_GREED = 1 << 5;
    }
}

fn deserialize_item_flags<'de, D>(deserializer: D) -> Result<ItemFlags, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ItemFlags::from_bits_truncate(u32::deserialize(deserializer)?))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrName<T> {
    Number(u32),
    Name(T),
}

// Item exports use either the enum name or the raw client value.
fn deserialize_number_or_name<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromPrimitive,
{
    match NumberOrName::<T>::deserialize(deserializer)? {
        NumberOrName::Number(value) => T::from_u32(value)
            .ok_or_else(|| D::Error::custom(format!("invalid enum value {}", value))),
        NumberOrName::Name(value) => Ok(value),
    }
}

fn default_max_stack_count() -> u32 {
    1
}

#[derive(Clone, Debug, Deserialize)]
pub struct ItemData {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "deserialize_number_or_name")]
    pub class: ItemClass,
    #[serde(deserialize_with = "deserialize_number_or_name")]
    pub quality: ItemQuality,
    #[serde(default, deserialize_with = "deserialize_item_flags")]
    pub flags: ItemFlags,
    #[serde(default = "default_max_stack_count")]
    pub max_stack_count: u32,
    #[serde(default)]
    pub required_skill: Option<SkillId>,
    #[serde(default)]
    pub teaches_spell: Option<SpellId>,
    #[serde(default)]
    pub start_quest: Option<QuestId>,
    #[serde(default)]
    pub disenchant_loot_id: Option<LootTemplateId>,
    #[serde(default)]
    pub required_disenchant_skill: u16,
}

impl ItemData {
    pub fn new(id: ItemId, class: ItemClass, quality: ItemQuality) -> Self {
        Self {
            id,
            name: String::new(),
            class,
            quality,
            flags: ItemFlags::NONE,
            max_stack_count: 1,
            required_skill: None,
            teaches_spell: None,
            start_quest: None,
            disenchant_loot_id: None,
            required_disenchant_skill: 0,
        }
    }

    pub fn max_stack_size(&self) -> u32 {
        self.max_stack_count.max(1)
    }

    pub fn is_weapon(&self) -> bool {
        matches!(self.class, ItemClass::Weapon)
    }

    pub fn is_armor(&self) -> bool {
        matches!(self.class, ItemClass::Armor)
    }

    pub fn is_recipe(&self) -> bool {
        matches!(self.class, ItemClass::Recipe)
    }

    pub fn is_free_for_all(&self) -> bool {
        self.flags.contains(ItemFlags::MULTI_DROP)
    }
}

#[derive(Default)]
pub struct ItemDatabase {
    items: HashMap<ItemId, ItemData>,
}

impl ItemDatabase {
    pub fn new(items: impl IntoIterator<Item = ItemData>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    pub fn get_item(&self, id: ItemId) -> Option<&ItemData> {
        self.items.get(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemData> {
        self.items.values()
    }
}
