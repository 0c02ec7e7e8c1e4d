macro_rules! id_wrapper_impl {
    ($name:ident, $value_type:ty) => {
        impl $name {
            #[allow(dead_code)]
            pub const fn new(value: $value_type) -> Self {
                Self(value)
            }

            #[allow(dead_code)]
            pub const fn get(&self) -> $value_type {
                self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$value_type as std::str::FromStr>::Err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(s.parse::<$value_type>()?))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

mod item_database;
mod loot_mode;
mod loot_store_item;
mod loot_store_type;

pub use item_database::{
    BonusListId, ItemClass, ItemContext, ItemData, ItemDatabase, ItemFlags, ItemId, ItemQuality,
    QuestId, SkillId, SpellId,
};
pub use loot_mode::LootModeFlags;
pub use loot_store_item::{
    ConditionId, DungeonEncounterId, LootRow, LootStoreItem, LootStoreItemError, LootTemplateId,
    MAX_LOOT_GROUP_ID,
};
pub use loot_store_type::LootStoreType;
