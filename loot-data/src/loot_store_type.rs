use enum_map::Enum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, Deserialize, Serialize)]
pub enum LootStoreType {
    Creature,
    Disenchant,
    Fishing,
    Gameobject,
    Item,
    Mail,
    Milling,
    Pickpocketing,
    Prospecting,
    Reference,
    Skinning,
    Spell,
}

impl LootStoreType {
    pub fn table_name(self) -> &'static str {
        match self {
            LootStoreType::Creature => "creature_loot_template",
            LootStoreType::Disenchant => "disenchant_loot_template",
            LootStoreType::Fishing => "fishing_loot_template",
            LootStoreType::Gameobject => "gameobject_loot_template",
            LootStoreType::Item => "item_loot_template",
            LootStoreType::Mail => "mail_loot_template",
            LootStoreType::Milling => "milling_loot_template",
            LootStoreType::Pickpocketing => "pickpocketing_loot_template",
            LootStoreType::Prospecting => "prospecting_loot_template",
            LootStoreType::Reference => "reference_loot_template",
            LootStoreType::Skinning => "skinning_loot_template",
            LootStoreType::Spell => "spell_loot_template",
        }
    }

    /// Table name without the common suffix, e.g. `creature`.
    pub fn short_name(self) -> &'static str {
        self.table_name().trim_end_matches("_loot_template")
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        (0..Self::LENGTH)
            .map(Self::from_usize)
            .find(|store_type| store_type.short_name() == name)
    }

    pub fn entry_name(self) -> &'static str {
        match self {
            LootStoreType::Creature => "creature entry",
            LootStoreType::Disenchant => "item disenchant id",
            LootStoreType::Fishing => "area id",
            LootStoreType::Gameobject => "gameobject entry",
            LootStoreType::Item => "item entry",
            LootStoreType::Mail => "mail template id",
            LootStoreType::Milling => "item entry (herb)",
            LootStoreType::Pickpocketing => "creature pickpocket lootid",
            LootStoreType::Prospecting => "item entry (ore)",
            LootStoreType::Reference => "reference id",
            LootStoreType::Skinning => "creature skinning id",
            LootStoreType::Spell => "spell id",
        }
    }

    /// Mail and spell rewards are fixed grants, the world drop rates do not
    /// apply to them.
    pub fn rates_allowed(self) -> bool {
        !matches!(self, LootStoreType::Mail | LootStoreType::Spell)
    }
}
