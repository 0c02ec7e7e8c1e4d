use loot_data::{ConditionId, ItemDatabase, ItemFlags, ItemId, LootStoreItem};
use loot_game_common::components::{PlayerId, Team};

use crate::game::world::{LootPlayer, LootWorld};

/// The parts of a loot entry or generated loot item that decide whether a
/// particular player may receive it.
#[derive(Copy, Clone, Debug)]
pub struct ItemEligibility<'a> {
    pub item_id: ItemId,
    pub needs_quest: bool,
    pub follows_loot_rules: bool,
    pub conditions: &'a [ConditionId],
}

impl<'a> ItemEligibility<'a> {
    pub fn from_store_item(store_item: &'a LootStoreItem, item_database: &ItemDatabase) -> Self {
        let follows_loot_rules = !store_item.needs_quest
            || item_database
                .get_item(store_item.item_id)
                .map_or(false, |item| {
                    item.flags.contains(ItemFlags::FOLLOW_LOOT_RULES)
                });

        Self {
            item_id: store_item.item_id,
            needs_quest: store_item.needs_quest,
            follows_loot_rules,
            conditions: &store_item.conditions,
        }
    }

    /// Decides whether `player` may receive this item.
    ///
    /// `loot_master` is the master looter of the loot this item belongs to,
    /// when the loot is distributed by master loot. The master looter may
    /// take any rule following item unless `strict` is set.
    ///
    /// `strict` additionally requires that the player could roll Need on the
    /// item, it is used when assigning personal loot.
    pub fn is_allowed_for_player(
        &self,
        world: &dyn LootWorld,
        player: &dyn LootPlayer,
        loot_master: Option<PlayerId>,
        strict: bool,
    ) -> bool {
        if !world.conditions_met(player, self.conditions) {
            return false;
        }

        let item = if let Some(item) = world.item_database().get_item(self.item_id) {
            item
        } else {
            return false;
        };

        if item.flags.contains(ItemFlags::HORDE_ONLY) && player.team() != Team::Horde {
            return false;
        }

        if item.flags.contains(ItemFlags::ALLIANCE_ONLY) && player.team() != Team::Alliance {
            return false;
        }

        if !strict && self.follows_loot_rules && loot_master == Some(player.id()) {
            return true;
        }

        if item.is_recipe() {
            if let Some(required_skill) = item.required_skill {
                if !player.has_skill(required_skill) {
                    return false;
                }
            }

            if let Some(teaches_spell) = item.teaches_spell {
                if player.has_spell(teaches_spell) {
                    return false;
                }
            }
        }

        if !item.flags.contains(ItemFlags::IGNORE_QUEST_STATUS) {
            let quest_gated = self.needs_quest
                || item
                    .start_quest
                    .map_or(false, |quest_id| player.has_started_quest(quest_id));

            if quest_gated && !player.has_quest_for_item(self.item_id) {
                return false;
            }
        }

        if strict {
            if (item.is_weapon() || item.is_armor()) && !player.can_use_by_specialization(item) {
                return false;
            }

            if !player.can_roll_need_for_item(item) {
                return false;
            }
        }

        true
    }
}
