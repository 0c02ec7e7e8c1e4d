use std::collections::{BTreeMap, BTreeSet};

use loot_data::{
    BonusListId, ConditionId, ItemContext, ItemData, ItemFlags, ItemId, LootStoreItem,
};
use loot_game_common::components::PlayerId;

use crate::game::ItemEligibility;

#[derive(Clone, Debug, PartialEq)]
pub enum LootItemVisibility {
    /// One copy shared by the whole loot, looted once.
    SingleOwner { is_looted: bool },

    /// Every eligible player gets their own copy, tracked per player.
    FreeForAll { looted_by: BTreeMap<PlayerId, bool> },
}

#[derive(Clone, Debug)]
pub struct LootItem {
    pub item_id: ItemId,
    pub slot: usize,
    pub count: u32,
    pub context: ItemContext,
    pub random_bonus_list_id: Option<BonusListId>,
    pub bonus_list_ids: Vec<BonusListId>,
    pub conditions: Vec<ConditionId>,
    pub visibility: LootItemVisibility,
    pub is_blocked: bool,
    pub is_under_threshold: bool,
    pub is_counted: bool,
    pub needs_quest: bool,
    pub follows_loot_rules: bool,
    pub roll_winner: Option<PlayerId>,
    pub allowed_looters: BTreeSet<PlayerId>,
}

impl LootItem {
    pub fn new(
        store_item: &LootStoreItem,
        item_data: &ItemData,
        slot: usize,
        count: u32,
        context: ItemContext,
    ) -> Self {
        let visibility = if item_data.is_free_for_all() {
            LootItemVisibility::FreeForAll {
                looted_by: BTreeMap::new(),
            }
        } else {
            LootItemVisibility::SingleOwner { is_looted: false }
        };

        Self {
            item_id: store_item.item_id,
            slot,
            count,
            context,
            random_bonus_list_id: None,
            bonus_list_ids: Vec::new(),
            conditions: store_item.conditions.clone(),
            visibility,
            is_blocked: false,
            is_under_threshold: false,
            is_counted: false,
            needs_quest: store_item.needs_quest,
            follows_loot_rules: !store_item.needs_quest
                || item_data.flags.contains(ItemFlags::FOLLOW_LOOT_RULES),
            roll_winner: None,
            allowed_looters: BTreeSet::new(),
        }
    }

    pub fn is_free_for_all(&self) -> bool {
        matches!(self.visibility, LootItemVisibility::FreeForAll { .. })
    }

    /// True when nobody has anything left to take from this item.
    pub fn is_looted(&self) -> bool {
        match &self.visibility {
            LootItemVisibility::SingleOwner { is_looted } => *is_looted,
            LootItemVisibility::FreeForAll { looted_by } => {
                looted_by.values().all(|is_looted| *is_looted)
            }
        }
    }

    /// True when `player_id` has nothing to take from this item, either
    /// because it is gone or because their free for all copy was never
    /// registered.
    pub fn is_looted_for(&self, player_id: PlayerId) -> bool {
        match &self.visibility {
            LootItemVisibility::SingleOwner { is_looted } => *is_looted,
            LootItemVisibility::FreeForAll { looted_by } => looted_by
                .get(&player_id)
                .map_or(true, |is_looted| *is_looted),
        }
    }

    /// Returns true when this call changed the item from unlooted to looted
    /// for `player_id`.
    pub fn mark_looted(&mut self, player_id: PlayerId) -> bool {
        match &mut self.visibility {
            LootItemVisibility::SingleOwner { is_looted } => !std::mem::replace(is_looted, true),
            LootItemVisibility::FreeForAll { looted_by } => match looted_by.get_mut(&player_id) {
                Some(is_looted) => !std::mem::replace(is_looted, true),
                None => false,
            },
        }
    }

    /// Registers a personal copy of a free for all item, returns false when
    /// the player already had one.
    pub fn register_free_for_all_looter(&mut self, player_id: PlayerId) -> bool {
        match &mut self.visibility {
            LootItemVisibility::FreeForAll { looted_by } => {
                if looted_by.contains_key(&player_id) {
                    false
                } else {
                    looted_by.insert(player_id, false);
                    true
                }
            }
            LootItemVisibility::SingleOwner { .. } => false,
        }
    }

    pub fn add_allowed_looter(&mut self, player_id: PlayerId) {
        self.allowed_looters.insert(player_id);
    }

    pub fn has_allowed_looter(&self, player_id: PlayerId) -> bool {
        self.allowed_looters.contains(&player_id)
    }

    pub fn eligibility(&self) -> ItemEligibility<'_> {
        ItemEligibility {
            item_id: self.item_id,
            needs_quest: self.needs_quest,
            follows_loot_rules: self.follows_loot_rules,
            conditions: &self.conditions,
        }
    }

    pub fn bonus_list_ids_string(&self) -> String {
        self.bonus_list_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use loot_data::{ItemClass, ItemQuality};

    use super::*;

    fn loot_item(flags: ItemFlags) -> LootItem {
        let mut item_data = ItemData::new(ItemId::new(10), ItemClass::Quest, ItemQuality::Normal);
        item_data.flags = flags;
        let store_item = LootStoreItem::new(ItemId::new(10), 100.0, 1, 1);
        LootItem::new(&store_item, &item_data, 0, 1, ItemContext::NONE)
    }

    #[test]
    fn single_owner_looted_once() {
        let mut item = loot_item(ItemFlags::NONE);
        assert!(!item.is_free_for_all());
        assert!(!item.is_looted_for(PlayerId(1)));
        assert!(item.mark_looted(PlayerId(1)));
        assert!(!item.mark_looted(PlayerId(2)));
        assert!(item.is_looted());
        assert!(item.is_looted_for(PlayerId(2)));
    }

    #[test]
    fn free_for_all_tracks_each_player() {
        let mut item = loot_item(ItemFlags::MULTI_DROP);
        assert!(item.is_free_for_all());
        assert!(item.register_free_for_all_looter(PlayerId(1)));
        assert!(item.register_free_for_all_looter(PlayerId(2)));
        assert!(!item.register_free_for_all_looter(PlayerId(2)));

        // Never registered, so nothing to take
        assert!(item.is_looted_for(PlayerId(3)));
        assert!(!item.mark_looted(PlayerId(3)));

        assert!(item.mark_looted(PlayerId(1)));
        assert!(item.is_looted_for(PlayerId(1)));
        assert!(!item.is_looted_for(PlayerId(2)));
        assert!(!item.is_looted());

        assert!(item.mark_looted(PlayerId(2)));
        assert!(item.is_looted());
    }

    #[test]
    fn follows_loot_rules_unless_quest_item() {
        let mut item_data = ItemData::new(ItemId::new(10), ItemClass::Quest, ItemQuality::Normal);
        let quest_entry = LootStoreItem::new(ItemId::new(10), 100.0, 1, 1).with_quest_required(true);
        let item = LootItem::new(&quest_entry, &item_data, 0, 1, ItemContext::NONE);
        assert!(!item.follows_loot_rules);

        item_data.flags = ItemFlags::FOLLOW_LOOT_RULES;
        let item = LootItem::new(&quest_entry, &item_data, 0, 1, ItemContext::NONE);
        assert!(item.follows_loot_rules);
    }
}
