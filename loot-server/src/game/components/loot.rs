use rand::{Rng, RngCore};
use std::{
    collections::{BTreeMap, BTreeSet},
    time::Instant,
};
use thiserror::Error;

use loot_data::{
    DungeonEncounterId, ItemContext, ItemId, LootModeFlags, LootStoreItem, LootStoreType,
    LootTemplateId, SkillId,
};
use loot_game_common::{
    components::{InventoryError, Money, PlayerId},
    messages::{
        server::{LootError, LootItemData, LootResponse, ServerMessage},
        LootId, LootMethod, LootSlotType, LootType, RollVote, WorldObjectId,
    },
};

use crate::game::{
    components::{GroupInfo, LootItem, LootRoll},
    resources::{LootConfig, LootProcessContext, LootStorage},
    send_message,
    systems::loot_roll_system,
    CriteriaEvent, LootPlayer, LootWorld, StoreDestination,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AutoStoreFailure {
    pub slot: usize,
    pub item_id: ItemId,
    pub error: InventoryError,
}

#[derive(Debug, Error)]
#[error("{} loot items could not be stored", .failures.len())]
pub struct AutoStoreError {
    pub failures: Vec<AutoStoreFailure>,
}

/// Generated loot of one world object: money, items, who may see and take
/// them, and the rolls running for blocked items.
pub struct Loot {
    pub loot_id: LootId,
    pub owner: WorldObjectId,
    pub loot_type: LootType,
    pub money: Money,
    pub items: Vec<LootItem>,
    pub(crate) loot_method: LootMethod,
    pub(crate) loot_master: Option<PlayerId>,
    pub(crate) round_robin_player: Option<PlayerId>,
    pub(crate) dungeon_encounter_id: Option<DungeonEncounterId>,
    pub(crate) item_context: ItemContext,
    pub(crate) allowed_looters: BTreeSet<PlayerId>,
    pub(crate) players_looting: BTreeSet<PlayerId>,
    pub(crate) rolls: BTreeMap<usize, LootRoll>,
    pub(crate) unlooted_count: u32,
    pub(crate) was_opened: bool,
}

impl Loot {
    pub fn new(
        loot_id: LootId,
        owner: WorldObjectId,
        loot_type: LootType,
        group: Option<&GroupInfo>,
    ) -> Self {
        let loot_method = group.map_or(LootMethod::FreeForAll, |group| group.loot_method);
        let loot_master = group
            .filter(|group| group.loot_method == LootMethod::MasterLoot)
            .and_then(|group| group.master_looter);

        Self {
            loot_id,
            owner,
            loot_type,
            money: Money::ZERO,
            items: Vec::new(),
            loot_method,
            loot_master,
            round_robin_player: None,
            dungeon_encounter_id: None,
            item_context: ItemContext::NONE,
            allowed_looters: BTreeSet::new(),
            players_looting: BTreeSet::new(),
            rolls: BTreeMap::new(),
            unlooted_count: 0,
            was_opened: false,
        }
    }

    pub fn loot_method(&self) -> LootMethod {
        self.loot_method
    }

    pub fn loot_master(&self) -> Option<PlayerId> {
        self.loot_master
    }

    pub fn round_robin_player(&self) -> Option<PlayerId> {
        self.round_robin_player
    }

    pub fn dungeon_encounter_id(&self) -> Option<DungeonEncounterId> {
        self.dungeon_encounter_id
    }

    pub fn set_dungeon_encounter_id(&mut self, dungeon_encounter_id: Option<DungeonEncounterId>) {
        self.dungeon_encounter_id = dungeon_encounter_id;
    }

    pub fn item_context(&self) -> ItemContext {
        self.item_context
    }

    pub fn set_item_context(&mut self, item_context: ItemContext) {
        self.item_context = item_context;
    }

    pub fn allowed_looters(&self) -> &BTreeSet<PlayerId> {
        &self.allowed_looters
    }

    pub fn has_allowed_looter(&self, player_id: PlayerId) -> bool {
        self.allowed_looters.contains(&player_id)
    }

    pub fn players_looting(&self) -> &BTreeSet<PlayerId> {
        &self.players_looting
    }

    pub fn unlooted_count(&self) -> u32 {
        self.unlooted_count
    }

    pub fn roll(&self, slot: usize) -> Option<&LootRoll> {
        self.rolls.get(&slot)
    }

    pub fn has_active_rolls(&self) -> bool {
        !self.rolls.is_empty()
    }

    pub fn is_looted(&self) -> bool {
        self.money.is_zero() && self.unlooted_count == 0
    }

    pub fn is_empty(&self) -> bool {
        self.money.is_zero() && self.items.is_empty()
    }

    fn loot_master_for_rules(&self) -> Option<PlayerId> {
        if self.loot_method == LootMethod::MasterLoot {
            self.loot_master
        } else {
            None
        }
    }

    pub fn generate_money_loot(
        &mut self,
        min_amount: u32,
        max_amount: u32,
        rate: f32,
        rng: &mut dyn RngCore,
    ) {
        if max_amount == 0 {
            return;
        }

        let money = if max_amount <= min_amount {
            (max_amount as f32 * rate + 0.5) as u64
        } else if max_amount - min_amount < 32700 {
            (rng.gen_range(min_amount..=max_amount) as f32 * rate + 0.5) as u64
        } else {
            ((rng.gen_range(min_amount >> 8..=max_amount >> 8) as f32 * rate + 0.5) as u64) << 8
        };

        self.money = self.money + Money(money);
    }

    /// Adds a rolled entry, split into stacks no larger than the item's
    /// maximum stack size. Stacks beyond `max_loot_items` are dropped.
    pub fn add_item(
        &mut self,
        store_item: &LootStoreItem,
        world: &dyn LootWorld,
        max_loot_items: usize,
        rng: &mut dyn RngCore,
    ) {
        let item_data = if let Some(item_data) = world.item_database().get_item(store_item.item_id)
        {
            item_data
        } else {
            return;
        };

        let mut count =
            rng.gen_range(store_item.min_count..=store_item.max_count.max(store_item.min_count));
        let max_stack_size = item_data.max_stack_size();

        while count > 0 && self.items.len() < max_loot_items {
            let stack_size = count.min(max_stack_size);
            let mut loot_item = LootItem::new(
                store_item,
                item_data,
                self.items.len(),
                stack_size,
                self.item_context,
            );

            if !self.item_context.is_none() {
                loot_item.bonus_list_ids =
                    world.bonus_lists_for_item(loot_item.item_id, self.item_context);
            }

            self.items.push(loot_item);
            count -= stack_size;
        }
    }

    /// Generates the loot from template `loot_id` of `store_type` and
    /// distributes visibility to the owner, or the owner's group.
    ///
    /// Returns false when the template does not exist or the owner is not
    /// reachable.
    pub fn fill_loot(
        &mut self,
        loot_id: LootTemplateId,
        store_type: LootStoreType,
        storage: &LootStorage,
        world: &dyn LootWorld,
        owner_id: PlayerId,
        group: Option<&GroupInfo>,
        personal: bool,
        no_empty_error: bool,
        loot_mode: LootModeFlags,
        rng: &mut dyn RngCore,
    ) -> bool {
        let owner = if let Some(owner) = world.player(owner_id) {
            owner
        } else {
            return false;
        };

        let store = storage.store(store_type);
        let template = if let Some(template) = store.get_loot_for(loot_id) {
            template
        } else {
            if !no_empty_error {
                log::error!(target: "loot_tables",
                    "Table '{}' loot id #{} used but it doesn't have records.",
                    store_type.table_name(),
                    loot_id
                );
            }
            return false;
        };

        let mut ctx = LootProcessContext {
            storage,
            world,
            rng,
        };
        template.process(self, &mut ctx, store.rates_allowed(), loot_mode, 0, None);

        match group {
            Some(group) if !personal => {
                self.round_robin_player = Some(owner_id);

                for member_id in group.members.iter() {
                    if let Some(member) = world.player(*member_id) {
                        self.fill_not_normal_loot_for_player(world, member);
                    }
                }

                let blocks_above_threshold = matches!(
                    self.loot_method,
                    LootMethod::MasterLoot | LootMethod::GroupLoot | LootMethod::NeedBeforeGreed
                );

                for item in self.items.iter_mut() {
                    if !item.follows_loot_rules || item.is_free_for_all() {
                        continue;
                    }

                    if let Some(item_data) = world.item_database().get_item(item.item_id) {
                        if item_data.quality < group.loot_threshold {
                            item.is_under_threshold = true;
                        } else if blocks_above_threshold {
                            item.is_blocked = true;
                        }
                    }
                }
            }
            _ => self.fill_not_normal_loot_for_player(world, owner),
        }

        true
    }

    pub fn fill_not_normal_loot_for(&mut self, world: &dyn LootWorld, player_id: PlayerId) {
        if let Some(player) = world.player(player_id) {
            self.fill_not_normal_loot_for_player(world, player);
        }
    }

    /// Makes `player` an allowed looter of the loot and of every item they
    /// are eligible for, registering personal copies of free for all items.
    fn fill_not_normal_loot_for_player(&mut self, world: &dyn LootWorld, player: &dyn LootPlayer) {
        let player_id = player.id();
        let loot_master = self.loot_master_for_rules();
        self.allowed_looters.insert(player_id);

        for item in self.items.iter_mut() {
            if !item
                .eligibility()
                .is_allowed_for_player(world, player, loot_master, false)
            {
                continue;
            }

            item.add_allowed_looter(player_id);

            if item.is_free_for_all() {
                if item.register_free_for_all_looter(player_id) {
                    self.unlooted_count += 1;
                }
            } else if !item.is_counted {
                item.is_counted = true;
                self.unlooted_count += 1;
            }
        }
    }

    pub fn loot_item_in_slot(&self, slot: usize, player_id: PlayerId) -> Option<&LootItem> {
        self.items
            .get(slot)
            .filter(|item| !item.is_looted_for(player_id))
    }

    /// How `player_id` sees `item`, or `None` when it is not shown to them.
    pub fn slot_type_for(&self, item: &LootItem, player_id: PlayerId) -> Option<LootSlotType> {
        if item.is_looted_for(player_id) || !item.has_allowed_looter(player_id) {
            return None;
        }

        if let Some(roll_winner) = item.roll_winner {
            return if roll_winner == player_id {
                Some(LootSlotType::Owner)
            } else {
                None
            };
        }

        if item.is_blocked {
            return Some(match self.loot_method {
                LootMethod::MasterLoot if self.loot_master == Some(player_id) => {
                    LootSlotType::Master
                }
                LootMethod::MasterLoot => LootSlotType::Locked,
                _ => LootSlotType::RollOngoing,
            });
        }

        if item.is_free_for_all() || !item.follows_loot_rules {
            return Some(LootSlotType::AllowLoot);
        }

        let round_robin_locked = self
            .round_robin_player
            .map_or(false, |round_robin_player| round_robin_player != player_id);

        Some(match self.loot_method {
            LootMethod::FreeForAll | LootMethod::PersonalLoot => LootSlotType::AllowLoot,
            LootMethod::RoundRobin if round_robin_locked => LootSlotType::Locked,
            LootMethod::MasterLoot | LootMethod::GroupLoot | LootMethod::NeedBeforeGreed
                if item.is_under_threshold && round_robin_locked =>
            {
                LootSlotType::Locked
            }
            _ => LootSlotType::AllowLoot,
        })
    }

    pub fn build_loot_response(&self, player_id: PlayerId) -> LootResponse {
        let items = self
            .items
            .iter()
            .filter_map(|item| {
                self.slot_type_for(item, player_id)
                    .map(|slot_type| LootItemData {
                        slot: item.slot,
                        item_id: item.item_id,
                        count: item.count,
                        slot_type,
                        context: item.context,
                        bonus_list_ids: item.bonus_list_ids.clone(),
                    })
            })
            .collect();

        LootResponse {
            loot_id: self.loot_id,
            owner: self.owner,
            loot_type: self.loot_type,
            money: self.money,
            items,
        }
    }

    pub fn add_looter(&mut self, player_id: PlayerId) {
        self.players_looting.insert(player_id);
    }

    pub fn remove_looter(&mut self, player_id: PlayerId) {
        self.players_looting.remove(&player_id);
    }

    pub fn notify_item_removed(&self, world: &dyn LootWorld, slot: usize) {
        for player_id in self.players_looting.iter() {
            send_message(
                world,
                *player_id,
                ServerMessage::LootRemoved {
                    loot_id: self.loot_id,
                    owner: self.owner,
                    slot,
                },
            );
        }
    }

    pub fn notify_money_removed(&self, world: &dyn LootWorld) {
        for player_id in self.players_looting.iter() {
            send_message(
                world,
                *player_id,
                ServerMessage::LootClearMoney {
                    loot_id: self.loot_id,
                },
            );
        }
    }

    pub(crate) fn mark_item_looted(
        &mut self,
        world: &mut dyn LootWorld,
        player_id: PlayerId,
        slot: usize,
    ) {
        let item = if let Some(item) = self.items.get_mut(slot) {
            item
        } else {
            return;
        };

        if !item.mark_looted(player_id) {
            return;
        }

        let item_id = item.item_id;
        let count = item.count;
        let is_free_for_all = item.is_free_for_all();
        self.unlooted_count = self.unlooted_count.saturating_sub(1);

        world.update_criteria(player_id, CriteriaEvent::LootItem { item_id, count });

        if is_free_for_all {
            send_message(
                &*world,
                player_id,
                ServerMessage::LootRemoved {
                    loot_id: self.loot_id,
                    owner: self.owner,
                    slot,
                },
            );
        } else {
            self.notify_item_removed(&*world, slot);
        }
    }

    fn send_inventory_error(
        world: &dyn LootWorld,
        player_id: PlayerId,
        item_id: ItemId,
        error: InventoryError,
    ) {
        send_message(
            world,
            player_id,
            ServerMessage::InventoryError { item_id, error },
        );
    }

    /// Moves a single item from the loot into `player_id`'s inventory.
    pub fn loot_item(
        &mut self,
        world: &mut dyn LootWorld,
        player_id: PlayerId,
        slot: usize,
    ) -> Result<(), LootError> {
        let item = self.loot_item_in_slot(slot, player_id).ok_or(LootError::LootGone)?;

        if !item.has_allowed_looter(player_id) {
            return Err(LootError::NoPermission);
        }

        if item.is_blocked {
            return Err(if self.loot_method == LootMethod::MasterLoot {
                LootError::NoPermission
            } else {
                LootError::RollInProgress
            });
        }

        if !matches!(
            self.slot_type_for(item, player_id),
            Some(LootSlotType::AllowLoot | LootSlotType::Owner)
        ) {
            return Err(LootError::NoPermission);
        }

        if let Err(error) = world.try_store_new_item(player_id, StoreDestination::ANY, item) {
            Self::send_inventory_error(&*world, player_id, item.item_id, error);
            return Err(error.into());
        }

        self.mark_item_looted(world, player_id, slot);
        Ok(())
    }

    /// Stores every item `player_id` may currently take. Each item tries
    /// the requested destination first and falls back to any free space.
    pub fn auto_store(
        &mut self,
        world: &mut dyn LootWorld,
        player_id: PlayerId,
        destination: StoreDestination,
    ) -> Result<(), AutoStoreError> {
        let mut failures = Vec::new();

        for slot in 0..self.items.len() {
            let item = &self.items[slot];
            if item.is_looted_for(player_id)
                || !item.has_allowed_looter(player_id)
                || item.is_blocked
                || item
                    .roll_winner
                    .map_or(false, |roll_winner| roll_winner != player_id)
            {
                continue;
            }

            let mut result = Err(InventoryError::InventoryFull);
            for fallback in destination.fallbacks() {
                result = world.try_store_new_item(player_id, fallback, item);
                if result.is_ok() {
                    break;
                }
            }

            match result {
                Ok(()) => self.mark_item_looted(world, player_id, slot),
                Err(error) => {
                    Self::send_inventory_error(&*world, player_id, item.item_id, error);
                    failures.push(AutoStoreFailure {
                        slot,
                        item_id: item.item_id,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AutoStoreError { failures })
        }
    }

    /// Hands out the money. Corpse loot shared by several allowed looters is
    /// split evenly among those still reachable.
    pub fn loot_money(
        &mut self,
        world: &mut dyn LootWorld,
        player_id: PlayerId,
    ) -> Result<(), LootError> {
        if self.money.is_zero() {
            return Ok(());
        }

        if !self.has_allowed_looter(player_id) {
            return Err(LootError::NoPermission);
        }

        let recipients: Vec<PlayerId> = if self.loot_type == LootType::Corpse
            && self.loot_method != LootMethod::PersonalLoot
        {
            self.allowed_looters
                .iter()
                .copied()
                .filter(|looter| world.player(*looter).is_some())
                .collect()
        } else {
            Vec::new()
        };

        if recipients.len() > 1 {
            let share = self.money / recipients.len() as u64;

            for recipient in recipients {
                match world.try_add_money(recipient, share) {
                    Ok(()) => {
                        send_message(
                            &*world,
                            recipient,
                            ServerMessage::LootMoneyNotify {
                                money: share,
                                sole_looter: false,
                            },
                        );
                        world.update_criteria(recipient, CriteriaEvent::LootMoney { money: share });
                    }
                    Err(error) => {
                        log::debug!(
                            "Player {} could not receive {} money from loot {:?}: {}",
                            recipient,
                            share.0,
                            self.loot_id,
                            error
                        );
                    }
                }
            }
        } else {
            let money = self.money;
            world.try_add_money(player_id, money)?;
            send_message(
                &*world,
                player_id,
                ServerMessage::LootMoneyNotify {
                    money,
                    sole_looter: true,
                },
            );
            world.update_criteria(player_id, CriteriaEvent::LootMoney { money });
        }

        self.money = Money::ZERO;
        self.notify_money_removed(&*world);
        Ok(())
    }

    /// The master looter assigns a blocked item to an eligible player.
    pub fn give_master_loot(
        &mut self,
        world: &mut dyn LootWorld,
        master_id: PlayerId,
        slot: usize,
        target_id: PlayerId,
    ) -> Result<(), LootError> {
        if self.loot_method != LootMethod::MasterLoot || self.loot_master != Some(master_id) {
            return Err(LootError::NotMasterLooter);
        }

        let item = self.items.get(slot).ok_or(LootError::LootGone)?;
        if item.is_looted() || item.is_free_for_all() {
            return Err(LootError::LootGone);
        }

        if !item.has_allowed_looter(target_id) || world.player(target_id).is_none() {
            return Err(LootError::InvalidTarget);
        }

        if let Err(error) = world.try_store_new_item(target_id, StoreDestination::ANY, item) {
            Self::send_inventory_error(&*world, master_id, item.item_id, error);
            return Err(error.into());
        }

        self.items[slot].is_blocked = false;
        self.mark_item_looted(world, target_id, slot);
        Ok(())
    }

    /// Called whenever a player opens the loot window. The first opening
    /// starts the rolls for blocked items, or sends the master looter the
    /// list of candidates.
    pub fn on_loot_opened(
        &mut self,
        world: &dyn LootWorld,
        looter_id: PlayerId,
        now: Instant,
        config: &LootConfig,
    ) {
        self.add_looter(looter_id);

        if self.was_opened {
            return;
        }
        self.was_opened = true;

        if self.loot_method.uses_rolls() {
            let max_enchanting_skill = self
                .allowed_looters
                .iter()
                .filter_map(|player_id| world.player(*player_id))
                .map(|player| player.skill_value(SkillId::ENCHANTING))
                .max()
                .unwrap_or(0);

            for slot in 0..self.items.len() {
                if !self.items[slot].is_blocked {
                    continue;
                }

                let mut roll = LootRoll::new(self.loot_id, slot, self.dungeon_encounter_id);
                if roll.try_to_start(
                    world,
                    &mut self.items[slot],
                    max_enchanting_skill,
                    now,
                    config.loot_roll_timeout(),
                ) {
                    self.rolls.insert(slot, roll);
                }
            }
        } else if self.loot_method == LootMethod::MasterLoot
            && self.loot_master == Some(looter_id)
        {
            send_message(
                world,
                looter_id,
                ServerMessage::MasterLootCandidateList {
                    loot_id: self.loot_id,
                    players: self
                        .allowed_looters
                        .iter()
                        .copied()
                        .filter(|player_id| world.player(*player_id).is_some())
                        .collect(),
                },
            );
        }
    }

    pub fn player_vote(
        &mut self,
        world: &mut dyn LootWorld,
        player_id: PlayerId,
        slot: usize,
        vote: RollVote,
        rng: &mut dyn RngCore,
    ) -> bool {
        self.rolls
            .get_mut(&slot)
            .map_or(false, |roll| roll.player_vote(world, player_id, vote, rng))
    }

    pub fn update(
        &mut self,
        world: &mut dyn LootWorld,
        storage: &LootStorage,
        now: Instant,
        rng: &mut dyn RngCore,
    ) {
        loot_roll_system(self, world, storage, now, rng);
    }

    /// Cancels running rolls and empties the loot.
    pub fn clear(&mut self, world: &dyn LootWorld) {
        for roll in self.rolls.values_mut() {
            roll.cancel(world);
        }

        self.rolls.clear();
        self.items.clear();
        self.money = Money::ZERO;
        self.allowed_looters.clear();
        self.players_looting.clear();
        self.round_robin_player = None;
        self.unlooted_count = 0;
        self.was_opened = false;
    }
}
