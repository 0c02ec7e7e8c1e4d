use crossbeam_channel::Receiver;
use std::collections::{BTreeMap, HashMap, HashSet};

use loot_data::{
    BonusListId, ConditionId, DungeonEncounterId, ItemContext, ItemData, ItemDatabase, ItemId,
    QuestId, SkillId, SpellId,
};
use loot_game_common::{
    components::{InventoryError, Money, PlayerId, Team},
    messages::server::ServerMessage,
};

use crate::game::{
    components::{GameClient, LootItem},
    CriteriaEvent, LootPlayer, LootWorld, StoreDestination,
};

pub struct TestPlayer {
    pub id: PlayerId,
    pub team: Team,
    pub quest_items: HashSet<ItemId>,
    pub started_quests: HashSet<QuestId>,
    pub skills: HashMap<SkillId, u16>,
    pub spells: HashSet<SpellId>,
    pub pass_on_group_loot: bool,
    pub can_roll_need: bool,
    pub usable_by_specialization: bool,
    pub locked_encounters: HashSet<DungeonEncounterId>,
}

impl TestPlayer {
    pub fn new(id: u64) -> Self {
        Self {
            id: PlayerId(id),
            team: Team::Alliance,
            quest_items: HashSet::new(),
            started_quests: HashSet::new(),
            skills: HashMap::new(),
            spells: HashSet::new(),
            pass_on_group_loot: false,
            can_roll_need: true,
            usable_by_specialization: true,
            locked_encounters: HashSet::new(),
        }
    }
}

impl LootPlayer for TestPlayer {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn team(&self) -> Team {
        self.team
    }

    fn has_quest_for_item(&self, item_id: ItemId) -> bool {
        self.quest_items.contains(&item_id)
    }

    fn has_started_quest(&self, quest_id: QuestId) -> bool {
        self.started_quests.contains(&quest_id)
    }

    fn has_skill(&self, skill_id: SkillId) -> bool {
        self.skills.contains_key(&skill_id)
    }

    fn skill_value(&self, skill_id: SkillId) -> u16 {
        self.skills.get(&skill_id).copied().unwrap_or(0)
    }

    fn has_spell(&self, spell_id: SpellId) -> bool {
        self.spells.contains(&spell_id)
    }

    fn can_use_by_specialization(&self, _item: &ItemData) -> bool {
        self.usable_by_specialization
    }

    fn can_roll_need_for_item(&self, _item: &ItemData) -> bool {
        self.can_roll_need
    }

    fn pass_on_group_loot(&self) -> bool {
        self.pass_on_group_loot
    }

    fn is_locked_to_dungeon_encounter(&self, dungeon_encounter_id: DungeonEncounterId) -> bool {
        self.locked_encounters.contains(&dungeon_encounter_id)
    }
}

pub struct TestWorld {
    pub items: ItemDatabase,
    pub players: BTreeMap<PlayerId, TestPlayer>,
    pub game_clients: HashMap<PlayerId, GameClient>,
    pub message_receivers: HashMap<PlayerId, Receiver<ServerMessage>>,
    pub inventories: HashMap<PlayerId, Vec<(ItemId, u32)>>,
    pub inventory_capacity: HashMap<PlayerId, usize>,
    pub money: HashMap<PlayerId, Money>,
    pub mail: Vec<(PlayerId, ItemId, u32)>,
    pub criteria: Vec<(PlayerId, CriteriaEvent)>,
    pub failed_conditions: HashSet<ConditionId>,
    pub bonus_lists: Vec<BonusListId>,
    pub store_attempts: Vec<StoreDestination>,
    pub only_accept_any_destination: bool,
}

impl TestWorld {
    pub fn new(items: Vec<ItemData>) -> Self {
        Self {
            items: ItemDatabase::new(items),
            players: BTreeMap::new(),
            game_clients: HashMap::new(),
            message_receivers: HashMap::new(),
            inventories: HashMap::new(),
            inventory_capacity: HashMap::new(),
            money: HashMap::new(),
            mail: Vec::new(),
            criteria: Vec::new(),
            failed_conditions: HashSet::new(),
            bonus_lists: Vec::new(),
            store_attempts: Vec::new(),
            only_accept_any_destination: false,
        }
    }

    pub fn add_player(&mut self, player: TestPlayer) -> PlayerId {
        let player_id = player.id;
        let (server_message_tx, server_message_rx) = crossbeam_channel::unbounded();
        self.game_clients
            .insert(player_id, GameClient::new(server_message_tx));
        self.message_receivers.insert(player_id, server_message_rx);
        self.players.insert(player_id, player);
        player_id
    }

    pub fn with_players(mut self, ids: &[u64]) -> Self {
        for id in ids {
            self.add_player(TestPlayer::new(*id));
        }
        self
    }

    pub fn player_mut(&mut self, player_id: PlayerId) -> &mut TestPlayer {
        self.players.get_mut(&player_id).unwrap()
    }

    pub fn remove_player(&mut self, player_id: PlayerId) {
        self.players.remove(&player_id);
        self.game_clients.remove(&player_id);
    }

    pub fn take_messages(&self, player_id: PlayerId) -> Vec<ServerMessage> {
        self.message_receivers
            .get(&player_id)
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    pub fn inventory_count(&self, player_id: PlayerId, item_id: ItemId) -> u32 {
        self.inventories
            .get(&player_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|(id, _)| *id == item_id)
                    .map(|(_, count)| count)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn money_of(&self, player_id: PlayerId) -> Money {
        self.money.get(&player_id).copied().unwrap_or_default()
    }
}

impl LootWorld for TestWorld {
    fn item_database(&self) -> &ItemDatabase {
        &self.items
    }

    fn player(&self, player_id: PlayerId) -> Option<&dyn LootPlayer> {
        self.players
            .get(&player_id)
            .map(|player| player as &dyn LootPlayer)
    }

    fn game_client(&self, player_id: PlayerId) -> Option<&GameClient> {
        self.game_clients.get(&player_id)
    }

    fn conditions_met(&self, _player: &dyn LootPlayer, conditions: &[ConditionId]) -> bool {
        !conditions
            .iter()
            .any(|condition| self.failed_conditions.contains(condition))
    }

    fn bonus_lists_for_item(&self, _item_id: ItemId, _context: ItemContext) -> Vec<BonusListId> {
        self.bonus_lists.clone()
    }

    fn try_store_new_item(
        &mut self,
        player_id: PlayerId,
        destination: StoreDestination,
        item: &LootItem,
    ) -> Result<(), InventoryError> {
        self.store_attempts.push(destination);

        if !self.players.contains_key(&player_id) {
            return Err(InventoryError::NotAllowed);
        }

        if self.only_accept_any_destination && destination != StoreDestination::ANY {
            return Err(InventoryError::InventoryFull);
        }

        let inventory = self.inventories.entry(player_id).or_default();
        if let Some(capacity) = self.inventory_capacity.get(&player_id) {
            if inventory.len() >= *capacity {
                return Err(InventoryError::InventoryFull);
            }
        }

        inventory.push((item.item_id, item.count));
        Ok(())
    }

    fn try_add_money(&mut self, player_id: PlayerId, money: Money) -> Result<(), InventoryError> {
        if !self.players.contains_key(&player_id) {
            return Err(InventoryError::NotAllowed);
        }

        let balance = self.money.entry(player_id).or_default();
        *balance = *balance + money;
        Ok(())
    }

    fn send_item_retrieval_mail(&mut self, player_id: PlayerId, item: &LootItem) {
        self.mail.push((player_id, item.item_id, item.count));
    }

    fn update_criteria(&mut self, player_id: PlayerId, event: CriteriaEvent) {
        self.criteria.push((player_id, event));
    }
}
