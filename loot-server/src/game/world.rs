use arrayvec::ArrayVec;

use loot_data::{
    BonusListId, ConditionId, DungeonEncounterId, ItemContext, ItemData, ItemDatabase, ItemId,
    QuestId, SkillId, SpellId,
};
use loot_game_common::{
    components::{InventoryError, Money, PlayerId, Team},
    messages::{server::ServerMessage, RollVote},
};

use crate::game::components::{GameClient, LootItem};

/// The view of a player that loot generation and distribution needs.
pub trait LootPlayer {
    fn id(&self) -> PlayerId;
    fn team(&self) -> Team;

    fn has_quest_for_item(&self, item_id: ItemId) -> bool;

    /// True once the quest has any status for this player, started or finished.
    fn has_started_quest(&self, quest_id: QuestId) -> bool;

    fn has_skill(&self, skill_id: SkillId) -> bool;
    fn skill_value(&self, skill_id: SkillId) -> u16;
    fn has_spell(&self, spell_id: SpellId) -> bool;

    fn can_use_by_specialization(&self, item: &ItemData) -> bool;
    fn can_roll_need_for_item(&self, item: &ItemData) -> bool;

    /// Player has opted to automatically pass on every group loot roll.
    fn pass_on_group_loot(&self) -> bool;

    fn is_locked_to_dungeon_encounter(&self, dungeon_encounter_id: DungeonEncounterId) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
pub enum CriteriaEvent {
    LootItem { item_id: ItemId, count: u32 },
    LootMoney { money: Money },
    Roll { vote: RollVote, item_id: ItemId, roll_number: u8 },
    WonRoll { vote: RollVote, item_id: ItemId, roll_number: u8 },
    CastSpell(SpellId),
}

/// Where in a player's bags an item should be placed, `None` lets the
/// inventory pick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreDestination {
    pub bag: Option<u8>,
    pub slot: Option<u8>,
}

impl StoreDestination {
    pub const ANY: StoreDestination = StoreDestination {
        bag: None,
        slot: None,
    };

    pub fn new(bag: Option<u8>, slot: Option<u8>) -> Self {
        Self { bag, slot }
    }

    /// Destinations to attempt in order: the exact slot, then anywhere in
    /// the requested bag, then anywhere at all.
    pub fn fallbacks(self) -> ArrayVec<StoreDestination, 3> {
        let mut destinations = ArrayVec::new();
        destinations.push(self);

        if self.slot.is_some() {
            destinations.push(StoreDestination::new(self.bag, None));
        }

        if self.bag.is_some() {
            destinations.push(StoreDestination::ANY);
        }

        destinations
    }
}

/// Everything outside of the loot engine: player lookup, inventories,
/// conditions, mail and the client connections.
pub trait LootWorld {
    fn item_database(&self) -> &ItemDatabase;

    /// Returns the player only when they are online and reachable.
    fn player(&self, player_id: PlayerId) -> Option<&dyn LootPlayer>;

    fn game_client(&self, player_id: PlayerId) -> Option<&GameClient>;

    fn conditions_met(&self, player: &dyn LootPlayer, conditions: &[ConditionId]) -> bool;

    fn bonus_lists_for_item(&self, item_id: ItemId, context: ItemContext) -> Vec<BonusListId>;

    fn try_store_new_item(
        &mut self,
        player_id: PlayerId,
        destination: StoreDestination,
        item: &LootItem,
    ) -> Result<(), InventoryError>;

    fn try_add_money(&mut self, player_id: PlayerId, money: Money) -> Result<(), InventoryError>;

    fn send_item_retrieval_mail(&mut self, player_id: PlayerId, item: &LootItem);

    fn update_criteria(&mut self, player_id: PlayerId, event: CriteriaEvent);
}

pub fn send_message(world: &dyn LootWorld, player_id: PlayerId, message: ServerMessage) {
    if let Some(game_client) = world.game_client(player_id) {
        game_client.server_message_tx.send(message).ok();
    }
}
