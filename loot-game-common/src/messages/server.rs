use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use loot_data::{BonusListId, DungeonEncounterId, ItemContext, ItemId};

use crate::{
    components::{InventoryError, Money, PlayerId},
    messages::{LootId, LootSlotType, LootType, RollVote, RollVoteMask, WorldObjectId},
};

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LootError {
    #[error("Loot is gone")]
    LootGone,
    #[error("You don't have permission to loot that item")]
    NoPermission,
    #[error("A roll is in progress for that item")]
    RollInProgress,
    #[error("Only the master looter can assign that item")]
    NotMasterLooter,
    #[error("Player is not eligible to receive that item")]
    InvalidTarget,
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootItemData {
    pub slot: usize,
    pub item_id: ItemId,
    pub count: u32,
    pub slot_type: LootSlotType,
    pub context: ItemContext,
    pub bonus_list_ids: Vec<BonusListId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootResponse {
    pub loot_id: LootId,
    pub owner: WorldObjectId,
    pub loot_type: LootType,
    pub money: Money,
    pub items: Vec<LootItemData>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartLootRoll {
    pub loot_id: LootId,
    pub slot: usize,
    pub item_id: ItemId,
    pub count: u32,
    pub roll_time: Duration,
    pub valid_rolls: RollVoteMask,
    pub dungeon_encounter_id: Option<DungeonEncounterId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootRollBroadcast {
    pub loot_id: LootId,
    pub slot: usize,
    pub player_id: PlayerId,
    pub roll_number: Option<u8>,
    pub vote: RollVote,
    pub auto_pass: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootRollWon {
    pub loot_id: LootId,
    pub slot: usize,
    pub item_id: ItemId,
    pub winner: PlayerId,
    pub roll_number: u8,
    pub vote: RollVote,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootAllPassed {
    pub loot_id: LootId,
    pub slot: usize,
    pub item_id: ItemId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    LootResponse(LootResponse),
    LootRemoved {
        loot_id: LootId,
        owner: WorldObjectId,
        slot: usize,
    },
    LootMoneyNotify {
        money: Money,
        sole_looter: bool,
    },
    LootClearMoney {
        loot_id: LootId,
    },
    LootError {
        loot_id: LootId,
        error: LootError,
    },
    StartLootRoll(StartLootRoll),
    LootRoll(LootRollBroadcast),
    LootRollWon(LootRollWon),
    LootAllPassed(LootAllPassed),
    LootRollsComplete {
        loot_id: LootId,
        slot: usize,
    },
    MasterLootCandidateList {
        loot_id: LootId,
        players: Vec<PlayerId>,
    },
    InventoryError {
        item_id: ItemId,
        error: InventoryError,
    },
}
