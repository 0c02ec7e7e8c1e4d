use arrayvec::ArrayVec;

use loot_data::ItemQuality;
use loot_game_common::{components::PlayerId, messages::LootMethod};

pub const MAX_GROUP_MEMBERS: usize = 40;

#[derive(Clone, Debug)]
pub struct GroupInfo {
    pub members: ArrayVec<PlayerId, MAX_GROUP_MEMBERS>,
    pub loot_method: LootMethod,
    pub loot_threshold: ItemQuality,
    pub master_looter: Option<PlayerId>,
}

impl GroupInfo {
    pub fn new(loot_method: LootMethod, loot_threshold: ItemQuality, members: &[PlayerId]) -> Self {
        let mut group_members = ArrayVec::new();
        for member in members.iter().take(MAX_GROUP_MEMBERS) {
            group_members.push(*member);
        }
        Self {
            members: group_members,
            loot_method,
            loot_threshold,
            master_looter: None,
        }
    }

    pub fn with_master_looter(mut self, master_looter: PlayerId) -> Self {
        self.master_looter = Some(master_looter);
        self
    }

    pub fn is_member(&self, player_id: PlayerId) -> bool {
        self.members.contains(&player_id)
    }
}
