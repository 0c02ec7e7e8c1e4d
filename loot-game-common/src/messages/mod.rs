use serde::{Deserialize, Serialize};

pub mod server;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldObjectId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LootMethod {
    FreeForAll,
    RoundRobin,
    MasterLoot,
    GroupLoot,
    NeedBeforeGreed,
    PersonalLoot,
}

impl LootMethod {
    pub fn uses_rolls(self) -> bool {
        matches!(self, LootMethod::GroupLoot | LootMethod::NeedBeforeGreed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LootType {
    None,
    Corpse,
    Pickpocketing,
    Fishing,
    Disenchanting,
    Item,
    Skinning,
    Prospecting,
    Milling,
    Insignia,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LootSlotType {
    AllowLoot,
    RollOngoing,
    Master,
    Locked,
    Owner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollVote {
    NotVoted,
    Pass,
    Need,
    Greed,
    Disenchant,
    Invalid,
}

impl RollVote {
    pub fn mask(self) -> RollVoteMask {
        match self {
            RollVote::Pass => RollVoteMask::PASS,
            RollVote::Need => RollVoteMask::NEED,
            RollVote::Greed => RollVoteMask::GREED,
            RollVote::Disenchant => RollVoteMask::DISENCHANT,
            RollVote::NotVoted | RollVote::Invalid => RollVoteMask::empty(),
        }
    }
}

bitflags::bitflags! {
    #[derive(Serialize, Deserialize)]
    #[repr(transparent)]
    pub struct RollVoteMask : u8 {
        const PASS       = 1 << 0;
        const NEED       = 1 << 1;
        const GREED      = 1 << 2;
        const DISENCHANT = 1 << 3;
        const ALL        = Self::PASS.bits | Self::NEED.bits | Self::GREED.bits | Self::DISENCHANT.bits;
    }
}
