mod game_client;
mod group_info;
mod loot;
mod loot_item;
mod loot_roll;

pub use game_client::GameClient;
pub use group_info::{GroupInfo, MAX_GROUP_MEMBERS};
pub use loot::{AutoStoreError, AutoStoreFailure, Loot};
pub use loot_item::{LootItem, LootItemVisibility};
pub use loot_roll::{LootRoll, LootRollOutcome, LootRollState, LootRollVoter};
