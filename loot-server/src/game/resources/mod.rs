mod loot_config;
mod loot_database;
mod loot_store;
mod loot_table_registry;
mod loot_template;

pub use loot_config::LootConfig;
pub use loot_database::{InMemoryLootDatabase, JsonLootDatabase, LootDatabase};
pub use loot_store::{LootLoadError, LootLoadReport, LootStorage, LootStore};
pub use loot_table_registry::LootTableRegistry;
pub use loot_template::{LootGroup, LootProcessContext, LootTemplate};

pub(crate) use loot_template::{referenced_amount, roll_store_item};
