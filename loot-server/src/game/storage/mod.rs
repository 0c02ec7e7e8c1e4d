use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;

mod loot_item_storage;

pub use loot_item_storage::{LootItemStorage, StoredLootContainer, StoredLootItem};

lazy_static! {
    pub static ref LOCAL_STORAGE_DIR: PathBuf = ProjectDirs::from("", "", "loot-server")
        .map(|project| PathBuf::from(project.data_local_dir()))
        .unwrap_or_else(|| PathBuf::from("data"));
    pub static ref LOOT_STORAGE_DIR: PathBuf = LOCAL_STORAGE_DIR.join("loot");
}
