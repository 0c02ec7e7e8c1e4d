use parking_lot::RwLock;
use std::sync::Arc;

use loot_data::ItemDatabase;

use crate::game::resources::{LootConfig, LootDatabase, LootLoadReport, LootStorage};

/// Holds the live loot tables. Readers take a snapshot, a reload builds a
/// complete new storage and swaps it in, so a snapshot never changes.
pub struct LootTableRegistry {
    current: RwLock<Arc<LootStorage>>,
}

impl LootTableRegistry {
    pub fn new(storage: LootStorage) -> Self {
        Self {
            current: RwLock::new(Arc::new(storage)),
        }
    }

    pub fn snapshot(&self) -> Arc<LootStorage> {
        self.current.read().clone()
    }

    pub fn publish(&self, storage: LootStorage) {
        *self.current.write() = Arc::new(storage);
    }

    pub fn reload(
        &self,
        database: &mut dyn LootDatabase,
        item_database: &ItemDatabase,
        config: LootConfig,
    ) -> Result<LootLoadReport, anyhow::Error> {
        let (storage, report) = LootStorage::load(database, item_database, config)?;
        self.publish(storage);

        log::info!(target: "loot_tables",
            "Reloaded loot tables with {} errors and {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
        Ok(report)
    }
}
