use anyhow::Context;
use enum_map::{enum_map, EnumMap};
use serde::Deserialize;
use std::{path::Path, time::Duration};

use loot_data::ItemQuality;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Chance multiplier for item drops, per item quality.
    pub rate_drop_item: EnumMap<ItemQuality, f32>,

    /// Chance multiplier for reference entries.
    pub rate_drop_item_referenced: f32,

    /// Multiplier applied to how many times a reference is expanded.
    pub rate_drop_item_referenced_amount: f32,

    pub rate_drop_money: f32,
    pub max_loot_items: usize,
    pub loot_roll_timeout_secs: u64,

    /// Remove rows that fail validation from the loot database on load.
    pub delete_invalid_rows: bool,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            rate_drop_item: enum_map! { _ => 1.0 },
            rate_drop_item_referenced: 1.0,
            rate_drop_item_referenced_amount: 1.0,
            rate_drop_money: 1.0,
            max_loot_items: 18,
            loot_roll_timeout_secs: 60,
            delete_invalid_rows: false,
        }
    }
}

impl LootConfig {
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file {}", path.to_string_lossy()))?;
        let config: Self = serde_json::from_str(&str).with_context(|| {
            format!(
                "Failed to deserialise LootConfig from file {}",
                path.to_string_lossy()
            )
        })?;
        Ok(config)
    }

    pub fn item_rate(&self, quality: ItemQuality) -> f32 {
        self.rate_drop_item[quality]
    }

    pub fn loot_roll_timeout(&self) -> Duration {
        Duration::from_secs(self.loot_roll_timeout_secs)
    }
}
