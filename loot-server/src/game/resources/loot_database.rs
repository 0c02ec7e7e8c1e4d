use anyhow::Context;
use enum_map::EnumMap;
use std::{io::Write, path::PathBuf};

use loot_data::{LootRow, LootStoreType};

/// Source of loot table rows.
pub trait LootDatabase {
    fn load_loot_rows(&self, store_type: LootStoreType) -> Result<Vec<LootRow>, anyhow::Error>;

    fn delete_loot_row(
        &mut self,
        store_type: LootStoreType,
        row: &LootRow,
    ) -> Result<(), anyhow::Error>;
}

/// One `<table name>.json` file per loot table, each an array of rows. A
/// missing file is an empty table.
pub struct JsonLootDatabase {
    root_path: PathBuf,
}

impl JsonLootDatabase {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    pub fn table_path(&self, store_type: LootStoreType) -> PathBuf {
        self.root_path
            .join(format!("{}.json", store_type.table_name()))
    }

    fn save_rows(&self, store_type: LootStoreType, rows: &[LootRow]) -> Result<(), anyhow::Error> {
        let path = self.table_path(store_type);

        let json = serde_json::to_string_pretty(rows).with_context(|| {
            format!(
                "Failed to serialise rows whilst saving loot table {}",
                store_type.table_name()
            )
        })?;

        let mut file = tempfile::NamedTempFile::new_in(&self.root_path).with_context(|| {
            format!(
                "Failed to create temporary file whilst saving loot table {}",
                store_type.table_name()
            )
        })?;
        file.write_all(json.as_bytes()).with_context(|| {
            format!(
                "Failed to write data to temporary file whilst saving loot table {}",
                store_type.table_name()
            )
        })?;
        file.persist(&path).with_context(|| {
            format!(
                "Failed to persist temporary loot table file to path {}",
                path.to_string_lossy()
            )
        })?;

        Ok(())
    }
}

impl LootDatabase for JsonLootDatabase {
    fn load_loot_rows(&self, store_type: LootStoreType) -> Result<Vec<LootRow>, anyhow::Error> {
        let path = self.table_path(store_type);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let str = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file {}", path.to_string_lossy()))?;
        let rows: Vec<LootRow> = serde_json::from_str(&str).with_context(|| {
            format!(
                "Failed to deserialise loot rows from file {}",
                path.to_string_lossy()
            )
        })?;
        Ok(rows)
    }

    fn delete_loot_row(
        &mut self,
        store_type: LootStoreType,
        row: &LootRow,
    ) -> Result<(), anyhow::Error> {
        let mut rows = self.load_loot_rows(store_type)?;
        rows.retain(|existing| existing != row);
        self.save_rows(store_type, &rows)
    }
}

#[derive(Default)]
pub struct InMemoryLootDatabase {
    tables: EnumMap<LootStoreType, Vec<LootRow>>,
}

impl InMemoryLootDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, store_type: LootStoreType, rows: Vec<LootRow>) -> Self {
        self.tables[store_type].extend(rows);
        self
    }

    pub fn rows(&self, store_type: LootStoreType) -> &[LootRow] {
        &self.tables[store_type]
    }
}

impl LootDatabase for InMemoryLootDatabase {
    fn load_loot_rows(&self, store_type: LootStoreType) -> Result<Vec<LootRow>, anyhow::Error> {
        Ok(self.tables[store_type].clone())
    }

    fn delete_loot_row(
        &mut self,
        store_type: LootStoreType,
        row: &LootRow,
    ) -> Result<(), anyhow::Error> {
        self.tables[store_type].retain(|existing| existing != row);
        Ok(())
    }
}
