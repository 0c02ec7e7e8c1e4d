use anyhow::Context;
use enum_map::{enum_map, EnumMap};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use loot_data::{
    ItemDatabase, LootRow, LootStoreItem, LootStoreItemError, LootStoreType, LootTemplateId,
};

use crate::game::{
    resources::{LootConfig, LootDatabase, LootTemplate},
    LootPlayer,
};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LootLoadError {
    #[error("Table '{}' entry {} item {} reference {}: {}", .store_type.table_name(), .row.entry, .row.item, .row.reference, .error)]
    InvalidRow {
        store_type: LootStoreType,
        row: LootRow,
        error: LootStoreItemError,
    },
    #[error("Table '{}' entry {} has reference to non-existent reference id {}", .store_type.table_name(), .entry, .reference)]
    UnresolvedReference {
        store_type: LootStoreType,
        entry: LootTemplateId,
        reference: LootTemplateId,
    },
    #[error("Table '{}' entry {} group {} has total chance > 100% ({})", .store_type.table_name(), .entry, .group_id, .total_chance)]
    GroupChanceOverflow {
        store_type: LootStoreType,
        entry: LootTemplateId,
        group_id: u8,
        total_chance: f32,
    },
    #[error("Table '{}' entry {} group {} has items with chance=0% but group total chance >= 100%", .store_type.table_name(), .entry, .group_id)]
    EqualChancedUnreachable {
        store_type: LootStoreType,
        entry: LootTemplateId,
        group_id: u8,
    },
    #[error("Reference {} forms a cycle through reference {}, the reference was removed", .entry, .reference)]
    ReferenceCycle {
        entry: LootTemplateId,
        reference: LootTemplateId,
    },
}

#[derive(Debug, Default)]
pub struct LootLoadReport {
    pub loaded_rows: EnumMap<LootStoreType, usize>,
    pub errors: Vec<LootLoadError>,
    pub warnings: Vec<LootLoadError>,
    pub unused_references: Vec<LootTemplateId>,
}

impl LootLoadReport {
    pub(crate) fn error(&mut self, error: LootLoadError) {
        log::error!(target: "loot_tables", "{}", error);
        self.errors.push(error);
    }

    pub(crate) fn warning(&mut self, warning: LootLoadError) {
        log::warn!(target: "loot_tables", "{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.unused_references.is_empty()
    }

    pub fn invalid_rows(&self) -> impl Iterator<Item = (LootStoreType, &LootRow)> {
        self.errors.iter().filter_map(|error| match error {
            LootLoadError::InvalidRow {
                store_type, row, ..
            } => Some((*store_type, row)),
            _ => None,
        })
    }
}

/// All templates of one loot table, keyed by template id.
pub struct LootStore {
    store_type: LootStoreType,
    templates: BTreeMap<LootTemplateId, LootTemplate>,
}

impl LootStore {
    pub fn new(store_type: LootStoreType) -> Self {
        Self {
            store_type,
            templates: BTreeMap::new(),
        }
    }

    pub fn store_type(&self) -> LootStoreType {
        self.store_type
    }

    pub fn rates_allowed(&self) -> bool {
        self.store_type.rates_allowed()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LootTemplateId, &LootTemplate)> {
        self.templates.iter()
    }

    pub fn template_ids(&self) -> impl Iterator<Item = LootTemplateId> + '_ {
        self.templates.keys().copied()
    }

    pub fn get_loot_for(&self, entry: LootTemplateId) -> Option<&LootTemplate> {
        self.templates.get(&entry)
    }

    pub fn have_loot_for(&self, entry: LootTemplateId) -> bool {
        self.templates.contains_key(&entry)
    }

    pub fn have_quest_loot_for(&self, entry: LootTemplateId, references: &LootStore) -> bool {
        self.get_loot_for(entry)
            .map_or(false, |template| template.has_quest_drop(references, 0))
    }

    pub fn have_quest_loot_for_player(
        &self,
        entry: LootTemplateId,
        references: &LootStore,
        player: &dyn LootPlayer,
    ) -> bool {
        self.get_loot_for(entry).map_or(false, |template| {
            template.has_quest_drop_for_player(references, player, 0)
        })
    }

    /// Adds an already validated entry.
    pub fn add_entry(&mut self, entry: LootTemplateId, store_item: LootStoreItem) {
        self.templates.entry(entry).or_default().add_entry(store_item);
    }

    /// Replaces the contents of the store with `rows`. Rows that fail
    /// validation are reported and returned, the rest are loaded.
    pub fn load(
        &mut self,
        rows: impl IntoIterator<Item = LootRow>,
        item_database: &ItemDatabase,
        report: &mut LootLoadReport,
    ) -> Vec<LootRow> {
        self.templates.clear();

        let mut invalid_rows = Vec::new();
        let mut loaded_rows = 0;

        for row in rows {
            let store_item = LootStoreItem::from_row(&row);
            if let Err(error) = store_item.validate(self.store_type, row.entry, item_database) {
                report.error(LootLoadError::InvalidRow {
                    store_type: self.store_type,
                    row: row.clone(),
                    error,
                });
                invalid_rows.push(row);
                continue;
            }

            self.add_entry(row.entry, store_item);
            loaded_rows += 1;
        }

        for (entry, template) in self.templates.iter() {
            template.verify(self.store_type, *entry, report);
        }

        report.loaded_rows[self.store_type] = loaded_rows;
        if loaded_rows > 0 {
            log::info!(target: "loot_tables",
                ">> Loaded {} loot definitions ({} templates) from {}",
                loaded_rows,
                self.templates.len(),
                self.store_type.table_name()
            );
        } else {
            log::info!(target: "loot_tables",
                ">> Loaded 0 loot definitions. DB table '{}' is empty.",
                self.store_type.table_name()
            );
        }

        invalid_rows
    }

    pub fn check_loot_refs(
        &self,
        references: &LootStore,
        used_references: &mut HashSet<LootTemplateId>,
        report: &mut LootLoadReport,
    ) {
        for (entry, template) in self.templates.iter() {
            template.check_loot_refs(
                references,
                self.store_type,
                *entry,
                used_references,
                report,
            );
        }
    }

    pub fn report_unused_ids(&self, used: &HashSet<LootTemplateId>) -> Vec<LootTemplateId> {
        let mut unused = Vec::new();

        for entry in self.templates.keys() {
            if !used.contains(entry) {
                log::warn!(target: "loot_tables",
                    "Table '{}' entry {} isn't {} and not referenced from loot, and thus useless.",
                    self.store_type.table_name(),
                    entry,
                    self.store_type.entry_name()
                );
                unused.push(*entry);
            }
        }

        unused
    }

    fn find_reference_cycles(
        &self,
        entry: LootTemplateId,
        path: &mut Vec<LootTemplateId>,
        visited: &mut HashSet<LootTemplateId>,
        cycles: &mut Vec<(LootTemplateId, LootTemplateId)>,
    ) {
        if visited.contains(&entry) {
            return;
        }

        path.push(entry);
        if let Some(template) = self.get_loot_for(entry) {
            for reference in template.references() {
                if path.contains(&reference) {
                    cycles.push((entry, reference));
                } else {
                    self.find_reference_cycles(reference, path, visited, cycles);
                }
            }
        }
        path.pop();
        visited.insert(entry);
    }
}

/// Every loot table, plus the rates they are rolled with. Loaded once and
/// then only read, see [`LootTableRegistry`](crate::game::resources::LootTableRegistry) for reloading.
pub struct LootStorage {
    stores: EnumMap<LootStoreType, LootStore>,
    config: LootConfig,
}

impl LootStorage {
    pub fn new(config: LootConfig) -> Self {
        Self {
            stores: enum_map! { store_type => LootStore::new(store_type) },
            config,
        }
    }

    pub fn config(&self) -> &LootConfig {
        &self.config
    }

    pub fn store(&self, store_type: LootStoreType) -> &LootStore {
        &self.stores[store_type]
    }

    pub fn store_mut(&mut self, store_type: LootStoreType) -> &mut LootStore {
        &mut self.stores[store_type]
    }

    pub fn load(
        database: &mut dyn LootDatabase,
        item_database: &ItemDatabase,
        config: LootConfig,
    ) -> Result<(Self, LootLoadReport), anyhow::Error> {
        let mut storage = Self::new(config);
        let mut report = LootLoadReport::default();
        let mut invalid_rows = Vec::new();

        for (store_type, store) in storage.stores.iter_mut() {
            let rows = database.load_loot_rows(store_type).with_context(|| {
                format!("Failed to load loot table {}", store_type.table_name())
            })?;

            for row in store.load(rows, item_database, &mut report) {
                invalid_rows.push((store_type, row));
            }
        }

        storage.remove_reference_cycles(&mut report);
        storage.check_loot_refs(&mut report);

        if storage.config.delete_invalid_rows && !invalid_rows.is_empty() {
            for (store_type, row) in invalid_rows.iter() {
                database.delete_loot_row(*store_type, row).with_context(|| {
                    format!(
                        "Failed to delete invalid row for entry {} from {}",
                        row.entry,
                        store_type.table_name()
                    )
                })?;
            }

            log::info!(target: "loot_tables",
                "Deleted {} invalid loot rows",
                invalid_rows.len()
            );
        }

        Ok((storage, report))
    }

    /// Reports references that point nowhere and reference templates that
    /// are never referenced.
    pub fn check_loot_refs(&self, report: &mut LootLoadReport) {
        let references = self.store(LootStoreType::Reference);
        let mut used_references = HashSet::new();

        for (_, store) in self.stores.iter() {
            store.check_loot_refs(references, &mut used_references, report);
        }

        report.unused_references = references.report_unused_ids(&used_references);
    }

    fn remove_reference_cycles(&mut self, report: &mut LootLoadReport) {
        let references = &self.stores[LootStoreType::Reference];
        let mut visited = HashSet::new();
        let mut cycles = Vec::new();

        for entry in references.template_ids() {
            let mut path = Vec::new();
            references.find_reference_cycles(entry, &mut path, &mut visited, &mut cycles);
        }

        cycles.sort();
        cycles.dedup();

        for (entry, reference) in cycles {
            report.error(LootLoadError::ReferenceCycle { entry, reference });

            if let Some(template) = self.stores[LootStoreType::Reference]
                .templates
                .get_mut(&entry)
            {
                template.remove_reference(reference);
            }
        }
    }
}
