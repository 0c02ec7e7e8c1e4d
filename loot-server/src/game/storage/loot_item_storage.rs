use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    io::Write,
    path::{Path, PathBuf},
};

use loot_data::{BonusListId, ItemContext, ItemId};
use loot_game_common::{
    components::{Money, PlayerId},
    messages::{LootId, LootType, WorldObjectId},
};

use crate::game::{
    components::{Loot, LootItem, LootItemVisibility},
    resources::LootTemplate,
    storage::LOOT_STORAGE_DIR,
};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StoredLootItem {
    pub item_id: ItemId,
    pub count: u32,
    pub slot: usize,
    pub follows_loot_rules: bool,
    pub is_free_for_all: bool,
    pub is_blocked: bool,
    pub is_counted: bool,
    pub is_under_threshold: bool,
    pub needs_quest: bool,
    pub random_bonus_list_id: Option<BonusListId>,
    pub context: ItemContext,
    pub bonus_list_ids: String,
}

impl StoredLootItem {
    fn from_loot_item(loot_item: &LootItem, slot: usize) -> Self {
        Self {
            item_id: loot_item.item_id,
            count: loot_item.count,
            slot,
            follows_loot_rules: loot_item.follows_loot_rules,
            is_free_for_all: loot_item.is_free_for_all(),
            is_blocked: loot_item.is_blocked,
            is_counted: loot_item.is_counted,
            is_under_threshold: loot_item.is_under_threshold,
            needs_quest: loot_item.needs_quest,
            random_bonus_list_id: loot_item.random_bonus_list_id,
            context: loot_item.context,
            bonus_list_ids: loot_item.bonus_list_ids_string(),
        }
    }

    fn bonus_list_ids(&self) -> Vec<BonusListId> {
        self.bonus_list_ids
            .split_whitespace()
            .filter_map(|id| match id.parse::<BonusListId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    log::warn!(
                        "Ignoring invalid bonus list id '{}' of stored loot item {}",
                        id,
                        self.item_id
                    );
                    None
                }
            })
            .collect()
    }

    fn to_loot_item(&self) -> LootItem {
        let visibility = if self.is_free_for_all {
            LootItemVisibility::FreeForAll {
                looted_by: BTreeMap::new(),
            }
        } else {
            LootItemVisibility::SingleOwner { is_looted: false }
        };

        LootItem {
            item_id: self.item_id,
            slot: self.slot,
            count: self.count,
            context: self.context,
            random_bonus_list_id: self.random_bonus_list_id,
            bonus_list_ids: self.bonus_list_ids(),
            conditions: Vec::new(),
            visibility,
            is_blocked: self.is_blocked,
            is_under_threshold: self.is_under_threshold,
            is_counted: self.is_counted,
            needs_quest: self.needs_quest,
            follows_loot_rules: self.follows_loot_rules,
            roll_winner: None,
            allowed_looters: BTreeSet::new(),
        }
    }
}

/// Loot of one openable container item, kept until the container is emptied.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StoredLootContainer {
    pub container_id: WorldObjectId,
    pub money: Money,
    pub items: Vec<StoredLootItem>,
}

impl StoredLootContainer {
    pub fn is_empty(&self) -> bool {
        self.money.is_zero() && self.items.is_empty()
    }
}

/// Container loot that must survive a restart, one JSON file per container.
///
/// The in-memory copy is authoritative, every change is written through to
/// disk.
pub struct LootItemStorage {
    storage_dir: PathBuf,
    containers: HashMap<WorldObjectId, StoredLootContainer>,
}

impl Default for LootItemStorage {
    fn default() -> Self {
        Self::new(LOOT_STORAGE_DIR.clone())
    }
}

impl LootItemStorage {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            containers: HashMap::new(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn container_path(&self, container_id: WorldObjectId) -> PathBuf {
        self.storage_dir.join(format!("{}.json", container_id.0))
    }

    /// Reads every stored container. Files which cannot be read are logged
    /// and skipped.
    pub fn load_storage(&mut self) -> Result<usize, anyhow::Error> {
        self.containers.clear();

        if !self.storage_dir.exists() {
            return Ok(0);
        }

        let entries = std::fs::read_dir(&self.storage_dir).with_context(|| {
            format!(
                "Failed to read loot storage directory {}",
                self.storage_dir.to_string_lossy()
            )
        })?;

        for entry in entries {
            let path = entry
                .with_context(|| {
                    format!(
                        "Failed to read entry of loot storage directory {}",
                        self.storage_dir.to_string_lossy()
                    )
                })?
                .path();

            if path.extension().map_or(true, |extension| extension != "json") {
                continue;
            }

            match load_container(&path) {
                Ok(container) => {
                    self.containers.insert(container.container_id, container);
                }
                Err(error) => {
                    log::error!("Skipping stored loot: {:?}", error);
                }
            }
        }

        log::info!(
            "Loaded {} stored loot containers from {}",
            self.containers.len(),
            self.storage_dir.to_string_lossy()
        );
        Ok(self.containers.len())
    }

    pub fn has_stored_loot(&self, container_id: WorldObjectId) -> bool {
        self.containers.contains_key(&container_id)
    }

    pub fn stored_loot(&self, container_id: WorldObjectId) -> Option<&StoredLootContainer> {
        self.containers.get(&container_id)
    }

    /// Snapshots the money and every item `player_id` may still take. The
    /// snapshot is only kept once it has been written to disk.
    pub fn add_new_stored_loot(
        &mut self,
        container_id: WorldObjectId,
        loot: &Loot,
        player_id: PlayerId,
    ) -> Result<(), anyhow::Error> {
        if self.containers.contains_key(&container_id) {
            log::error!(
                "Trying to store loot for container {} which already has stored loot",
                container_id.0
            );
            return Ok(());
        }

        let items = loot
            .items
            .iter()
            .filter(|item| item.has_allowed_looter(player_id) && !item.is_looted_for(player_id))
            .enumerate()
            .map(|(slot, item)| StoredLootItem::from_loot_item(item, slot))
            .collect();

        let container = StoredLootContainer {
            container_id,
            money: loot.money,
            items,
        };

        self.save_container(&container)?;
        self.containers.insert(container_id, container);
        Ok(())
    }

    /// Rebuilds the loot of a stored container for `player_id`. Conditions
    /// are taken from `template`, the live table the loot was generated from.
    ///
    /// Stored slots are renumbered to match the rebuilt loot.
    pub fn load_stored_loot(
        &mut self,
        container_id: WorldObjectId,
        loot_id: LootId,
        template: Option<&LootTemplate>,
        player_id: PlayerId,
    ) -> Option<Loot> {
        let container = self.containers.get_mut(&container_id)?;

        let mut loot = Loot::new(loot_id, container_id, LootType::Item, None);
        loot.money = container.money;
        loot.allowed_looters.insert(player_id);

        for (slot, stored_item) in container.items.iter_mut().enumerate() {
            stored_item.slot = slot;

            let mut item = stored_item.to_loot_item();
            if let Some(template) = template {
                template.copy_conditions(&mut item);
            }

            item.add_allowed_looter(player_id);
            if item.is_free_for_all() {
                item.register_free_for_all_looter(player_id);
            }

            loot.items.push(item);
        }

        loot.unlooted_count = loot.items.len() as u32;
        Some(loot)
    }

    pub fn remove_stored_money(&mut self, container_id: WorldObjectId) -> Result<(), anyhow::Error> {
        if let Some(container) = self.containers.get_mut(&container_id) {
            container.money = Money::ZERO;
        } else {
            return Ok(());
        }

        self.write_container(container_id)
    }

    pub fn remove_stored_loot_item(
        &mut self,
        container_id: WorldObjectId,
        item_id: ItemId,
        count: u32,
        slot: usize,
    ) -> Result<(), anyhow::Error> {
        let container = if let Some(container) = self.containers.get_mut(&container_id) {
            container
        } else {
            return Ok(());
        };

        if let Some(index) = container.items.iter().position(|item| {
            item.item_id == item_id && item.count == count && item.slot == slot
        }) {
            container.items.remove(index);
        } else {
            log::warn!(
                "Stored loot of container {} has no item {} x{} in slot {}",
                container_id.0,
                item_id,
                count,
                slot
            );
            return Ok(());
        }

        self.write_container(container_id)
    }

    pub fn remove_stored_loot(&mut self, container_id: WorldObjectId) -> Result<(), anyhow::Error> {
        self.containers.remove(&container_id);

        let path = self.container_path(container_id);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| {
                format!(
                    "Failed to remove stored loot file {}",
                    path.to_string_lossy()
                )
            })?;
        }

        Ok(())
    }

    /// Saves the container, or removes it once nothing is left in it.
    fn write_container(&mut self, container_id: WorldObjectId) -> Result<(), anyhow::Error> {
        let is_empty = if let Some(container) = self.containers.get(&container_id) {
            container.is_empty()
        } else {
            return Ok(());
        };

        if is_empty {
            return self.remove_stored_loot(container_id);
        }

        if let Some(container) = self.containers.get(&container_id) {
            self.save_container(container)?;
        }

        Ok(())
    }

    fn save_container(&self, container: &StoredLootContainer) -> Result<(), anyhow::Error> {
        let path = self.container_path(container.container_id);

        std::fs::create_dir_all(&self.storage_dir).with_context(|| {
            format!(
                "Failed to create loot storage directory {}",
                self.storage_dir.to_string_lossy()
            )
        })?;

        let json = serde_json::to_string_pretty(container).with_context(|| {
            format!(
                "Failed to serialise StoredLootContainer whilst saving container {}",
                container.container_id.0
            )
        })?;

        let mut file = tempfile::NamedTempFile::new_in(&self.storage_dir).with_context(|| {
            format!(
                "Failed to create temporary file whilst saving container {}",
                container.container_id.0
            )
        })?;
        file.write_all(json.as_bytes()).with_context(|| {
            format!(
                "Failed to write data to temporary file whilst saving container {}",
                container.container_id.0
            )
        })?;
        file.persist(&path).with_context(|| {
            format!(
                "Failed to persist temporary loot file to path {}",
                path.to_string_lossy()
            )
        })?;

        Ok(())
    }
}

fn load_container(path: &Path) -> Result<StoredLootContainer, anyhow::Error> {
    let str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {}", path.to_string_lossy()))?;
    let container: StoredLootContainer = serde_json::from_str(&str).with_context(|| {
        format!(
            "Failed to deserialise StoredLootContainer from file {}",
            path.to_string_lossy()
        )
    })?;
    Ok(container)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use loot_data::{
        ConditionId, ItemClass, ItemData, ItemFlags, ItemQuality, LootModeFlags, LootStoreItem,
        LootStoreType, LootTemplateId,
    };

    use super::*;
    use crate::game::{
        resources::{LootConfig, LootStorage},
        test_world::TestWorld,
    };

    const CONTAINER: WorldObjectId = WorldObjectId(77);
    const TEMPLATE: LootTemplateId = LootTemplateId::new(5);
    const OWNER: PlayerId = PlayerId(1);

    struct Fixture {
        world: TestWorld,
        storage: LootStorage,
    }

    impl Fixture {
        fn new() -> Self {
            let mut shared = ItemData::new(ItemId::new(2), ItemClass::Quest, ItemQuality::Normal);
            shared.flags = ItemFlags::MULTI_DROP;
            let mut stackable =
                ItemData::new(ItemId::new(1), ItemClass::TradeGoods, ItemQuality::Normal);
            stackable.max_stack_count = 20;
            let mut horde_only = ItemData::new(ItemId::new(3), ItemClass::Armor, ItemQuality::Rare);
            horde_only.flags = ItemFlags::HORDE_ONLY;

            let world = TestWorld::new(vec![stackable, shared, horde_only]).with_players(&[OWNER.0]);

            let mut storage = LootStorage::new(LootConfig::default());
            let store = storage.store_mut(LootStoreType::Item);
            store.add_entry(
                TEMPLATE,
                LootStoreItem::new(ItemId::new(1), 100.0, 5, 5)
                    .with_conditions(vec![ConditionId::new(8)]),
            );
            store.add_entry(TEMPLATE, LootStoreItem::new(ItemId::new(2), 100.0, 1, 1));
            store.add_entry(TEMPLATE, LootStoreItem::new(ItemId::new(3), 100.0, 1, 1));

            Self { world, storage }
        }

        fn template(&self) -> &LootTemplate {
            self.storage
                .store(LootStoreType::Item)
                .get_loot_for(TEMPLATE)
                .unwrap()
        }

        fn open_container(&self) -> Loot {
            let mut rng = StdRng::seed_from_u64(3);
            let mut loot = Loot::new(LootId(1), CONTAINER, LootType::Item, None);
            assert!(loot.fill_loot(
                TEMPLATE,
                LootStoreType::Item,
                &self.storage,
                &self.world,
                OWNER,
                None,
                true,
                false,
                LootModeFlags::DEFAULT,
                &mut rng,
            ));
            loot.money = Money(250);
            loot
        }
    }

    #[test]
    fn container_round_trip() {
        let fixture = Fixture::new();
        let dir = tempfile::tempdir().unwrap();
        let loot = fixture.open_container();

        let mut storage = LootItemStorage::new(dir.path());
        storage.add_new_stored_loot(CONTAINER, &loot, OWNER).unwrap();
        assert!(dir.path().join("77.json").exists());

        let mut reloaded = LootItemStorage::new(dir.path());
        assert_eq!(reloaded.load_storage().unwrap(), 1);
        assert!(reloaded.has_stored_loot(CONTAINER));
        assert_eq!(reloaded.stored_loot(CONTAINER), storage.stored_loot(CONTAINER));

        let restored = reloaded
            .load_stored_loot(CONTAINER, LootId(2), Some(fixture.template()), OWNER)
            .unwrap();

        assert_eq!(restored.money, Money(250));
        assert_eq!(restored.owner, CONTAINER);
        assert_eq!(restored.loot_type, LootType::Item);
        assert!(restored.has_allowed_looter(OWNER));

        // The horde only item was never visible to the owner
        assert_eq!(restored.items.len(), 2);
        assert_eq!(restored.unlooted_count(), 2);
        for (original, restored) in loot.items.iter().zip(restored.items.iter()) {
            assert_eq!(restored.item_id, original.item_id);
            assert_eq!(restored.count, original.count);
            assert_eq!(restored.slot, original.slot);
            assert_eq!(restored.is_free_for_all(), original.is_free_for_all());
            assert_eq!(restored.is_counted, original.is_counted);
            assert_eq!(restored.needs_quest, original.needs_quest);
            assert_eq!(restored.follows_loot_rules, original.follows_loot_rules);
            assert_eq!(restored.conditions, original.conditions);
            assert!(!restored.is_looted_for(OWNER));
        }
    }

    #[test]
    fn conditions_come_from_the_live_table() {
        let fixture = Fixture::new();
        let dir = tempfile::tempdir().unwrap();
        let loot = fixture.open_container();

        let mut storage = LootItemStorage::new(dir.path());
        storage.add_new_stored_loot(CONTAINER, &loot, OWNER).unwrap();

        let without_template = storage
            .load_stored_loot(CONTAINER, LootId(2), None, OWNER)
            .unwrap();
        assert!(without_template.items[0].conditions.is_empty());

        let with_template = storage
            .load_stored_loot(CONTAINER, LootId(3), Some(fixture.template()), OWNER)
            .unwrap();
        assert_eq!(with_template.items[0].conditions, vec![ConditionId::new(8)]);
    }

    #[test]
    fn bonus_lists_are_kept() {
        let fixture = Fixture::new();
        let dir = tempfile::tempdir().unwrap();
        let mut loot = fixture.open_container();
        loot.items[0].bonus_list_ids = vec![BonusListId::new(10), BonusListId::new(42)];
        loot.items[0].random_bonus_list_id = Some(BonusListId::new(7));

        let mut storage = LootItemStorage::new(dir.path());
        storage.add_new_stored_loot(CONTAINER, &loot, OWNER).unwrap();
        assert_eq!(
            storage.stored_loot(CONTAINER).unwrap().items[0].bonus_list_ids,
            "10 42"
        );

        let restored = storage
            .load_stored_loot(CONTAINER, LootId(2), None, OWNER)
            .unwrap();
        assert_eq!(
            restored.items[0].bonus_list_ids,
            vec![BonusListId::new(10), BonusListId::new(42)]
        );
        assert_eq!(restored.items[0].random_bonus_list_id, Some(BonusListId::new(7)));
    }

    #[test]
    fn emptied_container_is_removed() {
        let fixture = Fixture::new();
        let dir = tempfile::tempdir().unwrap();
        let loot = fixture.open_container();
        let path = dir.path().join("77.json");

        let mut storage = LootItemStorage::new(dir.path());
        storage.add_new_stored_loot(CONTAINER, &loot, OWNER).unwrap();

        storage.remove_stored_money(CONTAINER).unwrap();
        storage
            .remove_stored_loot_item(CONTAINER, ItemId::new(1), 5, 0)
            .unwrap();
        assert!(path.exists());

        let mut reloaded = LootItemStorage::new(dir.path());
        reloaded.load_storage().unwrap();
        let container = reloaded.stored_loot(CONTAINER).unwrap();
        assert_eq!(container.money, Money::ZERO);
        assert_eq!(container.items.len(), 1);
        assert_eq!(container.items[0].item_id, ItemId::new(2));

        // Wrong count, nothing removed
        storage
            .remove_stored_loot_item(CONTAINER, ItemId::new(2), 3, 1)
            .unwrap();
        assert!(storage.has_stored_loot(CONTAINER));

        storage
            .remove_stored_loot_item(CONTAINER, ItemId::new(2), 1, 1)
            .unwrap();
        assert!(!storage.has_stored_loot(CONTAINER));
        assert!(!path.exists());
    }

    #[test]
    fn slots_follow_the_rebuilt_loot() {
        let fixture = Fixture::new();
        let dir = tempfile::tempdir().unwrap();
        let loot = fixture.open_container();

        let mut storage = LootItemStorage::new(dir.path());
        storage.add_new_stored_loot(CONTAINER, &loot, OWNER).unwrap();
        storage
            .remove_stored_loot_item(CONTAINER, ItemId::new(1), 5, 0)
            .unwrap();

        let restored = storage
            .load_stored_loot(CONTAINER, LootId(2), None, OWNER)
            .unwrap();
        assert_eq!(restored.items[0].item_id, ItemId::new(2));
        assert_eq!(restored.items[0].slot, 0);

        storage
            .remove_stored_loot_item(CONTAINER, ItemId::new(2), 1, 0)
            .unwrap();
        assert_eq!(storage.stored_loot(CONTAINER).unwrap().items.len(), 0);
        assert!(storage.has_stored_loot(CONTAINER));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.json"), "not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            dir.path().join("2.json"),
            r#"{ "container_id": 2, "money": 10, "items": [] }"#,
        )
        .unwrap();

        let mut storage = LootItemStorage::new(dir.path());
        assert_eq!(storage.load_storage().unwrap(), 1);
        assert!(storage.has_stored_loot(WorldObjectId(2)));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = LootItemStorage::new(dir.path().join("does-not-exist"));
        assert_eq!(storage.load_storage().unwrap(), 0);
    }
}
