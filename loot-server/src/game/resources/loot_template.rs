use rand::{seq::SliceRandom, Rng, RngCore};
use std::collections::HashSet;

use loot_data::{LootModeFlags, LootStoreItem, LootStoreType, LootTemplateId};

use crate::game::{
    components::{Loot, LootItem},
    resources::{LootLoadError, LootLoadReport, LootStorage, LootStore},
    ItemEligibility, LootPlayer, LootWorld,
};

/// Everything a template needs while generating loot.
pub struct LootProcessContext<'a> {
    pub storage: &'a LootStorage,
    pub world: &'a dyn LootWorld,
    pub rng: &'a mut dyn RngCore,
}

fn roll_chance(rng: &mut dyn RngCore, chance: f32) -> bool {
    chance > rng.gen_range(0.0..100.0)
}

pub(crate) fn roll_store_item(
    store_item: &LootStoreItem,
    ctx: &mut LootProcessContext,
    rates_allowed: bool,
) -> bool {
    if store_item.chance >= 100.0 {
        return true;
    }

    let config = ctx.storage.config();
    let rate = if !rates_allowed {
        1.0
    } else if store_item.is_reference() {
        config.rate_drop_item_referenced
    } else {
        ctx.world
            .item_database()
            .get_item(store_item.item_id)
            .map_or(1.0, |item_data| config.item_rate(item_data.quality))
    };

    roll_chance(ctx.rng, store_item.chance * rate)
}

fn is_allowed_for_personal_looter(
    store_item: &LootStoreItem,
    world: &dyn LootWorld,
    personal_looter: Option<&dyn LootPlayer>,
) -> bool {
    personal_looter.map_or(true, |looter| {
        ItemEligibility::from_store_item(store_item, world.item_database())
            .is_allowed_for_player(world, looter, None, true)
    })
}

fn process_reference(
    store_item: &LootStoreItem,
    loot: &mut Loot,
    ctx: &mut LootProcessContext,
    rates_allowed: bool,
    loot_mode: LootModeFlags,
    personal_looter: Option<&dyn LootPlayer>,
) {
    let reference_id = if let Some(reference_id) = store_item.reference {
        reference_id
    } else {
        return;
    };

    let storage = ctx.storage;
    let referenced = if let Some(referenced) = storage
        .store(LootStoreType::Reference)
        .get_loot_for(reference_id)
    {
        referenced
    } else {
        log::error!(target: "loot_tables",
            "Loot reference {} could not be resolved, skipping",
            reference_id
        );
        return;
    };

    for _ in 0..referenced_amount(store_item, storage) {
        referenced.process(
            loot,
            ctx,
            rates_allowed,
            loot_mode,
            store_item.group_id,
            personal_looter,
        );
    }
}

/// How many times a reference entry is expanded.
pub(crate) fn referenced_amount(store_item: &LootStoreItem, storage: &LootStorage) -> u32 {
    (store_item.max_count as f32 * storage.config().rate_drop_item_referenced_amount) as u32
}

/// Mutually exclusive entries: at most one of them drops per roll.
#[derive(Clone, Debug, Default)]
pub struct LootGroup {
    explicitly_chanced: Vec<LootStoreItem>,
    equal_chanced: Vec<LootStoreItem>,
}

impl LootGroup {
    pub fn add_entry(&mut self, store_item: LootStoreItem) {
        if store_item.is_explicitly_chanced() {
            self.explicitly_chanced.push(store_item);
        } else {
            self.equal_chanced.push(store_item);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.explicitly_chanced.is_empty() && self.equal_chanced.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LootStoreItem> {
        self.explicitly_chanced
            .iter()
            .chain(self.equal_chanced.iter())
    }

    pub fn raw_total_chance(&self) -> f32 {
        self.explicitly_chanced
            .iter()
            .map(|store_item| store_item.chance)
            .sum()
    }

    pub fn total_chance(&self) -> f32 {
        let total_chance = self.raw_total_chance();
        if !self.equal_chanced.is_empty() && total_chance < 100.0 {
            100.0
        } else {
            total_chance
        }
    }

    /// Picks at most one entry. Entries outside `loot_mode`, or not allowed
    /// for the personal looter, are removed before rolling.
    pub fn roll(
        &self,
        ctx: &mut LootProcessContext,
        loot_mode: LootModeFlags,
        personal_looter: Option<&dyn LootPlayer>,
    ) -> Option<&LootStoreItem> {
        let world = ctx.world;
        let is_candidate = |store_item: &LootStoreItem| {
            store_item.loot_mode.intersects(loot_mode)
                && is_allowed_for_personal_looter(store_item, world, personal_looter)
        };

        let explicitly_chanced: Vec<&LootStoreItem> = self
            .explicitly_chanced
            .iter()
            .filter(|store_item| is_candidate(*store_item))
            .collect();

        if !explicitly_chanced.is_empty() {
            let mut roll: f32 = ctx.rng.gen_range(0.0..100.0);

            for store_item in explicitly_chanced {
                if store_item.chance >= 100.0 {
                    return Some(store_item);
                }

                roll -= store_item.chance;
                if roll < 0.0 {
                    return Some(store_item);
                }
            }
        }

        let equal_chanced: Vec<&LootStoreItem> = self
            .equal_chanced
            .iter()
            .filter(|store_item| is_candidate(*store_item))
            .collect();

        equal_chanced.choose(&mut *ctx.rng).copied()
    }

    pub fn process(
        &self,
        loot: &mut Loot,
        ctx: &mut LootProcessContext,
        loot_mode: LootModeFlags,
        personal_looter: Option<&dyn LootPlayer>,
    ) {
        if let Some(store_item) = self.roll(ctx, loot_mode, personal_looter) {
            loot.add_item(
                store_item,
                ctx.world,
                ctx.storage.config().max_loot_items,
                ctx.rng,
            );
        }
    }

    pub fn has_quest_drop(&self) -> bool {
        self.entries().any(|store_item| store_item.needs_quest)
    }

    pub fn has_quest_drop_for_player(&self, player: &dyn LootPlayer) -> bool {
        self.entries().any(|store_item| {
            store_item.needs_quest && player.has_quest_for_item(store_item.item_id)
        })
    }

    pub fn has_drop_for_player(
        &self,
        world: &dyn LootWorld,
        player: &dyn LootPlayer,
        strict: bool,
    ) -> bool {
        self.entries().any(|store_item| {
            ItemEligibility::from_store_item(store_item, world.item_database())
                .is_allowed_for_player(world, player, None, strict)
        })
    }

    fn verify(
        &self,
        store_type: LootStoreType,
        entry: LootTemplateId,
        group_id: u8,
        report: &mut LootLoadReport,
    ) {
        let total_chance = self.raw_total_chance();

        if total_chance > 101.0 {
            report.error(LootLoadError::GroupChanceOverflow {
                store_type,
                entry,
                group_id,
                total_chance,
            });
        } else if total_chance > 100.0 {
            report.warning(LootLoadError::GroupChanceOverflow {
                store_type,
                entry,
                group_id,
                total_chance,
            });
        }

        if total_chance >= 100.0 && !self.equal_chanced.is_empty() {
            report.error(LootLoadError::EqualChancedUnreachable {
                store_type,
                entry,
                group_id,
            });
        }
    }
}

/// A loot table: independently rolled entries plus numbered groups, of
/// which each yields at most one entry. References are always rolled
/// independently, their group id selects a group of the referenced table.
#[derive(Clone, Debug, Default)]
pub struct LootTemplate {
    entries: Vec<LootStoreItem>,
    groups: Vec<Option<LootGroup>>,
}

impl LootTemplate {
    pub fn add_entry(&mut self, store_item: LootStoreItem) {
        if store_item.group_id > 0 && !store_item.is_reference() {
            let index = store_item.group_id as usize - 1;
            if self.groups.len() <= index {
                self.groups.resize(index + 1, None);
            }

            self.groups[index]
                .get_or_insert_with(LootGroup::default)
                .add_entry(store_item);
        } else {
            self.entries.push(store_item);
        }
    }

    pub fn entries(&self) -> &[LootStoreItem] {
        &self.entries
    }

    pub fn group(&self, group_id: u8) -> Option<&LootGroup> {
        if group_id == 0 {
            return None;
        }

        self.groups
            .get(group_id as usize - 1)
            .and_then(|group| group.as_ref())
    }

    pub fn groups(&self) -> impl Iterator<Item = &LootGroup> {
        self.groups.iter().flatten()
    }

    /// Every entry of the template, grouped or not.
    pub fn all_entries(&self) -> impl Iterator<Item = &LootStoreItem> {
        self.entries
            .iter()
            .chain(self.groups().flat_map(|group| group.entries()))
    }

    /// Rolls the template into `loot`. A non-zero `group_id` restricts the
    /// roll to that single group, which is how a grouped reference entry
    /// expands into its target.
    pub fn process(
        &self,
        loot: &mut Loot,
        ctx: &mut LootProcessContext,
        rates_allowed: bool,
        loot_mode: LootModeFlags,
        group_id: u8,
        personal_looter: Option<&dyn LootPlayer>,
    ) {
        if group_id != 0 {
            if let Some(group) = self.group(group_id) {
                group.process(loot, ctx, loot_mode, personal_looter);
            }
            return;
        }

        for store_item in self.entries.iter() {
            if !store_item.loot_mode.intersects(loot_mode) {
                continue;
            }

            if !roll_store_item(store_item, ctx, rates_allowed) {
                continue;
            }

            if store_item.is_reference() {
                process_reference(
                    store_item,
                    loot,
                    ctx,
                    rates_allowed,
                    loot_mode,
                    personal_looter,
                );
            } else if is_allowed_for_personal_looter(store_item, ctx.world, personal_looter) {
                loot.add_item(
                    store_item,
                    ctx.world,
                    ctx.storage.config().max_loot_items,
                    ctx.rng,
                );
            }
        }

        for group in self.groups() {
            group.process(loot, ctx, loot_mode, personal_looter);
        }
    }

    pub fn has_quest_drop(&self, references: &LootStore, group_id: u8) -> bool {
        if group_id != 0 {
            return self
                .group(group_id)
                .map_or(false, |group| group.has_quest_drop());
        }

        for store_item in self.entries.iter() {
            if let Some(reference_id) = store_item.reference {
                if references
                    .get_loot_for(reference_id)
                    .map_or(false, |referenced| {
                        referenced.has_quest_drop(references, store_item.group_id)
                    })
                {
                    return true;
                }
            } else if store_item.needs_quest {
                return true;
            }
        }

        self.groups().any(|group| group.has_quest_drop())
    }

    pub fn has_quest_drop_for_player(
        &self,
        references: &LootStore,
        player: &dyn LootPlayer,
        group_id: u8,
    ) -> bool {
        if group_id != 0 {
            return self
                .group(group_id)
                .map_or(false, |group| group.has_quest_drop_for_player(player));
        }

        for store_item in self.entries.iter() {
            if let Some(reference_id) = store_item.reference {
                if references
                    .get_loot_for(reference_id)
                    .map_or(false, |referenced| {
                        referenced.has_quest_drop_for_player(
                            references,
                            player,
                            store_item.group_id,
                        )
                    })
                {
                    return true;
                }
            } else if store_item.needs_quest && player.has_quest_for_item(store_item.item_id) {
                return true;
            }
        }

        self.groups()
            .any(|group| group.has_quest_drop_for_player(player))
    }

    /// Whether anything in this template could be given to `player`.
    pub fn has_drop_for_player(
        &self,
        world: &dyn LootWorld,
        references: &LootStore,
        player: &dyn LootPlayer,
        group_id: u8,
        strict: bool,
    ) -> bool {
        if group_id != 0 {
            return self
                .group(group_id)
                .map_or(false, |group| group.has_drop_for_player(world, player, strict));
        }

        for store_item in self.entries.iter() {
            if let Some(reference_id) = store_item.reference {
                if references
                    .get_loot_for(reference_id)
                    .map_or(false, |referenced| {
                        referenced.has_drop_for_player(
                            world,
                            references,
                            player,
                            store_item.group_id,
                            strict,
                        )
                    })
                {
                    return true;
                }
            } else if ItemEligibility::from_store_item(store_item, world.item_database())
                .is_allowed_for_player(world, player, None, strict)
            {
                return true;
            }
        }

        self.groups()
            .any(|group| group.has_drop_for_player(world, player, strict))
    }

    /// Restores the conditions of a loot item that was loaded from storage,
    /// conditions are not persisted with the item.
    pub fn copy_conditions(&self, loot_item: &mut LootItem) {
        if let Some(store_item) = self
            .all_entries()
            .find(|store_item| !store_item.is_reference() && store_item.item_id == loot_item.item_id)
        {
            loot_item.conditions = store_item.conditions.clone();
        }
    }

    pub(crate) fn verify(
        &self,
        store_type: LootStoreType,
        entry: LootTemplateId,
        report: &mut LootLoadReport,
    ) {
        for (index, group) in self.groups.iter().enumerate() {
            if let Some(group) = group {
                group.verify(store_type, entry, index as u8 + 1, report);
            }
        }
    }

    pub(crate) fn check_loot_refs(
        &self,
        references: &LootStore,
        store_type: LootStoreType,
        entry: LootTemplateId,
        used_references: &mut HashSet<LootTemplateId>,
        report: &mut LootLoadReport,
    ) {
        for store_item in self.entries.iter() {
            if let Some(reference_id) = store_item.reference {
                if references.have_loot_for(reference_id) {
                    used_references.insert(reference_id);
                } else {
                    report.error(LootLoadError::UnresolvedReference {
                        store_type,
                        entry,
                        reference: reference_id,
                    });
                }
            }
        }
    }

    pub(crate) fn references(&self) -> impl Iterator<Item = LootTemplateId> + '_ {
        self.entries
            .iter()
            .filter_map(|store_item| store_item.reference)
    }

    pub(crate) fn remove_reference(&mut self, reference_id: LootTemplateId) {
        self.entries
            .retain(|store_item| store_item.reference != Some(reference_id));
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use loot_data::{ConditionId, ItemClass, ItemContext, ItemData, ItemId, ItemQuality};
    use loot_game_common::{
        components::Team,
        messages::{LootId, LootType, WorldObjectId},
    };

    use super::*;
    use crate::game::{
        resources::LootConfig,
        test_world::{TestPlayer, TestWorld},
    };

    const TEMPLATE: LootTemplateId = LootTemplateId::new(1);
    const REFERENCE: LootTemplateId = LootTemplateId::new(1000);

    fn test_world() -> TestWorld {
        let mut horde_only = ItemData::new(ItemId::new(9), ItemClass::Armor, ItemQuality::Rare);
        horde_only.flags = loot_data::ItemFlags::HORDE_ONLY;

        let mut items: Vec<ItemData> = (1..=6)
            .map(|id| ItemData::new(ItemId::new(id), ItemClass::TradeGoods, ItemQuality::Normal))
            .collect();
        items.push(ItemData::new(ItemId::new(7), ItemClass::Armor, ItemQuality::Epic));
        items.push(horde_only);
        TestWorld::new(items)
    }

    fn storage_with(config: LootConfig, entries: &[(LootStoreType, LootTemplateId, LootStoreItem)]) -> LootStorage {
        let mut storage = LootStorage::new(config);
        for (store_type, entry, store_item) in entries {
            storage
                .store_mut(*store_type)
                .add_entry(*entry, store_item.clone());
        }
        storage
    }

    fn roll_loot(
        storage: &LootStorage,
        world: &TestWorld,
        store_type: LootStoreType,
        loot_mode: LootModeFlags,
        personal_looter: Option<&dyn LootPlayer>,
        rng: &mut StdRng,
    ) -> Vec<ItemId> {
        let mut loot = Loot::new(LootId(1), WorldObjectId(1), LootType::Corpse, None);
        let template = storage.store(store_type).get_loot_for(TEMPLATE).unwrap();
        let mut ctx = LootProcessContext {
            storage,
            world,
            rng,
        };
        template.process(
            &mut loot,
            &mut ctx,
            store_type.rates_allowed(),
            loot_mode,
            0,
            personal_looter,
        );
        loot.items.iter().map(|item| item.item_id).collect()
    }

    fn item(id: u32, chance: f32) -> LootStoreItem {
        LootStoreItem::new(ItemId::new(id), chance, 1, 1)
    }

    #[test]
    fn guaranteed_entries_always_drop() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[(LootStoreType::Creature, TEMPLATE, item(1, 100.0))],
        );
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..1000 {
            assert_eq!(
                roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
                vec![ItemId::new(1)]
            );
        }
    }

    #[test]
    fn explicit_group_chances() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Creature, TEMPLATE, item(1, 30.0).with_group(1)),
                (LootStoreType::Creature, TEMPLATE, item(2, 70.0).with_group(1)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 10_000;
        let mut first = 0;
        for _ in 0..trials {
            let dropped =
                roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng);
            assert_eq!(dropped.len(), 1);
            if dropped[0] == ItemId::new(1) {
                first += 1;
            }
        }

        let ratio = first as f32 / trials as f32;
        assert!((ratio - 0.3).abs() < 0.02, "item 1 dropped {}", ratio);
    }

    #[test]
    fn equal_chanced_share_the_remainder() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Creature, TEMPLATE, item(1, 40.0).with_group(1)),
                (LootStoreType::Creature, TEMPLATE, item(2, 0.0).with_group(1)),
                (LootStoreType::Creature, TEMPLATE, item(3, 0.0).with_group(1)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(7);

        let trials = 10_000;
        let mut counts = [0; 4];
        for _ in 0..trials {
            let dropped =
                roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng);
            assert_eq!(dropped.len(), 1);
            counts[dropped[0].get() as usize] += 1;
        }

        for (id, expected) in [(1, 0.4), (2, 0.3), (3, 0.3)] {
            let ratio = counts[id] as f32 / trials as f32;
            assert!((ratio - expected).abs() < 0.02, "item {} dropped {}", id, ratio);
        }

        let group = storage
            .store(LootStoreType::Creature)
            .get_loot_for(TEMPLATE)
            .and_then(|template| template.group(1))
            .unwrap();
        assert_eq!(group.raw_total_chance(), 40.0);
        assert_eq!(group.total_chance(), 100.0);
    }

    #[test]
    fn loot_mode_filters_entries() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Creature, TEMPLATE, item(1, 100.0)),
                (
                    LootStoreType::Creature,
                    TEMPLATE,
                    item(2, 100.0).with_loot_mode(LootModeFlags::HARD_MODE_1),
                ),
            ],
        );
        let mut rng = StdRng::seed_from_u64(42);

        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
            vec![ItemId::new(1)]
        );
        assert_eq!(
            roll_loot(
                &storage,
                &world,
                LootStoreType::Creature,
                LootModeFlags::DEFAULT | LootModeFlags::HARD_MODE_1,
                None,
                &mut rng
            ),
            vec![ItemId::new(1), ItemId::new(2)]
        );
    }

    #[test]
    fn references_expand_max_count_times() {
        let world = test_world();
        let entries = [
            (
                LootStoreType::Creature,
                TEMPLATE,
                LootStoreItem::new_reference(REFERENCE, 100.0, 3),
            ),
            (LootStoreType::Reference, REFERENCE, item(5, 100.0)),
        ];
        let mut rng = StdRng::seed_from_u64(42);

        let storage = storage_with(LootConfig::default(), &entries);
        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
            vec![ItemId::new(5); 3]
        );

        let config = LootConfig {
            rate_drop_item_referenced_amount: 2.0,
            ..Default::default()
        };
        let storage = storage_with(config, &entries);
        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng)
                .len(),
            6
        );
    }

    #[test]
    fn unresolved_reference_is_skipped() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (
                    LootStoreType::Creature,
                    TEMPLATE,
                    LootStoreItem::new_reference(REFERENCE, 100.0, 1),
                ),
                (LootStoreType::Creature, TEMPLATE, item(1, 100.0)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(42);

        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
            vec![ItemId::new(1)]
        );
    }

    #[test]
    fn grouped_reference_rolls_only_that_group() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (
                    LootStoreType::Creature,
                    TEMPLATE,
                    LootStoreItem::new_reference(REFERENCE, 100.0, 1).with_group(2),
                ),
                (LootStoreType::Reference, REFERENCE, item(1, 100.0)),
                (LootStoreType::Reference, REFERENCE, item(2, 100.0).with_group(1)),
                (LootStoreType::Reference, REFERENCE, item(3, 100.0).with_group(2)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(42);

        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
            vec![ItemId::new(3)]
        );
    }

    #[test]
    fn grouped_reference_rolls_beside_the_group() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Creature, TEMPLATE, item(1, 100.0).with_group(1)),
                (
                    LootStoreType::Creature,
                    TEMPLATE,
                    LootStoreItem::new_reference(REFERENCE, 100.0, 1).with_group(1),
                ),
                (LootStoreType::Reference, REFERENCE, item(2, 100.0).with_group(1)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            assert_eq!(
                roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
                vec![ItemId::new(2), ItemId::new(1)]
            );
        }

        let template = storage
            .store(LootStoreType::Creature)
            .get_loot_for(TEMPLATE)
            .unwrap();
        assert_eq!(template.entries().len(), 1);
        assert_eq!(template.group(1).map(|group| group.raw_total_chance()), Some(100.0));
    }

    #[test]
    fn grouped_reference_is_visible_to_drop_queries() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (
                    LootStoreType::Creature,
                    TEMPLATE,
                    LootStoreItem::new_reference(REFERENCE, 100.0, 1).with_group(1),
                ),
                (
                    LootStoreType::Reference,
                    REFERENCE,
                    item(6, 100.0).with_group(1).with_quest_required(true),
                ),
            ],
        );
        let references = storage.store(LootStoreType::Reference);
        let creatures = storage.store(LootStoreType::Creature);

        let mut on_quest = TestPlayer::new(1);
        on_quest.quest_items.insert(ItemId::new(6));

        assert!(creatures.have_quest_loot_for(TEMPLATE, references));
        assert!(creatures.have_quest_loot_for_player(TEMPLATE, references, &on_quest));

        let template = creatures.get_loot_for(TEMPLATE).unwrap();
        assert!(template.has_drop_for_player(&world, references, &on_quest, 0, false));
    }

    #[test]
    fn guaranteed_group_entry_wins_when_reached() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Creature, TEMPLATE, item(1, 100.0).with_group(1)),
                (LootStoreType::Creature, TEMPLATE, item(2, 50.0).with_group(1)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..1000 {
            assert_eq!(
                roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
                vec![ItemId::new(1)]
            );
        }
    }

    #[test]
    fn drop_rates_scale_chances() {
        let world = test_world();
        let mut config = LootConfig::default();
        config.rate_drop_item[ItemQuality::Normal] = 2.0;
        let entries = [
            (LootStoreType::Creature, TEMPLATE, item(1, 50.0)),
            (LootStoreType::Mail, TEMPLATE, item(1, 50.0)),
        ];
        let storage = storage_with(config, &entries);
        let mut rng = StdRng::seed_from_u64(42);

        let mut creature_drops = 0;
        let mut mail_drops = 0;
        for _ in 0..1000 {
            creature_drops +=
                roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng).len();
            mail_drops +=
                roll_loot(&storage, &world, LootStoreType::Mail, LootModeFlags::DEFAULT, None, &mut rng).len();
        }

        assert_eq!(creature_drops, 1000);
        assert!((400..600).contains(&mail_drops), "mail dropped {}", mail_drops);
    }

    #[test]
    fn personal_looter_only_gets_eligible_items() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Creature, TEMPLATE, item(1, 100.0)),
                (LootStoreType::Creature, TEMPLATE, item(9, 100.0)),
            ],
        );
        let mut rng = StdRng::seed_from_u64(42);

        let alliance = TestPlayer::new(1);
        let mut horde = TestPlayer::new(2);
        horde.team = Team::Horde;

        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, Some(&alliance), &mut rng),
            vec![ItemId::new(1)]
        );
        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, Some(&horde), &mut rng),
            vec![ItemId::new(1), ItemId::new(9)]
        );
        assert_eq!(
            roll_loot(&storage, &world, LootStoreType::Creature, LootModeFlags::DEFAULT, None, &mut rng),
            vec![ItemId::new(1), ItemId::new(9)]
        );
    }

    #[test]
    fn quest_drops_through_references() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (
                    LootStoreType::Creature,
                    TEMPLATE,
                    LootStoreItem::new_reference(REFERENCE, 100.0, 1),
                ),
                (
                    LootStoreType::Reference,
                    REFERENCE,
                    item(6, 100.0).with_quest_required(true),
                ),
            ],
        );
        let references = storage.store(LootStoreType::Reference);
        let creatures = storage.store(LootStoreType::Creature);

        let mut on_quest = TestPlayer::new(1);
        on_quest.quest_items.insert(ItemId::new(6));
        let not_on_quest = TestPlayer::new(2);

        assert!(creatures.have_quest_loot_for(TEMPLATE, references));
        assert!(creatures.have_quest_loot_for_player(TEMPLATE, references, &on_quest));
        assert!(!creatures.have_quest_loot_for_player(TEMPLATE, references, &not_on_quest));

        let template = creatures.get_loot_for(TEMPLATE).unwrap();
        assert!(template.has_drop_for_player(&world, references, &on_quest, 0, false));
        assert!(!template.has_drop_for_player(&world, references, &not_on_quest, 0, false));
    }

    #[test]
    fn copy_conditions_from_matching_entry() {
        let world = test_world();
        let storage = storage_with(
            LootConfig::default(),
            &[
                (LootStoreType::Item, TEMPLATE, item(1, 100.0)),
                (
                    LootStoreType::Item,
                    TEMPLATE,
                    item(2, 0.0)
                        .with_group(1)
                        .with_conditions(vec![ConditionId::new(3)]),
                ),
            ],
        );
        let template = storage.store(LootStoreType::Item).get_loot_for(TEMPLATE).unwrap();
        let item_data = world.items.get_item(ItemId::new(2)).unwrap();

        let mut loot_item = LootItem::new(&item(2, 0.0), item_data, 0, 1, ItemContext::NONE);
        assert!(loot_item.conditions.is_empty());
        template.copy_conditions(&mut loot_item);
        assert_eq!(loot_item.conditions, vec![ConditionId::new(3)]);
    }
}
