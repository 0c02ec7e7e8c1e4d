use rand::{seq::SliceRandom, RngCore};
use std::collections::{BTreeMap, BTreeSet};

use loot_data::{DungeonEncounterId, ItemContext, LootModeFlags, LootStoreType, LootTemplateId};
use loot_game_common::{
    components::PlayerId,
    messages::{LootId, LootMethod, LootType, WorldObjectId},
};

use crate::game::{
    components::Loot,
    resources::{
        referenced_amount, roll_store_item, LootProcessContext, LootStorage, LootTemplate,
    },
    ItemEligibility, LootPlayer, LootWorld,
};

fn looters_for(
    personal_loot: &BTreeMap<PlayerId, Loot>,
    world: &dyn LootWorld,
    mut predicate: impl FnMut(&dyn LootPlayer) -> bool,
) -> Vec<PlayerId> {
    personal_loot
        .keys()
        .copied()
        .filter(|player_id| world.player(*player_id).map_or(false, &mut predicate))
        .collect()
}

/// Rolls `template` once and gives every result to exactly one of the
/// players in `personal_loot`, chosen among those eligible for it.
///
/// References expanded several times spread their results so that no player
/// receives a second drop before every eligible player has received one.
pub fn process_personal_loot(
    template: &LootTemplate,
    personal_loot: &mut BTreeMap<PlayerId, Loot>,
    ctx: &mut LootProcessContext,
    rates_allowed: bool,
    loot_mode: LootModeFlags,
) {
    let storage = ctx.storage;
    let world = ctx.world;
    let references = storage.store(LootStoreType::Reference);

    for store_item in template.entries() {
        if !store_item.loot_mode.intersects(loot_mode) {
            continue;
        }

        if !roll_store_item(store_item, ctx, rates_allowed) {
            continue;
        }

        if let Some(reference_id) = store_item.reference {
            let referenced = if let Some(referenced) = references.get_loot_for(reference_id) {
                referenced
            } else {
                log::error!(target: "loot_tables",
                    "Loot reference {} could not be resolved, skipping",
                    reference_id
                );
                continue;
            };

            let mut got_loot: BTreeSet<PlayerId> = BTreeSet::new();
            for _ in 0..referenced_amount(store_item, storage) {
                let mut looters = looters_for(personal_loot, world, |player| {
                    referenced.has_drop_for_player(
                        world,
                        references,
                        player,
                        store_item.group_id,
                        true,
                    )
                });
                if looters.is_empty() {
                    break;
                }

                // Everyone eligible has had a drop, start the next round
                if looters.iter().all(|looter| got_loot.contains(looter)) {
                    got_loot.clear();
                } else {
                    looters.retain(|looter| !got_loot.contains(looter));
                }

                let chosen = if let Some(chosen) = looters.choose(&mut *ctx.rng) {
                    *chosen
                } else {
                    break;
                };
                got_loot.insert(chosen);

                if let (Some(loot), Some(player)) =
                    (personal_loot.get_mut(&chosen), world.player(chosen))
                {
                    referenced.process(
                        loot,
                        ctx,
                        rates_allowed,
                        loot_mode,
                        store_item.group_id,
                        Some(player),
                    );
                }
            }
        } else {
            let looters = looters_for(personal_loot, world, |player| {
                ItemEligibility::from_store_item(store_item, world.item_database())
                    .is_allowed_for_player(world, player, None, true)
            });

            if let Some(chosen) = looters.choose(&mut *ctx.rng) {
                if let Some(loot) = personal_loot.get_mut(chosen) {
                    loot.add_item(
                        store_item,
                        world,
                        storage.config().max_loot_items,
                        ctx.rng,
                    );
                }
            }
        }
    }

    for group in template.groups() {
        let looters = looters_for(personal_loot, world, |player| {
            group.has_drop_for_player(world, player, true)
        });

        if let Some(chosen) = looters.choose(&mut *ctx.rng) {
            if let (Some(loot), Some(player)) = (personal_loot.get_mut(chosen), world.player(*chosen))
            {
                group.process(loot, ctx, loot_mode, Some(player));
            }
        }
    }
}

/// Builds the personal loot of every tapper of a dungeon encounter. Players
/// already locked to the encounter get nothing, and loot left empty after
/// distribution is discarded.
pub fn generate_dungeon_encounter_personal_loot(
    dungeon_encounter_id: DungeonEncounterId,
    loot_id: LootTemplateId,
    store_type: LootStoreType,
    storage: &LootStorage,
    world: &dyn LootWorld,
    loot_type: LootType,
    owner: WorldObjectId,
    min_money: u32,
    max_money: u32,
    loot_mode: LootModeFlags,
    item_context: ItemContext,
    tappers: &[PlayerId],
    mut next_loot_id: impl FnMut() -> LootId,
    rng: &mut dyn RngCore,
) -> BTreeMap<PlayerId, Loot> {
    let mut personal_loot = BTreeMap::new();

    for tapper_id in tappers.iter() {
        let tapper = if let Some(tapper) = world.player(*tapper_id) {
            tapper
        } else {
            continue;
        };

        if tapper.is_locked_to_dungeon_encounter(dungeon_encounter_id) {
            continue;
        }

        let mut loot = Loot::new(next_loot_id(), owner, loot_type, None);
        loot.loot_method = LootMethod::PersonalLoot;
        loot.set_dungeon_encounter_id(Some(dungeon_encounter_id));
        loot.set_item_context(item_context);
        loot.generate_money_loot(min_money, max_money, storage.config().rate_drop_money, rng);
        personal_loot.insert(*tapper_id, loot);
    }

    if let Some(template) = storage.store(store_type).get_loot_for(loot_id) {
        let mut ctx = LootProcessContext {
            storage,
            world,
            rng,
        };
        process_personal_loot(
            template,
            &mut personal_loot,
            &mut ctx,
            store_type.rates_allowed(),
            loot_mode,
        );
    } else {
        log::error!(target: "loot_tables",
            "Table '{}' loot id #{} used but it doesn't have records.",
            store_type.table_name(),
            loot_id
        );
    }

    for (player_id, loot) in personal_loot.iter_mut() {
        loot.fill_not_normal_loot_for(world, *player_id);
    }

    personal_loot.retain(|_, loot| !loot.is_looted());
    personal_loot
}
