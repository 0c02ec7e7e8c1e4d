use rand::RngCore;
use std::time::Instant;

use loot_data::{LootModeFlags, LootStoreType, SpellId};
use loot_game_common::{
    components::PlayerId,
    messages::{LootType, RollVote},
};

use crate::game::{
    components::{Loot, LootRoll, LootRollOutcome},
    resources::LootStorage,
    CriteriaEvent, LootWorld, StoreDestination,
};

/// Resolves every roll of `loot` that is complete or has timed out and
/// hands the items to the winners.
pub fn loot_roll_system(
    loot: &mut Loot,
    world: &mut dyn LootWorld,
    storage: &LootStorage,
    now: Instant,
    rng: &mut dyn RngCore,
) {
    let finished: Vec<(usize, LootRollOutcome)> = loot
        .rolls
        .iter_mut()
        .filter_map(|(slot, roll)| roll.update(&*world, now).map(|outcome| (*slot, outcome)))
        .collect();

    for (slot, outcome) in finished {
        if let Some(roll) = loot.rolls.remove(&slot) {
            finish_loot_roll(loot, world, storage, &roll, outcome, rng);
        }
    }
}

fn finish_loot_roll(
    loot: &mut Loot,
    world: &mut dyn LootWorld,
    storage: &LootStorage,
    roll: &LootRoll,
    outcome: LootRollOutcome,
    rng: &mut dyn RngCore,
) {
    let slot = roll.slot();
    let item = if let Some(item) = loot.items.get_mut(slot) {
        item
    } else {
        return;
    };
    item.is_blocked = false;

    match outcome {
        LootRollOutcome::AllPassed => {
            log::debug!(
                "Everyone passed on item {} in slot {} of loot {:?}",
                item.item_id,
                slot,
                loot.loot_id
            );
            roll.send_all_passed(&*world);
        }
        LootRollOutcome::Won {
            winner,
            roll_number,
            vote,
        } => {
            item.roll_winner = Some(winner);
            let item_id = item.item_id;

            roll.send_roll_won(&*world, winner, roll_number, vote);
            world.update_criteria(
                winner,
                CriteriaEvent::WonRoll {
                    vote,
                    item_id,
                    roll_number,
                },
            );

            if vote == RollVote::Disenchant {
                world.update_criteria(winner, CriteriaEvent::CastSpell(SpellId::DISENCHANT));
                disenchant_roll_item(loot, world, storage, slot, winner, rng);
            } else if let Err(error) = loot.loot_item(world, winner, slot) {
                log::debug!(
                    "Roll winner {} could not take item {} from loot {:?}: {}",
                    winner,
                    item_id,
                    loot.loot_id,
                    error
                );
            }
        }
    }

    roll.send_rolls_complete(&*world);
}

/// The winner chose to disenchant: they receive the disenchant loot of the
/// item instead of the item itself, whatever does not fit is mailed.
fn disenchant_roll_item(
    loot: &mut Loot,
    world: &mut dyn LootWorld,
    storage: &LootStorage,
    slot: usize,
    winner: PlayerId,
    rng: &mut dyn RngCore,
) {
    let item_id = loot.items[slot].item_id;
    let disenchant_loot_id = world
        .item_database()
        .get_item(item_id)
        .and_then(|item_data| item_data.disenchant_loot_id);

    if let Some(disenchant_loot_id) = disenchant_loot_id {
        let mut disenchant_loot = Loot::new(loot.loot_id, loot.owner, LootType::Disenchanting, None);
        disenchant_loot.fill_loot(
            disenchant_loot_id,
            LootStoreType::Disenchant,
            storage,
            &*world,
            winner,
            None,
            true,
            false,
            LootModeFlags::DEFAULT,
            rng,
        );

        if disenchant_loot
            .auto_store(world, winner, StoreDestination::ANY)
            .is_err()
        {
            for item in disenchant_loot.items.iter() {
                if !item.is_looted_for(winner) && item.has_allowed_looter(winner) {
                    world.send_item_retrieval_mail(winner, item);
                }
            }
        }
    }

    loot.mark_item_looted(world, winner, slot);
}
