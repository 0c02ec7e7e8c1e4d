use rand::{Rng, RngCore};
use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use loot_data::{DungeonEncounterId, ItemFlags, ItemId};
use loot_game_common::{
    components::PlayerId,
    messages::{
        server::{LootAllPassed, LootRollBroadcast, LootRollWon, ServerMessage, StartLootRoll},
        LootId, RollVote, RollVoteMask,
    },
};

use crate::game::{components::LootItem, send_message, CriteriaEvent, LootWorld};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LootRollState {
    NotStarted,
    InProgress,
    Resolved,
    Expired,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LootRollVoter {
    pub vote: RollVote,
    pub roll_number: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LootRollOutcome {
    Won {
        winner: PlayerId,
        roll_number: u8,
        vote: RollVote,
    },
    AllPassed,
}

/// A Need / Greed / Disenchant / Pass vote for one blocked loot item.
pub struct LootRoll {
    loot_id: LootId,
    slot: usize,
    item_id: ItemId,
    count: u32,
    dungeon_encounter_id: Option<DungeonEncounterId>,
    voters: BTreeMap<PlayerId, LootRollVoter>,
    vote_mask: RollVoteMask,
    roll_time: Duration,
    end_time: Option<Instant>,
    state: LootRollState,
}

impl LootRoll {
    pub fn new(
        loot_id: LootId,
        slot: usize,
        dungeon_encounter_id: Option<DungeonEncounterId>,
    ) -> Self {
        Self {
            loot_id,
            slot,
            item_id: ItemId::new(0),
            count: 0,
            dungeon_encounter_id,
            voters: BTreeMap::new(),
            vote_mask: RollVoteMask::ALL,
            roll_time: Duration::ZERO,
            end_time: None,
            state: LootRollState::NotStarted,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn state(&self) -> LootRollState {
        self.state
    }

    pub fn vote_mask(&self) -> RollVoteMask {
        self.vote_mask
    }

    pub fn end_time(&self) -> Option<Instant> {
        self.end_time
    }

    pub fn voters(&self) -> impl Iterator<Item = (&PlayerId, &LootRollVoter)> {
        self.voters.iter()
    }

    pub fn voter(&self, player_id: PlayerId) -> Option<&LootRollVoter> {
        self.voters.get(&player_id)
    }

    /// Blocks the item and starts the vote among its reachable allowed
    /// looters. With a single voter there is nothing to roll for: the item is
    /// unblocked, marked under threshold and false is returned.
    pub fn try_to_start(
        &mut self,
        world: &dyn LootWorld,
        item: &mut LootItem,
        max_enchanting_skill: u16,
        now: Instant,
        roll_time: Duration,
    ) -> bool {
        if self.state != LootRollState::NotStarted {
            return false;
        }

        self.item_id = item.item_id;
        self.count = item.count;
        item.is_blocked = true;

        for &player_id in item.allowed_looters.iter() {
            if let Some(player) = world.player(player_id) {
                let vote = if player.pass_on_group_loot() {
                    RollVote::Pass
                } else {
                    RollVote::NotVoted
                };
                self.voters.insert(
                    player_id,
                    LootRollVoter {
                        vote,
                        roll_number: 0,
                    },
                );
            }
        }

        let item_data = world.item_database().get_item(item.item_id);

        self.vote_mask = RollVoteMask::ALL;
        if item_data.map_or(false, |item_data| {
            item_data.flags.contains(ItemFlags::CAN_ONLY_ROLL_GREED)
        }) {
            self.vote_mask.remove(RollVoteMask::NEED);
        }

        let can_disenchant = item_data.map_or(false, |item_data| {
            item_data.disenchant_loot_id.is_some()
                && item_data.required_disenchant_skill <= max_enchanting_skill
        });
        if !can_disenchant {
            self.vote_mask.remove(RollVoteMask::DISENCHANT);
        }

        if self.voters.len() > 1 {
            self.roll_time = roll_time;
            self.end_time = Some(now + roll_time);
            self.state = LootRollState::InProgress;
            self.send_start_loot_roll(world);
            return true;
        }

        item.is_under_threshold = true;
        item.is_blocked = false;
        false
    }

    fn player_vote_mask(&self, world: &dyn LootWorld, player_id: PlayerId) -> RollVoteMask {
        let mut vote_mask = self.vote_mask;

        if let (Some(player), Some(item_data)) = (
            world.player(player_id),
            world.item_database().get_item(self.item_id),
        ) {
            if !player.can_roll_need_for_item(item_data) {
                vote_mask.remove(RollVoteMask::NEED);
            }
        }

        vote_mask
    }

    fn send_start_loot_roll(&self, world: &dyn LootWorld) {
        for (&player_id, voter) in self.voters.iter() {
            if voter.vote != RollVote::NotVoted {
                continue;
            }

            send_message(
                world,
                player_id,
                ServerMessage::StartLootRoll(StartLootRoll {
                    loot_id: self.loot_id,
                    slot: self.slot,
                    item_id: self.item_id,
                    count: self.count,
                    roll_time: self.roll_time,
                    valid_rolls: self.player_vote_mask(world, player_id),
                    dungeon_encounter_id: self.dungeon_encounter_id,
                }),
            );
        }

        for (&player_id, voter) in self.voters.iter() {
            if voter.vote == RollVote::Pass {
                self.send_to_voters(
                    world,
                    ServerMessage::LootRoll(LootRollBroadcast {
                        loot_id: self.loot_id,
                        slot: self.slot,
                        player_id,
                        roll_number: None,
                        vote: RollVote::Pass,
                        auto_pass: true,
                    }),
                );
            }
        }
    }

    fn send_to_voters(&self, world: &dyn LootWorld, message: ServerMessage) {
        for &player_id in self.voters.keys() {
            send_message(world, player_id, message.clone());
        }
    }

    pub(crate) fn send_roll_won(&self, world: &dyn LootWorld, winner: PlayerId, roll_number: u8, vote: RollVote) {
        self.send_to_voters(
            world,
            ServerMessage::LootRollWon(LootRollWon {
                loot_id: self.loot_id,
                slot: self.slot,
                item_id: self.item_id,
                winner,
                roll_number,
                vote,
            }),
        );
    }

    pub(crate) fn send_all_passed(&self, world: &dyn LootWorld) {
        self.send_to_voters(
            world,
            ServerMessage::LootAllPassed(LootAllPassed {
                loot_id: self.loot_id,
                slot: self.slot,
                item_id: self.item_id,
            }),
        );
    }

    pub(crate) fn send_rolls_complete(&self, world: &dyn LootWorld) {
        self.send_to_voters(
            world,
            ServerMessage::LootRollsComplete {
                loot_id: self.loot_id,
                slot: self.slot,
            },
        );
    }

    /// Records a vote. Votes from players outside the roll, repeated votes
    /// and votes not permitted for this player are ignored and return false.
    pub fn player_vote(
        &mut self,
        world: &mut dyn LootWorld,
        player_id: PlayerId,
        vote: RollVote,
        rng: &mut dyn RngCore,
    ) -> bool {
        if self.state != LootRollState::InProgress {
            return false;
        }

        let allowed_votes = self.player_vote_mask(&*world, player_id);
        let voter = if let Some(voter) = self.voters.get_mut(&player_id) {
            voter
        } else {
            return false;
        };

        if voter.vote != RollVote::NotVoted || !allowed_votes.contains(vote.mask()) {
            return false;
        }

        if matches!(vote, RollVote::NotVoted | RollVote::Invalid) {
            return false;
        }

        voter.vote = vote;
        let roll_number = if vote == RollVote::Pass {
            None
        } else {
            voter.roll_number = rng.gen_range(1..=100);
            Some(voter.roll_number)
        };

        if let Some(roll_number) = roll_number {
            world.update_criteria(
                player_id,
                CriteriaEvent::Roll {
                    vote,
                    item_id: self.item_id,
                    roll_number,
                },
            );
        }

        self.send_to_voters(
            &*world,
            ServerMessage::LootRoll(LootRollBroadcast {
                loot_id: self.loot_id,
                slot: self.slot,
                player_id,
                roll_number,
                vote,
                auto_pass: false,
            }),
        );
        true
    }

    /// Returns whether every reachable voter has voted, and the current
    /// leader. Need beats Greed and Disenchant, then the highest roll wins.
    /// Equal rolls keep the voter with the lowest player id.
    fn evaluate_votes(&self, world: &dyn LootWorld) -> (bool, Option<(PlayerId, LootRollVoter)>) {
        let mut not_voted = 0;
        let mut someone_needs = false;
        let mut winner: Option<(PlayerId, LootRollVoter)> = None;

        for (&player_id, voter) in self.voters.iter() {
            if world.player(player_id).is_none() {
                continue;
            }

            match voter.vote {
                RollVote::Need => {
                    if !someone_needs
                        || winner.map_or(true, |(_, leader)| voter.roll_number > leader.roll_number)
                    {
                        someone_needs = true;
                        winner = Some((player_id, *voter));
                    }
                }
                RollVote::Greed | RollVote::Disenchant => {
                    if !someone_needs
                        && winner.map_or(true, |(_, leader)| voter.roll_number > leader.roll_number)
                    {
                        winner = Some((player_id, *voter));
                    }
                }
                RollVote::NotVoted => not_voted += 1,
                RollVote::Pass | RollVote::Invalid => {}
            }
        }

        (not_voted == 0, winner)
    }

    /// Finishes the roll once every reachable voter has voted or the roll
    /// timer has run out.
    pub fn update(&mut self, world: &dyn LootWorld, now: Instant) -> Option<LootRollOutcome> {
        if self.state != LootRollState::InProgress {
            return None;
        }

        let (all_voted, winner) = self.evaluate_votes(world);
        if all_voted {
            self.state = LootRollState::Resolved;
        } else if self.end_time.map_or(false, |end_time| now >= end_time) {
            self.state = LootRollState::Expired;
        } else {
            return None;
        }

        Some(match winner {
            Some((winner, voter)) => LootRollOutcome::Won {
                winner,
                roll_number: voter.roll_number,
                vote: voter.vote,
            },
            None => LootRollOutcome::AllPassed,
        })
    }

    /// Abandons a running roll, everyone is told it was passed.
    pub fn cancel(&mut self, world: &dyn LootWorld) -> bool {
        if self.state != LootRollState::InProgress {
            return false;
        }

        self.state = LootRollState::Expired;
        self.send_all_passed(world);
        true
    }
}
