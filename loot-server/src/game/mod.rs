mod eligibility;
mod world;

pub mod components;
pub mod resources;
pub mod storage;
pub mod systems;

#[cfg(test)]
pub(crate) mod test_world;

pub use eligibility::ItemEligibility;
pub use world::{send_message, CriteriaEvent, LootPlayer, LootWorld, StoreDestination};
