mod loot_roll_system;
mod personal_loot_system;

pub use loot_roll_system::loot_roll_system;
pub use personal_loot_system::{generate_dungeon_encounter_personal_loot, process_personal_loot};
