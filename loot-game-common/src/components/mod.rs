mod inventory;
mod player_id;
mod team;

pub use inventory::{InventoryError, Money};
pub use player_id::PlayerId;
pub use team::Team;
