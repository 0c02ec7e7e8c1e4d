use enum_map::Enum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, Deserialize, Serialize)]
pub enum Team {
    Alliance,
    Horde,
}
