use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Sub};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(pub u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Money) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Money) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Div<u64> for Money {
    type Output = Self;

    fn div(self, rhs: u64) -> Self {
        if rhs == 0 {
            self
        } else {
            Self(self.0 / rhs)
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Deserialize, Serialize)]
pub enum InventoryError {
    #[error("Inventory is full")]
    InventoryFull,
    #[error("Too many of that item")]
    ItemMaxCount,
    #[error("Cannot carry more money")]
    TooMuchMoney,
    #[error("Item cannot be stored by this player")]
    NotAllowed,
}
