use crate::domain::UserId;
use crate::domain::money::{Amount, Balance};
use crate::error::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's spendable balance. Only ever mutated alongside a ledger entry
/// write, inside the same atomic unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub available: Balance,
}

impl Wallet {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            available: Balance::ZERO,
        }
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.available += Balance::new(amount);
    }

    /// Debits a strictly positive amount; the balance never goes negative.
    pub fn debit(&mut self, amount: Amount) -> Result<(), EngineError> {
        let requested = amount.value();
        if self.available.value() < requested {
            return Err(EngineError::InsufficientFunds {
                user_id: self.user_id,
                available: self.available.value(),
                requested,
            });
        }
        self.available -= Balance::new(requested);
        Ok(())
    }
}
