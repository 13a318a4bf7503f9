//! Single trading account

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountError {
    /// The sale would leave the balance below zero
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    /// The result does not fit the balance type
    #[error("balance overflow")]
    Overflow,
}

/// Mutable coin balance with a fixed opening value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    opening: i64,
    balance: i64,
}

impl Account {
    pub fn new(opening: i64) -> Self {
        Self {
            opening,
            balance: opening,
        }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn opening(&self) -> i64 {
        self.opening
    }

    /// Add `amount` to the balance
    pub fn buy(&mut self, amount: i64) -> Result<i64, AccountError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::Overflow)?;
        Ok(self.balance)
    }

    /// Remove `amount`; rejected without mutation if the result would be negative
    pub fn sell(&mut self, amount: i64) -> Result<i64, AccountError> {
        let remaining = self
            .balance
            .checked_sub(amount)
            .ok_or(AccountError::Overflow)?;
        if remaining < 0 {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance = remaining;
        Ok(self.balance)
    }

    /// Reset to the opening value
    pub fn reload(&mut self) -> i64 {
        self.balance = self.opening;
        self.balance
    }
}
