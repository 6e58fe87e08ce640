//! Credit accounting contract and an in-memory ledger.
//!
//! Persistence of balances belongs to the host application; it plugs in
//! through [`CreditLedger`]. [`MemoryLedger`] backs the CLI and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CreditError {
    #[error("insufficient credits: {required} required, {available} available")]
    Insufficient { required: u32, available: u32 },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Authenticated user as seen by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Enhance,
    Refund,
}

/// One line of a user's usage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub at: DateTime<Utc>,
    pub kind: UsageKind,
    pub amount: u32,
    pub detail: String,
}

#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn balance(&self, user: &User) -> Result<u32, CreditError>;

    async fn has_credits(&self, user: &User, amount: u32) -> Result<bool, CreditError> {
        Ok(self.balance(user).await? >= amount)
    }

    /// Subtract `amount`, failing without change when the balance is short.
    /// Returns the remaining balance.
    async fn debit(&self, user: &User, amount: u32) -> Result<u32, CreditError>;

    /// Add `amount` back. Returns the new balance.
    async fn credit(&self, user: &User, amount: u32) -> Result<u32, CreditError>;

    async fn log_usage(&self, user: &User, entry: UsageEntry) -> Result<(), CreditError>;

    async fn history(&self, user: &User) -> Result<Vec<UsageEntry>, CreditError>;
}

#[derive(Debug, Default)]
struct Account {
    balance: u32,
    history: Vec<UsageEntry>,
}

/// Process-local ledger. Unknown users have a zero balance.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<User, Account>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's balance.
    pub async fn grant(&self, user: &User, balance: u32) {
        let mut accounts = self.accounts.lock().await;
        accounts.entry(user.clone()).or_default().balance = balance;
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn balance(&self, user: &User) -> Result<u32, CreditError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.get(user).map_or(0, |a| a.balance))
    }

    async fn debit(&self, user: &User, amount: u32) -> Result<u32, CreditError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(user.clone()).or_default();
        if account.balance < amount {
            return Err(CreditError::Insufficient {
                required: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        Ok(account.balance)
    }

    async fn credit(&self, user: &User, amount: u32) -> Result<u32, CreditError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts.entry(user.clone()).or_default();
        account.balance = account.balance.saturating_add(amount);
        Ok(account.balance)
    }

    async fn log_usage(&self, user: &User, entry: UsageEntry) -> Result<(), CreditError> {
        let mut accounts = self.accounts.lock().await;
        accounts.entry(user.clone()).or_default().history.push(entry);
        Ok(())
    }

    async fn history(&self, user: &User) -> Result<Vec<UsageEntry>, CreditError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .get(user)
            .map(|a| a.history.clone())
            .unwrap_or_default())
    }
}
