use std::collections::BTreeMap;
use std::fmt;

use contracts::{TransactionKind, TransactionRecord, SCHEMA_VERSION_V1};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    UnknownAccount(String),
    DuplicateAccount(String),
    InsufficientFunds {
        user_id: String,
        balance: i64,
        required: i64,
    },
    InvalidAmount(i64),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAccount(user_id) => write!(f, "unknown account: {user_id}"),
            Self::DuplicateAccount(user_id) => write!(f, "account already exists: {user_id}"),
            Self::InsufficientFunds {
                user_id,
                balance,
                required,
            } => write!(
                f,
                "insufficient funds for {user_id}: balance={balance} required={required}"
            ),
            Self::InvalidAmount(amount) => write!(f, "invalid amount: {amount}"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Exclusive owner of coin balances. Every mutation appends a
/// [`TransactionRecord`]; the records are an audit log and are never read
/// back to decide anything.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: BTreeMap<String, i64>,
    transactions: Vec<TransactionRecord>,
}

impl Ledger {
    pub fn open_account(&mut self, user_id: &str) -> Result<(), LedgerError> {
        if self.accounts.contains_key(user_id) {
            return Err(LedgerError::DuplicateAccount(user_id.to_string()));
        }
        self.accounts.insert(user_id.to_string(), 0);
        Ok(())
    }

    pub fn has_account(&self, user_id: &str) -> bool {
        self.accounts.contains_key(user_id)
    }

    pub fn balance(&self, user_id: &str) -> Result<i64, LedgerError> {
        self.accounts
            .get(user_id)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount(user_id.to_string()))
    }

    /// Decreases the balance by `amount`, checked before any mutation so a
    /// failed debit leaves nothing behind. Returns the new balance.
    pub fn debit(
        &mut self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        seq: u64,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let balance = self.balance(user_id)?;
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                user_id: user_id.to_string(),
                balance,
                required: amount,
            });
        }
        let after = balance - amount;
        self.accounts.insert(user_id.to_string(), after);
        self.record(user_id, kind, -amount, description, seq);
        Ok(after)
    }

    /// Increases the balance by `amount`. Never fails for a positive amount
    /// on an existing account. Returns the new balance.
    pub fn credit(
        &mut self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        seq: u64,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let balance = self.balance(user_id)?;
        let after = balance + amount;
        self.accounts.insert(user_id.to_string(), after);
        self.record(user_id, kind, amount, description, seq);
        Ok(after)
    }

    /// Debit-then-credit. The credit target is resolved before the debit so
    /// a missing destination cannot strand funds mid-transfer.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        seq: u64,
    ) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.balance(to)?;
        self.debit(from, amount, kind, description, seq)?;
        self.credit(to, amount, kind, description, seq)?;
        Ok(())
    }

    pub fn total_coins(&self) -> i64 {
        self.accounts.values().sum()
    }

    pub fn accounts(&self) -> &BTreeMap<String, i64> {
        &self.accounts
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    pub fn transactions_for(&self, user_id: &str) -> Vec<TransactionRecord> {
        self.transactions
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Rebuild from persisted state. Balances are taken as-is; the caller is
    /// responsible for handing back the matching transaction log.
    pub fn restore(accounts: BTreeMap<String, i64>, transactions: Vec<TransactionRecord>) -> Self {
        Self {
            accounts,
            transactions,
        }
    }

    fn record(&mut self, user_id: &str, kind: TransactionKind, amount: i64, description: &str, seq: u64) {
        let transaction_id = format!("txn:{seq}:{}", self.transactions.len() + 1);
        self.transactions.push(TransactionRecord {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            transaction_id,
            user_id: user_id.to_string(),
            kind,
            amount,
            description: description.to_string(),
            seq,
        });
    }
}
