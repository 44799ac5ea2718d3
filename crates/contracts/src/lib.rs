//! v1 cross-boundary contracts for the guild kernel, API, and persistence.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION_V1: &str = "1.0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Contractor,
    Assassin,
    Admin,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contractor => "contractor",
            Self::Assassin => "assassin",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorRef {
    pub actor_id: String,
    pub role: ActorRole,
}

impl ActorRef {
    pub fn new(actor_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            actor_id: actor_id.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketConfig {
    pub schema_version: String,
    pub market_id: String,
    /// Coins granted to a freshly registered account.
    pub starting_balance: i64,
    pub notes: Option<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            market_id: "market_local_001".to_string(),
            starting_balance: 0,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Open,
    Negotiating,
    InProgress,
    Completed,
    Cancelled,
}

impl MissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Negotiating => "negotiating",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mission {
    pub schema_version: String,
    pub mission_id: String,
    pub title: String,
    pub description: String,
    /// Reward in coins, escrowed from the contractor while the mission is live.
    pub reward: i64,
    pub status: MissionStatus,
    pub contractor_id: String,
    pub assassin_id: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub target_assassin_id: Option<String>,
    pub created_at_seq: u64,
    pub updated_at_seq: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationParty {
    Contractor,
    Assassin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl NegotiationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Negotiation {
    pub schema_version: String,
    pub negotiation_id: String,
    pub mission_id: String,
    pub proposed_by: NegotiationParty,
    pub proposed_by_id: String,
    pub proposed_reward: i64,
    pub status: NegotiationStatus,
    pub created_at_seq: u64,
    pub resolved_at_seq: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Active,
    PaymentRequested,
    InProgress,
    Completed,
    Rejected,
}

impl DebtStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::PaymentRequested => "payment_requested",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Debt {
    pub schema_version: String,
    pub debt_id: String,
    pub debtor_id: String,
    pub creditor_id: String,
    pub favor_description: String,
    /// Set when the creditor calls the favor in.
    pub payment_description: Option<String>,
    pub status: DebtStatus,
    pub created_at_seq: u64,
    pub updated_at_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetMark {
    pub schema_version: String,
    pub target_id: String,
    pub target_user_id: String,
    pub debt_id: String,
    pub reason: String,
    pub marked_at_seq: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Payment,
    Reward,
}

/// Append-only audit record of a single balance mutation. Negative amounts
/// are debits, positive amounts credits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub schema_version: String,
    pub transaction_id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserRegistered,
    CoinsPurchased,
    MissionCreated,
    MissionUpdated,
    MissionAssigned,
    MissionCompleted,
    MissionCancelled,
    NegotiationProposed,
    NegotiationAccepted,
    NegotiationRejected,
    DebtRequested,
    DebtAccepted,
    DebtRejected,
    PaymentRequested,
    PaymentAccepted,
    PaymentRejected,
    CompletionClaimed,
    CompletionConfirmed,
    CompletionRejected,
    TargetMarked,
}

/// User-visible notification record, keyed by recipient. Produced by the
/// kernel after a state transition commits; consumed by the persistence
/// layer and the stream, never read back by the state machines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub schema_version: String,
    pub market_id: String,
    pub seq: u64,
    pub event_id: String,
    pub sequence_in_op: u64,
    pub event_type: EventType,
    pub recipient_id: String,
    pub actors: Vec<ActorRef>,
    pub caused_by: Vec<String>,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    InvalidState,
    InsufficientFunds,
    AlreadyAssigned,
    ValidationError,
    Conflict,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{:?}: {} ({details})", self.error_code, self.message),
            None => write!(f, "{:?}: {}", self.error_code, self.message),
        }
    }
}

/// Balance movement attached to an operation response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceChange {
    pub user_id: String,
    pub delta: i64,
    pub balance_after: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketStatus {
    pub schema_version: String,
    pub market_id: String,
    pub seq: u64,
    pub account_count: usize,
    pub mission_count: usize,
    pub debt_count: usize,
    pub event_count: usize,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "market_id={} seq={} accounts={} missions={} debts={} events={}",
            self.market_id,
            self.seq,
            self.account_count,
            self.mission_count,
            self.debt_count,
            self.event_count
        )
    }
}

/// Full serializable kernel state for checkpoint and reload. Transactions
/// and events are append-only logs persisted alongside, not inside, the
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub schema_version: String,
    pub market_id: String,
    pub seq: u64,
    pub config: MarketConfig,
    pub accounts: BTreeMap<String, i64>,
    pub missions: Vec<Mission>,
    pub negotiations: Vec<Negotiation>,
    pub debts: Vec<Debt>,
    pub targets: Vec<TargetMark>,
}

/// Deserializes a nullable, omittable field into `Option<Option<T>>`: an
/// absent field is "leave unchanged" (via `#[serde(default)]`), an explicit
/// null is "clear".
pub mod serde_double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
