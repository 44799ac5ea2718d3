use std::fmt;

mod accounts;
mod debts;
mod events;
mod missions;
mod negotiations;
mod snapshot;
#[cfg(test)]
mod tests;

use contracts::{
    ActorRef, ActorRole, BalanceChange, Debt, DebtStatus, Event, EventType, MarketConfig,
    MarketSnapshot, MarketStatus, Mission, MissionStatus, Negotiation, NegotiationParty,
    NegotiationStatus, TargetMark, TransactionKind, TransactionRecord, SCHEMA_VERSION_V1,
};
use serde_json::{json, Value};

use crate::auth;
use crate::ledger::{Ledger, LedgerError};
use crate::store::{
    DebtRepository, InMemoryDebts, InMemoryMissions, InMemoryNegotiations, InMemoryTargets,
    MissionRepository, NegotiationRepository, TargetRepository,
};

use events::Effect;
pub use missions::{MissionDraft, MissionUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    NotFound {
        entity: &'static str,
        id: String,
    },
    Forbidden {
        operation: &'static str,
        actor_id: String,
    },
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },
    InsufficientFunds {
        user_id: String,
        balance: i64,
        required: i64,
    },
    AlreadyAssigned {
        mission_id: String,
        assassin_id: String,
    },
    Validation(String),
    Conflict(String),
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Forbidden { operation, actor_id } => {
                write!(f, "{actor_id} is not authorized for {operation}")
            }
            Self::InvalidState {
                entity,
                id,
                status,
                operation,
            } => write!(f, "{operation} is not legal for {entity} {id} in status {status}"),
            Self::InsufficientFunds {
                user_id,
                balance,
                required,
            } => write!(
                f,
                "insufficient funds for {user_id}: balance={balance} required={required}"
            ),
            Self::AlreadyAssigned {
                mission_id,
                assassin_id,
            } => write!(f, "mission {mission_id} is already assigned to {assassin_id}"),
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
        }
    }
}

impl std::error::Error for MarketError {}

impl MarketError {
    pub fn error_code(&self) -> contracts::ErrorCode {
        match self {
            Self::NotFound { .. } => contracts::ErrorCode::NotFound,
            Self::Forbidden { .. } => contracts::ErrorCode::Forbidden,
            Self::InvalidState { .. } => contracts::ErrorCode::InvalidState,
            Self::InsufficientFunds { .. } => contracts::ErrorCode::InsufficientFunds,
            Self::AlreadyAssigned { .. } => contracts::ErrorCode::AlreadyAssigned,
            Self::Validation(_) => contracts::ErrorCode::ValidationError,
            Self::Conflict(_) => contracts::ErrorCode::Conflict,
        }
    }

    pub fn to_api_error(&self) -> contracts::ApiError {
        contracts::ApiError::new(self.error_code(), self.to_string(), None)
    }
}

impl From<LedgerError> for MarketError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::UnknownAccount(user_id) => Self::NotFound {
                entity: "account",
                id: user_id,
            },
            LedgerError::DuplicateAccount(user_id) => {
                Self::Conflict(format!("account already exists: {user_id}"))
            }
            LedgerError::InsufficientFunds {
                user_id,
                balance,
                required,
            } => Self::InsufficientFunds {
                user_id,
                balance,
                required,
            },
            LedgerError::InvalidAmount(amount) => {
                Self::Validation(format!("amount must be positive, got {amount}"))
            }
        }
    }
}

/// The marketplace kernel. Owns the ledger, the per-entity repositories, and
/// the notification event log. Every operation validates the caller and the
/// entity's current status, settles any currency movement with the ledger,
/// writes the entity, and only then appends its effects to the event log.
#[derive(Debug)]
pub struct Market {
    pub config: MarketConfig,
    seq: u64,
    ledger: Ledger,
    missions: Box<dyn MissionRepository>,
    negotiations: Box<dyn NegotiationRepository>,
    debts: Box<dyn DebtRepository>,
    targets: Box<dyn TargetRepository>,
    event_log: Vec<Event>,
}

impl Market {
    pub fn new(config: MarketConfig) -> Self {
        Self::with_stores(
            config,
            Box::new(InMemoryMissions::default()),
            Box::new(InMemoryNegotiations::default()),
            Box::new(InMemoryDebts::default()),
            Box::new(InMemoryTargets::default()),
        )
    }

    pub fn with_stores(
        config: MarketConfig,
        missions: Box<dyn MissionRepository>,
        negotiations: Box<dyn NegotiationRepository>,
        debts: Box<dyn DebtRepository>,
        targets: Box<dyn TargetRepository>,
    ) -> Self {
        Self {
            config,
            seq: 0,
            ledger: Ledger::default(),
            missions,
            negotiations,
            debts,
            targets,
            event_log: Vec::new(),
        }
    }

    pub fn status(&self) -> MarketStatus {
        MarketStatus {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            market_id: self.config.market_id.clone(),
            seq: self.seq,
            account_count: self.ledger.accounts().len(),
            mission_count: self.missions.len(),
            debt_count: self.debts.len(),
            event_count: self.event_log.len(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn mission(&self, mission_id: &str) -> Option<Mission> {
        self.missions.get(mission_id)
    }

    pub fn negotiation(&self, negotiation_id: &str) -> Option<Negotiation> {
        self.negotiations.get(negotiation_id)
    }

    pub fn negotiations_for_mission(&self, mission_id: &str) -> Vec<Negotiation> {
        self.negotiations.for_mission(mission_id)
    }

    pub fn debt(&self, debt_id: &str) -> Option<Debt> {
        self.debts.get(debt_id)
    }

    pub fn list_debts(&self) -> Vec<Debt> {
        self.debts.list()
    }

    pub fn list_targets(&self) -> Vec<TargetMark> {
        self.targets.list()
    }

    pub fn targets_for_user(&self, user_id: &str) -> Vec<TargetMark> {
        self.targets.for_user(user_id)
    }

    pub fn list_missions(&self) -> Vec<Mission> {
        self.missions.list()
    }

    /// Missions visible to the caller: admins see everything, others see
    /// public missions plus private ones where they are a named party.
    /// Visibility is a listing concern only; the state machine itself does
    /// not consult it.
    pub fn visible_missions(&self, actor_id: &str, role: ActorRole) -> Vec<Mission> {
        self.missions
            .list()
            .into_iter()
            .filter(|mission| {
                if role == ActorRole::Admin || !mission.is_private {
                    return true;
                }
                mission.contractor_id == actor_id
                    || mission.assassin_id.as_deref() == Some(actor_id)
                    || mission.target_assassin_id.as_deref() == Some(actor_id)
            })
            .collect()
    }

    /// Sum of rewards currently held in escrow (missions that have been paid
    /// for but not yet paid out or refunded).
    pub fn escrowed_coins(&self) -> i64 {
        self.missions
            .list()
            .iter()
            .filter(|mission| !mission.status.is_terminal())
            .map(|mission| mission.reward)
            .sum()
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn require_mission(&self, mission_id: &str) -> Result<Mission, MarketError> {
        self.missions.get(mission_id).ok_or_else(|| MarketError::NotFound {
            entity: "mission",
            id: mission_id.to_string(),
        })
    }

    fn require_negotiation(&self, negotiation_id: &str) -> Result<Negotiation, MarketError> {
        self.negotiations
            .get(negotiation_id)
            .ok_or_else(|| MarketError::NotFound {
                entity: "negotiation",
                id: negotiation_id.to_string(),
            })
    }

    fn require_debt(&self, debt_id: &str) -> Result<Debt, MarketError> {
        self.debts.get(debt_id).ok_or_else(|| MarketError::NotFound {
            entity: "debt",
            id: debt_id.to_string(),
        })
    }

    fn require_account(&self, user_id: &str) -> Result<(), MarketError> {
        if self.ledger.has_account(user_id) {
            Ok(())
        } else {
            Err(MarketError::NotFound {
                entity: "account",
                id: user_id.to_string(),
            })
        }
    }
}
