//! In-process API facade with operation delegation, SQLite persistence, and
//! the HTTP server.

mod persistence;
mod server;

use std::path::Path;

use contracts::{
    ActorRef, BalanceChange, Debt, Event, MarketConfig, MarketStatus, Mission, Negotiation,
    TargetMark, TransactionRecord,
};
use guild_core::{Market, MarketError, MissionDraft, MissionUpdate};
use persistence::SqliteMarketStore;
pub use persistence::{PersistedMarketSummary, PersistenceError};
pub use server::{serve, ServerError};

#[derive(Debug)]
struct PersistenceState {
    store: SqliteMarketStore,
    persisted_transaction_count: usize,
    persisted_event_count: usize,
}

/// Wraps the kernel and mirrors every committed operation into the attached
/// store. A persistence failure is surfaced through
/// [`MarketApi::last_persistence_error`] instead of poisoning kernel state;
/// the next successful flush clears it.
#[derive(Debug)]
pub struct MarketApi {
    market: Market,
    persistence: Option<PersistenceState>,
    last_persistence_error: Option<String>,
}

impl MarketApi {
    pub fn from_config(config: MarketConfig) -> Self {
        Self {
            market: Market::new(config),
            persistence: None,
            last_persistence_error: None,
        }
    }

    pub fn market_id(&self) -> &str {
        &self.market.config.market_id
    }

    pub fn status(&self) -> MarketStatus {
        self.market.status()
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let store = SqliteMarketStore::open(path)?;
        self.persistence = Some(PersistenceState {
            store,
            persisted_transaction_count: 0,
            persisted_event_count: 0,
        });
        Ok(())
    }

    /// Writes the bootstrap snapshot for a fresh market. Refuses to clobber
    /// an existing market unless `replace_existing` is set.
    pub fn initialize_market_storage(
        &mut self,
        replace_existing: bool,
    ) -> Result<(), PersistenceError> {
        let Some(state) = self.persistence.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        let market_id = self.market.config.market_id.clone();
        if state.store.market_exists(&market_id)? {
            if replace_existing {
                state.store.delete_market(&market_id)?;
                state.persisted_transaction_count = 0;
                state.persisted_event_count = 0;
            } else {
                return Err(PersistenceError::MarketAlreadyExists(market_id));
            }
        }

        let snapshot = self.market.snapshot();
        state.store.persist_delta(
            &snapshot,
            self.market.ledger().transactions(),
            self.market.events(),
        )?;
        state.persisted_transaction_count = self.market.ledger().transactions().len();
        state.persisted_event_count = self.market.events().len();
        self.last_persistence_error = None;
        Ok(())
    }

    /// Rebuilds a facade from a persisted market.
    pub fn load_from_store(
        path: impl AsRef<Path>,
        market_id: &str,
    ) -> Result<Self, PersistenceError> {
        let store = SqliteMarketStore::open(path)?;
        let (snapshot, transactions, events) = store.load_market(market_id)?;
        let persisted_transaction_count = transactions.len();
        let persisted_event_count = events.len();
        Ok(Self {
            market: Market::restore(snapshot, transactions, events),
            persistence: Some(PersistenceState {
                store,
                persisted_transaction_count,
                persisted_event_count,
            }),
            last_persistence_error: None,
        })
    }

    pub fn flush_persistence(&mut self) -> Result<(), PersistenceError> {
        let Some(state) = self.persistence.as_mut() else {
            return Ok(());
        };
        let snapshot = self.market.snapshot();
        let transactions = &self.market.ledger().transactions()[state.persisted_transaction_count..];
        let events = &self.market.events()[state.persisted_event_count..];
        state.store.persist_delta(&snapshot, transactions, events)?;
        state.persisted_transaction_count = self.market.ledger().transactions().len();
        state.persisted_event_count = self.market.events().len();
        Ok(())
    }

    fn persist_after_operation(&mut self) {
        match self.flush_persistence() {
            Ok(()) => self.last_persistence_error = None,
            Err(err) => self.last_persistence_error = Some(err.to_string()),
        }
    }

    // ── Accounts ─────────────────────────────────────────────────────────

    pub fn register_user(&mut self, user_id: &str) -> Result<BalanceChange, MarketError> {
        let change = self.market.register_user(user_id)?;
        self.persist_after_operation();
        Ok(change)
    }

    pub fn purchase_coins(
        &mut self,
        actor: &ActorRef,
        amount: i64,
    ) -> Result<BalanceChange, MarketError> {
        let change = self.market.purchase_coins(actor, amount)?;
        self.persist_after_operation();
        Ok(change)
    }

    pub fn balance_of(&self, user_id: &str) -> Result<i64, MarketError> {
        self.market.balance_of(user_id)
    }

    pub fn transactions_for(&self, user_id: &str) -> Vec<TransactionRecord> {
        self.market.transactions_for(user_id)
    }

    pub fn notifications_for(&self, user_id: &str) -> Vec<Event> {
        self.market.notifications_for(user_id)
    }

    // ── Missions ─────────────────────────────────────────────────────────

    pub fn create_mission(
        &mut self,
        actor: &ActorRef,
        draft: MissionDraft,
    ) -> Result<(Mission, BalanceChange), MarketError> {
        let created = self.market.create_mission(actor, draft)?;
        self.persist_after_operation();
        Ok(created)
    }

    pub fn update_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
        update: MissionUpdate,
    ) -> Result<(Mission, Option<BalanceChange>), MarketError> {
        let updated = self.market.update_mission(actor, mission_id, update)?;
        self.persist_after_operation();
        Ok(updated)
    }

    pub fn assign_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
        assassin_id: &str,
    ) -> Result<Mission, MarketError> {
        let mission = self.market.assign_mission(actor, mission_id, assassin_id)?;
        self.persist_after_operation();
        Ok(mission)
    }

    pub fn accept_mission_from_notification(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
    ) -> Result<Mission, MarketError> {
        let mission = self.market.accept_mission_from_notification(actor, mission_id)?;
        self.persist_after_operation();
        Ok(mission)
    }

    pub fn complete_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
    ) -> Result<(Mission, BalanceChange), MarketError> {
        let completed = self.market.complete_mission(actor, mission_id)?;
        self.persist_after_operation();
        Ok(completed)
    }

    pub fn delete_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
    ) -> Result<(Mission, Option<BalanceChange>), MarketError> {
        let deleted = self.market.delete_mission(actor, mission_id)?;
        self.persist_after_operation();
        Ok(deleted)
    }

    // ── Negotiations ─────────────────────────────────────────────────────

    pub fn propose_negotiation(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
        proposed_reward: i64,
    ) -> Result<Negotiation, MarketError> {
        let negotiation = self
            .market
            .propose_negotiation(actor, mission_id, proposed_reward)?;
        self.persist_after_operation();
        Ok(negotiation)
    }

    pub fn accept_negotiation(
        &mut self,
        actor: &ActorRef,
        negotiation_id: &str,
    ) -> Result<(Negotiation, Mission, Option<BalanceChange>), MarketError> {
        let accepted = self.market.accept_negotiation(actor, negotiation_id)?;
        self.persist_after_operation();
        Ok(accepted)
    }

    pub fn reject_negotiation(
        &mut self,
        actor: &ActorRef,
        negotiation_id: &str,
    ) -> Result<(Negotiation, Mission), MarketError> {
        let rejected = self.market.reject_negotiation(actor, negotiation_id)?;
        self.persist_after_operation();
        Ok(rejected)
    }

    // ── Debts ────────────────────────────────────────────────────────────

    pub fn create_favor_request(
        &mut self,
        actor: &ActorRef,
        creditor_id: &str,
        favor_description: &str,
    ) -> Result<Debt, MarketError> {
        let debt = self
            .market
            .create_favor_request(actor, creditor_id, favor_description)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn accept_debt(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        let debt = self.market.accept_debt(actor, debt_id)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn reject_debt(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        let debt = self.market.reject_debt(actor, debt_id)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn request_payment(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
        payment_description: &str,
    ) -> Result<Debt, MarketError> {
        let debt = self
            .market
            .request_payment(actor, debt_id, payment_description)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn accept_payment(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        let debt = self.market.accept_payment(actor, debt_id)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn reject_payment(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
    ) -> Result<(Debt, TargetMark), MarketError> {
        let rejected = self.market.reject_payment(actor, debt_id)?;
        self.persist_after_operation();
        Ok(rejected)
    }

    pub fn mark_completed(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        let debt = self.market.mark_completed(actor, debt_id)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn confirm_completion(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
    ) -> Result<Debt, MarketError> {
        let debt = self.market.confirm_completion(actor, debt_id)?;
        self.persist_after_operation();
        Ok(debt)
    }

    pub fn reject_completion(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
    ) -> Result<Debt, MarketError> {
        let debt = self.market.reject_completion(actor, debt_id)?;
        self.persist_after_operation();
        Ok(debt)
    }
}
