use std::fmt;
use std::path::Path;

use contracts::{Event, MarketSnapshot, TransactionRecord};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMarketSummary {
    pub market_id: String,
    pub seq: u64,
    pub account_count: usize,
    pub mission_count: usize,
    pub debt_count: usize,
}

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotAttached,
    MarketAlreadyExists(String),
    MarketNotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::NotAttached => write!(f, "sqlite store is not attached"),
            Self::MarketAlreadyExists(market_id) => {
                write!(f, "market already exists: {market_id}")
            }
            Self::MarketNotFound(market_id) => write!(f, "market not found: {market_id}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug)]
pub struct SqliteMarketStore {
    conn: Connection,
}

impl SqliteMarketStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    fn configure(&self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS markets (
                market_id TEXT PRIMARY KEY,
                schema_version TEXT NOT NULL,
                seq INTEGER NOT NULL,
                config_json TEXT NOT NULL,
                snapshot_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS accounts (
                market_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                balance INTEGER NOT NULL,
                PRIMARY KEY (market_id, user_id)
            );
            CREATE TABLE IF NOT EXISTS missions (
                market_id TEXT NOT NULL,
                mission_id TEXT NOT NULL,
                status TEXT NOT NULL,
                mission_json TEXT NOT NULL,
                PRIMARY KEY (market_id, mission_id)
            );
            CREATE TABLE IF NOT EXISTS negotiations (
                market_id TEXT NOT NULL,
                negotiation_id TEXT NOT NULL,
                status TEXT NOT NULL,
                negotiation_json TEXT NOT NULL,
                PRIMARY KEY (market_id, negotiation_id)
            );
            CREATE TABLE IF NOT EXISTS debts (
                market_id TEXT NOT NULL,
                debt_id TEXT NOT NULL,
                status TEXT NOT NULL,
                debt_json TEXT NOT NULL,
                PRIMARY KEY (market_id, debt_id)
            );
            CREATE TABLE IF NOT EXISTS targets (
                market_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                target_user_id TEXT NOT NULL,
                target_json TEXT NOT NULL,
                PRIMARY KEY (market_id, target_id)
            );
            CREATE TABLE IF NOT EXISTS transactions (
                market_id TEXT NOT NULL,
                transaction_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                transaction_json TEXT NOT NULL,
                PRIMARY KEY (market_id, transaction_id)
            );
            CREATE TABLE IF NOT EXISTS events (
                market_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                event_json TEXT NOT NULL,
                PRIMARY KEY (market_id, event_id)
            );",
        )?;
        Ok(())
    }

    pub fn market_exists(&self, market_id: &str) -> Result<bool, PersistenceError> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT market_id FROM markets WHERE market_id = ?1",
                params![market_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_market(&mut self, market_id: &str) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        for table in [
            "markets",
            "accounts",
            "missions",
            "negotiations",
            "debts",
            "targets",
            "transactions",
            "events",
        ] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE market_id = ?1"),
                params![market_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Writes one operation's worth of changes atomically: the current
    /// snapshot replaces the entity tables, while transactions and events
    /// are append-only.
    pub fn persist_delta(
        &mut self,
        snapshot: &MarketSnapshot,
        new_transactions: &[TransactionRecord],
        new_events: &[Event],
    ) -> Result<(), PersistenceError> {
        let market_id = snapshot.market_id.as_str();
        let config_json = serde_json::to_string(&snapshot.config)?;
        let snapshot_json = serde_json::to_string(snapshot)?;

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO markets (market_id, schema_version, seq, config_json, snapshot_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(market_id) DO UPDATE SET
                seq = excluded.seq,
                config_json = excluded.config_json,
                snapshot_json = excluded.snapshot_json",
            params![
                market_id,
                snapshot.schema_version,
                snapshot.seq as i64,
                config_json,
                snapshot_json
            ],
        )?;

        for table in ["accounts", "missions", "negotiations", "debts", "targets"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE market_id = ?1"),
                params![market_id],
            )?;
        }

        for (user_id, balance) in &snapshot.accounts {
            tx.execute(
                "INSERT INTO accounts (market_id, user_id, balance) VALUES (?1, ?2, ?3)",
                params![market_id, user_id, balance],
            )?;
        }
        for mission in &snapshot.missions {
            tx.execute(
                "INSERT INTO missions (market_id, mission_id, status, mission_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    market_id,
                    mission.mission_id,
                    mission.status.as_str(),
                    serde_json::to_string(mission)?
                ],
            )?;
        }
        for negotiation in &snapshot.negotiations {
            tx.execute(
                "INSERT INTO negotiations (market_id, negotiation_id, status, negotiation_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    market_id,
                    negotiation.negotiation_id,
                    negotiation.status.as_str(),
                    serde_json::to_string(negotiation)?
                ],
            )?;
        }
        for debt in &snapshot.debts {
            tx.execute(
                "INSERT INTO debts (market_id, debt_id, status, debt_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    market_id,
                    debt.debt_id,
                    debt.status.as_str(),
                    serde_json::to_string(debt)?
                ],
            )?;
        }
        for target in &snapshot.targets {
            tx.execute(
                "INSERT INTO targets (market_id, target_id, target_user_id, target_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    market_id,
                    target.target_id,
                    target.target_user_id,
                    serde_json::to_string(target)?
                ],
            )?;
        }

        for record in new_transactions {
            tx.execute(
                "INSERT OR REPLACE INTO transactions
                 (market_id, transaction_id, user_id, amount, transaction_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    market_id,
                    record.transaction_id,
                    record.user_id,
                    record.amount,
                    serde_json::to_string(record)?
                ],
            )?;
        }
        for event in new_events {
            tx.execute(
                "INSERT OR REPLACE INTO events
                 (market_id, event_id, recipient_id, event_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    market_id,
                    event.event_id,
                    event.recipient_id,
                    serde_json::to_string(event)?
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Loads a market's snapshot plus its full append-only logs, in insert
    /// order.
    pub fn load_market(
        &self,
        market_id: &str,
    ) -> Result<(MarketSnapshot, Vec<TransactionRecord>, Vec<Event>), PersistenceError> {
        let snapshot_json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot_json FROM markets WHERE market_id = ?1",
                params![market_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(snapshot_json) = snapshot_json else {
            return Err(PersistenceError::MarketNotFound(market_id.to_string()));
        };
        let snapshot: MarketSnapshot = serde_json::from_str(&snapshot_json)?;

        let mut transactions = Vec::new();
        let mut statement = self.conn.prepare(
            "SELECT transaction_json FROM transactions WHERE market_id = ?1 ORDER BY rowid",
        )?;
        let rows = statement.query_map(params![market_id], |row| row.get::<_, String>(0))?;
        for row in rows {
            transactions.push(serde_json::from_str(&row?)?);
        }

        let mut events = Vec::new();
        let mut statement = self
            .conn
            .prepare("SELECT event_json FROM events WHERE market_id = ?1 ORDER BY rowid")?;
        let rows = statement.query_map(params![market_id], |row| row.get::<_, String>(0))?;
        for row in rows {
            events.push(serde_json::from_str(&row?)?);
        }

        Ok((snapshot, transactions, events))
    }

    pub fn list_markets(
        &self,
        limit: usize,
    ) -> Result<Vec<PersistedMarketSummary>, PersistenceError> {
        let mut statement = self.conn.prepare(
            "SELECT market_id, seq,
                (SELECT COUNT(*) FROM accounts WHERE accounts.market_id = markets.market_id),
                (SELECT COUNT(*) FROM missions WHERE missions.market_id = markets.market_id),
                (SELECT COUNT(*) FROM debts WHERE debts.market_id = markets.market_id)
             FROM markets ORDER BY market_id LIMIT ?1",
        )?;
        let rows = statement.query_map(params![limit as i64], |row| {
            Ok(PersistedMarketSummary {
                market_id: row.get(0)?,
                seq: row.get::<_, i64>(1)? as u64,
                account_count: row.get::<_, i64>(2)? as usize,
                mission_count: row.get::<_, i64>(3)? as usize,
                debt_count: row.get::<_, i64>(4)? as usize,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ActorRef, ActorRole, MarketConfig};
    use guild_core::{Market, MissionDraft};

    fn populated_market() -> Market {
        let mut market = Market::new(MarketConfig::default());
        market.register_user("carla").expect("register");
        market.register_user("vex").expect("register");
        let carla = ActorRef::new("carla", ActorRole::Contractor);
        market.purchase_coins(&carla, 500).expect("fund");
        market
            .create_mission(
                &carla,
                MissionDraft {
                    title: "quiet work".to_string(),
                    description: String::new(),
                    reward: 200,
                    is_private: false,
                    target_assassin_id: None,
                },
            )
            .expect("create");
        market
    }

    #[test]
    fn persist_and_load_round_trip() {
        let market = populated_market();
        let mut store = SqliteMarketStore::open_in_memory().expect("open");
        store
            .persist_delta(
                &market.snapshot(),
                market.ledger().transactions(),
                market.events(),
            )
            .expect("persist");

        let (snapshot, transactions, events) = store
            .load_market(&market.config.market_id)
            .expect("load");
        assert_eq!(snapshot, market.snapshot());
        assert_eq!(transactions, market.ledger().transactions().to_vec());
        assert_eq!(events, market.events().to_vec());

        let restored = Market::restore(snapshot, transactions, events);
        assert_eq!(restored.balance_of("carla").expect("balance"), 300);
        assert_eq!(restored.list_missions().len(), 1);
    }

    #[test]
    fn load_of_unknown_market_is_an_error() {
        let store = SqliteMarketStore::open_in_memory().expect("open");
        let err = store.load_market("ghost").expect_err("missing");
        assert!(matches!(err, PersistenceError::MarketNotFound(_)));
    }

    #[test]
    fn delete_market_clears_every_table() {
        let market = populated_market();
        let mut store = SqliteMarketStore::open_in_memory().expect("open");
        store
            .persist_delta(
                &market.snapshot(),
                market.ledger().transactions(),
                market.events(),
            )
            .expect("persist");
        assert!(store.market_exists(&market.config.market_id).expect("exists"));

        store
            .delete_market(&market.config.market_id)
            .expect("delete");
        assert!(!store.market_exists(&market.config.market_id).expect("exists"));
        assert!(store.list_markets(10).expect("list").is_empty());
    }

    #[test]
    fn summaries_report_entity_counts() {
        let market = populated_market();
        let mut store = SqliteMarketStore::open_in_memory().expect("open");
        store
            .persist_delta(
                &market.snapshot(),
                market.ledger().transactions(),
                market.events(),
            )
            .expect("persist");

        let summaries = store.list_markets(10).expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].market_id, market.config.market_id);
        assert_eq!(summaries[0].account_count, 2);
        assert_eq!(summaries[0].mission_count, 1);
    }
}
