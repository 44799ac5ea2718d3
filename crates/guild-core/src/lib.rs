//! Marketplace kernel: ledger, authorization predicates, per-entity
//! repositories, and the mission, negotiation, and debt lifecycles.

pub mod auth;
pub mod ledger;
pub mod market;
pub mod store;

pub use ledger::{Ledger, LedgerError};
pub use market::{Market, MarketError, MissionDraft, MissionUpdate};
