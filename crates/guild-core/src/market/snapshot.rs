use super::*;

impl Market {
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            market_id: self.config.market_id.clone(),
            seq: self.seq,
            config: self.config.clone(),
            accounts: self.ledger.accounts().clone(),
            missions: self.missions.list(),
            negotiations: self.negotiations.list(),
            debts: self.debts.list(),
            targets: self.targets.list(),
        }
    }

    /// Rebuilds a kernel from a snapshot plus the append-only logs persisted
    /// alongside it.
    pub fn restore(
        snapshot: MarketSnapshot,
        transactions: Vec<TransactionRecord>,
        events: Vec<Event>,
    ) -> Self {
        let mut market = Market::new(snapshot.config.clone());
        market.seq = snapshot.seq;
        market.ledger = Ledger::restore(snapshot.accounts, transactions);
        for mission in snapshot.missions {
            market.missions.put(mission);
        }
        for negotiation in snapshot.negotiations {
            market.negotiations.put(negotiation);
        }
        for debt in snapshot.debts {
            market.debts.put(debt);
        }
        for target in snapshot.targets {
            market.targets.append(target);
        }
        market.event_log = events;
        market
    }
}
