use super::*;

impl Market {
    /// Opens a ledger account. The configured starting balance, if any, is
    /// granted as a `purchase` transaction.
    pub fn register_user(&mut self, user_id: &str) -> Result<BalanceChange, MarketError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(MarketError::Validation("user_id cannot be empty".to_string()));
        }
        let seq = self.next_seq();
        self.ledger.open_account(user_id)?;
        let mut balance_after = 0;
        if self.config.starting_balance > 0 {
            balance_after = self.ledger.credit(
                user_id,
                self.config.starting_balance,
                TransactionKind::Purchase,
                "starting_balance",
                seq,
            )?;
        }
        self.commit_effects(
            "register_user",
            seq,
            vec![Effect::new(
                EventType::UserRegistered,
                user_id,
                Vec::new(),
                Some(json!({ "starting_balance": self.config.starting_balance })),
            )],
        );
        Ok(BalanceChange {
            user_id: user_id.to_string(),
            delta: self.config.starting_balance,
            balance_after,
        })
    }

    /// Credits purchased coins to the caller's own account. Payment
    /// processing itself happens outside the kernel; this is the boundary
    /// where the bought amount enters the ledger.
    pub fn purchase_coins(
        &mut self,
        actor: &ActorRef,
        amount: i64,
    ) -> Result<BalanceChange, MarketError> {
        if amount <= 0 {
            return Err(MarketError::Validation(format!(
                "purchase amount must be positive, got {amount}"
            )));
        }
        let seq = self.next_seq();
        let balance_after = self.ledger.credit(
            &actor.actor_id,
            amount,
            TransactionKind::Purchase,
            "coin_purchase",
            seq,
        )?;
        self.commit_effects(
            "purchase_coins",
            seq,
            vec![Effect::new(
                EventType::CoinsPurchased,
                actor.actor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "amount": amount, "balance_after": balance_after })),
            )],
        );
        Ok(BalanceChange {
            user_id: actor.actor_id.clone(),
            delta: amount,
            balance_after,
        })
    }

    pub fn balance_of(&self, user_id: &str) -> Result<i64, MarketError> {
        Ok(self.ledger.balance(user_id)?)
    }

    pub fn transactions_for(&self, user_id: &str) -> Vec<TransactionRecord> {
        self.ledger.transactions_for(user_id)
    }
}
