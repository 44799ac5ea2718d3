use super::*;

impl Market {
    /// A prospective debtor asks another user to do them a favor on credit.
    pub fn create_favor_request(
        &mut self,
        actor: &ActorRef,
        creditor_id: &str,
        favor_description: &str,
    ) -> Result<Debt, MarketError> {
        if favor_description.trim().is_empty() {
            return Err(MarketError::Validation(
                "favor description cannot be empty".to_string(),
            ));
        }
        if actor.actor_id == creditor_id {
            return Err(MarketError::Validation("cannot owe a favor to yourself".to_string()));
        }
        self.require_account(&actor.actor_id)?;
        self.require_account(creditor_id)?;

        let seq = self.next_seq();
        let debt = Debt {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt_id: format!("debt:{seq}"),
            debtor_id: actor.actor_id.clone(),
            creditor_id: creditor_id.to_string(),
            favor_description: favor_description.to_string(),
            payment_description: None,
            status: DebtStatus::Pending,
            created_at_seq: seq,
            updated_at_seq: seq,
        };
        self.debts.put(debt.clone());
        self.commit_effects(
            "create_favor_request",
            seq,
            vec![Effect::new(
                EventType::DebtRequested,
                creditor_id,
                vec![actor.clone()],
                Some(json!({ "debt_id": debt.debt_id })),
            )],
        );
        Ok(debt)
    }

    pub fn accept_debt(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        self.resolve_debt_request(actor, debt_id, true)
    }

    pub fn reject_debt(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        self.resolve_debt_request(actor, debt_id, false)
    }

    fn resolve_debt_request(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
        accept: bool,
    ) -> Result<Debt, MarketError> {
        let operation = if accept { "accept_debt" } else { "reject_debt" };
        let mut debt = self.require_debt(debt_id)?;
        self.require_creditor(&debt, actor, operation)?;
        self.require_debt_status(&debt, DebtStatus::Pending, operation)?;

        let seq = self.next_seq();
        debt.status = if accept { DebtStatus::Active } else { DebtStatus::Rejected };
        debt.updated_at_seq = seq;
        self.debts.put(debt.clone());

        let event_type = if accept { EventType::DebtAccepted } else { EventType::DebtRejected };
        self.commit_effects(
            operation,
            seq,
            vec![Effect::new(
                event_type,
                debt.debtor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "debt_id": debt.debt_id })),
            )],
        );
        Ok(debt)
    }

    /// The creditor calls the favor in, attaching what they want done.
    pub fn request_payment(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
        payment_description: &str,
    ) -> Result<Debt, MarketError> {
        if payment_description.trim().is_empty() {
            return Err(MarketError::Validation(
                "payment description cannot be empty".to_string(),
            ));
        }
        let mut debt = self.require_debt(debt_id)?;
        self.require_creditor(&debt, actor, "request_payment")?;
        self.require_debt_status(&debt, DebtStatus::Active, "request_payment")?;

        let seq = self.next_seq();
        debt.payment_description = Some(payment_description.to_string());
        debt.status = DebtStatus::PaymentRequested;
        debt.updated_at_seq = seq;
        self.debts.put(debt.clone());

        self.commit_effects(
            "request_payment",
            seq,
            vec![Effect::new(
                EventType::PaymentRequested,
                debt.debtor_id.clone(),
                vec![actor.clone()],
                Some(json!({
                    "debt_id": debt.debt_id,
                    "payment_description": payment_description,
                })),
            )],
        );
        Ok(debt)
    }

    /// The debtor agrees to do the requested repayment work.
    pub fn accept_payment(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        let mut debt = self.require_debt(debt_id)?;
        self.require_debtor(&debt, actor, "accept_payment")?;
        self.require_debt_status(&debt, DebtStatus::PaymentRequested, "accept_payment")?;

        let seq = self.next_seq();
        debt.status = DebtStatus::InProgress;
        debt.updated_at_seq = seq;
        self.debts.put(debt.clone());

        self.commit_effects(
            "accept_payment",
            seq,
            vec![Effect::new(
                EventType::PaymentAccepted,
                debt.creditor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "debt_id": debt.debt_id })),
            )],
        );
        Ok(debt)
    }

    /// The debtor refuses the payment request. The debt stays where it is;
    /// the refusal marks the debtor as a target. Repeat refusals append
    /// further markings.
    pub fn reject_payment(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
    ) -> Result<(Debt, TargetMark), MarketError> {
        let debt = self.require_debt(debt_id)?;
        self.require_debtor(&debt, actor, "reject_payment")?;
        self.require_debt_status(&debt, DebtStatus::PaymentRequested, "reject_payment")?;

        let seq = self.next_seq();
        let mark = TargetMark {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            target_id: format!("target:{seq}"),
            target_user_id: debt.debtor_id.clone(),
            debt_id: debt.debt_id.clone(),
            reason: debt
                .payment_description
                .clone()
                .unwrap_or_else(|| "payment request rejected".to_string()),
            marked_at_seq: seq,
        };
        self.targets.append(mark.clone());

        self.commit_effects(
            "reject_payment",
            seq,
            vec![
                Effect::new(
                    EventType::PaymentRejected,
                    debt.creditor_id.clone(),
                    vec![actor.clone()],
                    Some(json!({ "debt_id": debt.debt_id })),
                ),
                Effect::new(
                    EventType::TargetMarked,
                    debt.debtor_id.clone(),
                    vec![actor.clone()],
                    Some(json!({ "target_id": mark.target_id, "debt_id": debt.debt_id })),
                ),
            ],
        );
        Ok((debt, mark))
    }

    /// The debtor claims the repayment work is done. Pure notification; the
    /// status only moves when the creditor confirms.
    pub fn mark_completed(&mut self, actor: &ActorRef, debt_id: &str) -> Result<Debt, MarketError> {
        let debt = self.require_debt(debt_id)?;
        self.require_debtor(&debt, actor, "mark_completed")?;
        self.require_debt_status(&debt, DebtStatus::InProgress, "mark_completed")?;

        let seq = self.next_seq();
        self.commit_effects(
            "mark_completed",
            seq,
            vec![Effect::new(
                EventType::CompletionClaimed,
                debt.creditor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "debt_id": debt.debt_id })),
            )],
        );
        Ok(debt)
    }

    pub fn confirm_completion(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
    ) -> Result<Debt, MarketError> {
        let mut debt = self.require_debt(debt_id)?;
        self.require_creditor(&debt, actor, "confirm_completion")?;
        self.require_debt_status(&debt, DebtStatus::InProgress, "confirm_completion")?;

        let seq = self.next_seq();
        debt.status = DebtStatus::Completed;
        debt.updated_at_seq = seq;
        self.debts.put(debt.clone());

        self.commit_effects(
            "confirm_completion",
            seq,
            vec![Effect::new(
                EventType::CompletionConfirmed,
                debt.debtor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "debt_id": debt.debt_id })),
            )],
        );
        Ok(debt)
    }

    /// The creditor disputes the completion claim; the debt remains in
    /// progress.
    pub fn reject_completion(
        &mut self,
        actor: &ActorRef,
        debt_id: &str,
    ) -> Result<Debt, MarketError> {
        let debt = self.require_debt(debt_id)?;
        self.require_creditor(&debt, actor, "reject_completion")?;
        self.require_debt_status(&debt, DebtStatus::InProgress, "reject_completion")?;

        let seq = self.next_seq();
        self.commit_effects(
            "reject_completion",
            seq,
            vec![Effect::new(
                EventType::CompletionRejected,
                debt.debtor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "debt_id": debt.debt_id })),
            )],
        );
        Ok(debt)
    }

    fn require_creditor(
        &self,
        debt: &Debt,
        actor: &ActorRef,
        operation: &'static str,
    ) -> Result<(), MarketError> {
        if auth::is_creditor(debt, &actor.actor_id) {
            Ok(())
        } else {
            Err(MarketError::Forbidden {
                operation,
                actor_id: actor.actor_id.clone(),
            })
        }
    }

    fn require_debtor(
        &self,
        debt: &Debt,
        actor: &ActorRef,
        operation: &'static str,
    ) -> Result<(), MarketError> {
        if auth::is_debtor(debt, &actor.actor_id) {
            Ok(())
        } else {
            Err(MarketError::Forbidden {
                operation,
                actor_id: actor.actor_id.clone(),
            })
        }
    }

    fn require_debt_status(
        &self,
        debt: &Debt,
        expected: DebtStatus,
        operation: &'static str,
    ) -> Result<(), MarketError> {
        if debt.status == expected {
            Ok(())
        } else {
            Err(MarketError::InvalidState {
                entity: "debt",
                id: debt.debt_id.clone(),
                status: debt.status.as_str().to_string(),
                operation,
            })
        }
    }
}
