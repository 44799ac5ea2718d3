use super::*;

impl Market {
    /// Opens a counter-proposal on a mission's reward. At most one pending
    /// negotiation may exist per mission.
    pub fn propose_negotiation(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
        proposed_reward: i64,
    ) -> Result<Negotiation, MarketError> {
        let mut mission = self.require_mission(mission_id)?;
        if !matches!(mission.status, MissionStatus::Open | MissionStatus::Negotiating) {
            return Err(MarketError::InvalidState {
                entity: "mission",
                id: mission.mission_id.clone(),
                status: mission.status.as_str().to_string(),
                operation: "propose_negotiation",
            });
        }
        if proposed_reward <= 0 {
            return Err(MarketError::Validation(format!(
                "proposed reward must be positive, got {proposed_reward}"
            )));
        }
        if !auth::can_propose_negotiation(&mission, &actor.actor_id, actor.role) {
            return Err(MarketError::Forbidden {
                operation: "propose_negotiation",
                actor_id: actor.actor_id.clone(),
            });
        }
        if let Some(pending) = self.negotiations.pending_for_mission(&mission.mission_id) {
            return Err(MarketError::Conflict(format!(
                "negotiation {} is already pending for mission {}",
                pending.negotiation_id, mission.mission_id
            )));
        }

        let proposed_by = if actor.actor_id == mission.contractor_id {
            NegotiationParty::Contractor
        } else {
            NegotiationParty::Assassin
        };
        let seq = self.next_seq();
        let negotiation = Negotiation {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            negotiation_id: format!("neg:{seq}"),
            mission_id: mission.mission_id.clone(),
            proposed_by,
            proposed_by_id: actor.actor_id.clone(),
            proposed_reward,
            status: NegotiationStatus::Pending,
            created_at_seq: seq,
            resolved_at_seq: None,
        };
        self.negotiations.put(negotiation.clone());
        if mission.status == MissionStatus::Open {
            mission.status = MissionStatus::Negotiating;
            mission.updated_at_seq = seq;
            self.missions.put(mission.clone());
        }

        let details = json!({
            "negotiation_id": negotiation.negotiation_id,
            "mission_id": mission.mission_id,
            "proposed_reward": proposed_reward,
        });
        let mut effects = Vec::new();
        if let Some(counterparty) = counterparty_of(&mission, &negotiation) {
            effects.push(Effect::new(
                EventType::NegotiationProposed,
                counterparty,
                vec![actor.clone()],
                Some(details),
            ));
        }
        self.commit_effects("propose_negotiation", seq, effects);
        Ok(negotiation)
    }

    /// Acceptance by the counter-party. The contractor settles the reward
    /// difference with the ledger before any state is written: a positive
    /// difference is an additional escrow debit, a negative one a refund of
    /// the surplus.
    pub fn accept_negotiation(
        &mut self,
        actor: &ActorRef,
        negotiation_id: &str,
    ) -> Result<(Negotiation, Mission, Option<BalanceChange>), MarketError> {
        let mut negotiation = self.require_negotiation(negotiation_id)?;
        if negotiation.status != NegotiationStatus::Pending {
            return Err(MarketError::InvalidState {
                entity: "negotiation",
                id: negotiation.negotiation_id.clone(),
                status: negotiation.status.as_str().to_string(),
                operation: "accept_negotiation",
            });
        }
        let mut mission = self.require_mission(&negotiation.mission_id)?;
        if !auth::can_resolve_negotiation(&mission, &negotiation, &actor.actor_id, actor.role) {
            return Err(MarketError::Forbidden {
                operation: "accept_negotiation",
                actor_id: actor.actor_id.clone(),
            });
        }
        if mission.status != MissionStatus::Negotiating {
            return Err(MarketError::InvalidState {
                entity: "mission",
                id: mission.mission_id.clone(),
                status: mission.status.as_str().to_string(),
                operation: "accept_negotiation",
            });
        }

        let seq = self.next_seq();
        let difference = negotiation.proposed_reward - mission.reward;
        let mut change = None;
        if difference > 0 {
            let balance_after = self.ledger.debit(
                &mission.contractor_id,
                difference,
                TransactionKind::Payment,
                &format!("negotiation_delta:{}", negotiation.negotiation_id),
                seq,
            )?;
            change = Some(BalanceChange {
                user_id: mission.contractor_id.clone(),
                delta: -difference,
                balance_after,
            });
        } else if difference < 0 {
            let balance_after = self.ledger.credit(
                &mission.contractor_id,
                -difference,
                TransactionKind::Payment,
                &format!("negotiation_delta:{}", negotiation.negotiation_id),
                seq,
            )?;
            change = Some(BalanceChange {
                user_id: mission.contractor_id.clone(),
                delta: -difference,
                balance_after,
            });
        }

        mission.reward = negotiation.proposed_reward;
        mission.status = MissionStatus::InProgress;
        let newly_assigned = match negotiation.proposed_by {
            NegotiationParty::Assassin => {
                let previous = mission.assassin_id.replace(negotiation.proposed_by_id.clone());
                previous.as_deref() != mission.assassin_id.as_deref()
            }
            NegotiationParty::Contractor => {
                if mission.assassin_id.is_none() {
                    mission.assassin_id = Some(actor.actor_id.clone());
                    true
                } else {
                    false
                }
            }
        };
        mission.updated_at_seq = seq;
        self.missions.put(mission.clone());

        negotiation.status = NegotiationStatus::Accepted;
        negotiation.resolved_at_seq = Some(seq);
        self.negotiations.put(negotiation.clone());

        let details = json!({
            "negotiation_id": negotiation.negotiation_id,
            "mission_id": mission.mission_id,
            "reward": mission.reward,
        });
        let mut effects = vec![Effect::new(
            EventType::NegotiationAccepted,
            negotiation.proposed_by_id.clone(),
            vec![actor.clone()],
            Some(details),
        )];
        if newly_assigned {
            if let Some(assassin_id) = &mission.assassin_id {
                effects.push(Effect::new(
                    EventType::MissionAssigned,
                    assassin_id.clone(),
                    vec![actor.clone()],
                    Some(json!({
                        "mission_id": mission.mission_id,
                        "assassin_id": assassin_id,
                    })),
                ));
            }
        }
        self.commit_effects("accept_negotiation", seq, effects);
        Ok((negotiation, mission, change))
    }

    /// Rejection by the counter-party. The mission reverts to open; no
    /// currency moves.
    pub fn reject_negotiation(
        &mut self,
        actor: &ActorRef,
        negotiation_id: &str,
    ) -> Result<(Negotiation, Mission), MarketError> {
        let mut negotiation = self.require_negotiation(negotiation_id)?;
        if negotiation.status != NegotiationStatus::Pending {
            return Err(MarketError::InvalidState {
                entity: "negotiation",
                id: negotiation.negotiation_id.clone(),
                status: negotiation.status.as_str().to_string(),
                operation: "reject_negotiation",
            });
        }
        let mut mission = self.require_mission(&negotiation.mission_id)?;
        if !auth::can_resolve_negotiation(&mission, &negotiation, &actor.actor_id, actor.role) {
            return Err(MarketError::Forbidden {
                operation: "reject_negotiation",
                actor_id: actor.actor_id.clone(),
            });
        }

        let seq = self.next_seq();
        negotiation.status = NegotiationStatus::Rejected;
        negotiation.resolved_at_seq = Some(seq);
        self.negotiations.put(negotiation.clone());
        if mission.status == MissionStatus::Negotiating {
            mission.status = MissionStatus::Open;
            mission.updated_at_seq = seq;
            self.missions.put(mission.clone());
        }

        self.commit_effects(
            "reject_negotiation",
            seq,
            vec![Effect::new(
                EventType::NegotiationRejected,
                negotiation.proposed_by_id.clone(),
                vec![actor.clone()],
                Some(json!({
                    "negotiation_id": negotiation.negotiation_id,
                    "mission_id": mission.mission_id,
                })),
            )],
        );
        Ok((negotiation, mission))
    }

    /// Marks the pending negotiation for a mission rejected, if one exists.
    /// Used when an assignment or deletion makes the open proposal moot.
    pub(super) fn discard_pending_negotiation(
        &mut self,
        mission_id: &str,
        seq: u64,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(mut pending) = self.negotiations.pending_for_mission(mission_id) {
            pending.status = NegotiationStatus::Rejected;
            pending.resolved_at_seq = Some(seq);
            effects.push(Effect::new(
                EventType::NegotiationRejected,
                pending.proposed_by_id.clone(),
                Vec::new(),
                Some(json!({
                    "negotiation_id": pending.negotiation_id,
                    "mission_id": mission_id,
                })),
            ));
            self.negotiations.put(pending);
        }
    }
}

/// The party expected to resolve a proposal: the contractor for an assassin
/// proposal, the known assassin side for a contractor proposal.
fn counterparty_of(mission: &Mission, negotiation: &Negotiation) -> Option<String> {
    match negotiation.proposed_by {
        NegotiationParty::Assassin => Some(mission.contractor_id.clone()),
        NegotiationParty::Contractor => mission
            .assassin_id
            .clone()
            .or_else(|| mission.target_assassin_id.clone()),
    }
}
