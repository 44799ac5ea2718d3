use super::*;

#[derive(Debug, Clone)]
pub struct MissionDraft {
    pub title: String,
    pub description: String,
    pub reward: i64,
    pub is_private: bool,
    pub target_assassin_id: Option<String>,
}

/// Partial edit; `target_assassin_id` uses a double option so a request can
/// distinguish "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct MissionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reward: Option<i64>,
    pub is_private: Option<bool>,
    pub target_assassin_id: Option<Option<String>>,
}

impl Market {
    /// Creates a mission and escrows its reward. The debit and the insert
    /// commit as a unit: a failed debit means no mission, and the insert
    /// cannot fail once the debit succeeded.
    pub fn create_mission(
        &mut self,
        actor: &ActorRef,
        draft: MissionDraft,
    ) -> Result<(Mission, BalanceChange), MarketError> {
        if actor.role != ActorRole::Contractor {
            return Err(MarketError::Forbidden {
                operation: "create_mission",
                actor_id: actor.actor_id.clone(),
            });
        }
        if draft.title.trim().is_empty() {
            return Err(MarketError::Validation("mission title cannot be empty".to_string()));
        }
        if draft.reward <= 0 {
            return Err(MarketError::Validation(format!(
                "reward must be positive, got {}",
                draft.reward
            )));
        }
        let seq = self.next_seq();
        let mission_id = format!("mission:{seq}");
        let balance_after = self.ledger.debit(
            &actor.actor_id,
            draft.reward,
            TransactionKind::Payment,
            &format!("mission_escrow:{mission_id}"),
            seq,
        )?;
        let mission = Mission {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission_id,
            title: draft.title,
            description: draft.description,
            reward: draft.reward,
            status: MissionStatus::Open,
            contractor_id: actor.actor_id.clone(),
            assassin_id: None,
            is_private: draft.is_private,
            target_assassin_id: draft.target_assassin_id,
            created_at_seq: seq,
            updated_at_seq: seq,
        };
        self.missions.put(mission.clone());

        let mut effects = vec![Effect::new(
            EventType::MissionCreated,
            mission.contractor_id.clone(),
            vec![actor.clone()],
            Some(json!({ "mission_id": mission.mission_id, "reward": mission.reward })),
        )];
        if let Some(target) = &mission.target_assassin_id {
            effects.push(Effect::new(
                EventType::MissionCreated,
                target.clone(),
                vec![actor.clone()],
                Some(json!({ "mission_id": mission.mission_id, "reward": mission.reward })),
            ));
        }
        self.commit_effects("create_mission", seq, effects);

        let change = BalanceChange {
            user_id: actor.actor_id.clone(),
            delta: -mission.reward,
            balance_after,
        };
        Ok((mission, change))
    }

    /// Edits an open mission. A reward change re-settles the escrow by the
    /// difference before any field is written.
    pub fn update_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
        update: MissionUpdate,
    ) -> Result<(Mission, Option<BalanceChange>), MarketError> {
        let mut mission = self.require_mission(mission_id)?;
        if !auth::can_manage_mission(&mission, &actor.actor_id, actor.role) {
            return Err(MarketError::Forbidden {
                operation: "update_mission",
                actor_id: actor.actor_id.clone(),
            });
        }
        if mission.status != MissionStatus::Open {
            return Err(MarketError::InvalidState {
                entity: "mission",
                id: mission.mission_id.clone(),
                status: mission.status.as_str().to_string(),
                operation: "update_mission",
            });
        }
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(MarketError::Validation("mission title cannot be empty".to_string()));
            }
        }
        if let Some(reward) = update.reward {
            if reward <= 0 {
                return Err(MarketError::Validation(format!(
                    "reward must be positive, got {reward}"
                )));
            }
        }

        let seq = self.next_seq();
        let mut change = None;
        if let Some(new_reward) = update.reward {
            let difference = new_reward - mission.reward;
            if difference > 0 {
                let balance_after = self.ledger.debit(
                    &mission.contractor_id,
                    difference,
                    TransactionKind::Payment,
                    &format!("mission_escrow:{}", mission.mission_id),
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
                    &format!("mission_refund:{}", mission.mission_id),
                    seq,
                )?;
                change = Some(BalanceChange {
                    user_id: mission.contractor_id.clone(),
                    delta: -difference,
                    balance_after,
                });
            }
            mission.reward = new_reward;
        }
        if let Some(title) = update.title {
            mission.title = title;
        }
        if let Some(description) = update.description {
            mission.description = description;
        }
        if let Some(is_private) = update.is_private {
            mission.is_private = is_private;
        }
        if let Some(target_assassin_id) = update.target_assassin_id {
            mission.target_assassin_id = target_assassin_id;
        }
        mission.updated_at_seq = seq;
        self.missions.put(mission.clone());

        self.commit_effects(
            "update_mission",
            seq,
            vec![Effect::new(
                EventType::MissionUpdated,
                mission.contractor_id.clone(),
                vec![actor.clone()],
                Some(json!({ "mission_id": mission.mission_id, "reward": mission.reward })),
            )],
        );
        Ok((mission, change))
    }

    /// Administrative direct assignment. The reward is already in escrow, so
    /// no currency moves.
    pub fn assign_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
        assassin_id: &str,
    ) -> Result<Mission, MarketError> {
        if actor.role != ActorRole::Admin {
            return Err(MarketError::Forbidden {
                operation: "assign_mission",
                actor_id: actor.actor_id.clone(),
            });
        }
        self.require_account(assassin_id)?;
        let mission = self.require_mission(mission_id)?;
        self.place_assignment(mission, assassin_id, actor, "assign_mission")
    }

    /// An assassin claims a mission offered to them. Same transition as a
    /// direct assignment, with the caller as the assassin.
    pub fn accept_mission_from_notification(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
    ) -> Result<Mission, MarketError> {
        if actor.role != ActorRole::Assassin {
            return Err(MarketError::Forbidden {
                operation: "accept_mission",
                actor_id: actor.actor_id.clone(),
            });
        }
        self.require_account(&actor.actor_id)?;
        let mission = self.require_mission(mission_id)?;
        let assassin_id = actor.actor_id.clone();
        self.place_assignment(mission, &assassin_id, actor, "accept_mission")
    }

    fn place_assignment(
        &mut self,
        mut mission: Mission,
        assassin_id: &str,
        actor: &ActorRef,
        operation: &'static str,
    ) -> Result<Mission, MarketError> {
        match mission.status {
            MissionStatus::InProgress => {
                return Err(MarketError::AlreadyAssigned {
                    mission_id: mission.mission_id.clone(),
                    assassin_id: mission.assassin_id.clone().unwrap_or_default(),
                });
            }
            MissionStatus::Completed | MissionStatus::Cancelled => {
                return Err(MarketError::InvalidState {
                    entity: "mission",
                    id: mission.mission_id.clone(),
                    status: mission.status.as_str().to_string(),
                    operation,
                });
            }
            MissionStatus::Open | MissionStatus::Negotiating => {}
        }

        let seq = self.next_seq();
        let mut effects = Vec::new();
        // Direct assignment supersedes any open proposal on the mission.
        self.discard_pending_negotiation(&mission.mission_id, seq, &mut effects);

        mission.assassin_id = Some(assassin_id.to_string());
        mission.status = MissionStatus::InProgress;
        mission.updated_at_seq = seq;
        self.missions.put(mission.clone());

        let details = json!({ "mission_id": mission.mission_id, "assassin_id": assassin_id });
        effects.push(Effect::new(
            EventType::MissionAssigned,
            assassin_id,
            vec![actor.clone()],
            Some(details.clone()),
        ));
        if mission.contractor_id != assassin_id {
            effects.push(Effect::new(
                EventType::MissionAssigned,
                mission.contractor_id.clone(),
                vec![actor.clone()],
                Some(details),
            ));
        }
        self.commit_effects(operation, seq, effects);
        Ok(mission)
    }

    /// Releases the escrow to the assigned assassin. Terminal.
    pub fn complete_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
    ) -> Result<(Mission, BalanceChange), MarketError> {
        let mut mission = self.require_mission(mission_id)?;
        if mission.status != MissionStatus::InProgress {
            return Err(MarketError::InvalidState {
                entity: "mission",
                id: mission.mission_id.clone(),
                status: mission.status.as_str().to_string(),
                operation: "complete_mission",
            });
        }
        if !auth::can_complete_mission(&mission, &actor.actor_id) {
            return Err(MarketError::Forbidden {
                operation: "complete_mission",
                actor_id: actor.actor_id.clone(),
            });
        }

        let seq = self.next_seq();
        let balance_after = self.ledger.credit(
            &actor.actor_id,
            mission.reward,
            TransactionKind::Reward,
            &format!("mission_reward:{}", mission.mission_id),
            seq,
        )?;
        mission.status = MissionStatus::Completed;
        mission.updated_at_seq = seq;
        self.missions.put(mission.clone());

        let details = json!({ "mission_id": mission.mission_id, "reward": mission.reward });
        self.commit_effects(
            "complete_mission",
            seq,
            vec![
                Effect::new(
                    EventType::MissionCompleted,
                    mission.contractor_id.clone(),
                    vec![actor.clone()],
                    Some(details.clone()),
                ),
                Effect::new(
                    EventType::MissionCompleted,
                    actor.actor_id.clone(),
                    vec![actor.clone()],
                    Some(details),
                ),
            ],
        );
        let change = BalanceChange {
            user_id: actor.actor_id.clone(),
            delta: mission.reward,
            balance_after,
        };
        Ok((mission, change))
    }

    /// Removes a mission. A non-completed mission refunds its escrow to the
    /// contractor first; a completed one was already paid out.
    pub fn delete_mission(
        &mut self,
        actor: &ActorRef,
        mission_id: &str,
    ) -> Result<(Mission, Option<BalanceChange>), MarketError> {
        let mut mission = self.require_mission(mission_id)?;
        if !auth::can_manage_mission(&mission, &actor.actor_id, actor.role) {
            return Err(MarketError::Forbidden {
                operation: "delete_mission",
                actor_id: actor.actor_id.clone(),
            });
        }

        let seq = self.next_seq();
        let mut effects = Vec::new();
        let mut change = None;
        if mission.status != MissionStatus::Completed {
            let balance_after = self.ledger.credit(
                &mission.contractor_id,
                mission.reward,
                TransactionKind::Payment,
                &format!("mission_refund:{}", mission.mission_id),
                seq,
            )?;
            change = Some(BalanceChange {
                user_id: mission.contractor_id.clone(),
                delta: mission.reward,
                balance_after,
            });
            self.discard_pending_negotiation(&mission.mission_id, seq, &mut effects);
            mission.status = MissionStatus::Cancelled;
        }
        mission.updated_at_seq = seq;
        self.missions.remove(&mission.mission_id);

        let details = json!({ "mission_id": mission.mission_id });
        effects.push(Effect::new(
            EventType::MissionCancelled,
            mission.contractor_id.clone(),
            vec![actor.clone()],
            Some(details.clone()),
        ));
        if let Some(assassin_id) = &mission.assassin_id {
            effects.push(Effect::new(
                EventType::MissionCancelled,
                assassin_id.clone(),
                vec![actor.clone()],
                Some(details),
            ));
        }
        self.commit_effects("delete_mission", seq, effects);
        Ok((mission, change))
    }
}
