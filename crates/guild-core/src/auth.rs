//! Authorization predicates, one per operation family. Each takes the
//! entity plus the caller's identity and role and answers allowed/denied,
//! keeping role dispatch out of the lifecycle code.

use contracts::{ActorRole, Debt, Mission, Negotiation, NegotiationParty};

/// Edit and delete: the owning contractor or an administrator.
pub fn can_manage_mission(mission: &Mission, actor_id: &str, role: ActorRole) -> bool {
    role == ActorRole::Admin || mission.contractor_id == actor_id
}

/// Completion: only the assigned assassin.
pub fn can_complete_mission(mission: &Mission, actor_id: &str) -> bool {
    mission.assassin_id.as_deref() == Some(actor_id)
}

/// Proposal: the owning contractor, or any assassin bidding on the mission.
pub fn can_propose_negotiation(mission: &Mission, actor_id: &str, role: ActorRole) -> bool {
    mission.contractor_id == actor_id || role == ActorRole::Assassin
}

/// Resolution: the counter-party. The proposer may never resolve their own
/// proposal. An assassin proposal is resolved by the mission's contractor;
/// a contractor proposal by an assassin (the assigned one, if any).
pub fn can_resolve_negotiation(
    mission: &Mission,
    negotiation: &Negotiation,
    actor_id: &str,
    role: ActorRole,
) -> bool {
    if negotiation.proposed_by_id == actor_id {
        return false;
    }
    match negotiation.proposed_by {
        NegotiationParty::Assassin => mission.contractor_id == actor_id,
        NegotiationParty::Contractor => {
            role == ActorRole::Assassin
                && mission
                    .assassin_id
                    .as_deref()
                    .map(|assigned| assigned == actor_id)
                    .unwrap_or(true)
        }
    }
}

pub fn is_creditor(debt: &Debt, actor_id: &str) -> bool {
    debt.creditor_id == actor_id
}

pub fn is_debtor(debt: &Debt, actor_id: &str) -> bool {
    debt.debtor_id == actor_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        DebtStatus, MissionStatus, NegotiationStatus, SCHEMA_VERSION_V1,
    };

    fn mission(contractor: &str, assassin: Option<&str>) -> Mission {
        Mission {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            mission_id: "mission:1".to_string(),
            title: "t".to_string(),
            description: String::new(),
            reward: 100,
            status: MissionStatus::Open,
            contractor_id: contractor.to_string(),
            assassin_id: assassin.map(str::to_string),
            is_private: false,
            target_assassin_id: None,
            created_at_seq: 1,
            updated_at_seq: 1,
        }
    }

    fn negotiation(proposed_by: NegotiationParty, proposer: &str) -> Negotiation {
        Negotiation {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            negotiation_id: "neg:1".to_string(),
            mission_id: "mission:1".to_string(),
            proposed_by,
            proposed_by_id: proposer.to_string(),
            proposed_reward: 150,
            status: NegotiationStatus::Pending,
            created_at_seq: 2,
            resolved_at_seq: None,
        }
    }

    fn debt(debtor: &str, creditor: &str) -> Debt {
        Debt {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            debt_id: "debt:1".to_string(),
            debtor_id: debtor.to_string(),
            creditor_id: creditor.to_string(),
            favor_description: "a favor".to_string(),
            payment_description: None,
            status: DebtStatus::Pending,
            created_at_seq: 1,
            updated_at_seq: 1,
        }
    }

    #[test]
    fn owner_and_admin_manage_missions() {
        let m = mission("carla", None);
        assert!(can_manage_mission(&m, "carla", ActorRole::Contractor));
        assert!(can_manage_mission(&m, "ops", ActorRole::Admin));
        assert!(!can_manage_mission(&m, "vex", ActorRole::Assassin));
        assert!(!can_manage_mission(&m, "other", ActorRole::Contractor));
    }

    #[test]
    fn only_assigned_assassin_completes() {
        let m = mission("carla", Some("vex"));
        assert!(can_complete_mission(&m, "vex"));
        assert!(!can_complete_mission(&m, "carla"));
        assert!(!can_complete_mission(&mission("carla", None), "vex"));
    }

    #[test]
    fn proposer_never_resolves_own_proposal() {
        let m = mission("carla", None);
        let n = negotiation(NegotiationParty::Assassin, "vex");
        assert!(!can_resolve_negotiation(&m, &n, "vex", ActorRole::Assassin));
        assert!(can_resolve_negotiation(&m, &n, "carla", ActorRole::Contractor));
    }

    #[test]
    fn contractor_proposal_is_resolved_by_assassin_side() {
        let unassigned = mission("carla", None);
        let n = negotiation(NegotiationParty::Contractor, "carla");
        assert!(can_resolve_negotiation(&unassigned, &n, "vex", ActorRole::Assassin));
        assert!(!can_resolve_negotiation(&unassigned, &n, "carla", ActorRole::Contractor));

        let assigned = mission("carla", Some("vex"));
        assert!(can_resolve_negotiation(&assigned, &n, "vex", ActorRole::Assassin));
        assert!(!can_resolve_negotiation(&assigned, &n, "moth", ActorRole::Assassin));
    }

    #[test]
    fn debt_party_predicates() {
        let d = debt("dan", "cora");
        assert!(is_debtor(&d, "dan"));
        assert!(!is_debtor(&d, "cora"));
        assert!(is_creditor(&d, "cora"));
        assert!(!is_creditor(&d, "dan"));
    }
}
