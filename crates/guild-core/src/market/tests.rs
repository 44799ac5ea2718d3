use super::*;

fn contractor(id: &str) -> ActorRef {
    ActorRef::new(id, ActorRole::Contractor)
}

fn assassin(id: &str) -> ActorRef {
    ActorRef::new(id, ActorRole::Assassin)
}

fn admin(id: &str) -> ActorRef {
    ActorRef::new(id, ActorRole::Admin)
}

fn market_with_users(users: &[(&str, i64)]) -> Market {
    let mut market = Market::new(MarketConfig::default());
    for (user_id, coins) in users {
        market.register_user(user_id).expect("register");
        if *coins > 0 {
            market
                .purchase_coins(&contractor(user_id), *coins)
                .expect("fund");
        }
    }
    market
}

fn draft(title: &str, reward: i64) -> MissionDraft {
    MissionDraft {
        title: title.to_string(),
        description: String::new(),
        reward,
        is_private: false,
        target_assassin_id: None,
    }
}

#[test]
fn creating_a_mission_escrows_the_reward() {
    let mut market = market_with_users(&[("carla", 500)]);
    let (mission, change) = market
        .create_mission(&contractor("carla"), draft("job", 200))
        .expect("create");
    assert_eq!(mission.status, MissionStatus::Open);
    assert_eq!(change.delta, -200);
    assert_eq!(change.balance_after, 300);
    assert_eq!(market.balance_of("carla").expect("balance"), 300);
    assert_eq!(market.escrowed_coins(), 200);
}

#[test]
fn failed_escrow_creates_nothing() {
    let mut market = market_with_users(&[("carla", 100)]);
    let before_events = market.events().len();
    let err = market
        .create_mission(&contractor("carla"), draft("job", 200))
        .expect_err("insufficient");
    assert!(matches!(err, MarketError::InsufficientFunds { .. }));
    assert_eq!(market.balance_of("carla").expect("balance"), 100);
    assert!(market.list_missions().is_empty());
    assert_eq!(market.events().len(), before_events);
}

#[test]
fn non_positive_reward_is_rejected() {
    let mut market = market_with_users(&[("carla", 100)]);
    for reward in [0, -50] {
        let err = market
            .create_mission(&contractor("carla"), draft("job", reward))
            .expect_err("validation");
        assert!(matches!(err, MarketError::Validation(_)));
    }
}

#[test]
fn completion_releases_escrow_to_the_assassin() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 200))
        .expect("create");
    market
        .accept_mission_from_notification(&assassin("vex"), &mission.mission_id)
        .expect("accept");
    let (done, change) = market
        .complete_mission(&assassin("vex"), &mission.mission_id)
        .expect("complete");
    assert_eq!(done.status, MissionStatus::Completed);
    assert_eq!(change.delta, 200);
    assert_eq!(market.balance_of("vex").expect("balance"), 200);
    assert_eq!(market.escrowed_coins(), 0);
}

#[test]
fn only_the_assigned_assassin_completes() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0), ("moth", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 200))
        .expect("create");
    market
        .accept_mission_from_notification(&assassin("vex"), &mission.mission_id)
        .expect("accept");
    let err = market
        .complete_mission(&assassin("moth"), &mission.mission_id)
        .expect_err("forbidden");
    assert!(matches!(err, MarketError::Forbidden { .. }));
}

#[test]
fn delete_refunds_unless_completed() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0)]);

    let (open_mission, _) = market
        .create_mission(&contractor("carla"), draft("refund me", 100))
        .expect("create");
    let (removed, change) = market
        .delete_mission(&contractor("carla"), &open_mission.mission_id)
        .expect("delete");
    assert_eq!(removed.status, MissionStatus::Cancelled);
    assert_eq!(change.expect("refund").delta, 100);
    assert_eq!(market.balance_of("carla").expect("balance"), 500);

    let (paid_mission, _) = market
        .create_mission(&contractor("carla"), draft("pay out", 150))
        .expect("create");
    market
        .accept_mission_from_notification(&assassin("vex"), &paid_mission.mission_id)
        .expect("accept");
    market
        .complete_mission(&assassin("vex"), &paid_mission.mission_id)
        .expect("complete");
    let (removed, change) = market
        .delete_mission(&contractor("carla"), &paid_mission.mission_id)
        .expect("delete completed");
    assert_eq!(removed.status, MissionStatus::Completed);
    assert!(change.is_none());
    assert_eq!(market.balance_of("carla").expect("balance"), 350);
    assert_eq!(market.balance_of("vex").expect("balance"), 150);
}

#[test]
fn delete_requires_owner_or_admin() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let err = market
        .delete_mission(&assassin("vex"), &mission.mission_id)
        .expect_err("forbidden");
    assert!(matches!(err, MarketError::Forbidden { .. }));
    market
        .delete_mission(&admin("ops"), &mission.mission_id)
        .expect("admin delete");
}

#[test]
fn direct_assignment_fails_when_in_progress() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0), ("moth", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    market
        .assign_mission(&admin("ops"), &mission.mission_id, "vex")
        .expect("assign");
    let err = market
        .assign_mission(&admin("ops"), &mission.mission_id, "moth")
        .expect_err("already assigned");
    assert_eq!(
        err,
        MarketError::AlreadyAssigned {
            mission_id: mission.mission_id.clone(),
            assassin_id: "vex".to_string(),
        }
    );
    // Assignment is not silently overwritten.
    assert_eq!(
        market
            .mission(&mission.mission_id)
            .expect("mission")
            .assassin_id
            .as_deref(),
        Some("vex")
    );
}

#[test]
fn updating_an_open_mission_resettles_escrow() {
    let mut market = market_with_users(&[("carla", 500)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 200))
        .expect("create");

    let (updated, change) = market
        .update_mission(
            &contractor("carla"),
            &mission.mission_id,
            MissionUpdate {
                reward: Some(300),
                ..MissionUpdate::default()
            },
        )
        .expect("raise");
    assert_eq!(updated.reward, 300);
    assert_eq!(change.expect("debit").balance_after, 200);

    let (updated, change) = market
        .update_mission(
            &contractor("carla"),
            &mission.mission_id,
            MissionUpdate {
                reward: Some(100),
                ..MissionUpdate::default()
            },
        )
        .expect("lower");
    assert_eq!(updated.reward, 100);
    assert_eq!(change.expect("refund").balance_after, 400);
    assert_eq!(market.escrowed_coins(), 100);
}

#[test]
fn proposing_moves_mission_to_negotiating_and_is_exclusive() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0), ("moth", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 150)
        .expect("propose");
    assert_eq!(negotiation.status, NegotiationStatus::Pending);
    assert_eq!(
        market.mission(&mission.mission_id).expect("mission").status,
        MissionStatus::Negotiating
    );

    let err = market
        .propose_negotiation(&assassin("moth"), &mission.mission_id, 120)
        .expect_err("duplicate pending");
    assert!(matches!(err, MarketError::Conflict(_)));
}

#[test]
fn proposer_cannot_resolve_own_negotiation() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 150)
        .expect("propose");

    let err = market
        .accept_negotiation(&assassin("vex"), &negotiation.negotiation_id)
        .expect_err("self acceptance");
    assert!(matches!(err, MarketError::Forbidden { .. }));
    let err = market
        .reject_negotiation(&assassin("vex"), &negotiation.negotiation_id)
        .expect_err("self rejection");
    assert!(matches!(err, MarketError::Forbidden { .. }));
}

#[test]
fn accepting_a_higher_proposal_debits_the_difference() {
    let mut market = market_with_users(&[("carla", 200), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 150)
        .expect("propose");
    let (accepted, mission, change) = market
        .accept_negotiation(&contractor("carla"), &negotiation.negotiation_id)
        .expect("accept");
    assert_eq!(accepted.status, NegotiationStatus::Accepted);
    assert_eq!(mission.reward, 150);
    assert_eq!(mission.status, MissionStatus::InProgress);
    assert_eq!(mission.assassin_id.as_deref(), Some("vex"));
    assert_eq!(change.expect("delta").balance_after, 50);
    assert_eq!(market.balance_of("carla").expect("balance"), 50);
}

#[test]
fn acceptance_fails_without_funds_for_the_difference() {
    let mut market = market_with_users(&[("carla", 120), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 200)
        .expect("propose");
    let err = market
        .accept_negotiation(&contractor("carla"), &negotiation.negotiation_id)
        .expect_err("insufficient");
    assert!(matches!(err, MarketError::InsufficientFunds { .. }));
    // Nothing committed: proposal still pending, reward unchanged.
    let unchanged = market.mission(&mission.mission_id).expect("mission");
    assert_eq!(unchanged.reward, 100);
    assert_eq!(unchanged.status, MissionStatus::Negotiating);
    assert_eq!(
        market
            .negotiation(&negotiation.negotiation_id)
            .expect("negotiation")
            .status,
        NegotiationStatus::Pending
    );
}

#[test]
fn contractor_lowering_proposal_refunds_surplus_on_acceptance() {
    let mut market = market_with_users(&[("carla", 300), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 200))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&contractor("carla"), &mission.mission_id, 120)
        .expect("contractor proposes lower");
    let (_, mission, change) = market
        .accept_negotiation(&assassin("vex"), &negotiation.negotiation_id)
        .expect("assassin accepts");
    assert_eq!(mission.reward, 120);
    assert_eq!(mission.assassin_id.as_deref(), Some("vex"));
    let change = change.expect("refund");
    assert_eq!(change.delta, 80);
    assert_eq!(market.balance_of("carla").expect("balance"), 180);
}

#[test]
fn rejection_reverts_the_mission_to_open() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 150)
        .expect("propose");
    let (rejected, mission) = market
        .reject_negotiation(&contractor("carla"), &negotiation.negotiation_id)
        .expect("reject");
    assert_eq!(rejected.status, NegotiationStatus::Rejected);
    assert_eq!(mission.status, MissionStatus::Open);
    assert_eq!(market.balance_of("carla").expect("balance"), 400);

    let err = market
        .accept_negotiation(&contractor("carla"), &negotiation.negotiation_id)
        .expect_err("already resolved");
    assert!(matches!(err, MarketError::InvalidState { .. }));
}

#[test]
fn direct_assignment_discards_the_pending_proposal() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0), ("moth", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 150)
        .expect("propose");
    market
        .assign_mission(&admin("ops"), &mission.mission_id, "moth")
        .expect("assign");
    assert_eq!(
        market
            .negotiation(&negotiation.negotiation_id)
            .expect("negotiation")
            .status,
        NegotiationStatus::Rejected
    );
}

#[test]
fn debt_handshake_walks_the_full_lifecycle() {
    let mut market = market_with_users(&[("dan", 0), ("cora", 0)]);
    let debtor = assassin("dan");
    let creditor = contractor("cora");

    let debt = market
        .create_favor_request(&debtor, "cora", "hid a body")
        .expect("request");
    assert_eq!(debt.status, DebtStatus::Pending);

    // Payment cannot be requested before the creditor accepts.
    let err = market
        .request_payment(&creditor, &debt.debt_id, "return the favor")
        .expect_err("not active yet");
    assert!(matches!(err, MarketError::InvalidState { .. }));

    let debt = market.accept_debt(&creditor, &debt.debt_id).expect("accept");
    assert_eq!(debt.status, DebtStatus::Active);

    // Only the creditor may call the favor in.
    let err = market
        .request_payment(&debtor, &debt.debt_id, "no")
        .expect_err("debtor cannot request");
    assert!(matches!(err, MarketError::Forbidden { .. }));

    let debt = market
        .request_payment(&creditor, &debt.debt_id, "drive the getaway car")
        .expect("request payment");
    assert_eq!(debt.status, DebtStatus::PaymentRequested);

    let debt = market.accept_payment(&debtor, &debt.debt_id).expect("accept payment");
    assert_eq!(debt.status, DebtStatus::InProgress);

    let debt = market.mark_completed(&debtor, &debt.debt_id).expect("claim");
    assert_eq!(debt.status, DebtStatus::InProgress);

    let debt = market
        .reject_completion(&creditor, &debt.debt_id)
        .expect("dispute");
    assert_eq!(debt.status, DebtStatus::InProgress);

    let debt = market
        .confirm_completion(&creditor, &debt.debt_id)
        .expect("confirm");
    assert_eq!(debt.status, DebtStatus::Completed);
    assert_eq!(market.ledger().total_coins(), 0);
}

#[test]
fn rejecting_a_payment_request_marks_the_debtor() {
    let mut market = market_with_users(&[("dan", 0), ("cora", 0)]);
    let debtor = assassin("dan");
    let creditor = contractor("cora");
    let debt = market
        .create_favor_request(&debtor, "cora", "hid a body")
        .expect("request");
    market.accept_debt(&creditor, &debt.debt_id).expect("accept");
    market
        .request_payment(&creditor, &debt.debt_id, "drive the getaway car")
        .expect("request payment");

    let (debt, mark) = market.reject_payment(&debtor, &debt.debt_id).expect("reject");
    assert_eq!(debt.status, DebtStatus::PaymentRequested);
    assert_eq!(mark.target_user_id, "dan");
    assert_eq!(mark.debt_id, debt.debt_id);
    assert_eq!(market.targets_for_user("dan").len(), 1);

    // No dedup: a second refusal appends a second marking.
    let (_, second) = market.reject_payment(&debtor, &debt.debt_id).expect("reject again");
    assert_ne!(second.target_id, mark.target_id);
    assert_eq!(market.targets_for_user("dan").len(), 2);
}

#[test]
fn debt_requires_both_accounts_and_distinct_parties() {
    let mut market = market_with_users(&[("dan", 0)]);
    let err = market
        .create_favor_request(&assassin("dan"), "dan", "self deal")
        .expect_err("self debt");
    assert!(matches!(err, MarketError::Validation(_)));
    let err = market
        .create_favor_request(&assassin("dan"), "ghost", "missing creditor")
        .expect_err("unknown creditor");
    assert!(matches!(err, MarketError::NotFound { .. }));
}

#[test]
fn notifications_are_keyed_by_recipient() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0)]);
    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("job", 100))
        .expect("create");
    market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 150)
        .expect("propose");

    let inbox = market.notifications_for("carla");
    assert!(inbox
        .iter()
        .any(|event| event.event_type == EventType::NegotiationProposed));
    assert!(market
        .notifications_for("vex")
        .iter()
        .all(|event| event.event_type != EventType::NegotiationProposed));
}

#[test]
fn private_missions_are_listed_only_for_parties() {
    let mut market = market_with_users(&[("carla", 500), ("vex", 0), ("moth", 0)]);
    market
        .create_mission(
            &contractor("carla"),
            MissionDraft {
                title: "quiet".to_string(),
                description: String::new(),
                reward: 100,
                is_private: true,
                target_assassin_id: Some("vex".to_string()),
            },
        )
        .expect("create");

    assert_eq!(market.visible_missions("vex", ActorRole::Assassin).len(), 1);
    assert_eq!(market.visible_missions("moth", ActorRole::Assassin).len(), 0);
    assert_eq!(market.visible_missions("carla", ActorRole::Contractor).len(), 1);
    assert_eq!(market.visible_missions("ops", ActorRole::Admin).len(), 1);
}

#[test]
fn end_to_end_scenario_matches_the_expected_numbers() {
    let mut market = market_with_users(&[("carla", 1000), ("vex", 0)]);

    let (mission, _) = market
        .create_mission(&contractor("carla"), draft("the big one", 300))
        .expect("create");
    assert_eq!(market.balance_of("carla").expect("balance"), 700);
    assert_eq!(mission.status, MissionStatus::Open);

    let negotiation = market
        .propose_negotiation(&assassin("vex"), &mission.mission_id, 400)
        .expect("propose");
    assert_eq!(negotiation.status, NegotiationStatus::Pending);

    let (_, mission, change) = market
        .accept_negotiation(&contractor("carla"), &negotiation.negotiation_id)
        .expect("accept");
    assert_eq!(market.balance_of("carla").expect("balance"), 600);
    assert_eq!(change.expect("delta").delta, -100);
    assert_eq!(mission.reward, 400);
    assert_eq!(mission.status, MissionStatus::InProgress);
    assert_eq!(mission.assassin_id.as_deref(), Some("vex"));

    let (mission, change) = market
        .complete_mission(&assassin("vex"), &mission.mission_id)
        .expect("complete");
    assert_eq!(change.balance_after, 400);
    assert_eq!(mission.status, MissionStatus::Completed);
    assert_eq!(mission.reward, 400);
    assert_eq!(market.balance_of("vex").expect("balance"), 400);

    // Conservation: 1000 entered the system, 1000 is still there.
    assert_eq!(market.ledger().total_coins() + market.escrowed_coins(), 1000);
}
