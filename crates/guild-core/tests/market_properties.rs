use contracts::{ActorRef, ActorRole, MarketConfig, MissionStatus, NegotiationStatus};
use guild_core::{Market, MarketError, MissionDraft};

const WALK_STEPS: usize = 2_000;

/// Deterministic generator so failures replay exactly.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

fn contractor(id: &str) -> ActorRef {
    ActorRef::new(id, ActorRole::Contractor)
}

fn assassin(id: &str) -> ActorRef {
    ActorRef::new(id, ActorRole::Assassin)
}

fn draft(reward: i64) -> MissionDraft {
    MissionDraft {
        title: format!("mission paying {reward}"),
        description: String::new(),
        reward,
        is_private: false,
        target_assassin_id: None,
    }
}

fn seeded_market(users: &[(&str, i64)]) -> (Market, i64) {
    let mut market = Market::new(MarketConfig::default());
    let mut injected = 0;
    for (user_id, coins) in users {
        market.register_user(user_id).expect("register");
        if *coins > 0 {
            market
                .purchase_coins(&contractor(user_id), *coins)
                .expect("fund");
            injected += coins;
        }
    }
    (market, injected)
}

fn assert_invariants(market: &Market, injected: i64) {
    // Conservation: every coin that entered is either on a balance or in
    // escrow on a live mission.
    assert_eq!(
        market.ledger().total_coins() + market.escrowed_coins(),
        injected,
        "currency was created or destroyed"
    );
    for (user_id, balance) in market.ledger().accounts() {
        assert!(*balance >= 0, "negative balance for {user_id}");
    }
    for mission in market.list_missions() {
        let pending = market
            .negotiations_for_mission(&mission.mission_id)
            .into_iter()
            .filter(|negotiation| negotiation.status == NegotiationStatus::Pending)
            .count();
        assert!(
            pending <= 1,
            "mission {} has {pending} pending negotiations",
            mission.mission_id
        );
    }
}

#[test]
fn random_walk_preserves_conservation_and_uniqueness() {
    let contractors = ["carla", "silas"];
    let assassins = ["vex", "moth"];
    let (mut market, mut injected) = seeded_market(&[
        ("carla", 5_000),
        ("silas", 3_000),
        ("vex", 0),
        ("moth", 0),
    ]);
    let mut rng = Lcg(0xC0FFEE);

    for step in 0..WALK_STEPS {
        let contractor_id = contractors[rng.pick(contractors.len())];
        let assassin_id = assassins[rng.pick(assassins.len())];
        let missions = market.list_missions();

        match rng.pick(8) {
            0 => {
                let reward = 1 + rng.pick(400) as i64;
                let _ = market.create_mission(&contractor(contractor_id), draft(reward));
            }
            1 => {
                if let Some(mission) = missions.get(rng.pick(missions.len().max(1))) {
                    let reward = 1 + rng.pick(400) as i64;
                    let _ = market.propose_negotiation(
                        &assassin(assassin_id),
                        &mission.mission_id,
                        reward,
                    );
                }
            }
            2 => {
                // Resolve a pending negotiation from the contractor side.
                if let Some(mission) = missions.get(rng.pick(missions.len().max(1))) {
                    if let Some(pending) = market
                        .negotiations_for_mission(&mission.mission_id)
                        .into_iter()
                        .find(|negotiation| negotiation.status == NegotiationStatus::Pending)
                    {
                        let resolver = contractor(&mission.contractor_id);
                        let _ = if rng.pick(2) == 0 {
                            market
                                .accept_negotiation(&resolver, &pending.negotiation_id)
                                .map(|_| ())
                        } else {
                            market
                                .reject_negotiation(&resolver, &pending.negotiation_id)
                                .map(|_| ())
                        };
                    }
                }
            }
            3 => {
                if let Some(mission) = missions.get(rng.pick(missions.len().max(1))) {
                    let _ = market
                        .accept_mission_from_notification(&assassin(assassin_id), &mission.mission_id);
                }
            }
            4 => {
                if let Some(mission) = missions
                    .iter()
                    .find(|mission| mission.status == MissionStatus::InProgress)
                {
                    let worker = mission.assassin_id.clone().expect("assigned");
                    let _ = market.complete_mission(&assassin(&worker), &mission.mission_id);
                }
            }
            5 => {
                if let Some(mission) = missions.get(rng.pick(missions.len().max(1))) {
                    let owner = contractor(&mission.contractor_id);
                    let _ = market.delete_mission(&owner, &mission.mission_id);
                }
            }
            6 => {
                let amount = 1 + rng.pick(500) as i64;
                if market
                    .purchase_coins(&contractor(contractor_id), amount)
                    .is_ok()
                {
                    injected += amount;
                }
            }
            _ => {
                // Self-resolution must always be refused, at any point of the walk.
                if let Some(mission) = missions.get(rng.pick(missions.len().max(1))) {
                    if let Some(pending) = market
                        .negotiations_for_mission(&mission.mission_id)
                        .into_iter()
                        .find(|negotiation| negotiation.status == NegotiationStatus::Pending)
                    {
                        let proposer = ActorRef::new(
                            pending.proposed_by_id.clone(),
                            ActorRole::Assassin,
                        );
                        let err = market
                            .accept_negotiation(&proposer, &pending.negotiation_id)
                            .expect_err("proposer resolved own negotiation");
                        assert!(matches!(err, MarketError::Forbidden { .. }), "step {step}");
                    }
                }
            }
        }

        assert_invariants(&market, injected);
    }
}

#[test]
fn every_terminal_path_returns_the_escrow_exactly_once() {
    let (mut market, injected) = seeded_market(&[("carla", 1_000), ("vex", 0)]);

    // Path 1: create then delete while open — refund.
    let (open_mission, _) = market
        .create_mission(&contractor("carla"), draft(100))
        .expect("create");
    market
        .delete_mission(&contractor("carla"), &open_mission.mission_id)
        .expect("delete open");

    // Path 2: create, assign, delete while in progress — refund.
    let (assigned, _) = market
        .create_mission(&contractor("carla"), draft(150))
        .expect("create");
    market
        .accept_mission_from_notification(&assassin("vex"), &assigned.mission_id)
        .expect("accept");
    market
        .delete_mission(&contractor("carla"), &assigned.mission_id)
        .expect("delete in progress");

    // Path 3: create, assign, complete — payout.
    let (finished, _) = market
        .create_mission(&contractor("carla"), draft(200))
        .expect("create");
    market
        .accept_mission_from_notification(&assassin("vex"), &finished.mission_id)
        .expect("accept");
    market
        .complete_mission(&assassin("vex"), &finished.mission_id)
        .expect("complete");

    assert_eq!(market.balance_of("carla").expect("carla"), 800);
    assert_eq!(market.balance_of("vex").expect("vex"), 200);
    assert_eq!(market.escrowed_coins(), 0);
    assert_eq!(market.ledger().total_coins(), injected);
}

#[test]
fn negotiation_walk_never_leaks_the_difference() {
    let (mut market, injected) = seeded_market(&[("carla", 2_000), ("vex", 0)]);
    let mut rng = Lcg(0xDEAD10CC);

    for _ in 0..200 {
        let (mission, _) = match market.create_mission(&contractor("carla"), draft(1 + rng.pick(300) as i64)) {
            Ok(created) => created,
            Err(_) => break,
        };
        let proposed = 1 + rng.pick(600) as i64;
        let negotiation = market
            .propose_negotiation(&assassin("vex"), &mission.mission_id, proposed)
            .expect("propose");
        let resolved = if rng.pick(2) == 0 {
            market
                .accept_negotiation(&contractor("carla"), &negotiation.negotiation_id)
                .is_ok()
        } else {
            market
                .reject_negotiation(&contractor("carla"), &negotiation.negotiation_id)
                .is_ok()
        };
        if resolved {
            let mission = market.mission(&mission.mission_id).expect("mission");
            if mission.status == MissionStatus::InProgress {
                market
                    .complete_mission(&assassin("vex"), &mission.mission_id)
                    .expect("complete");
            } else {
                market
                    .delete_mission(&contractor("carla"), &mission.mission_id)
                    .expect("delete");
            }
        } else {
            market
                .delete_mission(&contractor("carla"), &mission.mission_id)
                .expect("delete");
        }
        assert_eq!(
            market.ledger().total_coins() + market.escrowed_coins(),
            injected
        );
    }
}
