//! Per-entity repository traits with in-memory implementations. The kernel
//! owns boxed repositories injected at construction; there is no ambient
//! registry.

use std::collections::BTreeMap;
use std::fmt;

use contracts::{Debt, Mission, Negotiation, NegotiationStatus, TargetMark};

pub trait MissionRepository: fmt::Debug + Send {
    fn get(&self, mission_id: &str) -> Option<Mission>;
    fn put(&mut self, mission: Mission);
    fn remove(&mut self, mission_id: &str) -> Option<Mission>;
    fn list(&self) -> Vec<Mission>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait NegotiationRepository: fmt::Debug + Send {
    fn get(&self, negotiation_id: &str) -> Option<Negotiation>;
    fn put(&mut self, negotiation: Negotiation);
    fn list(&self) -> Vec<Negotiation>;
    /// The single pending negotiation for a mission, if one exists.
    fn pending_for_mission(&self, mission_id: &str) -> Option<Negotiation>;
    fn for_mission(&self, mission_id: &str) -> Vec<Negotiation>;
}

pub trait DebtRepository: fmt::Debug + Send {
    fn get(&self, debt_id: &str) -> Option<Debt>;
    fn put(&mut self, debt: Debt);
    fn list(&self) -> Vec<Debt>;
    fn len(&self) -> usize;
}

pub trait TargetRepository: fmt::Debug + Send {
    fn append(&mut self, mark: TargetMark);
    fn list(&self) -> Vec<TargetMark>;
    fn for_user(&self, user_id: &str) -> Vec<TargetMark>;
    fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemoryMissions {
    by_id: BTreeMap<String, Mission>,
}

impl MissionRepository for InMemoryMissions {
    fn get(&self, mission_id: &str) -> Option<Mission> {
        self.by_id.get(mission_id).cloned()
    }

    fn put(&mut self, mission: Mission) {
        self.by_id.insert(mission.mission_id.clone(), mission);
    }

    fn remove(&mut self, mission_id: &str) -> Option<Mission> {
        self.by_id.remove(mission_id)
    }

    fn list(&self) -> Vec<Mission> {
        self.by_id.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryNegotiations {
    by_id: BTreeMap<String, Negotiation>,
}

impl NegotiationRepository for InMemoryNegotiations {
    fn get(&self, negotiation_id: &str) -> Option<Negotiation> {
        self.by_id.get(negotiation_id).cloned()
    }

    fn put(&mut self, negotiation: Negotiation) {
        self.by_id
            .insert(negotiation.negotiation_id.clone(), negotiation);
    }

    fn list(&self) -> Vec<Negotiation> {
        self.by_id.values().cloned().collect()
    }

    fn pending_for_mission(&self, mission_id: &str) -> Option<Negotiation> {
        self.by_id
            .values()
            .find(|negotiation| {
                negotiation.mission_id == mission_id
                    && negotiation.status == NegotiationStatus::Pending
            })
            .cloned()
    }

    fn for_mission(&self, mission_id: &str) -> Vec<Negotiation> {
        self.by_id
            .values()
            .filter(|negotiation| negotiation.mission_id == mission_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDebts {
    by_id: BTreeMap<String, Debt>,
}

impl DebtRepository for InMemoryDebts {
    fn get(&self, debt_id: &str) -> Option<Debt> {
        self.by_id.get(debt_id).cloned()
    }

    fn put(&mut self, debt: Debt) {
        self.by_id.insert(debt.debt_id.clone(), debt);
    }

    fn list(&self) -> Vec<Debt> {
        self.by_id.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTargets {
    marks: Vec<TargetMark>,
}

impl TargetRepository for InMemoryTargets {
    fn append(&mut self, mark: TargetMark) {
        self.marks.push(mark);
    }

    fn list(&self) -> Vec<TargetMark> {
        self.marks.clone()
    }

    fn for_user(&self, user_id: &str) -> Vec<TargetMark> {
        self.marks
            .iter()
            .filter(|mark| mark.target_user_id == user_id)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.marks.len()
    }
}
