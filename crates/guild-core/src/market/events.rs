use super::*;

/// A notification staged by a state transition. Effects are collected while
/// an operation runs and turned into [`Event`]s only after every repository
/// and ledger write has committed, so a failed operation emits nothing.
#[derive(Debug, Clone)]
pub(super) struct Effect {
    pub event_type: EventType,
    pub recipient_id: String,
    pub actors: Vec<ActorRef>,
    pub details: Option<Value>,
}

impl Effect {
    pub(super) fn new(
        event_type: EventType,
        recipient_id: impl Into<String>,
        actors: Vec<ActorRef>,
        details: Option<Value>,
    ) -> Self {
        Self {
            event_type,
            recipient_id: recipient_id.into(),
            actors,
            details,
        }
    }
}

impl Market {
    pub(super) fn commit_effects(&mut self, operation: &'static str, seq: u64, effects: Vec<Effect>) {
        let caused_by = vec![format!("op:{operation}:{seq}")];
        let mut sequence_in_op = 0_u64;
        for effect in effects {
            self.push_event(seq, &mut sequence_in_op, effect, caused_by.clone());
        }
    }

    fn push_event(
        &mut self,
        seq: u64,
        sequence_in_op: &mut u64,
        effect: Effect,
        caused_by: Vec<String>,
    ) -> String {
        *sequence_in_op += 1;
        let event_id = format!("evt_{seq:06}_{:02}", *sequence_in_op);
        self.event_log.push(Event {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            market_id: self.config.market_id.clone(),
            seq,
            event_id: event_id.clone(),
            sequence_in_op: *sequence_in_op,
            event_type: effect.event_type,
            recipient_id: effect.recipient_id,
            actors: effect.actors,
            caused_by,
            details: effect.details,
        });
        event_id
    }

    pub fn events(&self) -> &[Event] {
        &self.event_log
    }

    pub fn notifications_for(&self, user_id: &str) -> Vec<Event> {
        self.event_log
            .iter()
            .filter(|event| event.recipient_id == user_id)
            .cloned()
            .collect()
    }
}
