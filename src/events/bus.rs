//! Per-match event bus.
//!
//! ## Outbound
//!
//! An append-only log of every emitted event (`history`), fanned out to any
//! number of subscribers. Each subscriber gets its own
//! `std::sync::mpsc::Receiver`; a subscriber whose receiver was dropped is
//! pruned on the next emit.
//!
//! ## Inbound
//!
//! Decision responses arrive on an mpsc channel. The sending half is the
//! `Responder` handed to the host when the match is created. The bus keeps
//! no sender of its own, so once every `Responder` is dropped a blocked
//! read reports `EngineError::InputClosed` instead of hanging.

use std::sync::mpsc::{self, Receiver, Sender};

use log::{trace, warn};

use super::event::Event;
use crate::core::{EntityId, PlayerId};
use crate::error::{EngineError, Result};
use crate::interaction::DecisionResponse;

/// Host-side handle for answering decisions.
///
/// `Send`, so answers may come from another thread.
#[derive(Clone, Debug)]
pub struct Responder {
    tx: Sender<DecisionResponse>,
}

impl Responder {
    /// Queue a response.
    pub fn respond(&self, response: DecisionResponse) -> Result<()> {
        self.tx.send(response).map_err(|_| EngineError::InputClosed)
    }

    /// Queue a selection of `ids` for `player`.
    pub fn select(&self, player: PlayerId, ids: impl IntoIterator<Item = EntityId>) -> Result<()> {
        self.respond(DecisionResponse::select(player, ids))
    }

    /// Queue a cancel for `player`.
    pub fn cancel(&self, player: PlayerId) -> Result<()> {
        self.respond(DecisionResponse::cancel(player))
    }

    /// Queue a recorded response sequence, e.g. to replay a match.
    pub fn replay(&self, responses: impl IntoIterator<Item = DecisionResponse>) -> Result<()> {
        responses.into_iter().try_for_each(|r| self.respond(r))
    }
}

/// Event log plus subscriber fan-out plus inbound decisions.
#[derive(Debug)]
pub struct EventBus {
    history: Vec<Event>,
    subscribers: Vec<Sender<Event>>,
    inbound: Receiver<DecisionResponse>,
    accepted: Vec<DecisionResponse>,
}

impl EventBus {
    /// Create a bus and the responder feeding it.
    #[must_use]
    pub fn new() -> (Self, Responder) {
        let (tx, inbound) = mpsc::channel();
        let bus = Self {
            history: Vec::new(),
            subscribers: Vec::new(),
            inbound,
            accepted: Vec::new(),
        };
        (bus, Responder { tx })
    }

    /// Append an event and deliver it to every subscriber.
    pub fn emit(&mut self, event: Event) {
        trace!("event #{} {:?}", self.history.len(), event.kind);

        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if self.subscribers.len() < before {
            warn!("pruned {} disconnected subscriber(s)", before - self.subscribers.len());
        }

        self.history.push(event);
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    #[must_use]
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Event> {
        self.history.last()
    }

    /// Block until the next response arrives.
    pub fn next_response(&mut self) -> Result<DecisionResponse> {
        self.inbound.recv().map_err(|_| EngineError::InputClosed)
    }

    /// Remember a response the broker accepted.
    pub fn record_accepted(&mut self, response: DecisionResponse) {
        self.accepted.push(response);
    }

    /// Every accepted response, in order. Seed plus these replays the match.
    #[must_use]
    pub fn accepted_responses(&self) -> &[DecisionResponse] {
        &self.accepted
    }

    /// Encode the outbound log with bincode.
    pub fn encode_log(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.history)?)
    }

    /// Decode a log produced by `encode_log`.
    pub fn decode_log(bytes: &[u8]) -> Result<Vec<Event>> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Phase;
    use crate::events::{EventKind, EventPayload};

    fn phase(phase: Phase) -> Event {
        Event::new(
            EventKind::PhaseChange,
            EventPayload::PhaseChange {
                phase,
                first_player: None,
            },
        )
    }

    #[test]
    fn test_emit_appends_in_order() {
        let (mut bus, _responder) = EventBus::new();
        bus.emit(phase(Phase::Setup));
        bus.emit(phase(Phase::Draw));

        assert_eq!(bus.len(), 2);
        assert_eq!(bus.history()[1], phase(Phase::Draw));
    }

    #[test]
    fn test_fan_out_to_every_subscriber() {
        let (mut bus, _responder) = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(phase(Phase::Attack));

        assert_eq!(a.try_recv().unwrap(), phase(Phase::Attack));
        assert_eq!(b.try_recv().unwrap(), phase(Phase::Attack));
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let (mut bus, _responder) = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(phase(Phase::Draw));
        bus.emit(phase(Phase::Attack));

        assert_eq!(kept.try_iter().count(), 2);
        assert_eq!(bus.subscribers.len(), 1);
    }

    #[test]
    fn test_responses_then_closed() {
        let (mut bus, responder) = EventBus::new();
        responder.select(PlayerId::new(0), [EntityId(3)]).unwrap();
        drop(responder);

        let response = bus.next_response().unwrap();
        assert_eq!(response.selected_ids, vec![EntityId(3)]);
        assert!(matches!(bus.next_response(), Err(EngineError::InputClosed)));
    }

    #[test]
    fn test_log_roundtrip() {
        let (mut bus, _responder) = EventBus::new();
        bus.emit(phase(Phase::Setup));
        bus.emit(Event::new(
            EventKind::FlipCoins,
            EventPayload::FlipCoins {
                player: None,
                flips: vec![true],
            },
        ));

        let bytes = bus.encode_log().unwrap();
        assert_eq!(EventBus::decode_log(&bytes).unwrap(), bus.history());
    }
}
