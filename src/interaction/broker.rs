//! Interaction broker - suspend the match until a player decides.
//!
//! `request` allocates a request id, emits the interaction event, then
//! blocks on the bus's inbound stream. Responses are checked against the
//! outstanding request; an invalid one is logged, counted and dropped, and
//! the broker keeps waiting. There is no timeout and no silent default.
//!
//! ## Validation order
//!
//! 1. The responder must be the requested player.
//! 2. A `request_id`, when given, must match the outstanding request.
//! 3. A cancel is accepted only if `can_cancel` and `min_cards == 0`.
//! 4. Selected ids must be distinct members of `legal_choices`.
//! 5. The count must lie in `[min_cards, max_cards]`.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId};
use crate::error::{InvalidSelection, Result};
use crate::events::{Event, EventBus, EventKind, SearchParams};

/// Kinds of decision the engine can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    SearchDeck,
    SearchDiscard,
    SelectPrize,
    WaitForInput,
}

impl InteractionKind {
    #[must_use]
    pub const fn event_kind(self) -> EventKind {
        match self {
            InteractionKind::SearchDeck => EventKind::SearchDeck,
            InteractionKind::SearchDiscard => EventKind::SearchDiscard,
            InteractionKind::SelectPrize => EventKind::SelectPrize,
            InteractionKind::WaitForInput => EventKind::WaitForInput,
        }
    }
}

/// A player's answer to an interaction event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub player_id: PlayerId,
    #[serde(default)]
    pub selected_ids: Vec<EntityId>,
    #[serde(default)]
    pub cancel: bool,
    #[serde(default)]
    pub request_id: Option<u64>,
}

impl DecisionResponse {
    pub fn select(player_id: PlayerId, ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            player_id,
            selected_ids: ids.into_iter().collect(),
            cancel: false,
            request_id: None,
        }
    }

    #[must_use]
    pub fn cancel(player_id: PlayerId) -> Self {
        Self {
            player_id,
            selected_ids: Vec::new(),
            cancel: true,
            request_id: None,
        }
    }

    /// Pin the response to a specific request.
    #[must_use]
    pub fn for_request(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// A validated answer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub request_id: u64,
    pub ids: Vec<EntityId>,
    pub cancelled: bool,
}

impl Selection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The single chosen id, for exactly-one requests.
    #[must_use]
    pub fn single(&self) -> Option<EntityId> {
        match self.ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }
}

/// An outstanding decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionRequest {
    pub request_id: u64,
    pub kind: InteractionKind,
    pub params: SearchParams,
}

impl InteractionRequest {
    /// Check a response against this request without side effects.
    pub fn validate(&self, response: &DecisionResponse) -> std::result::Result<Selection, InvalidSelection> {
        let params = &self.params;

        if response.player_id != params.player_id {
            return Err(InvalidSelection::WrongPlayer {
                expected: params.player_id,
                got: response.player_id,
            });
        }
        if let Some(got) = response.request_id {
            if got != self.request_id {
                return Err(InvalidSelection::StaleRequest {
                    expected: self.request_id,
                    got,
                });
            }
        }

        if response.cancel {
            if params.can_cancel && params.min_cards == 0 {
                return Ok(Selection {
                    request_id: self.request_id,
                    ids: Vec::new(),
                    cancelled: true,
                });
            }
            return Err(InvalidSelection::CancelNotAllowed);
        }

        let mut seen = FxHashSet::default();
        for id in &response.selected_ids {
            if !seen.insert(*id) {
                return Err(InvalidSelection::Duplicate(*id));
            }
            if !params.legal_choices.contains(id) {
                return Err(InvalidSelection::NotLegal(*id));
            }
        }

        let count = response.selected_ids.len();
        if count < params.min_cards || count > params.max_cards {
            return Err(InvalidSelection::CountOutOfRange {
                count,
                min: params.min_cards,
                max: params.max_cards,
            });
        }

        Ok(Selection {
            request_id: self.request_id,
            ids: response.selected_ids.clone(),
            cancelled: false,
        })
    }
}

/// Issues requests and waits for valid answers.
#[derive(Clone, Debug)]
pub struct InteractionBroker {
    next_request_id: u64,
    rejected: u64,
}

impl Default for InteractionBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionBroker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_request_id: 1,
            rejected: 0,
        }
    }

    /// Number of responses rejected so far.
    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Ask a player to decide, blocking until a valid response arrives.
    ///
    /// Panics if `params` can never be satisfied (fewer legal choices than
    /// `min_cards`, or `min_cards > max_cards`).
    pub fn request(&mut self, bus: &mut EventBus, kind: InteractionKind, params: SearchParams) -> Result<Selection> {
        assert!(
            params.min_cards <= params.max_cards && params.min_cards <= params.legal_choices.len(),
            "Unsatisfiable interaction request"
        );

        let request = InteractionRequest {
            request_id: self.next_request_id,
            kind,
            params,
        };
        self.next_request_id += 1;

        debug!(
            "request {} ({:?}) to {}: {}",
            request.request_id, kind, request.params.player_id, request.params.reason
        );
        bus.emit(Event::interaction(
            kind.event_kind(),
            request.request_id,
            request.params.clone(),
        ));

        loop {
            let response = bus.next_response()?;
            match request.validate(&response) {
                Ok(selection) => {
                    bus.record_accepted(response);
                    return Ok(selection);
                }
                Err(err) => {
                    self.rejected += 1;
                    warn!("rejected response to request {}: {err}", request.request_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn search(min: usize, max: usize, can_cancel: bool) -> InteractionRequest {
        InteractionRequest {
            request_id: 7,
            kind: InteractionKind::SearchDeck,
            params: SearchParams {
                instruction: "Pick".into(),
                legal_choices: vec![EntityId(1), EntityId(2), EntityId(3)],
                min_cards: min,
                max_cards: max,
                can_cancel,
                player_id: PlayerId::new(0),
                reason: "test".into(),
            },
        }
    }

    #[test]
    fn test_validate_accepts_legal() {
        let request = search(0, 1, true);
        let p0 = PlayerId::new(0);

        assert_eq!(
            request.validate(&DecisionResponse::select(p0, [])).unwrap().ids,
            Vec::<EntityId>::new()
        );
        assert_eq!(
            request.validate(&DecisionResponse::select(p0, [EntityId(2)])).unwrap().single(),
            Some(EntityId(2))
        );
    }

    #[test]
    fn test_validate_rejections() {
        let request = search(1, 2, false);
        let p0 = PlayerId::new(0);

        assert_eq!(
            request.validate(&DecisionResponse::select(PlayerId::new(1), [EntityId(1)])),
            Err(InvalidSelection::WrongPlayer {
                expected: p0,
                got: PlayerId::new(1)
            })
        );
        assert_eq!(
            request.validate(&DecisionResponse::select(p0, [EntityId(1)]).for_request(6)),
            Err(InvalidSelection::StaleRequest { expected: 7, got: 6 })
        );
        assert_eq!(
            request.validate(&DecisionResponse::cancel(p0)),
            Err(InvalidSelection::CancelNotAllowed)
        );
        assert_eq!(
            request.validate(&DecisionResponse::select(p0, [EntityId(9)])),
            Err(InvalidSelection::NotLegal(EntityId(9)))
        );
        assert_eq!(
            request.validate(&DecisionResponse::select(p0, [EntityId(1), EntityId(1)])),
            Err(InvalidSelection::Duplicate(EntityId(1)))
        );
        assert_eq!(
            request.validate(&DecisionResponse::select(p0, [])),
            Err(InvalidSelection::CountOutOfRange { count: 0, min: 1, max: 2 })
        );
    }

    #[test]
    fn test_cancel_needs_zero_minimum() {
        let p0 = PlayerId::new(0);
        assert!(search(0, 1, true).validate(&DecisionResponse::cancel(p0)).unwrap().cancelled);
        assert_eq!(
            search(1, 1, true).validate(&DecisionResponse::cancel(p0)),
            Err(InvalidSelection::CancelNotAllowed)
        );
    }

    #[test]
    fn test_request_skips_invalid_responses() {
        let (mut bus, responder) = EventBus::new();
        let mut broker = InteractionBroker::new();
        let p1 = PlayerId::new(1);

        responder.select(PlayerId::new(0), [EntityId(5)]).unwrap();
        responder.select(p1, [EntityId(99)]).unwrap();
        responder.select(p1, [EntityId(5)]).unwrap();

        let params = SearchParams::choose_one(p1, vec![EntityId(5), EntityId(6)], "Choose", "test");
        let selection = broker.request(&mut bus, InteractionKind::WaitForInput, params).unwrap();

        assert_eq!(selection.single(), Some(EntityId(5)));
        assert_eq!(broker.rejected_count(), 2);
        assert_eq!(bus.accepted_responses().len(), 1);
        assert_eq!(bus.history()[0].kind, EventKind::WaitForInput);
        assert_eq!(bus.history()[0].request_id(), Some(1));
    }

    #[test]
    fn test_request_input_closed() {
        let (mut bus, responder) = EventBus::new();
        drop(responder);

        let params = SearchParams::choose_one(PlayerId::new(0), vec![EntityId(1)], "Choose", "test");
        let result = InteractionBroker::new().request(&mut bus, InteractionKind::WaitForInput, params);
        assert!(matches!(result, Err(EngineError::InputClosed)));
    }
}
