//! Match events.
//!
//! Every state change the engine commits is described by exactly one
//! `Event`. Events are immutable once emitted. Interaction events
//! (`SEARCH_DECK`, `WAIT_FOR_INPUT`, ...) additionally carry `SearchParams`
//! describing the decision the player must make.
//!
//! ## Contract form
//!
//! Frontends consume `{ event_type, data, search_params? }`:
//!
//! ```
//! use rust_tcg::core::{Phase, PlayerId};
//! use rust_tcg::events::{Event, EventKind, EventPayload};
//!
//! let event = Event::new(EventKind::PhaseChange, EventPayload::PhaseChange {
//!     phase: Phase::Setup,
//!     first_player: Some(PlayerId::new(1)),
//! });
//!
//! let json = event.to_contract_json().unwrap();
//! assert_eq!(json["event_type"], "PHASE_CHANGE");
//! assert_eq!(json["data"]["phase"], "setup");
//! assert!(json.get("search_params").is_none());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cards::{CardRef, EnergyType};
use crate::core::{EndReason, EntityId, Phase, PlayerId};
use crate::effects::{EffectNote, StatusCondition};
use crate::error::Result;

/// Event kinds, named as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Shuffle,
    DrawCard,
    AttachEnergy,
    Attack,
    FlipCoins,
    PhaseChange,
    GameEnd,
    TurnChange,
    SearchDeck,
    SearchDiscard,
    SelectPrize,
    WaitForInput,
    CardMove,
    Knockout,
    StatusUpkeep,
    EnergyZone,
}

impl EventKind {
    /// Whether this kind asks a player for a decision.
    #[must_use]
    pub const fn is_interaction(self) -> bool {
        matches!(
            self,
            EventKind::SearchDeck | EventKind::SearchDiscard | EventKind::SelectPrize | EventKind::WaitForInput
        )
    }
}

/// Card locations, for `CARD_MOVE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Hand,
    Deck,
    Discard,
    Active,
    Bench(usize),
}

/// Parameters of a player decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Prompt shown to the player.
    pub instruction: String,
    #[serde(rename = "legal_cards")]
    pub legal_choices: Vec<EntityId>,
    pub min_cards: usize,
    pub max_cards: usize,
    pub can_cancel: bool,
    pub player_id: PlayerId,
    /// Machine-readable reason, e.g. `"place_active"`.
    pub reason: String,
}

impl SearchParams {
    /// Pick exactly one of `legal_choices`.
    pub fn choose_one(
        player_id: PlayerId,
        legal_choices: Vec<EntityId>,
        instruction: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            legal_choices,
            min_cards: 1,
            max_cards: 1,
            can_cancel: false,
            player_id,
            reason: reason.into(),
        }
    }

    /// Pick between zero and `max_cards`. The request may be cancelled.
    pub fn up_to(
        player_id: PlayerId,
        legal_choices: Vec<EntityId>,
        max_cards: usize,
        instruction: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            max_cards: max_cards.min(legal_choices.len()),
            legal_choices,
            min_cards: 0,
            can_cancel: true,
            player_id,
            reason: reason.into(),
        }
    }
}

/// Typed event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    PhaseChange {
        phase: Phase,
        first_player: Option<PlayerId>,
    },
    FlipCoins {
        player: Option<PlayerId>,
        flips: Vec<bool>,
    },
    Shuffle {
        player: PlayerId,
        deck_size: usize,
    },
    DrawCard {
        player: PlayerId,
        card: CardRef,
        hand_size: usize,
    },
    AttachEnergy {
        player: PlayerId,
        energy: EnergyType,
        target: CardRef,
    },
    Attack {
        player: PlayerId,
        attacker: CardRef,
        attack: String,
        defender: Option<CardRef>,
        damage: i64,
        flips: Vec<bool>,
        notes: Vec<EffectNote>,
    },
    TurnChange {
        turn: u32,
        player: PlayerId,
    },
    GameEnd {
        winner: Option<PlayerId>,
        reason: EndReason,
    },
    Interaction {
        request_id: u64,
    },
    CardMove {
        player: PlayerId,
        card: CardRef,
        from: Zone,
        to: Zone,
    },
    Knockout {
        player: PlayerId,
        card: CardRef,
        scorer: PlayerId,
        points: u32,
    },
    StatusUpkeep {
        player: PlayerId,
        card: CardRef,
        status: StatusCondition,
        damage: i64,
        /// The condition was removed by this upkeep.
        cleared: bool,
    },
    /// The player's energy zone after it was seeded or rotated.
    EnergyZone {
        player: PlayerId,
        current: Option<EnergyType>,
        next: Option<EnergyType>,
    },
}

/// One emitted event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub payload: EventPayload,
    pub search_params: Option<SearchParams>,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            payload,
            search_params: None,
        }
    }

    /// An interaction event for request `request_id`.
    #[must_use]
    pub fn interaction(kind: EventKind, request_id: u64, params: SearchParams) -> Self {
        debug_assert!(kind.is_interaction());
        Self {
            kind,
            payload: EventPayload::Interaction { request_id },
            search_params: Some(params),
        }
    }

    /// Request id, for interaction events.
    #[must_use]
    pub fn request_id(&self) -> Option<u64> {
        match self.payload {
            EventPayload::Interaction { request_id } => Some(request_id),
            _ => None,
        }
    }

    /// Render as `{ event_type, data, search_params? }`.
    pub fn to_contract_json(&self) -> Result<Value> {
        let data = match serde_json::to_value(&self.payload)? {
            // Externally tagged: unwrap `{ "Variant": { ... } }`.
            Value::Object(map) if map.len() == 1 => map.into_iter().next().map_or(Value::Null, |(_, v)| v),
            other => other,
        };

        let mut contract = json!({
            "event_type": self.kind,
            "data": data,
        });
        if let Some(params) = &self.search_params {
            contract["search_params"] = serde_json::to_value(params)?;
        }
        Ok(contract)
    }
}
