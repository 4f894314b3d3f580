//! # rust-tcg
//!
//! A two-player trading card game engine in the pocket format: one active
//! card, a small bench, an energy zone that generates one energy per turn,
//! and points for knockouts.
//!
//! ## Design Principles
//!
//! 1. **Event-Sourced**: every committed state change emits exactly one
//!    event, in order. The log plus the seed and the accepted decision
//!    responses replays a match.
//!
//! 2. **Suspend, Don't Poll**: when a player must decide something, the
//!    match emits an interaction event and blocks until the host answers
//!    through its `Responder`.
//!
//! 3. **Validate at Load**: malformed cards, effects and decks are rejected
//!    before a match starts. Running matches only see well-formed data.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: zones use `im` collections, so effect
//!   resolution snapshots and restores player state in O(1).
//!
//! - **Seeded Randomness**: coin flips, shuffles and energy all come from
//!   one ChaCha8 stream per match.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_tcg::cards::{CardDefinition, CardInstance, Deck, EnergyType};
//! use rust_tcg::core::{EntityId, MatchConfig, Phase};
//! use rust_tcg::effects::CustomEffectRegistry;
//! use rust_tcg::rules::{Match, PlayerSetup};
//!
//! let basic = Arc::new(CardDefinition::new("Magikarp", 30, EnergyType::Water));
//! let deck = |start: u32| {
//!     Deck::from_cards((start..start + 20).map(|i| CardInstance::new(EntityId(i), basic.clone())))
//! };
//!
//! let (mut game, _responder) = Match::new(
//!     MatchConfig::new(42),
//!     Arc::new(CustomEffectRegistry::with_builtins()),
//!     [
//!         PlayerSetup::new("Ash", deck(1), [EnergyType::Water]),
//!         PlayerSetup::new("Gary", deck(101), [EnergyType::Water]),
//!     ],
//! )
//! .unwrap();
//!
//! game.start_game().unwrap();
//! assert_eq!(game.phase(), Phase::Setup);
//! assert_eq!(game.events().len(), 19);
//! ```
//!
//! ## Modules
//!
//! - `core`: ids, players, match state, RNG, configuration
//! - `cards`: definitions, instances, decks and the card catalog
//! - `effects`: attack effects, the custom effect registry and the resolver
//! - `events`: event log, subscriber fan-out and the inbound decision stream
//! - `interaction`: decision requests and the broker that validates answers
//! - `rules`: the match state machine and player actions

pub mod core;
pub mod cards;
pub mod effects;
pub mod error;
pub mod events;
pub mod interaction;
pub mod rules;

// Re-export commonly used types
pub use crate::core::{
    EndReason, EntityAllocator, EntityId, GameOutcome, GameResult, GameRng, GameState, MatchConfig, Phase,
    PlayerId, PlayerMap, PlayerState,
};

pub use crate::cards::{Attack, CardCatalog, CardDefinition, CardInstance, CardRecord, Deck, EnergyType, Stage};

pub use crate::effects::{
    CustomEffectHandler, CustomEffectRegistry, Effect, EffectContext, EffectInput, EffectOutcome, EffectResolver,
    EffectTarget, Immunity, StatusCondition,
};

pub use crate::error::{EngineError, Result};

pub use crate::events::{Event, EventBus, EventKind, Responder, SearchParams};

pub use crate::interaction::{DecisionResponse, InteractionBroker, InteractionKind};

pub use crate::rules::{Action, Match, PlayerSetup};
