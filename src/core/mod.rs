//! Core engine types: entities, players, state, RNG, configuration.
//!
//! Everything here is plain data. Rules live in `rules`, effect semantics in
//! `effects`.

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod state;

pub use entity::{EntityAllocator, EntityId};
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
pub use config::MatchConfig;
pub use state::{EndReason, GameOutcome, GameResult, GameState, Phase, PlayerState};
