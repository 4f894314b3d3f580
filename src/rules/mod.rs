//! Match rules: the phase state machine and everything a player can do.
//!
//! - `Match`: owns the state, event bus and broker for one match
//! - `Action`: attack-phase actions, as listed by `Match::legal_actions`
//! - state-based checks (knockouts, points, promotion) run inside `Match`

mod actions;
mod checks;
mod legal;
mod machine;

pub use actions::Action;
pub use machine::{Match, PlayerSetup};
