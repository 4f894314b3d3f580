//! Error types for the engine.
//!
//! Errors are split by when they can happen:
//!
//! - `ValidationError`: malformed card, effect, catalog or deck data. Raised at
//!   load time; a rejected definition never reaches a running match.
//! - `RuleViolation`: an attempted action is illegal in the current state.
//!   Match state is left untouched.
//! - `InvalidSelection`: an interaction response falls outside the window it
//!   was offered under. The request stays outstanding.
//! - `ConfigurationError`: a custom effect id has no handler (or is registered
//!   twice). Treated as a card-definition defect.

use thiserror::Error;

use crate::cards::EnergyType;
use crate::core::{EntityId, Phase, PlayerId};

/// Malformed definition data, detected before it enters play.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("card name must not be empty")]
    EmptyName,

    #[error("card {0} must have positive HP")]
    NonPositiveHp(String),

    #[error("attack {attack} on {card} has no name")]
    UnnamedAttack { card: String, attack: usize },

    #[error("energy discard bounds are inverted: minimum {minimum} > maximum {maximum}")]
    DiscardBounds { minimum: u32, maximum: u32 },

    #[error("an effect may discard energy at most once")]
    MultipleDiscards,

    #[error("multi-coin effect must flip at least one coin")]
    NoCoins,

    #[error("batch effect must contain at least one effect")]
    EmptyBatch,

    #[error("unknown card {0}")]
    UnknownCard(String),

    #[error("duplicate card {0}")]
    DuplicateCard(String),

    #[error("card instance {0} appears more than once")]
    DuplicateInstance(EntityId),

    #[error("deck has {size} cards, at least {required} required")]
    DeckTooSmall { size: usize, required: usize },

    #[error("opening hand size must be at least one card")]
    EmptyOpeningHand,

    #[error("deck contains no basic card")]
    NoBasicInDeck,

    #[error("deck declares no energy types")]
    NoEnergyTypes,

    #[error("malformed catalog record: {0}")]
    Malformed(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// An attempted action that is illegal given the current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("the match is over")]
    GameOver,

    #[error("action requires phase {expected:?}, match is in {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("{0} has no active card")]
    NoActive(PlayerId),

    #[error("energy cannot be attached this turn")]
    CannotAttachEnergy,

    #[error("no energy available in the energy zone")]
    NoEnergyAvailable,

    #[error("no card {0} in play for this player")]
    NotInPlay(EntityId),

    #[error("no card {0} in hand")]
    NotInHand(EntityId),

    #[error("card {0} is not a basic")]
    NotBasic(EntityId),

    #[error("bench is full")]
    BenchFull,

    #[error("bench slot {0} is empty")]
    EmptyBenchSlot(usize),

    #[error("attacking is disabled: {0}")]
    AttackDisabled(&'static str),

    #[error("no attack at index {0}")]
    InvalidAttack(usize),

    #[error("attack needs {required:?}, attached {attached:?}")]
    InsufficientEnergy {
        required: Vec<EnergyType>,
        attached: Vec<EnergyType>,
    },

    #[error("discarding {count} energy is outside [{minimum}, {maximum}]")]
    DiscardOutOfRange { count: u32, minimum: u32, maximum: u32 },

    #[error("retreat is not possible: {0}")]
    CannotRetreat(&'static str),
}

/// A decision response that violates the request it answers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSelection {
    #[error("response from {got} but request belongs to {expected}")]
    WrongPlayer { expected: PlayerId, got: PlayerId },

    #[error("response answers request {got}, outstanding request is {expected}")]
    StaleRequest { expected: u64, got: u64 },

    #[error("this request cannot be cancelled")]
    CancelNotAllowed,

    #[error("{0} is not a legal choice")]
    NotLegal(EntityId),

    #[error("{0} was selected more than once")]
    Duplicate(EntityId),

    #[error("selected {count} items, allowed [{min}, {max}]")]
    CountOutOfRange { count: usize, min: usize, max: usize },
}

/// A custom effect is misconfigured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no handler registered for custom effect '{0}'")]
    UnknownEffect(String),

    #[error("custom effect '{0}' registered twice")]
    DuplicateEffect(String),

    #[error("custom effect '{effect}' has invalid parameter '{param}'")]
    InvalidParam { effect: String, param: String },
}

/// Drawing from an empty deck.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot draw from an empty deck")]
pub struct EmptyDeckError;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error(transparent)]
    Selection(#[from] InvalidSelection),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    EmptyDeck(#[from] EmptyDeckError),

    #[error("inbound decision stream closed while a request was outstanding")]
    InputClosed,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    /// The rule violation, if this is one.
    #[must_use]
    pub fn as_rule(&self) -> Option<&RuleViolation> {
        match self {
            EngineError::Rule(rule) => Some(rule),
            _ => None,
        }
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
