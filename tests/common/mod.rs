//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rust_tcg::cards::{Attack, CardDefinition, CardInstance, Deck, EnergyType};
use rust_tcg::core::{EntityId, MatchConfig, PlayerId};
use rust_tcg::effects::CustomEffectRegistry;
use rust_tcg::events::{Event, Responder};
use rust_tcg::interaction::DecisionResponse;
use rust_tcg::rules::{Match, PlayerSetup};

/// A basic with one cheap attack.
pub fn basic(name: &str, hp: i64, damage: i64) -> Arc<CardDefinition> {
    Arc::new(
        CardDefinition::new(name, hp, EnergyType::Colorless)
            .with_retreat(1)
            .with_attack(Attack::new("Tackle", [EnergyType::Colorless], damage)),
    )
}

/// `size` instances of `definition` with ids from `start`.
pub fn deck_of(definition: &Arc<CardDefinition>, start: u32, size: u32) -> Deck {
    Deck::from_cards((start..start + size).map(|i| CardInstance::new(EntityId(i), definition.clone())))
}

/// A match between two decks of `size` identical basics.
pub fn new_match(config: MatchConfig, definition: &Arc<CardDefinition>, size: u32) -> (Match, Responder) {
    Match::new(
        config,
        Arc::new(CustomEffectRegistry::with_builtins()),
        [
            PlayerSetup::new("Red", deck_of(definition, 1, size), [EnergyType::Colorless]),
            PlayerSetup::new("Blue", deck_of(definition, 1001, size), [EnergyType::Colorless]),
        ],
    )
    .expect("valid decks")
}

/// Queue setup answers: first hand card as active, nothing benched.
///
/// Only valid for all-basic decks, where no mulligan can happen.
pub fn queue_setup(game: &Match, responder: &Responder) {
    let first = game.state().first_player;
    for player in [first, first.opponent()] {
        let top = game.state().player(player).hand[0].id;
        responder.select(player, [top]).expect("responder open");
        responder.select(player, []).expect("responder open");
    }
}

/// Start a match and finish setup, ending in the first player's attack phase.
pub fn started(config: MatchConfig, definition: &Arc<CardDefinition>, size: u32) -> (Match, Responder) {
    let (mut game, responder) = new_match(config, definition, size);
    game.start_game().expect("start");
    queue_setup(&game, &responder);
    game.place_basics().expect("setup");
    (game, responder)
}

/// Answer every interaction event with the first allowed choices.
///
/// Picks `max(min_cards, 1)` choices capped at `max_cards`. Runs until the
/// match is dropped.
pub fn auto_respond(events: Receiver<Event>, responder: Responder) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in events {
            let (Some(params), Some(request_id)) = (event.search_params.as_ref(), event.request_id()) else {
                continue;
            };
            let count = params.min_cards.max(1).min(params.max_cards);
            let response = DecisionResponse::select(params.player_id, params.legal_choices.iter().copied().take(count))
                .for_request(request_id);
            if responder.respond(response).is_err() {
                break;
            }
        }
    })
}

pub const P0: PlayerId = PlayerId(0);
pub const P1: PlayerId = PlayerId(1);
