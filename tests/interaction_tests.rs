//! Interaction broker integration tests: deck searches raised by attacks.

mod common;

use std::sync::Arc;

use common::started;
use rust_tcg::cards::{Attack, CardDefinition, EnergyType};
use rust_tcg::core::{EntityId, MatchConfig, PlayerId};
use rust_tcg::effects::builtins::amount_param;
use rust_tcg::effects::{Effect, EffectInput, ParamValue};
use rust_tcg::error::{EngineError, InvalidSelection};
use rust_tcg::events::{EventKind, EventPayload, SearchParams, Zone};
use rust_tcg::interaction::{DecisionResponse, InteractionKind, InteractionRequest};
use rust_tcg::rules::Match;

fn searcher() -> Arc<CardDefinition> {
    let mut params = amount_param("count", 1);
    params.insert("basic_only".to_string(), ParamValue::Bool(true));
    Arc::new(
        CardDefinition::new("Bellsprout", 50, EnergyType::Grass).with_attack(
            Attack::new("Call for Family", [], 0).with_effect(Effect::custom("search_deck", params)),
        ),
    )
}

fn deck_ids(game: &Match, player: PlayerId) -> Vec<EntityId> {
    game.state().player(player).deck.ids()
}

fn search_event(game: &Match) -> SearchParams {
    game.events()
        .iter()
        .find(|e| e.kind == EventKind::SearchDeck)
        .and_then(|e| e.search_params.clone())
        .expect("search event")
}

#[test]
fn test_search_offers_zero_to_one() {
    let (mut game, responder) = started(MatchConfig::new(1), &searcher(), 20);
    let me = game.current_player();
    let legal = deck_ids(&game, me);
    responder.select(me, [legal[3]]).unwrap();

    game.attack(me, 0, EffectInput::default()).unwrap();

    let params = search_event(&game);
    assert_eq!(params.min_cards, 0);
    assert_eq!(params.max_cards, 1);
    assert!(params.can_cancel);
    assert_eq!(params.player_id, me);
    assert_eq!(params.reason, "search_deck");
    let mut offered = params.legal_choices.clone();
    let mut expected = legal.clone();
    offered.sort();
    expected.sort();
    assert_eq!(offered, expected);

    assert!(game.state().player(me).hand_card(legal[3]).is_some());
    assert!(game.events().iter().any(|e| matches!(
        &e.payload,
        EventPayload::CardMove { card, from: Zone::Deck, to: Zone::Hand, .. } if card.id == legal[3]
    )));
}

#[test]
fn test_search_accepts_empty_selection() {
    let (mut game, responder) = started(MatchConfig::new(2), &searcher(), 20);
    let me = game.current_player();
    let hand_before = game.state().player(me).hand.len();
    responder.select(me, []).unwrap();

    game.attack(me, 0, EffectInput::default()).unwrap();

    assert_eq!(game.state().player(me).hand.len(), hand_before);
    assert_eq!(game.rejected_selections(), 0);
    let search_at = game
        .events()
        .iter()
        .position(|e| e.kind == EventKind::SearchDeck)
        .unwrap();
    assert_eq!(game.events()[search_at + 1].kind, EventKind::Shuffle);
}

#[test]
fn test_search_accepts_cancel() {
    let (mut game, responder) = started(MatchConfig::new(3), &searcher(), 20);
    let me = game.current_player();
    responder.cancel(me).unwrap();

    game.attack(me, 0, EffectInput::default()).unwrap();

    assert_eq!(game.rejected_selections(), 0);
    assert!(game.accepted_responses().last().is_some_and(|r| r.cancel));
}

#[test]
fn test_search_rejects_outside_choices() {
    let (mut game, responder) = started(MatchConfig::new(4), &searcher(), 20);
    let me = game.current_player();
    let legal = deck_ids(&game, me);
    let foreign = deck_ids(&game, me.opponent())[0];
    let in_hand = game.state().player(me).hand[0].id;

    responder.select(me, [foreign]).unwrap();
    responder.select(me, [in_hand]).unwrap();
    responder.select(me, [legal[0], legal[1]]).unwrap();
    responder.select(me, [legal[0]]).unwrap();

    game.attack(me, 0, EffectInput::default()).unwrap();

    assert_eq!(game.rejected_selections(), 3);
    assert!(game.state().player(me).hand_card(legal[0]).is_some());
}

#[test]
fn test_search_rejects_stale_request() {
    let (mut game, responder) = started(MatchConfig::new(5), &searcher(), 20);
    let me = game.current_player();

    responder.respond(DecisionResponse::select(me, []).for_request(999)).unwrap();
    responder.respond(DecisionResponse::cancel(me).for_request(3)).unwrap();
    responder.respond(DecisionResponse::cancel(me).for_request(5)).unwrap();

    game.attack(me, 0, EffectInput::default()).unwrap();

    // Setup issued requests 1 to 4; the search is the fifth.
    let request = game
        .events()
        .iter()
        .find(|e| e.kind == EventKind::SearchDeck)
        .and_then(|e| e.request_id());
    assert_eq!(request, Some(5));
    assert_eq!(game.rejected_selections(), 2);
}

#[test]
fn test_search_fails_when_input_closes() {
    let (mut game, responder) = started(MatchConfig::new(6), &searcher(), 20);
    let me = game.current_player();
    drop(responder);

    let result = game.attack(me, 0, EffectInput::default());
    assert!(matches!(result, Err(EngineError::InputClosed)));
}

#[test]
fn test_subscriber_sees_search_contract() {
    let (mut game, responder) = started(MatchConfig::new(7), &searcher(), 20);
    let me = game.current_player();
    let events = game.subscribe();
    responder.select(me, []).unwrap();

    game.attack(me, 0, EffectInput::default()).unwrap();

    let search = events
        .try_iter()
        .find(|e| e.kind == EventKind::SearchDeck)
        .expect("search delivered to subscriber");
    let json = search.to_contract_json().unwrap();
    assert_eq!(json["event_type"], "SEARCH_DECK");
    assert_eq!(json["search_params"]["min_cards"], 0);
    assert_eq!(json["search_params"]["max_cards"], 1);
    assert_eq!(json["search_params"]["can_cancel"], true);
    assert_eq!(
        json["search_params"]["legal_cards"].as_array().map(Vec::len),
        Some(game.state().player(me).deck.len())
    );
}

#[test]
fn test_request_validate_is_pure() {
    let p0 = PlayerId::new(0);
    let request = InteractionRequest {
        request_id: 1,
        kind: InteractionKind::SearchDeck,
        params: SearchParams::up_to(p0, vec![EntityId(10), EntityId(11)], 1, "Search", "search_deck"),
    };

    assert!(request.validate(&DecisionResponse::select(p0, [])).is_ok());
    assert_eq!(
        request.validate(&DecisionResponse::select(p0, [EntityId(11)])).unwrap().single(),
        Some(EntityId(11))
    );
    assert_eq!(
        request.validate(&DecisionResponse::select(p0, [EntityId(12)])),
        Err(InvalidSelection::NotLegal(EntityId(12)))
    );
    assert_eq!(
        request.validate(&DecisionResponse::select(p0, [EntityId(10), EntityId(11)])),
        Err(InvalidSelection::CountOutOfRange { count: 2, min: 0, max: 1 })
    );
}
