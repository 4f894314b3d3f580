//! State-based checks.
//!
//! Run after every mutation that can knock a card out or leave a player
//! without an active card:
//!
//! 1. Knocked-out cards (active or bench) go to their owner's discard pile
//!    and the opponent scores `points_per_knockout`.
//! 2. A player at `points_to_win` wins. Both at once is a draw.
//! 3. A player with no active card promotes one from the bench or hand, or
//!    loses if there is nothing to promote.

use log::debug;

use super::machine::Match;
use crate::cards::CardInstance;
use crate::core::{EndReason, EntityId, GameResult, PlayerId};
use crate::error::Result;
use crate::events::{EventKind, EventPayload, SearchParams, Zone};
use crate::interaction::InteractionKind;

impl Match {
    /// Run every state-based check. No-op once the match is over.
    pub(crate) fn run_checks(&mut self) -> Result<()> {
        if self.state.is_over() {
            return Ok(());
        }

        let current = self.state.current_player;
        let order = [current, current.opponent()];

        for player in order {
            self.knock_out(player);
        }
        if self.check_points() {
            return Ok(());
        }
        self.promote(order)
    }

    fn knock_out(&mut self, player: PlayerId) {
        let state = self.state.player_mut(player);

        let mut fallen: Vec<CardInstance> = Vec::new();
        if state.active.as_ref().is_some_and(CardInstance::is_knocked_out) {
            fallen.extend(state.active.take());
        }
        let slots: Vec<usize> = state
            .bench
            .iter()
            .filter(|(_, card)| card.is_knocked_out())
            .map(|(slot, _)| *slot)
            .collect();
        for slot in slots {
            fallen.extend(state.bench.remove(&slot));
        }

        let scorer = player.opponent();
        let points = self.config.points_per_knockout;
        for card in fallen {
            let card_ref = card.card_ref();
            self.state.player_mut(player).discard_card(card);
            self.state.player_mut(scorer).points += points;
            debug!("{} knocked out, {scorer} scores {points}", card_ref.name);
            self.emit(
                EventKind::Knockout,
                EventPayload::Knockout {
                    player,
                    card: card_ref,
                    scorer,
                    points,
                },
            );
        }
    }

    /// End the match if anyone reached the point target.
    fn check_points(&mut self) -> bool {
        let target = self.config.points_to_win;
        let reached: Vec<PlayerId> = self
            .state
            .players
            .iter()
            .filter(|(_, p)| p.points >= target)
            .map(|(player, _)| player)
            .collect();

        match reached.as_slice() {
            [] => false,
            [winner] => {
                self.end_game(GameResult::Winner(*winner), EndReason::Points);
                true
            }
            _ => {
                self.end_game(GameResult::Draw, EndReason::Points);
                true
            }
        }
    }

    fn promote(&mut self, order: [PlayerId; 2]) -> Result<()> {
        let stranded: Vec<PlayerId> = order
            .into_iter()
            .filter(|player| {
                let state = self.state.player(*player);
                state.active.is_none() && state.promotion_candidates().is_empty()
            })
            .collect();

        match stranded.as_slice() {
            [] => {}
            [loser] => {
                self.end_game(GameResult::Winner(loser.opponent()), EndReason::NoActive);
                return Ok(());
            }
            _ => {
                self.end_game(GameResult::Draw, EndReason::NoActive);
                return Ok(());
            }
        }

        for player in order {
            if self.state.player(player).active.is_some() {
                continue;
            }
            let candidates = self.state.player(player).promotion_candidates();
            let params = SearchParams::choose_one(
                player,
                candidates,
                "Choose a card to become your active card",
                "promote_active",
            );
            let selection = self.ask(InteractionKind::WaitForInput, params)?;
            if let Some(id) = selection.single() {
                self.promote_card(player, id);
            }
        }
        Ok(())
    }

    fn promote_card(&mut self, player: PlayerId, id: EntityId) {
        let state = self.state.player_mut(player);
        let moved = match state.bench_slot_of(id) {
            Some(slot) => state.bench.remove(&slot).map(|card| (card, Zone::Bench(slot))),
            None => state.take_from_hand(id).map(|card| (card, Zone::Hand)),
        };
        let Some((card, from)) = moved else {
            return;
        };

        let card_ref = card.card_ref();
        state.active = Some(card);
        self.emit(
            EventKind::CardMove,
            EventPayload::CardMove {
                player,
                card: card_ref,
                from,
                to: Zone::Active,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cards::{CardDefinition, Deck, EnergyType};
    use crate::core::{MatchConfig, Phase};
    use crate::effects::CustomEffectRegistry;
    use crate::events::Responder;
    use crate::rules::PlayerSetup;

    /// A match put straight into player 0's attack phase, actives placed.
    fn in_attack_phase() -> (Match, Responder) {
        let basic = Arc::new(CardDefinition::new("Diglett", 40, EnergyType::Fighting));
        let deck = |start: u32| {
            Deck::from_cards((start..start + 10).map(|i| CardInstance::new(EntityId(i), basic.clone())))
        };
        let (mut game, responder) = Match::new(
            MatchConfig::new(9),
            Arc::new(CustomEffectRegistry::with_builtins()),
            [
                PlayerSetup::new("Brock", deck(1), [EnergyType::Fighting]),
                PlayerSetup::new("Misty", deck(101), [EnergyType::Fighting]),
            ],
        )
        .unwrap();

        for player in PlayerId::BOTH {
            let state = game.state.player_mut(player);
            state.active = state.deck.draw().ok();
        }
        game.state.turn = 3;
        game.state.phase = Phase::Attack;
        (game, responder)
    }

    #[test]
    fn test_knockout_scores_for_opponent() {
        let (mut game, responder) = in_attack_phase();
        let p1 = PlayerId::new(1);
        game.state.player_mut(p1).bench.insert(0, CardInstance::new(EntityId(500), Arc::new(
            CardDefinition::new("Staryu", 50, EnergyType::Water),
        )));
        if let Some(active) = game.state.player_mut(p1).active.as_mut() {
            active.apply_damage(40);
        }
        responder.select(p1, [EntityId(500)]).unwrap();

        game.run_checks().unwrap();

        let misty = game.state.player(p1);
        assert_eq!(game.state.player(PlayerId::new(0)).points, 1);
        assert_eq!(misty.discard.len(), 1);
        assert_eq!(misty.discard[0].damage, 0);
        assert_eq!(misty.active.as_ref().map(|c| c.id), Some(EntityId(500)));

        let kinds: Vec<EventKind> = game.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Knockout, EventKind::WaitForInput, EventKind::CardMove]);
    }

    #[test]
    fn test_no_candidates_loses() {
        let (mut game, _responder) = in_attack_phase();
        let p1 = PlayerId::new(1);
        if let Some(active) = game.state.player_mut(p1).active.as_mut() {
            active.apply_damage(100);
        }

        game.run_checks().unwrap();

        assert_eq!(game.state.phase, Phase::GameEnd);
        assert_eq!(game.winner(), Some(PlayerId::new(0)));
        assert_eq!(game.outcome().map(|o| o.reason), Some(EndReason::NoActive));
    }

    #[test]
    fn test_point_target_wins() {
        let (mut game, _responder) = in_attack_phase();
        game.state.player_mut(PlayerId::new(0)).points = 2;
        let p1 = PlayerId::new(1);
        if let Some(active) = game.state.player_mut(p1).active.as_mut() {
            active.apply_damage(40);
        }

        game.run_checks().unwrap();

        assert_eq!(game.winner(), Some(PlayerId::new(0)));
        assert_eq!(game.outcome().map(|o| o.reason), Some(EndReason::Points));
        assert_eq!(game.events().last().map(|e| e.kind), Some(EventKind::GameEnd));
    }

    #[test]
    fn test_double_knockout_draw() {
        let (mut game, _responder) = in_attack_phase();
        for player in PlayerId::BOTH {
            game.state.player_mut(player).points = 2;
            if let Some(active) = game.state.player_mut(player).active.as_mut() {
                active.apply_damage(40);
            }
        }

        game.run_checks().unwrap();

        assert_eq!(game.outcome().map(|o| o.result), Some(GameResult::Draw));
    }
}
