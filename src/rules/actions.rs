//! Attack-phase actions.
//!
//! Every action first checks the match is live and that it is the acting
//! player's attack phase. A rejected action returns a `RuleViolation` and
//! leaves the state and the event log untouched.
//!
//! Attacking ends the turn: once the attack, its state-based checks and any
//! follow-up choices are done, the machine moves straight to between-turns.

use log::debug;
use serde::{Deserialize, Serialize};

use super::machine::Match;
use crate::cards::{CardInstance, CardRef};
use crate::core::{EndReason, EntityId, GameResult, GameState, PlayerId};
use crate::effects::{EffectContext, EffectInput, EffectNote, EffectResolver, FollowUp, StatusCondition};
use crate::error::{Result, RuleViolation};
use crate::events::{EventKind, EventPayload, SearchParams, Zone};
use crate::interaction::InteractionKind;

/// A player action, as returned by `Match::legal_actions`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Attach this turn's energy to a card in play.
    AttachEnergy { target: EntityId },
    /// Put a basic from the hand onto the bench.
    PlayBasic { card: EntityId },
    /// Swap the active card with a benched one.
    Retreat { replacement: EntityId },
    /// Use the active card's attack at `index`, discarding `discard` energy
    /// if the attack asks for it.
    Attack {
        index: usize,
        #[serde(default)]
        discard: u32,
    },
    EndTurn,
    Concede,
}

impl Match {
    /// Perform any action.
    pub fn apply_action(&mut self, player: PlayerId, action: Action) -> Result<()> {
        debug!("{player}: {action:?}");
        match action {
            Action::AttachEnergy { target } => self.attach_energy(player, target),
            Action::PlayBasic { card } => self.play_basic(player, card),
            Action::Retreat { replacement } => self.retreat(player, replacement),
            Action::Attack { index, discard } => self.attack(player, index, EffectInput::discard(discard)),
            Action::EndTurn => self.end_turn(player),
            Action::Concede => self.concede(player),
        }
    }

    /// Attach the energy in the energy zone to `target`. Once per turn.
    pub fn attach_energy(&mut self, player: PlayerId, target: EntityId) -> Result<()> {
        self.require_turn(player)?;

        let state = self.state.player_mut(player);
        if !state.can_attach_energy {
            return Err(RuleViolation::CannotAttachEnergy.into());
        }
        let energy = state.energy.ok_or(RuleViolation::NoEnergyAvailable)?;
        let card = state
            .in_play_card_mut(target)
            .ok_or(RuleViolation::NotInPlay(target))?;

        card.attached.push(energy);
        let target = card.card_ref();
        state.energy = None;
        state.can_attach_energy = false;

        self.emit(
            EventKind::AttachEnergy,
            EventPayload::AttachEnergy { player, energy, target },
        );
        Ok(())
    }

    /// Bench a basic card from the hand.
    pub fn play_basic(&mut self, player: PlayerId, card: EntityId) -> Result<()> {
        self.require_turn(player)?;

        let state = self.state.player(player);
        let instance = state.hand_card(card).ok_or(RuleViolation::NotInHand(card))?;
        if !instance.is_basic() {
            return Err(RuleViolation::NotBasic(card).into());
        }
        if state.free_bench_slot(self.config.bench_slots).is_none() {
            return Err(RuleViolation::BenchFull.into());
        }

        self.move_hand_to_bench(player, card).map(|_| ())
    }

    /// Pay the retreat cost and swap the active card with `replacement`.
    ///
    /// Retreating clears the outgoing card's status condition.
    pub fn retreat(&mut self, player: PlayerId, replacement: EntityId) -> Result<()> {
        self.require_turn(player)?;
        if let Some(reason) = self.retreat_blocker(player) {
            return Err(RuleViolation::CannotRetreat(reason).into());
        }

        let state = self.state.player_mut(player);
        let slot = state
            .bench_slot_of(replacement)
            .ok_or(RuleViolation::NotInPlay(replacement))?;
        let Some(mut outgoing) = state.active.take() else {
            return Err(RuleViolation::NoActive(player).into());
        };
        let Some(incoming) = state.bench.remove(&slot) else {
            state.active = Some(outgoing);
            return Err(RuleViolation::EmptyBenchSlot(slot).into());
        };

        let cost = outgoing.definition.retreat as usize;
        outgoing.detach_energy(cost);
        outgoing.status = None;
        let (outgoing_ref, incoming_ref) = (outgoing.card_ref(), incoming.card_ref());
        state.bench.insert(slot, outgoing);
        state.active = Some(incoming);
        state.has_retreated = true;

        self.emit(
            EventKind::CardMove,
            EventPayload::CardMove {
                player,
                card: incoming_ref,
                from: Zone::Bench(slot),
                to: Zone::Active,
            },
        );
        self.emit(
            EventKind::CardMove,
            EventPayload::CardMove {
                player,
                card: outgoing_ref,
                from: Zone::Active,
                to: Zone::Bench(slot),
            },
        );
        Ok(())
    }

    /// Use attack `index` of the active card, then end the turn.
    ///
    /// Cost, discard count and attack restrictions are checked before any
    /// coin is flipped. A confused attacker flips first; on tails the attack
    /// fails and does nothing. If resolution fails, the flip is undone along
    /// with everything else and no event is emitted.
    pub fn attack(&mut self, player: PlayerId, index: usize, input: EffectInput) -> Result<()> {
        self.require_turn(player)?;
        if let Some(violation) = self.attack_blocker(player) {
            return Err(violation.into());
        }

        let active = self
            .state
            .player(player)
            .active
            .as_ref()
            .ok_or(RuleViolation::NoActive(player))?;
        let attack = active
            .definition
            .attacks
            .get(index)
            .cloned()
            .ok_or(RuleViolation::InvalidAttack(index))?;
        if !attack.is_payable(&active.attached) {
            return Err(RuleViolation::InsufficientEnergy {
                required: attack.cost.to_vec(),
                attached: active.attached.to_vec(),
            }
            .into());
        }
        EffectResolver::check_discard(&attack.effect, active.attached.len(), input)?;
        let confused = active.status == Some(StatusCondition::Confused);
        let attacker = active.card_ref();

        let rng_before = self.state.rng.clone();
        let mut confusion_flip = None;
        if confused {
            let heads = self.state.rng.flip();
            confusion_flip = Some(heads);
            if !heads {
                self.emit_confusion_flip(player, heads);
                debug!("{} is confused, attack fails", attacker.name);
                self.state.player_mut(player).can_attack = false;
                let defender = self.defender_ref(player);
                let failed = EffectNote::AttackFailed { attacker: attacker.id };
                self.emit(
                    EventKind::Attack,
                    EventPayload::Attack {
                        player,
                        attacker,
                        attack: attack.name,
                        defender,
                        damage: 0,
                        flips: Vec::new(),
                        notes: vec![failed],
                    },
                );
                return self.finish_turn();
            }
        }

        let turn = self.state.turn;
        let weakness_bonus = self.config.weakness_bonus;
        let resolved = {
            let GameState { players, rng, .. } = &mut self.state;
            let (mine, theirs) = players.pair_mut(player);
            let mut attacking = EffectContext::new(player, turn, mine);
            let mut defending = EffectContext::new(player.opponent(), turn, theirs);
            self.resolver
                .resolve_attack(&attack, &mut attacking, &mut defending, rng, input, weakness_bonus)
        };
        let outcome = match resolved {
            Ok(outcome) => outcome,
            Err(err) => {
                // The confusion flip is only committed with the attack.
                self.state.rng = rng_before;
                return Err(err);
            }
        };

        if let Some(heads) = confusion_flip {
            self.emit_confusion_flip(player, heads);
        }
        self.state.player_mut(player).can_attack = false;
        let defender = self.defender_ref(player);
        self.emit(
            EventKind::Attack,
            EventPayload::Attack {
                player,
                attacker,
                attack: attack.name,
                defender,
                damage: outcome.damage,
                flips: outcome.flips,
                notes: outcome.notes,
            },
        );

        self.run_checks()?;
        for follow_up in outcome.follow_ups {
            if self.state.is_over() {
                return Ok(());
            }
            self.run_follow_up(player, follow_up)?;
        }
        if self.state.is_over() {
            return Ok(());
        }
        self.finish_turn()
    }

    /// End the attack phase without attacking.
    pub fn end_turn(&mut self, player: PlayerId) -> Result<()> {
        self.require_turn(player)?;
        self.finish_turn()
    }

    /// Give up. The opponent wins.
    pub fn concede(&mut self, player: PlayerId) -> Result<()> {
        if self.state.is_over() {
            return Err(RuleViolation::GameOver.into());
        }
        self.end_game(GameResult::Winner(player.opponent()), EndReason::Concede);
        Ok(())
    }

    /// Stop the match with no winner.
    pub fn abort(&mut self) -> Result<()> {
        if self.state.is_over() {
            return Err(RuleViolation::GameOver.into());
        }
        self.end_game(GameResult::Draw, EndReason::Aborted);
        Ok(())
    }

    fn emit_confusion_flip(&mut self, player: PlayerId, heads: bool) {
        self.emit(
            EventKind::FlipCoins,
            EventPayload::FlipCoins {
                player: Some(player),
                flips: vec![heads],
            },
        );
    }

    fn defender_ref(&self, player: PlayerId) -> Option<CardRef> {
        self.state
            .player(player.opponent())
            .active
            .as_ref()
            .map(CardInstance::card_ref)
    }

    fn run_follow_up(&mut self, player: PlayerId, follow_up: FollowUp) -> Result<()> {
        match follow_up {
            FollowUp::DrawCards { count } => {
                for _ in 0..count {
                    if self.state.player(player).deck.is_empty() {
                        debug!("{player} has no cards left to draw");
                        break;
                    }
                    self.draw_card(player)?;
                }
            }
            FollowUp::SearchDeck { count, basic_only } => {
                let legal: Vec<EntityId> = self
                    .state
                    .player(player)
                    .deck
                    .iter()
                    .filter(|card| !basic_only || card.is_basic())
                    .map(|card| card.id)
                    .collect();

                if !legal.is_empty() {
                    let what = if basic_only { "basic cards" } else { "cards" };
                    let params = SearchParams::up_to(
                        player,
                        legal,
                        count as usize,
                        format!("Search your deck for up to {count} {what}"),
                        "search_deck",
                    );
                    let selection = self.ask(InteractionKind::SearchDeck, params)?;
                    for id in selection.ids {
                        let state = self.state.player_mut(player);
                        if let Some(card) = state.deck.remove(id) {
                            let card_ref = card.card_ref();
                            state.hand.push_back(card);
                            self.emit(
                                EventKind::CardMove,
                                EventPayload::CardMove {
                                    player,
                                    card: card_ref,
                                    from: Zone::Deck,
                                    to: Zone::Hand,
                                },
                            );
                        }
                    }
                }
                self.shuffle_deck(player);
            }
        }
        Ok(())
    }
}
