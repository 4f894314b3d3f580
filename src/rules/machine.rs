//! The match state machine.
//!
//! A `Match` owns one `GameState`, the event bus that records it and the
//! broker that asks players for decisions. Phases advance in a fixed order:
//!
//! ```text
//! InitialCoinFlip -> Setup -> Draw -> Attack -> BetweenTurns -> Draw -> ...
//!                                                     \-> GameEnd
//! ```
//!
//! `start_game` and `place_basics` drive setup. From then on the current
//! player acts in the attack phase (see `actions`) and the machine runs the
//! draw and between-turns phases on its own. `GameEnd` is terminal.
//!
//! Every committed mutation emits exactly one event, after the mutation.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::cards::{Deck, EnergyType};
use crate::core::{
    EndReason, EntityId, GameOutcome, GameResult, GameState, MatchConfig, Phase, PlayerId, PlayerMap, PlayerState,
};
use crate::effects::{CustomEffectRegistry, EffectResolver, Immunity, StatusCondition};
use crate::error::{Result, RuleViolation, ValidationError};
use crate::events::{Event, EventBus, EventKind, EventPayload, Responder, SearchParams, Zone};
use crate::interaction::{DecisionResponse, InteractionBroker, InteractionKind, Selection};

/// Everything needed to seat one player.
#[derive(Clone, Debug)]
pub struct PlayerSetup {
    pub name: String,
    pub deck: Deck,
    pub energy_types: Vec<EnergyType>,
}

impl PlayerSetup {
    pub fn new(name: impl Into<String>, deck: Deck, energy_types: impl IntoIterator<Item = EnergyType>) -> Self {
        Self {
            name: name.into(),
            deck,
            energy_types: energy_types.into_iter().collect(),
        }
    }
}

/// One two-player match.
pub struct Match {
    pub(crate) config: MatchConfig,
    pub(crate) state: GameState,
    pub(crate) bus: EventBus,
    pub(crate) broker: InteractionBroker,
    pub(crate) resolver: EffectResolver,
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("phase", &self.state.phase)
            .field("turn", &self.state.turn)
            .field("current_player", &self.state.current_player)
            .field("events", &self.bus.len())
            .finish()
    }
}

impl Match {
    /// Seat two players and return the match with the responder that feeds
    /// its decisions.
    ///
    /// The opening hand must hold at least one card. Decks are checked
    /// against `config` (size, at least one basic), every card's effects
    /// against `registry`, and instance ids must be unique across both decks.
    pub fn new(
        config: MatchConfig,
        registry: Arc<CustomEffectRegistry>,
        players: [PlayerSetup; 2],
    ) -> Result<(Self, Responder)> {
        let resolver = EffectResolver::new(registry);

        if config.opening_hand_size == 0 {
            return Err(ValidationError::EmptyOpeningHand.into());
        }

        let mut seen = FxHashSet::default();
        for setup in &players {
            setup.deck.validate(config.opening_hand_size)?;
            if setup.energy_types.is_empty() {
                return Err(ValidationError::NoEnergyTypes.into());
            }
            for card in setup.deck.iter() {
                if !seen.insert(card.id) {
                    return Err(ValidationError::DuplicateInstance(card.id).into());
                }
                card.definition.validate(Some(resolver.registry()))?;
            }
        }

        let [first, second] = players;
        let players = PlayerMap::from_pair(
            PlayerState::new(first.name, first.deck, first.energy_types),
            PlayerState::new(second.name, second.deck, second.energy_types),
        );
        let (bus, responder) = EventBus::new();
        debug!("new match, seed {}", config.seed);

        let this = Self {
            state: GameState::new(players, config.seed),
            config,
            bus,
            broker: InteractionBroker::new(),
            resolver,
        };
        Ok((this, responder))
    }

    // === Accessors ===

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub fn turn(&self) -> u32 {
        self.state.turn
    }

    #[must_use]
    pub fn current_player(&self) -> PlayerId {
        self.state.current_player
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<GameOutcome> {
        self.state.outcome
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.state.winner()
    }

    /// Every event emitted so far.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        self.bus.history()
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<Event> {
        self.bus.subscribe()
    }

    /// Accepted decision responses, in order. Replaying them against a
    /// match with the same seed reproduces it.
    #[must_use]
    pub fn accepted_responses(&self) -> &[DecisionResponse] {
        self.bus.accepted_responses()
    }

    /// Responses the broker rejected so far.
    #[must_use]
    pub fn rejected_selections(&self) -> u64 {
        self.broker.rejected_count()
    }

    /// Encode the event log with bincode.
    pub fn encode_log(&self) -> Result<Vec<u8>> {
        self.bus.encode_log()
    }

    // === Setup ===

    /// Flip for the first player and deal both opening hands.
    ///
    /// Emits PHASE_CHANGE(initial_coin_flip), FLIP_COINS, PHASE_CHANGE(setup),
    /// then per player one SHUFFLE and one DRAW_CARD per card.
    pub fn start_game(&mut self) -> Result<()> {
        self.require_phase(Phase::InitialCoinFlip)?;

        self.emit_phase(None);

        let heads = self.state.rng.flip();
        self.emit(
            EventKind::FlipCoins,
            EventPayload::FlipCoins {
                player: None,
                flips: vec![heads],
            },
        );

        let first = if heads { PlayerId::new(0) } else { PlayerId::new(1) };
        self.state.first_player = first;
        self.state.current_player = first;
        self.state.phase = Phase::Setup;
        self.emit_phase(Some(first));
        debug!("{first} goes first");

        for player in [first, first.opponent()] {
            self.shuffle_deck(player);
            for _ in 0..self.config.opening_hand_size {
                // Deck size was validated against the opening hand.
                self.draw_card(player)?;
            }
        }
        Ok(())
    }

    /// Place each player's active and bench basics, then begin turn 1.
    ///
    /// A hand without a basic is shuffled back and redrawn until it has one.
    /// Blocks on the broker for every placement.
    pub fn place_basics(&mut self) -> Result<()> {
        self.require_phase(Phase::Setup)?;

        let first = self.state.first_player;
        for player in [first, first.opponent()] {
            self.mulligan(player)?;

            let basics = self.state.player(player).basics_in_hand();
            let params = SearchParams::choose_one(
                player,
                basics,
                "Choose a basic card to place as your active card",
                "place_active",
            );
            let selection = self.ask(InteractionKind::WaitForInput, params)?;
            for id in selection.ids {
                self.move_hand_to_active(player, id);
            }

            let basics = self.state.player(player).basics_in_hand();
            let free = self.state.player(player).free_bench_count(self.config.bench_slots);
            if !basics.is_empty() && free > 0 {
                let params = SearchParams::up_to(
                    player,
                    basics,
                    free,
                    "Choose basic cards to place on your bench",
                    "place_bench",
                );
                let selection = self.ask(InteractionKind::WaitForInput, params)?;
                for id in selection.ids {
                    self.move_hand_to_bench(player, id)?;
                }
            }

            // Seed the energy zone so the first rotation has a next energy.
            let next = self.random_energy(player);
            self.state.player_mut(player).next_energy = next;
            self.emit_energy_zone(player);
        }

        self.state.turn = 1;
        self.state.current_player = first;
        self.emit(
            EventKind::TurnChange,
            EventPayload::TurnChange { turn: 1, player: first },
        );
        self.draw_phase()
    }

    fn mulligan(&mut self, player: PlayerId) -> Result<()> {
        while self.state.player(player).basics_in_hand().is_empty() {
            debug!("{player} has no basic, mulligan");
            let state = self.state.player_mut(player);
            let hand: Vec<_> = state.hand.iter().cloned().collect();
            state.hand.clear();
            for card in hand {
                let card_ref = card.card_ref();
                self.state.player_mut(player).deck.push_bottom(card);
                self.emit(
                    EventKind::CardMove,
                    EventPayload::CardMove {
                        player,
                        card: card_ref,
                        from: Zone::Hand,
                        to: Zone::Deck,
                    },
                );
            }
            self.shuffle_deck(player);
            for _ in 0..self.config.opening_hand_size {
                self.draw_card(player)?;
            }
        }
        Ok(())
    }

    // === Turn flow ===

    /// Draw phase for the current player, then open the attack phase.
    pub(crate) fn draw_phase(&mut self) -> Result<()> {
        let player = self.state.current_player;
        let turn = self.state.turn;
        let opening_turn = turn == 1;

        self.state.phase = Phase::Draw;
        self.emit_phase(None);

        // Energy zone: the queued energy becomes current, a new one is queued.
        let rolled = self.random_energy(player);
        let state = self.state.player_mut(player);
        let queued = state.next_energy.take().or(rolled);
        state.next_energy = rolled;
        state.energy = if opening_turn && !self.config.first_turn_energy {
            None
        } else {
            queued
        };
        state.can_attach_energy = state.energy.is_some();
        state.can_attack = true;
        state.has_retreated = false;
        self.emit_energy_zone(player);

        if !(opening_turn && self.config.skip_first_draw) {
            match self.state.player_mut(player).draw_to_hand() {
                Ok(card) => {
                    let hand_size = self.state.player(player).hand.len();
                    self.emit(
                        EventKind::DrawCard,
                        EventPayload::DrawCard {
                            player,
                            card,
                            hand_size,
                        },
                    );
                }
                Err(_) => {
                    debug!("{player} cannot draw on turn {turn}");
                    self.end_game(GameResult::Winner(player.opponent()), EndReason::DeckOut);
                    return Ok(());
                }
            }
        }

        self.run_checks()?;
        if self.state.is_over() {
            return Ok(());
        }

        self.state.phase = Phase::Attack;
        self.emit_phase(None);
        Ok(())
    }

    /// Close the current turn: upkeep, expiry, checks, then the next draw.
    pub(crate) fn finish_turn(&mut self) -> Result<()> {
        let ending = self.state.current_player;
        let turn = self.state.turn;

        self.state.phase = Phase::BetweenTurns;
        self.emit_phase(None);

        for player in [ending, ending.opponent()] {
            self.status_upkeep(player, player == ending);
        }

        for (_, state) in self.state.players.iter_mut() {
            state.for_each_in_play(|card| {
                if !card.immunity.is_empty() && card.immunity_expires <= turn {
                    card.immunity = Immunity::NONE;
                }
                if card.cant_attack_on_turn.is_some_and(|t| t <= turn) {
                    card.cant_attack_on_turn = None;
                }
            });
        }

        self.run_checks()?;
        if self.state.is_over() {
            return Ok(());
        }

        let next = ending.opponent();
        self.state.turn += 1;
        self.state.current_player = next;
        self.emit(
            EventKind::TurnChange,
            EventPayload::TurnChange {
                turn: self.state.turn,
                player: next,
            },
        );
        debug!("turn {} for {next}", self.state.turn);
        self.draw_phase()
    }

    /// Apply between-turns status effects to `player`'s active card.
    fn status_upkeep(&mut self, player: PlayerId, turn_ended: bool) {
        let GameState { players, rng, .. } = &mut self.state;
        let Some(card) = players.get_mut(player).active.as_mut() else {
            return;
        };
        let Some(status) = card.status else {
            return;
        };

        let (damage, cleared) = match status {
            StatusCondition::Poisoned => (10, false),
            StatusCondition::Burned => (20, rng.flip()),
            StatusCondition::Asleep => (0, rng.flip()),
            StatusCondition::Paralyzed if turn_ended => (0, true),
            StatusCondition::Paralyzed | StatusCondition::Confused => return,
        };

        card.apply_damage(damage);
        if cleared {
            card.status = None;
        }
        let card = card.card_ref();
        self.emit(
            EventKind::StatusUpkeep,
            EventPayload::StatusUpkeep {
                player,
                card,
                status,
                damage,
                cleared,
            },
        );
    }

    /// Record the outcome and move to `GameEnd`.
    pub(crate) fn end_game(&mut self, result: GameResult, reason: EndReason) {
        self.state.outcome = Some(GameOutcome { result, reason });
        self.state.phase = Phase::GameEnd;
        info!("game over after turn {}: {result:?} ({reason:?})", self.state.turn);
        self.emit(
            EventKind::GameEnd,
            EventPayload::GameEnd {
                winner: result.winner(),
                reason,
            },
        );
    }

    // === Helpers ===

    pub(crate) fn emit(&mut self, kind: EventKind, payload: EventPayload) {
        self.bus.emit(Event::new(kind, payload));
    }

    fn emit_energy_zone(&mut self, player: PlayerId) {
        let state = self.state.player(player);
        let payload = EventPayload::EnergyZone {
            player,
            current: state.energy,
            next: state.next_energy,
        };
        self.emit(EventKind::EnergyZone, payload);
    }

    fn emit_phase(&mut self, first_player: Option<PlayerId>) {
        let phase = self.state.phase;
        debug!("phase {phase}");
        self.emit(EventKind::PhaseChange, EventPayload::PhaseChange { phase, first_player });
    }

    /// Block on the broker.
    pub(crate) fn ask(&mut self, kind: InteractionKind, params: SearchParams) -> Result<Selection> {
        self.broker.request(&mut self.bus, kind, params)
    }

    /// Fail unless the match is live and in `phase`.
    pub(crate) fn require_phase(&self, phase: Phase) -> Result<()> {
        if self.state.is_over() {
            return Err(RuleViolation::GameOver.into());
        }
        if self.state.phase != phase {
            return Err(RuleViolation::WrongPhase {
                expected: phase,
                actual: self.state.phase,
            }
            .into());
        }
        Ok(())
    }

    /// Fail unless it is `player`'s attack phase.
    pub(crate) fn require_turn(&self, player: PlayerId) -> Result<()> {
        self.require_phase(Phase::Attack)?;
        if player != self.state.current_player {
            return Err(RuleViolation::NotYourTurn(player).into());
        }
        Ok(())
    }

    pub(crate) fn shuffle_deck(&mut self, player: PlayerId) {
        let GameState { players, rng, .. } = &mut self.state;
        let deck = &mut players.get_mut(player).deck;
        deck.shuffle(rng);
        let deck_size = deck.len();
        self.emit(EventKind::Shuffle, EventPayload::Shuffle { player, deck_size });
    }

    /// Draw one card into the hand and emit DRAW_CARD.
    pub(crate) fn draw_card(&mut self, player: PlayerId) -> Result<()> {
        let card = self.state.player_mut(player).draw_to_hand()?;
        let hand_size = self.state.player(player).hand.len();
        self.emit(
            EventKind::DrawCard,
            EventPayload::DrawCard {
                player,
                card,
                hand_size,
            },
        );
        Ok(())
    }

    fn random_energy(&mut self, player: PlayerId) -> Option<EnergyType> {
        let GameState { players, rng, .. } = &mut self.state;
        rng.choose(players.get(player).energy_types.as_slice()).copied()
    }

    fn move_hand_to_active(&mut self, player: PlayerId, id: EntityId) {
        let state = self.state.player_mut(player);
        if let Some(card) = state.take_from_hand(id) {
            let card_ref = card.card_ref();
            state.active = Some(card);
            self.emit(
                EventKind::CardMove,
                EventPayload::CardMove {
                    player,
                    card: card_ref,
                    from: Zone::Hand,
                    to: Zone::Active,
                },
            );
        }
    }

    /// Move a hand card to the lowest free bench slot.
    pub(crate) fn move_hand_to_bench(&mut self, player: PlayerId, id: EntityId) -> Result<usize> {
        let bench_slots = self.config.bench_slots;
        let state = self.state.player_mut(player);
        let slot = state.free_bench_slot(bench_slots).ok_or(RuleViolation::BenchFull)?;
        let card = state.take_from_hand(id).ok_or(RuleViolation::NotInHand(id))?;
        let card_ref = card.card_ref();
        state.bench.insert(slot, card);
        self.emit(
            EventKind::CardMove,
            EventPayload::CardMove {
                player,
                card: card_ref,
                from: Zone::Hand,
                to: Zone::Bench(slot),
            },
        );
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardInstance};
    use crate::error::EngineError;

    fn deck(start: u32, size: u32) -> Deck {
        let basic = Arc::new(CardDefinition::new("Bulbasaur", 70, EnergyType::Grass));
        Deck::from_cards((start..start + size).map(|i| CardInstance::new(EntityId(i), basic.clone())))
    }

    fn new_match(config: MatchConfig) -> (Match, Responder) {
        Match::new(
            config,
            Arc::new(CustomEffectRegistry::with_builtins()),
            [
                PlayerSetup::new("Ash", deck(1, 20), [EnergyType::Grass]),
                PlayerSetup::new("Gary", deck(101, 20), [EnergyType::Grass]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_shared_ids() {
        let result = Match::new(
            MatchConfig::new(1),
            Arc::new(CustomEffectRegistry::with_builtins()),
            [
                PlayerSetup::new("Ash", deck(1, 20), [EnergyType::Grass]),
                PlayerSetup::new("Gary", deck(20, 20), [EnergyType::Grass]),
            ],
        );
        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::DuplicateInstance(EntityId(20))))
        ));
    }

    #[test]
    fn test_new_rejects_missing_energy_types() {
        let result = Match::new(
            MatchConfig::new(1),
            Arc::new(CustomEffectRegistry::with_builtins()),
            [
                PlayerSetup::new("Ash", deck(1, 20), [EnergyType::Grass]),
                PlayerSetup::new("Gary", deck(101, 20), []),
            ],
        );
        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::NoEnergyTypes))
        ));
    }

    #[test]
    fn test_new_rejects_empty_opening_hand() {
        let result = Match::new(
            MatchConfig::new(1).with_opening_hand_size(0),
            Arc::new(CustomEffectRegistry::with_builtins()),
            [
                PlayerSetup::new("Ash", deck(1, 20), [EnergyType::Grass]),
                PlayerSetup::new("Gary", deck(101, 20), [EnergyType::Grass]),
            ],
        );
        assert!(matches!(
            result,
            Err(EngineError::Validation(ValidationError::EmptyOpeningHand))
        ));
    }

    #[test]
    fn test_start_game_twice_fails() {
        let (mut game, _responder) = new_match(MatchConfig::new(3));
        game.start_game().unwrap();
        assert_eq!(game.phase(), Phase::Setup);

        let err = game.start_game().unwrap_err();
        assert_eq!(
            err.as_rule(),
            Some(&RuleViolation::WrongPhase {
                expected: Phase::InitialCoinFlip,
                actual: Phase::Setup
            })
        );
    }

    #[test]
    fn test_place_basics_enters_attack_phase() {
        let (mut game, responder) = new_match(MatchConfig::new(11));
        game.start_game().unwrap();

        let first = game.state().first_player;
        for player in [first, first.opponent()] {
            let hand: Vec<EntityId> = game.state().player(player).hand.iter().map(|c| c.id).collect();
            responder.select(player, [hand[0]]).unwrap();
            responder.select(player, [hand[1], hand[2]]).unwrap();
        }
        game.place_basics().unwrap();

        assert_eq!(game.phase(), Phase::Attack);
        assert_eq!(game.turn(), 1);
        assert_eq!(game.current_player(), first);
        assert_eq!(game.state().player(first).bench.len(), 2);
        // First player drew on turn 1 but gets no energy.
        assert_eq!(game.state().player(first).hand.len(), 5);
        assert_eq!(game.state().player(first).energy, None);
        assert!(game.state().player(first).next_energy.is_some());
    }

    #[test]
    fn test_mulligan_until_basic() {
        let basic = Arc::new(CardDefinition::new("Pichu", 30, EnergyType::Lightning));
        let stage1 = Arc::new(
            CardDefinition::new("Raichu", 100, EnergyType::Lightning).with_stage(crate::cards::Stage::Stage1),
        );
        // Seven evolutions on top, one basic at the bottom.
        let cards = (1..=7)
            .map(|i| CardInstance::new(EntityId(i), stage1.clone()))
            .chain(std::iter::once(CardInstance::new(EntityId(8), basic.clone())));
        let (mut game, responder) = Match::new(
            MatchConfig::new(5),
            Arc::new(CustomEffectRegistry::with_builtins()),
            [
                PlayerSetup::new("Ash", Deck::from_cards(cards), [EnergyType::Lightning]),
                PlayerSetup::new("Gary", deck(101, 20), [EnergyType::Lightning]),
            ],
        )
        .unwrap();
        game.state.first_player = PlayerId::new(0);
        game.state.phase = Phase::Setup;
        for _ in 0..7 {
            game.draw_card(PlayerId::new(0)).unwrap();
        }
        game.mulligan(PlayerId::new(0)).unwrap();

        assert!(game.state().player(PlayerId::new(0)).hand_card(EntityId(8)).is_some());
        let returned = game
            .events()
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::CardMove { from: Zone::Hand, to: Zone::Deck, .. }))
            .count();
        assert!(returned >= 7);
        assert_eq!(returned % 7, 0);
        drop(responder);
    }
}
