//! Match state.
//!
//! ## PlayerState
//!
//! One player's side of the table:
//! - Zones: hand, bench, active, deck, discard
//! - Energy zone (`energy`, `next_energy`) and the deck's energy types
//! - Points and per-turn flags
//!
//! ## GameState
//!
//! Both players plus phase, turn counter, current/first player, outcome
//! and the match RNG.
//!
//! Zones use `im` persistent collections, so cloning a whole `GameState`
//! for a snapshot is cheap.

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::entity::EntityId;
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;
use crate::cards::{CardInstance, CardRef, Deck, EnergyType};
use crate::error::EmptyDeckError;

/// Match phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    InitialCoinFlip,
    Setup,
    Draw,
    Attack,
    BetweenTurns,
    GameEnd,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::InitialCoinFlip => "initial_coin_flip",
            Phase::Setup => "setup",
            Phase::Draw => "draw",
            Phase::Attack => "attack",
            Phase::BetweenTurns => "between_turns",
            Phase::GameEnd => "game_end",
        };
        f.write_str(name)
    }
}

/// Result of a completed match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    /// Single winner.
    Winner(PlayerId),
    /// Draw (no winner).
    Draw,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        matches!(self, GameResult::Winner(p) if *p == player)
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            GameResult::Winner(p) => Some(*p),
            GameResult::Draw => None,
        }
    }
}

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Reached the point target.
    Points,
    /// The loser had no card to promote to active.
    NoActive,
    /// The loser had to draw from an empty deck.
    DeckOut,
    Concede,
    Aborted,
}

/// Final outcome stored on the state once the match ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub result: GameResult,
    pub reason: EndReason,
}

/// One player's side of the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,

    // === Zones ===
    pub hand: Vector<CardInstance>,
    /// Bench slot index to card. Slots are unique.
    pub bench: OrdMap<usize, CardInstance>,
    pub active: Option<CardInstance>,
    pub deck: Deck,
    pub discard: Vector<CardInstance>,

    // === Energy ===
    /// Energy available to attach this turn.
    pub energy: Option<EnergyType>,
    /// Energy that arrives next turn.
    pub next_energy: Option<EnergyType>,
    /// Types the energy zone generates from.
    pub energy_types: SmallVec<[EnergyType; 4]>,

    // === Score and turn flags ===
    pub points: u32,
    pub can_attach_energy: bool,
    pub can_attack: bool,
    pub has_retreated: bool,
}

impl PlayerState {
    /// Create a player with a full deck and empty zones.
    ///
    /// Turn flags start cleared; the draw phase sets them.
    pub fn new(
        name: impl Into<String>,
        deck: Deck,
        energy_types: impl IntoIterator<Item = EnergyType>,
    ) -> Self {
        Self {
            name: name.into(),
            hand: Vector::new(),
            bench: OrdMap::new(),
            active: None,
            deck,
            discard: Vector::new(),
            energy: None,
            next_energy: None,
            energy_types: energy_types.into_iter().collect(),
            points: 0,
            can_attach_energy: false,
            can_attack: false,
            has_retreated: false,
        }
    }

    // === Hand ===

    /// Move the top card of the deck into the hand.
    pub fn draw_to_hand(&mut self) -> Result<CardRef, EmptyDeckError> {
        let card = self.deck.draw()?;
        let card_ref = card.card_ref();
        self.hand.push_back(card);
        Ok(card_ref)
    }

    #[must_use]
    pub fn hand_card(&self, id: EntityId) -> Option<&CardInstance> {
        self.hand.iter().find(|c| c.id == id)
    }

    /// Remove a card from the hand.
    pub fn take_from_hand(&mut self, id: EntityId) -> Option<CardInstance> {
        let index = self.hand.iter().position(|c| c.id == id)?;
        Some(self.hand.remove(index))
    }

    #[must_use]
    pub fn basics_in_hand(&self) -> Vec<EntityId> {
        self.hand.iter().filter(|c| c.is_basic()).map(|c| c.id).collect()
    }

    // === Bench ===

    /// Lowest free bench slot, if any.
    #[must_use]
    pub fn free_bench_slot(&self, bench_slots: usize) -> Option<usize> {
        (0..bench_slots).find(|slot| !self.bench.contains_key(slot))
    }

    #[must_use]
    pub fn free_bench_count(&self, bench_slots: usize) -> usize {
        bench_slots.saturating_sub(self.bench.len())
    }

    /// Slot holding the given card.
    #[must_use]
    pub fn bench_slot_of(&self, id: EntityId) -> Option<usize> {
        self.bench.iter().find(|(_, c)| c.id == id).map(|(slot, _)| *slot)
    }

    // === Play area ===

    /// Active card followed by the bench in slot order.
    pub fn in_play(&self) -> impl Iterator<Item = &CardInstance> {
        self.active.iter().chain(self.bench.values())
    }

    #[must_use]
    pub fn in_play_card(&self, id: EntityId) -> Option<&CardInstance> {
        self.in_play().find(|c| c.id == id)
    }

    pub fn in_play_card_mut(&mut self, id: EntityId) -> Option<&mut CardInstance> {
        if self.active.as_ref().is_some_and(|c| c.id == id) {
            return self.active.as_mut();
        }
        let slot = self.bench_slot_of(id)?;
        self.bench.get_mut(&slot)
    }

    /// Visit every card in play mutably, active first.
    pub fn for_each_in_play(&mut self, mut f: impl FnMut(&mut CardInstance)) {
        if let Some(active) = self.active.as_mut() {
            f(active);
        }
        let slots: Vec<usize> = self.bench.keys().copied().collect();
        for slot in slots {
            if let Some(card) = self.bench.get_mut(&slot) {
                f(card);
            }
        }
    }

    /// Cards that can be promoted to active: bench first, then hand basics.
    #[must_use]
    pub fn promotion_candidates(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.bench.values().map(|c| c.id).collect();
        ids.extend(self.basics_in_hand());
        ids
    }

    /// Put a card on the discard pile, clearing its battle state.
    pub fn discard_card(&mut self, mut card: CardInstance) {
        card.reset();
        self.discard.push_back(card);
    }

    /// Number of cards across all zones.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.hand.len()
            + self.bench.len()
            + usize::from(self.active.is_some())
            + self.deck.len()
            + self.discard.len()
    }

    /// Ids of every card this player owns, in no particular order.
    #[must_use]
    pub fn all_ids(&self) -> Vec<EntityId> {
        self.hand
            .iter()
            .chain(self.in_play())
            .chain(self.deck.iter())
            .chain(self.discard.iter())
            .map(|c| c.id)
            .collect()
    }
}

/// Complete match state.
///
/// Owned by the `Match`; outside code only ever sees `&GameState`.
#[derive(Clone, Debug)]
pub struct GameState {
    pub phase: Phase,
    pub players: PlayerMap<PlayerState>,
    /// Turn number. Zero during setup, 1 on the first draw.
    pub turn: u32,
    pub current_player: PlayerId,
    pub first_player: PlayerId,
    pub outcome: Option<GameOutcome>,
    pub rng: GameRng,
}

impl GameState {
    /// Create a state in the initial coin-flip phase.
    #[must_use]
    pub fn new(players: PlayerMap<PlayerState>, seed: u64) -> Self {
        Self {
            phase: Phase::InitialCoinFlip,
            players,
            turn: 0,
            current_player: PlayerId::new(0),
            first_player: PlayerId::new(0),
            outcome: None,
            rng: GameRng::new(seed),
        }
    }

    #[must_use]
    pub fn player(&self, player: PlayerId) -> &PlayerState {
        &self.players[player]
    }

    pub fn player_mut(&mut self, player: PlayerId) -> &mut PlayerState {
        &mut self.players[player]
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameEnd
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.outcome.and_then(|o| o.result.winner())
    }

    /// Find which player owns a card, wherever it is.
    #[must_use]
    pub fn owner_of(&self, id: EntityId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, p)| p.all_ids().contains(&id))
            .map(|(player, _)| player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, Stage};
    use std::sync::Arc;

    fn player_with(n: u32) -> PlayerState {
        let basic = Arc::new(CardDefinition::new("Squirtle", 60, EnergyType::Water));
        let deck = Deck::from_cards((1..=n).map(|i| CardInstance::new(EntityId(i), basic.clone())));
        PlayerState::new("Misty", deck, [EnergyType::Water])
    }

    #[test]
    fn test_draw_moves_card() {
        let mut player = player_with(3);
        let drawn = player.draw_to_hand().unwrap();

        assert_eq!(drawn.id, EntityId(1));
        assert_eq!(player.hand.len(), 1);
        assert_eq!(player.deck.len(), 2);
        assert_eq!(player.card_count(), 3);
    }

    #[test]
    fn test_draw_empty_deck() {
        let mut player = player_with(0);
        assert_eq!(player.draw_to_hand(), Err(EmptyDeckError));
    }

    #[test]
    fn test_bench_slots() {
        let mut player = player_with(4);
        for _ in 0..4 {
            player.draw_to_hand().unwrap();
        }

        assert_eq!(player.free_bench_slot(3), Some(0));
        let card = player.take_from_hand(EntityId(2)).unwrap();
        player.bench.insert(0, card);
        let card = player.take_from_hand(EntityId(3)).unwrap();
        player.bench.insert(2, card);

        assert_eq!(player.free_bench_slot(3), Some(1));
        assert_eq!(player.free_bench_count(3), 1);
        assert_eq!(player.bench_slot_of(EntityId(3)), Some(2));
        assert_eq!(player.card_count(), 4);
    }

    #[test]
    fn test_promotion_candidates() {
        let mut player = player_with(3);
        let stage1 = Arc::new(
            CardDefinition::new("Wartortle", 80, EnergyType::Water).with_stage(Stage::Stage1),
        );
        player.hand.push_back(CardInstance::new(EntityId(10), stage1));
        player.draw_to_hand().unwrap();
        let benched = player.deck.draw().unwrap();
        player.bench.insert(1, benched);

        assert_eq!(player.promotion_candidates(), vec![EntityId(2), EntityId(1)]);
    }

    #[test]
    fn test_discard_resets_card() {
        let mut player = player_with(1);
        let mut card = player.deck.draw().unwrap();
        card.apply_damage(50);
        player.discard_card(card);

        assert_eq!(player.discard[0].damage, 0);
    }

    #[test]
    fn test_owner_of() {
        let state = GameState::new(
            PlayerMap::from_pair(player_with(2), {
                let def = Arc::new(CardDefinition::new("Onix", 110, EnergyType::Fighting));
                let deck = Deck::from_cards([CardInstance::new(EntityId(50), def)]);
                PlayerState::new("Brock", deck, [EnergyType::Fighting])
            }),
            1,
        );

        assert_eq!(state.owner_of(EntityId(2)), Some(PlayerId::new(0)));
        assert_eq!(state.owner_of(EntityId(50)), Some(PlayerId::new(1)));
        assert_eq!(state.owner_of(EntityId(99)), None);
        assert_eq!(state.phase, Phase::InitialCoinFlip);
        assert_eq!(state.turn, 0);
    }
}
