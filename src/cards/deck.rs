//! Decks - ordered stacks of card instances.
//!
//! The top of the deck is the front of the vector. Backed by `im::Vector` so a
//! whole-match snapshot costs a pointer copy.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::catalog::CardCatalog;
use super::instance::CardInstance;
use crate::core::{EntityAllocator, EntityId, GameRng};
use crate::error::{EmptyDeckError, ValidationError};

/// An ordered deck.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vector<CardInstance>,
}

impl Deck {
    /// Create an empty deck.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a deck from instances, first item on top.
    pub fn from_cards(cards: impl IntoIterator<Item = CardInstance>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    /// Instantiate one card per name from `catalog`.
    ///
    /// Every instance gets a fresh id from `ids`, so the same name listed
    /// twice yields two distinct cards.
    pub fn from_catalog<S: AsRef<str>>(
        catalog: &CardCatalog,
        names: &[S],
        ids: &mut EntityAllocator,
    ) -> Result<Self, ValidationError> {
        let mut cards = Vector::new();
        for name in names {
            let definition = catalog.get(name.as_ref())?;
            cards.push_back(CardInstance::new(ids.alloc(), definition));
        }
        Ok(Self { cards })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Take the top card.
    pub fn draw(&mut self) -> Result<CardInstance, EmptyDeckError> {
        self.cards.pop_front().ok_or(EmptyDeckError)
    }

    /// Put a card on the bottom.
    pub fn push_bottom(&mut self, card: CardInstance) {
        self.cards.push_back(card);
    }

    /// Remove a specific card, wherever it sits.
    pub fn remove(&mut self, id: EntityId) -> Option<CardInstance> {
        let index = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(index))
    }

    /// Shuffle in place.
    pub fn shuffle(&mut self, rng: &mut GameRng) {
        let mut cards: Vec<CardInstance> = self.cards.iter().cloned().collect();
        rng.shuffle(&mut cards);
        self.cards = cards.into_iter().collect();
    }

    /// Iterate top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &CardInstance> {
        self.cards.iter()
    }

    /// Instance ids, top to bottom.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.cards.iter().map(|c| c.id).collect()
    }

    #[must_use]
    pub fn has_basic(&self) -> bool {
        self.cards.iter().any(CardInstance::is_basic)
    }

    /// Check the deck can start a match needing `opening_hand` cards.
    pub fn validate(&self, opening_hand: usize) -> Result<(), ValidationError> {
        if self.len() < opening_hand {
            return Err(ValidationError::DeckTooSmall {
                size: self.len(),
                required: opening_hand,
            });
        }
        if !self.has_basic() {
            return Err(ValidationError::NoBasicInDeck);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, EnergyType, Stage};
    use std::sync::Arc;

    fn deck_of(n: u32) -> Deck {
        let def = Arc::new(CardDefinition::new("Bulbasaur", 70, EnergyType::Grass));
        Deck::from_cards((1..=n).map(|i| CardInstance::new(EntityId(i), def.clone())))
    }

    #[test]
    fn test_draw_takes_top() {
        let mut deck = deck_of(3);
        assert_eq!(deck.draw().unwrap().id, EntityId(1));
        assert_eq!(deck.len(), 2);
    }

    #[test]
    fn test_draw_empty() {
        let mut deck = Deck::new();
        assert_eq!(deck.draw(), Err(EmptyDeckError));
    }

    #[test]
    fn test_remove_by_id() {
        let mut deck = deck_of(5);
        let card = deck.remove(EntityId(3)).unwrap();
        assert_eq!(card.id, EntityId(3));
        assert_eq!(deck.ids(), vec![EntityId(1), EntityId(2), EntityId(4), EntityId(5)]);
        assert!(deck.remove(EntityId(3)).is_none());
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let mut a = deck_of(20);
        let mut b = deck_of(20);
        a.shuffle(&mut GameRng::new(11));
        b.shuffle(&mut GameRng::new(11));
        assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            deck_of(3).validate(7),
            Err(ValidationError::DeckTooSmall { size: 3, required: 7 })
        );
        assert!(deck_of(7).validate(7).is_ok());

        let evolved = Arc::new(
            CardDefinition::new("Ivysaur", 90, EnergyType::Grass).with_stage(Stage::Stage1),
        );
        let deck = Deck::from_cards((1..=8).map(|i| CardInstance::new(EntityId(i), evolved.clone())));
        assert_eq!(deck.validate(7), Err(ValidationError::NoBasicInDeck));
    }
}
