//! Card instances - runtime card state.
//!
//! `CardInstance` represents one physical card in a match. The definition is
//! shared; everything that changes during play (damage, attached energy,
//! status, temporary immunities) lives on the instance.
//!
//! Instances are moved between zones, never copied: a card is in exactly one
//! zone across both players at any time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::definition::{CardDefinition, EnergyType};
use crate::core::EntityId;
use crate::effects::{Immunity, StatusCondition};

/// Lightweight reference to a card for events and prompts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub id: EntityId,
    pub name: String,
}

/// A card instance in a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardInstance {
    /// Unique id for this instance.
    pub id: EntityId,

    /// Shared immutable definition.
    pub definition: Arc<CardDefinition>,

    /// Damage taken. Knocked out once `damage >= hp`.
    pub damage: i64,

    /// Energy attached to this card, in attach order.
    pub attached: SmallVec<[EnergyType; 4]>,

    /// Current status condition. One slot; a new status replaces the old.
    pub status: Option<StatusCondition>,

    /// Immunity bits currently granted.
    pub immunity: Immunity,

    /// Last turn the immunity is in force.
    pub immunity_expires: u32,

    /// Turn on which this card cannot attack.
    pub cant_attack_on_turn: Option<u32>,
}

impl CardInstance {
    /// Create a fresh instance of `definition`.
    #[must_use]
    pub fn new(id: EntityId, definition: Arc<CardDefinition>) -> Self {
        Self {
            id,
            definition,
            damage: 0,
            attached: SmallVec::new(),
            status: None,
            immunity: Immunity::NONE,
            immunity_expires: 0,
            cant_attack_on_turn: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.definition.is_basic()
    }

    /// HP left before knockout.
    #[must_use]
    pub fn remaining_hp(&self) -> i64 {
        self.definition.hp - self.damage
    }

    #[must_use]
    pub fn is_knocked_out(&self) -> bool {
        self.remaining_hp() <= 0
    }

    /// Add damage. Negative amounts heal, never below zero damage.
    pub fn apply_damage(&mut self, amount: i64) {
        self.damage = (self.damage + amount).max(0);
    }

    /// Whether any of `bits` are currently granted.
    #[must_use]
    pub fn is_immune(&self, bits: Immunity) -> bool {
        self.immunity.intersects(bits)
    }

    /// Reference for events and prompts.
    #[must_use]
    pub fn card_ref(&self) -> CardRef {
        CardRef {
            id: self.id,
            name: self.definition.name.clone(),
        }
    }

    /// Remove up to `count` attached energy, newest first.
    pub fn detach_energy(&mut self, count: usize) -> SmallVec<[EnergyType; 4]> {
        let keep = self.attached.len().saturating_sub(count);
        self.attached.drain(keep..).collect()
    }

    /// Reset everything that does not survive leaving play.
    pub fn reset(&mut self) {
        self.damage = 0;
        self.attached.clear();
        self.status = None;
        self.immunity = Immunity::NONE;
        self.immunity_expires = 0;
        self.cant_attack_on_turn = None;
    }
}
