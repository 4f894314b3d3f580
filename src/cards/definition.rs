//! Card definitions - static card data.
//!
//! `CardDefinition` holds the immutable properties of a card: HP, type,
//! attacks, retreat cost. Definitions are shared between every instance of
//! the same card behind an `Arc`.
//!
//! Instance-specific data (damage taken, attached energy, status) is stored
//! separately in `CardInstance`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::effects::{CustomEffectRegistry, Effect};
use crate::error::ValidationError;

/// Elemental type of a card, an energy, or a cost symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyType {
    Grass,
    Fire,
    Water,
    #[serde(alias = "lighting")]
    Lightning,
    Psychic,
    Fighting,
    #[serde(alias = "dark")]
    Darkness,
    Metal,
    Dragon,
    Fairy,
    /// In a cost, payable by any energy.
    Colorless,
}

/// Card rarity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    #[serde(rename = "diamond_1")]
    Diamond1,
    #[serde(rename = "diamond_2")]
    Diamond2,
    #[serde(rename = "diamond_3")]
    Diamond3,
    #[serde(rename = "diamond_4")]
    Diamond4,
    #[serde(rename = "star_1", alias = "star-1")]
    Star1,
    #[serde(rename = "star_2", alias = "star-2")]
    Star2,
    #[serde(rename = "star_3", alias = "star-3")]
    Star3,
    Crown,
}

/// Evolution stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Basic,
    #[serde(rename = "stage_1", alias = "stage1")]
    Stage1,
    #[serde(rename = "stage_2", alias = "stage2")]
    Stage2,
}

/// Energy cost of an attack, in printed order.
pub type EnergyCost = SmallVec<[EnergyType; 4]>;

/// A card attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    pub cost: EnergyCost,
    /// Printed damage, added on top of whatever the effect contributes.
    #[serde(default)]
    pub damage: i64,
    pub effect: Effect,
}

impl Attack {
    /// An attack with only printed damage.
    pub fn new(name: impl Into<String>, cost: impl IntoIterator<Item = EnergyType>, damage: i64) -> Self {
        Self {
            name: name.into(),
            cost: cost.into_iter().collect(),
            damage,
            effect: Effect::Basic { base_damage: 0 },
        }
    }

    /// Replace the attack's effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Whether `attached` energy pays this attack's cost.
    #[must_use]
    pub fn is_payable(&self, attached: &[EnergyType]) -> bool {
        cost_satisfied(&self.cost, attached)
    }
}

/// Check whether `attached` energy covers `cost`.
///
/// Typed symbols are matched first; colorless symbols take whatever is left.
#[must_use]
pub fn cost_satisfied(cost: &[EnergyType], attached: &[EnergyType]) -> bool {
    let mut pool: SmallVec<[EnergyType; 8]> = attached.iter().copied().collect();
    let mut colorless = 0;

    for symbol in cost {
        if *symbol == EnergyType::Colorless {
            colorless += 1;
            continue;
        }
        match pool.iter().position(|e| e == symbol) {
            Some(idx) => {
                pool.swap_remove(idx);
            }
            None => return false,
        }
    }

    pool.len() >= colorless
}

/// Static card definition.
///
/// ## Example
///
/// ```
/// use rust_tcg::cards::{Attack, CardDefinition, EnergyType};
///
/// let pikachu = CardDefinition::new("Pikachu", 60, EnergyType::Lightning)
///     .with_retreat(1)
///     .with_weakness(EnergyType::Fighting)
///     .with_attack(Attack::new("Gnaw", [EnergyType::Lightning], 20));
///
/// assert!(pikachu.validate(None).is_ok());
/// assert!(pikachu.is_basic());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub name: String,
    pub hp: i64,
    pub card_type: EnergyType,
    pub rarity: Rarity,
    pub retreat: u32,
    pub weakness: Option<EnergyType>,
    pub attacks: Vec<Attack>,
    pub stage: Stage,
    /// Set code, informational.
    pub set: String,
}

impl CardDefinition {
    /// Create a new basic card definition with no attacks.
    #[must_use]
    pub fn new(name: impl Into<String>, hp: i64, card_type: EnergyType) -> Self {
        Self {
            name: name.into(),
            hp,
            card_type,
            rarity: Rarity::default(),
            retreat: 0,
            weakness: None,
            attacks: Vec::new(),
            stage: Stage::Basic,
            set: String::new(),
        }
    }

    #[must_use]
    pub fn with_attack(mut self, attack: Attack) -> Self {
        self.attacks.push(attack);
        self
    }

    #[must_use]
    pub fn with_retreat(mut self, retreat: u32) -> Self {
        self.retreat = retreat;
        self
    }

    #[must_use]
    pub fn with_weakness(mut self, weakness: EnergyType) -> Self {
        self.weakness = Some(weakness);
        self
    }

    #[must_use]
    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    #[must_use]
    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = set.into();
        self
    }

    /// Whether this card can be put into play directly.
    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.stage == Stage::Basic
    }

    /// Check the definition before it enters a deck.
    ///
    /// With a registry, custom effect ids are resolved as well; an unknown
    /// id is a `ValidationError::Configuration`.
    pub fn validate(&self, registry: Option<&CustomEffectRegistry>) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.hp <= 0 {
            return Err(ValidationError::NonPositiveHp(self.name.clone()));
        }
        for (index, attack) in self.attacks.iter().enumerate() {
            if attack.name.trim().is_empty() {
                return Err(ValidationError::UnnamedAttack {
                    card: self.name.clone(),
                    attack: index,
                });
            }
            attack.effect.validate(registry)?;
        }
        Ok(())
    }
}
