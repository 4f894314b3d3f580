//! Effect definitions.
//!
//! Every attack carries exactly one `Effect`. Effects form a small tree
//! (`CoinFlip` branches, `Batch` sequences) and are validated as a whole when
//! the card is loaded, so resolution never meets a malformed effect.
//!
//! ## Wire format
//!
//! Effects are internally tagged by `type`:
//!
//! ```
//! use rust_tcg::effects::{Effect, EffectTarget, StatusCondition};
//!
//! let effect: Effect = serde_json::from_str(
//!     r#"{"type": "status", "status": "poisoned"}"#,
//! ).unwrap();
//!
//! assert_eq!(
//!     effect,
//!     Effect::status(StatusCondition::Poisoned, EffectTarget::Opponent),
//! );
//! ```

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use super::params::EffectParams;
use super::registry::CustomEffectRegistry;
use crate::error::ValidationError;

/// Status conditions. A card holds at most one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCondition {
    Asleep,
    Confused,
    Paralyzed,
    Poisoned,
    Burned,
}

impl StatusCondition {
    /// Whether this condition stops the card from attacking or retreating.
    #[must_use]
    pub const fn immobilizes(self) -> bool {
        matches!(self, StatusCondition::Asleep | StatusCondition::Paralyzed)
    }
}

/// Which side an effect lands on, relative to the attacker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    /// The attacker's own active card.
    #[default]
    #[serde(rename = "self")]
    User,
    /// The defending active card.
    Opponent,
}

impl EffectTarget {
    fn opponent() -> Self {
        EffectTarget::Opponent
    }
}

/// Single immunity flag, the serialized form of `Immunity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmunityFlag {
    Damage,
    Status,
    EnergyRemove,
    All,
}

/// Set of immunity bits.
///
/// Serialized as a list of flags, e.g. `["damage", "status"]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<ImmunityFlag>", into = "Vec<ImmunityFlag>")]
pub struct Immunity(u8);

impl Immunity {
    pub const NONE: Immunity = Immunity(0);
    pub const DAMAGE: Immunity = Immunity(1);
    pub const STATUS: Immunity = Immunity(1 << 1);
    pub const ENERGY_REMOVE: Immunity = Immunity(1 << 2);
    pub const ALL: Immunity = Immunity(0b111);

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Immunity) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Immunity) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Immunity) -> Immunity {
        Immunity(self.0 | other.0)
    }
}

impl BitOr for Immunity {
    type Output = Immunity;

    fn bitor(self, rhs: Immunity) -> Immunity {
        self.union(rhs)
    }
}

impl BitOrAssign for Immunity {
    fn bitor_assign(&mut self, rhs: Immunity) {
        *self = self.union(rhs);
    }
}

impl From<ImmunityFlag> for Immunity {
    fn from(flag: ImmunityFlag) -> Self {
        match flag {
            ImmunityFlag::Damage => Immunity::DAMAGE,
            ImmunityFlag::Status => Immunity::STATUS,
            ImmunityFlag::EnergyRemove => Immunity::ENERGY_REMOVE,
            ImmunityFlag::All => Immunity::ALL,
        }
    }
}

impl From<Vec<ImmunityFlag>> for Immunity {
    fn from(flags: Vec<ImmunityFlag>) -> Self {
        flags.into_iter().fold(Immunity::NONE, |acc, f| acc | f.into())
    }
}

impl From<Immunity> for Vec<ImmunityFlag> {
    fn from(immunity: Immunity) -> Self {
        [
            (Immunity::DAMAGE, ImmunityFlag::Damage),
            (Immunity::STATUS, ImmunityFlag::Status),
            (Immunity::ENERGY_REMOVE, ImmunityFlag::EnergyRemove),
        ]
        .into_iter()
        .filter(|(bit, _)| immunity.contains(*bit))
        .map(|(_, flag)| flag)
        .collect()
    }
}

fn default_minimum_discard() -> u32 {
    1
}

/// An attack effect.
///
/// ## Damage
///
/// - `Basic`: flat damage
/// - `MultiCoin`: damage per head over N flips
/// - `EnergyDiscardCost`: damage per energy the attacker discards
///
/// ## Conditions
///
/// - `Status`: put a status condition on a target
/// - `Immunity`: shield a target until the end of the next turn
/// - `CantAttack`: disable a target's next attack
///
/// ## Composite
///
/// - `CoinFlip`: resolve one of two branches on a coin flip
/// - `Batch`: resolve effects in order
/// - `Custom`: dispatch to a registered handler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Basic {
        #[serde(default)]
        base_damage: i64,
    },

    Status {
        status: StatusCondition,
        #[serde(default = "EffectTarget::opponent")]
        target: EffectTarget,
    },

    /// Flip one coin. An absent branch does nothing.
    CoinFlip {
        #[serde(default, alias = "heads_effect")]
        heads: Option<Box<Effect>>,
        #[serde(default, alias = "tails_effect")]
        tails: Option<Box<Effect>>,
    },

    MultiCoin {
        coins: u32,
        damage_per_heads: i64,
    },

    /// Discard between `minimum_discard` and `maximum_discard` attached energy.
    /// No maximum means every attached energy may go.
    #[serde(rename = "energy_discard", alias = "energy_discard_cost")]
    EnergyDiscardCost {
        #[serde(default = "default_minimum_discard")]
        minimum_discard: u32,
        #[serde(default)]
        maximum_discard: Option<u32>,
        damage_per_discard: i64,
    },

    Immunity {
        immunity: Immunity,
        #[serde(default)]
        target: EffectTarget,
    },

    CantAttack {
        #[serde(default)]
        target: EffectTarget,
    },

    Custom {
        effect_id: String,
        #[serde(default)]
        params: EffectParams,
    },

    Batch {
        effects: Vec<Effect>,
    },
}

impl Default for Effect {
    fn default() -> Self {
        Effect::Basic { base_damage: 0 }
    }
}

impl Effect {
    pub fn basic(base_damage: i64) -> Self {
        Self::Basic { base_damage }
    }

    pub fn status(status: StatusCondition, target: EffectTarget) -> Self {
        Self::Status { status, target }
    }

    pub fn coin_flip(heads: Option<Effect>, tails: Option<Effect>) -> Self {
        Self::CoinFlip {
            heads: heads.map(Box::new),
            tails: tails.map(Box::new),
        }
    }

    pub fn multi_coin(coins: u32, damage_per_heads: i64) -> Self {
        Self::MultiCoin {
            coins,
            damage_per_heads,
        }
    }

    pub fn energy_discard(minimum: u32, maximum: Option<u32>, damage_per_discard: i64) -> Self {
        Self::EnergyDiscardCost {
            minimum_discard: minimum,
            maximum_discard: maximum,
            damage_per_discard,
        }
    }

    pub fn immunity(immunity: Immunity, target: EffectTarget) -> Self {
        Self::Immunity { immunity, target }
    }

    pub fn cant_attack(target: EffectTarget) -> Self {
        Self::CantAttack { target }
    }

    pub fn custom(effect_id: impl Into<String>, params: EffectParams) -> Self {
        Self::Custom {
            effect_id: effect_id.into(),
            params,
        }
    }

    pub fn batch(effects: impl IntoIterator<Item = Effect>) -> Self {
        Self::Batch {
            effects: effects.into_iter().collect(),
        }
    }

    /// Validate the whole effect tree.
    ///
    /// Custom ids are only checked when a registry is given. A tree may hold
    /// at most one energy-discard effect, since the acting player chooses a
    /// single discard count per attack.
    pub fn validate(&self, registry: Option<&CustomEffectRegistry>) -> Result<(), ValidationError> {
        if self.discard_count() > 1 {
            return Err(ValidationError::MultipleDiscards);
        }
        self.validate_node(registry)
    }

    fn validate_node(&self, registry: Option<&CustomEffectRegistry>) -> Result<(), ValidationError> {
        match self {
            Effect::EnergyDiscardCost {
                minimum_discard,
                maximum_discard: Some(maximum),
                ..
            } if maximum < minimum_discard => Err(ValidationError::DiscardBounds {
                minimum: *minimum_discard,
                maximum: *maximum,
            }),
            Effect::MultiCoin { coins: 0, .. } => Err(ValidationError::NoCoins),
            Effect::CoinFlip { heads, tails } => {
                for branch in [heads, tails].into_iter().flatten() {
                    branch.validate_node(registry)?;
                }
                Ok(())
            }
            Effect::Batch { effects } => {
                if effects.is_empty() {
                    return Err(ValidationError::EmptyBatch);
                }
                effects.iter().try_for_each(|e| e.validate_node(registry))
            }
            Effect::Custom { effect_id, params } => match registry {
                Some(registry) => Ok(registry.validate(effect_id, params)?),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn discard_count(&self) -> usize {
        match self {
            Effect::EnergyDiscardCost { .. } => 1,
            Effect::CoinFlip { heads, tails } => [heads, tails]
                .into_iter()
                .flatten()
                .map(|e| e.discard_count())
                .sum(),
            Effect::Batch { effects } => effects.iter().map(Effect::discard_count).sum(),
            _ => 0,
        }
    }

    /// Discard bounds of the energy-discard effect in the tree, if any.
    ///
    /// The acting player must choose a count within these before attacking.
    #[must_use]
    pub fn discard_bounds(&self) -> Option<(u32, Option<u32>)> {
        match self {
            Effect::EnergyDiscardCost {
                minimum_discard,
                maximum_discard,
                ..
            } => Some((*minimum_discard, *maximum_discard)),
            Effect::CoinFlip { heads, tails } => [heads, tails]
                .into_iter()
                .flatten()
                .find_map(|e| e.discard_bounds()),
            Effect::Batch { effects } => effects.iter().find_map(Effect::discard_bounds),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immunity_bits_combine() {
        let both = Immunity::DAMAGE | Immunity::STATUS;
        assert!(both.contains(Immunity::DAMAGE));
        assert!(both.contains(Immunity::STATUS));
        assert!(!both.contains(Immunity::ENERGY_REMOVE));
        assert!(both.intersects(Immunity::ALL));
        assert!(!Immunity::NONE.intersects(Immunity::ALL));
        assert_eq!(Immunity::DAMAGE | Immunity::STATUS | Immunity::ENERGY_REMOVE, Immunity::ALL);
    }

    #[test]
    fn test_immunity_serde() {
        let parsed: Immunity = serde_json::from_str(r#"["damage", "energy_remove"]"#).unwrap();
        assert_eq!(parsed, Immunity::DAMAGE | Immunity::ENERGY_REMOVE);

        let all: Immunity = serde_json::from_str(r#"["all"]"#).unwrap();
        assert_eq!(all, Immunity::ALL);

        let json = serde_json::to_string(&Immunity::STATUS).unwrap();
        assert_eq!(json, r#"["status"]"#);
    }

    #[test]
    fn test_discard_defaults() {
        let effect: Effect =
            serde_json::from_str(r#"{"type": "energy_discard", "damage_per_discard": 40}"#).unwrap();
        assert_eq!(effect, Effect::energy_discard(1, None, 40));
    }

    #[test]
    fn test_coin_flip_branch_aliases() {
        let effect: Effect = serde_json::from_str(
            r#"{"type": "coin_flip", "heads_effect": {"type": "status", "status": "paralyzed"}}"#,
        )
        .unwrap();

        assert_eq!(
            effect,
            Effect::coin_flip(
                Some(Effect::status(StatusCondition::Paralyzed, EffectTarget::Opponent)),
                None,
            )
        );
    }

    #[test]
    fn test_targets_default() {
        let effect: Effect = serde_json::from_str(r#"{"type": "cant_attack"}"#).unwrap();
        assert_eq!(effect, Effect::cant_attack(EffectTarget::User));
    }

    #[test]
    fn test_validate_nested() {
        let bad = Effect::coin_flip(None, Some(Effect::multi_coin(0, 10)));
        assert_eq!(bad.validate(None), Err(ValidationError::NoCoins));

        let empty = Effect::batch([]);
        assert_eq!(empty.validate(None), Err(ValidationError::EmptyBatch));

        let ok = Effect::batch([Effect::basic(10), Effect::energy_discard(1, Some(2), 30)]);
        assert!(ok.validate(None).is_ok());
    }

    #[test]
    fn test_validate_rejects_second_discard() {
        let doubled = Effect::batch([
            Effect::energy_discard(1, Some(1), 30),
            Effect::energy_discard(0, None, 30),
        ]);
        assert_eq!(doubled.validate(None), Err(ValidationError::MultipleDiscards));

        let hidden = Effect::batch([
            Effect::energy_discard(1, None, 10),
            Effect::coin_flip(Some(Effect::energy_discard(1, None, 10)), None),
        ]);
        assert_eq!(hidden.validate(None), Err(ValidationError::MultipleDiscards));
    }

    #[test]
    fn test_validate_custom_needs_registry_entry() {
        let registry = CustomEffectRegistry::builder().build();
        let effect = Effect::custom("ancient_mew_energy_move", EffectParams::default());

        assert!(effect.validate(None).is_ok());
        assert!(matches!(
            effect.validate(Some(&registry)),
            Err(ValidationError::Configuration(_))
        ));
    }

    #[test]
    fn test_discard_bounds_found_in_tree() {
        let effect = Effect::batch([Effect::basic(10), Effect::energy_discard(2, None, 50)]);
        assert_eq!(effect.discard_bounds(), Some((2, None)));
        assert_eq!(Effect::basic(10).discard_bounds(), None);
    }

    #[test]
    fn test_immobilizing_statuses() {
        assert!(StatusCondition::Asleep.immobilizes());
        assert!(StatusCondition::Paralyzed.immobilizes());
        assert!(!StatusCondition::Poisoned.immobilizes());
    }
}
