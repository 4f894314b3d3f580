//! Stock custom effects.
//!
//! | id | params | effect |
//! |---|---|---|
//! | `heal_self` | `amount` | heal the attacker's active card |
//! | `draw_cards` | `count` (1) | attacker draws after the attack |
//! | `search_deck` | `count` (1), `basic_only` (false) | attacker searches their deck after the attack |
//! | `discard_opponent_energy` | `count` (1) | remove energy from the defending card |
//! | `bonus_if_damaged` | `amount` | extra damage if the defender is already damaged |

use std::sync::Arc;

use super::effect::Immunity;
use super::params::{amount_or, require_amount, EffectParams, ParamValue};
use super::registry::CustomEffectHandler;
use super::resolver::{EffectContext, EffectNote, EffectOutcome, FollowUp};
use crate::core::GameRng;
use crate::error::{ConfigurationError, Result};

/// Every stock handler with its id.
pub(crate) fn all() -> Vec<(&'static str, Arc<dyn CustomEffectHandler>)> {
    vec![
        entry(HealSelf::ID, HealSelf),
        entry(DrawCards::ID, DrawCards),
        entry(SearchDeck::ID, SearchDeck),
        entry(DiscardOpponentEnergy::ID, DiscardOpponentEnergy),
        entry(BonusIfDamaged::ID, BonusIfDamaged),
    ]
}

fn entry<H: CustomEffectHandler + 'static>(id: &'static str, handler: H) -> (&'static str, Arc<dyn CustomEffectHandler>) {
    (id, Arc::new(handler))
}

/// Heal `amount` damage from the attacker's active card.
pub struct HealSelf;

impl HealSelf {
    pub const ID: &'static str = "heal_self";
}

impl CustomEffectHandler for HealSelf {
    fn validate(&self, params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        require_amount(Self::ID, params, "amount").map(|_| ())
    }

    fn resolve(
        &self,
        params: &EffectParams,
        attacker: &mut EffectContext<'_>,
        _defender: &mut EffectContext<'_>,
        _rng: &mut GameRng,
    ) -> Result<EffectOutcome> {
        let amount = i64::from(require_amount(Self::ID, params, "amount")?);
        let mut outcome = EffectOutcome::default();
        if let Some(card) = attacker.active_mut() {
            let healed = amount.min(card.damage);
            card.apply_damage(-healed);
            outcome.notes.push(EffectNote::Healed {
                target: card.id,
                amount: healed,
            });
        }
        Ok(outcome)
    }
}

/// Draw `count` cards once the attack is over.
pub struct DrawCards;

impl DrawCards {
    pub const ID: &'static str = "draw_cards";
}

impl CustomEffectHandler for DrawCards {
    fn validate(&self, params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        amount_or(Self::ID, params, "count", 1).map(|_| ())
    }

    fn resolve(
        &self,
        params: &EffectParams,
        _attacker: &mut EffectContext<'_>,
        _defender: &mut EffectContext<'_>,
        _rng: &mut GameRng,
    ) -> Result<EffectOutcome> {
        let count = amount_or(Self::ID, params, "count", 1)?;
        Ok(EffectOutcome {
            follow_ups: vec![FollowUp::DrawCards { count }],
            ..EffectOutcome::default()
        })
    }
}

/// Search the deck for up to `count` cards once the attack is over.
pub struct SearchDeck;

impl SearchDeck {
    pub const ID: &'static str = "search_deck";

    fn basic_only(params: &EffectParams) -> std::result::Result<bool, ConfigurationError> {
        match params.get("basic_only") {
            None => Ok(false),
            Some(value) => value.as_bool().ok_or_else(|| ConfigurationError::InvalidParam {
                effect: Self::ID.to_string(),
                param: "basic_only".to_string(),
            }),
        }
    }
}

impl CustomEffectHandler for SearchDeck {
    fn validate(&self, params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        amount_or(Self::ID, params, "count", 1)?;
        Self::basic_only(params).map(|_| ())
    }

    fn resolve(
        &self,
        params: &EffectParams,
        _attacker: &mut EffectContext<'_>,
        _defender: &mut EffectContext<'_>,
        _rng: &mut GameRng,
    ) -> Result<EffectOutcome> {
        let count = amount_or(Self::ID, params, "count", 1)?;
        let basic_only = Self::basic_only(params)?;
        Ok(EffectOutcome {
            follow_ups: vec![FollowUp::SearchDeck { count, basic_only }],
            ..EffectOutcome::default()
        })
    }
}

/// Remove `count` energy from the defending active card.
pub struct DiscardOpponentEnergy;

impl DiscardOpponentEnergy {
    pub const ID: &'static str = "discard_opponent_energy";
}

impl CustomEffectHandler for DiscardOpponentEnergy {
    fn validate(&self, params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        amount_or(Self::ID, params, "count", 1).map(|_| ())
    }

    fn resolve(
        &self,
        params: &EffectParams,
        _attacker: &mut EffectContext<'_>,
        defender: &mut EffectContext<'_>,
        _rng: &mut GameRng,
    ) -> Result<EffectOutcome> {
        let count = amount_or(Self::ID, params, "count", 1)?;
        let mut outcome = EffectOutcome::default();
        if let Some(card) = defender.active_mut() {
            if card.is_immune(Immunity::ENERGY_REMOVE) {
                outcome.notes.push(EffectNote::Blocked {
                    target: card.id,
                    by: Immunity::ENERGY_REMOVE,
                });
            } else {
                let removed = card.detach_energy(count as usize);
                outcome.notes.push(EffectNote::EnergyRemoved {
                    target: card.id,
                    energy: removed.to_vec(),
                });
            }
        }
        Ok(outcome)
    }
}

/// Deal `amount` extra damage if the defender already has damage on it.
pub struct BonusIfDamaged;

impl BonusIfDamaged {
    pub const ID: &'static str = "bonus_if_damaged";
}

impl CustomEffectHandler for BonusIfDamaged {
    fn validate(&self, params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        require_amount(Self::ID, params, "amount").map(|_| ())
    }

    fn resolve(
        &self,
        params: &EffectParams,
        _attacker: &mut EffectContext<'_>,
        defender: &mut EffectContext<'_>,
        _rng: &mut GameRng,
    ) -> Result<EffectOutcome> {
        let amount = i64::from(require_amount(Self::ID, params, "amount")?);
        let damaged = defender.active().is_some_and(|c| c.damage > 0);
        Ok(EffectOutcome::damage(if damaged { amount } else { 0 }))
    }
}

/// Params with a single integer entry.
pub fn amount_param(key: &str, value: i64) -> EffectParams {
    let mut params = EffectParams::default();
    params.insert(key.to_string(), ParamValue::Int(value));
    params
}
