//! Effect resolution - applying attack effects to the two active players.
//!
//! The `EffectResolver` never sees the whole `GameState`. It works on two
//! `EffectContext`s, one per player, each exposing a single `PlayerState`
//! plus the turn number. Anything that needs the broker (searching a deck,
//! drawing with a prompt) is returned as a `FollowUp` for the state machine
//! to perform once the attack has committed.
//!
//! ## Atomicity
//!
//! `resolve` validates the entire effect tree and the discard choice before
//! touching any zone. If a custom handler fails part-way, both player slices
//! and the RNG are restored from a snapshot taken on entry.

use std::sync::Arc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::effect::{Effect, EffectTarget, Immunity, StatusCondition};
use super::registry::CustomEffectRegistry;
use crate::cards::{Attack, CardInstance, EnergyType};
use crate::core::{EntityId, GameRng, PlayerId, PlayerState};
use crate::error::{EngineError, Result, RuleViolation, ValidationError};

/// One player's side, as seen by an effect.
pub struct EffectContext<'a> {
    pub player: PlayerId,
    pub turn: u32,
    pub state: &'a mut PlayerState,
}

impl<'a> EffectContext<'a> {
    pub fn new(player: PlayerId, turn: u32, state: &'a mut PlayerState) -> Self {
        Self { player, turn, state }
    }

    #[must_use]
    pub fn active(&self) -> Option<&CardInstance> {
        self.state.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut CardInstance> {
        self.state.active.as_mut()
    }
}

/// Choices the acting player made before the attack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectInput {
    /// Energy to discard for an `EnergyDiscardCost` effect.
    pub energy_discard: u32,
}

impl EffectInput {
    #[must_use]
    pub fn discard(count: u32) -> Self {
        Self { energy_discard: count }
    }
}

/// Something an effect did that observers may care about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectNote {
    /// The target's immunity stopped the effect.
    Blocked { target: EntityId, by: Immunity },
    StatusApplied { target: EntityId, status: StatusCondition },
    ImmunityGranted { target: EntityId, immunity: Immunity },
    AttackDisabled { target: EntityId, turn: u32 },
    Healed { target: EntityId, amount: i64 },
    EnergyRemoved { target: EntityId, energy: Vec<EnergyType> },
    /// Confusion made the attack fail.
    AttackFailed { attacker: EntityId },
}

/// Player choice the state machine must run after the attack commits.
///
/// Always performed on behalf of the attacking player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUp {
    /// Search the deck for up to `count` cards, put them in hand, shuffle.
    SearchDeck { count: u32, basic_only: bool },
    /// Draw `count` cards.
    DrawCards { count: u32 },
}

/// What resolving an effect produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectOutcome {
    /// Damage contributed to the defending active card.
    pub damage: i64,
    /// Every coin flipped, in order. `true` is heads.
    pub flips: Vec<bool>,
    pub energy_discarded: SmallVec<[EnergyType; 4]>,
    pub notes: Vec<EffectNote>,
    pub follow_ups: Vec<FollowUp>,
}

impl EffectOutcome {
    #[must_use]
    pub fn damage(amount: i64) -> Self {
        Self {
            damage: amount,
            ..Self::default()
        }
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: EffectOutcome) {
        self.damage += other.damage;
        self.flips.extend(other.flips);
        self.energy_discarded.extend(other.energy_discarded);
        self.notes.extend(other.notes);
        self.follow_ups.extend(other.follow_ups);
    }

    #[must_use]
    pub fn heads(&self) -> usize {
        self.flips.iter().filter(|h| **h).count()
    }
}

/// Resolves effects against two player contexts.
#[derive(Clone)]
pub struct EffectResolver {
    registry: Arc<CustomEffectRegistry>,
}

impl EffectResolver {
    pub fn new(registry: Arc<CustomEffectRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &CustomEffectRegistry {
        &self.registry
    }

    /// Validate an effect tree, including custom ids and handler params.
    pub fn validate(&self, effect: &Effect) -> std::result::Result<(), ValidationError> {
        effect.validate(Some(&self.registry))
    }

    /// Resolve an effect.
    ///
    /// All-or-nothing: on error neither player slice nor the RNG changes. An
    /// unregistered custom id or a rejected handler param is reported as
    /// `EngineError::Configuration`.
    pub fn resolve(
        &self,
        effect: &Effect,
        attacker: &mut EffectContext<'_>,
        defender: &mut EffectContext<'_>,
        rng: &mut GameRng,
        input: EffectInput,
    ) -> Result<EffectOutcome> {
        self.validate(effect).map_err(|err| match err {
            ValidationError::Configuration(err) => EngineError::Configuration(err),
            other => other.into(),
        })?;
        let available = attacker.active().map_or(0, |c| c.attached.len());
        Self::check_discard(effect, available, input)?;

        let saved = (attacker.state.clone(), defender.state.clone(), rng.clone());
        match self.apply(effect, attacker, defender, rng, input) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                debug!("effect resolution failed, restoring snapshot: {err}");
                *attacker.state = saved.0;
                *defender.state = saved.1;
                *rng = saved.2;
                Err(err)
            }
        }
    }

    /// Resolve a full attack: cost, effect, printed damage, weakness, immunity.
    ///
    /// Returns the outcome with `damage` set to what the defender actually took.
    pub fn resolve_attack(
        &self,
        attack: &Attack,
        attacker: &mut EffectContext<'_>,
        defender: &mut EffectContext<'_>,
        rng: &mut GameRng,
        input: EffectInput,
        weakness_bonus: i64,
    ) -> Result<EffectOutcome> {
        let (attacker_type, attached) = match attacker.active() {
            Some(card) => (card.definition.card_type, card.attached.clone()),
            None => return Err(RuleViolation::NoActive(attacker.player).into()),
        };
        if !attack.is_payable(&attached) {
            return Err(RuleViolation::InsufficientEnergy {
                required: attack.cost.to_vec(),
                attached: attached.to_vec(),
            }
            .into());
        }

        let mut outcome = self.resolve(&attack.effect, attacker, defender, rng, input)?;
        let mut total = attack.damage + outcome.damage;

        if let Some(target) = defender.active_mut() {
            if total > 0 && target.definition.weakness == Some(attacker_type) {
                total += weakness_bonus;
            }
            if total > 0 && target.is_immune(Immunity::DAMAGE) {
                outcome.notes.push(EffectNote::Blocked {
                    target: target.id,
                    by: Immunity::DAMAGE,
                });
                total = 0;
            }
            target.apply_damage(total.max(0));
        } else {
            total = 0;
        }

        outcome.damage = total.max(0);
        trace!("{} used {} for {} damage", attacker.player, attack.name, outcome.damage);
        Ok(outcome)
    }

    /// Reject a discard count outside `[minimum, min(maximum, available)]`.
    pub fn check_discard(effect: &Effect, available: usize, input: EffectInput) -> Result<()> {
        if let Some((minimum, maximum)) = effect.discard_bounds() {
            let available = available as u32;
            let upper = maximum.map_or(available, |m| m.min(available));
            let count = input.energy_discard;
            if count < minimum || count > upper {
                return Err(RuleViolation::DiscardOutOfRange {
                    count,
                    minimum,
                    maximum: upper,
                }
                .into());
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        effect: &Effect,
        attacker: &mut EffectContext<'_>,
        defender: &mut EffectContext<'_>,
        rng: &mut GameRng,
        input: EffectInput,
    ) -> Result<EffectOutcome> {
        let mut outcome = EffectOutcome::default();

        match effect {
            Effect::Basic { base_damage } => outcome.damage = *base_damage,

            Effect::Status { status, target } => {
                let (_, card) = target_card(*target, attacker, defender);
                if let Some(card) = card {
                    if card.is_knocked_out() {
                        // knocked-out cards take no further status
                    } else if card.is_immune(Immunity::STATUS) {
                        outcome.notes.push(EffectNote::Blocked {
                            target: card.id,
                            by: Immunity::STATUS,
                        });
                    } else {
                        card.status = Some(*status);
                        outcome.notes.push(EffectNote::StatusApplied {
                            target: card.id,
                            status: *status,
                        });
                    }
                }
            }

            Effect::CoinFlip { heads, tails } => {
                let flip = rng.flip();
                outcome.flips.push(flip);
                let branch = if flip { heads } else { tails };
                if let Some(branch) = branch {
                    outcome.merge(self.apply(branch, attacker, defender, rng, input)?);
                }
            }

            Effect::MultiCoin {
                coins,
                damage_per_heads,
            } => {
                outcome.flips = rng.flip_coins(*coins as usize);
                outcome.damage = outcome.heads() as i64 * damage_per_heads;
            }

            Effect::EnergyDiscardCost {
                damage_per_discard, ..
            } => {
                let count = input.energy_discard;
                if let Some(card) = attacker.active_mut() {
                    outcome.energy_discarded = card.detach_energy(count as usize);
                }
                outcome.damage = outcome.energy_discarded.len() as i64 * damage_per_discard;
            }

            Effect::Immunity { immunity, target } => {
                let (turn, card) = target_card(*target, attacker, defender);
                if let Some(card) = card {
                    let expires = turn + 1;
                    card.immunity |= *immunity;
                    card.immunity_expires = card.immunity_expires.max(expires);
                    outcome.notes.push(EffectNote::ImmunityGranted {
                        target: card.id,
                        immunity: card.immunity,
                    });
                }
            }

            Effect::CantAttack { target } => {
                // The opponent's next turn is turn + 1, the user's own is turn + 2.
                let offset = match target {
                    EffectTarget::User => 2,
                    EffectTarget::Opponent => 1,
                };
                let (turn, card) = target_card(*target, attacker, defender);
                if let Some(card) = card {
                    let turn = turn + offset;
                    card.cant_attack_on_turn = Some(turn);
                    outcome.notes.push(EffectNote::AttackDisabled { target: card.id, turn });
                }
            }

            Effect::Custom { effect_id, params } => {
                let handler = self.registry.get(effect_id)?;
                trace!("dispatching custom effect {effect_id}");
                outcome.merge(handler.resolve(params, attacker, defender, rng)?);
            }

            Effect::Batch { effects } => {
                for effect in effects {
                    outcome.merge(self.apply(effect, attacker, defender, rng, input)?);
                }
            }
        }

        Ok(outcome)
    }
}

/// Turn number and active card on the targeted side.
fn target_card<'c>(
    target: EffectTarget,
    attacker: &'c mut EffectContext<'_>,
    defender: &'c mut EffectContext<'_>,
) -> (u32, Option<&'c mut CardInstance>) {
    match target {
        EffectTarget::User => (attacker.turn, attacker.state.active.as_mut()),
        EffectTarget::Opponent => (defender.turn, defender.state.active.as_mut()),
    }
}
