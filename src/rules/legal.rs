//! Legal-move generation.
//!
//! `legal_actions` lists exactly the actions `apply_action` would accept
//! right now. Both sides share the blocker checks below.

use super::actions::Action;
use super::machine::Match;
use crate::core::PlayerId;
use crate::error::RuleViolation;

impl Match {
    /// Every action `player` may take now.
    ///
    /// Empty once the match is over. Outside their own attack phase a player
    /// may only concede.
    #[must_use]
    pub fn legal_actions(&self, player: PlayerId) -> Vec<Action> {
        if self.state.is_over() {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.require_turn(player).is_ok() {
            let state = self.state.player(player);

            if state.can_attach_energy && state.energy.is_some() {
                actions.extend(state.in_play().map(|card| Action::AttachEnergy { target: card.id }));
            }

            if state.free_bench_slot(self.config.bench_slots).is_some() {
                actions.extend(
                    state
                        .basics_in_hand()
                        .into_iter()
                        .map(|card| Action::PlayBasic { card }),
                );
            }

            if self.retreat_blocker(player).is_none() {
                actions.extend(
                    state
                        .bench
                        .values()
                        .map(|card| Action::Retreat { replacement: card.id }),
                );
            }

            if self.attack_blocker(player).is_none() {
                if let Some(active) = &state.active {
                    let available = active.attached.len() as u32;
                    for (index, attack) in active.definition.attacks.iter().enumerate() {
                        if !attack.is_payable(&active.attached) {
                            continue;
                        }
                        match attack.effect.discard_bounds() {
                            None => actions.push(Action::Attack { index, discard: 0 }),
                            Some((minimum, maximum)) => {
                                let upper = maximum.map_or(available, |m| m.min(available));
                                actions.extend((minimum..=upper).map(|discard| Action::Attack { index, discard }));
                            }
                        }
                    }
                }
            }

            actions.push(Action::EndTurn);
        }
        actions.push(Action::Concede);
        actions
    }

    /// Why `player` cannot attack right now, if they cannot.
    pub(crate) fn attack_blocker(&self, player: PlayerId) -> Option<RuleViolation> {
        let state = self.state.player(player);
        if !state.can_attack {
            return Some(RuleViolation::AttackDisabled("already attacked this turn"));
        }
        let Some(active) = &state.active else {
            return Some(RuleViolation::NoActive(player));
        };
        if active.cant_attack_on_turn == Some(self.state.turn) {
            return Some(RuleViolation::AttackDisabled("an effect prevents attacking this turn"));
        }
        if active.status.is_some_and(|s| s.immobilizes()) {
            return Some(RuleViolation::AttackDisabled("active card is asleep or paralyzed"));
        }
        None
    }

    /// Why `player` cannot retreat right now, if they cannot.
    pub(crate) fn retreat_blocker(&self, player: PlayerId) -> Option<&'static str> {
        let state = self.state.player(player);
        if state.has_retreated {
            return Some("already retreated this turn");
        }
        let Some(active) = &state.active else {
            return Some("no active card");
        };
        if active.status.is_some_and(|s| s.immobilizes()) {
            return Some("active card is asleep or paralyzed");
        }
        if state.bench.is_empty() {
            return Some("no benched card to switch in");
        }
        if active.attached.len() < active.definition.retreat as usize {
            return Some("not enough energy for the retreat cost");
        }
        None
    }
}
