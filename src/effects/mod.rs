//! Effect system for attacks.
//!
//! - `Effect`: tagged enum of stock effects, validated at load time
//! - `CustomEffectRegistry`: id to handler map for scripted effects
//! - `EffectResolver`: applies effects to two player contexts
//!
//! ## Design
//!
//! Effects only ever see the two `PlayerState`s involved in an attack, never
//! the whole match. Anything that needs a player decision is handed back to
//! the state machine as a `FollowUp`.

mod effect;
mod params;
mod registry;
mod resolver;
pub mod builtins;

pub use effect::{Effect, EffectTarget, Immunity, ImmunityFlag, StatusCondition};
pub use params::{amount_or, require_amount, EffectParams, ParamValue};
pub use registry::{CustomEffectHandler, CustomEffectRegistry, CustomEffectRegistryBuilder};
pub use resolver::{EffectContext, EffectInput, EffectNote, EffectOutcome, EffectResolver, FollowUp};
