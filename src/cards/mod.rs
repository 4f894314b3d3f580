//! Card system: definitions, instances, decks and the catalog.
//!
//! ## Key Types
//!
//! - `CardDefinition`: static card data, shared behind `Arc`
//! - `CardInstance`: runtime card state (damage, energy, status)
//! - `Deck`: ordered stack of instances
//! - `CardCatalog`: validated definitions loaded from card records

pub mod catalog;
pub mod deck;
pub mod definition;
pub mod instance;

pub use catalog::{AttackRecord, CardCatalog, CardRecord, LoadReport, StageField};
pub use deck::Deck;
pub use definition::{cost_satisfied, Attack, CardDefinition, EnergyCost, EnergyType, Rarity, Stage};
pub use instance::{CardInstance, CardRef};
