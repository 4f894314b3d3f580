//! Card catalog - validated definitions keyed by name.
//!
//! External card data arrives as `CardRecord`s (JSON in the format the card
//! scrapers produce). The catalog converts each record into a
//! `CardDefinition`, validates it, and resolves every custom effect id
//! against a `CustomEffectRegistry`. A bad record is rejected on its own;
//! the rest of the batch still loads.
//!
//! ## Example
//!
//! ```
//! use rust_tcg::cards::CardCatalog;
//! use rust_tcg::effects::CustomEffectRegistry;
//!
//! let registry = CustomEffectRegistry::with_builtins();
//! let mut catalog = CardCatalog::new();
//!
//! let report = catalog.load_json(r#"[
//!     {"name": "Pikachu", "HP": 60, "type": "lightning", "retreat": 1,
//!      "attacks": [{"name": "Gnaw", "cost": ["lightning"], "damage": 20,
//!                   "effect": {"type": "basic"}}]},
//!     {"name": "Broken", "HP": 0, "attacks": []}
//! ]"#, &registry).unwrap();
//!
//! assert_eq!(report.accepted, vec!["Pikachu".to_string()]);
//! assert_eq!(report.rejected.len(), 1);
//! assert!(catalog.get("Pikachu").is_ok());
//! ```

use std::sync::Arc;

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::definition::{Attack, CardDefinition, EnergyType, Rarity, Stage};
use crate::effects::{CustomEffectRegistry, Effect};
use crate::error::ValidationError;

/// Evolution stage as it appears in card data: a name or a number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageField {
    Index(u8),
    Named(Stage),
}

impl StageField {
    fn to_stage(self) -> Result<Stage, ValidationError> {
        match self {
            StageField::Named(stage) => Ok(stage),
            StageField::Index(0) => Ok(Stage::Basic),
            StageField::Index(1) => Ok(Stage::Stage1),
            StageField::Index(2) => Ok(Stage::Stage2),
            StageField::Index(n) => Err(ValidationError::Malformed(format!("unknown stage {n}"))),
        }
    }
}

fn colorless() -> EnergyType {
    EnergyType::Colorless
}

/// An attack in external card data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub name: String,
    #[serde(default)]
    pub cost: Vec<EnergyType>,
    #[serde(default)]
    pub damage: i64,
    #[serde(default)]
    pub effect: Effect,
}

/// A card in external card data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    #[serde(alias = "HP")]
    pub hp: i64,
    #[serde(rename = "type", default = "colorless")]
    pub card_type: EnergyType,
    #[serde(default)]
    pub attacks: Vec<AttackRecord>,
    #[serde(default)]
    pub retreat: u32,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub weakness: Option<EnergyType>,
    #[serde(default)]
    pub stage: Option<StageField>,
}

impl CardRecord {
    /// Convert into a definition without validating it.
    pub fn into_definition(self) -> Result<CardDefinition, ValidationError> {
        let stage = self.stage.map_or(Ok(Stage::Basic), StageField::to_stage)?;
        Ok(CardDefinition {
            name: self.name,
            hp: self.hp,
            card_type: self.card_type,
            rarity: self.rarity,
            retreat: self.retreat,
            weakness: self.weakness,
            attacks: self
                .attacks
                .into_iter()
                .map(|a| Attack {
                    name: a.name,
                    cost: a.cost.into_iter().collect(),
                    damage: a.damage,
                    effect: a.effect,
                })
                .collect(),
            stage,
            set: self.set,
        })
    }
}

/// Result of loading a batch of records.
#[derive(Debug, Default, PartialEq)]
pub struct LoadReport {
    /// Names of the cards that loaded, in input order.
    pub accepted: Vec<String>,
    /// Input index and reason for each rejected record.
    pub rejected: Vec<(usize, ValidationError)>,
}

/// Validated card definitions, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct CardCatalog {
    cards: FxHashMap<String, Arc<CardDefinition>>,
}

impl CardCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check one effect tree against `registry`.
    pub fn validate_effect(effect: &Effect, registry: &CustomEffectRegistry) -> Result<(), ValidationError> {
        effect.validate(Some(registry))
    }

    /// Validate a record and add it.
    pub fn insert(
        &mut self,
        record: CardRecord,
        registry: &CustomEffectRegistry,
    ) -> Result<Arc<CardDefinition>, ValidationError> {
        let definition = record.into_definition()?;
        definition.validate(Some(registry))?;
        self.insert_definition(definition)
    }

    /// Add an already-built definition after validating it.
    pub fn insert_definition(&mut self, definition: CardDefinition) -> Result<Arc<CardDefinition>, ValidationError> {
        definition.validate(None)?;
        if self.cards.contains_key(&definition.name) {
            return Err(ValidationError::DuplicateCard(definition.name));
        }
        let definition = Arc::new(definition);
        self.cards.insert(definition.name.clone(), definition.clone());
        Ok(definition)
    }

    /// Load records, keeping the good ones.
    pub fn load_many(
        &mut self,
        records: impl IntoIterator<Item = CardRecord>,
        registry: &CustomEffectRegistry,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for (index, record) in records.into_iter().enumerate() {
            let name = record.name.clone();
            match self.insert(record, registry) {
                Ok(_) => report.accepted.push(name),
                Err(err) => {
                    warn!("rejected card record {index} ({name}): {err}");
                    report.rejected.push((index, err));
                }
            }
        }
        report
    }

    /// Load a JSON array of records (or a single record object).
    ///
    /// Only unparseable JSON fails the call; bad records land in the report.
    pub fn load_json(&mut self, json: &str, registry: &CustomEffectRegistry) -> Result<LoadReport, ValidationError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let values = match value {
            serde_json::Value::Array(values) => values,
            other => vec![other],
        };

        let mut report = LoadReport::default();
        for (index, value) in values.into_iter().enumerate() {
            let outcome = serde_json::from_value::<CardRecord>(value)
                .map_err(|e| ValidationError::Malformed(e.to_string()))
                .and_then(|record| {
                    let name = record.name.clone();
                    self.insert(record, registry).map(|_| name)
                });
            match outcome {
                Ok(name) => report.accepted.push(name),
                Err(err) => {
                    warn!("rejected card record {index}: {err}");
                    report.rejected.push((index, err));
                }
            }
        }
        Ok(report)
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Result<Arc<CardDefinition>, ValidationError> {
        self.cards
            .get(name)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownCard(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.cards.contains_key(name)
    }

    /// Card names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cards.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
