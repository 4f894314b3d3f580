//! Custom effect registry.
//!
//! Cards whose attacks cannot be expressed with the stock `Effect` variants
//! name a handler by id (`Effect::Custom { effect_id, .. }`). The registry
//! maps those ids to `CustomEffectHandler` trait objects. It is assembled
//! once with `CustomEffectRegistryBuilder` and is immutable afterwards, so a
//! single `Arc<CustomEffectRegistry>` can back any number of matches.
//!
//! ## Example
//!
//! ```
//! use rust_tcg::effects::CustomEffectRegistry;
//!
//! let registry = CustomEffectRegistry::builder()
//!     .with_builtins()
//!     .unwrap()
//!     .build();
//!
//! assert!(registry.contains("heal_self"));
//! assert!(registry.get("destiny_bond").is_err());
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::params::EffectParams;
use super::resolver::{EffectContext, EffectOutcome};
use crate::core::GameRng;
use crate::error::{ConfigurationError, Result};

/// A scripted per-card effect.
///
/// Handlers get the effect's params and both player contexts, and return an
/// outcome under the same contract as the stock effects. Returning an error
/// rolls the whole attack back.
pub trait CustomEffectHandler: Send + Sync {
    /// Check params at card-load time.
    fn validate(&self, _params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        Ok(())
    }

    fn resolve(
        &self,
        params: &EffectParams,
        attacker: &mut EffectContext<'_>,
        defender: &mut EffectContext<'_>,
        rng: &mut GameRng,
    ) -> Result<EffectOutcome>;
}

/// Collects handlers before the registry is frozen.
#[derive(Default)]
pub struct CustomEffectRegistryBuilder {
    handlers: FxHashMap<String, Arc<dyn CustomEffectHandler>>,
}

impl CustomEffectRegistryBuilder {
    /// Register a handler under `id`.
    pub fn register(
        mut self,
        id: impl Into<String>,
        handler: Arc<dyn CustomEffectHandler>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let id = id.into();
        if self.handlers.contains_key(&id) {
            return Err(ConfigurationError::DuplicateEffect(id));
        }
        self.handlers.insert(id, handler);
        Ok(self)
    }

    /// Register the stock handlers.
    pub fn with_builtins(self) -> std::result::Result<Self, ConfigurationError> {
        super::builtins::all()
            .into_iter()
            .try_fold(self, |builder, (id, handler)| builder.register(id, handler))
    }

    #[must_use]
    pub fn build(self) -> CustomEffectRegistry {
        CustomEffectRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable map from effect id to handler.
#[derive(Clone, Default)]
pub struct CustomEffectRegistry {
    handlers: FxHashMap<String, Arc<dyn CustomEffectHandler>>,
}

impl CustomEffectRegistry {
    #[must_use]
    pub fn builder() -> CustomEffectRegistryBuilder {
        CustomEffectRegistryBuilder::default()
    }

    /// A registry holding only the stock handlers.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self {
            handlers: super::builtins::all()
                .into_iter()
                .map(|(id, handler)| (id.to_string(), handler))
                .collect(),
        }
    }

    /// Look up a handler.
    pub fn get(&self, id: &str) -> std::result::Result<&Arc<dyn CustomEffectHandler>, ConfigurationError> {
        self.handlers
            .get(id)
            .ok_or_else(|| ConfigurationError::UnknownEffect(id.to_string()))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Check an id is registered and its handler accepts `params`.
    pub fn validate(&self, id: &str, params: &EffectParams) -> std::result::Result<(), ConfigurationError> {
        self.get(id)?.validate(params)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for CustomEffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomEffectRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
