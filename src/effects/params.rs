//! Free-form parameters for custom effects.
//!
//! Custom handlers receive whatever the card data carried under `params`.
//! The engine does not interpret these values; each handler reads the keys
//! it understands and rejects the rest during validation.
//!
//! ## ParamValue Types
//!
//! - `Int`: amounts (heal 30, draw 2)
//! - `Bool`: flags
//! - `Text`: names, energy types
//! - `IntList` / `TextList`: lists of the above

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Value for a custom effect parameter.
///
/// Deserialized without a tag, so plain JSON values map directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Text(String),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

impl ParamValue {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::TextList(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Parameter map handed to a custom handler.
pub type EffectParams = FxHashMap<String, ParamValue>;

/// Read a required non-negative integer parameter.
pub fn require_amount(effect: &str, params: &EffectParams, key: &str) -> Result<u32, ConfigurationError> {
    params
        .get(key)
        .and_then(ParamValue::as_int)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| ConfigurationError::InvalidParam {
            effect: effect.to_string(),
            param: key.to_string(),
        })
}

/// Read an optional non-negative integer parameter, falling back to `default`.
pub fn amount_or(effect: &str, params: &EffectParams, key: &str, default: u32) -> Result<u32, ConfigurationError> {
    if params.contains_key(key) {
        require_amount(effect, params, key)
    } else {
        Ok(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json() {
        let params: EffectParams =
            serde_json::from_str(r#"{"amount": 30, "self": true, "kind": "fire", "names": ["a", "b"]}"#)
                .unwrap();

        assert_eq!(params["amount"].as_int(), Some(30));
        assert_eq!(params["self"].as_bool(), Some(true));
        assert_eq!(params["kind"].as_text(), Some("fire"));
        assert_eq!(params["names"].as_text_list().map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_require_amount() {
        let mut params = EffectParams::default();
        params.insert("amount".into(), 20i32.into());
        params.insert("negative".into(), (-1i32).into());

        assert_eq!(require_amount("heal_self", &params, "amount"), Ok(20));
        assert!(require_amount("heal_self", &params, "negative").is_err());
        assert_eq!(
            require_amount("heal_self", &params, "missing"),
            Err(ConfigurationError::InvalidParam {
                effect: "heal_self".into(),
                param: "missing".into(),
            })
        );
    }

    #[test]
    fn test_amount_or_default() {
        let params = EffectParams::default();
        assert_eq!(amount_or("draw_cards", &params, "count", 1), Ok(1));
    }
}
