//! Flat configuration surface read by algorithms at startup.
//!
//! Keys are dotted strings (`"ktruss.k"`, `"simrank.decay"`); values are
//! typed but string values coerce through the typed getters, so command-line
//! overrides can always be passed as text. Missing keys fall back to the
//! documented default of each getter; present-but-wrongly-typed values are a
//! configuration error.

use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Parses a TOML document, flattening nested tables into dotted keys:
    /// `[simrank] decay = 0.8` becomes `"simrank.decay"`.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| Error::Configuration(format!("invalid config: {e}")))?;

        let mut config = Config::new();
        flatten("", &table, &mut config)?;
        Ok(config)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Applies a `KEY=VALUE` override from the command line. The value is
    /// stored as text and coerced by the getter that reads it.
    pub fn apply_override(&mut self, spec: &str) -> Result<()> {
        let (key, value) = spec
            .split_once('=')
            .ok_or_else(|| Error::Configuration(format!("override `{spec}` is not KEY=VALUE")))?;
        self.values
            .insert(key.trim().to_string(), Value::Str(value.trim().to_string()));
        Ok(())
    }

    pub fn get_i64(&self, key: &str, default: i64) -> Result<i64> {
        match self.values.get(key) {
            None => Ok(default),
            Some(Value::Int(v)) => Ok(*v),
            Some(Value::Str(s)) => s
                .parse()
                .map_err(|_| type_error(key, "integer", &format!("`{s}`"))),
            Some(other) => Err(type_error(key, "integer", &format!("{other:?}"))),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.values.get(key) {
            None => Ok(default),
            Some(Value::Float(v)) => Ok(*v),
            Some(Value::Int(v)) => Ok(*v as f64),
            Some(Value::Str(s)) => s
                .parse()
                .map_err(|_| type_error(key, "float", &format!("`{s}`"))),
            Some(other) => Err(type_error(key, "float", &format!("{other:?}"))),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None => Ok(default),
            Some(Value::Bool(v)) => Ok(*v),
            Some(Value::Str(s)) => s
                .parse()
                .map_err(|_| type_error(key, "boolean", &format!("`{s}`"))),
            Some(other) => Err(type_error(key, "boolean", &format!("{other:?}"))),
        }
    }

    pub fn get_str(&self, key: &str, default: &str) -> Result<String> {
        match self.values.get(key) {
            None => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.clone()),
            Some(other) => Err(type_error(key, "string", &format!("{other:?}"))),
        }
    }
}

fn type_error(key: &str, expected: &str, got: &str) -> Error {
    Error::Configuration(format!("key `{key}`: expected {expected}, got {got}"))
}

fn flatten(prefix: &str, table: &toml::Table, config: &mut Config) -> Result<()> {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        match value {
            toml::Value::Table(inner) => flatten(&key, inner, config)?,
            toml::Value::Integer(v) => config.set(key, Value::Int(*v)),
            toml::Value::Float(v) => config.set(key, Value::Float(*v)),
            toml::Value::Boolean(v) => config.set(key, Value::Bool(*v)),
            toml::Value::String(v) => config.set(key, Value::Str(v.clone())),
            other => {
                return Err(Error::Configuration(format!(
                    "key `{key}`: unsupported value {other}"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_tables() {
        let config = Config::from_toml_str(
            "workers = 4\n\
             [simrank]\n\
             decay = 0.6\n\
             max_steps = 20\n\
             [walk]\n\
             filter = false\n",
        )
        .unwrap();

        assert_eq!(config.get_i64("workers", 0).unwrap(), 4);
        assert_eq!(config.get_f64("simrank.decay", 0.8).unwrap(), 0.6);
        assert_eq!(config.get_i64("simrank.max_steps", 10).unwrap(), 20);
        assert!(!config.get_bool("walk.filter", true).unwrap());
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = Config::new();
        assert_eq!(config.get_i64("ktruss.k", 2).unwrap(), 2);
        assert_eq!(config.get_f64("simrank.decay", 0.8).unwrap(), 0.8);
        assert!(config.get_bool("walk.filter", true).unwrap());
        assert_eq!(config.get_str("mode", "full").unwrap(), "full");
    }

    #[test]
    fn string_values_coerce() {
        let mut config = Config::new();
        config.apply_override("walk.source=42").unwrap();
        config.apply_override("simrank.decay=0.5").unwrap();
        config.apply_override("walk.filter=true").unwrap();

        assert_eq!(config.get_i64("walk.source", 10).unwrap(), 42);
        assert_eq!(config.get_f64("simrank.decay", 0.8).unwrap(), 0.5);
        assert!(config.get_bool("walk.filter", false).unwrap());
    }

    #[test]
    fn wrong_types_are_errors() {
        let mut config = Config::new();
        config.set("ktruss.k", Value::Str("lots".to_string()));
        config.set("walk.filter", Value::Float(1.5));

        assert!(config.get_i64("ktruss.k", 2).is_err());
        assert!(config.get_bool("walk.filter", true).is_err());
        assert!(Config::from_toml_str("a = [1, 2]").is_err());
        assert!(config.clone().apply_override("no-equals-sign").is_err());
    }
}
