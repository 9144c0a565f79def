use crate::error::{self, Result};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

/// A source of configuration values addressed by dotted keys such as
/// `kafka.operators.catalog_source`.
///
/// Implementations only need to provide [`ConfigSource::lookup`]. Blank values are treated the
/// same as missing ones by the provided [`ConfigSource::get`], so that an empty environment
/// variable does not mask a default further down the chain.
pub trait ConfigSource: Debug + Send + Sync {
    /// Return the raw value stored for `key`, if any.
    fn lookup(&self, key: &str) -> Option<String>;

    /// Return the trimmed value for `key`, or `None` if it is missing or blank.
    fn get(&self, key: &str) -> Option<String> {
        self.lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Return the first key in `keys` that has a value.
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Parse the value for `key` as a number of seconds.
    fn seconds(&self, key: &str) -> Result<Option<Duration>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => Ok(Some(Duration::from_secs(
                value
                    .parse::<u64>()
                    .context(error::ConfigNumberSnafu { key, value })?,
            ))),
        }
    }
}

/// Typed lookups for any [`ConfigSource`], including trait objects.
pub trait ConfigSourceExt: ConfigSource {
    /// Parse the value for `key` with `serde_plain`, e.g. into an enum that derives
    /// `Deserialize`.
    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => Ok(Some(
                serde_plain::from_str(&value).context(error::ConfigValueSnafu { key, value })?,
            )),
        }
    }
}

impl<C: ConfigSource + ?Sized> ConfigSourceExt for C {}

/// Configuration held in memory.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: BTreeMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }
}

impl<K, V> FromIterator<(K, V)> for MapConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Configuration read from environment variables. The key `kafka.operators.channel` is looked
/// up as `<prefix>KAFKA_OPERATORS_CHANNEL`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The environment variable name that `key` maps to.
    pub fn variable_name(&self, key: &str) -> String {
        let suffix: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl ConfigSource for EnvConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// Configuration loaded from a YAML document. Nested mappings are flattened into dotted keys so
/// that
///
/// ```yaml
/// kafka:
///   operators:
///     channel: stable
/// ```
///
/// provides `kafka.operators.channel = stable`. Dotted keys may also be written literally.
#[derive(Debug, Clone, Default)]
pub struct YamlConfig {
    values: BTreeMap<String, String>,
}

impl YamlConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context(error::ConfigReadSnafu { path })?;
        let value: Value =
            serde_yaml::from_str(&contents).context(error::ConfigParseSnafu { path })?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let mut values = BTreeMap::new();
        flatten(None, value, &mut values);
        Self { values }
    }
}

impl ConfigSource for YamlConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn flatten(prefix: Option<&str>, value: &Value, out: &mut BTreeMap<String, String>) {
    let join = |key: &str| match prefix {
        None => key.to_string(),
        Some(prefix) => format!("{}.{}", prefix, key),
    };
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = match key {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    // Other key types cannot be addressed by a dotted string.
                    _ => continue,
                };
                flatten(Some(&join(&key)), child, out);
            }
        }
        Value::String(s) => insert(prefix, s.clone(), out),
        Value::Number(n) => insert(prefix, n.to_string(), out),
        Value::Bool(b) => insert(prefix, b.to_string(), out),
        Value::Null | Value::Sequence(_) => {}
    }
}

fn insert(key: Option<&str>, value: String, out: &mut BTreeMap<String, String>) {
    if let Some(key) = key {
        out.insert(key.to_string(), value);
    }
}

/// An ordered stack of configuration sources. The first source holding a non-blank value for a
/// key wins.
#[derive(Debug, Default)]
pub struct LayeredConfig {
    layers: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source with lower precedence than every source added so far.
    pub fn layer<C>(mut self, source: C) -> Self
    where
        C: ConfigSource + 'static,
    {
        self.layers.push(Box::new(source));
        self
    }
}

impl ConfigSource for LayeredConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}
