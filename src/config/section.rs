//! Typed configuration section and its validation.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{MigctlError, Result};

/// One named configuration block, before validation.
///
/// Every field is optional here; [`ConfigSection::validate`] decides which
/// ones are required. Scalars of any YAML type are accepted and stringified so
/// that `name: 42` behaves like `name: "42"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigSection {
    #[serde(default, deserialize_with = "scalar_string")]
    pub migration_dir: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub driver: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
}

/// A section with every required key present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub migration_dir: String,
    pub driver: String,
    pub user: String,
    pub password: String,
    pub ip: String,
    pub name: String,
}

impl ConfigSection {
    /// Check required keys in a fixed order and report only the first gap.
    ///
    /// `password` is optional and defaults to the empty string.
    pub fn validate(self) -> Result<ValidatedConfig> {
        let migration_dir = require(self.migration_dir, "migration_dir")?;
        let driver = require(self.driver, "driver")?;
        let user = require(self.user, "user")?;
        let password = self.password.unwrap_or_default();
        let ip = require(self.ip, "ip")?;
        let name = require(self.name, "name")?;

        Ok(ValidatedConfig { migration_dir, driver, user, password, ip, name })
    }
}

fn require(value: Option<String>, key: &'static str) -> Result<String> {
    value.ok_or(MigctlError::Validation { key })
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Sequence(_)) => Err(de::Error::custom("expected a scalar value, found a sequence")),
        Some(Value::Mapping(_)) => Err(de::Error::custom("expected a scalar value, found a mapping")),
        Some(Value::Tagged(_)) => Err(de::Error::custom("expected a scalar value, found a tagged value")),
    }
}
