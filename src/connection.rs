//! Connection URL building for the supported drivers.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::ValidatedConfig;
use crate::error::{MigctlError, Result};

/// Characters left as-is inside the userinfo part of a URL.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Everything the engine needs to reach one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub driver: String,
    pub url: String,
    pub migration_dir: String,
}

impl ConnectionDescriptor {
    pub fn from_config(config: &ValidatedConfig) -> Result<Self> {
        let url =
            build_url(&config.driver, &config.user, &config.password, &config.ip, &config.name)?;
        Ok(Self {
            driver: config.driver.clone(),
            url,
            migration_dir: config.migration_dir.clone(),
        })
    }

    /// The URL with its password masked, for logs.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

/// Build a driver-specific DSN. Unknown drivers are rejected outright.
pub fn build_url(
    driver: &str,
    user: &str,
    password: &str,
    host_port: &str,
    db_name: &str,
) -> Result<String> {
    let user = utf8_percent_encode(user, USERINFO);
    let password = utf8_percent_encode(password, USERINFO);
    match driver {
        "postgres" => {
            Ok(format!("postgres://{}:{}@{}/{}?sslmode=disable", user, password, host_port, db_name))
        }
        "mysql" => Ok(format!("mysql://{}:{}@tcp({})/{}", user, password, host_port, db_name)),
        other => Err(MigctlError::UnsupportedDriver(other.to_string())),
    }
}

/// Mask the password between `scheme://user:` and the last `@` of the authority.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let Some(at) = rest.rfind('@') else {
        return url.to_string();
    };
    let userinfo = &rest[..at];
    match userinfo.find(':') {
        Some(colon) if colon + 1 < userinfo.len() => format!(
            "{}{}:****{}",
            &url[..scheme_end + 3],
            &userinfo[..colon],
            &rest[at..]
        ),
        _ => url.to_string(),
    }
}
