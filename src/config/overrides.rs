//! Fixed environment-variable overrides per section.

use super::section::ConfigSection;

/// Variable names consulted for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideVars {
    pub user: &'static str,
    pub password: &'static str,
    pub host: &'static str,
    pub port: &'static str,
    pub name: &'static str,
}

const OVERRIDE_TABLE: &[(&str, OverrideVars)] = &[
    (
        "db",
        OverrideVars {
            user: "K_DB_USER",
            password: "K_DB_PASSWORD",
            host: "K_DB_IP",
            port: "K_DB_PORT",
            name: "K_DB_NAME",
        },
    ),
    (
        "test_mode_db",
        OverrideVars {
            user: "K_TEST_MODE_DB_USER",
            password: "K_TEST_MODE_DB_PASSWORD",
            host: "K_TEST_MODE_DB_IP",
            port: "K_TEST_MODE_DB_PORT",
            name: "K_TEST_MODE_DB_NAME",
        },
    ),
    (
        "redshift",
        OverrideVars {
            user: "K_REDSHIFT_USER",
            password: "K_REDSHIFT_PASSWORD",
            host: "K_REDSHIFT_IP",
            port: "K_REDSHIFT_PORT",
            name: "K_REDSHIFT_NAME",
        },
    ),
];

/// Look up the override variables for `section`, if it has any.
pub fn override_vars(section: &str) -> Option<&'static OverrideVars> {
    OVERRIDE_TABLE.iter().find(|(name, _)| *name == section).map(|(_, vars)| vars)
}

/// Replace section values with non-empty environment variables.
///
/// `ip` is only replaced when both host and port are set, as `host:port`.
pub fn apply_env_overrides<F>(section: &mut ConfigSection, section_name: &str, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(vars) = override_vars(section_name) else {
        tracing::debug!("no environment overrides defined for section '{}'", section_name);
        return;
    };

    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(user) = get(vars.user) {
        tracing::debug!("{} overrides 'user'", vars.user);
        section.user = Some(user);
    }
    if let Some(password) = get(vars.password) {
        tracing::debug!("{} overrides 'password'", vars.password);
        section.password = Some(password);
    }
    match (get(vars.host), get(vars.port)) {
        (Some(host), Some(port)) => {
            tracing::debug!("{}/{} override 'ip'", vars.host, vars.port);
            section.ip = Some(format!("{}:{}", host, port));
        }
        (None, None) => {}
        _ => tracing::debug!(
            "ignoring partial 'ip' override: {} and {} must both be set",
            vars.host,
            vars.port
        ),
    }
    if let Some(name) = get(vars.name) {
        tracing::debug!("{} overrides 'name'", vars.name);
        section.name = Some(name);
    }
}
