//! Builds a [`ConnectionDescriptor`] from environment-shaped configuration.
//!
//! The builder is pure: it reads from an [`EnvMap`] snapshot and performs no
//! I/O, so the same map always yields the same descriptor.

use std::collections::BTreeMap;

use crate::error::ConfigError;

use super::descriptor::{
    AddressFamily, ConnectionDescriptor, NodeSettings, SentinelCluster, SentinelEndpoint,
    SentinelRole, SentinelTls, SingleNode, TlsOptions,
};

/// Environment-like configuration: string keys to string values.
pub type EnvMap = BTreeMap<String, String>;

/// Default host when `REDIS_HOST` is unset.
pub const DEFAULT_REDIS_HOST: &str = "localhost";

/// Default port when `REDIS_PORT` is unset.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// The only value that enables a TLS flag.
const TRUE_LITERAL: &str = "true";

/// Snapshot of the process environment.
pub fn env_snapshot() -> EnvMap {
    std::env::vars().collect()
}

impl ConnectionDescriptor {
    /// Builds the descriptor described by `env`.
    ///
    /// A non-empty `SENTINEL_HOSTS` selects Sentinel mode; otherwise a single
    /// node is addressed through `REDIS_HOST` / `REDIS_PORT`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidConfiguration` for malformed sentinel
    /// entries, non-numeric ports or database indexes, and unknown roles or
    /// address families.
    pub fn from_env(env: &EnvMap) -> Result<Self, ConfigError> {
        let settings = node_settings(env)?;
        let tls = tls_options(env, "REDIS_USE_TLS", "REDIS_TLS")?;

        match value(env, "SENTINEL_HOSTS") {
            Some(hosts) => {
                let sentinels = parse_sentinel_hosts(hosts)?;
                let name = value(env, "SENTINEL_NAME")
                    .ok_or_else(|| {
                        ConfigError::invalid("SENTINEL_NAME", "required when SENTINEL_HOSTS is set")
                    })?
                    .to_string();
                let role = value(env, "SENTINEL_ROLE").map(parse_role).transpose()?;
                let sentinel_tls = tls_options(env, "SENTINEL_USE_TLS", "SENTINEL_TLS")?.map(
                    |tls| SentinelTls {
                        enable_tls_for_sentinel_mode: true,
                        tls,
                    },
                );
                let request_timeout_ms = value(env, "SENTINEL_REQUEST_TIMEOUT_MS")
                    .map(|raw| parse_number::<u64>("SENTINEL_REQUEST_TIMEOUT_MS", raw))
                    .transpose()?;

                Ok(Self::SentinelCluster(SentinelCluster {
                    sentinels,
                    name,
                    role,
                    settings,
                    tls,
                    sentinel_tls,
                    request_timeout_ms,
                }))
            }
            None => {
                let host = value(env, "REDIS_HOST")
                    .unwrap_or(DEFAULT_REDIS_HOST)
                    .to_string();
                let port = value(env, "REDIS_PORT")
                    .map(|raw| parse_number::<u16>("REDIS_PORT", raw))
                    .transpose()?
                    .unwrap_or(DEFAULT_REDIS_PORT);
                let family = value(env, "REDIS_FAMILY").map(parse_family).transpose()?.flatten();

                Ok(Self::SingleNode(SingleNode {
                    host,
                    port,
                    family,
                    settings,
                    tls,
                }))
            }
        }
    }
}

/// Parses a sentinel host list such as `host1:26379,host2:26379;host3:26379`.
///
/// Commas and semicolons are both accepted, also mixed in one string.
/// Empty segments left by trailing separators are skipped.
pub fn parse_sentinel_hosts(raw: &str) -> Result<Vec<SentinelEndpoint>, ConfigError> {
    let mut endpoints = Vec::new();

    for entry in raw.split([',', ';']).map(str::trim) {
        if entry.is_empty() {
            continue;
        }

        let (host, port) = entry.rsplit_once(':').ok_or_else(|| {
            ConfigError::invalid(
                "SENTINEL_HOSTS",
                format!("entry '{}' is not in host:port form", entry),
            )
        })?;
        if host.is_empty() {
            return Err(ConfigError::invalid(
                "SENTINEL_HOSTS",
                format!("entry '{}' has an empty host", entry),
            ));
        }
        let port = port.parse::<u16>().map_err(|_| {
            ConfigError::invalid(
                "SENTINEL_HOSTS",
                format!("entry '{}' has a non-numeric port", entry),
            )
        })?;

        endpoints.push(SentinelEndpoint {
            host: host.to_string(),
            port,
        });
    }

    if endpoints.is_empty() {
        return Err(ConfigError::invalid(
            "SENTINEL_HOSTS",
            "no sentinel endpoint in host list",
        ));
    }

    Ok(endpoints)
}

/// Non-empty, trimmed value for `key`.
fn value<'a>(env: &'a EnvMap, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a valid number", raw)))
}

fn node_settings(env: &EnvMap) -> Result<NodeSettings, ConfigError> {
    Ok(NodeSettings {
        db: value(env, "REDIS_DB")
            .map(|raw| parse_number::<i64>("REDIS_DB", raw))
            .transpose()?,
        username: value(env, "REDIS_USER").map(str::to_string),
        password: value(env, "REDIS_PASSWORD").map(str::to_string),
        keep_alive_ms: value(env, "REDIS_KEEP_ALIVE")
            .map(|raw| parse_number::<u64>("REDIS_KEEP_ALIVE", raw))
            .transpose()?,
        no_delay: parse_flag(env, "REDIS_NO_DELAY")?,
        enable_offline_queue: parse_flag(env, "REDIS_ENABLE_OFFLINE_QUEUE")?,
        enable_ready_check: parse_flag(env, "REDIS_ENABLE_READY_CHECK")?,
    })
}

/// Optional `true`/`false` value for `key`.
fn parse_flag(env: &EnvMap, key: &str) -> Result<Option<bool>, ConfigError> {
    match value(env, key) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(ConfigError::invalid(
            key,
            format!("'{}' is not a boolean", other),
        )),
    }
}

fn parse_role(raw: &str) -> Result<SentinelRole, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "master" => Ok(SentinelRole::Master),
        "slave" | "replica" => Ok(SentinelRole::Slave),
        other => Err(ConfigError::invalid(
            "SENTINEL_ROLE",
            format!("unknown role '{}', expected master or slave", other),
        )),
    }
}

/// `0` means "either family", which is the driver default.
fn parse_family(raw: &str) -> Result<Option<AddressFamily>, ConfigError> {
    match raw {
        "0" => Ok(None),
        "4" => Ok(Some(AddressFamily::V4)),
        "6" => Ok(Some(AddressFamily::V6)),
        other => Err(ConfigError::invalid(
            "REDIS_FAMILY",
            format!("unknown address family '{}', expected 4 or 6", other),
        )),
    }
}

/// TLS bundle gated by `flag_key`, with sub-options read from `<prefix>_*`.
fn tls_options(
    env: &EnvMap,
    flag_key: &str,
    prefix: &str,
) -> Result<Option<TlsOptions>, ConfigError> {
    if env.get(flag_key).map(String::as_str) != Some(TRUE_LITERAL) {
        return Ok(None);
    }

    let sub = |suffix: &str| value(env, &format!("{}_{}", prefix, suffix)).map(str::to_string);

    let reject_unauthorized =
        parse_flag(env, &format!("{}_REJECT_UNAUTHORIZED", prefix))?.unwrap_or(true);

    Ok(Some(TlsOptions {
        ca: sub("CA"),
        cert: sub("CERT"),
        key: sub("KEY"),
        server_name: sub("SERVERNAME"),
        reject_unauthorized,
        min_version: sub("MIN_VERSION"),
        ciphers: sub("CIPHERS"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_yield_local_single_node() {
        let descriptor = ConnectionDescriptor::from_env(&EnvMap::new()).expect("valid");

        match descriptor {
            ConnectionDescriptor::SingleNode(node) => {
                assert_eq!(node.host, "localhost");
                assert_eq!(node.port, 6379);
                assert_eq!(node.settings, NodeSettings::default());
                assert!(node.tls.is_none());
                assert!(node.family.is_none());
            }
            other => panic!("expected single node, got {:?}", other),
        }
    }

    #[test]
    fn test_single_node_copies_settings() {
        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("REDIS_HOST", "redis-server"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DB", "1"),
            ("REDIS_USER", "user"),
            ("REDIS_PASSWORD", "password"),
            ("REDIS_FAMILY", "6"),
        ]))
        .expect("valid");

        let ConnectionDescriptor::SingleNode(node) = descriptor else {
            panic!("expected single node");
        };
        assert_eq!(node.host, "redis-server");
        assert_eq!(node.port, 6380);
        assert_eq!(node.family, Some(AddressFamily::V6));
        assert_eq!(node.settings.db, Some(1));
        assert_eq!(node.settings.username.as_deref(), Some("user"));
        assert_eq!(node.settings.password.as_deref(), Some("password"));
    }

    #[test]
    fn test_client_options_are_copied() {
        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("REDIS_KEEP_ALIVE", "5000"),
            ("REDIS_NO_DELAY", "true"),
            ("REDIS_ENABLE_OFFLINE_QUEUE", "false"),
            ("REDIS_ENABLE_READY_CHECK", "true"),
        ]))
        .expect("valid");

        let settings = descriptor.settings();
        assert_eq!(settings.keep_alive_ms, Some(5000));
        assert_eq!(settings.no_delay, Some(true));
        assert_eq!(settings.enable_offline_queue, Some(false));
        assert_eq!(settings.enable_ready_check, Some(true));
        assert!(settings.ready_check());
    }

    #[test]
    fn test_client_options_apply_in_sentinel_mode() {
        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("SENTINEL_HOSTS", "host1:26379"),
            ("SENTINEL_NAME", "mymaster"),
            ("REDIS_ENABLE_READY_CHECK", "false"),
        ]))
        .expect("valid");

        assert!(descriptor.is_sentinel());
        assert_eq!(descriptor.settings().enable_ready_check, Some(false));
        assert!(!descriptor.settings().ready_check());
        assert_eq!(descriptor.settings().keep_alive_ms, None);
    }

    #[test]
    fn test_client_options_reject_malformed_values() {
        assert!(ConnectionDescriptor::from_env(&env(&[("REDIS_KEEP_ALIVE", "soon")])).is_err());
        assert!(ConnectionDescriptor::from_env(&env(&[("REDIS_NO_DELAY", "yes")])).is_err());
        let err = ConnectionDescriptor::from_env(&env(&[("REDIS_ENABLE_OFFLINE_QUEUE", "1")]))
            .expect_err("not a boolean");
        assert!(err.to_string().contains("REDIS_ENABLE_OFFLINE_QUEUE"));
    }

    #[test]
    fn test_empty_values_are_treated_as_absent() {
        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("SENTINEL_HOSTS", ""),
            ("REDIS_PASSWORD", ""),
            ("REDIS_DB", "  "),
        ]))
        .expect("valid");

        assert!(!descriptor.is_sentinel());
        assert_eq!(descriptor.settings(), &NodeSettings::default());
    }

    #[test]
    fn test_sentinel_hosts_comma_separated() {
        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("SENTINEL_HOSTS", "host1:26379,host2:26379"),
            ("SENTINEL_NAME", "mymaster"),
            ("SENTINEL_ROLE", "master"),
        ]))
        .expect("valid");

        let ConnectionDescriptor::SentinelCluster(cluster) = descriptor else {
            panic!("expected sentinel cluster");
        };
        assert_eq!(cluster.name, "mymaster");
        assert_eq!(cluster.role, Some(SentinelRole::Master));
        assert_eq!(
            cluster.sentinels,
            vec![
                SentinelEndpoint {
                    host: "host1".to_string(),
                    port: 26379
                },
                SentinelEndpoint {
                    host: "host2".to_string(),
                    port: 26379
                },
            ]
        );
    }

    #[test]
    fn test_sentinel_hosts_semicolon_and_mixed() {
        let semicolon = parse_sentinel_hosts("host1:26379;host2:26379").expect("valid");
        assert_eq!(semicolon.len(), 2);

        let mixed = parse_sentinel_hosts("a:1,b:2;c:3").expect("valid");
        let ports: Vec<u16> = mixed.iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![1, 2, 3]);
        assert_eq!(mixed[2].host, "c");
    }

    #[test]
    fn test_sentinel_hosts_trailing_separator_ignored() {
        let endpoints = parse_sentinel_hosts("host1:26379, host2:26380;").expect("valid");
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].host, "host2");
    }

    #[test]
    fn test_sentinel_hosts_malformed_entries() {
        assert!(parse_sentinel_hosts("host1").is_err());
        assert!(parse_sentinel_hosts("host1:abc").is_err());
        assert!(parse_sentinel_hosts("host1:26379,host2").is_err());
        assert!(parse_sentinel_hosts(":26379").is_err());
        assert!(parse_sentinel_hosts(",;").is_err());
    }

    #[test]
    fn test_sentinel_requires_name() {
        let err = ConnectionDescriptor::from_env(&env(&[("SENTINEL_HOSTS", "host1:26379")]))
            .expect_err("missing name");
        assert!(err.to_string().contains("SENTINEL_NAME"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = ConnectionDescriptor::from_env(&env(&[
            ("SENTINEL_HOSTS", "host1:26379"),
            ("SENTINEL_NAME", "mymaster"),
            ("SENTINEL_ROLE", "leader"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_tls_only_for_exact_true_literal() {
        for flag in ["false", "TRUE", "1", "yes", ""] {
            let descriptor =
                ConnectionDescriptor::from_env(&env(&[("REDIS_USE_TLS", flag)])).expect("valid");
            assert!(descriptor.tls().is_none(), "flag {:?} enabled TLS", flag);
        }

        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("REDIS_USE_TLS", "true"),
            ("REDIS_TLS_CA", "/certs/ca.pem"),
            ("REDIS_TLS_SERVERNAME", "redis.internal"),
            ("REDIS_TLS_REJECT_UNAUTHORIZED", "false"),
            ("REDIS_TLS_MIN_VERSION", "TLSv1.2"),
        ]))
        .expect("valid");

        let tls = descriptor.tls().expect("tls enabled");
        assert_eq!(tls.ca.as_deref(), Some("/certs/ca.pem"));
        assert_eq!(tls.server_name.as_deref(), Some("redis.internal"));
        assert!(!tls.reject_unauthorized);
        assert_eq!(tls.min_version.as_deref(), Some("TLSv1.2"));
        assert!(tls.cert.is_none());
    }

    #[test]
    fn test_sentinel_tls_independent_of_data_tls() {
        let descriptor = ConnectionDescriptor::from_env(&env(&[
            ("SENTINEL_HOSTS", "host1:26379"),
            ("SENTINEL_NAME", "mymaster"),
            ("SENTINEL_USE_TLS", "true"),
            ("SENTINEL_TLS_CA", "/certs/sentinel-ca.pem"),
        ]))
        .expect("valid");

        let ConnectionDescriptor::SentinelCluster(cluster) = descriptor else {
            panic!("expected sentinel cluster");
        };
        assert!(cluster.tls.is_none());
        assert!(cluster.sentinel_tls_enabled());
        let sentinel_tls = cluster.sentinel_tls.expect("sentinel tls");
        assert_eq!(sentinel_tls.tls.ca.as_deref(), Some("/certs/sentinel-ca.pem"));
        assert!(sentinel_tls.tls.reject_unauthorized);
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(ConnectionDescriptor::from_env(&env(&[("REDIS_PORT", "redis")])).is_err());
        assert!(ConnectionDescriptor::from_env(&env(&[("REDIS_PORT", "70000")])).is_err());
        assert!(ConnectionDescriptor::from_env(&env(&[("REDIS_DB", "zero")])).is_err());
        assert!(ConnectionDescriptor::from_env(&env(&[("REDIS_FAMILY", "5")])).is_err());
        assert!(ConnectionDescriptor::from_env(&env(&[
            ("REDIS_USE_TLS", "true"),
            ("REDIS_TLS_REJECT_UNAUTHORIZED", "maybe"),
        ]))
        .is_err());
    }

    #[test]
    fn test_builder_is_deterministic() {
        let config = env(&[
            ("SENTINEL_HOSTS", "b:2;a:1"),
            ("SENTINEL_NAME", "set"),
            ("SENTINEL_REQUEST_TIMEOUT_MS", "1500"),
            ("REDIS_USE_TLS", "true"),
        ]);
        let first = ConnectionDescriptor::from_env(&config).expect("valid");
        let second = ConnectionDescriptor::from_env(&config).expect("valid");
        assert_eq!(first, second);
    }
}
