//! Connection descriptor types.
//!
//! A [`ConnectionDescriptor`] is built once from configuration and never
//! mutated afterwards. Every optional setting is an `Option`: absence means
//! "let the driver decide" and is skipped on serialization rather than
//! emitted as an empty string or zero.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder written over secrets by [`ConnectionDescriptor::redacted`].
const REDACTED: &str = "***";

/// How to reach the datastore: one node, or a Sentinel-monitored set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionDescriptor {
    SingleNode(SingleNode),
    SentinelCluster(SentinelCluster),
}

/// A directly addressed Redis node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleNode {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<AddressFamily>,
    #[serde(flatten)]
    pub settings: NodeSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
}

/// A primary/replica set whose current address is reported by sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelCluster {
    pub sentinels: Vec<SentinelEndpoint>,
    /// Name of the monitored set, as configured on the sentinels.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SentinelRole>,
    #[serde(flatten)]
    pub settings: NodeSettings,
    /// TLS towards the data nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    /// TLS towards the sentinels themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel_tls: Option<SentinelTls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl SentinelCluster {
    /// Per-request timeout applied to sentinel queries, when overridden.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Whether the sentinel handshake itself must use TLS.
    pub fn sentinel_tls_enabled(&self) -> bool {
        self.sentinel_tls
            .as_ref()
            .is_some_and(|t| t.enable_tls_for_sentinel_mode)
    }
}

/// Per-node session settings shared by both topologies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// TCP keep-alive initial delay, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive_ms: Option<u64>,
    /// Disable Nagle's algorithm on the socket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_delay: Option<bool>,
    /// Queue commands while disconnected instead of failing them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_offline_queue: Option<bool>,
    /// Wait for the server to finish loading its dataset before use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ready_check: Option<bool>,
}

impl NodeSettings {
    /// Whether the session must confirm the dataset is loaded before use.
    pub fn ready_check(&self) -> bool {
        self.enable_ready_check == Some(true)
    }
}

/// One `host:port` sentinel address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for SentinelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Which member of a Sentinel-monitored set to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentinelRole {
    Master,
    Slave,
}

/// IP family used to resolve the single-node host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    #[serde(rename = "4")]
    V4,
    #[serde(rename = "6")]
    V6,
}

/// TLS parameters for one handshake.
///
/// `ca`, `cert` and `key` name PEM files; they are read when the client is
/// created, never by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub reject_unauthorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphers: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            ca: None,
            cert: None,
            key: None,
            server_name: None,
            reject_unauthorized: true,
            min_version: None,
            ciphers: None,
        }
    }
}

/// Sentinel-handshake TLS, negotiated independently of data-node TLS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelTls {
    pub enable_tls_for_sentinel_mode: bool,
    pub tls: TlsOptions,
}

impl ConnectionDescriptor {
    /// Session settings of the data node, whichever topology is used.
    pub fn settings(&self) -> &NodeSettings {
        match self {
            Self::SingleNode(node) => &node.settings,
            Self::SentinelCluster(cluster) => &cluster.settings,
        }
    }

    /// Data-node TLS options, if TLS is enabled.
    pub fn tls(&self) -> Option<&TlsOptions> {
        match self {
            Self::SingleNode(node) => node.tls.as_ref(),
            Self::SentinelCluster(cluster) => cluster.tls.as_ref(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::SentinelCluster(_))
    }

    /// Short human-readable target, safe to log.
    pub fn target(&self) -> String {
        match self {
            Self::SingleNode(node) => format!("{}:{}", node.host, node.port),
            Self::SentinelCluster(cluster) => {
                let sentinels: Vec<String> =
                    cluster.sentinels.iter().map(ToString::to_string).collect();
                format!("sentinel '{}' via {}", cluster.name, sentinels.join(","))
            }
        }
    }

    /// Copy of the descriptor with the password masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let settings = match &mut copy {
            Self::SingleNode(node) => &mut node.settings,
            Self::SentinelCluster(cluster) => &mut cluster.settings,
        };
        if settings.password.is_some() {
            settings.password = Some(REDACTED.to_string());
        }
        copy
    }
}
