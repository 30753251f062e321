//! Loads the PEM material named by [`TlsOptions`] for the driver.

use std::path::Path;

use redis::{ClientTlsConfig, TlsCertificates};
use tracing::warn;

use crate::connection::TlsOptions;
use crate::error::DatastoreError;

/// TLS settings in the form the driver consumes.
#[derive(Debug, Clone, Default)]
pub(crate) struct TlsMaterial {
    /// Skip certificate verification (`reject_unauthorized = false`).
    pub insecure: bool,
    pub root_cert: Option<Vec<u8>>,
    pub client_cert: Option<Vec<u8>>,
    pub client_key: Option<Vec<u8>>,
}

impl TlsMaterial {
    /// Reads CA, certificate and key files referenced by `options`.
    ///
    /// `label` names the handshake ("redis" or "sentinel") in log output.
    pub fn load(options: &TlsOptions, label: &str) -> Result<Self, DatastoreError> {
        for (name, set) in [
            ("server_name", options.server_name.is_some()),
            ("min_version", options.min_version.is_some()),
            ("ciphers", options.ciphers.is_some()),
        ] {
            if set {
                warn!(handshake = label, option = name, "TLS option not supported by the Redis driver, ignoring");
            }
        }

        let mut material = Self {
            insecure: !options.reject_unauthorized,
            root_cert: options.ca.as_deref().map(read_pem).transpose()?,
            client_cert: options.cert.as_deref().map(read_pem).transpose()?,
            client_key: options.key.as_deref().map(read_pem).transpose()?,
        };

        if material.client_cert.is_some() != material.client_key.is_some() {
            warn!(
                handshake = label,
                "TLS client certificate and key must be configured together, ignoring client identity"
            );
            material.client_cert = None;
            material.client_key = None;
        }

        Ok(material)
    }

    /// Custom certificates for `Client::build_with_tls`, when any are set.
    pub fn certificates(&self) -> Option<TlsCertificates> {
        let client_tls = match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) => Some(ClientTlsConfig {
                client_cert: cert.clone(),
                client_key: key.clone(),
            }),
            _ => None,
        };

        if client_tls.is_none() && self.root_cert.is_none() {
            return None;
        }

        Some(TlsCertificates {
            client_tls,
            root_cert: self.root_cert.clone(),
        })
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>, DatastoreError> {
    std::fs::read(Path::new(path)).map_err(|source| DatastoreError::TlsMaterial {
        path: path.to_string(),
        source,
    })
}
