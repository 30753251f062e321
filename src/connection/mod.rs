//! Connection descriptors for a single Redis node or a Sentinel-monitored set.
//!
//! The descriptor is the only input the datastore client needs. It is built
//! from an environment snapshot without touching the network:
//!
//! ```rust,ignore
//! use queueboard::connection::{env_snapshot, ConnectionDescriptor};
//!
//! let descriptor = ConnectionDescriptor::from_env(&env_snapshot())?;
//! tracing::info!(target = %descriptor.target(), "Using datastore");
//! ```

pub mod builder;
pub mod descriptor;

pub use builder::{env_snapshot, parse_sentinel_hosts, EnvMap};
pub use descriptor::{
    AddressFamily, ConnectionDescriptor, NodeSettings, SentinelCluster, SentinelEndpoint,
    SentinelRole, SentinelTls, SingleNode, TlsOptions,
};
