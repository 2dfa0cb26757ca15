//! Network access to the hub
//!
//! This module handles UDP discovery and the TCP control channel.

mod connection;
mod discovery;

pub use self::connection::{Connection, DrainReport};
pub use self::discovery::{
    build_request, Discovery, DiscoveryConfig, DiscoveryResponse, DiscoveryType,
    IdentifyResponse, NetworkConfigResponse,
};
