//! maxcube: client-side protocol engine for MAX! Cube heating hubs
//!
//! This library discovers hubs over UDP, talks to them over the line-framed
//! TCP control channel, encodes thermostat commands, decodes every reply
//! type and keeps an in-memory model of the hub's rooms and devices.
pub mod core;

pub mod cube;
pub mod network;
pub mod protocol;
pub mod util;

// Re-export commonly used items
pub use crate::core::{CubeConfig, DeviceType, Error, Result, RfAddress};
pub use crate::cube::Cube;
pub use crate::network::{Discovery, DiscoveryConfig, DiscoveryType};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
