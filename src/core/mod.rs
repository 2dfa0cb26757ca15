//! Core types and traits for the MAX! Cube client
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;
pub mod trace;

pub use self::error::{Error, Result};
pub use self::trace::{Direction, NoopTrace, SharedTrace, TraceHook, TracingHexDump};
pub use self::types::{
    CubeConfig,
    DeviceType,
    RfAddress,
};

/// Default TCP port of the hub's control channel
pub const DEFAULT_PORT: u16 = 62910;

/// UDP port used for discovery requests and replies
pub const DISCOVERY_PORT: u16 = 23272;

/// Maximum number of schedules per weekday in a weekly program
pub const MAX_SCHEDULES_PER_DAY: usize = 13;

/// Minutes in one day; the last schedule of a day ends here
pub const MINUTES_PER_DAY: u16 = 1440;
