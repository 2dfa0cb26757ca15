//! Protocol implementation module
//!
//! This module defines the hub's line framing, the decoded message kinds,
//! the outbound commands and the client-side state store built from them.

pub mod codec;
pub mod command;
pub mod configuration;
pub mod message;
pub mod state;

pub use self::codec::{Frame, LineCodec, RawLine};
pub use self::command::{
    Command, Mode, SetProgram, SetTemperatureAndMode, SetTemperatureProfile, SetValveConfig,
    TemperatureProfile, ValveConfig,
};
pub use self::configuration::{
    ConfigurationKind, ConfigurationMessage, CubeSettings, Decalcification, DeviceConfiguration,
    ProgramSchedule, WeeklyProgram,
};
pub use self::message::{
    CommandResult, DeviceEntry, DeviceStatus, Directory, HubInfo, Message, MessageType, NtpConfig,
    ProgramMode, RoomEntry, RuntimeStatus,
};
pub use self::state::{CubeState, Device, DeviceUpdate, Room};
