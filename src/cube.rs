//! Command facade over one hub connection
//!
//! [`Cube`] validates arguments through the command builders, sends each
//! command, waits for the hub to go quiet and then reports the hub's answer.
//! Methods take `&mut self`, so at most one command is ever in flight.

use chrono::{NaiveDateTime, Weekday};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::core::{CubeConfig, Error, Result, RfAddress, SharedTrace};
use crate::network::{Connection, DrainReport};
use crate::protocol::{
    Command, CommandResult, CubeSettings, CubeState, Device, DeviceStatus, HubInfo, Message,
    MessageType, Mode, NtpConfig, ProgramSchedule, Room, SetProgram, SetTemperatureAndMode,
    SetTemperatureProfile, SetValveConfig, TemperatureProfile, ValveConfig,
};

/// High-level client for one hub
pub struct Cube<S = TcpStream> {
    config: CubeConfig,
    connection: Connection<S>,
}

impl Cube {
    pub fn new(config: CubeConfig) -> Self {
        let connection = Connection::new(config.read_timeout);
        Cube { config, connection }
    }

    pub fn with_trace(config: CubeConfig, trace: SharedTrace) -> Self {
        let connection = Connection::with_trace(config.read_timeout, trace);
        Cube { config, connection }
    }

    /// Connects to the configured hub and loads its greeting
    pub async fn connect(&mut self) -> Result<()> {
        let report = self.connection.connect(&self.config).await?;
        log_report("connect", &report);
        Ok(())
    }
}

impl<S> Cube<S> {
    /// Wraps an existing, possibly disconnected, connection
    pub fn from_connection(config: CubeConfig, connection: Connection<S>) -> Self {
        Cube { config, connection }
    }

    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn state(&self) -> &CubeState {
        self.connection.state()
    }

    /// Details from the hub's greeting
    pub fn info(&self) -> Option<&HubInfo> {
        self.state().hub()
    }

    pub fn cube_settings(&self) -> Option<&CubeSettings> {
        self.state().cube_settings()
    }

    pub fn rooms(&self) -> &[Room] {
        self.state().rooms()
    }

    pub fn devices(&self) -> &[Device] {
        self.state().devices()
    }

    pub fn device(&self, rf_address: &RfAddress) -> Option<&Device> {
        self.state().device(rf_address)
    }

    /// NTP servers from the last `F` reply
    pub fn ntp_servers(&self) -> Option<&NtpConfig> {
        self.state().ntp_servers()
    }
}

impl<S> Cube<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Uses an already open stream as the control channel
    pub async fn attach(&mut self, stream: S) -> Result<()> {
        let report = self.connection.attach(stream).await?;
        log_report("attach", &report);
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.connection.disconnect().await
    }

    /// Asks every device for its current status
    pub async fn refresh_status(&mut self) -> Result<Vec<DeviceStatus>> {
        let report = self.request(&Command::RequestStatus).await?;
        report
            .messages
            .into_iter()
            .rev()
            .find_map(|message| match message {
                Message::Status(statuses) => Some(statuses),
                _ => None,
            })
            .ok_or_else(|| Error::timeout("hub sent no status list"))
    }

    /// Queries the hub's NTP servers
    pub async fn query_ntp_servers(&mut self) -> Result<NtpConfig> {
        self.ntp_request(Command::QueryNtpServers).await
    }

    /// Replaces the hub's NTP servers, returning the list the hub reports back
    pub async fn set_ntp_servers(&mut self, servers: NtpConfig) -> Result<NtpConfig> {
        self.ntp_request(Command::SetNtpServers(servers)).await
    }

    async fn ntp_request(&mut self, command: Command) -> Result<NtpConfig> {
        self.connection.clear_last_response(MessageType::NtpServers);
        self.request(&command).await?;
        match self.connection.last_response(MessageType::NtpServers) {
            Some(Message::NtpServers(config)) => Ok(config.clone()),
            _ => Err(Error::timeout("hub sent no NTP server list")),
        }
    }

    /// Returns the thermostat to its weekly program; `temperature` overrides
    /// the current interval's set-point until the next one starts.
    pub async fn set_mode_auto(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        temperature: Option<f32>,
    ) -> Result<CommandResult> {
        self.set_temperature_and_mode(rf_address, room_id, Mode::Auto, temperature, None)
            .await
    }

    pub async fn set_mode_manual(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        temperature: f32,
    ) -> Result<CommandResult> {
        self.set_temperature_and_mode(rf_address, room_id, Mode::Manual, Some(temperature), None)
            .await
    }

    pub async fn set_mode_boost(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        temperature: Option<f32>,
    ) -> Result<CommandResult> {
        self.set_temperature_and_mode(rf_address, room_id, Mode::Boost, temperature, None)
            .await
    }

    /// Holds `temperature` until `end`
    pub async fn set_mode_vacation(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        temperature: f32,
        end: NaiveDateTime,
    ) -> Result<CommandResult> {
        self.set_temperature_and_mode(rf_address, room_id, Mode::Vacation, Some(temperature), Some(end))
            .await
    }

    pub async fn set_temperature_and_mode(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        mode: Mode,
        temperature: Option<f32>,
        end: Option<NaiveDateTime>,
    ) -> Result<CommandResult> {
        let command = SetTemperatureAndMode::new(rf_address, room_id, mode, temperature, end)?;
        self.execute(Command::SetTemperatureAndMode(command)).await
    }

    /// Replaces one weekday of a thermostat's program
    pub async fn set_program(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        day: Weekday,
        schedules: Vec<ProgramSchedule>,
    ) -> Result<CommandResult> {
        let command = SetProgram::new(rf_address, room_id, day, schedules)?;
        self.execute(Command::SetProgram(command)).await
    }

    pub async fn set_temperature_profile(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        profile: TemperatureProfile,
    ) -> Result<CommandResult> {
        let command = SetTemperatureProfile::new(rf_address, room_id, profile)?;
        self.execute(Command::SetTemperatureProfile(command)).await
    }

    pub async fn set_valve_config(
        &mut self,
        rf_address: RfAddress,
        room_id: u8,
        config: ValveConfig,
    ) -> Result<CommandResult> {
        let command = SetValveConfig::new(rf_address, room_id, config)?;
        self.execute(Command::SetValveConfig(command)).await
    }

    /// Sends a set command and returns the hub's `S` reply
    ///
    /// A rejected command is still returned; check [`CommandResult::is_success`].
    pub async fn execute(&mut self, command: Command) -> Result<CommandResult> {
        if !command.expects_result() {
            return Err(Error::validation("only set commands produce a command result"));
        }
        self.connection.clear_last_response(MessageType::CommandResult);
        self.request(&command).await?;

        match self.connection.last_response(MessageType::CommandResult) {
            Some(Message::CommandResult(result)) => {
                if !result.is_success() {
                    warn!("hub rejected command with result code {}", result.result_code);
                }
                Ok(*result)
            }
            _ => Err(Error::timeout("hub sent no command result")),
        }
    }

    async fn request(&mut self, command: &Command) -> Result<DrainReport> {
        let report = self.connection.send(command).await?;
        log_report(&format!("{:?}", command.tag() as char), &report);
        Ok(report)
    }
}

fn log_report(what: &str, report: &DrainReport) {
    debug!(
        "{}: {} messages decoded, {} dropped",
        what,
        report.messages.len(),
        report.errors.len()
    );
    if report.closed {
        warn!("{}: hub closed the connection", what);
    }
}
