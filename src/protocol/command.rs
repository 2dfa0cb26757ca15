//! Outbound commands
//!
//! Every command is written as `<tag>:<payload>\r\n`. Set commands carry a
//! base64 payload made of a 6-byte opcode, the target RF address, the room
//! id and a command-specific tail. Constructors validate their arguments, so
//! an invalid command is rejected before any byte is produced.

use base64::{engine::general_purpose, Engine as _};
use chrono::{NaiveDateTime, Weekday};

use crate::core::{Error, Result, RfAddress};
use crate::util;
use super::configuration::{self, Decalcification, ProgramSchedule};
use super::message::NtpConfig;

const OPCODE_TEMPERATURE_AND_MODE: [u8; 6] = [0x00, 0x04, 0x40, 0x00, 0x00, 0x00];
const OPCODE_PROGRAM: [u8; 6] = [0x00, 0x04, 0x10, 0x00, 0x00, 0x00];
const OPCODE_TEMPERATURE_PROFILE: [u8; 6] = [0x00, 0x00, 0x11, 0x00, 0x00, 0x00];
const OPCODE_VALVE_CONFIG: [u8; 6] = [0x00, 0x04, 0x12, 0x00, 0x00, 0x00];

/// Thermostat operating mode, as the top two bits of the temperature byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto = 0x00,
    Manual = 0x40,
    Vacation = 0x80,
    Boost = 0xc0,
}

/// Sets a thermostat's mode and, optionally, its target temperature
#[derive(Debug, Clone, PartialEq)]
pub struct SetTemperatureAndMode {
    pub rf_address: RfAddress,
    pub room_id: u8,
    pub mode: Mode,
    pub temperature: Option<f32>,
    /// Required for vacation mode, ignored otherwise
    pub end: Option<NaiveDateTime>,
}

impl SetTemperatureAndMode {
    pub fn new(
        rf_address: RfAddress,
        room_id: u8,
        mode: Mode,
        temperature: Option<f32>,
        end: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let command = SetTemperatureAndMode {
            rf_address,
            room_id,
            mode,
            temperature,
            end,
        };
        command.tail()?;
        Ok(command)
    }

    fn tail(&self) -> Result<Vec<u8>> {
        let temperature = match self.temperature {
            Some(t) => util::encode_temperature(t)?,
            None => 0,
        };
        if temperature > 0x3f {
            return Err(Error::validation(format!(
                "temperature {:?} does not fit beside the mode bits",
                self.temperature
            )));
        }
        let mut tail = vec![temperature | self.mode as u8];
        if self.mode == Mode::Vacation {
            let end = self
                .end
                .ok_or_else(|| Error::validation("vacation mode requires an end date"))?;
            tail.extend(util::date_to_dateuntil(end.date())?);
            tail.push(util::time_to_half_hours(end.time()));
        }
        Ok(tail)
    }
}

/// Replaces one weekday of a thermostat's weekly program
#[derive(Debug, Clone, PartialEq)]
pub struct SetProgram {
    pub rf_address: RfAddress,
    pub room_id: u8,
    pub day: Weekday,
    pub schedules: Vec<ProgramSchedule>,
}

impl SetProgram {
    pub fn new(
        rf_address: RfAddress,
        room_id: u8,
        day: Weekday,
        schedules: Vec<ProgramSchedule>,
    ) -> Result<Self> {
        configuration::validate_day_prefix(&schedules)?;
        let command = SetProgram {
            rf_address,
            room_id,
            day,
            schedules,
        };
        command.tail()?;
        Ok(command)
    }

    fn tail(&self) -> Result<Vec<u8>> {
        let mut tail = Vec::with_capacity(1 + self.schedules.len() * 2);
        tail.push(util::py_day_to_cube_day(self.day));
        for schedule in &self.schedules {
            tail.extend(schedule.to_word()?);
        }
        Ok(tail)
    }
}

/// Comfort/eco/limit set-points and window-open behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureProfile {
    pub comfort: f32,
    pub eco: f32,
    pub max: f32,
    pub min: f32,
    pub offset: f32,
    pub window_open_temperature: f32,
    /// Minutes
    pub window_open_duration: u16,
}

impl Default for TemperatureProfile {
    fn default() -> Self {
        TemperatureProfile {
            comfort: 21.5,
            eco: 16.5,
            max: 30.5,
            min: 4.5,
            offset: 0.0,
            window_open_temperature: 12.0,
            window_open_duration: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTemperatureProfile {
    pub rf_address: RfAddress,
    pub room_id: u8,
    pub profile: TemperatureProfile,
}

impl SetTemperatureProfile {
    pub fn new(rf_address: RfAddress, room_id: u8, profile: TemperatureProfile) -> Result<Self> {
        if profile.min > profile.max {
            return Err(Error::validation(format!(
                "minimum set-point {} exceeds maximum {}",
                profile.min, profile.max
            )));
        }
        let command = SetTemperatureProfile {
            rf_address,
            room_id,
            profile,
        };
        command.tail()?;
        Ok(command)
    }

    fn tail(&self) -> Result<Vec<u8>> {
        let p = &self.profile;
        Ok(vec![
            util::encode_temperature(p.comfort)?,
            util::encode_temperature(p.eco)?,
            util::encode_temperature(p.max)?,
            util::encode_temperature(p.min)?,
            util::encode_temperature_offset(p.offset)?,
            util::encode_temperature(p.window_open_temperature)?,
            util::encode_window_open_duration(p.window_open_duration)?,
        ])
    }
}

/// Boost, decalcification and valve limit settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveConfig {
    /// Minutes: 0-30 in steps of 5, or 60
    pub boost_duration: u16,
    /// Percent
    pub boost_valve_position: u8,
    pub decalcification: Decalcification,
    /// Percent
    pub max_valve_setting: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetValveConfig {
    pub rf_address: RfAddress,
    pub room_id: u8,
    pub config: ValveConfig,
}

impl SetValveConfig {
    pub fn new(rf_address: RfAddress, room_id: u8, config: ValveConfig) -> Result<Self> {
        let command = SetValveConfig {
            rf_address,
            room_id,
            config,
        };
        command.tail()?;
        Ok(command)
    }

    fn tail(&self) -> Result<Vec<u8>> {
        let c = &self.config;
        Ok(vec![
            util::encode_boost(c.boost_duration, c.boost_valve_position)?,
            util::encode_decalcification(c.decalcification.day, c.decalcification.hour)?,
            util::encode_valve_percentage(c.max_valve_setting)?,
            0x00,
        ])
    }
}

/// Request sent to the hub
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ends the session
    Quit,
    /// Asks for a fresh `L` status list
    RequestStatus,
    /// Asks for the NTP server list
    QueryNtpServers,
    SetNtpServers(NtpConfig),
    SetTemperatureAndMode(SetTemperatureAndMode),
    SetProgram(SetProgram),
    SetTemperatureProfile(SetTemperatureProfile),
    SetValveConfig(SetValveConfig),
}

impl Command {
    pub fn tag(&self) -> u8 {
        match self {
            Command::Quit => b'q',
            Command::RequestStatus => b'l',
            Command::QueryNtpServers | Command::SetNtpServers(_) => b'f',
            Command::SetTemperatureAndMode(_)
            | Command::SetProgram(_)
            | Command::SetTemperatureProfile(_)
            | Command::SetValveConfig(_) => b's',
        }
    }

    /// Whether the hub answers this command with an `S` result
    pub fn expects_result(&self) -> bool {
        self.tag() == b's'
    }

    /// Binary body of a set command, before base64
    pub fn set_body(&self) -> Result<Option<Vec<u8>>> {
        let (opcode, rf_address, room_id, tail) = match self {
            Command::SetTemperatureAndMode(c) => {
                (OPCODE_TEMPERATURE_AND_MODE, c.rf_address, c.room_id, c.tail()?)
            }
            Command::SetProgram(c) => (OPCODE_PROGRAM, c.rf_address, c.room_id, c.tail()?),
            Command::SetTemperatureProfile(c) => {
                (OPCODE_TEMPERATURE_PROFILE, c.rf_address, c.room_id, c.tail()?)
            }
            Command::SetValveConfig(c) => (OPCODE_VALVE_CONFIG, c.rf_address, c.room_id, c.tail()?),
            _ => return Ok(None),
        };
        let mut body = Vec::with_capacity(10 + tail.len());
        body.extend(opcode);
        body.extend(rf_address.as_bytes());
        body.push(room_id);
        body.extend(tail);
        Ok(Some(body))
    }

    /// Text after the `<tag>:` prefix
    pub fn payload(&self) -> Result<String> {
        if let Some(body) = self.set_body()? {
            return Ok(general_purpose::STANDARD.encode(body));
        }
        Ok(match self {
            Command::SetNtpServers(config) => config.to_payload(),
            _ => String::new(),
        })
    }

    /// Full wire form, including the line terminator
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = self.payload()?;
        let mut bytes = Vec::with_capacity(payload.len() + 4);
        bytes.push(self.tag());
        bytes.push(b':');
        bytes.extend(payload.as_bytes());
        bytes.extend(b"\r\n");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rf() -> RfAddress {
        "122B65".parse().unwrap()
    }

    fn body(command: &Command) -> Vec<u8> {
        let bytes = command.to_bytes().unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        let payload = text.strip_prefix("s:").unwrap().strip_suffix("\r\n").unwrap();
        general_purpose::STANDARD.decode(payload).unwrap()
    }

    #[test]
    fn test_quit_bytes() {
        assert_eq!(Command::Quit.to_bytes().unwrap(), b"q:\r\n".to_vec());
        assert_eq!(Command::RequestStatus.to_bytes().unwrap(), b"l:\r\n".to_vec());
    }

    #[test]
    fn test_ntp_commands() {
        assert_eq!(Command::QueryNtpServers.to_bytes().unwrap(), b"f:\r\n".to_vec());
        let set = Command::SetNtpServers(NtpConfig::new(["foo", "bar", "foo"]));
        assert_eq!(set.to_bytes().unwrap(), b"f:foo,bar,foo\r\n".to_vec());
    }

    #[test]
    fn test_set_temperature_and_mode_manual() {
        let command = Command::SetTemperatureAndMode(
            SetTemperatureAndMode::new(rf(), 1, Mode::Manual, Some(19.0), None).unwrap(),
        );
        assert_eq!(
            body(&command),
            vec![0x00, 0x04, 0x40, 0x00, 0x00, 0x00, 0x12, 0x2b, 0x65, 0x01, 0x66]
        );
        assert!(command.expects_result());
    }

    #[test]
    fn test_set_temperature_and_mode_auto_without_temperature() {
        let command = Command::SetTemperatureAndMode(
            SetTemperatureAndMode::new(rf(), 1, Mode::Auto, None, None).unwrap(),
        );
        assert_eq!(body(&command)[10], 0x00);
    }

    #[test]
    fn test_set_temperature_and_mode_vacation() {
        let end = NaiveDate::from_ymd_opt(2011, 8, 29)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let command = Command::SetTemperatureAndMode(
            SetTemperatureAndMode::new(rf(), 1, Mode::Vacation, Some(17.0), Some(end)).unwrap(),
        );
        assert_eq!(&body(&command)[10..], &[0x80 | 34, 0x9d, 0x0b, 25]);
    }

    #[test]
    fn test_vacation_requires_end() {
        let err = SetTemperatureAndMode::new(rf(), 1, Mode::Vacation, Some(17.0), None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_temperature_must_fit_mode_bits() {
        assert!(SetTemperatureAndMode::new(rf(), 1, Mode::Manual, Some(32.0), None).is_err());
        assert!(SetTemperatureAndMode::new(rf(), 1, Mode::Manual, Some(31.5), None).is_ok());
    }

    #[test]
    fn test_set_program() {
        let schedules = vec![
            ProgramSchedule::new(17.0, 0, 360),
            ProgramSchedule::new(21.0, 360, 1440),
        ];
        let command =
            Command::SetProgram(SetProgram::new(rf(), 1, Weekday::Mon, schedules).unwrap());
        let bytes = body(&command);
        assert_eq!(&bytes[..6], &OPCODE_PROGRAM);
        assert_eq!(bytes[10], 2);
        assert_eq!(util::unpack_temp_time([bytes[11], bytes[12]]), (17.0, 360));
        assert_eq!(util::unpack_temp_time([bytes[13], bytes[14]]), (21.0, 1440));
        assert_eq!(bytes.len(), 15);
    }

    #[test]
    fn test_set_program_empty_day() {
        let command = Command::SetProgram(SetProgram::new(rf(), 1, Weekday::Sat, vec![]).unwrap());
        assert_eq!(&body(&command)[10..], &[0x00]);
    }

    #[test]
    fn test_set_program_partial_day() {
        let schedules = vec![ProgramSchedule::new(17.0, 0, 360)];
        let command =
            Command::SetProgram(SetProgram::new(rf(), 1, Weekday::Tue, schedules).unwrap());
        assert_eq!(body(&command).len(), 13);
    }

    #[test]
    fn test_set_program_rejects_unordered_schedules() {
        let overlapping = vec![
            ProgramSchedule::new(21.0, 0, 900),
            ProgramSchedule::new(17.0, 0, 300),
        ];
        let err = SetProgram::new(rf(), 1, Weekday::Mon, overlapping).unwrap_err();
        assert!(err.is_validation());

        let late_start = vec![ProgramSchedule::new(21.0, 60, 1440)];
        assert!(SetProgram::new(rf(), 1, Weekday::Mon, late_start).is_err());

        let gap = vec![
            ProgramSchedule::new(17.0, 0, 360),
            ProgramSchedule::new(21.0, 420, 1440),
        ];
        assert!(SetProgram::new(rf(), 1, Weekday::Mon, gap).is_err());
    }

    #[test]
    fn test_set_program_too_many_schedules() {
        let schedules = (0..14)
            .map(|i| ProgramSchedule::new(20.0, i * 100, i * 100 + 100))
            .collect();
        let err = SetProgram::new(rf(), 1, Weekday::Mon, schedules).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_set_temperature_profile() {
        let command = Command::SetTemperatureProfile(
            SetTemperatureProfile::new(rf(), 1, TemperatureProfile::default()).unwrap(),
        );
        let bytes = body(&command);
        assert_eq!(&bytes[..6], &OPCODE_TEMPERATURE_PROFILE);
        assert_eq!(&bytes[10..], &[0x2b, 0x21, 0x3d, 0x09, 0x07, 0x18, 0x03]);
    }

    #[test]
    fn test_set_temperature_profile_validation() {
        let profile = TemperatureProfile {
            min: 25.0,
            max: 20.0,
            ..Default::default()
        };
        assert!(SetTemperatureProfile::new(rf(), 1, profile).is_err());

        let profile = TemperatureProfile {
            offset: 5.0,
            ..Default::default()
        };
        assert!(SetTemperatureProfile::new(rf(), 1, profile).is_err());
    }

    #[test]
    fn test_set_valve_config() {
        let config = ValveConfig {
            boost_duration: 5,
            boost_valve_position: 90,
            decalcification: Decalcification {
                day: Weekday::Sat,
                hour: 12,
            },
            max_valve_setting: 100.0,
        };
        let command = Command::SetValveConfig(SetValveConfig::new(rf(), 1, config).unwrap());
        let bytes = body(&command);
        assert_eq!(&bytes[..6], &OPCODE_VALVE_CONFIG);
        assert_eq!(&bytes[10..], &[0x32, 0x0c, 0xff, 0x00]);
    }

    #[test]
    fn test_set_valve_config_validation() {
        let config = ValveConfig {
            boost_duration: 45,
            boost_valve_position: 90,
            decalcification: Decalcification {
                day: Weekday::Sat,
                hour: 12,
            },
            max_valve_setting: 100.0,
        };
        assert!(SetValveConfig::new(rf(), 1, config).is_err());
    }
}
