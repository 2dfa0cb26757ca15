//! Device configuration (`C`) messages and weekly programs

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use chrono::{NaiveTime, Timelike, Weekday};

use crate::core::{DeviceType, Error, Result, RfAddress, MAX_SCHEDULES_PER_DAY, MINUTES_PER_DAY};
use crate::util;

/// Bytes of one day in the weekly program block (13 temp/time words)
pub const DAY_PROGRAM_LEN: usize = MAX_SCHEDULES_PER_DAY * 2;

/// Bytes of the full weekly program block
pub const WEEK_PROGRAM_LEN: usize = DAY_PROGRAM_LEN * 7;

const HEADER_LEN: usize = 18;
const CUBE_MIN_LEN: usize = HEADER_LEN + 1;
const CUBE_PORTAL_URL_OFFSET: usize = 0x55;
const RADIATOR_PROGRAM_OFFSET: usize = 29;
const RADIATOR_MIN_LEN: usize = RADIATOR_PROGRAM_OFFSET + WEEK_PROGRAM_LEN;
const WALL_PROGRAM_OFFSET: usize = 22;
const WALL_MIN_LEN: usize = WALL_PROGRAM_OFFSET + WEEK_PROGRAM_LEN;

/// One interval of a day's program
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramSchedule {
    /// Set-point in °C, 0.5 resolution
    pub temperature: f32,
    /// Minutes since midnight, inclusive
    pub begin_minutes: u16,
    /// Minutes since midnight, exclusive; 1440 marks the end of the day
    pub end_minutes: u16,
}

impl ProgramSchedule {
    pub fn new(temperature: f32, begin_minutes: u16, end_minutes: u16) -> Self {
        ProgramSchedule {
            temperature,
            begin_minutes,
            end_minutes,
        }
    }

    /// Builds a schedule from clock times; an end of 00:00 means midnight
    pub fn from_times(temperature: f32, begin: NaiveTime, end: NaiveTime) -> Self {
        let end_minutes = match time_to_minutes(end) {
            0 => MINUTES_PER_DAY,
            m => m,
        };
        ProgramSchedule::new(temperature, time_to_minutes(begin), end_minutes)
    }

    pub fn begin_time(&self) -> NaiveTime {
        minutes_to_time(self.begin_minutes)
    }

    pub fn end_time(&self) -> NaiveTime {
        minutes_to_time(self.end_minutes)
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_minutes.saturating_sub(self.begin_minutes)
    }

    /// Encodes the schedule's end as a temp/time word
    pub fn to_word(&self) -> Result<[u8; 2]> {
        util::pack_temp_time(self.temperature, self.end_minutes)
    }
}

impl fmt::Display for ProgramSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}: {}°C",
            self.begin_time().format("%H:%M"),
            self.end_time().format("%H:%M"),
            self.temperature
        )
    }
}

fn time_to_minutes(time: NaiveTime) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

fn minutes_to_time(minutes: u16) -> NaiveTime {
    let minutes = u32::from(minutes % MINUTES_PER_DAY);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// Checks that schedules run back to back from midnight without passing
/// the end of the day
///
/// The day may stop short of minute 1440; the hub keeps its defaults for the
/// remaining slots. Returns the minute the last schedule ends at.
pub fn validate_day_prefix(schedules: &[ProgramSchedule]) -> Result<u16> {
    if schedules.len() > MAX_SCHEDULES_PER_DAY {
        return Err(Error::validation(format!(
            "a day program holds at most {} schedules (got {})",
            MAX_SCHEDULES_PER_DAY,
            schedules.len()
        )));
    }
    let mut expected_begin = 0;
    for schedule in schedules {
        if schedule.begin_minutes != expected_begin
            || schedule.end_minutes <= schedule.begin_minutes
            || schedule.end_minutes > MINUTES_PER_DAY
        {
            return Err(Error::validation(format!(
                "schedule {} does not continue at minute {}",
                schedule, expected_begin
            )));
        }
        expected_begin = schedule.end_minutes;
    }
    Ok(expected_begin)
}

/// Checks that a day's schedules are contiguous and cover the whole day
pub fn validate_day(schedules: &[ProgramSchedule]) -> Result<()> {
    if schedules.is_empty() {
        return Err(Error::validation("a day program needs at least one schedule"));
    }
    let end = validate_day_prefix(schedules)?;
    if end != MINUTES_PER_DAY {
        return Err(Error::validation(format!(
            "day program ends at minute {} instead of {}",
            end, MINUTES_PER_DAY
        )));
    }
    Ok(())
}

/// Decodes one day's 26-byte block, stopping at the word that ends at midnight
pub fn parse_day_program(block: &[u8]) -> Result<Vec<ProgramSchedule>> {
    if block.len() != DAY_PROGRAM_LEN {
        return Err(Error::length_mismatch("Day program", DAY_PROGRAM_LEN, block.len()));
    }
    let mut schedules = Vec::new();
    let mut begin = 0u16;
    for word in block.chunks_exact(2) {
        let (temperature, end) = util::unpack_temp_time([word[0], word[1]]);
        if end <= begin {
            return Err(Error::validation(format!(
                "day program goes backwards: minute {} after {}",
                end, begin
            )));
        }
        let end = end.min(MINUTES_PER_DAY);
        schedules.push(ProgramSchedule::new(temperature, begin, end));
        if end == MINUTES_PER_DAY {
            return Ok(schedules);
        }
        begin = end;
    }
    Err(Error::validation("day program does not reach midnight"))
}

/// Per-weekday schedule lists, Saturday first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyProgram {
    pub days: [Vec<ProgramSchedule>; 7],
}

impl WeeklyProgram {
    /// Decodes the 182-byte program block
    pub fn parse(block: &[u8]) -> Result<Self> {
        if block.len() != WEEK_PROGRAM_LEN {
            return Err(Error::length_mismatch("Weekly program", WEEK_PROGRAM_LEN, block.len()));
        }
        let mut program = WeeklyProgram::default();
        for (day, chunk) in block.chunks_exact(DAY_PROGRAM_LEN).enumerate() {
            program.days[day] = parse_day_program(chunk)?;
        }
        Ok(program)
    }

    pub fn day(&self, weekday: Weekday) -> &[ProgramSchedule] {
        &self.days[usize::from(util::py_day_to_cube_day(weekday))]
    }
}

/// Scheduled anti-limescale valve cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decalcification {
    pub day: Weekday,
    pub hour: u8,
}

/// Set-points, valve behaviour and program of a thermostat
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceConfiguration {
    pub comfort_temperature: f32,
    pub eco_temperature: f32,
    pub max_set_point_temperature: f32,
    pub min_set_point_temperature: f32,
    pub temperature_offset: Option<f32>,
    pub window_open_temperature: Option<f32>,
    /// Minutes
    pub window_open_duration: Option<u16>,
    /// Minutes
    pub boost_duration: Option<u16>,
    /// Percent
    pub boost_valve_position: Option<u8>,
    pub decalcification: Option<Decalcification>,
    /// Percent
    pub max_valve_setting: Option<f32>,
    /// Percent
    pub valve_offset: Option<f32>,
    pub program: WeeklyProgram,
}

/// Portal settings reported for the hub itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CubeSettings {
    pub portal_enabled: bool,
    pub portal_url: Option<String>,
}

/// Type-specific part of a configuration message
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationKind {
    Cube(CubeSettings),
    Thermostat(DeviceConfiguration),
    /// Device types without a settings block
    Basic,
}

/// Decoded `C` message
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationMessage {
    pub rf_address: RfAddress,
    pub device_type: DeviceType,
    pub room_id: u8,
    pub firmware_version: u8,
    pub test_result: u8,
    pub serial: String,
    pub kind: ConfigurationKind,
}

impl ConfigurationMessage {
    /// Decodes `<rf hex>,<base64>`
    pub fn decode(payload: &str) -> Result<Self> {
        let (addr, data) = payload
            .split_once(',')
            .ok_or_else(|| Error::validation("configuration payload lacks an RF address"))?;
        let addr: RfAddress = addr.trim().parse()?;
        let data = general_purpose::STANDARD.decode(data.trim())?;
        let message = Self::decode_bytes(&data)?;
        if message.rf_address != addr {
            return Err(Error::validation(format!(
                "configuration for {} carries RF address {}",
                addr, message.rf_address
            )));
        }
        Ok(message)
    }

    /// Decodes the binary configuration block
    pub fn decode_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::length_mismatch(
                "Configuration",
                format!("at least {}", HEADER_LEN),
                data.len(),
            ));
        }
        let device_type = DeviceType::from(data[4]);
        let kind = match device_type {
            DeviceType::Cube => ConfigurationKind::Cube(parse_cube_settings(data)?),
            DeviceType::RadiatorThermostat | DeviceType::RadiatorThermostatPlus => {
                ConfigurationKind::Thermostat(parse_radiator_config(data)?)
            }
            DeviceType::WallThermostat => ConfigurationKind::Thermostat(parse_wall_config(data)?),
            _ => ConfigurationKind::Basic,
        };

        Ok(ConfigurationMessage {
            rf_address: RfAddress::from_slice(&data[1..4])?,
            device_type,
            room_id: data[5],
            firmware_version: data[6],
            test_result: data[7],
            serial: util::decode_text(&data[8..18]),
            kind,
        })
    }

    /// The thermostat settings, if this message carries any
    pub fn device_configuration(&self) -> Option<&DeviceConfiguration> {
        match &self.kind {
            ConfigurationKind::Thermostat(config) => Some(config),
            _ => None,
        }
    }
}

fn ensure_min_len(what: &str, data: &[u8], min: usize) -> Result<()> {
    if data.len() < min {
        return Err(Error::length_mismatch(what, format!("at least {}", min), data.len()));
    }
    Ok(())
}

fn parse_cube_settings(data: &[u8]) -> Result<CubeSettings> {
    ensure_min_len("Cube configuration", data, CUBE_MIN_LEN)?;
    let portal_url = data
        .get(CUBE_PORTAL_URL_OFFSET..)
        .map(|rest| rest.split(|&b| b == 0).next().unwrap_or_default())
        .filter(|url| !url.is_empty())
        .map(util::decode_text);
    Ok(CubeSettings {
        portal_enabled: data[HEADER_LEN] != 0,
        portal_url,
    })
}

fn parse_radiator_config(data: &[u8]) -> Result<DeviceConfiguration> {
    ensure_min_len("Thermostat configuration", data, RADIATOR_MIN_LEN)?;
    let (boost_duration, boost_valve_position) = util::decode_boost(data[25]);
    let (day, hour) = util::decode_decalcification(data[26])?;
    Ok(DeviceConfiguration {
        comfort_temperature: util::decode_temperature(data[18]),
        eco_temperature: util::decode_temperature(data[19]),
        max_set_point_temperature: util::decode_temperature(data[20]),
        min_set_point_temperature: util::decode_temperature(data[21]),
        temperature_offset: Some(util::decode_temperature_offset(data[22])),
        window_open_temperature: Some(util::decode_temperature(data[23])),
        window_open_duration: Some(util::decode_window_open_duration(data[24])),
        boost_duration: Some(boost_duration),
        boost_valve_position: Some(boost_valve_position),
        decalcification: Some(Decalcification { day, hour }),
        max_valve_setting: Some(util::decode_valve_percentage(data[27])),
        valve_offset: Some(util::decode_valve_percentage(data[28])),
        program: WeeklyProgram::parse(&data[RADIATOR_PROGRAM_OFFSET..RADIATOR_MIN_LEN])?,
    })
}

fn parse_wall_config(data: &[u8]) -> Result<DeviceConfiguration> {
    ensure_min_len("Wall thermostat configuration", data, WALL_MIN_LEN)?;
    let tail = &data[WALL_MIN_LEN..];
    let boost = tail.get(2).map(|&raw| util::decode_boost(raw));
    Ok(DeviceConfiguration {
        comfort_temperature: util::decode_temperature(data[18]),
        eco_temperature: util::decode_temperature(data[19]),
        max_set_point_temperature: util::decode_temperature(data[20]),
        min_set_point_temperature: util::decode_temperature(data[21]),
        temperature_offset: tail.first().map(|&raw| util::decode_temperature_offset(raw)),
        window_open_temperature: tail.get(1).map(|&raw| util::decode_temperature(raw)),
        boost_duration: boost.map(|(minutes, _)| minutes),
        boost_valve_position: boost.map(|(_, valve)| valve),
        program: WeeklyProgram::parse(&data[WALL_PROGRAM_OFFSET..WALL_MIN_LEN])?,
        ..Default::default()
    })
}
