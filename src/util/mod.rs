//! Utility module
//!
//! Bit-packing helpers shared by the configuration, status and command
//! encodings: temperature/time words, until-dates, weekday numbering and
//! the various percentage and duration scalings.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::core::{Error, Result, MINUTES_PER_DAY};

/// Highest temperature representable in the 7-bit half-degree fields
pub const MAX_TEMPERATURE: f32 = 63.5;

/// Packs a temperature and a minutes-since-midnight value into one
/// big-endian word: 7 bits of half degrees, 9 bits of 5-minute steps.
pub fn pack_temp_time(temperature: f32, minutes: u16) -> Result<[u8; 2]> {
    let temp = encode_temperature(temperature)? as u16;
    if minutes > MINUTES_PER_DAY {
        return Err(Error::validation(format!(
            "minutes since midnight must be at most {} (got {})",
            MINUTES_PER_DAY, minutes
        )));
    }
    let steps = (f32::from(minutes) / 5.0).round() as u16;
    Ok(((temp << 9) | steps).to_be_bytes())
}

/// Inverse of [`pack_temp_time`]
pub fn unpack_temp_time(word: [u8; 2]) -> (f32, u16) {
    let temperature = f32::from(word[0] >> 1) / 2.0;
    let minutes = ((u16::from(word[0] & 0x01) << 8) | u16::from(word[1])) * 5;
    (temperature, minutes)
}

/// Encodes a date as the hub's 2-byte until-date
///
/// ```text
/// byte0: MMMD DDDD   (month bits 3..1, day)
/// byte1: 0MYY YYYY   (month bit 0, year - 2000)
/// ```
pub fn date_to_dateuntil(date: NaiveDate) -> Result<[u8; 2]> {
    if date.year() < 2000 {
        return Err(Error::validation(format!(
            "cannot store dates before 2000-01-01 as until-date (got {})",
            date
        )));
    }
    let year = (date.year() - 2000) as u32;
    if year > 0x3f {
        return Err(Error::validation(format!(
            "cannot store dates after 2063-12-31 as until-date (got {})",
            date
        )));
    }
    let month = date.month();
    let a = date.day() | ((month >> 1) << 5);
    let b = year | ((month & 0x01) << 6);
    Ok([a as u8, b as u8])
}

/// Inverse of [`date_to_dateuntil`]
pub fn dateuntil_to_date(bytes: [u8; 2]) -> Result<NaiveDate> {
    let [a, b] = bytes;
    let day = u32::from(a & 0x1f);
    let month = (u32::from(a >> 5) << 1) | u32::from((b >> 6) & 0x01);
    let year = 2000 + i32::from(b & 0x3f);
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::validation(format!(
            "until-date {:02x}{:02x} is not a calendar date ({}-{}-{})",
            a, b, year, month, day
        ))
    })
}

/// Maps a calendar weekday onto the hub's numbering, where Saturday is 0
pub fn py_day_to_cube_day(day: Weekday) -> u8 {
    ((day.num_days_from_monday() + 2) % 7) as u8
}

/// Inverse of [`py_day_to_cube_day`]
pub fn cube_day_to_py_day(day: u8) -> Result<Weekday> {
    if day > 6 {
        return Err(Error::validation(format!("hub weekday out of range: {}", day)));
    }
    let from_monday = (u32::from(day) + 5) % 7;
    Ok(weekday_from_monday(from_monday))
}

fn weekday_from_monday(n: u32) -> Weekday {
    match n {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Half-degree temperature byte
pub fn encode_temperature(temperature: f32) -> Result<u8> {
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(Error::validation(format!(
            "temperature must be between 0 and {} (got {})",
            MAX_TEMPERATURE, temperature
        )));
    }
    Ok((temperature * 2.0).round() as u8)
}

pub fn decode_temperature(raw: u8) -> f32 {
    f32::from(raw) / 2.0
}

/// Temperature offset byte: half degrees with a +3.5 bias
pub fn encode_temperature_offset(offset: f32) -> Result<u8> {
    if !(-3.5..=3.5).contains(&offset) {
        return Err(Error::validation(format!(
            "temperature offset must be between -3.5 and 3.5 (got {})",
            offset
        )));
    }
    Ok(((offset + 3.5) * 2.0).round() as u8)
}

pub fn decode_temperature_offset(raw: u8) -> f32 {
    f32::from(raw) / 2.0 - 3.5
}

/// Window-open duration byte in 5-minute steps
pub fn encode_window_open_duration(minutes: u16) -> Result<u8> {
    let steps = minutes / 5;
    if minutes % 5 != 0 || steps > u16::from(u8::MAX) {
        return Err(Error::validation(format!(
            "window-open duration must be a multiple of 5 minutes up to {} (got {})",
            u16::from(u8::MAX) * 5,
            minutes
        )));
    }
    Ok(steps as u8)
}

pub fn decode_window_open_duration(raw: u8) -> u16 {
    u16::from(raw) * 5
}

/// Boost minutes for a 3-bit raw duration; 7 stands for a full hour
pub fn boost_duration_minutes(raw: u8) -> u16 {
    match raw & 0x07 {
        7 => 60,
        n => u16::from(n) * 5,
    }
}

/// Boost byte: `duration_raw << 5 | valve_pct / 5`
pub fn encode_boost(duration_minutes: u16, valve_percent: u8) -> Result<u8> {
    let duration_raw = match duration_minutes {
        60 => 7,
        m if m <= 30 && m % 5 == 0 => (m / 5) as u8,
        other => {
            return Err(Error::validation(format!(
                "boost duration must be 0-30 minutes in steps of 5, or 60 (got {})",
                other
            )))
        }
    };
    if valve_percent > 100 {
        return Err(Error::validation(format!(
            "boost valve position must be at most 100% (got {})",
            valve_percent
        )));
    }
    Ok((duration_raw << 5) | (valve_percent / 5))
}

/// Returns `(duration_minutes, valve_percent)`
pub fn decode_boost(raw: u8) -> (u16, u8) {
    (boost_duration_minutes(raw >> 5), (raw & 0x1f) * 5)
}

/// Decalcification byte: `hub_weekday << 5 | hour`
pub fn encode_decalcification(day: Weekday, hour: u8) -> Result<u8> {
    if hour > 23 {
        return Err(Error::validation(format!(
            "decalcification hour must be 0-23 (got {})",
            hour
        )));
    }
    Ok((py_day_to_cube_day(day) << 5) | hour)
}

pub fn decode_decalcification(raw: u8) -> Result<(Weekday, u8)> {
    let hour = raw & 0x1f;
    if hour > 23 {
        return Err(Error::validation(format!(
            "decalcification hour out of range: {}",
            hour
        )));
    }
    Ok((cube_day_to_py_day(raw >> 5)?, hour))
}

/// Scales a percentage onto a full byte
pub fn encode_valve_percentage(percent: f32) -> Result<u8> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(Error::validation(format!(
            "valve percentage must be between 0 and 100 (got {})",
            percent
        )));
    }
    Ok((percent * 255.0 / 100.0).round() as u8)
}

pub fn decode_valve_percentage(raw: u8) -> f32 {
    f32::from(raw) * 100.0 / 255.0
}

/// Time of day in half-hour steps, rounding down
pub fn time_to_half_hours(time: NaiveTime) -> u8 {
    (time.hour() * 2 + u32::from(time.minute() >= 30)) as u8
}

pub fn half_hours_to_time(raw: u8) -> Result<NaiveTime> {
    let minutes = u32::from(raw) * 30;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).ok_or_else(|| {
        Error::validation(format!("half-hour time value out of range: {}", raw))
    })
}

/// Renders a fixed-width text field, dropping NUL padding
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

/// Parses a hex field of the ASCII message formats
pub fn parse_hex<T>(field: &str, what: &str) -> Result<T>
where
    T: TryFrom<u32>,
{
    u32::from_str_radix(field.trim(), 16)
        .ok()
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| Error::validation(format!("{} is not a valid hex value: {:?}", what, field)))
}
