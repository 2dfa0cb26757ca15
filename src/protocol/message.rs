use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use bytes::{Buf, Bytes};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::core::{DeviceType, Error, Result, RfAddress};
use crate::util;
use super::configuration::ConfigurationMessage;

/// Wire tags of the replies the hub sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    Directory,
    Configuration,
    Status,
    NtpServers,
    CommandResult,
}

impl MessageType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'H' => Some(MessageType::Hello),
            b'M' => Some(MessageType::Directory),
            b'C' => Some(MessageType::Configuration),
            b'L' => Some(MessageType::Status),
            b'F' => Some(MessageType::NtpServers),
            b'S' => Some(MessageType::CommandResult),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            MessageType::Hello => b'H',
            MessageType::Directory => b'M',
            MessageType::Configuration => b'C',
            MessageType::Status => b'L',
            MessageType::NtpServers => b'F',
            MessageType::CommandResult => b'S',
        }
    }

    /// Types whose payload may be split across consecutive lines
    pub fn is_multi_part(&self) -> bool {
        matches!(self, MessageType::Directory)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag() as char)
    }
}

/// A decoded reply from the hub
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Greeting sent once after connecting
    Hello(HubInfo),
    /// Rooms and devices known to the hub
    Directory(Directory),
    /// Settings of one device
    Configuration(ConfigurationMessage),
    /// Runtime status of one or more devices
    Status(Vec<DeviceStatus>),
    /// NTP server list
    NtpServers(NtpConfig),
    /// Outcome of a set command
    CommandResult(CommandResult),
}

impl Message {
    /// Decodes the payload parts of one logical message
    pub fn decode(message_type: MessageType, parts: &[Bytes]) -> Result<Message> {
        let texts = parts
            .iter()
            .map(|part| {
                std::str::from_utf8(part).map_err(|e| {
                    Error::validation(format!("{} payload is not ASCII: {}", message_type, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !message_type.is_multi_part() && texts.len() != 1 {
            return Err(Error::validation(format!(
                "{} messages are single-part (got {} parts)",
                message_type,
                texts.len()
            )));
        }

        match message_type {
            MessageType::Hello => HubInfo::decode(texts[0]).map(Message::Hello),
            MessageType::Directory => Directory::decode_parts(&texts).map(Message::Directory),
            MessageType::Configuration => {
                ConfigurationMessage::decode(texts[0]).map(Message::Configuration)
            }
            MessageType::Status => DeviceStatus::decode_list(texts[0]).map(Message::Status),
            MessageType::NtpServers => Ok(Message::NtpServers(NtpConfig::decode(texts[0]))),
            MessageType::CommandResult => {
                CommandResult::decode(texts[0]).map(Message::CommandResult)
            }
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Hello(_) => MessageType::Hello,
            Message::Directory(_) => MessageType::Directory,
            Message::Configuration(_) => MessageType::Configuration,
            Message::Status(_) => MessageType::Status,
            Message::NtpServers(_) => MessageType::NtpServers,
            Message::CommandResult(_) => MessageType::CommandResult,
        }
    }
}

fn csv_fields<'a>(payload: &'a str, what: &str, min: usize) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = payload.trim().split(',').collect();
    if fields.len() < min {
        return Err(Error::validation(format!(
            "{} must have at least {} fields (has {})",
            what,
            min,
            fields.len()
        )));
    }
    Ok(fields)
}

/// Hub identity and clock, from the `H` greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubInfo {
    pub serial: String,
    pub rf_address: RfAddress,
    pub firmware_version: String,
    pub connection_id: String,
    pub duty_cycle: u8,
    pub free_memory_slots: u16,
    pub datetime: NaiveDateTime,
    pub state_time: String,
    pub ntp_counter: u16,
}

impl HubInfo {
    pub fn decode(payload: &str) -> Result<Self> {
        let fields = csv_fields(payload, "Hello message", 11)?;
        Ok(HubInfo {
            serial: fields[0].to_string(),
            rf_address: fields[1].parse()?,
            firmware_version: fields[2].to_string(),
            connection_id: fields[4].to_string(),
            duty_cycle: util::parse_hex(fields[5], "duty cycle")?,
            free_memory_slots: util::parse_hex(fields[6], "free memory slots")?,
            datetime: parse_hub_datetime(fields[7], fields[8])?,
            state_time: fields[9].to_string(),
            ntp_counter: util::parse_hex(fields[10], "NTP counter")?,
        })
    }
}

impl fmt::Display for HubInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cube {} (RF address: {}, firmware: {}, time: {}, duty cycle: {}%, free slots: {})",
            self.serial,
            self.rf_address,
            self.firmware_version,
            self.datetime,
            self.duty_cycle,
            self.free_memory_slots
        )
    }
}

fn hex_pairs(field: &str, what: &str, count: usize) -> Result<Vec<u8>> {
    if field.len() != count * 2 || !field.is_ascii() {
        return Err(Error::validation(format!(
            "{} must be {} hex characters (got {:?})",
            what,
            count * 2,
            field
        )));
    }
    hex::decode(field).map_err(|e| Error::validation(format!("{} {:?}: {}", what, field, e)))
}

/// Date as `yymmdd` and time as `hhmm`, every pair in hex
fn parse_hub_datetime(date: &str, time: &str) -> Result<NaiveDateTime> {
    let d = hex_pairs(date, "hub date", 3)?;
    let t = hex_pairs(time, "hub time", 2)?;
    let date = NaiveDate::from_ymd_opt(2000 + i32::from(d[0]), u32::from(d[1]), u32::from(d[2]))
        .ok_or_else(|| Error::validation(format!("hub date {:?} is not a calendar date", date)))?;
    let time = NaiveTime::from_hms_opt(u32::from(t[0]), u32::from(t[1]), 0)
        .ok_or_else(|| Error::validation(format!("hub time {:?} is not a clock time", time)))?;
    Ok(date.and_time(time))
}

/// Bounds-checked reader over a binary payload
struct Reader<'a> {
    buf: &'a [u8],
    what: &'static str,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], what: &'static str) -> Self {
        Reader { buf, what }
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::validation(format!(
                "{} truncated: needed {} more bytes, {} left",
                self.what,
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn rf_address(&mut self) -> Result<RfAddress> {
        RfAddress::from_slice(self.take(3)?)
    }

    fn text(&mut self, n: usize) -> Result<String> {
        self.take(n).map(util::decode_text)
    }
}

/// Room as listed in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    pub id: u8,
    pub name: String,
    pub rf_address: RfAddress,
}

/// Device as listed in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub device_type: DeviceType,
    pub rf_address: RfAddress,
    pub serial: String,
    pub name: String,
    pub room_id: u8,
}

/// Decoded `M` message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub rooms: Vec<RoomEntry>,
    pub devices: Vec<DeviceEntry>,
}

impl Directory {
    /// Reassembles `<index>,<count>,<base64>` parts in index order and parses the result
    pub fn decode_parts(parts: &[&str]) -> Result<Self> {
        let mut chunks: Vec<(u8, u8, &str)> = Vec::with_capacity(parts.len());
        for part in parts {
            let mut fields = part.trim().splitn(3, ',');
            let (index, count, data) = match (fields.next(), fields.next(), fields.next()) {
                (Some(index), Some(count), Some(data)) => (index, count, data),
                _ => {
                    return Err(Error::validation(format!(
                        "directory part must be <index>,<count>,<data> (got {:?})",
                        part
                    )))
                }
            };
            let index: u8 = util::parse_hex(index, "directory part index")?;
            let count: u8 = util::parse_hex(count, "directory part count")?;
            chunks.push((index, count, data.trim()));
        }
        chunks.sort_by_key(|(index, _, _)| *index);

        if let Some((_, count, _)) = chunks.first() {
            if usize::from(*count) != chunks.len() {
                warn!(
                    "directory announced {} parts but {} arrived",
                    count,
                    chunks.len()
                );
            }
        }

        // parts can split a base64 quantum
        let text: String = chunks.iter().map(|(_, _, data)| *data).collect();
        let data = general_purpose::STANDARD.decode(text)?;
        Self::parse(&data)
    }

    /// Parses the reassembled binary directory
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data, "Directory");
        reader.take(2)?;

        let room_count = reader.u8()?;
        let mut rooms = Vec::with_capacity(usize::from(room_count));
        for _ in 0..room_count {
            let id = reader.u8()?;
            let name_len = reader.u8()?;
            let name = reader.text(usize::from(name_len))?;
            let rf_address = reader.rf_address()?;
            rooms.push(RoomEntry { id, name, rf_address });
        }

        let device_count = reader.u8()?;
        let mut devices = Vec::with_capacity(usize::from(device_count));
        for _ in 0..device_count {
            let device_type = DeviceType::from(reader.u8()?);
            let rf_address = reader.rf_address()?;
            let serial = reader.text(10)?;
            let name_len = reader.u8()?;
            let name = reader.text(usize::from(name_len))?;
            let room_id = reader.u8()?;
            devices.push(DeviceEntry {
                device_type,
                rf_address,
                serial,
                name,
                room_id,
            });
        }

        Ok(Directory { rooms, devices })
    }
}

/// Active program mode, taken from the two low bits of the second flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramMode {
    Weekly,
    Manual,
    Vacation,
    Boost,
}

impl ProgramMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ProgramMode::Weekly,
            1 => ProgramMode::Manual,
            2 => ProgramMode::Vacation,
            _ => ProgramMode::Boost,
        }
    }
}

/// Flags and readings from one `L` submessage
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeStatus {
    pub mode: ProgramMode,
    pub dst_active: bool,
    pub gateway_known: bool,
    pub panel_locked: bool,
    pub link_ok: bool,
    pub battery_low: bool,
    pub initialized: bool,
    pub is_answer: bool,
    pub is_error: bool,
    pub is_valid: bool,
    /// Percent
    pub valve_position: Option<u8>,
    /// Set-point in °C
    pub temperature: Option<f32>,
    /// Measured temperature in °C
    pub actual_temperature: Option<f32>,
    /// End date of a vacation override
    pub date_until: Option<NaiveDate>,
    /// End time of a temporary override, minutes since midnight
    pub time_until: Option<u16>,
}

impl RuntimeStatus {
    pub fn is_weekly(&self) -> bool {
        self.mode == ProgramMode::Weekly
    }

    pub fn is_manual(&self) -> bool {
        self.mode == ProgramMode::Manual
    }

    pub fn is_vacation(&self) -> bool {
        self.mode == ProgramMode::Vacation
    }

    pub fn is_boost(&self) -> bool {
        self.mode == ProgramMode::Boost
    }
}

/// Status entry for one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub rf_address: RfAddress,
    pub status: RuntimeStatus,
}

const STATUS_MIN_LEN: u8 = 6;

impl DeviceStatus {
    /// Decodes a base64 `L` payload holding one or more submessages
    pub fn decode_list(payload: &str) -> Result<Vec<DeviceStatus>> {
        let data = general_purpose::STANDARD.decode(payload.trim())?;
        if data.is_empty() {
            return Err(Error::length_mismatch("Status message", "at least 7", 0));
        }
        let mut reader = Reader::new(&data, "Status message");
        let mut statuses = Vec::new();
        while !reader.buf.is_empty() {
            let len = reader.u8()?;
            if len < STATUS_MIN_LEN {
                return Err(Error::length_mismatch(
                    "Status submessage",
                    format!("at least {}", STATUS_MIN_LEN),
                    usize::from(len),
                ));
            }
            let body = reader.take(usize::from(len))?;
            statuses.push(Self::parse(len, body)?);
        }
        Ok(statuses)
    }

    /// `body` excludes the length byte, so submessage offset `n` is `body[n - 1]`
    fn parse(len: u8, body: &[u8]) -> Result<DeviceStatus> {
        let byte = |offset: usize| body.get(offset - 1).copied();
        let flags1 = body[4];
        let flags2 = body[5];
        let mode = ProgramMode::from_bits(flags2);

        let mut status = RuntimeStatus {
            mode,
            dst_active: flags2 & 0x08 != 0,
            gateway_known: flags2 & 0x10 != 0,
            panel_locked: flags2 & 0x20 != 0,
            link_ok: flags2 & 0x40 == 0,
            battery_low: flags2 & 0x80 != 0,
            initialized: flags1 & 0x02 != 0,
            is_answer: flags1 & 0x04 != 0,
            is_error: flags1 & 0x08 != 0,
            is_valid: flags1 & 0x10 != 0,
            valve_position: None,
            temperature: None,
            actual_temperature: None,
            date_until: None,
            time_until: None,
        };

        if len > STATUS_MIN_LEN {
            status.valve_position = byte(7);
            status.temperature = byte(8).map(|raw| util::decode_temperature(raw & 0x7f));
        }
        if let (Some(hi), Some(lo), Some(time)) = (byte(9), byte(10), byte(11)) {
            status.time_until = Some(u16::from(time) * 30);
            if mode == ProgramMode::Vacation {
                match util::dateuntil_to_date([hi, lo]) {
                    Ok(date) => status.date_until = Some(date),
                    Err(e) => warn!("status for {}: {}", hex::encode(&body[0..3]), e),
                }
            } else {
                let tenths = (u16::from(hi & 0x01) << 8) | u16::from(lo);
                if tenths != 0 {
                    status.actual_temperature = Some(f32::from(tenths) / 10.0);
                }
            }
        }
        if let (Some(set), Some(lo)) = (byte(8), byte(12)) {
            let tenths = (u16::from(set & 0x80) << 1) | u16::from(lo);
            status.actual_temperature = Some(f32::from(tenths) / 10.0);
        }

        Ok(DeviceStatus {
            rf_address: RfAddress::from_slice(&body[0..3])?,
            status,
        })
    }
}

/// Ordered NTP server host names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NtpConfig {
    pub servers: Vec<String>,
}

impl NtpConfig {
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NtpConfig {
            servers: servers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn decode(payload: &str) -> Self {
        let payload = payload.trim();
        if payload.is_empty() {
            return NtpConfig::default();
        }
        NtpConfig::new(payload.split(',').map(str::trim))
    }

    pub fn to_payload(&self) -> String {
        self.servers.join(",")
    }
}

/// Reply to a set command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    pub duty_cycle: u8,
    /// 0 means the hub accepted the command
    pub result_code: u8,
    pub free_memory_slots: u16,
}

impl CommandResult {
    pub fn decode(payload: &str) -> Result<Self> {
        let fields = csv_fields(payload, "Command result", 3)?;
        Ok(CommandResult {
            duty_cycle: util::parse_hex(fields[0], "duty cycle")?,
            result_code: fields[1].trim().parse().map_err(|_| {
                Error::validation(format!("result code is not a number: {:?}", fields[1]))
            })?,
            free_memory_slots: util::parse_hex(fields[2], "free memory slots")?,
        })
    }

    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HELLO: &str =
        "KEQ0523864,10b199,0113,00000000,54243cdd,00,32,0f0c0d,0812,03,0000";

    pub(crate) fn directory_bytes() -> Vec<u8> {
        let mut data = vec![0x56, 0x02, 0x01, 0x01, 0x0a];
        data.extend(b"Wohnzimmer");
        data.extend([0x12, 0x2b, 0x65, 0x01, 0x02, 0x12, 0x2b, 0x65]);
        data.extend(b"MEQ1472997");
        data.push(0x07);
        data.extend(b"Heizung");
        data.extend([0x01, 0x01]);
        data
    }

    fn parts(texts: &[&str]) -> Vec<Bytes> {
        texts.iter().map(|t| Bytes::copy_from_slice(t.as_bytes())).collect()
    }

    #[test]
    fn test_decode_hello() {
        let message = Message::decode(MessageType::Hello, &parts(&[HELLO])).unwrap();
        let Message::Hello(info) = message else {
            panic!("Decoded wrong message type");
        };
        assert_eq!(info.serial, "KEQ0523864");
        assert!(info.rf_address == "10b199");
        assert_eq!(info.firmware_version, "0113");
        assert_eq!(info.connection_id, "54243cdd");
        assert_eq!(info.duty_cycle, 0);
        assert_eq!(info.free_memory_slots, 50);
        assert_eq!(
            info.datetime,
            NaiveDate::from_ymd_opt(2015, 12, 13)
                .unwrap()
                .and_hms_opt(8, 18, 0)
                .unwrap()
        );
        assert_eq!(info.ntp_counter, 0);
    }

    #[test]
    fn test_decode_hello_too_few_fields() {
        assert!(HubInfo::decode("KEQ0523864,10b199,0113").unwrap_err().is_validation());
        assert!(HubInfo::decode("").is_err());
    }

    #[test]
    fn test_decode_hello_bad_date() {
        let bad = HELLO.replace("0f0c0d", "0f0d0d");
        assert!(HubInfo::decode(&bad).is_err());
        let not_hex = HELLO.replace("0f0c0d", "0f0czz");
        assert!(HubInfo::decode(&not_hex).unwrap_err().is_validation());
        let short = HELLO.replace("0f0c0d", "0f0c0");
        assert!(HubInfo::decode(&short).unwrap_err().is_validation());
    }

    #[test]
    fn test_parse_directory() {
        let directory = Directory::parse(&directory_bytes()).unwrap();
        assert_eq!(
            directory.rooms,
            vec![RoomEntry {
                id: 1,
                name: "Wohnzimmer".to_string(),
                rf_address: RfAddress([0x12, 0x2b, 0x65]),
            }]
        );
        assert_eq!(
            directory.devices,
            vec![DeviceEntry {
                device_type: DeviceType::RadiatorThermostatPlus,
                rf_address: RfAddress([0x12, 0x2b, 0x65]),
                serial: "MEQ1472997".to_string(),
                name: "Heizung".to_string(),
                room_id: 1,
            }]
        );
        assert_eq!(directory.devices[0].room_id, directory.rooms[0].id);
    }

    #[test]
    fn test_directory_parts_match_single_payload() {
        let data = directory_bytes();
        let (a, b) = data.split_at(21);
        let part_a = format!("00,02,{}", general_purpose::STANDARD.encode(a));
        let part_b = format!("01,02,{}", general_purpose::STANDARD.encode(b));

        let reassembled = Directory::decode_parts(&[&part_a, &part_b]).unwrap();
        assert_eq!(reassembled, Directory::parse(&data).unwrap());

        let reordered = Directory::decode_parts(&[&part_b, &part_a]).unwrap();
        assert_eq!(reordered, reassembled);
    }

    #[test]
    fn test_directory_parts_split_inside_base64_quantum() {
        let text = general_purpose::STANDARD.encode(directory_bytes());
        let (a, b) = text.split_at(10);
        let part_a = format!("00,02,{}", a);
        let part_b = format!("01,02,{}", b);
        let expected = Directory::parse(&directory_bytes()).unwrap();

        assert_eq!(Directory::decode_parts(&[&part_a, &part_b]).unwrap(), expected);
        assert_eq!(Directory::decode_parts(&[&part_b, &part_a]).unwrap(), expected);
    }

    #[test]
    fn test_directory_single_part() {
        let directory =
            Directory::decode_parts(&["00,01,VgIBAQpXb2huemltbWVyEitlAQISK2VNRVExNDcyOTk3B0hlaXp1bmcBAQ=="])
                .unwrap();
        assert_eq!(directory.rooms.len(), 1);
        assert_eq!(directory.devices[0].name, "Heizung");
    }

    #[test]
    fn test_directory_empty_and_truncated() {
        let empty = Directory::parse(&[0x56, 0x02, 0x00, 0x00]).unwrap();
        assert!(empty.rooms.is_empty() && empty.devices.is_empty());

        let data = directory_bytes();
        assert!(Directory::parse(&data[..20]).unwrap_err().is_validation());
        assert!(Directory::parse(&[]).is_err());
        assert!(Directory::decode_parts(&["00,01"]).is_err());
    }

    #[test]
    fn test_decode_status() {
        let statuses = DeviceStatus::decode_list("CxIrZfcSGWQ8AOsA").unwrap();
        assert_eq!(statuses.len(), 1);
        let entry = &statuses[0];
        assert_eq!(entry.rf_address, RfAddress([0x12, 0x2b, 0x65]));
        let status = &entry.status;
        assert!(status.is_manual());
        assert!(!status.is_weekly() && !status.is_vacation() && !status.is_boost());
        assert!(status.dst_active);
        assert!(status.gateway_known);
        assert!(status.link_ok);
        assert!(!status.battery_low);
        assert!(!status.panel_locked);
        assert!(status.initialized && status.is_valid);
        assert!(!status.is_error && !status.is_answer);
        assert_eq!(status.valve_position, Some(100));
        assert_eq!(status.temperature, Some(30.0));
        assert_eq!(status.actual_temperature, Some(23.5));
        assert_eq!(status.time_until, Some(0));
        assert_eq!(status.date_until, None);
    }

    #[test]
    fn test_decode_status_multiple_submessages() {
        let data = [
            0x06, 0x0a, 0x0b, 0x0c, 0x00, 0x12, 0xd0, // shutter contact
            0x0b, 0x12, 0x2b, 0x65, 0x00, 0x12, 0x1a, 0x00, 0x2a, 0x9d, 0x0b, 0x19,
        ];
        let payload = general_purpose::STANDARD.encode(data);
        let statuses = DeviceStatus::decode_list(&payload).unwrap();
        assert_eq!(statuses.len(), 2);

        let contact = &statuses[0].status;
        assert!(contact.battery_low);
        assert!(!contact.link_ok);
        assert!(contact.gateway_known);
        assert_eq!(contact.valve_position, None);

        let vacation = &statuses[1].status;
        assert!(vacation.is_vacation());
        assert_eq!(vacation.temperature, Some(21.0));
        assert_eq!(vacation.date_until, NaiveDate::from_ymd_opt(2011, 8, 29));
        assert_eq!(vacation.time_until, Some(25 * 30));
        assert_eq!(vacation.actual_temperature, None);
    }

    #[test]
    fn test_decode_status_bad_vacation_date_keeps_other_entries() {
        let data = [
            0x06, 0x0a, 0x0b, 0x0c, 0x00, 0x12, 0xd0,
            // vacation entry whose until-date has day 0
            0x0b, 0x12, 0x2b, 0x65, 0x00, 0x12, 0x1a, 0x00, 0x2a, 0x80, 0x0b, 0x19,
        ];
        let payload = general_purpose::STANDARD.encode(data);
        let statuses = DeviceStatus::decode_list(&payload).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].rf_address, RfAddress([0x0a, 0x0b, 0x0c]));

        let vacation = &statuses[1].status;
        assert!(vacation.is_vacation());
        assert_eq!(vacation.date_until, None);
        assert_eq!(vacation.time_until, Some(25 * 30));
        assert_eq!(vacation.temperature, Some(21.0));
    }

    #[test]
    fn test_decode_status_wall_thermostat() {
        let data = [
            0x0c, 0x0a, 0x0b, 0x0c, 0x00, 0x12, 0x18, 0x00, 0xac, 0x00, 0x00, 0x00, 0x0a,
        ];
        let statuses = DeviceStatus::decode_list(&general_purpose::STANDARD.encode(data)).unwrap();
        let status = &statuses[0].status;
        assert!(status.is_weekly());
        assert_eq!(status.temperature, Some(22.0));
        assert_eq!(status.actual_temperature, Some(26.6));
    }

    #[test]
    fn test_decode_status_length_checks() {
        assert!(DeviceStatus::decode_list("").unwrap_err().is_validation());
        // length byte of 1
        let short = general_purpose::STANDARD.encode([0x01, 0x00]);
        assert!(DeviceStatus::decode_list(&short).is_err());
        // announces 11 bytes, carries 4
        let truncated = general_purpose::STANDARD.encode([0x0b, 0x12, 0x2b, 0x65, 0x00]);
        assert!(DeviceStatus::decode_list(&truncated).is_err());
    }

    #[test]
    fn test_decode_ntp_servers() {
        let message = Message::decode(
            MessageType::NtpServers,
            &parts(&["ntp.homematic.com,ntp.homematic.com"]),
        )
        .unwrap();
        assert_eq!(
            message,
            Message::NtpServers(NtpConfig::new(["ntp.homematic.com", "ntp.homematic.com"]))
        );
        assert!(NtpConfig::decode("").servers.is_empty());
        assert_eq!(NtpConfig::new(["a", "b"]).to_payload(), "a,b");
    }

    #[test]
    fn test_decode_command_result() {
        let result = CommandResult::decode("00,0,31").unwrap();
        assert_eq!(
            result,
            CommandResult {
                duty_cycle: 0,
                result_code: 0,
                free_memory_slots: 0x31,
            }
        );
        assert!(result.is_success());
        assert!(!CommandResult::decode("0a,1,00").unwrap().is_success());
        assert!(CommandResult::decode("00,0").is_err());
        assert!(CommandResult::decode("00,x,31").is_err());
    }

    #[test]
    fn test_single_part_types_reject_multiple_parts() {
        let result = Message::decode(MessageType::CommandResult, &parts(&["00,0,31", "00,0,31"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_message_type_tags() {
        for tag in [b'H', b'M', b'C', b'L', b'F', b'S'] {
            assert_eq!(MessageType::from_tag(tag).unwrap().tag(), tag);
        }
        assert_eq!(MessageType::from_tag(b'X'), None);
        assert!(MessageType::Directory.is_multi_part());
        assert!(!MessageType::Status.is_multi_part());
    }
}
