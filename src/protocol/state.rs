//! Client-side model of the hub's rooms and devices
//!
//! Devices accumulate fields from every message type that mentions them;
//! rooms are rebuilt from each directory message.

use tracing::{debug, warn};

use crate::core::{DeviceType, RfAddress};
use super::configuration::{ConfigurationKind, ConfigurationMessage, CubeSettings, DeviceConfiguration};
use super::message::{Directory, HubInfo, Message, NtpConfig, RuntimeStatus};

/// Room as known from the latest directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: u8,
    pub name: String,
    /// Group address shared by the room's devices
    pub rf_address: RfAddress,
    /// Member devices in directory order
    pub devices: Vec<RfAddress>,
}

/// Everything known about one device
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub rf_address: RfAddress,
    pub serial: Option<String>,
    pub name: Option<String>,
    pub device_type: Option<DeviceType>,
    pub room_id: Option<u8>,
    pub firmware_version: Option<u8>,
    pub configuration: Option<DeviceConfiguration>,
    pub status: Option<RuntimeStatus>,
}

impl Device {
    pub fn new(rf_address: RfAddress) -> Self {
        Device {
            rf_address,
            serial: None,
            name: None,
            device_type: None,
            room_id: None,
            firmware_version: None,
            configuration: None,
            status: None,
        }
    }

    /// Writes the fields present in `update`, leaving the others untouched
    pub fn merge(&mut self, update: DeviceUpdate) {
        fn set<T>(field: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *field = value;
            }
        }
        if let Some(rf_address) = update.rf_address {
            self.rf_address = rf_address;
        }
        set(&mut self.serial, update.serial);
        set(&mut self.name, update.name);
        set(&mut self.device_type, update.device_type);
        set(&mut self.room_id, update.room_id);
        set(&mut self.firmware_version, update.firmware_version);
        set(&mut self.configuration, update.configuration);
        set(&mut self.status, update.status);
    }
}

/// Partial device record; `None` means "not part of this update"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceUpdate {
    pub rf_address: Option<RfAddress>,
    pub serial: Option<String>,
    pub name: Option<String>,
    pub device_type: Option<DeviceType>,
    pub room_id: Option<u8>,
    pub firmware_version: Option<u8>,
    pub configuration: Option<DeviceConfiguration>,
    pub status: Option<RuntimeStatus>,
}

impl DeviceUpdate {
    pub fn for_address(rf_address: RfAddress) -> Self {
        DeviceUpdate {
            rf_address: Some(rf_address),
            ..Default::default()
        }
    }

    pub fn for_serial(serial: impl Into<String>) -> Self {
        DeviceUpdate {
            serial: Some(serial.into()),
            ..Default::default()
        }
    }
}

/// Aggregate of everything decoded from the hub
#[derive(Debug, Clone, Default)]
pub struct CubeState {
    hub: Option<HubInfo>,
    cube_settings: Option<CubeSettings>,
    rooms: Vec<Room>,
    devices: Vec<Device>,
    ntp_servers: Option<NtpConfig>,
}

impl CubeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one decoded message into the model
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::Hello(info) => {
                debug!("hub {} greeted us", info.serial);
                self.hub = Some(info.clone());
            }
            Message::Directory(directory) => self.apply_directory(directory),
            Message::Configuration(config) => self.apply_configuration(config),
            Message::Status(statuses) => {
                for entry in statuses {
                    let update = DeviceUpdate {
                        status: Some(entry.status.clone()),
                        ..DeviceUpdate::for_address(entry.rf_address)
                    };
                    self.upsert_device(update);
                }
            }
            Message::NtpServers(config) => self.ntp_servers = Some(config.clone()),
            Message::CommandResult(_) => {}
        }
    }

    fn apply_directory(&mut self, directory: &Directory) {
        for entry in &directory.devices {
            self.upsert_device(DeviceUpdate {
                rf_address: Some(entry.rf_address),
                serial: Some(entry.serial.clone()),
                name: Some(entry.name.clone()),
                device_type: Some(entry.device_type),
                room_id: Some(entry.room_id),
                ..Default::default()
            });
        }

        self.rooms = directory
            .rooms
            .iter()
            .map(|room| Room {
                id: room.id,
                name: room.name.clone(),
                rf_address: room.rf_address,
                devices: directory
                    .devices
                    .iter()
                    .filter(|device| device.room_id == room.id)
                    .map(|device| device.rf_address)
                    .collect(),
            })
            .collect();
        debug!(
            "directory lists {} rooms and {} devices",
            self.rooms.len(),
            directory.devices.len()
        );
    }

    fn apply_configuration(&mut self, message: &ConfigurationMessage) {
        let configuration = match &message.kind {
            ConfigurationKind::Cube(settings) => {
                self.cube_settings = Some(settings.clone());
                return;
            }
            ConfigurationKind::Thermostat(config) => Some(config.clone()),
            ConfigurationKind::Basic => None,
        };
        self.upsert_device(DeviceUpdate {
            rf_address: Some(message.rf_address),
            serial: Some(message.serial.clone()),
            device_type: Some(message.device_type),
            room_id: Some(message.room_id),
            firmware_version: Some(message.firmware_version),
            configuration,
            ..Default::default()
        });
    }

    /// Merges `update` into the device matching its RF address, or its
    /// serial when no address is given; unknown addresses create a device.
    pub fn upsert_device(&mut self, update: DeviceUpdate) -> Option<&Device> {
        let position = match (&update.rf_address, &update.serial) {
            (Some(rf_address), _) => self.devices.iter().position(|d| d.rf_address == *rf_address),
            (None, Some(serial)) => self
                .devices
                .iter()
                .position(|d| d.serial.as_deref() == Some(serial.as_str())),
            (None, None) => None,
        };

        let index = match (position, update.rf_address) {
            (Some(index), _) => index,
            (None, Some(rf_address)) => {
                self.devices.push(Device::new(rf_address));
                self.devices.len() - 1
            }
            (None, None) => {
                warn!("dropping device update without a matching RF address or serial");
                return None;
            }
        };

        let device = &mut self.devices[index];
        device.merge(update);
        Some(device)
    }

    pub fn hub(&self) -> Option<&HubInfo> {
        self.hub.as_ref()
    }

    pub fn cube_settings(&self) -> Option<&CubeSettings> {
        self.cube_settings.as_ref()
    }

    pub fn ntp_servers(&self) -> Option<&NtpConfig> {
        self.ntp_servers.as_ref()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: u8) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, rf_address: &RfAddress) -> Option<&Device> {
        self.devices.iter().find(|d| d.rf_address == *rf_address)
    }

    pub fn device_by_serial(&self, serial: &str) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.serial.as_deref() == Some(serial))
    }

    /// Resolves a room's member list into device records
    pub fn room_devices<'a>(&'a self, room: &'a Room) -> impl Iterator<Item = &'a Device> + 'a {
        room.devices.iter().filter_map(move |rf| self.device(rf))
    }

    /// Forgets everything; used when a connection is re-established
    pub fn clear(&mut self) {
        *self = CubeState::default();
    }
}
