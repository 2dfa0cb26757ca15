use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// 3-byte radio address of a hub component or room group
///
/// Rendered as 6 lowercase hex characters. Comparison against strings
/// ignores case; comparison against raw bytes is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RfAddress(pub [u8; 3]);

impl RfAddress {
    /// Creates an address from a byte slice of exactly 3 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 3] = bytes
            .try_into()
            .map_err(|_| Error::length_mismatch("RF address", 3, bytes.len()))?;
        Ok(RfAddress(raw))
    }

    /// Returns the raw address bytes
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl fmt::Display for RfAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for RfAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 6 || !s.is_ascii() {
            return Err(Error::validation(format!(
                "RF address must be 6 hex characters, got {:?}",
                s
            )));
        }
        let raw = hex::decode(s)
            .map_err(|e| Error::validation(format!("RF address {:?} is not hexadecimal: {}", s, e)))?;
        Self::from_slice(&raw)
    }
}

impl PartialEq<str> for RfAddress {
    fn eq(&self, other: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for RfAddress {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<[u8]> for RfAddress {
    fn eq(&self, other: &[u8]) -> bool {
        self.0[..] == *other
    }
}

/// Kind of component paired with a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Cube,
    RadiatorThermostat,
    RadiatorThermostatPlus,
    WallThermostat,
    ShutterContact,
    EcoButton,
    Unknown(u8),
}

impl DeviceType {
    /// Thermostats carry a set-point profile and weekly program
    pub fn is_thermostat(&self) -> bool {
        matches!(
            self,
            DeviceType::RadiatorThermostat
                | DeviceType::RadiatorThermostatPlus
                | DeviceType::WallThermostat
        )
    }
}

impl From<u8> for DeviceType {
    fn from(raw: u8) -> Self {
        match raw {
            0 => DeviceType::Cube,
            1 => DeviceType::RadiatorThermostat,
            2 => DeviceType::RadiatorThermostatPlus,
            3 => DeviceType::WallThermostat,
            4 => DeviceType::ShutterContact,
            5 => DeviceType::EcoButton,
            other => DeviceType::Unknown(other),
        }
    }
}

impl From<DeviceType> for u8 {
    fn from(device_type: DeviceType) -> u8 {
        match device_type {
            DeviceType::Cube => 0,
            DeviceType::RadiatorThermostat => 1,
            DeviceType::RadiatorThermostatPlus => 2,
            DeviceType::WallThermostat => 3,
            DeviceType::ShutterContact => 4,
            DeviceType::EcoButton => 5,
            DeviceType::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Cube => f.write_str("Cube"),
            DeviceType::RadiatorThermostat => f.write_str("Radiator Thermostat"),
            DeviceType::RadiatorThermostatPlus => f.write_str("Radiator Thermostat Plus"),
            DeviceType::WallThermostat => f.write_str("Wall Thermostat"),
            DeviceType::ShutterContact => f.write_str("Shutter Contact"),
            DeviceType::EcoButton => f.write_str("Eco Button"),
            DeviceType::Unknown(raw) => write!(f, "Unknown ({})", raw),
        }
    }
}

/// Connection settings for the hub's control channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeConfig {
    /// Hub host name or IP address
    pub host: String,
    /// Control channel port
    pub port: u16,
    /// Upper bound for establishing the TCP connection
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub connect_timeout: Duration,
    /// Single receive call bound; a drain ends when one call exceeds it
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub read_timeout: Duration,
}

impl CubeConfig {
    /// Creates a configuration for the given host with default port and timeouts
    pub fn new(host: impl Into<String>) -> Self {
        CubeConfig {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Overrides the control channel port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Checks the settings before a connection attempt
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("hub host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("hub port must not be 0"));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::config("read timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for CubeConfig {
    fn default() -> Self {
        CubeConfig {
            host: "127.0.0.1".to_string(),
            port: super::DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rf_address_rendering() {
        let addr = RfAddress([0x12, 0x2b, 0x65]);
        assert_eq!(addr.to_string(), "122b65");
    }

    #[test]
    fn test_rf_address_comparisons() {
        let addr: RfAddress = "122B65".parse().unwrap();
        assert_eq!(addr, RfAddress([0x12, 0x2b, 0x65]));
        assert!(addr == "122b65");
        assert!(addr == "122B65");
        assert!(addr == [0x12u8, 0x2b, 0x65][..]);
        assert!(addr != [0x12u8, 0x2b][..]);
    }

    #[test]
    fn test_rf_address_rejects_bad_input() {
        assert!("12345".parse::<RfAddress>().unwrap_err().is_validation());
        assert!("12zz45".parse::<RfAddress>().unwrap_err().is_validation());
        assert!(RfAddress::from_slice(&[1, 2]).is_err());
        assert!(RfAddress::from_slice(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_device_type_mapping() {
        assert_eq!(DeviceType::from(2), DeviceType::RadiatorThermostatPlus);
        assert_eq!(u8::from(DeviceType::WallThermostat), 3);
        assert_eq!(DeviceType::from(9), DeviceType::Unknown(9));
        assert!(DeviceType::from(1).is_thermostat());
        assert!(!DeviceType::ShutterContact.is_thermostat());
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = CubeConfig::new("10.0.0.5");
        assert_eq!(config.port, 62910);
        assert!(config.validate().is_ok());

        let bad = CubeConfig::new(" ").with_port(1);
        assert!(matches!(bad.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = CubeConfig::new("10.0.0.5").with_port(4567);
        let json = serde_json::to_string(&config).unwrap();
        let back: CubeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, "10.0.0.5");
        assert_eq!(back.port, 4567);
        assert_eq!(back.read_timeout, config.read_timeout);
    }
}
