//! Hub discovery via UDP broadcast
//!
//! A single request datagram is broadcast and the first reply that is not
//! our own echo is parsed. There are no retries; a missing reply surfaces as
//! [`Error::Timeout`], a reply of the wrong size as a validation error.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::core::trace::{self, Direction, SharedTrace};
use crate::core::{Error, Result, RfAddress, DISCOVERY_PORT};
use crate::util;

/// Fixed request prefix
pub const MAGIC: &[u8; 8] = b"eQ3Max*\0";

/// Length of a hub serial number
pub const SERIAL_LEN: usize = 10;

const IDENTIFY_RESPONSE_LEN: usize = 26;
const NETWORK_CONFIG_RESPONSE_LEN: usize = 40;
const MAX_DATAGRAM_SIZE: usize = 512;

/// Settings for a discovery exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Destination of the request
    pub broadcast_addr: Ipv4Addr,
    /// Destination port of the request
    pub port: u16,
    /// Local address replies arrive on
    pub bind_addr: SocketAddrV4,
    /// Upper bound for the whole exchange
    #[serde(serialize_with = "crate::core::serde::serialize_duration")]
    #[serde(deserialize_with = "crate::core::serde::deserialize_duration")]
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            broadcast_addr: Ipv4Addr::BROADCAST,
            port: DISCOVERY_PORT,
            bind_addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DISCOVERY_PORT),
            timeout: Duration::from_secs(10),
        }
    }
}

/// What the hub is asked to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryType {
    /// Serial, RF address and firmware
    Identify,
    /// IP settings
    NetworkConfig,
}

impl DiscoveryType {
    pub fn as_byte(&self) -> u8 {
        match self {
            DiscoveryType::Identify => b'I',
            DiscoveryType::NetworkConfig => b'N',
        }
    }
}

/// Builds the request datagram; without a serial every hub is addressed
pub fn build_request(serial: Option<&str>, discovery_type: DiscoveryType) -> Result<Vec<u8>> {
    let mut request = Vec::with_capacity(MAGIC.len() + SERIAL_LEN + 1);
    request.extend_from_slice(MAGIC);
    match serial {
        Some(serial) => {
            if serial.len() != SERIAL_LEN || !serial.is_ascii() {
                return Err(Error::validation(format!(
                    "hub serial must be {} ASCII characters (got {:?})",
                    SERIAL_LEN, serial
                )));
            }
            request.extend_from_slice(serial.as_bytes());
        }
        None => request.extend_from_slice(&[b'*'; SERIAL_LEN]),
    }
    request.push(discovery_type.as_byte());
    Ok(request)
}

fn check_len(what: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(Error::length_mismatch(what, expected, data.len()));
    }
    Ok(())
}

/// Reply to an identify request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyResponse {
    pub name: String,
    pub serial: String,
    pub request_id: u8,
    pub request_type: u8,
    pub rf_address: RfAddress,
    /// Four hex digits, as in the greeting
    pub firmware_version: String,
}

impl IdentifyResponse {
    pub fn parse(data: &[u8]) -> Result<Self> {
        check_len("Identify response", data, IDENTIFY_RESPONSE_LEN)?;
        Ok(IdentifyResponse {
            name: util::decode_text(&data[0..8]),
            serial: util::decode_text(&data[8..18]),
            request_id: data[18],
            request_type: data[19],
            rf_address: RfAddress::from_slice(&data[21..24])?,
            firmware_version: hex::encode(&data[24..26]),
        })
    }
}

impl fmt::Display for IdentifyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: RF address: {}, firmware: {}",
            self.serial, self.rf_address, self.firmware_version
        )
    }
}

/// Reply to a network configuration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfigResponse {
    pub name: String,
    pub serial: String,
    pub request_id: u8,
    pub request_type: u8,
    pub ip_address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub dns1: Ipv4Addr,
    pub dns2: Ipv4Addr,
}

impl NetworkConfigResponse {
    pub fn parse(data: &[u8]) -> Result<Self> {
        check_len("Network configuration response", data, NETWORK_CONFIG_RESPONSE_LEN)?;
        let addr = |offset: usize| {
            Ipv4Addr::new(data[offset], data[offset + 1], data[offset + 2], data[offset + 3])
        };
        Ok(NetworkConfigResponse {
            name: util::decode_text(&data[0..8]),
            serial: util::decode_text(&data[8..18]),
            request_id: data[18],
            request_type: data[19],
            ip_address: addr(20),
            gateway: addr(24),
            netmask: addr(28),
            dns1: addr(32),
            dns2: addr(36),
        })
    }
}

impl fmt::Display for NetworkConfigResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: IP: {}, netmask: {}, gateway: {}, DNS1: {}, DNS2: {}",
            self.serial, self.ip_address, self.netmask, self.gateway, self.dns1, self.dns2
        )
    }
}

/// Parsed discovery reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryResponse {
    Identify(IdentifyResponse),
    NetworkConfig(NetworkConfigResponse),
}

/// Runs discovery exchanges with one configuration
pub struct Discovery {
    config: DiscoveryConfig,
    trace: SharedTrace,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self::with_trace(config, trace::noop())
    }

    pub fn with_trace(config: DiscoveryConfig, trace: SharedTrace) -> Self {
        Discovery { config, trace }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub async fn identify(&self, serial: Option<&str>) -> Result<IdentifyResponse> {
        let reply = self.exchange(serial, DiscoveryType::Identify).await?;
        IdentifyResponse::parse(&reply)
    }

    pub async fn network_config(&self, serial: Option<&str>) -> Result<NetworkConfigResponse> {
        let reply = self.exchange(serial, DiscoveryType::NetworkConfig).await?;
        NetworkConfigResponse::parse(&reply)
    }

    /// Sends one request and parses the reply according to `discovery_type`
    pub async fn discover(
        &self,
        serial: Option<&str>,
        discovery_type: DiscoveryType,
    ) -> Result<DiscoveryResponse> {
        match discovery_type {
            DiscoveryType::Identify => self.identify(serial).await.map(DiscoveryResponse::Identify),
            DiscoveryType::NetworkConfig => self
                .network_config(serial)
                .await
                .map(DiscoveryResponse::NetworkConfig),
        }
    }

    async fn exchange(&self, serial: Option<&str>, discovery_type: DiscoveryType) -> Result<Vec<u8>> {
        let request = build_request(serial, discovery_type)?;
        let socket = bind_socket(self.config.bind_addr)?;
        let target = SocketAddrV4::new(self.config.broadcast_addr, self.config.port);

        self.trace.on_bytes(Direction::Outbound, "discovery request", &request);
        socket.send_to(&request, target).await?;
        debug!("sent {:?} discovery request to {}", discovery_type, target);

        timeout(self.config.timeout, self.receive_reply(&socket, &request))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "no discovery reply within {:?}",
                    self.config.timeout
                ))
            })?
    }

    async fn receive_reply(&self, socket: &UdpSocket, request: &[u8]) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (n, from) = socket.recv_from(&mut buf).await?;
            let datagram = &buf[..n];
            if datagram == request {
                trace!("ignoring our own broadcast echoed from {}", from);
                continue;
            }
            self.trace.on_bytes(Direction::Inbound, "discovery reply", datagram);
            debug!("discovery reply of {} bytes from {}", n, from);
            return Ok(datagram.to_vec());
        }
    }
}

fn bind_socket(addr: SocketAddrV4) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::V4(addr).into())?;
    Ok(UdpSocket::from_std(socket.into())?)
}
