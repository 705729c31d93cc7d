// CLASSIFICATION: COMMUNITY
// Filename: blocks.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Fixed-size binary layouts of the persisted configuration blocks.
//!
//! Multi-byte integers are little-endian. Addresses are stored as their four
//! octets in network order. Text fields are NUL padded.

use std::net::Ipv4Addr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{ConfigBlock, ConfigError, ConfigurationOption};

const NETWORK_MARKER: [u8; 4] = *b"CN1\0";
const WIRELESS_MARKER: [u8; 4] = *b"WN1\0";

pub const SSID_MAX_LEN: usize = 32;
pub const PASSWORD_MAX_LEN: usize = 64;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressMode {
    #[default]
    Invalid = 0,
    Dhcp = 1,
    Static = 2,
    AutoIp = 3,
}

impl TryFrom<u8> for AddressMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => AddressMode::Invalid,
            1 => AddressMode::Dhcp,
            2 => AddressMode::Static,
            3 => AddressMode::AutoIp,
            _ => return Err(ConfigError::InvalidField("address_mode")),
        })
    }
}

/// IANA ifType values, as reported by the stack.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterfaceType {
    #[default]
    Unknown = 0,
    Ethernet = 6,
    Wireless80211 = 71,
}

impl TryFrom<u8> for InterfaceType {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => InterfaceType::Unknown,
            6 => InterfaceType::Ethernet,
            71 => InterfaceType::Wireless80211,
            _ => return Err(ConfigError::InvalidField("interface_type")),
        })
    }
}

/// Settings of one network adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceConfig {
    pub ipv4_address: Ipv4Addr,
    pub ipv4_netmask: Ipv4Addr,
    pub ipv4_gateway: Ipv4Addr,
    pub ipv4_dns: [Ipv4Addr; 2],
    pub mac_address: [u8; 6],
    pub address_mode: AddressMode,
    pub interface_type: InterfaceType,
    /// Id of the wireless block this adapter uses, 0 for wired adapters.
    pub specific_config_id: u32,
}

impl Default for NetworkInterfaceConfig {
    fn default() -> Self {
        Self {
            ipv4_address: Ipv4Addr::UNSPECIFIED,
            ipv4_netmask: Ipv4Addr::UNSPECIFIED,
            ipv4_gateway: Ipv4Addr::UNSPECIFIED,
            ipv4_dns: [Ipv4Addr::UNSPECIFIED; 2],
            mac_address: [0; 6],
            address_mode: AddressMode::Dhcp,
            interface_type: InterfaceType::Ethernet,
            specific_config_id: 0,
        }
    }
}

impl ConfigBlock for NetworkInterfaceConfig {
    const OPTION: ConfigurationOption = ConfigurationOption::Network;
    const SIZE: usize = 36;

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&NETWORK_MARKER);
        out.extend_from_slice(&self.ipv4_address.octets());
        out.extend_from_slice(&self.ipv4_netmask.octets());
        out.extend_from_slice(&self.ipv4_gateway.octets());
        for dns in &self.ipv4_dns {
            out.extend_from_slice(&dns.octets());
        }
        out.extend_from_slice(&self.mac_address);
        out.push(self.address_mode as u8);
        out.push(self.interface_type as u8);
        out.extend_from_slice(&self.specific_config_id.to_le_bytes());
        debug_assert_eq!(out.len(), Self::SIZE);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let mut r = Reader::new::<Self>(bytes, NETWORK_MARKER)?;
        Ok(Self {
            ipv4_address: r.ipv4(),
            ipv4_netmask: r.ipv4(),
            ipv4_gateway: r.ipv4(),
            ipv4_dns: [r.ipv4(), r.ipv4()],
            mac_address: r.array(),
            address_mode: AddressMode::try_from(r.u8())?,
            interface_type: InterfaceType::try_from(r.u8())?,
            specific_config_id: r.u32(),
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Authentication {
    #[default]
    None = 0,
    Eap = 1,
    Peap = 2,
    Wcn = 3,
    Open = 4,
    Shared = 5,
    Wep = 6,
    Wpa = 7,
    Wpa2 = 8,
}

impl TryFrom<u8> for Authentication {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Authentication::*;
        Ok(match value {
            0 => None,
            1 => Eap,
            2 => Peap,
            3 => Wcn,
            4 => Open,
            5 => Shared,
            6 => Wep,
            7 => Wpa,
            8 => Wpa2,
            _ => return Err(ConfigError::InvalidField("authentication")),
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encryption {
    #[default]
    None = 0,
    Wep = 1,
    Wpa = 2,
    Wpa2 = 3,
    WpaPsk = 4,
    Wpa2Psk = 5,
    Certificate = 6,
}

impl TryFrom<u8> for Encryption {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Encryption::*;
        Ok(match value {
            0 => None,
            1 => Wep,
            2 => Wpa,
            3 => Wpa2,
            4 => WpaPsk,
            5 => Wpa2Psk,
            6 => Certificate,
            _ => return Err(ConfigError::InvalidField("encryption")),
        })
    }
}

bitflags! {
    /// 802.11 PHY modes the radio may use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Radio: u8 {
        const B = 0x01;
        const G = 0x02;
        const N = 0x04;
        const A = 0x08;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct WirelessOptions: u8 {
        const ENABLE = 0x01;
        const AUTO_CONNECT = 0x02;
        const SMART_CONFIG = 0x04;
    }
}

/// Credentials and radio settings of one 802.11 interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WirelessInterfaceConfig {
    pub id: u32,
    pub authentication: Authentication,
    pub encryption: Encryption,
    pub radio: Radio,
    pub options: WirelessOptions,
    pub ssid: String,
    pub password: String,
}

impl WirelessInterfaceConfig {
    /// Reject values that do not fit the fixed block layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.len() > SSID_MAX_LEN {
            return Err(ConfigError::FieldTooLong("ssid"));
        }
        if self.password.len() > PASSWORD_MAX_LEN {
            return Err(ConfigError::FieldTooLong("password"));
        }
        Ok(())
    }
}

impl ConfigBlock for WirelessInterfaceConfig {
    const OPTION: ConfigurationOption = ConfigurationOption::Wireless80211;
    const SIZE: usize = 4 + 4 + 4 + SSID_MAX_LEN + PASSWORD_MAX_LEN;

    /// Text beyond the field width is truncated; call
    /// [`WirelessInterfaceConfig::validate`] first to reject it instead.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&WIRELESS_MARKER);
        out.extend_from_slice(&self.id.to_le_bytes());
        out.push(self.authentication as u8);
        out.push(self.encryption as u8);
        out.push(self.radio.bits());
        out.push(self.options.bits());
        put_padded(&mut out, self.ssid.as_bytes(), SSID_MAX_LEN);
        put_padded(&mut out, self.password.as_bytes(), PASSWORD_MAX_LEN);
        debug_assert_eq!(out.len(), Self::SIZE);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        let mut r = Reader::new::<Self>(bytes, WIRELESS_MARKER)?;
        Ok(Self {
            id: r.u32(),
            authentication: Authentication::try_from(r.u8())?,
            encryption: Encryption::try_from(r.u8())?,
            radio: Radio::from_bits_truncate(r.u8()),
            options: WirelessOptions::from_bits_truncate(r.u8()),
            ssid: r.text(SSID_MAX_LEN, "ssid")?,
            password: r.text(PASSWORD_MAX_LEN, "password")?,
        })
    }
}

fn put_padded(out: &mut Vec<u8>, value: &[u8], width: usize) {
    let n = value.len().min(width);
    out.extend_from_slice(&value[..n]);
    out.resize(out.len() + (width - n), 0);
}

/// Cursor over a block whose size and marker were already checked.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new<T: ConfigBlock>(bytes: &'a [u8], marker: [u8; 4]) -> Result<Self, ConfigError> {
        if bytes.len() != T::SIZE {
            return Err(ConfigError::BadSize {
                option: T::OPTION,
                expected: T::SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[..4] != marker {
            return Err(ConfigError::BadMarker { option: T::OPTION });
        }
        Ok(Self { bytes, pos: 4 })
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let s = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        s
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N));
        a
    }

    fn u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    fn ipv4(&mut self) -> Ipv4Addr {
        Ipv4Addr::from(self.array::<4>())
    }

    fn text(&mut self, width: usize, field: &'static str) -> Result<String, ConfigError> {
        let raw = self.take(width);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        String::from_utf8(raw[..end].to_vec()).map_err(|_| ConfigError::InvalidField(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_wireless() -> WirelessInterfaceConfig {
        WirelessInterfaceConfig {
            id: 44,
            authentication: Authentication::Wpa2,
            encryption: Encryption::Wpa2Psk,
            radio: Radio::B | Radio::G | Radio::N,
            options: WirelessOptions::ENABLE | WirelessOptions::AUTO_CONNECT,
            ssid: "lab-ap".into(),
            password: "hunter22".into(),
        }
    }

    #[test]
    fn network_block_layout() {
        let cfg = NetworkInterfaceConfig {
            ipv4_address: Ipv4Addr::new(192, 168, 1, 20),
            mac_address: [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            address_mode: AddressMode::Static,
            specific_config_id: 3,
            ..Default::default()
        };
        let bytes = cfg.encode();
        assert_eq!(bytes.len(), NetworkInterfaceConfig::SIZE);
        assert_eq!(&bytes[..4], b"CN1\0");
        assert_eq!(&bytes[4..8], &[192, 168, 1, 20]);
        assert_eq!(bytes[30], AddressMode::Static as u8);
        assert_eq!(&bytes[32..], &3u32.to_le_bytes());
        assert_eq!(NetworkInterfaceConfig::decode(&bytes).unwrap(), cfg);
    }

    #[test]
    fn wireless_block_decodes_padded_text() {
        let cfg = sample_wireless();
        let bytes = cfg.encode();
        assert_eq!(bytes.len(), WirelessInterfaceConfig::SIZE);
        assert_eq!(WirelessInterfaceConfig::decode(&bytes).unwrap(), cfg);
    }

    #[test]
    fn decode_rejects_short_and_foreign_blocks() {
        let bytes = NetworkInterfaceConfig::default().encode();
        assert!(matches!(
            NetworkInterfaceConfig::decode(&bytes[..20]),
            Err(ConfigError::BadSize { actual: 20, .. })
        ));
        let mut wrong = bytes.clone();
        wrong[0] = b'X';
        assert!(matches!(
            NetworkInterfaceConfig::decode(&wrong),
            Err(ConfigError::BadMarker { .. })
        ));
    }

    #[test]
    fn validate_rejects_long_ssid() {
        let mut cfg = sample_wireless();
        cfg.ssid = "x".repeat(SSID_MAX_LEN + 1);
        assert!(matches!(cfg.validate(), Err(ConfigError::FieldTooLong("ssid"))));
    }
}
