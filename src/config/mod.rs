// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Network and wireless configuration blocks.
//!
//! Blocks are fixed-size binary blobs keyed by [`ConfigurationOption`] and
//! interface index. [`ConfigurationManager`] sits between the socket driver
//! and a [`ConfigBlockStore`] and keeps the last known good copy of every
//! adapter's settings so a failed reconfiguration can be rolled back.

pub mod blocks;
pub mod store;

use bitflags::bitflags;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use blocks::{
    AddressMode, Authentication, Encryption, InterfaceType, NetworkInterfaceConfig, Radio,
    WirelessInterfaceConfig, WirelessOptions,
};
pub use store::{ConfigBlockStore, FileBlockStore, MemoryBlockStore};

/// Kind of configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigurationOption {
    Network,
    Wireless80211,
}

impl ConfigurationOption {
    /// Short name used in store keys.
    pub fn tag(self) -> &'static str {
        match self {
            ConfigurationOption::Network => "net",
            ConfigurationOption::Wireless80211 => "wifi",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "net" => Some(ConfigurationOption::Network),
            "wifi" => Some(ConfigurationOption::Wireless80211),
            _ => None,
        }
    }
}

bitflags! {
    /// What an adapter update changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateFlags: u32 {
        const DNS = 0x01;
        const DHCP = 0x02;
        const DHCP_RENEW = 0x04;
        const DHCP_RELEASE = 0x08;
        const MAC = 0x10;
    }
}

impl UpdateFlags {
    /// Updates after which the interface comes back up.
    pub const REINIT: UpdateFlags = UpdateFlags::DHCP
        .union(UpdateFlags::DHCP_RENEW)
        .union(UpdateFlags::MAC);

    /// Updates that take the interface down, dropping live connections.
    pub const UNINIT: UpdateFlags = UpdateFlags::REINIT.union(UpdateFlags::DHCP_RELEASE);
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interface index {index} out of range (limit {limit})")]
    InvalidIndex { index: u32, limit: u32 },
    #[error("{option:?} block {index} not found")]
    NotFound {
        option: ConfigurationOption,
        index: u32,
    },
    #[error("{option:?} block is {actual} bytes, expected {expected}")]
    BadSize {
        option: ConfigurationOption,
        expected: usize,
        actual: usize,
    },
    #[error("{option:?} block marker mismatch")]
    BadMarker { option: ConfigurationOption },
    #[error("invalid value in field {0}")]
    InvalidField(&'static str),
    #[error("field {0} too long for block")]
    FieldTooLong(&'static str),
    #[error("config store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// A fixed-size persisted block.
pub trait ConfigBlock: Sized {
    const OPTION: ConfigurationOption;
    const SIZE: usize;

    /// Serialise to exactly `SIZE` bytes.
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Result<Self, ConfigError>;
}

/// Typed access to a block store plus the in-memory view of every adapter.
pub struct ConfigurationManager<B> {
    store: B,
    network: Vec<Option<NetworkInterfaceConfig>>,
    wireless: Vec<WirelessInterfaceConfig>,
}

impl<B: ConfigBlockStore> ConfigurationManager<B> {
    pub fn new(store: B, network_interfaces: u32, wireless_interfaces: u32) -> Self {
        Self {
            store,
            network: vec![None; network_interfaces as usize],
            wireless: vec![WirelessInterfaceConfig::default(); wireless_interfaces as usize],
        }
    }

    /// Enumerate the blocks present in the store.
    pub fn initialize(&mut self) -> Result<usize, ConfigError> {
        let found = self.store.enumerate()?;
        info!("configuration store holds {found} blocks");
        Ok(found)
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut B {
        &mut self.store
    }

    pub fn network_interface_count(&self) -> u32 {
        self.network.len() as u32
    }

    pub fn wireless_interface_count(&self) -> u32 {
        self.wireless.len() as u32
    }

    pub fn check_network_index(&self, index: u32) -> Result<(), ConfigError> {
        check_index(index, self.network_interface_count())
    }

    pub fn check_wireless_index(&self, index: u32) -> Result<(), ConfigError> {
        check_index(index, self.wireless_interface_count())
    }

    /// Read and decode a block from the store.
    pub fn get_block<T: ConfigBlock>(&self, index: u32) -> Result<T, ConfigError> {
        let mut buf = vec![0u8; T::SIZE];
        self.store.get_block(T::OPTION, index, &mut buf)?;
        T::decode(&buf)
    }

    /// Encode, stage and commit a block.
    pub fn store_block<T: ConfigBlock>(&mut self, index: u32, block: &T) -> Result<(), ConfigError> {
        let data = block.encode();
        self.store.set_block(T::OPTION, index, &data)?;
        self.store.commit()?;
        debug!("stored {:?} block {index}", T::OPTION);
        Ok(())
    }

    /// Last configuration known to be applied to adapter `index`.
    pub fn active_network(&self, index: u32) -> Option<&NetworkInterfaceConfig> {
        self.network.get(index as usize).and_then(Option::as_ref)
    }

    /// Record `config` as active for adapter `index` and persist it.
    pub fn save_network(
        &mut self,
        index: u32,
        config: &NetworkInterfaceConfig,
    ) -> Result<(), ConfigError> {
        self.check_network_index(index)?;
        self.network[index as usize] = Some(config.clone());
        self.store_block(index, config)
    }

    /// Replace the cached wireless blocks with whatever the store holds.
    /// Interfaces without a stored block keep their current value.
    pub fn apply_wireless(&mut self) {
        for index in 0..self.wireless_interface_count() {
            match self.get_block::<WirelessInterfaceConfig>(index) {
                Ok(cfg) => self.wireless[index as usize] = cfg,
                Err(ConfigError::NotFound { .. }) => {
                    debug!("no stored wireless block {index}, keeping defaults")
                }
                Err(e) => warn!("wireless block {index} unreadable: {e}"),
            }
        }
    }

    pub fn wireless(&self, index: u32) -> Result<&WirelessInterfaceConfig, ConfigError> {
        self.check_wireless_index(index)?;
        Ok(&self.wireless[index as usize])
    }

    /// Update the cached wireless block; nothing is persisted until
    /// [`ConfigurationManager::save_all_wireless`].
    pub fn set_wireless(
        &mut self,
        index: u32,
        config: &WirelessInterfaceConfig,
    ) -> Result<(), ConfigError> {
        self.check_wireless_index(index)?;
        config.validate()?;
        self.wireless[index as usize] = config.clone();
        Ok(())
    }

    /// Stage every cached wireless block and commit them together.
    pub fn save_all_wireless(&mut self) -> Result<(), ConfigError> {
        for (index, cfg) in self.wireless.iter().enumerate() {
            self.store
                .set_block(ConfigurationOption::Wireless80211, index as u32, &cfg.encode())?;
        }
        self.store.commit()?;
        info!("saved {} wireless configurations", self.wireless.len());
        Ok(())
    }
}

fn check_index(index: u32, limit: u32) -> Result<(), ConfigError> {
    if index >= limit {
        return Err(ConfigError::InvalidIndex { index, limit });
    }
    Ok(())
}
