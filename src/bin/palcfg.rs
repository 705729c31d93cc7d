// CLASSIFICATION: COMMUNITY
// Filename: palcfg.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Inspect and edit file-backed configuration blocks.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use socket_pal::config::{
    AddressMode, Authentication, ConfigBlockStore, ConfigurationManager, ConfigurationOption,
    Encryption, FileBlockStore, NetworkInterfaceConfig, WirelessInterfaceConfig, WirelessOptions,
};
use socket_pal::settings::PalConfig;

#[derive(Parser)]
#[command(about = "Configuration block tool for the platform socket layer")]
struct Cli {
    /// Store root (defaults to the active settings)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Store namespace (defaults to the active settings)
    #[arg(long)]
    namespace: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Network,
    Wireless,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Dhcp,
    Static,
    AutoIp,
}

#[derive(Subcommand)]
enum Cmd {
    /// Count the blocks in the store
    List,
    /// Print one block as JSON
    Show { kind: Kind, index: u32 },
    /// Write a network adapter block
    SetNetwork {
        index: u32,
        #[arg(long, value_enum, default_value = "dhcp")]
        mode: Mode,
        #[arg(long)]
        address: Option<Ipv4Addr>,
        #[arg(long)]
        netmask: Option<Ipv4Addr>,
        #[arg(long)]
        gateway: Option<Ipv4Addr>,
        #[arg(long, num_args = 0..=2)]
        dns: Vec<Ipv4Addr>,
        /// Twelve hex digits, colons allowed
        #[arg(long)]
        mac: Option<String>,
    },
    /// Write a wireless interface block
    SetWireless {
        index: u32,
        #[arg(long)]
        ssid: String,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long)]
        no_auto_connect: bool,
    },
}

fn parse_mac(raw: &str) -> anyhow::Result<[u8; 6]> {
    let digits: String = raw.chars().filter(|c| *c != ':' && *c != '-').collect();
    let bytes = hex::decode(&digits).with_context(|| format!("bad MAC {raw:?}"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("MAC {raw:?} must be six bytes"))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = PalConfig::load_active();
    let dir = cli.dir.unwrap_or(settings.store_dir.clone());
    let namespace = cli.namespace.unwrap_or(settings.store_namespace.clone());

    let store = FileBlockStore::open(&dir, &namespace)?;
    let mut mgr = ConfigurationManager::new(
        store,
        settings.network_interface_count,
        settings.wireless_interface_count,
    );

    match cli.cmd {
        Cmd::List => {
            let found = mgr.store_mut().enumerate()?;
            println!("{found} blocks in {:?}", mgr.store().dir());
        }
        Cmd::Show { kind, index } => {
            let json = match kind {
                Kind::Network => {
                    let cfg: NetworkInterfaceConfig = mgr.get_block(index)?;
                    info!("mac {}", hex::encode(cfg.mac_address));
                    serde_json::to_string_pretty(&cfg)?
                }
                Kind::Wireless => {
                    let cfg: WirelessInterfaceConfig = mgr.get_block(index)?;
                    serde_json::to_string_pretty(&cfg)?
                }
            };
            println!("{json}");
        }
        Cmd::SetNetwork {
            index,
            mode,
            address,
            netmask,
            gateway,
            dns,
            mac,
        } => {
            mgr.check_network_index(index)?;
            let mut cfg: NetworkInterfaceConfig = mgr.get_block(index).unwrap_or_default();
            cfg.address_mode = match mode {
                Mode::Dhcp => AddressMode::Dhcp,
                Mode::Static => AddressMode::Static,
                Mode::AutoIp => AddressMode::AutoIp,
            };
            if let Some(a) = address {
                cfg.ipv4_address = a;
            }
            if let Some(m) = netmask {
                cfg.ipv4_netmask = m;
            }
            if let Some(g) = gateway {
                cfg.ipv4_gateway = g;
            }
            for (slot, server) in cfg.ipv4_dns.iter_mut().zip(dns) {
                *slot = server;
            }
            if let Some(raw) = mac {
                cfg.mac_address = parse_mac(&raw)?;
            }
            mgr.save_network(index, &cfg)?;
            println!("stored {:?} block {index}", ConfigurationOption::Network);
        }
        Cmd::SetWireless {
            index,
            ssid,
            password,
            no_auto_connect,
        } => {
            mgr.apply_wireless();
            let mut cfg = mgr.wireless(index)?.clone();
            cfg.ssid = ssid;
            cfg.password = password;
            cfg.options = WirelessOptions::ENABLE;
            if !no_auto_connect {
                cfg.options |= WirelessOptions::AUTO_CONNECT;
            }
            if cfg.password.is_empty() {
                cfg.authentication = Authentication::Open;
                cfg.encryption = Encryption::None;
            } else {
                cfg.authentication = Authentication::Wpa2;
                cfg.encryption = Encryption::Wpa2Psk;
            }
            mgr.set_wireless(index, &cfg)?;
            mgr.save_all_wireless()?;
            println!("stored {:?} block {index}", ConfigurationOption::Wireless80211);
        }
    }
    Ok(())
}
