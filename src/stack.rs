// CLASSIFICATION: COMMUNITY
// Filename: stack.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Interface to the underlying TCP/IP stack.
//!
//! The platform layer never implements transport behaviour itself. Every
//! primitive below is owned by the stack port for the target (lwIP on the
//! MCU builds, a host shim in tests) and is assumed to be internally
//! synchronised.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::{NetworkInterfaceConfig, UpdateFlags, WirelessInterfaceConfig};
use crate::types::{
    AddressFamily, FdSet, IoctlCommand, Protocol, ShutdownHow, SocketHandle, SocketType,
};

/// Failure reported by the stack, carrying its native error code.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("network stack error {code}")]
pub struct StackError {
    pub code: i32,
}

impl StackError {
    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

pub type StackResult<T> = Result<T, StackError>;

/// Readiness sets handed to [`NetworkStack::select`].
#[derive(Debug, Default)]
pub struct SelectSets<'a> {
    pub read: Option<&'a mut FdSet>,
    pub write: Option<&'a mut FdSet>,
    pub except: Option<&'a mut FdSet>,
}

/// Socket and adapter primitives of the network stack.
pub trait NetworkStack: Send + Sync {
    fn initialize(&self) -> StackResult<()>;
    fn uninitialize(&self) -> StackResult<()>;

    fn socket(
        &self,
        family: AddressFamily,
        ty: SocketType,
        protocol: Protocol,
    ) -> StackResult<SocketHandle>;
    fn bind(&self, socket: SocketHandle, addr: &SocketAddr) -> StackResult<()>;
    fn connect(&self, socket: SocketHandle, addr: &SocketAddr) -> StackResult<()>;
    fn send(&self, socket: SocketHandle, buf: &[u8], flags: i32) -> StackResult<usize>;
    fn recv(&self, socket: SocketHandle, buf: &mut [u8], flags: i32) -> StackResult<usize>;
    fn close(&self, socket: SocketHandle) -> StackResult<()>;
    fn listen(&self, socket: SocketHandle, backlog: i32) -> StackResult<()>;
    fn accept(&self, socket: SocketHandle) -> StackResult<(SocketHandle, SocketAddr)>;
    fn shutdown(&self, socket: SocketHandle, how: ShutdownHow) -> StackResult<()>;
    fn get_addr_info(&self, node: &str, service: Option<&str>) -> StackResult<Vec<SocketAddr>>;
    fn ioctl(&self, socket: SocketHandle, cmd: IoctlCommand, arg: &mut u32) -> StackResult<()>;
    fn last_error(&self) -> i32;
    /// Returns the number of ready handles across all sets.
    fn select(&self, sets: SelectSets<'_>, timeout: Option<Duration>) -> StackResult<usize>;
    fn set_sock_opt(
        &self,
        socket: SocketHandle,
        level: i32,
        name: i32,
        value: &[u8],
    ) -> StackResult<()>;
    fn get_sock_opt(
        &self,
        socket: SocketHandle,
        level: i32,
        name: i32,
        value: &mut [u8],
    ) -> StackResult<usize>;
    fn get_peer_name(&self, socket: SocketHandle) -> StackResult<SocketAddr>;
    fn get_sock_name(&self, socket: SocketHandle) -> StackResult<SocketAddr>;
    fn recv_from(
        &self,
        socket: SocketHandle,
        buf: &mut [u8],
        flags: i32,
    ) -> StackResult<(usize, SocketAddr)>;
    fn send_to(
        &self,
        socket: SocketHandle,
        buf: &[u8],
        flags: i32,
        to: &SocketAddr,
    ) -> StackResult<usize>;

    fn adapter_count(&self) -> u32;
    /// Current live configuration of adapter `index`.
    fn load_adapter_configuration(&self, index: u32) -> StackResult<NetworkInterfaceConfig>;
    /// Apply `config` to adapter `index`, honouring `flags`.
    fn update_adapter_configuration(
        &self,
        index: u32,
        flags: UpdateFlags,
        config: &NetworkInterfaceConfig,
    ) -> StackResult<()>;

    /// Wireless settings held by the stack or radio driver for interface
    /// `index`. `None` means the stored settings apply.
    fn load_wireless_configuration(
        &self,
        _index: u32,
    ) -> StackResult<Option<WirelessInterfaceConfig>> {
        Ok(None)
    }

    /// Start the device discovery responder. Stacks without one keep the
    /// default.
    fn start_discovery(&self) -> StackResult<()> {
        Ok(())
    }
}
