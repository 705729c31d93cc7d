// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Recording fakes for the socket driver collaborators.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket_pal::config::{NetworkInterfaceConfig, UpdateFlags, WirelessInterfaceConfig};
use socket_pal::debugger::DebuggerHooks;
use socket_pal::secure::SecureLayer;
use socket_pal::stack::{NetworkStack, SelectSets, StackError, StackResult};
use socket_pal::types::{AddressFamily, IoctlCommand, Protocol, ShutdownHow, SocketType};
use socket_pal::SocketHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StackInit,
    StackUninit,
    StackClose(SocketHandle),
    SecureClose(SocketHandle),
    SecureUninit,
    DebuggerAbort,
    DebuggerUninit,
    Detach,
    Attach,
    AdapterUpdate(u32, Ipv4Addr),
    Discovery,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn peer() -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 2], 5000))
}

pub struct FakeStack {
    pub log: EventLog,
    next_handle: AtomicI32,
    pub fail_init: AtomicBool,
    pub fail_uninit: AtomicBool,
    /// Updates whose address equals this one are rejected.
    pub reject_address: Mutex<Option<Ipv4Addr>>,
    pub live: Mutex<NetworkInterfaceConfig>,
    /// Wireless settings reported by the radio, overriding stored ones.
    pub wireless_override: Mutex<Option<WirelessInterfaceConfig>>,
    /// While set, `accept` blocks until released or the listener is closed.
    pub hold_accept: AtomicBool,
    pub accept_waiting: AtomicBool,
}

impl FakeStack {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            next_handle: AtomicI32::new(1),
            fail_init: AtomicBool::new(false),
            fail_uninit: AtomicBool::new(false),
            reject_address: Mutex::new(None),
            live: Mutex::new(NetworkInterfaceConfig::default()),
            wireless_override: Mutex::new(None),
            hold_accept: AtomicBool::new(false),
            accept_waiting: AtomicBool::new(false),
        }
    }

    pub fn wait_for_accept(&self) {
        while !self.accept_waiting.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn closed(&self, socket: SocketHandle) -> bool {
        self.log.lock().unwrap().contains(&Event::StackClose(socket))
    }

    fn record(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }
}

impl NetworkStack for FakeStack {
    fn initialize(&self) -> StackResult<()> {
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(StackError::new(-12));
        }
        self.record(Event::StackInit);
        Ok(())
    }

    fn uninitialize(&self) -> StackResult<()> {
        self.record(Event::StackUninit);
        if self.fail_uninit.load(Ordering::SeqCst) {
            return Err(StackError::new(-5));
        }
        Ok(())
    }

    fn socket(&self, _: AddressFamily, _: SocketType, _: Protocol) -> StackResult<SocketHandle> {
        Ok(SocketHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    fn bind(&self, _: SocketHandle, _: &SocketAddr) -> StackResult<()> {
        Ok(())
    }

    fn connect(&self, _: SocketHandle, _: &SocketAddr) -> StackResult<()> {
        Ok(())
    }

    fn send(&self, _: SocketHandle, buf: &[u8], _: i32) -> StackResult<usize> {
        Ok(buf.len())
    }

    fn recv(&self, _: SocketHandle, _: &mut [u8], _: i32) -> StackResult<usize> {
        Ok(0)
    }

    fn close(&self, socket: SocketHandle) -> StackResult<()> {
        self.record(Event::StackClose(socket));
        Ok(())
    }

    fn listen(&self, _: SocketHandle, _: i32) -> StackResult<()> {
        Ok(())
    }

    fn accept(&self, listener: SocketHandle) -> StackResult<(SocketHandle, SocketAddr)> {
        if self.hold_accept.load(Ordering::SeqCst) {
            self.accept_waiting.store(true, Ordering::SeqCst);
            while self.hold_accept.load(Ordering::SeqCst) {
                if self.closed(listener) {
                    return Err(StackError::new(-9));
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        let handle = SocketHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        Ok((handle, peer()))
    }

    fn shutdown(&self, _: SocketHandle, _: ShutdownHow) -> StackResult<()> {
        Ok(())
    }

    fn get_addr_info(&self, _: &str, _: Option<&str>) -> StackResult<Vec<SocketAddr>> {
        Ok(vec![peer()])
    }

    fn ioctl(&self, _: SocketHandle, _: IoctlCommand, arg: &mut u32) -> StackResult<()> {
        *arg = 0;
        Ok(())
    }

    fn last_error(&self) -> i32 {
        0
    }

    fn select(&self, _: SelectSets<'_>, _: Option<Duration>) -> StackResult<usize> {
        Ok(0)
    }

    fn set_sock_opt(&self, _: SocketHandle, _: i32, _: i32, _: &[u8]) -> StackResult<()> {
        Ok(())
    }

    fn get_sock_opt(&self, _: SocketHandle, _: i32, _: i32, _: &mut [u8]) -> StackResult<usize> {
        Ok(0)
    }

    fn get_peer_name(&self, _: SocketHandle) -> StackResult<SocketAddr> {
        Ok(peer())
    }

    fn get_sock_name(&self, _: SocketHandle) -> StackResult<SocketAddr> {
        Ok(peer())
    }

    fn recv_from(&self, _: SocketHandle, _: &mut [u8], _: i32) -> StackResult<(usize, SocketAddr)> {
        Ok((0, peer()))
    }

    fn send_to(&self, _: SocketHandle, buf: &[u8], _: i32, _: &SocketAddr) -> StackResult<usize> {
        Ok(buf.len())
    }

    fn adapter_count(&self) -> u32 {
        1
    }

    fn load_adapter_configuration(&self, _: u32) -> StackResult<NetworkInterfaceConfig> {
        Ok(self.live.lock().unwrap().clone())
    }

    fn update_adapter_configuration(
        &self,
        index: u32,
        _: UpdateFlags,
        config: &NetworkInterfaceConfig,
    ) -> StackResult<()> {
        self.record(Event::AdapterUpdate(index, config.ipv4_address));
        if *self.reject_address.lock().unwrap() == Some(config.ipv4_address) {
            return Err(StackError::new(-22));
        }
        *self.live.lock().unwrap() = config.clone();
        Ok(())
    }

    fn load_wireless_configuration(
        &self,
        _: u32,
    ) -> StackResult<Option<WirelessInterfaceConfig>> {
        Ok(self.wireless_override.lock().unwrap().clone())
    }

    fn start_discovery(&self) -> StackResult<()> {
        self.record(Event::Discovery);
        Ok(())
    }
}

pub struct RecordingSecure {
    pub log: EventLog,
}

impl SecureLayer for RecordingSecure {
    fn close_socket(&self, socket: SocketHandle) {
        self.log.lock().unwrap().push(Event::SecureClose(socket));
    }

    fn uninitialize(&self) {
        self.log.lock().unwrap().push(Event::SecureUninit);
    }
}

pub struct RecordingDebugger {
    pub log: EventLog,
    pub channel_live: bool,
}

impl DebuggerHooks for RecordingDebugger {
    fn abort(&self) {
        self.log.lock().unwrap().push(Event::DebuggerAbort);
    }

    fn uninitialize(&self) {
        self.log.lock().unwrap().push(Event::DebuggerUninit);
    }

    fn detach_channel(&self) -> bool {
        self.log.lock().unwrap().push(Event::Detach);
        self.channel_live
    }

    fn attach_channel(&self) {
        self.log.lock().unwrap().push(Event::Attach);
    }
}
