// CLASSIFICATION: COMMUNITY
// Filename: driver.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Socket driver: lifecycle control and the public socket facade.
//!
//! Create and accept go to the stack first and then register the new handle;
//! close unregisters first and then closes through the stack. Everything
//! else is forwarded unchanged. Bulk teardown runs in two passes: secure
//! sessions are shut down highest index first with no lock held, then the
//! registry is swept under its lock, closing raw handles and repacking any
//! preserved debug channels.
//!
//! Lock order is lifecycle, then configuration, then registry. Collaborator
//! callbacks that may re-enter the driver (the secure layer) are never made
//! while the registry lock is held, and [`SocketDriver::close`] never takes
//! the lifecycle lock. Stack calls that can block (create, accept) run with
//! no lock held; the new handle is registered only if the layer is still in
//! the same initialization it was opened under, and closed otherwise.
//!
//! The registry lock is released between the two teardown passes. A secure
//! session attached in that window is picked up by re-checking under the lock
//! before the sweep, so every secure socket gets its secure close first.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{
    ConfigBlockStore, ConfigError, ConfigurationManager, MemoryBlockStore, NetworkInterfaceConfig,
    UpdateFlags, WirelessInterfaceConfig,
};
use crate::debugger::{DebuggerHooks, NoDebugger};
use crate::registry::{HandleList, RegistryError, SocketEntry, SocketRegistry};
use crate::secure::{NoSecureLayer, SecureLayer};
use crate::settings::PalConfig;
use crate::stack::{NetworkStack, SelectSets, StackError};
use crate::types::{
    AddressFamily, IoctlCommand, Protocol, SecureSessionId, ShutdownHow, SocketHandle, SocketType,
};
use crate::SOCKETS_MAX_COUNT;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket layer not initialized")]
    NotInitialized,
    #[error("socket driver lock poisoned")]
    LockPoisoned,
    #[error("too many open sockets (limit {0})")]
    TooManySockets(usize),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type SocketResult<T> = Result<T, SocketError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: LifecycleState,
    /// Bumped on every successful initialize.
    generation: u64,
    wireless_applied: bool,
    discovery_initialized: bool,
}

impl Lifecycle {
    /// Token for the current initialization, `None` while uninitialized.
    fn session(&self) -> Option<u64> {
        (self.state == LifecycleState::Initialized).then_some(self.generation)
    }
}

/// Socket layer over a network stack `N`, secure layer `S`, debugger hooks
/// `D` and configuration store `B`.
pub struct SocketDriver<N, S = NoSecureLayer, D = NoDebugger, B = MemoryBlockStore> {
    stack: N,
    secure: S,
    debugger: D,
    lifecycle: Mutex<Lifecycle>,
    config: Mutex<ConfigurationManager<B>>,
    registry: Mutex<SocketRegistry>,
}

impl<N: NetworkStack> SocketDriver<N> {
    pub fn new(stack: N) -> Self {
        Self::with_settings(stack, &PalConfig::default())
    }

    pub fn with_settings(stack: N, settings: &PalConfig) -> Self {
        Self {
            stack,
            secure: NoSecureLayer,
            debugger: NoDebugger,
            lifecycle: Mutex::new(Lifecycle::default()),
            config: Mutex::new(ConfigurationManager::new(
                MemoryBlockStore::new(),
                settings.network_interface_count,
                settings.wireless_interface_count,
            )),
            registry: Mutex::new(SocketRegistry::new()),
        }
    }
}

impl<N, S, D, B> SocketDriver<N, S, D, B>
where
    N: NetworkStack,
    S: SecureLayer,
    D: DebuggerHooks,
    B: ConfigBlockStore,
{
    pub fn with_secure_layer<S2: SecureLayer>(self, secure: S2) -> SocketDriver<N, S2, D, B> {
        SocketDriver {
            stack: self.stack,
            secure,
            debugger: self.debugger,
            lifecycle: self.lifecycle,
            config: self.config,
            registry: self.registry,
        }
    }

    pub fn with_debugger<D2: DebuggerHooks>(self, debugger: D2) -> SocketDriver<N, S, D2, B> {
        SocketDriver {
            stack: self.stack,
            secure: self.secure,
            debugger,
            lifecycle: self.lifecycle,
            config: self.config,
            registry: self.registry,
        }
    }

    /// Swap the configuration store, keeping the interface counts.
    pub fn with_store<B2: ConfigBlockStore>(self, store: B2) -> SocketDriver<N, S, D, B2> {
        let old = self
            .config
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let config = ConfigurationManager::new(
            store,
            old.network_interface_count(),
            old.wireless_interface_count(),
        );
        SocketDriver {
            stack: self.stack,
            secure: self.secure,
            debugger: self.debugger,
            lifecycle: self.lifecycle,
            config: Mutex::new(config),
            registry: self.registry,
        }
    }

    pub fn stack(&self) -> &N {
        &self.stack
    }

    pub fn secure_layer(&self) -> &S {
        &self.secure
    }

    fn lifecycle(&self) -> SocketResult<MutexGuard<'_, Lifecycle>> {
        self.lifecycle.lock().map_err(|_| SocketError::LockPoisoned)
    }

    fn config(&self) -> SocketResult<MutexGuard<'_, ConfigurationManager<B>>> {
        self.config.lock().map_err(|_| SocketError::LockPoisoned)
    }

    fn registry(&self) -> SocketResult<MutexGuard<'_, SocketRegistry>> {
        self.registry.lock().map_err(|_| SocketError::LockPoisoned)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Clear the registry and bring up the stack. A second call is a no-op.
    /// On failure the driver stays uninitialized and refuses new sockets.
    pub fn initialize(&self) -> SocketResult<()> {
        let mut life = self.lifecycle()?;
        if life.state == LifecycleState::Initialized {
            return Ok(());
        }

        self.registry()?.clear();
        if let Err(e) = self.stack.initialize() {
            warn!("network stack failed to initialize: {e}");
            return Err(e.into());
        }

        life.state = LifecycleState::Initialized;
        life.generation = life.generation.wrapping_add(1);
        info!("socket layer initialized, {SOCKETS_MAX_COUNT} socket slots");
        Ok(())
    }

    /// Tear everything down, debug channels included.
    ///
    /// Only the stack's own result is reported; the earlier steps are best
    /// effort. Calling this while uninitialized is a successful no-op.
    pub fn uninitialize(&self) -> SocketResult<()> {
        let mut life = self.lifecycle()?;
        if life.state == LifecycleState::Uninitialized {
            return Ok(());
        }

        self.debugger.abort();
        if let Err(e) = self.close_connections(true) {
            warn!("closing sockets during shutdown failed: {e}");
        }
        self.secure.uninitialize();
        self.debugger.uninitialize();
        let result = self.stack.uninitialize();

        *life = Lifecycle {
            generation: life.generation,
            ..Lifecycle::default()
        };
        info!("socket layer uninitialized");
        result.map_err(Into::into)
    }

    /// Close every tracked socket. Debug channels survive unless
    /// `close_debug` is set. Returns the number of sockets closed.
    pub fn close_connections(&self, close_debug: bool) -> SocketResult<usize> {
        let mut secured: Vec<SocketHandle> = Vec::new();
        let mut pending = self.registry()?.secure_handles();
        loop {
            for handle in pending.iter() {
                debug!("shutting down secure session on {handle}");
                self.secure.close_socket(handle);
                secured.push(handle);
            }

            let mut registry = self.registry()?;
            let late = registry.secure_handles_excluding(&secured);
            if !late.is_empty() {
                debug!("{} secure sessions attached during teardown", late.len());
                pending = late;
                continue;
            }

            let closed = registry.sweep(close_debug, |handle| {
                if let Err(e) = self.stack.close(handle) {
                    warn!("closing {handle} failed: {e}");
                }
            });
            info!(
                "closed {closed} sockets ({} secure), {} kept",
                secured.len(),
                registry.len()
            );
            return Ok(closed);
        }
    }

    /// Drop application sockets on a runtime reset, keeping debug channels.
    pub fn soft_reset(&self) -> SocketResult<usize> {
        self.close_connections(false)
    }

    /// Start the discovery responder once per initialization.
    /// Returns `false` if it was already running.
    pub fn initialize_discovery(&self) -> SocketResult<bool> {
        let mut life = self.lifecycle()?;
        if life.state != LifecycleState::Initialized {
            return Err(SocketError::NotInitialized);
        }
        if life.discovery_initialized {
            return Ok(false);
        }
        self.stack.start_discovery()?;
        life.discovery_initialized = true;
        Ok(true)
    }

    pub fn state(&self) -> SocketResult<LifecycleState> {
        Ok(self.lifecycle()?.state)
    }

    pub fn wireless_applied(&self) -> SocketResult<bool> {
        Ok(self.lifecycle()?.wireless_applied)
    }

    pub fn discovery_initialized(&self) -> SocketResult<bool> {
        Ok(self.lifecycle()?.discovery_initialized)
    }

    pub fn socket_count(&self) -> SocketResult<usize> {
        Ok(self.registry()?.len())
    }

    pub fn tracked_sockets(&self) -> SocketResult<HandleList> {
        Ok(self.registry()?.handles())
    }

    pub fn entry(&self, socket: SocketHandle) -> SocketResult<Option<SocketEntry>> {
        Ok(self.registry()?.get(socket).copied())
    }

    // ---------------------------------------------------------------------
    // Secure-session association
    // ---------------------------------------------------------------------

    pub fn attach_secure_session(
        &self,
        socket: SocketHandle,
        session: SecureSessionId,
    ) -> SocketResult<()> {
        self.registry()?.attach_secure_session(socket, session)?;
        debug!("{socket} bound to secure session {}", session.0);
        Ok(())
    }

    pub fn detach_secure_session(
        &self,
        socket: SocketHandle,
    ) -> SocketResult<Option<SecureSessionId>> {
        Ok(self.registry()?.detach_secure_session(socket))
    }

    pub fn secure_session(&self, socket: SocketHandle) -> SocketResult<Option<SecureSessionId>> {
        Ok(self.registry()?.secure_session(socket))
    }

    // ---------------------------------------------------------------------
    // Socket facade
    // ---------------------------------------------------------------------

    fn track(&self, handle: SocketHandle, selectable: bool, is_debug: bool) -> SocketResult<()> {
        let result = self.registry()?.register(handle, selectable, is_debug);
        match result {
            Ok(()) => Ok(()),
            Err(RegistryError::Duplicate(h)) => {
                warn!("stack returned {h} which is already tracked");
                Ok(())
            }
            Err(RegistryError::Full { capacity }) => {
                if let Err(e) = self.stack.close(handle) {
                    warn!("closing untracked {handle} failed: {e}");
                }
                Err(SocketError::TooManySockets(capacity))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn current_session(&self) -> SocketResult<u64> {
        self.lifecycle()?.session().ok_or(SocketError::NotInitialized)
    }

    /// Register a handle the stack returned for initialization `session`.
    /// A handle that outlived its initialization is closed instead.
    fn adopt(
        &self,
        session: u64,
        handle: SocketHandle,
        selectable: bool,
        is_debug: bool,
    ) -> SocketResult<()> {
        let life = self.lifecycle()?;
        if life.session() != Some(session) {
            drop(life);
            debug!("{handle} opened across a shutdown, closing it");
            if let Err(e) = self.stack.close(handle) {
                warn!("closing stale {handle} failed: {e}");
            }
            return Err(SocketError::NotInitialized);
        }
        self.track(handle, selectable, is_debug)
    }

    fn open(
        &self,
        family: AddressFamily,
        ty: SocketType,
        protocol: Protocol,
        is_debug: bool,
    ) -> SocketResult<SocketHandle> {
        let session = self.current_session()?;
        let handle = self.stack.socket(family, ty, protocol)?;
        self.adopt(session, handle, protocol != Protocol::Tcp, is_debug)?;
        Ok(handle)
    }

    fn accept_tracked(
        &self,
        listener: SocketHandle,
        is_debug: bool,
    ) -> SocketResult<(SocketHandle, SocketAddr)> {
        let session = self.current_session()?;
        let (handle, peer) = self.stack.accept(listener)?;
        self.adopt(session, handle, true, is_debug)?;
        Ok((handle, peer))
    }

    pub fn socket(
        &self,
        family: AddressFamily,
        ty: SocketType,
        protocol: Protocol,
    ) -> SocketResult<SocketHandle> {
        self.open(family, ty, protocol, false)
    }

    /// Open a socket that survives [`SocketDriver::soft_reset`].
    pub fn debug_socket(
        &self,
        family: AddressFamily,
        ty: SocketType,
        protocol: Protocol,
    ) -> SocketResult<SocketHandle> {
        self.open(family, ty, protocol, true)
    }

    pub fn accept(&self, listener: SocketHandle) -> SocketResult<(SocketHandle, SocketAddr)> {
        self.accept_tracked(listener, false)
    }

    pub fn debug_accept(&self, listener: SocketHandle) -> SocketResult<(SocketHandle, SocketAddr)> {
        self.accept_tracked(listener, true)
    }

    pub fn close(&self, socket: SocketHandle) -> SocketResult<()> {
        self.registry()?.unregister(socket);
        self.stack.close(socket)?;
        Ok(())
    }

    pub fn bind(&self, socket: SocketHandle, addr: &SocketAddr) -> SocketResult<()> {
        Ok(self.stack.bind(socket, addr)?)
    }

    pub fn connect(&self, socket: SocketHandle, addr: &SocketAddr) -> SocketResult<()> {
        Ok(self.stack.connect(socket, addr)?)
    }

    pub fn listen(&self, socket: SocketHandle, backlog: i32) -> SocketResult<()> {
        Ok(self.stack.listen(socket, backlog)?)
    }

    pub fn send(&self, socket: SocketHandle, buf: &[u8], flags: i32) -> SocketResult<usize> {
        Ok(self.stack.send(socket, buf, flags)?)
    }

    pub fn recv(&self, socket: SocketHandle, buf: &mut [u8], flags: i32) -> SocketResult<usize> {
        Ok(self.stack.recv(socket, buf, flags)?)
    }

    pub fn send_to(
        &self,
        socket: SocketHandle,
        buf: &[u8],
        flags: i32,
        to: &SocketAddr,
    ) -> SocketResult<usize> {
        Ok(self.stack.send_to(socket, buf, flags, to)?)
    }

    pub fn recv_from(
        &self,
        socket: SocketHandle,
        buf: &mut [u8],
        flags: i32,
    ) -> SocketResult<(usize, SocketAddr)> {
        Ok(self.stack.recv_from(socket, buf, flags)?)
    }

    pub fn shutdown(&self, socket: SocketHandle, how: ShutdownHow) -> SocketResult<()> {
        Ok(self.stack.shutdown(socket, how)?)
    }

    pub fn get_addr_info(&self, node: &str, service: Option<&str>) -> SocketResult<Vec<SocketAddr>> {
        Ok(self.stack.get_addr_info(node, service)?)
    }

    pub fn ioctl(&self, socket: SocketHandle, cmd: IoctlCommand, arg: &mut u32) -> SocketResult<()> {
        Ok(self.stack.ioctl(socket, cmd, arg)?)
    }

    pub fn last_error(&self) -> i32 {
        self.stack.last_error()
    }

    pub fn select(&self, sets: SelectSets<'_>, timeout: Option<Duration>) -> SocketResult<usize> {
        Ok(self.stack.select(sets, timeout)?)
    }

    pub fn set_sock_opt(
        &self,
        socket: SocketHandle,
        level: i32,
        name: i32,
        value: &[u8],
    ) -> SocketResult<()> {
        Ok(self.stack.set_sock_opt(socket, level, name, value)?)
    }

    pub fn get_sock_opt(
        &self,
        socket: SocketHandle,
        level: i32,
        name: i32,
        value: &mut [u8],
    ) -> SocketResult<usize> {
        Ok(self.stack.get_sock_opt(socket, level, name, value)?)
    }

    pub fn get_peer_name(&self, socket: SocketHandle) -> SocketResult<SocketAddr> {
        Ok(self.stack.get_peer_name(socket)?)
    }

    pub fn get_sock_name(&self, socket: SocketHandle) -> SocketResult<SocketAddr> {
        Ok(self.stack.get_sock_name(socket)?)
    }

    // ---------------------------------------------------------------------
    // Adapter and wireless configuration
    // ---------------------------------------------------------------------

    /// Enumerate the configuration store.
    pub fn initialize_configuration(&self) -> SocketResult<usize> {
        Ok(self.config()?.initialize()?)
    }

    /// Run `f` against the configuration manager.
    pub fn with_configuration<R>(
        &self,
        f: impl FnOnce(&mut ConfigurationManager<B>) -> R,
    ) -> SocketResult<R> {
        let mut manager = self.config()?;
        Ok(f(&mut *manager))
    }

    pub fn adapter_count(&self) -> u32 {
        self.stack.adapter_count()
    }

    pub fn load_adapter_configuration(&self, index: u32) -> SocketResult<NetworkInterfaceConfig> {
        self.config()?.check_network_index(index)?;
        Ok(self.stack.load_adapter_configuration(index)?)
    }

    /// Apply a new adapter configuration.
    ///
    /// Updates that take the interface down detach the debug channel first.
    /// On success the configuration is saved; on failure the previously
    /// active one is re-applied and the stack error returned. The channel is
    /// re-attached only when the update brings the interface back up.
    pub fn update_adapter_configuration(
        &self,
        index: u32,
        flags: UpdateFlags,
        config: &NetworkInterfaceConfig,
    ) -> SocketResult<()> {
        let mut manager = self.config()?;
        manager.check_network_index(index)?;

        let previous = match manager.active_network(index) {
            Some(active) => Some(active.clone()),
            None => self.stack.load_adapter_configuration(index).ok(),
        };

        let detached = flags.intersects(UpdateFlags::UNINIT) && self.debugger.detach_channel();
        if detached {
            debug!("debug channel detached for adapter {index} update");
        }

        let outcome = match self.stack.update_adapter_configuration(index, flags, config) {
            Ok(()) => manager.save_network(index, config).map_err(SocketError::from),
            Err(e) => {
                warn!("adapter {index} update failed ({e}), restoring previous configuration");
                match &previous {
                    Some(prev) => {
                        if let Err(re) = self.stack.update_adapter_configuration(index, flags, prev)
                        {
                            warn!("restoring adapter {index} failed: {re}");
                        }
                    }
                    None => warn!("no previous configuration for adapter {index}"),
                }
                Err(e.into())
            }
        };

        if detached && flags.intersects(UpdateFlags::REINIT) {
            self.debugger.attach_channel();
        }
        outcome
    }

    /// Wireless settings for interface `index`. The first call loads every
    /// stored wireless block into memory. Settings reported by the stack take
    /// precedence over the stored ones.
    pub fn load_wireless_configuration(&self, index: u32) -> SocketResult<WirelessInterfaceConfig> {
        let mut life = self.lifecycle()?;
        let mut manager = self.config()?;
        manager.check_wireless_index(index)?;
        if !life.wireless_applied {
            manager.apply_wireless();
            life.wireless_applied = true;
        }
        match self.stack.load_wireless_configuration(index) {
            Ok(Some(live)) => return Ok(live),
            Ok(None) => {}
            Err(e) => debug!("stack has no wireless settings for {index}: {e}"),
        }
        Ok(manager.wireless(index)?.clone())
    }

    /// Replace the in-memory wireless settings; see
    /// [`SocketDriver::save_all_wireless_configurations`].
    pub fn update_wireless_configuration(
        &self,
        index: u32,
        config: &WirelessInterfaceConfig,
    ) -> SocketResult<()> {
        Ok(self.config()?.set_wireless(index, config)?)
    }

    pub fn save_all_wireless_configurations(&self) -> SocketResult<()> {
        Ok(self.config()?.save_all_wireless()?)
    }
}
