// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.1
// Date Modified: 2026-10-18
// Author: Lukas Bower

//! Platform socket layer.
//!
//! Exposes a POSIX-style socket API on top of a target network stack while
//! tracking every handle it hands out, so the runtime can tear all sockets
//! down on reset without losing its debugger link. Also persists network and
//! wireless adapter settings as fixed-size configuration blocks.

include!(concat!(env!("OUT_DIR"), "/limits.rs"));

/// Shared socket vocabulary (handles, families, fd sets)
pub mod types;

/// Fixed-capacity socket registry and bulk teardown
pub mod registry;

/// Collaborator interfaces: network stack, secure sessions, debugger
pub mod debugger;
pub mod secure;
pub mod stack;

/// Lifecycle controller and socket facade
pub mod driver;

/// Network / wireless configuration blocks and their stores
pub mod config;

/// Runtime settings loaded from TOML
pub mod settings;

pub use driver::{LifecycleState, SocketDriver, SocketError, SocketResult};
pub use registry::{RegistryError, SocketEntry, SocketFlags, SocketRegistry};
pub use types::{SecureSessionId, SocketHandle};
