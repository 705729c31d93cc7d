// CLASSIFICATION: COMMUNITY
// Filename: secure.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Secure-session layer hooks used during teardown.

use crate::types::SocketHandle;

/// Secure transport sitting on top of tracked sockets.
///
/// `close_socket` runs the protocol-level shutdown for one handle. It is
/// called with no registry lock held, so implementations may close the raw
/// socket through [`crate::driver::SocketDriver::close`] themselves.
pub trait SecureLayer: Send + Sync {
    fn close_socket(&self, socket: SocketHandle);
    fn uninitialize(&self);
}

/// Build without a secure transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSecureLayer;

impl SecureLayer for NoSecureLayer {
    fn close_socket(&self, _socket: SocketHandle) {}
    fn uninitialize(&self) {}
}
