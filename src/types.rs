// CLASSIFICATION: COMMUNITY
// Filename: types.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Socket vocabulary shared by the registry, the stack adapter and the facade.

use core::fmt;

/// Opaque socket identifier handed out by the underlying network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(pub i32);

impl SocketHandle {
    /// Sentinel marking an empty registry slot or a failed stack call.
    pub const INVALID: SocketHandle = SocketHandle(-1);

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock#{}", self.0)
    }
}

/// Association id owned by the secure-session layer.
///
/// The registry only remembers which handle a session belongs to; the
/// session state itself lives in the secure layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecureSessionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Stream,
    Datagram,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ip,
    Tcp,
    Udp,
    Icmp,
}

/// Direction argument for `shutdown`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownHow {
    Read = 0,
    Write = 1,
    ReadWrite = 2,
}

impl TryFrom<i32> for ShutdownHow {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShutdownHow::Read),
            1 => Ok(ShutdownHow::Write),
            2 => Ok(ShutdownHow::ReadWrite),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlCommand {
    /// Toggle non-blocking mode; argument is 0 or 1.
    NonBlocking,
    /// Bytes available to read; result written to the argument.
    BytesAvailable,
}

/// Number of handles an [`FdSet`] can describe.
pub const FD_SET_SIZE: usize = 64;

/// Readiness bitset passed through to the stack's `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FdSet {
    bits: u64,
}

impl FdSet {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    fn bit(handle: SocketHandle) -> Option<u64> {
        let idx = usize::try_from(handle.raw()).ok()?;
        (idx < FD_SET_SIZE).then(|| 1u64 << idx)
    }

    /// Mark `handle`; returns `false` when it cannot be represented.
    pub fn set(&mut self, handle: SocketHandle) -> bool {
        match Self::bit(handle) {
            Some(b) => {
                self.bits |= b;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, handle: SocketHandle) {
        if let Some(b) = Self::bit(handle) {
            self.bits &= !b;
        }
    }

    pub fn is_set(&self, handle: SocketHandle) -> bool {
        Self::bit(handle).map_or(false, |b| self.bits & b != 0)
    }

    pub fn zero(&mut self) {
        self.bits = 0;
    }

    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }
}
