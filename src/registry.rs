// CLASSIFICATION: COMMUNITY
// Filename: registry.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Fixed-capacity table of every socket handle opened through this layer.
//!
//! Occupied entries always form the prefix `entries[..count]`; every slot at
//! or past `count` holds [`SocketEntry::EMPTY`]. Removal swaps the last
//! occupied entry into the vacated slot so it stays O(1), and iteration only
//! ever scans the prefix. The table lives in a plain array and never touches
//! the heap.
//!
//! The table itself is not synchronised. [`crate::driver::SocketDriver`]
//! keeps it behind a single mutex and is the only owner in production code.

use bitflags::bitflags;
use log::{debug, warn};
use thiserror::Error;

use crate::types::{SecureSessionId, SocketHandle};
use crate::SOCKETS_MAX_COUNT;

bitflags! {
    /// Per-socket metadata bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SocketFlags: u32 {
        /// Socket survives a non-full teardown (debugger / maintenance link).
        const DEBUG_CHANNEL = 0x0000_0001;
    }
}

/// One tracked socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketEntry {
    pub handle: SocketHandle,
    pub flags: SocketFlags,
    pub secure_session: Option<SecureSessionId>,
}

impl SocketEntry {
    pub const EMPTY: SocketEntry = SocketEntry {
        handle: SocketHandle::INVALID,
        flags: SocketFlags::empty(),
        secure_session: None,
    };

    pub fn is_empty(&self) -> bool {
        !self.handle.is_valid()
    }

    pub fn is_debug_channel(&self) -> bool {
        self.flags.contains(SocketFlags::DEBUG_CHANNEL)
    }
}

impl Default for SocketEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Errors returned by [`SocketRegistry`] mutations. The table is left
/// untouched whenever one of these is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("cannot register the invalid socket handle")]
    InvalidHandle,
    #[error("socket registry full ({capacity} entries)")]
    Full { capacity: usize },
    #[error("{0} is already registered")]
    Duplicate(SocketHandle),
    #[error("{0} is not registered")]
    NotTracked(SocketHandle),
}

/// Handles collected from the table without allocating.
#[derive(Debug, Clone, Copy)]
pub struct HandleList<const CAP: usize = SOCKETS_MAX_COUNT> {
    handles: [SocketHandle; CAP],
    len: usize,
}

impl<const CAP: usize> HandleList<CAP> {
    const fn new() -> Self {
        Self {
            handles: [SocketHandle::INVALID; CAP],
            len: 0,
        }
    }

    fn push(&mut self, handle: SocketHandle) {
        if self.len < CAP {
            self.handles[self.len] = handle;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[SocketHandle] {
        &self.handles[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = SocketHandle> + '_ {
        self.as_slice().iter().copied()
    }
}

/// Densely packed socket table with compile-time capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketRegistry<const CAP: usize = SOCKETS_MAX_COUNT> {
    entries: [SocketEntry; CAP],
    count: usize,
}

impl<const CAP: usize> Default for SocketRegistry<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> SocketRegistry<CAP> {
    /// Maximum number of sockets tracked at once.
    pub const CAPACITY: usize = CAP;

    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: [SocketEntry::EMPTY; CAP],
            count: 0,
        }
    }

    /// Reset every slot to the sentinel and drop the count to zero.
    pub fn clear(&mut self) {
        self.entries = [SocketEntry::EMPTY; CAP];
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= CAP
    }

    /// The occupied prefix of the table.
    pub fn entries(&self) -> &[SocketEntry] {
        &self.entries[..self.count]
    }

    /// Every slot, including the empty tail.
    pub fn slots(&self) -> &[SocketEntry] {
        &self.entries
    }

    fn position(&self, handle: SocketHandle) -> Option<usize> {
        self.entries().iter().position(|e| e.handle == handle)
    }

    pub fn contains(&self, handle: SocketHandle) -> bool {
        handle.is_valid() && self.position(handle).is_some()
    }

    pub fn get(&self, handle: SocketHandle) -> Option<&SocketEntry> {
        if !handle.is_valid() {
            return None;
        }
        self.position(handle).map(|i| &self.entries[i])
    }

    /// Start tracking a handle returned by a successful create or accept.
    ///
    /// `selectable` is accepted for call-site parity with the stack's
    /// readiness API; the table does not record it.
    pub fn register(
        &mut self,
        handle: SocketHandle,
        selectable: bool,
        is_debug: bool,
    ) -> Result<(), RegistryError> {
        if !handle.is_valid() {
            return Err(RegistryError::InvalidHandle);
        }
        if self.position(handle).is_some() {
            return Err(RegistryError::Duplicate(handle));
        }
        if self.is_full() {
            warn!("socket registry full, {handle} not tracked");
            return Err(RegistryError::Full { capacity: CAP });
        }

        let mut flags = SocketFlags::empty();
        if is_debug {
            flags |= SocketFlags::DEBUG_CHANNEL;
        }
        self.entries[self.count] = SocketEntry {
            handle,
            flags,
            secure_session: None,
        };
        self.count += 1;
        debug!(
            "registered {handle} (selectable={selectable}, debug={is_debug}), {} tracked",
            self.count
        );
        Ok(())
    }

    /// Stop tracking `handle`. Returns `false` if it was never tracked; that
    /// case leaves the table unchanged so double closes are harmless.
    pub fn unregister(&mut self, handle: SocketHandle) -> bool {
        if !handle.is_valid() {
            return false;
        }
        let Some(index) = self.position(handle) else {
            return false;
        };

        self.count -= 1;
        if index != self.count {
            self.entries[index] = self.entries[self.count];
        }
        self.entries[self.count] = SocketEntry::EMPTY;
        debug!("unregistered {handle}, {} tracked", self.count);
        true
    }

    /// Bind a secure-session context to an already tracked handle.
    pub fn attach_secure_session(
        &mut self,
        handle: SocketHandle,
        session: SecureSessionId,
    ) -> Result<(), RegistryError> {
        let index = self
            .position(handle)
            .ok_or(RegistryError::NotTracked(handle))?;
        self.entries[index].secure_session = Some(session);
        Ok(())
    }

    /// Drop the secure-session association, returning it if present.
    pub fn detach_secure_session(&mut self, handle: SocketHandle) -> Option<SecureSessionId> {
        if !handle.is_valid() {
            return None;
        }
        let index = self.position(handle)?;
        self.entries[index].secure_session.take()
    }

    pub fn secure_session(&self, handle: SocketHandle) -> Option<SecureSessionId> {
        self.get(handle).and_then(|e| e.secure_session)
    }

    /// Handles of all secure sockets, highest index first.
    ///
    /// First pass of a bulk teardown. The caller closes each session with no
    /// lock held so the secure layer may call back into the socket layer.
    pub fn secure_handles(&self) -> HandleList<CAP> {
        self.secure_handles_excluding(&[])
    }

    /// Like [`SocketRegistry::secure_handles`], leaving out `seen`.
    pub fn secure_handles_excluding(&self, seen: &[SocketHandle]) -> HandleList<CAP> {
        let mut list = HandleList::new();
        for entry in self.entries().iter().rev() {
            if !entry.is_empty() && entry.secure_session.is_some() && !seen.contains(&entry.handle)
            {
                list.push(entry.handle);
            }
        }
        list
    }

    /// Handles of every tracked socket in table order.
    pub fn handles(&self) -> HandleList<CAP> {
        let mut list = HandleList::new();
        for entry in self.entries() {
            list.push(entry.handle);
        }
        list
    }

    /// Second pass of a bulk teardown.
    ///
    /// Every entry that is not a preserved debug channel is handed to
    /// `close_raw` and cleared in place. Preserved entries are packed toward
    /// the front behind a separate write cursor so the occupied prefix is
    /// dense again afterwards. Returns the number of sockets closed.
    pub fn sweep<F>(&mut self, close_debug: bool, mut close_raw: F) -> usize
    where
        F: FnMut(SocketHandle),
    {
        let scanned = self.count;
        let mut keep = 0;
        let mut closed = 0;

        for i in 0..scanned {
            let entry = self.entries[i];
            if entry.is_empty() {
                continue;
            }

            if close_debug || !entry.is_debug_channel() {
                close_raw(entry.handle);
                self.entries[i] = SocketEntry::EMPTY;
                self.count -= 1;
                closed += 1;
            } else {
                if i != keep {
                    self.entries[keep] = entry;
                    self.entries[i] = SocketEntry::EMPTY;
                }
                keep += 1;
            }
        }

        debug_assert_eq!(self.count, keep);
        debug!("sweep closed {closed} sockets, kept {keep}");
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Small = SocketRegistry<4>;

    fn h(n: i32) -> SocketHandle {
        SocketHandle(n)
    }

    fn assert_packed<const CAP: usize>(reg: &SocketRegistry<CAP>) {
        let (head, tail) = reg.slots().split_at(reg.len());
        assert!(head.iter().all(|e| !e.is_empty()));
        assert!(tail.iter().all(|e| *e == SocketEntry::EMPTY));
    }

    #[test]
    fn capacity_overflow_leaves_table_untouched() {
        let mut reg = Small::new();
        for n in 1..=4 {
            reg.register(h(n), true, false).unwrap();
        }
        let before = reg.clone();
        assert_eq!(
            reg.register(h(5), true, false),
            Err(RegistryError::Full { capacity: 4 })
        );
        assert_eq!(reg, before);
        assert_eq!(reg.len(), Small::CAPACITY);
    }

    #[test]
    fn rejects_invalid_and_duplicate_handles() {
        let mut reg = Small::new();
        assert_eq!(
            reg.register(SocketHandle::INVALID, false, false),
            Err(RegistryError::InvalidHandle)
        );
        reg.register(h(7), false, false).unwrap();
        assert_eq!(
            reg.register(h(7), false, true),
            Err(RegistryError::Duplicate(h(7)))
        );
        assert_eq!(reg.len(), 1);
        assert!(!reg.get(h(7)).unwrap().is_debug_channel());
    }

    #[test]
    fn unregister_swaps_last_into_hole() {
        let mut reg = Small::new();
        for n in 1..=4 {
            reg.register(h(n), true, n == 2).unwrap();
        }
        assert!(reg.unregister(h(1)));
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.entries()[0].handle, h(4));
        assert_packed(&reg);

        assert!(reg.unregister(h(3)));
        assert!(reg.unregister(h(4)));
        assert_eq!(reg.entries().len(), 1);
        assert!(reg.entries()[0].is_debug_channel());
        assert_packed(&reg);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut reg = Small::new();
        reg.register(h(1), true, false).unwrap();
        reg.register(h(2), true, true).unwrap();
        let before = reg.clone();
        assert!(!reg.unregister(h(9)));
        assert!(!reg.unregister(SocketHandle::INVALID));
        assert_eq!(reg, before);

        assert!(reg.unregister(h(1)));
        let after_first = reg.clone();
        assert!(!reg.unregister(h(1)));
        assert_eq!(reg, after_first);
    }

    #[test]
    fn register_then_unregister_restores_state() {
        let mut reg = Small::new();
        reg.register(h(10), true, true).unwrap();
        reg.register(h(11), false, false).unwrap();
        let before = reg.clone();
        reg.register(h(12), true, false).unwrap();
        assert!(reg.unregister(h(12)));
        assert_eq!(reg, before);
    }

    #[test]
    fn sweep_keeps_debug_channels_packed() {
        let mut reg = Small::new();
        reg.register(h(1), true, true).unwrap();
        reg.register(h(2), true, false).unwrap();
        reg.register(h(3), true, true).unwrap();
        reg.register(h(4), true, false).unwrap();

        let mut closed = Vec::new();
        assert_eq!(reg.sweep(false, |s| closed.push(s)), 2);
        assert_eq!(closed, vec![h(2), h(4)]);
        assert_eq!(reg.len(), 2);
        assert_packed(&reg);
        let mut kept: Vec<_> = reg.entries().iter().map(|e| e.handle).collect();
        kept.sort();
        assert_eq!(kept, vec![h(1), h(3)]);

        closed.clear();
        assert_eq!(reg.sweep(true, |s| closed.push(s)), 2);
        assert!(reg.is_empty());
        assert_packed(&reg);
    }

    #[test]
    fn sweep_moves_late_debug_channel_to_front() {
        let mut reg = Small::new();
        reg.register(h(1), true, false).unwrap();
        reg.register(h(2), true, false).unwrap();
        reg.register(h(3), true, true).unwrap();
        reg.sweep(false, |_| {});
        assert_eq!(reg.entries().len(), 1);
        assert_eq!(reg.entries()[0].handle, h(3));
        assert_packed(&reg);
    }

    #[test]
    fn secure_handles_are_reverse_ordered() {
        let mut reg = Small::new();
        for n in 1..=3 {
            reg.register(h(n), true, false).unwrap();
        }
        reg.attach_secure_session(h(1), SecureSessionId(100)).unwrap();
        reg.attach_secure_session(h(3), SecureSessionId(300)).unwrap();
        assert_eq!(reg.secure_handles().as_slice(), &[h(3), h(1)]);
        assert_eq!(reg.secure_session(h(3)), Some(SecureSessionId(300)));
        assert_eq!(
            reg.attach_secure_session(h(8), SecureSessionId(1)),
            Err(RegistryError::NotTracked(h(8)))
        );
        assert_eq!(reg.detach_secure_session(h(1)), Some(SecureSessionId(100)));
        assert_eq!(reg.secure_handles().len(), 1);
    }

    #[test]
    fn secure_handles_skip_already_closed() {
        let mut reg = Small::new();
        for n in 1..=4 {
            reg.register(h(n), true, false).unwrap();
        }
        reg.attach_secure_session(h(2), SecureSessionId(2)).unwrap();
        let first = reg.secure_handles();
        assert_eq!(first.as_slice(), &[h(2)]);

        reg.attach_secure_session(h(4), SecureSessionId(4)).unwrap();
        assert_eq!(reg.secure_handles_excluding(first.as_slice()).as_slice(), &[h(4)]);
        assert!(reg.secure_handles_excluding(&[h(2), h(4)]).is_empty());
    }
}
