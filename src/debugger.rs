// CLASSIFICATION: COMMUNITY
// Filename: debugger.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Hooks into the debugger / diagnostic transport.
//!
//! Targets without a debugger over sockets use [`NoDebugger`]; every hook has
//! a no-op default so an implementation only overrides what it needs.

pub trait DebuggerHooks: Send + Sync {
    /// Abort in-flight debugger operations before sockets are torn down.
    fn abort(&self) {}

    /// Release debugger resources once all sockets are closed.
    fn uninitialize(&self) {}

    /// Drop the debug channel ahead of an adapter reconfiguration.
    /// Returns `true` if a channel was live and has been detached.
    fn detach_channel(&self) -> bool {
        false
    }

    /// Bring the debug channel back after a reconfiguration.
    fn attach_channel(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDebugger;

impl DebuggerHooks for NoDebugger {}
