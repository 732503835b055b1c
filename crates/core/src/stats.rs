//! Execution statistics collection.
//!
//! Tracks what the fetch-execute loop can observe about its own progress.
//! Counters reset on every successful `initialize` and are snapshotted on
//! demand, so a front-end can poll them while the engine runs.

use serde::Serialize;

/// Counters accumulated by the fetch-execute loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecStats {
    /// Instruction words fetched and classified.
    pub instructions_executed: u64,
    /// Words matching the no-op encoding.
    pub nops: u64,
    /// System-call traps taken (at most one per run).
    pub syscalls: u64,
}

impl ExecStats {
    /// Resets all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
