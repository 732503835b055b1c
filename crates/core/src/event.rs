//! Output events emitted by the execution engine.
//!
//! Events are the engine's only cross-boundary channel: the worker thread
//! pushes them into a bounded queue and the subscriber drains them at its
//! own pace. Delivery is best-effort: observability must never be able to
//! stall execution or re-enter the engine.

use std::fmt;

/// A single observable occurrence inside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VpuEvent {
    /// The engine transitioned to running.
    Started,

    /// The engine transitioned to stopped, either by request or by
    /// self-termination of the fetch-execute loop.
    Stopped,

    /// Architecture state was derived and accepted during initialization.
    ArchitectureInitialized {
        /// The configured architecture id.
        architecture: String,
        /// Real mode active.
        real_mode: bool,
        /// Protected mode active.
        protected_mode: bool,
    },

    /// Initialization failed; the engine stays stopped.
    ///
    /// The payload is the human-readable reason (missing parameter,
    /// legality violation).
    InitFailed(String),

    /// The loop executed the no-op encoding.
    Nop {
        /// Program counter of the instruction.
        pc: u32,
    },

    /// The loop hit the system-call trap and is halting.
    SystemCall {
        /// Program counter of the instruction.
        pc: u32,
    },

    /// A configuration write was rejected because the engine is running.
    ConfigRejected {
        /// The parameter whose write was refused.
        name: String,
    },
}

impl fmt::Display for VpuEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "VPU started"),
            Self::Stopped => write!(f, "VPU stopped"),
            Self::ArchitectureInitialized {
                architecture,
                real_mode,
                protected_mode,
            } => {
                write!(f, "Initialized {architecture} architecture")?;
                if *real_mode {
                    write!(f, " (real mode)")?;
                }
                if *protected_mode {
                    write!(f, " (protected mode)")?;
                }
                Ok(())
            }
            Self::InitFailed(reason) => write!(f, "VPU initialization failed: {reason}"),
            Self::Nop { pc } => write!(f, "Executing NOP at {pc:#06x}"),
            Self::SystemCall { pc } => write!(f, "System call executed at {pc:#06x}"),
            Self::ConfigRejected { name } => {
                write!(f, "Cannot modify {name} while VPU is running")
            }
        }
    }
}
