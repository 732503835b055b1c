//! Derived architecture state and cross-field legality rules.
//!
//! This module turns the flat configuration store into the read-only snapshot
//! the execution engine consumes. It provides:
//! 1. **Derivation:** [`ArchState::derive`] reads and parses every
//!    architecture-related parameter in one pass.
//! 2. **Legality:** [`ArchState::validate`] enforces the rules no single
//!    parameter rule can express (mode exclusivity, FPU/SIMD pairing).
//! 3. **Segmentation:** Segment registers exist only for the byte-oriented
//!    legacy family and are zero-initialized at derivation.

use serde::Serialize;
use thiserror::Error;

use crate::schema::params;
use crate::store::{ConfigError, ConfigStore};

/// Cross-field legality violations.
///
/// Each variant names the rule that failed; the engine folds these into the
/// output-event channel rather than propagating them as a distinct error
/// path out of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchError {
    /// The earliest legacy CPUs predate protected mode entirely.
    #[error("{0} does not support protected mode")]
    ProtectedModeUnsupported(String),

    /// Real mode and protected mode are mutually exclusive.
    #[error("real mode and protected mode cannot both be enabled")]
    ModeConflict,

    /// Each legacy generation accepts only its contemporaneous FPU model.
    #[error("{arch} cannot pair with FPU {fpu}")]
    FpuMismatch {
        /// The configured architecture id.
        arch: String,
        /// The incompatible FPU type.
        fpu: String,
    },

    /// Only the SIMD-capable architecture id may enable SIMD.
    #[error("{0} does not support SIMD instruction sets")]
    SimdUnsupported(String),
}

/// Segment register slots for the byte-oriented legacy family.
///
/// All zero at derivation; populated by segmented execution, which this
/// engine does not model beyond holding the slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentRegisters {
    /// Code segment.
    pub cs: u16,
    /// Data segment.
    pub ds: u16,
    /// Extra segment.
    pub es: u16,
    /// F segment.
    pub fs: u16,
    /// G segment.
    pub gs: u16,
    /// Stack segment.
    pub ss: u16,
}

/// Immutable architecture snapshot derived from a configuration store.
///
/// Recomputed only by re-running [`ArchState::derive`]; never partially
/// mutated. Serializable so front-ends can export it as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchState {
    /// Configured architecture id (e.g. `"RISC-V-32"`, `"80386"`).
    pub architecture: String,
    /// x86 real mode enabled.
    pub real_mode: bool,
    /// x86 protected mode enabled.
    pub protected_mode: bool,
    /// Segmentation enabled.
    pub segmentation: bool,
    /// Floating-point unit type, `"none"` when absent.
    pub fpu_type: String,
    /// Memory management unit type.
    pub mmu_type: String,
    /// SIMD instruction-set level, `"none"` when absent.
    pub simd_support: String,
    /// Hardware virtualization enabled.
    pub virtualization: bool,
    /// Clock multiplier, 1-100.
    pub clock_multiplier: u32,
    /// Memory wait states, 0-7.
    pub wait_states: u32,
    /// Segment register slots; `Some` only for the legacy family.
    pub segments: Option<SegmentRegisters>,
}

impl ArchState {
    /// Derives a snapshot from the store.
    ///
    /// Numeric fields have already passed their schema rules, so parse
    /// failures here indicate a missing parameter rather than a bad value.
    pub fn derive(store: &ConfigStore) -> Result<Self, ConfigError> {
        let architecture = store.get(params::ARCHITECTURE)?;
        let segments = is_legacy_family(&architecture).then(SegmentRegisters::default);
        Ok(Self {
            real_mode: store.get_flag(params::X86_REAL_MODE)?,
            protected_mode: store.get_flag(params::X86_PROTECTED_MODE)?,
            segmentation: store.get_flag(params::SEGMENT_REGISTERS)?,
            fpu_type: store.get(params::FPU_TYPE)?,
            mmu_type: store.get(params::MMU_TYPE)?,
            simd_support: store.get(params::SIMD_SUPPORT)?,
            virtualization: store.get_flag(params::VIRTUALIZATION_SUPPORT)?,
            clock_multiplier: store.get_unsigned(params::CLOCK_MULTIPLIER)? as u32,
            wait_states: store.get_unsigned(params::WAIT_STATES)? as u32,
            architecture,
            segments,
        })
    }

    /// Checks the cross-field legality rules.
    ///
    /// All rules must hold; the first violation found is reported, and any
    /// single violation fails initialization as a whole.
    pub fn validate(&self) -> Result<(), ArchError> {
        if (self.architecture == "8086" || self.architecture == "80186") && self.protected_mode {
            return Err(ArchError::ProtectedModeUnsupported(
                self.architecture.clone(),
            ));
        }
        if self.real_mode && self.protected_mode {
            return Err(ArchError::ModeConflict);
        }
        if self.fpu_type != "none" {
            let expected = match self.architecture.as_str() {
                "8086" => Some("8087"),
                "80286" => Some("80287"),
                "80386" => Some("80387"),
                _ => None,
            };
            if let Some(expected) = expected {
                if self.fpu_type != expected {
                    return Err(ArchError::FpuMismatch {
                        arch: self.architecture.clone(),
                        fpu: self.fpu_type.clone(),
                    });
                }
            }
        }
        if self.simd_support != "none" && self.architecture != "Pentium" {
            return Err(ArchError::SimdUnsupported(self.architecture.clone()));
        }
        Ok(())
    }
}

/// Whether an architecture id belongs to the byte-oriented legacy family
/// that carries segment registers.
pub fn is_legacy_family(architecture: &str) -> bool {
    architecture.starts_with("80") || architecture == "Pentium"
}
