//! # Unit Components
//!
//! Central hub for the unit test modules of the VPU core.

/// Unit tests for the architecture snapshot and legality rules.
///
/// Verifies derivation from the configuration store, segment register
/// initialization for the legacy family, and the four cross-field rules.
pub mod arch;


/// Unit tests for the configuration store.
///
/// Verifies validated writes, the strict accessor, and the persisted
/// `name = value` line format including its abort-on-error contract.
pub mod store;
