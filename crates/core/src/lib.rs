//! Configurable virtual processing unit core.
//!
//! This crate implements a VPU whose behavior is driven entirely by a typed,
//! validated configuration store:
//! 1. **Schema:** An immutable registry of parameter definitions, defaults,
//!    and validation rules.
//! 2. **Store:** A mutable key/value store where validation gates every write.
//! 3. **Architecture:** A derived snapshot with cross-field legality rules
//!    (mode exclusivity, FPU/SIMD generation pairing, segmentation).
//! 4. **Execution:** A paced fetch-execute loop on a supervised background
//!    thread, observed through a bounded output-event channel.
//!
//! Front-ends (shells, TUIs, persistence) stay outside the core: they hand
//! serialized parameter text in and drain the event stream out.

/// Derived architecture state and legality validation.
pub mod arch;
/// Output events emitted by the execution engine.
pub mod event;
/// Parameter schema registry (definitions, defaults, validation rules).
pub mod schema;
/// Execution statistics counters.
pub mod stats;
/// Validated configuration store and the persisted line format.
pub mod store;
/// The execution engine and its fetch-execute loop.
pub mod vpu;

/// Architecture snapshot consumed by the engine.
pub use crate::arch::{ArchError, ArchState};
/// The engine's output-event type.
pub use crate::event::VpuEvent;
/// The shared parameter registry; obtain with `Schema::global()`.
pub use crate::schema::Schema;
/// Validated parameter store; construct with `ConfigStore::new()`.
pub use crate::store::{ConfigError, ConfigStore};
/// The execution engine; construct with `Vpu::new`.
pub use crate::vpu::Vpu;
