//! The virtual processing unit and its fetch-execute loop.
//!
//! This module owns the whole execution side of the core. It provides:
//! 1. **Lifecycle:** `Created → Initialized → Running → Stopped`, with
//!    idempotent stop and a supervised worker thread joined on drop.
//! 2. **Execution:** A paced fetch-execute loop over big-endian instruction
//!    words, distinguishing the no-op encoding and the system-call trap.
//! 3. **Isolation:** The engine exclusively owns its configuration store and
//!    memory; the bounded event channel is the only cross-boundary surface.
//!
//! The worker thread shares only the execution core (behind a mutex) and the
//! running flag. The loop never holds the lock across its pacing sleep, so
//! foreground observers get a bounded wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::arch::ArchState;
use crate::event::VpuEvent;
use crate::schema::params;
use crate::stats::ExecStats;
use crate::store::ConfigStore;

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 32;

/// Size of one instruction word in bytes.
pub const INSTRUCTION_BYTES: u32 = 4;

/// The reserved no-op instruction encoding.
pub const NOP_ENCODING: u32 = 0x0000_0013;

/// Mask selecting the low seven opcode bits of an instruction word.
pub const OPCODE_MASK: u32 = 0x7F;

/// Opcode bits of the system-call trap.
pub const SYSCALL_OPCODE: u32 = 0x73;

/// Default pacing delay between loop iterations.
const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Depth of the bounded output-event queue.
///
/// Events beyond this are dropped rather than blocking the worker; the
/// channel is observability, not control flow.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Bootstrap image seeded at address zero: two no-ops, a register write,
/// and the system-call trap that ends the run.
const BOOT_IMAGE: [u8; 16] = [
    0x00, 0x00, 0x00, 0x13, // nop
    0x00, 0x00, 0x00, 0x13, // nop
    0x00, 0x10, 0x08, 0x93, // addi x17, x0, 1
    0x00, 0x00, 0x00, 0x73, // ecall
];

/// Outcome of a single fetch-execute step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// An unclassified word was fetched; the counter advanced.
    Advanced,
    /// The no-op encoding at the given program counter.
    Nop(u32),
    /// The system-call trap at the given program counter; the loop halts.
    SystemCall(u32),
    /// The next fetch would read past the end of memory; the loop halts.
    OutOfBounds,
}

/// Execution state shared between the engine and its worker thread.
#[derive(Debug)]
struct Core {
    /// General register file, all zero at construction.
    registers: [u32; NUM_REGISTERS],
    /// Byte-addressable memory, sized from configuration.
    memory: Vec<u8>,
    /// Program counter, a word-aligned offset into memory.
    pc: u32,
    /// Counters accumulated by the loop.
    stats: ExecStats,
}

impl Core {
    fn new() -> Self {
        Self {
            registers: [0; NUM_REGISTERS],
            memory: Vec::new(),
            pc: 0,
            stats: ExecStats::default(),
        }
    }

    /// Executes one fetch-execute iteration.
    ///
    /// The program counter advances by one word regardless of which branch
    /// classified the instruction, matching the reference loop.
    fn step(&mut self) -> Step {
        let pc = self.pc;
        let at = pc as usize;
        if at + INSTRUCTION_BYTES as usize > self.memory.len() {
            return Step::OutOfBounds;
        }
        let word = u32::from_be_bytes([
            self.memory[at],
            self.memory[at + 1],
            self.memory[at + 2],
            self.memory[at + 3],
        ]);
        self.pc = pc.wrapping_add(INSTRUCTION_BYTES);
        self.stats.instructions_executed += 1;

        if word == NOP_ENCODING {
            self.stats.nops += 1;
            Step::Nop(pc)
        } else if word & OPCODE_MASK == SYSCALL_OPCODE {
            self.stats.syscalls += 1;
            Step::SystemCall(pc)
        } else {
            Step::Advanced
        }
    }
}

/// The configurable virtual processing unit.
///
/// Owns its [`ConfigStore`] by value, a register file, a memory buffer, and
/// the derived [`ArchState`]. Configuration can only change while stopped;
/// the running flag gates every mutating entry point.
#[derive(Debug)]
pub struct Vpu {
    config: ConfigStore,
    core: Arc<Mutex<Core>>,
    arch: Option<ArchState>,
    running: Arc<AtomicBool>,
    initialized: bool,
    pacing: Duration,
    events: SyncSender<VpuEvent>,
    receiver: Option<Receiver<VpuEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl Vpu {
    /// Creates an engine around a configuration store.
    ///
    /// The engine starts in the `Created` state; [`Vpu::initialize`] must
    /// succeed before [`Vpu::start`].
    pub fn new(config: ConfigStore) -> Self {
        let (events, receiver) = sync_channel(EVENT_QUEUE_DEPTH);
        Self {
            config,
            core: Arc::new(Mutex::new(Core::new())),
            arch: None,
            running: Arc::new(AtomicBool::new(false)),
            initialized: false,
            pacing: DEFAULT_PACING,
            events,
            receiver: Some(receiver),
            worker: None,
        }
    }

    /// Takes the output-event receiver.
    ///
    /// There is one consumer per engine; subsequent calls return `None`.
    /// The receiver tolerates being fed from the worker thread and must not
    /// be drained by code that re-enters the engine's mutating operations.
    pub fn subscribe(&mut self) -> Option<Receiver<VpuEvent>> {
        self.receiver.take()
    }

    /// Initializes memory, registers, and architecture state from the store.
    ///
    /// Valid from `Created` or `Stopped`. Reads `MEMORY_SIZE` and
    /// `START_ADDRESS`, allocates zeroed memory, seeds the bootstrap image
    /// at address zero (when `BIOS_ENABLE` is set), then derives and
    /// validates the architecture snapshot. With `BIOS_ENABLE` false the
    /// memory stays all zeroes, so a run walks unclassified zero words to
    /// the end of memory instead of the bootstrap sequence. Any failure
    /// (including an allocation the host cannot satisfy) emits
    /// [`VpuEvent::InitFailed`] and returns `false` with the engine still
    /// stopped.
    pub fn initialize(&mut self) -> bool {
        if self.running.load(Ordering::Acquire) {
            warn!("initialize refused: engine is running");
            return false;
        }

        let memory_size = match self.config.get_unsigned(params::MEMORY_SIZE) {
            Ok(size) => size,
            Err(err) => return self.fail_init(&err.to_string()),
        };
        let start_address = match self.config.get_hex(params::START_ADDRESS) {
            Ok(addr) => addr,
            Err(err) => return self.fail_init(&err.to_string()),
        };
        let bios_enabled = match self.config.get_flag(params::BIOS_ENABLE) {
            Ok(flag) => flag,
            Err(err) => return self.fail_init(&err.to_string()),
        };

        let arch = match ArchState::derive(&self.config) {
            Ok(arch) => arch,
            Err(err) => return self.fail_init(&err.to_string()),
        };
        if let Err(err) = arch.validate() {
            return self.fail_init(&err.to_string());
        }

        // The schema admits memory sizes far beyond what the host can back,
        // so the allocation must fail soft instead of aborting the process.
        let mut memory = Vec::new();
        if memory.try_reserve_exact(memory_size as usize).is_err() {
            return self.fail_init(&format!("cannot allocate {memory_size} bytes of memory"));
        }
        memory.resize(memory_size as usize, 0);

        {
            let Ok(mut core) = self.core.lock() else {
                return self.fail_init("execution state poisoned");
            };
            core.memory = memory;
            if bios_enabled {
                let seeded = BOOT_IMAGE.len().min(core.memory.len());
                core.memory[..seeded].copy_from_slice(&BOOT_IMAGE[..seeded]);
            }
            core.registers = [0; NUM_REGISTERS];
            core.pc = start_address as u32;
            core.stats.reset();
        }

        info!(
            architecture = %arch.architecture,
            memory_size,
            start_address,
            "VPU initialized"
        );
        self.emit(VpuEvent::ArchitectureInitialized {
            architecture: arch.architecture.clone(),
            real_mode: arch.real_mode,
            protected_mode: arch.protected_mode,
        });
        self.arch = Some(arch);
        self.initialized = true;
        true
    }

    /// Starts the fetch-execute loop on a background thread.
    ///
    /// Returns `false` without side effects when already running or never
    /// initialized. The `Started` event is emitted before the worker is
    /// spawned, so it precedes every event of the new run.
    pub fn start(&mut self) -> bool {
        if !self.initialized {
            warn!("start refused: engine was never initialized");
            return false;
        }
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        // The previous run's worker exits within one pacing delay of the
        // flag dropping. Reap it while the flag is still down; raising the
        // flag first would let a not-yet-exited worker observe it and
        // resume the old run.
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.emit(VpuEvent::Started);
        let core = Arc::clone(&self.core);
        let running = Arc::clone(&self.running);
        let events = self.events.clone();
        let pacing = self.pacing;
        let spawned = thread::Builder::new()
            .name("vpu-exec".to_owned())
            .spawn(move || run_loop(&core, &running, &events, pacing));
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                true
            }
            Err(err) => {
                warn!(%err, "failed to spawn execution thread");
                self.running.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Requests the loop to stop.
    ///
    /// Idempotent and callable from any state. Sets the flag and returns
    /// without waiting for the loop to observe it; at most one further
    /// instruction may execute. The `Stopped` event fires only on an actual
    /// running-to-stopped edge, so repeated calls are observably identical
    /// to one.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("VPU stop requested");
            self.emit(VpuEvent::Stopped);
        }
    }

    /// Whether the fetch-execute loop is (or is about to be) running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Writes a configuration parameter, only while stopped.
    ///
    /// While running this rejects synchronously (nothing is queued) and
    /// emits [`VpuEvent::ConfigRejected`]. Otherwise it behaves exactly like
    /// [`ConfigStore::set`].
    pub fn set_config_parameter(&mut self, name: &str, value: &str) -> bool {
        if self.running.load(Ordering::Acquire) {
            debug!(name, "configuration write rejected while running");
            self.emit(VpuEvent::ConfigRejected {
                name: name.to_owned(),
            });
            return false;
        }
        self.config.set(name, value)
    }

    /// Read-only view of the configuration store.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Mutable access to the configuration store, denied while running.
    ///
    /// Front-ends use this for bulk operations (`load`/`save`); single
    /// writes should go through [`Vpu::set_config_parameter`].
    pub fn config_mut(&mut self) -> Option<&mut ConfigStore> {
        if self.running.load(Ordering::Acquire) {
            return None;
        }
        Some(&mut self.config)
    }

    /// The derived architecture snapshot from the last successful
    /// initialization.
    pub fn arch(&self) -> Option<&ArchState> {
        self.arch.as_ref()
    }

    /// Current program counter.
    pub fn pc(&self) -> u32 {
        self.core.lock().map_or(0, |core| core.pc)
    }

    /// Reads a general-purpose register.
    pub fn register(&self, index: usize) -> Option<u32> {
        self.core
            .lock()
            .ok()
            .and_then(|core| core.registers.get(index).copied())
    }

    /// Size of the allocated memory buffer in bytes.
    pub fn memory_len(&self) -> usize {
        self.core.lock().map_or(0, |core| core.memory.len())
    }

    /// Snapshot of the execution counters.
    pub fn stats(&self) -> ExecStats {
        self.core.lock().map_or_else(|_| ExecStats::default(), |core| core.stats)
    }

    /// Copies a program image into memory, only while stopped.
    ///
    /// Fails when the engine is running or the image does not fit at the
    /// given address.
    pub fn load_program(&mut self, address: u32, image: &[u8]) -> bool {
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        let Ok(mut core) = self.core.lock() else {
            return false;
        };
        let at = address as usize;
        let Some(end) = at.checked_add(image.len()) else {
            return false;
        };
        if end > core.memory.len() {
            return false;
        }
        core.memory[at..end].copy_from_slice(image);
        true
    }

    /// Overrides the pacing delay between loop iterations, only while
    /// stopped. The delay bounds both loop overhead and the latency of
    /// cooperative cancellation.
    pub fn set_pacing(&mut self, pacing: Duration) -> bool {
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        self.pacing = pacing;
        true
    }

    /// Emits an initialization failure and reports it.
    fn fail_init(&self, reason: &str) -> bool {
        warn!(reason, "VPU initialization failed");
        self.emit(VpuEvent::InitFailed(reason.to_owned()));
        false
    }

    /// Pushes an event into the bounded queue without ever blocking.
    fn emit(&self, event: VpuEvent) {
        publish(&self.events, event);
    }
}

impl Drop for Vpu {
    /// Forces a stop and joins the worker before releasing memory and
    /// registers, so the loop can never touch freed state.
    fn drop(&mut self) {
        let _ = self.running.swap(false, Ordering::AcqRel);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// Best-effort event delivery; a full or disconnected queue drops the event.
fn publish(events: &SyncSender<VpuEvent>, event: VpuEvent) {
    debug!(%event, "vpu event");
    let _ = events.try_send(event);
}

/// The background fetch-execute loop.
///
/// Each iteration takes the core lock for exactly one step, releases it,
/// publishes any event, then sleeps the pacing delay. Cancellation is
/// cooperative: the flag is polled once per iteration.
fn run_loop(
    core: &Arc<Mutex<Core>>,
    running: &Arc<AtomicBool>,
    events: &SyncSender<VpuEvent>,
    pacing: Duration,
) {
    while running.load(Ordering::Acquire) {
        let step = {
            let Ok(mut core) = core.lock() else {
                break;
            };
            core.step()
        };
        match step {
            Step::Advanced => {}
            Step::Nop(pc) => publish(events, VpuEvent::Nop { pc }),
            Step::SystemCall(pc) => {
                publish(events, VpuEvent::SystemCall { pc });
                halt(running, events);
                break;
            }
            Step::OutOfBounds => {
                halt(running, events);
                break;
            }
        }
        thread::sleep(pacing);
    }
}

/// Self-termination path: same running-flag edge as [`Vpu::stop`], so
/// exactly one `Stopped` event fires per run.
fn halt(running: &AtomicBool, events: &SyncSender<VpuEvent>) {
    if running.swap(false, Ordering::AcqRel) {
        publish(events, VpuEvent::Stopped);
    }
}
