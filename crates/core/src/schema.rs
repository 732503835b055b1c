//! Parameter schema registry for the VPU.
//!
//! This module defines the universe of legal configuration parameters. It provides:
//! 1. **Definitions:** A typed, immutable table mapping parameter names to kind,
//!    description, default value, and enumerated values.
//! 2. **Rules:** A closed set of validation rules (`ValueRule`) stored as plain data
//!    and dispatched by pure functions, with no captured closures.
//! 3. **Lookup:** Deterministic, side-effect-free queries used by the configuration
//!    store as its validation gate.
//!
//! The registry is built once behind a [`std::sync::LazyLock`] and shared read-only
//! through [`Schema::global`]; nothing mutates it after construction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use tracing::debug;

/// Well-known parameter names.
///
/// The engine reads these keys at initialization; keeping them as constants
/// avoids stringly-typed lookups drifting out of sync with the table below.
pub mod params {
    /// Total memory size in bytes (power of two).
    pub const MEMORY_SIZE: &str = "MEMORY_SIZE";
    /// Program start address (4-byte aligned hex).
    pub const START_ADDRESS: &str = "START_ADDRESS";
    /// CPU frequency in Hz.
    pub const CPU_FREQUENCY: &str = "CPU_FREQUENCY";
    /// Pipeline depth selection.
    pub const PIPELINE_STAGES: &str = "PIPELINE_STAGES";
    /// Instruction cache size in bytes (power of two).
    pub const ICACHE_SIZE: &str = "ICACHE_SIZE";
    /// Data cache size in bytes (power of two).
    pub const DCACHE_SIZE: &str = "DCACHE_SIZE";
    /// Enable BIOS initialization.
    pub const BIOS_ENABLE: &str = "BIOS_ENABLE";
    /// BIOS memory location (4-byte aligned hex).
    pub const BIOS_LOCATION: &str = "BIOS_LOCATION";
    /// Debug output verbosity.
    pub const DEBUG_LEVEL: &str = "DEBUG_LEVEL";
    /// Enable instruction tracing.
    pub const TRACE_INSTRUCTIONS: &str = "TRACE_INSTRUCTIONS";
    /// CPU architecture identifier.
    pub const ARCHITECTURE: &str = "ARCHITECTURE";
    /// Enabled instruction-set extensions (comma-separated).
    pub const INSTRUCTION_SET_EXTENSIONS: &str = "INSTRUCTION_SET_EXTENSIONS";
    /// Address bus width in bits.
    pub const ADDRESS_BUS_WIDTH: &str = "ADDRESS_BUS_WIDTH";
    /// Data bus width in bits.
    pub const DATA_BUS_WIDTH: &str = "DATA_BUS_WIDTH";
    /// Memory byte order.
    pub const ENDIANNESS: &str = "ENDIANNESS";
    /// Enable x86 real mode.
    pub const X86_REAL_MODE: &str = "X86_REAL_MODE";
    /// Enable x86 protected mode.
    pub const X86_PROTECTED_MODE: &str = "X86_PROTECTED_MODE";
    /// Enable segmentation.
    pub const SEGMENT_REGISTERS: &str = "SEGMENT_REGISTERS";
    /// Floating-point unit type.
    pub const FPU_TYPE: &str = "FPU_TYPE";
    /// Memory management unit type.
    pub const MMU_TYPE: &str = "MMU_TYPE";
    /// SIMD instruction-set support.
    pub const SIMD_SUPPORT: &str = "SIMD_SUPPORT";
    /// Enable hardware virtualization support.
    pub const VIRTUALIZATION_SUPPORT: &str = "VIRTUALIZATION_SUPPORT";
    /// CPU clock multiplier.
    pub const CLOCK_MULTIPLIER: &str = "CLOCK_MULTIPLIER";
    /// Memory wait states.
    pub const WAIT_STATES: &str = "WAIT_STATES";
}

/// The type of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Unsigned decimal integer.
    Integer,
    /// Hexadecimal address, with or without a `0x` prefix.
    Hex,
    /// Free-form text.
    Text,
    /// Exactly `"true"` or `"false"` (case-sensitive).
    Boolean,
    /// One of a fixed, ordered set of values.
    Enum,
}

/// Validation rule applied to a candidate value.
///
/// Rules are plain data; [`Schema::validate`] dispatches on them with pure
/// functions. A value that fails to parse where a number is expected fails
/// the rule; parse errors never propagate out of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    /// Parses as an unsigned integer and is a power of two.
    PowerOfTwo,
    /// Parses as hex and the low two bits are zero (4-byte aligned).
    AlignedAddress,
    /// Parses as an unsigned integer within the inclusive range.
    Range {
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },
    /// Member of the parameter's enumerated value set.
    Member,
    /// Exactly `"true"` or `"false"`.
    Flag,
    /// Any non-empty text.
    NonEmpty,
}

/// Immutable definition of a single parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    /// Value type of the parameter.
    pub kind: ParamKind,
    /// Human-readable description, shown by front-ends.
    pub description: &'static str,
    /// Default value; always satisfies `rule` by construction.
    pub default: &'static str,
    /// Allowed values for `Enum` parameters; empty otherwise.
    pub values: &'static [&'static str],
    /// Validation rule for candidate values.
    pub rule: ValueRule,
}

/// Accepted CPU architecture identifiers.
const ARCHITECTURES: &[&str] = &[
    // RISC-V variants
    "RISC-V-32",
    "RISC-V-64",
    "RISC-V-128",
    // x86 family
    "8086",
    "80186",
    "80286",
    "80386",
    "80486",
    "Pentium",
    "80386SX",
    "80386DX",
    "80486SX",
    "80486DX",
    "80486DX2",
    "80486DX4",
    // 8-bit
    "8080",
    "Z80",
    "6502",
    "6800",
    // 16-bit
    "65816",
    "68000",
    // 4-bit
    "Intel-4004",
    "Intel-4040",
];

/// Accepted pipeline configurations.
const PIPELINE_STAGES: &[&str] = &["3-stage", "5-stage", "7-stage"];

/// Accepted debug output levels.
const DEBUG_LEVELS: &[&str] = &["none", "minimal", "normal", "verbose", "debug"];

/// Accepted address bus widths in bits.
const ADDRESS_BUS_WIDTHS: &[&str] = &["4", "8", "16", "20", "24", "32", "64", "128"];

/// Accepted data bus widths in bits.
const DATA_BUS_WIDTHS: &[&str] = &["4", "8", "16", "32", "64", "128"];

/// Accepted byte orders.
const ENDIANNESS: &[&str] = &["little", "big", "bi"];

/// Accepted floating-point unit types.
const FPU_TYPES: &[&str] = &["none", "8087", "80287", "80387", "80487", "internal"];

/// Accepted memory management unit types.
const MMU_TYPES: &[&str] = &[
    "none",
    "basic",
    "paging",
    "segmentation",
    "paging_and_segmentation",
];

/// Accepted SIMD instruction-set levels.
const SIMD_LEVELS: &[&str] = &["none", "MMX", "SSE", "SSE2", "SSE3", "SSSE3", "SSE4", "AVX"];

/// The process-wide registry instance.
static SCHEMA: LazyLock<Schema> = LazyLock::new(Schema::build);

/// The immutable parameter schema registry.
///
/// Maps parameter names to their definitions. Constructed once per process
/// via [`Schema::global`] and shared by reference; all queries are pure.
#[derive(Debug)]
pub struct Schema {
    table: BTreeMap<&'static str, ParamDef>,
}

impl Schema {
    /// Returns the shared registry instance.
    pub fn global() -> &'static Self {
        &SCHEMA
    }

    /// Builds the full parameter table.
    fn build() -> Self {
        let mut table = BTreeMap::new();

        // Memory configuration
        let _ = table.insert(
            params::MEMORY_SIZE,
            ParamDef {
                kind: ParamKind::Integer,
                description: "Total memory size in bytes (must be power of 2)",
                default: "65536",
                values: &[],
                rule: ValueRule::PowerOfTwo,
            },
        );
        let _ = table.insert(
            params::START_ADDRESS,
            ParamDef {
                kind: ParamKind::Hex,
                description: "Program start address (must be aligned to 4 bytes)",
                default: "0x0000",
                values: &[],
                rule: ValueRule::AlignedAddress,
            },
        );

        // CPU configuration
        let _ = table.insert(
            params::CPU_FREQUENCY,
            ParamDef {
                kind: ParamKind::Integer,
                description: "CPU frequency in Hz (1000-1000000000)",
                default: "1000000",
                values: &[],
                rule: ValueRule::Range {
                    min: 1000,
                    max: 1_000_000_000,
                },
            },
        );
        let _ = table.insert(
            params::PIPELINE_STAGES,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Pipeline configuration",
                default: "5-stage",
                values: PIPELINE_STAGES,
                rule: ValueRule::Member,
            },
        );

        // Cache configuration
        let _ = table.insert(
            params::ICACHE_SIZE,
            ParamDef {
                kind: ParamKind::Integer,
                description: "Instruction cache size in bytes (power of 2)",
                default: "4096",
                values: &[],
                rule: ValueRule::PowerOfTwo,
            },
        );
        let _ = table.insert(
            params::DCACHE_SIZE,
            ParamDef {
                kind: ParamKind::Integer,
                description: "Data cache size in bytes (power of 2)",
                default: "4096",
                values: &[],
                rule: ValueRule::PowerOfTwo,
            },
        );

        // BIOS configuration
        let _ = table.insert(
            params::BIOS_ENABLE,
            ParamDef {
                kind: ParamKind::Boolean,
                description: "Enable BIOS initialization",
                default: "true",
                values: &[],
                rule: ValueRule::Flag,
            },
        );
        let _ = table.insert(
            params::BIOS_LOCATION,
            ParamDef {
                kind: ParamKind::Hex,
                description: "BIOS memory location",
                default: "0x0000",
                values: &[],
                rule: ValueRule::AlignedAddress,
            },
        );

        // Debug options
        let _ = table.insert(
            params::DEBUG_LEVEL,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Debug output level",
                default: "normal",
                values: DEBUG_LEVELS,
                rule: ValueRule::Member,
            },
        );
        let _ = table.insert(
            params::TRACE_INSTRUCTIONS,
            ParamDef {
                kind: ParamKind::Boolean,
                description: "Enable instruction tracing",
                default: "false",
                values: &[],
                rule: ValueRule::Flag,
            },
        );

        // Architecture configuration
        let _ = table.insert(
            params::ARCHITECTURE,
            ParamDef {
                kind: ParamKind::Enum,
                description: "CPU Architecture type",
                default: "RISC-V-32",
                values: ARCHITECTURES,
                rule: ValueRule::Member,
            },
        );
        let _ = table.insert(
            params::INSTRUCTION_SET_EXTENSIONS,
            ParamDef {
                kind: ParamKind::Text,
                description: "Enabled instruction set extensions (comma-separated)",
                default: "base",
                values: &[],
                rule: ValueRule::NonEmpty,
            },
        );
        let _ = table.insert(
            params::ADDRESS_BUS_WIDTH,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Address bus width in bits",
                default: "32",
                values: ADDRESS_BUS_WIDTHS,
                rule: ValueRule::Member,
            },
        );
        let _ = table.insert(
            params::DATA_BUS_WIDTH,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Data bus width in bits",
                default: "32",
                values: DATA_BUS_WIDTHS,
                rule: ValueRule::Member,
            },
        );
        let _ = table.insert(
            params::ENDIANNESS,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Memory byte order",
                default: "little",
                values: ENDIANNESS,
                rule: ValueRule::Member,
            },
        );

        // Architecture-specific features
        let _ = table.insert(
            params::X86_REAL_MODE,
            ParamDef {
                kind: ParamKind::Boolean,
                description: "Enable x86 real mode (16-bit mode)",
                default: "false",
                values: &[],
                rule: ValueRule::Flag,
            },
        );
        let _ = table.insert(
            params::X86_PROTECTED_MODE,
            ParamDef {
                kind: ParamKind::Boolean,
                description: "Enable x86 protected mode",
                default: "true",
                values: &[],
                rule: ValueRule::Flag,
            },
        );
        let _ = table.insert(
            params::SEGMENT_REGISTERS,
            ParamDef {
                kind: ParamKind::Boolean,
                description: "Enable segmentation (for x86 architectures)",
                default: "false",
                values: &[],
                rule: ValueRule::Flag,
            },
        );
        let _ = table.insert(
            params::FPU_TYPE,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Floating-point unit type",
                default: "none",
                values: FPU_TYPES,
                rule: ValueRule::Member,
            },
        );
        let _ = table.insert(
            params::MMU_TYPE,
            ParamDef {
                kind: ParamKind::Enum,
                description: "Memory Management Unit type",
                default: "none",
                values: MMU_TYPES,
                rule: ValueRule::Member,
            },
        );

        // Architecture extensions
        let _ = table.insert(
            params::SIMD_SUPPORT,
            ParamDef {
                kind: ParamKind::Enum,
                description: "SIMD instruction set support",
                default: "none",
                values: SIMD_LEVELS,
                rule: ValueRule::Member,
            },
        );
        let _ = table.insert(
            params::VIRTUALIZATION_SUPPORT,
            ParamDef {
                kind: ParamKind::Boolean,
                description: "Enable hardware virtualization support",
                default: "false",
                values: &[],
                rule: ValueRule::Flag,
            },
        );

        // Timing parameters
        let _ = table.insert(
            params::CLOCK_MULTIPLIER,
            ParamDef {
                kind: ParamKind::Integer,
                description: "CPU clock multiplier (1-100)",
                default: "1",
                values: &[],
                rule: ValueRule::Range { min: 1, max: 100 },
            },
        );
        let _ = table.insert(
            params::WAIT_STATES,
            ParamDef {
                kind: ParamKind::Integer,
                description: "Memory wait states (0-7)",
                default: "0",
                values: &[],
                rule: ValueRule::Range { min: 0, max: 7 },
            },
        );

        Self { table }
    }

    /// Looks up the definition of a parameter.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name.
    ///
    /// # Returns
    ///
    /// The definition, or `None` if the name is not in the schema.
    pub fn lookup(&self, name: &str) -> Option<&ParamDef> {
        self.table.get(name)
    }

    /// Validates a candidate value against a parameter's rule.
    ///
    /// Returns `false` if the name is unknown or the rule rejects the value.
    /// Parse failures count as rejection, never as errors.
    pub fn validate(&self, name: &str, value: &str) -> bool {
        let Some(def) = self.table.get(name) else {
            debug!(name, "validation failed: unknown parameter");
            return false;
        };
        let ok = check_rule(def.rule, def.values, value);
        if !ok {
            debug!(name, value, "validation failed: rule rejected value");
        }
        ok
    }

    /// Returns the default value for a parameter, if the name is known.
    pub fn default_for(&self, name: &str) -> Option<&'static str> {
        self.table.get(name).map(|def| def.default)
    }

    /// Returns the description of a parameter.
    ///
    /// Unknown names yield a fixed placeholder rather than an error, since
    /// descriptions are display-only.
    pub fn describe(&self, name: &str) -> &'static str {
        self.table
            .get(name)
            .map_or("Unknown parameter", |def| def.description)
    }

    /// Returns all parameter names in stable (sorted) order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }

    /// Returns the enumerated values for an `Enum` parameter.
    ///
    /// Empty for unknown names and for parameters of any other kind.
    pub fn enum_values(&self, name: &str) -> &'static [&'static str] {
        self.table
            .get(name)
            .filter(|def| def.kind == ParamKind::Enum)
            .map_or(&[], |def| def.values)
    }
}

/// Applies a validation rule to a candidate value.
fn check_rule(rule: ValueRule, values: &[&str], value: &str) -> bool {
    match rule {
        ValueRule::PowerOfTwo => parse_unsigned(value).is_some_and(|v| v & (v.wrapping_sub(1)) == 0),
        ValueRule::AlignedAddress => parse_hex(value).is_some_and(|addr| addr & 0x3 == 0),
        ValueRule::Range { min, max } => {
            parse_unsigned(value).is_some_and(|v| v >= min && v <= max)
        }
        ValueRule::Member => values.contains(&value),
        ValueRule::Flag => value == "true" || value == "false",
        ValueRule::NonEmpty => !value.is_empty(),
    }
}

/// Parses an unsigned decimal integer; `None` on any parse failure.
pub(crate) fn parse_unsigned(value: &str) -> Option<u64> {
    value.parse::<u64>().ok()
}

/// Parses a hexadecimal value with an optional `0x`/`0X` prefix.
pub(crate) fn parse_hex(value: &str) -> Option<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u64::from_str_radix(digits, 16).ok()
}
