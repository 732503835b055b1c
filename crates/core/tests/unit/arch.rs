//! # Architecture State Tests
//!
//! Coverage for snapshot derivation, segment register initialization, and
//! the cross-field legality rules.

use rstest::rstest;
use vpusim_core::arch::{ArchError, SegmentRegisters, is_legacy_family};
use vpusim_core::schema::params;
use vpusim_core::{ArchState, ConfigStore};

fn store_with(pairs: &[(&str, &str)]) -> ConfigStore {
    let mut store = ConfigStore::new();
    for (name, value) in pairs {
        assert!(store.set(name, value), "setup write {name}={value} rejected");
    }
    store
}

fn derive(pairs: &[(&str, &str)]) -> ArchState {
    match ArchState::derive(&store_with(pairs)) {
        Ok(state) => state,
        Err(err) => panic!("derivation failed: {err}"),
    }
}

#[test]
fn default_store_derives_riscv_without_segments() {
    let state = derive(&[]);
    assert_eq!(state.architecture, "RISC-V-32");
    assert!(!state.real_mode);
    assert!(state.protected_mode); // schema default
    assert_eq!(state.fpu_type, "none");
    assert_eq!(state.clock_multiplier, 1);
    assert_eq!(state.wait_states, 0);
    assert_eq!(state.segments, None);
}

#[rstest]
#[case("8086")]
#[case("80386")]
#[case("80486DX4")]
#[case("Pentium")]
fn legacy_family_gets_zeroed_segments(#[case] arch: &str) {
    let state = derive(&[
        (params::ARCHITECTURE, arch),
        (params::X86_PROTECTED_MODE, "false"),
    ]);
    assert_eq!(state.segments, Some(SegmentRegisters::default()));
}

#[rstest]
#[case("Z80")]
#[case("6502")]
#[case("68000")]
#[case("RISC-V-64")]
#[case("Intel-4004")]
fn non_legacy_ids_carry_no_segments(#[case] arch: &str) {
    assert!(!is_legacy_family(arch));
    let state = derive(&[(params::ARCHITECTURE, arch)]);
    assert_eq!(state.segments, None);
}

#[rstest]
#[case("8086")]
#[case("80186")]
fn earliest_legacy_ids_forbid_protected_mode(#[case] arch: &str) {
    let state = derive(&[
        (params::ARCHITECTURE, arch),
        (params::X86_PROTECTED_MODE, "true"),
    ]);
    assert_eq!(
        state.validate(),
        Err(ArchError::ProtectedModeUnsupported(arch.to_owned()))
    );
}

#[test]
fn real_and_protected_modes_are_exclusive() {
    let state = derive(&[
        (params::ARCHITECTURE, "80386"),
        (params::X86_REAL_MODE, "true"),
        (params::X86_PROTECTED_MODE, "true"),
    ]);
    assert_eq!(state.validate(), Err(ArchError::ModeConflict));
}

#[rstest]
#[case("8086", "8087", true)]
#[case("8086", "80287", false)]
#[case("80286", "80287", true)]
#[case("80286", "80387", false)]
#[case("80386", "80387", true)]
#[case("80386", "8087", false)]
// Generations outside the checked pairs accept any FPU.
#[case("80486", "internal", true)]
#[case("RISC-V-64", "internal", true)]
fn fpu_generation_pairing(#[case] arch: &str, #[case] fpu: &str, #[case] legal: bool) {
    let state = derive(&[
        (params::ARCHITECTURE, arch),
        (params::X86_PROTECTED_MODE, "false"),
        (params::FPU_TYPE, fpu),
    ]);
    assert_eq!(state.validate().is_ok(), legal);
}

#[rstest]
#[case("Pentium", true)]
#[case("80486", false)]
#[case("RISC-V-32", false)]
fn simd_is_pentium_only(#[case] arch: &str, #[case] legal: bool) {
    let state = derive(&[
        (params::ARCHITECTURE, arch),
        (params::X86_PROTECTED_MODE, "false"),
        (params::SIMD_SUPPORT, "MMX"),
    ]);
    assert_eq!(state.validate().is_ok(), legal);
}

#[test]
fn fpu_none_skips_the_pairing_check() {
    let state = derive(&[
        (params::ARCHITECTURE, "8086"),
        (params::X86_PROTECTED_MODE, "false"),
    ]);
    assert_eq!(state.fpu_type, "none");
    assert!(state.validate().is_ok());
}

#[test]
fn snapshot_serializes_to_json() {
    let state = derive(&[(params::ARCHITECTURE, "Pentium")]);
    let json = serde_json::to_value(&state).ok();
    let Some(json) = json else {
        panic!("serialization failed");
    };
    assert_eq!(json["architecture"], "Pentium");
    assert!(json["segments"].is_object());
}
