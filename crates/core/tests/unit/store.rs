//! # Configuration Store Tests
//!
//! Coverage for validated writes, the strict accessor, and the persisted
//! line format's parse/serialize contract.

use pretty_assertions::assert_eq;
use vpusim_core::schema::params;
use vpusim_core::{ConfigError, ConfigStore, Schema};

#[test]
fn new_store_holds_every_schema_default() {
    let store = ConfigStore::new();
    let schema = Schema::global();
    assert_eq!(store.len(), schema.names().count());
    for name in schema.names() {
        assert_eq!(
            store.get(name).ok().as_deref(),
            schema.default_for(name),
            "{name} not seeded with its default"
        );
    }
}

#[test]
fn set_validates_before_storing() {
    let mut store = ConfigStore::new();
    assert!(store.set(params::MEMORY_SIZE, "65536"));
    assert!(!store.set(params::MEMORY_SIZE, "65535"));
    assert_eq!(store.get(params::MEMORY_SIZE).as_deref(), Ok("65536"));
}

#[test]
fn set_rejects_unknown_names() {
    let mut store = ConfigStore::new();
    assert!(!store.set("NO_SUCH_PARAMETER", "1"));
}

#[test]
fn misaligned_start_address_is_rejected() {
    let mut store = ConfigStore::new();
    assert!(!store.set(params::START_ADDRESS, "0x0002"));
    assert_eq!(store.get(params::START_ADDRESS).as_deref(), Ok("0x0000"));
}

#[test]
fn strict_get_fails_only_outside_the_schema() {
    let store = ConfigStore::new();
    assert!(store.get(params::ARCHITECTURE).is_ok());
    assert_eq!(
        store.get("NO_SUCH_PARAMETER"),
        Err(ConfigError::NotFound("NO_SUCH_PARAMETER".into()))
    );
}

#[test]
fn save_then_load_round_trips() {
    let mut store = ConfigStore::new();
    assert!(store.set(params::MEMORY_SIZE, "131072"));
    assert!(store.set(params::ARCHITECTURE, "Z80"));
    let text = store.save();

    let mut reloaded = ConfigStore::new();
    assert!(reloaded.load(&text));
    let lhs: Vec<_> = store.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();
    let rhs: Vec<_> = reloaded
        .iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    assert_eq!(lhs, rhs);
}

#[test]
fn save_order_is_stable_within_a_run() {
    let store = ConfigStore::new();
    assert_eq!(store.save(), store.save());
}

#[test]
fn load_skips_blank_and_comment_lines() {
    let mut store = ConfigStore::new();
    let text = "# memory\n\nMEMORY_SIZE = 32768\n# trailing comment\n";
    assert!(store.load(text));
    assert_eq!(store.get(params::MEMORY_SIZE).as_deref(), Ok("32768"));
}

#[test]
fn load_trims_whitespace_around_name_and_value() {
    let mut store = ConfigStore::new();
    assert!(store.load("   ARCHITECTURE   =   68000   \n"));
    assert_eq!(store.get(params::ARCHITECTURE).as_deref(), Ok("68000"));
}

#[test]
fn load_ignores_unknown_keys_and_continues() {
    let mut store = ConfigStore::new();
    let text = "FUTURE_KNOB = 9\nMEMORY_SIZE = 16384\n";
    assert!(store.load(text));
    assert_eq!(store.get(params::MEMORY_SIZE).as_deref(), Ok("16384"));
    assert!(store.get("FUTURE_KNOB").is_err());
}

#[test]
fn load_aborts_on_first_invalid_value() {
    let mut store = ConfigStore::new();
    let text = "MEMORY_SIZE = 16384\nCLOCK_MULTIPLIER = 500\nWAIT_STATES = 3\n";
    assert!(!store.load(text));
    // Short-circuit semantics: the store is cleared, then holds whatever
    // was applied before the failing line.
    assert_eq!(store.get(params::MEMORY_SIZE).as_deref(), Ok("16384"));
    // WAIT_STATES never applied; the strict accessor falls back to the
    // schema default.
    assert_eq!(store.get(params::WAIT_STATES).as_deref(), Ok("0"));
    assert_eq!(store.len(), 1);
}

#[test]
fn load_aborts_on_line_without_separator() {
    let mut store = ConfigStore::new();
    assert!(!store.load("MEMORY_SIZE 16384\n"));
    assert!(store.is_empty());
}

#[test]
fn value_may_contain_the_separator() {
    let mut store = ConfigStore::new();
    // Split happens on the first `=` only.
    assert!(store.load("INSTRUCTION_SET_EXTENSIONS = base=v1\n"));
    assert_eq!(
        store.get(params::INSTRUCTION_SET_EXTENSIONS).as_deref(),
        Ok("base=v1")
    );
}
