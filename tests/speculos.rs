//! Integration tests - requires a running Speculos instance with the IOTA app:
//!
//! ```sh
//! speculos --model nanos /path/to/app-iota.elf
//! ```
//!
//! Then: `cargo test -- --ignored`. Set `LEDGER_TCP_HOST` when Speculos
//! does not run on localhost.

#![cfg(feature = "tcp")]

use ledger_iota_wallet::{
    AddressOptions, DerivationPath, DeviceState, LedgerIota, SecurityLevel, TransportType,
};

fn connect() -> LedgerIota {
    let host = std::env::var("LEDGER_TCP_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let transport = TransportType::TCP(host, 9999);
    LedgerIota::new(&transport).expect("failed to connect to Speculos - is it running?")
}

fn activated(security: SecurityLevel) -> LedgerIota {
    let mut ledger = connect();
    ledger
        .activate(&DerivationPath::iota(0, 0), security)
        .unwrap();
    ledger
}

#[test]
#[ignore = "requires Speculos"]
fn get_app_config() {
    let mut ledger = connect();
    let config = ledger.get_app_config().unwrap();
    assert_eq!(ledger.get_app_version().unwrap(), config.version);
    assert!(ledger.get_app_max_bundle_size().unwrap() > 0);
}

#[test]
#[ignore = "requires Speculos"]
fn is_app_open() {
    let mut ledger = connect();
    assert!(ledger.is_app_open());
}

#[test]
#[ignore = "requires Speculos"]
fn activate_and_get_address() {
    let mut ledger = activated(SecurityLevel::Medium);
    assert_eq!(ledger.state(), DeviceState::SeedActive);

    let address = ledger.get_address(0, AddressOptions::default()).unwrap();
    assert_eq!(address.len(), 81);
    assert!(address.bytes().all(|b| b == b'9' || b.is_ascii_uppercase()));
}

#[test]
#[ignore = "requires Speculos"]
fn addresses_deterministic() {
    let mut ledger = activated(SecurityLevel::Medium);
    let a1 = ledger.get_address(0, AddressOptions::default()).unwrap();
    let a2 = ledger.get_address(0, AddressOptions::default()).unwrap();
    assert_eq!(a1, a2);
}

#[test]
#[ignore = "requires Speculos"]
fn different_indices_differ() {
    let mut ledger = activated(SecurityLevel::Medium);
    let a0 = ledger.get_address(0, AddressOptions::default()).unwrap();
    let a1 = ledger.get_address(1, AddressOptions::default()).unwrap();
    assert_ne!(a0, a1);
}

#[test]
#[ignore = "requires Speculos"]
fn security_level_changes_address() {
    let mut low = activated(SecurityLevel::Low);
    let a_low = low.get_address(0, AddressOptions::default()).unwrap();
    drop(low);

    let mut high = activated(SecurityLevel::High);
    let a_high = high.get_address(0, AddressOptions::default()).unwrap();
    assert_ne!(a_low, a_high);
}

#[test]
#[ignore = "requires Speculos"]
fn reset_keeps_session() {
    let mut ledger = activated(SecurityLevel::Medium);
    ledger.reset(true).unwrap();
    assert_eq!(ledger.state(), DeviceState::SeedActive);
    assert!(ledger.get_address(0, AddressOptions::default()).is_ok());
}
