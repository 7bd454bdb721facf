//! Rust driver for the IOTA Ledger wallet apps.
//!
//! Signs trinary IOTA bundles on the IOTA Ledger app (firmware before and
//! after 0.5.0) and generates Stardust addresses on the IOTA/Shimmer app.
//! The seed never leaves the device.
//!
//! # Quick start
//!
//! ```no_run
//! use ledger_iota_wallet::{AddressOptions, DerivationPath, LedgerIota, SecurityLevel, TransportType};
//!
//! let mut ledger = LedgerIota::new(&TransportType::TCP("127.0.0.1".into(), 9999))?;
//!
//! let version = ledger.get_app_version()?;
//! println!("app {version}");
//!
//! let path: DerivationPath = "44'/4218'/0'/0'".parse()?;
//! ledger.activate(&path, SecurityLevel::Medium)?;
//! let address = ledger.get_address(0, AddressOptions::default())?;
//! println!("address: {address}");
//! # Ok::<(), ledger_iota_wallet::LedgerError>(())
//! ```
//!
//! # Modules
//!
//! - [`api`] -- high-level [`LedgerIota`] facade
//! - [`bundle`] -- [`Bundle`], [`Transaction`] and the [`BundleBuilder`] / [`Checksum`] contracts
//! - [`codec`] -- fixed-layout binary records
//! - [`transport`] -- device communication (TCP, or bring your own)
//! - [`types`] -- [`DerivationPath`], [`SecurityLevel`], [`AppConfig`], [`AppMode`]
//! - [`validate`] -- pre-flight checks on transfers and inputs
//!
//! # Feature flags
//!
//! - `tcp` (default) -- TCP transport for the Speculos simulator

pub mod apdu;
pub mod api;
pub mod bundle;
pub mod codec;
pub(crate) mod commands;
pub mod error;
pub(crate) mod protocol;
pub(crate) mod signer;
pub mod transport;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AddressOptions, DeviceState, LedgerIota, Session};
pub use bundle::{Bundle, BundleBuilder, Checksum, Input, Remainder, Transaction, Transfer};
pub use error::{ErrorKind, LedgerError, TransportError};
pub use protocol::chunks::{DataBufferState, DataType};
pub use transport::{Transport, TransportType};
pub use types::{
    AppConfig, AppFlags, AppMode, AppVersion, DerivationPath, FirmwareGeneration, SecurityLevel,
};
