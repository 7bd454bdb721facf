//! High-level API - [`LedgerIota`] wraps a transport connection and
//! exposes all supported operations.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::apdu::{CLA_IOTA, CLA_STARDUST};
use crate::bundle::{BundleBuilder, Checksum, Input, Remainder, Transfer, EMPTY_TAG};
use crate::commands;
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::signer::{self, BundleSigner};
use crate::transport::{self, Transport, TransportType};
use crate::types::{
    AppConfig, AppMode, AppVersion, DerivationPath, FirmwareGeneration, SecurityLevel, HARDENED,
};
use crate::validate::{self, Limits};

/// Bundle size assumed when the app does not report one.
pub const DEFAULT_MAX_BUNDLE_SIZE: u8 = 8;

/// Where the device protocol currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No seed selected yet.
    Uninitialized,
    SeedActive,
    /// A bundle was handed to the device and signing did not complete.
    BundleInProgress,
}

/// Seed selection made by [`LedgerIota::activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub path: DerivationPath,
    pub security: SecurityLevel,
    pub generation: FirmwareGeneration,
}

#[derive(Clone, Copy, Default)]
pub struct AddressOptions<'a> {
    /// Append the 9-tryte checksum with this routine (trinary app only).
    pub checksum: Option<&'a dyn Checksum>,
    /// Show the address on the device and wait for the user.
    pub display: bool,
}

/// High-level interface to the IOTA Ledger apps.
///
/// Calls block until the device answers. Every device operation takes
/// `&mut self`, so one `LedgerIota` is never driven from two places at once.
pub struct LedgerIota {
    proto: CommandTransport,
    mode: Option<AppMode>,
    config: Option<AppConfig>,
    session: Option<Session>,
    state: DeviceState,
}

impl LedgerIota {
    /// Connect to a device running the trinary IOTA app. Nothing is sent
    /// until [`activate`](Self::activate).
    pub fn new(transport_type: &TransportType) -> Result<Self, LedgerError> {
        let transport = transport::open(transport_type)?;
        Ok(Self::with_transport(transport))
    }

    /// Useful for testing or injecting a custom transport.
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self::build(CommandTransport::new(transport, CLA_IOTA), None)
    }

    /// Talk to the Stardust app for the network selected by `mode`.
    pub fn stardust(transport: Box<dyn Transport>, mode: AppMode) -> Self {
        Self::build(CommandTransport::new(transport, CLA_STARDUST), Some(mode))
    }

    fn build(proto: CommandTransport, mode: Option<AppMode>) -> Self {
        Self {
            proto,
            mode,
            config: None,
            session: None,
            state: DeviceState::Uninitialized,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Select the seed at `path` with `security` on the device.
    ///
    /// Any previous session is dropped first. The Stardust app takes
    /// exactly `44'/coin'/account'/change'` with the coin type of its
    /// network.
    pub fn activate(
        &mut self,
        path: &DerivationPath,
        security: SecurityLevel,
    ) -> Result<(), LedgerError> {
        if let Some(mode) = self.mode {
            check_stardust_path(path, mode)?;
        }
        let path = path.clone();
        self.session = None;
        self.state = DeviceState::Uninitialized;

        let config = self.get_app_config()?;
        let generation = match self.mode {
            Some(_) => FirmwareGeneration::Stardust,
            None => FirmwareGeneration::for_trinary(config.version),
        };
        debug!("app {} speaks {generation:?}", config.version);

        if generation == FirmwareGeneration::Current {
            commands::reset::exec(&self.proto, true)?;
        } else {
            self.select(generation, &path, security)?;
        }

        info!("seed activated at {path} (security {})", security.level());
        self.session = Some(Session {
            path,
            security,
            generation,
        });
        self.state = DeviceState::SeedActive;
        Ok(())
    }

    /// Generate the address at `index` of the active seed.
    pub fn get_address(
        &mut self,
        index: u32,
        options: AddressOptions<'_>,
    ) -> Result<String, LedgerError> {
        let session = self.active_session()?;

        if let (FirmwareGeneration::Stardust, Some(mode)) = (session.generation, self.mode) {
            if options.checksum.is_some() {
                return Err(LedgerError::InvalidArgument(
                    "checksums only apply to trinary addresses".into(),
                ));
            }
            if index & HARDENED != 0 {
                return Err(LedgerError::InvalidArgument(format!(
                    "address index {index} out of range"
                )));
            }
            let (_, change) = account_and_change(&session.path);
            return commands::gen_address::exec(&self.proto, change, index, options.display, mode);
        }

        let address = commands::pubkey::exec(
            &self.proto,
            session.generation,
            &session.path,
            session.security,
            index,
            options.display,
        )?;
        Ok(match options.checksum {
            Some(checksum) => checksum.add_checksum(&address),
            None => address,
        })
    }

    /// Sign a bundle paying `transfers` from `inputs`, sending any change to
    /// `remainder`. Returns the serialized transactions, last index first.
    ///
    /// The device needs the user to confirm the last transaction.
    pub fn sign_bundle<B: BundleBuilder>(
        &mut self,
        builder: &mut B,
        transfers: &[Transfer],
        inputs: &[Input],
        remainder: Option<&Remainder>,
    ) -> Result<Vec<String>, LedgerError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.sign_bundle_at(builder, transfers, inputs, remainder, now)
    }

    /// [`sign_bundle`](Self::sign_bundle) with a fixed timestamp in seconds.
    pub fn sign_bundle_at<B: BundleBuilder>(
        &mut self,
        builder: &mut B,
        transfers: &[Transfer],
        inputs: &[Input],
        remainder: Option<&Remainder>,
        timestamp: u64,
    ) -> Result<Vec<String>, LedgerError> {
        let session = self.active_session()?;
        if session.generation == FirmwareGeneration::Stardust {
            return Err(LedgerError::Unsupported(
                "bundle signing needs the trinary app".into(),
            ));
        }
        if u32::try_from(timestamp).is_err() {
            return Err(LedgerError::InvalidArgument(format!(
                "timestamp {timestamp} out of range"
            )));
        }

        let limits = Limits {
            generation: session.generation,
            max_bundle_size: usize::from(self.get_app_max_bundle_size()?),
        };
        let prepared = validate::prepare(transfers, inputs, remainder, session.security, limits)?;

        let mut key_indices = HashMap::new();
        for t in &prepared.transfers {
            builder.add_entry(1, &t.address, t.value as i64, &t.tag, timestamp, None);
        }
        for i in &prepared.inputs {
            builder.add_entry(
                session.security.level(),
                &i.address,
                -(i.balance as i64),
                EMPTY_TAG,
                timestamp,
                Some(i.key_index),
            );
            key_indices.insert(i.address.clone(), i.key_index);
        }
        if let Some(r) = &prepared.remainder {
            builder.add_entry(
                1,
                &r.address,
                r.value as i64,
                EMPTY_TAG,
                timestamp,
                Some(r.key_index),
            );
            key_indices.insert(r.address.clone(), r.key_index);
        }
        builder.add_trytes(&[]);
        let bundle = builder.finalize();
        info!(
            "signing bundle of {} transactions ({} input(s))",
            bundle.len(),
            prepared.inputs.len()
        );

        let expected = signer::check_bundle(&bundle)?;

        self.state = DeviceState::BundleInProgress;
        let signed = BundleSigner::new(
            &self.proto,
            session.generation,
            &session.path,
            session.security,
        )
        .sign(bundle, expected, &key_indices)?;

        commands::reset::exec(&self.proto, true)?;
        self.state = DeviceState::SeedActive;

        Ok(signed
            .transactions
            .iter()
            .rev()
            .map(|tx| builder.transaction_trytes(tx))
            .collect())
    }

    /// Query the app config and refresh the cached copy.
    pub fn get_app_config(&mut self) -> Result<AppConfig, LedgerError> {
        let config = commands::app_config::exec(&self.proto)?;
        self.config = Some(config.clone());
        Ok(config)
    }

    pub fn get_app_version(&mut self) -> Result<AppVersion, LedgerError> {
        Ok(self.get_app_config()?.version)
    }

    /// Largest bundle the app accepts, from the cached config when there is
    /// one.
    pub fn get_app_max_bundle_size(&mut self) -> Result<u8, LedgerError> {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => self.get_app_config()?,
        };
        Ok(config.max_bundle_size.unwrap_or(DEFAULT_MAX_BUNDLE_SIZE))
    }

    /// Reset the app. A partial reset keeps the selected seed and drops any
    /// bundle in progress.
    ///
    /// A full reset also clears the seed or account selection on the
    /// device. It is selected again from the active session, so the session
    /// survives; if that fails the session is dropped.
    pub fn reset(&mut self, partial: bool) -> Result<(), LedgerError> {
        commands::reset::exec(&self.proto, partial)?;
        let Some(session) = self.session.clone() else {
            self.state = DeviceState::Uninitialized;
            return Ok(());
        };

        if !partial && session.generation != FirmwareGeneration::Current {
            if let Err(err) = self.select(session.generation, &session.path, session.security) {
                self.session = None;
                self.state = DeviceState::Uninitialized;
                return Err(err);
            }
        }
        self.state = DeviceState::SeedActive;
        Ok(())
    }

    /// Check whether an IOTA app answers on the device.
    pub fn is_app_open(&mut self) -> bool {
        self.get_app_config().is_ok()
    }

    /// Send the seed or account selection. Firmware 0.5 and newer carries
    /// the seed in every request and needs none.
    fn select(
        &self,
        generation: FirmwareGeneration,
        path: &DerivationPath,
        security: SecurityLevel,
    ) -> Result<(), LedgerError> {
        match (generation, self.mode) {
            (FirmwareGeneration::Legacy, _) => commands::set_seed::exec(&self.proto, path, security),
            (FirmwareGeneration::Current, _) => Ok(()),
            (FirmwareGeneration::Stardust, Some(mode)) => {
                let (account, _) = account_and_change(path);
                commands::set_account::exec(&self.proto, account, mode)
            }
            (FirmwareGeneration::Stardust, None) => Err(LedgerError::Unsupported(
                "Stardust session without an app mode".into(),
            )),
        }
    }

    fn active_session(&self) -> Result<Session, LedgerError> {
        if self.state == DeviceState::BundleInProgress {
            return Err(LedgerError::ResetRequired);
        }
        self.session.clone().ok_or(LedgerError::SessionNotActive)
    }
}

/// Account and change of a path accepted by [`check_stardust_path`].
fn account_and_change(path: &DerivationPath) -> (u32, u32) {
    let c = path.components();
    (c[2], c[3])
}

fn check_stardust_path(path: &DerivationPath, mode: AppMode) -> Result<(), LedgerError> {
    let c = path.components();
    let prefix = [44 | HARDENED, mode.coin_type() | HARDENED];
    if c.len() != 4 || c[..2] != prefix || c.iter().any(|v| v & HARDENED == 0) {
        return Err(LedgerError::InvalidArgument(format!(
            "Stardust path must be 44'/{}'/account'/change', got {path}",
            mode.coin_type()
        )));
    }
    Ok(())
}
