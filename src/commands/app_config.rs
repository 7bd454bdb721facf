use log::debug;

use crate::apdu::{Instruction, Timeout, CLA_STARDUST};
use crate::codec::Schema;
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::types::{AppConfig, AppFlags, AppVersion};

/// Trinary app 0.5 and newer: `[major][minor][patch][max_bundle_size][flags]`
fn trinary_schema() -> Schema {
    Schema::new()
        .u8("app_version_major")
        .u8("app_version_minor")
        .u8("app_version_patch")
        .u8("app_max_bundle_size")
        .u8("app_flags")
}

/// Trinary app before 0.5: `[flags][major][minor][patch]`
fn legacy_schema() -> Schema {
    Schema::new()
        .u8("app_flags")
        .u8("app_version_major")
        .u8("app_version_minor")
        .u8("app_version_patch")
}

/// Stardust app: `[major][minor][patch][flags][device][debug]`
fn stardust_schema() -> Schema {
    Schema::new()
        .u8("app_version_major")
        .u8("app_version_minor")
        .u8("app_version_patch")
        .u8("app_flags")
        .u8("device")
        .u8("debug")
}

pub fn exec(proto: &CommandTransport) -> Result<AppConfig, LedgerError> {
    let data = proto.send(
        Instruction::GetAppConfig,
        0,
        0,
        Vec::new(),
        Timeout::NonInteractive,
    )?;
    if proto.cla() == CLA_STARDUST {
        parse_stardust(&data)
    } else {
        parse_trinary(&data)
    }
}

/// The layout is picked by length: anything shorter than the current
/// layout is read as the legacy one.
pub(crate) fn parse_trinary(data: &[u8]) -> Result<AppConfig, LedgerError> {
    let current = trinary_schema();
    if data.len() >= current.width() {
        let rec = current.decode(data)?;
        return Ok(AppConfig {
            version: version_of(&rec)?,
            flags: AppFlags(rec.uint("app_flags")? as u8),
            max_bundle_size: Some(rec.uint("app_max_bundle_size")? as u8),
        });
    }

    let rec = legacy_schema().decode(data)?;
    Ok(AppConfig {
        version: version_of(&rec)?,
        flags: AppFlags(rec.uint("app_flags")? as u8),
        max_bundle_size: None,
    })
}

pub(crate) fn parse_stardust(data: &[u8]) -> Result<AppConfig, LedgerError> {
    let rec = stardust_schema().decode(data)?;
    debug!(
        "stardust app on device {:#04x}, debug build: {}",
        rec.uint("device")?,
        rec.uint("debug")? != 0
    );
    Ok(AppConfig {
        version: version_of(&rec)?,
        flags: AppFlags(rec.uint("app_flags")? as u8),
        max_bundle_size: None,
    })
}

fn version_of(rec: &crate::codec::Record) -> Result<AppVersion, LedgerError> {
    Ok(AppVersion::new(
        rec.uint("app_version_major")? as u8,
        rec.uint("app_version_minor")? as u8,
        rec.uint("app_version_patch")? as u8,
    ))
}
