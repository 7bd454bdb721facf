use crate::apdu::{Instruction, Timeout};
use crate::codec::{Kind, Schema, Value};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::types::{DerivationPath, SecurityLevel};

/// Seed selection header: `[security u8][path_len u32][path u32 * n]`.
///
/// Sent alone as SET_SEED on firmware before 0.5, and as a prefix of PUBKEY
/// and the first TX on newer firmware.
pub fn seed_schema(path_len: usize) -> Schema {
    Schema::new()
        .u8("security")
        .u32("path_length")
        .array("path", path_len, Kind::U32)
}

pub fn seed_values(path: &DerivationPath, security: SecurityLevel) -> Vec<Value> {
    vec![
        Value::from(security.level()),
        Value::from(path.len() as u32),
        Value::from(path.components().to_vec()),
    ]
}

pub fn exec(
    proto: &CommandTransport,
    path: &DerivationPath,
    security: SecurityLevel,
) -> Result<(), LedgerError> {
    let data = seed_schema(path.len()).encode(&seed_values(path, security));
    proto.send(Instruction::SetSeed, 0, 0, data, Timeout::NonInteractive)?;
    Ok(())
}
