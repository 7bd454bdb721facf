use bech32::{ToBase32, Variant};
use log::debug;

use crate::apdu::{Instruction, Timeout};
use crate::codec::{Schema, Value};
use crate::error::LedgerError;
use crate::protocol::chunks::{self, DataType};
use crate::protocol::CommandTransport;
use crate::types::{AppMode, HARDENED};

/// Address type byte followed by the 32-byte Ed25519 address hash.
pub const ADDRESS_LENGTH: usize = 33;

fn schema() -> Schema {
    Schema::new()
        .u32("bip32_index")
        .u32("bip32_change")
        .u32("count")
}

pub fn request(change: u32, index: u32) -> Vec<u8> {
    schema().encode(&[
        Value::from(index | HARDENED),
        Value::from(change),
        Value::from(1u32),
    ])
}

/// Generate one address on the Stardust app and read it back from the data
/// buffer, bech32-encoded for the network of `mode`.
///
/// The device may prompt even without `display`, so this always waits with
/// the interactive timeout.
pub fn exec(
    proto: &CommandTransport,
    change: u32,
    index: u32,
    display: bool,
    mode: AppMode,
) -> Result<String, LedgerError> {
    proto.send(
        Instruction::GenAddress,
        u8::from(display),
        0,
        request(change, index),
        Timeout::Interactive,
    )?;

    let (state, data) = chunks::read_all(proto)?;
    if state.data_type != DataType::GeneratedAddress {
        return Err(LedgerError::MalformedResponse(format!(
            "data buffer holds {:?}, expected a generated address",
            state.data_type
        )));
    }
    let address = encode_address(&data, mode)?;
    debug!("generated address {address}");
    Ok(address)
}

pub(crate) fn encode_address(data: &[u8], mode: AppMode) -> Result<String, LedgerError> {
    if data.len() < ADDRESS_LENGTH {
        return Err(LedgerError::MalformedResponse(format!(
            "generated address has {} bytes, expected {ADDRESS_LENGTH}",
            data.len()
        )));
    }
    let bytes: &[u8] = &data[..ADDRESS_LENGTH];
    bech32::encode(mode.hrp(), bytes.to_base32(), Variant::Bech32)
        .map_err(|e| LedgerError::MalformedResponse(format!("bech32: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::FromBase32;

    #[test]
    fn request_hardens_index() {
        let data = request(0x8000_0000, 2);
        assert_eq!(
            data,
            vec![
                0x02, 0x00, 0x00, 0x80, // index
                0x00, 0x00, 0x00, 0x80, // change
                0x01, 0x00, 0x00, 0x00, // count
            ]
        );
    }

    #[test]
    fn encode_with_network_prefix() {
        let data = [0u8; ADDRESS_LENGTH];
        let iota = encode_address(&data, AppMode::IotaStardust).unwrap();
        let smr = encode_address(&data, AppMode::Shimmer).unwrap();
        assert!(iota.starts_with("iota1"));
        assert!(smr.starts_with("smr1"));

        let (hrp, decoded, variant) = bech32::decode(&iota).unwrap();
        assert_eq!(hrp, "iota");
        assert_eq!(variant, Variant::Bech32);
        assert_eq!(Vec::<u8>::from_base32(&decoded).unwrap(), data.to_vec());
    }

    #[test]
    fn short_address_is_malformed() {
        let err = encode_address(&[0u8; 32], AppMode::IotaStardust).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedResponse(_)));
    }

    #[test]
    fn request_round_trip() {
        let bytes = request(0x8000_0000, 4);
        let rec = schema().decode(&bytes).unwrap();
        assert_eq!(rec.uint("bip32_index").unwrap(), 0x8000_0004);
        assert_eq!(rec.uint("bip32_change").unwrap(), 0x8000_0000);
        assert_eq!(rec.uint("count").unwrap(), 1);
    }
}
