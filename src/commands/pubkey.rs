use crate::apdu::{Instruction, Timeout};
use crate::bundle::{is_address, HASH_LENGTH};
use crate::codec::{Schema, Value};
use crate::commands::set_seed::{seed_schema, seed_values};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::types::{DerivationPath, FirmwareGeneration, SecurityLevel};

/// Shows the address on the device screen.
pub const P1_DISPLAY: u8 = 0x01;

/// Firmware before 0.5 only takes the index; newer firmware wants the seed
/// header in front of it.
pub fn request(
    generation: FirmwareGeneration,
    path: &DerivationPath,
    security: SecurityLevel,
    index: u32,
) -> Result<Vec<u8>, LedgerError> {
    match generation {
        FirmwareGeneration::Legacy => Ok(Schema::new().u32("index").encode(&[Value::from(index)])),
        FirmwareGeneration::Current => {
            let mut values = seed_values(path, security);
            values.push(Value::from(index));
            Ok(seed_schema(path.len()).u32("index").encode(&values))
        }
        FirmwareGeneration::Stardust => Err(LedgerError::Unsupported(
            "PUBKEY is a trinary app command".into(),
        )),
    }
}

/// Response: `[address chars(81)]`
pub fn exec(
    proto: &CommandTransport,
    generation: FirmwareGeneration,
    path: &DerivationPath,
    security: SecurityLevel,
    index: u32,
    display: bool,
) -> Result<String, LedgerError> {
    let data = request(generation, path, security, index)?;
    let (p1, timeout) = if display {
        (P1_DISPLAY, Timeout::Interactive)
    } else {
        (0x00, Timeout::NonInteractive)
    };
    let result = proto.send(Instruction::Pubkey, p1, 0, data, timeout)?;
    parse_address(&result)
}

pub(crate) fn parse_address(data: &[u8]) -> Result<String, LedgerError> {
    let rec = Schema::new()
        .chars("address", HASH_LENGTH, b'9')
        .decode(data)?;
    let address = rec.chars("address")?;
    if !is_address(address) {
        return Err(LedgerError::MalformedResponse(format!(
            "device returned an invalid address: {address:?}"
        )));
    }
    Ok(address.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_request_is_index_only() {
        let path = DerivationPath::iota(0, 0);
        let data = request(FirmwareGeneration::Legacy, &path, SecurityLevel::Low, 7).unwrap();
        assert_eq!(data, vec![7, 0, 0, 0]);
    }

    #[test]
    fn current_request_has_seed_header() {
        let path = DerivationPath::iota(0, 0);
        let data = request(FirmwareGeneration::Current, &path, SecurityLevel::High, 5).unwrap();
        assert_eq!(data.len(), 1 + 4 + 16 + 4);
        assert_eq!(data[0], 3);
        assert_eq!(&data[1..5], &[4, 0, 0, 0]);
        assert_eq!(&data[21..], &[5, 0, 0, 0]);
    }

    #[test]
    fn stardust_has_no_pubkey() {
        let path = DerivationPath::iota(0, 0);
        let err = request(FirmwareGeneration::Stardust, &path, SecurityLevel::Low, 0).unwrap_err();
        assert!(matches!(err, LedgerError::Unsupported(_)));
    }

    #[test]
    fn parse_valid_address() {
        let addr = "ABC".repeat(27);
        assert_eq!(parse_address(addr.as_bytes()).unwrap(), addr);
    }

    #[test]
    fn parse_rejects_short_and_garbage() {
        assert!(matches!(
            parse_address(&[b'A'; 80]),
            Err(LedgerError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_address(&[b'a'; 81]),
            Err(LedgerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn current_request_round_trip() {
        let path = DerivationPath::iota(1, 1);
        let bytes = request(FirmwareGeneration::Current, &path, SecurityLevel::Medium, 42).unwrap();
        let mut values = seed_values(&path, SecurityLevel::Medium);
        values.push(Value::from(42u32));
        let rec = seed_schema(path.len()).u32("index").decode(&bytes).unwrap();
        assert_eq!(rec.into_values(), values);
    }
}
