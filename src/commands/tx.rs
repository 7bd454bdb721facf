use crate::apdu::{Instruction, Timeout};
use crate::bundle::{HASH_LENGTH, TAG_LENGTH};
use crate::codec::{Schema, Value};
use crate::commands::set_seed::{seed_schema, seed_values};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::types::{DerivationPath, SecurityLevel};

/// First TX of a bundle on firmware 0.5 and newer.
pub const P1_FIRST: u8 = 0x00;
/// Any following TX on firmware 0.5 and newer.
pub const P1_MORE: u8 = 0x80;

/// One transaction as the device sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest<'a> {
    pub address: &'a str,
    pub address_idx: u32,
    pub value: i64,
    pub tag: &'a str,
    pub tx_idx: u32,
    /// Index of the last transaction, not the bundle length.
    pub tx_len: u32,
    pub time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    pub finalized: bool,
    pub bundle_hash: String,
}

fn tx_schema() -> Schema {
    Schema::new()
        .chars("address", HASH_LENGTH, b'9')
        .u32("address_idx")
        .i64("value")
        .chars("tag", TAG_LENGTH, b'9')
        .u32("tx_idx")
        .u32("tx_len")
        .u32("time")
}

fn response_schema() -> Schema {
    Schema::new()
        .u8("finalized")
        .chars("bundle_hash", HASH_LENGTH, b'9')
}

/// Encode a TX body, optionally prefixed with the seed header.
pub fn request(tx: &TxRequest<'_>, seed: Option<(&DerivationPath, SecurityLevel)>) -> Vec<u8> {
    let body = vec![
        Value::from(tx.address),
        Value::from(tx.address_idx),
        Value::from(tx.value),
        Value::from(tx.tag),
        Value::from(tx.tx_idx),
        Value::from(tx.tx_len),
        Value::from(tx.time),
    ];
    match seed {
        Some((path, security)) => {
            let mut values = seed_values(path, security);
            values.extend(body);
            seed_schema(path.len()).extend(tx_schema()).encode(&values)
        }
        None => tx_schema().encode(&body),
    }
}

/// Response: `[finalized u8][bundle_hash chars(81)]`
pub fn exec(
    proto: &CommandTransport,
    tx: &TxRequest<'_>,
    seed: Option<(&DerivationPath, SecurityLevel)>,
    p1: u8,
    timeout: Timeout,
) -> Result<TxResponse, LedgerError> {
    let data = request(tx, seed);
    let result = proto.send(Instruction::Tx, p1, 0, data, timeout)?;
    parse_tx_response(&result)
}

pub(crate) fn parse_tx_response(data: &[u8]) -> Result<TxResponse, LedgerError> {
    let rec = response_schema().decode(data)?;
    Ok(TxResponse {
        finalized: rec.uint("finalized")? != 0,
        bundle_hash: rec.chars("bundle_hash")?.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TxRequest<'static> {
        TxRequest {
            address: "ADDRESS",
            address_idx: 3,
            value: -5,
            tag: "",
            tx_idx: 1,
            tx_len: 3,
            time: 0x0102_0304,
        }
    }

    #[test]
    fn body_layout() {
        let data = request(&sample(), None);
        assert_eq!(data.len(), 81 + 4 + 8 + 27 + 4 + 4 + 4);
        assert_eq!(&data[..7], b"ADDRESS");
        assert!(data[7..81].iter().all(|&b| b == b'9'));
        assert_eq!(&data[81..85], &[3, 0, 0, 0]);
        assert_eq!(&data[85..93], &(-5i64).to_le_bytes());
        assert!(data[93..120].iter().all(|&b| b == b'9'));
        assert_eq!(&data[120..124], &[1, 0, 0, 0]);
        assert_eq!(&data[124..128], &[3, 0, 0, 0]);
        assert_eq!(&data[128..132], &[4, 3, 2, 1]);
    }

    #[test]
    fn seed_header_prefix() {
        let path = DerivationPath::iota(0, 0);
        let plain = request(&sample(), None);
        let with_seed = request(&sample(), Some((&path, SecurityLevel::Medium)));
        assert_eq!(with_seed.len(), plain.len() + 1 + 4 + 16);
        assert_eq!(with_seed[0], 2);
        assert_eq!(&with_seed[21..], plain.as_slice());
    }

    #[test]
    fn parse_response() {
        let mut data = vec![1];
        data.extend_from_slice("H".repeat(81).as_bytes());
        let resp = parse_tx_response(&data).unwrap();
        assert!(resp.finalized);
        assert_eq!(resp.bundle_hash, "H".repeat(81));

        data[0] = 0;
        assert!(!parse_tx_response(&data).unwrap().finalized);
    }

    #[test]
    fn parse_short_response() {
        let err = parse_tx_response(&[1, b'A']).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedResponse(_)));
    }

    #[test]
    fn request_round_trip() {
        let path = DerivationPath::iota(2, 0);
        let address = "A".repeat(81);
        let tag = "TAG".to_string() + &"9".repeat(24);
        let tx = TxRequest {
            address: &address,
            address_idx: 9,
            value: -2_779_530_283_277_761,
            tag: &tag,
            tx_idx: 2,
            tx_len: 3,
            time: u32::MAX,
        };
        let schema = seed_schema(path.len()).extend(tx_schema());
        let bytes = request(&tx, Some((&path, SecurityLevel::Low)));
        assert_eq!(bytes.len(), schema.width());

        let rec = schema.decode(&bytes).unwrap();
        assert_eq!(rec.uint("security").unwrap(), 1);
        assert_eq!(rec.list("path").unwrap().len(), 4);
        assert_eq!(rec.chars("address").unwrap(), address);
        assert_eq!(rec.uint("address_idx").unwrap(), 9);
        assert_eq!(rec.int("value").unwrap(), -2_779_530_283_277_761);
        assert_eq!(rec.chars("tag").unwrap(), tag);
        assert_eq!(rec.uint("tx_idx").unwrap(), 2);
        assert_eq!(rec.uint("tx_len").unwrap(), 3);
        assert_eq!(rec.uint("time").unwrap(), u64::from(u32::MAX));
    }

    #[test]
    fn response_round_trip() {
        let hash = "H9".repeat(40) + "9";
        let bytes = response_schema().encode(&[Value::from(1u8), Value::from(hash.as_str())]);
        assert_eq!(
            parse_tx_response(&bytes).unwrap(),
            TxResponse {
                finalized: true,
                bundle_hash: hash,
            }
        );
        for len in 0..bytes.len() {
            assert!(matches!(
                parse_tx_response(&bytes[..len]),
                Err(LedgerError::MalformedResponse(_))
            ));
        }
    }
}
