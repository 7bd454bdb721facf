//! Bundle data model and the external bundle/checksum contracts.
//!
//! The driver never computes bundle hashes or checksums itself. Callers plug
//! in an implementation of [`BundleBuilder`] (and [`Checksum`] for
//! checksummed addresses) backed by their IOTA library of choice.

/// Trytes in an address or hash.
pub const HASH_LENGTH: usize = 81;

/// Trytes in an address followed by its checksum.
pub const ADDRESS_WITH_CHECKSUM_LENGTH: usize = HASH_LENGTH + 9;

/// Trytes in a tag.
pub const TAG_LENGTH: usize = 27;

/// Trytes of signature carried by one transaction.
pub const SIGNATURE_FRAGMENT_LENGTH: usize = 27 * HASH_LENGTH;

/// Largest value a transfer or input may carry (total IOTA supply).
pub const MAX_VALUE: u64 = 2_779_530_283_277_761;

/// Tag of all-`9` trytes.
pub const EMPTY_TAG: &str = "999999999999999999999999999";

/// Payment to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// 81 trytes, or 90 with checksum.
    pub address: String,
    pub value: u64,
    /// Up to 27 trytes, padded with `9`.
    pub tag: String,
}

/// Address funding the bundle, owned by the active seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub address: String,
    pub balance: u64,
    pub key_index: u32,
}

/// Seed-owned address receiving the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remainder {
    pub address: String,
    pub key_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub address: String,
    /// Negative for spends, positive for receipts, zero for meta
    /// transactions.
    pub value: i64,
    pub obsolete_tag: String,
    pub current_index: u32,
    pub last_index: u32,
    pub timestamp: u64,
    pub signature_message_fragment: Option<String>,
    /// Bundle hash, set by the builder on finalization.
    pub bundle: Option<String>,
}

impl Transaction {
    pub fn is_spend(&self) -> bool {
        self.value < 0
    }
}

/// Finalized, ordered transactions. The device fills in signatures of the
/// spend and meta transactions in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    pub transactions: Vec<Transaction>,
}

impl Bundle {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Hash computed by the builder, taken from the first transaction.
    pub fn hash(&self) -> Option<&str> {
        self.transactions.first().and_then(|tx| tx.bundle.as_deref())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// External bundle construction (entry layout, bundle hash, serialization).
pub trait BundleBuilder {
    /// Add one entry spanning `signature_length` transactions: the first
    /// carries `value`, the rest are zero-value meta transactions to the
    /// same address. `key_index` is `None` for outputs.
    fn add_entry(
        &mut self,
        signature_length: u8,
        address: &str,
        value: i64,
        tag: &str,
        timestamp: u64,
        key_index: Option<u32>,
    );

    /// Set the signature/message fragments, empty for unsigned bundles.
    fn add_trytes(&mut self, fragments: &[String]);

    /// Assign indices and compute the bundle hash.
    fn finalize(&mut self) -> Bundle;

    /// Serialize one transaction to its 2673-tryte wire form.
    fn transaction_trytes(&self, tx: &Transaction) -> String;
}

/// External trinary checksum routine.
pub trait Checksum {
    /// Return `address` with its 9-tryte checksum appended.
    fn add_checksum(&self, address: &str) -> String;
}

/// Drop the checksum of a 90-tryte address; other lengths pass unchanged.
pub fn strip_checksum(address: &str) -> &str {
    if address.len() == ADDRESS_WITH_CHECKSUM_LENGTH {
        &address[..HASH_LENGTH]
    } else {
        address
    }
}

/// `true` for a non-empty string over the tryte alphabet `[9A-Z]`.
pub fn is_trytes(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b == b'9' || b.is_ascii_uppercase())
}

/// `true` for an address of 81 trytes, or 90 with checksum.
pub fn is_address(s: &str) -> bool {
    (s.len() == HASH_LENGTH || s.len() == ADDRESS_WITH_CHECKSUM_LENGTH) && is_trytes(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tag_width() {
        assert_eq!(EMPTY_TAG.len(), TAG_LENGTH);
        assert!(is_trytes(EMPTY_TAG));
    }

    #[test]
    fn strip_checksum_only_touches_90_trytes() {
        let addr = "A".repeat(81);
        let with = format!("{addr}ABCDEFGHI");
        assert_eq!(strip_checksum(&with), addr);
        assert_eq!(strip_checksum(&addr), addr);
    }

    #[test]
    fn tryte_alphabet() {
        assert!(is_trytes("ABC9XYZ"));
        assert!(!is_trytes("abc"));
        assert!(!is_trytes("AB1"));
        assert!(!is_trytes(""));
    }

    #[test]
    fn address_lengths() {
        assert!(is_address(&"9".repeat(81)));
        assert!(is_address(&"9".repeat(90)));
        assert!(!is_address(&"9".repeat(80)));
        assert!(!is_address(&"9".repeat(89)));
    }

    #[test]
    fn bundle_hash_from_first_tx() {
        let tx = Transaction {
            address: "9".repeat(81),
            value: 0,
            obsolete_tag: EMPTY_TAG.into(),
            current_index: 0,
            last_index: 0,
            timestamp: 0,
            signature_message_fragment: None,
            bundle: Some("H".repeat(81)),
        };
        assert_eq!(Bundle::new(vec![tx]).hash(), Some("H".repeat(81).as_str()));
        assert_eq!(Bundle::default().hash(), None);
    }
}
