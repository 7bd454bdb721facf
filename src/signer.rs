//! Bundle signing on the trinary app.
//!
//! The device must see every transaction of a finalized bundle, in order,
//! before it hands out any signature. Signing then happens per spend in
//! 243-tryte slices, and the full signature is spread over the spend and
//! the meta transactions that follow it.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::apdu::Timeout;
use crate::bundle::{is_trytes, Bundle, HASH_LENGTH, SIGNATURE_FRAGMENT_LENGTH, TAG_LENGTH};
use crate::commands::sign::{self, SIGNATURE_SLICE_LENGTH};
use crate::commands::tx::{self, TxRequest, TxResponse, P1_FIRST, P1_MORE};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::types::{DerivationPath, FirmwareGeneration, SecurityLevel};

pub struct BundleSigner<'a> {
    proto: &'a CommandTransport,
    generation: FirmwareGeneration,
    path: &'a DerivationPath,
    security: SecurityLevel,
}

impl<'a> BundleSigner<'a> {
    pub fn new(
        proto: &'a CommandTransport,
        generation: FirmwareGeneration,
        path: &'a DerivationPath,
        security: SecurityLevel,
    ) -> Self {
        Self {
            proto,
            generation,
            path,
            security,
        }
    }

    /// Submit `bundle` to the device and fill in the signatures of its
    /// spends. `expected` is the hash returned by [`check_bundle`].
    /// `key_indices` maps seed-owned addresses to their key index; any other
    /// address is sent with index 0.
    pub fn sign(
        &self,
        mut bundle: Bundle,
        expected: String,
        key_indices: &HashMap<String, u32>,
    ) -> Result<Bundle, LedgerError> {
        let last = self.submit(&bundle, key_indices)?;
        if !last.finalized {
            return Err(LedgerError::BundleNotFinalized);
        }
        if last.bundle_hash != expected {
            return Err(LedgerError::BundleHashMismatch {
                device: last.bundle_hash,
                expected,
            });
        }
        info!("device accepted bundle {expected}");

        let spends: Vec<usize> = bundle
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.is_spend())
            .map(|(i, _)| i)
            .collect();

        for spend in spends {
            let index = bundle.transactions[spend].current_index;
            let signature = self.signature(index)?;
            attach_signature(&mut bundle, spend, &signature);
        }
        Ok(bundle)
    }

    /// Send every transaction; returns the device's answer to the last one.
    fn submit(
        &self,
        bundle: &Bundle,
        key_indices: &HashMap<String, u32>,
    ) -> Result<TxResponse, LedgerError> {
        let mut response = None;
        for (i, t) in bundle.transactions.iter().enumerate() {
            let first = i == 0;
            let (seed, p1) = match self.generation {
                FirmwareGeneration::Current if first => {
                    (Some((self.path, self.security)), P1_FIRST)
                }
                FirmwareGeneration::Current => (None, P1_MORE),
                _ => (None, 0x00),
            };
            let timeout = if t.current_index == t.last_index {
                Timeout::Interactive
            } else {
                Timeout::NonInteractive
            };

            let req = TxRequest {
                address: &t.address,
                address_idx: key_indices.get(&t.address).copied().unwrap_or(0),
                value: t.value,
                tag: &t.obsolete_tag,
                tx_idx: t.current_index,
                tx_len: t.last_index,
                time: t.timestamp as u32,
            };
            debug!(
                "TX {}/{} value={} key_index={}",
                req.tx_idx, req.tx_len, req.value, req.address_idx
            );
            response = Some(tx::exec(self.proto, &req, seed, p1, timeout)?);
        }
        response.ok_or_else(|| LedgerError::InvalidArgument("empty bundle".into()))
    }

    /// Pull the full signature for the spend at `index`, slice by slice.
    fn signature(&self, index: u32) -> Result<String, LedgerError> {
        let slices = usize::from(self.security.level()) * SIGNATURE_FRAGMENT_LENGTH
            / SIGNATURE_SLICE_LENGTH;
        let mut signature = String::with_capacity(slices * SIGNATURE_SLICE_LENGTH);

        for i in 1..=slices {
            let slice = sign::exec(self.proto, index)?;
            let done = slice.fragments_remaining == 0;
            if (i == slices) != done {
                let remaining = usize::try_from(slice.fragments_remaining).unwrap_or(0);
                return Err(LedgerError::SignatureLengthMismatch {
                    expected: slices,
                    received: i + remaining,
                });
            }
            signature.push_str(&slice.signature);
        }
        debug!("got {slices} signature slices for tx {index}");
        Ok(signature)
    }
}

/// Rejects bundles the device would misread: indices out of order, a
/// varying last index, fields that do not fit the TX layout, or a missing
/// bundle hash. Returns the hash the device must confirm.
pub fn check_bundle(bundle: &Bundle) -> Result<String, LedgerError> {
    if bundle.is_empty() {
        return Err(LedgerError::InvalidArgument("empty bundle".into()));
    }
    let last_index = bundle.len() - 1;
    for (i, t) in bundle.transactions.iter().enumerate() {
        if t.current_index as usize != i || t.last_index as usize != last_index {
            return Err(LedgerError::InvalidArgument(format!(
                "transaction {i} has index {}/{}, expected {i}/{last_index}",
                t.current_index, t.last_index
            )));
        }
        if t.address.len() != HASH_LENGTH || !is_trytes(&t.address) {
            return Err(LedgerError::InvalidArgument(format!(
                "transaction {i} has an invalid address"
            )));
        }
        if t.obsolete_tag.len() > TAG_LENGTH
            || !(t.obsolete_tag.is_empty() || is_trytes(&t.obsolete_tag))
        {
            return Err(LedgerError::InvalidArgument(format!(
                "transaction {i} has an invalid tag"
            )));
        }
        if u32::try_from(t.timestamp).is_err() {
            return Err(LedgerError::InvalidArgument(format!(
                "transaction {i} timestamp {} out of range",
                t.timestamp
            )));
        }
    }
    bundle
        .hash()
        .filter(|hash| hash.len() == HASH_LENGTH && is_trytes(hash))
        .map(str::to_owned)
        .ok_or_else(|| LedgerError::InvalidArgument("bundle is not finalized".into()))
}

/// Split `signature` into fragments: the first goes to the spend, each
/// further one to the next transaction if it is a zero-value transaction
/// to the same address. Returns the number of fragments placed.
pub fn attach_signature(bundle: &mut Bundle, spend: usize, signature: &str) -> usize {
    let address = bundle.transactions[spend].address.clone();
    let mut placed = 0;

    for (n, fragment) in signature
        .as_bytes()
        .chunks(SIGNATURE_FRAGMENT_LENGTH)
        .enumerate()
    {
        let target = spend + n;
        let fits = n == 0
            || bundle
                .transactions
                .get(target)
                .is_some_and(|t| t.address == address && t.value == 0);
        if !fits {
            warn!(
                "no meta transaction for signature fragment {n} of tx {spend}, dropping the rest"
            );
            break;
        }
        bundle.transactions[target].signature_message_fragment =
            Some(String::from_utf8_lossy(fragment).into_owned());
        placed += 1;
    }
    placed
}
