//! Pre-flight checks on caller input, run before any device I/O.
//!
//! [`prepare`] validates and normalizes transfers, inputs and remainder
//! into new values; the caller's data is never modified.

use std::collections::HashSet;

use crate::bundle::{
    is_address, is_trytes, strip_checksum, Input, Remainder, Transfer, EMPTY_TAG, MAX_VALUE,
    TAG_LENGTH,
};
use crate::error::LedgerError;
use crate::types::{FirmwareGeneration, SecurityLevel};

/// Inputs the trinary app before 0.5 can sign in one bundle.
const LEGACY_MAX_INPUTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransfer {
    pub address: String,
    pub value: u64,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInput {
    pub address: String,
    pub balance: u64,
    pub key_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRemainder {
    pub address: String,
    pub value: u64,
    pub key_index: u32,
}

/// Normalized bundle content, ready for the bundle builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub transfers: Vec<PreparedTransfer>,
    pub inputs: Vec<PreparedInput>,
    pub remainder: Option<PreparedRemainder>,
}

impl Prepared {
    /// Transactions the bundle will contain, meta transactions included.
    pub fn bundle_size(&self, security: SecurityLevel) -> usize {
        self.transfers.len()
            + self.inputs.len() * security.level() as usize
            + usize::from(self.remainder.is_some())
    }
}

/// Limits the app on the device can handle.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub generation: FirmwareGeneration,
    pub max_bundle_size: usize,
}

pub fn validate_transfers(transfers: &[Transfer]) -> Result<(), LedgerError> {
    if transfers.is_empty() {
        return Err(invalid("at least one transfer required"));
    }
    for t in transfers {
        if !is_address(&t.address) {
            return Err(invalid(&format!("invalid transfer address {:?}", t.address)));
        }
        if t.value > MAX_VALUE {
            return Err(invalid(&format!("transfer value {} out of range", t.value)));
        }
        if !is_tag(&t.tag) {
            return Err(invalid(&format!("invalid transfer tag {:?}", t.tag)));
        }
    }
    Ok(())
}

pub fn validate_inputs(inputs: &[Input]) -> Result<(), LedgerError> {
    for i in inputs {
        if !is_address(&i.address) {
            return Err(invalid(&format!("invalid input address {:?}", i.address)));
        }
        if i.balance > MAX_VALUE {
            return Err(invalid(&format!("input balance {} out of range", i.balance)));
        }
    }
    Ok(())
}

pub fn validate_remainder(remainder: &Remainder) -> Result<(), LedgerError> {
    if !is_address(&remainder.address) {
        return Err(invalid(&format!(
            "invalid remainder address {:?}",
            remainder.address
        )));
    }
    Ok(())
}

/// Remainder value implied by the inputs and transfers: `None` when they
/// balance exactly.
pub fn reconcile(
    inputs: &[Input],
    transfers: &[Transfer],
    remainder: Option<&Remainder>,
) -> Result<Option<u64>, LedgerError> {
    let balance = total(inputs.iter().map(|i| i.balance), "input balance")?;
    let payment = total(transfers.iter().map(|t| t.value), "transfer value")?;

    if balance == payment {
        return Ok(None);
    }
    if balance < payment {
        return Err(LedgerError::InsufficientBalance { balance, payment });
    }
    if remainder.is_none() {
        return Err(LedgerError::RemainderRequired);
    }
    Ok(Some(balance - payment))
}

/// Fails with [`LedgerError::DuplicateAddress`] when any address appears
/// more than once across transfers, inputs and remainder.
pub fn check_duplicates(prepared: &Prepared) -> Result<(), LedgerError> {
    let mut seen = HashSet::new();
    let addresses = prepared
        .transfers
        .iter()
        .map(|t| &t.address)
        .chain(prepared.inputs.iter().map(|i| &i.address))
        .chain(prepared.remainder.iter().map(|r| &r.address));

    for address in addresses {
        if !seen.insert(address) {
            return Err(LedgerError::DuplicateAddress(address.clone()));
        }
    }
    Ok(())
}

/// Validate caller input and produce the normalized bundle content.
///
/// Zero-balance inputs are dropped. A remainder is ignored when inputs and
/// transfers balance exactly.
pub fn prepare(
    transfers: &[Transfer],
    inputs: &[Input],
    remainder: Option<&Remainder>,
    security: SecurityLevel,
    limits: Limits,
) -> Result<Prepared, LedgerError> {
    validate_transfers(transfers)?;
    validate_inputs(inputs)?;

    let inputs: Vec<Input> = inputs.iter().filter(|i| i.balance > 0).cloned().collect();
    if inputs.is_empty() {
        return Err(invalid("at least one input required"));
    }

    if transfers.len() > 1 {
        return Err(LedgerError::UnsupportedCardinality(format!(
            "{} transfers (max 1)",
            transfers.len()
        )));
    }
    if limits.generation == FirmwareGeneration::Legacy && inputs.len() > LEGACY_MAX_INPUTS {
        return Err(LedgerError::UnsupportedCardinality(format!(
            "{} inputs (max {LEGACY_MAX_INPUTS})",
            inputs.len()
        )));
    }

    let remainder_value = reconcile(&inputs, transfers, remainder)?;
    let remainder = match (remainder, remainder_value) {
        (Some(r), Some(value)) => {
            validate_remainder(r)?;
            Some(PreparedRemainder {
                address: strip_checksum(&r.address).to_owned(),
                value,
                key_index: r.key_index,
            })
        }
        _ => None,
    };

    let prepared = Prepared {
        transfers: transfers
            .iter()
            .map(|t| PreparedTransfer {
                address: strip_checksum(&t.address).to_owned(),
                value: t.value,
                tag: pad_tag(&t.tag),
            })
            .collect(),
        inputs: inputs
            .iter()
            .map(|i| PreparedInput {
                address: strip_checksum(&i.address).to_owned(),
                balance: i.balance,
                key_index: i.key_index,
            })
            .collect(),
        remainder,
    };

    check_duplicates(&prepared)?;

    let size = prepared.bundle_size(security);
    if size > limits.max_bundle_size {
        return Err(LedgerError::UnsupportedCardinality(format!(
            "bundle of {size} transactions exceeds the app maximum of {}",
            limits.max_bundle_size
        )));
    }

    Ok(prepared)
}

fn total(mut values: impl Iterator<Item = u64>, what: &str) -> Result<u64, LedgerError> {
    values
        .try_fold(0u64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| invalid(&format!("total {what} overflows")))
}

fn is_tag(tag: &str) -> bool {
    tag.is_empty() || (tag.len() <= TAG_LENGTH && is_trytes(tag))
}

fn pad_tag(tag: &str) -> String {
    let mut padded = tag.to_owned();
    padded.push_str(&EMPTY_TAG[tag.len()..]);
    padded
}

fn invalid(msg: &str) -> LedgerError {
    LedgerError::InvalidArgument(msg.to_owned())
}
