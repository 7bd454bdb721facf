use crate::apdu::{Instruction, Timeout};
use crate::codec::{Schema, Value};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;

/// Trytes of signature returned per SIGN call.
pub const SIGNATURE_SLICE_LENGTH: usize = 243;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSlice {
    pub signature: String,
    /// Slices still to come after this one.
    pub fragments_remaining: i8,
}

fn response_schema() -> Schema {
    Schema::new()
        .chars("signature", SIGNATURE_SLICE_LENGTH, b'9')
        .i8("fragments_remaining")
}

fn request_schema() -> Schema {
    Schema::new().u32("index")
}

pub fn request(index: u32) -> Vec<u8> {
    request_schema().encode(&[Value::from(index)])
}

/// Fetch the next signature slice for the transaction at `index`.
pub fn exec(proto: &CommandTransport, index: u32) -> Result<SignatureSlice, LedgerError> {
    let result = proto.send(Instruction::Sign, 0, 0, request(index), Timeout::NonInteractive)?;
    parse_signature(&result)
}

pub(crate) fn parse_signature(data: &[u8]) -> Result<SignatureSlice, LedgerError> {
    let rec = response_schema().decode(data)?;
    Ok(SignatureSlice {
        signature: rec.chars("signature")?.to_owned(),
        fragments_remaining: rec.int("fragments_remaining")? as i8,
    })
}
