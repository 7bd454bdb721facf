//! Data buffer reads on the Stardust app.
//!
//! Results too large for one APDU (generated addresses, signatures) are
//! staged in a buffer on the device. The host asks for the buffer state,
//! then pulls fixed-size blocks one by one. Blocks share a single cursor on
//! the device, so reads are strictly sequential.

use log::debug;

use crate::apdu::{Instruction, Timeout};
use crate::codec::Schema;
use crate::error::LedgerError;
use crate::protocol::CommandTransport;

/// Payload type staged in the device data buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Empty,
    GeneratedAddress,
    ValidatedEssence,
    UserConfirmedEssence,
    Signatures,
    Locked,
    Unknown(u8),
}

impl From<u8> for DataType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Empty,
            1 => Self::GeneratedAddress,
            2 => Self::ValidatedEssence,
            3 => Self::UserConfirmedEssence,
            4 => Self::Signatures,
            5 => Self::Locked,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBufferState {
    pub data_length: u16,
    pub data_type: DataType,
    pub block_size: u8,
    pub block_count: u8,
}

impl DataBufferState {
    fn schema() -> Schema {
        Schema::new()
            .u16("data_length")
            .u8("data_type")
            .u8("data_block_size")
            .u8("data_block_count")
    }

    pub fn parse(data: &[u8]) -> Result<Self, LedgerError> {
        let rec = Self::schema().decode(data)?;
        Ok(Self {
            data_length: rec.uint("data_length")? as u16,
            data_type: DataType::from(rec.uint("data_type")? as u8),
            block_size: rec.uint("data_block_size")? as u8,
            block_count: rec.uint("data_block_count")? as u8,
        })
    }

    /// Blocks needed to cover `data_length` bytes.
    pub fn blocks_needed(&self) -> Result<usize, LedgerError> {
        let len = usize::from(self.data_length);
        if len == 0 {
            return Ok(0);
        }
        if self.block_size == 0 {
            return Err(LedgerError::MalformedResponse(format!(
                "data buffer holds {len} bytes in blocks of size 0"
            )));
        }
        let block_size = usize::from(self.block_size);
        let needed = (len + block_size - 1) / block_size;
        if needed > usize::from(self.block_count) {
            return Err(LedgerError::MalformedResponse(format!(
                "data buffer needs {needed} blocks but reports {}",
                self.block_count
            )));
        }
        Ok(needed)
    }
}

pub fn get_state(proto: &CommandTransport) -> Result<DataBufferState, LedgerError> {
    let data = proto.send(
        Instruction::GetDataBufferState,
        0,
        0,
        Vec::new(),
        Timeout::NonInteractive,
    )?;
    DataBufferState::parse(&data)
}

/// Read the whole data buffer, trimmed to its reported length.
pub fn read_all(proto: &CommandTransport) -> Result<(DataBufferState, Vec<u8>), LedgerError> {
    let state = get_state(proto)?;
    let blocks = state.blocks_needed()?;
    let total = usize::from(state.data_length);
    let block_size = usize::from(state.block_size);
    debug!(
        "data buffer: {total} bytes of {:?} in {blocks} block(s)",
        state.data_type
    );

    let mut buf = Vec::with_capacity(blocks * block_size);
    for block in 0..blocks {
        let data = proto.send(
            Instruction::ReadDataBlock,
            block as u8,
            0,
            Vec::new(),
            Timeout::NonInteractive,
        )?;
        let expected = if block + 1 == blocks {
            total - buf.len()
        } else {
            block_size
        };
        if data.len() < expected {
            return Err(LedgerError::MalformedResponse(format!(
                "data block {block} has {} bytes, expected {expected}",
                data.len()
            )));
        }
        buf.extend_from_slice(&data[..data.len().min(block_size)]);
    }

    buf.truncate(total);
    Ok((state, buf))
}
