use crate::apdu::{Instruction, Timeout};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;

/// A partial reset (`P1 = 0x01`) keeps the seed but drops any bundle in
/// progress.
pub fn exec(proto: &CommandTransport, partial: bool) -> Result<(), LedgerError> {
    proto.send(
        Instruction::Reset,
        u8::from(partial),
        0,
        Vec::new(),
        Timeout::NonInteractive,
    )?;
    Ok(())
}
