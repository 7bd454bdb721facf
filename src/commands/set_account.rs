use crate::apdu::{Instruction, Timeout};
use crate::codec::{Schema, Value};
use crate::error::LedgerError;
use crate::protocol::CommandTransport;
use crate::types::AppMode;

fn schema() -> Schema {
    Schema::new().u32("account")
}

/// Select the account on the Stardust app. The network is carried in P1.
pub fn exec(proto: &CommandTransport, account: u32, mode: AppMode) -> Result<(), LedgerError> {
    let data = schema().encode(&[Value::from(account)]);
    proto.send(
        Instruction::SetAccount,
        mode as u8,
        0,
        data,
        Timeout::NonInteractive,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::CLA_STARDUST;
    use crate::testing::MockTransport;

    #[test]
    fn account_and_mode() {
        let mock = MockTransport::new();
        mock.push_ok(&[]);
        let proto = CommandTransport::new(Box::new(mock.clone()), CLA_STARDUST);

        exec(&proto, 0x8000_0001, AppMode::ShimmerTestnet).unwrap();

        let sent = mock.commands();
        assert_eq!(sent[0].ins, 0x11);
        assert_eq!(sent[0].p1, 0x83);
        assert_eq!(sent[0].data, vec![0x01, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn account_round_trip() {
        let values = vec![Value::from(0x8000_0007u32)];
        let bytes = schema().encode(&values);
        assert_eq!(bytes, vec![0x07, 0x00, 0x00, 0x80]);
        assert_eq!(schema().decode(&bytes).unwrap().into_values(), values);
    }
}
