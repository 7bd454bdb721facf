//! Command exchange with the IOTA apps.
//!
//! Every command is a single APDU round trip. The transport timeout is set
//! per command, and any status word other than `0x9000` becomes a
//! [`LedgerError::DeviceRejected`]. Nothing is retried: a half-submitted
//! bundle must not be replayed behind the caller's back.

pub mod chunks;

use log::{debug, trace};

use crate::apdu::{ApduCommand, Instruction, Timeout};
use crate::error::{LedgerError, StatusWord};
use crate::transport::Transport;

pub struct CommandTransport {
    transport: Box<dyn Transport>,
    cla: u8,
}

impl CommandTransport {
    pub fn new(transport: Box<dyn Transport>, cla: u8) -> Self {
        Self { transport, cla }
    }

    pub fn cla(&self) -> u8 {
        self.cla
    }

    /// Send one command and return the response payload without the status
    /// word.
    pub fn send(
        &self,
        ins: Instruction,
        p1: u8,
        p2: u8,
        data: Vec<u8>,
        timeout: Timeout,
    ) -> Result<Vec<u8>, LedgerError> {
        self.transport.set_exchange_timeout(timeout.millis())?;

        let cmd = ApduCommand {
            cla: self.cla,
            ins: ins as u8,
            p1,
            p2,
            data,
        };
        debug!(
            "-> {ins:?} cla={:#04x} p1={p1:#04x} p2={p2:#04x} len={} timeout={timeout}",
            cmd.cla,
            cmd.data.len()
        );
        trace!("-> {}", hex::encode(&cmd.data));

        let answer = self.transport.exchange(&cmd)?;
        let code = answer.retcode();
        trace!("<- {} sw={code:04x}", hex::encode(answer.data()));

        if !StatusWord::is_success(code) {
            debug!("{ins:?} rejected with {code:#06x}");
            return Err(LedgerError::from_status(code));
        }
        Ok(answer.data().to_vec())
    }
}
