//! Transport backends for talking to Ledger devices.
//!
//! - [`tcp::TcpTransport`] -- TCP for the Speculos simulator (feature `tcp`, default)
//!
//! USB HID and BLE framing are left to the caller: implement [`Transport`]
//! and hand it to [`LedgerIota::with_transport`](crate::LedgerIota::with_transport).

#[cfg(feature = "tcp")]
pub mod tcp;

use crate::apdu::{ApduAnswer, ApduCommand};
use crate::error::TransportError;

pub trait Transport: Send + Sync {
    /// Send one APDU and wait for the raw answer, status word included.
    fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError>;

    /// How long the next exchanges may wait for the device, in
    /// milliseconds. Called before every command.
    fn set_exchange_timeout(&self, millis: u32) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TransportType {
    /// `(host, port)` for the Speculos simulator.
    #[cfg(feature = "tcp")]
    TCP(String, u16),
}

pub fn open(transport_type: &TransportType) -> Result<Box<dyn Transport>, TransportError> {
    match transport_type {
        #[cfg(feature = "tcp")]
        TransportType::TCP(host, port) => {
            let t = tcp::TcpTransport::new(host, *port)?;
            Ok(Box::new(t))
        }
        #[allow(unreachable_patterns)]
        _ => Err(TransportError::Comm(
            "no transport enabled - enable the 'tcp' feature".into(),
        )),
    }
}
