use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;

use crate::apdu::{ApduAnswer, ApduCommand, Timeout};
use crate::error::TransportError;
use crate::transport::Transport;

/// TCP transport for the Speculos simulator (default `127.0.0.1:9999`).
///
/// Wire: `[u32 BE length][APDU]` send, `[u32 BE length][response]` recv.
///
/// Speculos has a quirk: the status word (`SW1 SW2`) is sent as a bare
/// 2-byte suffix *outside* the length-prefixed frame, so we read both
/// and stitch them into a standard APDU response.
pub struct TcpTransport {
    stream: Mutex<TcpStream>,
    timeout_ms: Mutex<u32>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .map_err(|e| TransportError::ConnectionFailed(format!("{addr}: {e}")))?;
        let timeout_ms = Timeout::NonInteractive.millis();
        stream
            .set_read_timeout(Some(Duration::from_millis(u64::from(timeout_ms))))
            .map_err(TransportError::Io)?;
        debug!("connected to {addr}");
        Ok(Self {
            stream: Mutex::new(stream),
            timeout_ms: Mutex::new(timeout_ms),
        })
    }

    fn lock_stream(&self) -> Result<std::sync::MutexGuard<'_, TcpStream>, TransportError> {
        self.stream
            .lock()
            .map_err(|e| TransportError::Comm(format!("mutex poisoned: {e}")))
    }

    fn current_timeout(&self) -> u32 {
        self.timeout_ms.lock().map(|t| *t).unwrap_or(0)
    }
}

impl Transport for TcpTransport {
    fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let apdu = command.serialize();
        let timeout = self.current_timeout();
        let mut stream = self.lock_stream()?;

        let len = apdu.len() as u32;
        stream.write_all(&len.to_be_bytes())?;
        stream.write_all(&apdu)?;
        stream.flush()?;

        let timed_out = |e: io::Error| match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout(timeout),
            _ => TransportError::Io(e),
        };

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).map_err(timed_out)?;
        let resp_len = u32::from_be_bytes(len_buf) as usize;
        if resp_len > 65536 {
            return Err(TransportError::Comm(format!(
                "response too large: {resp_len} bytes (max 65536)"
            )));
        }

        let mut resp = vec![0u8; resp_len + 2];
        stream
            .read_exact(&mut resp[..resp_len])
            .map_err(timed_out)?;

        // SW is sent bare after the framed data -- Speculos quirk
        stream
            .read_exact(&mut resp[resp_len..resp_len + 2])
            .map_err(timed_out)?;

        Ok(ApduAnswer::from_raw(resp))
    }

    fn set_exchange_timeout(&self, millis: u32) -> Result<(), TransportError> {
        let stream = self.lock_stream()?;
        // a zero duration is rejected by set_read_timeout, treat it as "wait forever"
        let duration = (millis > 0).then(|| Duration::from_millis(u64::from(millis)));
        stream.set_read_timeout(duration)?;
        let mut current = self
            .timeout_ms
            .lock()
            .map_err(|e| TransportError::Comm(format!("mutex poisoned: {e}")))?;
        *current = millis;
        Ok(())
    }
}
