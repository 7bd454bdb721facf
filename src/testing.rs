//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::apdu::{ApduAnswer, ApduCommand};
use crate::error::TransportError;
use crate::transport::Transport;

#[derive(Default)]
struct Inner {
    responses: VecDeque<Result<ApduAnswer, TransportError>>,
    commands: Vec<ApduCommand>,
    timeouts: Vec<u32>,
}

/// Answers with queued responses in order and records what was sent.
/// Clones share the same script.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, data: &[u8]) {
        self.push(Ok(ApduAnswer::new(data, 0x9000)));
    }

    pub fn push_status(&self, code: u16) {
        self.push(Ok(ApduAnswer::new(&[], code)));
    }

    pub fn push_err(&self, err: TransportError) {
        self.push(Err(err));
    }

    fn push(&self, response: Result<ApduAnswer, TransportError>) {
        self.inner.lock().unwrap().responses.push_back(response);
    }

    pub fn commands(&self) -> Vec<ApduCommand> {
        self.inner.lock().unwrap().commands.clone()
    }

    pub fn timeouts(&self) -> Vec<u32> {
        self.inner.lock().unwrap().timeouts.clone()
    }
}

impl Transport for MockTransport {
    fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push(command.clone());
        inner
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Comm("no scripted response".into())))
    }

    fn set_exchange_timeout(&self, millis: u32) -> Result<(), TransportError> {
        self.inner.lock().unwrap().timeouts.push(millis);
        Ok(())
    }
}
