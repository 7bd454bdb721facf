//! APDU command and response types.
//!
//! The trinary IOTA app answers on CLA `0x7A`, the Stardust app on `0x7B`.
//! P1 carries per-command flags (display, partial reset, continuation),
//! P2 is always `0x00`.

use std::fmt;

/// CLA of the trinary (legacy and current) IOTA app.
pub const CLA_IOTA: u8 = 0x7A;

/// CLA of the Stardust IOTA/Shimmer app.
pub const CLA_STARDUST: u8 = 0x7B;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    pub fn new(cla: u8, ins: Instruction, p1: u8, data: Vec<u8>) -> Self {
        Self {
            cla,
            ins: ins as u8,
            p1,
            p2: 0x00,
            data,
        }
    }

    /// Wire format: `[CLA][INS][P1][P2][LC][DATA]`
    ///
    /// # Panics
    ///
    /// Panics if `data` exceeds 255 bytes (short APDU LC limit).
    pub fn serialize(&self) -> Vec<u8> {
        assert!(
            self.data.len() <= 255,
            "APDU data too long: {} bytes (max 255)",
            self.data.len()
        );
        let mut buf = Vec::with_capacity(5 + self.data.len());
        buf.push(self.cla);
        buf.push(self.ins);
        buf.push(self.p1);
        buf.push(self.p2);
        buf.push(self.data.len() as u8);
        buf.extend_from_slice(&self.data);
        buf
    }
}

/// APDU response - last 2 bytes are the status word, everything before
/// that is the payload. Use [`data()`](ApduAnswer::data) to strip the SW.
#[derive(Debug, Clone)]
pub struct ApduAnswer {
    raw: Vec<u8>,
}

impl ApduAnswer {
    pub fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Build a response from a payload and a status word.
    pub fn new(data: &[u8], retcode: u16) -> Self {
        let mut raw = Vec::with_capacity(data.len() + 2);
        raw.extend_from_slice(data);
        raw.extend_from_slice(&retcode.to_be_bytes());
        Self { raw }
    }

    pub fn retcode(&self) -> u16 {
        if self.raw.len() < 2 {
            return 0;
        }
        let len = self.raw.len();
        ((self.raw[len - 2] as u16) << 8) | (self.raw[len - 1] as u16)
    }

    /// Payload only - strips the trailing 2-byte status word.
    pub fn data(&self) -> &[u8] {
        if self.raw.len() < 2 {
            return &[];
        }
        &self.raw[..self.raw.len() - 2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    SetSeed = 0x01,
    Pubkey = 0x02,
    Tx = 0x03,
    Sign = 0x04,
    GetAppConfig = 0x10,
    SetAccount = 0x11,
    GetDataBufferState = 0x80,
    ReadDataBlock = 0x82,
    GenAddress = 0xA1,
    Reset = 0xFF,
}

/// How long the device may take to answer a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Pure computation on the device.
    NonInteractive,
    /// A human has to confirm something on the device screen.
    Interactive,
}

impl Timeout {
    pub fn millis(self) -> u32 {
        match self {
            Self::NonInteractive => 10_000,
            Self::Interactive => 150_000,
        }
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonInteractive => write!(f, "non-interactive ({}ms)", self.millis()),
            Self::Interactive => write!(f, "interactive ({}ms)", self.millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- ApduCommand --

    #[test]
    fn serialize_empty_data() {
        let cmd = ApduCommand::new(CLA_IOTA, Instruction::GetAppConfig, 0, Vec::new());
        assert_eq!(cmd.serialize(), vec![0x7A, 0x10, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn serialize_with_flags_and_data() {
        let cmd = ApduCommand::new(CLA_IOTA, Instruction::Tx, 0x80, vec![0xAA, 0xBB]);
        assert_eq!(
            cmd.serialize(),
            vec![0x7A, 0x03, 0x80, 0x00, 0x02, 0xAA, 0xBB]
        );
    }

    #[test]
    fn serialize_stardust_cla() {
        let cmd = ApduCommand::new(CLA_STARDUST, Instruction::ReadDataBlock, 3, Vec::new());
        assert_eq!(cmd.serialize(), vec![0x7B, 0x82, 0x03, 0x00, 0x00]);
    }

    #[test]
    fn serialize_max_255_bytes() {
        let cmd = ApduCommand::new(CLA_IOTA, Instruction::Tx, 0, vec![0xFF; 255]);
        let buf = cmd.serialize();
        assert_eq!(buf.len(), 5 + 255);
        assert_eq!(buf[4], 255); // LC byte
    }

    #[test]
    #[should_panic(expected = "APDU data too long")]
    fn serialize_panics_at_256_bytes() {
        let cmd = ApduCommand::new(CLA_IOTA, Instruction::Tx, 0, vec![0x00; 256]);
        cmd.serialize();
    }

    // -- ApduAnswer --

    #[test]
    fn retcode_empty_response() {
        let ans = ApduAnswer::from_raw(vec![]);
        assert_eq!(ans.retcode(), 0);
        assert!(ans.data().is_empty());
    }

    #[test]
    fn retcode_single_byte() {
        let ans = ApduAnswer::from_raw(vec![0x90]);
        assert_eq!(ans.retcode(), 0);
        assert!(ans.data().is_empty());
    }

    #[test]
    fn retcode_with_payload() {
        let ans = ApduAnswer::from_raw(vec![0x01, 0x02, 0x03, 0x69, 0x85]);
        assert_eq!(ans.retcode(), 0x6985);
        assert_eq!(ans.data(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn new_appends_status_word() {
        let ans = ApduAnswer::new(&[0xAA, 0xBB], 0x9000);
        assert_eq!(ans.retcode(), 0x9000);
        assert_eq!(ans.data(), &[0xAA, 0xBB]);
    }

    #[test]
    fn timeout_classes() {
        assert_eq!(Timeout::NonInteractive.millis(), 10_000);
        assert_eq!(Timeout::Interactive.millis(), 150_000);
    }
}
