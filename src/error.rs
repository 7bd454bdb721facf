//! Error types and IOTA app status word mapping.

use thiserror::Error;

/// Raw status words returned by the IOTA apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusWord {
    Ok = 0x9000,
    IncorrectLength = 0x6700,
    IncorrectData = 0x6A80,
    IncorrectP1P2 = 0x6B00,
    IncorrectLengthP3 = 0x6C00,
    InsNotSupported = 0x6D00,
    ClaNotSupported = 0x6E00,
    CommandNotAllowed = 0x6900,
    SecurityStatusNotSatisfied = 0x6982,
    ConditionsOfUseNotSatisfied = 0x6985,
    CommandTimeout = 0x6401,
    BundleInsecureHash = 0x69A1,
    BundleNonZeroBalance = 0x69A2,
    BundleInvalidMeta = 0x69A3,
    BundleInvalidAddressIndex = 0x69A4,
    BundleAddressReused = 0x69A5,
    InvalidInputData = 0x6984,
    AppNotInitialized = 0x6986,
    BadSeed = 0x6987,
    TxInvalidIndex = 0x6991,
    TxInvalidOrder = 0x6992,
    TxInvalidMeta = 0x6993,
    TxInvalidOutput = 0x6994,
}

impl StatusWord {
    pub(crate) fn is_success(code: u16) -> bool {
        code == Self::Ok as u16
    }
}

/// Human readable text for a status word, `None` for codes the app never
/// documents.
pub fn status_message(code: u16) -> Option<&'static str> {
    let msg = match code {
        0x9000 => "Success",
        0x6700 => "Incorrect input length",
        0x6A80 => "Incorrect data",
        0x6B00 => "Incorrect command parameter",
        0x6C00 => "Incorrect length specified in header",
        0x6D00 => "Invalid INS command",
        0x6E00 => "Incorrect CLA (Wrong application opened)",
        0x6900 => "Command not allowed (Command out of order)",
        0x6982 => "Security not satisfied (Device locked)",
        0x6985 => "Condition of use not satisfied (Denied by the user)",
        0x6401 => "Security not satisfied (Timeout exceeded)",
        0x69A1 => "Bundle error (Insecure hash)",
        0x69A2 => "Bundle error (Non zero balance)",
        0x69A3 => "Bundle error (Invalid meta transaction)",
        0x69A4 => "Bundle error (Invalid input address/index pair(s))",
        0x69A5 => "Bundle error (Address reused)",
        // firmware before 0.5
        0x6984 => "Invalid input data",
        0x6986 => "App has not been initialized by user",
        0x6987 => "Invalid seed",
        0x6991 => "Invalid transaction index",
        0x6992 => "Invalid transaction order (Output, Inputs, Change)",
        0x6993 => "Invalid meta transaction",
        0x6994 => "Invalid output transaction (Output must come first)",
        0x6F00..=0x6FFF => "Internal error, please report",
        _ => return None,
    };
    Some(msg)
}

/// Full device message for a status word, as shown to users.
pub fn device_message(code: u16) -> String {
    match status_message(code) {
        Some(msg) => format!("Ledger device: {msg} (0x{code:04x})"),
        None => format!("Ledger device: unexpected device error (0x{code:04x})"),
    }
}

/// Symbolic category of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    SessionNotActive,
    ResetRequired,
    DuplicateAddress,
    RemainderRequired,
    InsufficientBalance,
    UnsupportedCardinality,
    BundleNotFinalized,
    BundleHashMismatch,
    SignatureLengthMismatch,
    MalformedResponse,
    DeviceRejected,
    TransportFailure,
    Unsupported,
}

/// Errors returned by the library.
///
/// None of these are retried internally. After a failure in the middle of
/// bundle signing the device keeps its partial state until
/// [`LedgerIota::reset`](crate::LedgerIota::reset) is called.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{message}")]
    DeviceRejected { code: u16, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("seed not yet initialized - call activate first")]
    SessionNotActive,

    #[error("a previous bundle signing was abandoned - reset the device first")]
    ResetRequired,

    #[error("transaction must not contain duplicate addresses ({0})")]
    DuplicateAddress(String),

    #[error("remainder object required")]
    RemainderRequired,

    #[error("insufficient balance: inputs hold {balance}, transfers need {payment}")]
    InsufficientBalance { balance: u64, payment: u64 },

    #[error("unsupported number of transfers or inputs: {0}")]
    UnsupportedCardinality(String),

    #[error("bundle not finalized by the device")]
    BundleNotFinalized,

    #[error("wrong bundle hash: device reported {device}, bundle has {expected}")]
    BundleHashMismatch { device: String, expected: String },

    #[error("wrong signature length: expected {expected} slices, device sent {received}")]
    SignatureLengthMismatch { expected: usize, received: usize },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("not supported by this app: {0}")]
    Unsupported(String),
}

impl LedgerError {
    /// Map a non-success status word to a device error.
    pub fn from_status(code: u16) -> Self {
        Self::DeviceRejected {
            code,
            message: device_message(code),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::TransportFailure,
            Self::DeviceRejected { .. } => ErrorKind::DeviceRejected,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::SessionNotActive => ErrorKind::SessionNotActive,
            Self::ResetRequired => ErrorKind::ResetRequired,
            Self::DuplicateAddress(_) => ErrorKind::DuplicateAddress,
            Self::RemainderRequired => ErrorKind::RemainderRequired,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::UnsupportedCardinality(_) => ErrorKind::UnsupportedCardinality,
            Self::BundleNotFinalized => ErrorKind::BundleNotFinalized,
            Self::BundleHashMismatch { .. } => ErrorKind::BundleHashMismatch,
            Self::SignatureLengthMismatch { .. } => ErrorKind::SignatureLengthMismatch,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Status word reported by the device, if the failure came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::DeviceRejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// `true` when the user pressed reject on the device.
    pub fn is_user_rejected(&self) -> bool {
        self.status_code() == Some(StatusWord::ConditionsOfUseNotSatisfied as u16)
    }
}

/// Transport-level errors (TCP, IO).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("communication error: {0}")]
    Comm(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("device timed out after {0}ms")]
    Timeout(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
