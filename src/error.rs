//! Error types and Ledger status word mapping.

use thiserror::Error;

use crate::types::Pubkey;

/// Raw status words returned by the Solana Ledger app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusWord {
    Ok = 0x9000,
    DeviceLocked = 0x5515,
    AppNotOpenDashboard = 0x6511,
    BlindSigningDisabled = 0x6808,
    UserRejected = 0x6985,
    InvalidMessage = 0x6A81,
    InsNotSupported = 0x6D00,
    ClaNotSupported = 0x6E00,
    AppNotOpen = 0x6E01,
}

impl StatusWord {
    pub(crate) fn is_success(code: u16) -> bool {
        code == Self::Ok as u16
    }
}

/// Errors returned by the device layer.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("device returned status 0x{0:04X}: {1}")]
    DeviceStatus(u16, &'static str),

    #[error("device is locked or asleep — unlock it and open the Solana app")]
    DeviceLocked,

    #[error("Solana app is not open — open it and try again")]
    AppNotOpen,

    #[error("wrong app open on device (status 0x{0:04X}) — close it and open the Solana app")]
    WrongApp(u16),

    #[error("blind signing is disabled — enable it in the Solana app settings")]
    BlindSigningDisabled,

    #[error("user rejected the request on device")]
    UserRejected,

    #[error("device could not parse the message")]
    InvalidMessage,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),
}

impl LedgerError {
    pub fn from_status(code: u16) -> Self {
        match code {
            c if c == StatusWord::DeviceLocked as u16 => Self::DeviceLocked,
            c if c == StatusWord::BlindSigningDisabled as u16 => Self::BlindSigningDisabled,
            c if c == StatusWord::UserRejected as u16 => Self::UserRejected,
            c if c == StatusWord::InvalidMessage as u16 => Self::InvalidMessage,
            c if c == StatusWord::InsNotSupported as u16
                || c == StatusWord::ClaNotSupported as u16 =>
            {
                Self::WrongApp(code)
            }
            c if c == StatusWord::AppNotOpen as u16
                || c == StatusWord::AppNotOpenDashboard as u16 =>
            {
                Self::AppNotOpen
            }
            _ => Self::DeviceStatus(code, "unknown"),
        }
    }
}

/// Transport-level errors (USB, TCP, IO).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no Ledger device found — is it plugged in?")]
    DeviceNotFound,

    #[error("communication error: {0}")]
    Comm(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("device timed out after {0}ms")]
    Timeout(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures parsing base58 keys, hashes and signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("expected {expected} bytes, got {got}")]
    WrongSize { expected: usize, got: usize },
}

/// Program-derived address search failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdaError {
    #[error("too many seeds: {0} (max 16)")]
    TooManySeeds(usize),

    #[error("seed {index} is {len} bytes (max 32)")]
    SeedTooLong { index: usize, len: usize },

    #[error("derived address lies on the ed25519 curve")]
    OnCurve,

    #[error("program id ends with the program-derived address marker")]
    IllegalOwner,

    #[error("no bump seed yields an off-curve address")]
    NoViableBump,
}

/// Message compilation, signing and verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("message references {0} accounts (max 256)")]
    TooManyAccounts(usize),

    #[error("instruction field of {0} entries does not fit a compact-u16 length")]
    LengthOverflow(usize),

    #[error("transaction is {size} bytes, over the {max}-byte packet limit")]
    TooLarge { size: usize, max: usize },

    #[error("{0} is not a required signer of this message")]
    NotASigner(Pubkey),

    #[error("expected {expected} signatures, transaction holds {got}")]
    SignatureCount { expected: usize, got: usize },

    #[error("signer {index} ({pubkey}) has no signature attached")]
    MissingSignature { index: usize, pubkey: Pubkey },

    #[error("signer {index} ({pubkey}) is not a valid ed25519 public key")]
    InvalidSignerKey { index: usize, pubkey: Pubkey },

    #[error("signature {index} does not verify against {pubkey}")]
    SignatureInvalid { index: usize, pubkey: Pubkey },
}

/// Failures talking to the JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },

    /// Preflight simulation ran the instruction and the program failed it.
    #[error("{message}")]
    ProgramRejected { message: String, logs: Vec<String> },
}

impl RpcError {
    pub fn is_program_rejection(&self) -> bool {
        matches!(self, Self::ProgramRejected { .. })
    }
}
