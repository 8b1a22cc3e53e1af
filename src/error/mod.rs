//! Error handling for the ledger
//!
//! Every validation path reports one of these variants instead of aborting.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reasons a DER-style signature buffer was refused by the strict parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureFormatError {
    /// Buffer shorter than the smallest possible encoding
    TooShort,
    /// First byte is not the 0x30 sequence marker
    NoHeaderMagic,
    /// Declared outer length does not fit the buffer
    BadLength,
    /// Bytes remain after the declared outer length
    TrailingBytes,
    /// Missing 0x02 marker before R
    NoFirstIntMarker,
    /// R length is zero or overruns the buffer
    BogusRLength,
    /// Missing 0x02 marker before S
    NoSecondIntMarker,
    /// S length is zero or overruns the buffer
    BogusSLength,
    /// R and S do not consume the declared outer length exactly
    BadFinalLength { parsed: usize, declared: usize },
    /// R is zero
    NonPositiveR,
    /// S is zero
    NonPositiveS,
    /// Text form is not lowercase hex
    NotHex,
}

impl fmt::Display for SignatureFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureFormatError::TooShort => write!(f, "malformed signature: too short"),
            SignatureFormatError::NoHeaderMagic => {
                write!(f, "malformed signature: no header magic")
            }
            SignatureFormatError::BadLength => write!(f, "malformed signature: bad length"),
            SignatureFormatError::TrailingBytes => {
                write!(f, "malformed signature: trailing bytes after S")
            }
            SignatureFormatError::NoFirstIntMarker => {
                write!(f, "malformed signature: no 1st int marker")
            }
            SignatureFormatError::BogusRLength => {
                write!(f, "malformed signature: bogus R length")
            }
            SignatureFormatError::NoSecondIntMarker => {
                write!(f, "malformed signature: no 2nd int marker")
            }
            SignatureFormatError::BogusSLength => {
                write!(f, "malformed signature: bogus S length")
            }
            SignatureFormatError::BadFinalLength { parsed, declared } => write!(
                f,
                "malformed signature: bad final length {parsed} != {declared}"
            ),
            SignatureFormatError::NonPositiveR => write!(f, "signature R isn't 1 or more"),
            SignatureFormatError::NonPositiveS => write!(f, "signature S isn't 1 or more"),
            SignatureFormatError::NotHex => write!(f, "malformed signature: not lowercase hex"),
        }
    }
}

impl std::error::Error for SignatureFormatError {}

/// Error types for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Bad index or hash linkage, malformed genesis
    Structural(String),
    /// Mining could not produce a hash under the target, or a block lacks its claimed work
    ProofOfWork(String),
    /// Mining was abandoned because the tip moved
    MiningCancelled,
    /// A valid candidate chain that is not preferred over the current one
    ConsensusRejected(String),
    /// A single block was refused; nothing was mutated
    BlockRejected(String),
    /// A candidate chain was refused; nothing was mutated
    ChainRejected(String),
    /// Id mismatch, bad signature, unresolved input, duplicate spend, conservation mismatch
    TransactionInvalid(String),
    /// Wrong coinbase shape or reward
    CoinbaseInvalid(String),
    /// Duplicate or overlapping pending spend
    PoolConflict(String),
    /// Malformed signature encoding
    SignatureFormat(SignatureFormatError),
    /// Coin selection could not cover the amount
    InsufficientFunds { required: u64, available: u64 },
    /// Missing, duplicate or unparsable key material
    KeyStore(String),
    /// Cryptographic backend failures
    Crypto(String),
    /// Peer transport failures
    Network(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// A shared lock was poisoned by a panicking writer
    Lock(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Structural(msg) => write!(f, "Structural error: {msg}"),
            LedgerError::ProofOfWork(msg) => write!(f, "Proof-of-work error: {msg}"),
            LedgerError::MiningCancelled => write!(f, "Mining cancelled: the chain tip advanced"),
            LedgerError::ConsensusRejected(msg) => write!(f, "Consensus rejected: {msg}"),
            LedgerError::BlockRejected(msg) => write!(f, "Block rejected: {msg}"),
            LedgerError::ChainRejected(msg) => write!(f, "Chain rejected: {msg}"),
            LedgerError::TransactionInvalid(msg) => write!(f, "Invalid transaction: {msg}"),
            LedgerError::CoinbaseInvalid(msg) => write!(f, "Invalid coinbase: {msg}"),
            LedgerError::PoolConflict(msg) => write!(f, "Transaction pool conflict: {msg}"),
            LedgerError::SignatureFormat(err) => write!(f, "Signature format error: {err}"),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::KeyStore(msg) => write!(f, "Key store error: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Network(msg) => write!(f, "Network error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<SignatureFormatError> for LedgerError {
    fn from(err: SignatureFormatError) -> Self {
        LedgerError::SignatureFormat(err)
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}
