//! Error type shared by every module of the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Represents errors that can occur in certsmith.
///
/// Input and file errors are recovered by the interactive prompt loops;
/// the rest are surfaced to the user.
#[derive(Debug, Error, Clone)]
pub enum CertsmithError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested key algorithm is not RSA or DSA.
    #[error("Invalid key algorithm: {0} (expected R for RSA or D for DSA)")]
    InvalidAlgorithm(String),

    /// The key size is not supported by the algorithm.
    #[error("Unsupported key size for {algorithm}: {bits} bits")]
    UnsupportedKeySize { algorithm: String, bits: u32 },

    /// The key size is below the configured minimum.
    #[error("Key size {bits} is below the minimum of {min_bits} bits")]
    WeakKey { bits: u32, min_bits: u32 },

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The private key is encrypted and no passphrase was given.
    #[error("The private key is encrypted, a passphrase is required")]
    PassphraseRequired,

    /// The passphrase did not decrypt the private key.
    #[error("Invalid passphrase")]
    WrongPassphrase,

    /// The PEM block is not the expected artifact type.
    #[error("Unexpected PEM label: {0}")]
    UnexpectedPemLabel(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// A private key does not correspond to the certificate it was paired with.
    #[error("The private key does not match the certificate public key")]
    KeyMismatch,

    /// Signing or signature verification failed.
    #[error("Signature error: {0}")]
    SignatureError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),

    /// Error from RSA PKCS1 operations.
    #[error("RSA PKCS1 error: {0}")]
    RsaPkcs1Error(String),

    /// The file to load does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file to write already exists.
    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// A prompt received too many invalid answers.
    #[error("Too many invalid attempts ({0}), giving up")]
    TooManyAttempts(usize),

    /// A startup precondition is not met.
    #[error("Environment check failed: {0}")]
    Environment(String),
}

impl From<der::Error> for CertsmithError {
    /// Converts a `der::Error` into a `CertsmithError`.
    fn from(err: der::Error) -> Self {
        CertsmithError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertsmithError {
    fn from(err: pkcs8::Error) -> Self {
        CertsmithError::DecodingError(err.to_string())
    }
}

impl From<spki::Error> for CertsmithError {
    fn from(err: spki::Error) -> Self {
        CertsmithError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertsmithError {
    fn from(err: rsa::Error) -> Self {
        CertsmithError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CertsmithError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CertsmithError::RsaPkcs1Error(err.to_string())
    }
}

impl From<rsa::signature::Error> for CertsmithError {
    fn from(err: rsa::signature::Error) -> Self {
        CertsmithError::SignatureError(err.to_string())
    }
}

impl From<pem::PemError> for CertsmithError {
    fn from(err: pem::PemError) -> Self {
        CertsmithError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for CertsmithError {
    fn from(err: std::io::Error) -> Self {
        CertsmithError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CertsmithError>;
