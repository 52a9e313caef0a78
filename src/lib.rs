//! # Certsmith - An Interactive Pure Rust PKI Tool
//!
//! Certsmith covers the day-to-day chores of a small private PKI: key pairs,
//! certificate signing requests, a self-signed certificate authority, signing
//! requests with that authority, and checking the result. It is built
//! entirely with RustCrypto libraries.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any size the RSA primitive accepts, 2048 bits by default
//! - **DSA**: 1024, 2048 and 3072-bit keys
//!
//! Everything is signed with SHA-256.
//!
//! ## Quick Start
//!
//! ### Issuing a Certificate
//!
//! ```rust,no_run
//! use certsmith::{
//!     cert::params::{DistinguishedName, Subject},
//!     config::IssuancePolicy,
//!     issuer::CertificateAuthority,
//!     key::{KeyAlgorithm, KeyPair},
//!     request::CertificateRequest,
//! };
//!
//! # fn main() -> Result<(), certsmith::error::CertsmithError> {
//! // Create the certificate authority
//! let ca_subject = DistinguishedName::builder()
//!     .common_name("root".to_string())
//!     .build();
//! let ca = CertificateAuthority::create(&ca_subject, KeyPair::generate(KeyAlgorithm::Rsa, 2048)?)?;
//!
//! // Build a request for a server
//! let server_key = KeyPair::generate(KeyAlgorithm::Rsa, 2048)?;
//! let subject = Subject::builder()
//!     .name(
//!         DistinguishedName::builder()
//!             .common_name("example.com".to_string())
//!             .country("US".to_string())
//!             .build(),
//!     )
//!     .alt_names(vec!["www.example.com".to_string()])
//!     .build();
//! let csr = CertificateRequest::new(&subject, &server_key)?;
//!
//! // Sign it, keeping the requested DNS names
//! let policy = IssuancePolicy { copy_subject_alt_names: true };
//! let cert = ca.sign_request(&csr, &policy)?;
//! println!("{}", cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Verifying a Certificate
//!
//! ```rust,no_run
//! use certsmith::{cert::Certificate, key::KeyPair, verify};
//!
//! # fn main() -> Result<(), certsmith::error::CertsmithError> {
//! let cert = Certificate::from_pem(&std::fs::read_to_string("server.crt")?)?;
//! let ca = Certificate::from_pem(&std::fs::read_to_string("ca.crt")?)?;
//! let key = KeyPair::import_from_pem(&std::fs::read_to_string("server.pem")?, None)?;
//!
//! println!("{}", verify::check_key_match(&cert, &key));
//! println!("{}", verify::check_issuer(&cert, &ca));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use certsmith::{error::CertsmithError, key::KeyPair};
//!
//! match KeyPair::import_from_pem("invalid pem data", None) {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(CertsmithError::DecodingError(msg)) => println!("Failed to decode key: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, import/export, and signatures
//! - [`cert`]: Certificate encoding/decoding, names and extensions
//! - [`request`]: Certificate signing requests
//! - [`issuer`]: Certificate issuing and the certificate authority
//! - [`verify`]: Key-match and issuer checks
//! - [`tbs_certificate`]: Low-level certificate structure assembly
//! - [`cli`], [`prompt`], [`store`], [`config`]: The interactive tool
//! - [`error`]: Error types

use rand_core::{OsRng, RngCore};

pub mod cert;
pub mod cli;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod prompt;
pub mod request;
pub mod store;
pub mod tbs_certificate;
pub mod verify;

/// Checks that the operating system random number generator can be used.
///
/// Keys, serial numbers and passphrase salts all come from it.
pub fn preflight() -> error::Result<()> {
    let mut probe = [0u8; 32];
    OsRng.try_fill_bytes(&mut probe).map_err(|e| {
        error::CertsmithError::Environment(format!(
            "the operating system random number generator is unavailable: {e}"
        ))
    })
}
