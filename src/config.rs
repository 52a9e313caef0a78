//! Runtime configuration shared by the interactive modes.

use std::path::PathBuf;

use crate::error::{CertsmithError, Result};

/// Minimum key size accepted by default.
pub const DEFAULT_MIN_KEY_BITS: u32 = 2048;

/// Number of invalid answers a prompt tolerates before the mode gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Lower bound on requested key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub min_bits: u32,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            min_bits: DEFAULT_MIN_KEY_BITS,
        }
    }
}

impl KeyPolicy {
    pub fn check(&self, bits: u32) -> Result<()> {
        if bits == 0 {
            return Err(CertsmithError::InvalidInput(
                "key size must be positive".to_string(),
            ));
        }
        if bits < self.min_bits {
            return Err(CertsmithError::WeakKey {
                bits,
                min_bits: self.min_bits,
            });
        }
        Ok(())
    }
}

/// What a CA copies from a request into the certificate it issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssuancePolicy {
    /// Copy the request's subjectAltName extension. Off by default.
    pub copy_subject_alt_names: bool,
}

/// Settings for one run of the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub key_policy: KeyPolicy,
    pub issuance: IssuancePolicy,
    pub max_attempts: usize,
    /// Directory that new files are written to.
    pub out_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::default(),
            issuance: IssuancePolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            out_dir: PathBuf::from("."),
        }
    }
}
