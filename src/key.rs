use std::fmt;
use std::str::FromStr;

use const_oid::ObjectIdentifier;
use der::Encode;
use dsa::{Components, KeySize};
use pkcs8::pkcs5::pbes2;
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey,
    EncryptedPrivateKeyInfo, LineEnding, PrivateKeyInfo, SecretDocument,
};
use rand_core::{OsRng, RngCore};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15;
use rsa::signature::{DigestSigner, DigestVerifier, SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use zeroize::Zeroizing;

use crate::cert::SignatureAlgorithm;
use crate::error::{CertsmithError, Result};
use crate::pem_utils;

/// Bit length used when the user does not ask for one.
pub const DEFAULT_KEY_BITS: u32 = 2048;

pub(crate) const RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub(crate) const ID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

const PBKDF2_ITERATIONS: u32 = 100_000;

/// Key algorithms a key pair can be generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
}

impl KeyAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Dsa => "DSA",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = CertsmithError;

    /// Accepts `R`/`RSA` and `D`/`DSA` in any case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "rsa" => Ok(KeyAlgorithm::Rsa),
            "d" | "dsa" => Ok(KeyAlgorithm::Dsa),
            other => Err(CertsmithError::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// Supported key types for certificate operations.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    Dsa {
        signing_key: Box<dsa::SigningKey>,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a key pair of the given algorithm and size.
    pub fn generate(algorithm: KeyAlgorithm, bits: u32) -> Result<Self> {
        log::info!("Generating {algorithm} key pair ({bits} bits)");
        match algorithm {
            KeyAlgorithm::Rsa => Self::generate_rsa(bits),
            KeyAlgorithm::Dsa => Self::generate_dsa(bits),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: u32) -> Result<Self> {
        if bits == 0 {
            return Err(CertsmithError::InvalidInput(
                "key size must be positive".to_string(),
            ));
        }
        let mut rng = OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits as usize)
            .map_err(|e| CertsmithError::KeyGenerationError(e.to_string()))?;
        Ok(Self::from_rsa(private))
    }

    /// Generate a DSA key pair. Only the FIPS 186 sizes 1024, 2048 and 3072 exist.
    pub fn generate_dsa(bits: u32) -> Result<Self> {
        let key_size = dsa_key_size(bits)?;
        let mut rng = OsRng;
        let components = Components::generate(&mut rng, key_size);
        let signing_key = dsa::SigningKey::generate(&mut rng, components);
        Ok(KeyPair::Dsa {
            signing_key: Box::new(signing_key),
        })
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            KeyPair::Rsa { .. } => KeyAlgorithm::Rsa,
            KeyPair::Dsa { .. } => KeyAlgorithm::Dsa,
        }
    }

    /// Size of the modulus (RSA) or of the prime `p` (DSA), in bits.
    pub fn bits(&self) -> u32 {
        self.public_key().bits()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// The SubjectPublicKeyInfo that certificates and requests embed for this key.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }

    /// The SHA-256 signature algorithm matching this key.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self.algorithm() {
            KeyAlgorithm::Rsa => SignatureAlgorithm::Sha256WithRsa,
            KeyAlgorithm::Dsa => SignatureAlgorithm::DsaWithSha256,
        }
    }

    /// Signs `data` with SHA-256.
    ///
    /// RSA uses PKCS#1 v1.5 padding; DSA uses RFC 6979 deterministic nonces and
    /// returns the DER-encoded `(r, s)` pair.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key = pkcs1v15::SigningKey::<Sha256>::new(private.as_ref().clone());
                let signature = signing_key.try_sign(data)?;
                Ok(signature.to_vec())
            }
            KeyPair::Dsa { signing_key } => {
                let signature: dsa::Signature =
                    signing_key.try_sign_digest(Sha256::new_with_prefix(data))?;
                Ok(signature.to_vec())
            }
        }
    }

    /// True when `spki` is the public half of this key pair.
    pub fn matches(&self, spki: &SubjectPublicKeyInfoOwned) -> Result<bool> {
        Ok(self.as_spki()?.to_der()? == spki.to_der()?)
    }

    fn to_pkcs8_der(&self) -> Result<SecretDocument> {
        let document = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_der()?,
            KeyPair::Dsa { signing_key } => signing_key.to_pkcs8_der()?,
        };
        Ok(document)
    }

    /// Exports the private key as an unencrypted PKCS#8 `PRIVATE KEY` PEM.
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>> {
        Ok(self
            .to_pkcs8_der()?
            .to_pem(pem_utils::PRIVATE_KEY, LineEnding::LF)?)
    }

    /// Exports the private key as a passphrase-protected PKCS#8
    /// `ENCRYPTED PRIVATE KEY` PEM (PBES2, PBKDF2-HMAC-SHA256, AES-256-CBC).
    pub fn to_encrypted_pkcs8_pem(&self, passphrase: &str) -> Result<Zeroizing<String>> {
        if passphrase.is_empty() {
            return Err(CertsmithError::InvalidInput(
                "passphrase must not be empty".to_string(),
            ));
        }
        let document = self.to_pkcs8_der()?;
        let info = PrivateKeyInfo::try_from(document.as_bytes())?;

        let mut salt = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &salt, &iv)
            .map_err(|e| CertsmithError::EncodingError(e.to_string()))?;

        let encrypted = info.encrypt_with_params(params, passphrase)?;
        Ok(encrypted.to_pem(pem_utils::ENCRYPTED_PRIVATE_KEY, LineEnding::LF)?)
    }

    /// Imports a key from an unencrypted PKCS#8 DER document.
    pub fn import_from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)?;
        let oid = info.algorithm.oid;
        if oid == RSA_ENCRYPTION {
            Ok(Self::from_rsa(RsaPrivateKey::from_pkcs8_der(der)?))
        } else if oid == ID_DSA {
            Ok(KeyPair::Dsa {
                signing_key: Box::new(dsa::SigningKey::from_pkcs8_der(der)?),
            })
        } else {
            Err(CertsmithError::DecodingError(format!(
                "Unsupported private key algorithm {oid}"
            )))
        }
    }

    /// Imports a private key from PEM.
    ///
    /// Accepts `PRIVATE KEY`, `ENCRYPTED PRIVATE KEY` (requires `passphrase`)
    /// and legacy `RSA PRIVATE KEY` blocks.
    pub fn import_from_pem(pem_str: &str, passphrase: Option<&str>) -> Result<Self> {
        let block = pem::parse(pem_str)?;
        match block.tag() {
            pem_utils::PRIVATE_KEY => Self::import_from_pkcs8_der(block.contents()),
            pem_utils::ENCRYPTED_PRIVATE_KEY => {
                let passphrase = passphrase.ok_or(CertsmithError::PassphraseRequired)?;
                let encrypted = EncryptedPrivateKeyInfo::try_from(block.contents())?;
                let document = encrypted
                    .decrypt(passphrase)
                    .map_err(|_| CertsmithError::WrongPassphrase)?;
                // A wrong passphrase can still yield valid padding.
                PrivateKeyInfo::try_from(document.as_bytes())
                    .map_err(|_| CertsmithError::WrongPassphrase)?;
                Self::import_from_pkcs8_der(document.as_bytes())
            }
            pem_utils::RSA_PRIVATE_KEY => {
                Ok(Self::from_rsa(RsaPrivateKey::from_pkcs1_der(block.contents())?))
            }
            other => Err(CertsmithError::UnexpectedPemLabel(other.to_string())),
        }
    }
}

#[allow(deprecated)]
fn dsa_key_size(bits: u32) -> Result<KeySize> {
    match bits {
        1024 => Ok(KeySize::DSA_1024_160),
        2048 => Ok(KeySize::DSA_2048_256),
        3072 => Ok(KeySize::DSA_3072_256),
        _ => Err(CertsmithError::UnsupportedKeySize {
            algorithm: KeyAlgorithm::Dsa.to_string(),
            bits,
        }),
    }
}

/// The public half of a [`KeyPair`], as found in certificates and requests.
#[derive(Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Dsa(dsa::VerifyingKey),
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm())
            .field("bits", &self.bits())
            .finish()
    }
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::Dsa { signing_key } => PublicKey::Dsa(signing_key.verifying_key().clone()),
        }
    }

    /// Decodes the key carried by a SubjectPublicKeyInfo.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        let oid = spki.algorithm.oid;
        if oid == RSA_ENCRYPTION {
            Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?))
        } else if oid == ID_DSA {
            Ok(PublicKey::Dsa(dsa::VerifyingKey::from_public_key_der(&der)?))
        } else {
            Err(CertsmithError::DecodingError(format!(
                "Unsupported public key algorithm {oid}"
            )))
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone())?,
            PublicKey::Dsa(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(verifying_key.clone())?
            }
        };
        Ok(spki)
    }

    /// SPKI `PUBLIC KEY` PEM.
    pub fn to_pem(&self) -> Result<String> {
        let pem = match self {
            PublicKey::Rsa(public) => public.to_public_key_pem(LineEnding::LF)?,
            PublicKey::Dsa(verifying_key) => verifying_key.to_public_key_pem(LineEnding::LF)?,
        };
        Ok(pem)
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Rsa(_) => KeyAlgorithm::Rsa,
            PublicKey::Dsa(_) => KeyAlgorithm::Dsa,
        }
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self.algorithm() {
            KeyAlgorithm::Rsa => SignatureAlgorithm::Sha256WithRsa,
            KeyAlgorithm::Dsa => SignatureAlgorithm::DsaWithSha256,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            PublicKey::Rsa(public) => (public.size() * 8) as u32,
            PublicKey::Dsa(verifying_key) => verifying_key.components().p().bits() as u32,
        }
    }

    /// Verifies a SHA-256 signature produced by [`KeyPair::sign_data`].
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            PublicKey::Rsa(public) => {
                let verifying_key = pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                let signature = pkcs1v15::Signature::try_from(signature)?;
                verifying_key.verify(data, &signature)?;
            }
            PublicKey::Dsa(verifying_key) => {
                let signature = dsa::Signature::try_from(signature)?;
                verifying_key.verify_digest(Sha256::new_with_prefix(data), &signature)?;
            }
        }
        Ok(())
    }
}
