pub mod extensions;
pub mod params;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, AnyRef};
use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::ToAndFromX509Extension;
use params::{DistinguishedName, ExtensionParam, Validity};
use x509_cert::certificate::CertificateInner;
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::error::{CertsmithError, Result};
use crate::key::PublicKey;

pub(crate) const SHA_256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
pub(crate) const DSA_WITH_SHA_256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.2");

/// Represents the supported signature algorithms for certificates and requests.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRsa,
    /// DSA with SHA-256.
    DsaWithSha256,
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRsa => SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::DsaWithSha256 => DSA_WITH_SHA_256,
        }
    }

    /// Maps a signature AlgorithmIdentifier back to a supported algorithm.
    pub fn from_algorithm_identifier(algorithm: &AlgorithmIdentifierOwned) -> Result<Self> {
        match algorithm.oid {
            SHA_256_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::Sha256WithRsa),
            DSA_WITH_SHA_256 => Ok(SignatureAlgorithm::DsaWithSha256),
            other => Err(CertsmithError::DecodingError(format!(
                "Unsupported signature algorithm {other}"
            ))),
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// RSA carries explicit NULL parameters (RFC 4055); DSA carries none (RFC 5758).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRsa => AlgorithmIdentifierOwned {
                oid: SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(Any::from(AnyRef::NULL)),
            },
            SignatureAlgorithm::DsaWithSha256 => AlgorithmIdentifierOwned {
                oid: DSA_WITH_SHA_256,
                parameters: None,
            },
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM formats
/// and to read back the fields the rest of the crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertsmithError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertsmithError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_pem(pem)?,
        })
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// True when the encoded issuer name equals the encoded subject name.
    pub fn is_self_issued(&self) -> bool {
        self.inner.tbs_certificate.issuer == self.inner.tbs_certificate.subject
    }

    /// Big-endian serial number bytes, without the sign padding byte.
    pub fn serial_number(&self) -> Vec<u8> {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        bytes[start..].to_vec()
    }

    /// The serial number as an integer, if it fits in 64 bits.
    pub fn serial_number_u64(&self) -> Option<u64> {
        let bytes = self.serial_number();
        if bytes.len() > 8 {
            return None;
        }
        let mut padded = [0u8; 8];
        padded[8 - bytes.len()..].copy_from_slice(&bytes);
        Some(u64::from_be_bytes(padded))
    }

    pub fn validity(&self) -> Validity {
        let validity = &self.inner.tbs_certificate.validity;
        Validity {
            not_before: time::OffsetDateTime::from(validity.not_before.to_system_time()),
            not_after: time::OffsetDateTime::from(validity.not_after.to_system_time()),
        }
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ExtensionParam::from_x509)
            .collect()
    }

    /// Finds and decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<(bool, E)>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| Ok((ext.critical, ext.to_extension::<E>()?)))
            .transpose()
    }

    /// Checks the certificate signature against `issuer_key`.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<()> {
        let algorithm = SignatureAlgorithm::from_algorithm_identifier(&self.inner.signature_algorithm)?;
        if algorithm.oid() != issuer_key.signature_algorithm().oid() {
            return Err(CertsmithError::SignatureError(format!(
                "certificate is signed with {algorithm:?} but the issuer key is {}",
                issuer_key.algorithm()
            )));
        }
        let tbs = self.inner.tbs_certificate.to_der()?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertsmithError::DecodingError("signature has unused bits".to_string())
        })?;
        issuer_key.verify(&tbs, signature)
    }
}
