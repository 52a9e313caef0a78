use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::Result;
use crate::key::PublicKey;

/// Serial number of every self-signed CA root.
pub const CA_SERIAL_NUMBER: u64 = 1;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - Big-endian serial number bytes.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The encoded name of the certificate issuer.
/// * `validity` - The `notBefore`/`notAfter` window.
/// * `subject` - The encoded name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct TbsCertificate {
    /// Certificate serial number
    pub serial_number: Vec<u8>,
    /// Certificate signature algorithm
    pub signature_algorithm: SignatureAlgorithm,
    /// Certificate issuer name
    pub issuer: Name,
    /// Certificate validity window
    pub validity: Validity,
    /// Certificate subject name
    pub subject: Name,
    /// Subject's public key
    pub subject_public_key: PublicKey,
    /// Certificate extensions
    pub extensions: Vec<ExtensionParam>,
}

/// Encodes `serial` as the content of a positive DER INTEGER.
///
/// Leading zero bytes are dropped and one is added back when the high bit is set.
pub fn serial_number_bytes(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);
    let mut out = Vec::with_capacity(9);
    if bytes[start] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[start..]);
    out
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    ///
    /// Certificates are always version 3. The extensions field is left out when empty.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let algorithm_id: x509_cert::spki::AlgorithmIdentifierOwned =
            self.signature_algorithm.into();

        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509)
            .collect::<Result<Vec<_>>>()?;

        let not_before = x509_cert::time::Time::UtcTime(der::asn1::UtcTime::from_system_time(
            self.validity.not_before.into(),
        )?);
        let not_after = x509_cert::time::Time::UtcTime(der::asn1::UtcTime::from_system_time(
            self.validity.not_after.into(),
        )?);

        let validity = x509_cert::time::Validity {
            not_before,
            not_after,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: algorithm_id,
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }
}
