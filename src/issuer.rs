use der::Encode;
use der::asn1::BitString;
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::extensions::{BasicConstraints, KeyUsage, KeyUsages, SubjectKeyIdentifier};
use crate::cert::params::{
    CertificationRequestInfo, DistinguishedName, ExtensionParam, VALIDITY_DAYS, Validity,
};
use crate::config::IssuancePolicy;
use crate::error::{CertsmithError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::request::CertificateRequest;
use crate::tbs_certificate::{CA_SERIAL_NUMBER, TbsCertificate, serial_number_bytes};

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the encoded name of the issuer, as it appears in issued certificates.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// # Arguments
    /// * `cert_request` - The subject, public key and extensions of the certificate to issue.
    /// * `serial_number` - The serial number of the new certificate.
    /// * `validity` - The validity window of the new certificate.
    ///
    /// # Returns
    /// A `Certificate` signed by [`Issuer::signing_key`] with SHA-256.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        serial_number: u64,
        validity: Validity,
    ) -> Result<Certificate> {
        let signature_algo = self.signing_key().signature_algorithm();

        let mut extensions = cert_request.extensions.clone();
        if cert_request.is_ca {
            let spki = cert_request.subject_public_key.to_spki()?;
            let basic_constraints = BasicConstraints {
                is_ca: true,
                max_path_length: Some(0),
            };
            let key_usage = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign);
            extensions.push(ExtensionParam::from_extension(basic_constraints, true)?);
            extensions.push(ExtensionParam::from_extension(key_usage, true)?);
            extensions.push(ExtensionParam::from_extension(
                SubjectKeyIdentifier::from_spki(&spki),
                false,
            )?);
        }

        let tbs_cert = TbsCertificate {
            serial_number: serial_number_bytes(serial_number),
            signature_algorithm: signature_algo,
            issuer: self.issuer_name(),
            validity,
            subject: cert_request.subject.clone(),
            subject_public_key: cert_request.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = self.signing_key().sign_data(&tbs_cert_inner.to_der()?)?;

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}

/// A self-signed root certificate together with its private key.
#[derive(Debug)]
pub struct CertificateAuthority {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateAuthority {
    /// Creates a self-signed root for `subject`.
    ///
    /// Serial number 1, one year of validity, basicConstraints CA:TRUE with
    /// pathlen 0 and keyUsage keyCertSign/cRLSign (both critical), and a
    /// subjectKeyIdentifier.
    pub fn create(subject: &DistinguishedName, key: KeyPair) -> Result<Self> {
        subject.validate()?;
        let name = subject.as_x509_name()?;

        let cert_info = CertificationRequestInfo::builder()
            .subject(name.clone())
            .subject_public_key(PublicKey::from_key_pair(&key))
            .is_ca(true)
            .build();

        let self_issuer = SelfIssuer { name, key: &key };
        let cert = self_issuer.issue(
            &cert_info,
            CA_SERIAL_NUMBER,
            Validity::for_days(VALIDITY_DAYS),
        )?;
        log::info!("Created self-signed CA {subject}");

        Ok(Self { cert, key })
    }

    /// Pairs a loaded CA certificate with its private key.
    ///
    /// Fails with [`CertsmithError::KeyMismatch`] when `key` is not the private
    /// half of the certificate's public key.
    pub fn from_parts(cert: Certificate, key: KeyPair) -> Result<Self> {
        if !key.matches(&cert.inner.tbs_certificate.subject_public_key_info)? {
            log::warn!("CA key does not match certificate {}", cert.subject());
            return Err(CertsmithError::KeyMismatch);
        }
        match cert.extension::<BasicConstraints>() {
            Ok(Some((_, bc))) if bc.is_ca => {}
            _ => log::warn!(
                "Certificate {} is not marked as a CA, issued certificates may not verify",
                cert.subject()
            ),
        }
        Ok(Self { cert, key })
    }

    /// Issues a leaf certificate for `csr`.
    ///
    /// The request's self-signature is checked first. The certificate gets a
    /// random 64-bit serial number and one year of validity. The request's
    /// subjectAltName is copied only when `policy` asks for it; nothing else is.
    pub fn sign_request(
        &self,
        csr: &CertificateRequest,
        policy: &IssuancePolicy,
    ) -> Result<Certificate> {
        csr.verify_signature().map_err(|e| {
            CertsmithError::SignatureError(format!("certificate request signature is invalid: {e}"))
        })?;

        let mut extensions = Vec::new();
        if let Some(mut san) = csr.subject_alt_name()? {
            if policy.copy_subject_alt_names {
                san.critical = false;
                extensions.push(san);
            } else {
                log::warn!("Request asks for subjectAltName, not copied into the certificate");
            }
        }

        let cert_info = CertificationRequestInfo::builder()
            .subject(csr.inner.info.subject.clone())
            .subject_public_key(csr.public_key()?)
            .extensions(extensions)
            .build();

        let serial_number = rand::random::<u64>();
        let cert = self.issue(&cert_info, serial_number, Validity::for_days(VALIDITY_DAYS))?;
        log::info!(
            "Issued certificate {serial_number:#x} for {} by {}",
            csr.subject(),
            self.cert.subject()
        );
        Ok(cert)
    }
}

impl Issuer for CertificateAuthority {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.cert.inner.tbs_certificate.subject.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}
