//! Certificate checks: does a private key belong to a certificate, and was a
//! certificate issued by a given root.
//!
//! Both checks return their outcome as a value. Malformed input is reported
//! as a negative outcome with a reason rather than as an error.

use std::fmt;

use time::OffsetDateTime;

use crate::cert::Certificate;
use crate::cert::extensions::{BasicConstraints, KeyUsage, KeyUsages};
use crate::error::Result;
use crate::key::KeyPair;

/// Outcome of [`check_key_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    Match,
    Mismatch(String),
}

impl KeyMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, KeyMatch::Match)
    }
}

impl fmt::Display for KeyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMatch::Match => f.write_str("MATCH: the private key belongs to the certificate"),
            KeyMatch::Mismatch(reason) => write!(f, "MISMATCH: {reason}"),
        }
    }
}

/// Outcome of [`check_issuer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuerCheck {
    Valid,
    Invalid(String),
}

impl IssuerCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, IssuerCheck::Valid)
    }
}

impl fmt::Display for IssuerCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuerCheck::Valid => f.write_str("VALID: the certificate was signed by the CA"),
            IssuerCheck::Invalid(reason) => write!(f, "INVALID: {reason}"),
        }
    }
}

/// Checks that `key` is the private half of the certificate's public key.
pub fn check_key_match(certificate: &Certificate, key: &KeyPair) -> KeyMatch {
    let spki = &certificate.inner.tbs_certificate.subject_public_key_info;
    let outcome = match key.matches(spki) {
        Ok(true) => KeyMatch::Match,
        Ok(false) => KeyMatch::Mismatch(format!(
            "the {} key does not correspond to the public key of {}",
            key.algorithm(),
            certificate.subject()
        )),
        Err(e) => KeyMatch::Mismatch(e.to_string()),
    };
    log::info!("Key match check for {}: {outcome}", certificate.subject());
    outcome
}

/// Checks that `certificate` was issued by the self-signed root `issuer`, now.
pub fn check_issuer(certificate: &Certificate, issuer: &Certificate) -> IssuerCheck {
    check_issuer_at(certificate, issuer, OffsetDateTime::now_utc())
}

/// Checks that `certificate` was issued by the self-signed root `issuer` at time `at`.
///
/// `issuer` is the only trusted certificate. It must be self-signed, allowed
/// to sign certificates, and both certificates must be valid at `at`.
pub fn check_issuer_at(
    certificate: &Certificate,
    issuer: &Certificate,
    at: OffsetDateTime,
) -> IssuerCheck {
    let outcome = match issuer_chain(certificate, issuer, at) {
        Ok(None) => IssuerCheck::Valid,
        Ok(Some(reason)) => IssuerCheck::Invalid(reason),
        Err(e) => IssuerCheck::Invalid(e.to_string()),
    };
    log::info!(
        "Issuer check for {} against {}: {outcome}",
        certificate.subject(),
        issuer.subject()
    );
    outcome
}

// Ok(None) when valid, Ok(Some(reason)) when a check fails.
fn issuer_chain(
    certificate: &Certificate,
    issuer: &Certificate,
    at: OffsetDateTime,
) -> Result<Option<String>> {
    if !issuer.is_self_issued() {
        return Ok(Some(format!(
            "{} is not a self-signed root (issued by {})",
            issuer.subject(),
            issuer.issuer()
        )));
    }
    let issuer_key = issuer.public_key()?;
    if let Err(e) = issuer.verify_signature(&issuer_key) {
        return Ok(Some(format!(
            "the self-signature of {} does not verify: {e}",
            issuer.subject()
        )));
    }

    for (label, cert) in [("certificate", certificate), ("CA certificate", issuer)] {
        let validity = cert.validity();
        if !validity.contains(at) {
            return Ok(Some(format!(
                "{label} {} is not valid at {at} (valid from {} to {})",
                cert.subject(),
                validity.not_before,
                validity.not_after
            )));
        }
    }

    if certificate.to_der()? == issuer.to_der()? {
        log::debug!("Certificate is the trusted root itself");
        return Ok(None);
    }

    if certificate.inner.tbs_certificate.issuer != issuer.inner.tbs_certificate.subject {
        return Ok(Some(format!(
            "certificate issuer {} is not {}",
            certificate.issuer(),
            issuer.subject()
        )));
    }

    if let Some((_, basic_constraints)) = issuer.extension::<BasicConstraints>()? {
        if !basic_constraints.is_ca {
            return Ok(Some(format!("{} is not a CA certificate", issuer.subject())));
        }
    }
    if let Some((_, key_usage)) = issuer.extension::<KeyUsage>()? {
        if !key_usage.contains(KeyUsages::KeyCertSign) {
            return Ok(Some(format!(
                "{} is not allowed to sign certificates",
                issuer.subject()
            )));
        }
    }

    if let Err(e) = certificate.verify_signature(&issuer_key) {
        return Ok(Some(format!("certificate signature does not verify: {e}")));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::cert::params::{DistinguishedName, Subject};
    use crate::config::IssuancePolicy;
    use crate::issuer::CertificateAuthority;
    use crate::key::KeyAlgorithm;
    use crate::request::CertificateRequest;

    fn named(cn: &str) -> DistinguishedName {
        DistinguishedName::builder()
            .common_name(cn.to_string())
            .build()
    }

    fn ca(cn: &str) -> CertificateAuthority {
        let key = KeyPair::generate(KeyAlgorithm::Rsa, 1024).unwrap();
        CertificateAuthority::create(&named(cn), key).unwrap()
    }

    fn leaf(ca: &CertificateAuthority) -> (Certificate, KeyPair) {
        let key = KeyPair::generate(KeyAlgorithm::Rsa, 1024).unwrap();
        let subject = Subject::builder().name(named("leaf.example.com")).build();
        let csr = CertificateRequest::new(&subject, &key).unwrap();
        let cert = ca.sign_request(&csr, &IssuancePolicy::default()).unwrap();
        (cert, key)
    }

    #[test]
    fn test_key_match() {
        let root = ca("root");
        let (cert, key) = leaf(&root);
        assert_eq!(check_key_match(&cert, &key), KeyMatch::Match);
        assert!(!check_key_match(&cert, &root.key).is_match());
        assert!(check_key_match(&root.cert, &root.key).is_match());
    }

    #[test]
    fn test_issuer_check() {
        let root = ca("root");
        let other = ca("other root");
        let (cert, _) = leaf(&root);

        assert_eq!(check_issuer(&cert, &root.cert), IssuerCheck::Valid);
        assert!(check_issuer(&root.cert, &root.cert).is_valid());

        let IssuerCheck::Invalid(reason) = check_issuer(&cert, &other.cert) else {
            panic!("unrelated CA must not validate");
        };
        assert!(reason.contains("issuer"), "{reason}");
    }

    #[test]
    fn test_same_name_different_key() {
        let root = ca("root");
        let impostor = ca("root");
        let (cert, _) = leaf(&root);
        let IssuerCheck::Invalid(reason) = check_issuer(&cert, &impostor.cert) else {
            panic!("a root with another key must not validate");
        };
        assert!(reason.contains("signature"), "{reason}");
    }

    #[test]
    fn test_leaf_is_not_a_root() {
        let root = ca("root");
        let (cert, _) = leaf(&root);
        let (other, _) = leaf(&root);
        assert!(!check_issuer(&other, &cert).is_valid());
    }

    #[test]
    fn test_outside_validity() {
        let root = ca("root");
        let (cert, _) = leaf(&root);
        let later = OffsetDateTime::now_utc() + Duration::days(400);
        let IssuerCheck::Invalid(reason) = check_issuer_at(&cert, &root.cert, later) else {
            panic!("expired certificate must not validate");
        };
        assert!(reason.contains("not valid"), "{reason}");
        let earlier = OffsetDateTime::now_utc() - Duration::days(1);
        assert!(!check_issuer_at(&cert, &root.cert, earlier).is_valid());
    }

    #[test]
    fn test_expired_root_against_itself() {
        let root = ca("root");
        assert!(check_issuer(&root.cert, &root.cert).is_valid());
        let later = OffsetDateTime::now_utc() + Duration::days(400);
        let IssuerCheck::Invalid(reason) = check_issuer_at(&root.cert, &root.cert, later) else {
            panic!("expired root must not validate against itself");
        };
        assert!(reason.contains("not valid"), "{reason}");
    }

    #[test]
    fn test_tampered_certificate() {
        let root = ca("root");
        let (mut cert, _) = leaf(&root);
        cert.inner.tbs_certificate.subject = named("evil.example.com").as_x509_name().unwrap();
        assert!(!check_issuer(&cert, &root.cert).is_valid());
    }
}
