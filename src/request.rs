//! Certificate signing requests (PKCS#10).

use const_oid::ObjectIdentifier;
use der::asn1::{Any, BitString, SetOfVec};
use der::{Decode, DecodePem, Encode, EncodePem};
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
use crate::cert::params::{DistinguishedName, ExtensionParam, Subject};
use crate::error::{CertsmithError, Result};
use crate::key::{KeyPair, PublicKey};

/// PKCS#9 extensionRequest attribute.
const ID_EXTENSION_REQ: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// A signed certificate signing request.
///
/// The request is immutable: changing the subject or key means building a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub inner: CertReq,
}

impl CertificateRequest {
    /// Builds and self-signs a request for `subject` with `key_pair`.
    ///
    /// A non-empty `alt_names` list becomes a non-critical subjectAltName
    /// extension carried in an extensionRequest attribute.
    pub fn new(subject: &Subject, key_pair: &KeyPair) -> Result<Self> {
        subject.validate()?;

        let mut attributes = Vec::new();
        if !subject.alt_names.is_empty() {
            let san = SubjectAltName {
                names: subject.alt_names.clone(),
            };
            log::debug!("Requesting subjectAltName {}", san.to_text());
            let extensions = vec![ExtensionParam::from_extension(san, false)?.to_x509()?];
            attributes.push(Attribute {
                oid: ID_EXTENSION_REQ,
                values: SetOfVec::try_from(vec![Any::from_der(&extensions.to_der()?)?])?,
            });
        }

        let info = CertReqInfo {
            version: Version::V1,
            subject: subject.name.as_x509_name()?,
            public_key: key_pair.as_spki()?,
            attributes: SetOfVec::try_from(attributes)?,
        };

        let signature = key_pair.sign_data(&info.to_der()?)?;
        log::info!("Signed certificate request for {}", subject.name);

        Ok(Self {
            inner: CertReq {
                info,
                algorithm: key_pair.signature_algorithm().into(),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertsmithError::EncodingError(e.to_string()))
    }

    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertsmithError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_der(der)?,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertReq::from_pem(pem)?,
        })
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
    }

    /// Extensions requested through the extensionRequest attribute.
    pub fn extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut requested = Vec::new();
        for attribute in self.inner.info.attributes.iter() {
            if attribute.oid != ID_EXTENSION_REQ {
                continue;
            }
            for value in attribute.values.iter() {
                let extensions = Vec::<Extension>::from_der(&value.to_der()?)?;
                requested.extend(extensions.iter().map(ExtensionParam::from_x509));
            }
        }
        Ok(requested)
    }

    /// The requested subjectAltName extension, if any.
    pub fn subject_alt_name(&self) -> Result<Option<ExtensionParam>> {
        Ok(self
            .extensions()?
            .into_iter()
            .find(|ext| ext.oid == SubjectAltName::OID))
    }

    /// DNS names requested through subjectAltName, in request order.
    pub fn subject_alt_names(&self) -> Result<Vec<String>> {
        match self.subject_alt_name()? {
            Some(ext) => Ok(ext.to_extension::<SubjectAltName>()?.names),
            None => Ok(Vec::new()),
        }
    }

    /// Checks the self-signature against the public key in the request.
    pub fn verify_signature(&self) -> Result<()> {
        let algorithm = SignatureAlgorithm::from_algorithm_identifier(&self.inner.algorithm)?;
        let public_key = self.public_key()?;
        if algorithm != public_key.signature_algorithm() {
            return Err(CertsmithError::SignatureError(format!(
                "request is signed with {algorithm:?} but carries a {} key",
                public_key.algorithm()
            )));
        }
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertsmithError::DecodingError("signature has unused bits".to_string())
        })?;
        public_key.verify(&self.inner.info.to_der()?, signature)
    }
}
