use std::fmt;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, Ia5StringRef, PrintableStringRef, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::{CertsmithError, Result};
use crate::key::PublicKey;

/// Lifetime of every certificate this crate creates.
pub const VALIDITY_DAYS: i64 = 365;

const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const STATE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATION_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const EMAIL_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");

/// Parameters for building an X.509 certificate.
///
/// This struct contains the subject, public key, and optional extensions for the certificate.
///
/// # Fields
/// * `subject` - The encoded subject name, copied verbatim into the certificate.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `is_ca` - Adds the CA extensions (basicConstraints, keyUsage, subjectKeyIdentifier).
/// * `extensions` - Additional X.509 extensions.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: Name,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// This struct represents the subject or issuer name in a certificate.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C), two characters.
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `email` - The e-mail address (emailAddress).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
    pub email: Option<String>,
}

impl DistinguishedName {
    /// Checks the name invariants: a non-empty common name and a two-character country.
    pub fn validate(&self) -> Result<()> {
        if self.common_name.trim().is_empty() {
            return Err(CertsmithError::InvalidInput(
                "common name must not be empty".to_string(),
            ));
        }
        if let Some(country) = &self.country {
            if country.chars().count() != 2 {
                return Err(CertsmithError::InvalidInput(format!(
                    "country must be exactly 2 characters, got {country:?}"
                )));
            }
        }
        Ok(())
    }

    fn attributes(&self) -> [(ObjectIdentifier, Option<&str>, Tag); 7] {
        [
            (COUNTRY, self.country.as_deref(), Tag::PrintableString),
            (STATE, self.state.as_deref(), Tag::Utf8String),
            (LOCALITY, self.locality.as_deref(), Tag::Utf8String),
            (ORGANIZATION, self.organization.as_deref(), Tag::Utf8String),
            (ORGANIZATION_UNIT, self.organization_unit.as_deref(), Tag::Utf8String),
            (COMMON_NAME, Some(self.common_name.as_str()), Tag::Utf8String),
            (EMAIL_ADDRESS, self.email.as_deref(), Tag::Ia5String),
        ]
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Attributes are emitted in the order C, ST, L, O, OU, CN, emailAddress,
    /// one per RDN. Absent or empty attributes are left out.
    pub fn as_x509_name(&self) -> Result<Name> {
        let mut rdns = Vec::new();
        for (oid, value, tag) in self.attributes() {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let atv = AttributeTypeAndValue {
                oid,
                value: string_value(tag, value)?,
            };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?));
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes this type does not model are ignored.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Ok(value) = std::str::from_utf8(attr.value.value()) else {
                    continue;
                };
                let value = value.to_string();
                match attr.oid {
                    COMMON_NAME => dn.common_name = value,
                    COUNTRY => dn.country = Some(value),
                    STATE => dn.state = Some(value),
                    LOCALITY => dn.locality = Some(value),
                    ORGANIZATION => dn.organization = Some(value),
                    ORGANIZATION_UNIT => dn.organization_unit = Some(value),
                    EMAIL_ADDRESS => dn.email = Some(value),
                    _ => {}
                }
            }
        }
        dn
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = ["C", "ST", "L", "O", "OU", "CN", "emailAddress"];
        let mut first = true;
        for ((_, value, _), label) in self.attributes().into_iter().zip(labels) {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{label}={value}")?;
            first = false;
        }
        Ok(())
    }
}

fn string_value(tag: Tag, value: &str) -> Result<Any> {
    match tag {
        Tag::PrintableString => {
            PrintableStringRef::new(value)?;
        }
        Tag::Ia5String => {
            Ia5StringRef::new(value)?;
        }
        _ => {}
    }
    Ok(Any::new(tag, value.as_bytes())?)
}

/// The identity a certificate signing request asks for: a distinguished name
/// plus DNS subject alternative names.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct Subject {
    pub name: DistinguishedName,
    #[builder(default)]
    pub alt_names: Vec<String>,
}

impl Subject {
    pub fn validate(&self) -> Result<()> {
        self.name.validate()?;
        for name in &self.alt_names {
            if name.trim().is_empty() {
                return Err(CertsmithError::InvalidInput(
                    "DNS name must not be empty".to_string(),
                ));
            }
            if !name.is_ascii() {
                return Err(CertsmithError::InvalidInput(format!(
                    "DNS name must be ASCII: {name:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// Both bounds are truncated to whole seconds, the resolution of X.509 times.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        let now = now - Duration::nanoseconds(i64::from(now.nanosecond()));
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    pub fn span(&self) -> Duration {
        self.not_after - self.not_before
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    pub(crate) fn from_x509(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }

    pub(crate) fn to_x509(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }
}
